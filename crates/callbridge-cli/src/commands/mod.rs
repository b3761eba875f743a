//! Subcommand implementations

pub mod classify;
pub mod demangle;
pub mod generate;
pub mod targets;

use std::path::Path;

use anyhow::Context;
use callbridge_abi::{Classifier, Manifest, ShapeSignature, TargetAbi};

/// A manifest method and the shape it classifies to.
pub struct ClassifiedMethod {
    pub name: String,
    pub shape: ShapeSignature,
}

/// Read and parse a generator manifest.
pub fn load_manifest(path: &Path) -> anyhow::Result<Manifest> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read manifest {}", path.display()))?;
    let manifest = Manifest::from_toml_str(&source)
        .with_context(|| format!("failed to parse manifest {}", path.display()))?;
    tracing::debug!(
        path = %path.display(),
        structs = manifest.structs.len(),
        methods = manifest.methods.len(),
        "loaded manifest"
    );
    Ok(manifest)
}

/// Command-line target, else the manifest's, else the host's.
pub fn select_target(flag: Option<TargetAbi>, manifest: &Manifest) -> TargetAbi {
    flag.or(manifest.target).unwrap_or_else(TargetAbi::host)
}

/// Classify every method in the manifest. The first failure aborts with a
/// diagnostic naming the method.
pub fn classify_manifest(
    manifest: &Manifest,
    target: TargetAbi,
) -> anyhow::Result<Vec<ClassifiedMethod>> {
    let classifier = Classifier::new(target);
    let methods = manifest.resolve().context("failed to resolve manifest types")?;

    methods
        .into_iter()
        .map(|method| {
            let shape = classifier
                .classify_signature(&method.signature)
                .with_context(|| format!("cannot classify `{}` for {}", method.name, target))?;
            tracing::trace!(method = %method.name, %shape, "classified");
            Ok(ClassifiedMethod {
                name: method.name,
                shape,
            })
        })
        .collect()
}
