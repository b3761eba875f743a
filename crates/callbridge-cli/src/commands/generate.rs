//! `callbridge generate`: Emit the trampoline set for a manifest.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use anyhow::Context;
use callbridge_abi::TargetAbi;

use super::{classify_manifest, load_manifest, select_target, ClassifiedMethod};

pub fn execute(
    manifest_path: &Path,
    target: Option<TargetAbi>,
    output: Option<&Path>,
    module: Option<&str>,
) -> anyhow::Result<()> {
    if let Some(name) = module {
        anyhow::ensure!(is_identifier(name), "`{}` is not a valid module name", name);
    }

    let manifest = load_manifest(manifest_path)?;
    let target = select_target(target, &manifest);
    let methods = classify_manifest(&manifest, target)?;
    anyhow::ensure!(
        !methods.is_empty(),
        "{} lists no methods",
        manifest_path.display()
    );

    let source_name = manifest_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| manifest_path.display().to_string());
    let source = render(&source_name, target, &methods, module);

    match output {
        Some(path) => {
            std::fs::write(path, &source)
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(
                shapes = distinct_shapes(&methods).len(),
                path = %path.display(),
                "wrote trampoline set"
            );
        }
        None => print!("{}", source),
    }
    Ok(())
}

/// Shapes in mangled order, each with the methods that use it.
fn distinct_shapes(methods: &[ClassifiedMethod]) -> BTreeMap<String, Vec<&str>> {
    let mut shapes: BTreeMap<String, Vec<&str>> = BTreeMap::new();
    for method in methods {
        shapes
            .entry(method.shape.mangle())
            .or_default()
            .push(&method.name);
    }
    shapes
}

/// Rust source for the `bridge_shapes!` invocation.
fn render(
    source_name: &str,
    target: TargetAbi,
    methods: &[ClassifiedMethod],
    module: Option<&str>,
) -> String {
    let shapes = distinct_shapes(methods);
    let indent = if module.is_some() { "    " } else { "" };
    let mut out = String::new();

    let _ = writeln!(out, "// Generated by `callbridge generate` from {}. Do not edit.", source_name);
    let _ = writeln!(out, "// Target: {}", target);
    let _ = writeln!(out);

    if let Some(name) = module {
        let _ = writeln!(out, "pub mod {} {{", name);
    }
    let _ = writeln!(out, "{}callbridge::bridge_shapes! {{", indent);
    for (shape, users) in &shapes {
        let _ = writeln!(out, "{}    \"{}\", // {}", indent, shape, users.join(", "));
    }
    let _ = writeln!(out, "{}}}", indent);
    if module.is_some() {
        let _ = writeln!(out, "}}");
    }
    out
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}
