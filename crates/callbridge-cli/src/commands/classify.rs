//! `callbridge classify`: Print the shape of every manifest method.

use std::path::Path;

use callbridge_abi::{SlotKind, TargetAbi};
use serde_json::json;
use termcolor::ColorChoice;

use super::{classify_manifest, load_manifest, select_target, ClassifiedMethod};
use crate::output::StyledOutput;
use crate::Format;

pub fn execute(
    manifest_path: &Path,
    target: Option<TargetAbi>,
    format: Format,
    color: ColorChoice,
) -> anyhow::Result<()> {
    let manifest = load_manifest(manifest_path)?;
    let target = select_target(target, &manifest);
    let methods = classify_manifest(&manifest, target)?;

    match format {
        Format::Text => print_text(target, &methods, color),
        Format::Json => println!("{}", serde_json::to_string_pretty(&to_json(target, &methods))?),
    }
    Ok(())
}

fn print_text(target: TargetAbi, methods: &[ClassifiedMethod], color: ColorChoice) {
    let mut out = StyledOutput::new(color);
    out.plain("target: ");
    out.info(target.name());
    out.newline();

    let width = methods.iter().map(|m| m.name.len()).max().unwrap_or(0);
    for method in methods {
        out.plain("  ");
        out.bold(&format!("{:<width$}", method.name, width = width));
        out.plain("  ");
        out.shape(&method.shape.mangle());
        out.newline();
    }
    out.flush();
}

fn to_json(target: TargetAbi, methods: &[ClassifiedMethod]) -> serde_json::Value {
    let methods: Vec<_> = methods
        .iter()
        .map(|method| {
            let params: Vec<String> = method.shape.params().iter().map(SlotKind::to_string).collect();
            json!({
                "name": method.name,
                "shape": method.shape.mangle(),
                "ret": method.shape.ret().to_string(),
                "params": params,
                "adjustor_thunk": method.shape.has_receiver_slot(),
            })
        })
        .collect();

    json!({
        "target": target.name(),
        "methods": methods,
    })
}
