//! `callbridge demangle`: Explain mangled shapes slot by slot.

use anyhow::Context;
use callbridge_abi::{ShapeSignature, SlotKind};
use termcolor::ColorChoice;

use crate::output::StyledOutput;

pub fn execute(shapes: &[String], color: ColorChoice) -> anyhow::Result<()> {
    // Validate everything before printing anything.
    let decoded = shapes
        .iter()
        .map(|s| ShapeSignature::demangle(s).with_context(|| format!("invalid shape `{}`", s)))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let mut out = StyledOutput::new(color);
    for (i, shape) in decoded.iter().enumerate() {
        if i > 0 {
            out.newline();
        }
        out.shape(&shape.mangle());
        out.newline();
        for (label, kind) in rows(shape) {
            out.plain(&format!("  {:<10}", label));
            out.bold(&format!("{:<6}", kind.to_string()));
            out.plain(&describe(kind));
            out.newline();
        }
        out.plain(&format!(
            "  frame: {} slot(s), adjustor thunk: {}",
            shape.param_slot_count(),
            if shape.has_receiver_slot() { "yes" } else { "no" }
        ));
        out.newline();
    }
    out.flush();
    Ok(())
}

fn rows(shape: &ShapeSignature) -> Vec<(String, SlotKind)> {
    std::iter::once(("return".to_string(), shape.ret()))
        .chain(
            shape
                .params()
                .iter()
                .enumerate()
                .map(|(i, kind)| (format!("param {}", i), *kind)),
        )
        .collect()
}

fn describe(kind: SlotKind) -> String {
    match kind {
        SlotKind::Void => "no value".to_string(),
        SlotKind::StructRef => "pointer to caller-owned struct".to_string(),
        SlotKind::Large(size) => format!("{}-byte struct in memory, {} slot(s)", size, kind.slot_count()),
        SlotKind::VectorF32(lanes) => format!("{} x f32 in FP registers", lanes),
        SlotKind::VectorF64(lanes) => format!("{} x f64 in FP registers", lanes),
        SlotKind::I16 => "16-byte struct in two integer registers".to_string(),
        _ => format!("{}-byte scalar", kind.size_bytes()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows() {
        let shape = ShapeSignature::demangle("S24i8sr").unwrap();
        let labels: Vec<String> = rows(&shape).into_iter().map(|(l, _)| l).collect();
        assert_eq!(labels, vec!["return", "param 0", "param 1"]);
    }

    #[test]
    fn test_describe() {
        assert_eq!(describe(SlotKind::Large(24)), "24-byte struct in memory, 3 slot(s)");
        assert_eq!(describe(SlotKind::I4), "4-byte scalar");
        assert_eq!(describe(SlotKind::VectorF64(3)), "3 x f64 in FP registers");
    }

    #[test]
    fn test_invalid_shape_is_error() {
        let err = execute(&["i4x".to_string()], ColorChoice::Never).unwrap_err();
        assert!(err.to_string().contains("i4x"));
    }
}
