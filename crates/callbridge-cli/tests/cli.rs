//! Integration tests for the callbridge CLI binary.

use std::path::PathBuf;
use std::process::{Command, Output};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn callbridge(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_callbridge"))
        .args(args)
        .env("NO_COLOR", "1")
        .env_remove("CALLBRIDGE_LOG")
        .output()
        .expect("failed to run callbridge")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn game_manifest() -> String {
    fixtures_dir().join("game.toml").display().to_string()
}

// ────────────────────────────────────────────────────────────────────────────
// classify
// ────────────────────────────────────────────────────────────────────────────

#[test]
fn test_classify_text_uses_manifest_target() {
    let output = callbridge(&["classify", &game_manifest()]);
    assert!(output.status.success(), "{}", stderr(&output));

    let text = stdout(&output);
    assert!(text.starts_with("target: aarch64\n"));
    let lines: Vec<Vec<&str>> = text
        .lines()
        .skip(1)
        .map(|line| line.split_whitespace().collect())
        .collect();
    assert_eq!(
        lines,
        vec![
            vec!["Counter::Add", "i4i8i4"],
            vec!["Transform::Translate", "vi8vf3"],
            vec!["Transform::Scale", "vi8vf3"],
            vec!["Renderer::Tint", "i4i4r4"],
            vec!["Mesh::GetBounds", "S24i8"],
            vec!["Time::Now", "r8"],
        ]
    );
}

#[test]
fn test_classify_json_with_target_override() {
    let output = callbridge(&[
        "classify",
        &game_manifest(),
        "--target",
        "x86_64-win64",
        "--format",
        "json",
    ]);
    assert!(output.status.success(), "{}", stderr(&output));

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["target"], "x86_64-win64");
    assert_eq!(value["methods"][1]["name"], "Transform::Translate");
    assert_eq!(value["methods"][1]["shape"], "vi8sr");
    assert_eq!(value["methods"][4]["ret"], "S24");
}

#[test]
fn test_classify_rejects_unknown_target() {
    let output = callbridge(&["classify", &game_manifest(), "--target", "mips"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("mips"));
}

#[test]
fn test_classify_unsupported_struct_names_method() {
    let path = fixtures_dir().join("mixed.toml");
    let output = callbridge(&["classify", &path.display().to_string(), "-t", "x86_64-sysv"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Tagged::Make"), "{}", stderr(&output));

    let output = callbridge(&["classify", &path.display().to_string(), "-t", "aarch64"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stdout(&output).contains("i16i8r8"));
}

#[test]
fn test_missing_manifest() {
    let output = callbridge(&["classify", "/nonexistent/bridges.toml"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("failed to read manifest"));
}

// ────────────────────────────────────────────────────────────────────────────
// generate
// ────────────────────────────────────────────────────────────────────────────

#[test]
fn test_generate_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let out_path = dir.path().join("bridges.rs");

    let output = callbridge(&[
        "generate",
        &game_manifest(),
        "-o",
        &out_path.display().to_string(),
        "--module",
        "bridges",
    ]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stdout(&output).is_empty());

    let source = std::fs::read_to_string(&out_path).unwrap();
    assert!(source.contains("// Target: aarch64"));
    assert!(source.contains("pub mod bridges {"));

    let shapes: Vec<&str> = source
        .lines()
        .filter_map(|line| line.trim().strip_prefix('"'))
        .filter_map(|rest| rest.split('"').next())
        .collect();
    assert_eq!(shapes, vec!["S24i8", "i4i4r4", "i4i8i4", "r8", "vi8vf3"]);
    assert!(source.contains("\"vi8vf3\", // Transform::Translate, Transform::Scale"));
}

#[test]
fn test_generate_to_stdout() {
    let output = callbridge(&["generate", &game_manifest(), "--target", "x86_64-sysv"]);
    assert!(output.status.success(), "{}", stderr(&output));

    let source = stdout(&output);
    assert!(source.contains("callbridge::bridge_shapes! {"));
    assert!(source.contains("// Target: x86_64-sysv"));
    assert!(!source.contains("pub mod"));
}

#[test]
fn test_generate_rejects_bad_module_name() {
    let output = callbridge(&["generate", &game_manifest(), "--module", "my-mod"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("my-mod"));
}

#[test]
fn test_generate_rejects_empty_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.toml");
    std::fs::write(&path, "target = \"aarch64\"\n").unwrap();

    let output = callbridge(&["generate", &path.display().to_string()]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("lists no methods"));
}

#[test]
fn test_generate_rejects_unknown_type() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(
        &path,
        "[[methods]]\nname = \"Foo::Bar\"\nparams = [\"Quaternion\"]\n",
    )
    .unwrap();

    let output = callbridge(&["generate", &path.display().to_string()]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Quaternion"), "{}", stderr(&output));
}

// ────────────────────────────────────────────────────────────────────────────
// demangle / targets
// ────────────────────────────────────────────────────────────────────────────

#[test]
fn test_demangle() {
    let output = callbridge(&["demangle", "i4i8i4", "S24i8sr"]);
    assert!(output.status.success(), "{}", stderr(&output));

    let text = stdout(&output);
    assert!(text.contains("i4i8i4\n"));
    assert!(text.contains("adjustor thunk: yes"));
    assert!(text.contains("24-byte struct in memory"));
    assert!(text.contains("pointer to caller-owned struct"));
}

#[test]
fn test_demangle_invalid() {
    let output = callbridge(&["demangle", "i4", "i3"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("invalid shape `i3`"));
    assert!(stdout(&output).is_empty());
}

#[test]
fn test_targets() {
    let output = callbridge(&["targets"]);
    assert!(output.status.success());
    let text = stdout(&output);
    for name in ["aarch64", "x86_64-sysv", "x86_64-win64"] {
        assert!(text.contains(name));
    }
    assert_eq!(text.matches("(host)").count(), 1);
}
