//! File-level conventions of the CLI collaborator.

use std::path::Path;

use covenant::cli::default_output_path;
use covenant::compile::compile_named;
use covenant::options::{CompileOptions, Dialect};
use tempfile::TempDir;

#[test]
fn default_output_replaces_the_suffix() {
    assert_eq!(
        default_output_path(Path::new("bank.cov"), Dialect::Javascript),
        Path::new("bank.js")
    );
    assert_eq!(
        default_output_path(Path::new("dir/bank.cov"), Dialect::Typescript),
        Path::new("dir/bank.ts")
    );
}

#[test]
fn compile_writes_a_runnable_artifact_next_to_the_source() {
    let dir = TempDir::new().expect("temp dir");
    let source_path = dir.path().join("divide.cov");
    let source = "export fn divide(a: Int, b: Int) -> Int @requires b != 0 { return a / b }";
    std::fs::write(&source_path, source).expect("write source");

    let text = std::fs::read_to_string(&source_path).expect("read source");
    let result = compile_named(
        &text,
        source_path.to_str(),
        &CompileOptions::default(),
    );
    assert!(result.success, "diagnostics: {:?}", result.diagnostics);

    let out_path = default_output_path(&source_path, Dialect::Javascript);
    std::fs::write(&out_path, result.output.as_ref().unwrap()).expect("write artifact");

    assert_eq!(out_path.extension().unwrap(), "js");
    let artifact = std::fs::read_to_string(&out_path).expect("read artifact");
    assert!(artifact.contains("export function divide"));
    assert!(artifact.contains("__requires("));
}

#[test]
fn diagnostics_carry_the_file_name() {
    let dir = TempDir::new().expect("temp dir");
    let source_path = dir.path().join("broken.cov");
    std::fs::write(&source_path, "fn f() -> Int { return missing; }").expect("write source");

    let text = std::fs::read_to_string(&source_path).expect("read source");
    let result = compile_named(&text, source_path.to_str(), &CompileOptions::default());
    assert!(!result.success);
    let diag = &result.diagnostics[0];
    assert!(diag.file.as_deref().unwrap().ends_with("broken.cov"));
    assert!(diag.header().contains("broken.cov"));
}
