//! Command-line interface for the Covenant compiler.
//!
//! The CLI is a thin collaborator around the core: it reads files, picks
//! options, invokes the pipeline, and writes target text or renders
//! diagnostics. Exit code is 0 when no errors were reported, 1 otherwise.

use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::compile::{check_named, compile_named, CompileResult};
use crate::options::{CompileOptions, Dialect, ModuleSystem, VerifyLevel};

#[derive(Parser)]
#[command(name = "covc")]
#[command(about = "The Covenant compiler", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile a source file to target text
    Compile {
        /// Source file (.cov)
        file: PathBuf,
        /// Output path (default: input with a .js suffix)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Target dialect: javascript or typescript
        #[arg(long)]
        dialect: Option<String>,
        /// Module system: esm or commonjs
        #[arg(long)]
        modules: Option<String>,
        /// Disable runtime contract instrumentation
        #[arg(long)]
        no_contracts: bool,
        /// Verify level: full, runtime, or trusted
        #[arg(long)]
        verify: Option<String>,
        /// Stop after the first pass that reports errors
        #[arg(long)]
        stop_on_first_error: bool,
        /// Print diagnostics as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check a source file without emitting target text
    Check {
        /// Source file (.cov)
        file: PathBuf,
        /// Print diagnostics as JSON
        #[arg(long)]
        json: bool,
    },
    /// Compile a source file and run it with node
    Run {
        /// Source file (.cov)
        file: PathBuf,
    },
    /// Interactive session
    Repl,
}

pub fn run_cli() -> i32 {
    let cli = Cli::parse();
    match cli.command {
        Commands::Compile {
            file,
            output,
            dialect,
            modules,
            no_contracts,
            verify,
            stop_on_first_error,
            json,
        } => {
            let options = match build_options(
                dialect.as_deref(),
                modules.as_deref(),
                no_contracts,
                verify.as_deref(),
                stop_on_first_error,
            ) {
                Ok(options) => options,
                Err(message) => {
                    eprintln!("error: {}", message);
                    return 1;
                }
            };
            cmd_compile(&file, output.as_deref(), &options, json)
        }
        Commands::Check { file, json } => cmd_check(&file, json),
        Commands::Run { file } => cmd_run(&file),
        Commands::Repl => cmd_repl(),
    }
}

/// Default artifact path: the input file with its suffix replaced.
pub fn default_output_path(file: &Path, dialect: Dialect) -> PathBuf {
    let suffix = match dialect {
        Dialect::Javascript => "js",
        Dialect::Typescript => "ts",
    };
    file.with_extension(suffix)
}

fn build_options(
    dialect: Option<&str>,
    modules: Option<&str>,
    no_contracts: bool,
    verify: Option<&str>,
    stop_on_first_error: bool,
) -> Result<CompileOptions, String> {
    let mut options = CompileOptions::default();
    if let Some(dialect) = dialect {
        options.dialect = dialect.parse::<Dialect>()?;
    }
    if let Some(modules) = modules {
        options.modules = modules.parse::<ModuleSystem>()?;
    }
    if no_contracts {
        options.runtime_contracts = false;
    }
    if let Some(verify) = verify {
        options.verify = verify.parse::<VerifyLevel>()?;
    }
    options.stop_on_first_error = stop_on_first_error;
    Ok(options)
}

fn cmd_compile(file: &Path, output: Option<&Path>, options: &CompileOptions, json: bool) -> i32 {
    let source = match std::fs::read_to_string(file) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("error: cannot read {}: {}", file.display(), e);
            return 1;
        }
    };
    let result = compile_named(&source, file.to_str(), options);
    report(&result, &source, json);

    if let Some(text) = &result.output {
        let out_path = output
            .map(Path::to_path_buf)
            .unwrap_or_else(|| default_output_path(file, options.dialect));
        if let Err(e) = std::fs::write(&out_path, text) {
            eprintln!("error: cannot write {}: {}", out_path.display(), e);
            return 1;
        }
    }
    exit_code(&result)
}

fn cmd_check(file: &Path, json: bool) -> i32 {
    let source = match std::fs::read_to_string(file) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("error: cannot read {}: {}", file.display(), e);
            return 1;
        }
    };
    let result = check_named(&source, file.to_str(), &CompileOptions::default());
    report(&result, &source, json);
    if result.success {
        println!("{}: no errors", file.display());
    }
    exit_code(&result)
}

fn cmd_run(file: &Path) -> i32 {
    let source = match std::fs::read_to_string(file) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("error: cannot read {}: {}", file.display(), e);
            return 1;
        }
    };
    // node runs the artifact as CommonJS so no module scaffolding is needed.
    let options = CompileOptions { modules: ModuleSystem::CommonJs, ..Default::default() };
    let result = compile_named(&source, file.to_str(), &options);
    report(&result, &source, false);
    let text = match &result.output {
        Some(text) => text,
        None => return 1,
    };
    match Command::new("node").arg("-e").arg(text).status() {
        Ok(status) => status.code().unwrap_or(1),
        Err(e) => {
            eprintln!("error: cannot start node: {}", e);
            1
        }
    }
}

fn cmd_repl() -> i32 {
    println!("Covenant repl. :help for commands, :quit to leave");
    let stdin = io::stdin();
    let mut chunk = String::new();
    loop {
        if chunk.is_empty() {
            print!("covenant> ");
        } else {
            print!("     ...> ");
        }
        let _ = io::stdout().flush();
        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(_) => break,
        }
        let trimmed = line.trim();
        if chunk.is_empty() {
            match trimmed {
                ":quit" | ":q" => break,
                ":help" => {
                    println!(":quit  leave the session");
                    println!(":help  this message");
                    println!("Declarations compile as-is; bare expressions print their value.");
                    continue;
                }
                "" => continue,
                _ => {}
            }
        }
        chunk.push_str(&line);
        // Accumulate until every bracket closes.
        if braces_balanced(&chunk) {
            let program = wrap_chunk(chunk.trim());
            chunk.clear();
            run_chunk(&program);
        }
    }
    0
}

fn braces_balanced(text: &str) -> bool {
    let mut depth = 0i64;
    let mut in_string = false;
    let mut escaped = false;
    for c in text.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' | '(' | '[' => depth += 1,
            '}' | ')' | ']' => depth -= 1,
            _ => {}
        }
    }
    depth <= 0
}

/// Bare expressions are not part of the core grammar; the repl wraps them in
/// a throwaway function that prints the value.
fn wrap_chunk(chunk: &str) -> String {
    const DECL_STARTERS: &[&str] = &[
        "fn", "let", "type", "struct", "enum", "trait", "impl", "contract", "intent", "effect",
        "capability", "import", "export", "pure", "extern",
    ];
    let first_word = chunk.split_whitespace().next().unwrap_or("");
    if DECL_STARTERS.contains(&first_word) {
        chunk.to_string()
    } else {
        let body = chunk.trim_end_matches(';');
        format!(
            "@effect[IO] fn __repl_entry() -> Void {{ IO.write({}); }}",
            body
        )
    }
}

fn run_chunk(program: &str) {
    let options = CompileOptions { modules: ModuleSystem::CommonJs, ..Default::default() };
    let result = compile_named(program, Some("<repl>"), &options);
    report(&result, program, false);
    if let Some(text) = &result.output {
        let mut script = text.clone();
        if program.contains("__repl_entry") {
            script.push_str("\n__repl_entry();\n");
        }
        match Command::new("node").arg("-e").arg(&script).output() {
            Ok(out) => {
                print!("{}", String::from_utf8_lossy(&out.stdout));
                eprint!("{}", String::from_utf8_lossy(&out.stderr));
            }
            Err(e) => eprintln!("error: cannot start node: {}", e),
        }
    }
}

fn report(result: &CompileResult, source: &str, json: bool) {
    if json {
        match serde_json::to_string_pretty(&result.diagnostics) {
            Ok(text) => println!("{}", text),
            Err(e) => eprintln!("error: cannot serialize diagnostics: {}", e),
        }
        return;
    }
    for diagnostic in &result.diagnostics {
        eprintln!("{}", diagnostic.render(source));
        eprintln!();
    }
}

fn exit_code(result: &CompileResult) -> i32 {
    if result.success {
        0
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn options_build_from_flags() {
        let options =
            build_options(Some("ts"), Some("cjs"), true, Some("trusted"), true).unwrap();
        assert_eq!(options.dialect, Dialect::Typescript);
        assert_eq!(options.modules, ModuleSystem::CommonJs);
        assert!(!options.runtime_contracts);
        assert_eq!(options.verify, VerifyLevel::Trusted);
        assert!(options.stop_on_first_error);
        assert!(build_options(Some("cobol"), None, false, None, false).is_err());
    }

    #[test]
    fn brace_balance_tracks_strings() {
        assert!(braces_balanced("fn f() { return 1; }"));
        assert!(!braces_balanced("fn f() {"));
        assert!(braces_balanced("let s = \"{\";"));
    }

    #[test]
    fn bare_expressions_get_wrapped() {
        let wrapped = wrap_chunk("1 + 2");
        assert!(wrapped.contains("__repl_entry"));
        assert!(wrapped.contains("IO.write(1 + 2)"));
        assert_eq!(wrap_chunk("fn f() -> Int { return 1; }"),
                   "fn f() -> Int { return 1; }");
    }
}
