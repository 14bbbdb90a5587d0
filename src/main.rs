//! Covenant compiler entry point.

fn main() {
    std::process::exit(covenant::cli::run_cli());
}
