//! `codebench` entry point.

fn main() {
    if let Err(e) = llm_codebench_cli::run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
