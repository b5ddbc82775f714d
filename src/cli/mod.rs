pub mod build;
pub mod hash;
pub mod repl;
pub mod run;

use std::path::{Path, PathBuf};
use std::process;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the stderr log subscriber. `RUST_LOG` wins over `--verbose`.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "jitcalc=debug" } else { "jitcalc=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

/// Read a source file, or exit with an error.
pub fn load_source(input: &Path) -> String {
    match std::fs::read_to_string(input) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", input.display(), e);
            process::exit(1);
        }
    }
}

/// Compile `input` with `options`; diagnostics are rendered and the process
/// exits on failure.
pub fn load_and_compile(
    input: &Path,
    options: &jitcalc::CompileOptions,
) -> jitcalc::Module {
    let source = load_source(input);
    let filename = input.to_string_lossy();
    match jitcalc::compile_with_options(&source, &filename, options) {
        Ok(module) => module,
        Err(errors) => {
            eprintln!("error: compilation failed ({} error(s))", errors.len());
            process::exit(1);
        }
    }
}

/// Default output path: `<input>.ir`.
pub fn default_output(input: &Path) -> PathBuf {
    input.with_extension("ir")
}
