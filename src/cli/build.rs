use std::path::PathBuf;
use std::process;

use clap::Args;

use super::{default_output, load_and_compile};

#[derive(Args)]
pub struct BuildArgs {
    /// Input source file
    pub input: PathBuf,
    /// Write the IR here instead of stdout (`-o -` also means stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Write the IR next to the input as `<input>.ir`
    #[arg(long, conflicts_with = "output")]
    pub emit: bool,
    /// Skip the structural verifier
    #[arg(long)]
    pub no_verify: bool,
}

pub fn cmd_build(args: BuildArgs) {
    let options = jitcalc::CompileOptions::default().with_verify(!args.no_verify);
    let module = load_and_compile(&args.input, &options);
    let text = module.to_string();

    let target = match (&args.output, args.emit) {
        (Some(path), _) if path.as_os_str() != "-" => Some(path.clone()),
        (None, true) => Some(default_output(&args.input)),
        _ => None,
    };
    match target {
        Some(path) => {
            if let Err(e) = std::fs::write(&path, &text) {
                eprintln!("error: cannot write '{}': {}", path.display(), e);
                process::exit(1);
            }
            eprintln!(
                "Compiled {} -> {} ({} functions)",
                args.input.display(),
                path.display(),
                module.functions.len()
            );
        }
        None => print!("{}", text),
    }
}
