use std::path::PathBuf;

use clap::Args;

use super::load_and_compile;

#[derive(Args)]
pub struct HashArgs {
    /// Input source file
    pub input: PathBuf,
    /// Print full 64-character hashes
    #[arg(long)]
    pub full: bool,
}

pub fn cmd_hash(args: HashArgs) {
    let module = load_and_compile(&args.input, &jitcalc::CompileOptions::default());
    let short = |hash: &blake3::Hash| -> String {
        let hex = hash.to_hex();
        if args.full {
            hex.to_string()
        } else {
            hex[..16].to_string()
        }
    };

    eprintln!("File: {} {}", short(&jitcalc::module_hash(&module)), args.input.display());
    let mut sorted = jitcalc::function_hashes(&module);
    sorted.sort_by(|a, b| a.0.cmp(&b.0));
    for (name, hash) in sorted {
        println!("  {} {}", short(&hash), name);
    }
}
