use std::path::PathBuf;
use std::process;

use clap::Args;

use super::load_and_compile;

#[derive(Args)]
pub struct RunArgs {
    /// Input source file
    pub input: PathBuf,
    /// Function to run (default: the file's top-level statements)
    #[arg(long)]
    pub entry: Option<String>,
    /// Integer arguments passed to the entry function
    #[arg(long = "arg", value_name = "N", allow_negative_numbers = true)]
    pub args: Vec<i64>,
    /// Instruction budget
    #[arg(long)]
    pub fuel: Option<u64>,
    /// Code stored in division-by-zero faults
    #[arg(long, default_value_t = 1)]
    pub fault_code: i64,
}

pub fn cmd_run(args: RunArgs) {
    let options = jitcalc::CompileOptions::default().with_fault_code(args.fault_code);
    let module = load_and_compile(&args.input, &options);

    let entry = match args.entry {
        Some(entry) => entry,
        None if module.get("__unit0").is_some() => "__unit0".to_string(),
        None => {
            eprintln!(
                "error: '{}' has no top-level statements; pass --entry",
                args.input.display()
            );
            process::exit(1);
        }
    };

    let mut run_options = jitcalc::RunOptions::default();
    if let Some(fuel) = args.fuel {
        run_options = run_options.with_fuel(fuel);
    }
    let program = jitcalc::Program::from_module(module);
    match jitcalc::run(&program, &entry, &args.args, run_options) {
        Ok(exec) => {
            for report in &exec.reports {
                eprintln!("{}", report);
            }
            println!("{}", exec.value);
        }
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    }
}
