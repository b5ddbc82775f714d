use std::io::{self, BufRead, Write};

use clap::Args;

#[derive(Args)]
pub struct ReplArgs {
    /// Instruction budget per evaluation
    #[arg(long)]
    pub fuel: Option<u64>,
    /// Print the IR of every unit
    #[arg(long)]
    pub show_ir: bool,
}

/// Inputs end at a line holding only `;`. A line holding only `q` quits.
pub fn cmd_repl(args: ReplArgs) {
    let mut run_options = jitcalc::RunOptions::default();
    if let Some(fuel) = args.fuel {
        run_options = run_options.with_fuel(fuel);
    }
    let mut session = jitcalc::Session::new().with_run_options(run_options);
    let stdin = io::stdin();
    let mut buffer = String::new();

    prompt(&buffer);
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                eprintln!("error: {}", e);
                break;
            }
        };
        match line.trim() {
            "q" if buffer.is_empty() => break,
            ";" => {
                eval_unit(&mut session, &buffer, args.show_ir);
                buffer.clear();
            }
            _ => {
                buffer.push_str(&line);
                buffer.push('\n');
            }
        }
        prompt(&buffer);
    }
}

fn prompt(buffer: &str) {
    print!("{}", if buffer.is_empty() { "> " } else { ". " });
    let _ = io::stdout().flush();
}

fn eval_unit(session: &mut jitcalc::Session, source: &str, show_ir: bool) {
    let filename = format!("<input {}>", session.units());
    let emission = match session.compile_unit(source) {
        Ok(emission) => emission,
        Err(errors) => {
            jitcalc::render_diagnostics(&errors, &filename, source);
            return;
        }
    };
    if show_ir {
        print!("{}", emission.module);
    }
    for export in &emission.exports {
        eprintln!("defined {}/{}", export.name, export.arity);
    }
    let Some(unit) = emission.unit else {
        return;
    };
    match jitcalc::run(session.program(), &unit, &[], *session.run_options()) {
        Ok(exec) => {
            for report in &exec.reports {
                eprintln!("{}", report);
            }
            println!("{}", exec.value);
        }
        Err(e) => eprintln!("error: {}", e),
    }
}
