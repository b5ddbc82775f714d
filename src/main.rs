use clap::{Parser, Subcommand};

mod cli;

use cli::build::BuildArgs;
use cli::hash::HashArgs;
use cli::repl::ReplArgs;
use cli::run::RunArgs;

#[derive(Parser)]
#[command(
    name = "jitcalc",
    version,
    about = "Calculator language compiler: SSA IR with checked division"
)]
struct Cli {
    /// Log compiler events to stderr (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a source file and print its IR
    Build(BuildArgs),
    /// Compile and execute a source file
    Run(RunArgs),
    /// Show content hashes of compiled functions
    Hash(HashArgs),
    /// Interactive session; end each input with a `;` line
    Repl(ReplArgs),
}

fn main() {
    let cli = Cli::parse();
    cli::init_tracing(cli.verbose);

    match cli.command {
        Command::Build(args) => cli::build::cmd_build(args),
        Command::Run(args) => cli::run::cmd_run(args),
        Command::Hash(args) => cli::hash::cmd_hash(args),
        Command::Repl(args) => cli::repl::cmd_repl(args),
    }
}
