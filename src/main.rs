use clap::Parser;
use std::process;

use sprout::cli;
use sprout::cli::commands::{Cli, Commands};

fn main() {
    let cli_args = Cli::parse();
    let json_output = cli_args.json;

    let exit_code = match cli_args.command {
        Commands::Init => cli::init::run(json_output),
        Commands::Plant(cmd) => cli::plant::run(cmd, json_output),
        Commands::Template(cmd) => cli::template::run(cmd, json_output),
        Commands::Chain(cmd) => cli::chain::run(cmd, json_output),
        Commands::Assignment(cmd) => cli::assignment::run(cmd, json_output),
        Commands::Task(cmd) => cli::task::run(cmd, json_output),
        Commands::Schedule => cli::schedule::run(json_output),
        Commands::Status => cli::status::run(json_output),
    };

    process::exit(exit_code);
}
