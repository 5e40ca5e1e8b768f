//! `etch` — the CLI front end for the pipeline wired up in `etch-driver`'s
//! library half (spec.md §1: "CLI argument parsing... out of scope" names
//! the core's non-goals, not this glue binary's). Grounded on the donor
//! CLI's `clap::Parser`/`Subcommand` derive shape (`raya-cli/src/main.rs`)
//! and its `anyhow`-at-the-edge error handling (`raya-cli/src/commands/run.rs`).

mod diagnostics;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};

use etch_driver::{Config, Mode};

#[derive(Parser)]
#[command(name = "etch", about = "Etch compiler and virtual machine", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one of the built-in demo programs through the full pipeline.
    Run {
        /// Name of a demo program (see `etch list`).
        program: String,
        #[arg(long)]
        release: bool,
        #[arg(short, long)]
        verbose: bool,
    },
    /// List the demo programs `run` accepts.
    List,
}

fn main() -> Result<()> {
    match Cli::parse().command {
        Commands::List => {
            for name in etch_driver::demos::NAMES {
                println!("{name}");
            }
            Ok(())
        }
        Commands::Run { program, release, verbose } => run(&program, release, verbose),
    }
}

fn run(name: &str, release: bool, verbose: bool) -> Result<()> {
    let program = etch_driver::demos::lookup(name)
        .ok_or_else(|| anyhow!("unknown program '{name}' (run `etch list` to see the available ones)"))?;

    let mode = if release { Mode::Release } else { Mode::Debug };
    let config = Config::new(format!("<demo:{name}>"), mode, verbose);

    match etch_driver::run(program, &config) {
        Ok(output) => {
            if verbose {
                eprintln!("etch: result = {} (cache hit: {})", output.value, output.used_cache);
            }
            Ok(())
        }
        Err(err) => {
            diagnostics::report(name, etch_driver::demos::source_text(name), &err);
            std::process::exit(1);
        }
    }
}
