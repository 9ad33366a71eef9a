//! codeloader - CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};

use codeloader::frontend::module::UnitState;
use codeloader::frontend::plain::Value;
use codeloader::util::config::{load_config, LoaderConfig};
use codeloader::util::logger::{self, LogLevel};
use codeloader::{file_address, plain_loader, run_file, UnitKind, NAME, VERSION};

/// Load, link and run graphs of plain source units
#[derive(Parser, Debug)]
#[command(name = "codeloader")]
#[command(version = VERSION)]
#[command(about = NAME, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Loader configuration file (JSON)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a source file and everything it imports
    Run {
        /// Source file to run
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Load the file as a module instead of a script
        #[arg(short, long)]
        module: bool,

        /// Block on every fetch
        #[arg(short, long)]
        sync: bool,
    },

    /// Evaluate code from the command line
    Eval {
        /// Code to evaluate
        #[arg(value_name = "CODE")]
        code: String,
    },

    /// Print the dependency graph of a source file in evaluation order
    Graph {
        /// Entry source file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Print version information
    Version,
}

fn main() {
    let args = Args::parse();
    if let Err(e) = run(args) {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => LoaderConfig::default(),
    };
    let level = if args.verbose {
        LogLevel::Debug
    } else {
        config.log_level
    };
    logger::init_with_level(level);

    if args.verbose {
        eprintln!("codeloader version: {}", VERSION);
        eprintln!("Host: {}", std::env::consts::OS);
    }

    if args.config.is_none() {
        config.base_address = current_dir_address()?;
    }

    match args.command {
        Commands::Run { file, module, sync } => {
            let kind = if module {
                UnitKind::Module
            } else {
                UnitKind::Script
            };
            let sync = sync || config.sync;
            let config = config.with_sync(sync);
            let value = run_file(&file, kind, config)?;
            print_value(&value);
        }
        Commands::Eval { code } => {
            let loader = plain_loader(config)?;
            let value = loader.eval(code).context("Failed to evaluate code")?;
            print_value(&value);
        }
        Commands::Graph { file } => {
            print_graph(&file, config)?;
        }
        Commands::Version => {
            println!("{} {}", NAME, VERSION);
        }
    }

    Ok(())
}

fn current_dir_address() -> Result<String> {
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let mut address = cwd.to_string_lossy().replace('\\', "/");
    if !address.ends_with('/') {
        address.push('/');
    }
    Ok(address)
}

fn print_value(value: &Value) {
    if *value != Value::Unit {
        println!("{}", value);
    }
}

fn print_graph(
    file: &Path,
    config: LoaderConfig,
) -> Result<()> {
    let address = file_address(file)?;
    let loader = plain_loader(config)?;
    loader.load(&address, UnitKind::Script);
    loader.run_until_idle();

    for id in loader.evaluation_order() {
        let Some(unit_address) = loader.address(id) else {
            continue;
        };
        let state = loader.state(id).unwrap_or(UnitState::NotStarted);
        let kind = loader.kind(id).unwrap_or(UnitKind::Module);
        let label = format!("{} [{}]", state, kind);
        let label = if state == UnitState::Error {
            label.red().to_string()
        } else {
            label.green().to_string()
        };
        println!("{} {}", unit_address.bold(), label);
        for dependency in loader.dependencies(id) {
            if let Some(dependency) = loader.address(dependency) {
                println!("  -> {}", dependency);
            }
        }
        if let Some(error) = loader.error(id) {
            println!("  {} {}", "!".red(), error);
        }
    }
    Ok(())
}
