//! Lyra REPL
//!
//! Reads a line, evaluates it, prints the result as ` => value`. Errors
//! print their kind and message and the loop continues. A script file or
//! `-e` expression runs batch-style; `--test` runs the embedded suite.

mod config;
mod suite;

use clap::Parser;
use config::ReplConfig;
use lyra_core::Machine;
use rustyline::DefaultEditor;
use rustyline::config::Configurer;
use rustyline::error::ReadlineError;
use std::path::PathBuf;
use std::process;
use tracing::debug;

#[derive(Parser)]
#[command(name = "lyra")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Lyra Lisp interpreter", long_about = None)]
struct Cli {
    /// Script file to evaluate instead of entering the REPL
    script: Option<PathBuf>,

    /// Evaluate one expression, print the result and exit
    #[arg(short = 'e', long = "eval", value_name = "EXPR")]
    eval: Option<String>,

    /// Run the embedded test suite
    #[arg(long)]
    test: bool,

    /// Config file path (defaults to the platform config directory)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Skip the standard library and bootstrap program
    #[arg(long)]
    no_init: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.test {
        match suite::run() {
            Ok(()) => {
                println!("all tests passed");
                return;
            }
            Err(e) => {
                eprintln!("suite failed: {}", e);
                process::exit(1);
            }
        }
    }

    let cfg = load_config(cli.config.as_deref());
    let mut machine = Machine::new(!cli.no_init);

    if let Some(init_file) = &cfg.init_file {
        run_file(&mut machine, init_file);
    }

    if let Some(expr) = &cli.eval {
        match machine.evaluate(expr) {
            Ok(v) => println!("{}", v.print(false)),
            Err(e) => {
                eprintln!("{}: {}", e.kind(), e);
                process::exit(1);
            }
        }
        return;
    }

    if let Some(script) = &cli.script {
        if !run_file(&mut machine, script) {
            process::exit(1);
        }
        return;
    }

    interactive(&mut machine, &cfg);
}

fn load_config(explicit: Option<&std::path::Path>) -> ReplConfig {
    let path = match explicit {
        Some(p) => Some(p.to_path_buf()),
        None => ReplConfig::default_path(),
    };
    let Some(path) = path else {
        return ReplConfig::default();
    };
    match ReplConfig::load(&path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    }
}

/// Evaluate a whole file; only `message` output and errors print.
fn run_file(machine: &mut Machine, path: &std::path::Path) -> bool {
    let text = match std::fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Failed to read {}: {}", path.display(), e);
            return false;
        }
    };
    match machine.evaluate(&text) {
        Ok(_) => true,
        Err(e) => {
            eprintln!("{}: {}", e.kind(), e);
            false
        }
    }
}

fn interactive(machine: &mut Machine, cfg: &ReplConfig) {
    let mut editor = match DefaultEditor::new() {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Failed to initialize line editor: {}", e);
            process::exit(1);
        }
    };
    if let Err(e) = editor.set_max_history_size(cfg.history_limit) {
        debug!("could not size history: {}", e);
    }
    let history_path = ReplConfig::history_path();
    if let Some(path) = &history_path {
        // A missing history file on first launch is expected.
        let _ = editor.load_history(path);
    }

    loop {
        match editor.readline(&cfg.prompt) {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(&line);
                debug!(input = %line, "evaluating");
                match machine.evaluate(&line) {
                    Ok(v) => println!(" => {}", v.print(false)),
                    Err(e) => eprintln!("{}: {}", e.kind(), e),
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {}", e);
                break;
            }
        }
    }

    if let Some(path) = &history_path {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Err(e) = editor.save_history(path) {
            debug!("could not save history: {}", e);
        }
    }
}
