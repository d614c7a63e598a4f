//! Trigger volume daemon
//!
//! Run with: cargo run -p void_volume_runtime -- [trace-file]
//!
//! With a trace file, every line is replayed and the output printed. Without
//! one, commands are read interactively from stdin.

use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use void_volume_runtime::{parse_line, RuntimeConfig, Session};
use void_volume_store::persist;

fn main() -> ExitCode {
    // Initialize logging
    let default_filter = if std::env::var("VOLUMED_DEBUG").is_ok() { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    let config = RuntimeConfig::load();
    config.print_summary();

    let store = match persist::load(&config.store_path) {
        Ok(store) => store,
        Err(e) => {
            log::error!("Failed to load volumes from {}: {}", config.store_path.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let mut session = Session::new(config, store);

    let result = match std::env::args().nth(1) {
        Some(path) => run_trace(&mut session, &path),
        None => run_shell(&mut session),
    };

    if session.is_dirty() {
        if let Err(e) = session.save() {
            log::error!("Failed to save volumes: {}", e);
            return ExitCode::FAILURE;
        }
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Replay a trace file
fn run_trace(session: &mut Session, path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)?;
    log::info!("Replaying {}", path);
    for line in session.run_script(&text)? {
        println!("{}", line);
    }
    Ok(())
}

/// Read commands from stdin until EOF or `exit`
fn run_shell(session: &mut Session) -> Result<(), Box<dyn std::error::Error>> {
    println!("Void Volumes - interactive mode");
    println!("Type 'exit' to quit.");
    println!();

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut number = 0;

    loop {
        print!("volumed> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        number += 1;

        let cmd = line.trim();
        if cmd == "exit" || cmd == "quit" {
            println!("Shutting down...");
            break;
        }

        match parse_line(number, cmd) {
            Ok(Some(command)) => {
                for out in session.execute(command) {
                    println!("{}", out);
                }
            }
            Ok(None) => {}
            Err(e) => println!("{}", e),
        }
    }
    Ok(())
}
