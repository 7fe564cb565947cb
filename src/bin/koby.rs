//! Koby command-line.
//!
//! `koby run <path>` interprets a file, `koby repl` drops into an
//! interactive loop against a persistent interpreter, `koby help` prints
//! usage.

use std::env;
use std::fs;
use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::Context;

use koby::interpreter::Interpreter;
use koby::printer;

fn main() -> anyhow::Result<ExitCode> {
    let args = env::args().skip(1).collect::<Vec<_>>();

    let Some(command) = args.first() else {
        print_help();
        return Ok(ExitCode::FAILURE);
    };

    match command.as_str() {
        "help" => {
            print_help();
            Ok(ExitCode::SUCCESS)
        }
        "run" => match args.get(1) {
            Some(path) => run_file(path),
            None => {
                eprintln!("Usage: koby run <filename>");
                Ok(ExitCode::FAILURE)
            }
        },
        "repl" => run_repl(),
        unknown => {
            eprintln!("Unknown command: {}", unknown);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn print_help() {
    println!("Usage: koby <command> [file path]");
    println!("Commands:");
    println!("  help - Display this help message.");
    println!("  run  - Run the code from file path.");
    println!("  repl - Start the REPL.");
    println!("       - Type 'exit' to exit the REPL.");
}

fn run_file(path: &str) -> anyhow::Result<ExitCode> {
    let source =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path))?;

    let mut stdout = io::stdout();
    let mut interp = Interpreter::new(&mut stdout);
    match interp.eval(&source) {
        Ok(_) => Ok(ExitCode::SUCCESS),
        Err(err) => {
            printer::print_error(&err);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn run_repl() -> anyhow::Result<ExitCode> {
    println!("Koby REPL");

    let stdin = io::stdin();
    let mut program_out = io::stdout();
    let mut interp = Interpreter::new(&mut program_out);
    interp.exclude_native_fns(&["put", "get"]);

    let mut input = String::new();
    loop {
        print!("\x1b[1;32m>>> \x1b[0m");
        io::stdout().flush()?;

        input.clear();
        if stdin.read_line(&mut input)? == 0 {
            println!();
            break;
        }

        let mut line = input.trim_end_matches(|c| c == '\n' || c == '\r').to_string();
        if line == "exit" {
            println!("Goodbye!");
            break;
        }
        if line.trim().is_empty() {
            continue;
        }
        // Convenience: a missing trailing semicolon is supplied.
        if !line.ends_with(';') {
            line.push(';');
        }

        match interp.eval(&line) {
            Ok(sig) => printer::print_repl_result(&sig),
            Err(err) => printer::print_error(&err),
        }
    }

    Ok(ExitCode::SUCCESS)
}
