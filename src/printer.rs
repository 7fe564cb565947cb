//! Rendering for the command-line drivers: values on stdout, errors on
//! stderr.

use crate::eval::{ExecSig, Value};
use crate::interpreter::PipelineError;

const ITALIC: &str = "\x1b[3m";
const RESET: &str = "\x1b[0m";

pub fn print_value(value: &Value) {
    println!("{}", value);
}

/// REPL result line: the display form of the value, or an italicized
/// `<empty>` when the statement produced none.
pub fn print_repl_result(sig: &ExecSig) {
    match &sig.value {
        Some(value) => print_value(value),
        None => println!("{}<empty>{}", ITALIC, RESET),
    }
}

pub fn print_error(err: &PipelineError) {
    eprintln!("{}", err);
}
