//! API to control the interpreter.

use std::error::Error;
use std::fmt;
use std::io::Write;

use crate::diag::KobyError;
use crate::eval::{Evaluator, ExecSig, RuntimeError};
use crate::parser::Parser;
use crate::scanner::Scanner;

/// Runs the whole pipeline, source text in, execution signal out.
///
/// Scanning, parsing and evaluation happen in sequence; a stage only runs
/// when the previous one reported no errors.  Globals persist across
/// [`Interpreter::eval`] calls, which is what the REPL builds on.
///
/// # Example
///
/// Define a function in one call and use it in later ones:
///
/// ```
/// # use koby::interpreter::{Interpreter, PipelineError};
/// let mut output: Vec<u8> = Vec::new();
/// let mut interp = Interpreter::new(&mut output);
///
/// interp.eval("fun max(x, y) { if (x > y) { return x; } return y; }")?;
/// interp.eval("put(max(10, 20));")?;
/// interp.eval("put(max(5, 4));")?;
///
/// assert_eq!(output, b"20\n5\n");
/// # Ok::<(), PipelineError>(())
/// ```
#[derive(Debug)]
pub struct Interpreter<'t, W: Write> {
    evaluator: Evaluator<'t, W>,
}

/// Errors surfaced by [`Interpreter::eval`], tagged with the stage that
/// produced them.  Scan and parse errors come in batches; evaluation stops
/// at the first fatal one.
#[derive(Debug)]
pub enum PipelineError {
    Scan(Vec<KobyError>),
    Parse(Vec<KobyError>),
    Eval(RuntimeError),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Scan(errors) | PipelineError::Parse(errors) => {
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
            PipelineError::Eval(err) => write!(f, "{}", err),
        }
    }
}

impl Error for PipelineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PipelineError::Scan(_) | PipelineError::Parse(_) => None,
            PipelineError::Eval(err) => Some(err),
        }
    }
}

impl From<RuntimeError> for PipelineError {
    fn from(err: RuntimeError) -> PipelineError {
        PipelineError::Eval(err)
    }
}

impl<'t, W: Write> Interpreter<'t, W> {
    pub fn new(output: &'t mut W) -> Interpreter<'t, W> {
        Interpreter {
            evaluator: Evaluator::new(output),
        }
    }

    /// Runs `source` against the persistent global scope and returns the
    /// signal of its last statement.
    ///
    /// Parse warnings are written to the output stream with a `Warning: `
    /// prefix; they never fail the pipeline.
    pub fn eval(&mut self, source: &str) -> Result<ExecSig, PipelineError> {
        let scan = Scanner::from_source(source).scan_tokens();
        if !scan.success() {
            return Err(PipelineError::Scan(scan.errors));
        }

        let parse = Parser::from_tokens(scan.tokens).parse();
        for warning in &parse.warnings {
            self.evaluator.report_warning(warning)?;
        }
        if !parse.success() {
            return Err(PipelineError::Parse(parse.errors));
        }

        Ok(self.evaluator.interpret(&parse.statements)?)
    }

    /// Removes prelude bindings by name; the REPL strips `put` and `get`
    /// before its first prompt.
    pub fn exclude_native_fns(&mut self, names: &[&str]) {
        self.evaluator.exclude_native_fns(names);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::ErrorKind;
    use crate::eval::Value;

    fn interpret(source: &str) -> Result<String, PipelineError> {
        let mut raw: Vec<u8> = Vec::new();
        let mut interp = Interpreter::new(&mut raw);
        interp.eval(source)?;
        Ok(String::from_utf8(raw).expect("output is utf-8"))
    }

    #[test]
    fn whole_pipeline_runs() -> Result<(), PipelineError> {
        assert_eq!(interpret("put(3 * 2);")?, "6\n");
        Ok(())
    }

    #[test]
    fn scan_errors_stop_the_pipeline() {
        match interpret("put(1); §") {
            Err(PipelineError::Scan(errors)) => {
                assert_eq!(errors[0].kind, ErrorKind::LexicalError);
            }
            other => panic!("expected scan errors, got {:?}", other),
        }
    }

    #[test]
    fn parse_errors_prevent_evaluation() {
        let mut raw: Vec<u8> = Vec::new();
        let mut interp = Interpreter::new(&mut raw);
        match interp.eval("put(1); var = 2;") {
            Err(PipelineError::Parse(errors)) => {
                assert_eq!(errors[0].kind, ErrorKind::VarNameMissing);
            }
            other => panic!("expected parse errors, got {:?}", other),
        }
        // The valid statement before the broken one must not have run.
        assert!(raw.is_empty());
    }

    #[test]
    fn eval_errors_carry_their_code_and_line() {
        match interpret("put(z);") {
            Err(PipelineError::Eval(RuntimeError::Eval(err))) => {
                assert_eq!(err.kind.code(), 202);
                assert_eq!(err.line, 1);
            }
            other => panic!("expected an eval error, got {:?}", other),
        }
    }

    #[test]
    fn pipeline_error_renders_every_diagnostic() {
        let err = match interpret("var = 1; var = 2;") {
            Err(err) => err,
            Ok(_) => panic!("expected parse errors"),
        };
        let rendered = err.to_string();
        assert_eq!(rendered.matches("[Error 104]").count(), 2);
    }

    #[test]
    fn globals_persist_across_eval_calls() -> Result<(), PipelineError> {
        let mut raw: Vec<u8> = Vec::new();
        let mut interp = Interpreter::new(&mut raw);
        interp.eval("var total = 0;")?;
        interp.eval("total = total + 40;")?;
        let sig = interp.eval("total + 2;")?;
        assert_eq!(sig.value, Some(Value::Number(42.0)));
        Ok(())
    }

    #[test]
    fn arity_warning_lands_in_the_output_stream() -> Result<(), PipelineError> {
        let params = (0..255)
            .map(|n| format!("p{}", n))
            .collect::<Vec<_>>()
            .join(", ");
        let out = interpret(&format!("-> ({}) {{}};", params))?;
        assert!(out.starts_with("Warning: [Error 113]"), "got: {}", out);
        Ok(())
    }

    #[test]
    fn excluded_prelude_names_are_gone() {
        let mut raw: Vec<u8> = Vec::new();
        let mut interp = Interpreter::new(&mut raw);
        interp.exclude_native_fns(&["put", "get"]);
        match interp.eval("put(1);") {
            Err(PipelineError::Eval(RuntimeError::Eval(err))) => {
                assert_eq!(err.kind, ErrorKind::UndefinedVar);
            }
            other => panic!("expected an undefined-variable error, got {:?}", other),
        }
        // `now` stays available.
        assert!(interp.eval("now();").is_ok());
    }
}
