//! Tree-walking evaluator: runtime values, callables and the AST walker.

use std::error::Error;
use std::fmt;
use std::io::{self, Write};
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::ast::{Expr, Stmt};
use crate::diag::{ErrorKind, KobyError};
use crate::env::Env;
use crate::token::{Literal, Position, Token, TokenKind};

/// A runtime value.  Cloning is cheap for everything but strings.
#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Number(f64),
    Str(String),
    Bool(bool),
    Callable(Rc<Function>),
}

impl Value {
    /// Only `nil` and `false` are falsy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }
}

/// Language equality: same variant compared structurally, callables by
/// identity, everything across variants unequal.
impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Number(l), Value::Number(r)) => l == r,
            (Value::Str(l), Value::Str(r)) => l == r,
            (Value::Bool(l), Value::Bool(r)) => l == r,
            (Value::Callable(l), Value::Callable(r)) => Rc::ptr_eq(l, r),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Number(n) => write_number(f, *n),
            Value::Str(s) => write!(f, "{}", s),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Callable(func) => write!(f, "{}", func),
        }
    }
}

/// Integer form for whole numbers, otherwise six fractional digits with
/// trailing zeros stripped.
fn write_number(f: &mut fmt::Formatter<'_>, n: f64) -> fmt::Result {
    if n == n.floor() {
        write!(f, "{:.0}", n)
    } else {
        let text = format!("{:.6}", n);
        write!(f, "{}", text.trim_end_matches('0'))
    }
}

/// Signature of a host-provided function: the evaluator's output writer
/// plus the already-evaluated arguments.
pub type NativeFn = fn(&mut dyn Write, &[Value]) -> Result<Value, RuntimeError>;

/// A callable value: user function, lambda or native.
pub struct Function {
    name: String,
    arity: usize,
    body: FunctionBody,
}

enum FunctionBody {
    Native(NativeFn),
    User {
        params: Vec<Token>,
        body: Rc<Vec<Stmt>>,
        closure: Rc<Env>,
    },
}

impl Function {
    pub fn arity(&self) -> usize {
        self.arity
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.body {
            FunctionBody::Native(_) => write!(f, "<function native>"),
            FunctionBody::User { .. } => write!(f, "<function {}>", self.name),
        }
    }
}

/// How a statement finished.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum Control {
    #[default]
    Normal,
    Break,
    Continue,
    Return,
}

/// Carrier returned by every statement execution: a control signal plus the
/// value the statement produced, if any.  The REPL prints the value of the
/// last statement; `None` renders as an empty result.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct ExecSig {
    pub control: Control,
    pub value: Option<Value>,
}

impl ExecSig {
    fn with_value(value: Value) -> ExecSig {
        ExecSig {
            control: Control::Normal,
            value: Some(value),
        }
    }
}

/// Errors the evaluator can raise: a language-level diagnostic, or a host
/// I/O failure while writing program output.
#[derive(Debug)]
pub enum RuntimeError {
    Eval(KobyError),
    Io(io::Error),
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::Eval(e) => write!(f, "{}", e),
            RuntimeError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl Error for RuntimeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RuntimeError::Eval(e) => Some(e),
            RuntimeError::Io(e) => Some(e),
        }
    }
}

impl From<io::Error> for RuntimeError {
    fn from(e: io::Error) -> RuntimeError {
        RuntimeError::Io(e)
    }
}

fn eval_err(kind: ErrorKind, message: impl Into<String>, line: Position) -> RuntimeError {
    RuntimeError::Eval(KobyError::new(kind, message, line))
}

/// Walks statements, threading environments down the tree.
///
/// The current scope is an argument of every step rather than a field, so
/// an error unwinding out of nested blocks restores the caller's scope by
/// construction.
#[derive(Debug)]
pub struct Evaluator<'t, W: Write> {
    output: &'t mut W,
    globals: Rc<Env>,
}

impl<'t, W: Write> Evaluator<'t, W> {
    /// Creates an evaluator whose global scope holds the prelude:
    /// `now()`, `put(x)` and `get()`.
    pub fn new(output: &'t mut W) -> Evaluator<'t, W> {
        let globals = Env::new();
        seed_native(&globals, "now", 0, native_now);
        seed_native(&globals, "put", 1, native_put);
        seed_native(&globals, "get", 0, native_get);
        Evaluator { output, globals }
    }

    /// Drops prelude bindings by name; the REPL strips `put` and `get`.
    pub fn exclude_native_fns(&mut self, names: &[&str]) {
        for name in names {
            self.globals.remove(name);
        }
    }

    /// Runs a program and returns the signal of its last statement.
    /// The first fatal error aborts the run and unwinds to the caller.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<ExecSig, RuntimeError> {
        let globals = self.globals.clone();
        let mut res = ExecSig::default();
        for stmt in statements {
            res = self.run(stmt, globals.clone())?;
        }
        Ok(res)
    }

    pub(crate) fn report_warning(&mut self, warning: &KobyError) -> Result<(), RuntimeError> {
        writeln!(self.output, "Warning: {}", warning)?;
        Ok(())
    }

    fn run(&mut self, stmt: &Stmt, env: Rc<Env>) -> Result<ExecSig, RuntimeError> {
        match stmt {
            Stmt::Expr(expr) => {
                let value = self.eval_expr(expr, env)?;
                Ok(ExecSig::with_value(value))
            }
            Stmt::VarDecl { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.eval_expr(expr, env.clone())?,
                    None => Value::Nil,
                };
                self.define(&env, name, value.clone())?;
                Ok(ExecSig::with_value(value))
            }
            Stmt::FuncDecl { name, params, body } => {
                let func = Function {
                    name: name.lexeme.clone(),
                    arity: params.len(),
                    body: FunctionBody::User {
                        params: params.clone(),
                        body: body.clone(),
                        closure: env.clone(),
                    },
                };
                self.define(&env, name, Value::Callable(Rc::new(func)))?;
                Ok(ExecSig::default())
            }
            Stmt::Block(statements) => self.run_block(statements, Env::with_enclosing(env)),
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.eval_expr(condition, env.clone())?.is_truthy() {
                    self.run(then_branch, env)
                } else if let Some(else_branch) = else_branch {
                    self.run(else_branch, env)
                } else {
                    Ok(ExecSig::default())
                }
            }
            Stmt::While { condition, body } => {
                let mut result = ExecSig::default();
                while self.eval_expr(condition, env.clone())?.is_truthy() {
                    let res = self.run(body, env.clone())?;
                    match res.control {
                        Control::Break => break,
                        Control::Continue => continue,
                        Control::Return => return Ok(res),
                        Control::Normal => result = res,
                    }
                }
                Ok(result)
            }
            Stmt::Break => Ok(ExecSig {
                control: Control::Break,
                value: None,
            }),
            Stmt::Continue => Ok(ExecSig {
                control: Control::Continue,
                value: None,
            }),
            Stmt::Return { value } => {
                let value = match value {
                    Some(expr) => self.eval_expr(expr, env)?,
                    None => Value::Nil,
                };
                Ok(ExecSig {
                    control: Control::Return,
                    value: Some(value),
                })
            }
        }
    }

    /// Runs statements in the given scope until one finishes abruptly.
    fn run_block(&mut self, statements: &[Stmt], env: Rc<Env>) -> Result<ExecSig, RuntimeError> {
        let mut res = ExecSig::default();
        for stmt in statements {
            res = self.run(stmt, env.clone())?;
            if res.control != Control::Normal {
                break;
            }
        }
        Ok(res)
    }

    fn define(&self, env: &Env, name: &Token, value: Value) -> Result<(), RuntimeError> {
        if !env.define(&name.lexeme, value) {
            return Err(eval_err(
                ErrorKind::DuplicateVar,
                format!("Variable '{}' is already defined in this scope.", name.lexeme),
                name.line,
            ));
        }
        Ok(())
    }

    fn eval_expr(&mut self, expr: &Expr, env: Rc<Env>) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                Literal::None | Literal::Nil => Value::Nil,
                Literal::Num(n) => Value::Number(*n),
                Literal::Str(s) => Value::Str(s.clone()),
                Literal::Bool(b) => Value::Bool(*b),
            }),
            Expr::Grouping(inner) => self.eval_expr(inner, env),
            Expr::Variable(name) => env.get(&name.lexeme).ok_or_else(|| {
                eval_err(
                    ErrorKind::UndefinedVar,
                    format!("Undefined variable '{}'.", name.lexeme),
                    name.line,
                )
            }),
            Expr::Assign { name, value } => {
                let value = self.eval_expr(value, env.clone())?;
                if !env.assign(&name.lexeme, value.clone()) {
                    return Err(eval_err(
                        ErrorKind::UndefinedVar,
                        format!("Undefined variable '{}'.", name.lexeme),
                        name.line,
                    ));
                }
                Ok(value)
            }
            Expr::Unary { op, right } => {
                let right = self.eval_expr(right, env)?;
                match op.kind {
                    TokenKind::Minus => Ok(Value::Number(-num_operand(op, &right)?)),
                    TokenKind::Bang => Ok(Value::Bool(!right.is_truthy())),
                    _ => Ok(Value::Nil),
                }
            }
            Expr::Binary { left, op, right } => {
                let left = self.eval_expr(left, env.clone())?;
                let right = self.eval_expr(right, env)?;
                self.eval_binary(op, left, right)
            }
            Expr::Logical { left, op, right } => {
                let left = self.eval_expr(left, env.clone())?;
                // Short-circuit, returning the operand itself rather than a
                // coerced boolean.
                if op.kind == TokenKind::Or {
                    if left.is_truthy() {
                        return Ok(left);
                    }
                } else if !left.is_truthy() {
                    return Ok(left);
                }
                self.eval_expr(right, env)
            }
            Expr::Call {
                callee,
                paren,
                args,
            } => {
                let callee = self.eval_expr(callee, env.clone())?;
                let Value::Callable(function) = callee else {
                    return Err(eval_err(
                        ErrorKind::NotCallable,
                        "Can only call functions.",
                        paren.line,
                    ));
                };

                let mut arguments = Vec::with_capacity(args.len());
                for arg in args {
                    arguments.push(self.eval_expr(arg, env.clone())?);
                }
                if arguments.len() != function.arity {
                    return Err(eval_err(
                        ErrorKind::ArgumentCountMismatch,
                        format!(
                            "Expected {} arguments but got {}.",
                            function.arity,
                            arguments.len()
                        ),
                        paren.line,
                    ));
                }
                self.call_function(&function, &arguments)
            }
            Expr::Lambda { params, body } => {
                // The closure is captured here, at evaluation time.
                let func = Function {
                    name: "lambda".to_string(),
                    arity: params.len(),
                    body: FunctionBody::User {
                        params: params.clone(),
                        body: body.clone(),
                        closure: env,
                    },
                };
                Ok(Value::Callable(Rc::new(func)))
            }
        }
    }

    fn eval_binary(&mut self, op: &Token, left: Value, right: Value) -> Result<Value, RuntimeError> {
        match op.kind {
            TokenKind::Plus => match (&left, &right) {
                (Value::Number(l), Value::Number(r)) => Ok(Value::Number(l + r)),
                // Any other combination concatenates the display forms.
                _ => Ok(Value::Str(format!("{}{}", left, right))),
            },
            TokenKind::Minus => {
                let (l, r) = num_operands(op, &left, &right)?;
                Ok(Value::Number(l - r))
            }
            TokenKind::Star => {
                let (l, r) = num_operands(op, &left, &right)?;
                Ok(Value::Number(l * r))
            }
            TokenKind::Slash => {
                let (l, r) = num_operands(op, &left, &right)?;
                Ok(Value::Number(l / r))
            }
            TokenKind::Percent => {
                let (l, r) = num_operands(op, &left, &right)?;
                Ok(Value::Number(l % r))
            }
            TokenKind::Greater => {
                let (l, r) = num_operands(op, &left, &right)?;
                Ok(Value::Bool(l > r))
            }
            TokenKind::GreaterEqual => {
                let (l, r) = num_operands(op, &left, &right)?;
                Ok(Value::Bool(l >= r))
            }
            TokenKind::Less => {
                let (l, r) = num_operands(op, &left, &right)?;
                Ok(Value::Bool(l < r))
            }
            TokenKind::LessEqual => {
                let (l, r) = num_operands(op, &left, &right)?;
                Ok(Value::Bool(l <= r))
            }
            TokenKind::EqualEqual => Ok(Value::Bool(left == right)),
            TokenKind::BangEqual => Ok(Value::Bool(left != right)),
            _ => Ok(Value::Nil),
        }
    }

    fn call_function(
        &mut self,
        function: &Function,
        arguments: &[Value],
    ) -> Result<Value, RuntimeError> {
        match &function.body {
            FunctionBody::Native(native) => native(&mut *self.output, arguments),
            FunctionBody::User {
                params,
                body,
                closure,
            } => {
                let call_env = Env::with_enclosing(closure.clone());
                for (param, value) in params.iter().zip(arguments.iter()) {
                    self.define(&call_env, param, value.clone())?;
                }
                let sig = self.run_block(body, call_env)?;
                // A body that never hits `return` yields nil.
                if sig.control == Control::Return {
                    Ok(sig.value.unwrap_or(Value::Nil))
                } else {
                    Ok(Value::Nil)
                }
            }
        }
    }
}

fn seed_native(globals: &Env, name: &str, arity: usize, body: NativeFn) {
    let func = Function {
        name: name.to_string(),
        arity,
        body: FunctionBody::Native(body),
    };
    let fresh = globals.define(name, Value::Callable(Rc::new(func)));
    debug_assert!(fresh, "prelude function seeded twice: {}", name);
}

fn num_operand(op: &Token, value: &Value) -> Result<f64, RuntimeError> {
    match value {
        Value::Number(n) => Ok(*n),
        _ => Err(eval_err(
            ErrorKind::OperandInvalid,
            "Operand must be a number.",
            op.line,
        )),
    }
}

fn num_operands(op: &Token, left: &Value, right: &Value) -> Result<(f64, f64), RuntimeError> {
    Ok((num_operand(op, left)?, num_operand(op, right)?))
}

/// Whole seconds since the Unix epoch, as a number.
fn native_now(_output: &mut dyn Write, _args: &[Value]) -> Result<Value, RuntimeError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    Ok(Value::Number(now.as_secs() as f64))
}

/// Prints the display form of its argument, returns nil.
fn native_put(output: &mut dyn Write, args: &[Value]) -> Result<Value, RuntimeError> {
    writeln!(output, "{}", args[0])?;
    Ok(Value::Nil)
}

/// Reads one line from stdin, without the trailing newline.
fn native_get(_output: &mut dyn Write, _args: &[Value]) -> Result<Value, RuntimeError> {
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    Ok(Value::Str(line))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::scanner::Scanner;

    fn run_program(src: &str) -> Result<(String, ExecSig), RuntimeError> {
        let scan = Scanner::from_source(src).scan_tokens();
        assert!(scan.success(), "lex errors in test input: {:?}", scan.errors);
        let parse = Parser::from_tokens(scan.tokens).parse();
        assert!(parse.success(), "parse errors in test input: {:?}", parse.errors);

        let mut out: Vec<u8> = Vec::new();
        let mut evaluator = Evaluator::new(&mut out);
        let sig = evaluator.interpret(&parse.statements)?;
        Ok((String::from_utf8(out).expect("output is utf-8"), sig))
    }

    fn run_output(src: &str) -> String {
        let (out, _) = run_program(src).expect("program failed");
        out
    }

    fn run_err(src: &str) -> KobyError {
        match run_program(src) {
            Err(RuntimeError::Eval(e)) => e,
            other => panic!("expected an evaluation error, got {:?}", other),
        }
    }

    #[test]
    fn arithmetic_respects_precedence() {
        assert_eq!(run_output("put(1 + 2 * 3);"), "7\n");
        assert_eq!(run_output("put((1 + 2) * 3);"), "9\n");
    }

    #[test]
    fn number_display_forms() {
        assert_eq!(run_output("put(10 / 4);"), "2.5\n");
        assert_eq!(run_output("put(1 / 3);"), "0.333333\n");
        assert_eq!(run_output("put(0.1 + 0.2);"), "0.3\n");
        assert_eq!(run_output("put(-2);"), "-2\n");
        assert_eq!(run_output("put(4 / 2);"), "2\n");
    }

    #[test]
    fn modulo_is_numeric_only() {
        assert_eq!(run_output("put(10 % 3);"), "1\n");
        assert_eq!(run_err("put(\"a\" % 2);").kind, ErrorKind::OperandInvalid);
    }

    #[test]
    fn plus_concatenates_display_forms() {
        assert_eq!(run_output("put(\"hi \" + 42);"), "hi 42\n");
        assert_eq!(run_output("put(1 + \" of \" + true);"), "1 of true\n");
        assert_eq!(run_output("put(nil + \"!\");"), "nil!\n");
    }

    #[test]
    fn arithmetic_on_non_numbers_is_rejected() {
        let err = run_err("put(-\"x\");");
        assert_eq!(err.kind, ErrorKind::OperandInvalid);
        assert_eq!(err.kind.code(), 201);
        assert_eq!(run_err("put(true * 2);").kind, ErrorKind::OperandInvalid);
        assert_eq!(run_err("put(nil < 1);").kind, ErrorKind::OperandInvalid);
    }

    #[test]
    fn equality_semantics() {
        assert_eq!(run_output("put(nil == nil);"), "true\n");
        assert_eq!(run_output("put(nil == 0);"), "false\n");
        assert_eq!(run_output("put(\"1\" == 1);"), "false\n");
        assert_eq!(run_output("put(2 == 2);"), "true\n");
        assert_eq!(run_output("put(true != false);"), "true\n");
    }

    #[test]
    fn functions_compare_by_identity() {
        let src = "\
            fun f() {}\n\
            var g = f;\n\
            fun h() {}\n\
            put(f == g);\n\
            put(f == h);";
        assert_eq!(run_output(src), "true\nfalse\n");
    }

    #[test]
    fn zero_and_empty_string_are_truthy() {
        assert_eq!(run_output("if (0) put(\"yes\"); else put(\"no\");"), "yes\n");
        assert_eq!(run_output("if (\"\") put(\"yes\"); else put(\"no\");"), "yes\n");
        assert_eq!(run_output("if (nil) put(\"yes\"); else put(\"no\");"), "no\n");
        assert_eq!(run_output("put(!0);"), "false\n");
    }

    #[test]
    fn logical_operators_return_the_operand() {
        assert_eq!(run_output("put(nil or \"fallback\");"), "fallback\n");
        assert_eq!(run_output("put(1 or 2);"), "1\n");
        assert_eq!(run_output("put(1 and 2);"), "2\n");
        assert_eq!(run_output("put(false and 2);"), "false\n");
    }

    #[test]
    fn logical_operators_short_circuit() {
        let src = "\
            fun trace(x) { put(x); return x; }\n\
            trace(true) or trace(\"skipped\");\n\
            trace(false) and trace(\"skipped\");";
        assert_eq!(run_output(src), "true\nfalse\n");
    }

    #[test]
    fn undefined_variable_is_fatal() {
        let err = run_err("var a = 1;\nput(z);");
        assert_eq!(err.kind, ErrorKind::UndefinedVar);
        assert_eq!(err.kind.code(), 202);
        assert_eq!(err.line, 2);
    }

    #[test]
    fn assignment_to_undefined_variable_is_fatal() {
        assert_eq!(run_err("ghost = 1;").kind, ErrorKind::UndefinedVar);
    }

    #[test]
    fn redeclaration_in_same_scope_is_fatal() {
        let err = run_err("var a = 1; var a = 2;");
        assert_eq!(err.kind, ErrorKind::DuplicateVar);
        assert_eq!(err.line, 1);
    }

    #[test]
    fn shadowing_in_inner_scope_is_fine() {
        let src = "\
            var a = 1;\n\
            { var a = 2; put(a); }\n\
            put(a);";
        assert_eq!(run_output(src), "2\n1\n");
    }

    #[test]
    fn function_redeclaration_is_fatal_too() {
        let err = run_err("fun f() {} fun f() {}");
        assert_eq!(err.kind, ErrorKind::DuplicateVar);
    }

    #[test]
    fn call_checks_arity() {
        let err = run_err("fun f(a, b) {}\nf(1);");
        assert_eq!(err.kind, ErrorKind::ArgumentCountMismatch);
        assert_eq!(err.kind.code(), 203);
        assert_eq!(err.line, 2);
        assert_eq!(err.message, "Expected 2 arguments but got 1.");
    }

    #[test]
    fn only_callables_can_be_called() {
        let err = run_err("var x = 3;\nx();");
        assert_eq!(err.kind, ErrorKind::NotCallable);
        assert_eq!(err.kind.code(), 204);
        assert_eq!(err.line, 2);
    }

    #[test]
    fn function_without_return_yields_nil() {
        assert_eq!(run_output("fun f() { 42; }\nput(f());"), "nil\n");
    }

    #[test]
    fn return_unwinds_nested_blocks() {
        let src = "\
            fun f() {\n\
                { { return 7; } }\n\
                put(\"unreachable\");\n\
            }\n\
            put(f());";
        assert_eq!(run_output(src), "7\n");
    }

    #[test]
    fn recursion() {
        let src = "\
            fun fib(n) {\n\
                if (n < 2) { return n; }\n\
                return fib(n - 1) + fib(n - 2);\n\
            }\n\
            put(fib(10));";
        assert_eq!(run_output(src), "55\n");
    }

    #[test]
    fn closures_capture_their_environment() {
        let src = "\
            fun makeCounter() {\n\
                var n = 0;\n\
                return -> () { n = n + 1; return n; };\n\
            }\n\
            var c = makeCounter();\n\
            put(c()); put(c()); put(c());";
        assert_eq!(run_output(src), "1\n2\n3\n");
    }

    #[test]
    fn counters_are_independent() {
        let src = "\
            fun makeCounter() {\n\
                var n = 0;\n\
                return -> () { n = n + 1; return n; };\n\
            }\n\
            var a = makeCounter();\n\
            var b = makeCounter();\n\
            a(); a();\n\
            put(a()); put(b());";
        assert_eq!(run_output(src), "3\n1\n");
    }

    #[test]
    fn closure_sees_later_rebinding_of_the_same_binding() {
        let src = "\
            fun make() {\n\
                var x = 1;\n\
                fun read() { return x; }\n\
                x = 2;\n\
                return read;\n\
            }\n\
            var r = make();\n\
            put(r());";
        assert_eq!(run_output(src), "2\n");
    }

    #[test]
    fn free_variables_resolve_through_the_closure_not_the_caller() {
        let src = "\
            var x = \"global\";\n\
            fun read() { return x; }\n\
            fun caller() {\n\
                var x = \"local\";\n\
                return read();\n\
            }\n\
            put(caller());";
        assert_eq!(run_output(src), "global\n");
    }

    #[test]
    fn lambdas_are_first_class() {
        let src = "\
            var twice = -> (f, x) { return f(f(x)); };\n\
            var inc = -> (n) { return n + 1; };\n\
            put(twice(inc, 5));";
        assert_eq!(run_output(src), "7\n");
    }

    #[test]
    fn while_loops_with_break_and_continue() {
        let src = "\
            var s = 0;\n\
            var i = 0;\n\
            while (true) {\n\
                i = i + 1;\n\
                if (i > 10) break;\n\
                if (i % 2 == 0) continue;\n\
                s = s + i;\n\
            }\n\
            put(s);";
        assert_eq!(run_output(src), "25\n");
    }

    #[test]
    fn for_loop_desugars_and_breaks() {
        let src = "\
            var s = 0;\n\
            for (var i = 0; i < 10; i = i + 1) {\n\
                if (i == 5) break;\n\
                s = s + i;\n\
            }\n\
            put(s);";
        assert_eq!(run_output(src), "10\n");
    }

    #[test]
    fn return_propagates_out_of_a_loop() {
        let src = "\
            fun firstOver(limit) {\n\
                for (var i = 0; ; i = i + 1) {\n\
                    if (i * i > limit) { return i; }\n\
                }\n\
            }\n\
            put(firstOver(10));";
        assert_eq!(run_output(src), "4\n");
    }

    #[test]
    fn loop_variable_scope_ends_with_the_loop() {
        let err = run_err("for (var i = 0; i < 1; i = i + 1) {}\nput(i);");
        assert_eq!(err.kind, ErrorKind::UndefinedVar);
    }

    #[test]
    fn callable_display_forms() {
        assert_eq!(run_output("put(put);"), "<function native>\n");
        assert_eq!(run_output("fun greet() {}\nput(greet);"), "<function greet>\n");
        assert_eq!(run_output("put(-> () {});"), "<function lambda>\n");
    }

    #[test]
    fn put_returns_nil() {
        assert_eq!(run_output("put(put(1));"), "1\nnil\n");
    }

    #[test]
    fn now_returns_a_number() {
        let (_, sig) = run_program("now();").expect("program failed");
        match sig.value {
            Some(Value::Number(n)) => assert!(n > 0.0),
            other => panic!("expected a number, got {:?}", other),
        }
    }

    #[test]
    fn last_statement_signal_feeds_the_repl() {
        let (_, sig) = run_program("1 + 1;").expect("program failed");
        assert_eq!(sig.control, Control::Normal);
        assert_eq!(sig.value, Some(Value::Number(2.0)));

        let (_, sig) = run_program("var a = 5;").expect("program failed");
        assert_eq!(sig.value, Some(Value::Number(5.0)));

        let (_, sig) = run_program("fun f() {}").expect("program failed");
        assert_eq!(sig.value, None);
    }

    #[test]
    fn empty_program_runs_silently() {
        let (out, sig) = run_program("").expect("program failed");
        assert_eq!(out, "");
        assert_eq!(sig, ExecSig::default());
    }

    #[test]
    fn excluded_natives_disappear() {
        let scan = Scanner::from_source("put(1);").scan_tokens();
        let parse = Parser::from_tokens(scan.tokens).parse();
        let mut out: Vec<u8> = Vec::new();
        let mut evaluator = Evaluator::new(&mut out);
        evaluator.exclude_native_fns(&["put", "get"]);
        match evaluator.interpret(&parse.statements) {
            Err(RuntimeError::Eval(e)) => assert_eq!(e.kind, ErrorKind::UndefinedVar),
            other => panic!("expected an undefined-variable error, got {:?}", other),
        }
    }

    #[test]
    fn side_effects_run_left_to_right() {
        let src = "\
            fun trace(x) { put(x); return x; }\n\
            trace(1) + trace(2) * trace(3);";
        assert_eq!(run_output(src), "1\n2\n3\n");
    }

    #[test]
    fn evaluation_is_deterministic() {
        let src = "fun f(n) { return n * 2; }\nput(f(2) + f(3));";
        assert_eq!(run_output(src), run_output(src));
    }
}
