//! API to control the interpreter.

use std::io::prelude::*;
use std::rc::Rc;

use tracing::instrument;

use crate::diag::Diagnostic;
use crate::eval::{Env, Evaluator, RuntimeError};
use crate::parser::Parser;

/// Tree-walk interpreter.
///
/// Parses and evaluates whole programs; `print` output and rendered
/// diagnostics both go to the output sink.  The global environment persists
/// across [`Interpreter::run`] calls, so code defined by one run is callable
/// from the next.
///
/// # Example
///
/// ```
/// use tlox::interpreter::Interpreter;
///
/// let mut output: Vec<u8> = Vec::new();
/// let mut interp = Interpreter::new(&mut output);
///
/// let script = r#"
///     fun max(x, y) {
///         if (x > y) {
///             return x;
///         }
///         return y;
///     }
///     print max(10, 20);
/// "#;
/// interp.run("demo.lox", script).expect("interpreter error");
///
/// assert_eq!(output, b"20\n");
/// ```
#[derive(Debug)]
pub struct Interpreter<'t, W: Write> {
    output: &'t mut W,
    globals: Rc<Env>,
}

/// Errors the interpreter can raise.
#[derive(Debug, thiserror::Error)]
pub enum LoxError {
    /// The program did not parse; evaluation was not attempted.
    #[error("{} parse error(s)", .0.len())]
    Parse(Vec<Diagnostic>),

    /// The program parsed but failed during evaluation.
    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),
}

impl<'t, W: Write> Interpreter<'t, W> {
    pub fn new(output: &'t mut W) -> Interpreter<'t, W> {
        Interpreter {
            output,
            globals: Env::global(),
        }
    }

    /// Parse and evaluate `source`.  `file` names the script in rendered
    /// diagnostics.  Diagnostics are written to the output sink; the error
    /// carries them for programmatic use.
    #[instrument(skip_all, fields(file = file))]
    pub fn run(&mut self, file: &str, source: &str) -> Result<(), LoxError> {
        let parsed = Parser::new(file, source).parse_program();
        if parsed.has_errors() {
            for diag in &parsed.diagnostics {
                writeln!(self.output, "{}", diag.render(source)).map_err(RuntimeError::from)?;
            }
            return Err(LoxError::Parse(parsed.diagnostics));
        }

        let result = {
            let mut evaluator = Evaluator::new(&mut *self.output, self.globals.clone());
            evaluator.eval_program(&parsed.program)
        };
        if let Err(e) = result {
            writeln!(self.output, "{}", e.render(file, source)).map_err(RuntimeError::from)?;
            return Err(LoxError::Runtime(e));
        }
        Ok(())
    }
}
