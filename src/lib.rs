pub mod analyzer;
pub mod ast;
pub mod callable;
pub mod environment;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod scope;
pub mod token;
pub mod typed;

use crate::analyzer::{Analyzer, SemanticError};
use crate::environment::Value;
use crate::interpreter::{Interpreter, RuntimeError};
use crate::lexer::LexError;
use crate::parser::ParseError;
use std::io::Write;
use thiserror::Error;

/// Failure of any stage of [`run`].
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Semantic(#[from] SemanticError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl Error {
    /// Source offset of the failure, for lex and parse errors.
    pub fn index(&self) -> Option<usize> {
        match self {
            Error::Lex(e) => Some(e.index()),
            Error::Parse(e) => Some(e.index()),
            Error::Semantic(_) | Error::Runtime(_) => None,
        }
    }
}

/// Lexes, parses, analyzes and interprets `source`, returning the value of
/// `main/0`. `print` writes to `output`.
pub fn run(source: &str, output: Box<dyn Write + '_>) -> Result<Value, Error> {
    let tokens = lexer::lex(source)?;
    let parsed = parser::parse(tokens)?;
    let analyzed = Analyzer::new().analyze(&parsed)?;
    let mut interpreter = Interpreter::with_output(output);
    Ok(interpreter.interpret(&analyzed)?)
}
