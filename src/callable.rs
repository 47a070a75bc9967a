use crate::environment::{Binding, Value};
use crate::interpreter::{Flow, Interpreter, RuntimeError};
use crate::scope::ScopeId;
use crate::typed;
use log::trace;
use std::fmt;
use std::fmt::Debug;

/// Runtime binding of a function name and arity.
#[derive(Clone, Debug)]
pub enum Callable<'a> {
    Native(NativeFunction<'a>),
    User(UserFunction<'a>),
}

impl<'a> Callable<'a> {
    pub fn call(
        &self,
        interpreter: &mut Interpreter<'a>,
        arguments: &[Value],
    ) -> Result<Value, RuntimeError> {
        match self {
            Callable::Native(function) => (function.call)(interpreter, arguments),
            Callable::User(function) => function.call(interpreter, arguments),
        }
    }
}

/// A user function together with the frame it was defined in.
#[derive(Clone, Debug)]
pub struct UserFunction<'a> {
    pub declaration: &'a typed::Function,
    pub closure: ScopeId,
}

impl<'a> UserFunction<'a> {
    pub fn new(declaration: &'a typed::Function, closure: ScopeId) -> UserFunction<'a> {
        UserFunction {
            declaration,
            closure,
        }
    }

    /// Runs the body in a fresh child of the defining frame. Falling off
    /// the end returns `Nil`.
    pub fn call(
        &self,
        interpreter: &mut Interpreter<'a>,
        arguments: &[Value],
    ) -> Result<Value, RuntimeError> {
        let declaration = self.declaration;
        trace!("calling {}/{}", declaration.name, arguments.len());
        interpreter.in_block(self.closure, |interpreter| {
            for (name, value) in declaration.parameters.iter().zip(arguments) {
                interpreter.define(name, Binding::new(true, value.clone()));
            }
            match interpreter.execute_block(&declaration.statements)? {
                Flow::Return(value) => Ok(value),
                Flow::Normal => Ok(Value::Nil),
            }
        })
    }
}

#[derive(Clone, Copy)]
pub struct NativeFunction<'a> {
    pub name: &'static str,
    pub arity: usize,
    pub call: fn(&mut Interpreter<'a>, &[Value]) -> Result<Value, RuntimeError>,
}

impl<'a> Debug for NativeFunction<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn {}/{}>", self.name, self.arity)
    }
}
