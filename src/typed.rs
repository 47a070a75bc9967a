//! Syntax tree after analysis. Same shape as [`crate::ast`], but every
//! expression carries its type and every name its resolved binding, so the
//! interpreter (or a code generator) never has to resolve anything itself.
use crate::ast::{BinaryOperator, Literal};
use crate::environment::{Function as FunctionBinding, Type, Variable};
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    pub globals: Vec<Global>,
    pub functions: Vec<Function>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Global {
    pub name: String,
    pub value: Option<Expression>,
    pub variable: Rc<Variable>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub parameters: Vec<String>,
    pub statements: Vec<Statement>,
    pub function: Rc<FunctionBinding>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Expression(Expression),
    Declaration {
        name: String,
        value: Option<Expression>,
        variable: Rc<Variable>,
    },
    Assignment {
        receiver: Access,
        value: Expression,
    },
    If {
        condition: Expression,
        then_statements: Vec<Statement>,
        else_statements: Vec<Statement>,
    },
    Switch {
        condition: Expression,
        cases: Vec<Case>,
    },
    While {
        condition: Expression,
        statements: Vec<Statement>,
    },
    Return(Expression),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Case {
    pub value: Option<Expression>,
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub ty: Type,
}

impl Expression {
    pub fn new(kind: ExpressionKind, ty: Type) -> Expression {
        Expression { kind, ty }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionKind {
    Literal(Literal),
    Group(Box<Expression>),
    Binary {
        operator: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Access(Access),
    Function {
        name: String,
        arguments: Vec<Expression>,
        function: Rc<FunctionBinding>,
    },
    PlcList(Vec<Expression>),
}

/// A possibly indexed variable reference. Also the receiver of an
/// assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct Access {
    pub name: String,
    pub offset: Option<Box<Expression>>,
    pub variable: Rc<Variable>,
}
