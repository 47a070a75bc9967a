//! Syntax tree produced by the parser, before any name or type resolution.
//!
//! The analyzer consumes this tree and builds the annotated tree in
//! [`crate::typed`]; nothing downstream of the analyzer sees these nodes.
use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use std::fmt;
use std::fmt::Formatter;
use strum_macros::{Display, EnumString};

#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    pub globals: Vec<Global>,
    pub functions: Vec<Function>,
}

/// `LIST`, `VAR` or `VAL` declaration at the top of a source file.
#[derive(Debug, Clone, PartialEq)]
pub struct Global {
    pub name: String,
    pub type_name: String,
    pub mutable: bool,
    pub value: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub parameters: Vec<String>,
    pub parameter_type_names: Vec<String>,
    pub return_type_name: Option<String>,
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Expression(Expression),
    Declaration {
        name: String,
        type_name: Option<String>,
        value: Option<Expression>,
    },
    Assignment {
        receiver: Expression,
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

/// One arm of a `SWITCH`. The default arm has no value.
#[derive(Debug, Clone, PartialEq)]
pub struct Case {
    pub value: Option<Expression>,
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Literal),
    Group(Box<Expression>),
    Binary {
        operator: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Access {
        offset: Option<Box<Expression>>,
        name: String,
    },
    Function {
        name: String,
        arguments: Vec<Expression>,
    },
    PlcList(Vec<Expression>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Nil,
    Boolean(bool),
    Integer(BigInt),
    Decimal(BigDecimal),
    Character(char),
    String(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Nil => write!(f, "NIL"),
            Literal::Boolean(true) => write!(f, "TRUE"),
            Literal::Boolean(false) => write!(f, "FALSE"),
            Literal::Integer(x) => write!(f, "{}", x),
            Literal::Decimal(x) => write!(f, "{}", x),
            Literal::Character(x) => write!(f, "{:?}", x),
            Literal::String(x) => write!(f, "{:?}", x),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum BinaryOperator {
    #[strum(serialize = "&&")]
    And,
    #[strum(serialize = "||")]
    Or,
    #[strum(serialize = "<")]
    Less,
    #[strum(serialize = ">")]
    Greater,
    #[strum(serialize = "==")]
    Equal,
    #[strum(serialize = "!=")]
    NotEqual,
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Subtract,
    #[strum(serialize = "*")]
    Multiply,
    #[strum(serialize = "/")]
    Divide,
    #[strum(serialize = "^")]
    Power,
}

/// Renders expressions fully parenthesized, which makes grouping visible
/// in tests.
pub struct AstPrinter {}

impl AstPrinter {
    fn parenthesize(&self, name: &str, args: &[&Expression]) -> String {
        let mut x = String::from("(");
        x.push_str(name);
        for arg in args {
            x.push(' ');
            x.push_str(self.print(arg).as_str());
        }
        x.push(')');
        x
    }

    pub fn print(&self, expression: &Expression) -> String {
        match expression {
            Expression::Literal(x) => x.to_string(),
            Expression::Group(x) => self.parenthesize("group", &[x.as_ref()]),
            Expression::Binary {
                operator,
                left,
                right,
            } => self.parenthesize(&operator.to_string(), &[left.as_ref(), right.as_ref()]),
            Expression::Access { offset: None, name } => name.clone(),
            Expression::Access {
                offset: Some(offset),
                name,
            } => format!("{}[{}]", name, self.print(offset)),
            Expression::Function { name, arguments } => {
                let arguments: Vec<&Expression> = arguments.iter().collect();
                self.parenthesize(&format!("call {}", name), &arguments)
            }
            Expression::PlcList(values) => {
                let values: Vec<&Expression> = values.iter().collect();
                self.parenthesize("list", &values)
            }
        }
    }
}
