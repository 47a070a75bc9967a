use crate::ast::{BinaryOperator, Literal};
use crate::callable::{Callable, NativeFunction, UserFunction};
use crate::environment::{Binding, Value};
use crate::scope::{ScopeId, Scopes};
use crate::typed;
use crate::typed::{Expression, ExpressionKind, Statement};
use bigdecimal::BigDecimal;
use log::debug;
use num_bigint::BigInt;
use num_traits::{One, Signed, ToPrimitive, Zero};
use std::cmp::Ordering;
use std::io;
use std::io::Write;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Runtime Error: Undefined variable {0}.")]
    UndefinedVariable(String),
    #[error("Runtime Error: Undefined function {name}/{arity}.")]
    UndefinedFunction { name: String, arity: usize },
    #[error("Runtime Error: Cannot assign to immutable variable {0}.")]
    ImmutableAssignment(String),
    #[error("Runtime Error: List {0} cannot be reassigned, only its elements.")]
    ListReassignment(String),
    #[error("Runtime Error: {0} does not hold a list.")]
    NotAList(String),
    #[error("Runtime Error: Index {index} out of bounds for length {length}.")]
    IndexOutOfBounds { index: String, length: usize },
    #[error("Runtime Error: Division by zero.")]
    DivisionByZero,
    #[error("Runtime Error: 1 / {0} has no exact decimal representation.")]
    InexactReciprocal(String),
    #[error("Runtime Error: Expected {expected}, received {received}.")]
    UnexpectedType {
        expected: String,
        received: &'static str,
    },
    #[error("Runtime Error: Exponent {0} is out of range.")]
    ExponentOutOfRange(String),
    #[error("Runtime Error: {0}")]
    Io(#[from] io::Error),
}

/// How a statement finished. `Return` unwinds to the nearest call.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal,
    Return(Value),
}

fn unexpected(expected: &str, received: &Value) -> RuntimeError {
    RuntimeError::UnexpectedType {
        expected: expected.to_string(),
        received: received.type_name(),
    }
}

fn print(interpreter: &mut Interpreter<'_>, arguments: &[Value]) -> Result<Value, RuntimeError> {
    for argument in arguments {
        writeln!(interpreter.out, "{}", argument)?;
    }
    Ok(Value::Nil)
}

pub struct Interpreter<'a> {
    scopes: Scopes<Binding, Callable<'a>>,
    out: Box<dyn Write + 'a>,
}

impl<'a> Interpreter<'a> {
    pub fn new() -> Interpreter<'a> {
        Interpreter::with_output(Box::new(io::stdout()))
    }

    /// `print` writes to `out` instead of standard output.
    pub fn with_output(out: Box<dyn Write + 'a>) -> Interpreter<'a> {
        Interpreter::with_scopes(Scopes::new(), out)
    }

    pub fn with_scopes(
        mut scopes: Scopes<Binding, Callable<'a>>,
        out: Box<dyn Write + 'a>,
    ) -> Interpreter<'a> {
        let parent = scopes.current();
        let _globals = scopes.start_block(parent);
        scopes.define_function(
            "print",
            1,
            Callable::Native(NativeFunction {
                name: "print",
                arity: 1,
                call: print,
            }),
        );
        Interpreter { scopes, out }
    }

    pub fn scopes(&self) -> &Scopes<Binding, Callable<'a>> {
        &self.scopes
    }

    /// Defines every global and function, then returns the result of `main/0`,
    /// which must be an `Integer`. Globals declared without a value hold `Nil`.
    pub fn interpret(&mut self, source: &'a typed::Source) -> Result<Value, RuntimeError> {
        for global in source.globals.iter() {
            let value = match &global.value {
                Some(value) => self.evaluate(value)?,
                None => Value::Nil,
            };
            self.define(&global.name, Binding::new(global.variable.mutable, value));
        }
        let closure = self.scopes.current();
        for function in source.functions.iter() {
            self.scopes.define_function(
                &function.name,
                function.parameters.len(),
                Callable::User(UserFunction::new(function, closure)),
            );
        }
        debug!(
            "defined {} globals and {} functions",
            source.globals.len(),
            source.functions.len()
        );
        let result = self.call("main", &[]);
        self.out.flush()?;
        match result? {
            result @ Value::Integer(_) => Ok(result),
            other => Err(unexpected("Integer", &other)),
        }
    }

    pub fn define(&mut self, name: &str, binding: Binding) {
        self.scopes.define_variable(name, binding);
    }

    pub fn call(&mut self, name: &str, arguments: &[Value]) -> Result<Value, RuntimeError> {
        let callable = self
            .scopes
            .lookup_function(name, arguments.len())
            .cloned()
            .ok_or_else(|| RuntimeError::UndefinedFunction {
                name: name.to_string(),
                arity: arguments.len(),
            })?;
        callable.call(self, arguments)
    }

    /// Runs `run` in a fresh child of `parent`; the current frame is restored
    /// whether `run` returns, fails or unwinds a `Return`.
    pub fn in_block<T, F>(&mut self, parent: ScopeId, run: F) -> Result<T, RuntimeError>
    where
        F: FnOnce(&mut Interpreter<'a>) -> Result<T, RuntimeError>,
    {
        let mark = self.scopes.start_block(parent);
        let result = run(self);
        self.scopes.end_block(mark);
        result
    }

    fn in_child_block(&mut self, statements: &[Statement]) -> Result<Flow, RuntimeError> {
        let parent = self.scopes.current();
        self.in_block(parent, |this| this.execute_block(statements))
    }

    pub fn execute_block(&mut self, statements: &[Statement]) -> Result<Flow, RuntimeError> {
        for statement in statements {
            if let Flow::Return(value) = self.execute(statement)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal)
    }

    pub fn execute(&mut self, statement: &Statement) -> Result<Flow, RuntimeError> {
        match statement {
            Statement::Expression(expression) => {
                self.evaluate(expression)?;
                Ok(Flow::Normal)
            }
            Statement::Declaration {
                name,
                value,
                variable,
            } => {
                let value = match value {
                    Some(value) => self.evaluate(value)?,
                    None => Value::Nil,
                };
                self.define(name, Binding::new(variable.mutable, value));
                Ok(Flow::Normal)
            }
            Statement::Assignment { receiver, value } => {
                self.assign(receiver, value)?;
                Ok(Flow::Normal)
            }
            Statement::If {
                condition,
                then_statements,
                else_statements,
            } => {
                if self.boolean(condition)? {
                    self.in_child_block(then_statements)
                } else {
                    self.in_child_block(else_statements)
                }
            }
            Statement::Switch { condition, cases } => {
                let condition = self.evaluate(condition)?;
                for case in cases {
                    let matched = match &case.value {
                        Some(value) => self.evaluate(value)? == condition,
                        None => true,
                    };
                    if matched {
                        return self.in_child_block(&case.statements);
                    }
                }
                Ok(Flow::Normal)
            }
            Statement::While {
                condition,
                statements,
            } => {
                while self.boolean(condition)? {
                    if let Flow::Return(value) = self.in_child_block(statements)? {
                        return Ok(Flow::Return(value));
                    }
                }
                Ok(Flow::Normal)
            }
            Statement::Return(value) => Ok(Flow::Return(self.evaluate(value)?)),
        }
    }

    fn assign(&mut self, receiver: &typed::Access, value: &Expression) -> Result<(), RuntimeError> {
        let name = &receiver.name;
        match &receiver.offset {
            Some(offset) => {
                let offset = self.evaluate(offset)?;
                let value = self.evaluate(value)?;
                let binding = self.lookup(name)?;
                if !binding.mutable {
                    return Err(RuntimeError::ImmutableAssignment(name.clone()));
                }
                match &binding.value {
                    Value::List(list) => {
                        let mut list = list.borrow_mut();
                        let index = index_of(&offset, list.len())?;
                        list[index] = value;
                        Ok(())
                    }
                    _ => Err(RuntimeError::NotAList(name.clone())),
                }
            }
            None => {
                let value = self.evaluate(value)?;
                let binding = self
                    .scopes
                    .lookup_variable_mut(name)
                    .ok_or_else(|| RuntimeError::UndefinedVariable(name.clone()))?;
                if !binding.mutable {
                    return Err(RuntimeError::ImmutableAssignment(name.clone()));
                }
                if let Value::List(_) = binding.value {
                    return Err(RuntimeError::ListReassignment(name.clone()));
                }
                binding.value = value;
                Ok(())
            }
        }
    }

    fn lookup(&self, name: &str) -> Result<&Binding, RuntimeError> {
        self.scopes
            .lookup_variable(name)
            .ok_or_else(|| RuntimeError::UndefinedVariable(name.to_string()))
    }

    fn boolean(&mut self, expression: &Expression) -> Result<bool, RuntimeError> {
        match self.evaluate(expression)? {
            Value::Boolean(x) => Ok(x),
            other => Err(unexpected("Boolean", &other)),
        }
    }

    pub fn evaluate(&mut self, expression: &Expression) -> Result<Value, RuntimeError> {
        match &expression.kind {
            ExpressionKind::Literal(literal) => Ok(match literal {
                Literal::Nil => Value::Nil,
                Literal::Boolean(x) => Value::Boolean(*x),
                Literal::Integer(x) => Value::Integer(x.clone()),
                Literal::Decimal(x) => Value::Decimal(x.clone()),
                Literal::Character(x) => Value::Character(*x),
                Literal::String(x) => Value::String(x.clone()),
            }),
            ExpressionKind::Group(inner) => self.evaluate(inner),
            ExpressionKind::Binary {
                operator,
                left,
                right,
            } => match operator {
                BinaryOperator::And | BinaryOperator::Or => {
                    let left = self.boolean(left)?;
                    // `FALSE && _` and `TRUE || _` never evaluate the right side.
                    if left == (*operator == BinaryOperator::Or) {
                        return Ok(Value::Boolean(left));
                    }
                    let right = self.evaluate(right)?;
                    binary(*operator, Value::Boolean(left), right)
                }
                _ => {
                    let left = self.evaluate(left)?;
                    let right = self.evaluate(right)?;
                    binary(*operator, left, right)
                }
            },
            ExpressionKind::Access(access) => match &access.offset {
                Some(offset) => {
                    let offset = self.evaluate(offset)?;
                    match &self.lookup(&access.name)?.value {
                        Value::List(list) => {
                            let list = list.borrow();
                            let index = index_of(&offset, list.len())?;
                            Ok(list[index].clone())
                        }
                        _ => Err(RuntimeError::NotAList(access.name.clone())),
                    }
                }
                None => Ok(self.lookup(&access.name)?.value.clone()),
            },
            ExpressionKind::Function {
                name, arguments, ..
            } => {
                let arguments = arguments
                    .iter()
                    .map(|argument| self.evaluate(argument))
                    .collect::<Result<Vec<_>, _>>()?;
                self.call(name, &arguments)
            }
            ExpressionKind::PlcList(values) => {
                let values = values
                    .iter()
                    .map(|value| self.evaluate(value))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::list(values))
            }
        }
    }
}

fn index_of(offset: &Value, length: usize) -> Result<usize, RuntimeError> {
    match offset {
        Value::Integer(x) => x
            .to_usize()
            .filter(|index| *index < length)
            .ok_or_else(|| RuntimeError::IndexOutOfBounds {
                index: x.to_string(),
                length,
            }),
        other => Err(unexpected("Integer", other)),
    }
}

/// Applies `operator` to evaluated operands. `&&` and `||` only get here
/// once the left operand has not decided the result.
fn binary(operator: BinaryOperator, left: Value, right: Value) -> Result<Value, RuntimeError> {
    match operator {
        BinaryOperator::Equal => Ok(Value::Boolean(left == right)),
        BinaryOperator::NotEqual => Ok(Value::Boolean(left != right)),
        BinaryOperator::Less => Ok(Value::Boolean(compare(&left, &right)? == Ordering::Less)),
        BinaryOperator::Greater => Ok(Value::Boolean(
            compare(&left, &right)? == Ordering::Greater,
        )),
        BinaryOperator::Add => match (left, right) {
            (Value::String(l), r) => Ok(Value::String(format!("{}{}", l, r))),
            (l, Value::String(r)) => Ok(Value::String(format!("{}{}", l, r))),
            (Value::Integer(l), Value::Integer(r)) => Ok(Value::Integer(l + r)),
            (Value::Decimal(l), Value::Decimal(r)) => Ok(Value::Decimal(l + r)),
            (l, r) => Err(mismatch(&l, &r)),
        },
        BinaryOperator::Subtract => match (left, right) {
            (Value::Integer(l), Value::Integer(r)) => Ok(Value::Integer(l - r)),
            (Value::Decimal(l), Value::Decimal(r)) => Ok(Value::Decimal(l - r)),
            (l, r) => Err(mismatch(&l, &r)),
        },
        BinaryOperator::Multiply => match (left, right) {
            (Value::Integer(l), Value::Integer(r)) => Ok(Value::Integer(l * r)),
            (Value::Decimal(l), Value::Decimal(r)) => Ok(Value::Decimal(l * r)),
            (l, r) => Err(mismatch(&l, &r)),
        },
        BinaryOperator::Divide => match (left, right) {
            (Value::Integer(_), Value::Integer(r)) if r.is_zero() => {
                Err(RuntimeError::DivisionByZero)
            }
            (Value::Integer(l), Value::Integer(r)) => Ok(Value::Integer(l / r)),
            (Value::Decimal(_), Value::Decimal(r)) if r.is_zero() => {
                Err(RuntimeError::DivisionByZero)
            }
            (Value::Decimal(l), Value::Decimal(r)) => Ok(Value::Decimal(divide(&l, &r))),
            (l, r) => Err(mismatch(&l, &r)),
        },
        BinaryOperator::Power => power(left, right),
        BinaryOperator::And | BinaryOperator::Or => match (left, right) {
            (Value::Boolean(l), Value::Boolean(r)) => Ok(Value::Boolean(
                if operator == BinaryOperator::And { l && r } else { l || r },
            )),
            (Value::Boolean(_), r) => Err(unexpected("Boolean", &r)),
            (l, _) => Err(unexpected("Boolean", &l)),
        },
    }
}

/// Error for operands whose kinds don't fit together, naming the left
/// operand's kind when the right one is at fault.
fn mismatch(left: &Value, right: &Value) -> RuntimeError {
    match left {
        Value::Integer(_) | Value::Decimal(_) => unexpected(left.type_name(), right),
        _ => unexpected("Integer or Decimal", left),
    }
}

fn compare(left: &Value, right: &Value) -> Result<Ordering, RuntimeError> {
    match (left, right) {
        (Value::Integer(l), Value::Integer(r)) => Ok(l.cmp(r)),
        (Value::Decimal(l), Value::Decimal(r)) => Ok(l.cmp(r)),
        (Value::Character(l), Value::Character(r)) => Ok(l.cmp(r)),
        (Value::String(l), Value::String(r)) => Ok(l.cmp(r)),
        (Value::Integer(_), _)
        | (Value::Decimal(_), _)
        | (Value::Character(_), _)
        | (Value::String(_), _) => Err(unexpected(left.type_name(), right)),
        _ => Err(unexpected("Comparable", left)),
    }
}

/// `left / right` rounded half-even to the scale of `left`.
fn divide(left: &BigDecimal, right: &BigDecimal) -> BigDecimal {
    let (left_digits, scale) = left.as_bigint_and_exponent();
    let (right_digits, right_scale) = right.as_bigint_and_exponent();
    let ten = BigInt::from(10);
    let (numerator, denominator) = if right_scale >= 0 {
        (left_digits * ten.pow(right_scale as u32), right_digits)
    } else {
        (left_digits, right_digits * ten.pow((-right_scale) as u32))
    };
    BigDecimal::new(round_half_even(&numerator, &denominator), scale)
}

fn round_half_even(numerator: &BigInt, denominator: &BigInt) -> BigInt {
    let quotient = numerator / denominator;
    let remainder = numerator % denominator;
    let twice = remainder.abs() * BigInt::from(2);
    let round_away = match twice.cmp(&denominator.abs()) {
        Ordering::Greater => true,
        Ordering::Equal => !(&quotient % BigInt::from(2)).is_zero(),
        Ordering::Less => false,
    };
    if !round_away {
        quotient
    } else if numerator.is_negative() != denominator.is_negative() {
        quotient - BigInt::one()
    } else {
        quotient + BigInt::one()
    }
}

fn power(base: Value, exponent: Value) -> Result<Value, RuntimeError> {
    let exponent = match exponent {
        Value::Integer(x) => x,
        other => return Err(unexpected("Integer", &other)),
    };
    let magnitude = exponent
        .abs()
        .to_u32()
        .ok_or_else(|| RuntimeError::ExponentOutOfRange(exponent.to_string()))?;
    let (digits, scale) = match base {
        Value::Integer(x) if !exponent.is_negative() => {
            return Ok(Value::Integer(x.pow(magnitude)));
        }
        Value::Integer(x) => (x, 0),
        Value::Decimal(x) => x.as_bigint_and_exponent(),
        other => return Err(unexpected("Integer or Decimal", &other)),
    };
    let digits = digits.pow(magnitude);
    let scale = scale * i64::from(magnitude);
    if exponent.is_negative() {
        reciprocal(&digits, scale).map(Value::Decimal)
    } else {
        Ok(Value::Decimal(BigDecimal::new(digits, scale)))
    }
}

/// Exact `1 / (digits * 10^-scale)`, which exists only when `digits` has
/// no prime factors other than 2 and 5.
fn reciprocal(digits: &BigInt, scale: i64) -> Result<BigDecimal, RuntimeError> {
    if digits.is_zero() {
        return Err(RuntimeError::DivisionByZero);
    }
    let two = BigInt::from(2);
    let five = BigInt::from(5);
    let mut rest = digits.abs();
    let (mut twos, mut fives) = (0u32, 0u32);
    while (&rest % &two).is_zero() {
        rest /= &two;
        twos += 1;
    }
    while (&rest % &five).is_zero() {
        rest /= &five;
        fives += 1;
    }
    if !rest.is_one() {
        return Err(RuntimeError::InexactReciprocal(
            BigDecimal::new(digits.clone(), scale).to_string(),
        ));
    }
    let shift = twos.max(fives);
    let mut quotient = BigInt::from(10).pow(shift) / digits.abs();
    if digits.is_negative() {
        quotient = -quotient;
    }
    Ok(BigDecimal::new(quotient, i64::from(shift) - scale))
}

#[cfg(test)]
mod interpreter_tests {
    use crate::analyzer::Analyzer;
    use crate::ast::{BinaryOperator, Literal};
    use crate::environment::{Binding, Type, Value, Variable};
    use crate::interpreter::{binary, power, Flow, Interpreter, RuntimeError};
    use crate::lexer::lex;
    use crate::parser::Parser;
    use crate::scope::Scopes;
    use crate::typed::{Access, Expression, ExpressionKind, Statement};
    use bigdecimal::BigDecimal;
    use num_bigint::BigInt;
    use std::rc::Rc;
    use std::str::FromStr;

    fn evaluate(expression: &str) -> Result<Value, RuntimeError> {
        let parsed = Parser::new(lex(expression).unwrap())
            .parse_expression()
            .unwrap();
        let typed = Analyzer::new().analyze_expression(&parsed).unwrap();
        Interpreter::with_output(Box::new(Vec::new())).evaluate(&typed)
    }

    fn integer(x: i64) -> Value {
        Value::Integer(BigInt::from(x))
    }

    fn decimal(x: &str) -> Value {
        Value::Decimal(BigDecimal::from_str(x).unwrap())
    }

    fn undefined(name: &str) -> Expression {
        Expression::new(
            ExpressionKind::Access(Access {
                name: name.to_string(),
                offset: None,
                variable: Rc::new(Variable::new(name, Type::Boolean, true)),
            }),
            Type::Boolean,
        )
    }

    fn boolean(x: bool) -> Expression {
        Expression::new(ExpressionKind::Literal(Literal::Boolean(x)), Type::Boolean)
    }

    fn logical(operator: BinaryOperator, left: Expression, right: Expression) -> Expression {
        Expression::new(
            ExpressionKind::Binary {
                operator,
                left: Box::new(left),
                right: Box::new(right),
            },
            Type::Boolean,
        )
    }

    #[test]
    fn arithmetic() {
        assert_eq!(evaluate("1 + 2 * 3").unwrap(), integer(7));
        assert_eq!(evaluate("(1 + 2) * 3").unwrap(), integer(9));
        assert_eq!(evaluate("10 - 2 - 3").unwrap(), integer(5));
        assert_eq!(evaluate("-7 / 2").unwrap(), integer(-3));
        assert_eq!(evaluate("1.5 + 2.25").unwrap(), decimal("3.75"));
        assert_eq!(evaluate("1.5 * 2.0").unwrap(), decimal("3.0"));
        assert_eq!(
            evaluate("\"a\" + 1 + TRUE").unwrap(),
            Value::String("a1true".to_string())
        );
        assert_eq!(
            evaluate("1.0 + \"x\"").unwrap(),
            Value::String("1.0x".to_string())
        );
    }

    #[test]
    fn decimal_division_rounds_half_even() {
        assert_eq!(evaluate("7.0 / 2.0").unwrap().to_string(), "3.5");
        assert_eq!(evaluate("1.0 / 3.0").unwrap().to_string(), "0.3");
        assert_eq!(evaluate("0.5 / 2.0").unwrap().to_string(), "0.2");
        assert_eq!(evaluate("1.5 / 2.0").unwrap().to_string(), "0.8");
        assert_eq!(evaluate("-1.5 / 2.0").unwrap().to_string(), "-0.8");
        assert_eq!(evaluate("10.00 / 4.0").unwrap().to_string(), "2.50");
    }

    #[test]
    fn division_by_zero() {
        assert!(matches!(evaluate("1 / 0"), Err(RuntimeError::DivisionByZero)));
        assert!(matches!(
            evaluate("1.0 / 0.0"),
            Err(RuntimeError::DivisionByZero)
        ));
        assert!(matches!(
            evaluate("0 ^ -1"),
            Err(RuntimeError::DivisionByZero)
        ));
    }

    #[test]
    fn powers() {
        assert_eq!(evaluate("2 ^ 10").unwrap(), integer(1024));
        assert_eq!(evaluate("2 ^ 0").unwrap(), integer(1));
        assert_eq!(evaluate("2 ^ -2").unwrap().to_string(), "0.25");
        assert_eq!(evaluate("-2 ^ -1").unwrap().to_string(), "-0.5");
        assert_eq!(evaluate("1.5 ^ 2").unwrap().to_string(), "2.25");
        assert_eq!(evaluate("0.5 ^ -1").unwrap().to_string(), "2");
        assert_eq!(evaluate("0.01 ^ -1").unwrap().to_string(), "100");
        assert!(matches!(
            evaluate("3 ^ -1"),
            Err(RuntimeError::InexactReciprocal(_))
        ));
        assert!(matches!(
            power(integer(2), Value::Integer(BigInt::from(1u64 << 40))),
            Err(RuntimeError::ExponentOutOfRange(_))
        ));
    }

    #[test]
    fn comparisons() {
        assert_eq!(evaluate("1 < 2").unwrap(), Value::Boolean(true));
        assert_eq!(evaluate("2.5 > 2.50").unwrap(), Value::Boolean(false));
        assert_eq!(evaluate("'a' < 'b'").unwrap(), Value::Boolean(true));
        assert_eq!(evaluate("\"b\" > \"ab\"").unwrap(), Value::Boolean(true));
        assert_eq!(evaluate("1 != 2").unwrap(), Value::Boolean(true));
        assert_eq!(evaluate("\"x\" == \"x\"").unwrap(), Value::Boolean(true));
    }

    #[test]
    fn short_circuit() {
        let mut interpreter = Interpreter::with_output(Box::new(Vec::new()));
        assert!(matches!(
            interpreter.evaluate(&undefined("undefinedVariable")),
            Err(RuntimeError::UndefinedVariable(_))
        ));
        let or = logical(BinaryOperator::Or, boolean(true), undefined("undefinedVariable"));
        assert_eq!(interpreter.evaluate(&or).unwrap(), Value::Boolean(true));
        let and = logical(BinaryOperator::And, boolean(false), undefined("undefinedVariable"));
        assert_eq!(interpreter.evaluate(&and).unwrap(), Value::Boolean(false));
        let and = logical(BinaryOperator::And, boolean(true), undefined("undefinedVariable"));
        assert!(interpreter.evaluate(&and).is_err());
        let or = logical(BinaryOperator::Or, boolean(false), boolean(true));
        assert_eq!(interpreter.evaluate(&or).unwrap(), Value::Boolean(true));
        let and = logical(BinaryOperator::And, boolean(true), boolean(false));
        assert_eq!(interpreter.evaluate(&and).unwrap(), Value::Boolean(false));
        assert!(matches!(
            binary(BinaryOperator::And, Value::Boolean(true), integer(1)),
            Err(RuntimeError::UnexpectedType { received: "Integer", .. })
        ));
    }

    #[test]
    fn return_unwinds_blocks_and_restores_scope() {
        let mut scopes = Scopes::new();
        scopes.define_variable("flag", Binding::new(true, Value::Boolean(true)));
        let mut interpreter = Interpreter::with_scopes(scopes, Box::new(Vec::new()));
        let before = interpreter.scopes().current();
        let statement = Statement::While {
            condition: boolean(true),
            statements: vec![Statement::If {
                condition: boolean(true),
                then_statements: vec![Statement::Return(Expression::new(
                    ExpressionKind::Literal(Literal::Integer(BigInt::from(3))),
                    Type::Integer,
                ))],
                else_statements: vec![],
            }],
        };
        assert_eq!(
            interpreter.execute(&statement).unwrap(),
            Flow::Return(integer(3))
        );
        assert_eq!(interpreter.scopes().current(), before);
        assert!(interpreter.scopes().lookup_variable("flag").is_some());
    }

    #[test]
    fn lists() {
        let mut interpreter = Interpreter::with_output(Box::new(Vec::new()));
        interpreter.define(
            "l",
            Binding::new(true, Value::list(vec![integer(1), integer(2), integer(3)])),
        );
        interpreter.define("n", Binding::new(true, integer(1)));
        let access = |offset: Option<i64>| {
            Expression::new(
                ExpressionKind::Access(Access {
                    name: "l".to_string(),
                    offset: offset.map(|x| {
                        Box::new(Expression::new(
                            ExpressionKind::Literal(Literal::Integer(BigInt::from(x))),
                            Type::Integer,
                        ))
                    }),
                    variable: Rc::new(Variable::new("l", Type::Integer, true)),
                }),
                Type::Integer,
            )
        };
        assert_eq!(interpreter.evaluate(&access(Some(2))).unwrap(), integer(3));
        assert!(matches!(
            interpreter.evaluate(&access(Some(3))),
            Err(RuntimeError::IndexOutOfBounds { length: 3, .. })
        ));
        assert!(matches!(
            interpreter.evaluate(&access(Some(-1))),
            Err(RuntimeError::IndexOutOfBounds { .. })
        ));
        let whole = interpreter.evaluate(&access(None)).unwrap();
        assert_eq!(whole.to_string(), "[1, 2, 3]");
    }

    #[test]
    fn list_literal_cannot_replace_a_list() {
        let mut interpreter = Interpreter::with_output(Box::new(Vec::new()));
        interpreter.define(
            "l",
            Binding::new(true, Value::list(vec![integer(1), integer(2), integer(3)])),
        );
        let literal = |x: i64| {
            Expression::new(
                ExpressionKind::Literal(Literal::Integer(BigInt::from(x))),
                Type::Integer,
            )
        };
        let statement = Statement::Assignment {
            receiver: Access {
                name: "l".to_string(),
                offset: None,
                variable: Rc::new(Variable::new("l", Type::Integer, true)),
            },
            value: Expression::new(
                ExpressionKind::PlcList(vec![literal(4), literal(5), literal(6)]),
                Type::Integer,
            ),
        };
        assert!(matches!(
            interpreter.execute(&statement),
            Err(RuntimeError::ListReassignment(ref name)) if name == "l"
        ));
        assert_eq!(
            interpreter.evaluate(&Expression::new(
                ExpressionKind::Access(Access {
                    name: "l".to_string(),
                    offset: None,
                    variable: Rc::new(Variable::new("l", Type::Integer, true)),
                }),
                Type::Integer,
            ))
            .unwrap()
            .to_string(),
            "[1, 2, 3]"
        );
    }
}
