use crate::ast;
use crate::ast::{BinaryOperator, Literal};
use crate::environment::{get_type, Function, Type, Variable};
use crate::scope::Scopes;
use crate::typed;
use crate::typed::{Expression, ExpressionKind};
use log::debug;
use num_traits::ToPrimitive;
use std::rc::Rc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SemanticError {
    #[error("Semantic Error: Missing function main/0.")]
    MissingMain,
    #[error("Semantic Error: Expected {expected}, received {received}.")]
    TypeMismatch { expected: String, received: String },
    #[error("Semantic Error: Unknown type {0}.")]
    UnknownType(String),
    #[error("Semantic Error: Undefined variable {0}.")]
    UndefinedVariable(String),
    #[error("Semantic Error: Undefined function {name}/{arity}.")]
    UndefinedFunction { name: String, arity: usize },
    #[error("Semantic Error: {0} is already defined in this scope.")]
    AlreadyDefined(String),
    #[error("Semantic Error: Cannot assign to immutable variable {0}.")]
    ImmutableAssignment(String),
    #[error("Semantic Error: Only variables and list elements can be assigned.")]
    InvalidAssignmentTarget,
    #[error("Semantic Error: Only function calls can be used as statements.")]
    InvalidExpressionStatement,
    #[error("Semantic Error: Only binary expressions can be grouped.")]
    InvalidGroup,
    #[error("Semantic Error: IF needs at least one statement before ELSE or END.")]
    EmptyThenBlock,
    #[error("Semantic Error: The last case of a SWITCH must be DEFAULT.")]
    MissingDefaultCase,
    #[error("Semantic Error: Declaration of {0} needs a type or an initial value.")]
    UntypedDeclaration(String),
    #[error("Semantic Error: Integer {0} does not fit in 32 bits.")]
    IntegerOutOfRange(String),
    #[error("Semantic Error: Decimal {0} is out of range.")]
    DecimalOutOfRange(String),
    #[error("Semantic Error: List literals need at least one element.")]
    EmptyList,
    #[error("Semantic Error: RETURN outside of a function.")]
    ReturnOutsideFunction,
}

/// Fails unless a value of type `ty` may be used where `target` is required.
pub fn require_assignable(target: Type, ty: Type) -> Result<(), SemanticError> {
    if target.accepts(ty) {
        Ok(())
    } else {
        Err(SemanticError::TypeMismatch {
            expected: target.to_string(),
            received: ty.to_string(),
        })
    }
}

fn require_numeric(ty: Type) -> Result<(), SemanticError> {
    match ty {
        Type::Integer | Type::Decimal => Ok(()),
        _ => Err(SemanticError::TypeMismatch {
            expected: "Integer or Decimal".to_string(),
            received: ty.to_string(),
        }),
    }
}

/// Resolves names and checks types, turning an [`ast::Source`] into a
/// [`typed::Source`].
pub struct Analyzer {
    scopes: Scopes<Rc<Variable>, Rc<Function>>,
    function: Option<Rc<Function>>,
}

impl Default for Analyzer {
    fn default() -> Self {
        Analyzer::new()
    }
}

impl Analyzer {
    pub fn new() -> Analyzer {
        Analyzer::with_scopes(Scopes::new())
    }

    /// Definitions go into a fresh child of the current frame of `scopes`,
    /// so bindings already there are visible but never overwritten.
    pub fn with_scopes(mut scopes: Scopes<Rc<Variable>, Rc<Function>>) -> Analyzer {
        let parent = scopes.current();
        let _globals = scopes.start_block(parent);
        scopes.define_function(
            "print",
            1,
            Rc::new(Function::with_target(
                "print",
                "System.out.println",
                vec![Type::Any],
                Type::Nil,
            )),
        );
        Analyzer {
            scopes,
            function: None,
        }
    }

    pub fn scopes(&self) -> &Scopes<Rc<Variable>, Rc<Function>> {
        &self.scopes
    }

    pub fn analyze(&mut self, source: &ast::Source) -> Result<typed::Source, SemanticError> {
        let main = source
            .functions
            .iter()
            .find(|function| function.name == "main" && function.parameters.is_empty())
            .ok_or(SemanticError::MissingMain)?;
        let main_return = self.return_type(main)?;
        require_assignable(Type::Integer, main_return)?;

        let globals = source
            .globals
            .iter()
            .map(|global| self.analyze_global(global))
            .collect::<Result<Vec<_>, _>>()?;
        let functions = source
            .functions
            .iter()
            .map(|function| self.analyze_function(function))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(typed::Source { globals, functions })
    }

    fn analyze_global(&mut self, global: &ast::Global) -> Result<typed::Global, SemanticError> {
        let ty = self.resolve_type(&global.type_name)?;
        let value = match &global.value {
            Some(value) => {
                let value = self.analyze_expression(value)?;
                require_assignable(ty, value.ty)?;
                Some(value)
            }
            None => None,
        };
        let variable = self.define_variable(&global.name, ty, global.mutable)?;
        Ok(typed::Global {
            name: global.name.clone(),
            value,
            variable,
        })
    }

    fn analyze_function(
        &mut self,
        function: &ast::Function,
    ) -> Result<typed::Function, SemanticError> {
        let parameter_types = function
            .parameter_type_names
            .iter()
            .map(|name| self.resolve_type(name))
            .collect::<Result<Vec<_>, _>>()?;
        let return_type = self.return_type(function)?;
        if self
            .scopes
            .is_function_defined_here(&function.name, parameter_types.len())
        {
            return Err(SemanticError::AlreadyDefined(function.name.clone()));
        }
        let binding = Rc::new(Function::new(
            &function.name,
            parameter_types.clone(),
            return_type,
        ));
        // Defined before the body so the body can call itself.
        self.scopes
            .define_function(&function.name, binding.arity(), binding.clone());
        debug!("analyzing {}/{}", function.name, binding.arity());

        let statements = self.in_block(|this| {
            for (name, ty) in function.parameters.iter().zip(parameter_types.iter()) {
                this.define_variable(name, *ty, true)?;
            }
            let enclosing = this.function.replace(binding.clone());
            let statements = this.analyze_statements(&function.statements);
            this.function = enclosing;
            statements
        })?;
        Ok(typed::Function {
            name: function.name.clone(),
            parameters: function.parameters.clone(),
            statements,
            function: binding,
        })
    }

    fn analyze_statements(
        &mut self,
        statements: &[ast::Statement],
    ) -> Result<Vec<typed::Statement>, SemanticError> {
        statements
            .iter()
            .map(|statement| self.analyze_statement(statement))
            .collect()
    }

    fn analyze_statement(
        &mut self,
        statement: &ast::Statement,
    ) -> Result<typed::Statement, SemanticError> {
        match statement {
            ast::Statement::Expression(expression) => {
                if !matches!(expression, ast::Expression::Function { .. }) {
                    return Err(SemanticError::InvalidExpressionStatement);
                }
                Ok(typed::Statement::Expression(
                    self.analyze_expression(expression)?,
                ))
            }
            ast::Statement::Declaration {
                name,
                type_name,
                value,
            } => {
                let declared = match type_name {
                    Some(type_name) => Some(self.resolve_type(type_name)?),
                    None => None,
                };
                let value = match value {
                    Some(value) => Some(self.analyze_expression(value)?),
                    None => None,
                };
                let ty = match (declared, &value) {
                    (Some(ty), Some(value)) => {
                        require_assignable(ty, value.ty)?;
                        ty
                    }
                    (Some(ty), None) => ty,
                    (None, Some(value)) => value.ty,
                    (None, None) => return Err(SemanticError::UntypedDeclaration(name.clone())),
                };
                let variable = self.define_variable(name, ty, true)?;
                Ok(typed::Statement::Declaration {
                    name: name.clone(),
                    value,
                    variable,
                })
            }
            ast::Statement::Assignment { receiver, value } => {
                let receiver = match receiver {
                    ast::Expression::Access { offset, name } => {
                        self.analyze_access(name, offset.as_deref())?
                    }
                    _ => return Err(SemanticError::InvalidAssignmentTarget),
                };
                let value = self.analyze_expression(value)?;
                if !receiver.variable.mutable {
                    return Err(SemanticError::ImmutableAssignment(receiver.name));
                }
                require_assignable(receiver.variable.ty, value.ty)?;
                Ok(typed::Statement::Assignment { receiver, value })
            }
            ast::Statement::If {
                condition,
                then_statements,
                else_statements,
            } => {
                let condition = self.analyze_expression(condition)?;
                if then_statements.is_empty() {
                    return Err(SemanticError::EmptyThenBlock);
                }
                require_assignable(Type::Boolean, condition.ty)?;
                let then_statements = self.in_block(|this| this.analyze_statements(then_statements))?;
                let else_statements = self.in_block(|this| this.analyze_statements(else_statements))?;
                Ok(typed::Statement::If {
                    condition,
                    then_statements,
                    else_statements,
                })
            }
            ast::Statement::Switch { condition, cases } => {
                let condition = self.analyze_expression(condition)?;
                match cases.last() {
                    Some(ast::Case { value: None, .. }) => {}
                    _ => return Err(SemanticError::MissingDefaultCase),
                }
                let mut analyzed = Vec::with_capacity(cases.len());
                for case in cases {
                    let value = match &case.value {
                        Some(value) => {
                            let value = self.analyze_expression(value)?;
                            require_assignable(condition.ty, value.ty)?;
                            Some(value)
                        }
                        None => None,
                    };
                    let statements = self.in_block(|this| this.analyze_statements(&case.statements))?;
                    analyzed.push(typed::Case { value, statements });
                }
                Ok(typed::Statement::Switch {
                    condition,
                    cases: analyzed,
                })
            }
            ast::Statement::While {
                condition,
                statements,
            } => {
                let condition = self.analyze_expression(condition)?;
                require_assignable(Type::Boolean, condition.ty)?;
                let statements = self.in_block(|this| this.analyze_statements(statements))?;
                Ok(typed::Statement::While {
                    condition,
                    statements,
                })
            }
            ast::Statement::Return(value) => {
                let value = self.analyze_expression(value)?;
                let function = self
                    .function
                    .as_ref()
                    .ok_or(SemanticError::ReturnOutsideFunction)?;
                require_assignable(function.return_type, value.ty)?;
                Ok(typed::Statement::Return(value))
            }
        }
    }

    pub fn analyze_expression(
        &mut self,
        expression: &ast::Expression,
    ) -> Result<Expression, SemanticError> {
        match expression {
            ast::Expression::Literal(literal) => {
                let ty = literal_type(literal)?;
                Ok(Expression::new(ExpressionKind::Literal(literal.clone()), ty))
            }
            ast::Expression::Group(inner) => {
                if !matches!(inner.as_ref(), ast::Expression::Binary { .. }) {
                    return Err(SemanticError::InvalidGroup);
                }
                let inner = self.analyze_expression(inner)?;
                let ty = inner.ty;
                Ok(Expression::new(ExpressionKind::Group(Box::new(inner)), ty))
            }
            ast::Expression::Binary {
                operator,
                left,
                right,
            } => {
                let left = self.analyze_expression(left)?;
                let right = self.analyze_expression(right)?;
                let ty = binary_type(*operator, left.ty, right.ty)?;
                Ok(Expression::new(
                    ExpressionKind::Binary {
                        operator: *operator,
                        left: Box::new(left),
                        right: Box::new(right),
                    },
                    ty,
                ))
            }
            ast::Expression::Access { offset, name } => {
                let access = self.analyze_access(name, offset.as_deref())?;
                let ty = access.variable.ty;
                Ok(Expression::new(ExpressionKind::Access(access), ty))
            }
            ast::Expression::Function { name, arguments } => {
                let function = self
                    .scopes
                    .lookup_function(name, arguments.len())
                    .cloned()
                    .ok_or_else(|| SemanticError::UndefinedFunction {
                        name: name.clone(),
                        arity: arguments.len(),
                    })?;
                let mut analyzed = Vec::with_capacity(arguments.len());
                for (argument, ty) in arguments.iter().zip(function.parameter_types.iter()) {
                    let argument = self.analyze_expression(argument)?;
                    require_assignable(*ty, argument.ty)?;
                    analyzed.push(argument);
                }
                let ty = function.return_type;
                Ok(Expression::new(
                    ExpressionKind::Function {
                        name: name.clone(),
                        arguments: analyzed,
                        function,
                    },
                    ty,
                ))
            }
            ast::Expression::PlcList(values) => {
                let mut analyzed = Vec::with_capacity(values.len());
                let mut element = None;
                for value in values {
                    let value = self.analyze_expression(value)?;
                    match element {
                        None => element = Some(value.ty),
                        Some(ty) => require_assignable(ty, value.ty)?,
                    }
                    analyzed.push(value);
                }
                let ty = element.ok_or(SemanticError::EmptyList)?;
                Ok(Expression::new(ExpressionKind::PlcList(analyzed), ty))
            }
        }
    }

    fn analyze_access(
        &mut self,
        name: &str,
        offset: Option<&ast::Expression>,
    ) -> Result<typed::Access, SemanticError> {
        let offset = match offset {
            Some(offset) => {
                let offset = self.analyze_expression(offset)?;
                require_assignable(Type::Integer, offset.ty)?;
                Some(Box::new(offset))
            }
            None => None,
        };
        let variable = self
            .scopes
            .lookup_variable(name)
            .cloned()
            .ok_or_else(|| SemanticError::UndefinedVariable(name.to_string()))?;
        Ok(typed::Access {
            name: name.to_string(),
            offset,
            variable,
        })
    }

    fn in_block<T, F>(&mut self, analyze: F) -> Result<T, SemanticError>
    where
        F: FnOnce(&mut Analyzer) -> Result<T, SemanticError>,
    {
        let parent = self.scopes.current();
        let mark = self.scopes.start_block(parent);
        let result = analyze(self);
        self.scopes.end_block(mark);
        result
    }

    fn define_variable(
        &mut self,
        name: &str,
        ty: Type,
        mutable: bool,
    ) -> Result<Rc<Variable>, SemanticError> {
        if self.scopes.is_variable_defined_here(name) {
            return Err(SemanticError::AlreadyDefined(name.to_string()));
        }
        let variable = Rc::new(Variable::new(name, ty, mutable));
        self.scopes.define_variable(name, variable.clone());
        Ok(variable)
    }

    fn resolve_type(&self, name: &str) -> Result<Type, SemanticError> {
        get_type(name).ok_or_else(|| SemanticError::UnknownType(name.to_string()))
    }

    fn return_type(&self, function: &ast::Function) -> Result<Type, SemanticError> {
        match &function.return_type_name {
            Some(name) => self.resolve_type(name),
            None => Ok(Type::Nil),
        }
    }
}

fn literal_type(literal: &Literal) -> Result<Type, SemanticError> {
    match literal {
        Literal::Nil => Ok(Type::Nil),
        Literal::Boolean(_) => Ok(Type::Boolean),
        Literal::Integer(x) => match x.to_i32() {
            Some(_) => Ok(Type::Integer),
            None => Err(SemanticError::IntegerOutOfRange(x.to_string())),
        },
        Literal::Decimal(x) => match x.to_f64() {
            Some(d) if d.is_finite() => Ok(Type::Decimal),
            _ => Err(SemanticError::DecimalOutOfRange(x.to_string())),
        },
        Literal::Character(_) => Ok(Type::Character),
        Literal::String(_) => Ok(Type::String),
    }
}

fn binary_type(operator: BinaryOperator, left: Type, right: Type) -> Result<Type, SemanticError> {
    match operator {
        BinaryOperator::And | BinaryOperator::Or => {
            require_assignable(Type::Boolean, left)?;
            require_assignable(Type::Boolean, right)?;
            Ok(Type::Boolean)
        }
        BinaryOperator::Less
        | BinaryOperator::Greater
        | BinaryOperator::Equal
        | BinaryOperator::NotEqual => {
            require_assignable(Type::Comparable, left)?;
            require_assignable(left, right)?;
            Ok(Type::Boolean)
        }
        BinaryOperator::Add if left == Type::String || right == Type::String => Ok(Type::String),
        BinaryOperator::Add
        | BinaryOperator::Subtract
        | BinaryOperator::Multiply
        | BinaryOperator::Divide => {
            require_numeric(left)?;
            require_assignable(left, right)?;
            Ok(left)
        }
        BinaryOperator::Power => {
            require_numeric(left)?;
            require_assignable(Type::Integer, right)?;
            Ok(left)
        }
    }
}
