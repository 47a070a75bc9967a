use crate::ast::{BinaryOperator, Case, Expression, Function, Global, Literal, Source, Statement};
use crate::lexer::ESCAPES;
use crate::token::{Token, TokenType};
use bigdecimal::BigDecimal;
use log::debug;
use num_bigint::BigInt;
use num_enum::TryFromPrimitive;
use std::convert::TryFrom;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("[index {index}] Parse Error: Expected {expected}.")]
    Expected { expected: String, index: usize },
    #[error("[index {index}] Parse Error: Invalid literal {literal}.")]
    InvalidLiteral { literal: String, index: usize },
    #[error("[index {index}] Parse Error: Unexpected token after the last function.")]
    TrailingTokens { index: usize },
}

impl ParseError {
    pub fn index(&self) -> usize {
        match self {
            ParseError::Expected { index, .. }
            | ParseError::InvalidLiteral { index, .. }
            | ParseError::TrailingTokens { index } => *index,
        }
    }
}

/// Cursor over the lexer's output.
pub struct TokenStream {
    tokens: Vec<Token>,
    index: usize,
}

impl TokenStream {
    pub fn new(tokens: Vec<Token>) -> TokenStream {
        TokenStream { tokens, index: 0 }
    }
    pub fn has(&self, offset: usize) -> bool {
        self.index + offset < self.tokens.len()
    }
    pub fn get(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.index + offset)
    }
    pub fn previous(&self) -> Option<&Token> {
        self.index.checked_sub(1).and_then(|i| self.tokens.get(i))
    }
    pub fn advance(&mut self) {
        if self.index < self.tokens.len() {
            self.index += 1;
        }
    }
}

/// Something a token can be matched against: a token type, or an exact
/// literal such as a keyword or operator.
trait Pattern {
    fn matches(&self, token: &Token) -> bool;
}

impl Pattern for TokenType {
    fn matches(&self, token: &Token) -> bool {
        token.tokentype == *self
    }
}

impl Pattern for &str {
    fn matches(&self, token: &Token) -> bool {
        token.literal == *self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
enum Precedence {
    Logical,
    Comparison,
    Additive,
    Multiplicative,
    Primary,
}

impl Precedence {
    fn operators(self) -> &'static [&'static str] {
        match self {
            Precedence::Logical => &["&&", "||"],
            Precedence::Comparison => &["<", ">", "==", "!="],
            Precedence::Additive => &["+", "-"],
            Precedence::Multiplicative => &["*", "/", "^"],
            Precedence::Primary => &[],
        }
    }
    fn next(self) -> Precedence {
        Precedence::try_from(self as u8 + 1).unwrap_or(Precedence::Primary)
    }
}

pub fn parse(tokens: Vec<Token>) -> Result<Source, ParseError> {
    Parser::new(tokens).parse_source()
}

pub struct Parser {
    tokens: TokenStream,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Parser {
        Parser {
            tokens: TokenStream::new(tokens),
        }
    }

    /// `source := global* function*`, consuming every token.
    pub fn parse_source(&mut self) -> Result<Source, ParseError> {
        let mut globals = Vec::new();
        let mut functions = Vec::new();
        while self.peek(&[&"LIST"]) || self.peek(&[&"VAR"]) || self.peek(&[&"VAL"]) {
            globals.push(self.parse_global()?);
        }
        while self.peek(&[&"FUN"]) {
            functions.push(self.parse_function()?);
        }
        if self.tokens.has(0) {
            return Err(ParseError::TrailingTokens {
                index: self.error_index(),
            });
        }
        debug!(
            "parsed {} globals and {} functions",
            globals.len(),
            functions.len()
        );
        Ok(Source { globals, functions })
    }

    pub fn parse_global(&mut self) -> Result<Global, ParseError> {
        let global = if self.peek(&[&"LIST"]) {
            self.parse_list()?
        } else if self.peek(&[&"VAR"]) {
            self.parse_mutable()?
        } else {
            self.parse_immutable()?
        };
        self.expect(";")?;
        Ok(global)
    }

    fn parse_list(&mut self) -> Result<Global, ParseError> {
        self.expect("LIST")?;
        let name = self.expect_identifier("list name")?;
        let type_name = self.parse_type()?;
        self.expect("=")?;
        self.expect("[")?;
        let mut values = vec![self.parse_expression()?];
        while self.next_if(&[&","]) {
            values.push(self.parse_expression()?);
        }
        self.expect("]")?;
        Ok(Global {
            name,
            type_name,
            mutable: true,
            value: Some(Expression::PlcList(values)),
        })
    }

    fn parse_mutable(&mut self) -> Result<Global, ParseError> {
        self.expect("VAR")?;
        let name = self.expect_identifier("variable name")?;
        let type_name = self.parse_type()?;
        let value = if self.next_if(&[&"="]) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        Ok(Global {
            name,
            type_name,
            mutable: true,
            value,
        })
    }

    fn parse_immutable(&mut self) -> Result<Global, ParseError> {
        self.expect("VAL")?;
        let name = self.expect_identifier("value name")?;
        let type_name = self.parse_type()?;
        self.expect("=")?;
        let value = self.parse_expression()?;
        Ok(Global {
            name,
            type_name,
            mutable: false,
            value: Some(value),
        })
    }

    pub fn parse_function(&mut self) -> Result<Function, ParseError> {
        self.expect("FUN")?;
        let name = self.expect_identifier("function name")?;
        self.expect("(")?;
        let mut parameters = Vec::new();
        let mut parameter_type_names = Vec::new();
        if self.next_if(&[&TokenType::Identifier]) {
            loop {
                parameters.push(self.previous_literal());
                parameter_type_names.push(self.parse_type()?);
                if !self.next_if(&[&",", &TokenType::Identifier]) {
                    break;
                }
            }
        }
        self.expect(")")?;
        let return_type_name = if self.next_if(&[&":"]) {
            Some(self.expect_identifier("return type name")?)
        } else {
            None
        };
        self.expect("DO")?;
        let statements = self.parse_block()?;
        self.expect("END")?;
        Ok(Function {
            name,
            parameters,
            parameter_type_names,
            return_type_name,
            statements,
        })
    }

    /// Statements up to (not including) `END`, `ELSE`, `CASE` or `DEFAULT`.
    pub fn parse_block(&mut self) -> Result<Vec<Statement>, ParseError> {
        let mut statements = Vec::new();
        while self.tokens.has(0)
            && !self.peek(&[&"END"])
            && !self.peek(&[&"ELSE"])
            && !self.peek(&[&"CASE"])
            && !self.peek(&[&"DEFAULT"])
        {
            statements.push(self.parse_statement()?);
        }
        Ok(statements)
    }

    pub fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        if self.peek(&[&"LET"]) {
            self.parse_declaration_statement()
        } else if self.peek(&[&"SWITCH"]) {
            self.parse_switch_statement()
        } else if self.peek(&[&"IF"]) {
            self.parse_if_statement()
        } else if self.peek(&[&"WHILE"]) {
            self.parse_while_statement()
        } else if self.peek(&[&"RETURN"]) {
            self.parse_return_statement()
        } else {
            let receiver = self.parse_expression()?;
            if self.next_if(&[&"="]) {
                let value = self.parse_expression()?;
                self.expect(";")?;
                Ok(Statement::Assignment { receiver, value })
            } else {
                self.expect(";")?;
                Ok(Statement::Expression(receiver))
            }
        }
    }

    fn parse_declaration_statement(&mut self) -> Result<Statement, ParseError> {
        self.expect("LET")?;
        let name = self.expect_identifier("variable name")?;
        let type_name = if self.next_if(&[&":"]) {
            Some(self.expect_identifier("type name")?)
        } else {
            None
        };
        let value = if self.next_if(&[&"="]) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.expect(";")?;
        Ok(Statement::Declaration {
            name,
            type_name,
            value,
        })
    }

    fn parse_if_statement(&mut self) -> Result<Statement, ParseError> {
        self.expect("IF")?;
        let condition = self.parse_expression()?;
        self.expect("DO")?;
        let then_statements = self.parse_block()?;
        let else_statements = if self.next_if(&[&"ELSE"]) {
            self.parse_block()?
        } else {
            Vec::new()
        };
        self.expect("END")?;
        Ok(Statement::If {
            condition,
            then_statements,
            else_statements,
        })
    }

    fn parse_switch_statement(&mut self) -> Result<Statement, ParseError> {
        self.expect("SWITCH")?;
        let condition = self.parse_expression()?;
        let mut cases = Vec::new();
        while self.next_if(&[&"CASE"]) {
            let value = self.parse_expression()?;
            self.expect(":")?;
            cases.push(Case {
                value: Some(value),
                statements: self.parse_block()?,
            });
        }
        self.expect("DEFAULT")?;
        cases.push(Case {
            value: None,
            statements: self.parse_block()?,
        });
        self.expect("END")?;
        Ok(Statement::Switch { condition, cases })
    }

    fn parse_while_statement(&mut self) -> Result<Statement, ParseError> {
        self.expect("WHILE")?;
        let condition = self.parse_expression()?;
        self.expect("DO")?;
        let statements = self.parse_block()?;
        self.expect("END")?;
        Ok(Statement::While {
            condition,
            statements,
        })
    }

    fn parse_return_statement(&mut self) -> Result<Statement, ParseError> {
        self.expect("RETURN")?;
        let value = self.parse_expression()?;
        self.expect(";")?;
        Ok(Statement::Return(value))
    }

    pub fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        self.parse_binary(Precedence::Logical)
    }

    /// Left-associative binary levels, lowest precedence first.
    fn parse_binary(&mut self, precedence: Precedence) -> Result<Expression, ParseError> {
        if precedence == Precedence::Primary {
            return self.parse_primary_expression();
        }
        let mut left = self.parse_binary(precedence.next())?;
        while let Some(operator) = self.next_operator(precedence.operators()) {
            let right = self.parse_binary(precedence.next())?;
            left = Expression::Binary {
                operator,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_primary_expression(&mut self) -> Result<Expression, ParseError> {
        if self.next_if(&[&"NIL"]) {
            Ok(Expression::Literal(Literal::Nil))
        } else if self.next_if(&[&"TRUE"]) {
            Ok(Expression::Literal(Literal::Boolean(true)))
        } else if self.next_if(&[&"FALSE"]) {
            Ok(Expression::Literal(Literal::Boolean(false)))
        } else if self.next_if(&[&TokenType::Integer]) {
            let literal = self.previous_literal();
            BigInt::from_str(&literal)
                .map(|x| Expression::Literal(Literal::Integer(x)))
                .map_err(|_| self.invalid_literal(literal))
        } else if self.next_if(&[&TokenType::Decimal]) {
            let literal = self.previous_literal();
            BigDecimal::from_str(&literal)
                .map(|x| Expression::Literal(Literal::Decimal(x)))
                .map_err(|_| self.invalid_literal(literal))
        } else if self.next_if(&[&TokenType::Character]) {
            let literal = self.previous_literal();
            let unescaped = self.unescape(&literal)?;
            let mut chars = unescaped.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(Expression::Literal(Literal::Character(c))),
                _ => Err(self.invalid_literal(literal)),
            }
        } else if self.next_if(&[&TokenType::String]) {
            let literal = self.previous_literal();
            Ok(Expression::Literal(Literal::String(self.unescape(&literal)?)))
        } else if self.next_if(&[&"("]) {
            let expression = self.parse_expression()?;
            self.expect(")")?;
            Ok(Expression::Group(Box::new(expression)))
        } else if self.next_if(&[&TokenType::Identifier]) {
            let name = self.previous_literal();
            if self.next_if(&[&"("]) {
                let mut arguments = Vec::new();
                if !self.peek(&[&")"]) {
                    arguments.push(self.parse_expression()?);
                    while self.next_if(&[&","]) {
                        arguments.push(self.parse_expression()?);
                    }
                }
                self.expect(")")?;
                Ok(Expression::Function { name, arguments })
            } else if self.next_if(&[&"["]) {
                let offset = self.parse_expression()?;
                self.expect("]")?;
                Ok(Expression::Access {
                    offset: Some(Box::new(offset)),
                    name,
                })
            } else {
                Ok(Expression::Access { offset: None, name })
            }
        } else {
            Err(self.expected("expression"))
        }
    }

    fn parse_type(&mut self) -> Result<String, ParseError> {
        self.expect(":")?;
        self.expect_identifier("type name")
    }

    /// Strips the surrounding quotes and resolves escape sequences.
    fn unescape(&self, literal: &str) -> Result<String, ParseError> {
        let body = literal
            .get(1..literal.len().saturating_sub(1))
            .unwrap_or_default();
        let mut result = String::with_capacity(body.len());
        let mut chars = body.chars();
        while let Some(c) = chars.next() {
            if c == '\\' {
                match chars.next().and_then(|e| ESCAPES.get(&e)) {
                    Some(x) => result.push(*x),
                    None => return Err(self.invalid_literal(literal.to_string())),
                }
            } else {
                result.push(c);
            }
        }
        Ok(result)
    }

    fn next_operator(&mut self, operators: &[&str]) -> Option<BinaryOperator> {
        let token = self.tokens.get(0)?;
        if token.tokentype != TokenType::Operator || !operators.contains(&token.literal.as_str()) {
            return None;
        }
        let operator = BinaryOperator::from_str(&token.literal).ok()?;
        self.tokens.advance();
        Some(operator)
    }

    fn peek(&self, patterns: &[&dyn Pattern]) -> bool {
        patterns.iter().enumerate().all(|(offset, pattern)| {
            self.tokens
                .get(offset)
                .map_or(false, |token| pattern.matches(token))
        })
    }

    fn next_if(&mut self, patterns: &[&dyn Pattern]) -> bool {
        let matched = self.peek(patterns);
        if matched {
            for _ in patterns {
                self.tokens.advance();
            }
        }
        matched
    }

    fn expect(&mut self, literal: &str) -> Result<(), ParseError> {
        if self.next_if(&[&literal]) {
            Ok(())
        } else {
            Err(self.expected(&format!("'{}'", literal)))
        }
    }

    fn expect_identifier(&mut self, what: &str) -> Result<String, ParseError> {
        if self.next_if(&[&TokenType::Identifier]) {
            Ok(self.previous_literal())
        } else {
            Err(self.expected(what))
        }
    }

    fn previous_literal(&self) -> String {
        self.tokens
            .previous()
            .map(|token| token.literal.clone())
            .unwrap_or_default()
    }

    /// Offset of the next token, or the end of the last one once the
    /// stream is exhausted.
    fn error_index(&self) -> usize {
        match self.tokens.get(0) {
            Some(token) => token.index,
            None => self.tokens.previous().map_or(0, Token::end),
        }
    }

    fn expected(&self, what: &str) -> ParseError {
        ParseError::Expected {
            expected: what.to_string(),
            index: self.error_index(),
        }
    }

    fn invalid_literal(&self, literal: String) -> ParseError {
        ParseError::InvalidLiteral {
            literal,
            index: self.tokens.previous().map_or(0, |token| token.index),
        }
    }
}

#[cfg(test)]
mod parser_tests {
    use crate::ast::{AstPrinter, Case, Expression, Function, Global, Literal, Source, Statement};
    use crate::lexer::lex;
    use crate::parser::{parse, ParseError, Parser};
    use bigdecimal::BigDecimal;
    use num_bigint::BigInt;
    use std::str::FromStr;

    fn expression(source: &str) -> Expression {
        let mut parser = Parser::new(lex(source).unwrap());
        let expression = parser.parse_expression().unwrap();
        assert!(!parser.tokens.has(0), "unconsumed tokens in {}", source);
        expression
    }

    fn printed(source: &str) -> String {
        AstPrinter {}.print(&expression(source))
    }

    fn statement(source: &str) -> Statement {
        Parser::new(lex(source).unwrap()).parse_statement().unwrap()
    }

    fn integer(x: i32) -> Expression {
        Expression::Literal(Literal::Integer(BigInt::from(x)))
    }

    fn access(name: &str) -> Expression {
        Expression::Access {
            offset: None,
            name: name.to_string(),
        }
    }

    #[test]
    fn precedence() {
        assert_eq!(printed("1 + 2 * 3"), "(+ 1 (* 2 3))");
        assert_eq!(printed("1 < 2 == TRUE"), "(== (< 1 2) TRUE)");
        assert_eq!(printed("a && b || c"), "(|| (&& a b) c)");
        assert_eq!(printed("x ^ 2 / 3"), "(/ (^ x 2) 3)");
        assert_eq!(printed("1 - 2 - 3"), "(- (- 1 2) 3)");
        assert_eq!(printed("(1 + 2) * 3"), "(* (group (+ 1 2)) 3)");
        assert_eq!(printed("a == b && c != d"), "(&& (== a b) (!= c d))");
    }

    #[test]
    fn primaries() {
        assert_eq!(printed("f(1, g())"), "(call f 1 (call g))");
        assert_eq!(printed("xs[i + 1]"), "xs[(+ i 1)]");
        assert_eq!(expression("NIL"), Expression::Literal(Literal::Nil));
        assert_eq!(
            expression("FALSE"),
            Expression::Literal(Literal::Boolean(false))
        );
        assert_eq!(
            expression("-1.50"),
            Expression::Literal(Literal::Decimal(BigDecimal::from_str("-1.50").unwrap()))
        );
        assert_eq!(
            expression("\"a\\tb\\\\\""),
            Expression::Literal(Literal::String("a\tb\\".to_string()))
        );
        assert_eq!(
            expression("'\\''"),
            Expression::Literal(Literal::Character('\''))
        );
        assert_eq!(expression("'c'"), Expression::Literal(Literal::Character('c')));
    }

    #[test]
    fn statements() {
        assert_eq!(
            statement("x = 1;"),
            Statement::Assignment {
                receiver: access("x"),
                value: integer(1),
            }
        );
        assert_eq!(
            statement("print(x);"),
            Statement::Expression(Expression::Function {
                name: "print".to_string(),
                arguments: vec![access("x")],
            })
        );
        assert_eq!(
            statement("LET y: Integer;"),
            Statement::Declaration {
                name: "y".to_string(),
                type_name: Some("Integer".to_string()),
                value: None,
            }
        );
        assert_eq!(
            statement("IF c DO x = 1; ELSE END"),
            Statement::If {
                condition: access("c"),
                then_statements: vec![Statement::Assignment {
                    receiver: access("x"),
                    value: integer(1),
                }],
                else_statements: vec![],
            }
        );
        assert_eq!(
            statement("WHILE c DO END"),
            Statement::While {
                condition: access("c"),
                statements: vec![],
            }
        );
        assert_eq!(
            statement("SWITCH x CASE 1: RETURN 1; DEFAULT RETURN 0; END"),
            Statement::Switch {
                condition: access("x"),
                cases: vec![
                    Case {
                        value: Some(integer(1)),
                        statements: vec![Statement::Return(integer(1))],
                    },
                    Case {
                        value: None,
                        statements: vec![Statement::Return(integer(0))],
                    },
                ],
            }
        );
    }

    #[test]
    fn source() {
        let source = "LIST l: Integer = [1, 2]; VAR v: String; VAL c: Integer = 3;\n\
                      FUN f(a: Integer, b: String): Boolean DO RETURN TRUE; END\n\
                      FUN main() DO END";
        assert_eq!(
            parse(lex(source).unwrap()),
            Ok(Source {
                globals: vec![
                    Global {
                        name: "l".to_string(),
                        type_name: "Integer".to_string(),
                        mutable: true,
                        value: Some(Expression::PlcList(vec![integer(1), integer(2)])),
                    },
                    Global {
                        name: "v".to_string(),
                        type_name: "String".to_string(),
                        mutable: true,
                        value: None,
                    },
                    Global {
                        name: "c".to_string(),
                        type_name: "Integer".to_string(),
                        mutable: false,
                        value: Some(integer(3)),
                    },
                ],
                functions: vec![
                    Function {
                        name: "f".to_string(),
                        parameters: vec!["a".to_string(), "b".to_string()],
                        parameter_type_names: vec!["Integer".to_string(), "String".to_string()],
                        return_type_name: Some("Boolean".to_string()),
                        statements: vec![Statement::Return(Expression::Literal(
                            Literal::Boolean(true)
                        ))],
                    },
                    Function {
                        name: "main".to_string(),
                        parameters: vec![],
                        parameter_type_names: vec![],
                        return_type_name: None,
                        statements: vec![],
                    },
                ],
            })
        );
    }

    #[test]
    fn errors_carry_offsets() {
        let error = |source: &str| parse(lex(source).unwrap()).unwrap_err();
        assert_eq!(
            error("FUN main() DO"),
            ParseError::Expected {
                expected: "'END'".to_string(),
                index: 13,
            }
        );
        assert_eq!(error("VAR x: Integer").index(), 14);
        assert_eq!(
            error("FUN main() DO RETURN 1 END"),
            ParseError::Expected {
                expected: "';'".to_string(),
                index: 23,
            }
        );
        assert_eq!(
            error("FUN main() DO END x"),
            ParseError::TrailingTokens { index: 18 }
        );
        assert_eq!(error("FUN f(a: Integer,) DO END").index(), 16);
        assert_eq!(error("VAL x: Integer;").index(), 14);
        assert_eq!(error("SWITCH").index(), 0);
        assert_eq!(
            Parser::new(vec![]).parse_expression(),
            Err(ParseError::Expected {
                expected: "expression".to_string(),
                index: 0,
            })
        );
    }

    #[test]
    fn switch_requires_default() {
        let mut parser = Parser::new(lex("SWITCH x CASE 1: END").unwrap());
        assert_eq!(
            parser.parse_statement(),
            Err(ParseError::Expected {
                expected: "'DEFAULT'".to_string(),
                index: 17,
            })
        );
    }
}
