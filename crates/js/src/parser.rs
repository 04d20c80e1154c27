//! Recursive-descent statements over a Pratt expression parser.
//!
//! Binding powers, loosest first: assignment, `?:`, `||`, `&&`, `|`, `&`,
//! equality, relational and `instanceof`, additive, multiplicative, prefix
//! unary, postfix update, then call and member access.
//!
//! A statement that fails to parse is recorded and skipped up to the next
//! `;` or statement keyword, so one pass reports every error it can.

use std::rc::Rc;

use crate::ast::{BinaryOp, Expr, Function, LogicalOp, Stmt, StmtKind, UnaryOp, UpdateOp, VarKind};
use crate::error::SyntaxError;
use crate::lexer::tokenize;
use crate::token::{Token, TokenKind};

type ParseResult<T> = Result<T, SyntaxError>;

const ASSIGNMENT: u8 = 2;
const CONDITIONAL: u8 = 3;
const PREFIX: u8 = 12;
const POSTFIX: u8 = 13;
const CALL: u8 = 14;

fn infix_binding_power(kind: &TokenKind) -> Option<u8> {
    Some(match kind {
        TokenKind::Equal
        | TokenKind::PlusEqual
        | TokenKind::MinusEqual
        | TokenKind::StarEqual
        | TokenKind::SlashEqual => ASSIGNMENT,
        TokenKind::Question => CONDITIONAL,
        TokenKind::PipePipe => 4,
        TokenKind::AmpAmp => 5,
        TokenKind::Pipe => 6,
        TokenKind::Amp => 7,
        TokenKind::EqualEqual
        | TokenKind::BangEqual
        | TokenKind::EqualEqualEqual
        | TokenKind::BangEqualEqual => 8,
        TokenKind::Less
        | TokenKind::LessEqual
        | TokenKind::Greater
        | TokenKind::GreaterEqual
        | TokenKind::Instanceof => 9,
        TokenKind::Plus | TokenKind::Minus => 10,
        TokenKind::Star | TokenKind::Slash | TokenKind::Percent => 11,
        TokenKind::PlusPlus | TokenKind::MinusMinus => POSTFIX,
        TokenKind::LeftParen | TokenKind::Dot | TokenKind::LeftBracket => CALL,
        _ => return None,
    })
}

fn binary_op(kind: &TokenKind) -> Option<BinaryOp> {
    Some(match kind {
        TokenKind::Plus | TokenKind::PlusEqual => BinaryOp::Add,
        TokenKind::Minus | TokenKind::MinusEqual => BinaryOp::Subtract,
        TokenKind::Star | TokenKind::StarEqual => BinaryOp::Multiply,
        TokenKind::Slash | TokenKind::SlashEqual => BinaryOp::Divide,
        TokenKind::Percent => BinaryOp::Modulo,
        TokenKind::Amp => BinaryOp::BitAnd,
        TokenKind::Pipe => BinaryOp::BitOr,
        TokenKind::EqualEqual => BinaryOp::Equal,
        TokenKind::BangEqual => BinaryOp::NotEqual,
        TokenKind::EqualEqualEqual => BinaryOp::StrictEqual,
        TokenKind::BangEqualEqual => BinaryOp::StrictNotEqual,
        TokenKind::Less => BinaryOp::Less,
        TokenKind::LessEqual => BinaryOp::LessEqual,
        TokenKind::Greater => BinaryOp::Greater,
        TokenKind::GreaterEqual => BinaryOp::GreaterEqual,
        TokenKind::Instanceof => BinaryOp::InstanceOf,
        _ => return None,
    })
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    errors: Vec<SyntaxError>,
}

/// Parses a whole script.
pub fn parse(source: &str) -> Result<Vec<Stmt>, Vec<SyntaxError>> {
    let mut parser = Parser::new(tokenize(source));
    let program = parser.program();
    if parser.errors.is_empty() {
        Ok(program)
    } else {
        Err(parser.errors)
    }
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().is_none_or(|t| t.kind != TokenKind::Eof) {
            let line = tokens.last().map_or(1, |t| t.line);
            tokens.push(Token {
                kind: TokenKind::Eof,
                line,
            });
        }
        Self {
            tokens,
            pos: 0,
            errors: Vec::new(),
        }
    }

    fn token(&self, offset: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + offset).min(last)]
    }

    fn peek(&self) -> &TokenKind {
        &self.token(0).kind
    }

    fn line(&self) -> u32 {
        self.token(0).line
    }

    fn advance(&mut self) -> Token {
        let token = self.token(0).clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek() == kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error(&self, message: impl Into<String>) -> SyntaxError {
        match self.peek() {
            TokenKind::Error(lexical) => SyntaxError::new(self.line(), lexical.clone()),
            _ => SyntaxError::new(self.line(), message),
        }
    }

    fn expect(&mut self, kind: &TokenKind, context: &str) -> ParseResult<()> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.error(format!("expected {kind} {context}, found {}", self.peek())))
        }
    }

    fn identifier(&mut self, context: &str) -> ParseResult<Rc<str>> {
        match self.peek().clone() {
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(name)
            }
            other => Err(self.error(format!("expected {context}, found {other}"))),
        }
    }

    /// The next token starts a new source line.
    fn newline_before(&self) -> bool {
        self.pos > 0 && self.token(0).line > self.tokens[self.pos - 1].line
    }

    fn at_statement_end(&self) -> bool {
        matches!(
            self.peek(),
            TokenKind::Semicolon | TokenKind::RightBrace | TokenKind::Eof
        ) || self.newline_before()
    }

    /// Semicolons are optional before `}`, at end of input and at a line
    /// break.
    fn end_statement(&mut self) -> ParseResult<()> {
        if self.eat(&TokenKind::Semicolon) || self.at_statement_end() {
            Ok(())
        } else {
            Err(self.error(format!("expected ';', found {}", self.peek())))
        }
    }

    fn synchronize(&mut self) {
        self.advance();
        loop {
            match self.peek() {
                TokenKind::Eof
                | TokenKind::Var
                | TokenKind::Let
                | TokenKind::Const
                | TokenKind::Function
                | TokenKind::Return
                | TokenKind::If
                | TokenKind::For
                | TokenKind::While
                | TokenKind::Throw
                | TokenKind::Try => return,
                TokenKind::Semicolon => {
                    self.advance();
                    return;
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    pub fn program(&mut self) -> Vec<Stmt> {
        let mut statements = Vec::new();
        while !self.check(&TokenKind::Eof) {
            match self.statement() {
                Ok(stmt) => statements.push(stmt),
                Err(err) => {
                    log::trace!(target: "js.parser", "recovering from {err}");
                    self.errors.push(err);
                    self.synchronize();
                }
            }
        }
        statements
    }

    /// Statements up to the closing `}` (the opening one is consumed).
    fn block_body(&mut self) -> ParseResult<Vec<Stmt>> {
        let mut statements = Vec::new();
        while !self.check(&TokenKind::RightBrace) && !self.check(&TokenKind::Eof) {
            match self.statement() {
                Ok(stmt) => statements.push(stmt),
                Err(err) => {
                    self.errors.push(err);
                    self.synchronize();
                }
            }
        }
        self.expect(&TokenKind::RightBrace, "to close block")?;
        Ok(statements)
    }

    fn statement(&mut self) -> ParseResult<Stmt> {
        let line = self.line();
        let kind = match self.peek() {
            TokenKind::LeftBrace => {
                self.advance();
                StmtKind::Block(self.block_body()?)
            }
            TokenKind::Var | TokenKind::Let | TokenKind::Const => {
                let decl = self.var_declaration()?;
                self.end_statement()?;
                decl
            }
            TokenKind::Function if matches!(self.token(1).kind, TokenKind::Identifier(_)) => {
                self.advance();
                let name = self.identifier("function name")?;
                StmtKind::Function(Rc::new(self.function_rest(Some(name), line)?))
            }
            TokenKind::Return => {
                self.advance();
                let value = if self.at_statement_end() {
                    None
                } else {
                    Some(self.expression()?)
                };
                self.end_statement()?;
                StmtKind::Return(value)
            }
            TokenKind::If => self.if_statement()?,
            TokenKind::While => {
                self.advance();
                self.expect(&TokenKind::LeftParen, "after 'while'")?;
                let test = self.expression()?;
                self.expect(&TokenKind::RightParen, "after loop condition")?;
                let body = Box::new(self.statement()?);
                StmtKind::While { test, body }
            }
            TokenKind::For => self.for_statement()?,
            TokenKind::Throw => {
                self.advance();
                if self.newline_before() {
                    return Err(self.error("illegal newline after 'throw'"));
                }
                let value = self.expression()?;
                self.end_statement()?;
                StmtKind::Throw(value)
            }
            TokenKind::Try => self.try_statement()?,
            TokenKind::Semicolon => {
                self.advance();
                StmtKind::Empty
            }
            _ => {
                let expr = self.expression()?;
                self.end_statement()?;
                StmtKind::Expr(expr)
            }
        };
        Ok(Stmt { kind, line })
    }

    fn var_declaration(&mut self) -> ParseResult<StmtKind> {
        let kind = match self.advance().kind {
            TokenKind::Let => VarKind::Let,
            TokenKind::Const => VarKind::Const,
            _ => VarKind::Var,
        };
        let mut declarations = Vec::new();
        loop {
            let name = self.identifier("variable name")?;
            let init = if self.eat(&TokenKind::Equal) {
                Some(self.expr_bp(ASSIGNMENT)?)
            } else {
                if kind == VarKind::Const {
                    return Err(self.error(format!("missing initializer for const '{name}'")));
                }
                None
            };
            declarations.push((name, init));
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok(StmtKind::Var { kind, declarations })
    }

    fn if_statement(&mut self) -> ParseResult<StmtKind> {
        self.advance();
        self.expect(&TokenKind::LeftParen, "after 'if'")?;
        let test = self.expression()?;
        self.expect(&TokenKind::RightParen, "after condition")?;
        let then = Box::new(self.statement()?);
        let otherwise = if self.eat(&TokenKind::Else) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        Ok(StmtKind::If {
            test,
            then,
            otherwise,
        })
    }

    fn for_statement(&mut self) -> ParseResult<StmtKind> {
        self.advance();
        self.expect(&TokenKind::LeftParen, "after 'for'")?;
        let init_line = self.line();
        let init = match self.peek() {
            TokenKind::Semicolon => {
                self.advance();
                None
            }
            TokenKind::Var | TokenKind::Let | TokenKind::Const => {
                let kind = self.var_declaration()?;
                self.expect(&TokenKind::Semicolon, "after loop initializer")?;
                Some(Box::new(Stmt {
                    kind,
                    line: init_line,
                }))
            }
            _ => {
                let expr = self.expression()?;
                self.expect(&TokenKind::Semicolon, "after loop initializer")?;
                Some(Box::new(Stmt {
                    kind: StmtKind::Expr(expr),
                    line: init_line,
                }))
            }
        };
        let test = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect(&TokenKind::Semicolon, "after loop condition")?;
        let update = if self.check(&TokenKind::RightParen) {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect(&TokenKind::RightParen, "after for clauses")?;
        let body = Box::new(self.statement()?);
        Ok(StmtKind::For {
            init,
            test,
            update,
            body,
        })
    }

    fn try_statement(&mut self) -> ParseResult<StmtKind> {
        self.advance();
        self.expect(&TokenKind::LeftBrace, "after 'try'")?;
        let block = self.block_body()?;
        let mut param = None;
        let handler = if self.eat(&TokenKind::Catch) {
            if self.eat(&TokenKind::LeftParen) {
                param = Some(self.identifier("catch parameter")?);
                self.expect(&TokenKind::RightParen, "after catch parameter")?;
            }
            self.expect(&TokenKind::LeftBrace, "before catch body")?;
            Some(self.block_body()?)
        } else {
            None
        };
        let finalizer = if self.eat(&TokenKind::Finally) {
            self.expect(&TokenKind::LeftBrace, "after 'finally'")?;
            Some(self.block_body()?)
        } else {
            None
        };
        if handler.is_none() && finalizer.is_none() {
            return Err(self.error("missing catch or finally after try"));
        }
        Ok(StmtKind::Try {
            block,
            param,
            handler,
            finalizer,
        })
    }

    /// Parameter list and body; the `function` keyword and name are already
    /// consumed.
    fn function_rest(&mut self, name: Option<Rc<str>>, line: u32) -> ParseResult<Function> {
        self.expect(&TokenKind::LeftParen, "before parameters")?;
        let params = self.parameters()?;
        self.expect(&TokenKind::LeftBrace, "before function body")?;
        let body = self.block_body()?;
        Ok(Function {
            name,
            params,
            body,
            arrow: false,
            line,
        })
    }

    /// Identifiers up to and including `)`.
    fn parameters(&mut self) -> ParseResult<Vec<Rc<str>>> {
        let mut params = Vec::new();
        if !self.check(&TokenKind::RightParen) {
            loop {
                params.push(self.identifier("parameter name")?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RightParen, "after parameters")?;
        Ok(params)
    }

    pub fn expression(&mut self) -> ParseResult<Expr> {
        self.expr_bp(0)
    }

    fn expr_bp(&mut self, min_bp: u8) -> ParseResult<Expr> {
        let mut left = self.prefix()?;
        loop {
            let kind = self.peek().clone();
            let Some(bp) = infix_binding_power(&kind) else {
                break;
            };
            if bp < min_bp {
                break;
            }
            if bp == POSTFIX && self.newline_before() {
                break;
            }
            left = self.infix(left, kind, bp)?;
        }
        Ok(left)
    }

    fn prefix(&mut self) -> ParseResult<Expr> {
        let line = self.line();
        let token = self.advance();
        Ok(match token.kind {
            TokenKind::Number(n) => Expr::Number(n),
            TokenKind::String(s) => Expr::String(s),
            TokenKind::True => Expr::Bool(true),
            TokenKind::False => Expr::Bool(false),
            TokenKind::Null => Expr::Null,
            TokenKind::This => Expr::This,
            TokenKind::Identifier(name) => {
                if self.eat(&TokenKind::Arrow) {
                    self.arrow_body(vec![name], line)?
                } else if &*name == "undefined" {
                    Expr::Undefined
                } else {
                    Expr::Identifier(name)
                }
            }
            TokenKind::LeftParen => {
                if self.arrow_ahead() {
                    let params = self.parameters()?;
                    self.expect(&TokenKind::Arrow, "after arrow parameters")?;
                    self.arrow_body(params, line)?
                } else {
                    let inner = self.expression()?;
                    self.expect(&TokenKind::RightParen, "after expression")?;
                    inner
                }
            }
            TokenKind::LeftBracket => self.array_literal()?,
            TokenKind::LeftBrace => self.object_literal()?,
            TokenKind::Function => {
                let name = match self.peek().clone() {
                    TokenKind::Identifier(name) => {
                        self.advance();
                        Some(name)
                    }
                    _ => None,
                };
                Expr::Function(Rc::new(self.function_rest(name, line)?))
            }
            TokenKind::New => {
                let mut callee = self.prefix()?;
                loop {
                    if self.eat(&TokenKind::Dot) {
                        let property = self.property_name()?;
                        callee = Expr::Member {
                            object: Box::new(callee),
                            property,
                        };
                    } else if self.eat(&TokenKind::LeftBracket) {
                        let index = self.expression()?;
                        self.expect(&TokenKind::RightBracket, "after index")?;
                        callee = Expr::Index {
                            object: Box::new(callee),
                            index: Box::new(index),
                        };
                    } else {
                        break;
                    }
                }
                let args = if self.eat(&TokenKind::LeftParen) {
                    self.arguments()?
                } else {
                    Vec::new()
                };
                Expr::New {
                    callee: Box::new(callee),
                    args,
                }
            }
            TokenKind::Bang => self.unary(UnaryOp::Not)?,
            TokenKind::Minus => self.unary(UnaryOp::Negate)?,
            TokenKind::Plus => self.unary(UnaryOp::Plus)?,
            TokenKind::Typeof => self.unary(UnaryOp::TypeOf)?,
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                let op = if token.kind == TokenKind::PlusPlus {
                    UpdateOp::Increment
                } else {
                    UpdateOp::Decrement
                };
                Expr::Update {
                    op,
                    prefix: true,
                    target: Box::new(self.expr_bp(PREFIX)?),
                }
            }
            TokenKind::Error(message) => return Err(SyntaxError::new(line, message)),
            other => {
                return Err(SyntaxError::new(
                    line,
                    format!("expected expression, found {other}"),
                ));
            }
        })
    }

    fn unary(&mut self, op: UnaryOp) -> ParseResult<Expr> {
        Ok(Expr::Unary {
            op,
            operand: Box::new(self.expr_bp(PREFIX)?),
        })
    }

    fn infix(&mut self, left: Expr, kind: TokenKind, bp: u8) -> ParseResult<Expr> {
        self.advance();
        let left = Box::new(left);
        Ok(match kind {
            TokenKind::Equal => Expr::Assign {
                op: None,
                target: left,
                value: Box::new(self.expr_bp(bp)?),
            },
            TokenKind::PlusEqual
            | TokenKind::MinusEqual
            | TokenKind::StarEqual
            | TokenKind::SlashEqual => Expr::Assign {
                op: binary_op(&kind),
                target: left,
                value: Box::new(self.expr_bp(bp)?),
            },
            TokenKind::Question => {
                let then = self.expr_bp(0)?;
                self.expect(&TokenKind::Colon, "in conditional expression")?;
                Expr::Conditional {
                    test: left,
                    then: Box::new(then),
                    otherwise: Box::new(self.expr_bp(bp)?),
                }
            }
            TokenKind::AmpAmp | TokenKind::PipePipe => Expr::Logical {
                op: if kind == TokenKind::AmpAmp {
                    LogicalOp::And
                } else {
                    LogicalOp::Or
                },
                left,
                right: Box::new(self.expr_bp(bp + 1)?),
            },
            TokenKind::PlusPlus | TokenKind::MinusMinus => Expr::Update {
                op: if kind == TokenKind::PlusPlus {
                    UpdateOp::Increment
                } else {
                    UpdateOp::Decrement
                },
                prefix: false,
                target: left,
            },
            TokenKind::LeftParen => Expr::Call {
                callee: left,
                args: self.arguments()?,
            },
            TokenKind::Dot => Expr::Member {
                object: left,
                property: self.property_name()?,
            },
            TokenKind::LeftBracket => {
                let index = self.expression()?;
                self.expect(&TokenKind::RightBracket, "after index")?;
                Expr::Index {
                    object: left,
                    index: Box::new(index),
                }
            }
            other => match binary_op(&other) {
                Some(op) => Expr::Binary {
                    op,
                    left,
                    right: Box::new(self.expr_bp(bp + 1)?),
                },
                None => return Err(self.error(format!("unexpected {other}"))),
            },
        })
    }

    fn property_name(&mut self) -> ParseResult<Rc<str>> {
        let kind = self.peek().clone();
        if let Some(keyword) = kind.keyword_text() {
            self.advance();
            return Ok(Rc::from(keyword));
        }
        self.identifier("property name")
    }

    /// Arguments up to and including `)`.
    fn arguments(&mut self) -> ParseResult<Vec<Expr>> {
        let mut args = Vec::new();
        if !self.check(&TokenKind::RightParen) {
            loop {
                args.push(self.expr_bp(ASSIGNMENT)?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RightParen, "after arguments")?;
        Ok(args)
    }

    /// Whether the parenthesised group starting at the current token (just
    /// after `(`) is followed by `=>`.
    fn arrow_ahead(&self) -> bool {
        let mut depth = 1usize;
        for (i, token) in self.tokens[self.pos..].iter().enumerate() {
            match token.kind {
                TokenKind::LeftParen => depth += 1,
                TokenKind::RightParen => {
                    depth -= 1;
                    if depth == 0 {
                        return self.token(i + 1).kind == TokenKind::Arrow;
                    }
                }
                TokenKind::Eof => return false,
                _ => {}
            }
        }
        false
    }

    fn arrow_body(&mut self, params: Vec<Rc<str>>, line: u32) -> ParseResult<Expr> {
        let body = if self.eat(&TokenKind::LeftBrace) {
            self.block_body()?
        } else {
            let value_line = self.line();
            let value = self.expr_bp(ASSIGNMENT)?;
            vec![Stmt {
                kind: StmtKind::Return(Some(value)),
                line: value_line,
            }]
        };
        Ok(Expr::Function(Rc::new(Function {
            name: None,
            params,
            body,
            arrow: true,
            line,
        })))
    }

    fn array_literal(&mut self) -> ParseResult<Expr> {
        let mut elements = Vec::new();
        while !self.check(&TokenKind::RightBracket) {
            elements.push(self.expr_bp(ASSIGNMENT)?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RightBracket, "after array elements")?;
        Ok(Expr::Array(elements))
    }

    fn object_literal(&mut self) -> ParseResult<Expr> {
        let mut properties = Vec::new();
        while !self.check(&TokenKind::RightBrace) {
            let key: Rc<str> = match self.peek().clone() {
                TokenKind::String(s) => {
                    self.advance();
                    s
                }
                TokenKind::Number(n) => {
                    self.advance();
                    Rc::from(crate::value::number_to_string(n))
                }
                _ => self.property_name()?,
            };
            let value = if self.eat(&TokenKind::Colon) {
                self.expr_bp(ASSIGNMENT)?
            } else {
                Expr::Identifier(key.clone())
            };
            properties.push((key, value));
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RightBrace, "after object properties")?;
        Ok(Expr::Object(properties))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr(source: &str) -> Expr {
        let program = parse(source).unwrap_or_else(|e| panic!("{source}: {e:?}"));
        match &program[0].kind {
            StmtKind::Expr(e) => e.clone(),
            other => panic!("expected expression statement, got {other:?}"),
        }
    }

    fn num(n: f64) -> Box<Expr> {
        Box::new(Expr::Number(n))
    }

    #[test]
    fn precedence_and_associativity() {
        assert_eq!(
            expr("1 + 2 * 3"),
            Expr::Binary {
                op: BinaryOp::Add,
                left: num(1.0),
                right: Box::new(Expr::Binary {
                    op: BinaryOp::Multiply,
                    left: num(2.0),
                    right: num(3.0),
                }),
            }
        );
        assert_eq!(
            expr("1 - 2 - 3"),
            Expr::Binary {
                op: BinaryOp::Subtract,
                left: Box::new(Expr::Binary {
                    op: BinaryOp::Subtract,
                    left: num(1.0),
                    right: num(2.0),
                }),
                right: num(3.0),
            }
        );
        assert!(matches!(
            expr("a = b = 1"),
            Expr::Assign { value, .. } if matches!(*value, Expr::Assign { .. })
        ));
    }

    #[test]
    fn calls_members_and_new() {
        let e = expr("new Foo.Bar(1).baz[0](x)");
        let Expr::Call { callee, args } = e else {
            panic!("expected call");
        };
        assert_eq!(args, vec![Expr::Identifier("x".into())]);
        let Expr::Index { object, .. } = *callee else {
            panic!("expected index");
        };
        let Expr::Member { object, property } = *object else {
            panic!("expected member");
        };
        assert_eq!(&*property, "baz");
        assert!(matches!(*object, Expr::New { ref args, .. } if args.len() == 1));
    }

    #[test]
    fn arrow_functions() {
        assert!(matches!(
            expr("(a, b) => a + b"),
            Expr::Function(ref f) if f.arrow && f.params.len() == 2
        ));
        assert!(matches!(
            expr("x => { return x }"),
            Expr::Function(ref f) if f.arrow && f.params.len() == 1
        ));
        assert!(matches!(expr("(a + b)"), Expr::Binary { .. }));
    }

    #[test]
    fn statements_and_optional_semicolons() {
        let program = parse(
            "var x = 1\nlet y\nfunction f(a) { return a }\nif (x) y = 2; else { y = 3 }\n\
             for (var i = 0; i < 3; i++) {}\nwhile (false) ;\n\
             try { throw 1 } catch (e) { } finally { }",
        )
        .expect("parses");
        assert_eq!(program.len(), 7);
        assert!(matches!(program[2].kind, StmtKind::Function(_)));
        assert!(matches!(
            program[6].kind,
            StmtKind::Try { param: Some(_), handler: Some(_), finalizer: Some(_), .. }
        ));
        assert_eq!(program[1].line, 2);
    }

    #[test]
    fn return_ends_at_line_break() {
        let program = parse("function f() { return\n1 }").expect("parses");
        let StmtKind::Function(f) = &program[0].kind else {
            panic!("expected function");
        };
        assert_eq!(f.body[0].kind, StmtKind::Return(None));
    }

    #[test]
    fn errors_are_collected_with_lines() {
        let errors = parse("var = 1;\nvar ok = 2;\nx = (1 + ;\n").expect_err("fails");
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].line, 1);
        assert_eq!(errors[1].line, 3);
    }

    #[test]
    fn try_needs_a_handler() {
        assert!(parse("try { }").is_err());
    }

    #[test]
    fn keywords_work_as_property_names() {
        assert!(matches!(
            expr("promise.catch"),
            Expr::Member { ref property, .. } if &**property == "catch"
        ));
    }
}
