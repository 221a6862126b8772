use crate::engine::{
    ast::{
        BinaryOp, DeclKind, Expr, ExprKind, Literal, LogicalOp, Program, Span, Stmt, StmtKind,
        UnaryOp,
    },
    lexer::{Keyword, Lexer, SyntaxFault, Token, TokenKind},
    value::ErrorValue,
};

/// Parse a top-level script. Syntax problems surface as `SyntaxError` values
/// whose message carries a `[line: L, column: C]` position marker.
pub(crate) fn parse_program(source: &str) -> Result<Program, ErrorValue> {
    match parse_raw(source) {
        Ok(program) => Ok(program),
        Err(fault) => {
            let (line, column) = line_col(source, fault.offset);
            Err(ErrorValue::syntax(fault.message, line, column))
        }
    }
}

fn parse_raw(source: &str) -> Result<Program, SyntaxFault> {
    let tokens = Lexer::new(source).tokenize()?;
    Parser::new(tokens).parse_program()
}

/// 1-based line and column of a byte offset.
pub(crate) fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let clamped = offset.min(source.len());
    let mut line = 1;
    let mut line_start = 0;
    for (idx, byte) in source.bytes().enumerate() {
        if idx >= clamped {
            break;
        }
        if byte == b'\n' {
            line += 1;
            line_start = idx + 1;
        }
    }
    (line, clamped - line_start + 1)
}

struct Parser {
    tokens: Vec<Token>,
    current: usize,
    fn_depth: usize,
    loop_depth: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            current: 0,
            fn_depth: 0,
            loop_depth: 0,
        }
    }

    fn parse_program(&mut self) -> Result<Program, SyntaxFault> {
        let mut body = Vec::new();
        while !self.check(&TokenKind::Eof) {
            body.push(self.statement()?);
        }
        Ok(Program { body })
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.current].clone();
        if self.current + 1 < self.tokens.len() {
            self.current += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn matches(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn matches_keyword(&mut self, keyword: Keyword) -> bool {
        if self.peek().kind == TokenKind::Keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> Result<Token, SyntaxFault> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(self.error_at_current(message))
        }
    }

    fn error_at_current(&self, message: &str) -> SyntaxFault {
        let token = self.peek();
        SyntaxFault {
            message: message.to_string(),
            offset: token.span.start,
        }
    }

    fn unexpected(&self) -> SyntaxFault {
        let token = self.peek();
        let message = if token.kind == TokenKind::Eof {
            "unexpected end of input".to_string()
        } else {
            format!("unexpected token `{}`", token.lexeme)
        };
        SyntaxFault {
            message,
            offset: token.span.start,
        }
    }

    fn statement(&mut self) -> Result<Stmt, SyntaxFault> {
        match &self.peek().kind {
            TokenKind::Keyword(Keyword::Var | Keyword::Let | Keyword::Const) => {
                let stmt = self.declaration()?;
                self.optional_semicolon();
                Ok(stmt)
            }
            TokenKind::Keyword(Keyword::Function) => self.function_declaration(),
            TokenKind::Keyword(Keyword::If) => self.if_statement(),
            TokenKind::Keyword(Keyword::While) => self.while_statement(),
            TokenKind::Keyword(Keyword::For) => self.for_statement(),
            TokenKind::Keyword(Keyword::Return) => self.return_statement(),
            TokenKind::Keyword(Keyword::Break) => {
                let token = self.advance();
                if self.loop_depth == 0 {
                    return Err(SyntaxFault {
                        message: "illegal break statement".into(),
                        offset: token.span.start,
                    });
                }
                self.optional_semicolon();
                Ok(Stmt {
                    kind: StmtKind::Break,
                    span: token.span,
                })
            }
            TokenKind::Keyword(Keyword::Continue) => {
                let token = self.advance();
                if self.loop_depth == 0 {
                    return Err(SyntaxFault {
                        message: "illegal continue statement".into(),
                        offset: token.span.start,
                    });
                }
                self.optional_semicolon();
                Ok(Stmt {
                    kind: StmtKind::Continue,
                    span: token.span,
                })
            }
            TokenKind::LBrace => self.block_statement(),
            TokenKind::Semicolon => {
                let token = self.advance();
                Ok(Stmt {
                    kind: StmtKind::Block(Vec::new()),
                    span: token.span,
                })
            }
            _ => {
                let expr = self.expression()?;
                self.optional_semicolon();
                let span = expr.span;
                Ok(Stmt {
                    kind: StmtKind::Expr(expr),
                    span,
                })
            }
        }
    }

    fn declaration(&mut self) -> Result<Stmt, SyntaxFault> {
        let keyword = self.advance();
        let kind = match keyword.kind {
            TokenKind::Keyword(Keyword::Var) => DeclKind::Var,
            TokenKind::Keyword(Keyword::Let) => DeclKind::Let,
            _ => DeclKind::Const,
        };
        let name = self.consume(TokenKind::Identifier, "expected variable name")?;
        let initializer = if self.matches(&TokenKind::Assign) {
            Some(self.expression()?)
        } else {
            None
        };
        if kind == DeclKind::Const && initializer.is_none() {
            return Err(SyntaxFault {
                message: "missing initializer in const declaration".into(),
                offset: name.span.start,
            });
        }
        let end = initializer
            .as_ref()
            .map(|expr| expr.span.end)
            .unwrap_or(name.span.end);
        Ok(Stmt {
            kind: StmtKind::Decl {
                kind,
                name: name.lexeme,
                initializer,
            },
            span: Span::new(keyword.span.start, end),
        })
    }

    fn function_declaration(&mut self) -> Result<Stmt, SyntaxFault> {
        let keyword = self.advance();
        let name = self.consume(TokenKind::Identifier, "expected function name")?;
        let params = self.parameter_list()?;
        let body = self.function_body()?;
        let end = self.previous().span.end;
        Ok(Stmt {
            kind: StmtKind::Function {
                name: name.lexeme,
                params,
                body,
            },
            span: Span::new(keyword.span.start, end),
        })
    }

    fn parameter_list(&mut self) -> Result<Vec<String>, SyntaxFault> {
        self.consume(TokenKind::LParen, "expected `(` before parameter list")?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                let param = self.consume(TokenKind::Identifier, "expected parameter name")?;
                params.push(param.lexeme);
                if !self.matches(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RParen, "expected `)` after parameter list")?;
        Ok(params)
    }

    fn function_body(&mut self) -> Result<Vec<Stmt>, SyntaxFault> {
        self.consume(TokenKind::LBrace, "expected `{` before function body")?;
        self.fn_depth += 1;
        let saved_loop_depth = std::mem::replace(&mut self.loop_depth, 0);
        let mut body = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.check(&TokenKind::Eof) {
            match self.statement() {
                Ok(stmt) => body.push(stmt),
                Err(fault) => {
                    self.fn_depth -= 1;
                    self.loop_depth = saved_loop_depth;
                    return Err(fault);
                }
            }
        }
        self.fn_depth -= 1;
        self.loop_depth = saved_loop_depth;
        self.consume(TokenKind::RBrace, "expected `}` after function body")?;
        Ok(body)
    }

    fn if_statement(&mut self) -> Result<Stmt, SyntaxFault> {
        let keyword = self.advance();
        self.consume(TokenKind::LParen, "expected `(` after `if`")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RParen, "expected `)` after if condition")?;
        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.matches_keyword(Keyword::Else) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        let end = self.previous().span.end;
        Ok(Stmt {
            kind: StmtKind::If {
                condition,
                then_branch,
                else_branch,
            },
            span: Span::new(keyword.span.start, end),
        })
    }

    fn while_statement(&mut self) -> Result<Stmt, SyntaxFault> {
        let keyword = self.advance();
        self.consume(TokenKind::LParen, "expected `(` after `while`")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RParen, "expected `)` after while condition")?;
        self.loop_depth += 1;
        let body = self.statement();
        self.loop_depth -= 1;
        let body = Box::new(body?);
        let end = self.previous().span.end;
        Ok(Stmt {
            kind: StmtKind::While { condition, body },
            span: Span::new(keyword.span.start, end),
        })
    }

    fn for_statement(&mut self) -> Result<Stmt, SyntaxFault> {
        let keyword = self.advance();
        self.consume(TokenKind::LParen, "expected `(` after `for`")?;

        let init = if self.matches(&TokenKind::Semicolon) {
            None
        } else {
            let stmt = if matches!(
                self.peek().kind,
                TokenKind::Keyword(Keyword::Var | Keyword::Let | Keyword::Const)
            ) {
                self.declaration()?
            } else {
                let expr = self.expression()?;
                let span = expr.span;
                Stmt {
                    kind: StmtKind::Expr(expr),
                    span,
                }
            };
            self.consume(TokenKind::Semicolon, "expected `;` after for initializer")?;
            Some(Box::new(stmt))
        };

        let condition = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenKind::Semicolon, "expected `;` after for condition")?;

        let update = if self.check(&TokenKind::RParen) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenKind::RParen, "expected `)` after for clauses")?;

        self.loop_depth += 1;
        let body = self.statement();
        self.loop_depth -= 1;
        let body = Box::new(body?);
        let end = self.previous().span.end;
        Ok(Stmt {
            kind: StmtKind::For {
                init,
                condition,
                update,
                body,
            },
            span: Span::new(keyword.span.start, end),
        })
    }

    fn return_statement(&mut self) -> Result<Stmt, SyntaxFault> {
        let keyword = self.advance();
        if self.fn_depth == 0 {
            return Err(SyntaxFault {
                message: "illegal return statement".into(),
                offset: keyword.span.start,
            });
        }
        let value = if self.check(&TokenKind::Semicolon)
            || self.check(&TokenKind::RBrace)
            || self.check(&TokenKind::Eof)
        {
            None
        } else {
            Some(self.expression()?)
        };
        self.optional_semicolon();
        let end = value
            .as_ref()
            .map(|expr| expr.span.end)
            .unwrap_or(keyword.span.end);
        Ok(Stmt {
            kind: StmtKind::Return(value),
            span: Span::new(keyword.span.start, end),
        })
    }

    fn block_statement(&mut self) -> Result<Stmt, SyntaxFault> {
        let open = self.advance();
        let mut body = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.check(&TokenKind::Eof) {
            body.push(self.statement()?);
        }
        self.consume(TokenKind::RBrace, "expected `}` after block")?;
        let end = self.previous().span.end;
        Ok(Stmt {
            kind: StmtKind::Block(body),
            span: Span::new(open.span.start, end),
        })
    }

    fn optional_semicolon(&mut self) {
        self.matches(&TokenKind::Semicolon);
    }

    fn expression(&mut self) -> Result<Expr, SyntaxFault> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr, SyntaxFault> {
        let target = self.conditional()?;
        if self.matches(&TokenKind::Assign) {
            if !matches!(
                target.kind,
                ExprKind::Identifier(_) | ExprKind::Member { .. } | ExprKind::Index { .. }
            ) {
                return Err(SyntaxFault {
                    message: "invalid assignment target".into(),
                    offset: target.span.start,
                });
            }
            let value = self.assignment()?;
            let span = Span::new(target.span.start, value.span.end);
            return Ok(Expr {
                kind: ExprKind::Assign {
                    target: Box::new(target),
                    value: Box::new(value),
                },
                span,
            });
        }
        Ok(target)
    }

    fn conditional(&mut self) -> Result<Expr, SyntaxFault> {
        let condition = self.logical_or()?;
        if self.matches(&TokenKind::Question) {
            let consequent = self.assignment()?;
            self.consume(TokenKind::Colon, "expected `:` in conditional expression")?;
            let alternate = self.assignment()?;
            let span = Span::new(condition.span.start, alternate.span.end);
            return Ok(Expr {
                kind: ExprKind::Conditional {
                    condition: Box::new(condition),
                    consequent: Box::new(consequent),
                    alternate: Box::new(alternate),
                },
                span,
            });
        }
        Ok(condition)
    }

    fn logical_or(&mut self) -> Result<Expr, SyntaxFault> {
        let mut left = self.logical_and()?;
        while self.matches(&TokenKind::PipePipe) {
            let right = self.logical_and()?;
            let span = Span::new(left.span.start, right.span.end);
            left = Expr {
                kind: ExprKind::Logical {
                    op: LogicalOp::Or,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            };
        }
        Ok(left)
    }

    fn logical_and(&mut self) -> Result<Expr, SyntaxFault> {
        let mut left = self.equality()?;
        while self.matches(&TokenKind::AmpAmp) {
            let right = self.equality()?;
            let span = Span::new(left.span.start, right.span.end);
            left = Expr {
                kind: ExprKind::Logical {
                    op: LogicalOp::And,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            };
        }
        Ok(left)
    }

    fn equality(&mut self) -> Result<Expr, SyntaxFault> {
        let mut left = self.relational()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::EqualEqual => BinaryOp::Eq,
                TokenKind::BangEqual => BinaryOp::NotEq,
                TokenKind::EqualEqualEqual => BinaryOp::StrictEq,
                TokenKind::BangEqualEqual => BinaryOp::StrictNotEq,
                _ => break,
            };
            self.advance();
            let right = self.relational()?;
            let span = Span::new(left.span.start, right.span.end);
            left = Expr {
                kind: ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            };
        }
        Ok(left)
    }

    fn relational(&mut self) -> Result<Expr, SyntaxFault> {
        let mut left = self.additive()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Less => BinaryOp::Less,
                TokenKind::LessEqual => BinaryOp::LessEq,
                TokenKind::Greater => BinaryOp::Greater,
                TokenKind::GreaterEqual => BinaryOp::GreaterEq,
                _ => break,
            };
            self.advance();
            let right = self.additive()?;
            let span = Span::new(left.span.start, right.span.end);
            left = Expr {
                kind: ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            };
        }
        Ok(left)
    }

    fn additive(&mut self) -> Result<Expr, SyntaxFault> {
        let mut left = self.multiplicative()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.multiplicative()?;
            let span = Span::new(left.span.start, right.span.end);
            left = Expr {
                kind: ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            };
        }
        Ok(left)
    }

    fn multiplicative(&mut self) -> Result<Expr, SyntaxFault> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Rem,
                _ => break,
            };
            self.advance();
            let right = self.unary()?;
            let span = Span::new(left.span.start, right.span.end);
            left = Expr {
                kind: ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            };
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, SyntaxFault> {
        let op = match self.peek().kind {
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Keyword(Keyword::Typeof) => Some(UnaryOp::TypeOf),
            _ => None,
        };
        if let Some(op) = op {
            let token = self.advance();
            let expr = self.unary()?;
            let span = Span::new(token.span.start, expr.span.end);
            return Ok(Expr {
                kind: ExprKind::Unary {
                    op,
                    expr: Box::new(expr),
                },
                span,
            });
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr, SyntaxFault> {
        let mut expr = self.primary()?;
        loop {
            if self.matches(&TokenKind::LParen) {
                let mut args = Vec::new();
                if !self.check(&TokenKind::RParen) {
                    loop {
                        args.push(self.assignment()?);
                        if !self.matches(&TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.consume(TokenKind::RParen, "expected `)` after arguments")?;
                let span = Span::new(expr.span.start, self.previous().span.end);
                expr = Expr {
                    kind: ExprKind::Call {
                        callee: Box::new(expr),
                        args,
                    },
                    span,
                };
            } else if self.matches(&TokenKind::Dot) {
                let property = self.consume(TokenKind::Identifier, "expected property name")?;
                let span = Span::new(expr.span.start, property.span.end);
                expr = Expr {
                    kind: ExprKind::Member {
                        object: Box::new(expr),
                        property: property.lexeme,
                    },
                    span,
                };
            } else if self.matches(&TokenKind::LBracket) {
                let index = self.expression()?;
                self.consume(TokenKind::RBracket, "expected `]` after index")?;
                let span = Span::new(expr.span.start, self.previous().span.end);
                expr = Expr {
                    kind: ExprKind::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                    },
                    span,
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr, SyntaxFault> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Number => {
                self.advance();
                let number: f64 = token.lexeme.parse().map_err(|_| SyntaxFault {
                    message: format!("invalid number literal `{}`", token.lexeme),
                    offset: token.span.start,
                })?;
                Ok(Expr {
                    kind: ExprKind::Literal(Literal::Number(number)),
                    span: token.span,
                })
            }
            TokenKind::String => {
                self.advance();
                Ok(Expr {
                    kind: ExprKind::Literal(Literal::String(token.lexeme)),
                    span: token.span,
                })
            }
            TokenKind::Keyword(Keyword::True) => {
                self.advance();
                Ok(Expr {
                    kind: ExprKind::Literal(Literal::Bool(true)),
                    span: token.span,
                })
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance();
                Ok(Expr {
                    kind: ExprKind::Literal(Literal::Bool(false)),
                    span: token.span,
                })
            }
            TokenKind::Keyword(Keyword::Null) => {
                self.advance();
                Ok(Expr {
                    kind: ExprKind::Literal(Literal::Null),
                    span: token.span,
                })
            }
            TokenKind::Keyword(Keyword::Undefined) => {
                self.advance();
                Ok(Expr {
                    kind: ExprKind::Literal(Literal::Undefined),
                    span: token.span,
                })
            }
            TokenKind::Identifier => {
                self.advance();
                Ok(Expr {
                    kind: ExprKind::Identifier(token.lexeme),
                    span: token.span,
                })
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.expression()?;
                self.consume(TokenKind::RParen, "expected `)` after expression")?;
                let span = Span::new(token.span.start, self.previous().span.end);
                Ok(Expr {
                    kind: ExprKind::Group(Box::new(inner)),
                    span,
                })
            }
            TokenKind::LBracket => {
                self.advance();
                let mut elements = Vec::new();
                while !self.check(&TokenKind::RBracket) {
                    elements.push(self.assignment()?);
                    if !self.matches(&TokenKind::Comma) {
                        break;
                    }
                }
                self.consume(TokenKind::RBracket, "expected `]` after array literal")?;
                let span = Span::new(token.span.start, self.previous().span.end);
                Ok(Expr {
                    kind: ExprKind::Array(elements),
                    span,
                })
            }
            TokenKind::LBrace => {
                self.advance();
                let mut entries = Vec::new();
                while !self.check(&TokenKind::RBrace) {
                    let key = match &self.peek().kind {
                        TokenKind::Identifier | TokenKind::String => self.advance().lexeme,
                        TokenKind::Number => self.advance().lexeme,
                        _ => return Err(self.error_at_current("expected property key")),
                    };
                    self.consume(TokenKind::Colon, "expected `:` after property key")?;
                    let value = self.assignment()?;
                    entries.push((key, value));
                    if !self.matches(&TokenKind::Comma) {
                        break;
                    }
                }
                self.consume(TokenKind::RBrace, "expected `}` after object literal")?;
                let span = Span::new(token.span.start, self.previous().span.end);
                Ok(Expr {
                    kind: ExprKind::Object(entries),
                    span,
                })
            }
            TokenKind::Keyword(Keyword::Function) => {
                self.advance();
                let name = if self.check(&TokenKind::Identifier) {
                    Some(self.advance().lexeme)
                } else {
                    None
                };
                let params = self.parameter_list()?;
                let body = self.function_body()?;
                let span = Span::new(token.span.start, self.previous().span.end);
                Ok(Expr {
                    kind: ExprKind::Function { name, params, body },
                    span,
                })
            }
            _ => Err(self.unexpected()),
        }
    }
}
