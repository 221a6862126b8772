use crate::engine::ast::Span;

/// Syntax problem found while scanning or parsing, positioned by byte offset.
/// Converted into an error value with line/column information at the
/// `parse_program` boundary.
#[derive(Debug, Clone)]
pub(crate) struct SyntaxFault {
    pub message: String,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Keyword {
    Var,
    Let,
    Const,
    Function,
    If,
    Else,
    While,
    For,
    Return,
    Break,
    Continue,
    True,
    False,
    Null,
    Undefined,
    Typeof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Identifier,
    Number,
    String,
    Keyword(Keyword),
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Colon,
    Semicolon,
    Question,
    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    AmpAmp,
    PipePipe,
    Bang,
    BangEqual,
    BangEqualEqual,
    EqualEqual,
    EqualEqualEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Unknown,
    Eof,
}

#[derive(Debug, Clone)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub span: Span,
}

pub(crate) struct Lexer<'a> {
    source: &'a str,
    chars: std::str::CharIndices<'a>,
    current: usize,
    peeked: Option<(usize, char)>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices(),
            current: 0,
            peeked: None,
        }
    }

    fn bump(&mut self) -> Option<(usize, char)> {
        let next = if let Some((idx, ch)) = self.peeked.take() {
            Some((idx, ch))
        } else {
            self.chars.next()
        };
        if let Some((idx, ch)) = next {
            self.current = idx + ch.len_utf8();
            Some((idx, ch))
        } else {
            None
        }
    }

    fn peek(&mut self) -> Option<(usize, char)> {
        if self.peeked.is_none() {
            self.peeked = self.chars.next();
        }
        self.peeked
    }

    fn match_next(&mut self, expected: char) -> bool {
        if let Some((idx, ch)) = self.peek() {
            if ch == expected {
                self.peeked = None;
                self.current = idx + ch.len_utf8();
                return true;
            }
        }
        false
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), SyntaxFault> {
        loop {
            let mut progressed = false;

            while let Some((_, ch)) = self.peek() {
                if ch.is_whitespace() {
                    self.bump();
                    progressed = true;
                } else {
                    break;
                }
            }

            if let Some((start, '/')) = self.peek() {
                let mut lookahead = self.chars.clone();
                match lookahead.next() {
                    Some((_, '/')) => {
                        self.bump();
                        self.bump();
                        while let Some((_, ch)) = self.peek() {
                            if ch == '\n' {
                                break;
                            }
                            self.bump();
                        }
                        progressed = true;
                    }
                    Some((_, '*')) => {
                        self.bump();
                        self.bump();
                        let mut closed = false;
                        while let Some((_, ch)) = self.bump() {
                            if ch == '*' {
                                if let Some((_, '/')) = self.peek() {
                                    self.bump();
                                    closed = true;
                                    break;
                                }
                            }
                        }
                        if !closed {
                            return Err(SyntaxFault {
                                message: "unterminated comment".into(),
                                offset: start,
                            });
                        }
                        progressed = true;
                    }
                    _ => {}
                }
            }

            if !progressed {
                return Ok(());
            }
        }
    }

    fn identifier_or_keyword(&mut self, start: usize) -> Token {
        while let Some((_, ch)) = self.peek() {
            if ch.is_alphanumeric() || ch == '_' || ch == '$' {
                self.bump();
            } else {
                break;
            }
        }
        let end = self.current;
        let lexeme = self.source[start..end].to_string();
        let kind = keyword_for(&lexeme).unwrap_or(TokenKind::Identifier);
        Token {
            kind,
            lexeme,
            span: Span::new(start, end),
        }
    }

    fn number_literal(&mut self, start: usize) -> Token {
        let mut seen_dot = false;
        while let Some((_, ch)) = self.peek() {
            match ch {
                '0'..='9' => {
                    self.bump();
                }
                '.' if !seen_dot => {
                    seen_dot = true;
                    self.bump();
                }
                'e' | 'E' => {
                    self.bump();
                    if let Some((_, '+' | '-')) = self.peek() {
                        self.bump();
                    }
                }
                _ => break,
            }
        }
        let end = self.current;
        Token {
            kind: TokenKind::Number,
            lexeme: self.source[start..end].to_string(),
            span: Span::new(start, end),
        }
    }

    fn string_literal(&mut self, start: usize, quote: char) -> Result<Token, SyntaxFault> {
        let mut value = String::new();
        while let Some((idx, ch)) = self.bump() {
            match ch {
                c if c == quote => {
                    return Ok(Token {
                        kind: TokenKind::String,
                        lexeme: value,
                        span: Span::new(start, idx + ch.len_utf8()),
                    });
                }
                '\n' => break,
                '\\' => match self.bump() {
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, 'r')) => value.push('\r'),
                    Some((_, 't')) => value.push('\t'),
                    Some((_, '0')) => value.push('\0'),
                    Some((_, other)) => value.push(other),
                    None => break,
                },
                _ => value.push(ch),
            }
        }
        Err(SyntaxFault {
            message: "unterminated string literal".into(),
            offset: start,
        })
    }

    fn simple_token(&mut self, start: usize, kind: TokenKind) -> Token {
        let end = self.current;
        Token {
            kind,
            lexeme: self.source[start..end].to_string(),
            span: Span::new(start, end),
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, SyntaxFault> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace_and_comments()?;
            let (start, ch) = match self.bump() {
                Some(pair) => pair,
                None => {
                    tokens.push(Token {
                        kind: TokenKind::Eof,
                        lexeme: String::new(),
                        span: Span::new(self.current, self.current),
                    });
                    break;
                }
            };

            let token = match ch {
                'a'..='z' | 'A'..='Z' | '_' | '$' => self.identifier_or_keyword(start),
                '0'..='9' => self.number_literal(start),
                '"' | '\'' => self.string_literal(start, ch)?,
                '(' => self.simple_token(start, TokenKind::LParen),
                ')' => self.simple_token(start, TokenKind::RParen),
                '{' => self.simple_token(start, TokenKind::LBrace),
                '}' => self.simple_token(start, TokenKind::RBrace),
                '[' => self.simple_token(start, TokenKind::LBracket),
                ']' => self.simple_token(start, TokenKind::RBracket),
                ',' => self.simple_token(start, TokenKind::Comma),
                '.' => self.simple_token(start, TokenKind::Dot),
                ':' => self.simple_token(start, TokenKind::Colon),
                ';' => self.simple_token(start, TokenKind::Semicolon),
                '?' => self.simple_token(start, TokenKind::Question),
                '+' => self.simple_token(start, TokenKind::Plus),
                '-' => self.simple_token(start, TokenKind::Minus),
                '*' => self.simple_token(start, TokenKind::Star),
                '/' => self.simple_token(start, TokenKind::Slash),
                '%' => self.simple_token(start, TokenKind::Percent),
                '=' => {
                    if self.match_next('=') {
                        if self.match_next('=') {
                            self.simple_token(start, TokenKind::EqualEqualEqual)
                        } else {
                            self.simple_token(start, TokenKind::EqualEqual)
                        }
                    } else {
                        self.simple_token(start, TokenKind::Assign)
                    }
                }
                '!' => {
                    if self.match_next('=') {
                        if self.match_next('=') {
                            self.simple_token(start, TokenKind::BangEqualEqual)
                        } else {
                            self.simple_token(start, TokenKind::BangEqual)
                        }
                    } else {
                        self.simple_token(start, TokenKind::Bang)
                    }
                }
                '<' => {
                    if self.match_next('=') {
                        self.simple_token(start, TokenKind::LessEqual)
                    } else {
                        self.simple_token(start, TokenKind::Less)
                    }
                }
                '>' => {
                    if self.match_next('=') {
                        self.simple_token(start, TokenKind::GreaterEqual)
                    } else {
                        self.simple_token(start, TokenKind::Greater)
                    }
                }
                '&' => {
                    if self.match_next('&') {
                        self.simple_token(start, TokenKind::AmpAmp)
                    } else {
                        self.simple_token(start, TokenKind::Unknown)
                    }
                }
                '|' => {
                    if self.match_next('|') {
                        self.simple_token(start, TokenKind::PipePipe)
                    } else {
                        self.simple_token(start, TokenKind::Unknown)
                    }
                }
                _ => self.simple_token(start, TokenKind::Unknown),
            };
            tokens.push(token);
        }
        Ok(tokens)
    }
}

fn keyword_for(ident: &str) -> Option<TokenKind> {
    use self::Keyword as Kw;
    let keyword = match ident {
        "var" => Kw::Var,
        "let" => Kw::Let,
        "const" => Kw::Const,
        "function" => Kw::Function,
        "if" => Kw::If,
        "else" => Kw::Else,
        "while" => Kw::While,
        "for" => Kw::For,
        "return" => Kw::Return,
        "break" => Kw::Break,
        "continue" => Kw::Continue,
        "true" => Kw::True,
        "false" => Kw::False,
        "null" => Kw::Null,
        "undefined" => Kw::Undefined,
        "typeof" => Kw::Typeof,
        _ => return None,
    };
    Some(TokenKind::Keyword(keyword))
}
