use crate::token::{Span, Token, TokenKind};

/// Tolerant tokenizer for TSX/JSX/TS/JS source.
///
/// The lexer never fails: malformed input produces `TokenKind::Error`
/// tokens and scanning continues with the next character.
pub struct Lexer<'a> {
    source: &'a str,
    chars: std::str::CharIndices<'a>,
    current_pos: usize,
    current_char: Option<char>,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer from source code.
    pub fn new(source: &'a str) -> Self {
        let mut chars = source.char_indices();
        let current_char = chars.next().map(|(_, c)| c);
        Self {
            source,
            chars,
            current_pos: 0,
            current_char,
        }
    }

    /// Tokenizes the entire source code and returns all tokens.
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }

    /// Gets the next token from the source.
    pub fn next_token(&mut self) -> Token {
        if let Some(error_token) = self.skip_whitespace_and_comments() {
            return error_token;
        }

        let start = self.current_pos;

        match self.current_char {
            None => Token::new(TokenKind::Eof, Span::new(start, start), String::new()),
            Some(ch) => match ch {
                '"' | '\'' => self.read_string_literal(ch),
                '`' => self.read_template_literal(),
                '0'..='9' => self.read_number(),
                'a'..='z' | 'A'..='Z' | '_' | '$' => self.read_identifier_or_keyword(),
                '.' => self.read_dot(),
                '(' => self.single(TokenKind::LParen, start),
                ')' => self.single(TokenKind::RParen, start),
                '{' => self.single(TokenKind::LBrace, start),
                '}' => self.single(TokenKind::RBrace, start),
                '[' => self.single(TokenKind::LBracket, start),
                ']' => self.single(TokenKind::RBracket, start),
                ';' => self.single(TokenKind::Semicolon, start),
                ',' => self.single(TokenKind::Comma, start),
                ':' => self.single(TokenKind::Colon, start),
                '*' => self.single(TokenKind::Star, start),
                '=' => self.single(TokenKind::Eq, start),
                '<' => self.single(TokenKind::Lt, start),
                '>' => self.single(TokenKind::Gt, start),
                _ if ch.is_alphabetic() => self.read_identifier_or_keyword(),
                _ => self.single(TokenKind::Punct, start),
            },
        }
    }

    /// The source this lexer was created with.
    pub fn source(&self) -> &'a str {
        self.source
    }

    // Helper methods

    fn single(&mut self, kind: TokenKind, start: usize) -> Token {
        self.advance();
        let span = Span::new(start, self.current_pos);
        Token::new(kind, span, self.source[span.start..span.end].to_string())
    }

    fn advance(&mut self) {
        if let Some((pos, ch)) = self.chars.next() {
            self.current_pos = pos;
            self.current_char = Some(ch);
        } else {
            self.current_pos = self.source.len();
            self.current_char = None;
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.clone().next().map(|(_, c)| c)
    }

    fn skip_whitespace_and_comments(&mut self) -> Option<Token> {
        loop {
            match self.current_char {
                Some(ch) if ch.is_whitespace() => {
                    self.advance();
                }
                Some('/') => {
                    if self.peek() == Some('/') {
                        self.skip_single_line_comment();
                    } else if self.peek() == Some('*') {
                        let start = self.current_pos;
                        if !self.skip_multi_line_comment() {
                            return Some(Token::new(
                                TokenKind::Error,
                                Span::new(start, self.current_pos),
                                "Unterminated multi-line comment".to_string(),
                            ));
                        }
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }
        None
    }

    fn skip_single_line_comment(&mut self) {
        self.advance();
        self.advance();

        while let Some(ch) = self.current_char {
            if ch == '\n' {
                self.advance();
                break;
            }
            self.advance();
        }
    }

    fn skip_multi_line_comment(&mut self) -> bool {
        self.advance();
        self.advance();

        while let Some(ch) = self.current_char {
            if ch == '*' && self.peek() == Some('/') {
                self.advance();
                self.advance();
                return true;
            }
            self.advance();
        }
        false
    }

    fn read_string_literal(&mut self, quote: char) -> Token {
        let start = self.current_pos;
        self.advance();

        let mut value = String::new();

        while let Some(ch) = self.current_char {
            if ch == quote {
                self.advance();
                return Token::new(
                    TokenKind::StringLiteral,
                    Span::new(start, self.current_pos),
                    value,
                );
            } else if ch == '\\' {
                self.advance();
                if let Some(escaped) = self.current_char {
                    let unescaped = match escaped {
                        'n' => '\n',
                        'r' => '\r',
                        't' => '\t',
                        '0' => '\0',
                        _ => escaped,
                    };
                    value.push(unescaped);
                    self.advance();
                }
            } else if ch == '\n' {
                // Apostrophes in JSX text land here; resume on the next line.
                return Token::new(
                    TokenKind::Error,
                    Span::new(start, self.current_pos),
                    "Unterminated string literal".to_string(),
                );
            } else {
                value.push(ch);
                self.advance();
            }
        }

        Token::new(
            TokenKind::Error,
            Span::new(start, self.current_pos),
            "Unterminated string literal".to_string(),
        )
    }

    fn read_template_literal(&mut self) -> Token {
        let start = self.current_pos;
        self.advance();

        let mut value = String::new();

        while let Some(ch) = self.current_char {
            match ch {
                '`' => {
                    self.advance();
                    return Token::new(
                        TokenKind::TemplateLiteral,
                        Span::new(start, self.current_pos),
                        value,
                    );
                }
                '\\' => {
                    self.advance();
                    if let Some(escaped) = self.current_char {
                        value.push(escaped);
                        self.advance();
                    }
                }
                '$' if self.peek() == Some('{') => {
                    let sub_start = self.current_pos;
                    self.advance();
                    self.advance();
                    self.skip_substitution();
                    value.push_str(&self.source[sub_start..self.current_pos]);
                }
                _ => {
                    value.push(ch);
                    self.advance();
                }
            }
        }

        Token::new(
            TokenKind::Error,
            Span::new(start, self.current_pos),
            "Unterminated template literal".to_string(),
        )
    }

    /// Skips a `${ ... }` body, including nested strings and templates.
    fn skip_substitution(&mut self) {
        let mut depth = 1usize;
        while let Some(ch) = self.current_char {
            match ch {
                '{' => {
                    depth += 1;
                    self.advance();
                }
                '}' => {
                    depth -= 1;
                    self.advance();
                    if depth == 0 {
                        return;
                    }
                }
                '`' => {
                    self.read_template_literal();
                }
                '"' | '\'' => {
                    self.read_string_literal(ch);
                }
                _ => self.advance(),
            }
        }
    }

    fn read_number(&mut self) -> Token {
        let start = self.current_pos;
        while let Some(ch) = self.current_char {
            if ch.is_ascii_alphanumeric() || ch == '_' || ch == '.' {
                self.advance();
            } else {
                break;
            }
        }
        let span = Span::new(start, self.current_pos);
        Token::new(
            TokenKind::NumberLiteral,
            span,
            self.source[span.start..span.end].to_string(),
        )
    }

    fn read_identifier_or_keyword(&mut self) -> Token {
        let start = self.current_pos;
        let mut value = String::new();

        while let Some(ch) = self.current_char {
            if ch.is_alphanumeric() || ch == '_' || ch == '$' {
                value.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        let kind = match value.as_str() {
            "import" => TokenKind::Import,
            "export" => TokenKind::Export,
            "from" => TokenKind::From,
            "as" => TokenKind::As,
            "default" => TokenKind::Default,
            "type" => TokenKind::Type,
            "interface" => TokenKind::Interface,
            "function" => TokenKind::Function,
            "class" => TokenKind::Class,
            "const" => TokenKind::Const,
            "let" => TokenKind::Let,
            "var" => TokenKind::Var,
            "enum" => TokenKind::Enum,
            "async" => TokenKind::Async,
            "declare" => TokenKind::Declare,
            "abstract" => TokenKind::Abstract,
            "namespace" => TokenKind::Namespace,
            _ => TokenKind::Identifier,
        };

        Token::new(kind, Span::new(start, self.current_pos), value)
    }

    fn read_dot(&mut self) -> Token {
        let start = self.current_pos;
        if self.source[start..].starts_with("...") {
            self.advance();
            self.advance();
            self.advance();
            return Token::new(
                TokenKind::DotDotDot,
                Span::new(start, self.current_pos),
                "...".to_string(),
            );
        }
        self.single(TokenKind::Dot, start)
    }
}
