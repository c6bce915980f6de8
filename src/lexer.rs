use crate::ast::Token;

/// A token with its raw lexeme and character offset in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub text: String,
    pub position: usize,
}

/// An invalid token in the source text.
#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub position: usize,
    pub message: String,
}

impl std::fmt::Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at position {}", self.message, self.position)
    }
}

impl std::error::Error for LexError {}

#[derive(Clone)]
pub struct Lexer {
    input: Vec<char>,
    position: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn err(&self, position: usize, message: impl Into<String>) -> LexError {
        LexError {
            position,
            message: message.into(),
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if ch.is_alphanumeric() || ch == '_' {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    fn read_string(&mut self, quote: char) -> Result<String, LexError> {
        let start = self.position;
        let mut result = String::new();
        self.advance(); // consume opening quote

        while let Some(ch) = self.current_char() {
            match ch {
                c if c == quote => {
                    // Doubled quote is a literal quote (SQL convention)
                    if self.peek_char(1) == Some(quote) {
                        result.push(quote);
                        self.advance();
                        self.advance();
                    } else {
                        self.advance();
                        return Ok(result);
                    }
                }
                '\\' => {
                    self.advance(); // consume backslash
                    match self.current_char() {
                        Some('n') => result.push('\n'),
                        Some('t') => result.push('\t'),
                        Some('r') => result.push('\r'),
                        Some('\\') => result.push('\\'),
                        Some(c) if c == quote => result.push(quote),
                        // Anything else keeps the backslash: LIKE patterns
                        // carry their own escape character through the lexer.
                        Some(c) => {
                            result.push('\\');
                            result.push(c);
                        }
                        None => {
                            return Err(self.err(
                                start,
                                "unterminated string: unexpected end of input after backslash",
                            ));
                        }
                    }
                    self.advance();
                }
                _ => {
                    result.push(ch);
                    self.advance();
                }
            }
        }

        Err(self.err(start, "unterminated string: missing closing quote"))
    }

    fn read_number(&mut self) -> Result<Token, LexError> {
        let start = self.position;
        let mut number = String::new();
        let mut is_decimal = false;

        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                number.push(ch);
                self.advance();
            } else if ch == '.'
                && !is_decimal
                && self.peek_char(1).is_some_and(|c| c.is_ascii_digit())
            {
                is_decimal = true;
                number.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        // A four-digit year followed by '-' and a digit is a date-time
        // literal, not arithmetic over integers.
        if !is_decimal
            && number.len() == 4
            && self.current_char() == Some('-')
            && self.peek_char(1).is_some_and(|c| c.is_ascii_digit())
        {
            return Ok(self.read_datetime(number));
        }

        if is_decimal {
            number
                .parse::<f64>()
                .map(Token::Decimal)
                .map_err(|_| self.err(start, format!("invalid decimal literal '{}'", number)))
        } else {
            number
                .parse::<i64>()
                .map(Token::Integer)
                .map_err(|_| self.err(start, format!("integer literal '{}' out of range", number)))
        }
    }

    fn read_datetime(&mut self, mut text: String) -> Token {
        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() || matches!(ch, '-' | ':' | 'T' | 'Z' | '.' | '+') {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        Token::DateTime(text)
    }

    fn is_duration(ident: &str) -> bool {
        let mut chars = ident.chars();
        if !matches!(chars.next(), Some('P' | 'p')) {
            return false;
        }
        let rest = &ident[1..];
        !rest.is_empty()
            && rest.chars().any(|c| c.is_ascii_digit())
            && rest
                .chars()
                .all(|c| c.is_ascii_digit() || "YMWDHS T".contains(c.to_ascii_uppercase()))
    }

    pub fn next_token(&mut self) -> Result<Spanned, LexError> {
        self.skip_whitespace();
        let start = self.position;

        let token = match self.current_char() {
            None => Token::Eof,
            Some('(') => {
                self.advance();
                Token::LParen
            }
            Some(')') => {
                self.advance();
                Token::RParen
            }
            Some(',') => {
                self.advance();
                Token::Comma
            }
            Some(';') => {
                self.advance();
                Token::Semicolon
            }
            Some('.') => {
                self.advance();
                Token::Dot
            }
            Some('+') => {
                self.advance();
                Token::Plus
            }
            Some('-') => {
                self.advance();
                Token::Minus
            }
            Some('*') => {
                self.advance();
                Token::Star
            }
            Some('/') => {
                self.advance();
                Token::Slash
            }
            Some('=') => {
                self.advance();
                Token::Eq
            }
            Some('<') => match self.peek_char(1) {
                Some('=') => {
                    self.advance();
                    self.advance();
                    Token::LtEq
                }
                Some('>') => {
                    self.advance();
                    self.advance();
                    Token::Neq
                }
                _ => {
                    self.advance();
                    Token::Lt
                }
            },
            Some('>') => {
                if self.peek_char(1) == Some('=') {
                    self.advance();
                    self.advance();
                    Token::GtEq
                } else {
                    self.advance();
                    Token::Gt
                }
            }
            Some('\'') => Token::Str(self.read_string('\'')?),
            Some('"') => Token::Str(self.read_string('"')?),
            Some(ch) if ch.is_alphabetic() || ch == '_' => {
                let ident = self.read_identifier();
                match Token::keyword(&ident) {
                    Some(keyword) => keyword,
                    None if Self::is_duration(&ident) => Token::Duration(ident),
                    None => Token::Identifier(ident),
                }
            }
            Some(ch) if ch.is_ascii_digit() => self.read_number()?,
            Some(ch) => {
                return Err(self.err(start, format!("unexpected character '{}'", ch)));
            }
        };

        let text: String = self.input[start..self.position].iter().collect();
        Ok(Spanned {
            token,
            text,
            position: start,
        })
    }
}

#[test]
fn test_keywords() {
    let mut lexer = Lexer::new("AND or NOT like BETWEEN");
    assert_eq!(lexer.next_token().unwrap().token, Token::And);
    assert_eq!(lexer.next_token().unwrap().token, Token::Or);
    assert_eq!(lexer.next_token().unwrap().token, Token::Not);
    assert_eq!(lexer.next_token().unwrap().token, Token::Like);
    assert_eq!(lexer.next_token().unwrap().token, Token::Between);
}

#[test]
fn test_comparison() {
    let mut lexer = Lexer::new("depth <= 42.5");
    assert_eq!(
        lexer.next_token().unwrap().token,
        Token::Identifier("depth".to_string())
    );
    assert_eq!(lexer.next_token().unwrap().token, Token::LtEq);
    assert_eq!(lexer.next_token().unwrap().token, Token::Decimal(42.5));
    assert_eq!(lexer.next_token().unwrap().token, Token::Eof);
}
