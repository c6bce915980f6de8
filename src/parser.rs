//! Recursive-descent parser over the textual filter grammar.
//!
//! The parser never builds a tree itself. Each time it closes a grammar
//! production it raises a reduce event (the [`NodeType`] tag plus the
//! token that anchored the production) into a pluggable [`Reducer`].
//! Operand results flow through the reducer's own stack, so the parser
//! stays a pure recognizer and the build policy lives entirely in the
//! reducer implementation.

use std::mem;

use crate::ast::Token;
use crate::error::{CompileError, ErrorKind};
use crate::lexer::{Lexer, Spanned};
use crate::node::NodeType;

/// The lexeme, character offset and 0-based token index a reduce event is
/// anchored to. String-literal reduces carry the decoded payload as text;
/// numeric reduces carry the raw lexeme so sign re-forming can reparse it.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceToken {
    pub text: String,
    pub position: usize,
    pub index: usize,
}

/// Receives one event per closed grammar production, child productions
/// first.
pub trait Reducer {
    fn reduce(&mut self, node: NodeType, token: &SourceToken) -> Result<(), CompileError>;
}

pub struct Parser<'r> {
    source: String,
    lexer: Lexer,
    current: Spanned,
    index: usize,
    reducer: &'r mut dyn Reducer,
}

impl<'r> Parser<'r> {
    pub fn new(source: &str, reducer: &'r mut dyn Reducer) -> Result<Self, CompileError> {
        let mut lexer = Lexer::new(source);
        let current = match lexer.next_token() {
            Ok(spanned) => spanned,
            Err(err) => {
                return Err(CompileError::new(
                    ErrorKind::Lexical,
                    err.message.clone(),
                    "",
                    0,
                    err.position,
                    source,
                ));
            }
        };
        Ok(Parser {
            source: source.to_string(),
            lexer,
            current,
            index: 0,
            reducer,
        })
    }

    /// Parse one complete filter; the whole input must be consumed.
    pub fn parse_filter(&mut self) -> Result<(), CompileError> {
        self.parse_or()?;
        self.expect_eof()
    }

    /// Parse a `;`-separated sequence of filters, returning how many were
    /// closed. A trailing separator is allowed.
    pub fn parse_filter_list(&mut self) -> Result<usize, CompileError> {
        let mut count = 0;
        loop {
            self.parse_or()?;
            count += 1;
            if self.current.token == Token::Semicolon {
                self.advance()?;
                if self.current.token == Token::Eof {
                    break;
                }
            } else {
                break;
            }
        }
        self.expect_eof()?;
        Ok(count)
    }

    /// Parse one complete expression; the whole input must be consumed.
    pub fn parse_expression(&mut self) -> Result<(), CompileError> {
        self.parse_expr()?;
        self.expect_eof()
    }

    // ----- token plumbing -----

    fn advance(&mut self) -> Result<(), CompileError> {
        match self.lexer.next_token() {
            Ok(spanned) => {
                self.current = spanned;
                self.index += 1;
                Ok(())
            }
            Err(err) => Err(CompileError::new(
                ErrorKind::Lexical,
                err.message.clone(),
                self.current.text.clone(),
                self.index,
                err.position,
                self.source.clone(),
            )),
        }
    }

    fn source_token(&self) -> SourceToken {
        SourceToken {
            text: self.current.text.clone(),
            position: self.current.position,
            index: self.index,
        }
    }

    fn reduce(&mut self, node: NodeType, token: &SourceToken) -> Result<(), CompileError> {
        self.reducer.reduce(node, token)
    }

    fn syntax_error(&self, message: impl Into<String>) -> CompileError {
        CompileError::new(
            ErrorKind::Syntax,
            message,
            self.current.text.clone(),
            self.index,
            self.current.position,
            self.source.clone(),
        )
    }

    fn expect(&mut self, expected: &Token, what: &str) -> Result<Spanned, CompileError> {
        if mem::discriminant(&self.current.token) == mem::discriminant(expected) {
            let spanned = self.current.clone();
            self.advance()?;
            Ok(spanned)
        } else {
            Err(self.syntax_error(format!("expected {}, found '{}'", what, self.current.text)))
        }
    }

    fn expect_eof(&mut self) -> Result<(), CompileError> {
        if self.current.token == Token::Eof {
            Ok(())
        } else {
            Err(self.syntax_error(format!(
                "unexpected trailing input '{}'",
                self.current.text
            )))
        }
    }

    fn check(&self, token: &Token) -> bool {
        mem::discriminant(&self.current.token) == mem::discriminant(token)
    }

    fn eat(&mut self, token: &Token) -> Result<bool, CompileError> {
        if self.check(token) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    // ----- filters -----

    fn parse_or(&mut self) -> Result<(), CompileError> {
        self.parse_and()?;
        while self.current.token == Token::Or {
            let token = self.source_token();
            self.advance()?;
            self.parse_and()?;
            self.reduce(NodeType::Or, &token)?;
        }
        Ok(())
    }

    fn parse_and(&mut self) -> Result<(), CompileError> {
        self.parse_unary_filter()?;
        while self.current.token == Token::And {
            let token = self.source_token();
            self.advance()?;
            self.parse_unary_filter()?;
            self.reduce(NodeType::And, &token)?;
        }
        Ok(())
    }

    fn parse_unary_filter(&mut self) -> Result<(), CompileError> {
        if self.current.token == Token::Not {
            let token = self.source_token();
            self.advance()?;
            // `NOT IN (...)` with no left operand is the negated id filter.
            if self.current.token == Token::In {
                return self.parse_id_predicate(NodeType::NotId);
            }
            self.parse_unary_filter()?;
            return self.reduce(NodeType::Not, &token);
        }
        self.parse_predicate()
    }

    fn parse_predicate(&mut self) -> Result<(), CompileError> {
        if self.current.token == Token::LParen && !self.paren_opens_expression()? {
            self.advance()?;
            self.parse_or()?;
            self.expect(&Token::RParen, "')'")?;
            return Ok(());
        }
        match &self.current.token {
            Token::Include => {
                let token = self.source_token();
                self.advance()?;
                self.reduce(NodeType::Include, &token)
            }
            Token::Exclude => {
                let token = self.source_token();
                self.advance()?;
                self.reduce(NodeType::Exclude, &token)
            }
            Token::In => self.parse_id_predicate(NodeType::Id),
            Token::Equals
            | Token::Disjoint
            | Token::Intersects
            | Token::Touches
            | Token::Crosses
            | Token::Within
            | Token::Contains
            | Token::Overlaps => self.parse_binary_spatial(),
            Token::Relate => self.parse_relate(),
            Token::Bbox => self.parse_bbox(),
            Token::Dwithin | Token::Beyond => self.parse_distance(),
            _ => self.parse_expression_predicate(),
        }
    }

    /// Disambiguate `(` at predicate position: a parenthesized expression
    /// is followed by a comparison, arithmetic or predicate keyword after
    /// its matching `)`; a parenthesized filter is not. Decided by scanning
    /// ahead on a throwaway lexer.
    fn paren_opens_expression(&self) -> Result<bool, CompileError> {
        let mut lookahead = self.lexer.clone();
        let mut depth = 1usize;
        loop {
            let spanned = match lookahead.next_token() {
                Ok(spanned) => spanned,
                Err(_) => return Ok(false),
            };
            match spanned.token {
                Token::LParen => depth += 1,
                Token::RParen => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                Token::Eof => return Ok(false),
                _ => {}
            }
        }
        let next = match lookahead.next_token() {
            Ok(spanned) => spanned.token,
            Err(_) => return Ok(false),
        };
        Ok(matches!(
            next,
            Token::Eq
                | Token::Neq
                | Token::Lt
                | Token::Gt
                | Token::LtEq
                | Token::GtEq
                | Token::Plus
                | Token::Minus
                | Token::Star
                | Token::Slash
                | Token::Not
                | Token::Between
                | Token::Like
                | Token::ILike
                | Token::Is
                | Token::In
                | Token::Before
                | Token::After
                | Token::During
        ))
    }

    /// A duration token starts a period only when `/` and a date-time
    /// follow. Decided by scanning ahead on a throwaway lexer.
    fn duration_opens_period(&self) -> bool {
        let mut lookahead = self.lexer.clone();
        match lookahead.next_token() {
            Ok(spanned) if spanned.token == Token::Slash => {}
            _ => return false,
        }
        matches!(
            lookahead.next_token(),
            Ok(spanned) if matches!(spanned.token, Token::DateTime(_))
        )
    }

    fn parse_expression_predicate(&mut self) -> Result<(), CompileError> {
        self.parse_expr()?;
        let token = self.source_token();
        match &self.current.token {
            Token::Eq => self.parse_comparison_rhs(NodeType::Equal, token),
            Token::Neq => self.parse_comparison_rhs(NodeType::NotEqual, token),
            Token::Lt => self.parse_comparison_rhs(NodeType::Less, token),
            Token::Gt => self.parse_comparison_rhs(NodeType::Greater, token),
            Token::LtEq => self.parse_comparison_rhs(NodeType::LessEqual, token),
            Token::GtEq => self.parse_comparison_rhs(NodeType::GreaterEqual, token),
            Token::Between => self.parse_between(NodeType::Between, token),
            Token::Like => self.parse_like(NodeType::Like, token),
            Token::ILike => self.parse_like(NodeType::ILike, token),
            Token::In => self.parse_in_list(NodeType::In, token),
            Token::Is => self.parse_null_check(token),
            Token::Not => {
                self.advance()?;
                let negated = self.source_token();
                match &self.current.token {
                    Token::Between => self.parse_between(NodeType::NotBetween, negated),
                    Token::Like => self.parse_like(NodeType::NotLike, negated),
                    Token::ILike => self.parse_like(NodeType::NotILike, negated),
                    Token::In => self.parse_in_list(NodeType::NotIn, negated),
                    _ => Err(self.syntax_error(format!(
                        "expected BETWEEN, LIKE, ILIKE or IN after NOT, found '{}'",
                        self.current.text
                    ))),
                }
            }
            Token::Before => {
                self.advance()?;
                if self.current.token == Token::Or {
                    self.advance()?;
                    self.expect(&Token::During, "DURING")?;
                    self.parse_expr()?;
                    self.reduce(NodeType::BeforeOrDuring, &token)
                } else {
                    self.parse_expr()?;
                    self.reduce(NodeType::Before, &token)
                }
            }
            Token::After => {
                self.advance()?;
                self.parse_expr()?;
                self.reduce(NodeType::After, &token)
            }
            Token::During => {
                self.advance()?;
                if self.current.token == Token::Or {
                    self.advance()?;
                    self.expect(&Token::After, "AFTER")?;
                    self.parse_expr()?;
                    self.reduce(NodeType::DuringOrAfter, &token)
                } else {
                    self.parse_expr()?;
                    self.reduce(NodeType::During, &token)
                }
            }
            _ => Err(self.syntax_error(format!(
                "expected a predicate operator, found '{}'",
                self.current.text
            ))),
        }
    }

    fn parse_comparison_rhs(
        &mut self,
        node: NodeType,
        token: SourceToken,
    ) -> Result<(), CompileError> {
        self.advance()?;
        self.parse_expr()?;
        self.reduce(node, &token)
    }

    fn parse_between(&mut self, node: NodeType, token: SourceToken) -> Result<(), CompileError> {
        self.advance()?;
        self.parse_expr()?;
        self.expect(&Token::And, "AND")?;
        self.parse_expr()?;
        self.reduce(node, &token)
    }

    fn parse_like(&mut self, node: NodeType, token: SourceToken) -> Result<(), CompileError> {
        self.advance()?;
        let pattern = self.expect(&Token::Str(String::new()), "a pattern string")?;
        self.reduce_string_literal(&pattern)?;
        self.reduce(node, &token)
    }

    fn parse_null_check(&mut self, token: SourceToken) -> Result<(), CompileError> {
        self.advance()?; // IS
        let node = if self.eat(&Token::Not)? {
            NodeType::NotNull
        } else {
            NodeType::IsNull
        };
        self.expect(&Token::Null, "NULL")?;
        self.reduce(node, &token)
    }

    fn parse_in_list(&mut self, node: NodeType, token: SourceToken) -> Result<(), CompileError> {
        self.advance()?; // IN
        self.expect(&Token::LParen, "'('")?;
        loop {
            let element = self.source_token();
            self.parse_expr()?;
            self.reduce(NodeType::InListElement, &element)?;
            if !self.eat(&Token::Comma)? {
                break;
            }
        }
        self.expect(&Token::RParen, "')'")?;
        self.reduce(node, &token)
    }

    fn parse_id_predicate(&mut self, node: NodeType) -> Result<(), CompileError> {
        let token = self.source_token();
        self.advance()?; // IN
        self.expect(&Token::LParen, "'('")?;
        loop {
            let id = self.source_token();
            let spanned = self.expect(&Token::Str(String::new()), "a quoted feature id")?;
            let Token::Str(decoded) = spanned.token else {
                return Err(self.syntax_error("expected a quoted feature id"));
            };
            self.reduce(
                NodeType::FeatureId,
                &SourceToken {
                    text: decoded,
                    position: id.position,
                    index: id.index,
                },
            )?;
            if !self.eat(&Token::Comma)? {
                break;
            }
        }
        self.expect(&Token::RParen, "')'")?;
        self.reduce(node, &token)
    }

    // ----- spatial predicates -----

    fn parse_binary_spatial(&mut self) -> Result<(), CompileError> {
        let node = match self.current.token {
            Token::Equals => NodeType::SpatialEquals,
            Token::Disjoint => NodeType::Disjoint,
            Token::Intersects => NodeType::Intersects,
            Token::Touches => NodeType::Touches,
            Token::Crosses => NodeType::Crosses,
            Token::Within => NodeType::Within,
            Token::Contains => NodeType::Contains,
            Token::Overlaps => NodeType::Overlaps,
            _ => return Err(self.syntax_error("expected a spatial operator")),
        };
        let token = self.source_token();
        self.advance()?;
        self.expect(&Token::LParen, "'('")?;
        self.parse_expr()?;
        self.expect(&Token::Comma, "','")?;
        self.parse_expr()?;
        self.expect(&Token::RParen, "')'")?;
        self.reduce(node, &token)
    }

    fn parse_relate(&mut self) -> Result<(), CompileError> {
        let token = self.source_token();
        self.advance()?;
        self.expect(&Token::LParen, "'('")?;
        self.parse_expr()?;
        self.expect(&Token::Comma, "','")?;
        self.parse_expr()?;
        self.expect(&Token::Comma, "','")?;
        let pattern = self.expect(&Token::Str(String::new()), "a DE-9IM pattern string")?;
        self.reduce_string_literal(&pattern)?;
        self.expect(&Token::RParen, "')'")?;
        self.reduce(NodeType::Relate, &token)
    }

    fn parse_bbox(&mut self) -> Result<(), CompileError> {
        let token = self.source_token();
        self.advance()?;
        self.expect(&Token::LParen, "'('")?;
        self.parse_expr()?;
        for _ in 0..4 {
            self.expect(&Token::Comma, "','")?;
            self.parse_signed_number()?;
        }
        let node = if self.eat(&Token::Comma)? {
            let crs = self.expect(&Token::Str(String::new()), "a reference-system string")?;
            self.reduce_string_literal(&crs)?;
            NodeType::BBoxWithCrs
        } else {
            NodeType::BBox
        };
        self.expect(&Token::RParen, "')'")?;
        self.reduce(node, &token)
    }

    fn parse_distance(&mut self) -> Result<(), CompileError> {
        let node = if self.current.token == Token::Dwithin {
            NodeType::DWithin
        } else {
            NodeType::Beyond
        };
        let token = self.source_token();
        self.advance()?;
        self.expect(&Token::LParen, "'('")?;
        self.parse_expr()?;
        self.expect(&Token::Comma, "','")?;
        self.parse_expr()?;
        self.expect(&Token::Comma, "','")?;
        self.parse_signed_number()?;
        self.expect(&Token::Comma, "','")?;
        let units = self.source_token();
        match &self.current.token {
            Token::Identifier(_) => {
                self.reduce(NodeType::StringLiteral, &units)?;
                self.advance()?;
            }
            Token::Str(_) => {
                let spanned = self.current.clone();
                self.reduce_string_literal(&spanned)?;
                self.advance()?;
            }
            _ => {
                return Err(self.syntax_error(format!(
                    "expected distance units, found '{}'",
                    self.current.text
                )));
            }
        }
        self.expect(&Token::RParen, "')'")?;
        self.reduce(node, &token)
    }

    // ----- expressions -----

    fn parse_expr(&mut self) -> Result<(), CompileError> {
        self.parse_additive()
    }

    fn parse_additive(&mut self) -> Result<(), CompileError> {
        self.parse_multiplicative()?;
        loop {
            let node = match self.current.token {
                Token::Plus => NodeType::Add,
                Token::Minus => NodeType::Subtract,
                _ => break,
            };
            let token = self.source_token();
            self.advance()?;
            self.parse_multiplicative()?;
            self.reduce(node, &token)?;
        }
        Ok(())
    }

    fn parse_multiplicative(&mut self) -> Result<(), CompileError> {
        self.parse_primary()?;
        loop {
            let node = match self.current.token {
                Token::Star => NodeType::Multiply,
                Token::Slash => NodeType::Divide,
                _ => break,
            };
            let token = self.source_token();
            self.advance()?;
            self.parse_primary()?;
            self.reduce(node, &token)?;
        }
        Ok(())
    }

    fn parse_primary(&mut self) -> Result<(), CompileError> {
        match &self.current.token {
            Token::Integer(_) => {
                let token = self.source_token();
                self.advance()?;
                self.reduce(NodeType::IntegerLiteral, &token)
            }
            Token::Decimal(_) => {
                let token = self.source_token();
                self.advance()?;
                self.reduce(NodeType::FloatingLiteral, &token)
            }
            Token::Str(_) => {
                let spanned = self.current.clone();
                self.advance()?;
                self.reduce_string_literal(&spanned)
            }
            Token::True | Token::False => {
                let token = self.source_token();
                self.advance()?;
                self.reduce(NodeType::BooleanLiteral, &token)
            }
            Token::Minus => self.parse_signed_number(),
            Token::DateTime(_) => self.parse_instant_or_period(),
            // A duration-shaped lexeme is a duration only inside a period;
            // anywhere else it is a property named like `P10D`.
            Token::Duration(_) if self.duration_opens_period() => {
                let token = self.source_token();
                self.advance()?;
                self.reduce(NodeType::DurationLiteral, &token)?;
                let slash = self.source_token();
                self.expect(&Token::Slash, "'/' after a duration")?;
                let end = self.source_token();
                self.expect(&Token::DateTime(String::new()), "a date-time")?;
                self.reduce(NodeType::DateTimeLiteral, &end)?;
                self.reduce(NodeType::Period, &slash)
            }
            Token::Duration(_) => self.parse_property_or_function(),
            Token::Identifier(_) => self.parse_property_or_function(),
            Token::LParen => {
                self.advance()?;
                self.parse_expr()?;
                self.expect(&Token::RParen, "')'")?;
                Ok(())
            }
            Token::Point
            | Token::LineString
            | Token::Polygon
            | Token::MultiPoint
            | Token::MultiLineString
            | Token::MultiPolygon
            | Token::GeometryCollection
            | Token::Envelope => self.parse_geometry(),
            _ => Err(self.syntax_error(format!(
                "expected an expression, found '{}'",
                self.current.text
            ))),
        }
    }

    /// String literal reduces carry the decoded payload, not the quoted
    /// lexeme.
    fn reduce_string_literal(&mut self, spanned: &Spanned) -> Result<(), CompileError> {
        let decoded = match &spanned.token {
            Token::Str(s) => s.clone(),
            _ => {
                return Err(self.syntax_error(format!(
                    "expected a string literal, found '{}'",
                    spanned.text
                )));
            }
        };
        let token = SourceToken {
            text: decoded,
            position: spanned.position,
            index: self.index,
        };
        self.reduce(NodeType::StringLiteral, &token)
    }

    fn parse_signed_number(&mut self) -> Result<(), CompileError> {
        if self.current.token == Token::Minus {
            let minus = self.source_token();
            self.advance()?;
            let token = self.source_token();
            match self.current.token {
                Token::Integer(_) => {
                    self.advance()?;
                    self.reduce(NodeType::IntegerLiteral, &token)?;
                }
                Token::Decimal(_) => {
                    self.advance()?;
                    self.reduce(NodeType::FloatingLiteral, &token)?;
                }
                _ => {
                    return Err(self.syntax_error(format!(
                        "expected a number after '-', found '{}'",
                        self.current.text
                    )));
                }
            }
            return self.reduce(NodeType::Negative, &minus);
        }
        let token = self.source_token();
        match self.current.token {
            Token::Integer(_) => {
                self.advance()?;
                self.reduce(NodeType::IntegerLiteral, &token)
            }
            Token::Decimal(_) => {
                self.advance()?;
                self.reduce(NodeType::FloatingLiteral, &token)
            }
            _ => Err(self.syntax_error(format!(
                "expected a number, found '{}'",
                self.current.text
            ))),
        }
    }

    /// A date-time literal, optionally extended by `/` into a period. The
    /// trailing part is another instant or a duration.
    fn parse_instant_or_period(&mut self) -> Result<(), CompileError> {
        let begin = self.source_token();
        self.advance()?;
        self.reduce(NodeType::DateTimeLiteral, &begin)?;
        if self.current.token != Token::Slash {
            return Ok(());
        }
        let slash = self.source_token();
        self.advance()?;
        let end = self.source_token();
        match &self.current.token {
            Token::DateTime(_) => {
                self.advance()?;
                self.reduce(NodeType::DateTimeLiteral, &end)?;
            }
            Token::Duration(_) => {
                self.advance()?;
                self.reduce(NodeType::DurationLiteral, &end)?;
            }
            _ => {
                return Err(self.syntax_error(format!(
                    "expected a date-time or duration after '/', found '{}'",
                    self.current.text
                )));
            }
        }
        self.reduce(NodeType::Period, &slash)
    }

    fn parse_property_or_function(&mut self) -> Result<(), CompileError> {
        let first = self.current.clone();
        let start_index = self.index;
        self.advance()?;

        // A bare identifier directly followed by `(` is a function call.
        if self.current.token == Token::LParen {
            let name = SourceToken {
                text: first.text.clone(),
                position: first.position,
                index: start_index,
            };
            self.advance()?;
            if self.current.token != Token::RParen {
                loop {
                    let arg = self.source_token();
                    self.parse_expr()?;
                    self.reduce(NodeType::FunctionArg, &arg)?;
                    if !self.eat(&Token::Comma)? {
                        break;
                    }
                }
            }
            self.expect(&Token::RParen, "')'")?;
            return self.reduce(NodeType::Function, &name);
        }

        // Otherwise a property path: identifier segments joined by `.`.
        let mut path = first.text;
        while self.current.token == Token::Dot {
            self.advance()?;
            let segment = match self.current.token {
                Token::Identifier(_) | Token::Duration(_) => {
                    let spanned = self.current.clone();
                    self.advance()?;
                    spanned
                }
                _ => {
                    return Err(self.syntax_error(format!(
                        "expected a property name segment, found '{}'",
                        self.current.text
                    )));
                }
            };
            path.push('.');
            path.push_str(&segment.text);
        }
        let token = SourceToken {
            text: path,
            position: first.position,
            index: start_index,
        };
        self.reduce(NodeType::Property, &token)
    }

    // ----- geometry literals -----

    fn parse_geometry(&mut self) -> Result<(), CompileError> {
        let token = self.source_token();
        match self.current.token {
            Token::Point => {
                self.advance()?;
                self.expect(&Token::LParen, "'('")?;
                self.parse_coordinate()?;
                self.expect(&Token::RParen, "')'")?;
                self.reduce(NodeType::Point, &token)
            }
            Token::LineString => {
                self.advance()?;
                self.parse_coordinate_sequence()?;
                self.reduce(NodeType::LineString, &token)
            }
            Token::Polygon => {
                self.advance()?;
                self.parse_polygon_body()?;
                self.reduce(NodeType::Polygon, &token)
            }
            Token::MultiPoint => {
                self.advance()?;
                self.expect(&Token::LParen, "'('")?;
                loop {
                    // Both `(1 2, 3 4)` and `((1 2), (3 4))` are accepted.
                    let wrapped = self.eat(&Token::LParen)?;
                    self.parse_coordinate()?;
                    if wrapped {
                        self.expect(&Token::RParen, "')'")?;
                    }
                    if !self.eat(&Token::Comma)? {
                        break;
                    }
                }
                self.expect(&Token::RParen, "')'")?;
                self.reduce(NodeType::MultiPoint, &token)
            }
            Token::MultiLineString => {
                self.advance()?;
                self.expect(&Token::LParen, "'('")?;
                loop {
                    let line = self.source_token();
                    self.parse_coordinate_sequence()?;
                    self.reduce(NodeType::LineStringMember, &line)?;
                    if !self.eat(&Token::Comma)? {
                        break;
                    }
                }
                self.expect(&Token::RParen, "')'")?;
                self.reduce(NodeType::MultiLineString, &token)
            }
            Token::MultiPolygon => {
                self.advance()?;
                self.expect(&Token::LParen, "'('")?;
                loop {
                    let polygon = self.source_token();
                    self.parse_polygon_body()?;
                    self.reduce(NodeType::PolygonMember, &polygon)?;
                    if !self.eat(&Token::Comma)? {
                        break;
                    }
                }
                self.expect(&Token::RParen, "')'")?;
                self.reduce(NodeType::MultiPolygon, &token)
            }
            Token::GeometryCollection => {
                self.advance()?;
                let open = self.source_token();
                self.expect(&Token::LParen, "'('")?;
                // Collections nest, so each one is bracketed by a begin
                // mark and its children are re-tagged as members.
                self.reduce(NodeType::GeometryCollectionBegin, &open)?;
                loop {
                    let member = self.source_token();
                    self.parse_geometry()?;
                    self.reduce(NodeType::GeometryMember, &member)?;
                    if !self.eat(&Token::Comma)? {
                        break;
                    }
                }
                self.expect(&Token::RParen, "')'")?;
                self.reduce(NodeType::GeometryCollection, &token)
            }
            Token::Envelope => {
                self.advance()?;
                self.expect(&Token::LParen, "'('")?;
                self.parse_signed_number()?;
                for _ in 0..3 {
                    self.expect(&Token::Comma, "','")?;
                    self.parse_signed_number()?;
                }
                self.expect(&Token::RParen, "')'")?;
                self.reduce(NodeType::Envelope, &token)
            }
            _ => Err(self.syntax_error("expected a geometry literal")),
        }
    }

    /// `(x y [z], x y [z], ...)`: a parenthesized run of coordinates.
    fn parse_coordinate_sequence(&mut self) -> Result<(), CompileError> {
        self.expect(&Token::LParen, "'('")?;
        loop {
            self.parse_coordinate()?;
            if !self.eat(&Token::Comma)? {
                break;
            }
        }
        self.expect(&Token::RParen, "')'")?;
        Ok(())
    }

    /// `((ring), (ring), ...)`: a shell ring plus optional holes.
    fn parse_polygon_body(&mut self) -> Result<(), CompileError> {
        self.expect(&Token::LParen, "'('")?;
        loop {
            let ring = self.source_token();
            self.parse_coordinate_sequence()?;
            self.reduce(NodeType::LinearRing, &ring)?;
            if !self.eat(&Token::Comma)? {
                break;
            }
        }
        self.expect(&Token::RParen, "')'")?;
        Ok(())
    }

    fn parse_coordinate(&mut self) -> Result<(), CompileError> {
        let token = self.source_token();
        self.parse_signed_number()?;
        self.parse_signed_number()?;
        let node = if matches!(
            self.current.token,
            Token::Integer(_) | Token::Decimal(_) | Token::Minus
        ) {
            self.parse_signed_number()?;
            NodeType::Coordinate3
        } else {
            NodeType::Coordinate2
        };
        self.reduce(node, &token)
    }
}
