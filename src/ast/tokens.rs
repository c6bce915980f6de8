/// Lexical tokens produced by the lexer.
///
/// Keywords are matched case-insensitively; identifiers keep their original
/// case for property-name resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    /// Integer literal
    ///
    /// # Examples
    /// ```text
    /// 42
    /// 2147483648
    /// ```
    Integer(i64),

    /// Decimal literal
    ///
    /// # Examples
    /// ```text
    /// 3.14
    /// 0.5
    /// ```
    Decimal(f64),

    /// String literal, single- or double-quoted
    Str(String),

    /// RFC 3339 date or date-time literal
    ///
    /// # Examples
    /// ```text
    /// 2006-11-30T01:30:00Z
    /// 2006-11-30
    /// ```
    DateTime(String),

    /// ISO 8601 duration literal
    ///
    /// # Examples
    /// ```text
    /// P10D
    /// PT2H30M
    /// ```
    Duration(String),

    /// Property name segment
    Identifier(String),

    // Keywords
    And,
    Or,
    Not,
    Like,
    ILike,
    Between,
    Is,
    Null,
    In,
    Include,
    Exclude,
    True,
    False,
    Before,
    After,
    During,

    // Spatial keywords
    Equals,
    Disjoint,
    Intersects,
    Touches,
    Crosses,
    Within,
    Contains,
    Overlaps,
    Relate,
    Bbox,
    Dwithin,
    Beyond,

    // Geometry keywords
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
    GeometryCollection,
    Envelope,

    // Operators and punctuation
    /// `=`
    Eq,
    /// `<>`
    Neq,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `<=`
    LtEq,
    /// `>=`
    GtEq,
    Plus,
    Minus,
    Star,
    /// `/`: division, and the period separator in temporal literals
    Slash,
    LParen,
    RParen,
    Comma,
    /// `.`: compound property names
    Dot,
    /// `;`: filter-list separator
    Semicolon,
    Eof,
}

impl Token {
    /// Keyword lookup for an identifier lexeme, case-insensitive.
    pub fn keyword(ident: &str) -> Option<Token> {
        let token = match ident.to_ascii_uppercase().as_str() {
            "AND" => Token::And,
            "OR" => Token::Or,
            "NOT" => Token::Not,
            "LIKE" => Token::Like,
            "ILIKE" => Token::ILike,
            "BETWEEN" => Token::Between,
            "IS" => Token::Is,
            "NULL" => Token::Null,
            "IN" => Token::In,
            "INCLUDE" => Token::Include,
            "EXCLUDE" => Token::Exclude,
            "TRUE" => Token::True,
            "FALSE" => Token::False,
            "BEFORE" => Token::Before,
            "AFTER" => Token::After,
            "DURING" => Token::During,
            "EQUALS" => Token::Equals,
            "DISJOINT" => Token::Disjoint,
            "INTERSECTS" => Token::Intersects,
            "TOUCHES" => Token::Touches,
            "CROSSES" => Token::Crosses,
            "WITHIN" => Token::Within,
            "CONTAINS" => Token::Contains,
            "OVERLAPS" => Token::Overlaps,
            "RELATE" => Token::Relate,
            "BBOX" => Token::Bbox,
            "DWITHIN" => Token::Dwithin,
            "BEYOND" => Token::Beyond,
            "POINT" => Token::Point,
            "LINESTRING" => Token::LineString,
            "POLYGON" => Token::Polygon,
            "MULTIPOINT" => Token::MultiPoint,
            "MULTILINESTRING" => Token::MultiLineString,
            "MULTIPOLYGON" => Token::MultiPolygon,
            "GEOMETRYCOLLECTION" => Token::GeometryCollection,
            "ENVELOPE" => Token::Envelope,
            _ => return None,
        };
        Some(token)
    }
}
