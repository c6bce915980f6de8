use ecql::lexer::Lexer;
use ecql::Token;

fn tokens(input: &str) -> Vec<Token> {
    let mut lexer = Lexer::new(input);
    let mut out = Vec::new();
    loop {
        let spanned = lexer.next_token().expect("lexing should succeed");
        let done = spanned.token == Token::Eof;
        out.push(spanned.token);
        if done {
            break;
        }
    }
    out
}

#[test]
fn test_numbers_and_operators() {
    assert_eq!(
        tokens("depth >= 42"),
        vec![
            Token::Identifier("depth".into()),
            Token::GtEq,
            Token::Integer(42),
            Token::Eof,
        ]
    );
    assert_eq!(
        tokens("1.5 * 2"),
        vec![
            Token::Decimal(1.5),
            Token::Star,
            Token::Integer(2),
            Token::Eof,
        ]
    );
}

#[test]
fn test_not_equal_is_one_token() {
    assert_eq!(
        tokens("a <> b"),
        vec![
            Token::Identifier("a".into()),
            Token::Neq,
            Token::Identifier("b".into()),
            Token::Eof,
        ]
    );
}

#[test]
fn test_keywords_are_case_insensitive() {
    assert_eq!(
        tokens("not between Like"),
        vec![Token::Not, Token::Between, Token::Like, Token::Eof]
    );
}

#[test]
fn test_single_and_double_quoted_strings() {
    assert_eq!(
        tokens("'hello' \"world\""),
        vec![
            Token::Str("hello".into()),
            Token::Str("world".into()),
            Token::Eof,
        ]
    );
}

#[test]
fn test_doubled_quote_is_literal_quote() {
    assert_eq!(tokens("'it''s'"), vec![Token::Str("it's".into()), Token::Eof]);
}

#[test]
fn test_unknown_escape_keeps_backslash() {
    // LIKE patterns carry their escape character through the lexer.
    assert_eq!(
        tokens(r"'St\%x'"),
        vec![Token::Str(r"St\%x".into()), Token::Eof]
    );
}

#[test]
fn test_known_escapes_decode() {
    assert_eq!(
        tokens(r"'a\nb'"),
        vec![Token::Str("a\nb".into()), Token::Eof]
    );
}

#[test]
fn test_datetime_literal() {
    assert_eq!(
        tokens("2006-11-30T01:30:00Z"),
        vec![
            Token::DateTime("2006-11-30T01:30:00Z".into()),
            Token::Eof,
        ]
    );
    assert_eq!(
        tokens("2006-11-30"),
        vec![Token::DateTime("2006-11-30".into()), Token::Eof]
    );
}

#[test]
fn test_date_is_not_subtraction() {
    // A four-digit year followed by '-' and digits is a date, but plain
    // arithmetic still lexes as arithmetic.
    assert_eq!(
        tokens("2006 - 11"),
        vec![
            Token::Integer(2006),
            Token::Minus,
            Token::Integer(11),
            Token::Eof,
        ]
    );
}

#[test]
fn test_duration_literal() {
    assert_eq!(
        tokens("P10D"),
        vec![Token::Duration("P10D".into()), Token::Eof]
    );
    assert_eq!(
        tokens("PT2H30M"),
        vec![Token::Duration("PT2H30M".into()), Token::Eof]
    );
}

#[test]
fn test_period_with_slash() {
    assert_eq!(
        tokens("2006-11-30T00:00:00Z/P10D"),
        vec![
            Token::DateTime("2006-11-30T00:00:00Z".into()),
            Token::Slash,
            Token::Duration("P10D".into()),
            Token::Eof,
        ]
    );
}

#[test]
fn test_property_identifier_keeps_case() {
    assert_eq!(
        tokens("Address.City"),
        vec![
            Token::Identifier("Address".into()),
            Token::Dot,
            Token::Identifier("City".into()),
            Token::Eof,
        ]
    );
}

#[test]
fn test_unterminated_string_reports_start() {
    let mut lexer = Lexer::new("name = 'oops");
    lexer.next_token().unwrap();
    lexer.next_token().unwrap();
    let err = lexer.next_token().unwrap_err();
    assert_eq!(err.position, 7);
}

#[test]
fn test_unexpected_character() {
    let mut lexer = Lexer::new("a ~ b");
    lexer.next_token().unwrap();
    let err = lexer.next_token().unwrap_err();
    assert_eq!(err.position, 2);
    assert!(err.message.contains('~'));
}

#[test]
fn test_spanned_positions() {
    let mut lexer = Lexer::new("depth > 100");
    let first = lexer.next_token().unwrap();
    assert_eq!(first.position, 0);
    assert_eq!(first.text, "depth");
    let second = lexer.next_token().unwrap();
    assert_eq!(second.position, 6);
    let third = lexer.next_token().unwrap();
    assert_eq!(third.position, 8);
    assert_eq!(third.text, "100");
}
