use chrono::{TimeZone, Utc};
use ecql::geometry::Shape;
use ecql::{
    compile_expression, compile_filter, Coordinate, Envelope, EvalError, Expr, Feature, Filter,
    Geometry, SpatialOp, Value,
};

fn station() -> Feature {
    Feature::new("station", "station.1")
        .with("depth", Value::Int(300))
        .with("name", Value::Str("Stockholm".into()))
        .with("ratio", Value::Double(0.5))
        .with(
            "geom",
            Value::Geometry(Geometry::new(Shape::Envelope(Envelope::new(
                0.0, 0.0, 10.0, 10.0,
            )))),
        )
        .with(
            "when",
            Value::Instant(Utc.with_ymd_and_hms(2006, 12, 5, 12, 0, 0).unwrap()),
        )
}

fn matches(filter: &str, record: &Feature) -> bool {
    compile_filter(filter)
        .expect("filter should compile")
        .evaluate(record)
        .expect("filter should evaluate")
}

fn eval(expression: &str, record: &Feature) -> Value {
    compile_expression(expression)
        .expect("expression should compile")
        .evaluate(record)
        .expect("expression should evaluate")
}

#[test]
fn test_comparisons() {
    let record = station();
    assert!(matches("depth > 100", &record));
    assert!(!matches("depth > 300", &record));
    assert!(matches("depth >= 300", &record));
    assert!(matches("depth <> 100", &record));
    assert!(matches("name = 'Stockholm'", &record));
}

#[test]
fn test_numeric_comparison_crosses_kinds() {
    let record = station();
    // depth is an int, the literal a double
    assert!(matches("depth = 300.0", &record));
    assert!(matches("ratio < 1", &record));
}

#[test]
fn test_missing_property_is_never_matched() {
    let record = station();
    assert!(!matches("missing = 1", &record));
    assert!(!matches("missing < 1", &record));
    assert!(matches("missing IS NULL", &record));
    assert!(!matches("depth IS NULL", &record));
}

#[test]
fn test_between_coerces_bounds() {
    let record = station();
    assert!(matches("depth BETWEEN 100 AND 400", &record));
    // String bounds convert to the test value's kind.
    assert!(matches("depth BETWEEN '100' AND '400'", &record));
    // Bounds that cannot convert make the predicate false, not an error.
    assert!(!matches("depth BETWEEN 'low' AND 'high'", &record));
    // So does a test value with no ordering at all.
    assert!(!matches("geom BETWEEN 0 AND 10", &record));
    assert!(!matches("depth NOT BETWEEN 100 AND 400", &record));
}

#[test]
fn test_like_wildcards() {
    let record = station();
    assert!(matches("name LIKE 'St%'", &record));
    assert!(matches("name LIKE 'St_ckholm'", &record));
    assert!(!matches("name LIKE 'st%'", &record));
    assert!(matches("name ILIKE 'st%'", &record));
    assert!(matches("name NOT LIKE 'Oslo%'", &record));
}

#[test]
fn test_like_escape_character() {
    let record = Feature::new("station", "s").with("code", Value::Str("50%".into()));
    assert!(matches(r"code LIKE '50\%'", &record));
    let other = Feature::new("station", "s").with("code", Value::Str("505".into()));
    assert!(!matches(r"code LIKE '50\%'", &other));
    // unescaped, the same pattern is a wildcard match
    assert!(matches("code LIKE '50%'", &other));
}

#[test]
fn test_like_over_null_is_false() {
    let record = station();
    assert!(!matches("missing LIKE '%'", &record));
}

#[test]
fn test_like_over_number_uses_text_form() {
    let record = station();
    assert!(matches("depth LIKE '3%'", &record));
}

#[test]
fn test_in_list() {
    let record = station();
    assert!(matches("depth IN (100, 300)", &record));
    assert!(!matches("depth IN (100, 200)", &record));
    assert!(matches("depth NOT IN (100, 200)", &record));
    assert!(matches("name IN ('Oslo', 'Stockholm')", &record));
}

#[test]
fn test_id_filter_uses_record_id() {
    let record = station();
    assert!(matches("IN ('station.1')", &record));
    assert!(!matches("IN ('station.2')", &record));
    assert!(matches("NOT IN ('station.2')", &record));
}

#[test]
fn test_id_property_is_addressable() {
    let record = station();
    let id = Expr::Property(ecql::PropertyRef::new(ecql::ID_PROPERTY));
    assert_eq!(
        id.evaluate(&record).unwrap(),
        Value::Str("station.1".into())
    );
}

#[test]
fn test_logic() {
    let record = station();
    assert!(matches("depth > 100 AND name LIKE 'St%'", &record));
    assert!(!matches("depth > 100 AND name LIKE 'Oslo%'", &record));
    assert!(matches("depth > 1000 OR name LIKE 'St%'", &record));
    assert!(matches("NOT depth > 1000", &record));
    assert!(matches("INCLUDE", &record));
    assert!(!matches("EXCLUDE", &record));
}

#[test]
fn test_arithmetic_kinds() {
    let record = station();
    assert_eq!(eval("depth + 1", &record), Value::Int(301));
    assert_eq!(eval("8 / 2", &record), Value::Int(4));
    assert_eq!(eval("7 / 2", &record), Value::Double(3.5));
    assert_eq!(eval("2147483647 + 1", &record), Value::Long(2147483648));
}

#[test]
fn test_decimal_addition_is_exact() {
    let record = station();
    assert_eq!(eval("0.1 + 0.2", &record), Value::Double(0.3));
}

#[test]
fn test_integer_division_by_zero_is_an_error() {
    let record = station();
    let expr = compile_expression("8 / 0").unwrap();
    assert!(matches!(
        expr.evaluate(&record),
        Err(EvalError::DivisionByZero)
    ));
}

#[test]
fn test_arithmetic_over_null_is_null() {
    let record = station();
    assert_eq!(eval("missing + 1", &record), Value::Null);
}

#[test]
fn test_arithmetic_over_string_is_an_error() {
    let record = station();
    let expr = compile_expression("name + 1").unwrap();
    assert!(matches!(expr.evaluate(&record), Err(EvalError::Type(_))));
}

#[test]
fn test_functions() {
    let record = station();
    assert_eq!(
        eval("strToUpperCase(name)", &record),
        Value::Str("STOCKHOLM".into())
    );
    assert_eq!(
        eval("strToLowerCase('ABC')", &record),
        Value::Str("abc".into())
    );
    assert_eq!(
        eval("strConcat(name, '!')", &record),
        Value::Str("Stockholm!".into())
    );
    assert_eq!(eval("strLength(name)", &record), Value::Int(9));
    assert_eq!(eval("abs(-5)", &record), Value::Int(5));
    assert_eq!(eval("min(depth, 100)", &record), Value::Int(100));
    assert_eq!(eval("max(depth, 100)", &record), Value::Int(300));
}

#[test]
fn test_unknown_function_is_an_error() {
    let record = station();
    let expr = compile_expression("frobnicate(1)").unwrap();
    assert!(matches!(
        expr.evaluate(&record),
        Err(EvalError::UnknownFunction(name)) if name == "frobnicate"
    ));
}

#[test]
fn test_spatial_predicates() {
    let record = station();
    assert!(matches("INTERSECTS(geom, POINT(5 5))", &record));
    assert!(!matches("INTERSECTS(geom, POINT(50 50))", &record));
    assert!(matches("DISJOINT(geom, POINT(50 50))", &record));
    assert!(matches("CONTAINS(geom, POINT(5 5))", &record));
    assert!(matches(
        "WITHIN(geom, ENVELOPE(-10, 20, 20, -10))",
        &record
    ));
    assert!(matches("TOUCHES(geom, POINT(10 5))", &record));
}

#[test]
fn test_spatial_over_missing_geometry_is_false() {
    let record = station();
    assert!(!matches("INTERSECTS(missing, POINT(5 5))", &record));
}

#[test]
fn test_bbox() {
    let record = station();
    assert!(matches("BBOX(geom, 5, 20, 20, 5)", &record));
    assert!(!matches("BBOX(geom, 11, 20, 20, 11)", &record));
}

#[test]
fn test_distance_predicates() {
    let record = station();
    // nearest corner of geom to (13, 14) is (10, 10): distance 5
    assert!(matches("DWITHIN(geom, POINT(13 14), 5, meters)", &record));
    assert!(!matches("DWITHIN(geom, POINT(13 14), 4.9, meters)", &record));
    assert!(matches("BEYOND(geom, POINT(13 14), 4.9, meters)", &record));
}

#[test]
fn test_relate() {
    let record = station();
    // geom contains the point
    assert!(matches("RELATE(geom, POINT(5 5), 'T*****FF*')", &record));
    assert!(!matches("RELATE(geom, POINT(50 50), 'T*****FF*')", &record));
    // disjoint pattern
    assert!(matches("RELATE(geom, POINT(50 50), 'FF*FF****')", &record));
}

#[test]
fn test_reference_system_mismatch_is_an_error() {
    let a = Geometry::tagged(
        Shape::Point(Coordinate::xy(0.0, 0.0)),
        ecql::crs::resolve("EPSG:4326").unwrap(),
    );
    let b = Geometry::tagged(
        Shape::Point(Coordinate::xy(0.0, 0.0)),
        ecql::crs::resolve("EPSG:3857").unwrap(),
    );
    let filter = Filter::Spatial {
        op: SpatialOp::Intersects,
        left: Expr::Literal(Value::Geometry(a)),
        right: Expr::Literal(Value::Geometry(b)),
    };
    let record = station();
    assert!(matches!(
        filter.evaluate(&record),
        Err(EvalError::Reprojection(_))
    ));
}

#[test]
fn test_temporal_evaluation() {
    let record = station();
    assert!(matches("when BEFORE 2007-01-01T00:00:00Z", &record));
    assert!(!matches("when BEFORE 2006-01-01T00:00:00Z", &record));
    assert!(matches("when AFTER 2006-01-01T00:00:00Z", &record));
    assert!(matches(
        "when DURING 2006-12-01T00:00:00Z/2006-12-10T00:00:00Z",
        &record
    ));
    assert!(matches("when DURING 2006-12-01T00:00:00Z/P10D", &record));
    assert!(!matches("when DURING 2006-12-06T00:00:00Z/P1D", &record));
}

#[test]
fn test_prepared_filter_still_matches() {
    let record = station();
    let descriptor = record.descriptor();
    let filter = compile_filter("depth > 100 AND name LIKE 'St%'").unwrap();
    filter.prepare(&descriptor);
    assert!(filter.evaluate(&record).unwrap());
}

#[test]
fn test_json_candidate() {
    let record = serde_json::json!({
        "id": "station.1",
        "depth": 300,
        "name": "Stockholm",
        "address": { "city": "Oslo" }
    });
    let filter = compile_filter("depth > 100").unwrap();
    assert!(filter.evaluate(&record).unwrap());
    let filter = compile_filter("address.city = 'Oslo'").unwrap();
    assert!(filter.evaluate(&record).unwrap());
    // "@id" falls back to the conventional "id" member
    let filter = compile_filter("IN ('station.1')").unwrap();
    assert!(filter.evaluate(&record).unwrap());
}
