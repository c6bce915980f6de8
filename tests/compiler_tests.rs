use chrono::{TimeZone, Utc};
use ecql::geometry::Shape;
use ecql::{
    compile_expression, compile_filter, compile_filter_list, ArithOp, CompareOp, Coordinate,
    Envelope, ErrorKind, Expr, Filter, PropertyRef, SpatialOp, Value,
};

fn property(path: &str) -> Expr {
    Expr::Property(PropertyRef::new(path))
}

fn int(n: i32) -> Expr {
    Expr::Literal(Value::Int(n))
}

#[test]
fn test_simple_comparison() {
    let filter = compile_filter("depth > 100").unwrap();
    assert_eq!(
        filter,
        Filter::Compare {
            op: CompareOp::Greater,
            left: property("depth"),
            right: int(100),
        }
    );
}

#[test]
fn test_not_equal_wraps_equality() {
    let filter = compile_filter("depth <> 100").unwrap();
    assert_eq!(
        filter,
        Filter::Not(Box::new(Filter::Compare {
            op: CompareOp::Equal,
            left: property("depth"),
            right: int(100),
        }))
    );
}

#[test]
fn test_and_binds_tighter_than_or() {
    let filter = compile_filter("a = 1 OR b = 2 AND c = 3").unwrap();
    let Filter::Or(children) = filter else {
        panic!("expected a disjunction");
    };
    assert_eq!(children.len(), 2);
    assert!(matches!(children[1], Filter::And(_)));
}

#[test]
fn test_chained_and_flattens() {
    let filter = compile_filter("a = 1 AND b = 2 AND c = 3").unwrap();
    let Filter::And(children) = filter else {
        panic!("expected a conjunction");
    };
    assert_eq!(children.len(), 3);
}

#[test]
fn test_parenthesized_filter() {
    let filter = compile_filter("a = 1 AND (b = 2 OR c = 3)").unwrap();
    let Filter::And(children) = filter else {
        panic!("expected a conjunction");
    };
    assert_eq!(children.len(), 2);
    assert!(matches!(children[1], Filter::Or(_)));
}

#[test]
fn test_parenthesized_expression_predicate() {
    let filter = compile_filter("(depth + 1) > 2").unwrap();
    let Filter::Compare { op, left, .. } = filter else {
        panic!("expected a comparison");
    };
    assert_eq!(op, CompareOp::Greater);
    assert!(matches!(left, Expr::Arithmetic { .. }));
}

#[test]
fn test_include_exclude() {
    assert_eq!(compile_filter("INCLUDE").unwrap(), Filter::Include);
    assert_eq!(compile_filter("EXCLUDE").unwrap(), Filter::Exclude);
    assert_eq!(
        compile_filter("NOT INCLUDE").unwrap(),
        Filter::Not(Box::new(Filter::Include))
    );
}

#[test]
fn test_between() {
    let filter = compile_filter("depth BETWEEN 1 AND 10").unwrap();
    assert_eq!(
        filter,
        Filter::Between {
            test: property("depth"),
            lower: int(1),
            upper: int(10),
        }
    );
}

#[test]
fn test_not_between_wraps_positive() {
    let filter = compile_filter("depth NOT BETWEEN 1 AND 10").unwrap();
    assert!(matches!(filter, Filter::Not(inner) if matches!(*inner, Filter::Between { .. })));
}

#[test]
fn test_like_and_ilike() {
    let filter = compile_filter("name LIKE 'St%'").unwrap();
    let Filter::Like(like) = filter else {
        panic!("expected a LIKE filter");
    };
    assert_eq!(like.pattern, "St%");
    assert!(!like.case_insensitive);

    let filter = compile_filter("name ILIKE 'st%'").unwrap();
    let Filter::Like(like) = filter else {
        panic!("expected a LIKE filter");
    };
    assert!(like.case_insensitive);

    let filter = compile_filter("name NOT LIKE 'St%'").unwrap();
    assert!(matches!(filter, Filter::Not(inner) if matches!(*inner, Filter::Like(_))));
}

#[test]
fn test_null_checks() {
    assert_eq!(
        compile_filter("name IS NULL").unwrap(),
        Filter::IsNull(property("name"))
    );
    assert_eq!(
        compile_filter("name IS NOT NULL").unwrap(),
        Filter::Not(Box::new(Filter::IsNull(property("name"))))
    );
}

#[test]
fn test_in_list_expands_to_disjunction() {
    let filter = compile_filter("code IN (1, 2, 3)").unwrap();
    let Filter::Or(children) = filter else {
        panic!("expected a disjunction");
    };
    assert_eq!(children.len(), 3);
    assert_eq!(
        children[0],
        Filter::Compare {
            op: CompareOp::Equal,
            left: property("code"),
            right: int(1),
        }
    );
}

#[test]
fn test_single_element_in_is_plain_equality() {
    let filter = compile_filter("code IN (7)").unwrap();
    assert!(matches!(filter, Filter::Compare { .. }));
}

#[test]
fn test_not_in_wraps_positive() {
    let filter = compile_filter("code NOT IN (1, 2)").unwrap();
    assert!(matches!(filter, Filter::Not(inner) if matches!(*inner, Filter::Or(_))));
}

#[test]
fn test_id_filter_collapses_duplicates() {
    let filter = compile_filter("IN ('s.1', 's.2', 's.1')").unwrap();
    let Filter::Id(ids) = filter else {
        panic!("expected an id filter");
    };
    assert_eq!(ids.len(), 2);
    assert!(ids.contains("s.1"));
    assert!(ids.contains("s.2"));
}

#[test]
fn test_negated_id_filter() {
    let filter = compile_filter("NOT IN ('s.1')").unwrap();
    assert!(matches!(filter, Filter::Not(inner) if matches!(*inner, Filter::Id(_))));
}

#[test]
fn test_compound_property_path() {
    let filter = compile_filter("address.city = 'Oslo'").unwrap();
    let Filter::Compare { left, .. } = filter else {
        panic!("expected a comparison");
    };
    assert_eq!(left, property("address.city"));
}

#[test]
fn test_duration_shaped_property_name() {
    let filter = compile_filter("P10D > 5").unwrap();
    assert_eq!(
        filter,
        Filter::Compare {
            op: CompareOp::Greater,
            left: property("P10D"),
            right: int(5),
        }
    );
    let filter = compile_filter("report.P2 = 1").unwrap();
    let Filter::Compare { left, .. } = filter else {
        panic!("expected a comparison");
    };
    assert_eq!(left, property("report.P2"));
}

#[test]
fn test_integer_subtypes() {
    assert_eq!(
        compile_expression("42").unwrap(),
        Expr::Literal(Value::Int(42))
    );
    assert_eq!(
        compile_expression("2147483648").unwrap(),
        Expr::Literal(Value::Long(2147483648))
    );
    assert_eq!(
        compile_expression("3.5").unwrap(),
        Expr::Literal(Value::Double(3.5))
    );
}

#[test]
fn test_negative_literal_keeps_subtype() {
    assert_eq!(
        compile_expression("-5").unwrap(),
        Expr::Literal(Value::Int(-5))
    );
    assert_eq!(
        compile_expression("-2147483648").unwrap(),
        Expr::Literal(Value::Long(-2147483648))
    );
    assert_eq!(
        compile_expression("-3.5").unwrap(),
        Expr::Literal(Value::Double(-3.5))
    );
}

#[test]
fn test_arithmetic_precedence() {
    let expr = compile_expression("a + b * 2").unwrap();
    let Expr::Arithmetic { op, right, .. } = expr else {
        panic!("expected arithmetic");
    };
    assert_eq!(op, ArithOp::Add);
    assert!(matches!(
        *right,
        Expr::Arithmetic {
            op: ArithOp::Multiply,
            ..
        }
    ));
}

#[test]
fn test_function_call() {
    let expr = compile_expression("strConcat(name, '!')").unwrap();
    let Expr::Function { name, args } = expr else {
        panic!("expected a function call");
    };
    assert_eq!(name, "strConcat");
    assert_eq!(args.len(), 2);
}

#[test]
fn test_point_literal() {
    let expr = compile_expression("POINT(1 2)").unwrap();
    let Expr::Literal(Value::Geometry(g)) = expr else {
        panic!("expected a geometry literal");
    };
    assert_eq!(g.shape, Shape::Point(Coordinate::xy(1.0, 2.0)));
}

#[test]
fn test_polygon_with_holes() {
    let expr = compile_expression(
        "POLYGON((0 0, 10 0, 10 10, 0 10, 0 0), \
         (2 2, 4 2, 4 4, 2 4, 2 2), (6 6, 8 6, 8 8, 6 8, 6 6))",
    )
    .unwrap();
    let Expr::Literal(Value::Geometry(g)) = expr else {
        panic!("expected a geometry literal");
    };
    let Shape::Polygon(polygon) = g.shape else {
        panic!("expected a polygon");
    };
    assert_eq!(polygon.shell.len(), 5);
    assert_eq!(polygon.holes.len(), 2);
    // Vertex order follows the source text.
    assert_eq!(polygon.shell[1], Coordinate::xy(10.0, 0.0));
    assert_eq!(polygon.holes[0][0], Coordinate::xy(2.0, 2.0));
    assert_eq!(polygon.holes[1][0], Coordinate::xy(6.0, 6.0));
}

#[test]
fn test_open_ring_is_rejected() {
    let err = compile_expression("POLYGON((0 0, 10 0, 10 10, 5 5))").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SemanticBuild);
}

#[test]
fn test_envelope_literal_normalizes_bounds() {
    // Grammar order is min-x, max-x, max-y, min-y.
    let expr = compile_expression("ENVELOPE(10, 20, 50, 40)").unwrap();
    let Expr::Literal(Value::Geometry(g)) = expr else {
        panic!("expected a geometry literal");
    };
    assert_eq!(
        g.shape,
        Shape::Envelope(Envelope::new(10.0, 40.0, 20.0, 50.0))
    );
}

#[test]
fn test_geometry_collection() {
    let expr =
        compile_expression("GEOMETRYCOLLECTION(POINT(1 2), LINESTRING(0 0, 1 1))").unwrap();
    let Expr::Literal(Value::Geometry(g)) = expr else {
        panic!("expected a geometry literal");
    };
    let Shape::Collection(children) = g.shape else {
        panic!("expected a collection");
    };
    assert_eq!(children.len(), 2);
}

#[test]
fn test_collection_keeps_sibling_lines_apart() {
    let expr = compile_expression(
        "GEOMETRYCOLLECTION(LINESTRING(0 0, 1 1), MULTILINESTRING((2 2, 3 3)))",
    )
    .unwrap();
    let Expr::Literal(Value::Geometry(g)) = expr else {
        panic!("expected a geometry literal");
    };
    let Shape::Collection(children) = g.shape else {
        panic!("expected a collection");
    };
    assert_eq!(children.len(), 2);
    assert!(matches!(&children[0].shape, Shape::LineString(c) if c.len() == 2));
    assert!(matches!(&children[1].shape, Shape::MultiLineString(lines) if lines.len() == 1));
}

#[test]
fn test_collection_keeps_sibling_polygons_apart() {
    let expr = compile_expression(
        "GEOMETRYCOLLECTION(POLYGON((0 0, 4 0, 4 4, 0 0)), \
         MULTIPOLYGON(((5 5, 9 5, 9 9, 5 5))))",
    )
    .unwrap();
    let Expr::Literal(Value::Geometry(g)) = expr else {
        panic!("expected a geometry literal");
    };
    let Shape::Collection(children) = g.shape else {
        panic!("expected a collection");
    };
    assert_eq!(children.len(), 2);
    assert!(matches!(&children[0].shape, Shape::Polygon(_)));
    assert!(matches!(&children[1].shape, Shape::MultiPolygon(polys) if polys.len() == 1));
}

#[test]
fn test_nested_collections_keep_their_members() {
    let expr = compile_expression(
        "GEOMETRYCOLLECTION(POINT(0 0), GEOMETRYCOLLECTION(POINT(1 1), POINT(2 2)))",
    )
    .unwrap();
    let Expr::Literal(Value::Geometry(g)) = expr else {
        panic!("expected a geometry literal");
    };
    let Shape::Collection(children) = g.shape else {
        panic!("expected a collection");
    };
    assert_eq!(children.len(), 2);
    assert!(matches!(&children[0].shape, Shape::Point(_)));
    let Shape::Collection(inner) = &children[1].shape else {
        panic!("expected a nested collection");
    };
    assert_eq!(inner.len(), 2);
}

#[test]
fn test_collection_leaves_outer_operands_alone() {
    let filter = compile_filter("EQUALS(POINT(0 0), GEOMETRYCOLLECTION(POINT(1 1)))").unwrap();
    let Filter::Spatial { op, left, right } = filter else {
        panic!("expected a spatial filter");
    };
    assert_eq!(op, SpatialOp::Equals);
    assert!(matches!(
        left,
        Expr::Literal(Value::Geometry(g)) if matches!(g.shape, Shape::Point(_))
    ));
    let Expr::Literal(Value::Geometry(g)) = right else {
        panic!("expected a geometry literal");
    };
    let Shape::Collection(children) = g.shape else {
        panic!("expected a collection");
    };
    assert_eq!(children.len(), 1);
}

#[test]
fn test_spatial_predicate() {
    let filter = compile_filter("INTERSECTS(geom, POINT(1 2))").unwrap();
    let Filter::Spatial { op, left, .. } = filter else {
        panic!("expected a spatial filter");
    };
    assert_eq!(op, SpatialOp::Intersects);
    assert_eq!(left, property("geom"));
}

#[test]
fn test_bbox_with_reference_system() {
    let filter = compile_filter("BBOX(geom, 10, 40, 20, 50, 'EPSG:4326')").unwrap();
    let Filter::BBox { bounds, crs, .. } = filter else {
        panic!("expected a bbox filter");
    };
    assert_eq!(bounds, Envelope::new(10.0, 40.0, 20.0, 50.0));
    let crs = crs.expect("reference system should be present");
    assert_eq!(crs.authority(), "EPSG");
    assert_eq!(crs.code(), "4326");
}

#[test]
fn test_bbox_without_reference_system() {
    let filter = compile_filter("BBOX(geom, 0, 0, 10, 10)").unwrap();
    let Filter::BBox { crs, .. } = filter else {
        panic!("expected a bbox filter");
    };
    assert!(crs.is_none());
}

#[test]
fn test_bbox_bare_code_gets_default_authority() {
    let filter = compile_filter("BBOX(geom, 0, 1, 1, 0, '4326')").unwrap();
    let Filter::BBox { crs, .. } = filter else {
        panic!("expected a bbox filter");
    };
    assert_eq!(crs.expect("crs").to_string(), "EPSG:4326");
}

#[test]
fn test_bbox_bad_reference_system() {
    let err = compile_filter("BBOX(geom, 0, 1, 1, 0, 'no such crs')").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CrsResolution);
}

#[test]
fn test_relate_pattern_is_validated() {
    let filter = compile_filter("RELATE(geom, POINT(1 2), 'T*****FF*')").unwrap();
    assert!(matches!(filter, Filter::Relate { .. }));

    let err = compile_filter("RELATE(geom, POINT(1 2), 'TTT')").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SemanticBuild);
    let err = compile_filter("RELATE(geom, POINT(1 2), 'TTTTTTTTX')").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SemanticBuild);
}

#[test]
fn test_dwithin() {
    let filter = compile_filter("DWITHIN(geom, POINT(0 0), 5, meters)").unwrap();
    let Filter::Distance {
        distance,
        units,
        within,
        ..
    } = filter
    else {
        panic!("expected a distance filter");
    };
    assert_eq!(distance, 5.0);
    assert_eq!(units.as_deref(), Some("meters"));
    assert!(within);
}

#[test]
fn test_beyond() {
    let filter = compile_filter("BEYOND(geom, POINT(0 0), 5, 'kilometers')").unwrap();
    assert!(matches!(filter, Filter::Distance { within: false, .. }));
}

#[test]
fn test_before_instant_is_ordering() {
    let filter = compile_filter("when BEFORE 2006-11-30T01:30:00Z").unwrap();
    let expected = Utc.with_ymd_and_hms(2006, 11, 30, 1, 30, 0).unwrap();
    assert_eq!(
        filter,
        Filter::Compare {
            op: CompareOp::Less,
            left: property("when"),
            right: Expr::Literal(Value::Instant(expected)),
        }
    );
}

#[test]
fn test_before_period_compares_against_begin() {
    let filter =
        compile_filter("when BEFORE 2006-11-30T00:00:00Z/2006-12-01T00:00:00Z").unwrap();
    let begin = Utc.with_ymd_and_hms(2006, 11, 30, 0, 0, 0).unwrap();
    let Filter::Compare { op, right, .. } = filter else {
        panic!("expected a comparison");
    };
    assert_eq!(op, CompareOp::Less);
    assert_eq!(right, Expr::Literal(Value::Instant(begin)));
}

#[test]
fn test_during_builds_interval() {
    let filter = compile_filter("when DURING 2006-11-30T00:00:00Z/P10D").unwrap();
    let Filter::Interval { begin, end, .. } = filter else {
        panic!("expected an interval");
    };
    assert_eq!(begin, Utc.with_ymd_and_hms(2006, 11, 30, 0, 0, 0).unwrap());
    assert_eq!(end, Utc.with_ymd_and_hms(2006, 12, 10, 0, 0, 0).unwrap());
}

#[test]
fn test_duration_before_instant_anchors_at_end() {
    let filter = compile_filter("when DURING P1D/2006-12-01T00:00:00Z").unwrap();
    let Filter::Interval { begin, end, .. } = filter else {
        panic!("expected an interval");
    };
    assert_eq!(begin, Utc.with_ymd_and_hms(2006, 11, 30, 0, 0, 0).unwrap());
    assert_eq!(end, Utc.with_ymd_and_hms(2006, 12, 1, 0, 0, 0).unwrap());
}

#[test]
fn test_during_requires_period() {
    let err = compile_filter("when DURING 2006-11-30T01:30:00Z").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SemanticBuild);
}

#[test]
fn test_before_or_during() {
    let filter =
        compile_filter("when BEFORE OR DURING 2006-11-30T00:00:00Z/2006-12-01T00:00:00Z")
            .unwrap();
    let Filter::Compare { op, .. } = filter else {
        panic!("expected a comparison");
    };
    assert_eq!(op, CompareOp::LessEqual);
}

#[test]
fn test_during_or_after() {
    let filter =
        compile_filter("when DURING OR AFTER 2006-11-30T00:00:00Z/2006-12-01T00:00:00Z")
            .unwrap();
    let Filter::Compare { op, .. } = filter else {
        panic!("expected a comparison");
    };
    assert_eq!(op, CompareOp::GreaterEqual);
}

#[test]
fn test_filter_list() {
    let filters = compile_filter_list("a = 1; b = 2; INCLUDE").unwrap();
    assert_eq!(filters.len(), 3);
    assert_eq!(filters[2], Filter::Include);
}

#[test]
fn test_filter_list_allows_trailing_separator() {
    let filters = compile_filter_list("a = 1;").unwrap();
    assert_eq!(filters.len(), 1);
}

#[test]
fn test_syntax_error_carries_position() {
    let err = compile_filter("depth >").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Syntax);
    assert_eq!(err.position(), 7);
    assert_eq!(err.source_text(), "depth >");
}

#[test]
fn test_lexical_error_carries_position() {
    let err = compile_filter("depth ~ 1").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Lexical);
    assert_eq!(err.position(), 6);
}

#[test]
fn test_trailing_input_is_rejected() {
    let err = compile_filter("a = 1 b").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Syntax);
    assert_eq!(err.token(), "b");
}
