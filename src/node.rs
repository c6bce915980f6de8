//! Grammar production tags.
//!
//! One variant per production the parser can close. The builder dispatches
//! on these with an exhaustive match, so adding a production without a
//! builder arm fails at compile time.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    // Literals
    IntegerLiteral,
    FloatingLiteral,
    StringLiteral,
    BooleanLiteral,
    DateTimeLiteral,
    DurationLiteral,
    Period,
    Negative,

    // Expressions
    Property,
    FunctionArg,
    Function,
    Add,
    Subtract,
    Multiply,
    Divide,

    // Comparisons
    Equal,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,

    // Predicates
    Between,
    NotBetween,
    Like,
    NotLike,
    ILike,
    NotILike,
    IsNull,
    NotNull,
    InListElement,
    In,
    NotIn,
    FeatureId,
    Id,
    NotId,

    // Logic
    And,
    Or,
    Not,
    Include,
    Exclude,

    // Temporal
    Before,
    After,
    During,
    BeforeOrDuring,
    DuringOrAfter,

    // Spatial
    SpatialEquals,
    Disjoint,
    Intersects,
    Touches,
    Crosses,
    Within,
    Contains,
    Overlaps,
    Relate,
    BBox,
    BBoxWithCrs,
    DWithin,
    Beyond,

    // Geometry
    Coordinate2,
    Coordinate3,
    Point,
    LineString,
    LineStringMember,
    LinearRing,
    Polygon,
    PolygonMember,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
    GeometryCollectionBegin,
    GeometryCollection,
    GeometryMember,
    Envelope,
}

impl NodeType {
    /// Whether results tagged with this node are geometry-coordinate runs.
    pub fn is_coordinate(self) -> bool {
        matches!(self, NodeType::Coordinate2 | NodeType::Coordinate3)
    }
}
