//! Geometry value model.
//!
//! Geometries are plain coordinate sequences with an optional reference
//! system tag. Spatial evaluation in this crate is envelope-based; the full
//! topology engine lives outside the compiler boundary.

use std::fmt::Write as _;

use crate::crs::Crs;

/// A 2D or 3D coordinate. The third ordinate is only ever present when the
/// grammar production that built it was three-dimensional.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
}

impl Coordinate {
    pub fn xy(x: f64, y: f64) -> Self {
        Coordinate { x, y, z: None }
    }

    pub fn xyz(x: f64, y: f64, z: f64) -> Self {
        Coordinate { x, y, z: Some(z) }
    }
}

/// A polygon: one shell ring plus zero or more hole rings, all in source
/// order.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub shell: Vec<Coordinate>,
    pub holes: Vec<Vec<Coordinate>>,
}

impl Polygon {
    pub fn ring_count(&self) -> usize {
        1 + self.holes.len()
    }
}

/// An axis-aligned bounding rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Envelope {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Envelope {
            min_x: min_x.min(max_x),
            min_y: min_y.min(max_y),
            max_x: min_x.max(max_x),
            max_y: min_y.max(max_y),
        }
    }

    fn of_coordinate(c: &Coordinate) -> Self {
        Envelope {
            min_x: c.x,
            min_y: c.y,
            max_x: c.x,
            max_y: c.y,
        }
    }

    pub fn of_coordinates(coords: &[Coordinate]) -> Option<Self> {
        let mut iter = coords.iter();
        let mut env = Envelope::of_coordinate(iter.next()?);
        for c in iter {
            env = env.union(&Envelope::of_coordinate(c));
        }
        Some(env)
    }

    pub fn union(&self, other: &Envelope) -> Envelope {
        Envelope {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    pub fn intersects(&self, other: &Envelope) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    pub fn contains(&self, other: &Envelope) -> bool {
        self.min_x <= other.min_x
            && self.max_x >= other.max_x
            && self.min_y <= other.min_y
            && self.max_y >= other.max_y
    }

    /// Rectangles that meet only along an edge or corner.
    pub fn touches(&self, other: &Envelope) -> bool {
        self.intersects(other)
            && (self.min_x == other.max_x
                || self.max_x == other.min_x
                || self.min_y == other.max_y
                || self.max_y == other.min_y)
    }

    /// Minimum distance between the two rectangles; zero when they overlap.
    pub fn distance(&self, other: &Envelope) -> f64 {
        let dx = (other.min_x - self.max_x).max(self.min_x - other.max_x).max(0.0);
        let dy = (other.min_y - self.max_y).max(self.min_y - other.max_y).max(0.0);
        (dx * dx + dy * dy).sqrt()
    }
}

/// The geometric shape of a [`Geometry`] value.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Point(Coordinate),
    LineString(Vec<Coordinate>),
    Polygon(Polygon),
    MultiPoint(Vec<Coordinate>),
    MultiLineString(Vec<Vec<Coordinate>>),
    MultiPolygon(Vec<Polygon>),
    Collection(Vec<Geometry>),
    Envelope(Envelope),
}

/// An immutable geometry value with an optional reference-system tag.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    pub shape: Shape,
    pub crs: Option<Crs>,
}

impl Geometry {
    pub fn new(shape: Shape) -> Self {
        Geometry { shape, crs: None }
    }

    pub fn tagged(shape: Shape, crs: Crs) -> Self {
        Geometry {
            shape,
            crs: Some(crs),
        }
    }

    /// Bounding envelope of this geometry; `None` for an empty collection.
    pub fn envelope(&self) -> Option<Envelope> {
        match &self.shape {
            Shape::Point(c) => Envelope::of_coordinates(std::slice::from_ref(c)),
            Shape::LineString(coords) | Shape::MultiPoint(coords) => {
                Envelope::of_coordinates(coords)
            }
            Shape::Polygon(p) => Envelope::of_coordinates(&p.shell),
            Shape::MultiLineString(lines) => lines
                .iter()
                .filter_map(|line| Envelope::of_coordinates(line))
                .reduce(|a, b| a.union(&b)),
            Shape::MultiPolygon(polys) => polys
                .iter()
                .filter_map(|p| Envelope::of_coordinates(&p.shell))
                .reduce(|a, b| a.union(&b)),
            Shape::Collection(children) => children
                .iter()
                .filter_map(|g| g.envelope())
                .reduce(|a, b| a.union(&b)),
            Shape::Envelope(env) => Some(*env),
        }
    }

    /// Well-known-text rendering, used for display and structural hashing.
    pub fn to_wkt(&self) -> String {
        let mut out = String::new();
        self.write_wkt(&mut out);
        out
    }

    fn write_wkt(&self, out: &mut String) {
        match &self.shape {
            Shape::Point(c) => {
                out.push_str("POINT (");
                write_coordinate(out, c);
                out.push(')');
            }
            Shape::LineString(coords) => {
                out.push_str("LINESTRING ");
                write_sequence(out, coords);
            }
            Shape::Polygon(p) => {
                out.push_str("POLYGON ");
                write_polygon(out, p);
            }
            Shape::MultiPoint(coords) => {
                out.push_str("MULTIPOINT ");
                write_sequence(out, coords);
            }
            Shape::MultiLineString(lines) => {
                out.push_str("MULTILINESTRING (");
                for (i, line) in lines.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    write_sequence(out, line);
                }
                out.push(')');
            }
            Shape::MultiPolygon(polys) => {
                out.push_str("MULTIPOLYGON (");
                for (i, p) in polys.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    write_polygon(out, p);
                }
                out.push(')');
            }
            Shape::Collection(children) => {
                out.push_str("GEOMETRYCOLLECTION (");
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    child.write_wkt(out);
                }
                out.push(')');
            }
            Shape::Envelope(env) => {
                let _ = write!(
                    out,
                    "ENVELOPE ({}, {}, {}, {})",
                    env.min_x, env.max_x, env.max_y, env.min_y
                );
            }
        }
    }
}

fn write_coordinate(out: &mut String, c: &Coordinate) {
    let _ = write!(out, "{} {}", c.x, c.y);
    if let Some(z) = c.z {
        let _ = write!(out, " {}", z);
    }
}

fn write_sequence(out: &mut String, coords: &[Coordinate]) {
    out.push('(');
    for (i, c) in coords.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_coordinate(out, c);
    }
    out.push(')');
}

fn write_polygon(out: &mut String, p: &Polygon) {
    out.push('(');
    write_sequence(out, &p.shell);
    for hole in &p.holes {
        out.push_str(", ");
        write_sequence(out, hole);
    }
    out.push(')');
}

/// Coarse DE-9IM matrix for two envelopes, classified by their mutual
/// relation. Interior/boundary/exterior intersection dimensions follow the
/// canonical area-area matrices for each case.
pub fn relate_matrix(a: &Envelope, b: &Envelope) -> [u8; 9] {
    if !a.intersects(b) {
        return *b"FF2FF1212";
    }
    if a == b {
        return *b"2FF1FFFF2";
    }
    if a.touches(b) {
        return *b"FF2F11212";
    }
    if a.contains(b) {
        return *b"212FF1FF2";
    }
    if b.contains(a) {
        return *b"2FF1FF212";
    }
    *b"212101212"
}
