//! Connector curves between two anchor points.
//!
//! A connector is a horizontal S-curve: both control points are pushed
//! horizontally away from their endpoint by a fraction of the horizontal
//! distance. Besides the visible path every connector carries a much wider
//! hit path, used only to make thin lines easy to click, and an arrowhead at
//! the target end.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::model::graph::{Point, Size};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorStyle {
    /// Control point offset as a fraction of the horizontal distance.
    pub curvature: f32,
    /// Lower bound for the control point offset.
    pub min_offset: f32,
    pub stroke_width: f32,
    pub hit_stroke_width: f32,
    pub arrow_size: f32,
}

impl Default for ConnectorStyle {
    fn default() -> Self {
        Self {
            curvature: 0.5,
            min_offset: 0.0,
            stroke_width: 2.0,
            hit_stroke_width: 16.0,
            arrow_size: 8.0,
        }
    }
}

/// Cubic Bézier curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicCurve {
    pub from: Point,
    pub ctrl1: Point,
    pub ctrl2: Point,
    pub to: Point,
}

impl CubicCurve {
    /// Evaluate the curve at `t` in `[0, 1]`.
    pub fn eval(&self, t: f32) -> Point {
        let mt = 1.0 - t;
        let a = mt * mt * mt;
        let b = 3.0 * mt * mt * t;
        let c = 3.0 * mt * t * t;
        let d = t * t * t;
        Point::new(
            a * self.from.x + b * self.ctrl1.x + c * self.ctrl2.x + d * self.to.x,
            a * self.from.y + b * self.ctrl1.y + c * self.ctrl2.y + d * self.to.y,
        )
    }

    /// Approximate the curve with `segments` straight segments.
    pub fn flatten(&self, segments: usize) -> Vec<Point> {
        let segments = segments.max(1);
        (0..=segments)
            .map(|i| self.eval(i as f32 / segments as f32))
            .collect()
    }

    /// Minimum distance from `p` to the curve, sampled.
    pub fn distance_to(&self, p: Point) -> f32 {
        const SAMPLES: usize = 24;
        self.flatten(SAMPLES)
            .windows(2)
            .map(|w| distance_to_segment(p, w[0], w[1]))
            .fold(f32::MAX, f32::min)
    }

    /// SVG path data: `M x y C x1 y1, x2 y2, x y`.
    pub fn svg_path(&self) -> String {
        let mut d = String::new();
        let _ = write!(
            d,
            "M {} {} C {} {}, {} {}, {} {}",
            self.from.x,
            self.from.y,
            self.ctrl1.x,
            self.ctrl1.y,
            self.ctrl2.x,
            self.ctrl2.y,
            self.to.x,
            self.to.y
        );
        d
    }
}

fn distance_to_segment(p: Point, a: Point, b: Point) -> f32 {
    let ab = (b.x - a.x, b.y - a.y);
    let len_sq = ab.0 * ab.0 + ab.1 * ab.1;
    if len_sq < f32::EPSILON {
        return p.distance(a);
    }
    let t = (((p.x - a.x) * ab.0 + (p.y - a.y) * ab.1) / len_sq).clamp(0.0, 1.0);
    p.distance(Point::new(a.x + t * ab.0, a.y + t * ab.1))
}

/// Triangle marking the target end of a connector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arrowhead {
    pub tip: Point,
    pub left: Point,
    pub right: Point,
}

impl Arrowhead {
    pub fn points(&self) -> [Point; 3] {
        [self.tip, self.left, self.right]
    }
}

/// Everything a rendering backend needs to draw and hit-test one edge.
#[derive(Debug, Clone, PartialEq)]
pub struct Connector {
    pub curve: CubicCurve,
    pub path_data: String,
    /// Same curve as `path_data`; stroked at `hit_stroke_width` and invisible.
    pub hit_path_data: String,
    pub stroke_width: f32,
    pub hit_stroke_width: f32,
    pub arrow: Arrowhead,
}

impl Connector {
    pub fn source(&self) -> Point {
        self.curve.from
    }

    pub fn target(&self) -> Point {
        self.curve.to
    }

    /// Whether `p` falls within the hit stroke.
    pub fn hit_test(&self, p: Point) -> bool {
        self.curve.distance_to(p) <= self.hit_stroke_width / 2.0
    }
}

/// Builds connectors with one style.
#[derive(Debug, Clone, Default)]
pub struct ConnectorGeometry {
    style: ConnectorStyle,
}

impl ConnectorGeometry {
    pub fn new(style: ConnectorStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> &ConnectorStyle {
        &self.style
    }

    pub fn connect(&self, from: Point, to: Point) -> Connector {
        let offset = ((to.x - from.x).abs() * self.style.curvature).max(self.style.min_offset);
        let curve = CubicCurve {
            from,
            ctrl1: Point::new(from.x + offset, from.y),
            ctrl2: Point::new(to.x - offset, to.y),
            to,
        };
        let path = curve.svg_path();
        Connector {
            curve,
            hit_path_data: path.clone(),
            path_data: path,
            stroke_width: self.style.stroke_width,
            hit_stroke_width: self.style.hit_stroke_width,
            arrow: self.arrowhead(&curve),
        }
    }

    /// Connector from a fixed origin to the live cursor while dragging.
    pub fn preview(&self, origin: Point, cursor: Point) -> Connector {
        self.connect(origin, cursor)
    }

    fn arrowhead(&self, curve: &CubicCurve) -> Arrowhead {
        let tip = curve.to;
        // Tangent at the end; degenerate curves fall back to the chord, then to +x.
        let mut dir = (tip.x - curve.ctrl2.x, tip.y - curve.ctrl2.y);
        if dir.0.abs() < f32::EPSILON && dir.1.abs() < f32::EPSILON {
            dir = (tip.x - curve.from.x, tip.y - curve.from.y);
        }
        let len = (dir.0 * dir.0 + dir.1 * dir.1).sqrt();
        let (ux, uy) = if len < f32::EPSILON {
            (1.0, 0.0)
        } else {
            (dir.0 / len, dir.1 / len)
        };
        let size = self.style.arrow_size;
        let base = Point::new(tip.x - ux * size, tip.y - uy * size);
        let half = size / 2.0;
        Arrowhead {
            tip,
            left: Point::new(base.x - uy * half, base.y + ux * half),
            right: Point::new(base.x + uy * half, base.y - ux * half),
        }
    }
}

/// Right-center of a card: where outgoing connectors start.
pub fn source_anchor(position: Point, size: Size) -> Point {
    Point::new(position.x + size.width, position.y + size.height / 2.0)
}

/// Left-center of a card: where incoming connectors end.
pub fn target_anchor(position: Point, size: Size) -> Point {
    Point::new(position.x, position.y + size.height / 2.0)
}
