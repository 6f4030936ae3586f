use crate::domain::coordinates::DomainPoint;
use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

pub const FIB_LEVELS: [f64; 7] = [0.0, 0.236, 0.382, 0.5, 0.618, 0.786, 1.0];

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, From, Into, Display, Serialize, Deserialize,
)]
#[display(fmt = "drawing-{}", _0)]
pub struct DrawingId(u64);

impl DrawingId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionSide {
    Long,
    Short,
}

/// Geometry of a drawing. Every anchor is in domain coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Shape {
    Text { at: DomainPoint, text: String },
    Segment { from: DomainPoint, to: DomainPoint },
    /// Starts at `from` and runs through `through` to infinity.
    Ray { from: DomainPoint, through: DomainPoint },
    /// Infinite in both directions.
    ExtendedLine { a: DomainPoint, b: DomainPoint },
    Horizontal { at: DomainPoint },
    Vertical { at: DomainPoint },
    Rectangle { a: DomainPoint, b: DomainPoint },
    /// `edge` lies on the circle.
    Circle { center: DomainPoint, edge: DomainPoint },
    Triangle { a: DomainPoint, b: DomainPoint, c: DomainPoint },
    Freehand { points: Vec<DomainPoint> },
    /// Level 0 sits at `b`, level 1 at `a`.
    Fibonacci { a: DomainPoint, b: DomainPoint },
    Position { side: PositionSide, entry: DomainPoint, target: DomainPoint, stop: DomainPoint },
}

impl Shape {
    /// Stored anchors in order; freehand has none.
    pub fn anchors(&self) -> Vec<DomainPoint> {
        match self {
            Shape::Text { at, .. } | Shape::Horizontal { at } | Shape::Vertical { at } => vec![*at],
            Shape::Segment { from, to } => vec![*from, *to],
            Shape::Ray { from, through } => vec![*from, *through],
            Shape::ExtendedLine { a, b } | Shape::Rectangle { a, b } | Shape::Fibonacci { a, b } => {
                vec![*a, *b]
            }
            Shape::Circle { center, edge } => vec![*center, *edge],
            Shape::Triangle { a, b, c } => vec![*a, *b, *c],
            Shape::Position { entry, target, stop, .. } => vec![*entry, *target, *stop],
            Shape::Freehand { .. } => Vec::new(),
        }
    }

    /// Mutable view over every stored point, freehand included.
    fn points_mut(&mut self) -> Vec<&mut DomainPoint> {
        match self {
            Shape::Text { at, .. } | Shape::Horizontal { at } | Shape::Vertical { at } => vec![at],
            Shape::Segment { from, to } => vec![from, to],
            Shape::Ray { from, through } => vec![from, through],
            Shape::ExtendedLine { a, b } | Shape::Rectangle { a, b } | Shape::Fibonacci { a, b } => {
                vec![a, b]
            }
            Shape::Circle { center, edge } => vec![center, edge],
            Shape::Triangle { a, b, c } => vec![a, b, c],
            Shape::Position { entry, target, stop, .. } => vec![entry, target, stop],
            Shape::Freehand { points } => points.iter_mut().collect(),
        }
    }

    /// Every stored point, freehand included.
    pub fn points(&self) -> Vec<DomainPoint> {
        match self {
            Shape::Freehand { points } => points.clone(),
            other => other.anchors(),
        }
    }

    /// Copy with one anchor replaced. Out-of-range handles and freehand
    /// leave the shape unchanged.
    pub fn with_anchor(&self, handle: usize, point: DomainPoint) -> Shape {
        let mut shape = self.clone();
        if matches!(shape, Shape::Freehand { .. }) {
            return shape;
        }
        if let Some(anchor) = shape.points_mut().into_iter().nth(handle) {
            *anchor = point;
        }
        shape
    }

    /// Copy with every point mapped through `f`; `None` if any point fails.
    pub fn try_map_points<F>(&self, mut f: F) -> Option<Shape>
    where
        F: FnMut(DomainPoint) -> Option<DomainPoint>,
    {
        let mut shape = self.clone();
        for point in shape.points_mut() {
            *point = f(*point)?;
        }
        Some(shape)
    }

    pub fn is_filled(&self) -> bool {
        matches!(
            self,
            Shape::Rectangle { .. } | Shape::Circle { .. } | Shape::Triangle { .. } | Shape::Position { .. }
        )
    }

    /// Fibonacci level prices from level 0 to level 1.
    pub fn fib_prices(a: DomainPoint, b: DomainPoint) -> impl Iterator<Item = f64> {
        FIB_LEVELS.iter().map(move |level| b.price - (b.price - a.price) * level)
    }

    /// Position box from two clicks: the stop mirrors the target around
    /// the entry price.
    pub fn position(side: PositionSide, entry: DomainPoint, target: DomainPoint) -> Shape {
        let stop = DomainPoint::new(target.time, entry.price - (target.price - entry.price));
        Shape::Position { side, entry, target, stop }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drawing {
    pub id: DrawingId,
    pub shape: Shape,
    pub color: String,
    pub line_width: f64,
}

impl Drawing {
    pub fn new(id: DrawingId, shape: Shape) -> Self {
        Self { id, shape, color: "#2962ff".to_string(), line_width: 2.0 }
    }

    pub fn handles(&self) -> Vec<DomainPoint> {
        self.shape.anchors()
    }
}
