use super::entities::{PositionSide, Shape};
use crate::domain::coordinates::DomainPoint;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumIter, EnumString};

/// Active tool of the drawing engine.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, EnumIter, EnumString, AsRefStr, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Tool {
    #[default]
    #[strum(serialize = "cursor")]
    Cursor,
    #[strum(serialize = "eraser")]
    Eraser,
    #[strum(serialize = "text")]
    Text,
    #[strum(serialize = "trend", serialize = "segment")]
    Segment,
    #[strum(serialize = "ray")]
    Ray,
    #[strum(serialize = "extended")]
    ExtendedLine,
    #[strum(serialize = "horizontal")]
    Horizontal,
    #[strum(serialize = "vertical")]
    Vertical,
    #[strum(serialize = "rectangle")]
    Rectangle,
    #[strum(serialize = "circle")]
    Circle,
    #[strum(serialize = "triangle")]
    Triangle,
    #[strum(serialize = "brush")]
    Brush,
    #[strum(serialize = "fib")]
    Fibonacci,
    #[strum(serialize = "long")]
    LongPosition,
    #[strum(serialize = "short")]
    ShortPosition,
}

/// How many clicks a tool needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolArity {
    /// Cursor and eraser act on existing drawings.
    Pointer,
    Single,
    Points(usize),
    Freehand,
}

impl Tool {
    pub fn arity(&self) -> ToolArity {
        match self {
            Tool::Cursor | Tool::Eraser => ToolArity::Pointer,
            Tool::Text | Tool::Horizontal | Tool::Vertical => ToolArity::Single,
            Tool::Triangle => ToolArity::Points(3),
            Tool::Brush => ToolArity::Freehand,
            Tool::Segment
            | Tool::Ray
            | Tool::ExtendedLine
            | Tool::Rectangle
            | Tool::Circle
            | Tool::Fibonacci
            | Tool::LongPosition
            | Tool::ShortPosition => ToolArity::Points(2),
        }
    }

    /// Builds the shape from placed points. For a preview, missing trailing
    /// points repeat the last one given.
    pub fn build(&self, points: &[DomainPoint], text: Option<String>) -> Option<Shape> {
        let first = *points.first()?;
        let nth = |n: usize| points.get(n).or(points.last()).copied().unwrap_or(first);
        let shape = match self {
            Tool::Cursor | Tool::Eraser => return None,
            Tool::Text => Shape::Text { at: first, text: text? },
            Tool::Horizontal => Shape::Horizontal { at: first },
            Tool::Vertical => Shape::Vertical { at: first },
            Tool::Segment => Shape::Segment { from: first, to: nth(1) },
            Tool::Ray => Shape::Ray { from: first, through: nth(1) },
            Tool::ExtendedLine => Shape::ExtendedLine { a: first, b: nth(1) },
            Tool::Rectangle => Shape::Rectangle { a: first, b: nth(1) },
            Tool::Circle => Shape::Circle { center: first, edge: nth(1) },
            Tool::Triangle => Shape::Triangle { a: first, b: nth(1), c: nth(2) },
            Tool::Brush => Shape::Freehand { points: points.to_vec() },
            Tool::Fibonacci => Shape::Fibonacci { a: first, b: nth(1) },
            Tool::LongPosition => Shape::position(PositionSide::Long, first, nth(1)),
            Tool::ShortPosition => Shape::position(PositionSide::Short, first, nth(1)),
        };
        Some(shape)
    }
}
