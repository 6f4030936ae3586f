use super::entities::{Drawing, Shape};
use super::tools::Tool;
use crate::domain::chart::PaneId;
use crate::domain::coordinates::{CoordinateMapper, DomainPoint, PixelPoint};

/// A new drawing being placed click by click.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub pane: PaneId,
    pub tool: Tool,
    /// Clicked points so far; their count is the step counter.
    pub fixed: Vec<DomainPoint>,
    /// Live point under the pointer.
    pub cursor: DomainPoint,
}

impl Placement {
    pub fn begin(pane: PaneId, tool: Tool, point: DomainPoint) -> Self {
        Self { pane, tool, fixed: vec![point], cursor: point }
    }

    pub fn step(&self) -> usize {
        self.fixed.len()
    }

    pub fn update(&mut self, point: DomainPoint) {
        self.cursor = point;
    }

    /// Records a click. Returns the finished shape once enough points exist.
    pub fn click(&mut self, point: DomainPoint, required: usize) -> Option<Shape> {
        self.fixed.push(point);
        self.cursor = point;
        (self.fixed.len() >= required).then(|| self.tool.build(&self.fixed, None)).flatten()
    }

    pub fn preview(&self) -> Option<Shape> {
        let mut points = self.fixed.clone();
        points.push(self.cursor);
        self.tool.build(&points, None)
    }
}

/// Whole-drawing drag.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveSession {
    pub pane: PaneId,
    pub original: Drawing,
    pub live: Drawing,
    pub start: PixelPoint,
}

impl MoveSession {
    pub fn begin(pane: PaneId, drawing: Drawing, start: PixelPoint) -> Self {
        Self { pane, live: drawing.clone(), original: drawing, start }
    }

    /// Recomputes the live copy from the original, so repeated updates do
    /// not accumulate rounding. Anchors shift by a whole number of bars and
    /// by exactly `dy` pixels. Unmappable steps keep the previous copy.
    pub fn update(&mut self, pointer: PixelPoint, mapper: &CoordinateMapper<'_>) -> bool {
        let spacing = mapper.time_scale().bar_spacing;
        if !spacing.is_finite() || spacing <= 0.0 {
            return false;
        }
        let bars = ((pointer.x - self.start.x) / spacing).round();
        let dy = pointer.y - self.start.y;
        match self.original.shape.try_map_points(|point| mapper.shift(point, bars, dy)) {
            Some(shape) => {
                self.live.shape = shape;
                true
            }
            None => false,
        }
    }

    pub fn commit(self) -> Drawing {
        self.live
    }
}

/// Single-anchor drag.
#[derive(Debug, Clone, PartialEq)]
pub struct ReshapeSession {
    pub pane: PaneId,
    pub original: Drawing,
    pub live: Drawing,
    pub handle: usize,
}

impl ReshapeSession {
    pub fn begin(pane: PaneId, drawing: Drawing, handle: usize) -> Self {
        Self { pane, live: drawing.clone(), original: drawing, handle }
    }

    pub fn update(&mut self, pointer: PixelPoint, mapper: &CoordinateMapper<'_>) -> bool {
        match mapper.pixel_to_domain(pointer) {
            Some(point) => {
                self.live.shape = self.original.shape.with_anchor(self.handle, point);
                true
            }
            None => false,
        }
    }

    pub fn commit(self) -> Drawing {
        self.live
    }
}

/// Ephemeral gesture state. Dropping it cancels the gesture.
#[derive(Debug, Clone, PartialEq)]
pub enum DragSession {
    Placing(Placement),
    Freehand { pane: PaneId, points: Vec<DomainPoint> },
    Moving(MoveSession),
    Reshaping(ReshapeSession),
}

impl DragSession {
    pub fn pane(&self) -> PaneId {
        match self {
            DragSession::Placing(placement) => placement.pane,
            DragSession::Freehand { pane, .. } => *pane,
            DragSession::Moving(session) => session.pane,
            DragSession::Reshaping(session) => session.pane,
        }
    }

    /// What the overlay should paint for this gesture.
    pub fn preview(&self) -> Option<Shape> {
        match self {
            DragSession::Placing(placement) => placement.preview(),
            DragSession::Freehand { points, .. } => Some(Shape::Freehand { points: points.clone() }),
            DragSession::Moving(session) => Some(session.live.shape.clone()),
            DragSession::Reshaping(session) => Some(session.live.shape.clone()),
        }
    }

    /// Whether this is an edit of an existing drawing.
    pub fn is_drag(&self) -> bool {
        matches!(self, DragSession::Moving(_) | DragSession::Reshaping(_))
    }
}
