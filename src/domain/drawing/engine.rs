use super::entities::{Drawing, DrawingId, Shape};
use super::hit_test::{hit_handle, hit_shape, HitTolerance};
use super::session::{DragSession, MoveSession, Placement, ReshapeSession};
use super::tools::{Tool, ToolArity};
use crate::domain::chart::PaneId;
use crate::domain::coordinates::{CoordinateMapper, PixelPoint};
use crate::domain::logging::LogComponent;
use serde::Serialize;
use std::collections::BTreeMap;

/// Synchronous text input for the text tool. `None` means cancelled.
pub trait TextPrompt {
    fn prompt(&mut self, message: &str) -> Option<String>;
}

/// Prompt that always answers with a fixed value.
pub struct FixedPrompt(pub Option<String>);

impl TextPrompt for FixedPrompt {
    fn prompt(&mut self, _message: &str) -> Option<String> {
        self.0.clone()
    }
}

/// Outcome of one pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Interaction {
    Ignored,
    Selected { drawing: DrawingId },
    Deselected,
    Erased { drawing: DrawingId },
    PlacementStarted,
    PlacementAdvanced { step: usize },
    Committed { drawing: DrawingId },
    Updated { drawing: DrawingId },
    Cancelled,
}

/// Per-pane drawing lists plus the tool and gesture state machine.
#[derive(Debug, Clone)]
pub struct DrawingEngine {
    drawings: BTreeMap<PaneId, Vec<Drawing>>,
    tool: Tool,
    session: Option<DragSession>,
    selected: Option<(PaneId, DrawingId)>,
    next_id: u64,
    tolerance: HitTolerance,
}

impl Default for DrawingEngine {
    fn default() -> Self {
        Self::new(HitTolerance::default())
    }
}

impl DrawingEngine {
    pub fn new(tolerance: HitTolerance) -> Self {
        Self {
            drawings: BTreeMap::new(),
            tool: Tool::Cursor,
            session: None,
            selected: None,
            next_id: 1,
            tolerance,
        }
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    /// Switching tools cancels any open gesture.
    pub fn set_tool(&mut self, tool: Tool) {
        self.session = None;
        if tool != Tool::Cursor {
            self.selected = None;
        }
        self.tool = tool;
    }

    pub fn drawings(&self, pane: PaneId) -> &[Drawing] {
        self.drawings.get(&pane).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn panes_with_drawings(&self) -> impl Iterator<Item = PaneId> + '_ {
        self.drawings.iter().filter(|(_, list)| !list.is_empty()).map(|(pane, _)| *pane)
    }

    pub fn drawing(&self, pane: PaneId, id: DrawingId) -> Option<&Drawing> {
        self.drawings(pane).iter().find(|drawing| drawing.id == id)
    }

    pub fn selected(&self) -> Option<(PaneId, &Drawing)> {
        let (pane, id) = self.selected?;
        self.drawing(pane, id).map(|drawing| (pane, drawing))
    }

    /// Handles of the selection, following a live drag when there is one.
    pub fn selected_handles(&self) -> Vec<crate::domain::coordinates::DomainPoint> {
        match &self.session {
            Some(DragSession::Moving(session)) => session.live.handles(),
            Some(DragSession::Reshaping(session)) => session.live.handles(),
            _ => self.selected().map(|(_, drawing)| drawing.handles()).unwrap_or_default(),
        }
    }

    pub fn session(&self) -> Option<&DragSession> {
        self.session.as_ref()
    }

    pub fn preview(&self) -> Option<(PaneId, Shape)> {
        let session = self.session.as_ref()?;
        session.preview().map(|shape| (session.pane(), shape))
    }

    /// True while an existing drawing is being dragged.
    pub fn is_dragging(&self) -> bool {
        self.session.as_ref().is_some_and(DragSession::is_drag)
    }

    pub fn cancel(&mut self) {
        self.session = None;
    }

    /// Adds a finished shape directly.
    pub fn insert(&mut self, pane: PaneId, shape: Shape) -> DrawingId {
        let id = DrawingId::from(self.next_id);
        self.next_id += 1;
        self.drawings.entry(pane).or_default().push(Drawing::new(id, shape));
        id
    }

    /// Topmost drawing under the pointer.
    pub fn hit(&self, pane: PaneId, pointer: PixelPoint, mapper: &CoordinateMapper<'_>) -> Option<DrawingId> {
        self.drawings(pane)
            .iter()
            .rev()
            .find(|drawing| hit_shape(&drawing.shape, pointer, mapper, &self.tolerance))
            .map(|drawing| drawing.id)
    }

    pub fn pointer_down(
        &mut self,
        pane: PaneId,
        pointer: PixelPoint,
        mapper: &CoordinateMapper<'_>,
        prompt: &mut dyn TextPrompt,
    ) -> Interaction {
        match self.tool.arity() {
            ToolArity::Pointer if self.tool == Tool::Eraser => match self.hit(pane, pointer, mapper) {
                Some(id) => {
                    self.remove(pane, id);
                    Interaction::Erased { drawing: id }
                }
                None => Interaction::Ignored,
            },
            ToolArity::Pointer => self.cursor_down(pane, pointer, mapper),
            ToolArity::Single => {
                let Some(point) = mapper.pixel_to_domain(pointer) else {
                    return Interaction::Ignored;
                };
                let text = match self.tool {
                    Tool::Text => match prompt.prompt("Text") {
                        Some(text) if !text.trim().is_empty() => Some(text),
                        _ => {
                            self.tool = Tool::Cursor;
                            return Interaction::Cancelled;
                        }
                    },
                    _ => None,
                };
                let shape = self.tool.build(&[point], text);
                self.tool = Tool::Cursor;
                match shape {
                    Some(shape) => Interaction::Committed { drawing: self.insert(pane, shape) },
                    None => Interaction::Cancelled,
                }
            }
            ToolArity::Points(required) => {
                let Some(point) = mapper.pixel_to_domain(pointer) else {
                    return Interaction::Ignored;
                };
                let tool = self.tool;
                match self.session.as_mut() {
                    Some(DragSession::Placing(placement)) if placement.pane == pane && placement.tool == tool => {
                        match placement.click(point, required) {
                            Some(shape) => {
                                self.session = None;
                                self.tool = Tool::Cursor;
                                Interaction::Committed { drawing: self.insert(pane, shape) }
                            }
                            None => Interaction::PlacementAdvanced { step: placement.step() },
                        }
                    }
                    _ => {
                        self.session = Some(DragSession::Placing(Placement::begin(pane, tool, point)));
                        Interaction::PlacementStarted
                    }
                }
            }
            ToolArity::Freehand => {
                let Some(point) = mapper.pixel_to_domain(pointer) else {
                    return Interaction::Ignored;
                };
                self.session = Some(DragSession::Freehand { pane, points: vec![point] });
                Interaction::PlacementStarted
            }
        }
    }

    fn cursor_down(&mut self, pane: PaneId, pointer: PixelPoint, mapper: &CoordinateMapper<'_>) -> Interaction {
        if let Some((selected_pane, drawing)) = self.selected() {
            if selected_pane == pane {
                if let Some(handle) = hit_handle(&drawing.handles(), pointer, mapper, &self.tolerance) {
                    let drawing = drawing.clone();
                    let id = drawing.id;
                    self.session = Some(DragSession::Reshaping(ReshapeSession::begin(pane, drawing, handle)));
                    return Interaction::Selected { drawing: id };
                }
            }
        }

        match self.hit(pane, pointer, mapper) {
            Some(id) => {
                self.selected = Some((pane, id));
                if let Some(drawing) = self.drawing(pane, id).cloned() {
                    self.session = Some(DragSession::Moving(MoveSession::begin(pane, drawing, pointer)));
                }
                Interaction::Selected { drawing: id }
            }
            None => {
                let had_selection = self.selected.take().is_some();
                self.session = None;
                if had_selection { Interaction::Deselected } else { Interaction::Ignored }
            }
        }
    }

    /// Returns whether the preview changed.
    pub fn pointer_move(
        &mut self,
        pane: PaneId,
        pointer: PixelPoint,
        mapper: &CoordinateMapper<'_>,
        pressed: bool,
    ) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if session.pane() != pane {
            return false;
        }
        match session {
            DragSession::Placing(placement) => match mapper.pixel_to_domain(pointer) {
                Some(point) => {
                    placement.update(point);
                    true
                }
                None => false,
            },
            DragSession::Freehand { points, .. } if pressed => match mapper.pixel_to_domain(pointer) {
                Some(point) => {
                    points.push(point);
                    true
                }
                None => false,
            },
            DragSession::Freehand { .. } => false,
            DragSession::Moving(session) if pressed => session.update(pointer, mapper),
            DragSession::Reshaping(session) if pressed => session.update(pointer, mapper),
            DragSession::Moving(_) | DragSession::Reshaping(_) => false,
        }
    }

    /// Commits freehand strokes and drags. Placement sessions stay open.
    pub fn pointer_up(&mut self) -> Interaction {
        match self.session.take() {
            Some(DragSession::Freehand { pane, points }) => {
                self.tool = Tool::Cursor;
                if points.len() < 2 {
                    return Interaction::Cancelled;
                }
                Interaction::Committed { drawing: self.insert(pane, Shape::Freehand { points }) }
            }
            Some(DragSession::Moving(session)) => {
                let pane = session.pane;
                self.replace(pane, session.commit())
            }
            Some(DragSession::Reshaping(session)) => {
                let pane = session.pane;
                self.replace(pane, session.commit())
            }
            Some(placing @ DragSession::Placing(_)) => {
                self.session = Some(placing);
                Interaction::Ignored
            }
            None => Interaction::Ignored,
        }
    }

    fn replace(&mut self, pane: PaneId, drawing: Drawing) -> Interaction {
        let id = drawing.id;
        match self.drawings.get_mut(&pane).and_then(|list| list.iter_mut().find(|d| d.id == id)) {
            Some(slot) => {
                *slot = drawing;
                Interaction::Updated { drawing: id }
            }
            // deleted mid-gesture
            None => Interaction::Cancelled,
        }
    }

    fn remove(&mut self, pane: PaneId, id: DrawingId) -> bool {
        let Some(list) = self.drawings.get_mut(&pane) else {
            return false;
        };
        let before = list.len();
        list.retain(|drawing| drawing.id != id);
        if self.selected == Some((pane, id)) {
            self.selected = None;
            self.session = None;
        }
        list.len() != before
    }

    pub fn delete_selected(&mut self) -> Option<(PaneId, DrawingId)> {
        let (pane, id) = self.selected?;
        self.remove(pane, id).then_some((pane, id))
    }

    pub fn clear_pane(&mut self, pane: PaneId) -> usize {
        self.remove_pane_drawings(pane).len()
    }

    /// Drops a pane's list, e.g. when the layout removed the pane.
    pub fn remove_pane_drawings(&mut self, pane: PaneId) -> Vec<Drawing> {
        if self.selected.is_some_and(|(selected, _)| selected == pane) {
            self.selected = None;
        }
        if self.session.as_ref().is_some_and(|session| session.pane() == pane) {
            self.session = None;
        }
        let removed = self.drawings.remove(&pane).unwrap_or_default();
        if !removed.is_empty() {
            crate::log_debug!(LogComponent::Domain("DrawingEngine"), "dropped {} drawings of {}", removed.len(), pane);
        }
        removed
    }
}
