use serde::{Deserialize, Serialize};

/// Visible logical range, in fractional bar indices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogicalRange {
    pub from: f64,
    pub to: f64,
}

impl LogicalRange {
    pub fn new(from: f64, to: f64) -> Self {
        Self { from, to }
    }

    pub fn shifted(&self, bars: f64) -> Self {
        Self { from: self.from + bars, to: self.to + bars }
    }

    pub fn span(&self) -> f64 {
        self.to - self.from
    }
}

/// Horizontal axis: bar index `i` sits at `x = pan_offset_px + i * bar_spacing`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeScale {
    pub bar_spacing: f64,
    pub pan_offset_px: f64,
    pub width_px: f64,
    pub min_bar_spacing: f64,
    pub max_bar_spacing: f64,
}

impl Default for TimeScale {
    fn default() -> Self {
        Self::new(800.0, 6.0, 0.5, 50.0)
    }
}

impl TimeScale {
    pub fn new(width_px: f64, bar_spacing: f64, min_bar_spacing: f64, max_bar_spacing: f64) -> Self {
        Self {
            bar_spacing: bar_spacing.clamp(min_bar_spacing, max_bar_spacing),
            pan_offset_px: 0.0,
            width_px,
            min_bar_spacing,
            max_bar_spacing,
        }
    }

    pub fn logical_to_x(&self, index: f64) -> f64 {
        self.pan_offset_px + index * self.bar_spacing
    }

    pub fn x_to_logical(&self, x: f64) -> f64 {
        (x - self.pan_offset_px) / self.bar_spacing
    }

    pub fn set_width(&mut self, width_px: f64) {
        if width_px.is_finite() && width_px > 0.0 {
            self.width_px = width_px;
        }
    }

    pub fn pan(&mut self, delta_px: f64) {
        if delta_px.is_finite() {
            self.pan_offset_px += delta_px;
        }
    }

    /// Zoom keeping the bar under the cursor stable.
    pub fn zoom_at(&mut self, delta_spacing: f64, cursor_ratio: f64) {
        if !delta_spacing.is_finite() || !cursor_ratio.is_finite() {
            return;
        }
        let cursor_px = self.width_px * cursor_ratio.clamp(0.0, 1.0);
        let anchor = self.x_to_logical(cursor_px);
        self.bar_spacing =
            (self.bar_spacing + delta_spacing).clamp(self.min_bar_spacing, self.max_bar_spacing);
        self.pan_offset_px = cursor_px - anchor * self.bar_spacing;
    }

    pub fn visible_logical_range(&self) -> LogicalRange {
        LogicalRange::new(self.x_to_logical(0.0), self.x_to_logical(self.width_px))
    }

    /// Degenerate or non-finite ranges are ignored.
    pub fn set_visible_logical_range(&mut self, range: LogicalRange) {
        let span = range.span();
        if !span.is_finite() || span <= 0.0 || !range.from.is_finite() {
            return;
        }
        self.bar_spacing = self.width_px / span;
        self.pan_offset_px = -range.from * self.bar_spacing;
    }

    /// Shows bars `0..count` edge to edge, honouring the spacing limits.
    pub fn fit(&mut self, count: usize) {
        if count == 0 {
            return;
        }
        let spacing = (self.width_px / count as f64).clamp(self.min_bar_spacing, self.max_bar_spacing);
        self.bar_spacing = spacing;
        // right-align the last bar
        self.pan_offset_px = self.width_px - (count as f64 - 0.5) * spacing;
    }
}
