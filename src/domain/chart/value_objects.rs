use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumIter, EnumString};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, From, Into, Display, Serialize, Deserialize,
)]
#[display(fmt = "pane-{}", _0)]
pub struct PaneId(u64);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, From, Into, Display, Serialize, Deserialize,
)]
#[display(fmt = "series-{}", _0)]
pub struct SeriesId(u64);

impl PaneId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl SeriesId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleSide {
    #[display(fmt = "right")]
    Right,
    #[display(fmt = "left")]
    Left,
}

/// Scale binding: a shared default per side, or a minted id that is never
/// handed out twice.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Display, Serialize, Deserialize,
)]
#[serde(into = "String", try_from = "String")]
pub enum ScaleId {
    #[default]
    #[display(fmt = "right-default")]
    RightDefault,
    #[display(fmt = "left-default")]
    LeftDefault,
    #[display(fmt = "{}-{}", side, id)]
    Minted { side: ScaleSide, id: u64 },
}

impl ScaleId {
    pub fn side(&self) -> ScaleSide {
        match self {
            ScaleId::RightDefault => ScaleSide::Right,
            ScaleId::LeftDefault => ScaleSide::Left,
            ScaleId::Minted { side, .. } => *side,
        }
    }

    /// Inverse of `Display`.
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "right-default" | "right" => Some(ScaleId::RightDefault),
            "left-default" | "left" => Some(ScaleId::LeftDefault),
            other => {
                let (side, id) = other.split_once('-')?;
                let side = match side {
                    "right" => ScaleSide::Right,
                    "left" => ScaleSide::Left,
                    _ => return None,
                };
                Some(ScaleId::Minted { side, id: id.parse().ok()? })
            }
        }
    }
}

impl From<ScaleId> for String {
    fn from(scale: ScaleId) -> Self {
        scale.to_string()
    }
}

impl TryFrom<String> for ScaleId {
    type Error = String;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        ScaleId::parse(&text).ok_or_else(|| format!("unknown scale binding '{}'", text))
    }
}

/// How a series should be rebound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleRequest {
    AssignExisting(ScaleId),
    BindRight,
    BindLeft,
    NewRight,
    NewLeft,
}

impl ScaleRequest {
    /// `bind-right`, `bind-left`, `new-right`, `new-left`, or an existing
    /// binding id.
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "bind-right" => Some(ScaleRequest::BindRight),
            "bind-left" => Some(ScaleRequest::BindLeft),
            "new-right" => Some(ScaleRequest::NewRight),
            "new-left" => Some(ScaleRequest::NewLeft),
            other => ScaleId::parse(other).map(ScaleRequest::AssignExisting),
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, EnumIter, EnumString, AsRefStr, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ScaleMode {
    #[default]
    #[strum(serialize = "linear")]
    Linear,
    #[strum(serialize = "log", serialize = "logarithmic")]
    Logarithmic,
}

/// Per-binding options.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaleOptions {
    pub auto_scale: bool,
    pub mode: ScaleMode,
    pub margin_top: f64,
    pub margin_bottom: f64,
}

impl Default for ScaleOptions {
    fn default() -> Self {
        Self { auto_scale: true, mode: ScaleMode::Linear, margin_top: 0.05, margin_bottom: 0.12 }
    }
}

impl ScaleOptions {
    /// Volume histogram pinned to the lower fifth of a pane.
    pub fn volume_overlay() -> Self {
        Self { margin_top: 0.8, margin_bottom: 0.0, ..Self::default() }
    }

    /// Margins must leave a non-empty band.
    pub fn is_valid(&self) -> bool {
        let margins = [self.margin_top, self.margin_bottom];
        margins.iter().all(|m| m.is_finite() && (0.0..1.0).contains(m))
            && self.margin_top + self.margin_bottom < 1.0
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, EnumIter, EnumString, AsRefStr, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SeriesKind {
    #[default]
    #[strum(serialize = "candle", serialize = "candlestick")]
    Candle,
    #[strum(serialize = "line")]
    Line,
    #[strum(serialize = "histogram", serialize = "volume")]
    Histogram,
    #[strum(serialize = "multi_line")]
    MultiLine,
    /// Several named sub-plots computed by one protocol.
    #[strum(serialize = "protocol")]
    Protocol,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveDirection {
    #[display(fmt = "up")]
    Up,
    #[display(fmt = "down")]
    Down,
}

impl MoveDirection {
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "up" => Some(MoveDirection::Up),
            "down" => Some(MoveDirection::Down),
            _ => None,
        }
    }
}

/// Hex colour as the renderer takes it, e.g. `#2962ff`.
#[derive(Debug, Clone, PartialEq, Eq, Display, Serialize, Deserialize)]
#[display(fmt = "{}", _0)]
#[serde(try_from = "String")]
pub struct Color(String);

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        Color::parse(&text).ok_or_else(|| format!("{} is not a #rgb or #rrggbb colour", text))
    }
}

impl Color {
    pub fn from_hex(hex: u32) -> Self {
        Self(format!("#{:06x}", hex & 0xFF_FFFF))
    }

    /// Accepts `#rgb` and `#rrggbb`.
    pub fn parse(text: &str) -> Option<Self> {
        let digits = text.strip_prefix('#')?;
        let valid = matches!(digits.len(), 3 | 6) && digits.chars().all(|c| c.is_ascii_hexdigit());
        valid.then(|| Self(format!("#{}", digits.to_ascii_lowercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn blue() -> Self {
        Self::from_hex(0x2962ff)
    }

    pub fn green() -> Self {
        Self::from_hex(0x26a69a)
    }

    pub fn red() -> Self {
        Self::from_hex(0xef5350)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeriesStyle {
    pub color: Color,
    pub up_color: Color,
    pub down_color: Color,
    pub line_width: f64,
    pub visible: bool,
    /// One colour per named sub-plot.
    pub plot_colors: Vec<Color>,
}

impl Default for SeriesStyle {
    fn default() -> Self {
        Self {
            color: Color::blue(),
            up_color: Color::green(),
            down_color: Color::red(),
            line_width: 2.0,
            visible: true,
            plot_colors: Vec::new(),
        }
    }
}

/// Partial style update. Unset fields keep their value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StylePatch {
    pub color: Option<Color>,
    pub up_color: Option<Color>,
    pub down_color: Option<Color>,
    pub line_width: Option<f64>,
    pub visible: Option<bool>,
    pub plot_colors: Option<Vec<Color>>,
}

impl SeriesStyle {
    pub fn patched(&self, patch: &StylePatch) -> Self {
        let line_width = patch
            .line_width
            .filter(|width| width.is_finite() && *width > 0.0)
            .unwrap_or(self.line_width);
        Self {
            color: patch.color.clone().unwrap_or_else(|| self.color.clone()),
            up_color: patch.up_color.clone().unwrap_or_else(|| self.up_color.clone()),
            down_color: patch.down_color.clone().unwrap_or_else(|| self.down_color.clone()),
            line_width,
            visible: patch.visible.unwrap_or(self.visible),
            plot_colors: patch.plot_colors.clone().unwrap_or_else(|| self.plot_colors.clone()),
        }
    }
}
