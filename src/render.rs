use serde::Serialize;

use crate::checkpoints::ColorTag;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum DisplayColor {
    Yellow,
    Orange,
    Red,
    /// Finish state.
    Victory,
}

impl DisplayColor {
    pub fn css(self) -> &'static str {
        match self {
            DisplayColor::Yellow => "#FFD700",
            DisplayColor::Orange => "#FFA500",
            DisplayColor::Red => "#FF4444",
            DisplayColor::Victory => "#00FFD4",
        }
    }
}

impl From<ColorTag> for DisplayColor {
    fn from(tag: ColorTag) -> Self {
        match tag {
            ColorTag::Yellow => DisplayColor::Yellow,
            ColorTag::Orange => DisplayColor::Orange,
            ColorTag::Red => DisplayColor::Red,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ControlGlyph {
    Start,
    Pause,
    Resume,
}

impl ControlGlyph {
    pub fn label(self) -> &'static str {
        match self {
            ControlGlyph::Start => "Start",
            ControlGlyph::Pause => "❚❚",
            ControlGlyph::Resume => "▶",
        }
    }
}

/// Semantic render operation. The page maps these onto its own elements,
/// classes and animations.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase", tag = "op")]
pub enum RenderOp {
    /// First start: overlay pins itself and the control shrinks.
    Activate,
    #[serde(rename_all = "camelCase")]
    SetText { text: String },
    #[serde(rename_all = "camelCase")]
    SetColor { color: DisplayColor, css: String },
    #[serde(rename_all = "camelCase")]
    SetControl { glyph: ControlGlyph, label: String },
    #[serde(rename_all = "camelCase")]
    ShowCheckpoint { index: usize, name: String },
    #[serde(rename_all = "camelCase")]
    CompleteCheckpoint { index: usize, split: String },
    EnterFinished,
    #[serde(rename_all = "camelCase")]
    NotificationShown { id: u64, text: String },
    #[serde(rename_all = "camelCase")]
    NotificationFading { id: u64 },
    #[serde(rename_all = "camelCase")]
    NotificationRemoved { id: u64 },
}

impl RenderOp {
    pub fn color(color: DisplayColor) -> Self {
        RenderOp::SetColor {
            color,
            css: color.css().to_string(),
        }
    }

    pub fn control(glyph: ControlGlyph) -> Self {
        RenderOp::SetControl {
            glyph,
            label: glyph.label().to_string(),
        }
    }
}

pub trait Renderer: Send + Sync {
    fn apply(&self, op: RenderOp);
}

/// Intersection observation over checkpoint elements. The page answers with
/// intersection events carrying the element's bounding top.
pub trait Viewport: Send + Sync {
    fn observe(&self, index: usize);
    fn unobserve(&self, index: usize);
    fn disconnect(&self);
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_ops_serialize_with_op_tag() {
        let json = serde_json::to_value(RenderOp::color(DisplayColor::Orange)).unwrap();
        assert_eq!(json["op"], "setColor");
        assert_eq!(json["color"], "orange");
        assert_eq!(json["css"], "#FFA500");

        let json = serde_json::to_value(RenderOp::NotificationShown {
            id: 3,
            text: "✓ About".into(),
        })
        .unwrap();
        assert_eq!(json["op"], "notificationShown");
        assert_eq!(json["id"], 3);
    }
}
