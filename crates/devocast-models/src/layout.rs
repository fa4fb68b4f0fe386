//! ThumbnailLayout: the background image and text boxes composited into the
//! intro/outro stills, and rendered into a thumbnail artifact (§3, §4.K).

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A single text overlay, positioned against a 1920×1080 canvas (§3).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TextBox {
    pub id: String,
    pub text: String,
    pub x_percent: f32,
    pub y_percent: f32,
    pub font_size_px: u32,
    pub font_family: String,
    pub color: String,
    pub visible: bool,
}

/// Intro/outro still duration bound.
pub const INTRO_OUTRO_DURATION_RANGE: (f64, f64) = (2.0, 5.0);
/// Crossfade length between the intro/outro still and the body (§4.K).
pub const INTRO_OUTRO_CROSSFADE_SECONDS: f64 = 0.5;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct IntroOutroSettings {
    pub enabled: bool,
    pub duration_seconds: f64,
}

impl IntroOutroSettings {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            duration_seconds: 0.0,
        }
    }

    /// Clamp to the valid `[2, 5]` second range (§3).
    pub fn clamped(enabled: bool, duration_seconds: f64) -> Self {
        Self {
            enabled,
            duration_seconds: duration_seconds.clamp(
                INTRO_OUTRO_DURATION_RANGE.0,
                INTRO_OUTRO_DURATION_RANGE.1,
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ThumbnailLayout {
    pub background_image_url: String,
    pub text_boxes: Vec<TextBox>,
    pub intro_settings: IntroOutroSettings,
    pub outro_settings: IntroOutroSettings,
}

impl ThumbnailLayout {
    /// Visible text boxes, in the order they should be composited.
    pub fn visible_text_boxes(&self) -> impl Iterator<Item = &TextBox> {
        self.text_boxes.iter().filter(|b| b.visible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_is_clamped_to_valid_range() {
        let settings = IntroOutroSettings::clamped(true, 10.0);
        assert_eq!(settings.duration_seconds, 5.0);
        let settings = IntroOutroSettings::clamped(true, 0.5);
        assert_eq!(settings.duration_seconds, 2.0);
    }

    #[test]
    fn hidden_text_boxes_are_excluded() {
        let layout = ThumbnailLayout {
            background_image_url: "https://blob/bg.png".into(),
            text_boxes: vec![
                TextBox {
                    id: "1".into(),
                    text: "Visible".into(),
                    x_percent: 50.0,
                    y_percent: 50.0,
                    font_size_px: 48,
                    font_family: "sans".into(),
                    color: "#fff".into(),
                    visible: true,
                },
                TextBox {
                    id: "2".into(),
                    text: "Hidden".into(),
                    x_percent: 50.0,
                    y_percent: 80.0,
                    font_size_px: 24,
                    font_family: "sans".into(),
                    color: "#fff".into(),
                    visible: false,
                },
            ],
            intro_settings: IntroOutroSettings::disabled(),
            outro_settings: IntroOutroSettings::disabled(),
        };
        let visible: Vec<_> = layout.visible_text_boxes().collect();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, "1");
    }
}
