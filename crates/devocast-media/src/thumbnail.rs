//! Composite a ThumbnailLayout's background image and text boxes into a
//! still image (§3, §4.K): used for the thumbnail artifact (with text) and
//! for the intro/outro stills (outro renders the background alone).

use std::path::Path;

use devocast_models::{TextBox, NORMALIZED_HEIGHT, NORMALIZED_WIDTH};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

/// Render `background_image` with `text_boxes` drawn on top, scaled/padded to
/// the 1920x1080 canvas. Pass an empty slice to render the bare background.
pub async fn render_still(
    background_image: impl AsRef<Path>,
    text_boxes: &[&TextBox],
    output: impl AsRef<Path>,
) -> MediaResult<()> {
    let background_image = background_image.as_ref();
    let output = output.as_ref();

    let mut filter = format!(
        "scale={w}:{h}:force_original_aspect_ratio=increase,crop={w}:{h}",
        w = NORMALIZED_WIDTH,
        h = NORMALIZED_HEIGHT,
    );

    for text_box in text_boxes {
        filter.push(',');
        filter.push_str(&drawtext_filter(text_box));
    }

    let cmd = FfmpegCommand::new(background_image, output)
        .single_frame()
        .video_filter(filter)
        .log_level("error");

    FfmpegRunner::new().run(&cmd).await
}

fn drawtext_filter(text_box: &TextBox) -> String {
    let text = escape_drawtext_text(&text_box.text);
    let color = text_box.color.trim_start_matches('#');
    format!(
        "drawtext=text='{text}':x=(w*{x}/100)-text_w/2:y=(h*{y}/100)-text_h/2:fontsize={size}:fontcolor=0x{color}",
        x = text_box.x_percent,
        y = text_box.y_percent,
        size = text_box.font_size_px,
    )
}

/// Escape characters that are special inside an FFmpeg `drawtext` text value.
fn escape_drawtext_text(text: &str) -> String {
    text.replace('\\', r"\\\\")
        .replace(':', r"\:")
        .replace('\'', r"\'")
        .replace('%', r"\%")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_box() -> TextBox {
        TextBox {
            id: "1".to_string(),
            text: "Grace & Peace".to_string(),
            x_percent: 50.0,
            y_percent: 80.0,
            font_size_px: 64,
            font_family: "sans".to_string(),
            color: "#ffffff".to_string(),
            visible: true,
        }
    }

    #[test]
    fn drawtext_filter_centers_on_x_percent() {
        let filter = drawtext_filter(&text_box());
        assert!(filter.contains("x=(w*50/100)-text_w/2"));
        assert!(filter.contains("fontcolor=0xffffff"));
    }

    #[test]
    fn escaping_handles_colons_and_quotes() {
        let escaped = escape_drawtext_text("time: 10:30 'now'");
        assert!(escaped.contains(r"\:"));
        assert!(escaped.contains(r"\'"));
    }
}
