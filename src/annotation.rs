//! # Annotation Module
//!
//! Draws what the engine found onto a copy of the original photo, or a
//! fallback banner when the engine could not run at all.
//!
//! ## Boxes
//!
//! Token-mode recognition runs once on the primary variant. A token is drawn
//! when its trimmed text is non-empty and its confidence is at least the
//! threshold (inclusive). Coordinates are scaled from variant space back to
//! the original image, since the variant may have been upscaled. Each box is
//! a 2 px green rectangle with the token text (at most 25 characters) in red
//! just above it, kept inside the image.
//!
//! ## Fallback banner
//!
//! [`render_fallback`] blends a red band over the top `max(30, height / 18)`
//! rows at 50% opacity and writes the message on it in white.
//!
//! Text is only rendered when a font could be loaded; boxes and the banner
//! are drawn either way.

use ab_glyph::FontVec;
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::engine::{RecognitionEngine, Token};
use crate::ocr_config::RecognitionProfile;
use crate::ocr_errors::OcrError;
use crate::preprocessing::PreprocessingVariant;
use crate::recognition::LanguageSet;

const BBOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

const LABEL_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

const BANNER_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

const BANNER_TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

const BBOX_THICKNESS: u32 = 2;

const LABEL_SCALE: f32 = 16.0;

const LABEL_GAP: i32 = 5;

const BANNER_ALPHA: f32 = 0.5;

/// Font files tried when no font is configured
const SYSTEM_FONT_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Load the configured font, or the first usable system font.
pub fn load_font(configured: Option<&Path>) -> Option<FontVec> {
    if let Some(path) = configured {
        match std::fs::read(path).map(FontVec::try_from_vec) {
            Ok(Ok(font)) => return Some(font),
            Ok(Err(e)) => warn!(path = %path.display(), error = %e, "Configured font is invalid"),
            Err(e) => warn!(path = %path.display(), error = %e, "Configured font cannot be read"),
        }
    }

    for path in SYSTEM_FONT_PATHS {
        if let Ok(font_data) = std::fs::read(path) {
            if let Ok(font) = FontVec::try_from_vec(font_data) {
                debug!(path = %path, "Loaded system font");
                return Some(font);
            }
        }
    }

    warn!("No usable font found, labels and banner text will be skipped");
    None
}

/// Annotated copy of the original image.
#[derive(Debug, Clone)]
pub struct Annotation {
    pub image: RgbImage,
    /// Number of boxes drawn
    pub boxes: usize,
}

/// Whether a token passes the annotation filter
pub fn is_drawable(token: &Token, threshold: f32) -> bool {
    !token.text.trim().is_empty() && token.confidence.is_some_and(|c| c >= threshold)
}

/// Maps token-mode recognition results onto the original image.
pub struct AnnotationMapper<'a> {
    engine: &'a dyn RecognitionEngine,
    languages: LanguageSet,
    threshold: f32,
    label_max_chars: usize,
    font: Option<&'a FontVec>,
}

impl<'a> AnnotationMapper<'a> {
    pub fn new(
        engine: &'a dyn RecognitionEngine,
        languages: LanguageSet,
        threshold: f32,
        label_max_chars: usize,
        font: Option<&'a FontVec>,
    ) -> Self {
        Self {
            engine,
            languages,
            threshold,
            label_max_chars,
            font,
        }
    }

    /// Recognize tokens on `primary` and draw the accepted ones on a copy of
    /// `original`.
    ///
    /// # Errors
    ///
    /// Any engine error. The caller decides whether it is fatal
    /// ([`OcrError::EngineUnavailable`]) or merely means no boxes.
    pub fn annotate(
        &self,
        original: &DynamicImage,
        primary: &PreprocessingVariant,
        profile: &RecognitionProfile,
    ) -> Result<Annotation, OcrError> {
        let start_time = std::time::Instant::now();

        let (tokens, used_fallback) = self.languages.run_with_fallback(profile, |config| {
            self.engine.recognize_tokens(&primary.image, config)
        })?;

        let mut image = original.to_rgb8();
        let scale = (
            image.width() as f32 / primary.image.width().max(1) as f32,
            image.height() as f32 / primary.image.height().max(1) as f32,
        );

        let mut boxes = 0;
        for token in tokens.iter().filter(|t| is_drawable(t, self.threshold)) {
            let Some(rect) = map_to_original(token, scale, image.dimensions()) else {
                continue;
            };
            draw_box(&mut image, rect);
            if let Some(font) = self.font {
                let label: String = token.text.trim().chars().take(self.label_max_chars).collect();
                draw_label(&mut image, rect, &label, font);
            }
            boxes += 1;
        }

        info!(
            tokens = tokens.len(),
            boxes,
            threshold = self.threshold,
            used_fallback_languages = used_fallback,
            duration_ms = start_time.elapsed().as_millis(),
            "Annotation finished"
        );

        Ok(Annotation { image, boxes })
    }
}

/// Scale a token box into the original image and clip it to the bounds.
fn map_to_original(token: &Token, scale: (f32, f32), bounds: (u32, u32)) -> Option<Rect> {
    let (width, height) = bounds;
    let left = (token.left as f32 * scale.0).round() as u32;
    let top = (token.top as f32 * scale.1).round() as u32;
    if left >= width || top >= height {
        return None;
    }

    let box_width = ((token.width as f32 * scale.0).round() as u32)
        .max(1)
        .min(width - left);
    let box_height = ((token.height as f32 * scale.1).round() as u32)
        .max(1)
        .min(height - top);

    Some(Rect::at(left as i32, top as i32).of_size(box_width, box_height))
}

fn draw_box(image: &mut RgbImage, rect: Rect) {
    for inset in 0..BBOX_THICKNESS {
        let width = rect.width().saturating_sub(2 * inset);
        let height = rect.height().saturating_sub(2 * inset);
        if width == 0 || height == 0 {
            break;
        }
        let inner = Rect::at(rect.left() + inset as i32, rect.top() + inset as i32)
            .of_size(width, height);
        draw_hollow_rect_mut(image, inner, BBOX_COLOR);
    }
}

fn draw_label(image: &mut RgbImage, rect: Rect, label: &str, font: &FontVec) {
    if label.is_empty() {
        return;
    }
    let (text_width, text_height) = text_size(LABEL_SCALE, font, label);
    let max_x = (image.width() as i32 - text_width as i32).max(0);
    let max_y = (image.height() as i32 - text_height as i32).max(0);
    let x = rect.left().clamp(0, max_x);
    let y = (rect.top() - LABEL_GAP - text_height as i32).clamp(0, max_y);
    draw_text_mut(image, LABEL_COLOR, x, y, LABEL_SCALE, font, label);
}

/// Height of the fallback banner for an image of the given height
pub fn banner_height(image_height: u32) -> u32 {
    (image_height / 18).max(30).min(image_height)
}

/// Copy of `original` with a translucent red banner carrying `message`.
pub fn render_fallback(original: &DynamicImage, message: &str, font: Option<&FontVec>) -> RgbImage {
    let mut image = original.to_rgb8();
    let banner = banner_height(image.height());

    for y in 0..banner {
        for x in 0..image.width() {
            let pixel = image.get_pixel_mut(x, y);
            for channel in 0..3 {
                let blended = BANNER_ALPHA * BANNER_COLOR[channel] as f32
                    + (1.0 - BANNER_ALPHA) * pixel[channel] as f32;
                pixel[channel] = blended.round() as u8;
            }
        }
    }

    if let Some(font) = font {
        let scale = (banner as f32 * 0.6).max(12.0);
        let (_, text_height) = text_size(scale, font, message);
        let y = ((banner as i32 - text_height as i32) / 2).max(0);
        draw_text_mut(&mut image, BANNER_TEXT_COLOR, 10, y, scale, font, message);
    }

    debug!(banner_height = banner, "Fallback image rendered");
    image
}
