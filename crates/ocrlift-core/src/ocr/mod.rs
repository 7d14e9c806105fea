//! OCR engine adapter.
//!
//! The pipeline talks to OCR through two small traits: [`BackendFactory`]
//! starts an engine, [`OcrBackend`] turns an image into text. The
//! [`EngineHandle`] owns the single engine instance, creating it on first use
//! and releasing it exactly once.

mod handle;
#[cfg(feature = "native")]
mod pure_engine;

pub use handle::EngineHandle;
#[cfg(feature = "native")]
pub use pure_engine::{PureOcrEngine, PureOcrFactory};

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::error::OcrError;

/// Anything that can recognize text in an image.
pub trait OcrBackend {
    /// Recognize all text in `image`, lines separated by newlines.
    fn recognize(&mut self, image: &DynamicImage) -> Result<String, OcrError>;
}

/// Creates OCR backends on demand.
pub trait BackendFactory {
    /// The backend this factory produces.
    type Backend: OcrBackend;

    /// Start a new engine. Fails with [`OcrError::EngineInit`] when it cannot start.
    fn create(&self) -> Result<Self::Backend, OcrError>;
}

impl<B, F> BackendFactory for F
where
    B: OcrBackend,
    F: Fn() -> Result<B, OcrError>,
{
    type Backend = B;

    fn create(&self) -> Result<B, OcrError> {
        self()
    }
}

/// A recognized text box with its coordinates and content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextBox {
    /// Bounding box coordinates (x1, y1, x2, y2, x3, y3, x4, y4) for quadrilateral.
    pub bbox: [f32; 8],

    /// Recognized text content.
    pub text: String,

    /// Recognition confidence score (0.0 - 1.0).
    pub confidence: f32,
}

impl TextBox {
    /// Get the axis-aligned bounding rectangle.
    pub fn rect(&self) -> (f32, f32, f32, f32) {
        let xs = [self.bbox[0], self.bbox[2], self.bbox[4], self.bbox[6]];
        let ys = [self.bbox[1], self.bbox[3], self.bbox[5], self.bbox[7]];

        let min_x = xs.iter().cloned().fold(f32::INFINITY, f32::min);
        let max_x = xs.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let min_y = ys.iter().cloned().fold(f32::INFINITY, f32::min);
        let max_y = ys.iter().cloned().fold(f32::NEG_INFINITY, f32::max);

        (min_x, min_y, max_x, max_y)
    }
}

/// Result of OCR processing on an image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrResult {
    /// Recognized text boxes in reading order.
    pub boxes: Vec<TextBox>,

    /// Full text (boxes joined with newlines).
    pub text: String,

    /// Processing time in milliseconds.
    pub processing_time_ms: u64,

    /// Image dimensions (width, height).
    pub image_size: (u32, u32),
}

impl OcrResult {
    /// Build a result from unordered boxes, sorting them top-to-bottom, left-to-right.
    pub fn from_boxes(mut boxes: Vec<TextBox>, image_size: (u32, u32)) -> Self {
        boxes.sort_by(|a, b| {
            let (ax, ay, _, _) = a.rect();
            let (bx, by, _, _) = b.rect();

            // Group by approximate vertical position (within 20 pixels)
            let row_a = (ay / 20.0) as i32;
            let row_b = (by / 20.0) as i32;

            if row_a != row_b {
                row_a.cmp(&row_b)
            } else {
                ax.partial_cmp(&bx).unwrap_or(std::cmp::Ordering::Equal)
            }
        });

        let text = boxes
            .iter()
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        Self {
            boxes,
            text,
            processing_time_ms: 0,
            image_size,
        }
    }
}
