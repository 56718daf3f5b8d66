//! Image encoding: `DynamicImage` → base64 PNG wrapped in `ImageData`.
//!
//! Vision APIs take images as base64 data embedded in the JSON body. PNG
//! keeps the printed digits in the score boxes crisp, where JPEG ringing
//! can turn a 6.5 into an 8.5. `detail: "high"` lets GPT-4-class models tile
//! the full-resolution page instead of a single 512 px overview.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

pub const PNG_MIME: &str = "image/png";

/// Encode the rendered report page for the model request.
pub fn encode_png(img: &DynamicImage) -> Result<ImageData, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded {} byte PNG → {} bytes base64", buf.len(), b64.len());

    Ok(ImageData::new(b64, PNG_MIME).with_detail("high"))
}
