//! PDF rasterisation: render page one of a report via pdfium.
//!
//! pdfium keeps thread-local state and is not safe to drive from async
//! tasks, so the work runs on the blocking pool via `spawn_blocking`.
//!
//! The Test Report Form is always the first page. Its pixel size follows the
//! configured DPI, with `max_rendered_pixels` capping the longest edge.

use crate::config::ExtractionConfig;
use crate::error::ExtractError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Points per inch in PDF user space.
const POINTS_PER_INCH: f32 = 72.0;

/// Rasterise page one of the PDF at `path`.
pub async fn render_first_page(
    path: &Path,
    config: &ExtractionConfig,
) -> Result<DynamicImage, ExtractError> {
    let path = path.to_path_buf();
    let dpi = config.dpi;
    let max_pixels = config.max_rendered_pixels;
    let password = config.password.clone();

    tokio::task::spawn_blocking(move || {
        render_first_page_blocking(&path, dpi, max_pixels, password.as_deref())
    })
    .await
    .map_err(|e| ExtractError::Internal(format!("Render task panicked: {e}")))?
}

/// Pixel size for a page of `width_pts` × `height_pts` at `dpi`, scaled down
/// so neither edge exceeds `max_pixels`.
pub fn target_size(width_pts: f32, height_pts: f32, dpi: u32, max_pixels: u32) -> (u32, u32) {
    let scale = dpi as f32 / POINTS_PER_INCH;
    let mut w = width_pts.max(1.0) * scale;
    let mut h = height_pts.max(1.0) * scale;

    let longest = w.max(h);
    if longest > max_pixels as f32 {
        let shrink = max_pixels as f32 / longest;
        w *= shrink;
        h *= shrink;
    }

    ((w.round() as u32).max(1), (h.round() as u32).max(1))
}

fn render_first_page_blocking(
    path: &Path,
    dpi: u32,
    max_pixels: u32,
    password: Option<&str>,
) -> Result<DynamicImage, ExtractError> {
    let pdfium =
        pdfium_auto::bind().map_err(|e| ExtractError::PdfiumBindingFailed(e.to_string()))?;

    let document = pdfium
        .load_pdf_from_file(path, password)
        .map_err(|e| classify_load_error(path.to_path_buf(), password.is_some(), e))?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    if total_pages == 0 {
        return Err(ExtractError::EmptyDocument {
            path: path.to_path_buf(),
        });
    }
    debug!("{}: {} page(s), rendering page 1", path.display(), total_pages);

    let page = pages.get(0).map_err(|e| ExtractError::RasterisationFailed {
        path: path.to_path_buf(),
        detail: format!("{e:?}"),
    })?;

    let (width, height) = target_size(page.width().value, page.height().value, dpi, max_pixels);
    let render_config = PdfRenderConfig::new()
        .set_target_width(width as i32)
        .set_maximum_height(height as i32);

    let bitmap = page
        .render_with_config(&render_config)
        .map_err(|e| ExtractError::RasterisationFailed {
            path: path.to_path_buf(),
            detail: format!("{e:?}"),
        })?;

    let image = bitmap.as_image();
    debug!(
        "Rendered {} → {}x{} px at {} DPI",
        path.display(),
        image.width(),
        image.height(),
        dpi
    );

    Ok(image)
}

fn classify_load_error(path: PathBuf, had_password: bool, e: PdfiumError) -> ExtractError {
    let detail = format!("{e:?}");
    if detail.to_ascii_lowercase().contains("password") {
        if had_password {
            ExtractError::WrongPassword { path }
        } else {
            ExtractError::PasswordRequired { path }
        }
    } else {
        ExtractError::CorruptPdf { path, detail }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a4_at_300_dpi() {
        // A4 is 595 × 842 pt.
        assert_eq!(target_size(595.0, 842.0, 300, 4000), (2479, 3508));
    }

    #[test]
    fn letter_at_72_dpi_is_one_pixel_per_point() {
        assert_eq!(target_size(612.0, 792.0, 72, 4000), (612, 792));
    }

    #[test]
    fn longest_edge_is_capped() {
        let (w, h) = target_size(595.0, 842.0, 400, 2000);
        assert_eq!(h, 2000);
        assert!(w < h);
        assert!((w as f32 / h as f32 - 595.0 / 842.0).abs() < 0.01);
    }

    #[test]
    fn degenerate_page_still_has_pixels() {
        let (w, h) = target_size(0.0, 0.0, 72, 4000);
        assert!(w >= 1 && h >= 1);
    }

    #[test]
    fn password_errors_are_distinguished() {
        let e = classify_load_error(
            PathBuf::from("locked.pdf"),
            false,
            PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::PasswordError),
        );
        assert!(matches!(e, ExtractError::PasswordRequired { .. }));

        let e = classify_load_error(
            PathBuf::from("locked.pdf"),
            true,
            PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::PasswordError),
        );
        assert!(matches!(e, ExtractError::WrongPassword { .. }));

        let e = classify_load_error(
            PathBuf::from("bad.pdf"),
            false,
            PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::FormatError),
        );
        assert!(matches!(e, ExtractError::CorruptPdf { .. }));
    }
}
