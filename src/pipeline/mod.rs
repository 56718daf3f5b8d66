//! Pipeline stages for one report.
//!
//! ```text
//! input ──▶ render ──▶ encode ──▶ llm ──▶ parse
//! (path/URL) (page 1)  (base64)  (VLM)   (9 fields)
//! ```
//!
//! 1. [`input`]  — canonicalise the path or URL to a local PDF
//! 2. [`render`] — rasterise page one; runs in `spawn_blocking` because
//!    pdfium is not async-safe
//! 3. [`encode`] — PNG-encode and base64-wrap the image
//! 4. [`llm`]    — the single model call; the only stage with API traffic
//! 5. [`parse`]  — split the reply into exactly nine values

pub mod encode;
pub mod input;
pub mod llm;
pub mod parse;
pub mod render;
