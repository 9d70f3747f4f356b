// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Word-level PDF ingestion.
//!
//! The pipeline consumes words through the `WordExtractor` trait and nothing
//! else, so the PDF engine is swappable and tests can feed synthetic
//! documents without touching a real file. The bundled `PdfiumExtractor`
//! (behind the `pdf` feature) walks pdfium's per-character stream and groups
//! characters into words on whitespace boundaries, unioning their bounds.
//!
//! Extraction failures are per-document: an unreadable or encrypted PDF is
//! reported to the caller, which skips the document and moves on. Nothing in
//! here aborts a run.

use std::path::Path;

use thiserror::Error;

use crate::types::Bbox;

/// A word as reported by the text engine: glyphs plus a bounding box.
#[derive(Debug, Clone, PartialEq)]
pub struct RawWord {
    pub text: String,
    pub bbox: Bbox,
}

/// One page of extracted words, in reading order.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPage {
    pub width: f32,
    pub height: f32,
    pub words: Vec<RawWord>,
}

/// A whole document as extracted, before normalisation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawDocument {
    pub pages: Vec<RawPage>,
}

/// Why a document could not be ingested. Fatal to the document, never to
/// the pipeline.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unreadable pdf: {0}")]
    UnreadablePdf(String),
    #[error("encrypted pdf")]
    EncryptedPdf,
}

/// The single seam between the comparison core and any PDF engine.
pub trait WordExtractor: Sync {
    fn extract_words(&self, path: &Path) -> Result<RawDocument, ExtractError>;
}

impl<E: WordExtractor + ?Sized> WordExtractor for &E {
    fn extract_words(&self, path: &Path) -> Result<RawDocument, ExtractError> {
        (**self).extract_words(path)
    }
}

#[cfg(feature = "pdf")]
pub use pdfium::PdfiumExtractor;

#[cfg(feature = "pdf")]
mod pdfium {
    use std::path::Path;

    use pdfium_render::prelude::*;

    use super::{ExtractError, RawDocument, RawPage, RawWord, WordExtractor};
    use crate::types::Bbox;

    /// Word extraction backed by a system pdfium library.
    ///
    /// Characters come back from pdfium in reading order; consecutive
    /// non-whitespace characters form a word whose box is the union of the
    /// character boxes.
    pub struct PdfiumExtractor;

    impl WordExtractor for PdfiumExtractor {
        fn extract_words(&self, path: &Path) -> Result<RawDocument, ExtractError> {
            let bindings = Pdfium::bind_to_system_library().map_err(|e| {
                ExtractError::UnreadablePdf(format!("pdfium unavailable: {e:?}"))
            })?;
            let pdfium = Pdfium::new(bindings);

            let document = pdfium.load_pdf_from_file(path, None).map_err(|e| match e {
                PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::PasswordError) => {
                    ExtractError::EncryptedPdf
                }
                other => ExtractError::UnreadablePdf(format!("{other:?}")),
            })?;

            let mut pages = Vec::new();
            for page in document.pages().iter() {
                let width = page.width().value;
                let height = page.height().value;
                let text = page
                    .text()
                    .map_err(|e| ExtractError::UnreadablePdf(format!("{e:?}")))?;

                let chars = text.chars();
                let mut words: Vec<RawWord> = Vec::new();
                let mut current = String::new();
                let mut current_box: Option<Bbox> = None;

                let flush = |current: &mut String, current_box: &mut Option<Bbox>,
                             words: &mut Vec<RawWord>| {
                    if let Some(bbox) = current_box.take() {
                        if !current.is_empty() {
                            words.push(RawWord {
                                text: std::mem::take(current),
                                bbox,
                            });
                        }
                    }
                    current.clear();
                };

                for i in 0..chars.len() {
                    let Ok(pdf_char) = chars.get(i) else { continue };
                    let Some(glyph) = pdf_char.unicode_char() else {
                        continue;
                    };
                    if glyph.is_whitespace() || glyph.is_control() {
                        flush(&mut current, &mut current_box, &mut words);
                        continue;
                    }
                    let Ok(bounds) = pdf_char.loose_bounds() else {
                        continue;
                    };
                    let char_box = Bbox::new(
                        bounds.left().value,
                        bounds.bottom().value,
                        bounds.right().value,
                        bounds.top().value,
                    );
                    current.push(glyph);
                    current_box = Some(match current_box {
                        Some(existing) => existing.union(&char_box),
                        None => char_box,
                    });
                }
                flush(&mut current, &mut current_box, &mut words);

                pages.push(RawPage {
                    width,
                    height,
                    words,
                });
            }

            Ok(RawDocument { pages })
        }
    }
}
