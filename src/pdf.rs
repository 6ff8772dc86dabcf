use std::path::Path;

use log::debug;
use pdfium_render::prelude::*;

use crate::error::{Result, TellerError};
use crate::models::{PageTokens, Token};

/// Extract positioned text tokens from every page of a PDF.
///
/// Pdfium reports coordinates with a bottom-left origin; tokens are
/// converted to the top-left origin the rest of the pipeline expects.
pub fn extract_pages(path: &Path) -> Result<Vec<PageTokens>> {
    let pdfium = Pdfium::new(
        Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(|e| TellerError::Pdf(format!("failed to bind pdfium library: {e}")))?,
    );

    let doc = pdfium
        .load_pdf_from_file(path, None)
        .map_err(|e| TellerError::Pdf(format!("failed to load {}: {e}", path.display())))?;

    let mut pages = Vec::new();
    for (page_idx, page) in doc.pages().iter().enumerate() {
        let page_width = f64::from(page.width().value);
        let page_height = f64::from(page.height().value);
        let text = page
            .text()
            .map_err(|e| TellerError::Pdf(format!("failed to read page {}: {e}", page_idx + 1)))?;

        let mut tokens = Vec::new();
        for segment in text.segments().iter() {
            let content = segment.text();
            let content = content.trim();
            if content.is_empty() {
                continue;
            }
            let bounds = segment.bounds();
            tokens.push(Token {
                text: content.to_string(),
                x: f64::from(bounds.left().value),
                y: page_height - f64::from(bounds.top().value),
                width: f64::from(bounds.right().value - bounds.left().value),
                height: f64::from(bounds.top().value - bounds.bottom().value),
            });
        }
        debug!("page {}: {} tokens", page_idx + 1, tokens.len());
        pages.push(PageTokens {
            tokens,
            page_width,
            page_height,
        });
    }

    Ok(pages)
}
