use super::DocumentParser;
use crate::{error::DocqaError, map_err};
use pdfium_render::prelude::Pdfium;
use std::{fmt::Write, time::Instant};
use tracing::debug;

/// Parses PDFs by concatenating the text of every page, one page per line block.
///
/// Requires the pdfium dynamic library to be available at runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfParser;

impl DocumentParser for PdfParser {
    fn parse(&self, input: &[u8]) -> Result<String, DocqaError> {
        let start = Instant::now();

        let pdfium = Pdfium::default();
        let document = map_err!(pdfium.load_pdf_from_byte_slice(input, None));

        let mut out = String::new();

        for page in document.pages().iter() {
            let text = map_err!(page.text());
            let _ = writeln!(out, "{}", text.all());
        }

        debug!(
            "Finished processing PDF, {} pages, took {}ms",
            document.pages().len(),
            Instant::now().duration_since(start).as_millis()
        );

        Ok(out)
    }
}
