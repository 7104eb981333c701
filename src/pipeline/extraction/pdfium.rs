//! PDF decoding via Google PDFium.
//!
//! `PdfiumDecoder` is stateless (`Send + Sync`). Each operation binds a
//! fresh `Pdfium` instance and opens the document from the byte slice;
//! both are dropped before the call returns, on every path. The OS caches
//! `dlopen`/`LoadLibrary`, so repeat binds are near-free.

use pdfium_render::prelude::*;
use tracing::debug;

use super::table_detect::detect_tables;
use super::types::{DocumentDecoder, PageLayout, PageScan, RuleSegment, TextFragment};
use super::ExtractionError;

/// Environment variable naming an explicit PDFium library file.
pub const PDFIUM_PATH_ENV: &str = "PDFIUM_DYNAMIC_LIB_PATH";

/// Decoder backed by the PDFium text layer.
pub struct PdfiumDecoder;

impl PdfiumDecoder {
    /// Create a decoder, verifying the PDFium library is loadable (fail-fast).
    pub fn new() -> Result<Self, ExtractionError> {
        let _ = load_pdfium()?;
        Ok(Self)
    }
}

/// Load the PDFium dynamic library.
///
/// Discovery order:
/// 1. `PDFIUM_DYNAMIC_LIB_PATH` env var (explicit path)
/// 2. Alongside the running executable, then its `lib/` subdirectory
/// 3. System library search paths
pub fn load_pdfium() -> Result<Pdfium, ExtractionError> {
    if let Ok(path) = std::env::var(PDFIUM_PATH_ENV) {
        debug!(path = %path, "Loading PDFium from env var");
        let bindings = Pdfium::bind_to_library(&path).map_err(|e| {
            ExtractionError::LibraryUnavailable(format!("Failed to load PDFium from {path}: {e}"))
        })?;
        return Ok(Pdfium::new(bindings));
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(exe_dir) = exe.parent() {
            let candidates = [exe_dir.to_path_buf(), exe_dir.join("lib")];
            for dir in &candidates {
                let lib_path = Pdfium::pdfium_platform_library_name_at_path(
                    dir.to_string_lossy().as_ref(),
                );
                if let Ok(bindings) = Pdfium::bind_to_library(&lib_path) {
                    debug!(dir = %dir.display(), "Loaded PDFium from candidate directory");
                    return Ok(Pdfium::new(bindings));
                }
            }
        }
    }

    let bindings = Pdfium::bind_to_system_library().map_err(|e| {
        ExtractionError::LibraryUnavailable(format!(
            "PDFium library not found. Set {PDFIUM_PATH_ENV} or install PDFium: {e}"
        ))
    })?;
    Ok(Pdfium::new(bindings))
}

/// Map PDF load errors, singling out password-protected documents.
pub fn map_load_error(e: PdfiumError) -> ExtractionError {
    classify_load_failure(&e.to_string())
}

fn classify_load_failure(message: &str) -> ExtractionError {
    let lower = message.to_lowercase();
    if lower.contains("password") || lower.contains("encrypt") {
        ExtractionError::PdfEncrypted
    } else {
        ExtractionError::PdfParsing(message.to_string())
    }
}

/// Text segments and ruling strokes of one page.
fn page_layout(page: &PdfPage) -> Result<PageLayout, PdfiumError> {
    let text = page.text()?;
    let fragments = text
        .segments()
        .iter()
        .map(|segment| {
            let bounds = segment.bounds();
            TextFragment::new(
                segment.text(),
                bounds.left().value,
                bounds.bottom().value,
                bounds.right().value,
                bounds.top().value,
            )
        })
        .collect();

    let mut rules = Vec::new();
    for object in page.objects().iter() {
        if let Some(path) = object.as_path_object() {
            path_rules(path, &mut rules);
        }
    }

    Ok(PageLayout { fragments, rules })
}

/// Straight pieces of a path object, in page space. Curves are skipped.
fn path_rules(path: &PdfPagePathObject, rules: &mut Vec<RuleSegment>) {
    let raw = path.segments();
    let segments = match path.matrix() {
        Ok(matrix) => raw.transform(matrix),
        Err(_) => raw.raw(),
    };

    let mut subpath_start: Option<(f32, f32)> = None;
    let mut current: Option<(f32, f32)> = None;
    for segment in segments.iter() {
        let point = (segment.x().value, segment.y().value);
        match segment.segment_type() {
            PdfPathSegmentType::MoveTo => subpath_start = Some(point),
            PdfPathSegmentType::LineTo => {
                if let Some(from) = current {
                    rules.push(RuleSegment::new(from, point));
                }
            }
            PdfPathSegmentType::BezierTo | PdfPathSegmentType::Unknown => {}
        }
        current = Some(point);

        if segment.is_close() {
            if let (Some(from), Some(to)) = (current, subpath_start) {
                rules.push(RuleSegment::new(from, to));
            }
            current = subpath_start;
        }
    }
}

impl DocumentDecoder for PdfiumDecoder {
    fn page_texts(&self, bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
        let pdfium = load_pdfium()?;
        let document = pdfium
            .load_pdf_from_byte_slice(bytes, None)
            .map_err(map_load_error)?;

        let mut texts = Vec::with_capacity(document.pages().len() as usize);
        for (idx, page) in document.pages().iter().enumerate() {
            let text = page.text().map_err(|e| ExtractionError::PageText {
                page: idx + 1,
                reason: e.to_string(),
            })?;
            texts.push(text.all());
        }

        debug!(pages = texts.len(), "Read PDF text layer");
        Ok(texts)
    }

    fn scan_tables(&self, bytes: &[u8]) -> Result<Vec<PageScan>, ExtractionError> {
        let pdfium = load_pdfium()?;
        let document = pdfium
            .load_pdf_from_byte_slice(bytes, None)
            .map_err(map_load_error)?;

        let scans = document
            .pages()
            .iter()
            .enumerate()
            .map(|(idx, page)| {
                let page_number = idx + 1;
                let tables = page_layout(&page)
                    .map_err(|e| ExtractionError::PageText {
                        page: page_number,
                        reason: e.to_string(),
                    })
                    .and_then(|layout| detect_tables(&layout));
                PageScan {
                    page_number,
                    tables,
                }
            })
            .collect();

        Ok(scans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_errors_map_to_encrypted() {
        assert!(matches!(
            classify_load_failure("Incorrect password supplied"),
            ExtractionError::PdfEncrypted
        ));
        assert!(matches!(
            classify_load_failure("document is Encrypted"),
            ExtractionError::PdfEncrypted
        ));
    }

    #[test]
    fn other_load_errors_keep_decoder_message() {
        let err = classify_load_failure("PdfiumLibraryInternalError(FormatError)");
        match err {
            ExtractionError::PdfParsing(msg) => {
                assert_eq!(msg, "PdfiumLibraryInternalError(FormatError)")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn load_error_display_includes_message() {
        let err = classify_load_failure("FormatError");
        assert_eq!(err.to_string(), "PDF parsing failed: FormatError");
    }
}
