use super::types::DocumentDecoder;
use super::ExtractionError;

/// Concatenate the text of every page in document order.
///
/// Single strategy: a decoder failure is returned as-is, never retried
/// with another decoder.
pub fn extract_text(decoder: &dyn DocumentDecoder, bytes: &[u8]) -> Result<String, ExtractionError> {
    let pages = decoder.page_texts(bytes)?;
    tracing::debug!(pages = pages.len(), "Extracted document text");
    Ok(pages.join("\n"))
}
