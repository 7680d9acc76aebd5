//! Result types returned by the pipeline.

use serde::Serialize;

/// Separator inserted between page texts of a multi-page document.
pub const PAGE_BREAK: &str = "\n\n--- Page Break ---\n\n";

/// Reported for an image upload in which the provider found no text.
pub const NO_TEXT_DETECTED: &str = "No text detected.";

/// Reported for a PDF upload in which no page had any text.
pub const NO_TEXT_IN_PDF: &str = "No text detected in PDF.";

/// Text extracted from one image or one whole document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum ExtractedText {
    /// Non-empty, trimmed text.
    Found(String),
    /// The provider answered successfully but found nothing.
    NoneDetected,
}

impl ExtractedText {
    /// Wrap raw provider output; whitespace-only text counts as nothing.
    pub fn from_raw(raw: impl AsRef<str>) -> Self {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            ExtractedText::NoneDetected
        } else {
            ExtractedText::Found(trimmed.to_string())
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, ExtractedText::Found(_))
    }

    /// The text, or `sentinel` when nothing was detected.
    pub fn into_message(self, sentinel: &str) -> String {
        match self {
            ExtractedText::Found(text) => text,
            ExtractedText::NoneDetected => sentinel.to_string(),
        }
    }
}

/// Ordered text of a multi-page document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentText {
    /// Non-empty page texts joined with [`PAGE_BREAK`] in page order.
    pub text: ExtractedText,
    /// Pages rendered from the source PDF.
    pub page_count: usize,
    /// Pages that contributed text.
    pub pages_with_text: usize,
}

impl DocumentText {
    /// Assemble per-page texts, indexed by page ordinal, into a document.
    ///
    /// Blank pages are skipped; the survivors keep their relative order.
    pub fn assemble(page_texts: &[String]) -> Self {
        let non_empty: Vec<&str> = page_texts
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .collect();

        let pages_with_text = non_empty.len();
        let text = if non_empty.is_empty() {
            ExtractedText::NoneDetected
        } else {
            ExtractedText::Found(non_empty.join(PAGE_BREAK))
        };

        Self {
            text,
            page_count: page_texts.len(),
            pages_with_text,
        }
    }

    /// The joined text, or [`NO_TEXT_IN_PDF`].
    pub fn into_message(self) -> String {
        self.text.into_message(NO_TEXT_IN_PDF)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_pages_are_dropped_and_order_kept() {
        let pages = vec![
            "  first ".to_string(),
            "\n\t".to_string(),
            "third".to_string(),
            String::new(),
        ];
        let doc = DocumentText::assemble(&pages);
        assert_eq!(
            doc.text,
            ExtractedText::Found("first\n\n--- Page Break ---\n\nthird".into())
        );
        assert_eq!(doc.page_count, 4);
        assert_eq!(doc.pages_with_text, 2);
    }

    #[test]
    fn zero_pages_is_none_detected() {
        let doc = DocumentText::assemble(&[]);
        assert_eq!(doc.text, ExtractedText::NoneDetected);
        assert_eq!(doc.into_message(), NO_TEXT_IN_PDF);
    }

    #[test]
    fn whitespace_is_not_text() {
        assert_eq!(ExtractedText::from_raw(" \n "), ExtractedText::NoneDetected);
        assert_eq!(
            ExtractedText::from_raw(" hi ").into_message(NO_TEXT_DETECTED),
            "hi"
        );
    }
}
