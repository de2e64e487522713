use unicode_normalization::UnicodeNormalization;

/// Canonical composition plus outer whitespace trimming.
///
/// Inner line breaks are kept, the model sees paragraphs as typed.
pub fn normalize_input(text: &str) -> String {
    text.trim().nfc().collect()
}
