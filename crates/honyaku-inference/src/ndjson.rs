/// Splits a byte stream into newline-delimited lines.
///
/// Chunks may end anywhere, including inside a UTF-8 sequence. A newline byte
/// never occurs inside a multi-byte sequence, so splitting on it is safe.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: Vec<u8>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes and return every completed, non-blank line
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&line[..line.len() - 1]);
            let text = text.trim();
            if !text.is_empty() {
                lines.push(text.to_string());
            }
        }
        lines
    }

    /// Remaining unterminated line, if any
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        let text = String::from_utf8_lossy(&rest);
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_across_chunks() {
        let mut decoder = LineDecoder::new();
        assert!(decoder.push(b"{\"a\":").is_empty());
        assert_eq!(decoder.push(b"1}\n{\"b\":2}\n\n{\"c\""), vec!["{\"a\":1}", "{\"b\":2}"]);
        assert_eq!(decoder.finish().as_deref(), Some("{\"c\""));
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn test_split_utf8_sequence() {
        let text = "こんにちは\n".as_bytes();
        let mut decoder = LineDecoder::new();
        // Cut in the middle of the first character
        assert!(decoder.push(&text[..1]).is_empty());
        assert_eq!(decoder.push(&text[1..]), vec!["こんにちは"]);
    }

    #[test]
    fn test_crlf_is_trimmed() {
        let mut decoder = LineDecoder::new();
        assert_eq!(decoder.push(b"line\r\n"), vec!["line"]);
    }
}
