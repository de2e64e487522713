/// True for Hiragana, Katakana (including half-width and phonetic
/// extensions) and Han ideographs.
pub fn is_japanese_char(c: char) -> bool {
    matches!(c,
        // Hiragana
        '\u{3041}'..='\u{3096}'
        | '\u{309D}'..='\u{309F}'
        | '\u{1B001}'..='\u{1B11F}'
        | '\u{1B132}'
        | '\u{1B150}'..='\u{1B152}'
        | '\u{1F200}'
        // Katakana
        | '\u{30A1}'..='\u{30FA}'
        | '\u{30FD}'..='\u{30FF}'
        | '\u{31F0}'..='\u{31FF}'
        | '\u{32D0}'..='\u{32FE}'
        | '\u{3300}'..='\u{3357}'
        | '\u{FF66}'..='\u{FF6F}'
        | '\u{FF71}'..='\u{FF9D}'
        | '\u{1B000}'
        | '\u{1B155}'
        | '\u{1B164}'..='\u{1B167}'
        // Han
        | '\u{2E80}'..='\u{2E99}'
        | '\u{2E9B}'..='\u{2EF3}'
        | '\u{2F00}'..='\u{2FD5}'
        | '\u{3005}'
        | '\u{3007}'
        | '\u{3021}'..='\u{3029}'
        | '\u{3038}'..='\u{303B}'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{4E00}'..='\u{9FFF}'
        | '\u{F900}'..='\u{FA6D}'
        | '\u{FA70}'..='\u{FAD9}'
        | '\u{20000}'..='\u{2A6DF}'
        | '\u{2A700}'..='\u{2EBEF}'
        | '\u{2F800}'..='\u{2FA1D}'
        | '\u{30000}'..='\u{323AF}'
    )
}

pub fn contains_japanese(text: &str) -> bool {
    text.chars().any(is_japanese_char)
}

/// Translation direction picked from the input script
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    JapaneseToEnglish,
    EnglishToJapanese,
}

impl Direction {
    /// Any Japanese script means the text is Japanese, everything else is
    /// treated as English
    pub fn detect(text: &str) -> Self {
        if contains_japanese(text) {
            Direction::JapaneseToEnglish
        } else {
            Direction::EnglishToJapanese
        }
    }

    pub fn instruction(&self) -> &'static str {
        match self {
            Direction::JapaneseToEnglish => "Translate to English.",
            Direction::EnglishToJapanese => "Translate to Japanese.",
        }
    }
}
