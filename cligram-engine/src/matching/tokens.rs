//! Input line tokenization
//!
//! Command lines split on whitespace. A double quote toggles quoting, so `"a b"` is one token
//! holding `a b`; the quotes themselves are not part of the text. An unterminated quote runs to the
//! end of the line. Every token keeps its byte range in the line for error reporting.

/// One word of an input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputToken {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

pub fn tokenize(line: &str) -> Vec<InputToken> {
    let mut tokens = Vec::new();
    let mut chars = line.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        let mut text = String::new();
        let mut end = start;
        let mut quoted = false;
        while let Some(&(i, c)) = chars.peek() {
            if c.is_whitespace() && !quoted {
                break;
            }
            if c == '"' {
                quoted = !quoted;
            } else {
                text.push(c);
            }
            end = i + c.len_utf8();
            chars.next();
        }
        tokens.push(InputToken { text, start, end });
    }

    tokens
}
