//! Grammar tokenization
//!
//! Raw tokenization of grammar text with the logos lexer. Whitespace and `#` comments are skipped,
//! quoted strings are unescaped, and every token keeps the byte range it came from so later stages
//! can point at the offending source.

use super::{CompileError, CompileErrorKind};
use logos::{Lexer, Logos};
use std::fmt;

/// Tokens of the grammar language.
#[derive(Logos, Debug, PartialEq, Eq, Clone)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"#[^\n]*")]
pub enum Token {
    #[token(";")]
    Semicolon,
    #[token(",")]
    Comma,
    #[token("{")]
    OpenBrace,
    #[token("}")]
    CloseBrace,
    #[token("(")]
    OpenParen,
    #[token(")")]
    CloseParen,
    #[token("[")]
    OpenBracket,
    #[token("]")]
    CloseBracket,
    #[token("<")]
    LessThan,
    #[token(">")]
    GreaterThan,
    #[token("|")]
    Pipe,
    #[token(":")]
    Colon,
    #[token("=")]
    Equals,
    #[token("@")]
    At,

    /// Double quoted string, already unescaped.
    #[regex(r#""([^"\\]|\\.)*""#, unescape)]
    Str(String),

    /// Keywords, names, numbers: anything up to whitespace or punctuation.
    #[regex(r##"[^\s;,{}()\[\]<>|:=@"#]+"##, |lex| lex.slice().to_string())]
    Word(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Semicolon => f.write_str("`;`"),
            Token::Comma => f.write_str("`,`"),
            Token::OpenBrace => f.write_str("`{`"),
            Token::CloseBrace => f.write_str("`}`"),
            Token::OpenParen => f.write_str("`(`"),
            Token::CloseParen => f.write_str("`)`"),
            Token::OpenBracket => f.write_str("`[`"),
            Token::CloseBracket => f.write_str("`]`"),
            Token::LessThan => f.write_str("`<`"),
            Token::GreaterThan => f.write_str("`>`"),
            Token::Pipe => f.write_str("`|`"),
            Token::Colon => f.write_str("`:`"),
            Token::Equals => f.write_str("`=`"),
            Token::At => f.write_str("`@`"),
            Token::Str(s) => write!(f, "string \"{}\"", s),
            Token::Word(w) => write!(f, "`{}`", w),
        }
    }
}

/// `\"`, `\\` and `\n` are escapes; any other backslash is kept as written, so regular expressions
/// such as `"\d+"` need no doubling.
fn unescape(lex: &mut Lexer<Token>) -> String {
    let slice = lex.slice();
    let body = &slice[1..slice.len() - 1];
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Inverse of the string unescaping, for printing.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => match chars.peek() {
                Some('"') | Some('\\') | Some('n') | None => out.push_str("\\\\"),
                Some(_) => out.push('\\'),
            },
            _ => out.push(c),
        }
    }
    out
}

/// Tokenize grammar text, pairing every token with its byte range.
pub fn tokenize(source: &str) -> Result<Vec<(Token, logos::Span)>, CompileError> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(()) => {
                let message = if lexer.slice().starts_with('"') {
                    "unterminated string".to_string()
                } else {
                    format!("unexpected character `{}`", lexer.slice())
                };
                return Err(CompileError::at(
                    source,
                    span.start,
                    CompileErrorKind::Syntax(message),
                ));
            }
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source).unwrap().into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn test_statement_tokens() {
        assert_eq!(
            kinds("show <n:int32>(\"Number\"), cb();"),
            vec![
                Token::Word("show".into()),
                Token::LessThan,
                Token::Word("n".into()),
                Token::Colon,
                Token::Word("int32".into()),
                Token::GreaterThan,
                Token::OpenParen,
                Token::Str("Number".into()),
                Token::CloseParen,
                Token::Comma,
                Token::Word("cb".into()),
                Token::OpenParen,
                Token::CloseParen,
                Token::Semicolon,
            ]
        );
    }

    #[test]
    fn test_comments_and_spans() {
        let tokens = tokenize("# a comment\nshow; # trailing\n").unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0], (Token::Word("show".into()), 12..16));
        assert_eq!(tokens[1].1, 16..17);
    }

    #[test]
    fn test_words_keep_dashes_and_dots() {
        assert_eq!(
            kinds("hide-database range[-5:1.5]"),
            vec![
                Token::Word("hide-database".into()),
                Token::Word("range".into()),
                Token::OpenBracket,
                Token::Word("-5".into()),
                Token::Colon,
                Token::Word("1.5".into()),
                Token::CloseBracket,
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            kinds(r#""say \"hi\"\\ \d+ \n""#),
            vec![Token::Str("say \"hi\"\\ \\d+ \n".into())]
        );
        assert_eq!(escape("say \"hi\"\\ \\d+"), r#"say \"hi\"\ \d+"#);
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("show (\"oops);").unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::Syntax("unterminated string".into()));
        assert_eq!(err.position.column, 7);
    }
}
