use htsql_ast::Span;
use smol_str::SmolStr;

use crate::error::LexError;
use crate::token::{Sym, Token, TokenKind};

/// Percent-decodes `source`, returning the decoded text plus, for every
/// decoded `char`, the [`Span`] of the original source bytes it came from
/// (one byte for a literal pass-through, three bytes `%HH` for a decoded
/// octet). This lets every later token carry a span into the text the user
/// actually wrote (§4.1, §8 "Scanner round-trip").
fn percent_decode(source: &str) -> Result<(String, Vec<Span>), LexError> {
    let bytes = source.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut byte_spans = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b == 0 {
            return Err(LexError::nul_byte(Span::new(i, i + 1)));
        }
        if b == b'%' {
            let hex = bytes.get(i + 1..i + 3);
            let value = hex
                .and_then(|h| std::str::from_utf8(h).ok())
                .and_then(|h| u8::from_str_radix(h, 16).ok());
            match value {
                Some(v) => {
                    if v == 0 {
                        return Err(LexError::nul_byte(Span::new(i, i + 3)));
                    }
                    decoded.push(v);
                    byte_spans.push(Span::new(i, i + 3));
                    i += 3;
                }
                None => {
                    let end = (i + 3).min(bytes.len());
                    return Err(LexError::bad_percent_escape(Span::new(i, end)));
                }
            }
        } else {
            decoded.push(b);
            byte_spans.push(Span::new(i, i + 1));
            i += 1;
        }
    }
    let text = String::from_utf8(decoded)
        .map_err(|_| LexError::new("percent-decoding produced invalid UTF-8", Span::new(0, bytes.len())))?;

    // Collapse the per-byte spans down to one span per decoded `char`.
    let mut char_spans = Vec::with_capacity(text.len());
    let mut idx = 0;
    for ch in text.chars() {
        let width = ch.len_utf8();
        let mut span = byte_spans[idx];
        for s in &byte_spans[idx + 1..idx + width] {
            span = span.to(*s);
        }
        char_spans.push(span);
        idx += width;
    }
    Ok((text, char_spans))
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Tokenizes already percent-decoded source text, producing spans into the
/// *original* (pre-decode) source via `char_spans`.
struct Cursor<'a> {
    chars: Vec<char>,
    char_spans: Vec<Span>,
    pos: usize,
    text: &'a str,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn span_at(&self, pos: usize) -> Span {
        if pos < self.char_spans.len() {
            self.char_spans[pos]
        } else {
            // End-of-input: a zero-width span right after the last byte.
            Span::synthetic(self.text.len())
        }
    }

    fn span_from(&self, start: usize) -> Span {
        let s = self.span_at(start);
        let e = if self.pos == 0 {
            s
        } else {
            self.span_at(self.pos - 1)
        };
        s.to(e)
    }
}

/// Scans `source` into a token stream terminated by a sentinel `End` token
/// (§4.1). `source` is the raw HTSQL text, percent-escapes and all.
pub fn scan(source: &str) -> Result<Vec<Token>, LexError> {
    let (text, char_spans) = percent_decode(source)?;
    let mut cursor = Cursor {
        chars: text.chars().collect(),
        char_spans,
        pos: 0,
        text: source,
    };
    let mut tokens = Vec::new();

    loop {
        while matches!(cursor.peek(), Some(c) if c.is_whitespace()) {
            cursor.bump();
        }
        let Some(c) = cursor.peek() else {
            tokens.push(Token {
                kind: TokenKind::End,
                raw: SmolStr::new(""),
                sym: None,
                span: cursor.span_from(cursor.pos),
            });
            break;
        };

        let start = cursor.pos;

        if is_name_start(c) {
            while matches!(cursor.peek(), Some(c) if is_name_continue(c)) {
                cursor.bump();
            }
            let raw: String = cursor.chars[start..cursor.pos].iter().collect();
            tokens.push(Token {
                kind: TokenKind::Name,
                raw: SmolStr::new(raw),
                sym: None,
                span: cursor.span_from(start),
            });
            continue;
        }

        if c.is_ascii_digit() {
            while matches!(cursor.peek(), Some(c) if c.is_ascii_digit()) {
                cursor.bump();
            }
            let mut kind = TokenKind::Int;
            if cursor.peek() == Some('.') && matches!(cursor.peek_at(1), Some(c) if c.is_ascii_digit())
            {
                cursor.bump();
                while matches!(cursor.peek(), Some(c) if c.is_ascii_digit()) {
                    cursor.bump();
                }
                kind = TokenKind::Decimal;
            }
            if matches!(cursor.peek(), Some('e') | Some('E')) {
                let save = cursor.pos;
                cursor.bump();
                if matches!(cursor.peek(), Some('+') | Some('-')) {
                    cursor.bump();
                }
                if matches!(cursor.peek(), Some(c) if c.is_ascii_digit()) {
                    while matches!(cursor.peek(), Some(c) if c.is_ascii_digit()) {
                        cursor.bump();
                    }
                    kind = TokenKind::Float;
                } else {
                    cursor.pos = save;
                }
            }
            let raw: String = cursor.chars[start..cursor.pos].iter().collect();
            tokens.push(Token {
                kind,
                raw: SmolStr::new(raw),
                sym: None,
                span: cursor.span_from(start),
            });
            continue;
        }

        if c == '\'' {
            cursor.bump();
            let mut value = String::new();
            loop {
                match cursor.peek() {
                    None => return Err(LexError::unterminated_string(cursor.span_from(start))),
                    Some('\n') => return Err(LexError::unterminated_string(cursor.span_from(start))),
                    Some('\'') => {
                        cursor.bump();
                        if cursor.peek() == Some('\'') {
                            value.push('\'');
                            cursor.bump();
                        } else {
                            break;
                        }
                    }
                    Some(c) => {
                        value.push(c);
                        cursor.bump();
                    }
                }
            }
            tokens.push(Token {
                kind: TokenKind::String,
                raw: SmolStr::new(value),
                sym: None,
                span: cursor.span_from(start),
            });
            continue;
        }

        let rest: String = cursor.chars[cursor.pos..].iter().collect();
        if let Some((text, sym)) = Sym::TABLE.iter().find(|(t, _)| rest.starts_with(t)) {
            for _ in 0..text.chars().count() {
                cursor.bump();
            }
            tokens.push(Token {
                kind: TokenKind::Symbol,
                raw: SmolStr::new(*text),
                sym: Some(*sym),
                span: cursor.span_from(start),
            });
            continue;
        }

        return Err(LexError::illegal_char(c, cursor.span_from(start)));
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn raws(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|t| t.raw.as_str()).collect()
    }

    #[test]
    fn scans_a_simple_navigation() {
        let tokens = scan("/school{code, name}").unwrap();
        assert_eq!(
            raws(&tokens),
            vec!["/", "school", "{", "code", ",", "name", "}", ""]
        );
        assert_eq!(tokens.last().unwrap().kind, TokenKind::End);
    }

    #[test]
    fn distinguishes_int_decimal_float() {
        let tokens = scan("3 3.5 3.5e10 3e-2").unwrap();
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Int,
                TokenKind::Decimal,
                TokenKind::Float,
                TokenKind::Float,
                TokenKind::End,
            ]
        );
    }

    #[test]
    fn number_then_dot_is_not_a_decimal() {
        let tokens = scan("3.foo").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Int);
        assert!(tokens[1].is_symbol(Sym::Dot));
        assert_eq!(tokens[2].raw.as_str(), "foo");
    }

    #[test]
    fn longest_match_symbols() {
        let tokens = scan("a!==b a!=b a!~b a==b").unwrap();
        let syms: Vec<_> = tokens.iter().filter_map(|t| t.sym).collect();
        assert_eq!(syms, vec![Sym::NeNe, Sym::Ne, Sym::NotTilde, Sym::EqEq]);
    }

    #[test]
    fn string_with_escaped_quote() {
        let tokens = scan("'it''s'").unwrap();
        assert_eq!(tokens[0].raw.as_str(), "it's");
    }

    #[test]
    fn unterminated_string_is_an_error() {
        assert!(scan("'abc").is_err());
    }

    #[test]
    fn nul_byte_is_rejected() {
        assert!(scan("a\0b").is_err());
    }

    #[test]
    fn bad_percent_escape_is_rejected() {
        assert!(scan("%zz").is_err());
        assert!(scan("%4").is_err());
    }

    #[test]
    fn percent_decodes_before_tokenizing() {
        // %5F is '_', a legal NAME-continue character.
        let tokens = scan("foo%5Fbar").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Name);
        assert_eq!(tokens[0].raw.as_str(), "foo_bar");
        assert_eq!(tokens[0].span, Span::new(0, 9));
    }

    #[test]
    fn adjacency_is_preserved_for_dollar_and_star() {
        let tokens = scan("$x * *2").unwrap();
        assert!(tokens[0].is_symbol(Sym::Dollar));
        assert!(tokens[1].is_adjacent_to(&tokens[0]));
        // '*' then space then '*2': the first star is not adjacent to the
        // second, but the second star is adjacent to the following '2'.
        assert!(!tokens[2].is_adjacent_to(&tokens[3]));
        assert!(tokens[3].is_symbol(Sym::Star));
        assert!(tokens[4].is_adjacent_to(&tokens[3]));
    }
}
