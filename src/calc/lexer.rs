use super::ast::StrKind;
use super::{CalcError, CalcResult};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Number(String),
    Str { value: String, kind: StrKind },
    Name(String),
    Op(&'static str),
    End,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub(crate) kind: TokenKind,
    pub(crate) offset: usize,
}

// Longest operators first so that `**` wins over `*`.
const OPERATORS: [&str; 47] = [
    "**=", "//=", ">>=", "<<=", "...", "**", "//", "<<", ">>", "<=", ">=", "==", "!=", ":=",
    "->", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "@=", "+", "-", "*", "/", "%", "@",
    "&", "|", "^", "~", "<", ">", "(", ")", "[", "]", "{", "}", ",", ":", ".", ";", "=",
];

const STRING_PREFIXES: [&str; 8] = ["r", "u", "b", "f", "br", "rb", "fr", "rf"];

pub(crate) fn tokenize(source: &str) -> CalcResult<Vec<Token>> {
    Lexer {
        source,
        chars: source.char_indices().collect(),
        pos: 0,
    }
    .run()
}

struct Lexer<'a> {
    source: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
}

impl Lexer<'_> {
    fn run(mut self) -> CalcResult<Vec<Token>> {
        let mut tokens = Vec::new();

        while let Some(ch) = self.peek(0) {
            let offset = self.offset();
            if ch.is_whitespace() {
                self.pos += 1;
            } else if ch == '#' {
                while self.peek(0).is_some_and(|c| c != '\n') {
                    self.pos += 1;
                }
            } else if ch == '\\' && self.peek(1) == Some('\n') {
                self.pos += 2;
            } else if ch.is_ascii_digit()
                || (ch == '.' && self.peek(1).is_some_and(|c| c.is_ascii_digit()))
            {
                tokens.push(Token {
                    kind: TokenKind::Number(self.number()?),
                    offset,
                });
            } else if ch == '_' || ch.is_alphabetic() {
                let name = self.identifier();
                let quote = self.peek(0);
                if matches!(quote, Some('\'' | '"')) && is_string_prefix(&name) {
                    let kind = string_kind(&name);
                    let raw = name.to_ascii_lowercase().contains('r');
                    let value = self.string(raw)?;
                    tokens.push(Token {
                        kind: TokenKind::Str { value, kind },
                        offset,
                    });
                } else {
                    tokens.push(Token {
                        kind: TokenKind::Name(name),
                        offset,
                    });
                }
            } else if ch == '\'' || ch == '"' {
                let value = self.string(false)?;
                tokens.push(Token {
                    kind: TokenKind::Str {
                        value,
                        kind: StrKind::Text,
                    },
                    offset,
                });
            } else if let Some(op) = self.operator() {
                tokens.push(Token {
                    kind: TokenKind::Op(op),
                    offset,
                });
            } else {
                return Err(CalcError::syntax(format!("invalid character '{ch}'"), offset));
            }
        }

        tokens.push(Token {
            kind: TokenKind::End,
            offset: self.source.len(),
        });
        Ok(tokens)
    }

    fn peek(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).map(|(_, ch)| *ch)
    }

    fn offset(&self) -> usize {
        self.chars
            .get(self.pos)
            .map_or(self.source.len(), |(offset, _)| *offset)
    }

    fn take_while(&mut self, accept: impl Fn(char) -> bool) -> String {
        let mut out = String::new();
        while let Some(ch) = self.peek(0).filter(|c| accept(*c)) {
            out.push(ch);
            self.pos += 1;
        }
        out
    }

    fn identifier(&mut self) -> String {
        self.take_while(|c| c == '_' || c.is_alphanumeric())
    }

    fn number(&mut self) -> CalcResult<String> {
        let start = self.offset();
        let mut literal = String::new();

        let radix_prefix = self.peek(0) == Some('0')
            && matches!(self.peek(1), Some('x' | 'X' | 'o' | 'O' | 'b' | 'B'));
        if radix_prefix {
            literal.push('0');
            literal.extend(self.peek(1));
            self.pos += 2;
            literal.push_str(&self.take_while(|c| c.is_ascii_hexdigit() || c == '_'));
        } else {
            literal.push_str(&self.take_while(|c| c.is_ascii_digit() || c == '_'));
            if self.peek(0) == Some('.') {
                literal.push('.');
                self.pos += 1;
                literal.push_str(&self.take_while(|c| c.is_ascii_digit() || c == '_'));
            }
            if matches!(self.peek(0), Some('e' | 'E'))
                && (self.peek(1).is_some_and(|c| c.is_ascii_digit())
                    || (matches!(self.peek(1), Some('+' | '-'))
                        && self.peek(2).is_some_and(|c| c.is_ascii_digit())))
            {
                literal.push('e');
                self.pos += 1;
                if let Some(sign @ ('+' | '-')) = self.peek(0) {
                    literal.push(sign);
                    self.pos += 1;
                }
                literal.push_str(&self.take_while(|c| c.is_ascii_digit() || c == '_'));
            }
            if matches!(self.peek(0), Some('j' | 'J')) {
                literal.push('j');
                self.pos += 1;
            }
        }

        if self.peek(0).is_some_and(|c| c == '_' || c.is_alphanumeric()) {
            return Err(CalcError::syntax("invalid decimal literal", start));
        }
        Ok(literal)
    }

    fn string(&mut self, raw: bool) -> CalcResult<String> {
        let start = self.offset();
        let Some(quote) = self.peek(0) else {
            return Err(CalcError::syntax("unterminated string literal", start));
        };
        let triple = self.peek(1) == Some(quote) && self.peek(2) == Some(quote);
        self.pos += if triple { 3 } else { 1 };

        let mut value = String::new();
        loop {
            let Some(ch) = self.peek(0) else {
                return Err(CalcError::syntax("unterminated string literal", start));
            };

            if ch == quote {
                if !triple {
                    self.pos += 1;
                    return Ok(value);
                }
                if self.peek(1) == Some(quote) && self.peek(2) == Some(quote) {
                    self.pos += 3;
                    return Ok(value);
                }
            }
            if ch == '\n' && !triple {
                return Err(CalcError::syntax("unterminated string literal", start));
            }

            if ch == '\\' {
                let escaped = self.peek(1).ok_or_else(|| {
                    CalcError::syntax("unterminated string literal", start)
                })?;
                self.pos += 2;
                if raw {
                    value.push('\\');
                    value.push(escaped);
                } else {
                    match escaped {
                        'n' => value.push('\n'),
                        't' => value.push('\t'),
                        '\n' => {}
                        '\\' | '\'' | '"' => value.push(escaped),
                        other => {
                            value.push('\\');
                            value.push(other);
                        }
                    }
                }
                continue;
            }

            value.push(ch);
            self.pos += 1;
        }
    }

    fn operator(&mut self) -> Option<&'static str> {
        let rest = &self.source[self.offset()..];
        let op = OPERATORS.iter().copied().find(|op| rest.starts_with(op))?;
        self.pos += op.chars().count();
        Some(op)
    }
}

fn is_string_prefix(name: &str) -> bool {
    STRING_PREFIXES
        .iter()
        .any(|prefix| prefix.eq_ignore_ascii_case(name))
}

fn string_kind(prefix: &str) -> StrKind {
    let lower = prefix.to_ascii_lowercase();
    if lower.contains('b') {
        StrKind::Bytes
    } else if lower.contains('f') {
        StrKind::Formatted
    } else {
        StrKind::Text
    }
}

#[cfg(test)]
mod tests {
    use super::{TokenKind, tokenize};
    use crate::calc::CalcError;
    use crate::calc::ast::StrKind;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .expect("tokenize")
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn splits_numbers_names_and_longest_operators() {
        assert_eq!(
            kinds("2**x//3"),
            vec![
                TokenKind::Number("2".to_string()),
                TokenKind::Op("**"),
                TokenKind::Name("x".to_string()),
                TokenKind::Op("//"),
                TokenKind::Number("3".to_string()),
                TokenKind::End,
            ]
        );
    }

    #[test]
    fn reads_float_exponent_and_imaginary_literals() {
        assert_eq!(
            kinds(".5 1e-3 2j 0x1F 1_000"),
            vec![
                TokenKind::Number(".5".to_string()),
                TokenKind::Number("1e-3".to_string()),
                TokenKind::Number("2j".to_string()),
                TokenKind::Number("0x1F".to_string()),
                TokenKind::Number("1_000".to_string()),
                TokenKind::End,
            ]
        );
    }

    #[test]
    fn number_followed_by_exponent_name_is_not_swallowed() {
        // `2e` is not an exponent without digits, so it is an invalid literal.
        assert!(matches!(
            tokenize("2e").expect_err("invalid"),
            CalcError::Syntax { offset: 0, .. }
        ));
    }

    #[test]
    fn reads_prefixed_and_triple_quoted_strings() {
        assert_eq!(
            kinds("b'x' f\"{y}\" '''a'b'''"),
            vec![
                TokenKind::Str {
                    value: "x".to_string(),
                    kind: StrKind::Bytes
                },
                TokenKind::Str {
                    value: "{y}".to_string(),
                    kind: StrKind::Formatted
                },
                TokenKind::Str {
                    value: "a'b".to_string(),
                    kind: StrKind::Text
                },
                TokenKind::End,
            ]
        );
    }

    #[test]
    fn skips_comments_and_reports_offsets() {
        let tokens = tokenize("1 # comment\n+ 2").expect("tokenize");
        assert_eq!(tokens[1].kind, TokenKind::Op("+"));
        assert_eq!(tokens[1].offset, 12);
        assert_eq!(tokens.last().map(|t| t.offset), Some(15));
    }

    #[test]
    fn rejects_unknown_characters_and_open_strings() {
        assert!(matches!(
            tokenize("3 $ 4").expect_err("dollar"),
            CalcError::Syntax { offset: 2, .. }
        ));
        assert!(tokenize("'abc").is_err());
    }
}
