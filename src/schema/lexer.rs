use crate::schema::SchemaError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Doc,
    Ident(String),
    Number,
    Str,
    Lifetime,
    Punct(char),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub line: usize,
}

impl Token {
    pub fn is_punct(&self, ch: char) -> bool {
        self.kind == TokenKind::Punct(ch)
    }

    pub fn is_ident(&self, word: &str) -> bool {
        matches!(&self.kind, TokenKind::Ident(value) if value == word)
    }
}

const PUNCTUATION: &[char] = &[
    '{', '}', '(', ')', '<', '>', '[', ']', ',', ':', ';', '|', '#', '!', '=', '&', '.', '-', '+',
    '*', '/', '?',
];

pub(crate) fn tokenize(source: &str) -> Result<Vec<Token>, SchemaError> {
    let chars = source.chars().collect::<Vec<_>>();
    let mut tokens = Vec::new();
    let mut line = 0usize;
    let mut i = 0usize;

    while i < chars.len() {
        let ch = chars[i];
        if ch == '\n' {
            line += 1;
            i += 1;
            continue;
        }
        if ch.is_whitespace() {
            i += 1;
            continue;
        }

        if ch == '/' && chars.get(i + 1) == Some(&'/') {
            let is_doc = chars.get(i + 2) == Some(&'/') && chars.get(i + 3) != Some(&'/');
            if is_doc {
                tokens.push(Token {
                    kind: TokenKind::Doc,
                    line,
                });
            }
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }

        if ch == '/' && chars.get(i + 1) == Some(&'*') {
            let start_line = line;
            i += 2;
            loop {
                match (chars.get(i), chars.get(i + 1)) {
                    (Some('*'), Some('/')) => {
                        i += 2;
                        break;
                    }
                    (Some('\n'), _) => {
                        line += 1;
                        i += 1;
                    }
                    (Some(_), _) => i += 1,
                    (None, _) => {
                        return Err(SchemaError::Unterminated {
                            what: "block comment",
                            line: start_line + 1,
                        })
                    }
                }
            }
            continue;
        }

        if ch == '"' {
            let start_line = line;
            i += 1;
            loop {
                match chars.get(i) {
                    Some('\\') => i += 2,
                    Some('"') => {
                        i += 1;
                        break;
                    }
                    Some('\n') => {
                        line += 1;
                        i += 1;
                    }
                    Some(_) => i += 1,
                    None => {
                        return Err(SchemaError::Unterminated {
                            what: "string literal",
                            line: start_line + 1,
                        })
                    }
                }
            }
            tokens.push(Token {
                kind: TokenKind::Str,
                line: start_line,
            });
            continue;
        }

        if ch == '\'' {
            i += 1;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            tokens.push(Token {
                kind: TokenKind::Lifetime,
                line,
            });
            continue;
        }

        if ch.is_ascii_alphabetic() || ch == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            tokens.push(Token {
                kind: TokenKind::Ident(chars[start..i].iter().collect()),
                line,
            });
            continue;
        }

        if ch.is_ascii_digit() {
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            tokens.push(Token {
                kind: TokenKind::Number,
                line,
            });
            continue;
        }

        if PUNCTUATION.contains(&ch) {
            tokens.push(Token {
                kind: TokenKind::Punct(ch),
                line,
            });
            i += 1;
            continue;
        }

        return Err(SchemaError::UnexpectedChar { ch, line: line + 1 });
    }

    Ok(tokens)
}
