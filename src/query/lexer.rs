use crate::error::{GhnError, GhnResult};

use super::token::{Token, TokenKind};

/// Characters that terminate a bare (unquoted) identifier.
fn is_boundary(c: char) -> bool {
    c.is_whitespace() || matches!(c, ':' | ',' | '(' | ')' | '"')
}

/// Tokenize a query string (§4.1). Whitespace separates tokens except
/// inside double-quoted strings, which may contain spaces and colons.
/// `AND`/`OR`/`NOT` are recognized only as whole words, case-insensitively.
/// `-foo` lexes as `MINUS IDENT(foo)`.
pub fn lex(input: &str) -> GhnResult<Vec<Token>> {
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0usize;
    let mut tokens = Vec::new();

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        match c {
            ':' => {
                tokens.push(Token::new(TokenKind::Colon));
                i += 1;
            }
            ',' => {
                tokens.push(Token::new(TokenKind::Comma));
                i += 1;
            }
            '(' => {
                tokens.push(Token::new(TokenKind::LParen));
                i += 1;
            }
            ')' => {
                tokens.push(Token::new(TokenKind::RParen));
                i += 1;
            }
            '-' => {
                tokens.push(Token::new(TokenKind::Minus));
                i += 1;
            }
            '"' => {
                let start = i + 1;
                let mut j = start;
                let mut closed = false;
                while j < chars.len() {
                    if chars[j] == '"' {
                        closed = true;
                        break;
                    }
                    j += 1;
                }
                if !closed {
                    return Err(GhnError::UnterminatedString);
                }
                let literal: String = chars[start..j].iter().collect();
                tokens.push(Token::new(TokenKind::String(literal)));
                i = j + 1;
            }
            _ => {
                let start = i;
                let mut j = i;
                while j < chars.len() && !is_boundary(chars[j]) {
                    j += 1;
                }
                let word: String = chars[start..j].iter().collect();
                i = j;
                tokens.push(Token::new(classify_word(word)));
            }
        }
    }

    tokens.push(Token::new(TokenKind::Eof));
    Ok(tokens)
}

fn classify_word(word: String) -> TokenKind {
    match word.to_ascii_uppercase().as_str() {
        "AND" => TokenKind::And,
        "OR" => TokenKind::Or,
        "NOT" => TokenKind::Not,
        _ => TokenKind::Ident(word),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        lex(input).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_field_value() {
        assert_eq!(
            kinds("repo:cli/cli"),
            vec![
                TokenKind::Ident("repo".into()),
                TokenKind::Colon,
                TokenKind::Ident("cli/cli".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lexes_comma_list() {
        assert_eq!(
            kinds("repo:cli,go"),
            vec![
                TokenKind::Ident("repo".into()),
                TokenKind::Colon,
                TokenKind::Ident("cli".into()),
                TokenKind::Comma,
                TokenKind::Ident("go".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lexes_quoted_string_with_spaces_and_colon() {
        assert_eq!(
            kinds(r#"subject:"fix: the bug""#),
            vec![
                TokenKind::Ident("subject".into()),
                TokenKind::Colon,
                TokenKind::String("fix: the bug".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn recognizes_boolean_keywords_case_insensitively() {
        assert_eq!(
            kinds("a and b OR not c"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::And,
                TokenKind::Ident("b".into()),
                TokenKind::Or,
                TokenKind::Not,
                TokenKind::Ident("c".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn minus_prefix_lexes_as_minus_then_ident() {
        assert_eq!(
            kinds("-is:read"),
            vec![
                TokenKind::Minus,
                TokenKind::Ident("is".into()),
                TokenKind::Colon,
                TokenKind::Ident("read".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn unterminated_string_is_an_error() {
        assert!(matches!(lex(r#"subject:"oops"#), Err(GhnError::UnterminatedString)));
    }

    #[test]
    fn empty_input_lexes_to_eof_only() {
        assert_eq!(kinds(""), vec![TokenKind::Eof]);
        assert_eq!(kinds("   "), vec![TokenKind::Eof]);
    }
}
