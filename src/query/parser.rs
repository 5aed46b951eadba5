use crate::error::{GhnError, GhnResult};

use super::ast::{Ast, Expr};
use super::lexer::lex;
use super::token::{Token, TokenKind};

/// Right-recursive descent parser implementing the grammar in §4.2:
///
/// ```text
/// query     := orExpr EOF
/// orExpr    := andExpr ( OR andExpr )*
/// andExpr   := notExpr ( (AND | ε) notExpr )*      // ε = whitespace-implicit AND
/// notExpr   := (NOT | MINUS) notExpr | atom
/// atom      := LPAREN orExpr RPAREN
///            | IDENT COLON valueList
///            | STRING
///            | IDENT
/// valueList := value ( COMMA value )*
/// value     := IDENT | STRING
/// ```
pub fn parse(input: &str) -> GhnResult<Ast> {
    let tokens = lex(input)?;
    if tokens.len() == 1 && tokens[0].kind == TokenKind::Eof {
        return Ok(None);
    }

    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.or_expr()?;
    parser.expect(&TokenKind::Eof)?;
    Ok(Some(expr))
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    fn advance(&mut self) -> TokenKind {
        let kind = self.tokens[self.pos].kind.clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        kind
    }

    fn expect(&mut self, kind: &TokenKind) -> GhnResult<()> {
        if self.peek() == kind {
            self.advance();
            Ok(())
        } else {
            Err(GhnError::Syntax(format!(
                "expected {kind:?}, found {:?}",
                self.peek()
            )))
        }
    }

    fn starts_atom(kind: &TokenKind) -> bool {
        matches!(
            kind,
            TokenKind::LParen
                | TokenKind::Ident(_)
                | TokenKind::String(_)
                | TokenKind::Not
                | TokenKind::Minus
        )
    }

    fn or_expr(&mut self) -> GhnResult<Expr> {
        let mut left = self.and_expr()?;
        while self.peek() == &TokenKind::Or {
            self.advance();
            let right = self.and_expr()?;
            left = Expr::or(left, right);
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> GhnResult<Expr> {
        let mut left = self.not_expr()?;
        loop {
            if self.peek() == &TokenKind::And {
                self.advance();
                let right = self.not_expr()?;
                left = Expr::and(left, right);
            } else if Self::starts_atom(self.peek()) {
                let right = self.not_expr()?;
                left = Expr::and(left, right);
            } else {
                break;
            }
        }
        Ok(left)
    }

    fn not_expr(&mut self) -> GhnResult<Expr> {
        match self.peek() {
            TokenKind::Not | TokenKind::Minus => {
                self.advance();
                let inner = self.not_expr()?;
                Ok(Expr::not(inner))
            }
            _ => self.atom(),
        }
    }

    fn atom(&mut self) -> GhnResult<Expr> {
        match self.peek().clone() {
            TokenKind::LParen => {
                self.advance();
                let inner = self.or_expr()?;
                self.expect(&TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::String(s) => {
                self.advance();
                Ok(Expr::FreeText(s))
            }
            TokenKind::Ident(name) => {
                self.advance();
                if self.peek() == &TokenKind::Colon {
                    self.advance();
                    let values = self.value_list()?;
                    Ok(Expr::Field { name, values })
                } else {
                    Ok(Expr::FreeText(name))
                }
            }
            other => Err(GhnError::Syntax(format!(
                "unexpected token {other:?}"
            ))),
        }
    }

    fn value_list(&mut self) -> GhnResult<Vec<String>> {
        let mut values = vec![self.value()?];
        while self.peek() == &TokenKind::Comma {
            self.advance();
            values.push(self.value()?);
        }
        Ok(values)
    }

    fn value(&mut self) -> GhnResult<String> {
        match self.peek().clone() {
            TokenKind::Ident(s) => {
                self.advance();
                Ok(s)
            }
            TokenKind::String(s) => {
                self.advance();
                Ok(s)
            }
            other => Err(GhnError::Syntax(format!(
                "expected a value, found {other:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_query_parses_to_none() {
        assert_eq!(parse("").unwrap(), None);
        assert_eq!(parse("   ").unwrap(), None);
    }

    #[test]
    fn parses_single_field() {
        assert_eq!(
            parse("repo:cli/cli").unwrap(),
            Some(Expr::Field {
                name: "repo".into(),
                values: vec!["cli/cli".into()]
            })
        );
    }

    #[test]
    fn comma_list_stays_flat() {
        assert_eq!(
            parse("repo:cli,go").unwrap(),
            Some(Expr::Field {
                name: "repo".into(),
                values: vec!["cli".into(), "go".into()]
            })
        );
    }

    #[test]
    fn implicit_and_between_atoms() {
        assert_eq!(
            parse("is:unread archived:false").unwrap(),
            Some(Expr::and(
                Expr::Field {
                    name: "is".into(),
                    values: vec!["unread".into()]
                },
                Expr::Field {
                    name: "archived".into(),
                    values: vec!["false".into()]
                }
            ))
        );
    }

    #[test]
    fn and_binds_tighter_than_or() {
        // a AND b OR c  ==  (a AND b) OR c
        assert_eq!(
            parse("a b OR c").unwrap(),
            Some(Expr::or(
                Expr::and(Expr::FreeText("a".into()), Expr::FreeText("b".into())),
                Expr::FreeText("c".into())
            ))
        );
    }

    #[test]
    fn not_binds_tighter_than_and() {
        assert_eq!(
            parse("NOT a b").unwrap(),
            Some(Expr::and(
                Expr::not(Expr::FreeText("a".into())),
                Expr::FreeText("b".into())
            ))
        );
    }

    #[test]
    fn parens_override_precedence() {
        assert_eq!(
            parse("a (b OR c)").unwrap(),
            Some(Expr::and(
                Expr::FreeText("a".into()),
                Expr::or(Expr::FreeText("b".into()), Expr::FreeText("c".into()))
            ))
        );
    }

    #[test]
    fn double_negation_is_preserved_not_collapsed() {
        assert_eq!(
            parse("NOT NOT a").unwrap(),
            Some(Expr::not(Expr::not(Expr::FreeText("a".into()))))
        );
    }

    #[test]
    fn unbalanced_parens_is_a_syntax_error() {
        assert!(matches!(parse("(a AND b"), Err(GhnError::Syntax(_))));
        assert!(matches!(parse("a)"), Err(GhnError::Syntax(_))));
    }

    #[test]
    fn empty_value_list_is_a_syntax_error() {
        assert!(matches!(parse("repo:"), Err(GhnError::Syntax(_))));
        assert!(matches!(parse("repo:,go"), Err(GhnError::Syntax(_))));
    }

    #[test]
    fn quoted_string_is_free_text() {
        assert_eq!(
            parse(r#""fix: the bug""#).unwrap(),
            Some(Expr::FreeText("fix: the bug".into()))
        );
    }
}
