use crate::error::{GhnError, GhnResult};

use super::ast::{Ast, Expr};

const KNOWN_FIELDS: &[&str] = &[
    "in",
    "is",
    "repo",
    "repository",
    "org",
    "reason",
    "type",
    "subject_type",
    "author",
    "state",
    "merged",
    "state_reason",
    "read",
    "archived",
    "muted",
    "snoozed",
    "filtered",
    "tags",
];

const IN_VALUES: &[&str] = &["inbox", "archive", "snoozed", "filtered", "anywhere"];
const IS_VALUES: &[&str] = &[
    "unread", "read", "archived", "muted", "snoozed", "starred", "filtered",
];
const BOOLEAN_FIELDS: &[&str] = &["read", "archived", "muted", "snoozed", "filtered"];
const TRUE_VALUES: &[&str] = &["true", "yes", "1"];
const FALSE_VALUES: &[&str] = &["false", "no", "0"];

/// Validate an AST against the closed schema in §4.3. Must run before SQL
/// build — the builder trusts its input.
pub fn validate(ast: &Ast) -> GhnResult<()> {
    if let Some(expr) = ast {
        validate_expr(expr)?;
    }
    Ok(())
}

fn validate_expr(expr: &Expr) -> GhnResult<()> {
    match expr {
        Expr::And(l, r) | Expr::Or(l, r) => {
            validate_expr(l)?;
            validate_expr(r)
        }
        Expr::Not(inner) => validate_expr(inner),
        Expr::FreeText(_) => Ok(()),
        Expr::Field { name, values } => validate_field(name, values),
    }
}

fn validate_field(name: &str, values: &[String]) -> GhnResult<()> {
    let lower = name.to_ascii_lowercase();
    if !KNOWN_FIELDS.contains(&lower.as_str()) {
        return Err(GhnError::UnknownField(name.to_string()));
    }

    if lower == "tags" && values.iter().all(|v| v.trim().is_empty()) {
        return Err(GhnError::TagsRequiresValue);
    }

    for value in values {
        let lv = value.to_ascii_lowercase();
        match lower.as_str() {
            "in" if !IN_VALUES.contains(&lv.as_str()) => {
                return Err(GhnError::InvalidOperatorValue(format!("in:{value}")));
            }
            "is" if !IS_VALUES.contains(&lv.as_str()) => {
                return Err(GhnError::InvalidOperatorValue(format!("is:{value}")));
            }
            "merged" if !is_bool(&lv) && lv != "merged" && lv != "unmerged" => {
                return Err(GhnError::InvalidOperatorValue(format!("merged:{value}")));
            }
            f if BOOLEAN_FIELDS.contains(&f) && !is_bool(&lv) => {
                return Err(GhnError::InvalidOperatorValue(format!("{f}:{value}")));
            }
            _ => {}
        }
    }

    Ok(())
}

fn is_bool(value: &str) -> bool {
    TRUE_VALUES.contains(&value) || FALSE_VALUES.contains(&value)
}

pub fn parse_bool(value: &str) -> bool {
    TRUE_VALUES.contains(&value.to_ascii_lowercase().as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parser::parse;

    #[test]
    fn unknown_field_is_rejected() {
        let ast = parse("bogus:1").unwrap();
        assert!(matches!(validate(&ast), Err(GhnError::UnknownField(_))));
    }

    #[test]
    fn in_accepts_only_closed_set() {
        assert!(validate(&parse("in:inbox").unwrap()).is_ok());
        assert!(matches!(
            validate(&parse("in:bogus").unwrap()),
            Err(GhnError::InvalidOperatorValue(_))
        ));
    }

    #[test]
    fn boolean_fields_accept_synonyms() {
        for v in ["true", "yes", "1", "false", "no", "0"] {
            assert!(validate(&parse(&format!("read:{v}")).unwrap()).is_ok());
        }
        assert!(matches!(
            validate(&parse("read:maybe").unwrap()),
            Err(GhnError::InvalidOperatorValue(_))
        ));
    }

    #[test]
    fn merged_accepts_boolean_and_merged_unmerged() {
        assert!(validate(&parse("merged:true").unwrap()).is_ok());
        assert!(validate(&parse("merged:merged").unwrap()).is_ok());
        assert!(validate(&parse("merged:unmerged").unwrap()).is_ok());
        assert!(matches!(
            validate(&parse("merged:sort-of").unwrap()),
            Err(GhnError::InvalidOperatorValue(_))
        ));
    }

    #[test]
    fn tags_requires_a_nonempty_value() {
        assert!(matches!(
            validate(&parse(r#"tags:"""#).unwrap()),
            Err(GhnError::TagsRequiresValue)
        ));
    }

    #[test]
    fn free_value_fields_accept_anything_nonempty() {
        assert!(validate(&parse("author:octocat").unwrap()).is_ok());
        assert!(validate(&parse("repo:cli/cli").unwrap()).is_ok());
    }

    #[test]
    fn empty_query_is_valid() {
        assert!(validate(&None).is_ok());
    }
}
