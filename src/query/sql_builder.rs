use regex::Regex;

use super::ast::{Ast, Expr};

/// A bound SQL argument. Kept as an enum here (rather than e.g.
/// `sqlx::postgres::PgArguments`) because the root crate does not depend on
/// `sqlx` — the `ghn-api` crate's store converts these into real bind
/// values when it executes a `BuiltQuery`.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlArg {
    Text(String),
    Bool(bool),
}

/// The output of walking an AST for SQL generation (§4.4): a set of
/// required JOINs (deduplicated by canonical text), a WHERE fragment with
/// `$1`, `$2`, ... placeholders, and the argument list in positional
/// order. `limit`/`offset`/`include_subject_raw` are caller-provided, not
/// derived from the query.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    pub joins: Vec<String>,
    pub where_sql: Option<String>,
    pub args: Vec<SqlArg>,
    pub limit: i64,
    pub offset: i64,
    pub include_subject_raw: bool,
}

const REPO_JOIN: &str = "LEFT JOIN repositories r ON r.id = n.repository_id";

impl BuiltQuery {
    /// Columns always selected, in contract order; `subject_raw` is
    /// appended last and only when requested (§4.4 "Result shape").
    pub fn select_columns(&self) -> Vec<&'static str> {
        let mut cols = vec![
            "n.id",
            "n.github_id",
            "n.repository_id",
            "n.pull_request_id",
            "n.subject_type",
            "n.subject_title",
            "n.subject_url",
            "n.subject_number",
            "n.subject_state",
            "n.subject_merged",
            "n.subject_state_reason",
            "n.author_login",
            "n.author_id",
            "n.reason",
            "n.github_unread",
            "n.github_updated_at",
            "n.github_last_read_at",
            "n.is_read",
            "n.archived",
            "n.muted",
            "n.starred",
            "n.filtered",
            "n.snoozed_until",
            "n.snoozed_at",
            "n.tag_ids",
            "n.imported_at",
            "n.effective_sort_date",
        ];
        if self.include_subject_raw {
            cols.push("n.subject_raw");
        }
        cols
    }

    pub fn list_sql(&self) -> String {
        let mut sql = format!(
            "SELECT {} FROM notifications n",
            self.select_columns().join(", ")
        );
        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join);
        }
        if let Some(where_sql) = &self.where_sql {
            sql.push_str(" WHERE ");
            sql.push_str(where_sql);
        }
        sql.push_str(" ORDER BY n.effective_sort_date DESC NULLS LAST, n.imported_at DESC");
        sql.push_str(&format!(" LIMIT {} OFFSET {}", self.limit, self.offset));
        sql
    }

    pub fn count_sql(&self) -> String {
        let mut sql = "SELECT COUNT(*) FROM notifications n".to_string();
        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join);
        }
        if let Some(where_sql) = &self.where_sql {
            sql.push_str(" WHERE ");
            sql.push_str(where_sql);
        }
        sql
    }

    /// Re-number `$N` placeholders in this query's WHERE fragment so it can
    /// be embedded into an enclosing statement whose own placeholders start
    /// at 1..=`offset`. Used by bulk-by-query updates, which bind the new
    /// value first and embed this query's SELECT afterwards (§4.4).
    pub fn renumbered_where(&self, offset: usize) -> Option<String> {
        let where_sql = self.where_sql.as_ref()?;
        let re = Regex::new(r"\$(\d+)").expect("static regex");
        Some(
            re.replace_all(where_sql, |caps: &regex::Captures| {
                let n: usize = caps[1].parse().expect("digits only");
                format!("${}", n + offset)
            })
            .into_owned(),
        )
    }
}

struct Builder {
    joins: Vec<String>,
    args: Vec<SqlArg>,
    next_placeholder: usize,
}

impl Builder {
    fn new(start_placeholder: usize) -> Self {
        Builder {
            joins: Vec::new(),
            args: Vec::new(),
            next_placeholder: start_placeholder,
        }
    }

    fn add_join(&mut self, join: &str) {
        if !self.joins.iter().any(|j| j == join) {
            self.joins.push(join.to_string());
        }
    }

    fn push_arg(&mut self, arg: SqlArg) -> String {
        let placeholder = format!("${}", self.next_placeholder);
        self.next_placeholder += 1;
        self.args.push(arg);
        placeholder
    }

    fn build(&mut self, expr: &Expr) -> String {
        match expr {
            Expr::And(l, r) => format!("({} AND {})", self.build(l), self.build(r)),
            Expr::Or(l, r) => format!("({} OR {})", self.build(l), self.build(r)),
            Expr::Not(inner) => format!("NOT ({})", self.build(inner)),
            Expr::FreeText(text) => self.build_free_text(text),
            Expr::Field { name, values } => self.build_field(name, values),
        }
    }

    fn like_arg(&mut self, value: &str) -> String {
        self.push_arg(SqlArg::Text(format!("%{value}%")))
    }

    fn build_free_text(&mut self, text: &str) -> String {
        let columns = [
            "n.subject_title",
            "n.subject_type",
            "r.full_name",
            "n.author_login",
            "n.subject_state",
            "n.subject_number::text",
        ];
        self.add_join(REPO_JOIN);
        let fragments: Vec<String> = columns
            .iter()
            .map(|col| {
                let placeholder = self.like_arg(text);
                format!("{col} ILIKE {placeholder}")
            })
            .collect();
        format!("({})", fragments.join(" OR "))
    }

    fn build_field(&mut self, name: &str, values: &[String]) -> String {
        let lower = name.to_ascii_lowercase();
        let fragments: Vec<String> = values
            .iter()
            .map(|value| self.build_single(&lower, value))
            .collect();
        if fragments.len() == 1 {
            fragments.into_iter().next().unwrap()
        } else {
            format!("({})", fragments.join(" OR "))
        }
    }

    fn build_single(&mut self, field: &str, value: &str) -> String {
        match field {
            "repo" | "repository" => {
                self.add_join(REPO_JOIN);
                let p = self.like_arg(value);
                format!("r.full_name ILIKE {p}")
            }
            "org" => {
                self.add_join(REPO_JOIN);
                let p = self.push_arg(SqlArg::Text(format!("{value}/%")));
                format!("r.full_name ILIKE {p}")
            }
            "reason" => {
                let p = self.like_arg(value);
                format!("n.reason ILIKE {p}")
            }
            "type" | "subject_type" => {
                let p = self.like_arg(value);
                format!("n.subject_type ILIKE {p}")
            }
            "author" => {
                let p = self.like_arg(value);
                format!("n.author_login ILIKE {p}")
            }
            "state_reason" => {
                let p = self.like_arg(value);
                format!("n.subject_state_reason ILIKE {p}")
            }
            "state" => {
                let p = self.push_arg(SqlArg::Text(value.to_string()));
                format!("n.subject_state = {p}")
            }
            "merged" => {
                let (bool_value, invert) = match value.to_ascii_lowercase().as_str() {
                    "merged" => (true, false),
                    "unmerged" => (true, true),
                    v => (super::validator::parse_bool(v), false),
                };
                let p = self.push_arg(SqlArg::Bool(bool_value));
                if invert {
                    format!("n.subject_merged != {p}")
                } else {
                    format!("n.subject_merged = {p}")
                }
            }
            "read" => self.bool_column_eq("n.is_read", value),
            "archived" => self.bool_column_eq("n.archived", value),
            "muted" => self.bool_column_eq("n.muted", value),
            "filtered" => self.bool_column_eq("n.filtered", value),
            "snoozed" => {
                if super::validator::parse_bool(value) {
                    "(n.snoozed_until IS NOT NULL AND n.snoozed_until > NOW())".to_string()
                } else {
                    "(n.snoozed_until IS NULL OR n.snoozed_until <= NOW())".to_string()
                }
            }
            "is" => self.build_is(value),
            "in" => self.build_in(value),
            "tags" => {
                let p = self.like_arg(value);
                format!(
                    "n.tag_ids && ARRAY(SELECT id FROM tags WHERE slug ILIKE {p})"
                )
            }
            _ => "TRUE".to_string(),
        }
    }

    fn bool_column_eq(&mut self, column: &str, value: &str) -> String {
        if super::validator::parse_bool(value) {
            format!("{column} = TRUE")
        } else {
            format!("{column} = FALSE")
        }
    }

    fn build_is(&mut self, value: &str) -> String {
        match value.to_ascii_lowercase().as_str() {
            "unread" => "n.is_read = FALSE".to_string(),
            "read" => "n.is_read = TRUE".to_string(),
            "archived" => "n.archived = TRUE".to_string(),
            "muted" => "n.muted = TRUE".to_string(),
            "snoozed" => "(n.snoozed_until IS NOT NULL AND n.snoozed_until > NOW())".to_string(),
            "starred" => "n.starred = TRUE".to_string(),
            "filtered" => "n.filtered = TRUE".to_string(),
            _ => "TRUE".to_string(),
        }
    }

    fn build_in(&mut self, value: &str) -> String {
        match value.to_ascii_lowercase().as_str() {
            "inbox" => "(n.archived = FALSE AND (n.snoozed_until IS NULL OR n.snoozed_until <= NOW()) AND n.muted = FALSE AND n.filtered = FALSE)".to_string(),
            "archive" => "(n.archived = TRUE AND n.muted = FALSE)".to_string(),
            "snoozed" => "(n.snoozed_until > NOW() AND n.archived = FALSE AND n.muted = FALSE)".to_string(),
            "filtered" => "n.filtered = TRUE".to_string(),
            "anywhere" => "TRUE".to_string(),
            _ => "TRUE".to_string(),
        }
    }
}

/// Build a `BuiltQuery` from an already-validated AST. `start_placeholder`
/// lets a caller reserve lower-numbered placeholders for values it will
/// bind itself (bulk-by-query updates bind the new value at `$1` first).
pub fn build(ast: &Ast, start_placeholder: usize, limit: i64, offset: i64, include_subject_raw: bool) -> BuiltQuery {
    let mut builder = Builder::new(start_placeholder);
    let where_sql = ast.as_ref().map(|expr| builder.build(expr));
    BuiltQuery {
        joins: builder.joins,
        where_sql,
        args: builder.args,
        limit,
        offset,
        include_subject_raw,
    }
}

/// §4.7 inbox defaults: appended when and only when the parsed query
/// contains no `in:` term.
pub fn query_has_in_term(ast: &Ast) -> bool {
    fn walk(expr: &Expr) -> bool {
        match expr {
            Expr::And(l, r) | Expr::Or(l, r) => walk(l) || walk(r),
            Expr::Not(inner) => walk(inner),
            Expr::FreeText(_) => false,
            Expr::Field { name, .. } => name.eq_ignore_ascii_case("in"),
        }
    }
    ast.as_ref().map(walk).unwrap_or(false)
}

pub fn apply_inbox_defaults(built: &mut BuiltQuery) {
    let defaults = "(n.archived = FALSE AND (n.snoozed_until IS NULL OR n.snoozed_until <= NOW()) AND n.muted = FALSE AND n.filtered = FALSE)";
    merge_and(built, defaults);
}

/// §4.7 muted-only exclusion: added regardless of the query's `in:` term.
pub fn exclude_muted(built: &mut BuiltQuery) {
    merge_and(built, "n.muted = FALSE");
}

fn merge_and(built: &mut BuiltQuery, extra: &str) {
    built.where_sql = Some(match built.where_sql.take() {
        Some(existing) => format!("({existing} AND {extra})"),
        None => extra.to_string(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parser::parse;

    fn built(query: &str) -> BuiltQuery {
        let ast = parse(query).unwrap();
        build(&ast, 1, 50, 0, false)
    }

    #[test]
    fn empty_query_has_no_where_or_joins() {
        let b = built("");
        assert!(b.where_sql.is_none());
        assert!(b.joins.is_empty());
    }

    #[test]
    fn repo_field_adds_join_and_ilike() {
        let b = built("repo:cli/cli");
        assert_eq!(b.joins, vec![REPO_JOIN.to_string()]);
        assert_eq!(b.where_sql.as_deref(), Some("r.full_name ILIKE $1"));
        assert_eq!(b.args, vec![SqlArg::Text("%cli/cli%".into())]);
    }

    #[test]
    fn comma_list_renders_single_flat_or() {
        let b = built("repo:cli,go");
        assert_eq!(
            b.where_sql.as_deref(),
            Some("(r.full_name ILIKE $1 OR r.full_name ILIKE $2)")
        );
    }

    #[test]
    fn join_is_deduplicated_across_multiple_repo_like_fields() {
        let b = built("repo:cli org:go");
        assert_eq!(b.joins, vec![REPO_JOIN.to_string()]);
    }

    #[test]
    fn and_or_not_always_parenthesize_non_leaf_expressions() {
        let b = built("read:true AND NOT muted:true");
        assert_eq!(
            b.where_sql.as_deref(),
            Some("(n.is_read = TRUE AND NOT (n.muted = TRUE))")
        );
    }

    #[test]
    fn placeholders_are_numbered_from_start() {
        let ast = parse("repo:cli org:go").unwrap();
        let b = build(&ast, 2, 50, 0, false);
        assert_eq!(
            b.where_sql.as_deref(),
            Some("(r.full_name ILIKE $2 AND r.full_name ILIKE $3)")
        );
    }

    #[test]
    fn renumbered_where_shifts_all_placeholders() {
        let b = built("repo:cli,go");
        let shifted = b.renumbered_where(1).unwrap();
        assert_eq!(shifted, "(r.full_name ILIKE $2 OR r.full_name ILIKE $3)");
    }

    #[test]
    fn count_sql_drops_order_and_limit() {
        let b = built("repo:cli");
        assert!(!b.count_sql().contains("ORDER BY"));
        assert!(!b.count_sql().contains("LIMIT"));
        assert!(b.list_sql().contains("ORDER BY"));
        assert!(b.list_sql().contains("LIMIT 50 OFFSET 0"));
    }

    #[test]
    fn subject_raw_is_only_selected_when_requested() {
        let ast = parse("").unwrap();
        let without = build(&ast, 1, 50, 0, false);
        let with = build(&ast, 1, 50, 0, true);
        assert!(!without.select_columns().contains(&"n.subject_raw"));
        assert!(with.select_columns().contains(&"n.subject_raw"));
    }

    #[test]
    fn inbox_default_applied_only_without_in_term() {
        let ast_no_in = parse("author:octocat").unwrap();
        assert!(!query_has_in_term(&ast_no_in));

        let ast_with_in = parse("in:archive").unwrap();
        assert!(query_has_in_term(&ast_with_in));
    }
}
