/// A query AST node. Each node owns its children exclusively: there are no
/// back-references and no cycles, so evaluation and SQL building are both
/// plain read-only traversals (§9 "Ownership of the AST").
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    /// `field:v1,v2,...` — a comma list is an implicit OR over one field,
    /// kept flat (not expanded into a binary tree) so the SQL builder can
    /// render a single disjunction sharing one set of placeholders (§4.2).
    Field { name: String, values: Vec<String> },
    FreeText(String),
}

impl Expr {
    pub fn and(l: Expr, r: Expr) -> Expr {
        Expr::And(Box::new(l), Box::new(r))
    }

    pub fn or(l: Expr, r: Expr) -> Expr {
        Expr::Or(Box::new(l), Box::new(r))
    }

    pub fn not(e: Expr) -> Expr {
        Expr::Not(Box::new(e))
    }
}

/// A parsed query. `None` represents the empty-query case (§4.4 "Empty
/// input"): no WHERE, no joins, matches everything.
pub type Ast = Option<Expr>;
