//! The Gmail-style boolean query language: lexer, parser, validator, SQL
//! builder, in-memory evaluator, and action-hint predictor (§4.1-§4.6).

pub mod ast;
pub mod evaluator;
pub mod lexer;
pub mod parser;
pub mod predictor;
pub mod sql_builder;
pub mod token;
pub mod validator;

pub use ast::{Ast, Expr};
pub use evaluator::{Evaluator, MatchContext};
pub use predictor::{ActionHintPredictor, ActionHints};
pub use sql_builder::{build, BuiltQuery, SqlArg};

use crate::error::GhnResult;

/// Parse then validate in one call — the order §4.3 requires ("Validation
/// runs before SQL build; the builder trusts its input").
pub fn parse_and_validate(query: &str) -> GhnResult<Ast> {
    let ast = parser::parse(query)?;
    validator::validate(&ast)?;
    Ok(ast)
}
