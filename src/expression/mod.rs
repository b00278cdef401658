//! The expression language typed into function slots: tokens, syntax tree,
//! parser and evaluator.

pub mod ast;
pub mod eval;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod token;

pub use ast::{BinaryOp, Comparison, Expr, Predicate, UnaryOp};
pub use eval::{evaluate, Outcome, Undefined};
pub use functions::Function;
pub use lexer::tokenize;
pub use parser::parse;
