//! Grammar and parser for the restricted query language
//!
//! Turns query text into a [`Query`] parse tree over a fixed set of
//! productions. Anything the grammar does not recognize fails here with a
//! position-carrying [`ParseError`]; access control happens later, in the
//! validating tree-walker.

pub mod ast;
pub mod parser;

pub use ast::*;
pub use parser::{parse, parse_condition, ParseError, Rule};
