//! Hand-rolled pattern engine: parser, AST, generator and matcher.
//!
//! Used for `pattern` string validation and for synthesizing strings that
//! satisfy a pattern.

mod ast;
mod generator;
mod matcher;
mod parser;

pub use ast::{Regexp, UNBOUNDED};
pub use generator::{UNBOUNDED_REPETITION_CAP, generate};
pub use matcher::is_match;
pub use parser::{PatternError, parse};
