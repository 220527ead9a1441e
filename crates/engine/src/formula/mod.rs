// Formula parsing and evaluation

pub mod eval;
pub mod parser;
pub mod refs;
