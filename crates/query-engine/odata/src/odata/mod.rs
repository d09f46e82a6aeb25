//! Query plan AST, `$filter` rendering and request URL encoding.

pub mod ast;
pub mod convert;
pub mod helpers;
pub mod string;
pub mod url;
