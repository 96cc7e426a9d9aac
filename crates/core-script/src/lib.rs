//! A small embedded language for `!p` snippet code.
//!
//! ```text
//! snip.rv = "first line"
//! snip >> 1
//! snip += "indented line"
//! if t[1] == "" { snip.rv = snip.opt("g:default") or "none" }
//! ```
//!
//! The same expression grammar backs `!v` editor expressions, where host
//! functions such as `indent(".")` come from [`Bindings::call`].

pub mod ast;
pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod token;
pub mod value;

pub use ast::{Expr, Program, Stmt};
pub use error::{Result, ScriptError};
pub use interpreter::{Bindings, Snip, evaluate, run};
pub use parser::{parse_expression, parse_program};
pub use value::{Locals, Value};
