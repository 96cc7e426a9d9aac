//! Snippet expansion engine.
//!
//! [`Engine`] turns a trigger before the cursor into a live snippet
//! instance inside a [`Host`] buffer, then keeps that instance consistent
//! while the user jumps between tabstops and edits them: mirrors copy their
//! tabstop, transformations rewrite it, and code fragments re-run when the
//! tabstops they read change. [`Session`] drives an engine over an
//! in-memory buffer from key notation and backs both the binary and the
//! integration tests.

pub mod engine;
pub mod error;
pub mod host;
pub mod indent;
pub mod instance;
pub mod interp;
mod propagate;
pub mod session;

pub use engine::{Engine, ExpandOutcome};
pub use error::ExpandError;
pub use host::Host;
pub use indent::IndentNormalizer;
pub use interp::{
    CodeEnv, EditorExprInterpreter, EvalContext, InterpError, Interpreter, ScriptInterpreter,
    ShellInterpreter,
};
pub use session::{BufferHost, Session};
