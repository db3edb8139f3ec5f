//! Script bridge
//!
//! Runs an external script as a subprocess, hands it a JSON request on stdin
//! and turns its exit status and stdout into a single JSON outcome.

mod interpreter;
mod invocation;

pub use interpreter::{default_interpreter_name, Interpreter};
pub use invocation::{invoke, Invocation, Termination};
