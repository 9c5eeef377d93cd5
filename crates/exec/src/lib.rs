//! External process execution for pakt
//!
//! This crate runs installers and scripts under controlled conditions:
//! output streamed line-by-line to caller handlers, a hard timeout that
//! takes the whole process group down, an optional widened executable
//! search path, and optional privilege elevation. Lifecycle events are
//! published on the event bus around every run so auditors observe every
//! external process this system starts without coupling to this crate.
//!
//! A process that starts and fails is a result, not an error: only
//! "could not be started at all" (missing executable, refused elevation)
//! propagates as an error, because the orchestrator must handle a
//! configuration problem differently from a failed installer.

mod engine;
mod request;

pub use engine::ExecutionEngine;
pub use request::{ExecutionRequest, LineHandler};
