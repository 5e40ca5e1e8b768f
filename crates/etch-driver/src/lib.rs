//! Pipeline glue for the Etch toolchain (spec.md §2 "glue").
//!
//! [`pipeline::run`] wires typecheck → comptime fold → re-typecheck →
//! prove → lower → cache-or-compile → execute into one call over an
//! already-built [`etch_ast::Program`] (lexer/parser surface syntax is out
//! of scope per spec.md §1 — "the core consumes a fully-built AST"). The
//! `etch` binary (`src/main.rs`) drives this against the small built-in
//! program registry in [`demos`], since no parser is wired into this
//! workspace to build a `Program` from real source text.

pub mod config;
pub mod demos;
pub mod error;
pub mod pipeline;

pub use config::{Config, Mode};
pub use error::{DriverError, DriverResult};
pub use pipeline::{run, PipelineOutput};
