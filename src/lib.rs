//! Covenant compiler core.
//!
//! A single-crate compiler front-end for the Covenant contract-oriented
//! language. Source text flows through a strict pipeline of [`lexer`],
//! [`parser`], [`analysis`], and [`codegen`], sharing one diagnostic sink, and
//! comes out as JavaScript target text with optional runtime contract
//! instrumentation. [`compile`] ties the passes together; [`cli`] is the
//! thin command-line collaborator around them.

pub mod analysis;
pub mod arena;
pub mod ast;
pub mod cli;
pub mod codegen;
pub mod compile;
pub mod diagnostics;
pub mod formatter;
pub mod intern;
pub mod lexer;
pub mod options;
pub mod parser;
pub mod style;
pub mod suggest;
pub mod token;
