//! # convene
//!
//! Library half of the Convene binary: CLI definitions, command
//! implementations and `convene.toml` handling. `main.rs` only installs
//! logging and calls [`cli::execute`].

pub mod cli;
pub mod config;
