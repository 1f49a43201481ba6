//! # Formats Module
//!
//! Readers for on-disk module metadata.
//!
//! Parsing is a pure transformation from text or bytes; file access lives in
//! `source.rs`.

mod manifest;

pub use manifest::*;
