//! docqa-core
//!
//! Shared domain types, errors, configuration, the document source and the
//! multi-granularity chunker used by the lexical, semantic and hybrid crates.

#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod chunker;
pub mod config;
pub mod document;
pub mod error;
pub mod events;
pub mod traits;
pub mod types;
