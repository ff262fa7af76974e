//! Core data models for the quote board.
//!
//! A quote is persisted as a standalone JSON document via `serde`; it has no
//! relational shape.

pub mod quote;
