//! quotedb: a small self-hosted board of attributed quotes, optionally with
//! an embedded video clip.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod views;
