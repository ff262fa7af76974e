//! Domain services: storage, rendering, upload validation and sessions.

pub mod probe;
pub mod quote_store;
pub mod render;
pub mod session;
pub mod upload_gate;
