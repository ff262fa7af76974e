//! HTTP handlers, grouped by the part of the site they serve.

pub mod health_handlers;
pub mod quote_handlers;
pub mod static_handlers;
pub mod video_handlers;
