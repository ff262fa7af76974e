//! Shared application state handed to every handler.

use crate::{
    config::AppConfig,
    services::{
        probe::CodecProbe, quote_store::QuoteStore, render::Renderer, session::SessionStore,
        upload_gate::UploadGate,
    },
};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: QuoteStore,
    pub renderer: Renderer,
    pub gate: UploadGate,
    pub sessions: SessionStore,
}

impl AppState {
    /// Wire every component from one configuration. The probe is injected so
    /// tests can avoid spawning `ffprobe`.
    pub fn new(config: AppConfig, probe: Arc<dyn CodecProbe>) -> Self {
        let store = QuoteStore::new(config.quotes_dir.clone());
        let renderer = Renderer::new(
            config.website_name.clone(),
            config.website_domain.clone(),
            config.videos_dir.clone(),
        );
        let gate = UploadGate::new(config.videos_dir.clone(), probe, config.probe_timeout);
        let sessions = SessionStore::new(config.session_idle_timeout);

        Self {
            config: Arc::new(config),
            store,
            renderer,
            gate,
            sessions,
        }
    }
}
