use anyhow::{Context, Result};
use quotedb::{config::AppConfig, routes, services::probe::FfprobeProbe, state::AppState};
use std::{io::ErrorKind, path::Path, sync::Arc};
use tokio::{fs, net::TcpListener};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("quotedb=info,tower_http=info")),
        )
        .init();

    // --- Parse config ---
    let cfg = AppConfig::from_env_and_args()?;

    tracing::info!("Starting quotedb with config: {:?}", cfg);

    // --- Ensure data directories exist ---
    ensure_dir(&cfg.quotes_dir).await?;
    ensure_dir(&cfg.videos_dir).await?;

    // --- Initialize state ---
    let probe = Arc::new(FfprobeProbe::new(cfg.ffprobe_path.clone()));
    let state = AppState::new(cfg.clone(), probe);

    // --- Build router ---
    let app = routes::routes::routes(state);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn ensure_dir(path: &Path) -> Result<()> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        fs::create_dir_all(path)
            .await
            .with_context(|| format!("creating directory {}", path.display()))?;
        tracing::info!("Created directory at {}", path.display());
    }
    Ok(())
}
