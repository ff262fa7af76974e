use anyhow::{Context, Result};
use clap::Parser;
use std::{env, fmt, path::PathBuf, str::FromStr, time::Duration};

const DEFAULT_MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;
const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 5;
const DEFAULT_SESSION_IDLE_SECS: u64 = 30 * 60;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub quotes_dir: PathBuf,
    pub videos_dir: PathBuf,
    pub password: String,
    pub website_domain: String,
    pub website_name: String,
    pub max_upload_bytes: usize,
    pub probe_timeout: Duration,
    pub ffprobe_path: String,
    pub session_idle_timeout: Duration,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Self-hosted quote board")]
pub struct Args {
    /// Host to bind to (overrides QUOTEDB_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides QUOTEDB_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Where to store the quotes (overrides QUOTEDB_QUOTES_DIR)
    #[arg(short = 'f', long)]
    pub quotes_dir: Option<PathBuf>,

    /// Where to store the videos (overrides QUOTEDB_VIDEOS_DIR)
    #[arg(short = 'v', long)]
    pub videos_dir: Option<PathBuf>,

    /// Shared password for adding quotes and uploading videos (overrides QUOTEDB_PASSWORD)
    #[arg(short = 'p', long)]
    pub password: Option<String>,

    /// Public website domain starting with https (overrides QUOTEDB_DOMAIN)
    #[arg(short = 'd', long = "domain")]
    pub website_domain: Option<String>,

    /// Display name of the website (overrides QUOTEDB_NAME)
    #[arg(short = 'n', long = "name")]
    pub website_name: Option<String>,

    /// Largest accepted request body in bytes (overrides QUOTEDB_MAX_UPLOAD_BYTES)
    #[arg(long)]
    pub max_upload_bytes: Option<usize>,

    /// Seconds before a codec probe is abandoned (overrides QUOTEDB_PROBE_TIMEOUT_SECS)
    #[arg(long)]
    pub probe_timeout_secs: Option<u64>,

    /// ffprobe executable (overrides QUOTEDB_FFPROBE)
    #[arg(long = "ffprobe")]
    pub ffprobe_path: Option<String>,

    /// Seconds of inactivity before a visitor session is dropped (overrides QUOTEDB_SESSION_IDLE_SECS)
    #[arg(long)]
    pub session_idle_secs: Option<u64>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        Self::from_args(Args::parse())
    }

    /// Merge already-parsed CLI args with the environment.
    pub fn from_args(args: Args) -> Result<Self> {
        // --- Environment fallback ---
        let env_host = env::var("QUOTEDB_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = parse_env("QUOTEDB_PORT", 3000u16)?;
        let env_quotes = env::var("QUOTEDB_QUOTES_DIR").unwrap_or_else(|_| "quotes".into());
        let env_videos = env::var("QUOTEDB_VIDEOS_DIR").unwrap_or_else(|_| "videos".into());
        let env_password = env::var("QUOTEDB_PASSWORD").unwrap_or_else(|_| "password".into());
        let env_domain =
            env::var("QUOTEDB_DOMAIN").unwrap_or_else(|_| "https://example.com".into());
        let env_name = env::var("QUOTEDB_NAME").unwrap_or_else(|_| "Quotes".into());
        let env_max_upload = parse_env("QUOTEDB_MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?;
        let env_probe_timeout = parse_env("QUOTEDB_PROBE_TIMEOUT_SECS", DEFAULT_PROBE_TIMEOUT_SECS)?;
        let env_ffprobe = env::var("QUOTEDB_FFPROBE").unwrap_or_else(|_| "ffprobe".into());
        let env_session_idle = parse_env("QUOTEDB_SESSION_IDLE_SECS", DEFAULT_SESSION_IDLE_SECS)?;

        // --- Merge ---
        let domain = args.website_domain.unwrap_or(env_domain);
        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            quotes_dir: args.quotes_dir.unwrap_or_else(|| env_quotes.into()),
            videos_dir: args.videos_dir.unwrap_or_else(|| env_videos.into()),
            password: args.password.unwrap_or(env_password),
            website_domain: domain.trim_end_matches('/').to_string(),
            website_name: args.website_name.unwrap_or(env_name),
            max_upload_bytes: args.max_upload_bytes.unwrap_or(env_max_upload),
            probe_timeout: Duration::from_secs(args.probe_timeout_secs.unwrap_or(env_probe_timeout)),
            ffprobe_path: args.ffprobe_path.unwrap_or(env_ffprobe),
            session_idle_timeout: Duration::from_secs(
                args.session_idle_secs.unwrap_or(env_session_idle),
            ),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// The password never reaches the logs.
impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("quotes_dir", &self.quotes_dir)
            .field("videos_dir", &self.videos_dir)
            .field("password", &"<redacted>")
            .field("website_domain", &self.website_domain)
            .field("website_name", &self.website_name)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("probe_timeout", &self.probe_timeout)
            .field("ffprobe_path", &self.ffprobe_path)
            .field("session_idle_timeout", &self.session_idle_timeout)
            .finish()
    }
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", key, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", key)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flags_override_defaults_and_trim_domain() {
        let args = Args::parse_from([
            "quotedb",
            "-f",
            "/srv/quotes",
            "-v",
            "/srv/videos",
            "-p",
            "hunter2",
            "-d",
            "https://quotes.example.org/",
            "-n",
            "Office Quotes",
            "--port",
            "8080",
            "--session-idle-secs",
            "90",
        ]);
        let cfg = AppConfig::from_args(args).unwrap();

        assert_eq!(cfg.quotes_dir, PathBuf::from("/srv/quotes"));
        assert_eq!(cfg.videos_dir, PathBuf::from("/srv/videos"));
        assert_eq!(cfg.password, "hunter2");
        assert_eq!(cfg.website_domain, "https://quotes.example.org");
        assert_eq!(cfg.website_name, "Office Quotes");
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.session_idle_timeout, Duration::from_secs(90));
    }

    #[test]
    fn debug_output_redacts_password() {
        let args = Args::parse_from(["quotedb", "-p", "topsecret"]);
        let cfg = AppConfig::from_args(args).unwrap();
        let rendered = format!("{:?}", cfg);

        assert!(!rendered.contains("topsecret"));
        assert!(rendered.contains("<redacted>"));
    }
}
