//! QuoteStore: one pretty-printed JSON document per quote in a flat directory.
//!
//! Records are named after their creation time (`YYYY-MM-DD_HH-MM-SS.json`,
//! UTC). A second quote landing in the same second gets a `-2`, `-3`, ...
//! suffix instead of replacing the first one. Nothing is cached: every
//! listing re-reads the directory.

use crate::models::quote::Quote;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use thiserror::Error;
use tokio::{
    fs::{self, OpenOptions},
    io::AsyncWriteExt,
};
use tracing::{debug, warn};

/// `chrono` format for record filenames, without the extension.
pub const FILENAME_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";
const RECORD_EXTENSION: &str = "json";
const MAX_NAME_ATTEMPTS: u32 = 1000;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("quote record `{file}` is unreadable: {source}")]
    Parse {
        file: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode quote: {0}")]
    Encode(#[source] serde_json::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Clone, Debug)]
pub struct QuoteStore {
    /// Directory holding one file per quote.
    base_path: PathBuf,
}

impl QuoteStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Read every record and return them newest first.
    ///
    /// A single unparseable record fails the whole listing. Hidden files,
    /// directories and non-`.json` entries are skipped.
    pub async fn list(&self) -> StoreResult<Vec<Quote>> {
        let mut entries = fs::read_dir(&self.base_path).await?;
        let mut quotes = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !is_record_name(&path) || !entry.file_type().await?.is_file() {
                continue;
            }

            let bytes = fs::read(&path).await?;
            let quote = serde_json::from_slice::<Quote>(&bytes).map_err(|source| {
                StoreError::Parse {
                    file: path.display().to_string(),
                    source,
                }
            })?;
            quotes.push(quote);
        }

        quotes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        debug!("listed {} quotes from {}", quotes.len(), self.base_path.display());
        Ok(quotes)
    }

    /// Find a quote by its fingerprint. `None` when nothing matches.
    ///
    /// This is a linear scan over [`QuoteStore::list`].
    pub async fn find(&self, fingerprint: &str) -> StoreResult<Option<Quote>> {
        let quotes = self.list().await?;
        Ok(quotes.into_iter().find(|q| q.fingerprint() == fingerprint))
    }

    /// Persist a quote as a new record and return its path.
    ///
    /// The file is created exclusively; an existing record with the same
    /// timestamp is never overwritten.
    pub async fn save(&self, quote: &Quote) -> StoreResult<PathBuf> {
        let mut body = serde_json::to_vec_pretty(quote).map_err(StoreError::Encode)?;
        body.push(b'\n');

        let stem = quote.created_at.format(FILENAME_FORMAT).to_string();
        for attempt in 1..=MAX_NAME_ATTEMPTS {
            let file_path = self.base_path.join(record_name(&stem, attempt));
            let mut file = match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&file_path)
                .await
            {
                Ok(file) => file,
                Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                    warn!(
                        "quote record {} already exists, trying next name",
                        file_path.display()
                    );
                    continue;
                }
                Err(err) => return Err(StoreError::Io(err)),
            };

            if let Err(err) = write_all_synced(&mut file, &body).await {
                let _ = fs::remove_file(&file_path).await;
                return Err(StoreError::Io(err));
            }

            debug!("saved quote to {}", file_path.display());
            return Ok(file_path);
        }

        Err(StoreError::Io(io::Error::new(
            ErrorKind::AlreadyExists,
            format!("no free record name for timestamp {}", stem),
        )))
    }
}

fn record_name(stem: &str, attempt: u32) -> String {
    if attempt == 1 {
        format!("{}.{}", stem, RECORD_EXTENSION)
    } else {
        format!("{}-{}.{}", stem, attempt, RECORD_EXTENSION)
    }
}

fn is_record_name(path: &Path) -> bool {
    let hidden = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_none_or(|n| n.starts_with('.'));
    !hidden && path.extension().and_then(|e| e.to_str()) == Some(RECORD_EXTENSION)
}

async fn write_all_synced(file: &mut fs::File, body: &[u8]) -> io::Result<()> {
    file.write_all(body).await?;
    file.flush().await?;
    file.sync_all().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn quote_at(secs: i64, text: &str) -> Quote {
        Quote {
            created_at: Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
            author: "Alex".into(),
            text: text.into(),
            video_file: String::new(),
        }
    }

    #[tokio::test]
    async fn save_then_list_round_trips_every_field() {
        let dir = TempDir::new().unwrap();
        let store = QuoteStore::new(dir.path());
        let quote = Quote {
            video_file: "0b1c_clip.webm".into(),
            text: "line one\r\nline \"two\" <b>".into(),
            ..quote_at(0, "")
        };

        store.save(&quote).await.unwrap();
        let listed = store.list().await.unwrap();

        assert_eq!(listed, vec![quote]);
    }

    #[tokio::test]
    async fn records_are_named_by_timestamp() {
        let dir = TempDir::new().unwrap();
        let store = QuoteStore::new(dir.path());
        let quote = Quote {
            created_at: Utc.with_ymd_and_hms(2023, 11, 2, 8, 30, 59).unwrap(),
            ..quote_at(0, "x")
        };

        let path = store.save(&quote).await.unwrap();

        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "2023-11-02_08-30-59.json"
        );
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let dir = TempDir::new().unwrap();
        let store = QuoteStore::new(dir.path());
        for (secs, text) in [(5, "middle"), (1, "oldest"), (9, "newest")] {
            store.save(&quote_at(secs, text)).await.unwrap();
        }

        let texts: Vec<_> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|q| q.text)
            .collect();

        assert_eq!(texts, vec!["newest", "middle", "oldest"]);
    }

    #[tokio::test]
    async fn same_second_quotes_do_not_overwrite() {
        let dir = TempDir::new().unwrap();
        let store = QuoteStore::new(dir.path());

        let first = store.save(&quote_at(3, "first")).await.unwrap();
        let second = store.save(&quote_at(3, "second")).await.unwrap();

        assert_ne!(first, second);
        assert!(second.to_str().unwrap().ends_with("-2.json"));
        assert_eq!(store.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn corrupt_record_fails_the_listing() {
        let dir = TempDir::new().unwrap();
        let store = QuoteStore::new(dir.path());
        store.save(&quote_at(0, "fine")).await.unwrap();
        std::fs::write(dir.path().join("2000-01-01_00-00-00.json"), b"{ nope").unwrap();

        let err = store.list().await.unwrap_err();

        assert!(matches!(err, StoreError::Parse { .. }));
    }

    #[tokio::test]
    async fn unrelated_entries_are_ignored() {
        let dir = TempDir::new().unwrap();
        let store = QuoteStore::new(dir.path());
        store.save(&quote_at(0, "only")).await.unwrap();
        std::fs::write(dir.path().join("README.txt"), b"hello").unwrap();
        std::fs::write(dir.path().join(".hidden.json"), b"garbage").unwrap();
        std::fs::create_dir(dir.path().join("nested.json")).unwrap();

        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_directory_is_an_io_error() {
        let dir = TempDir::new().unwrap();
        let store = QuoteStore::new(dir.path().join("absent"));

        assert!(matches!(store.list().await, Err(StoreError::Io(_))));
    }

    #[tokio::test]
    async fn find_matches_by_fingerprint() {
        let dir = TempDir::new().unwrap();
        let store = QuoteStore::new(dir.path());
        let wanted = quote_at(2, "wanted");
        store.save(&quote_at(1, "other")).await.unwrap();
        store.save(&wanted).await.unwrap();

        let found = store.find(&wanted.fingerprint()).await.unwrap();
        assert_eq!(found, Some(wanted));
        assert_eq!(store.find("0000000000000000").await.unwrap(), None);
    }
}
