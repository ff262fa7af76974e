//! Represents a single attributed quote.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Number of hex characters kept from the SHA-256 digest (64 bits).
pub const FINGERPRINT_LEN: usize = 16;

/// A persisted record of who said something, what they said, and when.
///
/// Quotes are immutable once saved. The `video_file` is a bare filename in the
/// videos directory; an empty string means no video is attached.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Quote {
    /// When the quote was submitted. Used for ordering and for the filename.
    pub created_at: DateTime<Utc>,

    /// Who said the thing.
    pub author: String,

    /// What they said. May be an image URL or contain links.
    pub text: String,

    /// Attached video filename, or empty.
    #[serde(default)]
    pub video_file: String,
}

impl Quote {
    /// Build a quote stamped with the current time, truncated to whole seconds
    /// so the stored record round-trips exactly.
    pub fn new(
        author: impl Into<String>,
        text: impl Into<String>,
        video_file: impl Into<String>,
    ) -> Self {
        Self {
            created_at: Utc::now().trunc_subsecs(0),
            author: author.into(),
            text: text.into(),
            video_file: video_file.into(),
        }
    }

    /// Shown in place of a quote that could not be found.
    pub fn placeholder() -> Self {
        Self::new("quotedbv", "I'm sorry, this isn't a valid quote", "")
    }

    pub fn has_video(&self) -> bool {
        !self.video_file.is_empty()
    }

    /// Canonical form hashed by [`Quote::fingerprint`]: a compact JSON array of
    /// `[created_at, author, text, video_file]` with the timestamp in RFC 3339 UTC.
    pub fn canonical(&self) -> String {
        let created_at = self.created_at.to_rfc3339_opts(SecondsFormat::AutoSi, true);
        serde_json::json!([created_at, self.author, self.text, self.video_file]).to_string()
    }

    /// Public lookup key: the first 16 hex characters of SHA-256 over
    /// [`Quote::canonical`].
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.canonical().as_bytes());
        let mut encoded = hex::encode(digest);
        encoded.truncate(FINGERPRINT_LEN);
        encoded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Quote {
        Quote {
            created_at: Utc.with_ymd_and_hms(2024, 3, 9, 17, 4, 5).unwrap(),
            author: "Dave".into(),
            text: "the printer is haunted".into(),
            video_file: String::new(),
        }
    }

    #[test]
    fn fingerprint_is_stable_and_sixteen_hex_chars() {
        let quote = sample();
        let first = quote.fingerprint();

        assert_eq!(first.len(), FINGERPRINT_LEN);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(first, quote.fingerprint());
        assert_eq!(first, quote.clone().fingerprint());
    }

    #[test]
    fn fingerprint_covers_every_field() {
        let base = sample();

        let mut other = base.clone();
        other.author = "Dan".into();
        assert_ne!(base.fingerprint(), other.fingerprint());

        let mut other = base.clone();
        other.text.push('!');
        assert_ne!(base.fingerprint(), other.fingerprint());

        let mut other = base.clone();
        other.video_file = "clip.mp4".into();
        assert_ne!(base.fingerprint(), other.fingerprint());

        let mut other = base.clone();
        other.created_at = other.created_at + chrono::Duration::seconds(1);
        assert_ne!(base.fingerprint(), other.fingerprint());
    }

    #[test]
    fn canonical_form_is_pinned() {
        assert_eq!(
            sample().canonical(),
            r#"["2024-03-09T17:04:05Z","Dave","the printer is haunted",""]"#
        );
    }

    #[test]
    fn field_boundaries_do_not_alias() {
        let mut a = sample();
        a.author = "ab".into();
        a.text = "c".into();
        let mut b = sample();
        b.author = "a".into();
        b.text = "bc".into();

        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn new_quotes_have_whole_second_timestamps() {
        let quote = Quote::new("a", "b", "");
        assert_eq!(quote.created_at.timestamp_subsec_nanos(), 0);
        assert!(!quote.has_video());
    }

    #[test]
    fn missing_video_field_deserializes_as_empty() {
        let json = r#"{"created_at":"2024-03-09T17:04:05Z","author":"a","text":"b"}"#;
        let quote: Quote = serde_json::from_str(json).unwrap();
        assert_eq!(quote.video_file, "");
    }
}
