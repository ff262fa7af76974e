//! Turns stored quotes into HTML fragments and Open Graph tags.
//!
//! All user text is escaped before any markup is added; the only raw HTML in
//! the output is the anchor, image, line-break and video markup produced
//! here.

use crate::models::quote::Quote;
use regex::Regex;
use std::{
    path::{Path, PathBuf},
    sync::LazyLock,
};

const IMAGE_EXTENSIONS: [&str; 4] = [".png", ".jpg", ".jpeg", ".gif"];
const SCHEMES: [&str; 3] = ["http://", "https://", "ftp://"];
const VIDEO_WIDTH: u32 = 1280;
const VIDEO_HEIGHT: u32 = 720;

/// Scheme URLs, `www.` hosts and bare hosts on common TLDs.
static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)(?:\b(?:https?|ftp)://[^\s<>"']+|\bwww\.[^\s<>"']+|\b[a-z0-9](?:[a-z0-9-]*[a-z0-9])?(?:\.[a-z0-9](?:[a-z0-9-]*[a-z0-9])?)*\.(?:com|org|net|edu|gov|io|dev|co|uk|de|me|tv|gg|app|info|xyz)\b(?:/[^\s<>"']*)?)"#,
    )
    .expect("URL pattern is valid")
});

/// Renders quotes for the list and detail pages.
#[derive(Clone, Debug)]
pub struct Renderer {
    website_name: String,
    website_domain: String,
    videos_dir: PathBuf,
}

impl Renderer {
    pub fn new(
        website_name: impl Into<String>,
        website_domain: impl Into<String>,
        videos_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            website_name: website_name.into(),
            website_domain: website_domain.into(),
            videos_dir: videos_dir.into(),
        }
    }

    pub fn website_name(&self) -> &str {
        &self.website_name
    }

    /// Video element for the quote's attachment.
    ///
    /// - no attachment: a bare `<br>`
    /// - attachment whose file is gone: a short notice
    /// - otherwise: a `<video>` sourcing `/embed/{name}`
    pub fn embed_video(&self, quote: &Quote) -> String {
        if !quote.has_video() {
            return "<br>".to_string();
        }
        if !self.video_exists(&quote.video_file) {
            return "<br><p>There was a video here, but its gone :(</p>".to_string();
        }

        let name = html_escape(&quote.video_file);
        format!(
            concat!(
                "<br><video width='80%' height='80%' ",
                "style='border: 1px solid #fff; margin-top: 20px; margin-bottom: 20px' ",
                "controls preload='metadata'>",
                "<source src='/embed/{}' type='{}'>",
                "</video>"
            ),
            name,
            video_mime_type(&quote.video_file)
        )
    }

    /// Open Graph tags for link previews of the quote's detail page.
    pub fn embeddable_meta(&self, quote: &Quote) -> Vec<String> {
        let site_name = html_escape(&self.website_name);
        let mut tags = vec![
            og_tag("og:site_name", &site_name),
            og_tag(
                "og:url",
                &html_escape(&format!(
                    "{}/quote?{}",
                    self.website_domain,
                    quote.fingerprint()
                )),
            ),
            og_tag("og:title", &site_name),
            og_tag(
                "og:description",
                &html_escape(&format!("\"{}\" ~{}", quote.text, quote.author)),
            ),
        ];

        if quote.has_video() && self.video_exists(&quote.video_file) {
            tags.push(og_tag("og:type", "video.other"));
            tags.push(og_tag(
                "og:video",
                &html_escape(&format!(
                    "{}/embed/{}",
                    self.website_domain, quote.video_file
                )),
            ));
            tags.push(og_tag("og:video:type", video_mime_type(&quote.video_file)));
            tags.push(og_tag("og:video:width", &VIDEO_WIDTH.to_string()));
            tags.push(og_tag("og:video:height", &VIDEO_HEIGHT.to_string()));
        } else {
            tags.push(og_tag("og:type", "website"));
        }

        tags
    }

    fn video_exists(&self, name: &str) -> bool {
        self.video_path(name).is_some_and(|p| p.is_file())
    }

    /// Path of a video inside the videos directory. Names that would escape
    /// the directory resolve to nothing.
    fn video_path(&self, name: &str) -> Option<PathBuf> {
        let candidate = Path::new(name);
        if candidate.file_name()? != candidate.as_os_str() || name.starts_with('.') {
            return None;
        }
        Some(self.videos_dir.join(candidate))
    }
}

/// HTML for the quote's text.
///
/// Image URLs become an `<img>`. Anything else is escaped, has its URLs
/// turned into links and its line breaks into `<br>`. In list context the
/// result links to the quote's detail page.
pub fn to_html(quote: &Quote, list: bool) -> String {
    if is_image_url(&quote.text) {
        return format!(
            r#"<img src="{}" class="img img-fluid" style="max-height: 400px;">"#,
            html_escape(quote.text.trim())
        );
    }

    let body = linkify(&quote.text)
        .replace("\r\n", "<br>")
        .replace('\n', "<br>");

    if list {
        format!("<a href='/quote?{}'>{}</a>", quote.fingerprint(), body)
    } else {
        body
    }
}

/// True when the whole text is a single http(s) URL to a png/jpg/jpeg/gif.
pub fn is_image_url(text: &str) -> bool {
    let text = text.trim();
    if text.chars().any(char::is_whitespace) {
        return false;
    }

    let lower = text.to_ascii_lowercase();
    let Some(rest) = ["http://", "https://"]
        .iter()
        .find_map(|scheme| lower.strip_prefix(scheme))
    else {
        return false;
    };
    let path = rest.split(['?', '#']).next().unwrap_or_default();

    path.contains('/') && IMAGE_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Escape `text` and wrap every URL it contains in an anchor.
fn linkify(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for found in URL_PATTERN.find_iter(text) {
        let url = trim_url(found.as_str());
        if url.is_empty() {
            continue;
        }
        let end = found.start() + url.len();
        let lower = url.to_ascii_lowercase();

        let (start, href) = if SCHEMES.iter().any(|s| lower.starts_with(s)) {
            (found.start(), url.to_string())
        } else if let Some(local) = email_local_part(&text[last..found.start()]) {
            let start = found.start() - local.len() - 1;
            (start, format!("mailto:{}", &text[start..end]))
        } else {
            (found.start(), format!("http://{}", url))
        };

        out.push_str(&html_escape(&text[last..start]));
        out.push_str(&format!(
            r#"<a href="{}">{}</a>"#,
            html_escape(&href),
            html_escape(&text[start..end])
        ));
        last = end;
    }

    out.push_str(&html_escape(&text[last..]));
    out
}

/// The mailbox name directly before a host that follows an `@`, e.g. `bob`
/// for `bob@example.com`.
fn email_local_part(before: &str) -> Option<&str> {
    let rest = before.strip_suffix('@')?;
    let start = rest
        .char_indices()
        .rev()
        .find(|(_, c)| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '%' | '+' | '-')))
        .map_or(0, |(i, c)| i + c.len_utf8());
    let local = &rest[start..];
    (!local.is_empty()).then_some(local)
}

/// Drop sentence punctuation that trails a URL. A closing bracket is kept
/// when the URL opened one.
fn trim_url(url: &str) -> &str {
    let mut trimmed = url;
    loop {
        let Some(last) = trimmed.chars().last() else {
            return trimmed;
        };
        let keep = match last {
            '.' | ',' | ';' | ':' | '!' | '?' => false,
            ')' => trimmed.matches('(').count() >= trimmed.matches(')').count(),
            ']' => trimmed.matches('[').count() >= trimmed.matches(']').count(),
            _ => true,
        };
        if keep {
            return trimmed;
        }
        trimmed = &trimmed[..trimmed.len() - last.len_utf8()];
    }
}

/// MIME type for a video filename, derived from its extension.
pub fn video_mime_type(name: &str) -> &'static str {
    let ext = name.rsplit('.').next().unwrap_or_default().to_ascii_lowercase();
    match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "ogv" | "ogg" => "video/ogg",
        "mkv" => "video/x-matroska",
        _ => "application/octet-stream",
    }
}

fn og_tag(property: &str, content: &str) -> String {
    format!("<meta property='{}' content='{}'>", property, content)
}

pub fn html_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
