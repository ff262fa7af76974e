//! HTML page shells.
//!
//! Pages are assembled with `format!`; every value that comes from a visitor
//! or from configuration is escaped here or was escaped by the renderer.

use crate::{
    models::quote::Quote,
    services::render::{Renderer, html_escape, to_html},
};

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Values echoed back into the add-quote form after a failed submission.
#[derive(Debug, Default)]
pub struct AddQuoteValues<'a> {
    pub author: &'a str,
    pub text: &'a str,
}

fn layout(site_name: &str, title: &str, head: &str, body: &str) -> String {
    let site_name = html_escape(site_name);
    format!(
        concat!(
            "<!DOCTYPE html>\n",
            "<html lang=\"en\">\n<head>\n",
            "<meta charset=\"utf-8\">\n",
            "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n",
            "<title>{title}</title>\n",
            "<link rel=\"stylesheet\" href=\"https://cdn.jsdelivr.net/npm/bootstrap@5.3.3/dist/css/bootstrap.min.css\">\n",
            "{head}\n",
            "</head>\n<body class=\"bg-dark text-light\">\n",
            "<nav class=\"navbar navbar-dark bg-secondary mb-4\"><div class=\"container\">",
            "<a class=\"navbar-brand\" href=\"/\">{site_name}</a>",
            "<a class=\"btn btn-outline-light\" href=\"/add-quote\">Add a quote</a>",
            "</div></nav>\n",
            "<main class=\"container\">\n{body}\n</main>\n",
            "</body>\n</html>\n"
        ),
        title = html_escape(title),
        head = head,
        site_name = site_name,
        body = body,
    )
}

fn quote_block(renderer: &Renderer, quote: &Quote, list: bool) -> String {
    format!(
        concat!(
            "<figure class=\"mb-5\" id=\"{fingerprint}\">",
            "<blockquote class=\"blockquote\"><p>{text}</p></blockquote>",
            "{video}",
            "<figcaption class=\"blockquote-footer text-light\">{author} ",
            "<small class=\"text-secondary\">{date}</small></figcaption>",
            "</figure>"
        ),
        fingerprint = quote.fingerprint(),
        text = to_html(quote, list),
        video = renderer.embed_video(quote),
        author = html_escape(&quote.author),
        date = quote.created_at.format(DATE_FORMAT),
    )
}

fn error_alert(error: Option<&str>) -> String {
    error
        .map(|e| format!("<div class=\"alert alert-danger\">{}</div>", html_escape(e)))
        .unwrap_or_default()
}

/// `GET /`
pub fn index_page(renderer: &Renderer, quotes: &[Quote]) -> String {
    let body = if quotes.is_empty() {
        "<p class=\"text-secondary\">Nobody has said anything silly yet.</p>".to_string()
    } else {
        quotes
            .iter()
            .map(|q| quote_block(renderer, q, true))
            .collect::<Vec<_>>()
            .join("\n")
    };
    layout(renderer.website_name(), renderer.website_name(), "", &body)
}

/// `GET /quote?{fingerprint}`
pub fn quote_page(renderer: &Renderer, quote: &Quote) -> String {
    let meta = renderer.embeddable_meta(quote).join("\n");
    let body = format!(
        "{}\n<a class=\"btn btn-outline-light\" href=\"/#{}\">Back to all quotes</a>",
        quote_block(renderer, quote, false),
        quote.fingerprint()
    );
    layout(renderer.website_name(), renderer.website_name(), &meta, &body)
}

/// `GET /add-quote`
pub fn add_quote_page(
    site_name: &str,
    pending_video: &str,
    error: Option<&str>,
    values: &AddQuoteValues<'_>,
) -> String {
    let video = if pending_video.is_empty() {
        "<p><a href=\"/upload-video\">Attach a video</a></p>".to_string()
    } else {
        format!(
            "<p>Attached video: <code>{}</code> (<a href=\"/upload-video\">replace</a>)</p>",
            html_escape(pending_video)
        )
    };

    let body = format!(
        concat!(
            "<h1>Add a quote</h1>\n",
            "{error}",
            "{video}",
            "<form method=\"post\" action=\"/add-quote\">",
            "<div class=\"mb-3\"><label class=\"form-label\" for=\"author\">Who said the silly thing?</label>",
            "<input class=\"form-control\" type=\"text\" id=\"author\" name=\"author\" value=\"{author}\" required></div>",
            "<div class=\"mb-3\"><label class=\"form-label\" for=\"text\">What silly thing did they say?</label>",
            "<textarea class=\"form-control\" id=\"text\" name=\"text\" rows=\"4\" required>{text}</textarea></div>",
            "<div class=\"mb-3\"><label class=\"form-label\" for=\"password\">What is the password?</label>",
            "<input class=\"form-control\" type=\"password\" id=\"password\" name=\"password\">",
            "<div class=\"form-text text-secondary\">If you don't know this, then you don't belong here.</div></div>",
            "<button class=\"btn btn-primary\" type=\"submit\">Save</button>",
            "</form>"
        ),
        error = error_alert(error),
        video = video,
        author = html_escape(values.author),
        text = html_escape(values.text),
    );
    layout(site_name, "Add a quote", "", &body)
}

/// `GET /upload-video`
pub fn upload_video_page(site_name: &str, error: Option<&str>) -> String {
    let body = format!(
        concat!(
            "<h1>Upload a video</h1>\n",
            "{error}",
            "<p class=\"text-secondary\">.mp4 (h264, av1) or .webm (vp8, vp9, av1)</p>",
            "<form method=\"post\" action=\"/upload-video\" enctype=\"multipart/form-data\">",
            "<div class=\"mb-3\"><input class=\"form-control\" type=\"file\" name=\"myFile\" accept=\"video/mp4,video/webm\"></div>",
            "<div class=\"mb-3\"><label class=\"form-label\" for=\"password\">What is the password?</label>",
            "<input class=\"form-control\" type=\"password\" id=\"password\" name=\"password\"></div>",
            "<button class=\"btn btn-primary\" type=\"submit\">Upload</button>",
            "</form>"
        ),
        error = error_alert(error),
    );
    layout(site_name, "Upload a video", "", &body)
}

/// `GET /incorrect`
pub fn incorrect_page(site_name: &str) -> String {
    layout(
        site_name,
        "Incorrect password",
        "",
        concat!(
            "<h1>Incorrect password</h1>",
            "<p>That wasn't the password. <a href=\"/upload-video\">Try again</a>.</p>"
        ),
    )
}
