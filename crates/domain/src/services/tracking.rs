//! Tracking injector.
//!
//! Instruments a finished HTML document for engagement measurement: absolute
//! http(s) links are routed through the click-tracking redirect and an
//! invisible 1x1 pixel signals opens. Invoked exactly once per send, at
//! render time; idempotence is neither guaranteed nor required.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use shared::validation::is_absolute_http_url;

lazy_static! {
    static ref HREF_RE: Regex =
        Regex::new(r#"(?i)href\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("href regex");
    static ref BODY_CLOSE_RE: Regex = Regex::new(r"(?i)</body\s*>").expect("body-close regex");
}

/// Rewrites every absolute http(s) `href` through the click-tracking
/// redirect. Relative links, `mailto:` and other schemes stay untouched.
pub fn wrap_links_with_tracking(html: &str, base_url: &str, send_id: i64) -> String {
    let base = base_url.trim_end_matches('/');

    HREF_RE
        .replace_all(html, |caps: &Captures| {
            let original = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default();

            if is_absolute_http_url(original) {
                format!(
                    r#"href="{base}/track/click?id={id}&url={url}""#,
                    base = base,
                    id = send_id,
                    url = urlencoding::encode(original),
                )
            } else {
                caps.get(0).map(|m| m.as_str()).unwrap_or_default().to_string()
            }
        })
        .into_owned()
}

/// Appends the open-tracking pixel, immediately before the closing body tag
/// when one exists, otherwise at the end of the document.
pub fn inject_open_pixel(html: &str, base_url: &str, send_id: i64) -> String {
    let base = base_url.trim_end_matches('/');
    let pixel = format!(
        r#"<img src="{base}/track/open?id={id}" width="1" height="1" style="display:none;" alt="" />"#,
        base = base,
        id = send_id,
    );

    if let Some(m) = BODY_CLOSE_RE.find(html) {
        let mut out = String::with_capacity(html.len() + pixel.len());
        out.push_str(&html[..m.start()]);
        out.push_str(&pixel);
        out.push_str(&html[m.start()..]);
        out
    } else {
        let mut out = html.to_string();
        out.push_str(&pixel);
        out
    }
}

/// Full instrumentation pass: link rewriting first, pixel injection last.
pub fn instrument_html(html: &str, base_url: &str, send_id: i64) -> String {
    let wrapped = wrap_links_with_tracking(html, base_url, send_id);
    inject_open_pixel(&wrapped, base_url, send_id)
}
