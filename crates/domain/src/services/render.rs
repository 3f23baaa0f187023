//! Email template renderer.
//!
//! Turns an authored campaign into one self-contained HTML document. The
//! renderer never fails: malformed optional fields are treated as absent and
//! their blocks omitted.
//!
//! Pipeline order is load-bearing: sanitize, then merge tokens, then link
//! rewriting, then the open pixel last. A substituted token must never end
//! up wrapped as a tracked link.

use lazy_static::lazy_static;
use regex::Regex;

use crate::models::{NewsletterSend, SendKind};
use crate::services::tracking::instrument_html;

lazy_static! {
    static ref SCRIPT_BLOCK_RE: Regex =
        Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").expect("script regex");
    static ref STYLE_BLOCK_RE: Regex =
        Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").expect("style regex");
    static ref STRAY_SCRIPT_TAG_RE: Regex =
        Regex::new(r"(?i)</?\s*(?:script|style)\b[^>]*>").expect("stray tag regex");
    static ref ON_ATTR_RE: Regex =
        Regex::new(r#"(?i)\s+on[a-z]+\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>]+)"#).expect("on-attr regex");
}

/// Strips `<script>`/`<style>` blocks and inline `on*=` event handlers from
/// author-supplied HTML.
///
/// Deliberately conservative: a regex strip rather than a full HTML parser.
/// Stored-XSS defense for recipients' mail clients, not a general sanitizer.
pub fn sanitize_html(html: &str) -> String {
    let without_scripts = SCRIPT_BLOCK_RE.replace_all(html, "");
    let without_styles = STYLE_BLOCK_RE.replace_all(&without_scripts, "");
    let without_stray = STRAY_SCRIPT_TAG_RE.replace_all(&without_styles, "");
    ON_ATTR_RE.replace_all(&without_stray, "").into_owned()
}

/// Replaces the local token set with the ESP's merge-tag syntax.
///
/// Personalization happens at the ESP during fan-out, not here; we only
/// translate `{{name}}`-style author tokens into the upstream dialect.
pub fn apply_merge_tags(html: &str) -> String {
    html.replace("{{name}}", "{$name}")
        .replace("{{email}}", "{$email}")
        .replace("{{unsubscribe}}", "{$unsubscribe}")
}

/// Renders a campaign to its final, tracking-instrumented HTML document.
///
/// `base_url` is the public origin embedded in tracking links, without a
/// trailing slash.
pub fn render_campaign(send: &NewsletterSend, base_url: &str) -> String {
    let inner = match send.kind {
        SendKind::Text => render_text_body(send),
        SendKind::Poster => render_poster_body(send),
    };

    let document = wrap_layout(&send.subject, &inner);
    let personalized = apply_merge_tags(&document);
    instrument_html(&personalized, base_url, send.id)
}

fn render_text_body(send: &NewsletterSend) -> String {
    let body = send
        .body_html
        .as_deref()
        .map(sanitize_html)
        .unwrap_or_default();

    format!(
        r#"<div style="padding: 24px 0; font-size: 16px; line-height: 1.6;">{body}</div>{button}"#,
        body = body,
        button = render_button(send),
    )
}

fn render_poster_body(send: &NewsletterSend) -> String {
    let poster = match send.poster_url.as_deref().filter(|u| !u.trim().is_empty()) {
        Some(url) => format!(
            r#"<img src="{url}" alt="" style="display: block; width: 100%; max-width: 600px; border-radius: 8px;" />"#,
            url = url
        ),
        None => String::new(),
    };

    let caption = match send.poster_text.as_deref().filter(|t| !t.trim().is_empty()) {
        Some(text) => format!(
            r#"<p style="text-align: center; font-size: 18px; margin: 24px 0;">{text}</p>"#,
            text = sanitize_html(text)
        ),
        None => String::new(),
    };

    format!("{poster}{caption}{button}", button = render_button(send))
}

/// Optional call-to-action button; omitted unless a link is present.
fn render_button(send: &NewsletterSend) -> String {
    let link = match send.button_link.as_deref().filter(|l| !l.trim().is_empty()) {
        Some(link) => link,
        None => return String::new(),
    };

    let text = send
        .button_text
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .map(sanitize_html)
        .unwrap_or_else(|| "Find out more".to_string());

    format!(
        r#"<div style="text-align: center; margin: 32px 0;"><a href="{link}" style="background: #111; color: #fff; padding: 14px 28px; text-decoration: none; border-radius: 6px; font-weight: bold; display: inline-block;">{text}</a></div>"#,
        link = link,
        text = text,
    )
}

/// Fixed outer layout shared by both kinds. The subject is author-supplied
/// and goes through the same sanitizer as body content.
fn wrap_layout(subject: &str, inner: &str) -> String {
    let subject = sanitize_html(subject);
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{subject}</title>
</head>
<body style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Helvetica, Arial, sans-serif; color: #1a1a1a; max-width: 600px; margin: 0 auto; padding: 20px;">
    <h1 style="font-size: 24px; margin-bottom: 8px;">{subject}</h1>
    {inner}
    <hr style="border: none; border-top: 1px solid #ddd; margin: 40px 0 16px;">
    <p style="color: #999; font-size: 12px; text-align: center;">You are receiving this because you subscribed to the newsletter.<br><a href="{{{{unsubscribe}}}}" style="color: #999;">Unsubscribe</a></p>
</body>
</html>"#,
        subject = subject,
        inner = inner,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SendStatus;
    use chrono::Utc;

    fn send(kind: SendKind) -> NewsletterSend {
        NewsletterSend {
            id: 42,
            subject: "Drop \u{1F525}".to_string(),
            kind,
            body_html: None,
            poster_url: None,
            poster_text: None,
            button_text: None,
            button_link: None,
            status: SendStatus::Sending,
            scheduled_at: None,
            sent_at: None,
            error: None,
            campaign_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_sanitize_strips_script_blocks() {
        let html = r#"<p>Hi</p><script>alert('x')</script><p>Bye</p>"#;
        let clean = sanitize_html(html);
        assert!(!clean.contains("script"));
        assert!(!clean.contains("alert"));
        assert!(clean.contains("<p>Hi</p>"));
        assert!(clean.contains("<p>Bye</p>"));
    }

    #[test]
    fn test_sanitize_strips_style_blocks_and_stray_tags() {
        let html = r#"<style>body { display: none }</style><p>ok</p><script src="evil.js">"#;
        let clean = sanitize_html(html);
        assert!(!clean.to_lowercase().contains("<style"));
        assert!(!clean.to_lowercase().contains("<script"));
        assert!(clean.contains("<p>ok</p>"));
    }

    #[test]
    fn test_sanitize_strips_event_handlers() {
        let html = r#"<p onclick='x()' onmouseover="y()">Hi</p><a href="https://a.example" ONCLICK=z>go</a>"#;
        let clean = sanitize_html(html);
        assert!(!clean.to_lowercase().contains("onclick"));
        assert!(!clean.to_lowercase().contains("onmouseover"));
        assert!(clean.contains(r#"href="https://a.example""#));
    }

    #[test]
    fn test_merge_tags_use_esp_syntax() {
        let html = "Hi {{name}} ({{email}}) - {{unsubscribe}}";
        assert_eq!(apply_merge_tags(html), "Hi {$name} ({$email}) - {$unsubscribe}");
    }

    #[test]
    fn test_render_text_campaign_full_pipeline() {
        let mut campaign = send(SendKind::Text);
        campaign.body_html = Some("<p onclick='x()'>Hi {{name}}</p>".to_string());

        let html = render_campaign(&campaign, "https://music.example.com");

        assert!(html.contains("{$name}"));
        assert!(!html.to_lowercase().contains("onclick"));
        assert!(html.contains("/track/open?id=42"));
        assert!(html.contains("Drop \u{1F525}"));
        // Pixel injection is the last step, just inside the body.
        let pixel_pos = html.find("/track/open?id=42").unwrap();
        let body_close = html.rfind("</body>").unwrap();
        assert!(pixel_pos < body_close);
    }

    #[test]
    fn test_render_poster_campaign() {
        let mut campaign = send(SendKind::Poster);
        campaign.poster_url = Some("https://cdn.example.com/tour.jpg".to_string());
        campaign.poster_text = Some("One night only".to_string());
        campaign.button_text = Some("Get tickets".to_string());
        campaign.button_link = Some("https://tickets.example.com/show".to_string());

        let html = render_campaign(&campaign, "https://music.example.com");

        // The poster image itself is not a link and stays untouched.
        assert!(html.contains(r#"src="https://cdn.example.com/tour.jpg""#));
        assert!(html.contains("One night only"));
        assert!(html.contains("Get tickets"));
        // The button link goes through click tracking.
        assert!(html.contains("/track/click?id=42&url=https%3A%2F%2Ftickets.example.com%2Fshow"));
    }

    #[test]
    fn test_poster_without_caption_omits_block() {
        let mut campaign = send(SendKind::Poster);
        campaign.poster_url = Some("https://cdn.example.com/tour.jpg".to_string());

        let html = render_campaign(&campaign, "https://music.example.com");
        assert!(!html.contains("<p style=\"text-align: center; font-size: 18px"));
    }

    #[test]
    fn test_button_omitted_without_link() {
        let mut campaign = send(SendKind::Text);
        campaign.body_html = Some("<p>Hi</p>".to_string());
        campaign.button_text = Some("Dangling label".to_string());

        let html = render_campaign(&campaign, "https://music.example.com");
        assert!(!html.contains("Dangling label"));
    }

    #[test]
    fn test_button_text_sanitized() {
        let mut campaign = send(SendKind::Text);
        campaign.body_html = Some("<p>Hi</p>".to_string());
        campaign.button_link = Some("https://tickets.example.com/show".to_string());
        campaign.button_text = Some(r#"Buy</a><img src=x onerror=alert(1)>"#.to_string());

        let html = render_campaign(&campaign, "https://music.example.com");
        assert!(!html.to_lowercase().contains("onerror"));
        assert!(html.contains("Buy"));
    }

    #[test]
    fn test_subject_sanitized() {
        let mut campaign = send(SendKind::Text);
        campaign.subject = r#"Tour<img src=x onerror=alert(1)>"#.to_string();
        campaign.body_html = Some("<p>Hi</p>".to_string());

        let html = render_campaign(&campaign, "https://music.example.com");
        assert!(!html.to_lowercase().contains("onerror"));
        assert!(html.contains("<title>Tour"));
    }

    #[test]
    fn test_unsubscribe_footer_not_rewritten_as_link() {
        let mut campaign = send(SendKind::Text);
        campaign.body_html = Some("<p>Hi</p>".to_string());

        let html = render_campaign(&campaign, "https://music.example.com");
        // The merge tag survives as the href, untouched by the link rewriter.
        assert!(html.contains(r#"href="{$unsubscribe}""#));
    }
}
