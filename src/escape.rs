//! Escaping for values interpolated into templates. Templates are executed
//! with [`gtmpl`], which performs no escaping of its own, so every string
//! handed to a template goes through one of these first.

use pulldown_cmark::escape::{escape_href, escape_html};

/// Escapes `s` for use as HTML text or a quoted attribute value.
pub fn html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let _ = escape_html(&mut out, s);
    out
}

/// Escapes `s` for use as an `href`.
pub fn href(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let _ = escape_href(&mut out, s);
    out
}

/// Reverses [`html`] for the entities it produces, plus `&#39;` and `&apos;`.
/// Used on text scraped back out of rendered pages.
pub fn unescape_html(s: &str) -> String {
    if !s.contains('&') {
        return s.to_owned();
    }
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_html() {
        assert_eq!(
            "Tom &amp; Jerry &lt;3 &quot;VPN&quot;",
            html("Tom & Jerry <3 \"VPN\"")
        );
    }

    #[test]
    fn test_unescape_html_reverses_html() {
        let raw = "a < b & \"c\" > d";
        assert_eq!(raw, unescape_html(&html(raw)));
        assert_eq!("it's", unescape_html("it&#39;s"));
    }

    #[test]
    fn test_href_leaves_plain_urls_alone() {
        assert_eq!(
            "https://example.org/articles/best-vpn.html",
            href("https://example.org/articles/best-vpn.html")
        );
    }
}
