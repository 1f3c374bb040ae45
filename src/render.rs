//! Post body rendering.
//!
//! Author text goes through three stages:
//! - Markdown to HTML (CommonMark, raw HTML passed through)
//! - Allow-list sanitizing: anything outside [`ALLOWED_TAGS`] is stripped,
//!   keeping its text
//! - Auto-linking of bare URLs left in text
//!
//! The result is safe to embed directly into a page.

use pulldown_cmark::{Options, Parser, html};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

/// Elements allowed to survive sanitizing.
pub const ALLOWED_TAGS: &[&str] = &[
    "a",
    "address",
    "acronym",
    "b",
    "blockquote",
    "code",
    "em",
    "i",
    "li",
    "ol",
    "pre",
    "strong",
    "ul",
    "h1",
    "h2",
    "h3",
    "p",
];

/// `rel` value placed on every anchor in rendered output.
pub const LINK_REL: &str = "nofollow";

/// Elements whose text is never auto-linked.
const NO_LINKIFY: &[&str] = &["a", "pre", "code"];

static POLICY: LazyLock<ammonia::Builder<'static>> = LazyLock::new(|| {
    let mut builder = ammonia::Builder::default();
    builder
        .tags(ALLOWED_TAGS.iter().copied().collect())
        .generic_attributes(HashSet::new())
        .tag_attributes(HashMap::from([("a", HashSet::from(["href"]))]))
        .url_schemes(HashSet::from(["http", "https", "mailto"]))
        .link_rel(Some(LINK_REL))
        .strip_comments(true);
    builder
});

/// Regex for bare URLs in already-escaped text. Quotes and angle brackets
/// never appear in a match, so the match can be placed in an attribute.
static URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(?:https?://|www\.)[^\s<>"']+"#).expect("URL regex should compile")
});

/// Entities that end a URL even though the regex would keep going.
const URL_STOP_ENTITIES: &[&str] = &["&lt;", "&gt;", "&quot;", "&nbsp;"];

/// Render author-supplied Markdown into sanitized, auto-linked HTML.
///
/// Never fails: malformed markup comes out as literal text.
pub fn render(raw: &str) -> String {
    linkify(&strip_to_allowlist(&markdown_to_html(raw)))
}

/// Convert Markdown to unsanitized HTML.
pub fn markdown_to_html(raw: &str) -> String {
    let parser = Parser::new_ext(raw, Options::empty());
    let mut out = String::with_capacity(raw.len() + raw.len() / 2);
    html::push_html(&mut out, parser);
    out
}

/// Restrict `html` to [`ALLOWED_TAGS`].
///
/// Disallowed elements are removed with their text kept, except `script`
/// and `style` which lose their content too. Only `href` on anchors
/// survives, limited to http, https and mailto.
pub fn strip_to_allowlist(html: &str) -> String {
    POLICY.clean(html).to_string()
}

/// Wrap bare URLs found in text nodes of `html` in anchors.
///
/// `html` must already be sanitized: text is expected to be escaped, so
/// every literal `<` starts a tag.
pub fn linkify(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut skip_depth = 0usize;
    let mut rest = html;

    while !rest.is_empty() {
        if rest.starts_with('<') {
            let end = tag_end(rest);
            let tag = &rest[..end];
            if let Some((name, closing)) = tag_name(tag)
                && NO_LINKIFY.iter().any(|t| name.eq_ignore_ascii_case(t))
            {
                if closing {
                    skip_depth = skip_depth.saturating_sub(1);
                } else {
                    skip_depth += 1;
                }
            }
            out.push_str(tag);
            rest = &rest[end..];
        } else {
            let end = rest.find('<').unwrap_or(rest.len());
            let text = &rest[..end];
            if skip_depth == 0 {
                link_text(text, &mut out);
            } else {
                out.push_str(text);
            }
            rest = &rest[end..];
        }
    }
    out
}

/// Byte length of the tag starting at `s[0] == '<'`, honouring quoted
/// attribute values.
fn tag_end(s: &str) -> usize {
    let mut quote = None;
    for (i, c) in s.char_indices().skip(1) {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '>' => return i + 1,
            None => {}
        }
    }
    s.len()
}

fn tag_name(tag: &str) -> Option<(&str, bool)> {
    let inner = tag.strip_prefix('<')?;
    let (inner, closing) = match inner.strip_prefix('/') {
        Some(rest) => (rest, true),
        None => (inner, false),
    };
    let len = inner
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(inner.len());
    (len > 0).then(|| (&inner[..len], closing))
}

fn trim_url(candidate: &str) -> &str {
    let mut url = candidate;
    for stop in URL_STOP_ENTITIES {
        if let Some(i) = url.find(stop) {
            url = &url[..i];
        }
    }
    while let Some(last) = url.chars().next_back() {
        let trim = match last {
            ';' => !ends_with_entity(url),
            ')' => url.matches('(').count() < url.matches(')').count(),
            ']' => url.matches('[').count() < url.matches(']').count(),
            '.' | ',' | ':' | '!' | '?' => true,
            _ => false,
        };
        if !trim {
            break;
        }
        url = &url[..url.len() - last.len_utf8()];
    }
    url
}

/// Whether the `;` ending `url` closes a character reference such as `&amp;`.
fn ends_with_entity(url: &str) -> bool {
    let body = &url[..url.len() - 1];
    body.rfind('&').is_some_and(|amp| {
        let name = &body[amp + 1..];
        !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '#')
    })
}

fn link_text(text: &str, out: &mut String) {
    let mut last = 0;
    for m in URL_REGEX.find_iter(text) {
        let url = trim_url(m.as_str());
        let has_host = url
            .split_once("//")
            .map_or(url.len() > 4, |(_, host)| !host.is_empty());
        if !has_host {
            continue;
        }
        let href = if url.len() >= 4 && url[..4].eq_ignore_ascii_case("www.") {
            format!("http://{url}")
        } else {
            url.to_string()
        };
        out.push_str(&text[last..m.start()]);
        out.push_str("<a href=\"");
        out.push_str(&href);
        out.push_str("\" rel=\"");
        out.push_str(LINK_REL);
        out.push_str("\">");
        out.push_str(url);
        out.push_str("</a>");
        last = m.start() + url.len();
    }
    out.push_str(&text[last..]);
}
