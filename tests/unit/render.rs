use inkpost::render::{ALLOWED_TAGS, render, strip_to_allowlist};

#[test]
fn strong_kept_script_dropped_url_linked() {
    let html = render("**hi** <script>alert(1)</script> http://example.com");
    assert!(html.contains("<strong>hi</strong>"), "{html}");
    assert!(!html.contains("<script"), "{html}");
    assert!(
        html.contains(r#"<a href="http://example.com" rel="nofollow">http://example.com</a>"#),
        "{html}"
    );
}

#[test]
fn script_blocks_are_removed_entirely() {
    let html = render("<script>\nfetch('/steal')\n</script>\n\nafter");
    assert!(!html.contains("<script"));
    assert!(!html.contains("fetch"));
    assert!(html.contains("after"));
}

#[test]
fn event_handler_attributes_are_removed() {
    let html = render(r#"<b onclick="evil()">bold</b> <p style="color:red" onmouseover="x()">p</p>"#);
    assert!(html.contains("<b>bold</b>"), "{html}");
    assert!(!html.contains("onclick"));
    assert!(!html.contains("onmouseover"));
    assert!(!html.contains("style"));
}

#[test]
fn javascript_links_lose_their_href() {
    let html = render("[click](javascript:alert(1))");
    assert!(!html.contains("javascript:"), "{html}");
    assert!(html.contains("click"));
}

#[test]
fn markdown_links_are_kept_with_nofollow() {
    let html = render("[site](https://example.com/a)");
    assert!(
        html.contains(r#"<a href="https://example.com/a" rel="nofollow">site</a>"#),
        "{html}"
    );
}

#[test]
fn block_elements_survive() {
    let html = render("# One\n\n## Two\n\n### Three\n\n> quoted\n\n- a\n- b\n\n1. x\n2. y\n\n*em*");
    for tag in ["<h1>", "<h2>", "<h3>", "<blockquote>", "<ul>", "<ol>", "<li>", "<em>", "<p>"] {
        assert!(html.contains(tag), "missing {tag} in {html}");
    }
}

#[test]
fn deep_headings_and_images_are_stripped_to_text() {
    let html = render("#### deep\n\n![alt text](http://example.com/x.png)\n\n<div>boxed</div>");
    assert!(!html.contains("<h4"));
    assert!(html.contains("deep"));
    assert!(!html.contains("<img"));
    assert!(!html.contains("<div"));
    assert!(html.contains("boxed"));
}

#[test]
fn fenced_code_keeps_pre_and_code_without_class() {
    let html = render("```rust\nlet x = 1 < 2;\n```");
    assert!(html.contains("<pre><code>"), "{html}");
    assert!(html.contains("1 &lt; 2"));
    assert!(!html.contains("class="));
}

#[test]
fn urls_in_code_are_not_linked() {
    let html = render("`http://example.com`");
    assert!(html.contains("<code>http://example.com</code>"), "{html}");
    assert!(!html.contains("<a "));
}

#[test]
fn trailing_ampersand_stays_inside_the_link() {
    let html = render("http://x.example/?q=1&");
    assert!(
        html.contains(
            r#"<a href="http://x.example/?q=1&amp;" rel="nofollow">http://x.example/?q=1&amp;</a>"#
        ),
        "{html}"
    );
    assert!(!html.contains("</a>;"), "{html}");
}

#[test]
fn query_entities_survive_trailing_punctuation() {
    let html = render("go to http://x.example/?a=1&b=2.");
    assert!(
        html.contains(r#"href="http://x.example/?a=1&amp;b=2" rel="nofollow">"#),
        "{html}"
    );
    assert!(html.contains("</a>."), "{html}");
}

#[test]
fn balanced_parentheses_are_part_of_the_url() {
    let html = render("(http://en.example/wiki/Foo_(bar)) ok");
    assert!(
        html.contains(
            r#"(<a href="http://en.example/wiki/Foo_(bar)" rel="nofollow">http://en.example/wiki/Foo_(bar)</a>) ok"#
        ),
        "{html}"
    );
}

#[test]
fn special_characters_are_escaped() {
    let html = render("a < b & c");
    assert!(html.contains("a &lt; b &amp; c"), "{html}");
}

#[test]
fn malformed_markup_degrades_to_text() {
    for raw in ["<b>unclosed **bold", "<<<>>>", "[broken](", "</p></p><p", ""] {
        let html = render(raw);
        assert!(!html.contains("<script"));
        if raw.contains("unclosed") {
            assert!(html.contains("unclosed"));
        }
    }
}

#[test]
fn strip_is_idempotent_on_render_output() {
    let inputs = [
        "**hi** <script>alert(1)</script> http://example.com",
        "# Title\n\nSome *text* with [a link](https://example.com?a=1&b=2).",
        "<a href=\"http://x.example\" title=\"t\" onclick=\"y\">x</a> www.example.org",
        "> quote\n\n```\ncode http://in.code\n```\n\n- item <i>it</i>",
        "<table><tr><td>cell</td></tr></table> <acronym>A</acronym> <address>here</address>",
    ];
    for raw in inputs {
        let once = strip_to_allowlist(&render(raw));
        let twice = strip_to_allowlist(&once);
        assert_eq!(once, twice, "input: {raw}");
    }
}

#[test]
fn output_only_uses_allowed_tags() {
    let html = render(
        "<table><tr><td>x</td></tr></table><iframe src=\"http://e\"></iframe><span>s</span>\n\n**ok** http://e.example",
    );
    let mut rest = html.as_str();
    while let Some(start) = rest.find('<') {
        let tag = &rest[start + 1..];
        let tag = tag.strip_prefix('/').unwrap_or(tag);
        let name: String = tag.chars().take_while(char::is_ascii_alphanumeric).collect();
        assert!(ALLOWED_TAGS.contains(&name.as_str()), "unexpected <{name}> in {html}");
        rest = &rest[start + 1..];
    }
}
