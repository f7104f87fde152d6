//! Plain-text extraction from HTML-bearing result fields.
//!
//! Q&A excerpts and web snippets arrive as HTML fragments. Embedding
//! them raw wastes tokens on markup and skews distances, so strategies
//! run them through [`clean_html`] first: script/style subtrees are
//! dropped entirely, remaining tags are stripped, the handful of
//! entities that appear in snippets are decoded, and whitespace is
//! collapsed to single spaces.

/// Elements whose entire content is dropped, not just their tags.
const DROPPED_ELEMENTS: [&str; 2] = ["script", "style"];

/// Converts an HTML fragment to whitespace-normalized plain text.
pub fn clean_html(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(open) = rest.find('<') {
        text.push_str(&rest[..open]);
        rest = &rest[open..];

        let Some(close) = rest.find('>') else {
            // Unterminated tag: treat the remainder as markup
            rest = "";
            break;
        };

        let tag = &rest[1..close];
        rest = &rest[close + 1..];

        if let Some(element) = dropped_element(tag) {
            // Skip everything up to and past the matching close tag
            let closing = format!("</{element}");
            match find_ignore_case(rest, &closing) {
                Some(at) => {
                    let after = &rest[at..];
                    rest = match after.find('>') {
                        Some(end) => &after[end + 1..],
                        None => "",
                    };
                }
                None => {
                    rest = "";
                }
            }
        } else {
            // Plain tag: stripped, but keep a separator so adjacent
            // text nodes don't fuse into one word
            text.push(' ');
        }
    }
    text.push_str(rest);

    let decoded = decode_entities(&text);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Returns the dropped-element name if `tag` opens a script/style element.
fn dropped_element(tag: &str) -> Option<&'static str> {
    let name = tag
        .split(|c: char| c.is_ascii_whitespace() || c == '/' || c == '>')
        .next()
        .unwrap_or("");
    DROPPED_ELEMENTS
        .iter()
        .find(|element| name.eq_ignore_ascii_case(element))
        .copied()
}

/// Case-insensitive substring search (ASCII).
fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    let haystack_bytes = haystack.as_bytes();
    let needle_bytes = needle.as_bytes();
    haystack_bytes
        .windows(needle_bytes.len())
        .position(|window| window.eq_ignore_ascii_case(needle_bytes))
}

/// Decodes the entities that actually occur in search snippets.
fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}
