//! Minimal HTML scanning helpers for the scraping adapters
//!
//! Case-insensitive matching lowercases ASCII only, so byte offsets in the
//! lowered copy stay valid for the original text.

/// Case-insensitive find of `needle` in `haystack[from..]`, returning an absolute offset
pub fn find_ci(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let lc = haystack.get(from..)?.to_ascii_lowercase();
    lc.find(&needle.to_ascii_lowercase()).map(|i| i + from)
}

/// Slice of `html` starting at the first element whose `attr` attribute matches `value`
///
/// `class` matches one whitespace-separated token; any other attribute must
/// equal `value` as a whole. Comments and the bodies of `<script>` and
/// `<style>` are skipped.
pub fn section_with_attr<'a>(html: &'a str, attr: &str, value: &str) -> Option<&'a str> {
    let mut from = 0;
    while let Some(rel) = html.get(from..)?.find('<') {
        let start = from + rel;
        let rest = &html[start..];
        if rest.starts_with("<!--") {
            from = start + rest.find("-->")? + 3;
            continue;
        }
        let end = start + rest.find('>')? + 1;
        let tag = &html[start + 1..end - 1];
        let name_len = tag
            .find(|c: char| c.is_whitespace() || c == '/')
            .unwrap_or(tag.len());
        let name = &tag[..name_len];
        if !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
            // closing tag or a bare '<' in text
            from = start + 1;
            continue;
        }
        if name.eq_ignore_ascii_case("script") || name.eq_ignore_ascii_case("style") {
            from = find_ci(html, &format!("</{}", name), end).unwrap_or(html.len());
            continue;
        }

        let matched = attr_value(&tag[name_len..], attr).is_some_and(|v| {
            if attr.eq_ignore_ascii_case("class") {
                v.split_whitespace().any(|token| token.eq_ignore_ascii_case(value))
            } else {
                v.trim().eq_ignore_ascii_case(value)
            }
        });
        if matched {
            return Some(rest);
        }
        from = end;
    }
    None
}

/// Value of attribute `wanted` in the attribute list of an opening tag
fn attr_value<'a>(attrs: &'a str, wanted: &str) -> Option<&'a str> {
    let mut rest = attrs;
    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == '/');
        if rest.is_empty() {
            return None;
        }
        let name_end = rest
            .find(|c: char| c.is_whitespace() || c == '=' || c == '/')
            .unwrap_or(rest.len());
        let name = &rest[..name_end];
        rest = rest[name_end..].trim_start();

        let value = match rest.strip_prefix('=') {
            Some(after_eq) => {
                let after_eq = after_eq.trim_start();
                match after_eq.chars().next() {
                    Some(quote @ ('"' | '\'')) => {
                        let body = &after_eq[1..];
                        let close = body.find(quote).unwrap_or(body.len());
                        rest = body.get(close + 1..).unwrap_or("");
                        &body[..close]
                    }
                    _ => {
                        let end = after_eq.find(char::is_whitespace).unwrap_or(after_eq.len());
                        rest = &after_eq[end..];
                        &after_eq[..end]
                    }
                }
            }
            None => "",
        };
        if name.eq_ignore_ascii_case(wanted) {
            return Some(value);
        }
    }
}

/// Inner HTML of each non-nested `<tag>…</tag>` block, in document order
pub fn tag_blocks<'a>(html: &'a str, tag: &str) -> Vec<&'a str> {
    let open = format!("<{}", tag);
    let close = format!("</{}", tag);
    let mut blocks = Vec::new();
    let mut from = 0;

    while let Some(start) = find_ci(html, &open, from) {
        let after_name = start + open.len();
        let boundary = html[after_name..].chars().next();
        if !matches!(boundary, Some(c) if c == '>' || c == '/' || c.is_whitespace()) {
            // e.g. <thead> while looking for <th
            from = after_name;
            continue;
        }
        let Some(open_end) = html[start..].find('>').map(|i| start + i + 1) else {
            break;
        };
        let end = find_ci(html, &close, open_end).unwrap_or(html.len());
        blocks.push(&html[open_end..end]);
        from = end;
    }
    blocks
}

/// First `<tag>` block inside `html`
pub fn first_block<'a>(html: &'a str, tag: &str) -> Option<&'a str> {
    tag_blocks(html, tag).into_iter().next()
}

/// Text content: tags removed, common entities decoded, whitespace collapsed
pub fn text_of(fragment: &str) -> String {
    let mut out = String::with_capacity(fragment.len());
    let mut in_tag = false;
    for ch in fragment.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    let decoded = decode_entities(&out);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entities(s: &str) -> String {
    const ENTITIES: &[(&str, &str)] = &[
        ("&nbsp;", " "),
        ("&auml;", "ä"),
        ("&ouml;", "ö"),
        ("&uuml;", "ü"),
        ("&Auml;", "Ä"),
        ("&Ouml;", "Ö"),
        ("&Uuml;", "Ü"),
        ("&szlig;", "ß"),
        ("&quot;", "\""),
        ("&#39;", "'"),
        ("&lt;", "<"),
        ("&gt;", ">"),
        ("&amp;", "&"),
    ];
    if !s.contains('&') {
        return s.to_string();
    }
    ENTITIES
        .iter()
        .fold(s.to_string(), |acc, (entity, ch)| acc.replace(entity, ch))
}
