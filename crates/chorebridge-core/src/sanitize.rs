//! Plain-text rendering of chore descriptions for notification surfaces.
//!
//! Descriptions are authored in a rich-text editor and arrive as HTML. The
//! tokenizer below drops tags (and the bodies of `script`/`style`), decodes
//! the common entities, collapses whitespace and caps the length. If the
//! markup is too broken to tokenize, a crude tag-stripping pass is used
//! instead; sanitizing never fails.

/// Maximum length of a sanitized description, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 200;

/// Appended when a description is cut short.
pub const TRUNCATION_MARKER: &str = "...";

#[derive(Debug, PartialEq, Eq)]
enum MarkupError {
    UnterminatedTag(usize),
    UnterminatedComment(usize),
}

/// Sanitize with the default length cap.
pub fn sanitize_description(raw: &str) -> String {
    sanitize_description_with_limit(raw, MAX_DESCRIPTION_CHARS)
}

/// Strip markup, collapse whitespace and truncate to `max_chars`
/// (marker included).
pub fn sanitize_description_with_limit(raw: &str, max_chars: usize) -> String {
    let text = strip_markup(raw).unwrap_or_else(|err| {
        tracing::debug!(?err, "description markup malformed, using crude strip");
        crude_strip(raw)
    });
    truncate(&collapse_whitespace(&text), max_chars)
}

fn strip_markup(raw: &str) -> Result<String, MarkupError> {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    let mut offset = 0;
    let mut skip_until: Option<&'static str> = None;

    while let Some(lt) = rest.find('<') {
        if skip_until.is_none() {
            out.push_str(&decode_entities(&rest[..lt]));
        }
        let tag_start = &rest[lt..];

        if tag_start.starts_with("<!--") {
            let end = tag_start
                .find("-->")
                .ok_or(MarkupError::UnterminatedComment(offset + lt))?;
            let consumed = lt + end + 3;
            offset += consumed;
            rest = &rest[consumed..];
            continue;
        }

        let gt = tag_start
            .find('>')
            .ok_or(MarkupError::UnterminatedTag(offset + lt))?;
        let tag = tag_start[1..gt].trim();
        let name = tag_name(tag);

        match skip_until {
            Some(closing) if tag.starts_with('/') && name.eq_ignore_ascii_case(closing) => {
                skip_until = None;
            }
            Some(_) => {}
            None if !tag.starts_with('/') && (name.eq_ignore_ascii_case("script") || name.eq_ignore_ascii_case("style")) => {
                if !tag.ends_with('/') {
                    skip_until = Some(if name.eq_ignore_ascii_case("script") { "script" } else { "style" });
                }
            }
            None if is_block(name) => out.push(' '),
            None => {}
        }

        let consumed = lt + gt + 1;
        offset += consumed;
        rest = &rest[consumed..];
    }

    if skip_until.is_none() {
        out.push_str(&decode_entities(rest));
    }
    Ok(out)
}

fn tag_name(tag: &str) -> &str {
    tag.trim_start_matches('/')
        .split(|c: char| c.is_whitespace() || c == '/' || c == '>')
        .next()
        .unwrap_or("")
}

fn is_block(name: &str) -> bool {
    const BLOCK_TAGS: &[&str] = &[
        "p", "br", "div", "li", "ul", "ol", "tr", "td", "th", "table", "blockquote", "pre", "hr",
        "h1", "h2", "h3", "h4", "h5", "h6", "section", "article",
    ];
    BLOCK_TAGS.iter().any(|t| name.eq_ignore_ascii_case(t))
}

fn crude_strip(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_tag = false;
    for c in raw.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    decode_entities(&out)
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let candidate = &rest[amp..];
        let decoded = candidate
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| decode_entity(&candidate[1..semi]).map(|c| (c, semi)));
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &candidate[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &candidate[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        _ => {
            let code = entity.strip_prefix('#')?;
            let value = match code.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => code.parse().ok()?,
            };
            char::from_u32(value)
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let marker_len = TRUNCATION_MARKER.chars().count();
    if max_chars < marker_len {
        // No room for the marker.
        return text.chars().take(max_chars).collect();
    }
    let keep = max_chars.saturating_sub(marker_len);
    let mut out: String = text.chars().take(keep).collect();
    out.truncate(out.trim_end().len());
    out.push_str(TRUNCATION_MARKER);
    out
}
