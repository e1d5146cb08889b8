//! Tag-scanning helpers for HTML tables
//!
//! Good enough for server-rendered tables: case-insensitive tag search, tag stripping and a
//! handful of entities. No DOM, no scripting.

/// ASCII-lowercase copy; byte offsets match the input
fn to_lower(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii() { c.to_ascii_lowercase() } else { c })
        .collect()
}

/// Byte offset of the next `open` tag at or after `from` in lowercased text
///
/// `<tr` must not match `<track`, `<td` not `<tdx`.
fn find_open(lc: &str, open: &str, from: usize) -> Option<usize> {
    let mut search = from;
    loop {
        let start = lc.get(search..)?.find(open)? + search;
        let boundary = lc[start + open.len()..].chars().next();
        if matches!(boundary, Some(c) if c == '>' || c.is_whitespace() || c == '/') {
            return Some(start);
        }
        search = start + open.len();
    }
}

/// Next `<open ...>...</close>` block at or after `from`, as byte range of the whole block
///
/// Nested blocks of the same tag are skipped over, so the range ends at the matching close.
pub fn next_tag_block_ci(s: &str, open: &str, close: &str, from: usize) -> Option<(usize, usize)> {
    let lc = to_lower(s);
    let open = to_lower(open);
    let close = to_lower(close);

    let start = find_open(&lc, &open, from)?;
    let mut pos = s[start..].find('>')? + start + 1;
    let mut depth = 1;

    loop {
        let close_at = lc[pos..].find(&close)? + pos;
        match find_open(&lc, &open, pos) {
            Some(nested) if nested < close_at => {
                depth += 1;
                pos = nested + open.len();
            }
            _ => {
                depth -= 1;
                pos = close_at + close.len();
                if depth == 0 {
                    return Some((start, pos));
                }
            }
        }
    }
}

/// All blocks for a tag, non-overlapping, in document order
pub fn tag_blocks<'a>(s: &'a str, tag: &str) -> Vec<&'a str> {
    let open = format!("<{}", tag);
    let close = format!("</{}>", tag);
    let mut blocks = Vec::new();
    let mut from = 0;

    while let Some((start, end)) = next_tag_block_ci(s, &open, &close, from) {
        blocks.push(&s[start..end]);
        from = end;
    }

    blocks
}

/// Inner HTML of a block (between the opening tag's `>` and the final `<`)
pub fn inner_after_open_tag(block: &str) -> &str {
    match (block.find('>'), block.rfind('<')) {
        (Some(open_end), Some(close_start)) if close_start > open_end => {
            &block[open_end + 1..close_start]
        }
        _ => "",
    }
}

/// Visible text with tags removed, entities decoded and whitespace collapsed
pub fn strip_tags(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;

    for ch in s.chars() {
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

    normalize_ws(&decode_entities(&out))
}

pub fn decode_entities(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&#36;", "$")
        .replace("&#x24;", "$")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

pub fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Rows of cell text for every `<tr>` in a table block (`<td>` and `<th>` cells)
pub fn table_rows(table: &str) -> Vec<Vec<String>> {
    tag_blocks(table, "tr")
        .into_iter()
        .map(|row| {
            let mut cells: Vec<(usize, String)> = Vec::new();
            for tag in ["td", "th"] {
                let open = format!("<{}", tag);
                let close = format!("</{}>", tag);
                let mut from = 0;
                while let Some((start, end)) = next_tag_block_ci(row, &open, &close, from) {
                    cells.push((start, strip_tags(inner_after_open_tag(&row[start..end]))));
                    from = end;
                }
            }
            cells.sort_by_key(|(start, _)| *start);
            cells.into_iter().map(|(_, text)| text).collect()
        })
        .collect()
}
