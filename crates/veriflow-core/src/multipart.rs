//! Manual multipart/form-data decoding.
//!
//! The inbound request carries part headers embedded in a byte stream and a
//! binary-safe document field, so decoding is a manual boundary scan over
//! bytes rather than a call into a platform multipart facility. Parts with
//! no discoverable `name` are dropped; a missing trailing boundary marker
//! stops decoding cleanly instead of failing.

use std::collections::HashMap;

/// A decoded part: trimmed UTF-8 text, or raw bytes for the document field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Text(String),
    Bytes(Vec<u8>),
}

/// Extract the boundary token from a Content-Type header value.
pub fn boundary_from_content_type(content_type: &str) -> Option<&str> {
    let (_, after) = content_type.split_once("boundary=")?;
    let token = after.split(';').next().unwrap_or(after).trim();
    let token = token.trim_matches('"');
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Decode a multipart body into named parts.
///
/// Parts are the regions between consecutive `--{boundary}` occurrences.
/// Within each part the header block ends at the first blank line; the part
/// name comes from the `name="..."` attribute of its Content-Disposition
/// line. The part named `binary_field` keeps its raw bytes; every other part
/// is decoded as UTF-8 text with surrounding whitespace trimmed.
pub fn decode(body: &[u8], boundary: &str, binary_field: &str) -> HashMap<String, Part> {
    let marker = format!("--{boundary}").into_bytes();
    let mut parts = HashMap::new();

    let mut start = 0;
    while let Some(at) = find(body, &marker, start) {
        let content_start = at + marker.len();
        let Some(next) = find(body, &marker, content_start) else {
            break;
        };
        let region = &body[content_start..next];

        if let Some((name, content)) = split_part(region) {
            if name == binary_field {
                parts.insert(name, Part::Bytes(content.to_vec()));
            } else {
                let text = String::from_utf8_lossy(content).trim().to_string();
                parts.insert(name, Part::Text(text));
            }
        }

        start = next;
    }

    parts
}

/// Split one part region into its name and content, if a name is present.
fn split_part(region: &[u8]) -> Option<(String, &[u8])> {
    let header_end = find(region, b"\r\n\r\n", 0)?;
    let headers = String::from_utf8_lossy(&region[..header_end]);
    let name = part_name(&headers)?;
    let content = &region[header_end + 4..];
    // the trailing CRLF before the next boundary belongs to the framing
    let content = content.strip_suffix(b"\r\n").unwrap_or(content);
    Some((name, content))
}

fn part_name(headers: &str) -> Option<String> {
    let (_, after) = headers.split_once("name=\"")?;
    let (name, _) = after.split_once('"')?;
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > haystack.len() || needle.is_empty() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| i + from)
}
