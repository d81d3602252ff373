//! # Message Splitting and Body Decoding
//!
//! The minimum of RFC 5322 structure the parser and the assembler need:
//! line-ending normalization, the header/body split, header field lookup,
//! and transfer-decoding of the body for username extraction.
//!
//! This is deliberately not a MIME library. Multipart bodies are not
//! walked; sending-service templates this crate targets are single-part.

use base64::Engine as _;

use crate::error::ParseError;

/// One header field as it appears in the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawHeader {
    /// Field name, case preserved.
    pub name: String,
    /// Full field text including name, colon and any folding, without the
    /// terminating CRLF.
    pub raw: String,
}

impl RawHeader {
    /// Text after the colon, folding preserved.
    pub fn raw_value(&self) -> &str {
        self.raw.split_once(':').map(|(_, v)| v).unwrap_or_default()
    }

    /// Unfolded value with surrounding whitespace trimmed.
    pub fn value(&self) -> String {
        self.raw_value().replace("\r\n", "").trim().to_string()
    }

    /// Case-insensitive name comparison.
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// A message split into header fields and body bytes.
#[derive(Debug, Clone)]
pub struct SplitMessage {
    /// Header fields in message order.
    pub headers: Vec<RawHeader>,
    /// Body bytes after the blank separator line.
    pub body: Vec<u8>,
}

impl SplitMessage {
    /// First field with the given name.
    pub fn header(&self, name: &str) -> Option<&RawHeader> {
        self.headers.iter().find(|h| h.is(name))
    }

    /// Unfolded value of the first field with the given name.
    pub fn header_value(&self, name: &str) -> Option<String> {
        self.header(name).map(RawHeader::value)
    }
}

/// Body transfer encodings the decoder understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    /// 7bit, 8bit, binary, or absent.
    Identity,
    /// `quoted-printable`.
    QuotedPrintable,
    /// `base64`.
    Base64,
}

impl TransferEncoding {
    /// Interpret a `Content-Transfer-Encoding` value.
    pub fn from_header(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("quoted-printable") => Self::QuotedPrintable,
            Some("base64") => Self::Base64,
            _ => Self::Identity,
        }
    }
}

/// Convert bare `\n` line endings to `\r\n`.
pub fn normalize_line_endings(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len() + raw.len() / 32);
    let mut prev = 0u8;
    for &b in raw {
        if b == b'\n' && prev != b'\r' {
            out.push(b'\r');
        }
        out.push(b);
        prev = b;
    }
    out
}

/// Split a CRLF-normalized message into header fields and body.
///
/// Header bytes must be UTF-8 (RFC 6532); anything else is rejected rather
/// than rewritten, since the signed header block is hashed byte for byte.
pub fn split_message(raw: &[u8]) -> Result<SplitMessage, ParseError> {
    let (head, body) = match find(raw, b"\r\n\r\n") {
        Some(pos) => (&raw[..pos], raw[pos + 4..].to_vec()),
        None => {
            return Err(ParseError::MalformedMessage(
                "no blank line separating headers from body".to_string(),
            ))
        }
    };

    let text = std::str::from_utf8(head).map_err(|e| {
        ParseError::MalformedMessage(format!(
            "header block is not valid UTF-8 at byte {}",
            e.valid_up_to()
        ))
    })?;
    let mut headers: Vec<RawHeader> = Vec::new();
    for line in text.split("\r\n") {
        if line.starts_with(' ') || line.starts_with('\t') {
            match headers.last_mut() {
                Some(last) => {
                    last.raw.push_str("\r\n");
                    last.raw.push_str(line);
                }
                None => {
                    return Err(ParseError::MalformedMessage(
                        "continuation line before first header field".to_string(),
                    ))
                }
            }
            continue;
        }
        let name = match line.split_once(':') {
            Some((name, _)) if is_field_name(name) => name.to_string(),
            _ => {
                return Err(ParseError::MalformedMessage(format!(
                    "invalid header line {:?}",
                    truncate(line, 40)
                )))
            }
        };
        headers.push(RawHeader {
            name,
            raw: line.to_string(),
        });
    }

    if headers.is_empty() {
        return Err(ParseError::MalformedMessage("message has no header fields".to_string()));
    }
    Ok(SplitMessage { headers, body })
}

/// Decode a body according to its transfer encoding, then read it as UTF-8.
///
/// Undecodable base64 falls back to the raw text; invalid UTF-8 is replaced.
pub fn decode_body_text(body: &[u8], encoding: TransferEncoding) -> String {
    match encoding {
        TransferEncoding::Identity => String::from_utf8_lossy(body).into_owned(),
        TransferEncoding::QuotedPrintable => {
            String::from_utf8_lossy(&decode_quoted_printable(body)).into_owned()
        }
        TransferEncoding::Base64 => {
            let compact: Vec<u8> = body
                .iter()
                .copied()
                .filter(|b| !b.is_ascii_whitespace())
                .collect();
            match base64::engine::general_purpose::STANDARD.decode(&compact) {
                Ok(decoded) => String::from_utf8_lossy(&decoded).into_owned(),
                Err(e) => {
                    tracing::warn!("body declared base64 but did not decode: {e}");
                    String::from_utf8_lossy(body).into_owned()
                }
            }
        }
    }
}

/// Decoded body text of a raw message, for username extraction.
pub fn decoded_text(raw: &[u8]) -> Result<String, ParseError> {
    let normalized = normalize_line_endings(raw);
    let message = split_message(&normalized)?;
    let encoding =
        TransferEncoding::from_header(message.header_value("content-transfer-encoding").as_deref());
    Ok(decode_body_text(&message.body, encoding))
}

fn decode_quoted_printable(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    let mut i = 0;
    while i < input.len() {
        if input[i] != b'=' {
            out.push(input[i]);
            i += 1;
            continue;
        }
        if input[i + 1..].starts_with(b"\r\n") {
            i += 3;
            continue;
        }
        let hex = input.get(i + 1..i + 3).and_then(|h| {
            std::str::from_utf8(h)
                .ok()
                .and_then(|s| u8::from_str_radix(s, 16).ok())
        });
        match hex {
            Some(byte) => {
                out.push(byte);
                i += 3;
            }
            None => {
                out.push(b'=');
                i += 1;
            }
        }
    }
    out
}

fn is_field_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_graphic() && b != b':')
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Position of the first occurrence of `needle` in `haystack`.
pub(crate) fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
