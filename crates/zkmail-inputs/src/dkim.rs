//! # DKIM Signature Header and Canonicalization
//!
//! Parses the DKIM-Signature tag list and reproduces the RFC 6376
//! canonicalization that produced the signed bytes. The circuit hashes
//! exactly these bytes, so the output here must match what the signer
//! hashed, byte for byte.
//!
//! The RSA check itself happens inside the circuit and is not performed
//! here.

use std::collections::BTreeMap;

use base64::Engine as _;

use crate::error::ParseError;
use crate::mime::{RawHeader, SplitMessage};

/// A canonicalization algorithm (`c=` tag half).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Canonicalization {
    /// `simple`.
    Simple,
    /// `relaxed`.
    Relaxed,
}

impl Canonicalization {
    fn parse(s: &str) -> Result<Self, ParseError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simple" => Ok(Self::Simple),
            "relaxed" => Ok(Self::Relaxed),
            other => Err(ParseError::MalformedDkimSignature(format!(
                "unknown canonicalization {other:?}"
            ))),
        }
    }
}

/// The tags of a DKIM-Signature header this crate consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DkimSignature {
    /// `d=` signing domain.
    pub domain: String,
    /// `s=` selector.
    pub selector: String,
    /// `a=` algorithm.
    pub algorithm: String,
    /// Header half of `c=`.
    pub header_canonicalization: Canonicalization,
    /// Body half of `c=`.
    pub body_canonicalization: Canonicalization,
    /// `h=` signed header names, in signing order.
    pub signed_headers: Vec<String>,
    /// Decoded `bh=`.
    pub body_hash: Vec<u8>,
    /// Decoded `b=`.
    pub signature: Vec<u8>,
}

impl DkimSignature {
    /// Parse the value of a DKIM-Signature header field.
    pub fn parse(value: &str) -> Result<Self, ParseError> {
        let tags = parse_tag_list(value)?;
        let required = |name: &str| {
            tags.get(name)
                .cloned()
                .ok_or_else(|| ParseError::MalformedDkimSignature(format!("missing {name}= tag")))
        };

        let (header_canonicalization, body_canonicalization) = match tags.get("c") {
            None => (Canonicalization::Simple, Canonicalization::Simple),
            Some(c) => match c.split_once('/') {
                Some((h, b)) => (Canonicalization::parse(h)?, Canonicalization::parse(b)?),
                None => (Canonicalization::parse(c)?, Canonicalization::Simple),
            },
        };

        let signed_headers: Vec<String> = required("h")?
            .split(':')
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .collect();
        if signed_headers.is_empty() {
            return Err(ParseError::MalformedDkimSignature("empty h= tag".to_string()));
        }

        Ok(Self {
            domain: required("d")?.to_ascii_lowercase(),
            selector: required("s")?,
            algorithm: required("a")?.to_ascii_lowercase(),
            header_canonicalization,
            body_canonicalization,
            signed_headers,
            body_hash: decode_base64_tag("bh", &required("bh")?)?,
            signature: decode_base64_tag("b", &required("b")?)?,
        })
    }
}

/// Parse a `tag=value; tag=value` list. Whitespace inside values is removed.
pub fn parse_tag_list(value: &str) -> Result<BTreeMap<String, String>, ParseError> {
    let mut tags = BTreeMap::new();
    for part in value.split(';') {
        if part.trim().is_empty() {
            continue;
        }
        let (name, val) = part.split_once('=').ok_or_else(|| {
            ParseError::MalformedDkimSignature(format!("tag without '=': {:?}", part.trim()))
        })?;
        let name = name.trim().to_string();
        let val: String = val.chars().filter(|c| !c.is_whitespace()).collect();
        if tags.insert(name.clone(), val).is_some() {
            return Err(ParseError::MalformedDkimSignature(format!("duplicate {name}= tag")));
        }
    }
    Ok(tags)
}

fn decode_base64_tag(name: &str, value: &str) -> Result<Vec<u8>, ParseError> {
    base64::engine::general_purpose::STANDARD
        .decode(value)
        .map_err(|e| ParseError::MalformedDkimSignature(format!("{name}= is not base64: {e}")))
}

/// Canonicalize one header field. The result carries no trailing CRLF.
pub fn canonicalize_header_field(field: &RawHeader, canon: Canonicalization) -> String {
    match canon {
        Canonicalization::Simple => field.raw.clone(),
        Canonicalization::Relaxed => {
            let name = field.name.trim().to_ascii_lowercase();
            let unfolded = field.raw_value().replace("\r\n", "");
            format!("{name}:{}", collapse_wsp(&unfolded).trim())
        }
    }
}

/// Canonicalize a message body.
pub fn canonicalize_body(body: &[u8], canon: Canonicalization) -> Vec<u8> {
    let mut lines: Vec<Vec<u8>> = split_crlf(body)
        .into_iter()
        .map(|line| match canon {
            Canonicalization::Simple => line.to_vec(),
            Canonicalization::Relaxed => {
                let mut collapsed = collapse_wsp_bytes(line);
                while collapsed.last() == Some(&b' ') {
                    collapsed.pop();
                }
                collapsed
            }
        })
        .collect();

    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }

    if lines.is_empty() {
        return match canon {
            Canonicalization::Simple => b"\r\n".to_vec(),
            Canonicalization::Relaxed => Vec::new(),
        };
    }

    let mut out = Vec::with_capacity(body.len() + 2);
    for line in lines {
        out.extend_from_slice(&line);
        out.extend_from_slice(b"\r\n");
    }
    out
}

/// Empty the `b=` value of a DKIM-Signature field, leaving every other byte
/// (including folding) intact.
pub fn strip_signature_value(field: &RawHeader) -> RawHeader {
    let value = field.raw_value();
    let stripped: Vec<String> = value
        .split(';')
        .map(|part| match part.split_once('=') {
            Some((name, _)) if name.trim() == "b" => format!("{name}="),
            _ => part.to_string(),
        })
        .collect();
    RawHeader {
        name: field.name.clone(),
        raw: format!("{}:{}", field.name, stripped.join(";")),
    }
}

/// Build the byte string the signer hashed: the `h=` headers selected
/// bottom-up, each canonicalized and CRLF-terminated, followed by the
/// DKIM-Signature field with an empty `b=` and no trailing CRLF.
pub fn signed_header_block(
    message: &SplitMessage,
    signature_field: &RawHeader,
    signature: &DkimSignature,
) -> Vec<u8> {
    let canon = signature.header_canonicalization;
    let mut used = vec![false; message.headers.len()];
    let mut out = Vec::new();

    for name in &signature.signed_headers {
        let pick = message
            .headers
            .iter()
            .enumerate()
            .rev()
            .find(|(i, h)| !used[*i] && h.is(name))
            .map(|(i, _)| i);
        if let Some(i) = pick {
            used[i] = true;
            out.extend_from_slice(canonicalize_header_field(&message.headers[i], canon).as_bytes());
            out.extend_from_slice(b"\r\n");
        }
    }

    let stripped = strip_signature_value(signature_field);
    out.extend_from_slice(canonicalize_header_field(&stripped, canon).as_bytes());
    out
}

fn split_crlf(data: &[u8]) -> Vec<&[u8]> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i + 1 < data.len() {
        if data[i] == b'\r' && data[i + 1] == b'\n' {
            lines.push(&data[start..i]);
            i += 2;
            start = i;
        } else {
            i += 1;
        }
    }
    lines.push(&data[start..]);
    lines
}

fn collapse_wsp(s: &str) -> String {
    String::from_utf8_lossy(&collapse_wsp_bytes(s.as_bytes())).into_owned()
}

fn collapse_wsp_bytes(line: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(line.len());
    let mut in_wsp = false;
    for &b in line {
        if b == b' ' || b == b'\t' {
            if !in_wsp {
                out.push(b' ');
            }
            in_wsp = true;
        } else {
            out.push(b);
            in_wsp = false;
        }
    }
    out
}
