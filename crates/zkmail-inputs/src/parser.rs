//! # Message Parser
//!
//! `EmailParser` is the seam between input assembly and whatever turns a
//! raw message into circuit-ready fields. `DkimParser` is the in-tree
//! implementation: it reproduces the DKIM-signed bytes, checks the body
//! hash, locates the header fields the profile asks for, and limb-encodes
//! the RSA material.
//!
//! ## Located Fields
//!
//! All offsets are into the canonical signed header block:
//!
//! - `dkim_header_sequence`: the `dkim-signature:` field, to end of block.
//! - `body_hash_index`: first byte of the `bh=` value.
//! - `{from,to}_header_sequence`: the whole field, name included.
//! - `{from,to}_address_sequence`: the bare address, `<>` excluded.

use num_bigint::BigUint;
use sha2::{Digest, Sha256};

use zkmail_core::limbs::{limb_count, redc_param, to_limbs};
use zkmail_core::{BaseFieldRecord, BoundedVec, CircuitProfile, RsaPublicKeyLimbs, Sequence};

use crate::dkim::{canonicalize_body, signed_header_block, DkimSignature};
use crate::error::ParseError;
use crate::keys::PublicKeySource;
use crate::mime::{find, normalize_line_endings, split_message};

/// Turns a raw message into the parser half of the circuit inputs.
pub trait EmailParser: Send + Sync {
    /// Parse `raw` against the buffer sizes and extraction flags of `profile`.
    fn parse(&self, raw: &[u8], profile: &CircuitProfile) -> Result<BaseFieldRecord, ParseError>;
}

/// DKIM-aware parser backed by a public key source.
#[derive(Debug, Clone)]
pub struct DkimParser<K> {
    keys: K,
    signing_domain: Option<String>,
}

impl<K: PublicKeySource> DkimParser<K> {
    /// Parse using the first usable `rsa-sha256` DKIM-Signature of each
    /// message. Signatures that do not parse or use another algorithm are
    /// skipped.
    pub fn new(keys: K) -> Self {
        Self {
            keys,
            signing_domain: None,
        }
    }

    /// Only accept the DKIM-Signature whose `d=` equals `domain`.
    pub fn with_signing_domain(mut self, domain: impl Into<String>) -> Self {
        self.signing_domain = Some(domain.into().to_ascii_lowercase());
        self
    }

    /// The key source.
    pub fn keys(&self) -> &K {
        &self.keys
    }
}

impl<K: PublicKeySource> EmailParser for DkimParser<K> {
    fn parse(&self, raw: &[u8], profile: &CircuitProfile) -> Result<BaseFieldRecord, ParseError> {
        let normalized = normalize_line_endings(raw);
        let message = split_message(&normalized)?;

        let mut chosen = None;
        let mut last_error = None;
        for field in message.headers.iter().filter(|h| h.is("dkim-signature")) {
            let sig = match DkimSignature::parse(field.raw_value()) {
                Ok(sig) => sig,
                Err(e) => {
                    tracing::debug!(error = %e, "skipping unparseable DKIM-Signature");
                    last_error = Some(e);
                    continue;
                }
            };
            if let Some(domain) = &self.signing_domain {
                if &sig.domain != domain {
                    continue;
                }
            }
            if sig.algorithm != "rsa-sha256" {
                tracing::debug!(domain = %sig.domain, algorithm = %sig.algorithm, "skipping non-RSA DKIM-Signature");
                last_error = Some(ParseError::UnsupportedAlgorithm(sig.algorithm));
                continue;
            }
            chosen = Some((field, sig));
            break;
        }
        let (field, sig) = match chosen {
            Some(found) => found,
            None => {
                return Err(last_error.unwrap_or_else(|| ParseError::MissingDkimSignature {
                    domain: self.signing_domain.clone(),
                }))
            }
        };

        let body = canonicalize_body(&message.body, sig.body_canonicalization);
        if Sha256::digest(&body).as_slice() != sig.body_hash.as_slice() {
            return Err(ParseError::BodyHashMismatch);
        }

        let header = signed_header_block(&message, field, &sig);
        if header.len() > profile.max_headers_length {
            return Err(ParseError::HeaderTooLong {
                len: header.len(),
                max: profile.max_headers_length,
            });
        }
        if body.len() > profile.max_body_length {
            return Err(ParseError::BodyTooLong {
                len: body.len(),
                max: profile.max_body_length,
            });
        }

        let dkim_header_sequence = locate_field(&header, "dkim-signature")
            .ok_or_else(|| ParseError::MissingHeader("dkim-signature".to_string()))?;
        let body_hash_index = locate_body_hash(&header, dkim_header_sequence)
            .ok_or_else(|| ParseError::MalformedDkimSignature("bh= not in signed block".to_string()))?;

        let (from_header_sequence, from_address_sequence) = if profile.extract_from {
            let (h, a) = locate_address_field(&header, "from")?;
            (Some(h), Some(a))
        } else {
            (None, None)
        };
        let (to_header_sequence, to_address_sequence) = if profile.extract_to {
            let (h, a) = locate_address_field(&header, "to")?;
            (Some(h), Some(a))
        } else {
            (None, None)
        };

        let modulus = self
            .keys
            .modulus(&sig.domain, &sig.selector)
            .ok_or_else(|| ParseError::UnknownPublicKey {
                domain: sig.domain.clone(),
                selector: sig.selector.clone(),
            })?;
        let pubkey = encode_pubkey(&modulus)?;
        let signature_value = BigUint::from_bytes_be(&sig.signature);
        let signature = to_limbs(&signature_value, pubkey.modulus.len()).ok_or(
            ParseError::SignatureTooLarge {
                bits: signature_value.bits(),
                limbs: pubkey.modulus.len(),
            },
        )?;

        tracing::debug!(
            domain = %sig.domain,
            selector = %sig.selector,
            header_len = header.len(),
            body_len = body.len(),
            "parsed DKIM-signed message"
        );

        Ok(BaseFieldRecord {
            header: pad(&header, profile.max_headers_length)?,
            pubkey,
            signature,
            dkim_header_sequence,
            body_hash_index,
            body: pad(&body, profile.max_body_length)?,
            from_header_sequence,
            from_address_sequence,
            to_header_sequence,
            to_address_sequence,
        })
    }
}

fn pad(content: &[u8], capacity: usize) -> Result<BoundedVec, ParseError> {
    BoundedVec::padded(content, capacity).ok_or_else(|| {
        ParseError::MalformedMessage(format!("{} bytes exceed buffer of {capacity}", content.len()))
    })
}

fn encode_pubkey(modulus: &BigUint) -> Result<RsaPublicKeyLimbs, ParseError> {
    let count = limb_count(modulus.bits());
    let redc = redc_param(modulus);
    let encode = |v: &BigUint| {
        to_limbs(v, count).ok_or(ParseError::SignatureTooLarge {
            bits: v.bits(),
            limbs: count,
        })
    };
    Ok(RsaPublicKeyLimbs {
        modulus: encode(modulus)?,
        redc: encode(&redc)?,
    })
}

/// Locate a header field by name at a line start. The sequence runs to the
/// CRLF that ends the field (folded continuation lines included) or to the
/// end of the block.
pub fn locate_field(header: &[u8], name: &str) -> Option<Sequence> {
    let prefix = format!("{name}:");
    let mut line_start = 0;
    loop {
        let rest = &header[line_start..];
        if rest.len() >= prefix.len() && rest[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes()) {
            let mut end = line_start;
            loop {
                match find(&header[end..], b"\r\n") {
                    Some(rel) => {
                        let crlf = end + rel;
                        let next = header.get(crlf + 2);
                        if matches!(next, Some(b' ') | Some(b'\t')) {
                            end = crlf + 2;
                            continue;
                        }
                        return Some(Sequence::new(line_start, crlf - line_start));
                    }
                    None => return Some(Sequence::new(line_start, header.len() - line_start)),
                }
            }
        }
        line_start += find(rest, b"\r\n")? + 2;
    }
}

fn locate_address_field(header: &[u8], name: &str) -> Result<(Sequence, Sequence), ParseError> {
    let field = locate_field(header, name).ok_or_else(|| ParseError::MissingHeader(name.to_string()))?;
    let bytes = field
        .slice(header)
        .ok_or_else(|| ParseError::MissingHeader(name.to_string()))?;

    let value_start = name.len() + 1;
    let address = match (bytes.iter().rposition(|&b| b == b'<'), bytes.iter().rposition(|&b| b == b'>')) {
        (Some(open), Some(close)) if open < close && open >= value_start => {
            Sequence::new(field.index + open + 1, close - open - 1)
        }
        _ => {
            let value = &bytes[value_start..];
            let lead = value.iter().take_while(|b| b.is_ascii_whitespace()).count();
            let trail = value.iter().rev().take_while(|b| b.is_ascii_whitespace()).count();
            let len = value.len().saturating_sub(lead + trail);
            Sequence::new(field.index + value_start + lead, len)
        }
    };

    let addr_bytes = address.slice(header).unwrap_or_default();
    if address.length == 0 || !addr_bytes.contains(&b'@') {
        return Err(ParseError::MissingAddress(name.to_string()));
    }
    Ok((field, address))
}

fn locate_body_hash(header: &[u8], dkim: Sequence) -> Option<usize> {
    let field = dkim.slice(header)?;
    let mut from = 0;
    while let Some(rel) = find(&field[from..], b"bh=") {
        let pos = from + rel;
        let boundary = pos == 0 || matches!(field[pos - 1], b':' | b';' | b' ' | b'\t' | b'\n');
        if boundary {
            return Some(dkim.index + pos + 3);
        }
        from = pos + 3;
    }
    None
}
