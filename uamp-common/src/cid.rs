//! Content-identifier (CID) shape validation
//!
//! Evidence documents are referenced by IPFS content identifiers. The
//! front end only checks that a candidate *looks like* one of the common
//! multibase/multihash encodings before it is sent to the gateway; full
//! multibase decoding is left to the gateway.
//!
//! Matching is anchored at the start of the trimmed input only, so a string
//! with a valid prefix followed by extra characters is still accepted.

/// Content-identifier encodings recognised by [`validate_cid`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CidFormat {
    /// CIDv0: `Qm` + 44 base58btc characters
    V0Base58,
    /// CIDv1 base32 (`b` prefix), either letter case
    V1Base32,
    /// CIDv1 base32 upper-case (`B` prefix)
    V1Base32Upper,
    /// CIDv1 base58btc (`z` prefix)
    V1Base58,
    /// CIDv1 base16 upper-case (`F` prefix)
    V1Base16Upper,
}

struct CidPattern {
    format: CidFormat,
    prefix: &'static str,
    body_len: usize,
    alphabet: fn(u8) -> bool,
}

fn is_base58(b: u8) -> bool {
    matches!(b, b'1'..=b'9' | b'A'..=b'H' | b'J'..=b'N' | b'P'..=b'Z' | b'a'..=b'k' | b'm'..=b'z')
}

fn is_base32_any_case(b: u8) -> bool {
    b.is_ascii_alphabetic() || matches!(b, b'2'..=b'7')
}

fn is_base32_upper(b: u8) -> bool {
    b.is_ascii_uppercase() || matches!(b, b'2'..=b'7')
}

fn is_base16_upper(b: u8) -> bool {
    b.is_ascii_digit() || matches!(b, b'A'..=b'F')
}

const PATTERNS: &[CidPattern] = &[
    CidPattern { format: CidFormat::V0Base58, prefix: "Qm", body_len: 44, alphabet: is_base58 },
    CidPattern { format: CidFormat::V1Base32, prefix: "b", body_len: 58, alphabet: is_base32_any_case },
    CidPattern { format: CidFormat::V1Base32Upper, prefix: "B", body_len: 58, alphabet: is_base32_upper },
    CidPattern { format: CidFormat::V1Base58, prefix: "z", body_len: 48, alphabet: is_base58 },
    CidPattern { format: CidFormat::V1Base16Upper, prefix: "F", body_len: 50, alphabet: is_base16_upper },
];

impl CidPattern {
    fn matches(&self, candidate: &str) -> bool {
        let Some(rest) = candidate.strip_prefix(self.prefix) else {
            return false;
        };
        let body = rest.as_bytes();
        body.len() >= self.body_len && body[..self.body_len].iter().all(|&b| (self.alphabet)(b))
    }
}

/// Identify which encoding a candidate CID uses, if any
pub fn detect_cid_format(candidate: &str) -> Option<CidFormat> {
    let trimmed = candidate.trim();
    if trimmed.is_empty() {
        return None;
    }
    PATTERNS
        .iter()
        .find(|pattern| pattern.matches(trimmed))
        .map(|pattern| pattern.format)
}

/// Validate that a string has the shape of a content identifier
///
/// # Examples
///
/// ```
/// use uamp_common::cid::validate_cid;
///
/// assert!(validate_cid("bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi"));
/// assert!(!validate_cid("   "));
/// assert!(!validate_cid("bafybei"));
/// ```
pub fn validate_cid(candidate: &str) -> bool {
    detect_cid_format(candidate).is_some()
}
