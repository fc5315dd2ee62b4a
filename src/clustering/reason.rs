//! Reason-based clustering.
//!
//! Clusters failures whose primary error messages differ only in
//! embedded numbers, addresses or encoded blobs. The message is
//! canonicalized by masking those tokens, then hashed; the truncated
//! hash is the cluster ID.

use std::sync::LazyLock;

use regex::Regex;
use sha2::{Digest, Sha256};

use crate::domain::models::{ClusterId, Failure};

/// The name (and version) of the reason-based algorithm.
pub const ALGORITHM_NAME: &str = "reason-v1";

/// Candidate base64 tokens: long runs of base64 alphabet, optionally
/// `=`-padded. Masked only when they carry base64 evidence (see
/// `is_base64_noise`), so ordinary long identifiers survive.
static BASE64_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9+/]{10,}={0,2}").expect("base64 regex is valid"));

/// Candidate hexadecimal tokens, including `0x`-style values.
static HEX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9a-fA-FxX]{8,}").expect("hex regex is valid"));

/// Runs of decimal digits.
static DIGITS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+").expect("digits regex is valid"));

/// The character every masked token collapses to.
const PLACEHOLDER: &str = "0";

/// Clusters the failure by its primary error message. Returns `None`
/// when the failure carries no error text.
pub fn cluster(failure: &Failure) -> Option<ClusterId> {
    let reason = failure.primary_error()?;
    let canonical = canonicalize(reason);
    let digest = Sha256::digest(canonical.as_bytes());
    // Truncate to 16 bytes: collision resistance is ample for a
    // cluster keyspace and the ID stays within the 16-byte limit.
    let id = hex::encode(&digest[..16]);
    Some(ClusterId::new(ALGORITHM_NAME, id))
}

/// Masks embedded noise in an error message: base64 blobs (length
/// ≥ 10, with padding or `+`/`/` evidence), hexadecimal values (length
/// ≥ 16, or ≥ 8 when an `x` marks them as addresses), and runs of
/// digits.
pub fn canonicalize(reason: &str) -> String {
    let masked = BASE64_RE.replace_all(reason, |caps: &regex::Captures<'_>| {
        let token = &caps[0];
        if is_base64_noise(token) {
            PLACEHOLDER.to_string()
        } else {
            token.to_string()
        }
    });
    let masked = HEX_RE.replace_all(&masked, |caps: &regex::Captures<'_>| {
        let token = &caps[0];
        if is_hex_noise(token) {
            PLACEHOLDER.to_string()
        } else {
            token.to_string()
        }
    });
    DIGITS_RE.replace_all(&masked, PLACEHOLDER).into_owned()
}

/// A candidate token is base64 noise only when it could not be an
/// ordinary word: it ends in `=` padding or uses `+`/`/`.
fn is_base64_noise(token: &str) -> bool {
    token.ends_with('=') || token.contains(['+', '/'])
}

/// A candidate token is hex noise when it is a pure hex run of length
/// ≥ 16, or a hex-with-`x` value (pointer/address style) of length ≥ 8.
fn is_hex_noise(token: &str) -> bool {
    let has_x = token.contains(['x', 'X']);
    if has_x {
        token.len() >= 8
    } else {
        token.len() >= 16
    }
}
