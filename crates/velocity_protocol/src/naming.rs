//! Device name and address normalization.
//!
//! `normalized_name` is the primary identity of a device everywhere in the
//! system; MAC addresses are stored exclusively in the canonical lowercase
//! colon-separated form. Both normalizers are idempotent.

use std::net::IpAddr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum NamingError {
    #[error("invalid MAC address length: '{original}' (cleaned: '{cleaned}')")]
    MacLength { original: String, cleaned: String },

    #[error("invalid MAC address format: '{0}'")]
    MacFormat(String),

    #[error("invalid IP address: '{0}'")]
    Ip(String),
}

/// Lowercase, trimmed hostname used as the stable device key.
///
/// The display name keeps its capitalization in the `name` column; matching
/// always goes through this form. A trailing dot (DNS absolute form) is
/// dropped; internal dots are kept - `tor412.iad2` is a full device name,
/// not a domain to strip.
pub fn normalize_name(name: &str) -> String {
    name.trim().trim_end_matches('.').to_lowercase()
}

/// Normalize a MAC address to `aa:bb:cc:dd:ee:ff`.
///
/// Accepts the vendor formats seen in ARP output: Cisco `aabb.ccdd.eeff`,
/// standard `aa:bb:cc:dd:ee:ff`, HP `aabbcc-ddeeff`, bare hex. Rejects
/// anything that does not clean up to exactly 12 hex digits.
pub fn normalize_mac(mac: &str) -> Result<String, NamingError> {
    let cleaned: String = mac
        .trim()
        .chars()
        .filter(|c| c.is_ascii_hexdigit())
        .collect();

    // Guard against inputs that were mostly separators or junk: if stripping
    // removed non-separator characters, the input was not a MAC.
    let residue: String = mac
        .trim()
        .chars()
        .filter(|c| !c.is_ascii_hexdigit() && !matches!(c, ':' | '.' | '-' | ' '))
        .collect();
    if !residue.is_empty() {
        return Err(NamingError::MacFormat(mac.to_string()));
    }

    if cleaned.len() != 12 {
        return Err(NamingError::MacLength {
            original: mac.to_string(),
            cleaned,
        });
    }

    let lower = cleaned.to_lowercase();
    let mut out = String::with_capacity(17);
    for (i, chunk) in lower.as_bytes().chunks(2).enumerate() {
        if i > 0 {
            out.push(':');
        }
        out.push(chunk[0] as char);
        out.push(chunk[1] as char);
    }
    Ok(out)
}

/// Parse and validate an IP address, returning its canonical dotted form.
pub fn parse_ip(ip: &str) -> Result<String, NamingError> {
    ip.trim()
        .parse::<IpAddr>()
        .map(|addr| addr.to_string())
        .map_err(|_| NamingError::Ip(ip.to_string()))
}
