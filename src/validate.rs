//! Cheap syntactic gates for network identifiers, applied before any I/O.

use once_cell::sync::Lazy;
use regex::Regex;

/// Lax domain name pattern: dot-separated labels of letters, digits,
/// underscore or hyphen, ending in a top-level label of at least 2 letters.
/// A sanity gate, not an RFC validator.
static DOMAIN_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9A-Za-z_-]{1,63}\.)+[A-Za-z]{2,}$").unwrap()
});

/// Accept an IPv4 literal or a plausible fully-qualified domain name
///
/// ```
/// # use tlc::valid_hostname;
/// assert!(valid_hostname("example.com"));
/// assert!(valid_hostname("192.168.1.1"));
/// assert!(!valid_hostname("localhost"));
/// ```
pub fn valid_hostname(hostname: &str) -> bool {
    valid_ipv4_literal(hostname) || DOMAIN_NAME.is_match(hostname)
}

/// Dotted quad with each octet in 0-255, except the last octet in 0-254.
/// The upper-bound exclusion on the last octet is deliberate: a .255
/// address is never a probe target.
fn valid_ipv4_literal(hostname: &str) -> bool {
    let octets: Vec<&str> = hostname.split('.').collect();
    if octets.len() != 4 {
        return false;
    }
    for (index, octet) in octets.iter().enumerate() {
        if octet.is_empty() || octet.len() > 3 || !octet.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
        let value: u16 = match octet.parse() {
            Ok(value) => value,
            Err(_) => return false,
        };
        let upper = if index == 3 { 254 } else { 255 };
        if value > upper {
            return false;
        }
    }
    true
}

/// Parse a non-negative integer within optional inclusive bounds.
/// Signs, decimals and empty strings are rejected.
pub fn bounded_uint(s: &str, min: Option<u64>, max: Option<u64>) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value: u64 = s.parse().ok()?;
    if let Some(min) = min {
        if value < min {
            return None;
        }
    }
    if let Some(max) = max {
        if value > max {
            return None;
        }
    }
    Some(value)
}

/// Accept only non-negative integer strings within optional inclusive bounds
///
/// ```
/// # use tlc::valid_uint;
/// assert!(valid_uint("0", None, None));
/// assert!(!valid_uint("-1", None, None));
/// assert!(!valid_uint("abc", None, None));
/// ```
pub fn valid_uint(s: &str, min: Option<u64>, max: Option<u64>) -> bool {
    bounded_uint(s, min, max).is_some()
}
