//! HMAC-SHA256 signing and webhook verification.

use hmac::{Hmac, Mac};
use serde_json::{Map, Value};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Lowercase hex HMAC-SHA256 of `data` keyed by `checksum_key`.
#[must_use]
pub fn sign(checksum_key: &str, data: &str) -> String {
    #[allow(clippy::expect_used)]
    let mut mac = HmacSha256::new_from_slice(checksum_key.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(data.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// `key=value` pairs of a webhook `data` object, sorted by key and joined
/// with `&`.
///
/// Nulls become empty strings. Nested arrays and objects are serialized as
/// JSON.
#[must_use]
pub fn canonical_data(data: &Map<String, Value>) -> String {
    let mut keys: Vec<&String> = data.keys().collect();
    keys.sort();

    keys.into_iter()
        .map(|key| {
            let value = match data.get(key) {
                None | Some(Value::Null) => String::new(),
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
            };
            format!("{key}={value}")
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Check a webhook signature. Hex case is ignored.
#[must_use]
pub fn verify_signature(checksum_key: &str, data: &Map<String, Value>, signature: &str) -> bool {
    let expected = sign(checksum_key, &canonical_data(data));
    constant_time_eq(
        expected.as_bytes(),
        signature.trim().to_ascii_lowercase().as_bytes(),
    )
}

/// Compare two byte strings without short-circuiting on the first mismatch.
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn data(json: &str) -> Map<String, Value> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_sign_matches_known_vector() {
        // RFC 4231 test case 2
        assert_eq!(
            sign("Jefe", "what do ya want for nothing?"),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_canonical_data_sorts_and_flattens() {
        let d = data(
            r#"{"orderCode":123,"amount":1000,"desc":"ok","counterAccountName":null,
                "extra":{"b":1},"tags":[1,2]}"#,
        );
        assert_eq!(
            canonical_data(&d),
            r#"amount=1000&counterAccountName=&desc=ok&extra={"b":1}&orderCode=123&tags=[1,2]"#
        );
    }

    #[test]
    fn test_verify_signature_round_trip() {
        let d = data(r#"{"orderCode":17,"amount":250000,"code":"00"}"#);
        let signature = sign("checksum", &canonical_data(&d));
        assert!(verify_signature("checksum", &d, &signature));
        assert!(verify_signature("checksum", &d, &signature.to_uppercase()));
    }

    #[test]
    fn test_verify_signature_rejects_tampering() {
        let d = data(r#"{"orderCode":17,"amount":250000}"#);
        let signature = sign("checksum", &canonical_data(&d));

        let tampered = data(r#"{"orderCode":17,"amount":1}"#);
        assert!(!verify_signature("checksum", &tampered, &signature));
        assert!(!verify_signature("other-key", &d, &signature));
        assert!(!verify_signature("checksum", &d, ""));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
        assert!(constant_time_eq(b"", b""));
    }
}
