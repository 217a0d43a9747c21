//! Provider signature engine
//!
//! Every integrated provider authenticates requests and callbacks with a
//! digest over an ordered concatenation of field values. The ordering rules
//! differ per provider, and several fields are conditional: a group of
//! optional fields is either omitted from the base string entirely or
//! included with blank slots, depending on whether any member is set. Those
//! rules are expressed declaratively here as [`FieldGroup`]s consumed by one
//! generic base-string builder, instead of per-provider string hacks.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::collections::BTreeMap;

type HmacSha256 = Hmac<Sha256>;

/// Inclusion policy for one ordered group of fields in a base string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupPolicy {
    /// Every field occupies its slot; absent fields become empty strings.
    Always,
    /// The whole group is omitted unless at least one member is set; once
    /// any member is set, every member occupies its slot (blank if absent).
    IfAnyPresent,
    /// The group is keyed on its first field: omitted entirely when the
    /// leader is absent, fully present (blanks for the rest) otherwise.
    IfLeaderPresent,
}

/// An ordered run of field values sharing one inclusion policy.
#[derive(Debug, Clone)]
pub struct FieldGroup<'a> {
    policy: GroupPolicy,
    fields: Vec<Option<&'a str>>,
}

impl<'a> FieldGroup<'a> {
    pub fn always(fields: &[Option<&'a str>]) -> Self {
        Self {
            policy: GroupPolicy::Always,
            fields: fields.to_vec(),
        }
    }

    pub fn if_any_present(fields: &[Option<&'a str>]) -> Self {
        Self {
            policy: GroupPolicy::IfAnyPresent,
            fields: fields.to_vec(),
        }
    }

    pub fn if_leader_present(fields: &[Option<&'a str>]) -> Self {
        Self {
            policy: GroupPolicy::IfLeaderPresent,
            fields: fields.to_vec(),
        }
    }
}

/// Empty and whitespace-only values count as absent.
fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Build a delimited base string from ordered field groups.
///
/// The output is exactly reproducible from the same inputs; callers must
/// pass field values already formatted the way they go on the wire (amounts
/// with two decimals, descriptions already URL-encoded, and so on).
pub fn base_string(groups: &[FieldGroup<'_>], delimiter: char) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for group in groups {
        let any_set = group.fields.iter().any(|f| present(*f).is_some());
        let leader_set = group
            .fields
            .first()
            .and_then(|f| present(*f))
            .is_some();

        let include = match group.policy {
            GroupPolicy::Always => true,
            GroupPolicy::IfAnyPresent => any_set,
            GroupPolicy::IfLeaderPresent => leader_set,
        };
        if !include {
            continue;
        }
        for field in &group.fields {
            parts.push(present(*field).unwrap_or(""));
        }
    }
    parts.join(&delimiter.to_string())
}

pub fn md5_hex_upper(message: &str) -> String {
    format!("{:x}", md5::compute(message.as_bytes())).to_uppercase()
}

pub fn md5_hex_lower(message: &str) -> String {
    format!("{:x}", md5::compute(message.as_bytes()))
}

pub fn hmac_sha256_hex(key: &[u8], message: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(message);
    hex::encode(mac.finalize().into_bytes())
}

/// Sorted key/value scheme: values are ordered by key name, joined with a
/// separator, and HMAC-SHA256'd with the secret key (Freekassa v1 orders).
pub fn sorted_values_hmac_sha256(
    params: &BTreeMap<String, String>,
    separator: char,
    key: &[u8],
) -> String {
    let joined = params
        .values()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(&separator.to_string());
    hmac_sha256_hex(key, joined.as_bytes())
}

/// Constant-time, case-insensitive comparison of two hex digests.
///
/// Length mismatch short-circuits; hex digests for a given scheme have a
/// fixed length, so that leaks nothing useful.
pub fn verify_hex(candidate: &str, expected: &str) -> bool {
    let candidate = candidate.trim().to_lowercase();
    let expected = expected.trim().to_lowercase();
    if candidate.len() != expected.len() {
        return false;
    }
    candidate
        .as_bytes()
        .iter()
        .zip(expected.as_bytes())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn always_group_keeps_blank_slots() {
        let groups = [FieldGroup::always(&[
            Some("100.00"),
            Some("RUB"),
            None,
            Some("order-1"),
        ])];
        assert_eq!(base_string(&groups, ':'), "100.00:RUB::order-1");
    }

    #[test]
    fn if_any_present_group_is_dropped_when_all_absent() {
        let groups = [
            FieldGroup::always(&[Some("a")]),
            FieldGroup::if_any_present(&[None, Some(""), Some("   ")]),
            FieldGroup::always(&[Some("z")]),
        ];
        assert_eq!(base_string(&groups, ':'), "a:z");
    }

    #[test]
    fn if_any_present_group_blanks_missing_members() {
        let groups = [FieldGroup::if_any_present(&[
            Some("cf1-value"),
            None,
            None,
        ])];
        assert_eq!(base_string(&groups, ':'), "cf1-value::");
    }

    #[test]
    fn leader_present_includes_pair_with_blank_follower() {
        // email set, notify_email unset: both slots appear
        let groups = [FieldGroup::if_leader_present(&[
            Some("user@example.com"),
            None,
        ])];
        assert_eq!(base_string(&groups, ':'), "user@example.com:");
    }

    #[test]
    fn leader_absent_drops_whole_pair() {
        let groups = [
            FieldGroup::always(&[Some("head")]),
            FieldGroup::if_leader_present(&[None, Some("1")]),
        ];
        assert_eq!(base_string(&groups, ':'), "head");
    }

    #[test]
    fn sorted_values_join_in_key_order() {
        let mut params = BTreeMap::new();
        params.insert("shopId".to_string(), "123".to_string());
        params.insert("amount".to_string(), "100.00".to_string());
        params.insert("currency".to_string(), "RUB".to_string());
        // BTreeMap iterates amount, currency, shopId
        let sig = sorted_values_hmac_sha256(&params, '|', b"key");
        let expected = hmac_sha256_hex(b"key", b"100.00|RUB|123");
        assert_eq!(sig, expected);
    }

    #[test]
    fn verify_round_trips_and_rejects_tampering() {
        let digest = hmac_sha256_hex(b"secret", b"order-1:100.00:RUB:secret");
        assert!(verify_hex(&digest, &digest));
        assert!(verify_hex(&digest.to_uppercase(), &digest));

        // flipping any single character must fail
        for i in 0..digest.len() {
            let mut tampered: Vec<u8> = digest.clone().into_bytes();
            tampered[i] = if tampered[i] == b'0' { b'1' } else { b'0' };
            let tampered = String::from_utf8(tampered).unwrap();
            assert!(!verify_hex(&tampered, &digest), "flip at {i} accepted");
        }
    }

    #[test]
    fn verify_rejects_length_mismatch() {
        assert!(!verify_hex("abcd", "abcde"));
    }

    #[test]
    fn md5_hex_casing() {
        assert_eq!(md5_hex_lower("abc"), "900150983cd24fb0d6963f7d28e17f72");
        assert_eq!(md5_hex_upper("abc"), "900150983CD24FB0D6963F7D28E17F72");
    }
}
