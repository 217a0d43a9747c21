//! Cache key namespaces
//!
//! All gateway keys live under a short prefix so a shared Redis instance
//! stays inspectable and `delete`s can never collide across concerns.

/// Idempotency record for a caller-supplied key.
pub fn idempotency(key: &str) -> String {
    format!("idem:{key}")
}

/// Short-link token to provider checkout URL.
pub fn paylink(token: &str) -> String {
    format!("paylink:{token}")
}

#[cfg(test)]
mod tests {
    #[test]
    fn namespaces_do_not_collide() {
        assert_ne!(super::idempotency("abc"), super::paylink("abc"));
    }
}
