//! Provider adapter implementations

pub mod freekassa;
pub mod paymentlnk;

pub use freekassa::{FreekassaConfig, FreekassaProvider};
pub use paymentlnk::{PaymentlnkConfig, PaymentlnkProvider};

const BODY_SNIPPET_MAX: usize = 500;

/// Bounded view of a provider response body for log lines. Providers
/// return localized (multi-byte) error text, so the cut must land on a
/// char boundary.
pub(crate) fn body_snippet(body: &str) -> &str {
    if body.len() <= BODY_SNIPPET_MAX {
        return body;
    }
    let mut end = BODY_SNIPPET_MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}
