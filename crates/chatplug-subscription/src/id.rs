//! Subscription identifiers.

use std::borrow::Borrow;
use std::fmt;

use rand::Rng;

/// Number of random bytes in a generated ID.
///
/// Four bytes is plenty for the handful of subscriptions one connection
/// carries. Collisions are not checked.
const ID_BYTES: usize = 4;

/// Tag that correlates a `start` frame with the `data` frames answering it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(String);

impl SubscriptionId {
    /// Wraps an ID received from (or agreed with) the server.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the ID, returning the inner `String`.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for SubscriptionId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SubscriptionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Generates a fresh ID: 4 random bytes as 8 lowercase hex characters.
pub fn generate_id() -> SubscriptionId {
    let bytes: [u8; ID_BYTES] = rand::rng().random();
    SubscriptionId(bytes.iter().map(|b| format!("{b:02x}")).collect())
}
