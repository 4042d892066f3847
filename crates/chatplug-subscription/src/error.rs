//! Error types for the subscription layer.

/// Errors that can occur while registering subscriptions.
#[derive(Debug, thiserror::Error)]
pub enum SubscriptionError {
    /// The router task has exited (the connection closed), so the
    /// registration can never be served.
    #[error("subscription router stopped")]
    RouterStopped,
}
