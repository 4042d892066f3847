//! The well-known subscriptions a plugin can hold.

use std::fmt;

use chatplug_protocol::operations;

/// Which of the three fixed subscriptions a registration belongs to.
///
/// A connection carries at most one active subscription per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionKind {
    /// `messageReceived`: messages to deliver on the plugin's service.
    Messages,
    /// `configurationReceived`: answers to a configuration request.
    Configuration,
    /// `subscribeToSearchRequests`: thread search queries.
    SearchRequests,
}

impl SubscriptionKind {
    /// The top-level `data` field carrying this kind's event body.
    pub fn field(self) -> &'static str {
        match self {
            Self::Messages => operations::MESSAGE_RECEIVED_FIELD,
            Self::Configuration => operations::CONFIGURATION_RECEIVED_FIELD,
            Self::SearchRequests => operations::SEARCH_REQUESTS_FIELD,
        }
    }

    /// The subscription text that starts this kind.
    pub fn query(self) -> &'static str {
        match self {
            Self::Messages => operations::MESSAGE_RECEIVED,
            Self::Configuration => operations::CONFIGURATION_RECEIVED,
            Self::SearchRequests => operations::SEARCH_REQUESTS,
        }
    }
}

impl fmt::Display for SubscriptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Messages => write!(f, "messages"),
            Self::Configuration => write!(f, "configuration"),
            Self::SearchRequests => write!(f, "search-requests"),
        }
    }
}
