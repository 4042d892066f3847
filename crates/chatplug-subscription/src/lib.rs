//! Subscription multiplexing for chatplug.
//!
//! Many subscriptions share one duplex connection. This crate tags them
//! and sorts the inbound frames back out:
//!
//! 1. **IDs**: [`generate_id`] makes the short tag sent with `start`.
//! 2. **Registrations**: [`Registry`] maps live IDs to a
//!    [`SubscriptionKind`].
//! 3. **Routing**: [`spawn_router`] runs an actor that decodes each `data`
//!    frame for its registered kind and hands the body to the matching
//!    channel in [`DeliveryChannels`].
//!
//! # How it fits in the stack
//!
//! ```text
//! Facade (above)       ← registers kinds, hands DeliveryChannels to callers
//!     ↕
//! Subscription (here)  ← IDs, registry, router task
//!     ↕
//! Protocol / transport ← IncomingPayload frames, ConnectionState
//! ```

mod error;
mod id;
mod kind;
mod registry;
mod router;

pub use error::SubscriptionError;
pub use id::{generate_id, SubscriptionId};
pub use kind::SubscriptionKind;
pub use registry::Registry;
pub use router::{
    delivery_channels, spawn_router, DeliveryChannels, Outlets, RouterHandle,
};
