//! Network collaborator and Cache Policy Engine for the RailBook service worker.
//!
//! The engine decides, for every intercepted request, whether to answer from
//! the network or the cache, keeps cache buckets versioned and bounded, and
//! relays messages, pushes, and sync events to the host.

pub mod fetch;
pub mod worker;

pub use fetch::{CacheDirective, FetchConfig, HttpNetwork, Network, NetworkError};
pub use worker::{
    CachePolicyEngine, Clients, Collaborators, FetchOutcome, HostError, InboundMessage, LifecycleState, OutboundMessage,
    PolicyConfig, Registration, ResponseSource,
};
