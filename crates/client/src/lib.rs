//! Client side of shellcache.
//!
//! This crate holds the network fetcher and the offline agent that decides,
//! per request, whether to answer from the network, the cache, or neither.

pub mod agent;
pub mod fetch;

pub use agent::{
    ActivateReport, AgentConfig, BackgroundTasks, InstallReport, LifecycleState, OfflineAgent, RequestClass, classify,
};

pub use fetch::{FetchConfig, HttpNetwork, Network};
