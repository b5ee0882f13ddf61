//! Child discovery aggregation.
//!
//! Bridges (parent things) expose children that change over time. Each
//! [`ChildDiscoveryModule`] knows how to enumerate the children of one kind
//! of bridge; [`ChildDiscoveryService`] tracks the registered modules, reacts
//! to changes in the [`ThingRegistry`] and republishes whatever the modules
//! report as a single feed of [`DiscoveryResult`]s.
//!
//! ```text
//! ThingRegistry ──events──▶ ChildDiscoveryService ──▶ SafeCaller ──▶ module.create_results(bridge, cb)
//!                                   ▲                                          │
//!                                   └──────── ChildDiscoveryCallback ◀─────────┘
//!                                   │
//!                                   ▼
//!                        DiscoveryResultPublisher ──▶ DiscoveryEvent subscribers
//! ```

mod config;
mod constants;
mod discovery;
mod errors;
mod model;
mod publisher;
mod registry;
mod service;
pub mod utils;

pub use config::*;
pub use constants::*;
pub use discovery::*;
pub use errors::*;
pub use model::*;
pub use publisher::*;
pub use registry::*;
pub use service::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;

#[cfg(test)]
mod errors_test;
