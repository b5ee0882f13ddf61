//! The child discovery aggregation service and its lifecycle.
mod child_discovery_service;
mod lifecycle;
mod scan_session;
pub use child_discovery_service::*;
pub use lifecycle::*;
pub use scan_session::*;
