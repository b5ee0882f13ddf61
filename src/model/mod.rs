//! Things, bridges, identifiers and discovery results.
mod discovery_result;
mod thing;
mod uid;
pub use discovery_result::*;
pub use thing::*;
pub use uid::*;
