//! The pluggable side of child discovery: the module SPI, the callback
//! modules report through, the live set of registered modules and the gate
//! every module call goes through.
mod callback;
mod module;
mod module_registry;
mod safe_caller;
pub use callback::*;
pub use module::*;
pub use module_registry::*;
pub use safe_caller::*;
