//! Request handler module
//!
//! Routes each request to theme asset serving or the front controller.

pub mod assets;
pub mod router;

pub use router::handle_request;
