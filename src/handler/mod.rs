//! Request handler module
//!
//! Responsible for request routing dispatch and business logic processing:
//! the article JSON API and the client UI assets.

pub mod articles;
pub mod router;
pub mod static_files;

// Re-export main entry point
pub use router::handle_request;
