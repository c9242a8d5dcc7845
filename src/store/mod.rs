//! Article store module
//!
//! Owns the on-disk collection of articles: a single JSON array that is read
//! in full and rewritten in full on every mutation.

mod article;
mod error;
mod json_store;

pub use article::{Article, ArticleFields};
pub use error::StoreError;
pub use json_store::ArticleStore;
