//! Core types and error handling for tplserve
//!
//! - [`error`] - the [`DispatchError`] taxonomy and CLI error presentation
//! - [`identity`] - [`SourceIdentity`], the normalized cache key, and [`PathError`]

pub mod error;
pub mod identity;

pub use error::{DispatchError, ErrorContext, user_friendly_error};
pub use identity::{PathError, SourceIdentity};
