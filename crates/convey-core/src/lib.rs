//! # convey-core
//!
//! Core crate for the convey messaging gateway. Contains configuration
//! schemas, typed identifiers, the conversation message model, the
//! collaborator traits the delivery path depends on (message store,
//! transport), and the unified error system.
//!
//! This crate has **no** internal dependencies on other convey crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
