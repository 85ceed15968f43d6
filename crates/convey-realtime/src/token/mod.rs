//! One-time stream tokens and the registry of pending handlers.

pub mod registry;
pub mod stream_token;

pub use registry::TokenRegistry;
pub use stream_token::StreamToken;
