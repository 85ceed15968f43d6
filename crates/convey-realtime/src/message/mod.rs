//! Wire framing for socket deliveries.

pub mod frame;

pub use frame::DeliveryFrame;
