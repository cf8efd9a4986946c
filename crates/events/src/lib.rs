//! StoLink job outcome notifications.
//!
//! - [`CallbackDispatcher`]: posts the terminal [`CallbackPayload`] of a
//!   job to the calling system's HTTP endpoint.
//! - [`CallbackSender`]: the seam the queue consumer depends on, so tests
//!   can record notifications instead of sending them.
//!
//! [`CallbackPayload`]: stolink_core::CallbackPayload

pub mod delivery;

pub use delivery::callback::{CallbackConfig, CallbackDispatcher, CallbackError, CallbackSender};
