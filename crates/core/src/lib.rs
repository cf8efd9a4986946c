//! Shared domain types for the StoLink image worker.
//!
//! - [`job`]: the queue message ([`Job`]) and the outbound
//!   [`CallbackPayload`].
//! - [`providers`]: capability-provider traits (prompt engine, image
//!   generator, image editor, object store) and their error types.
//! - [`error`]: the domain error enum shared by every crate.

pub mod error;
pub mod job;
pub mod providers;

pub use error::CoreError;
pub use job::{CallbackPayload, CallbackStatus, ImageAction, Job};
