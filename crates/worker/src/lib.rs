//! StoLink image queue worker.
//!
//! - [`consumer`]: [`ImageConsumer`], the AMQP connection and the
//!   single-flight delivery loop.
//! - [`handler`]: [`JobHandler`], the transport-independent per-message
//!   policy (parse, run workflow, callback, ack/reject).
//! - [`reconnect`]: exponential-backoff reconnection.
//! - [`services`]: wiring of the concrete providers from the environment.

pub mod config;
pub mod consumer;
pub mod handler;
pub mod reconnect;
pub mod services;

pub use config::ConsumerConfig;
pub use consumer::{ConsumerError, ImageConsumer};
pub use handler::{Acknowledger, Disposition, JobHandler};
pub use services::{Services, ServicesError};
