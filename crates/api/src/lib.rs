//! StoLink image worker HTTP surface.
//!
//! Health and readiness probes, synchronous image endpoints that bypass the
//! queue, the upload endpoint and a queue publishing test hook. Exposed as a
//! library so integration tests and the binary share one router.

pub mod config;
pub mod error;
pub mod router;
pub mod routes;
pub mod state;
