//! Image job workflow engine.
//!
//! A fixed step graph turns a [`Job`](stolink_core::Job) into either a
//! stored image URL or an error message:
//!
//! ```text
//! START -> GENERATE_PROMPT -> CREATE_IMAGE | EDIT_IMAGE -> UPLOAD -> END
//! ```
//!
//! Every step is total: provider failures are recorded in
//! [`WorkflowState::error`] and the remaining steps short-circuit to `END`.

pub mod prompts;
pub mod state;
pub mod workflow;

pub use state::{Step, WorkflowOutcome, WorkflowState};
pub use workflow::{ImageWorkflow, Providers};
