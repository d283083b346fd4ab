//! `flowdeck-core` -- domain model for the workflow chat client.
//!
//! Pure types and functions with no I/O: the snapshot model and its
//! normalizer, display status mapping, polling cadences, transcript
//! entries, the persisted identity record, and the [`StateSource`]
//! collaborator trait.

pub mod error;
pub mod identity;
pub mod node_status;
pub mod normalize;
pub mod refresh;
pub mod snapshot;
pub mod source;
pub mod transcript;
pub mod types;

pub use error::CoreError;
pub use normalize::normalize;
pub use snapshot::{NodeRecord, WorkflowPhase, WorkflowSnapshot};
pub use source::{SourceError, StateSource};
