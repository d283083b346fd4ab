//! `flowdeck-sync` -- workflow state synchronization engine.
//!
//! Data flows one way:
//!
//! ```text
//! Poller ──▶ normalize ──▶ Reconciler ──┬──▶ update subscribers
//!                                       ├──▶ LatestWorkflowData ──▶ ResponseStream
//!                                       └──▶ HistoryArchive (Finished only)
//! ```
//!
//! [`WorkflowMonitor`] wires the pieces together; each is usable on its
//! own as well.

pub mod archive;
pub mod latest;
pub mod monitor;
pub mod poller;
pub mod reconciler;
pub mod stream;

pub use archive::{ArchiveError, ExportArtifact, HistoryArchive, WorkflowHistoryRecord};
pub use latest::LatestWorkflowData;
pub use monitor::WorkflowMonitor;
pub use poller::{Poller, PollingHandle};
pub use reconciler::{NodeChange, Reconciler, UpdateKind, WorkflowUpdate};
pub use stream::ResponseStream;
