//! `flowdeck-client` -- backend collaborator for the workflow client.
//!
//! [`WorkflowApi`] speaks the backend's REST contract and implements the
//! [`StateSource`](flowdeck_core::StateSource) seam consumed by the sync
//! engine.  [`IdentityManager`] and [`ChatSession`] sit on top of the
//! [`AgentBackend`] trait so they can be driven by fakes in tests.

pub mod api;
pub mod catalog;
pub mod chat;
pub mod config;
pub mod identity;

pub use api::{AgentBackend, ApiError, ChatReply, SessionGrant, UserGrant, WorkflowApi};
pub use catalog::{Agent, Tool};
pub use chat::{ChatError, ChatSession};
pub use config::ClientConfig;
pub use identity::IdentityManager;
