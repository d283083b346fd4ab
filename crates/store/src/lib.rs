//! `flowdeck-store` -- durable key/value storage.
//!
//! A small local persistent store in the spirit of a browser's
//! `localStorage`: string values under fixed string keys, written
//! synchronously.  [`FileStore`] keeps one file per key under a data
//! directory; [`MemoryStore`] backs tests and ephemeral sessions.
//!
//! Callers that persist JSON go through [`load_json`] / [`save_json`],
//! which never fail: read errors and corrupt documents are logged and
//! treated as absent, write errors are logged and reported as `false`.

pub mod file;
pub mod json;
pub mod keys;
pub mod kv;
pub mod preferences;

pub use file::FileStore;
pub use json::{load_json, remove_key, save_json};
pub use kv::{KvStore, MemoryStore, StoreError};
pub use preferences::PanelPreferences;
