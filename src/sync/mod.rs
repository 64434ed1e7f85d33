//! Client-side synchronization of the site document.
//!
//! # Data Flow
//! ```text
//! source.rs (defaults, remote)  ─┐
//! local.rs (override slot)      ─┼→ loader.rs (compose, migrate)
//!                                └→ store.rs (session state, debounced local save)
//!                                     → remote.rs (publish)
//!                                     → chrome.rs (page chrome for presentation)
//! ```

pub mod chrome;
pub mod loader;
pub mod local;
pub mod remote;
pub mod source;
pub mod store;

pub use chrome::PageChrome;
pub use loader::{ConfigLoader, Mode};
pub use local::{FileLocalStore, LocalStore, LocalStoreError, MemoryLocalStore};
pub use remote::{PublishError, RemotePublisher};
pub use source::{ConfigSource, FileSource, HttpSource, SourceError};
pub use store::{ConfigStore, Phase, SaveStatus, Snapshot, StoreError};
