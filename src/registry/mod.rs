//! Stream registry for publish admission
//!
//! The registry tracks which stream keys are publishing, enforces the stream
//! capacity, and keeps disconnected password-protected keys reserved for a
//! grace period so only their owner can reclaim them.
//!
//! # Key lifecycle
//!
//! ```text
//!                register                     unregister
//!   Absent ───────────────────► Active ──────────────────────► Absent
//!                                 ▲  │        (no password)
//!                   right password│  │ unregister
//!            or grace has expired │  ▼ (protected or password set)
//!                               Inactive ──── grace expires ───► reclaimable
//!                                                               by anyone
//!                                                          (unless protected)
//! ```
//!
//! Expiry is evaluated lazily on the next register/unregister. There is no
//! background sweep.
//!
//! Every accepted change is broadcast as a [`RegistryEvent`] carrying a
//! snapshot of the listed streams.

pub mod config;
pub mod entry;
pub mod error;
pub mod event;
pub mod store;

pub use config::RegistryConfig;
pub use entry::{StreamEntry, StreamOptions};
pub use error::RegistryError;
pub use event::{EventKind, RegistryEvent, StreamSummary};
pub use store::{StreamRegistry, Unregistered};
