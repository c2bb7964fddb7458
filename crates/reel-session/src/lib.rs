//! In-process run registry and progress channel.
//!
//! This crate provides:
//! - `SessionRegistry`: the table of live runs, with retention-based expiry
//!   and a cooperative cancellation flag per run
//! - `ProgressChannel`: a last-value cache plus a single live subscriber per run

pub mod channel;
pub mod error;
pub mod registry;

pub use channel::{ProgressChannel, ProgressReceiver, ProgressSender, SubscriberId};
pub use error::{SessionError, SessionResult};
pub use registry::{CancellationFlag, RegistryConfig, SessionRegistry};
