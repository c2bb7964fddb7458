//! Request handlers.

pub mod health;
pub mod progress;
pub mod runs;

pub use health::*;
pub use progress::*;
pub use runs::*;
