//! Logging setup and lifecycle journaling for skiff.

mod logger;
pub use logger::*;

#[cfg(feature = "subscriber")]
mod subscriber;
#[cfg(feature = "subscriber")]
pub use subscriber::*;
