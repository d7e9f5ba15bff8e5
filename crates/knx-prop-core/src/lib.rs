//! Core library for KNX property access.
//!
//! Holds the property access engine shared by the `knx-prop` tools: adapter
//! selection and session lifecycle, the property definition catalog, the
//! command interpreter with its value codec, and the passive bus monitor.
//! Transports are injected through the traits in [`device`].

pub mod device;
pub mod error;
pub mod monitor;
pub mod protocol;
pub mod session;
pub mod sink;
pub mod storage;
pub mod types;

pub use error::{CoreError, Result};
pub use session::{Completion, Session};
pub use sink::{Severity, Sink};
