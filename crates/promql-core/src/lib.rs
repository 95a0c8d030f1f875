//! # PromQL Core
//!
//! Shared building blocks for the natural-language to PromQL service:
//! configuration, the error taxonomy, the [`QueryContext`] intermediate
//! representation, duration helpers, and request cancellation.

pub mod cancel;
pub mod config;
pub mod duration;
pub mod error;
pub mod types;

pub use cancel::{with_cancellation, Cancelled};
pub use config::*;
pub use duration::{format_duration, parse_duration, DurationError};
pub use error::{AppError, AppResult};
pub use types::*;

pub use tokio_util::sync::CancellationToken;
