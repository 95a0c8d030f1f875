//! REST handlers and routing

pub mod handlers;
pub mod router;
