//! Assignment rotation.
//!
//! Strategies are a closed set dispatched by one pure function.

pub mod resolver;
