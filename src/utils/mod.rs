//! The `utils` module provides definitions shared across the `shelterfeed`
//! application: the error taxonomy used by every layer and the tracing setup.

pub mod error;
pub mod logging;

#[cfg(test)]
mod tests;
