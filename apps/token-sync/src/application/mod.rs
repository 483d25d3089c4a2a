//! Application Layer
//!
//! Use-case orchestration between the transport and the domain. Ports
//! define what the layer needs from the outside world; the synchronizer
//! folds stream events into domain state through them.

/// Trait definitions for external dependencies
pub mod ports;
/// Event fold and snapshot refresh orchestration
pub mod sync;
