//! Domain Layer
//!
//! Core types and state for the synchronization client. Nothing in this
//! layer touches the network; the transport and API adapters live in
//! `infrastructure`.

/// Connection lifecycle state shared between the transport and observers.
pub mod connection;

/// Bounded FIFO log of received stream frames.
pub mod log;

/// Subscription intent tracking and replay bookkeeping.
pub mod subscription;

/// Token entities and the in-memory collection.
pub mod token;
