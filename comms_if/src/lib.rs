//! # Communications interface crate.
//!
//! Provides all common communications interfaces for the software.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Data exchanged between the actuator process and its peer
pub mod eqpt;

/// Network module
pub mod net;
