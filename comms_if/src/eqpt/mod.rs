//! # Equipment Interface
//!
//! This module defines the interface structures which are exchanged between the actuator control
//! process and its peer.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod exo;
