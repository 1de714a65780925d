//! # Communications interface crate.
//!
//! Provides the common communications interfaces shared by the rover executable and its clients.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Telecommands sent to the rover by an operator
pub mod tc;

/// Demand definitions for equipment (like the drive motors)
pub mod eqpt;

/// Network module
pub mod net;
