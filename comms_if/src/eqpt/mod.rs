//! # Equipment Interface
//!
//! This module defines the interface structures which are passed to equipment drivers and
//! published in telemetry.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod drive;
