//! # Drive library.
//!
//! This library allows the executable, its tests and benchmarks to access items defined inside the
//! drive crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Drive control - shared drive state, converts manouvres into wheel group demands
pub mod drive_ctrl;

/// Motor drivers - write wheel group demands to the motor boards
pub mod motor_driver;

/// Obstacle monitor - stops forward motion when an obstacle is close
pub mod obstacle_monitor;

/// Executable parameters
pub mod params;

/// Range sensors - measure the distance to obstacles ahead of the rover
pub mod range_sensor;

/// Telecommand processor - parses and executes TCs
pub mod tc_processor;

/// Telecommand server - accepts TC connections from clients
pub mod tc_server;

/// Telemetry server - publishes the rover's status
pub mod tm_server;
