//! # Drive control module
//!
//! Converts manouvre and speed commands into wheel group demands and keeps the shared drive state
//! that the TC connections and the obstacle monitor act on.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod actuator;
mod calc_dems;
mod state;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

pub use actuator::*;
pub use calc_dems::*;
pub use state::*;
