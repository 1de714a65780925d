//! Simulated motor driver

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use comms_if::eqpt::drive::{DriveDems, WheelDems, WheelGroup};
use log::trace;

use super::{MotorDriver, MotorError};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of writes kept in the log. Older writes are dropped but still counted.
const MAX_LOGGED_WRITES: usize = 4096;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Motor driver that drives nothing, it only records what it was asked to do.
pub struct SimMotorDriver {
    log: SimMotorLog,
}

/// Shared handle onto the writes made to a [`SimMotorDriver`].
///
/// Clones refer to the same log, so a handle can be kept by a test while the driver itself is
/// owned by drive control.
#[derive(Clone, Default)]
pub struct SimMotorLog {
    inner: Arc<Mutex<LogInner>>,
}

#[derive(Default)]
struct LogInner {
    writes: VecDeque<(WheelGroup, WheelDems)>,
    num_writes: u64,
    current: Option<DriveDems>,
    fail_writes: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimMotorDriver {
    pub fn new(log: SimMotorLog) -> Self {
        Self { log }
    }
}

impl MotorDriver for SimMotorDriver {
    fn set_group(&mut self, group: WheelGroup, dems: WheelDems) -> Result<(), MotorError> {
        let mut inner = self.log.lock();

        if inner.fail_writes {
            return Err(MotorError::SimFailure(group));
        }

        trace!("Sim motors: {:?} <- {:?}", group, dems);

        if inner.writes.len() >= MAX_LOGGED_WRITES {
            inner.writes.pop_front();
        }
        inner.writes.push_back((group, dems));
        inner.num_writes += 1;

        let current = inner.current.get_or_insert(DriveDems::STOP);
        match group {
            WheelGroup::Left => current.left = dems,
            WheelGroup::Right => current.right = dems,
        }

        Ok(())
    }
}

impl SimMotorLog {
    /// The most recent writes, oldest first.
    pub fn writes(&self) -> Vec<(WheelGroup, WheelDems)> {
        self.lock().writes.iter().copied().collect()
    }

    /// Total number of successful writes made.
    pub fn num_writes(&self) -> u64 {
        self.lock().num_writes
    }

    /// The levels currently set on the simulated outputs, or `None` if nothing has been written.
    pub fn current(&self) -> Option<DriveDems> {
        self.lock().current
    }

    /// If set all subsequent writes fail with [`MotorError::SimFailure`].
    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    fn lock(&self) -> MutexGuard<'_, LogInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
