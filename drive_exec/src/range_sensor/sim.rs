//! Simulated range sensor

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{RangeSensor, SensorError};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct SimRangeSensor {
    range: SimRange,
    threshold_m: f64,
}

/// Shared handle setting what a [`SimRangeSensor`] reads.
#[derive(Clone)]
pub struct SimRange {
    inner: Arc<Mutex<SimRangeInner>>,
}

struct SimRangeInner {
    distance_m: f64,
    fault: bool,
    num_reads: u64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimRangeSensor {
    pub fn new(range: SimRange, threshold_m: f64) -> Self {
        Self { range, threshold_m }
    }
}

impl RangeSensor for SimRangeSensor {
    fn distance_m(&mut self) -> Result<f64, SensorError> {
        let mut inner = self.range.lock();
        inner.num_reads += 1;

        if inner.fault {
            Err(SensorError::SimFault)
        } else {
            Ok(inner.distance_m)
        }
    }

    fn threshold_m(&self) -> f64 {
        self.threshold_m
    }
}

impl SimRange {
    pub fn new(distance_m: f64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SimRangeInner {
                distance_m,
                fault: false,
                num_reads: 0,
            })),
        }
    }

    pub fn set_distance_m(&self, distance_m: f64) {
        self.lock().distance_m = distance_m;
    }

    /// While set every read fails with [`SensorError::SimFault`].
    pub fn set_fault(&self, fault: bool) {
        self.lock().fault = fault;
    }

    /// Number of reads attempted, including failed ones.
    pub fn num_reads(&self) -> u64 {
        self.lock().num_reads
    }

    fn lock(&self) -> MutexGuard<'_, SimRangeInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
