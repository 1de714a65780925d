//! # Obstacle monitor
//!
//! Background loop which stops forward motion when the range sensor sees an obstacle. The monitor
//! only ever stops the rover, it never starts a manouvre of its own.
//!
//! Each tick:
//! - If the active manouvre is not guarded, nothing is done and the sensor is not read.
//! - Otherwise the sensor is read outside of the drive control lock. If the reading is at or
//!   below the threshold [`DriveCtrl::stop_if_guarded`] is called, which re-checks the manouvre
//!   under the lock before stopping.
//!
//! The monitor stays `Overridden` until drive control accepts a new manouvre.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, PoisonError,
};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

// Internal
use crate::{
    drive_ctrl::DriveCtrl,
    params::MonitorParams,
    range_sensor::{RangeReport, RangeSensor, SensorError},
};
use comms_if::tc::Mnvr;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct ObstacleMonitor {
    ctrl: Arc<DriveCtrl>,

    sensor: Box<dyn RangeSensor>,

    period: Duration,

    fault_policy: SensorFaultPolicy,

    report: MonitorReport,

    report_handle: MonitorReportHandle,
}

/// Status of the monitor for telemetry.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorReport {
    pub state: MonitorState,

    /// The last successful sensor reading
    pub last_range: Option<RangeReport>,

    /// Number of times the rover has been stopped
    pub num_overrides: u64,

    /// Number of failed sensor reads
    pub num_sensor_faults: u64,
}

/// Shared read only view of the monitor's latest [`MonitorReport`].
#[derive(Clone)]
pub struct MonitorReportHandle {
    inner: Arc<Mutex<MonitorReport>>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorState {
    Idle,
    Overridden,
}

/// What to do when the sensor cannot be read while a guarded manouvre is active.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorFaultPolicy {
    /// Carry on as if the way is clear
    FailOpen,

    /// Stop as if an obstacle had been seen
    FailClosed,
}

/// Result of a single monitor tick.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TickOutcome {
    /// The active manouvre isn't guarded, the sensor was not read
    Unguarded,

    /// No obstacle
    Clear,

    /// The given manouvre was stopped
    Overridden(Mnvr),

    /// An obstacle was seen but the manouvre changed to an unguarded one before it could be
    /// stopped
    NoLongerGuarded,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ObstacleMonitor {
    pub fn new(ctrl: Arc<DriveCtrl>, sensor: Box<dyn RangeSensor>, params: &MonitorParams) -> Self {
        let report = MonitorReport {
            state: MonitorState::Idle,
            last_range: None,
            num_overrides: 0,
            num_sensor_faults: 0,
        };

        Self {
            ctrl,
            sensor,
            period: Duration::from_secs_f64(params.period_s),
            fault_policy: params.sensor_fault_policy,
            report,
            report_handle: MonitorReportHandle {
                inner: Arc::new(Mutex::new(report)),
            },
        }
    }

    /// Get a handle through which the monitor's report can be read from other threads.
    pub fn report_handle(&self) -> MonitorReportHandle {
        self.report_handle.clone()
    }

    /// Run a single monitor cycle.
    pub fn tick(&mut self) -> TickOutcome {
        let outcome = self.check();
        self.report_handle.set(self.report);
        outcome
    }

    /// Run the monitor until `running` is cleared.
    pub fn run(&mut self, running: &AtomicBool) {
        info!(
            "Obstacle monitor running every {:.3} s, threshold {:.2} m, {:?} on sensor faults",
            self.period.as_secs_f64(),
            self.sensor.threshold_m(),
            self.fault_policy
        );

        while running.load(Ordering::Relaxed) {
            let cycle_start = Instant::now();

            self.tick();

            match self.period.checked_sub(cycle_start.elapsed()) {
                Some(d) => thread::sleep(d),
                None => warn!(
                    "Obstacle monitor overran its period ({:.3} s)",
                    cycle_start.elapsed().as_secs_f64()
                ),
            }
        }

        info!("Obstacle monitor stopped");
    }

    /// Spawn the monitor on its own thread.
    pub fn spawn(mut self, running: Arc<AtomicBool>) -> std::io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("obstacle-monitor".into())
            .spawn(move || self.run(&running))
    }

    fn check(&mut self) -> TickOutcome {
        // The override lasts until a new manouvre has been accepted
        if self.report.state == MonitorState::Overridden && !self.ctrl.state().obstacle_override {
            debug!("New manouvre accepted, obstacle monitor back to idle");
            self.report.state = MonitorState::Idle;
        }

        let mnvr = self.ctrl.active_mnvr();
        if !mnvr.is_guarded() {
            return TickOutcome::Unguarded;
        }

        let threshold_m = self.sensor.threshold_m();

        // NaN compares false against the threshold so must not be taken as a clear path
        let reading = self.sensor.distance_m().and_then(|d| {
            if d.is_finite() && d >= 0.0 {
                Ok(d)
            } else {
                Err(SensorError::InvalidReading(d))
            }
        });

        let (obstacle, distance_m) = match reading {
            Ok(d) => {
                self.report.last_range = Some(RangeReport::new(d, threshold_m));
                (d <= threshold_m, Some(d))
            }
            Err(e) => {
                self.report.num_sensor_faults += 1;
                warn!(
                    "Range sensor read failed during {}: {} ({:?})",
                    mnvr, e, self.fault_policy
                );
                (self.fault_policy == SensorFaultPolicy::FailClosed, None)
            }
        };

        if !obstacle {
            return TickOutcome::Clear;
        }

        match self.ctrl.stop_if_guarded() {
            Some(stopped) => {
                self.report.state = MonitorState::Overridden;
                self.report.num_overrides += 1;

                match distance_m {
                    Some(d) => warn!(
                        "Obstacle override: {} stopped, obstacle at {:.3} m (threshold {:.3} m)",
                        stopped, d, threshold_m
                    ),
                    None => warn!("Obstacle override: {} stopped, sensor unavailable", stopped),
                }

                TickOutcome::Overridden(stopped)
            }
            None => {
                debug!("Obstacle seen but {} is no longer active", mnvr);
                TickOutcome::NoLongerGuarded
            }
        }
    }
}

impl MonitorReportHandle {
    pub fn get(&self) -> MonitorReport {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set(&self, report: MonitorReport) {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = report;
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        motor_driver::{SimMotorDriver, SimMotorLog},
        range_sensor::{SimRange, SimRangeSensor},
    };
    use comms_if::{
        eqpt::drive::DriveDems,
        tc::{SpeedLevel, Tc},
    };

    fn setup(policy: SensorFaultPolicy) -> (Arc<DriveCtrl>, SimMotorLog, SimRange, ObstacleMonitor) {
        let log = SimMotorLog::default();
        let ctrl = Arc::new(
            DriveCtrl::new(
                Box::new(SimMotorDriver::new(log.clone())),
                SpeedLevel::Medium,
            )
            .unwrap(),
        );
        let range = SimRange::new(1.0);
        let params = MonitorParams {
            sensor_fault_policy: policy,
            ..Default::default()
        };
        let monitor = ObstacleMonitor::new(
            ctrl.clone(),
            Box::new(SimRangeSensor::new(range.clone(), params.threshold_m)),
            &params,
        );

        (ctrl, log, range, monitor)
    }

    #[test]
    fn test_override_guarded() {
        for mnvr in [Mnvr::Forward, Mnvr::TurnLeftForward, Mnvr::TurnRightForward] {
            let (ctrl, log, range, mut monitor) = setup(SensorFaultPolicy::FailOpen);

            ctrl.exec(Tc::Mnvr(mnvr)).unwrap();
            assert_eq!(monitor.tick(), TickOutcome::Clear);

            range.set_distance_m(0.2);
            assert_eq!(monitor.tick(), TickOutcome::Overridden(mnvr));

            let state = ctrl.state();
            assert_eq!(state.active_mnvr, Mnvr::Stop);
            assert!(state.obstacle_override);
            assert_eq!(log.current(), Some(DriveDems::STOP));

            let report = monitor.report_handle().get();
            assert_eq!(report.state, MonitorState::Overridden);
            assert_eq!(report.num_overrides, 1);
            assert!(report.last_range.is_some());
        }
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let (ctrl, _log, range, mut monitor) = setup(SensorFaultPolicy::FailOpen);

        ctrl.exec(Tc::Mnvr(Mnvr::Forward)).unwrap();
        range.set_distance_m(0.3);

        assert_eq!(monitor.tick(), TickOutcome::Overridden(Mnvr::Forward));
    }

    #[test]
    fn test_unguarded_never_overridden() {
        for mnvr in Mnvr::ALL.iter().filter(|m| !m.is_guarded()) {
            let (ctrl, log, range, mut monitor) = setup(SensorFaultPolicy::FailClosed);

            ctrl.exec(Tc::Mnvr(*mnvr)).unwrap();
            let dems = log.current();
            range.set_distance_m(0.05);

            for _ in 0..5 {
                assert_eq!(monitor.tick(), TickOutcome::Unguarded);
            }

            assert_eq!(ctrl.active_mnvr(), *mnvr);
            assert_eq!(log.current(), dems);
            assert_eq!(range.num_reads(), 0);
        }
    }

    #[test]
    fn test_returns_to_idle_on_new_mnvr() {
        let (ctrl, _log, range, mut monitor) = setup(SensorFaultPolicy::FailOpen);

        ctrl.exec(Tc::Mnvr(Mnvr::Forward)).unwrap();
        range.set_distance_m(0.1);
        monitor.tick();
        assert_eq!(monitor.report_handle().get().state, MonitorState::Overridden);

        // A speed change is not a new manouvre
        ctrl.exec(Tc::SetSpeed(SpeedLevel::High)).unwrap();
        monitor.tick();
        assert_eq!(monitor.report_handle().get().state, MonitorState::Overridden);

        ctrl.exec(Tc::Mnvr(Mnvr::Backward)).unwrap();
        assert_eq!(monitor.tick(), TickOutcome::Unguarded);
        assert_eq!(monitor.report_handle().get().state, MonitorState::Idle);
    }

    #[test]
    fn test_forward_again_is_stopped_again() {
        let (ctrl, _log, range, mut monitor) = setup(SensorFaultPolicy::FailOpen);
        range.set_distance_m(0.1);

        ctrl.exec(Tc::Mnvr(Mnvr::Forward)).unwrap();
        assert_eq!(monitor.tick(), TickOutcome::Overridden(Mnvr::Forward));

        ctrl.exec(Tc::Mnvr(Mnvr::Forward)).unwrap();
        assert_eq!(ctrl.active_mnvr(), Mnvr::Forward);
        assert_eq!(monitor.tick(), TickOutcome::Overridden(Mnvr::Forward));
        assert_eq!(monitor.report_handle().get().num_overrides, 2);
    }

    #[test]
    fn test_fault_policy() {
        let (ctrl, _log, range, mut monitor) = setup(SensorFaultPolicy::FailOpen);
        ctrl.exec(Tc::Mnvr(Mnvr::Forward)).unwrap();
        range.set_fault(true);

        assert_eq!(monitor.tick(), TickOutcome::Clear);
        assert_eq!(ctrl.active_mnvr(), Mnvr::Forward);
        assert_eq!(monitor.report_handle().get().num_sensor_faults, 1);

        let (ctrl, _log, range, mut monitor) = setup(SensorFaultPolicy::FailClosed);
        ctrl.exec(Tc::Mnvr(Mnvr::Forward)).unwrap();
        range.set_fault(true);

        assert_eq!(monitor.tick(), TickOutcome::Overridden(Mnvr::Forward));
        assert_eq!(ctrl.active_mnvr(), Mnvr::Stop);
    }

    #[test]
    fn test_invalid_reading_is_a_fault() {
        for d in [f64::NAN, f64::INFINITY, -0.5] {
            let (ctrl, _log, range, mut monitor) = setup(SensorFaultPolicy::FailClosed);
            ctrl.exec(Tc::Mnvr(Mnvr::Forward)).unwrap();
            range.set_distance_m(d);

            assert_eq!(monitor.tick(), TickOutcome::Overridden(Mnvr::Forward));
            assert_eq!(ctrl.active_mnvr(), Mnvr::Stop);

            let report = monitor.report_handle().get();
            assert_eq!(report.num_sensor_faults, 1);
            assert!(report.last_range.is_none());
        }

        let (ctrl, _log, range, mut monitor) = setup(SensorFaultPolicy::FailOpen);
        ctrl.exec(Tc::Mnvr(Mnvr::Forward)).unwrap();
        range.set_distance_m(f64::NAN);

        assert_eq!(monitor.tick(), TickOutcome::Clear);
        assert_eq!(ctrl.active_mnvr(), Mnvr::Forward);
        assert_eq!(monitor.report_handle().get().num_sensor_faults, 1);
    }

    /// Sensor which executes a TC while it is being read, standing in for a TC arriving between
    /// the monitor's check of the manouvre and its override.
    struct RacingSensor {
        ctrl: Arc<DriveCtrl>,
        tc: Tc,
    }

    impl RangeSensor for RacingSensor {
        fn distance_m(&mut self) -> Result<f64, SensorError> {
            self.ctrl.exec(self.tc).ok();
            Ok(0.05)
        }

        fn threshold_m(&self) -> f64 {
            0.3
        }
    }

    #[test]
    fn test_no_stale_override() {
        let (ctrl, log, _range, _monitor) = setup(SensorFaultPolicy::FailOpen);
        let mut monitor = ObstacleMonitor::new(
            ctrl.clone(),
            Box::new(RacingSensor {
                ctrl: ctrl.clone(),
                tc: Tc::Mnvr(Mnvr::Backward),
            }),
            &MonitorParams::default(),
        );

        ctrl.exec(Tc::Mnvr(Mnvr::Forward)).unwrap();
        assert_eq!(monitor.tick(), TickOutcome::NoLongerGuarded);

        assert_eq!(ctrl.active_mnvr(), Mnvr::Backward);
        assert!(!ctrl.state().obstacle_override);
        assert!(!log.current().unwrap().is_stop());
    }

    #[test]
    fn test_run_stops_with_flag() {
        let (ctrl, _log, range, monitor) = setup(SensorFaultPolicy::FailOpen);
        let running = Arc::new(AtomicBool::new(true));

        ctrl.exec(Tc::Mnvr(Mnvr::Forward)).unwrap();
        range.set_distance_m(0.1);

        let handle = monitor.spawn(running.clone()).unwrap();

        let start = Instant::now();
        while ctrl.active_mnvr() != Mnvr::Stop && start.elapsed() < Duration::from_secs(2) {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(ctrl.active_mnvr(), Mnvr::Stop);

        running.store(false, Ordering::Relaxed);
        handle.join().unwrap();
    }
}
