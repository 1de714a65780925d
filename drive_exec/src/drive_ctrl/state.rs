//! Shared drive state

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

// Internal
use super::{calc_dems, DriveActuator};
use crate::motor_driver::{MotorDriver, MotorError};
use comms_if::{
    eqpt::drive::DriveDems,
    tc::{Mnvr, SpeedLevel, Tc},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The commanded state of the drive.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct DriveState {
    /// The manouvre currently being executed
    pub active_mnvr: Mnvr,

    pub speed_level: SpeedLevel,

    /// True if the obstacle monitor stopped the rover and no manouvre has been accepted since
    pub obstacle_override: bool,
}

/// Read only snapshot of drive control for telemetry.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriveStatus {
    #[serde(flatten)]
    pub state: DriveState,

    /// Demands last written to the motors
    pub last_applied: DriveDems,

    /// Number of TCs accepted since startup
    pub num_tcs_accepted: u64,
}

/// Drive control.
///
/// Holds the drive state and the actuator behind one lock, so every change of state and the motor
/// writes that follow from it happen as a single step. Both the TC connections and the obstacle
/// monitor go through here.
pub struct DriveCtrl {
    inner: Mutex<Inner>,
}

/// Forces the rover to stop when dropped.
///
/// Held by the executable's main function so that every way out of it, including an error or a
/// panic, leaves the motors stopped.
pub struct SafeStopGuard {
    ctrl: Arc<DriveCtrl>,
}

struct Inner {
    state: DriveState,
    actuator: DriveActuator,
    num_tcs_accepted: u64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl DriveCtrl {
    /// Create drive control, taking ownership of the motor driver.
    ///
    /// The motors are stopped immediately, failing to do so is an error.
    pub fn new(
        driver: Box<dyn MotorDriver>,
        default_speed: SpeedLevel,
    ) -> Result<Self, MotorError> {
        let mut actuator = DriveActuator::new(driver);
        actuator.apply(DriveDems::STOP)?;

        Ok(Self {
            inner: Mutex::new(Inner {
                state: DriveState {
                    active_mnvr: Mnvr::Stop,
                    speed_level: default_speed,
                    obstacle_override: false,
                },
                actuator,
                num_tcs_accepted: 0,
            }),
        })
    }

    /// Execute a telecommand, returning the resulting state.
    ///
    /// The state is always updated. If the motors cannot be written the error is returned, and the
    /// state is left as commanded so that the next write brings the motors in line with it.
    pub fn exec(&self, tc: Tc) -> Result<DriveState, MotorError> {
        let mut inner = self.lock();
        inner.num_tcs_accepted += 1;

        let actuate = match tc {
            Tc::Mnvr(m) => {
                inner.state.active_mnvr = m;
                inner.state.obstacle_override = false;
                true
            }
            Tc::SetSpeed(s) => {
                inner.state.speed_level = s;
                inner.state.active_mnvr.is_motion()
            }
        };

        debug!("Executing {}, new state: {:?}", tc, inner.state);

        if actuate {
            inner.actuate()?;
        }

        Ok(inner.state)
    }

    /// Stop the rover if, and only if, the active manouvre is still a guarded one.
    ///
    /// Returns the manouvre which was stopped. The check and the stop are made under the same
    /// lock, so a manouvre accepted after the caller last looked at the state is never stopped.
    pub fn stop_if_guarded(&self) -> Option<Mnvr> {
        let mut inner = self.lock();

        let mnvr = inner.state.active_mnvr;
        if !mnvr.is_guarded() {
            return None;
        }

        inner.state.active_mnvr = Mnvr::Stop;
        inner.state.obstacle_override = true;

        if let Err(e) = inner.actuate() {
            error!("Could not stop the motors on obstacle override: {}", e);
        }

        Some(mnvr)
    }

    /// Stop the motors, regardless of the active manouvre.
    pub fn make_safe(&self) {
        let mut inner = self.lock();
        inner.state.active_mnvr = Mnvr::Stop;

        match inner.actuate() {
            Ok(_) => info!("Drive made safe"),
            Err(e) => error!("Could not make the drive safe: {}", e),
        }
    }

    pub fn state(&self) -> DriveState {
        self.lock().state
    }

    pub fn active_mnvr(&self) -> Mnvr {
        self.lock().state.active_mnvr
    }

    pub fn status(&self) -> DriveStatus {
        let inner = self.lock();

        DriveStatus {
            state: inner.state,
            last_applied: inner.actuator.last_applied().unwrap_or(DriveDems::STOP),
            num_tcs_accepted: inner.num_tcs_accepted,
        }
    }

    /// The state is only ever written as a whole, so a poisoned lock still holds a valid record.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Inner {
    /// Write the demands for the current state to the motors.
    fn actuate(&mut self) -> Result<DriveDems, MotorError> {
        let dems = calc_dems(self.state.active_mnvr, self.state.speed_level);

        self.actuator.apply(dems).map_err(|e| {
            error!("Motor write failed: {}", e);
            e
        })
    }
}

impl SafeStopGuard {
    pub fn new(ctrl: Arc<DriveCtrl>) -> Self {
        Self { ctrl }
    }
}

impl Drop for SafeStopGuard {
    fn drop(&mut self) {
        self.ctrl.make_safe();
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::motor_driver::{SimMotorDriver, SimMotorLog};
    use comms_if::eqpt::drive::WheelDir;

    fn sim_ctrl() -> (DriveCtrl, SimMotorLog) {
        let log = SimMotorLog::default();
        let ctrl = DriveCtrl::new(
            Box::new(SimMotorDriver::new(log.clone())),
            SpeedLevel::Medium,
        )
        .unwrap();

        (ctrl, log)
    }

    #[test]
    fn test_starts_stopped() {
        let (ctrl, log) = sim_ctrl();

        assert_eq!(ctrl.active_mnvr(), Mnvr::Stop);
        assert_eq!(log.current(), Some(DriveDems::STOP));
        assert_eq!(ctrl.status().num_tcs_accepted, 0);
    }

    #[test]
    fn test_last_command_wins() {
        let (ctrl, log) = sim_ctrl();

        ctrl.exec(Tc::Mnvr(Mnvr::Forward)).unwrap();
        ctrl.exec(Tc::Mnvr(Mnvr::Left)).unwrap();
        ctrl.exec(Tc::Mnvr(Mnvr::Backward)).unwrap();

        assert_eq!(ctrl.active_mnvr(), Mnvr::Backward);
        assert_eq!(
            log.current(),
            Some(calc_dems(Mnvr::Backward, SpeedLevel::Medium))
        );
        assert_eq!(ctrl.status().last_applied, log.current().unwrap());
    }

    #[test]
    fn test_speed_change_reapplies_motion() {
        let (ctrl, log) = sim_ctrl();

        ctrl.exec(Tc::Mnvr(Mnvr::Forward)).unwrap();
        let state = ctrl.exec(Tc::SetSpeed(SpeedLevel::High)).unwrap();

        assert_eq!(state.active_mnvr, Mnvr::Forward);
        assert_eq!(state.speed_level, SpeedLevel::High);

        let dems = log.current().unwrap();
        assert_eq!(dems.left, dems.right);
        assert_eq!(dems.left.dir, WheelDir::Forward);
        assert_eq!(dems.left.duty_pct, 75.0);
    }

    #[test]
    fn test_speed_change_while_stopped() {
        let (ctrl, log) = sim_ctrl();
        let writes_before = log.num_writes();

        let state = ctrl.exec(Tc::SetSpeed(SpeedLevel::Low)).unwrap();

        assert_eq!(state.speed_level, SpeedLevel::Low);
        assert_eq!(state.active_mnvr, Mnvr::Stop);
        assert_eq!(log.num_writes(), writes_before);
        assert_eq!(ctrl.status().num_tcs_accepted, 1);
    }

    #[test]
    fn test_stop_if_guarded() {
        let (ctrl, log) = sim_ctrl();

        ctrl.exec(Tc::Mnvr(Mnvr::TurnRightForward)).unwrap();
        assert_eq!(ctrl.stop_if_guarded(), Some(Mnvr::TurnRightForward));

        let state = ctrl.state();
        assert_eq!(state.active_mnvr, Mnvr::Stop);
        assert!(state.obstacle_override);
        assert_eq!(log.current(), Some(DriveDems::STOP));

        // Nothing left to stop
        assert_eq!(ctrl.stop_if_guarded(), None);

        // A new manouvre clears the override
        ctrl.exec(Tc::Mnvr(Mnvr::Forward)).unwrap();
        assert!(!ctrl.state().obstacle_override);
    }

    #[test]
    fn test_stop_if_guarded_ignores_unguarded() {
        let (ctrl, log) = sim_ctrl();

        for mnvr in Mnvr::ALL.iter().filter(|m| !m.is_guarded()) {
            ctrl.exec(Tc::Mnvr(*mnvr)).unwrap();
            let dems = log.current();

            assert_eq!(ctrl.stop_if_guarded(), None);
            assert_eq!(ctrl.active_mnvr(), *mnvr);
            assert!(!ctrl.state().obstacle_override);
            assert_eq!(log.current(), dems);
        }
    }

    #[test]
    fn test_speed_does_not_clear_override() {
        let (ctrl, _log) = sim_ctrl();

        ctrl.exec(Tc::Mnvr(Mnvr::Forward)).unwrap();
        ctrl.stop_if_guarded();
        ctrl.exec(Tc::SetSpeed(SpeedLevel::Low)).unwrap();

        let state = ctrl.state();
        assert!(state.obstacle_override);
        assert_eq!(state.active_mnvr, Mnvr::Stop);
    }

    #[test]
    fn test_motor_failure_keeps_state() {
        let (ctrl, log) = sim_ctrl();

        log.set_fail_writes(true);
        assert!(ctrl.exec(Tc::Mnvr(Mnvr::Backward)).is_err());

        let status = ctrl.status();
        assert_eq!(status.state.active_mnvr, Mnvr::Backward);
        assert_eq!(status.last_applied, DriveDems::STOP);
    }

    #[test]
    fn test_safe_stop_guard() {
        let log = SimMotorLog::default();
        let ctrl = Arc::new(
            DriveCtrl::new(
                Box::new(SimMotorDriver::new(log.clone())),
                SpeedLevel::High,
            )
            .unwrap(),
        );

        {
            let _guard = SafeStopGuard::new(ctrl.clone());
            ctrl.exec(Tc::Mnvr(Mnvr::Forward)).unwrap();
            assert!(!log.current().unwrap().is_stop());
        }

        assert_eq!(ctrl.active_mnvr(), Mnvr::Stop);
        assert_eq!(log.current(), Some(DriveDems::STOP));
    }

    #[test]
    fn test_status_serialisation() {
        let (ctrl, _log) = sim_ctrl();
        ctrl.exec(Tc::Mnvr(Mnvr::TurnLeftBackward)).unwrap();

        let val = serde_json::to_value(ctrl.status()).unwrap();
        assert_eq!(val["active_mnvr"], "turn_left_backward");
        assert_eq!(val["speed_level"], "medium");
        assert_eq!(val["obstacle_override"], false);
        assert_eq!(val["num_tcs_accepted"], 1);
    }
}
