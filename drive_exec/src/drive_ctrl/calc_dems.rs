//! Manouvre to wheel group demand calculation

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    eqpt::drive::{DriveDems, WheelDems, WheelDir},
    tc::{Mnvr, SpeedLevel},
};

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Calculate the wheel group demands for a manouvre at the given speed.
///
/// Every motion manouvre drives both groups at the speed level's duty cycle, the direction of each
/// group decides the manouvre. Arcing turns share their pattern with the pivot turn of the same
/// hand, and the backward arcs mirror the forward ones.
pub fn calc_dems(mnvr: Mnvr, speed: SpeedLevel) -> DriveDems {
    use WheelDir::*;

    let (left, right) = match mnvr {
        Mnvr::Stop => return DriveDems::STOP,
        Mnvr::Forward => (Forward, Forward),
        Mnvr::Backward => (Reverse, Reverse),
        Mnvr::Left | Mnvr::TurnLeftForward => (Reverse, Forward),
        Mnvr::Right | Mnvr::TurnRightForward => (Forward, Reverse),
        Mnvr::TurnLeftBackward => (Forward, Reverse),
        Mnvr::TurnRightBackward => (Reverse, Forward),
    };

    let duty = speed.duty_pct();

    DriveDems {
        left: WheelDems::new(left, duty),
        right: WheelDems::new(right, duty),
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn dirs(mnvr: Mnvr) -> (WheelDir, WheelDir) {
        let d = calc_dems(mnvr, SpeedLevel::Medium);
        (d.left.dir, d.right.dir)
    }

    #[test]
    fn test_mapping_table() {
        use WheelDir::*;

        assert_eq!(dirs(Mnvr::Forward), (Forward, Forward));
        assert_eq!(dirs(Mnvr::Backward), (Reverse, Reverse));
        assert_eq!(dirs(Mnvr::Left), (Reverse, Forward));
        assert_eq!(dirs(Mnvr::TurnLeftForward), (Reverse, Forward));
        assert_eq!(dirs(Mnvr::Right), (Forward, Reverse));
        assert_eq!(dirs(Mnvr::TurnRightForward), (Forward, Reverse));
        assert_eq!(dirs(Mnvr::TurnLeftBackward), (Forward, Reverse));
        assert_eq!(dirs(Mnvr::TurnRightBackward), (Reverse, Forward));
        assert_eq!(dirs(Mnvr::Stop), (Neutral, Neutral));
    }

    #[test]
    fn test_duty_follows_speed() {
        for speed in SpeedLevel::ALL.iter() {
            for mnvr in Mnvr::ALL.iter() {
                let dems = calc_dems(*mnvr, *speed);

                if mnvr.is_motion() {
                    assert_eq!(dems.left.duty_pct, speed.duty_pct());
                    assert_eq!(dems.right.duty_pct, speed.duty_pct());
                } else {
                    assert_eq!(dems, DriveDems::STOP);
                }
            }
        }
    }

    #[test]
    fn test_deterministic() {
        for mnvr in Mnvr::ALL.iter() {
            assert_eq!(
                calc_dems(*mnvr, SpeedLevel::High),
                calc_dems(*mnvr, SpeedLevel::High)
            );
        }
    }
}
