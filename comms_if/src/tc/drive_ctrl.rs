//! # Drive control telecommands

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::fmt;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A manouvre that can be completed by drive control.
///
/// All turns are made by driving the left and right wheel groups in opposite directions, the
/// arcing turns share their wheel pattern with a pivot turn.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mnvr {
    /// Both groups forwards.
    Forward,

    /// Both groups in reverse.
    Backward,

    /// Pivot turn to the left.
    Left,

    /// Pivot turn to the right.
    Right,

    /// Bring the rover to a stop, both groups neutral.
    Stop,

    TurnLeftForward,
    TurnRightForward,
    TurnLeftBackward,
    TurnRightBackward,
}

/// Preset drive speeds, applied as a uniform duty cycle to both wheel groups.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedLevel {
    Low,
    Medium,
    High,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Mnvr {
    pub const ALL: [Mnvr; 9] = [
        Mnvr::Forward,
        Mnvr::Backward,
        Mnvr::Left,
        Mnvr::Right,
        Mnvr::Stop,
        Mnvr::TurnLeftForward,
        Mnvr::TurnRightForward,
        Mnvr::TurnLeftBackward,
        Mnvr::TurnRightBackward,
    ];

    /// True for manouvres which advance the front of the rover, and which must therefore be
    /// interrupted if an obstacle is detected ahead.
    pub fn is_guarded(&self) -> bool {
        matches!(
            self,
            Mnvr::Forward | Mnvr::TurnLeftForward | Mnvr::TurnRightForward
        )
    }

    /// True for anything that drives the wheels.
    pub fn is_motion(&self) -> bool {
        !matches!(self, Mnvr::Stop)
    }

    /// The wire token for this manouvre.
    pub fn token(&self) -> &'static str {
        match self {
            Mnvr::Forward => "forward",
            Mnvr::Backward => "backward",
            Mnvr::Left => "left",
            Mnvr::Right => "right",
            Mnvr::Stop => "stop",
            Mnvr::TurnLeftForward => "turn_left_forward",
            Mnvr::TurnRightForward => "turn_right_forward",
            Mnvr::TurnLeftBackward => "turn_left_backward",
            Mnvr::TurnRightBackward => "turn_right_backward",
        }
    }
}

impl SpeedLevel {
    pub const ALL: [SpeedLevel; 3] = [SpeedLevel::Low, SpeedLevel::Medium, SpeedLevel::High];

    /// Duty cycle applied to both wheel groups at this speed.
    ///
    /// Units: percent
    pub fn duty_pct(&self) -> f64 {
        match self {
            SpeedLevel::Low => 35.0,
            SpeedLevel::Medium => 50.0,
            SpeedLevel::High => 75.0,
        }
    }

    /// The wire token for this speed level.
    pub fn token(&self) -> &'static str {
        match self {
            SpeedLevel::Low => "low",
            SpeedLevel::Medium => "medium",
            SpeedLevel::High => "high",
        }
    }
}

impl Default for SpeedLevel {
    fn default() -> Self {
        SpeedLevel::Medium
    }
}

impl fmt::Display for Mnvr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl fmt::Display for SpeedLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_guarded_mnvrs() {
        let guarded: Vec<Mnvr> = Mnvr::ALL.iter().copied().filter(Mnvr::is_guarded).collect();

        assert_eq!(
            guarded,
            vec![Mnvr::Forward, Mnvr::TurnLeftForward, Mnvr::TurnRightForward]
        );
    }

    #[test]
    fn test_speed_duty() {
        assert_eq!(SpeedLevel::Low.duty_pct(), 35.0);
        assert_eq!(SpeedLevel::Medium.duty_pct(), 50.0);
        assert_eq!(SpeedLevel::High.duty_pct(), 75.0);
        assert_eq!(SpeedLevel::default(), SpeedLevel::Medium);
    }

    #[test]
    fn test_serde_matches_token() {
        for m in Mnvr::ALL.iter() {
            assert_eq!(
                serde_json::to_string(m).unwrap(),
                format!("\"{}\"", m.token())
            );
        }
        for s in SpeedLevel::ALL.iter() {
            assert_eq!(
                serde_json::to_string(s).unwrap(),
                format!("\"{}\"", s.token())
            );
        }
    }
}
