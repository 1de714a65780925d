//! # Telecommand module
//!
//! A telecommand (TC) is an instruction sent to the rover by the operator. On the wire a TC is a
//! JSON object with a single string field, for example `{"command": "forward"}`. The command token
//! is case-insensitive and surrounding whitespace is ignored.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod drive_ctrl;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{fmt, str::FromStr};
use thiserror::Error;

// Internal
pub use drive_ctrl::{Mnvr, SpeedLevel};

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// A decoded telecommand.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum Tc {
    /// Execute a manouvre, replacing the active one.
    Mnvr(Mnvr),

    /// Change the speed level. If the rover is moving the new speed is applied immediately.
    SetSpeed(SpeedLevel),
}

/// A telecommand message as it is sent over the wire.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct TcMessage {
    /// The command token, see [`Tc::token`]
    pub command: String,
}

/// Response sent back to the client for each message it sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TcResponse {
    /// The TC was accepted and executed
    Success { command: String },

    /// The message was dropped
    Error { error: String },
}

// ------------------------------------------------------------------------------------------------
// ENUMERATIONS
// ------------------------------------------------------------------------------------------------

/// Possible parsing errors.
#[derive(Debug, Error)]
pub enum TcParseError {
    #[error("Message is not valid JSON: {0}")]
    InvalidJson(serde_json::Error),

    #[error("Message exceeded {0} bytes without forming a complete JSON value")]
    TooLong(usize),

    #[error("Message is not a JSON object")]
    NotAnObject,

    #[error("Message does not have a string \"command\" field: {0}")]
    MissingCommand(serde_json::Error),

    #[error("\"{0}\" is not a recognised command")]
    UnknownCommand(String),
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl Tc {
    /// Parse a TC from its command token.
    pub fn from_token(token: &str) -> Result<Self, TcParseError> {
        let token = token.trim().to_lowercase();

        let tc = match token.as_str() {
            "low" => Tc::SetSpeed(SpeedLevel::Low),
            "medium" => Tc::SetSpeed(SpeedLevel::Medium),
            "high" => Tc::SetSpeed(SpeedLevel::High),
            t => match Mnvr::ALL.iter().find(|m| m.token() == t) {
                Some(m) => Tc::Mnvr(*m),
                None => return Err(TcParseError::UnknownCommand(token)),
            },
        };

        Ok(tc)
    }

    /// The wire token for this TC.
    pub fn token(&self) -> &'static str {
        match self {
            Tc::Mnvr(m) => m.token(),
            Tc::SetSpeed(s) => s.token(),
        }
    }
}

impl FromStr for Tc {
    type Err = TcParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tc::from_token(s)
    }
}

impl fmt::Display for Tc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl TcMessage {
    pub fn new<S: Into<String>>(command: S) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// Decode a message from an already parsed JSON value.
    ///
    /// The value must be an object, fields other than `command` are ignored.
    pub fn from_value(val: Value) -> Result<Self, TcParseError> {
        if !val.is_object() {
            return Err(TcParseError::NotAnObject);
        }

        serde_json::from_value(val).map_err(TcParseError::MissingCommand)
    }
}

impl From<Tc> for TcMessage {
    fn from(tc: Tc) -> Self {
        TcMessage::new(tc.token())
    }
}

impl TcResponse {
    pub fn success(tc: &Tc) -> Self {
        TcResponse::Success {
            command: tc.token().into(),
        }
    }

    pub fn error<E: fmt::Display>(e: E) -> Self {
        TcResponse::Error {
            error: e.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TcResponse::Success { .. })
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tokens() {
        assert_eq!(Tc::from_token("forward").unwrap(), Tc::Mnvr(Mnvr::Forward));
        assert_eq!(
            Tc::from_token("turn_right_backward").unwrap(),
            Tc::Mnvr(Mnvr::TurnRightBackward)
        );
        assert_eq!(
            Tc::from_token("high").unwrap(),
            Tc::SetSpeed(SpeedLevel::High)
        );

        // Every token must round trip through the parser
        for m in Mnvr::ALL.iter() {
            assert_eq!(Tc::from_token(m.token()).unwrap(), Tc::Mnvr(*m));
        }
    }

    #[test]
    fn test_token_normalisation() {
        assert_eq!(
            "  FORWARD\n".parse::<Tc>().unwrap(),
            Tc::Mnvr(Mnvr::Forward)
        );
        assert_eq!(
            Tc::from_token("Medium").unwrap(),
            Tc::SetSpeed(SpeedLevel::Medium)
        );
    }

    #[test]
    fn test_unknown_command() {
        match Tc::from_token(" Bananas ") {
            Err(TcParseError::UnknownCommand(t)) => assert_eq!(t, "bananas"),
            r => panic!("Expected UnknownCommand, got {:?}", r),
        }
        assert!(Tc::from_token("").is_err());
    }

    #[test]
    fn test_message_decoding() {
        let msg = TcMessage::from_value(json!({"command": "left", "sent_by": "web"})).unwrap();
        assert_eq!(Tc::from_token(&msg.command).unwrap(), Tc::Mnvr(Mnvr::Left));

        let err = TcMessage::from_value(json!({"cmd": "left"})).unwrap_err();
        assert!(matches!(err, TcParseError::MissingCommand(_)));

        let err = TcMessage::from_value(json!({"command": 3})).unwrap_err();
        assert!(matches!(err, TcParseError::MissingCommand(_)));
    }

    #[test]
    fn test_non_objects_rejected() {
        // A sequence would otherwise deserialise positionally into the struct
        for val in [json!(["forward"]), json!("forward"), json!(null), json!(5)] {
            assert!(matches!(
                TcMessage::from_value(val),
                Err(TcParseError::NotAnObject)
            ));
        }
    }

    #[test]
    fn test_response_format() {
        let ok = TcResponse::success(&Tc::Mnvr(Mnvr::Stop));
        assert_eq!(
            serde_json::to_string(&ok).unwrap(),
            r#"{"status":"success","command":"stop"}"#
        );

        let err = TcResponse::error(TcParseError::UnknownCommand("bananas".into()));
        assert_eq!(
            serde_json::to_string(&err).unwrap(),
            r#"{"status":"error","error":"\"bananas\" is not a recognised command"}"#
        );
        assert!(!err.is_success());
    }
}
