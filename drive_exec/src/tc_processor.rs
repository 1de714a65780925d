//! # Telecommand processor module
//!
//! The telecommand processor handles TCs coming from any connection. Every connection goes
//! through [`dispatch`], so TCs from different clients are applied one at a time in the order they
//! reach drive control.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, warn};
use serde_json::Value;

// Internal
use crate::{drive_ctrl::DriveCtrl, motor_driver::MotorError};
use comms_if::tc::{Tc, TcMessage, TcParseError, TcResponse};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Parse(#[from] TcParseError),

    #[error("TC accepted but the motors could not be driven: {0}")]
    Actuation(#[from] MotorError),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Parse and execute a raw command token.
///
/// Unknown tokens leave drive control untouched.
pub fn dispatch(ctrl: &DriveCtrl, raw: &str) -> Result<Tc, DispatchError> {
    let tc = match Tc::from_token(raw) {
        Ok(tc) => tc,
        Err(e) => {
            warn!("Rejected TC: {}", e);
            return Err(e.into());
        }
    };

    let state = ctrl.exec(tc)?;
    debug!("Accepted TC {}, now {:?}", tc, state);

    Ok(tc)
}

/// Process one message received from a client, returning the response to send back.
pub fn process_message(ctrl: &DriveCtrl, msg: Value) -> TcResponse {
    let result = TcMessage::from_value(msg)
        .map_err(|e| {
            warn!("Malformed TC message: {}", e);
            DispatchError::from(e)
        })
        .and_then(|m| dispatch(ctrl, &m.command));

    match result {
        Ok(tc) => TcResponse::success(&tc),
        Err(e) => TcResponse::error(e),
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
