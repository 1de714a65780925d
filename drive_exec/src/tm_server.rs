//! # TM Server
//!
//! Publishes a [`TmPacket`] to every connected subscriber once per period. Subscribers only
//! listen, anything they send is ignored.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use comms_if::{
    eqpt::drive::{WheelDems, WheelId},
    net::{send_json_line, NetParams},
};

use crate::{
    drive_ctrl::{DriveCtrl, DriveStatus},
    obstacle_monitor::{MonitorReport, MonitorReportHandle},
    params::TmParams,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// A subscriber which blocks a send for longer than this is dropped.
const SEND_TIMEOUT: Duration = Duration::from_millis(100);

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Telemetry server
pub struct TmServer {
    listener: TcpListener,

    subscribers: Vec<(SocketAddr, TcpStream)>,

    ctrl: Arc<DriveCtrl>,

    monitor: MonitorReportHandle,

    period: Duration,
}

/// Telemetry packet that is output by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmPacket {
    /// Seconds since the start of the session, if one has been started
    pub session_time_s: Option<f64>,

    pub timestamp: DateTime<Utc>,

    pub drive: DriveStatus,

    /// Demand seen by each wheel
    pub wheels: BTreeMap<WheelId, WheelDems>,

    pub monitor: MonitorReport,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TmServerError {
    #[error("Could not bind to {0}: {1}")]
    BindError(String, std::io::Error),

    #[error("Socket error: {0}")]
    SocketError(std::io::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TmServer {
    /// Create a new instance of the TM Server.
    ///
    /// This function will not block waiting for subscribers.
    pub fn new(
        ctrl: Arc<DriveCtrl>,
        monitor: MonitorReportHandle,
        net_params: &NetParams,
        tm_params: &TmParams,
    ) -> Result<Self, TmServerError> {
        let listener = TcpListener::bind(&net_params.tm_endpoint)
            .map_err(|e| TmServerError::BindError(net_params.tm_endpoint.clone(), e))?;
        listener
            .set_nonblocking(true)
            .map_err(TmServerError::SocketError)?;

        Ok(Self {
            listener,
            subscribers: Vec::new(),
            ctrl,
            monitor,
            period: Duration::from_secs_f64(tm_params.period_s),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TmServerError> {
        self.listener
            .local_addr()
            .map_err(TmServerError::SocketError)
    }

    /// Accept pending subscribers and send them all the current telemetry.
    pub fn send(&mut self) {
        self.accept_pending();

        if self.subscribers.is_empty() {
            return;
        }

        let packet = TmPacket::new(self.ctrl.status(), self.monitor.get());

        self.subscribers
            .retain_mut(|(peer, stream)| match send_json_line(stream, &packet) {
                Ok(()) => true,
                Err(e) => {
                    info!("Dropping TM subscriber {}: {}", peer, e);
                    false
                }
            });
    }

    /// Publish telemetry until `running` is cleared.
    pub fn run(&mut self, running: &AtomicBool) {
        info!(
            "TmServer publishing every {:.3} s",
            self.period.as_secs_f64()
        );

        while running.load(Ordering::Relaxed) {
            let cycle_start = Instant::now();

            self.send();

            if let Some(d) = self.period.checked_sub(cycle_start.elapsed()) {
                thread::sleep(d);
            }
        }

        info!("TmServer stopped");
    }

    /// Spawn the server on its own thread.
    pub fn spawn(mut self, running: Arc<AtomicBool>) -> std::io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("tm-server".into())
            .spawn(move || self.run(&running))
    }

    fn accept_pending(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    let setup = stream
                        .set_nonblocking(false)
                        .and_then(|_| stream.set_write_timeout(Some(SEND_TIMEOUT)));

                    match setup {
                        Ok(()) => {
                            info!("TM subscriber connected from {}", peer);
                            self.subscribers.push((peer, stream));
                        }
                        Err(e) => warn!("Could not set up TM subscriber {}: {}", peer, e),
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => {
                    debug!("Error accepting a TM subscriber: {}", e);
                    break;
                }
            }
        }
    }
}

impl TmPacket {
    pub fn new(drive: DriveStatus, monitor: MonitorReport) -> Self {
        let wheels = WheelId::ALL
            .iter()
            .map(|id| (*id, drive.last_applied.wheel(*id)))
            .collect();

        Self {
            session_time_s: util::session::try_get_elapsed_seconds(),
            timestamp: Utc::now(),
            drive,
            wheels,
            monitor,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
