//! # Telecommand server
//!
//! Accepts TCP connections from any number of clients. Each connection is served by its own
//! thread, which frames the incoming bytes into JSON messages and passes them to the
//! [`tc_processor`](crate::tc_processor).

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::io::{ErrorKind, Read};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, error, info, warn};

use comms_if::net::{send_json_line, MsgFramer, NetParams, SendError};
use comms_if::tc::TcResponse;

use crate::{drive_ctrl::DriveCtrl, tc_processor};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Time to wait between polls of the listener when no connection is pending.
const ACCEPT_POLL_PERIOD: Duration = Duration::from_millis(10);

/// Size of the buffer each connection reads into.
const READ_BUF_LEN: usize = 512;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Telecommand server
pub struct TcServer {
    listener: TcpListener,

    ctrl: Arc<DriveCtrl>,

    params: NetParams,
}

/// State of a single client connection.
struct Connection {
    stream: TcpStream,
    peer: SocketAddr,
    framer: MsgFramer,
    ctrl: Arc<DriveCtrl>,
    send_responses: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TcServerError {
    #[error("Could not bind to {0}: {1}")]
    BindError(String, std::io::Error),

    #[error("Socket error: {0}")]
    SocketError(std::io::Error),

    #[error("Could not send a response: {0}")]
    SendError(SendError),

    #[error("Could not spawn a connection thread: {0}")]
    SpawnError(std::io::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TcServer {
    /// Bind the server to the TC endpoint.
    ///
    /// No connections are accepted until [`TcServer::run`] is called.
    pub fn new(ctrl: Arc<DriveCtrl>, params: &NetParams) -> Result<Self, TcServerError> {
        let listener = TcpListener::bind(&params.tc_endpoint)
            .map_err(|e| TcServerError::BindError(params.tc_endpoint.clone(), e))?;

        // Non-blocking so the accept loop can observe shutdown
        listener
            .set_nonblocking(true)
            .map_err(TcServerError::SocketError)?;

        Ok(Self {
            listener,
            ctrl,
            params: params.clone(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TcServerError> {
        self.listener
            .local_addr()
            .map_err(TcServerError::SocketError)
    }

    /// Accept connections until `running` is cleared, then stop the drive and wait for all
    /// connection threads to finish.
    pub fn run(&self, running: &Arc<AtomicBool>) -> Result<(), TcServerError> {
        let mut clients: Vec<JoinHandle<()>> = Vec::new();

        info!("TcServer listening on {}", self.local_addr()?);

        while running.load(Ordering::Relaxed) {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    info!("TC client connected from {}", peer);

                    let conn = match Connection::new(stream, peer, self.ctrl.clone(), &self.params)
                    {
                        Ok(c) => c,
                        Err(e) => {
                            warn!("Could not set up the connection from {}: {}", peer, e);
                            continue;
                        }
                    };

                    let running = running.clone();
                    let handle = thread::Builder::new()
                        .name(format!("tc-{}", peer))
                        .spawn(move || conn.run(&running))
                        .map_err(TcServerError::SpawnError)?;

                    clients.push(handle);
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_PERIOD);
                }
                Err(e) => {
                    warn!("Error accepting a TC connection: {}", e);
                    thread::sleep(ACCEPT_POLL_PERIOD);
                }
            }

            clients.retain(|h| !h.is_finished());
        }

        // Stop before joining so a slow connection can't hold the rover in motion
        self.ctrl.make_safe();

        debug!("Waiting for {} TC connection(s) to close", clients.len());
        for handle in clients {
            if handle.join().is_err() {
                error!("A TC connection thread panicked");
            }
        }

        // A TC already being dispatched when the drive was stopped can have moved it again
        if self.ctrl.active_mnvr().is_motion() {
            self.ctrl.make_safe();
        }

        info!("TcServer stopped");

        Ok(())
    }
}

impl Connection {
    fn new(
        stream: TcpStream,
        peer: SocketAddr,
        ctrl: Arc<DriveCtrl>,
        params: &NetParams,
    ) -> Result<Self, TcServerError> {
        // Accepted streams may inherit the listener's non-blocking mode
        stream
            .set_nonblocking(false)
            .map_err(TcServerError::SocketError)?;
        stream
            .set_read_timeout(Some(Duration::from_millis(params.recv_timeout_ms.max(1))))
            .map_err(TcServerError::SocketError)?;
        stream
            .set_write_timeout(Some(Duration::from_millis(params.send_timeout_ms.max(1))))
            .map_err(TcServerError::SocketError)?;
        stream.set_nodelay(true).map_err(TcServerError::SocketError)?;

        Ok(Self {
            stream,
            peer,
            framer: MsgFramer::new(params.max_msg_len),
            ctrl,
            send_responses: params.send_responses,
        })
    }

    fn run(mut self, running: &AtomicBool) {
        match self.serve(running) {
            Ok(()) => info!("TC client {} disconnected", self.peer),
            Err(e) => warn!("TC connection to {} closed: {}", self.peer, e),
        }

        if self.framer.pending() > 0 {
            debug!(
                "Discarded {} unframed byte(s) from {}",
                self.framer.pending(),
                self.peer
            );
        }

        // Unblocks a peer that is still writing to us
        self.stream.shutdown(Shutdown::Both).ok();
    }

    fn serve(&mut self, running: &AtomicBool) -> Result<(), TcServerError> {
        let mut buf = [0u8; READ_BUF_LEN];

        while running.load(Ordering::Relaxed) {
            let n = match self.stream.read(&mut buf) {
                // Connection closed by the peer
                Ok(0) => return Ok(()),
                Ok(n) => n,
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    continue
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(TcServerError::SocketError(e)),
            };

            self.framer.push(&buf[..n]);

            while let Some(msg) = self.framer.next_msg() {
                // Buffered TCs are dropped once shutdown has begun
                if !running.load(Ordering::Relaxed) {
                    break;
                }

                let response = match msg {
                    Ok(val) => tc_processor::process_message(&self.ctrl, val),
                    Err(e) => {
                        warn!("Malformed message from {}: {}", self.peer, e);
                        TcResponse::error(e)
                    }
                };

                if self.send_responses {
                    send_json_line(&mut self.stream, &response)
                        .map_err(TcServerError::SendError)?;
                }
            }
        }

        debug!("Shutting down TC connection to {}", self.peer);

        Ok(())
    }
}
