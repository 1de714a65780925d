//! Main drive executable entry point.
//!
//! # Architecture
//!
//! The executable runs the following threads:
//!
//!     - Main thread: accepts TC connections
//!     - One thread per TC connection: reads, decodes and executes TCs
//!     - Obstacle monitor: stops forward motion when an obstacle is close
//!     - TM server: publishes the drive status to subscribers
//!
//! All TCs and obstacle overrides go through the single `DriveCtrl` instance.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{error, info};
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use structopt::StructOpt;

// Internal
use drive_lib::{
    drive_ctrl::{DriveCtrl, SafeStopGuard},
    motor_driver,
    obstacle_monitor::ObstacleMonitor,
    params::DriveExecParams,
    range_sensor,
    tc_server::TcServer,
    tm_server::TmServer,
};
use util::{
    host,
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Parameter file loaded from the params directory if none is given.
const DEFAULT_PARAMS_FILE: &str = "drive_exec.toml";

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(
    name = "drive_exec",
    about = "Drive executable, remote control of the rover with obstacle protection"
)]
struct Opt {
    /// Path to the parameter file, defaults to params/drive_exec.toml under the software root
    #[structopt(long, parse(from_os_str))]
    params: Option<PathBuf>,

    /// Use the simulated motors and range sensor regardless of the parameter file
    #[structopt(long)]
    sim: bool,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("drive_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("RC Rover Drive Executable\n");
    info!(
        "Running on: {:#?}",
        host::get_uname().wrap_err("Failed to get host information")?
    );
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let mut params: DriveExecParams = match &opt.params {
        Some(path) => util::params::load_from_path(path),
        None => util::params::load(DEFAULT_PARAMS_FILE),
    }
    .wrap_err("Could not load drive exec params")?;

    if opt.sim {
        info!("Simulated hardware requested");
        params.use_sim();
    }

    params.validate().wrap_err("Invalid drive exec params")?;

    info!("Exec parameters loaded");

    // ---- INITIALISE HARDWARE ----

    let motors =
        motor_driver::create(&params.drive).wrap_err("Failed to initialise the motor driver")?;
    info!("{:?} motor driver initialised", params.drive.motors);

    let sensor =
        range_sensor::create(&params.monitor).wrap_err("Failed to initialise the range sensor")?;
    info!("{:?} range sensor initialised", params.monitor.sensor);

    // ---- INITIALISE MODULES ----

    let ctrl = Arc::new(
        DriveCtrl::new(motors, params.drive.default_speed)
            .wrap_err("Failed to stop the motors on startup")?,
    );

    // From here on the motors are stopped however main exits
    let _safe_stop = SafeStopGuard::new(ctrl.clone());

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        ctrlc::set_handler(move || {
            info!("Shutdown requested");
            running.store(false, Ordering::Relaxed);
        })
        .wrap_err("Failed to set the signal handler")?;
    }

    let monitor = ObstacleMonitor::new(ctrl.clone(), sensor, &params.monitor);
    let monitor_report = monitor.report_handle();

    // ---- INITIALISE NETWORK ----

    let tc_server =
        TcServer::new(ctrl.clone(), &params.net).wrap_err("Failed to start the TcServer")?;
    let tm_server = TmServer::new(ctrl.clone(), monitor_report, &params.net, &params.tm)
        .wrap_err("Failed to start the TmServer")?;
    info!(
        "TM published on {}",
        tm_server.local_addr().wrap_err("Failed to get the TM address")?
    );

    // ---- MAIN LOOP ----

    let monitor_thread = monitor
        .spawn(running.clone())
        .wrap_err("Failed to start the obstacle monitor")?;
    let tm_thread = tm_server
        .spawn(running.clone())
        .wrap_err("Failed to start the TmServer thread")?;

    info!("Initialisation complete, waiting for TCs\n");

    let result = tc_server.run(&running);

    // ---- SHUTDOWN ----

    running.store(false, Ordering::Relaxed);
    ctrl.make_safe();

    if monitor_thread.join().is_err() {
        error!("Obstacle monitor thread panicked");
    }
    if tm_thread.join().is_err() {
        error!("TmServer thread panicked");
    }

    result.wrap_err("TcServer failed")?;

    info!("End of execution");

    Ok(())
}
