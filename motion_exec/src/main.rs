//! # Motion Executable
//!
//! Runs the motion core against a servo backend. Commands come from an optional motion script,
//! other producers (serial, HTTP, vision) link against `motion_lib` and use a `MotionHandle`
//! directly.
//!
//! # Architecture
//!
//!     - Load parameters, calibration and the action library
//!     - Start the motion core (dispatcher, mixer and face tracker threads)
//!     - Main loop: issue due script commands until the script or duration ends
//!     - STOP, let the joints settle at home, save the final status and shut down

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Result,
};
use comms_if::cmd::MotionCommand;
use log::{debug, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use structopt::StructOpt;

// Internal
use motion_lib::{
    action::ActionLibrary,
    calib::{CalibParams, Calibration},
    motion_core::MotionCore,
    params::MotionExecParams,
    servo_ctrl::{self, ServoBackend, ServoDriver, SimServoDriver},
};
use util::{
    host,
    logger::{logger_init, parse_level},
    script_interpreter::{PendingCmds, ScriptInterpreter},
    session::Session,
    time::wait_for_next_cycle,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Period of the script polling loop
const CYCLE_PERIOD: Duration = Duration::from_millis(50);

/// How often the status is logged
const STATUS_PERIOD_S: f64 = 1.0;

// ------------------------------------------------------------------------------------------------
// CLI
// ------------------------------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "motion_exec", about = "Motion choreography core of the desk robot")]
struct Opt {
    /// Motion script to run
    #[structopt(short, long, parse(from_os_str))]
    script: Option<PathBuf>,

    /// Stop after this many seconds, otherwise run until the script and its actions are done
    #[structopt(short, long)]
    duration_s: Option<f64>,

    /// Minimum log level, one of info, debug or trace
    #[structopt(short, long, default_value = "info")]
    log_level: String,
}

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    let level = parse_level(&opt.log_level)
        .ok_or_else(|| eyre!("Unknown log level \"{}\"", opt.log_level))?;

    // Initialise session
    let session = Session::new("motion_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(level, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Motion Executable\n");
    info!("Running on: {}", host::get_hostname());
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let params: MotionExecParams =
        util::params::load("motion_exec.toml").wrap_err("Could not load motion_exec params")?;

    let calib_params: CalibParams =
        util::params::load("calib.toml").wrap_err("Could not load the calibration")?;
    let (calib, channels) =
        Calibration::from_params(&calib_params).wrap_err("The calibration is invalid")?;

    let library =
        ActionLibrary::load("actions.toml").wrap_err("Could not load the action library")?;

    info!("Parameters loaded, {} actions available", library.len());

    // ---- LOAD SCRIPT ----

    let mut script = match opt.script {
        Some(ref path) => {
            info!("Loading script from {:?}", path);
            let si = ScriptInterpreter::new(path).wrap_err("Failed to load script")?;
            info!(
                "Loaded script lasts {:.02} s and contains {} commands\n",
                si.get_duration(),
                si.get_num_cmds()
            );
            Some(si)
        }
        None => {
            info!("No script provided, running until the duration elapses");
            None
        }
    };

    // ---- START THE CORE ----

    let driver = servo_driver(&params.servo)?;

    let core = MotionCore::start(&params, calib, channels, driver, Arc::new(library))
        .wrap_err("Failed to start the motion core")?;
    let handle = core.handle().clone();

    // ---- MAIN LOOP ----

    info!("Beginning main loop\n");

    let start = Instant::now();
    let mut last_status_s = 0.0;
    let mut script_done = false;

    loop {
        let cycle_start = Instant::now();
        let elapsed_s = start.elapsed().as_secs_f64();

        if let Some(d) = opt.duration_s {
            if elapsed_s >= d {
                info!("Run duration of {:.02} s elapsed", d);
                break;
            }
        }

        if let Some(si) = script.as_mut() {
            match si.get_pending_cmds(elapsed_s) {
                PendingCmds::None => (),
                PendingCmds::Some(cmds) => {
                    for cmd in cmds {
                        info!("Script command: {:?}", cmd);
                        if !handle.queue_command(cmd.encode()) {
                            warn!("Could not queue {:?}", cmd);
                        }
                    }
                }
                PendingCmds::EndOfScript => {
                    if !script_done {
                        info!("End of script, waiting for running actions to finish");
                        script_done = true;
                    }
                    if opt.duration_s.is_none() && handle.status().active_actions.is_empty() {
                        info!("All actions complete");
                        break;
                    }
                }
            }
        }

        if elapsed_s - last_status_s >= STATUS_PERIOD_S {
            last_status_s = elapsed_s;
            match serde_json::to_string(&handle.status()) {
                Ok(s) => debug!("Status: {}", s),
                Err(e) => warn!("Could not serialise the status: {}", e),
            }
        }

        if let Err(overrun) = wait_for_next_cycle(cycle_start, CYCLE_PERIOD) {
            warn!("Main loop cycle overran by {:.6} s", overrun.as_secs_f64());
        }
    }

    // ---- SHUTDOWN ----

    handle.queue_command(MotionCommand::stop());
    thread::sleep(Duration::from_millis(params.dispatcher.stop_settle_ms));

    session.save("status.json", handle.status());

    core.shutdown();
    session.exit();

    Ok(())
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn servo_driver(params: &servo_ctrl::Params) -> Result<Box<dyn ServoDriver + Send>> {
    match params.backend {
        ServoBackend::Sim => {
            info!("Using the simulated servo driver");
            Ok(Box::new(SimServoDriver::new()))
        }
        ServoBackend::Pca9685 => pca9685_driver(params),
    }
}

#[cfg(target_arch = "arm")]
fn pca9685_driver(params: &servo_ctrl::Params) -> Result<Box<dyn ServoDriver + Send>> {
    let i2c = rppal::i2c::I2c::new().wrap_err("Failed to open the I2C bus")?;
    let driver = servo_ctrl::Pca9685Driver::new(i2c, params)
        .wrap_err("Failed to initialise the PCA9685")?;

    info!("PCA9685 servo driver initialised");

    Ok(Box::new(driver))
}

#[cfg(not(target_arch = "arm"))]
fn pca9685_driver(_params: &servo_ctrl::Params) -> Result<Box<dyn ServoDriver + Send>> {
    warn!("The PCA9685 backend needs the Raspberry Pi I2C bus, using the simulated driver");
    Ok(Box::new(SimServoDriver::new()))
}
