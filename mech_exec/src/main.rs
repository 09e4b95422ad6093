//! # Mechanisms Control Executable
//!
//! This executable drives the servos of the mechanisms from operator input:
//! - Loads the servo calibrations and wiring from the parameters
//! - Replays operator inputs from a script each cycle
//! - Converts the resulting angle demands into servo positions and sends them to the driver
//!   board, archiving what was sent

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Result};
use log::{debug, info, trace, warn};
use serde::Serialize;
use std::path::PathBuf;
use std::thread;
use std::time::Instant;
use structopt::StructOpt;

// Internal
use mech_lib::{
    params::MechExecParams,
    servo_ctrl::{BoardMap, ServoCtrl, ServoDriver, SimBoard},
    teleop::{OperatorInput, TeleopCtrl},
};
use util::{
    archive::Archiver,
    host,
    logger::{logger_init, LevelFilter},
    module::State,
    script_interpreter::{Pending, ScriptInterpreter},
    session::{self, Session},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Command line options.
#[derive(Debug, StructOpt)]
#[structopt(name = "mech_exec", about = "Drive the mechanisms servos from operator input")]
struct Opts {
    /// Operator input script to replay
    #[structopt(parse(from_os_str))]
    script: PathBuf,

    /// Parameter file, relative to `$SERVO_CAL_SW_ROOT/params`
    #[structopt(long, default_value = "mech_exec.toml")]
    params: String,

    /// Use a simulated driver board rather than the PCA9685
    #[structopt(long)]
    sim: bool,
}

/// A single applied demand, written to the telemetry archive.
#[derive(Serialize)]
struct TelemetryRecord<'a> {
    time_s: f64,
    servo: &'a str,
    angle_deg: f64,
    position: f64,
}

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    color_eyre::install()?;

    let opts = Opts::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("mech_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Mechanisms Control Executable\n");
    info!("Running on: {:#?}", host::get_platform());
    info!("Session directory: {:?}\n", session.session_root);

    info!("Initialising...");

    // ---- LOAD PARAMETERS ----

    let params: MechExecParams =
        util::params::load(&opts.params).wrap_err("Failed to load the parameters")?;

    info!("Parameters loaded from {}", opts.params);

    // ---- LOAD SCRIPT ----

    let script: ScriptInterpreter<OperatorInput> = ScriptInterpreter::new(&opts.script)
        .wrap_err_with(|| format!("Failed to load the script {:?}", opts.script))?;

    info!(
        "Loaded script with {} inputs over {:.1} s",
        script.get_num_pending(),
        script.get_duration()
    );

    // ---- RUN ----

    if opts.sim {
        info!("Using the simulated driver board");
        run(SimBoard::new(), &params, script, &session)
    } else {
        run(pca9685::init(&params)?, &params, script, &session)
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Initialise the servo controller and teleop on the given board and run the control loop until
/// the end of the script.
fn run<D: ServoDriver>(
    board: D,
    params: &MechExecParams,
    mut script: ScriptInterpreter<OperatorInput>,
    session: &Session,
) -> Result<()> {
    // ---- MODULE INITIALISATION ----

    let cycle_period = params
        .cycle_period()
        .wrap_err("Invalid control cycle period")?;

    let mut hw_map = BoardMap::new(board, params.channels(), params.pwm)
        .wrap_err("Failed to create the hardware map")?;

    let mut servo_ctrl = ServoCtrl::new(&params.servo_configs(), &mut hw_map)
        .wrap_err("Failed to initialise the servo controller")?;

    let mut servo_names: Vec<&str> = servo_ctrl.names().collect();
    servo_names.sort_unstable();
    info!(
        "ServoCtrl initialised with {} servos: {}",
        servo_ctrl.len(),
        servo_names.join(", ")
    );

    let mut teleop = TeleopCtrl::default();
    teleop
        .init(params.teleop.clone())
        .wrap_err("Failed to initialise teleop")?;
    teleop
        .check_servos(|s| servo_ctrl.calib(s).is_some())
        .wrap_err("Teleop bindings don't match the servos")?;

    info!("Teleop initialised");

    let mut archiver = Archiver::from_path(session, "telemetry.csv")
        .wrap_err("Failed to create the telemetry archive")?;

    // ---- MAIN LOOP ----

    info!("Initialisation complete, entering main loop");

    let mut input = OperatorInput::default();
    let mut num_cycles: u64 = 0;

    loop {
        let cycle_start_instant = Instant::now();

        // ---- OPERATOR INPUT ----

        match script.get_pending() {
            Pending::Some(inputs) => {
                // Only the most recent input matters, older ones were never seen by the loop
                if let Some(latest) = inputs.last() {
                    debug!("New operator input: {:?}", latest);
                    input = *latest;
                }
            }
            Pending::None => (),
            Pending::EndOfScript => {
                info!("End of script reached");
                break;
            }
        }

        // ---- TELEOP ----

        let (dems, report) = teleop.proc(&input).wrap_err("Teleop processing failed")?;

        trace!("Teleop: {:?}", report);

        // ---- SERVO CONTROL ----

        for dem in dems.iter() {
            match servo_ctrl.apply_angle(&dem.servo, dem.angle_deg) {
                Ok(position) => {
                    trace!(
                        "{}: target {:.2} deg, position {:.3}",
                        dem.servo,
                        dem.angle_deg,
                        position
                    );

                    if let Err(e) = archiver.serialise(TelemetryRecord {
                        time_s: session::get_elapsed_seconds(),
                        servo: &dem.servo,
                        angle_deg: dem.angle_deg,
                        position,
                    }) {
                        warn!("Could not archive telemetry: {}", e);
                    }
                }
                // The servo keeps its last position
                Err(e) => warn!("{}, holding last position", e),
            }
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        match cycle_period.checked_sub(cycle_dur) {
            Some(d) => thread::sleep(d),
            None => warn!(
                "Cycle overran by {:.06} s",
                cycle_dur.as_secs_f64() - cycle_period.as_secs_f64()
            ),
        }

        num_cycles += 1;
    }

    // ---- SHUTDOWN ----

    info!("End of execution after {} cycles", num_cycles);

    Ok(())
}

/// PCA9685 board initialisation, only possible on the Pi.
#[cfg(all(target_arch = "arm", target_os = "linux"))]
mod pca9685 {
    use color_eyre::{
        eyre::{eyre, WrapErr},
        Result,
    };
    use log::info;
    use mech_lib::{params::MechExecParams, servo_ctrl::pca9685::prescale_for};
    use pwm_pca9685::{Address, Pca9685};
    use rppal::i2c::I2c;

    /// Open the I2C bus and configure the board's PWM frequency.
    pub fn init(params: &MechExecParams) -> Result<Pca9685<I2c>> {
        let i2c = I2c::new().wrap_err("Failed to open the I2C bus")?;

        let mut pca = Pca9685::new(i2c, Address::from(params.i2c_address))
            .map_err(|e| eyre!("Failed to create the PCA9685 driver: {:?}", e))?;

        let prescale = prescale_for(params.pwm.freq_hz);
        pca.set_prescale(prescale)
            .map_err(|e| eyre!("Failed to set the PCA9685 prescale: {:?}", e))?;
        pca.enable()
            .map_err(|e| eyre!("Failed to enable the PCA9685: {:?}", e))?;

        info!(
            "PCA9685 at {:#04x} initialised with prescale {}",
            params.i2c_address, prescale
        );

        Ok(pca)
    }
}

/// Stand-in for hosts without an I2C bus.
#[cfg(not(all(target_arch = "arm", target_os = "linux")))]
mod pca9685 {
    use color_eyre::{eyre::eyre, Result};
    use mech_lib::{params::MechExecParams, servo_ctrl::SimBoard};

    pub fn init(_params: &MechExecParams) -> Result<SimBoard> {
        Err(eyre!(
            "The PCA9685 is only available on the Raspberry Pi, use --sim on this host"
        ))
    }
}
