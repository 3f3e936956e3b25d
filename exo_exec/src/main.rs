//! Main exo actuator executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise the actuator driver and the ExoCtrl module
//!     - Calibrate the belt
//!     - Connect the synchronisation channel to the high level controller
//!     - Main loop:
//!         - ExoCtrl processing with the latest desired output torque
//!         - Exchange actuator state with the peer
//!         - Cycle management
//!
//! The actuator in this executable is simulated, the real motor controller is used by providing a
//! different `ActuatorDriver` to ExoCtrl.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{Report, eyre::{WrapErr, eyre}};
use log::{debug, info, warn};
use std::thread;
use std::time::{Duration, Instant};
use structopt::StructOpt;

// Internal
use comms_if::{
    eqpt::exo::{ExoSynchData, EXO_SYNCH_LEN},
    net::{synch::{PeerId, SynchChannel, SynchParams, ZmqTransport}, zmq},
};
use exo_lib::{
    driver::SimDriver,
    exo_ctrl::{Demand, ExoCtrl, InitData, InputData},
    kinematics::KinematicCalibration,
    params::ExoExecParams,
};
use util::{
    host,
    module::State,
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "exo_exec", about = "Exo ankle actuator control executable")]
struct Opt {
    /// Parameter file, relative to the params directory
    #[structopt(short, long, default_value = "exo_exec.toml")]
    params: String,

    /// Synchronisation peer to run as (A or B), overriding the parameter file. The endpoints are
    /// reset to the defaults for that peer.
    #[structopt(long, parse(try_from_str = parse_peer))]
    peer: Option<PeerId>,

    /// Stop after this many cycles instead of running forever
    #[structopt(short, long)]
    cycles: Option<u64>,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {

    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new(
        "exo_exec",
        "sessions"
    ).wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, &session)
        .wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Exo Actuator Executable\n");
    info!(
        "Running on: {:#?}",
        host::get_uname().wrap_err("Failed to get host information")?
    );
    info!("Session directory: {:?}\n", session.session_root);

    debug!("CLI options: {:?}", opt);

    // ---- LOAD PARAMETERS ----

    let mut params: ExoExecParams = util::params::load(&opt.params)
        .wrap_err("Could not load exec params")?;

    if let Some(peer) = opt.peer {
        params.synch = SynchParams {
            role: params.synch.role,
            payload_len: params.synch.payload_len,
            max_drain: params.synch.max_drain,
            ..SynchParams::default_for(peer)
        };
    }

    params.validate().wrap_err("Invalid exec params")?;

    let calibration = match params.exo_ctrl.kinematics.calibration_file {
        Some(ref file) => {
            let path = util::params::resolve(file)
                .wrap_err("Could not resolve the kinematic calibration path")?;
            info!("Loading kinematic calibration from {:?}", path);
            KinematicCalibration::load(&path)
                .wrap_err("Could not load the kinematic calibration")?
        },
        None => {
            info!("No calibration file given, using the default kinematic calibration");
            KinematicCalibration::default()
        }
    };

    info!("Exec parameters loaded");

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let cycle_period = Duration::from_secs_f64(params.exo_ctrl.tick_period_s);

    let mut exo_ctrl = ExoCtrl::new(SimDriver::new(params.sim.clone()));
    exo_ctrl.init(InitData {
        params: params.exo_ctrl.clone(),
        calibration
    }).wrap_err("Failed to initialise ExoCtrl")?;
    info!("ExoCtrl init complete");

    let calib_report = exo_ctrl.calibrate()
        .wrap_err("Failed to calibrate the belt")?;
    info!(
        "Belt calibrated after {} polls: offset {:.4} rad at output angle {:.2} deg",
        calib_report.num_polls,
        calib_report.offset_rad,
        calib_report.output_angle_rad.to_degrees()
    );

    info!("Module initialisation complete\n");

    // ---- INITIALISE NETWORK ----

    info!("Initialising network");

    let zmq_ctx = zmq::Context::new();

    let mut synch: SynchChannel<f64, ZmqTransport> = SynchChannel::connect(
        &zmq_ctx,
        &params.synch
    ).wrap_err("Failed to initialise the synchronisation channel")?;
    info!(
        "Synchronisation channel initialised as peer {:?} ({:?}), publishing on {}",
        params.synch.peer,
        synch.role(),
        params.synch.bind_endpoint
    );

    info!("Network initialisation complete");

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let mut desired_torque_nm = 0.0;
    let mut num_cycles: u64 = 0;

    loop {

        // Get cycle start time
        let cycle_start_instant = Instant::now();

        // ---- ACTUATOR CONTROL ----

        let (output, report) = exo_ctrl.proc(&InputData {
            demand: Demand::Torque(desired_torque_nm)
        }).wrap_err("ExoCtrl processing failed")?;

        // ---- SYNCHRONISATION ----

        let data_out = output.to_synch(desired_torque_nm).to_array();

        match synch.update(&data_out) {
            Ok(Some(data_in)) => {
                let peer_data = ExoSynchData::from_slice(data_in).ok_or_else(|| eyre!(
                    "Peer sent {} elements, expected {}",
                    data_in.len(),
                    EXO_SYNCH_LEN
                ))?;

                if peer_data.desired_output_torque_nm.is_finite() {
                    desired_torque_nm = peer_data.desired_output_torque_nm;
                }
                else {
                    warn!(
                        "Peer sent a non-finite torque demand ({}), holding {} Nm",
                        peer_data.desired_output_torque_nm,
                        desired_torque_nm
                    );
                }
            },
            Ok(None) => (),
            // Peers disagree on the protocol, halt
            Err(e) if e.is_desynchronised() => {
                return Err(e).wrap_err("Synchronisation with the peer failed");
            },
            Err(e) => warn!("Synchronisation failed: {}", e)
        }

        // ---- STATUS ----

        if params.status_period_cycles > 0 && num_cycles % params.status_period_cycles == 0 {
            info!(
                "Cycle {}: angle {:.2} deg, torque {:.3}/{:.3} Nm, winding {:.1} C, \
                 case {:.1} C, scale {:.3}, peer {}, synch counter {:?}",
                num_cycles,
                output.output_angle_rad.to_degrees(),
                output.output_torque_nm,
                desired_torque_nm,
                output.thermal.winding_temp_c,
                output.thermal.case_temp_c,
                output.thermal.derating_scale,
                if synch.peer_connected() { "connected" } else { "not connected" },
                synch.counter()
            );
        }
        debug!("ExoCtrl status: {:?}", report);

        // ---- CYCLE MANAGEMENT ----

        num_cycles += 1;

        if let Some(max_cycles) = opt.cycles {
            if num_cycles >= max_cycles {
                info!("Completed {} cycles", num_cycles);
                break;
            }
        }

        let cycle_dur = Instant::now() - cycle_start_instant;

        // Get sleep duration
        match cycle_period.checked_sub(cycle_dur) {
            Some(d) => thread::sleep(d),
            None => warn!(
                "Cycle overran by {:.06} s",
                cycle_dur.as_secs_f64() - cycle_period.as_secs_f64()
            )
        }
    }

    // ---- SHUTDOWN ----

    info!("End of execution");

    Ok(())
}

/// Parse a peer letter from the command line.
fn parse_peer(s: &str) -> Result<PeerId, Report> {
    match s {
        "A" | "a" => Ok(PeerId::A),
        "B" | "b" => Ok(PeerId::B),
        _ => Err(eyre!("Expected peer A or B, found {:?}", s))
    }
}
