//! Stand-in for the high level controller on the other end of the exo synchronisation channel.
//!
//! Runs as peer B, sending a slow sinusoidal torque demand and printing the actuator state it
//! receives back.

use comms_if::{
    eqpt::exo::{ExoSynchData, EXO_SYNCH_LEN},
    net::synch::{PeerId, SynchChannel, SynchParams, ZmqTransport},
};
use std::time::{Duration, Instant};

/// Peak torque demand, newton meters
const TORQUE_AMPLITUDE_NM: f64 = 5.0;

/// Units: hertz
const TORQUE_FREQUENCY_HZ: f64 = 0.5;

const CYCLE_PERIOD: Duration = Duration::from_millis(10);

fn main() -> Result<(), Box<dyn std::error::Error>> {

    // Create zmq context
    let ctx = zmq::Context::new();

    let params = SynchParams {
        payload_len: EXO_SYNCH_LEN,
        ..SynchParams::default_for(PeerId::B)
    };

    let mut channel: SynchChannel<f64, ZmqTransport> = SynchChannel::connect(&ctx, &params)?;

    println!(
        "Synch peer B publishing on {}, listening to {}",
        params.bind_endpoint,
        params.connect_endpoint
    );

    let start = Instant::now();
    let mut num_cycles: u64 = 0;

    loop {
        let t = start.elapsed().as_secs_f64();

        let demand = ExoSynchData {
            desired_output_torque_nm: TORQUE_AMPLITUDE_NM
                * (2.0 * std::f64::consts::PI * TORQUE_FREQUENCY_HZ * t).sin(),
            ..Default::default()
        };

        let received = match channel.update(&demand.to_array()) {
            Ok(data) => data.and_then(ExoSynchData::from_slice),
            Err(e) if e.is_desynchronised() => return Err(e.into()),
            Err(e) => {
                println!("Synchronisation failed: {}", e);
                None
            }
        };

        if num_cycles % 100 == 0 {
            match received {
                Some(state) => println!(
                    "[{:8.2}] counter {:?}: angle {:.2} deg, torque {:.3} Nm (asked {:.3} Nm), \
                     winding {:.1} C",
                    t,
                    channel.counter(),
                    state.output_angle_rad.to_degrees(),
                    state.output_torque_nm,
                    demand.desired_output_torque_nm,
                    state.winding_temp_c
                ),
                None => println!("[{:8.2}] waiting for the actuator", t)
            }
        }

        num_cycles += 1;
        std::thread::sleep(CYCLE_PERIOD);
    }
}
