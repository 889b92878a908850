//! Illustrative session loop against a paired robot.
//!
//! This crate ships no concrete BLE stack (see [`robosynth::transport::Transport`]),
//! so this example wires up a caller-supplied transport and drives the
//! startup probe plus a short scripted routine. Swap `YourBleTransport` for
//! an adapter over whatever BLE library your platform uses.

use std::process;
use std::time::Duration;

use robosynth::transport::Transport;
use robosynth::{Session, SessionError, Variant};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), SessionError> {
    let advertising_name = "OP-M-A1B2C3";
    let (variant, device_id) =
        Variant::from_advertising_name(advertising_name).expect("unrecognized advertising name");
    println!("Found {variant} ({device_id})");

    let transport = YourBleTransport::connect(advertising_name)?;
    let mut session = Session::new(transport, variant);
    session.set_on_send(|cmd| println!(">> {}", cmd.debug_hex()));
    session.set_on_recv(|env| println!("<< {env:?}"));

    println!("Probing...");
    session.startup_probe()?;
    println!("Ready: state={:?} battery={}%", session.state(), session.snapshot().battery_percent);

    session.forward()?;
    std::thread::sleep(Duration::from_secs(1));
    session.stop()?;

    session.transform()?;
    println!("Transformed: state={:?}", session.state());

    Ok(())
}

/// A stand-in [`Transport`] — replace with a real BLE adapter.
struct YourBleTransport;

impl YourBleTransport {
    fn connect(_advertising_name: &str) -> Result<Self, SessionError> {
        unimplemented!("plug in a BLE stack here")
    }
}

impl Transport for YourBleTransport {
    fn write(&mut self, _data: &[u8]) -> std::io::Result<()> {
        unimplemented!()
    }

    fn recv_timeout(&mut self, _timeout: Duration) -> std::io::Result<Option<Vec<u8>>> {
        unimplemented!()
    }
}
