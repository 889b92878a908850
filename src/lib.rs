//! Client library for the Robosen transformable-robot BLE binary protocol:
//! frame codec, joint catalogue, robot state snapshot, notification
//! ingester, state machine, and session controller.

pub mod error;
pub mod frame;
pub mod ingest;
pub mod joints;
pub mod protocol;
pub mod session;
pub mod snapshot;
pub mod state;
pub mod transport;
pub mod variant;

pub use error::{SessionError, WireError};
pub use frame::{FrameSplitter, RawFrame};
pub use protocol::{Command, Message};
pub use session::Session;
pub use snapshot::RobotSnapshot;
pub use state::{State, StateMachine};
pub use transport::{BleLink, Envelope, Transport};
pub use variant::Variant;
