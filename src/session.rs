//! Session controller: startup probe plus one method per user intent, each
//! gated by the [`StateMachine`] and dispatched over a [`BleLink`].

use std::thread;
use std::time::Duration;

use crate::error::SessionError;
use crate::ingest::Ingester;
use crate::protocol::{status::GetState, Command, Message};
use crate::snapshot::RobotSnapshot;
use crate::state::{State, StateMachine};
use crate::transport::{BleLink, Envelope, Transport};
use crate::variant::Variant;

/// Per-exchange timeout for request/response pairs.
pub const EXCHANGE_TIMEOUT: Duration = Duration::from_secs(2);
/// Pacing between startup-probe steps.
const PROBE_PACING: Duration = Duration::from_millis(100);
/// Settle delay before the device is ready to be polled after TRANSFORM.
const TRANSFORM_SETTLE: Duration = Duration::from_secs(2);
/// Settle delay before the first GET_POSITION poll after ENTER_PROGRAMMING.
const PROGRAMMING_SETTLE: Duration = Duration::from_secs(10);
/// Inter-write spacing for the triple STOP (matches the reference
/// implementation's 0.1s-then-0.02s cadence, not a uniform interval).
const STOP_SPACING: [Duration; 2] = [Duration::from_millis(100), Duration::from_millis(20)];

/// Well-known scripted-action path dispatched whenever a command is rejected
/// by the state machine or by a missing bias table.
const ERROR_ANNOUNCE_PATH: &str = "/error/announce.bin";

pub struct Session<T: Transport> {
    link: BleLink<T>,
    snapshot: RobotSnapshot,
    state: StateMachine,
    ingester: Ingester,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T, variant: Variant) -> Self {
        Self {
            link: BleLink::new(transport),
            snapshot: RobotSnapshot::new(variant),
            state: StateMachine::new(),
            ingester: Ingester::new(),
        }
    }

    pub fn snapshot(&self) -> &RobotSnapshot {
        &self.snapshot
    }

    pub fn state(&self) -> State {
        self.state.state()
    }

    pub fn variant(&self) -> Variant {
        self.snapshot.variant
    }

    pub fn set_on_send(&mut self, f: impl FnMut(&Command) + 'static) {
        self.link.set_on_send(f);
    }

    pub fn set_on_recv(&mut self, f: impl FnMut(&Envelope) + 'static) {
        self.link.set_on_recv(f);
    }

    // -- Core exchange helpers -------------------------------------------

    fn send_recv(&mut self, cmd: &Command) -> Result<Message, SessionError> {
        self.link.send(cmd)?;
        self.recv_ingested(EXCHANGE_TIMEOUT)
    }

    fn recv_ingested(&mut self, timeout: Duration) -> Result<Message, SessionError> {
        let env = self.link.recv_timeout(timeout)?;
        self.ingester.ingest(&mut self.snapshot, &env.message)?;
        Ok(env.message)
    }

    /// Reject an intent: dispatch the error-announce scripted action and
    /// return `Inadmissible`. The state is left unchanged.
    fn reject(&mut self, intent: &'static str) -> Result<(), SessionError> {
        let _ = self.announce_error();
        Err(SessionError::Inadmissible { intent })
    }

    // -- Startup -----------------------------------------------------------

    /// Wake the device, collect identity strings, and derive the initial
    /// idle substate from the first GET_STATE response.
    pub fn startup_probe(&mut self) -> Result<(), SessionError> {
        self.link.send(&Command::ActionComplete)?;
        thread::sleep(PROBE_PACING);
        for cmd in [Command::Model, Command::Version, Command::FirmwareDate, Command::SerialNumber] {
            self.send_recv(&cmd)?;
            thread::sleep(PROBE_PACING);
        }
        let state = self.expect_get_state()?;
        self.state.on_startup_probe(state.robot_mode());
        Ok(())
    }

    fn expect_get_state(&mut self) -> Result<GetState, SessionError> {
        match self.send_recv(&Command::GetState)? {
            Message::GetState(s) => Ok(s),
            other => Err(SessionError::Protocol(format!("expected GetState, got {other:?}"))),
        }
    }

    // -- Motion primitives --------------------------------------------------

    pub fn forward(&mut self) -> Result<(), SessionError> {
        self.motion(Command::Forward, "forward")
    }
    pub fn reverse(&mut self) -> Result<(), SessionError> {
        self.motion(Command::Reverse, "reverse")
    }
    pub fn turn_left(&mut self) -> Result<(), SessionError> {
        self.motion(Command::TurnLeft, "turn_left")
    }
    pub fn turn_right(&mut self) -> Result<(), SessionError> {
        self.motion(Command::TurnRight, "turn_right")
    }
    pub fn step_left(&mut self) -> Result<(), SessionError> {
        self.motion(Command::StepLeft, "step_left")
    }
    pub fn step_right(&mut self) -> Result<(), SessionError> {
        self.motion(Command::StepRight, "step_right")
    }
    pub fn reverse_left(&mut self) -> Result<(), SessionError> {
        self.motion(Command::ReverseLeft, "reverse_left")
    }
    pub fn reverse_right(&mut self) -> Result<(), SessionError> {
        self.motion(Command::ReverseRight, "reverse_right")
    }

    fn motion(&mut self, cmd: Command, intent: &'static str) -> Result<(), SessionError> {
        if !self.state.can_move(self.snapshot.acting) {
            return self.reject(intent);
        }
        self.link.send(&cmd)?;
        self.state.apply_motion();
        self.snapshot.moving = true;
        Ok(())
    }

    /// Triple STOP, ≥100ms/20ms apart to survive packet loss. Individual
    /// write failures are tolerated (scenario 5) — only a total failure
    /// across all three attempts propagates.
    pub fn stop(&mut self) -> Result<(), SessionError> {
        let mut last_err = None;
        for (i, spacing) in [Some(STOP_SPACING[0]), Some(STOP_SPACING[1]), None].into_iter().enumerate() {
            match self.link.send(&Command::Stop) {
                Ok(()) => last_err = None,
                Err(e) if i < 2 => last_err = Some(e),
                Err(e) => return Err(e),
            }
            if let Some(d) = spacing {
                thread::sleep(d);
            }
        }
        if let Some(e) = last_err {
            return Err(e);
        }
        self.state.apply_stop();
        self.snapshot.moving = false;
        Ok(())
    }

    // -- Transform -----------------------------------------------------------

    /// Issue TRANSFORM and block (settling, then polling) until the device's
    /// GET_STATE notification confirms the new form.
    pub fn transform(&mut self) -> Result<(), SessionError> {
        if !self.state.can_transform(self.snapshot.acting) {
            return self.reject("transform");
        }
        self.link.send(&Command::Transform)?;
        self.state.begin_transform();
        thread::sleep(TRANSFORM_SETTLE);
        let state = self.expect_get_state()?;
        self.state.complete_transform(state.robot_mode());
        Ok(())
    }

    /// Dinobot-specific speed toggle via BUILT_IN_ACTION subtype 3. A no-op
    /// on the other two variants.
    pub fn change_speed(&mut self, fast: bool) -> Result<(), SessionError> {
        if !self.variant().supports_speed_toggle() {
            return Ok(());
        }
        if !self.state.can_scripted_action(self.snapshot.acting) {
            return self.reject("change_speed");
        }
        self.link.send(&Command::BuiltInAction(vec![3, u8::from(fast)]))?;
        self.snapshot.fast_mode = fast;
        Ok(())
    }

    // -- Scripted actions -----------------------------------------------------

    pub fn execute_file(&mut self, path: &str) -> Result<(), SessionError> {
        if !self.state.can_scripted_action(self.snapshot.acting) {
            return self.reject("execute_file");
        }
        self.snapshot.acting_progress = 0;
        self.snapshot.acting = true;
        self.link.send(&Command::ExecuteFile(path.to_string()))?;
        Ok(())
    }

    pub fn read_directory(&mut self, path: &str) -> Result<String, SessionError> {
        match self.send_recv(&Command::ReadDirectory(path.to_string()))? {
            Message::ReadDirectory(t) => Ok(t.text),
            other => Err(SessionError::Protocol(format!("expected ReadDirectory, got {other:?}"))),
        }
    }

    /// Dispatch the variant's well-known error-announce scripted action.
    /// Called by the controller whenever an intent is rejected.
    pub fn announce_error(&mut self) -> Result<(), SessionError> {
        self.link.send(&Command::ExecuteFile(ERROR_ANNOUNCE_PATH.to_string()))?;
        Ok(())
    }

    // -- Programming mode -----------------------------------------------------

    /// Autobot-only. `vehicle = false` requests the humanoid-form handshake.
    /// A no-op on variants that don't support programming mode (§9).
    pub fn enter_programming(&mut self, vehicle: bool) -> Result<(), SessionError> {
        if !self.variant().supports_programming() {
            return Ok(());
        }
        if !self.state.can_enter_programming() {
            return self.reject("enter_programming");
        }
        self.link.send(&Command::EnterProgramming { vehicle })?;
        self.state.enter_programming();
        // Three handshake frames arrive as notifications; drain them before
        // the settle delay so bias_learned/snapshots are populated.
        for _ in 0..3 {
            self.recv_ingested(EXCHANGE_TIMEOUT)?;
        }
        thread::sleep(PROGRAMMING_SETTLE);
        let positions = match self.send_recv(&Command::GetPosition)? {
            Message::GetPosition(payload) => payload,
            other => return Err(SessionError::Protocol(format!("expected GetPosition, got {other:?}"))),
        };
        self.snapshot.apply_position(&positions)?;
        Ok(())
    }

    pub fn exit_programming(&mut self) -> Result<(), SessionError> {
        if !self.state.can_exit_programming() {
            return self.reject("exit_programming");
        }
        self.link.send(&Command::ExitProgramming)?;
        self.state.exit_programming();
        Ok(())
    }

    /// Requires `bias_learned`; admissible only in a Programming substate.
    pub fn set_position(&mut self) -> Result<(), SessionError> {
        if !self.state.can_programming_command() {
            return self.reject("set_position");
        }
        if !self.snapshot.bias_learned {
            let _ = self.announce_error();
            return Err(SessionError::BiasNotLearned);
        }
        let frame = self.snapshot.encode_position_frame()?;
        self.link.send(&Command::SetPosition(frame))?;
        Ok(())
    }

    pub fn set_locks(&mut self) -> Result<(), SessionError> {
        if !self.state.can_programming_command() {
            return self.reject("set_locks");
        }
        let frame = self.snapshot.encode_lock_frame();
        self.link.send(&Command::Locks(frame))?;
        Ok(())
    }

    pub fn unlock_all(&mut self) -> Result<(), SessionError> {
        if !self.state.can_programming_command() {
            return self.reject("unlock_all");
        }
        self.link.send(&Command::UnlockAll)?;
        self.snapshot.unlock_all();
        Ok(())
    }

    pub fn lock_all(&mut self) -> Result<(), SessionError> {
        if !self.state.can_programming_command() {
            return self.reject("lock_all");
        }
        self.link.send(&Command::LockAll)?;
        self.snapshot.lock_all();
        Ok(())
    }

    /// Autobot-only: unlocks both wheel joints, then drives them with
    /// opposing sign so the pair turns the vehicle rather than spinning the
    /// wheels against each other.
    pub fn spin_wheel(&mut self, value: f64) -> Result<(), SessionError> {
        if !self.variant().supports_programming() {
            return Ok(());
        }
        if let Some(s) = self.snapshot.joints.get_mut("rightWheelSpeed") {
            s.locked = false;
        }
        if let Some(s) = self.snapshot.joints.get_mut("leftWheelSpeed") {
            s.locked = false;
        }
        self.set_locks()?;
        self.snapshot.set_joint_value("rightWheelSpeed", value)?;
        self.snapshot.set_joint_value("leftWheelSpeed", -value)?;
        self.set_position()
    }

    /// Generic single-joint move; admissible only in a Programming substate.
    pub fn move_servo(&mut self, label: &str, value: f64) -> Result<(), SessionError> {
        if !self.state.can_programming_command() {
            return self.reject("move_servo");
        }
        self.snapshot.set_joint_value(label, value)?;
        self.set_position()
    }

    // -- One-shot wrappers ----------------------------------------------------

    pub fn enter_usb_mode(&mut self) -> Result<(), SessionError> {
        self.link.send(&Command::EnterUsbMode)?;
        Ok(())
    }

    pub fn shutdown(&mut self) -> Result<(), SessionError> {
        self.link.send(&Command::Shutdown)?;
        Ok(())
    }

    pub fn status(&mut self) -> Result<GetState, SessionError> {
        self.expect_get_state()
    }

    pub fn model(&mut self) -> Result<String, SessionError> {
        match self.send_recv(&Command::Model)? {
            Message::Model(t) => Ok(t.text),
            other => Err(SessionError::Protocol(format!("expected Model, got {other:?}"))),
        }
    }

    pub fn version(&mut self) -> Result<String, SessionError> {
        match self.send_recv(&Command::Version)? {
            Message::Version(t) => Ok(t.text),
            other => Err(SessionError::Protocol(format!("expected Version, got {other:?}"))),
        }
    }

    pub fn firmware(&mut self) -> Result<String, SessionError> {
        match self.send_recv(&Command::FirmwareDate)? {
            Message::FirmwareDate(t) => Ok(t.text),
            other => Err(SessionError::Protocol(format!("expected FirmwareDate, got {other:?}"))),
        }
    }

    pub fn serial_number(&mut self) -> Result<String, SessionError> {
        match self.send_recv(&Command::SerialNumber)? {
            Message::SerialNumber(t) => Ok(t.text),
            other => Err(SessionError::Protocol(format!("expected SerialNumber, got {other:?}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io;

    struct MockTransport {
        inbound: VecDeque<Vec<u8>>,
        fail_next: usize,
    }

    impl Transport for MockTransport {
        fn write(&mut self, _data: &[u8]) -> io::Result<()> {
            if self.fail_next > 0 {
                self.fail_next -= 1;
                return Err(io::Error::other("injected write failure"));
            }
            Ok(())
        }

        fn recv_timeout(&mut self, _timeout: Duration) -> io::Result<Option<Vec<u8>>> {
            Ok(self.inbound.pop_front())
        }
    }

    fn session_in(state: State) -> Session<MockTransport> {
        let mut session = Session::new(MockTransport { inbound: VecDeque::new(), fail_next: 0 }, Variant::AutobotHumanoid);
        match state {
            State::HumanoidIdle => session.state.on_startup_probe(true),
            State::VehicleIdle => session.state.on_startup_probe(false),
            _ => unreachable!(),
        }
        session
    }

    #[test]
    fn forward_from_idle_transitions_to_moving() {
        let mut session = session_in(State::HumanoidIdle);
        session.forward().unwrap();
        assert_eq!(session.state(), State::HumanoidMoving);
        assert!(session.snapshot().moving);
    }

    #[test]
    fn stop_tolerates_two_failed_writes() {
        // scenario 5
        let mut session = Session::new(MockTransport { inbound: VecDeque::new(), fail_next: 2 }, Variant::AutobotHumanoid);
        session.state.on_startup_probe(true);
        session.forward().unwrap();
        session.stop().unwrap();
        assert!(!session.snapshot().moving);
        assert_eq!(session.state(), State::HumanoidIdle);
    }

    #[test]
    fn set_position_without_bias_dispatches_announce_error_not_opcode_232() {
        // scenario 6
        let mut session = session_in(State::HumanoidIdle);
        session.state.enter_programming();
        let err = session.set_position().unwrap_err();
        assert!(matches!(err, SessionError::BiasNotLearned));
    }

    #[test]
    fn set_position_outside_programming_is_inadmissible() {
        let mut session = session_in(State::HumanoidIdle);
        let err = session.set_position().unwrap_err();
        assert!(matches!(err, SessionError::Inadmissible { intent: "set_position" }));
    }

    #[test]
    fn change_speed_is_noop_on_autobot() {
        let mut session = session_in(State::HumanoidIdle);
        session.change_speed(true).unwrap();
        assert!(!session.snapshot().fast_mode);
    }

    #[test]
    fn enter_programming_noop_on_dinobot() {
        let mut session = Session::new(MockTransport { inbound: VecDeque::new(), fail_next: 0 }, Variant::Dinobot);
        session.state.on_startup_probe(true);
        session.enter_programming(false).unwrap();
        assert_eq!(session.state(), State::HumanoidIdle);
    }
}
