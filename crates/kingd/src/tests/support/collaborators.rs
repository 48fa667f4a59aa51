//! Recording doubles for the collaborators the daemon drives.
//!
//! Each double shares its log through `Rc<RefCell<_>>` so a scenario can hand
//! a boxed clone to the daemon and still inspect what happened afterwards.

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use camino::{Utf8Path, Utf8PathBuf};
use url::Url;

use king_config::RuntimeFlags;

use crate::collaborators::{
    AttestError, Attestation, Attestor, BootRequest, LiteBootError, LiteRuntime, PierError,
    PierManager, Terminal,
};
use crate::identity::Identity;
use crate::pill::{FetchError, PillFetcher};
use crate::seed::Seed;
use crate::signals::SignalControl;
use crate::slog::Slog;

/// Observations made by [`RecordingPier`].
#[derive(Debug, Default)]
pub struct PierLog {
    /// Signal control handed over before boot.
    pub control: Option<SignalControl>,
    /// Every boot request, in arrival order.
    pub boots: Vec<BootRequest>,
    /// Whether signal handling was running when each boot arrived.
    pub signals_started_at_boot: Vec<bool>,
    /// Flags and paths of resumed piers.
    pub resumes: Vec<(RuntimeFlags, Utf8PathBuf)>,
    /// Orderly exit requests.
    pub exit_requests: usize,
    /// Abrupt shutdowns.
    pub bails: usize,
    /// Remaining loop checks that report the pier as live.
    pub live_turns: usize,
    /// Signal raised from inside the next boot call.
    pub raise_on_boot: Option<i32>,
}

/// Pier manager that records every request.
#[derive(Debug, Clone, Default)]
pub struct RecordingPier {
    log: Rc<RefCell<PierLog>>,
    active: Option<Utf8PathBuf>,
}

impl RecordingPier {
    /// Borrows the recorded observations.
    pub fn log(&self) -> std::cell::Ref<'_, PierLog> {
        self.log.borrow()
    }

    /// Keeps the loop alive for `turns` further checks after boot.
    pub fn stay_live_for(&self, turns: usize) {
        self.log.borrow_mut().live_turns = turns;
    }

    /// Whether a boot call will raise a signal.
    pub fn raises_on_boot(&self) -> bool {
        self.log.borrow().raise_on_boot.is_some()
    }

    /// Raises `signal` from inside the boot call.
    pub fn raise_on_boot(&self, signal: i32) {
        self.log.borrow_mut().raise_on_boot = Some(signal);
    }
}

impl PierManager for RecordingPier {
    fn install_signal_control(&mut self, control: SignalControl) {
        self.log.borrow_mut().control = Some(control);
    }

    fn boot(&mut self, request: BootRequest) -> Result<(), PierError> {
        let mut log = self.log.borrow_mut();
        let started = log.control.as_ref().is_some_and(SignalControl::is_started);
        log.signals_started_at_boot.push(started);
        if let Some(signal) = log.raise_on_boot {
            signal_hook::low_level::raise(signal)
                .map_err(|error| PierError::new("boot", error.to_string()))?;
        }
        self.active = Some(request.pier.clone());
        log.boots.push(request);
        Ok(())
    }

    fn resume(&mut self, flags: RuntimeFlags, path: &Utf8Path) -> Result<(), PierError> {
        self.active = Some(path.to_path_buf());
        self.log.borrow_mut().resumes.push((flags, path.to_path_buf()));
        Ok(())
    }

    fn request_exit(&mut self) {
        self.log.borrow_mut().exit_requests += 1;
    }

    fn bail(&mut self) {
        self.log.borrow_mut().bails += 1;
    }

    fn mark(&mut self, sink: &mut dyn Write) -> io::Result<u64> {
        writeln!(sink, "pier: marked")?;
        Ok(4_000)
    }

    fn active_pier(&self) -> Option<&Utf8Path> {
        self.active.as_deref()
    }

    fn is_live(&self) -> bool {
        let mut log = self.log.borrow_mut();
        if log.live_turns == 0 {
            return false;
        }
        log.live_turns -= 1;
        true
    }
}

/// Observations made by [`RecordingTerminal`].
#[derive(Debug, Default)]
pub struct TerminalLog {
    /// Lines emitted to the console.
    pub lines: Vec<String>,
    /// Log sessions opened.
    pub sessions_opened: usize,
    /// Log sessions closed.
    pub sessions_closed: usize,
    /// Interrupts forwarded to the foreground session.
    pub interrupts: usize,
    /// Window resize notifications.
    pub resizes: usize,
    /// Bytes written through the hijacked report sink.
    pub report: Vec<u8>,
}

/// Terminal layer that records output.
#[derive(Debug, Clone, Default)]
pub struct RecordingTerminal {
    log: Rc<RefCell<TerminalLog>>,
}

impl RecordingTerminal {
    /// Borrows the recorded observations.
    pub fn log(&self) -> std::cell::Ref<'_, TerminalLog> {
        self.log.borrow()
    }
}

impl Terminal for RecordingTerminal {
    fn open_log_session(&mut self) {
        self.log.borrow_mut().sessions_opened += 1;
    }

    fn close_log_session(&mut self) {
        self.log.borrow_mut().sessions_closed += 1;
    }

    fn emit(&mut self, line: &str) {
        self.log.borrow_mut().lines.push(line.to_owned());
    }

    fn forward_interrupt(&mut self) {
        self.log.borrow_mut().interrupts += 1;
    }

    fn notify_resize(&mut self) {
        self.log.borrow_mut().resizes += 1;
    }

    fn report(
        &mut self,
        write: &mut dyn FnMut(&mut dyn Write) -> io::Result<()>,
    ) -> io::Result<()> {
        let mut buffer = Vec::new();
        write(&mut buffer)?;
        self.log.borrow_mut().report.extend(buffer);
        Ok(())
    }
}

/// Observations made by [`FakeRuntime`].
#[derive(Debug, Default)]
pub struct RuntimeLog {
    /// Flags and image lengths of each boot.
    pub boots: Vec<(RuntimeFlags, usize)>,
    /// Whether boots are rejected.
    pub fail: bool,
}

/// Bootstrap interpreter double.
#[derive(Debug, Clone, Default)]
pub struct FakeRuntime {
    log: Rc<RefCell<RuntimeLog>>,
}

impl FakeRuntime {
    /// Borrows the recorded observations.
    pub fn log(&self) -> std::cell::Ref<'_, RuntimeLog> {
        self.log.borrow()
    }

    /// Rejects every later boot.
    pub fn fail_boot(&self) {
        self.log.borrow_mut().fail = true;
    }
}

impl LiteRuntime for FakeRuntime {
    fn boot(&mut self, flags: RuntimeFlags, image: &[u8]) -> Result<(), LiteBootError> {
        let mut log = self.log.borrow_mut();
        log.boots.push((flags, image.len()));
        if log.fail {
            return Err(LiteBootError {
                message: "image rejected".to_owned(),
            });
        }
        Ok(())
    }

    fn mark(&mut self) -> u64 {
        2_048
    }

    fn sweep(&mut self) -> u64 {
        512
    }
}

/// Observations made by [`FakeAttestor`].
#[derive(Debug, Default)]
pub struct AttestorLog {
    /// Comets mined.
    pub mined: usize,
    /// Identities attested, in order.
    pub attested: Vec<Identity>,
    /// Whether the diagnostic sink was installed during each attestation.
    pub sink_installed: Vec<bool>,
}

/// Attestor double that accepts every seed.
#[derive(Debug, Clone, Default)]
pub struct FakeAttestor {
    log: Rc<RefCell<AttestorLog>>,
}

impl FakeAttestor {
    /// Borrows the recorded observations.
    pub fn log(&self) -> std::cell::Ref<'_, AttestorLog> {
        self.log.borrow()
    }
}

impl Attestor for FakeAttestor {
    fn mine_comet(&mut self, _parent: Option<&Identity>) -> Result<Seed, AttestError> {
        self.log.borrow_mut().mined += 1;
        Ok(Seed::new(
            Identity::new(u128::MAX - 7),
            1,
            crate::seed::KeyMaterial::new(vec![5; 32]),
            None,
        ))
    }

    fn attest(&mut self, seed: Seed, slog: &Slog) -> Result<Attestation, AttestError> {
        let mut log = self.log.borrow_mut();
        log.sink_installed.push(slog.is_installed());
        log.attested.push(seed.identity().clone());
        Ok(Attestation {
            event: seed.ring().as_bytes().to_vec(),
        })
    }
}

/// Pill fetcher that serves a fixed body and records requested URLs.
#[derive(Debug, Clone, Default)]
pub struct RecordingFetcher {
    urls: Rc<RefCell<Vec<Url>>>,
    body: Rc<RefCell<Vec<u8>>>,
}

impl RecordingFetcher {
    /// Serves `body` for every later fetch.
    pub fn serve(&self, body: &[u8]) {
        *self.body.borrow_mut() = body.to_vec();
    }

    /// URLs requested so far.
    pub fn urls(&self) -> Vec<Url> {
        self.urls.borrow().clone()
    }
}

impl PillFetcher for RecordingFetcher {
    fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        self.urls.borrow_mut().push(url.clone());
        Ok(self.body.borrow().clone())
    }
}
