//! Routing of a command to boot resolution or pier resumption.

use serde_json::Value;

use crate::boot::resolve_boot;
use crate::command::{Command, ProtocolError, decode_command};
use crate::errors::KingError;

use super::{KING_TARGET, King};

impl King {
    /// Runs `command`.
    ///
    /// Boots go through procedure resolution before reaching the pier
    /// manager; resumes go straight to it. `Exit` and `RootAction` are
    /// rejected as unsupported.
    ///
    /// # Errors
    ///
    /// Returns a protocol error for rejected commands and propagates boot
    /// and pier failures.
    pub fn dispatch(&mut self, command: Command) -> Result<(), KingError> {
        let tag = command.tag();
        self.deps.reporter.command_dispatched(tag);
        match command {
            Command::Boot(boot) => {
                let request =
                    resolve_boot(boot, self.flags, &mut *self.deps.attestor, &self.slog)?;
                self.deps.reporter.pill_acquired(request.pill.payload.len());
                self.deps.reporter.boot_requested(&request.identity);
                self.deps.pier.boot(request)?;
                Ok(())
            }
            Command::AcquirePier { path: Some(path) } => {
                self.deps.reporter.pier_resumed(&path);
                self.deps.pier.resume(self.flags, &path)?;
                Ok(())
            }
            Command::AcquirePier { path: None } => Err(ProtocolError::MissingPierPath.into()),
            Command::Exit | Command::RootAction { .. } => {
                tracing::error!(target: KING_TARGET, command = tag, "unsupported command");
                Err(ProtocolError::Unsupported(tag).into())
            }
        }
    }

    /// Decodes a command from its JSON wire form and runs it.
    ///
    /// # Errors
    ///
    /// Returns the decoding failure, or any failure of [`King::dispatch`].
    pub fn dispatch_wire(&mut self, value: Value) -> Result<(), KingError> {
        let command = decode_command(value)?;
        self.dispatch(command)
    }
}
