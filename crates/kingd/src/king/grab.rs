//! Memory accounting report.

use std::fs;
use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};
use time::OffsetDateTime;

use crate::collaborators::{LiteRuntime, PierManager};
use crate::errors::KingError;

use super::{KING_TARGET, King};

const GB: u64 = 1_000_000_000;
const MB: u64 = 1_000_000;
const KB: u64 = 1_000;

const TERMINAL_HEADER: &str = "measuring daemon:";

/// Renders `bytes` as a labelled decimal size line. Zero renders nothing.
///
/// ```
/// assert_eq!(
///     kingd::format_memory("total marked", 12_345_678).as_deref(),
///     Some("total marked: MB/12.345.678"),
/// );
/// ```
#[must_use]
pub fn format_memory(label: &str, bytes: u64) -> Option<String> {
    let gib = bytes.div_euclid(GB);
    let mib = bytes.rem_euclid(GB).div_euclid(MB);
    let kib = bytes.rem_euclid(MB).div_euclid(KB);
    let bib = bytes.rem_euclid(KB);
    match bytes {
        0 => None,
        _ if gib > 0 => Some(format!("{label}: GB/{gib}.{mib:03}.{kib:03}.{bib:03}")),
        _ if mib > 0 => Some(format!("{label}: MB/{mib}.{kib:03}.{bib:03}")),
        _ if kib > 0 => Some(format!("{label}: KB/{kib}.{bib:03}")),
        _ => Some(format!("{label}: B/{bib}")),
    }
}

/// Date stamp heading a mass report written at `now`.
#[must_use]
pub fn mass_report_stamp(now: OffsetDateTime) -> String {
    format!(
        "~{}.{}.{}..{:02}.{:02}.{:02}..{:04x}",
        now.year(),
        u8::from(now.month()),
        now.day(),
        now.hour(),
        now.minute(),
        now.second(),
        (now.nanosecond() >> 16) & 0xffff,
    )
}

/// File name of a mass report headed by `stamp`.
#[must_use]
pub fn mass_report_name(stamp: &str) -> String {
    format!("{stamp}-daemon.txt")
}

fn write_line(sink: &mut dyn Write, label: &str, bytes: u64) -> io::Result<()> {
    format_memory(label, bytes).map_or(Ok(()), |line| writeln!(sink, "{line}"))
}

fn write_report(
    sink: &mut dyn Write,
    header: &str,
    lite: &mut dyn LiteRuntime,
    pier: &mut dyn PierManager,
) -> io::Result<()> {
    writeln!(sink, "{header}")?;
    let daemon = lite.mark();
    write_line(sink, "daemon", daemon)?;
    let total = daemon.saturating_add(pier.mark(sink)?);
    write_line(sink, "total marked", total)?;
    write_line(sink, "sweep", lite.sweep())
}

impl King {
    /// Writes the memory report.
    ///
    /// With the `memory-log` feature the report goes to a dated file under
    /// the pier's `.urb/put/mass` directory, headed by its date stamp;
    /// otherwise to the terminal.
    ///
    /// # Errors
    ///
    /// Fails when the report cannot be written.
    pub fn grab(&mut self) -> Result<(), KingError> {
        let report_error = |source| KingError::Report { source };
        if cfg!(feature = "memory-log")
            && let Some(directory) = self.mass_directory()
        {
            fs::create_dir_all(&directory).map_err(report_error)?;
            let stamp = mass_report_stamp(OffsetDateTime::now_utc());
            let path = directory.join(mass_report_name(&stamp));
            let mut file = fs::File::create(&path).map_err(report_error)?;
            write_report(&mut file, &stamp, &mut *self.deps.lite, &mut *self.deps.pier)
                .map_err(report_error)?;
            tracing::info!(target: KING_TARGET, %path, "memory report written");
            return Ok(());
        }

        let lite = &mut self.deps.lite;
        let pier = &mut self.deps.pier;
        self.deps
            .terminal
            .report(&mut |sink: &mut dyn Write| {
                write_report(sink, TERMINAL_HEADER, &mut **lite, &mut **pier)
            })
            .map_err(report_error)
    }

    fn mass_directory(&self) -> Option<Utf8PathBuf> {
        self.deps
            .pier
            .active_pier()
            .or_else(|| self.config.pier_path())
            .map(mass_directory)
    }
}

fn mass_directory(pier: &Utf8Path) -> Utf8PathBuf {
    pier.join(".urb").join("put").join("mass")
}
