//! Scoped diagnostic sink used while attested boot is validated.

use std::cell::RefCell;
use std::fmt;

type Sink = Box<dyn Fn(&str)>;

/// Holder for the optional diagnostic sink.
///
/// The sink is only ever replaced through [`Slog::install`], whose guard puts
/// the previous sink back when dropped.
#[derive(Default)]
pub struct Slog {
    sink: RefCell<Option<Sink>>,
}

impl fmt::Debug for Slog {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Slog")
            .field("installed", &self.is_installed())
            .finish()
    }
}

impl Slog {
    /// Creates a holder with no sink installed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `sink` until the returned guard is dropped.
    #[must_use = "the sink is removed as soon as the guard is dropped"]
    pub fn install(&self, sink: impl Fn(&str) + 'static) -> SlogGuard<'_> {
        let previous = self.sink.borrow_mut().replace(Box::new(sink));
        SlogGuard {
            slog: self,
            previous: Some(previous),
        }
    }

    /// Sends `line` to the installed sink. Returns `false` when none is set.
    pub fn emit(&self, line: &str) -> bool {
        self.sink.borrow().as_ref().is_some_and(|sink| {
            sink(line);
            true
        })
    }

    /// Whether a sink is currently installed.
    #[must_use]
    pub fn is_installed(&self) -> bool {
        self.sink.borrow().is_some()
    }
}

/// Restores the previously installed sink on drop.
pub struct SlogGuard<'a> {
    slog: &'a Slog,
    previous: Option<Option<Sink>>,
}

impl Drop for SlogGuard<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            *self.slog.sink.borrow_mut() = previous;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;

    #[test]
    fn guard_removes_sink_on_drop() {
        let slog = Slog::new();
        let lines = Rc::new(RefCell::new(Vec::new()));
        {
            let captured = Rc::clone(&lines);
            let _guard = slog.install(move |line| captured.borrow_mut().push(line.to_owned()));
            assert!(slog.emit("validating"));
        }
        assert!(!slog.is_installed());
        assert!(!slog.emit("dropped"));
        assert_eq!(*lines.borrow(), vec!["validating".to_owned()]);
    }

    #[test]
    fn nested_guards_restore_outer_sink() {
        let slog = Slog::new();
        let outer = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&outer);
        let _outer = slog.install(move |_| *counter.borrow_mut() += 1);
        {
            let _inner = slog.install(|_| {});
            slog.emit("inner");
        }
        slog.emit("outer");
        assert_eq!(*outer.borrow(), 1);
    }
}
