//! Human-facing progress messages on stderr.
//!
//! Each line starts with a short right-aligned label, colored when stderr is a
//! terminal. Workflow commands and outputs for the Actions runner live in
//! [`crate::actions`], not here.

use console::{Color, Term, style};
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};

static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Width labels are padded to, so messages line up.
const LABEL_WIDTH: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Action,
    Success,
    Fail,
    Note,
}

impl Kind {
    fn color(self) -> Color {
        match self {
            Kind::Action => Color::Cyan,
            Kind::Success => Color::Green,
            Kind::Fail => Color::Red,
            Kind::Note => Color::Yellow,
        }
    }
}

fn stderr_is_tty() -> bool {
    Term::stderr().is_term()
}

fn format_label(label: &str, kind: Kind, is_tty: bool) -> String {
    let padded = format!("{label:>LABEL_WIDTH$}");
    if is_tty {
        style(padded).bold().fg(kind.color()).to_string()
    } else {
        padded
    }
}

fn write_labeled(
    w: &mut dyn Write,
    kind: Kind,
    label: &str,
    msg: &str,
    is_tty: bool,
) -> io::Result<()> {
    let label = format_label(label, kind, is_tty);
    if msg.is_empty() {
        writeln!(w, "{label}")
    } else {
        writeln!(w, "{label} {msg}")
    }
}

fn write_detail(w: &mut dyn Write, msg: &str, is_tty: bool) -> io::Result<()> {
    let line = format!("{:LABEL_WIDTH$} {msg}", "");
    if is_tty {
        writeln!(w, "{}", style(line).dim())
    } else {
        writeln!(w, "{line}")
    }
}

fn emit(kind: Kind, label: &str, msg: &str) {
    let _ = write_labeled(&mut io::stderr(), kind, label, msg, stderr_is_tty());
}

pub fn action(label: &str, msg: &str) {
    emit(Kind::Action, label, msg);
}

pub fn success(label: &str, msg: &str) {
    emit(Kind::Success, label, msg);
}

pub fn fail(label: &str, msg: &str) {
    emit(Kind::Fail, label, msg);
}

pub fn note(msg: &str) {
    emit(Kind::Note, "Note", msg);
}

/// Indented secondary line. Only printed in verbose mode.
pub fn detail(msg: &str) {
    if is_verbose() {
        let _ = write_detail(&mut io::stderr(), msg, stderr_is_tty());
    }
}

pub fn set_verbose(enabled: bool) {
    VERBOSE.store(enabled, Ordering::Relaxed);
}

pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::Relaxed)
}
