//! Interactive line input.
//!
//! Reads happen on a detached thread so that an interrupt can abandon a
//! prompt that is still waiting for input. Hidden input switches terminal
//! echo off for the duration of one read through [`EchoGuard`].

use std::io::{self, BufRead, Write};

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use pbsync_core::error::CredentialError;

/// Ask a question on stderr and read one line from stdin.
///
/// Returns the answer without its line terminator, or an empty string once
/// stdin is exhausted.
///
/// # Errors
///
/// [`CredentialError::Cancelled`] when `cancel` fires.
pub async fn ask(
    question: &str,
    hidden: bool,
    cancel: &CancellationToken,
) -> Result<String, CredentialError> {
    let mut stderr = io::stderr();
    write!(stderr, "{}", question)?;
    stderr.flush()?;

    let _guard = if hidden { EchoGuard::disable() } else { None };

    let (tx, rx) = oneshot::channel();
    std::thread::spawn(move || {
        let mut line = String::new();
        let read = io::stdin().lock().read_line(&mut line).map(|_| line);
        let _ = tx.send(read);
    });

    let read = tokio::select! {
        _ = cancel.cancelled() => {
            if hidden {
                eprintln!();
            }
            return Err(CredentialError::Cancelled);
        }
        read = rx => read.map_err(|_| CredentialError::Cancelled)?,
    };

    // End of input reads as an empty answer.
    let line = read?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Suppresses terminal echo until dropped.
#[cfg(unix)]
pub struct EchoGuard {
    saved: nix::sys::termios::Termios,
}

#[cfg(unix)]
impl EchoGuard {
    /// Turn echo off on stdin. Returns `None` when stdin is not a terminal.
    pub fn disable() -> Option<Self> {
        use nix::sys::termios::{LocalFlags, SetArg, tcgetattr, tcsetattr};
        use std::os::fd::AsFd;

        let stdin = io::stdin();
        let saved = match tcgetattr(stdin.as_fd()) {
            Ok(termios) => termios,
            Err(e) => {
                debug!(error = %e, "stdin is not a terminal, reading input as is");
                return None;
            }
        };

        let mut silent = saved.clone();
        silent.local_flags.remove(LocalFlags::ECHO);
        silent.local_flags.insert(LocalFlags::ECHONL);
        if let Err(e) = tcsetattr(stdin.as_fd(), SetArg::TCSANOW, &silent) {
            debug!(error = %e, "Could not disable echo");
            return None;
        }

        Some(Self { saved })
    }
}

#[cfg(unix)]
impl Drop for EchoGuard {
    fn drop(&mut self) {
        use nix::sys::termios::{SetArg, tcsetattr};
        use std::os::fd::AsFd;

        if let Err(e) = tcsetattr(io::stdin().as_fd(), SetArg::TCSANOW, &self.saved) {
            debug!(error = %e, "Could not restore terminal mode");
        }
    }
}

/// No terminal control on this platform: input is echoed.
#[cfg(not(unix))]
pub struct EchoGuard;

#[cfg(not(unix))]
impl EchoGuard {
    pub fn disable() -> Option<Self> {
        debug!("Echo suppression is not supported on this platform");
        None
    }
}
