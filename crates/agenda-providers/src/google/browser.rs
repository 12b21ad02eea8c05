//! Best-effort browser launching for the authorization URL.

use std::io;

use tracing::{debug, warn};

/// Opens a URL in the user's browser.
pub trait BrowserLauncher: Send + Sync {
    /// Attempts to open `url`. Returning an error is not fatal to callers.
    fn open(&self, url: &str) -> io::Result<()>;
}

/// Launches the platform's default browser.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBrowser;

impl BrowserLauncher for SystemBrowser {
    fn open(&self, url: &str) -> io::Result<()> {
        match std::env::consts::OS {
            "linux" | "macos" | "windows" => open::that_detached(url),
            other => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("unsupported platform: {other}"),
            )),
        }
    }
}

/// Never opens anything; the operator copies the printed URL instead.
#[derive(Debug, Default, Clone, Copy)]
pub struct ManualBrowser;

impl BrowserLauncher for ManualBrowser {
    fn open(&self, _url: &str) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "automatic browser launch disabled",
        ))
    }
}

/// Tries to open `url`, logging and reporting failure without propagating it.
///
/// Returns whether the launcher reported success.
pub fn launch(browser: &dyn BrowserLauncher, url: &str) -> bool {
    match browser.open(url) {
        Ok(()) => {
            debug!("browser launched for authorization");
            true
        }
        Err(e) => {
            warn!("failed to open browser: {}", e);
            eprintln!("Could not open browser automatically: {e}");
            false
        }
    }
}
