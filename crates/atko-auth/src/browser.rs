//! Opening the authorization URL

use tracing::warn;

use crate::error::{AuthError, AuthResult};

/// Sends the user to the authorization URL
pub trait BrowserLauncher: Send + Sync {
    /// Open `url` for the user
    ///
    /// # Errors
    ///
    /// [`AuthError::Browser`] when the URL cannot be presented at all.
    fn open(&self, url: &str) -> AuthResult<()>;
}

/// The desktop's default browser
///
/// When no browser can be launched (headless machines, SSH sessions) the URL is printed to
/// stderr so the user can open it elsewhere; the callback listener keeps waiting either way.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBrowser;

impl BrowserLauncher for SystemBrowser {
    fn open(&self, url: &str) -> AuthResult<()> {
        if let Err(e) = open::that(url) {
            warn!(error = %e, "could not launch a browser");
            eprintln!("Open this URL in a browser to continue:\n\n    {url}\n");
        }
        Ok(())
    }
}

/// Only prints the URL
#[derive(Debug, Default, Clone, Copy)]
pub struct PrintUrl;

impl BrowserLauncher for PrintUrl {
    fn open(&self, url: &str) -> AuthResult<()> {
        eprintln!("Open this URL in a browser to continue:\n\n    {url}\n");
        Ok(())
    }
}

impl<F> BrowserLauncher for F
where
    F: Fn(&str) -> AuthResult<()> + Send + Sync,
{
    fn open(&self, url: &str) -> AuthResult<()> {
        self(url).map_err(|e| match e {
            AuthError::Browser(_) => e,
            other => AuthError::Browser(other.to_string()),
        })
    }
}
