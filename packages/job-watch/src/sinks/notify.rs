use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, info};

use crate::traits::sink::Notifier;
use crate::types::job::StoredJob;

const TITLE: &str = "New Job Found!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backend {
    NotifySend,
    Osascript,
}

/// Desktop notifications through the platform's command-line notifier
/// (`notify-send` on Linux, `osascript` on macOS).
///
/// Fire-and-forget: the notifier process is spawned and reaped in the
/// background, and its exit status is ignored.
pub struct DesktopNotifier {
    program: PathBuf,
    backend: Backend,
}

impl DesktopNotifier {
    /// Locate a notifier on `PATH`, if the platform has one.
    pub fn detect() -> Option<Self> {
        [("notify-send", Backend::NotifySend), ("osascript", Backend::Osascript)]
            .into_iter()
            .find_map(|(name, backend)| {
                which::which(name)
                    .ok()
                    .map(|program| Self { program, backend })
            })
    }

    fn command(&self, message: &str) -> Command {
        let mut command = Command::new(&self.program);
        match self.backend {
            Backend::NotifySend => {
                command.arg("--app-name=job-watch").arg(TITLE).arg(message);
            }
            Backend::Osascript => {
                command.arg("-e").arg(apple_script(message));
            }
        }
        command
    }
}

fn apple_script(message: &str) -> String {
    let escape = |s: &str| s.replace('\\', "\\\\").replace('"', "\\\"");
    format!(
        "display notification \"{}\" with title \"{}\" sound name \"default\"",
        escape(message),
        escape(TITLE)
    )
}

#[async_trait]
impl Notifier for DesktopNotifier {
    async fn notify(&self, site: &str, job: &StoredJob) -> std::io::Result<()> {
        let message = format!("{site}\n{}", job.url);
        let mut child = self
            .command(&message)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()?;

        tokio::spawn(async move {
            if let Err(e) = child.wait().await {
                debug!(error = %e, "Notifier process did not exit cleanly");
            }
        });
        Ok(())
    }
}

/// Notifier that only emits a log event. Used when no desktop notifier is
/// available or notifications are disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, site: &str, job: &StoredJob) -> std::io::Result<()> {
        info!(site = %site, url = %job.url, "{TITLE}");
        Ok(())
    }
}
