//! Playback sink driven by the tuner.

use std::process::{Child, Command, Stdio};

use anyhow::{Context, Result};
use log::warn;

/// One stream at a time; `start` always replaces whatever is playing.
pub trait Playback {
    fn start(&mut self, url: &str) -> Result<()>;
    fn stop(&mut self) -> Result<()>;
    fn is_playing(&mut self) -> bool;
}

/// Headless VLC child process. The input repeats indefinitely so the noise
/// track plays as continuous static instead of ending.
pub struct VlcPlayer {
    child: Option<Child>,
}

impl VlcPlayer {
    pub fn new() -> VlcPlayer {
        VlcPlayer { child: None }
    }

    fn kill_current(&mut self) -> Result<()> {
        if let Some(mut child) = self.child.take() {
            if child
                .try_wait()
                .context("could not poll the player process")?
                .is_none()
            {
                child.kill().context("could not stop the player process")?;
            }
            child.wait().context("could not reap the player process")?;
        }
        Ok(())
    }
}

impl Playback for VlcPlayer {
    fn start(&mut self, url: &str) -> Result<()> {
        self.kill_current()?;
        let child = Command::new("cvlc")
            .arg("--intf")
            .arg("dummy")
            .arg("--input-repeat=-1")
            .arg(url)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("could not start playback of {}", url))?;
        self.child = Some(child);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.kill_current()
    }

    fn is_playing(&mut self) -> bool {
        match self.child.as_mut() {
            Some(child) => match child.try_wait() {
                Ok(None) => true,
                Ok(Some(status)) => {
                    // The child exited on its own, e.g. a dropped stream.
                    warn!("player exited with {}", status);
                    self.child = None;
                    false
                }
                Err(err) => {
                    warn!("could not poll the player process: {}", err);
                    false
                }
            },
            None => false,
        }
    }
}

impl Drop for VlcPlayer {
    fn drop(&mut self) {
        if let Err(err) = self.kill_current() {
            warn!("player cleanup failed: {:#}", err);
        }
    }
}
