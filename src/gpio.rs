//! Access to the input pins (encoder and button) via the sysfs GPIO
//! interface.
//!
//! Simple synchronous reads, polled from the watcher threads. Pins are
//! exported when opened and unexported again when dropped, so every exit path
//! that unwinds releases the hardware.

use std::fs::{self, File};
use std::io::{Read, Write};

use anyhow::{bail, Context, Result};

#[derive(Debug)]
pub struct InputPin {
    number: u64,
}

impl InputPin {
    /// Export the pin and configure it as an input. Re-opening an already
    /// exported pin is not an error.
    pub fn open(number: u64) -> Result<InputPin> {
        if fs::metadata(format!("/sys/class/gpio/gpio{}", number)).is_err() {
            let mut export = File::create("/sys/class/gpio/export")
                .context("could not open the gpio export file")?;
            export
                .write_all(number.to_string().as_bytes())
                .with_context(|| format!("could not export gpio {}", number))?;
        }
        let pin = InputPin { number };
        pin.write_attribute("direction", "in")?;
        Ok(pin)
    }

    /// Current level, 0 or 1.
    pub fn read(&self) -> Result<u8> {
        let mut raw = String::new();
        File::open(self.attribute_path("value"))
            .and_then(|mut value| value.read_to_string(&mut raw))
            .with_context(|| format!("could not read gpio {}", self.number))?;
        match raw.trim() {
            "0" => Ok(0),
            "1" => Ok(1),
            other => bail!("gpio {} reported unexpected value {:?}", self.number, other),
        }
    }

    fn attribute_path(&self, name: &str) -> String {
        format!("/sys/class/gpio/gpio{}/{}", self.number, name)
    }

    fn write_attribute(&self, name: &str, value: &str) -> Result<()> {
        let mut attribute = File::create(self.attribute_path(name))
            .with_context(|| format!("could not open gpio {} {}", self.number, name))?;
        attribute
            .write_all(value.as_bytes())
            .with_context(|| format!("could not write gpio {} {}", self.number, name))?;
        Ok(())
    }
}

impl Drop for InputPin {
    fn drop(&mut self) {
        if let Ok(mut unexport) = File::create("/sys/class/gpio/unexport") {
            let _ = unexport.write_all(self.number.to_string().as_bytes());
        }
    }
}
