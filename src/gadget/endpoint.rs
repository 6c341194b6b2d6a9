//! Concrete HID gadget endpoints over `/dev/hidgN`
//!
//! Each endpoint owns one gadget device file opened with `O_NONBLOCK` and the
//! report state needed to turn press/release/move calls into raw boot-protocol
//! reports. Write failures are classified by errno: EAGAIN surfaces as a
//! retryable backpressure error, transport errnos (EPIPE/ESHUTDOWN/...) as
//! link-down. On link-down the file handle is dropped so the next write can
//! reopen the device once the gadget comes back.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, trace};

use super::{KeyGadget, PointerGadget};
use crate::error::{AppError, Result};
use crate::gadget::report::{KeyboardReport, MouseReport};

fn open_gadget(path: &Path) -> Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags(libc::O_NONBLOCK)
        .open(path)
        .map_err(AppError::Io)
}

/// Shared write path: ensure the device file is open, write one report, and
/// drop the handle on link-down so a later write reopens it.
struct GadgetFile {
    name: &'static str,
    path: PathBuf,
    dev: Mutex<Option<File>>,
}

impl GadgetFile {
    fn open(name: &'static str, path: &Path) -> Result<Self> {
        let file = open_gadget(path)?;
        Ok(Self {
            name,
            path: path.to_path_buf(),
            dev: Mutex::new(Some(file)),
        })
    }

    fn write_report(&self, data: &[u8]) -> Result<()> {
        let mut dev = self.dev.lock();
        if dev.is_none() {
            let file = open_gadget(&self.path)
                .map_err(|_| AppError::GadgetMissing { gadget: self.name })?;
            debug!("reopened {} gadget at {}", self.name, self.path.display());
            *dev = Some(file);
        }

        let file = dev.as_mut().expect("gadget file just ensured");
        match file.write_all(data) {
            Ok(()) => {
                trace!("sent {} report: {:02X?}", self.name, data);
                Ok(())
            }
            Err(e) => {
                let err = AppError::from_hid_write(self.name, e);
                if err.is_link_down() {
                    debug!("{} link down, closing handle for recovery", self.name);
                    *dev = None;
                }
                Err(err)
            }
        }
    }
}

/// Keyboard gadget endpoint (8-byte boot reports)
pub struct KeyboardEndpoint {
    file: GadgetFile,
    report: Mutex<KeyboardReport>,
}

impl KeyboardEndpoint {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            file: GadgetFile::open("keyboard", path)?,
            report: Mutex::new(KeyboardReport::default()),
        })
    }
}

impl KeyGadget for KeyboardEndpoint {
    fn press(&self, usage: u16) -> Result<()> {
        let mut report = self.report.lock();
        let mut next = report.clone();
        if !next.press(usage as u8) {
            // report full: six keys already held, drop the extra one
            return Ok(());
        }
        self.file.write_report(&next.to_bytes())?;
        *report = next;
        Ok(())
    }

    fn release(&self, usage: u16) -> Result<()> {
        let mut report = self.report.lock();
        let mut next = report.clone();
        next.release(usage as u8);
        self.file.write_report(&next.to_bytes())?;
        *report = next;
        Ok(())
    }

    fn release_all(&self) -> Result<()> {
        let mut report = self.report.lock();
        if report.is_empty() {
            return Ok(());
        }
        let mut next = report.clone();
        next.clear();
        self.file.write_report(&next.to_bytes())?;
        *report = next;
        Ok(())
    }
}

/// Consumer-control gadget endpoint (2-byte usage reports)
pub struct ConsumerEndpoint {
    file: GadgetFile,
}

impl ConsumerEndpoint {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            file: GadgetFile::open("consumer", path)?,
        })
    }
}

impl KeyGadget for ConsumerEndpoint {
    fn press(&self, usage: u16) -> Result<()> {
        self.file.write_report(&usage.to_le_bytes())
    }

    fn release(&self, _usage: u16) -> Result<()> {
        self.file.write_report(&0u16.to_le_bytes())
    }

    fn release_all(&self) -> Result<()> {
        self.file.write_report(&0u16.to_le_bytes())
    }
}

/// Relative mouse gadget endpoint (4-byte reports)
pub struct MouseEndpoint {
    file: GadgetFile,
    buttons: Mutex<u8>,
}

impl MouseEndpoint {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            file: GadgetFile::open("mouse", path)?,
            buttons: Mutex::new(0),
        })
    }

    fn write_state(&self, buttons: u8, dx: i8, dy: i8, wheel: i8) -> Result<()> {
        let report = MouseReport {
            buttons,
            x: dx,
            y: dy,
            wheel,
        };
        self.file.write_report(&report.to_bytes())
    }
}

fn clamp_delta(v: i32) -> i8 {
    v.clamp(i8::MIN as i32, i8::MAX as i32) as i8
}

impl PointerGadget for MouseEndpoint {
    fn move_rel(&self, dx: i32, dy: i32, wheel: i32) -> Result<()> {
        let buttons = *self.buttons.lock();
        self.write_state(buttons, clamp_delta(dx), clamp_delta(dy), clamp_delta(wheel))
    }

    fn press(&self, button: u8) -> Result<()> {
        let mut buttons = self.buttons.lock();
        let next = *buttons | button;
        self.write_state(next, 0, 0, 0)?;
        *buttons = next;
        Ok(())
    }

    fn release(&self, button: u8) -> Result<()> {
        let mut buttons = self.buttons.lock();
        let next = *buttons & !button;
        self.write_state(next, 0, 0, 0)?;
        *buttons = next;
        Ok(())
    }

    fn release_all(&self) -> Result<()> {
        let mut buttons = self.buttons.lock();
        if *buttons == 0 {
            return Ok(());
        }
        self.write_state(0, 0, 0, 0)?;
        *buttons = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_clamping_saturates_at_report_range() {
        assert_eq!(clamp_delta(500), 127);
        assert_eq!(clamp_delta(-500), -128);
        assert_eq!(clamp_delta(12), 12);
    }
}
