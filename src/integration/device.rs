//! Scoped ownership of an accelerator handle.

use std::ops::{Deref, DerefMut};

use tracing::{debug, warn};

use crate::error::DeviceError;
use crate::integration::{DetectionSource, Frame};
use crate::tracker::Detection;

/// A hardware handle that must be opened before use and closed exactly once.
pub trait Device {
    type Error: std::error::Error + Send + Sync + 'static;

    fn open(&mut self) -> Result<(), Self::Error>;

    fn close(&mut self) -> Result<(), Self::Error>;

    /// Name used in log messages.
    fn name(&self) -> &str {
        "device"
    }
}

/// Holds an opened device and closes it on `release` or drop.
///
/// Closing happens once on every exit path, including unwinding out of a
/// failed stream setup. A device that fails to open is never closed.
pub struct DeviceGuard<D: Device> {
    device: D,
    open: bool,
}

impl<D: Device> DeviceGuard<D> {
    /// Open `device` and take ownership of it.
    pub fn acquire(mut device: D) -> Result<Self, DeviceError> {
        device
            .open()
            .map_err(|err| DeviceError::new(format!("failed to open {}", device.name()), err))?;
        debug!(device = device.name(), "device opened");
        Ok(Self { device, open: true })
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Close the device now and report the outcome.
    pub fn release(mut self) -> Result<(), DeviceError> {
        self.close_once()
            .map_err(|err| DeviceError::new(format!("failed to close {}", self.device.name()), err))
    }

    fn close_once(&mut self) -> Result<(), D::Error> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        self.device.close()?;
        debug!(device = self.device.name(), "device closed");
        Ok(())
    }
}

impl<D: Device> Drop for DeviceGuard<D> {
    fn drop(&mut self) {
        if let Err(err) = self.close_once() {
            warn!(device = self.device.name(), "failed to close device: {err}");
        }
    }
}

impl<D: Device> Deref for DeviceGuard<D> {
    type Target = D;

    fn deref(&self) -> &D {
        &self.device
    }
}

impl<D: Device> DerefMut for DeviceGuard<D> {
    fn deref_mut(&mut self) -> &mut D {
        &mut self.device
    }
}

/// A guarded device that is itself a detector can drive the pipeline directly.
impl<D: Device + DetectionSource> DetectionSource for DeviceGuard<D> {
    type Error = <D as DetectionSource>::Error;

    fn detect(&mut self, image: &Frame) -> Result<Vec<Detection>, Self::Error> {
        self.device.detect(image)
    }
}
