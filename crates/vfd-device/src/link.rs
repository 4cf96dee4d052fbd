//! Physical interface seam: one HID output report per transport chunk.

use tracing::info;

/// USB vendor id of the Targa VFD.
pub const VENDOR_ID: u16 = 0x19c2;
/// USB product id of the Targa VFD.
pub const PRODUCT_ID: u16 = 0x6a11;

/// Errors from the physical interface.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Device enumeration/open/claim failure.
    #[error(transparent)]
    Hid(#[from] hidapi::HidError),
    /// A device write failed or was short.
    #[error("device write failed: {0}")]
    Write(String),
}

/// One bound physical interface.
///
/// `write_report` carries exactly one transport chunk (length byte plus up
/// to 63 payload bytes). Closing is by drop; the transport drops the link
/// on the first write failure.
pub trait VfdLink: Send {
    fn write_report(&mut self, frame: &[u8]) -> Result<(), LinkError>;
}

/// The real device, claimed over hidapi.
pub struct HidLink {
    device: hidapi::HidDevice,
}

impl HidLink {
    /// Find and claim the display by vendor/product match.
    pub fn open() -> Result<Self, LinkError> {
        let api = hidapi::HidApi::new()?;
        let device = api.open(VENDOR_ID, PRODUCT_ID)?;
        info!("display claimed ({VENDOR_ID:04x}:{PRODUCT_ID:04x})");
        Ok(HidLink { device })
    }
}

impl VfdLink for HidLink {
    fn write_report(&mut self, frame: &[u8]) -> Result<(), LinkError> {
        // hidapi wants the report id in front; the device uses report 0.
        let mut report = Vec::with_capacity(frame.len() + 1);
        report.push(0u8);
        report.extend_from_slice(frame);
        let written = self.device.write(&report)?;
        if written < report.len() {
            return Err(LinkError::Write(format!(
                "short write ({written} of {} bytes)",
                report.len()
            )));
        }
        Ok(())
    }
}
