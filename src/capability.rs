use std::fmt;

use crate::v4l2::c_str;
use crate::v4l_sys::{v4l2_capability, V4L2_CAP_DEVICE_CAPS};

#[allow(clippy::unreadable_literal)]
#[rustfmt::skip]
#[repr(u32)]
#[derive(Debug, Copy, Clone)]
pub enum Capability {
    VideoCapture        = 0x00000001,
    VideoOutput         = 0x00000002,
    VideoOverlay        = 0x00000004,
    VbiCapture          = 0x00000010,
    VbiOutput           = 0x00000020,
    SlicedVbiCapture    = 0x00000040,
    SlicedVbiOutput     = 0x00000080,
    RdsCapture          = 0x00000100,
    VideoOutputOverlay  = 0x00000200,
    HwFreqSeek          = 0x00000400,
    RdsOutput           = 0x00000800,

    VideoCaptureMplane  = 0x00001000,
    VideoOutputMplane   = 0x00002000,
    VideoM2MMplane      = 0x00004000,
    VideoM2M            = 0x00008000,

    Tuner               = 0x00010000,
    Audio               = 0x00020000,
    Radio               = 0x00040000,
    Modulator           = 0x00080000,

    SdrCapture          = 0x00100000,
    ExtPixFormat        = 0x00200000,
    SdrOutput           = 0x00400000,
    MetaCapture         = 0x00800000,

    ReadWrite           = 0x01000000,
    Streaming           = 0x04000000,
    MetaOutput          = 0x08000000,

    Touch               = 0x10000000,
    IoMc                = 0x20000000,

    DeviceCaps          = 0x80000000,
}

const NAMES: &[(Capability, &str)] = &[
    (Capability::VideoCapture, "Video Capture"),
    (Capability::VideoCaptureMplane, "Video Capture Multiplanar"),
    (Capability::VideoOutput, "Video Output"),
    (Capability::VideoOutputMplane, "Video Output Multiplanar"),
    (Capability::VideoM2M, "Video Memory-to-Memory"),
    (Capability::VideoM2MMplane, "Video Memory-to-Memory Multiplanar"),
    (Capability::VideoOverlay, "Video Overlay"),
    (Capability::VideoOutputOverlay, "Video Output Overlay"),
    (Capability::VbiCapture, "VBI Capture"),
    (Capability::VbiOutput, "VBI Output"),
    (Capability::SlicedVbiCapture, "Sliced VBI Capture"),
    (Capability::SlicedVbiOutput, "Sliced VBI Output"),
    (Capability::RdsCapture, "RDS Capture"),
    (Capability::RdsOutput, "RDS Output"),
    (Capability::SdrCapture, "SDR Capture"),
    (Capability::SdrOutput, "SDR Output"),
    (Capability::MetaCapture, "Metadata Capture"),
    (Capability::MetaOutput, "Metadata Output"),
    (Capability::Tuner, "Tuner"),
    (Capability::Touch, "Touch Device"),
    (Capability::HwFreqSeek, "HW Frequency Seek"),
    (Capability::Modulator, "Modulator"),
    (Capability::Audio, "Audio"),
    (Capability::Radio, "Radio"),
    (Capability::ReadWrite, "Read/Write"),
    (Capability::Streaming, "Streaming"),
    (Capability::ExtPixFormat, "Extended Pix Format"),
    (Capability::IoMc, "Media Controller I/O"),
    (Capability::DeviceCaps, "Device Capabilities"),
];

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
/// Device capability flags
pub struct DeviceCapabilities {
    /// Capability flags such as V4L2_CAP_VIDEO_CAPTURE
    pub flags: u32,
}

impl DeviceCapabilities {
    pub fn has(&self, cap: Capability) -> bool {
        self.flags & cap as u32 != 0
    }
}

impl From<u32> for DeviceCapabilities {
    fn from(flags: u32) -> Self {
        DeviceCapabilities { flags }
    }
}

impl fmt::Display for DeviceCapabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut prefix = "";
        let mut flags = self.flags;

        for (cap, info) in NAMES {
            let flag = *cap as u32;
            if flags & flag != 0 {
                write!(f, "{}{}", prefix, info)?;
                prefix = ", ";

                // remove from input flags so we can know about flags we do not recognize
                flags &= !flag;
            }
        }

        if flags != 0 {
            write!(f, "{}{:#x}", prefix, flags)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Device capabilities
pub struct Capabilities {
    /// Driver name, e.g. uvc for usb video class devices
    pub driver: String,
    /// Card name
    pub card: String,
    /// Bus name, e.g. USB or PCI
    pub bus: String,
    /// Version number MAJOR.MINOR.PATCH
    pub version: (u8, u8, u8),

    /// Capabilities of the physical device as a whole
    pub capabilities: DeviceCapabilities,
    /// Capabilities of this particular node, when the driver reports them
    pub device_caps: Option<DeviceCapabilities>,
}

impl From<v4l2_capability> for Capabilities {
    fn from(cap: v4l2_capability) -> Self {
        let device_caps = if cap.capabilities & V4L2_CAP_DEVICE_CAPS != 0 {
            Some(DeviceCapabilities::from(cap.device_caps))
        } else {
            None
        };

        Capabilities {
            driver: c_str(&cap.driver),
            card: c_str(&cap.card),
            bus: c_str(&cap.bus_info),
            version: (
                ((cap.version >> 16) & 0xff) as u8,
                ((cap.version >> 8) & 0xff) as u8,
                (cap.version & 0xff) as u8,
            ),
            capabilities: DeviceCapabilities::from(cap.capabilities),
            device_caps,
        }
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Driver       : {}", self.driver)?;
        writeln!(f, "Card         : {}", self.card)?;
        writeln!(f, "Bus          : {}", self.bus)?;
        writeln!(
            f,
            "Version      : {}.{}.{}",
            self.version.0, self.version.1, self.version.2
        )?;
        writeln!(
            f,
            "Capabilities : {:#010x} ({})",
            self.capabilities.flags, self.capabilities
        )?;
        if let Some(caps) = &self.device_caps {
            writeln!(f, "Device caps  : {:#010x} ({})", caps.flags, caps)?;
        }
        Ok(())
    }
}
