use std::path::{Path, PathBuf};
use std::{io, mem};

use crate::control::{Description, MenuItem};
use crate::v4l2;
use crate::v4l_sys::{v4l2_capability, v4l2_control, v4l2_queryctrl, v4l2_querymenu};
use crate::Capabilities;

/// Control-level access to an open video4linux device
///
/// [`Device`] implements this against a real descriptor. Everything above the
/// raw ioctl layer only sees this trait, so a scripted driver can stand in.
pub trait Handle {
    /// Query for device capabilities (VIDIOC_QUERYCAP)
    fn query_caps(&self) -> io::Result<Capabilities>;

    /// Describe the control with the given id (VIDIOC_QUERYCTRL)
    ///
    /// `id` may carry `V4L2_CTRL_FLAG_NEXT_CTRL`, in which case the driver
    /// answers with the first control after the masked id.
    fn query_control(&self, id: u32) -> io::Result<Description>;

    /// Describe one item of a menu control (VIDIOC_QUERYMENU)
    fn query_menu(&self, control: &Description, index: u32) -> io::Result<MenuItem>;

    /// Read the current value of a control (VIDIOC_G_CTRL)
    fn control(&self, id: u32) -> io::Result<i32>;

    /// Write a new value to a control (VIDIOC_S_CTRL)
    fn set_control(&self, id: u32, value: i32) -> io::Result<()>;
}

/// Represents an open video4linux device node
pub struct Device {
    /// File descriptor
    fd: std::os::raw::c_int,
    /// Device node path
    path: PathBuf,
}

impl Drop for Device {
    fn drop(&mut self) {
        if let Err(e) = v4l2::close(self.fd) {
            log::warn!("failed to close {}: {}", self.path.display(), e);
        }
    }
}

impl Device {
    /// Opens a device node for reading and writing controls
    ///
    /// # Arguments
    ///
    /// * `path` - Node path, e.g. "/dev/video0"
    ///
    /// # Example
    ///
    /// ```no_run
    /// use v4l2ucp::Device;
    /// let dev = Device::with_path("/dev/video0");
    /// ```
    pub fn with_path<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        let fd = v4l2::open(path, libc::O_RDWR)?;

        Ok(Device {
            fd,
            path: PathBuf::from(path),
        })
    }

    /// Returns the path the device was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ioctl<T>(&self, request: v4l2::vidioc::_IOC_TYPE, arg: &mut T) -> io::Result<()> {
        unsafe { v4l2::ioctl(self.fd, request, arg as *mut T as *mut std::os::raw::c_void) }
    }
}

impl Handle for Device {
    fn query_caps(&self) -> io::Result<Capabilities> {
        let mut v4l2_caps: v4l2_capability = unsafe { mem::zeroed() };
        self.ioctl(v4l2::vidioc::VIDIOC_QUERYCAP, &mut v4l2_caps)?;
        Ok(Capabilities::from(v4l2_caps))
    }

    fn query_control(&self, id: u32) -> io::Result<Description> {
        let mut v4l2_ctrl: v4l2_queryctrl = unsafe { mem::zeroed() };
        v4l2_ctrl.id = id;
        self.ioctl(v4l2::vidioc::VIDIOC_QUERYCTRL, &mut v4l2_ctrl)?;
        Ok(Description::from(v4l2_ctrl))
    }

    fn query_menu(&self, control: &Description, index: u32) -> io::Result<MenuItem> {
        let mut v4l2_menu: v4l2_querymenu = unsafe { mem::zeroed() };
        v4l2_menu.id = control.id;
        v4l2_menu.index = index;
        self.ioctl(v4l2::vidioc::VIDIOC_QUERYMENU, &mut v4l2_menu)?;

        MenuItem::try_from((control.typ, v4l2_menu)).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("control {:#010x} is not a menu", control.id),
            )
        })
    }

    fn control(&self, id: u32) -> io::Result<i32> {
        let mut v4l2_ctrl = v4l2_control { id, value: 0 };
        self.ioctl(v4l2::vidioc::VIDIOC_G_CTRL, &mut v4l2_ctrl)?;
        Ok(v4l2_ctrl.value)
    }

    fn set_control(&self, id: u32, value: i32) -> io::Result<()> {
        let mut v4l2_ctrl = v4l2_control { id, value };
        self.ioctl(v4l2::vidioc::VIDIOC_S_CTRL, &mut v4l2_ctrl)
    }
}
