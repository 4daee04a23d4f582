//! Universal control panel core for video4linux2 devices.
//!
//! A [`Session`] opens a device node, checks that it is a V4L2 device and
//! turns every control the driver advertises into a live, typed
//! [`object::Control`]. Controls can be refreshed, written and reset one by
//! one, or all at once through the session's broadcasts.
//!
//! ```no_run
//! use v4l2ucp::prelude::*;
//!
//! let mut session = Session::open("/dev/video0")?;
//! print!("{}", session.capabilities());
//! let pass = session.refresh_all();
//! println!("{} controls refreshed", pass.done.len());
//! # Ok::<(), v4l2ucp::Error>(())
//! ```

#[cfg(feature = "v4l-sys")]
pub use v4l_sys;
#[cfg(all(feature = "v4l2-sys", not(feature = "v4l-sys")))]
pub use v4l2_sys as v4l_sys;

pub mod v4l2;

mod capability;
pub use capability::{Capabilities, Capability, DeviceCapabilities};

pub mod control;

pub mod device;
pub use device::{Device, Handle};

pub mod enumerate;

pub mod object;

pub mod bus;

pub mod session;
pub use session::{Pass, Session};

pub mod schedule;

pub mod context;

mod error;
pub use error::{Error, Result};

pub mod prelude {
    pub use crate::control::{Description, Flags, Type, Value};
    pub use crate::device::{Device, Handle};
    pub use crate::object::{Control, Item};
    pub use crate::schedule::{Interval, Ticker};
    pub use crate::session::{Pass, Session};
}
