//! Discovery of the controls a driver advertises.
//!
//! Drivers either support "give me the control after X" queries, which also
//! reach driver-private controls, or they only answer for explicit ids. In
//! the latter case the standard user control range is scanned, followed by
//! the legacy private range until the first id the driver rejects. Both paths
//! produce the same [`Descriptors`] sequence.

use crate::control::Description;
use crate::device::Handle;
use crate::v4l_sys::{
    V4L2_CID_BASE, V4L2_CID_LASTP1, V4L2_CID_PRIVATE_BASE, V4L2_CTRL_FLAG_NEXT_CTRL,
    V4L2_CTRL_ID_MASK,
};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
/// Which query protocol a [`Descriptors`] iterator ended up using
pub enum Protocol {
    /// `V4L2_CTRL_FLAG_NEXT_CTRL` iteration
    Extended,
    /// Explicit id scan over the standard and private ranges
    Fallback,
}

#[derive(Debug, Copy, Clone)]
enum State {
    Start,
    Extended { last: u32 },
    Standard { next: u32 },
    Private { next: u32 },
    Done,
}

/// Lazy, non-restartable sequence of the enabled controls of a device
///
/// Disabled controls are skipped. A failed query never surfaces as an error:
/// it either skips an id (standard range) or ends the sequence.
///
/// # Example
///
/// ```no_run
/// use v4l2ucp::enumerate::Descriptors;
/// use v4l2ucp::Device;
///
/// let dev = Device::with_path("/dev/video0").unwrap();
/// for desc in Descriptors::new(&dev) {
///     println!("{}", desc.name);
/// }
/// ```
pub struct Descriptors<'a, H: Handle + ?Sized> {
    handle: &'a H,
    state: State,
    protocol: Option<Protocol>,
}

impl<'a, H: Handle + ?Sized> Descriptors<'a, H> {
    pub fn new(handle: &'a H) -> Self {
        Descriptors {
            handle,
            state: State::Start,
            protocol: None,
        }
    }

    /// The protocol in use, known once the first item has been requested
    pub fn protocol(&self) -> Option<Protocol> {
        self.protocol
    }

    /// Next descriptor the driver reports, disabled ones included
    fn next_raw(&mut self) -> Option<Description> {
        loop {
            match self.state {
                State::Start => match self.handle.query_control(V4L2_CTRL_FLAG_NEXT_CTRL) {
                    Ok(desc) => {
                        log::debug!("driver supports extended control enumeration");
                        self.protocol = Some(Protocol::Extended);
                        self.state = State::Extended { last: desc.id };
                        return Some(desc);
                    }
                    Err(e) => {
                        log::debug!("extended control enumeration unavailable ({}), scanning ids", e);
                        self.protocol = Some(Protocol::Fallback);
                        self.state = State::Standard {
                            next: V4L2_CID_BASE,
                        };
                    }
                },
                State::Extended { last } => {
                    match self.handle.query_control(last | V4L2_CTRL_FLAG_NEXT_CTRL) {
                        Ok(desc) if desc.id & V4L2_CTRL_ID_MASK > last & V4L2_CTRL_ID_MASK => {
                            self.state = State::Extended { last: desc.id };
                            return Some(desc);
                        }
                        Ok(desc) => {
                            log::warn!(
                                "driver answered {:#010x} after {:#010x}, stopping enumeration",
                                desc.id,
                                last
                            );
                            self.state = State::Done;
                        }
                        Err(_) => self.state = State::Done,
                    }
                }
                State::Standard { next } => {
                    self.state = if next + 1 < V4L2_CID_LASTP1 {
                        State::Standard { next: next + 1 }
                    } else {
                        State::Private {
                            next: V4L2_CID_PRIVATE_BASE,
                        }
                    };

                    match self.handle.query_control(next) {
                        Ok(desc) => return Some(desc),
                        Err(_) => log::trace!("no standard control {:#010x}", next),
                    }
                }
                State::Private { next } => match self.handle.query_control(next) {
                    Ok(desc) => {
                        self.state = State::Private { next: next + 1 };
                        return Some(desc);
                    }
                    Err(_) => self.state = State::Done,
                },
                State::Done => return None,
            }
        }
    }
}

impl<'a, H: Handle + ?Sized> Iterator for Descriptors<'a, H> {
    type Item = Description;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let desc = self.next_raw()?;
            if desc.is_disabled() {
                log::trace!("skipping disabled control {:#010x} ({})", desc.id, desc.name);
                continue;
            }
            return Some(desc);
        }
    }
}

impl<'a, H: Handle + ?Sized> std::iter::FusedIterator for Descriptors<'a, H> {}
