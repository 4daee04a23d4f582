use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::bus::{Bus, Key, SubscriptionId, Topics};
use crate::device::{Device, Handle};
use crate::enumerate::{Descriptors, Protocol};
use crate::error::{Error, Result};
use crate::object::{self, Control, Item};
use crate::Capabilities;

#[derive(Debug)]
struct Slot {
    key: Key,
    item: Item,
    subscriptions: Vec<SubscriptionId>,
}

/// Outcome of a broadcast over all subscribed controls
#[derive(Debug, Default)]
pub struct Pass {
    /// Controls that handled the broadcast, in order
    pub done: Vec<u32>,
    /// Controls that failed, with the reason
    pub failed: Vec<(u32, Error)>,
}

impl Pass {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// An open device together with the controls discovered on it
///
/// The session is the only strong owner of the device handle. Dropping it
/// closes the device; control objects that escaped it then fail with
/// [`Error::Detached`].
///
/// # Example
///
/// ```no_run
/// use v4l2ucp::Session;
///
/// let mut session = Session::open("/dev/video0")?;
/// for control in session.controls() {
///     println!("{}: {}", control.description().name, control.value());
/// }
/// session.reset_all();
/// # Ok::<(), v4l2ucp::Error>(())
/// ```
pub struct Session {
    handle: Rc<dyn Handle>,
    path: PathBuf,
    caps: Capabilities,
    protocol: Option<Protocol>,
    slots: Vec<Slot>,
    bus: Bus,
    next_key: u64,
}

impl Session {
    /// Opens the device at `path` read/write, checks that it speaks V4L2 and
    /// enumerates its controls.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let dev = Device::with_path(path).map_err(|source| Error::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_handle(Rc::new(dev), path)
    }

    /// Builds a session on top of an already open handle
    pub fn with_handle<P: Into<PathBuf>>(handle: Rc<dyn Handle>, path: P) -> Result<Self> {
        let path = path.into();
        let caps = handle.query_caps().map_err(|source| Error::NotCompliant {
            path: path.clone(),
            source,
        })?;
        log::info!("opened {} ({}, {})", path.display(), caps.card, caps.driver);

        let mut session = Session {
            handle,
            path,
            caps,
            protocol: None,
            slots: Vec::new(),
            bus: Bus::new(),
            next_key: 0,
        };
        session.scan();
        Ok(session)
    }

    fn scan(&mut self) {
        let handle = Rc::clone(&self.handle);
        let mut descriptors = Descriptors::new(&*handle);
        for desc in descriptors.by_ref() {
            let item = object::build(&handle, desc);
            self.insert(item);
        }
        self.protocol = descriptors.protocol();
        log::debug!(
            "{}: {} entries via {:?} enumeration",
            self.path.display(),
            self.slots.len(),
            self.protocol
        );
    }

    fn insert(&mut self, item: Item) {
        let key = Key(self.next_key);
        self.next_key += 1;

        let mut topics = Topics::empty();
        if let Item::Control(control) = &item {
            topics.set(Topics::REFRESH, control.refreshes());
            topics.set(Topics::RESET, control.resets());
        }

        let mut subscriptions = Vec::new();
        if !topics.is_empty() {
            subscriptions.push(self.bus.subscribe(key, topics));
        }

        self.slots.push(Slot {
            key,
            item,
            subscriptions,
        });
    }

    /// Drops every entry and enumerates the device again
    ///
    /// This is the only point at which changed flags (e.g. a control becoming
    /// inactive) are picked up.
    pub fn rescan(&mut self) {
        for slot in self.slots.drain(..) {
            for sub in slot.subscriptions {
                self.bus.unsubscribe(sub);
            }
        }
        self.scan();
    }

    /// Removes a control (or class heading) and its broadcast subscriptions
    pub fn remove(&mut self, id: u32) -> Option<Item> {
        let pos = self.slots.iter().position(|slot| item_id(&slot.item) == id)?;
        let slot = self.slots.remove(pos);
        for sub in slot.subscriptions {
            self.bus.unsubscribe(sub);
        }
        Some(slot.item)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    /// Which enumeration protocol the last scan used
    pub fn protocol(&self) -> Option<Protocol> {
        self.protocol
    }

    /// Class headings and controls in driver order
    pub fn entries(&self) -> impl Iterator<Item = &Item> {
        self.slots.iter().map(|slot| &slot.item)
    }

    /// Controls (placeholders included) in driver order
    pub fn controls(&self) -> impl Iterator<Item = &Control> {
        self.entries().filter_map(|item| match item {
            Item::Control(control) => Some(control),
            Item::Class(_) => None,
        })
    }

    pub fn control(&self, id: u32) -> Option<&Control> {
        self.controls().find(|control| control.id() == id)
    }

    pub fn control_mut(&mut self, id: u32) -> Option<&mut Control> {
        self.slots.iter_mut().find_map(|slot| match &mut slot.item {
            Item::Control(control) if control.id() == id => Some(control),
            _ => None,
        })
    }

    /// Finds a control by its user-visible name, ignoring case
    pub fn find(&self, name: &str) -> Option<&Control> {
        self.controls()
            .find(|control| control.description().name.eq_ignore_ascii_case(name))
    }

    /// Resolves a decimal id, a 0x-prefixed hex id or a control name
    pub fn lookup(&self, selector: &str) -> Result<u32> {
        let parsed = match selector.strip_prefix("0x") {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => selector.parse().ok(),
        };

        if let Some(id) = parsed {
            if self.control(id).is_some() {
                return Ok(id);
            }
        }

        match (self.find(selector), parsed) {
            (Some(control), _) => Ok(control.id()),
            (None, Some(id)) => Err(Error::NoSuchControl(id)),
            (None, None) => Err(Error::NoSuchName(selector.to_string())),
        }
    }

    pub fn refresh(&mut self, id: u32) -> Result<()> {
        self.control_mut(id).ok_or(Error::NoSuchControl(id))?.refresh()
    }

    pub fn apply(&mut self, id: u32, value: i64) -> Result<()> {
        self.control_mut(id).ok_or(Error::NoSuchControl(id))?.apply(value)
    }

    pub fn reset(&mut self, id: u32) -> Result<()> {
        self.control_mut(id)
            .ok_or(Error::NoSuchControl(id))?
            .reset_to_default()
    }

    /// Re-reads every live control. A failing control does not stop the pass.
    pub fn refresh_all(&mut self) -> Pass {
        self.broadcast(Topics::REFRESH, Control::refresh)
    }

    /// Restores the default of every live control except buttons
    pub fn reset_all(&mut self) -> Pass {
        self.broadcast(Topics::RESET, Control::reset_to_default)
    }

    fn broadcast<F>(&mut self, topic: Topics, mut op: F) -> Pass
    where
        F: FnMut(&mut Control) -> Result<()>,
    {
        let mut pass = Pass::default();

        for key in self.bus.subscribers(topic) {
            let slot = match self.slots.iter_mut().find(|slot| slot.key == key) {
                Some(slot) => slot,
                None => {
                    log::debug!("dropping stale {:?} subscription for {:?}", topic, key);
                    continue;
                }
            };

            if let Item::Control(control) = &mut slot.item {
                let id = control.id();
                match op(control) {
                    Ok(()) => pass.done.push(id),
                    Err(e) => {
                        log::warn!("{}", e);
                        pass.failed.push((id, e));
                    }
                }
            }
        }

        pass
    }
}

fn item_id(item: &Item) -> u32 {
    match item {
        Item::Class(desc) => desc.id,
        Item::Control(control) => control.id(),
    }
}
