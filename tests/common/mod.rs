//! Scripted V4L2 driver for exercising sessions without hardware.
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::io;

use v4l2ucp::control::{Description, Flags, MenuItem, Type};
use v4l2ucp::v4l_sys::{V4L2_CTRL_FLAG_NEXT_CTRL, V4L2_CTRL_ID_MASK};
use v4l2ucp::{Capabilities, DeviceCapabilities, Handle};

pub struct MockDevice {
    controls: RefCell<Vec<Description>>,
    menus: HashMap<u32, Vec<(u32, String)>>,
    values: RefCell<HashMap<u32, i32>>,
    extended: bool,
    compliant: bool,
    failing_gets: RefCell<HashSet<u32>>,
    failing_sets: RefCell<HashSet<u32>>,
    sets: RefCell<Vec<(u32, i32)>>,
}

impl MockDevice {
    /// A driver supporting `V4L2_CTRL_FLAG_NEXT_CTRL`
    pub fn new() -> Self {
        MockDevice {
            controls: RefCell::new(Vec::new()),
            menus: HashMap::new(),
            values: RefCell::new(HashMap::new()),
            extended: true,
            compliant: true,
            failing_gets: RefCell::new(HashSet::new()),
            failing_sets: RefCell::new(HashSet::new()),
            sets: RefCell::new(Vec::new()),
        }
    }

    /// A driver that only answers explicit ids
    pub fn legacy() -> Self {
        MockDevice {
            extended: false,
            ..MockDevice::new()
        }
    }

    /// A node that fails VIDIOC_QUERYCAP
    pub fn not_v4l2() -> Self {
        MockDevice {
            compliant: false,
            ..MockDevice::new()
        }
    }

    pub fn with(self, desc: Description) -> Self {
        if !matches!(desc.typ, Type::Button | Type::CtrlClass) {
            self.values.borrow_mut().insert(desc.id, desc.default as i32);
        }
        let mut controls = self.controls.borrow_mut();
        controls.push(desc);
        controls.sort_by_key(|d| d.id);
        drop(controls);
        self
    }

    pub fn with_menu(mut self, id: u32, items: &[(u32, &str)]) -> Self {
        self.menus.insert(
            id,
            items.iter().map(|(i, n)| (*i, n.to_string())).collect(),
        );
        self
    }

    /// Changes the value behind the session's back
    pub fn poke(&self, id: u32, value: i32) {
        self.values.borrow_mut().insert(id, value);
    }

    pub fn stored(&self, id: u32) -> Option<i32> {
        self.values.borrow().get(&id).copied()
    }

    pub fn fail_get(&self, id: u32) {
        self.failing_gets.borrow_mut().insert(id);
    }

    pub fn fail_set(&self, id: u32) {
        self.failing_sets.borrow_mut().insert(id);
    }

    pub fn set_flags(&self, id: u32, flags: Flags) {
        for desc in self.controls.borrow_mut().iter_mut() {
            if desc.id == id {
                desc.flags = flags;
            }
        }
    }

    /// Every VIDIOC_S_CTRL that reached the driver, in order
    pub fn sets(&self) -> Vec<(u32, i32)> {
        self.sets.borrow().clone()
    }

    pub fn clear_sets(&self) {
        self.sets.borrow_mut().clear();
    }
}

fn einval() -> io::Error {
    io::Error::from_raw_os_error(libc::EINVAL)
}

impl Handle for MockDevice {
    fn query_caps(&self) -> io::Result<Capabilities> {
        if !self.compliant {
            return Err(io::Error::from_raw_os_error(libc::ENOTTY));
        }
        Ok(Capabilities {
            driver: "mock".into(),
            card: "Scripted Camera".into(),
            bus: "platform:mock".into(),
            version: (6, 1, 0),
            capabilities: DeviceCapabilities::from(0x8420_0001),
            device_caps: Some(DeviceCapabilities::from(0x0420_0001)),
        })
    }

    fn query_control(&self, id: u32) -> io::Result<Description> {
        let controls = self.controls.borrow();
        if id & V4L2_CTRL_FLAG_NEXT_CTRL != 0 {
            if !self.extended {
                return Err(einval());
            }
            let after = id & V4L2_CTRL_ID_MASK;
            return controls
                .iter()
                .find(|d| d.id > after)
                .cloned()
                .ok_or_else(einval);
        }
        controls.iter().find(|d| d.id == id).cloned().ok_or_else(einval)
    }

    fn query_menu(&self, control: &Description, index: u32) -> io::Result<MenuItem> {
        self.menus
            .get(&control.id)
            .and_then(|items| items.iter().find(|(i, _)| *i == index))
            .map(|(_, name)| MenuItem::Name(name.clone()))
            .ok_or_else(einval)
    }

    fn control(&self, id: u32) -> io::Result<i32> {
        if self.failing_gets.borrow().contains(&id) {
            return Err(io::Error::from_raw_os_error(libc::EIO));
        }
        self.values.borrow().get(&id).copied().ok_or_else(einval)
    }

    fn set_control(&self, id: u32, value: i32) -> io::Result<()> {
        if self.failing_sets.borrow().contains(&id) {
            return Err(io::Error::from_raw_os_error(libc::EBUSY));
        }
        let read_only = self
            .controls
            .borrow()
            .iter()
            .any(|d| d.id == id && d.flags.contains(Flags::READ_ONLY));
        if read_only {
            return Err(io::Error::from_raw_os_error(libc::EACCES));
        }
        self.sets.borrow_mut().push((id, value));
        self.values.borrow_mut().insert(id, value);
        Ok(())
    }
}

fn desc(id: u32, typ: Type, name: &str, minimum: i64, maximum: i64, step: u64, default: i64) -> Description {
    Description {
        id,
        typ,
        name: name.to_string(),
        minimum,
        maximum,
        step,
        default,
        flags: Flags::empty(),
    }
}

pub fn integer(id: u32, minimum: i64, maximum: i64, step: u64, default: i64) -> Description {
    desc(id, Type::Integer, &format!("Integer {}", id), minimum, maximum, step, default)
}

pub fn boolean(id: u32, default: i64) -> Description {
    desc(id, Type::Boolean, &format!("Boolean {}", id), 0, 1, 1, default)
}

pub fn menu(id: u32, minimum: i64, maximum: i64, default: i64) -> Description {
    desc(id, Type::Menu, &format!("Menu {}", id), minimum, maximum, 1, default)
}

pub fn button(id: u32) -> Description {
    desc(id, Type::Button, &format!("Button {}", id), 0, 0, 0, 0)
}

pub fn class(id: u32, name: &str) -> Description {
    Description {
        flags: Flags::READ_ONLY | Flags::WRITE_ONLY,
        ..desc(id, Type::CtrlClass, name, 0, 0, 0, 0)
    }
}

pub fn integer64(id: u32) -> Description {
    desc(id, Type::Integer64, &format!("Integer64 {}", id), 0, 1 << 40, 1, 0)
}

pub fn with_flags(mut desc: Description, flags: Flags) -> Description {
    desc.flags = flags;
    desc
}
