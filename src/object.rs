//! Live, typed control objects and the factory that builds them.
//!
//! Every object keeps a weak reference to the device handle owned by its
//! session. The device stays the source of truth: the value an object holds is
//! only what it last read or wrote.

use std::rc::{Rc, Weak};

use crate::control::{Description, MenuItem, Type, Value};
use crate::device::Handle;
use crate::error::{Error, Result};

/// Label shown for a menu value the driver did not describe
pub const UNKNOWN_MENU_VALUE: &str = "Unknown value";

/// Value written to trigger a button control
pub const BUTTON_PRESS: i32 = 1;

/// Clamps `value` into `[minimum, maximum]` and snaps it to the nearest
/// multiple of `step` above `minimum`.
///
/// Ties round up unless that would leave the range.
///
/// # Example
///
/// ```
/// use v4l2ucp::object::snap;
/// assert_eq!(snap(7, 0, 10, 2), 8);
/// assert_eq!(snap(-3, 0, 10, 2), 0);
/// assert_eq!(snap(11, 1, 10, 3), 10);
/// ```
pub fn snap(value: i64, minimum: i64, maximum: i64, step: u64) -> i64 {
    if maximum <= minimum {
        return minimum;
    }

    let step = i64::try_from(step.max(1)).unwrap_or(i64::MAX);
    let offset = value.clamp(minimum, maximum) - minimum;
    let mut steps = offset / step;
    if offset % step >= step - step / 2 {
        steps += 1;
    }

    let mut snapped = minimum + steps * step;
    if snapped > maximum {
        snapped -= step;
    }
    snapped
}

/// Descriptor plus a weak path back to the device
#[derive(Debug, Clone)]
struct Binding {
    handle: Weak<dyn Handle>,
    desc: Description,
}

impl Binding {
    fn handle(&self) -> Result<Rc<dyn Handle>> {
        self.handle.upgrade().ok_or(Error::Detached(self.desc.id))
    }

    fn ensure_interactive(&self) -> Result<()> {
        if self.desc.is_interactive() {
            Ok(())
        } else {
            Err(Error::Inactive(self.desc.id))
        }
    }

    fn get(&self) -> Result<i32> {
        let id = self.desc.id;
        self.handle()?
            .control(id)
            .map_err(|source| Error::Get { id, source })
    }

    fn set(&self, value: i32) -> Result<()> {
        let id = self.desc.id;
        self.handle()?
            .set_control(id, value)
            .map_err(|source| Error::Set { id, source })
    }

    fn out_of_range(&self, value: i64) -> Error {
        Error::OutOfRange {
            id: self.desc.id,
            value,
            minimum: self.desc.minimum,
            maximum: self.desc.maximum,
        }
    }
}

/// Logs a re-read after a failed write that failed as well
fn rolled_back(refresh: Result<()>) {
    if let Err(e) = refresh {
        log::warn!("rollback: {}", e);
    }
}

fn to_raw(id: u32, value: i64) -> Result<i32> {
    i32::try_from(value).map_err(|_| Error::OutOfRange {
        id,
        value,
        minimum: i64::from(i32::MIN),
        maximum: i64::from(i32::MAX),
    })
}

#[derive(Debug, Clone)]
/// Ranged integer control
pub struct IntegerControl {
    binding: Binding,
    value: Option<i64>,
}

impl IntegerControl {
    /// Re-reads the value from the device
    ///
    /// On failure the previously displayed value is kept.
    pub fn refresh(&mut self) -> Result<()> {
        self.value = Some(i64::from(self.binding.get()?));
        Ok(())
    }

    /// Writes `value` after clamping it into range and snapping it to the
    /// driver's step. Returns the value actually sent.
    pub fn apply(&mut self, value: i64) -> Result<i64> {
        self.binding.ensure_interactive()?;
        self.write(value)
    }

    /// Writes the driver default, even while the control is inactive.
    /// Read-only controls fail with the driver's error.
    pub fn reset_to_default(&mut self) -> Result<()> {
        self.write(self.binding.desc.default).map(|_| ())
    }

    fn write(&mut self, value: i64) -> Result<i64> {
        let desc = &self.binding.desc;
        let snapped = snap(value, desc.minimum, desc.maximum, desc.step);
        let raw = to_raw(desc.id, snapped)?;

        match self.binding.set(raw) {
            Ok(()) => {
                self.value = Some(snapped);
                Ok(snapped)
            }
            Err(e) => {
                // show what the device actually holds now
                rolled_back(self.refresh());
                Err(e)
            }
        }
    }

    pub fn value(&self) -> Option<i64> {
        self.value
    }
}

#[derive(Debug, Clone)]
/// On/off control
pub struct BooleanControl {
    binding: Binding,
    value: Option<bool>,
}

impl BooleanControl {
    pub fn refresh(&mut self) -> Result<()> {
        self.value = Some(self.binding.get()? != 0);
        Ok(())
    }

    pub fn apply(&mut self, value: bool) -> Result<()> {
        self.binding.ensure_interactive()?;
        self.write(value)
    }

    pub fn reset_to_default(&mut self) -> Result<()> {
        self.write(self.binding.desc.default != 0)
    }

    fn write(&mut self, value: bool) -> Result<()> {
        match self.binding.set(i32::from(value)) {
            Ok(()) => {
                self.value = Some(value);
                Ok(())
            }
            Err(e) => {
                rolled_back(self.refresh());
                Err(e)
            }
        }
    }

    pub fn value(&self) -> Option<bool> {
        self.value
    }
}

#[derive(Debug, Clone)]
/// Control selecting one of a set of driver-described items
///
/// Drivers may leave holes between `minimum` and `maximum`; only the indices
/// the driver described are listed in [`MenuControl::items`].
pub struct MenuControl {
    binding: Binding,
    items: Vec<(u32, MenuItem)>,
    value: Option<i64>,
}

impl MenuControl {
    pub fn refresh(&mut self) -> Result<()> {
        self.value = Some(i64::from(self.binding.get()?));
        Ok(())
    }

    /// Selects the item at `index`
    pub fn apply(&mut self, index: i64) -> Result<()> {
        self.binding.ensure_interactive()?;
        self.write(index)
    }

    pub fn reset_to_default(&mut self) -> Result<()> {
        self.write(self.binding.desc.default)
    }

    fn write(&mut self, index: i64) -> Result<()> {
        let desc = &self.binding.desc;
        let known = self.items.is_empty()
            || self.items.iter().any(|(i, _)| i64::from(*i) == index);
        if index < desc.minimum || index > desc.maximum || !known {
            return Err(self.binding.out_of_range(index));
        }

        let raw = to_raw(desc.id, index)?;
        match self.binding.set(raw) {
            Ok(()) => {
                self.value = Some(index);
                Ok(())
            }
            Err(e) => {
                rolled_back(self.refresh());
                Err(e)
            }
        }
    }

    pub fn value(&self) -> Option<i64> {
        self.value
    }

    pub fn items(&self) -> &[(u32, MenuItem)] {
        &self.items
    }

    /// Label of the current value, [`UNKNOWN_MENU_VALUE`] if the driver never
    /// described it
    pub fn label(&self) -> String {
        self.value
            .and_then(|v| self.items.iter().find(|(i, _)| i64::from(*i) == v))
            .map(|(_, item)| item.to_string())
            .unwrap_or_else(|| UNKNOWN_MENU_VALUE.to_string())
    }
}

#[derive(Debug, Clone)]
/// Action control without a readable value
pub struct ButtonControl {
    binding: Binding,
}

impl ButtonControl {
    /// Triggers the action
    pub fn press(&self) -> Result<()> {
        self.binding.ensure_interactive()?;
        self.binding.set(BUTTON_PRESS)
    }
}

#[derive(Debug, Clone)]
/// Stand-in for a control of a type this crate cannot operate
pub struct Placeholder {
    desc: Description,
}

#[derive(Debug, Clone)]
/// A live control of one of the supported kinds
pub enum Control {
    Integer(IntegerControl),
    Boolean(BooleanControl),
    Menu(MenuControl),
    Button(ButtonControl),
    Unknown(Placeholder),
}

impl Control {
    pub fn description(&self) -> &Description {
        match self {
            Control::Integer(c) => &c.binding.desc,
            Control::Boolean(c) => &c.binding.desc,
            Control::Menu(c) => &c.binding.desc,
            Control::Button(c) => &c.binding.desc,
            Control::Unknown(p) => &p.desc,
        }
    }

    pub fn id(&self) -> u32 {
        self.description().id
    }

    /// False for placeholders and for controls the driver reported as
    /// grabbed, read-only or inactive when they were enumerated
    pub fn is_interactive(&self) -> bool {
        !matches!(self, Control::Unknown(_)) && self.description().is_interactive()
    }

    /// Whether a "refresh all" broadcast should reach this control
    pub fn refreshes(&self) -> bool {
        !matches!(self, Control::Unknown(_))
    }

    /// Whether a "reset all" broadcast should reach this control
    pub fn resets(&self) -> bool {
        !matches!(self, Control::Button(_) | Control::Unknown(_))
    }

    /// Re-reads the value from the device. Buttons and placeholders have
    /// nothing to read and succeed without touching the device.
    pub fn refresh(&mut self) -> Result<()> {
        match self {
            Control::Integer(c) => c.refresh(),
            Control::Boolean(c) => c.refresh(),
            Control::Menu(c) => c.refresh(),
            Control::Button(_) | Control::Unknown(_) => Ok(()),
        }
    }

    /// Restores the driver default. A no-op for buttons and placeholders.
    ///
    /// Unlike [`Control::apply`] this also reaches inactive controls.
    pub fn reset_to_default(&mut self) -> Result<()> {
        match self {
            Control::Integer(c) => c.reset_to_default(),
            Control::Boolean(c) => c.reset_to_default(),
            Control::Menu(c) => c.reset_to_default(),
            Control::Button(_) | Control::Unknown(_) => Ok(()),
        }
    }

    /// Writes a raw integer value, interpreted per kind
    ///
    /// Integers are clamped and snapped, booleans take any non-zero value as
    /// true, menus take an item index and buttons are pressed regardless of
    /// the value.
    pub fn apply(&mut self, value: i64) -> Result<()> {
        match self {
            Control::Integer(c) => c.apply(value).map(|_| ()),
            Control::Boolean(c) => c.apply(value != 0),
            Control::Menu(c) => c.apply(value),
            Control::Button(c) => c.press(),
            Control::Unknown(p) => Err(Error::UnknownKind {
                id: p.desc.id,
                typ: p.desc.typ,
            }),
        }
    }

    /// The value last read from or written to the device
    pub fn value(&self) -> Value {
        match self {
            Control::Integer(c) => c.value.map_or(Value::None, Value::Integer),
            Control::Boolean(c) => c.value.map_or(Value::None, Value::Boolean),
            Control::Menu(c) => c
                .value
                .map_or(Value::None, |v| Value::Menu(v, c.label())),
            Control::Button(_) | Control::Unknown(_) => Value::None,
        }
    }
}

/// What the factory made of one descriptor
#[derive(Debug, Clone)]
pub enum Item {
    /// Heading for the controls that follow
    Class(Description),
    Control(Control),
}

/// Turns a descriptor into a live control
///
/// Menu items are enumerated here, skipping indices the driver rejects. The
/// initial value is read once; a failing read leaves the control without a
/// value but does not fail the build.
pub fn build(handle: &Rc<dyn Handle>, desc: Description) -> Item {
    let binding = Binding {
        handle: Rc::downgrade(handle),
        desc,
    };

    let typ = binding.desc.typ;
    let mut control = match typ {
        Type::CtrlClass => return Item::Class(binding.desc),
        Type::Integer => Control::Integer(IntegerControl {
            binding,
            value: None,
        }),
        Type::Boolean => Control::Boolean(BooleanControl {
            binding,
            value: None,
        }),
        Type::Menu => {
            let items = menu_items(&**handle, &binding.desc);
            Control::Menu(MenuControl {
                binding,
                items,
                value: None,
            })
        }
        Type::Button => Control::Button(ButtonControl { binding }),
        typ => {
            log::debug!(
                "control {:#010x} ({}) has unsupported type {}",
                binding.desc.id,
                binding.desc.name,
                typ
            );
            Control::Unknown(Placeholder { desc: binding.desc })
        }
    };

    if let Err(e) = control.refresh() {
        log::warn!("{}", e);
    }
    Item::Control(control)
}

fn menu_items(handle: &dyn Handle, desc: &Description) -> Vec<(u32, MenuItem)> {
    let (Ok(first), Ok(last)) = (u32::try_from(desc.minimum), u32::try_from(desc.maximum)) else {
        return Vec::new();
    };

    // Drivers may advertise indices they do not implement. Skip those.
    (first..=last)
        .filter_map(|index| match handle.query_menu(desc, index) {
            Ok(item) => Some((index, item)),
            Err(_) => {
                log::trace!("menu {:#010x} has no item {}", desc.id, index);
                None
            }
        })
        .collect()
}
