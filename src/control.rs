use std::fmt;

use crate::v4l2::c_str;
use crate::v4l_sys::{v4l2_queryctrl, v4l2_querymenu};

/// Control data type
#[allow(clippy::unreadable_literal)]
#[rustfmt::skip]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Type {
    Integer,
    Boolean,
    Menu,
    Button,
    Integer64,
    CtrlClass,
    String,
    Bitmask,
    IntegerMenu,

    /* Compound types are >= 0x0100 */
    U8,
    U16,
    U32,
    Area,

    Unknown(u32),
}

impl From<u32> for Type {
    fn from(repr: u32) -> Self {
        match repr {
            1 => Self::Integer,
            2 => Self::Boolean,
            3 => Self::Menu,
            4 => Self::Button,
            5 => Self::Integer64,
            6 => Self::CtrlClass,
            7 => Self::String,
            8 => Self::Bitmask,
            9 => Self::IntegerMenu,

            0x0100 => Self::U8,
            0x0101 => Self::U16,
            0x0102 => Self::U32,
            0x0106 => Self::Area,
            repr => Self::Unknown(repr),
        }
    }
}

impl From<Type> for u32 {
    fn from(t: Type) -> Self {
        match t {
            Type::Integer => 1,
            Type::Boolean => 2,
            Type::Menu => 3,
            Type::Button => 4,
            Type::Integer64 => 5,
            Type::CtrlClass => 6,
            Type::String => 7,
            Type::Bitmask => 8,
            Type::IntegerMenu => 9,

            Type::U8 => 0x0100,
            Type::U16 => 0x0101,
            Type::U32 => 0x0102,
            Type::Area => 0x0106,
            Type::Unknown(t) => t,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

bitflags::bitflags! {
    #[derive(PartialEq, Eq, Hash, Debug, Clone, Copy)]
    pub struct Flags: u32 {
        const DISABLED              = 0x0001;
        const GRABBED               = 0x0002;
        const READ_ONLY             = 0x0004;
        const UPDATE                = 0x0008;
        const INACTIVE              = 0x0010;
        const SLIDER                = 0x0020;
        const WRITE_ONLY            = 0x0040;
        const VOLATILE              = 0x0080;
        const HAS_PAYLOAD           = 0x0100;
        const EXECUTE_ON_WRITE      = 0x0200;
        const MODIFY_LAYOUT         = 0x0400;

        /// Any of these leaves the control visible but not operable
        const INERT = Self::GRABBED.bits() | Self::READ_ONLY.bits() | Self::INACTIVE.bits();
    }
}

impl From<u32> for Flags {
    fn from(flags: u32) -> Self {
        Self::from_bits_retain(flags)
    }
}

impl From<Flags> for u32 {
    fn from(flags: Flags) -> Self {
        flags.bits()
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Device control menu item
pub enum MenuItem {
    Name(String),
    Value(i64),
}

impl fmt::Display for MenuItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MenuItem::Name(name) => {
                write!(f, "{}", name)?;
            }
            MenuItem::Value(value) => {
                write!(f, "{}", value)?;
            }
        }
        Ok(())
    }
}

impl TryFrom<(Type, v4l2_querymenu)> for MenuItem {
    type Error = ();

    fn try_from(item: (Type, v4l2_querymenu)) -> Result<Self, Self::Error> {
        // name and value share a union inside a packed struct
        let menu = item.1.__bindgen_anon_1;
        unsafe {
            match item.0 {
                Type::Menu => Ok(MenuItem::Name(c_str(&menu.name))),
                Type::IntegerMenu => Ok(MenuItem::Value(menu.value)),
                _ => Err(()),
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Device control description
pub struct Description {
    /// Control identifier
    pub id: u32,
    /// Type of control
    pub typ: Type,
    /// Name of the control, intended for the user
    pub name: String,
    /// Minimum value, inclusive
    pub minimum: i64,
    /// Maximum value, inclusive
    pub maximum: i64,
    /// Step size, always positive
    pub step: u64,
    /// Default value
    pub default: i64,
    /// Control flags
    pub flags: Flags,
}

impl Description {
    /// Whether a user may operate the control at all
    pub fn is_interactive(&self) -> bool {
        !self.flags.intersects(Flags::INERT)
    }

    /// Whether the driver asked for the control to be hidden
    pub fn is_disabled(&self) -> bool {
        self.flags.contains(Flags::DISABLED)
    }
}

impl From<v4l2_queryctrl> for Description {
    fn from(ctrl: v4l2_queryctrl) -> Self {
        Self {
            id: ctrl.id,
            typ: Type::from(ctrl.type_),
            name: c_str(&ctrl.name),
            minimum: i64::from(ctrl.minimum),
            maximum: i64::from(ctrl.maximum),
            step: u64::from(ctrl.step.unsigned_abs()),
            default: i64::from(ctrl.default_value),
            flags: Flags::from(ctrl.flags),
        }
    }
}

impl fmt::Display for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ID         : {:#010x}", self.id)?;
        writeln!(f, "Type       : {}", self.typ)?;
        writeln!(f, "Name       : {}", self.name)?;
        writeln!(f, "Minimum    : {}", self.minimum)?;
        writeln!(f, "Maximum    : {}", self.maximum)?;
        writeln!(f, "Step       : {}", self.step)?;
        writeln!(f, "Default    : {}", self.default)?;
        writeln!(f, "Flags      : {}", self.flags)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Value last read from (or written to) a control
pub enum Value {
    /* buttons, placeholders and controls not read yet */
    None,
    Integer(i64),
    Boolean(bool),
    /// Menu index and the label it maps to
    Menu(i64, String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "-"),
            Value::Integer(v) => write!(f, "{}", v),
            Value::Boolean(v) => write!(f, "{}", v),
            Value::Menu(index, label) => write!(f, "{} ({})", label, index),
        }
    }
}
