use std::any::Any;
use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::rc::Rc;

use rustc_hash::FxHashMap;

use super::Context;
use super::registry::ActionsData;
use crate::error::Avm1Result;
use crate::types::{ObjectId, Value};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PropertyFlags(u8);

impl PropertyFlags {
    pub const NONE: Self = Self(0);
    pub const DONT_ENUM: Self = Self(1);
    pub const DONT_DELETE: Self = Self(2);
    pub const READ_ONLY: Self = Self(4);
    pub const DATA: Self = Self(64);
    pub const ACCESSOR: Self = Self(128);

    /// Bits scripts may toggle through `ASSetPropFlags`.
    pub const SCRIPT_MASK: Self = Self(1 | 2 | 4);

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn from_bits_truncate(bits: u8) -> Self {
        Self(bits & (1 | 2 | 4 | 64 | 128))
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

impl BitOr for PropertyFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for PropertyFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for PropertyFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (Self::DONT_ENUM, "DONT_ENUM"),
            (Self::DONT_DELETE, "DONT_DELETE"),
            (Self::READ_ONLY, "READ_ONLY"),
            (Self::DATA, "DATA"),
            (Self::ACCESSOR, "ACCESSOR"),
        ];
        let set: Vec<&str> = names
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "PropertyFlags({})", set.join(" | "))
    }
}

/// Interception hook run before a write lands; its return value replaces the
/// written value.
#[derive(Debug, Clone)]
pub struct Watcher {
    pub name: Rc<str>,
    pub callback: ObjectId,
    pub user_data: Value,
}

#[derive(Debug, Clone)]
pub struct PropertyDescriptor {
    pub(crate) flags: PropertyFlags,
    pub(crate) value: Value,
    pub(crate) getter: Option<ObjectId>,
    pub(crate) setter: Option<ObjectId>,
    pub(crate) watcher: Option<Watcher>,
    pub(crate) original_name: Option<Rc<str>>,
}

impl PropertyDescriptor {
    /// Data slot; `flags` may add DONT_ENUM, DONT_DELETE or READ_ONLY.
    pub fn data(value: Value, flags: PropertyFlags) -> Self {
        let mut flags = flags;
        flags.remove(PropertyFlags::ACCESSOR);
        Self {
            flags: flags | PropertyFlags::DATA,
            value,
            getter: None,
            setter: None,
            watcher: None,
            original_name: None,
        }
    }

    pub fn accessor(getter: Option<ObjectId>, setter: Option<ObjectId>, flags: PropertyFlags) -> Self {
        let mut flags = flags;
        flags.remove(PropertyFlags::DATA | PropertyFlags::READ_ONLY);
        Self {
            flags: flags | PropertyFlags::ACCESSOR,
            value: Value::Undefined,
            getter,
            setter,
            watcher: None,
            original_name: None,
        }
    }

    pub(crate) fn with_flags(flags: PropertyFlags, value: Value) -> Self {
        Self::data(value, flags)
    }

    pub fn flags(&self) -> PropertyFlags {
        self.flags
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn getter(&self) -> Option<ObjectId> {
        self.getter
    }

    pub fn setter(&self) -> Option<ObjectId> {
        self.setter
    }

    pub fn watcher(&self) -> Option<&Watcher> {
        self.watcher.as_ref()
    }

    pub fn original_name(&self) -> Option<&str> {
        self.original_name.as_deref()
    }

    pub fn is_data(&self) -> bool {
        self.flags.contains(PropertyFlags::DATA)
    }

    pub fn is_accessor(&self) -> bool {
        self.flags.contains(PropertyFlags::ACCESSOR)
    }

    pub fn is_enumerable(&self) -> bool {
        !self.flags.contains(PropertyFlags::DONT_ENUM)
    }

    pub fn is_deletable(&self) -> bool {
        !self.flags.contains(PropertyFlags::DONT_DELETE)
    }

    pub fn is_read_only(&self) -> bool {
        self.flags.contains(PropertyFlags::READ_ONLY)
    }
}

/// Host function: `(context, receiver, arguments)`. Construction entry points
/// receive the constructor itself as the receiver.
pub type NativeFn = Rc<dyn Fn(&mut Context, &Value, &[Value]) -> Avm1Result<Value>>;

/// Boxes a closure as a [`NativeFn`], pinning down its argument types.
pub fn native_fn(f: impl Fn(&mut Context, &Value, &[Value]) -> Avm1Result<Value> + 'static) -> NativeFn {
    Rc::new(f)
}

/// Scope chain captured by an interpreted function; only the interpreter
/// knows its concrete type.
pub type CapturedScope = Rc<dyn Any>;

#[derive(Clone)]
pub enum Callable {
    Native {
        name: Rc<str>,
        call: NativeFn,
        construct: Option<NativeFn>,
    },
    Interpreted {
        name: Rc<str>,
        actions: Rc<ActionsData>,
        scope: CapturedScope,
    },
    /// Constructible like an interpreted function, but its body is host code.
    Eval { name: Rc<str>, call: NativeFn },
}

impl Callable {
    pub fn name(&self) -> &str {
        match self {
            Callable::Native { name, .. }
            | Callable::Interpreted { name, .. }
            | Callable::Eval { name, .. } => name,
        }
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Native { name, construct, .. } => {
                write!(f, "Callable::Native({name:?}, constructible: {})", construct.is_some())
            }
            Callable::Interpreted { name, actions, .. } => {
                write!(f, "Callable::Interpreted({name:?}, {:?})", actions.id())
            }
            Callable::Eval { name, .. } => write!(f, "Callable::Eval({name:?})"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ObjectKind {
    Plain,
    Array,
    Boolean(bool),
    Number(f64),
    String(Rc<str>),
    Date(f64),
    Error,
    Function(Callable),
}

#[derive(Debug)]
pub struct ObjectData {
    pub(crate) properties: FxHashMap<Rc<str>, PropertyDescriptor>,
    pub(crate) property_order: Vec<Rc<str>>,
    pub(crate) prototype: Option<ObjectId>,
    pub(crate) kind: ObjectKind,
    pub(crate) blocked_by_script: bool,
    pub(crate) color_transform_blocked_by_script: bool,
}

impl ObjectData {
    pub(crate) fn new(prototype: Option<ObjectId>, kind: ObjectKind) -> Self {
        Self {
            properties: FxHashMap::default(),
            property_order: Vec::new(),
            prototype,
            kind,
            blocked_by_script: false,
            color_transform_blocked_by_script: false,
        }
    }

    pub(crate) fn insert_property(&mut self, key: Rc<str>, desc: PropertyDescriptor) {
        if !self.properties.contains_key(&key) {
            self.property_order.push(key.clone());
        }
        self.properties.insert(key, desc);
    }

    pub(crate) fn remove_property(&mut self, key: &str) -> Option<PropertyDescriptor> {
        let removed = self.properties.remove(key);
        if removed.is_some() {
            self.property_order.retain(|k| &**k != key);
        }
        removed
    }

    pub(crate) fn callable(&self) -> Option<&Callable> {
        match &self.kind {
            ObjectKind::Function(c) => Some(c),
            _ => None,
        }
    }

    pub(crate) fn is_array(&self) -> bool {
        matches!(self.kind, ObjectKind::Array)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_and_accessor_are_exclusive() {
        let d = PropertyDescriptor::data(Value::Number(1.0), PropertyFlags::ACCESSOR);
        assert!(d.is_data());
        assert!(!d.is_accessor());

        let a = PropertyDescriptor::accessor(None, None, PropertyFlags::DATA | PropertyFlags::READ_ONLY);
        assert!(a.is_accessor());
        assert!(!a.is_data());
        assert!(!a.is_read_only());
    }

    #[test]
    fn flag_queries() {
        let d = PropertyDescriptor::data(
            Value::Undefined,
            PropertyFlags::DONT_ENUM | PropertyFlags::READ_ONLY,
        );
        assert!(!d.is_enumerable());
        assert!(d.is_deletable());
        assert!(d.is_read_only());
        assert_eq!(d.flags().bits(), 1 | 4 | 64);
    }

    #[test]
    fn flags_debug_lists_names() {
        let flags = PropertyFlags::DONT_ENUM | PropertyFlags::DATA;
        assert_eq!(format!("{flags:?}"), "PropertyFlags(DONT_ENUM | DATA)");
    }

    #[test]
    fn insertion_order_survives_overwrite_and_delete() {
        let mut data = ObjectData::new(None, ObjectKind::Plain);
        for key in ["a", "b", "c"] {
            data.insert_property(Rc::from(key), PropertyDescriptor::data(Value::Null, PropertyFlags::NONE));
        }
        data.insert_property(Rc::from("a"), PropertyDescriptor::data(Value::Bool(true), PropertyFlags::NONE));
        data.remove_property("b");
        let order: Vec<&str> = data.property_order.iter().map(|k| &**k).collect();
        assert_eq!(order, ["a", "c"]);
    }
}
