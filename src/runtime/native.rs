//! Projection of host-implemented classes into the dynamic object model.
//!
//! A member list is a flat list of names. A name ending in
//! [`ACCESSOR_MARKER`] (`"alpha#"`) becomes an accessor backed by the host
//! members `getAlpha`/`setAlpha`; any other name is copied as a method or a
//! value. Wrapped members are `DONT_ENUM | DONT_DELETE`.

use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use super::*;

pub const ACCESSOR_MARKER: char = '#';

#[derive(Clone)]
pub enum HostMember {
    Method(NativeFn),
    Value(Value),
}

/// Host-side members a wrapper may pick from, keyed by exact name.
#[derive(Clone, Default)]
pub struct HostMembers {
    members: FxHashMap<String, HostMember>,
}

impl HostMembers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(
        mut self,
        name: &str,
        f: impl Fn(&mut Context, &Value, &[Value]) -> Avm1Result<Value> + 'static,
    ) -> Self {
        self.members.insert(name.to_string(), HostMember::Method(native_fn(f)));
        self
    }

    pub fn value(mut self, name: &str, value: Value) -> Self {
        self.members.insert(name.to_string(), HostMember::Value(value));
        self
    }

    pub fn get(&self, name: &str) -> Option<&HostMember> {
        self.members.get(name)
    }

    fn native(&self, name: &str) -> Option<NativeFn> {
        match self.members.get(name)? {
            HostMember::Method(f) => Some(f.clone()),
            HostMember::Value(_) => None,
        }
    }
}

/// Description of a host class handed to [`Context::wrap_native_class`].
#[derive(Default)]
pub struct NativeClassDef<'a> {
    pub name: &'a str,
    /// Plain call of the constructor; returns `undefined` when absent.
    pub call: Option<NativeFn>,
    /// Receives the constructor as `this`. When absent the class constructs
    /// a plain instance of its prototype.
    pub construct: Option<NativeFn>,
    /// Runs once, with the class static state as `this`, on first
    /// [`Context::get_class_static_state`].
    pub static_init: Option<NativeFn>,
    pub statics: HostMembers,
    pub static_members: &'a [&'a str],
    pub instance: HostMembers,
    pub instance_members: &'a [&'a str],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeClass {
    pub constructor: ObjectId,
    pub prototype: ObjectId,
}

fn accessor_names(base: &str) -> (String, String) {
    let mut chars = base.chars();
    let capitalized: String = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
    (format!("get{capitalized}"), format!("set{capitalized}"))
}

impl Context {
    /// Copies the members named in `names` from `host` onto `target`.
    /// Names with no host counterpart are skipped.
    pub fn wrap_native_members(&mut self, target: ObjectId, host: &HostMembers, names: &[&str]) {
        let flags = PropertyFlags::DONT_DELETE | PropertyFlags::DONT_ENUM;
        for name in names {
            if let Some(base) = name.strip_suffix(ACCESSOR_MARKER) {
                let (get_name, set_name) = accessor_names(base);
                let getter = host.native(&get_name).map(|f| self.create_native_function(&get_name, f, None));
                let setter = host.native(&set_name).map(|f| self.create_native_function(&set_name, f, None));
                if getter.is_none() && setter.is_none() {
                    debug!(member = base, "no host accessor pair; skipped");
                    continue;
                }
                self.set_own_property(target, base, PropertyDescriptor::accessor(getter, setter, flags));
                continue;
            }
            let value = match host.get(name) {
                Some(HostMember::Method(f)) => Value::Object(self.create_native_function(name, f.clone(), None)),
                Some(HostMember::Value(v)) => v.clone(),
                None => {
                    debug!(member = name, "no host member; skipped");
                    continue;
                }
            };
            self.set_own_property(target, name, PropertyDescriptor::data(value, flags));
        }
    }

    /// Builds the constructor/prototype pair for a host class. The prototype
    /// inherits from `Object.prototype`.
    pub fn wrap_native_class(&mut self, def: NativeClassDef<'_>) -> NativeClass {
        let call = def.call.unwrap_or_else(|| native_fn(|_, _, _| Ok(Value::Undefined)));
        let construct = def.construct.unwrap_or_else(|| {
            native_fn(|cx, this, args| match this {
                Value::Object(ctor) => cx.construct_from_prototype(*ctor, args, |_, _, _| Ok(Value::Undefined)),
                _ => Ok(Value::Undefined),
            })
        });
        let constructor = self.create_native_function(def.name, call, Some(construct));
        let prototype = self.create_object();
        self.link_constructor(constructor, prototype);
        if let Some(init) = def.static_init {
            self.set_static_initializer(constructor, init);
        }
        self.wrap_native_members(constructor, &def.statics, def.static_members);
        self.wrap_native_members(prototype, &def.instance, def.instance_members);
        trace!(class = def.name, "wrapped native class");
        NativeClass { constructor, prototype }
    }
}
