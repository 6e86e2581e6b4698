use std::rc::Rc;

use rustc_hash::FxHashSet;
use tracing::warn;

use super::*;

/// Virtual slot exposing the prototype link.
pub(crate) const PROTO_NAME: &str = "__proto__";

/// Movie-clip geometry names that ignore writes of `undefined`.
const GEOMETRY_NAMES: [&str; 6] = ["_x", "_y", "_xscale", "_yscale", "_width", "_height"];

impl Context {
    pub fn prototype_of(&self, obj: ObjectId) -> Option<ObjectId> {
        self.data(obj).and_then(|d| d.prototype)
    }

    /// Re-links `obj`. A link that would make `obj` reachable from itself is
    /// ignored and reported as `false`. Chains therefore stay acyclic, which
    /// every other chain walk relies on to terminate.
    pub fn set_prototype(&mut self, obj: ObjectId, prototype: Option<ObjectId>) -> bool {
        if let Some(proto) = prototype {
            let mut cursor = Some(proto);
            while let Some(current) = cursor {
                if current == obj {
                    warn!(?obj, ?proto, "rejected prototype link that would form a cycle");
                    return false;
                }
                cursor = self.prototype_of(current);
            }
        }
        match self.data_mut(obj) {
            Some(data) => {
                data.prototype = prototype;
                true
            }
            None => false,
        }
    }

    /// Own lookup on an already normalized key.
    pub(crate) fn own_descriptor(&self, obj: ObjectId, key: &str) -> Option<PropertyDescriptor> {
        let data = self.data(obj)?;
        if let Some(desc) = data.properties.get(key) {
            return Some(desc.clone());
        }
        if key == PROTO_NAME {
            let proto = data.prototype?;
            return Some(PropertyDescriptor::data(
                Value::Object(proto),
                PropertyFlags::DONT_ENUM | PropertyFlags::DONT_DELETE,
            ));
        }
        None
    }

    /// Chain lookup on a normalized key; yields the owner with the descriptor.
    pub(crate) fn find_property(&self, obj: ObjectId, key: &str) -> Option<(ObjectId, PropertyDescriptor)> {
        let mut cursor = Some(obj);
        while let Some(current) = cursor {
            if let Some(desc) = self.own_descriptor(current, key) {
                return Some((current, desc));
            }
            cursor = self.prototype_of(current);
        }
        None
    }

    pub fn get_own_property(&mut self, obj: ObjectId, name: &str) -> Option<PropertyDescriptor> {
        let key = self.normalize_name(name);
        self.own_descriptor(obj, &key)
    }

    /// Stores `desc` under the normalized name, remembering `name` as the
    /// enumeration spelling when names fold case.
    pub fn set_own_property(&mut self, obj: ObjectId, name: &str, desc: PropertyDescriptor) {
        let key = self.normalize_name(name);
        self.store_own(obj, key, name, desc);
    }

    fn store_own(&mut self, obj: ObjectId, key: Rc<str>, name: &str, mut desc: PropertyDescriptor) {
        if !self.case_sensitive && desc.original_name.is_none() {
            desc.original_name = Some(Rc::from(name));
        }
        if let Some(data) = self.data_mut(obj) {
            data.insert_property(key, desc);
        }
    }

    pub fn has_own_property(&mut self, obj: ObjectId, name: &str) -> bool {
        self.get_own_property(obj, name).is_some()
    }

    /// Drops the own slot unconditionally; flags are not consulted.
    pub fn delete_own_property(&mut self, obj: ObjectId, name: &str) -> bool {
        let key = self.normalize_name(name);
        self.data_mut(obj)
            .and_then(|d| d.remove_property(&key))
            .is_some()
    }

    pub fn get_property(&mut self, obj: ObjectId, name: &str) -> Option<PropertyDescriptor> {
        let key = self.normalize_name(name);
        self.find_property(obj, &key).map(|(_, desc)| desc)
    }

    pub fn has_property(&mut self, obj: ObjectId, name: &str) -> bool {
        self.get_property(obj, name).is_some()
    }

    pub fn get(&mut self, obj: ObjectId, name: &str) -> Avm1Result<Value> {
        let key = self.normalize_name(name);
        self.get_key(obj, &key)
    }

    /// `get` on a key that is already normalized.
    pub(crate) fn get_key(&mut self, obj: ObjectId, key: &str) -> Avm1Result<Value> {
        match self.find_property(obj, key) {
            None => Ok(Value::Undefined),
            Some((_, desc)) if desc.is_data() => Ok(desc.value),
            Some((_, desc)) => match desc.getter {
                Some(getter) => self.call(getter, &Value::Object(obj), &[]),
                None => Ok(Value::Undefined),
            },
        }
    }

    /// `get` with a script-supplied key.
    pub fn get_value(&mut self, obj: ObjectId, key: &Value) -> Avm1Result<Value> {
        let key = self.normalize_key(key)?;
        self.get_key(obj, &key)
    }

    pub fn can_put(&mut self, obj: ObjectId, name: &str) -> bool {
        let key = self.normalize_name(name);
        self.can_put_key(obj, &key)
    }

    fn can_put_key(&self, obj: ObjectId, key: &str) -> bool {
        let mut cursor = Some(obj);
        while let Some(current) = cursor {
            if let Some(desc) = self.own_descriptor(current, key) {
                return if desc.is_accessor() {
                    desc.setter.is_some()
                } else {
                    !desc.is_read_only()
                };
            }
            cursor = self.prototype_of(current);
        }
        true
    }

    pub fn put(&mut self, obj: ObjectId, name: &str, value: Value) -> Avm1Result<()> {
        let key = self.normalize_name(name);
        self.put_key(obj, key, name, value)
    }

    /// `put` on a key that is already normalized; `name` is the spelling
    /// remembered for enumeration.
    pub(crate) fn put_key(&mut self, obj: ObjectId, key: Rc<str>, name: &str, value: Value) -> Avm1Result<()> {
        let receiver = Value::Object(obj);

        if &*key == PROTO_NAME && !self.has_table_slot(obj, &key) {
            self.set_prototype(obj, value.as_object());
            return Ok(());
        }

        if !self.can_put_key(obj, &key) {
            return Ok(());
        }

        let own = self
            .data(obj)
            .and_then(|d| d.properties.get(&key))
            .filter(|d| d.is_data())
            .map(|d| (d.watcher.clone(), d.value.clone()));
        if let Some((watcher, old)) = own {
            let value = match watcher {
                Some(w) => self.call(
                    w.callback,
                    &receiver,
                    &[Value::String(w.name.clone()), old, value, w.user_data.clone()],
                )?,
                None => value,
            };
            // the watcher may have removed the slot
            match self.data_mut(obj).and_then(|d| d.properties.get_mut(&key)) {
                Some(slot) => slot.value = value,
                None => self.store_own(obj, key.clone(), name, PropertyDescriptor::data(value, PropertyFlags::NONE)),
            }
            self.after_write(obj, &key)?;
            return Ok(());
        }

        if value.is_undefined() && GEOMETRY_NAMES.contains(&&*key) {
            return Ok(());
        }

        match self.find_property(obj, &key) {
            Some((_, desc)) if desc.is_accessor() => {
                let mut value = value;
                if let Some(w) = &desc.watcher {
                    let old = match desc.getter {
                        Some(getter) => self.call(getter, &receiver, &[])?,
                        None => Value::Undefined,
                    };
                    value = self.call(
                        w.callback,
                        &receiver,
                        &[Value::String(w.name.clone()), old, value, w.user_data.clone()],
                    )?;
                }
                if let Some(setter) = desc.setter {
                    self.call(setter, &receiver, &[value])?;
                }
            }
            found => {
                let mut value = value;
                let mut flags = PropertyFlags::DATA;
                if let Some((_, desc)) = found {
                    flags = desc.flags;
                    if let Some(w) = &desc.watcher {
                        value = self.call(
                            w.callback,
                            &receiver,
                            &[Value::String(w.name.clone()), desc.value.clone(), value, w.user_data.clone()],
                        )?;
                    }
                }
                self.store_own(obj, key.clone(), name, PropertyDescriptor::with_flags(flags, value));
                self.after_write(obj, &key)?;
            }
        }
        Ok(())
    }

    /// `put` with a script-supplied key.
    pub fn put_value(&mut self, obj: ObjectId, key: &Value, value: Value) -> Avm1Result<()> {
        match key {
            Value::String(s) => self.put(obj, s, value),
            other => {
                let key = self.normalize_key(other)?;
                self.put_key(obj, key.clone(), &key, value)
            }
        }
    }

    fn has_table_slot(&self, obj: ObjectId, key: &str) -> bool {
        self.data(obj).is_some_and(|d| d.properties.contains_key(key))
    }

    fn after_write(&mut self, obj: ObjectId, key: &Rc<str>) -> Avm1Result<()> {
        if self.data(obj).is_some_and(ObjectData::is_array) {
            self.sync_array_length(obj, key)?;
        }
        if self.event_observers.contains_key(key) {
            self.broadcast_event_property_change(key);
        }
        Ok(())
    }

    /// Returns `false` only when an own slot refuses deletion.
    pub fn delete_property(&mut self, obj: ObjectId, name: &str) -> bool {
        let key = self.normalize_name(name);
        self.delete_key(obj, &key)
    }

    pub(crate) fn delete_key(&mut self, obj: ObjectId, key: &str) -> bool {
        let deletable = match self.own_descriptor(obj, key) {
            None => return true,
            Some(desc) => desc.is_deletable(),
        };
        if !deletable {
            return false;
        }
        if let Some(data) = self.data_mut(obj) {
            data.remove_property(key);
        }
        if self.event_observers.contains_key(key) {
            self.broadcast_event_property_change(key);
        }
        true
    }

    /// Attaches a watcher to the slot `get_property` would find, which may
    /// live on a prototype.
    pub fn add_watcher(&mut self, obj: ObjectId, name: &str, callback: ObjectId, user_data: Value) -> bool {
        let key = self.normalize_name(name);
        let Some((owner, _)) = self.find_property(obj, &key) else {
            return false;
        };
        match self.data_mut(owner).and_then(|d| d.properties.get_mut(&key)) {
            Some(slot) => {
                slot.watcher = Some(Watcher {
                    name: Rc::from(name),
                    callback,
                    user_data,
                });
                true
            }
            None => false,
        }
    }

    pub fn remove_watcher(&mut self, obj: ObjectId, name: &str) -> bool {
        let key = self.normalize_name(name);
        let Some((owner, _)) = self.find_property(obj, &key) else {
            return false;
        };
        match self.data_mut(owner).and_then(|d| d.properties.get_mut(&key)) {
            Some(slot) => {
                slot.watcher = None;
                true
            }
            None => false,
        }
    }

    pub fn default_value(&mut self, obj: ObjectId, hint: DefaultValueHint) -> Avm1Result<Value> {
        let order = match hint {
            DefaultValueHint::String => ["toString", "valueOf"],
            DefaultValueHint::Number => ["valueOf", "toString"],
        };
        let receiver = Value::Object(obj);
        for method in order {
            let f = self.get(obj, method)?;
            if self.is_callable(&f) {
                return self.call_value(&f, &receiver, &[]);
            }
        }
        Ok(receiver)
    }

    /// Own enumerable names, spelled as first written when names fold case.
    pub fn own_property_keys(&self, obj: ObjectId) -> Vec<Rc<str>> {
        let Some(data) = self.data(obj) else {
            return Vec::new();
        };
        data.property_order
            .iter()
            .filter_map(|key| {
                let desc = data.properties.get(key)?;
                if !desc.is_enumerable() {
                    return None;
                }
                match (&desc.original_name, self.case_sensitive) {
                    (Some(original), false) => Some(original.clone()),
                    _ => Some(key.clone()),
                }
            })
            .collect()
    }

    /// Enumerable names along the whole chain, nearest first. Duplicates are
    /// dropped by normalized identity, keeping the first spelling seen.
    pub fn all_keys(&self, obj: ObjectId) -> Vec<Rc<str>> {
        let mut seen: FxHashSet<Rc<str>> = FxHashSet::default();
        let mut keys = Vec::new();
        let mut cursor = Some(obj);
        while let Some(current) = cursor {
            let Some(data) = self.data(current) else {
                break;
            };
            for key in &data.property_order {
                let Some(desc) = data.properties.get(key) else {
                    continue;
                };
                if !desc.is_enumerable() || !seen.insert(key.clone()) {
                    continue;
                }
                match (&desc.original_name, self.case_sensitive) {
                    (Some(original), false) => keys.push(original.clone()),
                    _ => keys.push(key.clone()),
                }
            }
            cursor = data.prototype;
        }
        keys
    }

    /// `ASSetPropFlags`: rewrites the script-visible flag bits of own
    /// properties. `names == None` targets every own property, hidden or not.
    pub fn set_property_flags(
        &mut self,
        obj: ObjectId,
        names: Option<&[Rc<str>]>,
        set: PropertyFlags,
        clear: PropertyFlags,
    ) {
        let keys: Vec<Rc<str>> = match names {
            Some(names) => names.iter().map(|n| self.normalize_name(n)).collect(),
            None => self
                .data(obj)
                .map(|d| d.property_order.clone())
                .unwrap_or_default(),
        };
        let set = PropertyFlags::from_bits_truncate(set.bits() & PropertyFlags::SCRIPT_MASK.bits());
        let clear = PropertyFlags::from_bits_truncate(clear.bits() & PropertyFlags::SCRIPT_MASK.bits());
        let Some(data) = self.data_mut(obj) else {
            return;
        };
        for key in keys {
            if let Some(desc) = data.properties.get_mut(&key) {
                desc.flags.remove(clear);
                desc.flags.insert(set);
                if desc.is_accessor() {
                    desc.flags.remove(PropertyFlags::READ_ONLY);
                }
            }
        }
    }

    /// Walks `value`'s prototype chain looking for `obj`.
    pub fn is_prototype_of(&self, obj: ObjectId, value: &Value) -> bool {
        let Some(start) = value.as_object() else {
            return false;
        };
        let mut cursor = self.prototype_of(start);
        while let Some(current) = cursor {
            if current == obj {
                return true;
            }
            cursor = self.prototype_of(current);
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use super::*;

    fn native(cx: &mut Context, f: impl Fn(&mut Context, &Value, &[Value]) -> Avm1Result<Value> + 'static) -> ObjectId {
        cx.native_function("test", f)
    }

    #[test]
    fn put_then_get() {
        let mut cx = Context::with_swf_version(8);
        let obj = cx.create_object();
        assert!(cx.can_put(obj, "answer"));
        cx.put(obj, "answer", Value::Number(42.0)).unwrap();
        assert_eq!(cx.get(obj, "answer").unwrap(), Value::Number(42.0));
        assert!(cx.has_own_property(obj, "answer"));
    }

    #[test]
    fn inherited_reads_do_not_show_as_own() {
        let mut cx = Context::with_swf_version(5);
        let proto = cx.create_object();
        let obj = cx.create_object_with_proto(Some(proto));
        cx.put(proto, "foo", Value::Number(1.0)).unwrap();
        assert_eq!(cx.get(obj, "foo").unwrap(), Value::Number(1.0));
        assert!(cx.get_own_property(obj, "foo").is_none());
        assert!(cx.has_property(obj, "foo"));
    }

    #[test]
    fn read_only_write_is_silent() {
        let mut cx = Context::with_swf_version(8);
        let obj = cx.create_object();
        cx.set_own_property(obj, "k", PropertyDescriptor::data(Value::Number(1.0), PropertyFlags::READ_ONLY));
        assert!(!cx.can_put(obj, "k"));
        cx.put(obj, "k", Value::Number(2.0)).unwrap();
        assert_eq!(cx.get(obj, "k").unwrap(), Value::Number(1.0));
    }

    #[test]
    fn inherited_read_only_blocks_shadowing() {
        let mut cx = Context::with_swf_version(8);
        let proto = cx.create_object();
        let obj = cx.create_object_with_proto(Some(proto));
        cx.set_own_property(proto, "k", PropertyDescriptor::data(Value::Number(1.0), PropertyFlags::READ_ONLY));
        cx.put(obj, "k", Value::Number(2.0)).unwrap();
        assert!(cx.get_own_property(obj, "k").is_none());
    }

    #[test]
    fn shadowing_copies_found_flags() {
        let mut cx = Context::with_swf_version(8);
        let proto = cx.create_object();
        let obj = cx.create_object_with_proto(Some(proto));
        cx.set_own_property(proto, "hidden", PropertyDescriptor::data(Value::Null, PropertyFlags::DONT_ENUM));
        cx.put(obj, "hidden", Value::Number(3.0)).unwrap();
        let own = cx.get_own_property(obj, "hidden").unwrap();
        assert!(!own.is_enumerable());
        assert_eq!(own.value(), &Value::Number(3.0));
        assert_eq!(cx.get(proto, "hidden").unwrap(), Value::Null);
    }

    #[test]
    fn geometry_undefined_writes_dropped() {
        let mut cx = Context::with_swf_version(6);
        let clip = cx.create_object();
        cx.put(clip, "_X", Value::Undefined).unwrap();
        assert!(!cx.has_own_property(clip, "_x"));
        cx.put(clip, "_x", Value::Number(10.0)).unwrap();
        // existing own data slots still take the write
        cx.put(clip, "_x", Value::Undefined).unwrap();
        assert_eq!(cx.get(clip, "_x").unwrap(), Value::Undefined);
        cx.put(clip, "other", Value::Undefined).unwrap();
        assert!(cx.has_own_property(clip, "other"));
    }

    #[test]
    fn accessor_get_and_put() {
        let mut cx = Context::with_swf_version(8);
        let store = Rc::new(Cell::new(5.0));
        let read = store.clone();
        let getter = native(&mut cx, move |_, _, _| Ok(Value::Number(read.get())));
        let write = store.clone();
        let setter = native(&mut cx, move |cx, _, args| {
            let n = coerce::to_number(cx, args.first().unwrap_or(&Value::Undefined))?;
            write.set(n);
            Ok(Value::Undefined)
        });
        let proto = cx.create_object();
        let obj = cx.create_object_with_proto(Some(proto));
        cx.set_own_property(proto, "size", PropertyDescriptor::accessor(Some(getter), Some(setter), PropertyFlags::NONE));

        assert_eq!(cx.get(obj, "size").unwrap(), Value::Number(5.0));
        cx.put(obj, "size", Value::Number(9.0)).unwrap();
        assert_eq!(store.get(), 9.0);
        assert!(cx.get_own_property(obj, "size").is_none());
    }

    #[test]
    fn watched_accessor_sees_getter_value() {
        let mut cx = Context::with_swf_version(8);
        let store = Rc::new(Cell::new(5.0));
        let setter_calls = Rc::new(RefCell::new(Vec::new()));
        let read = store.clone();
        let getter = native(&mut cx, move |_, _, _| Ok(Value::Number(read.get())));
        let (write, calls) = (store.clone(), setter_calls.clone());
        let setter = native(&mut cx, move |cx, _, args| {
            let n = coerce::to_number(cx, &args[0])?;
            calls.borrow_mut().push(n);
            write.set(n);
            Ok(Value::Undefined)
        });
        let olds = Rc::new(RefCell::new(Vec::new()));
        let seen = olds.clone();
        let doubler = native(&mut cx, move |cx, _, args| {
            seen.borrow_mut().push(args[1].clone());
            Ok(Value::Number(coerce::to_number(cx, &args[2])? * 2.0))
        });
        let proto = cx.create_object();
        let obj = cx.create_object_with_proto(Some(proto));
        cx.set_own_property(proto, "size", PropertyDescriptor::accessor(Some(getter), Some(setter), PropertyFlags::NONE));
        assert!(cx.add_watcher(obj, "size", doubler, Value::Undefined));

        cx.put(obj, "size", Value::Number(3.0)).unwrap();
        assert_eq!(*olds.borrow(), [Value::Number(5.0)]);
        assert_eq!(*setter_calls.borrow(), [6.0]);
        assert_eq!(cx.get(obj, "size").unwrap(), Value::Number(6.0));
        assert!(cx.get_own_property(obj, "size").is_none());
    }

    #[test]
    fn accessor_without_setter_is_not_writable() {
        let mut cx = Context::with_swf_version(8);
        let getter = native(&mut cx, |_, _, _| Ok(Value::Number(1.0)));
        let obj = cx.create_object();
        cx.set_own_property(obj, "ro", PropertyDescriptor::accessor(Some(getter), None, PropertyFlags::NONE));
        assert!(!cx.can_put(obj, "ro"));
        cx.put(obj, "ro", Value::Number(2.0)).unwrap();
        assert_eq!(cx.get(obj, "ro").unwrap(), Value::Number(1.0));

        cx.set_own_property(obj, "empty", PropertyDescriptor::accessor(None, None, PropertyFlags::NONE));
        assert_eq!(cx.get(obj, "empty").unwrap(), Value::Undefined);
    }

    #[test]
    fn own_watcher_transforms_in_place() {
        let mut cx = Context::with_swf_version(8);
        let obj = cx.create_object();
        cx.put(obj, "hp", Value::Number(1.0)).unwrap();
        let seen = Rc::new(Cell::new(0.0));
        let seen_in = seen.clone();
        let watcher = native(&mut cx, move |cx, _, args| {
            let old = coerce::to_number(cx, &args[1])?;
            seen_in.set(old);
            let new = coerce::to_number(cx, &args[2])?;
            let bonus = coerce::to_number(cx, &args[3])?;
            Ok(Value::Number(new + bonus))
        });
        assert!(cx.add_watcher(obj, "hp", watcher, Value::Number(100.0)));
        cx.put(obj, "hp", Value::Number(5.0)).unwrap();
        assert_eq!(seen.get(), 1.0);
        assert_eq!(cx.get(obj, "hp").unwrap(), Value::Number(105.0));
        assert!(cx.remove_watcher(obj, "hp"));
        cx.put(obj, "hp", Value::Number(5.0)).unwrap();
        assert_eq!(cx.get(obj, "hp").unwrap(), Value::Number(5.0));
    }

    #[test]
    fn watcher_requires_existing_property() {
        let mut cx = Context::with_swf_version(8);
        let obj = cx.create_object();
        let watcher = native(&mut cx, |_, _, args| Ok(args[2].clone()));
        assert!(!cx.add_watcher(obj, "missing", watcher, Value::Undefined));
        assert!(!cx.remove_watcher(obj, "missing"));
    }

    #[test]
    fn delete_respects_dont_delete() {
        let mut cx = Context::with_swf_version(8);
        let obj = cx.create_object();
        cx.set_own_property(obj, "pinned", PropertyDescriptor::data(Value::Number(1.0), PropertyFlags::DONT_DELETE));
        cx.put(obj, "loose", Value::Number(2.0)).unwrap();
        assert!(!cx.delete_property(obj, "pinned"));
        assert_eq!(cx.get(obj, "pinned").unwrap(), Value::Number(1.0));
        assert!(cx.delete_property(obj, "loose"));
        assert!(!cx.has_property(obj, "loose"));
        assert!(cx.delete_property(obj, "never-existed"));
    }

    #[test]
    fn delete_only_touches_own_slots() {
        let mut cx = Context::with_swf_version(8);
        let proto = cx.create_object();
        let obj = cx.create_object_with_proto(Some(proto));
        cx.put(proto, "shared", Value::Bool(true)).unwrap();
        assert!(cx.delete_property(obj, "shared"));
        assert!(cx.has_property(obj, "shared"));
    }

    #[test]
    fn prototype_cycles_rejected() {
        let mut cx = Context::with_swf_version(8);
        let a = cx.create_object();
        let b = cx.create_object();
        assert!(cx.set_prototype(a, Some(b)));
        assert!(!cx.set_prototype(b, Some(a)));
        assert_eq!(cx.prototype_of(a), Some(b));
        assert_ne!(cx.prototype_of(b), Some(a));
        assert!(!cx.set_prototype(a, Some(a)));
    }

    #[test]
    fn long_chains_resolve() {
        let mut cx = Context::with_swf_version(8);
        let root = cx.create_object();
        cx.put(root, "deep", Value::Number(1.0)).unwrap();
        let mut top = root;
        for _ in 0..300 {
            top = cx.create_object_with_proto(Some(top));
        }
        assert_eq!(cx.get(top, "deep").unwrap(), Value::Number(1.0));
        assert!(cx.can_put(top, "deep"));
        assert!(cx.all_keys(top).iter().any(|k| &**k == "deep"));
        assert!(cx.is_prototype_of(root, &Value::Object(top)));

        let fresh = cx.create_object();
        assert!(cx.set_prototype(fresh, Some(top)));
        assert_eq!(cx.get(fresh, "deep").unwrap(), Value::Number(1.0));
        assert!(!cx.set_prototype(root, Some(fresh)));
    }

    #[test]
    fn proto_slot_is_not_deletable() {
        let mut cx = Context::with_swf_version(8);
        let proto = cx.create_object();
        let obj = cx.create_object_with_proto(Some(proto));
        assert!(!cx.get_own_property(obj, "__proto__").unwrap().is_deletable());
        assert!(!cx.delete_property(obj, "__proto__"));
        assert_eq!(cx.prototype_of(obj), Some(proto));

        let bare = cx.create_object_with_proto(None);
        assert!(cx.get_own_property(bare, "__proto__").is_none());
        assert!(cx.delete_property(bare, "__proto__"));
    }

    #[test]
    fn proto_virtual_property() {
        let mut cx = Context::with_swf_version(8);
        let a = cx.create_object();
        let b = cx.create_object();
        cx.put(a, "__proto__", Value::Object(b)).unwrap();
        assert_eq!(cx.prototype_of(a), Some(b));
        assert_eq!(cx.get(a, "__proto__").unwrap(), Value::Object(b));
        assert!(cx.own_property_keys(a).is_empty());
        cx.put(b, "__proto__", Value::Object(a)).unwrap();
        assert_ne!(cx.prototype_of(b), Some(a));
        cx.put(a, "__proto__", Value::Null).unwrap();
        assert_eq!(cx.prototype_of(a), None);
    }

    #[test]
    fn case_insensitive_keys_keep_first_spelling() {
        let mut cx = Context::with_swf_version(6);
        let obj = cx.create_object();
        cx.put(obj, "Foo", Value::Number(1.0)).unwrap();
        cx.put(obj, "FOO", Value::Number(2.0)).unwrap();
        assert_eq!(cx.get(obj, "foo").unwrap(), Value::Number(2.0));
        let keys = cx.own_property_keys(obj);
        assert_eq!(keys.len(), 1);
        assert_eq!(&*keys[0], "Foo");
    }

    #[test]
    fn case_sensitive_keys_stay_distinct() {
        let mut cx = Context::with_swf_version(7);
        let obj = cx.create_object();
        cx.put(obj, "Foo", Value::Number(1.0)).unwrap();
        cx.put(obj, "foo", Value::Number(2.0)).unwrap();
        assert_eq!(cx.get(obj, "Foo").unwrap(), Value::Number(1.0));
        assert_eq!(cx.own_property_keys(obj).len(), 2);
    }

    #[test]
    fn all_keys_merge_by_mode() {
        for (version, expected) in [(6u8, vec!["a", "Shared"]), (8u8, vec!["a", "Shared", "shared"])] {
            let mut cx = Context::with_swf_version(version);
            let proto = cx.create_object();
            let obj = cx.create_object_with_proto(Some(proto));
            cx.put(obj, "a", Value::Null).unwrap();
            cx.put(obj, "Shared", Value::Null).unwrap();
            cx.put(proto, "shared", Value::Null).unwrap();
            let keys: Vec<String> = cx.all_keys(obj).iter().map(|k| k.to_string()).collect();
            assert_eq!(keys, expected, "swf version {version}");
        }
    }

    #[test]
    fn hidden_properties_are_not_enumerated() {
        let mut cx = Context::with_swf_version(8);
        let obj = cx.create_object();
        cx.set_own_property(obj, "secret", PropertyDescriptor::data(Value::Null, PropertyFlags::DONT_ENUM));
        cx.put(obj, "open", Value::Null).unwrap();
        let keys: Vec<String> = cx.own_property_keys(obj).iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, ["open"]);
        // builtins on Object.prototype are hidden too
        assert_eq!(cx.all_keys(obj).len(), 1);
    }

    #[test]
    fn default_value_order_follows_hint() {
        let mut cx = Context::with_swf_version(8);
        let obj = cx.create_object();
        let to_string = native(&mut cx, |_, _, _| Ok(Value::string("str")));
        let value_of = native(&mut cx, |_, _, _| Ok(Value::Number(7.0)));
        cx.put(obj, "toString", Value::Object(to_string)).unwrap();
        cx.put(obj, "valueOf", Value::Object(value_of)).unwrap();
        assert_eq!(cx.default_value(obj, DefaultValueHint::String).unwrap(), Value::string("str"));
        assert_eq!(cx.default_value(obj, DefaultValueHint::Number).unwrap(), Value::Number(7.0));

        let bare = cx.create_object_with_proto(None);
        assert_eq!(cx.default_value(bare, DefaultValueHint::Number).unwrap(), Value::Object(bare));
    }

    #[test]
    fn property_flags_rewrite() {
        let mut cx = Context::with_swf_version(8);
        let obj = cx.create_object();
        cx.put(obj, "a", Value::Null).unwrap();
        cx.put(obj, "b", Value::Null).unwrap();
        let names: Vec<Rc<str>> = vec![Rc::from("a")];
        cx.set_property_flags(obj, Some(&names), PropertyFlags::DONT_ENUM | PropertyFlags::READ_ONLY, PropertyFlags::NONE);
        assert!(!cx.can_put(obj, "a"));
        assert!(cx.can_put(obj, "b"));
        let keys: Vec<String> = cx.own_property_keys(obj).iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, ["b"]);

        cx.set_property_flags(obj, None, PropertyFlags::NONE, PropertyFlags::SCRIPT_MASK);
        assert!(cx.can_put(obj, "a"));
        assert_eq!(cx.own_property_keys(obj).len(), 2);
    }

    #[test]
    fn prototype_of_check() {
        let mut cx = Context::with_swf_version(8);
        let proto = cx.create_object();
        let obj = cx.create_object_with_proto(Some(proto));
        assert!(cx.is_prototype_of(proto, &Value::Object(obj)));
        assert!(!cx.is_prototype_of(obj, &Value::Object(proto)));
        assert!(!cx.is_prototype_of(proto, &Value::Number(1.0)));
    }
}
