use std::rc::Rc;

use tracing::warn;

use super::*;

/// Elements read between two `check_timeout` calls.
const TIMEOUT_STRIDE: u32 = 1024;

/// Canonical array index form of `key`, if any.
fn array_index(key: &str) -> Option<u32> {
    if key.is_empty() || (key.len() > 1 && key.starts_with('0')) || !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    key.parse::<u32>().ok().filter(|i| *i != u32::MAX)
}

fn join(cx: &mut Context, arr: ObjectId, separator: &str) -> Avm1Result<Rc<str>> {
    let mut parts = Vec::new();
    for element in cx.array_elements(arr)? {
        parts.push(coerce::to_string(cx, &element)?);
    }
    Ok(Rc::from(parts.join(separator)))
}

impl Context {
    pub fn create_array(&mut self, elements: impl IntoIterator<Item = Value>) -> ObjectId {
        let proto = self.builtins.array_prototype;
        let arr = self.create_object_of_kind(Some(proto), ObjectKind::Array);
        let mut len = 0u32;
        if let Some(data) = self.data_mut(arr) {
            for (i, element) in elements.into_iter().enumerate() {
                // index keys are never case-folded, so they bypass the name cache
                data.insert_property(Rc::from(i.to_string()), PropertyDescriptor::data(element, PropertyFlags::NONE));
                len = i as u32 + 1;
            }
        }
        self.set_array_length(arr, len);
        arr
    }

    fn set_array_length(&mut self, arr: ObjectId, len: u32) {
        let flags = PropertyFlags::DONT_ENUM | PropertyFlags::DONT_DELETE;
        match self.data_mut(arr).and_then(|d| d.properties.get_mut("length")) {
            Some(slot) => slot.value = Value::Number(f64::from(len)),
            None => self.set_own_property(arr, "length", PropertyDescriptor::data(Value::Number(f64::from(len)), flags)),
        }
    }

    /// Element values `0..length`, read through `get`. At most
    /// `max_array_elements` are read; the interpreter's timeout is polled
    /// while reading.
    pub fn array_elements(&mut self, arr: ObjectId) -> Avm1Result<Vec<Value>> {
        let length = self.get(arr, "length")?;
        let len = coerce::to_uint32(self, &length)?;
        let limit = u32::try_from(self.config.max_array_elements).unwrap_or(u32::MAX);
        if len > limit {
            warn!(?arr, len, limit, "array read truncated");
        }
        let len = len.min(limit);
        let mut elements = Vec::with_capacity(len.min(1 << 16) as usize);
        for i in 0..len {
            if i > 0 && i % TIMEOUT_STRIDE == 0 {
                self.check_timeout()?;
            }
            elements.push(self.get_key(arr, &i.to_string())?);
        }
        Ok(elements)
    }

    /// Keeps `length` one past the highest index, and drops elements when
    /// `length` itself shrinks.
    pub(crate) fn sync_array_length(&mut self, arr: ObjectId, key: &Rc<str>) -> Avm1Result<()> {
        if &**key == "length" {
            let length = self.own_descriptor(arr, "length").map(|d| d.value).unwrap_or_default();
            let new_len = coerce::to_number(self, &length)?;
            if !(new_len >= 0.0 && new_len.fract() == 0.0 && new_len < f64::from(u32::MAX)) {
                return Ok(());
            }
            if let Some(data) = self.data_mut(arr) {
                let doomed: Vec<Rc<str>> = data
                    .property_order
                    .iter()
                    .filter(|k| array_index(k).is_some_and(|i| f64::from(i) >= new_len))
                    .cloned()
                    .collect();
                for k in doomed {
                    data.remove_property(&k);
                }
            }
            return Ok(());
        }
        let Some(index) = array_index(key) else {
            return Ok(());
        };
        let current = self.own_descriptor(arr, "length").map(|d| d.value).unwrap_or_default();
        let current = coerce::to_uint32(self, &current)?;
        if index >= current {
            self.set_array_length(arr, index + 1);
        }
        Ok(())
    }

    pub(super) fn setup_array(&mut self) {
        let proto = self.create_object();
        self.builtins.array_prototype = proto;

        let construct = native_fn(|cx, _, args| {
            if let [Value::Number(n)] = args {
                let arr = cx.create_array(Vec::new());
                let len = number_ops::to_uint32(*n);
                cx.set_array_length(arr, len);
                return Ok(Value::Object(arr));
            }
            Ok(Value::Object(cx.create_array(args.iter().cloned())))
        });
        self.builtins.array = self.define_class("Array", construct.clone(), construct, proto);

        self.define_method(proto, "push", |cx, this, args| {
            let arr = coerce::to_object(cx, this)?;
            let length = cx.get(arr, "length")?;
            // a full array grows past the u32 index range
            let mut len = f64::from(coerce::to_uint32(cx, &length)?);
            for value in args {
                let key: Rc<str> = Rc::from(number_ops::to_string(len));
                cx.put_key(arr, key.clone(), &key, value.clone())?;
                len += 1.0;
            }
            cx.put(arr, "length", Value::Number(len))?;
            Ok(Value::Number(len))
        });
        self.define_method(proto, "pop", |cx, this, _| {
            let arr = coerce::to_object(cx, this)?;
            let length = cx.get(arr, "length")?;
            let len = coerce::to_uint32(cx, &length)?;
            if len == 0 {
                cx.put(arr, "length", Value::Number(0.0))?;
                return Ok(Value::Undefined);
            }
            let last = (len - 1).to_string();
            let value = cx.get_key(arr, &last)?;
            cx.delete_key(arr, &last);
            cx.put(arr, "length", Value::Number(f64::from(len - 1)))?;
            Ok(value)
        });
        self.define_method(proto, "join", |cx, this, args| {
            let arr = coerce::to_object(cx, this)?;
            let separator: Rc<str> = match args.first() {
                None | Some(Value::Undefined) => Rc::from(","),
                Some(sep) => coerce::to_string(cx, sep)?,
            };
            Ok(Value::String(join(cx, arr, &separator)?))
        });
        self.define_method(proto, "toString", |cx, this, _| {
            let arr = coerce::to_object(cx, this)?;
            Ok(Value::String(join(cx, arr, ",")?))
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(cx: &mut Context, arr: ObjectId) -> Vec<String> {
        let elements = cx.array_elements(arr).unwrap();
        elements
            .iter()
            .map(|v| coerce::to_string(cx, v).unwrap().to_string())
            .collect()
    }

    #[test]
    fn index_keys() {
        assert_eq!(array_index("0"), Some(0));
        assert_eq!(array_index("42"), Some(42));
        assert_eq!(array_index("01"), None);
        assert_eq!(array_index("-1"), None);
        assert_eq!(array_index("length"), None);
        assert_eq!(array_index("4294967295"), None);
    }

    #[test]
    fn length_follows_writes() {
        let mut cx = Context::with_swf_version(8);
        let arr = cx.create_array([Value::Number(1.0)]);
        assert_eq!(cx.get(arr, "length").unwrap(), Value::Number(1.0));
        cx.put(arr, "4", Value::Bool(true)).unwrap();
        assert_eq!(cx.get(arr, "length").unwrap(), Value::Number(5.0));
        cx.put(arr, "name", Value::Null).unwrap();
        assert_eq!(cx.get(arr, "length").unwrap(), Value::Number(5.0));
        assert!(cx.own_property_keys(arr).iter().all(|k| &**k != "length"));
    }

    #[test]
    fn shrinking_length_truncates() {
        let mut cx = Context::with_swf_version(8);
        let arr = cx.create_array(["a", "b", "c"].map(Value::string));
        cx.put(arr, "length", Value::Number(1.0)).unwrap();
        assert!(!cx.has_own_property(arr, "1"));
        assert!(!cx.has_own_property(arr, "2"));
        assert_eq!(strings(&mut cx, arr), ["a"]);
    }

    #[test]
    fn constructor_forms() {
        let mut cx = Context::with_swf_version(8);
        let array = cx.builtins().array;
        let sized = cx.construct(array, &[Value::Number(3.0)]).unwrap().as_object().unwrap();
        assert_eq!(cx.get(sized, "length").unwrap(), Value::Number(3.0));
        assert!(cx.own_property_keys(sized).is_empty());

        let listed = cx.call(array, &Value::Undefined, &[Value::string("x"), Value::Number(2.0)]).unwrap();
        let listed = listed.as_object().unwrap();
        assert_eq!(strings(&mut cx, listed), ["x", "2"]);
        assert_eq!(cx.prototype_of(listed), Some(cx.builtins().array_prototype));
    }

    #[test]
    fn push_past_the_index_range() {
        let mut cx = Context::with_swf_version(8);
        let array = cx.builtins().array;
        let full = cx.construct(array, &[Value::Number(4294967295.0)]).unwrap();
        let arr = full.as_object().unwrap();
        let push = cx.get(arr, "push").unwrap();
        let pushed = cx.call_value(&push, &full, &[Value::Number(1.0)]).unwrap();
        assert_eq!(pushed, Value::Number(4294967296.0));
        assert_eq!(cx.get(arr, "length").unwrap(), Value::Number(4294967296.0));
        assert_eq!(cx.get(arr, "4294967295").unwrap(), Value::Number(1.0));
    }

    #[test]
    fn element_reads_are_bounded() {
        let config = ContextConfig::default().with_swf_version(6).with_max_array_elements(3);
        let mut cx = Context::new(config);
        let arr = cx.create_array((0..5).map(|i| Value::Number(f64::from(i))));
        assert_eq!(cx.array_elements(arr).unwrap().len(), 3);
        assert_eq!(coerce::to_string(&mut cx, &Value::Object(arr)).unwrap().as_ref(), "0,1,2");

        let array = cx.builtins().array;
        let huge = cx.construct(array, &[Value::Number(4294967295.0)]).unwrap();
        assert_eq!(coerce::to_string(&mut cx, &huge).unwrap().as_ref(), ",,");
    }

    #[test]
    fn element_reads_poll_the_timeout() {
        struct AlwaysLate;

        impl ActionExecutor for AlwaysLate {
            fn execute_actions(&self, _cx: &mut Context, _actions: &Rc<ActionsData>, _scope: ObjectId) -> Avm1Result<Value> {
                Ok(Value::Undefined)
            }

            fn execute_function(
                &self,
                _cx: &mut Context,
                _function: ObjectId,
                _actions: &Rc<ActionsData>,
                _scope: &CapturedScope,
                _receiver: &Value,
                _args: &[Value],
            ) -> Avm1Result<Value> {
                Ok(Value::Undefined)
            }

            fn resolve_target(&self, _cx: &mut Context, _target: &Value) -> Option<ObjectId> {
                None
            }

            fn check_timeout(&self, _cx: &mut Context) -> Avm1Result<()> {
                Err(Avm1Error::Timeout)
            }
        }

        let mut cx = Context::with_swf_version(8);
        cx.set_executor(Rc::new(AlwaysLate));
        let array = cx.builtins().array;
        let small = cx.construct(array, &[Value::Number(10.0)]).unwrap().as_object().unwrap();
        assert_eq!(cx.array_elements(small).unwrap().len(), 10);
        let big = cx.construct(array, &[Value::Number(5000.0)]).unwrap().as_object().unwrap();
        assert!(matches!(cx.array_elements(big), Err(Avm1Error::Timeout)));
    }

    #[test]
    fn push_pop_join() {
        let mut cx = Context::with_swf_version(8);
        let arr = cx.create_array(Vec::new());
        let this = Value::Object(arr);
        let push = cx.get(arr, "push").unwrap();
        let pushed = cx.call_value(&push, &this, &[Value::Number(1.0), Value::Number(2.0)]).unwrap();
        assert_eq!(pushed, Value::Number(2.0));

        let join = cx.get(arr, "join").unwrap();
        assert_eq!(cx.call_value(&join, &this, &[Value::string("-")]).unwrap(), Value::string("1-2"));
        assert_eq!(cx.call_value(&join, &this, &[]).unwrap(), Value::string("1,2"));

        let pop = cx.get(arr, "pop").unwrap();
        assert_eq!(cx.call_value(&pop, &this, &[]).unwrap(), Value::Number(2.0));
        assert_eq!(cx.get(arr, "length").unwrap(), Value::Number(1.0));
        let to_string = cx.get(arr, "toString").unwrap();
        assert_eq!(cx.call_value(&to_string, &this, &[]).unwrap(), Value::string("1"));
    }
}
