use std::rc::Rc;

use tracing::debug;

use super::*;

mod array;
mod date;
mod number;
mod string;

/// Built-in classes of one movie. Every field is a live object once the
/// Context is constructed.
#[derive(Debug, Clone, Copy)]
pub struct Builtins {
    pub object: ObjectId,
    pub object_prototype: ObjectId,
    pub function: ObjectId,
    pub function_prototype: ObjectId,
    pub array: ObjectId,
    pub array_prototype: ObjectId,
    pub number: ObjectId,
    pub number_prototype: ObjectId,
    pub boolean: ObjectId,
    pub boolean_prototype: ObjectId,
    pub string: ObjectId,
    pub string_prototype: ObjectId,
    pub date: ObjectId,
    pub date_prototype: ObjectId,
    pub math: ObjectId,
    pub error: ObjectId,
    pub error_prototype: ObjectId,
}

impl Builtins {
    pub(crate) fn unset() -> Self {
        let id = ObjectId(0);
        Self {
            object: id,
            object_prototype: id,
            function: id,
            function_prototype: id,
            array: id,
            array_prototype: id,
            number: id,
            number_prototype: id,
            boolean: id,
            boolean_prototype: id,
            string: id,
            string_prototype: id,
            date: id,
            date_prototype: id,
            math: id,
            error: id,
            error_prototype: id,
        }
    }

    pub(crate) fn all(&self) -> [ObjectId; 17] {
        [
            self.object,
            self.object_prototype,
            self.function,
            self.function_prototype,
            self.array,
            self.array_prototype,
            self.number,
            self.number_prototype,
            self.boolean,
            self.boolean_prototype,
            self.string,
            self.string_prototype,
            self.date,
            self.date_prototype,
            self.math,
            self.error,
            self.error_prototype,
        ]
    }
}

fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or_default()
}

/// Prototype an instance built by `ctor` should inherit from.
fn instance_prototype(cx: &mut Context, ctor: &Value, fallback: ObjectId) -> Avm1Result<ObjectId> {
    if let Value::Object(ctor) = ctor
        && let Value::Object(proto) = cx.get(*ctor, "prototype")?
    {
        return Ok(proto);
    }
    Ok(fallback)
}

impl Context {
    /// Installs a hidden native method on `target`.
    pub(crate) fn define_method(
        &mut self,
        target: ObjectId,
        name: &str,
        f: impl Fn(&mut Context, &Value, &[Value]) -> Avm1Result<Value> + 'static,
    ) -> ObjectId {
        let func = self.native_function(name, f);
        self.set_own_property(target, name, PropertyDescriptor::data(Value::Object(func), PropertyFlags::DONT_ENUM));
        func
    }

    pub(crate) fn define_constant(&mut self, target: ObjectId, name: &str, value: Value) {
        let flags = PropertyFlags::DONT_ENUM | PropertyFlags::DONT_DELETE | PropertyFlags::READ_ONLY;
        self.set_own_property(target, name, PropertyDescriptor::data(value, flags));
    }

    /// Creates a class constructor, cross-links it with `prototype` and
    /// publishes it on `_global`.
    pub(crate) fn define_class(
        &mut self,
        name: &str,
        call: NativeFn,
        construct: NativeFn,
        prototype: ObjectId,
    ) -> ObjectId {
        let ctor = self.create_native_function(name, call, Some(construct));
        self.link_constructor(ctor, prototype);
        let global = self.global_object();
        self.set_own_property(global, name, PropertyDescriptor::data(Value::Object(ctor), PropertyFlags::DONT_ENUM));
        ctor
    }

    pub(crate) fn setup_globals(&mut self) {
        let object_prototype = self.create_object_with_proto(None);
        self.builtins.object_prototype = object_prototype;
        let function_prototype = self.create_object_of_kind(
            Some(object_prototype),
            ObjectKind::Function(Callable::Native {
                name: Rc::from(""),
                call: native_fn(|_, _, _| Ok(Value::Undefined)),
                construct: None,
            }),
        );
        self.builtins.function_prototype = function_prototype;
        let global = self.create_object();
        self.global = Some(global);

        self.setup_object(object_prototype);
        self.setup_function(function_prototype);
        self.setup_error();
        self.setup_array();
        self.setup_number();
        self.setup_boolean();
        self.setup_math();
        self.setup_string();
        self.setup_date();

        self.define_constant(global, "NaN", Value::Number(f64::NAN));
        self.define_constant(global, "Infinity", Value::Number(f64::INFINITY));
        self.define_method(global, "ASSetPropFlags", |cx, _, args| {
            let Value::Object(target) = arg(args, 0) else {
                return Ok(Value::Undefined);
            };
            let names: Option<Vec<Rc<str>>> = match arg(args, 1) {
                Value::Null | Value::Undefined => None,
                Value::Object(list) if cx.data(list).is_some_and(ObjectData::is_array) => {
                    let mut names = Vec::new();
                    for element in cx.array_elements(list)? {
                        names.push(coerce::to_string(cx, &element)?);
                    }
                    Some(names)
                }
                other => {
                    let joined = coerce::to_string(cx, &other)?;
                    Some(joined.split(',').map(Rc::from).collect())
                }
            };
            let set = coerce::to_int32(cx, &arg(args, 2))?;
            let clear = coerce::to_int32(cx, &arg(args, 3))?;
            let mask = PropertyFlags::SCRIPT_MASK.bits() as i32;
            cx.set_property_flags(
                target,
                names.as_deref(),
                PropertyFlags::from_bits_truncate((set & mask) as u8),
                PropertyFlags::from_bits_truncate((clear & mask) as u8),
            );
            Ok(Value::Undefined)
        });
        self.set_own_property(
            global,
            "_global",
            PropertyDescriptor::data(Value::Object(global), PropertyFlags::DONT_ENUM),
        );
        debug!(objects = self.objects.len(), "installed builtins");
    }

    fn setup_object(&mut self, proto: ObjectId) {
        let construct = native_fn(|cx, _, args| match arg(args, 0) {
            Value::Undefined | Value::Null => Ok(Value::Object(cx.create_object())),
            other => Ok(Value::Object(coerce::to_object(cx, &other)?)),
        });
        let object = self.define_class("Object", construct.clone(), construct, proto);
        self.builtins.object = object;

        self.define_method(object, "registerClass", |cx, _, args| {
            let name = coerce::to_string(cx, &arg(args, 0))?;
            let registered = match arg(args, 1) {
                Value::Object(class) => cx.register_class(&name, class),
                _ => false,
            };
            Ok(Value::Bool(registered))
        });

        self.define_method(proto, "toString", |cx, this, _| {
            Ok(Value::string(if cx.is_callable(this) { "[type Function]" } else { "[object Object]" }))
        });
        self.define_method(proto, "valueOf", |_, this, _| Ok(this.clone()));
        self.define_method(proto, "hasOwnProperty", |cx, this, args| {
            let obj = coerce::to_object(cx, this)?;
            let name = coerce::to_string(cx, &arg(args, 0))?;
            Ok(Value::Bool(cx.has_own_property(obj, &name)))
        });
        self.define_method(proto, "isPropertyEnumerable", |cx, this, args| {
            let obj = coerce::to_object(cx, this)?;
            let name = coerce::to_string(cx, &arg(args, 0))?;
            let enumerable = cx.get_own_property(obj, &name).is_some_and(|d| d.is_enumerable());
            Ok(Value::Bool(enumerable))
        });
        self.define_method(proto, "isPrototypeOf", |cx, this, args| {
            let obj = coerce::to_object(cx, this)?;
            Ok(Value::Bool(cx.is_prototype_of(obj, &arg(args, 0))))
        });
        self.define_method(proto, "addProperty", |cx, this, args| {
            let obj = coerce::to_object(cx, this)?;
            let name = coerce::to_string(cx, &arg(args, 0))?;
            let getter = arg(args, 1);
            let setter = arg(args, 2);
            if name.is_empty() || !cx.is_callable(&getter) || !(setter.is_null() || cx.is_callable(&setter)) {
                return Ok(Value::Bool(false));
            }
            let desc = PropertyDescriptor::accessor(getter.as_object(), setter.as_object(), PropertyFlags::NONE);
            cx.set_own_property(obj, &name, desc);
            Ok(Value::Bool(true))
        });
        self.define_method(proto, "watch", |cx, this, args| {
            let obj = coerce::to_object(cx, this)?;
            let name = coerce::to_string(cx, &arg(args, 0))?;
            let Value::Object(callback) = arg(args, 1) else {
                return Ok(Value::Bool(false));
            };
            if !cx.is_callable(&Value::Object(callback)) {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(cx.add_watcher(obj, &name, callback, arg(args, 2))))
        });
        self.define_method(proto, "unwatch", |cx, this, args| {
            let obj = coerce::to_object(cx, this)?;
            let name = coerce::to_string(cx, &arg(args, 0))?;
            Ok(Value::Bool(cx.remove_watcher(obj, &name)))
        });
    }

    fn setup_function(&mut self, proto: ObjectId) {
        let make = native_fn(|cx, _, _| Ok(Value::Object(cx.create_eval_function("", native_fn(|_, _, _| Ok(Value::Undefined))))));
        let function = self.define_class("Function", make.clone(), make, proto);
        self.builtins.function = function;

        self.define_method(proto, "call", |cx, this, args| {
            let receiver = arg(args, 0);
            let rest = args.get(1..).unwrap_or_default();
            cx.call_value(this, &receiver, rest)
        });
        self.define_method(proto, "apply", |cx, this, args| {
            let receiver = arg(args, 0);
            let list = match arg(args, 1) {
                Value::Object(list) => cx.array_elements(list)?,
                _ => Vec::new(),
            };
            cx.call_value(this, &receiver, &list)
        });
    }

    fn setup_error(&mut self) {
        let proto = self.create_object();
        self.builtins.error_prototype = proto;
        self.set_own_property(proto, "message", PropertyDescriptor::data(Value::string("Error"), PropertyFlags::DONT_ENUM));
        self.set_own_property(proto, "name", PropertyDescriptor::data(Value::string("Error"), PropertyFlags::DONT_ENUM));
        self.define_method(proto, "toString", |cx, this, _| {
            let obj = coerce::to_object(cx, this)?;
            let message = cx.get(obj, "message")?;
            Ok(Value::String(coerce::to_string(cx, &message)?))
        });

        let construct = native_fn(|cx, this, args| {
            let fallback = cx.builtins().error_prototype;
            let proto = instance_prototype(cx, this, fallback)?;
            let err = cx.create_object_of_kind(Some(proto), ObjectKind::Error);
            let message = arg(args, 0);
            if !message.is_undefined() {
                cx.put(err, "message", message)?;
            }
            Ok(Value::Object(err))
        });
        // called without `new` it still builds an Error
        let inner = construct.clone();
        let call = native_fn(move |cx, _, args| {
            let error = Value::Object(cx.builtins().error);
            inner(cx, &error, args)
        });
        self.builtins.error = self.define_class("Error", call, construct, proto);
    }
}
