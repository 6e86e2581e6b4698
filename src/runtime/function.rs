use std::rc::Rc;

use tracing::{trace, warn};

use super::*;

/// Handle through which host code (mouse, keyboard, timer bridges) re-enters
/// script. The function stays pinned until [`HostCallback::release`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostCallback {
    function: ObjectId,
}

impl HostCallback {
    pub fn function(&self) -> ObjectId {
        self.function
    }

    pub fn invoke(&self, cx: &mut Context, receiver: &Value, args: &[Value]) -> Avm1Result<Value> {
        cx.execute_function(self.function, receiver, args)
    }

    pub fn release(self, cx: &mut Context) {
        cx.unpin(self.function);
    }
}

impl Context {
    fn create_function_object(&mut self, callable: Callable) -> ObjectId {
        let proto = self.builtins.function_prototype;
        self.create_object_of_kind(Some(proto), ObjectKind::Function(callable))
    }

    pub fn create_native_function(&mut self, name: &str, call: NativeFn, construct: Option<NativeFn>) -> ObjectId {
        self.create_function_object(Callable::Native {
            name: Rc::from(name),
            call,
            construct,
        })
    }

    pub fn native_function(
        &mut self,
        name: &str,
        f: impl Fn(&mut Context, &Value, &[Value]) -> Avm1Result<Value> + 'static,
    ) -> ObjectId {
        self.create_native_function(name, native_fn(f), None)
    }

    /// Script function; gets a fresh `prototype` object pointing back at it.
    pub fn create_interpreted_function(
        &mut self,
        name: &str,
        actions: Rc<ActionsData>,
        scope: CapturedScope,
    ) -> ObjectId {
        let func = self.create_function_object(Callable::Interpreted {
            name: Rc::from(name),
            actions,
            scope,
        });
        let proto = self.create_object();
        self.link_constructor(func, proto);
        func
    }

    pub fn create_eval_function(&mut self, name: &str, call: NativeFn) -> ObjectId {
        let func = self.create_function_object(Callable::Eval {
            name: Rc::from(name),
            call,
        });
        let proto = self.create_object();
        self.link_constructor(func, proto);
        func
    }

    /// Cross-links `ctor.prototype` and `proto.constructor`.
    pub(crate) fn link_constructor(&mut self, ctor: ObjectId, proto: ObjectId) {
        self.set_own_property(
            ctor,
            "prototype",
            PropertyDescriptor::data(Value::Object(proto), PropertyFlags::DONT_ENUM | PropertyFlags::DONT_DELETE),
        );
        self.set_own_property(
            proto,
            "constructor",
            PropertyDescriptor::data(Value::Object(ctor), PropertyFlags::DONT_ENUM),
        );
    }

    pub fn is_callable(&self, value: &Value) -> bool {
        value
            .as_object()
            .and_then(|id| self.data(id))
            .is_some_and(|d| d.callable().is_some())
    }

    fn callable_of(&self, func: ObjectId) -> Option<Callable> {
        self.data(func).and_then(|d| d.callable().cloned())
    }

    pub fn call(&mut self, func: ObjectId, receiver: &Value, args: &[Value]) -> Avm1Result<Value> {
        let Some(callable) = self.callable_of(func) else {
            return Err(Avm1Error::NotCallable(self.describe(&Value::Object(func))));
        };
        match callable {
            Callable::Native { call, .. } | Callable::Eval { call, .. } => call(self, receiver, args),
            Callable::Interpreted { actions, scope, .. } => {
                let Some(executor) = self.executor() else {
                    warn!(function = ?func, "interpreted function called without an interpreter");
                    return Err(Avm1Error::NoInterpreter);
                };
                executor.execute_function(self, func, &actions, &scope, receiver, args)
            }
        }
    }

    pub fn call_value(&mut self, func: &Value, receiver: &Value, args: &[Value]) -> Avm1Result<Value> {
        match func {
            Value::Object(id) => self.call(*id, receiver, args),
            other => Err(Avm1Error::NotCallable(self.describe(other))),
        }
    }

    pub fn construct(&mut self, func: ObjectId, args: &[Value]) -> Avm1Result<Value> {
        let Some(callable) = self.callable_of(func) else {
            return Err(Avm1Error::NotConstructible(self.describe(&Value::Object(func))));
        };
        match callable {
            Callable::Native { construct: Some(construct), .. } => construct(self, &Value::Object(func), args),
            Callable::Native { name, construct: None, .. } => Err(Avm1Error::NotConstructible(name.to_string())),
            Callable::Eval { .. } | Callable::Interpreted { .. } => {
                self.construct_from_prototype(func, args, |cx, receiver, args| cx.call(func, receiver, args))
            }
        }
    }

    /// Allocates an instance of `ctor.prototype` (or `Object.prototype` when
    /// that is not an object) and runs `body` on it. An object result
    /// replaces the instance.
    pub(crate) fn construct_from_prototype(
        &mut self,
        ctor: ObjectId,
        args: &[Value],
        body: impl FnOnce(&mut Context, &Value, &[Value]) -> Avm1Result<Value>,
    ) -> Avm1Result<Value> {
        let proto = match self.get(ctor, "prototype")? {
            Value::Object(p) => p,
            _ => self.builtins.object_prototype,
        };
        let obj = self.create_object_with_proto(Some(proto));
        self.set_own_property(
            obj,
            "__constructor__",
            PropertyDescriptor::data(Value::Object(ctor), PropertyFlags::DONT_ENUM),
        );
        let receiver = Value::Object(obj);
        let result = body(self, &receiver, args)?;
        Ok(if result.is_object() { result } else { receiver })
    }

    /// Host re-entry point into script.
    pub fn execute_function(&mut self, func: ObjectId, receiver: &Value, args: &[Value]) -> Avm1Result<Value> {
        trace!(function = ?func, argc = args.len(), "host invoking script function");
        self.call(func, receiver, args)
    }

    pub fn to_host_callable(&mut self, func: ObjectId) -> Option<HostCallback> {
        if !self.is_callable(&Value::Object(func)) {
            return None;
        }
        self.pin(func);
        Some(HostCallback { function: func })
    }
}
