use std::rc::Rc;

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::config::ContextConfig;
use crate::error::{Avm1Error, Avm1Result};
use crate::types::{ObjectId, Value, number_ops};

mod types;
pub use types::*;

pub mod coerce;
mod builtins;
mod function;
mod gc;
mod native;
mod object;
mod registry;

pub use builtins::Builtins;
pub use coerce::DefaultValueHint;
pub use function::HostCallback;
pub use native::{ACCESSOR_MARKER, HostMember, HostMembers, NativeClass, NativeClassDef};
pub use registry::{ActionsData, AssetInfo, ClassKey, EventObserver, StaticStateClass, SymbolProps};

/// Bytecode interpreter entry points. The object core calls back through
/// this seam whenever interpreted code has to run.
pub trait ActionExecutor {
    fn execute_actions(
        &self,
        cx: &mut Context,
        actions: &Rc<ActionsData>,
        scope: ObjectId,
    ) -> Avm1Result<Value>;

    fn execute_function(
        &self,
        cx: &mut Context,
        function: ObjectId,
        actions: &Rc<ActionsData>,
        scope: &CapturedScope,
        receiver: &Value,
        args: &[Value],
    ) -> Avm1Result<Value>;

    fn resolve_target(&self, cx: &mut Context, target: &Value) -> Option<ObjectId>;

    fn check_timeout(&self, _cx: &mut Context) -> Avm1Result<()> {
        Ok(())
    }
}

/// Per-movie runtime: the object arena, builtins, name normalization and the
/// registries shared by every AVM1 object of one movie.
pub struct Context {
    config: ContextConfig,
    case_sensitive: bool,
    name_cache: FxHashMap<Rc<str>, Rc<str>>,
    objects: Vec<Option<ObjectData>>,
    free_list: Vec<usize>,
    pinned: FxHashMap<ObjectId, usize>,
    builtins: Builtins,
    global: Option<ObjectId>,
    static_states: FxHashMap<ClassKey, ObjectId>,
    static_initializers: FxHashMap<ObjectId, NativeFn>,
    event_observers: FxHashMap<Rc<str>, Vec<Rc<dyn EventObserver>>>,
    actions_cache: FxHashMap<usize, std::rc::Weak<ActionsData>>,
    asset_symbols: FxHashMap<String, u32>,
    symbol_props: FxHashMap<u32, SymbolProps>,
    symbol_classes: FxHashMap<u32, ObjectId>,
    executor: Option<Rc<dyn ActionExecutor>>,
    rng_state: u64,
}

impl Context {
    pub fn new(config: ContextConfig) -> Self {
        let seed = config.random_seed.unwrap_or_else(|| {
            chrono::Utc::now()
                .timestamp_nanos_opt()
                .map_or(0x2545_f491_4f6c_dd1d, |n| n as u64)
        });
        let mut cx = Self {
            case_sensitive: config.is_case_sensitive(),
            config,
            name_cache: FxHashMap::default(),
            objects: Vec::new(),
            free_list: Vec::new(),
            pinned: FxHashMap::default(),
            builtins: Builtins::unset(),
            global: None,
            static_states: FxHashMap::default(),
            static_initializers: FxHashMap::default(),
            event_observers: FxHashMap::default(),
            actions_cache: FxHashMap::default(),
            asset_symbols: FxHashMap::default(),
            symbol_props: FxHashMap::default(),
            symbol_classes: FxHashMap::default(),
            executor: None,
            // xorshift state must be non-zero
            rng_state: seed | 1,
        };
        cx.setup_globals();
        debug!(
            swf_version = cx.config.swf_version,
            case_sensitive = cx.case_sensitive,
            "AVM1 context created"
        );
        cx
    }

    pub fn with_swf_version(swf_version: u8) -> Self {
        Self::new(ContextConfig::default().with_swf_version(swf_version))
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    pub fn swf_version(&self) -> u8 {
        self.config.swf_version
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    pub fn builtins(&self) -> &Builtins {
        &self.builtins
    }

    /// The `_global` object.
    pub fn global_object(&self) -> ObjectId {
        self.global.unwrap_or(self.builtins.object_prototype)
    }

    pub fn set_executor(&mut self, executor: Rc<dyn ActionExecutor>) {
        self.executor = Some(executor);
    }

    pub(crate) fn executor(&self) -> Option<Rc<dyn ActionExecutor>> {
        self.executor.clone()
    }

    pub fn normalize_name(&mut self, name: &str) -> Rc<str> {
        if self.case_sensitive {
            return Rc::from(name);
        }
        if let Some(cached) = self.name_cache.get(name) {
            return cached.clone();
        }
        let lowered: Rc<str> = Rc::from(name.to_lowercase());
        self.name_cache.insert(Rc::from(name), lowered.clone());
        lowered
    }

    /// Normalizes a script-supplied key. Numbers are rendered but never
    /// lower-cased or cached; other non-strings go through `to_string`.
    pub fn normalize_key(&mut self, key: &Value) -> Avm1Result<Rc<str>> {
        match key {
            Value::String(s) => Ok(self.normalize_name(s)),
            Value::Number(n) => Ok(Rc::from(number_ops::to_string(*n))),
            other => {
                let s = coerce::to_string(self, other)?;
                Ok(self.normalize_name(&s))
            }
        }
    }

    pub(crate) fn data(&self, id: ObjectId) -> Option<&ObjectData> {
        self.objects.get(id.index()).and_then(Option::as_ref)
    }

    pub(crate) fn data_mut(&mut self, id: ObjectId) -> Option<&mut ObjectData> {
        self.objects.get_mut(id.index()).and_then(Option::as_mut)
    }

    pub fn is_live(&self, id: ObjectId) -> bool {
        self.data(id).is_some()
    }

    pub(crate) fn allocate(&mut self, data: ObjectData) -> ObjectId {
        if let Some(idx) = self.free_list.pop() {
            self.objects[idx] = Some(data);
            ObjectId(idx as u32)
        } else {
            let idx = self.objects.len();
            self.objects.push(Some(data));
            ObjectId(idx as u32)
        }
    }

    /// Plain object inheriting from `Object.prototype`.
    pub fn create_object(&mut self) -> ObjectId {
        let proto = self.builtins.object_prototype;
        self.create_object_with_proto(Some(proto))
    }

    pub fn create_object_with_proto(&mut self, prototype: Option<ObjectId>) -> ObjectId {
        self.allocate(ObjectData::new(prototype, ObjectKind::Plain))
    }

    pub(crate) fn create_object_of_kind(&mut self, prototype: Option<ObjectId>, kind: ObjectKind) -> ObjectId {
        self.allocate(ObjectData::new(prototype, kind))
    }

    pub fn is_blocked_by_script(&self, obj: ObjectId) -> bool {
        self.data(obj).is_some_and(|d| d.blocked_by_script)
    }

    pub fn set_blocked_by_script(&mut self, obj: ObjectId, blocked: bool) {
        if let Some(d) = self.data_mut(obj) {
            d.blocked_by_script = blocked;
        }
    }

    pub fn is_color_transform_blocked_by_script(&self, obj: ObjectId) -> bool {
        self.data(obj).is_some_and(|d| d.color_transform_blocked_by_script)
    }

    pub fn set_color_transform_blocked_by_script(&mut self, obj: ObjectId, blocked: bool) {
        if let Some(d) = self.data_mut(obj) {
            d.color_transform_blocked_by_script = blocked;
        }
    }

    pub fn reset_script_blocks(&mut self, obj: ObjectId) {
        if let Some(d) = self.data_mut(obj) {
            d.blocked_by_script = false;
            d.color_transform_blocked_by_script = false;
        }
    }

    /// Next `Math.random` draw in `[0, 1)` (xorshift64*).
    pub fn next_random(&mut self) -> f64 {
        let mut x = self.rng_state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.rng_state = x;
        let bits = x.wrapping_mul(0x2545_f491_4f6c_dd1d) >> 11;
        bits as f64 / (1u64 << 53) as f64
    }

    pub fn execute_actions(&mut self, actions: &Rc<ActionsData>, scope: ObjectId) -> Avm1Result<Value> {
        let executor = self.executor().ok_or(Avm1Error::NoInterpreter)?;
        executor.execute_actions(self, actions, scope)
    }

    pub fn resolve_target(&mut self, target: &Value) -> Option<ObjectId> {
        let executor = self.executor()?;
        executor.resolve_target(self, target)
    }

    pub fn check_timeout(&mut self) -> Avm1Result<()> {
        match self.executor() {
            Some(executor) => executor.check_timeout(self),
            None => Ok(()),
        }
    }

    /// Short description used in error messages.
    pub(crate) fn describe(&self, value: &Value) -> String {
        match value {
            Value::Object(id) => match self.data(*id) {
                Some(d) => match &d.kind {
                    ObjectKind::Function(c) if !c.name().is_empty() => c.name().to_string(),
                    ObjectKind::Function(_) => "[type Function]".to_string(),
                    _ => "[object Object]".to_string(),
                },
                None => "[collected object]".to_string(),
            },
            Value::String(s) => format!("\"{s}\""),
            Value::Number(n) => number_ops::to_string(*n),
            Value::Bool(b) => b.to_string(),
            other => other.type_name().to_string(),
        }
    }
}
