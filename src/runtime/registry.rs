use std::any::{Any, TypeId};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, trace, warn};

use super::*;

/// Compiled action bytes plus where they came from. Instances are shared
/// through [`Context::create_actions_data`], so identity means "same script
/// body".
pub struct ActionsData {
    bytes: Rc<[u8]>,
    id: Rc<str>,
    parent: Option<Rc<ActionsData>>,
}

impl ActionsData {
    pub fn bytes(&self) -> &Rc<[u8]> {
        &self.bytes
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn parent(&self) -> Option<&Rc<ActionsData>> {
        self.parent.as_ref()
    }
}

impl fmt::Debug for ActionsData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionsData")
            .field("id", &self.id)
            .field("len", &self.bytes.len())
            .field("parent", &self.parent.as_ref().map(|p| p.id.clone()))
            .finish()
    }
}

/// Identity of a class owning lazily built static state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassKey {
    /// Host-implemented class, keyed by its Rust type.
    Host(TypeId),
    /// Wrapped or script class, keyed by its constructor object.
    Object(ObjectId),
}

/// Host class with per-movie singleton state.
pub trait StaticStateClass: 'static {
    fn initialize_static(_cx: &mut Context, _state: ObjectId) -> Avm1Result<()> {
        Ok(())
    }
}

/// Gets told when script defines or drops a handler property it cares about.
pub trait EventObserver {
    fn on_event_property_changed(&self, cx: &mut Context, name: &str);
}

/// Opaque parser-side description of a library symbol.
pub type SymbolProps = Rc<dyn Any>;

#[derive(Clone)]
pub struct AssetInfo {
    pub symbol_id: u32,
    pub props: SymbolProps,
}

impl fmt::Debug for AssetInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetInfo").field("symbol_id", &self.symbol_id).finish_non_exhaustive()
    }
}

impl Context {
    pub fn get_static_state<C: StaticStateClass>(&mut self) -> Avm1Result<ObjectId> {
        let key = ClassKey::Host(TypeId::of::<C>());
        if let Some(state) = self.static_states.get(&key) {
            return Ok(*state);
        }
        let state = self.create_object_with_proto(None);
        // cached before the initializer runs so re-entrant lookups see it
        self.static_states.insert(key, state);
        debug!(class = std::any::type_name::<C>(), "initializing static state");
        C::initialize_static(self, state)?;
        Ok(state)
    }

    /// Static state of a wrapped class; runs the `static_init` it was
    /// wrapped with, if any, on first access.
    pub fn get_class_static_state(&mut self, class: ObjectId) -> Avm1Result<ObjectId> {
        let key = ClassKey::Object(class);
        if let Some(state) = self.static_states.get(&key) {
            return Ok(*state);
        }
        let state = self.create_object_with_proto(None);
        self.static_states.insert(key, state);
        if let Some(init) = self.static_initializers.get(&class).cloned() {
            debug!(?class, "initializing class static state");
            init(self, &Value::Object(state), &[Value::Object(class)])?;
        }
        Ok(state)
    }

    pub(crate) fn set_static_initializer(&mut self, class: ObjectId, init: NativeFn) {
        self.static_initializers.insert(class, init);
    }

    pub fn register_event_observer(&mut self, name: &str, observer: Rc<dyn EventObserver>) {
        let key = self.normalize_name(name);
        let observers = self.event_observers.entry(key).or_default();
        if !observers.iter().any(|o| std::ptr::addr_eq(Rc::as_ptr(o), Rc::as_ptr(&observer))) {
            observers.push(observer);
        }
    }

    pub fn unregister_event_observer(&mut self, name: &str, observer: &Rc<dyn EventObserver>) -> bool {
        let key = self.normalize_name(name);
        let Some(observers) = self.event_observers.get_mut(&key) else {
            return false;
        };
        let before = observers.len();
        observers.retain(|o| !std::ptr::addr_eq(Rc::as_ptr(o), Rc::as_ptr(observer)));
        let removed = observers.len() != before;
        if observers.is_empty() {
            self.event_observers.remove(&key);
        }
        removed
    }

    pub fn has_event_observers(&mut self, name: &str) -> bool {
        let key = self.normalize_name(name);
        self.event_observers.contains_key(&key)
    }

    /// Notifies the observers registered when the broadcast starts, in
    /// registration order.
    pub fn broadcast_event_property_change(&mut self, name: &str) {
        let key = self.normalize_name(name);
        let Some(observers) = self.event_observers.get(&key).cloned() else {
            return;
        };
        trace!(name = %key, count = observers.len(), "event property changed");
        for observer in observers {
            observer.on_event_property_changed(self, &key);
        }
    }

    pub fn add_asset(&mut self, class_name: &str, symbol_id: u32, props: SymbolProps) {
        self.asset_symbols.insert(class_name.to_lowercase(), symbol_id);
        self.symbol_props.insert(symbol_id, props);
    }

    pub fn get_asset(&self, class_name: &str) -> Option<AssetInfo> {
        let symbol_id = *self.asset_symbols.get(&class_name.to_lowercase())?;
        let props = self.symbol_props.get(&symbol_id)?.clone();
        Some(AssetInfo { symbol_id, props })
    }

    /// Binds a script class to the library symbol exported as `class_name`.
    pub fn register_class(&mut self, class_name: &str, class: ObjectId) -> bool {
        let Some(symbol_id) = self.asset_symbols.get(&class_name.to_lowercase()).copied() else {
            warn!(class_name, "registerClass: no library symbol with that name");
            return false;
        };
        debug!(class_name, symbol_id, "registered class for symbol");
        self.symbol_classes.insert(symbol_id, class);
        true
    }

    pub fn get_symbol_class(&self, symbol_id: u32) -> Option<ObjectId> {
        self.symbol_classes.get(&symbol_id).copied()
    }

    /// Returns the shared wrapper for `bytes` when one with the same id and
    /// parent is still alive.
    pub fn create_actions_data(
        &mut self,
        bytes: &Rc<[u8]>,
        id: &str,
        parent: Option<&Rc<ActionsData>>,
    ) -> Rc<ActionsData> {
        let key = Rc::as_ptr(bytes) as *const u8 as usize;
        if let Some(existing) = self.actions_cache.get(&key).and_then(Weak::upgrade) {
            let same_parent = match (existing.parent(), parent) {
                (Some(a), Some(b)) => Rc::ptr_eq(a, b),
                (None, None) => true,
                _ => false,
            };
            if Rc::ptr_eq(&existing.bytes, bytes) && &*existing.id == id && same_parent {
                return existing;
            }
        }
        debug!(id, len = bytes.len(), "compiling new actions data");
        self.actions_cache.retain(|_, weak| weak.strong_count() > 0);
        let data = Rc::new(ActionsData {
            bytes: bytes.clone(),
            id: Rc::from(id),
            parent: parent.cloned(),
        });
        self.actions_cache.insert(key, Rc::downgrade(&data));
        data
    }
}
