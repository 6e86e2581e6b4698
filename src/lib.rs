//! Object and runtime core of an ActionScript 1 (AVM1) virtual machine.
//!
//! [`Context`] owns every object of one movie. Objects are addressed by
//! [`ObjectId`] and manipulated through the dynamic object protocol on the
//! Context (`get`, `put`, `call`, `construct`, ...). The bytecode interpreter
//! plugs in through [`ActionExecutor`].

pub mod config;
pub mod error;
pub mod runtime;
pub mod types;

pub use config::ContextConfig;
pub use error::{Avm1Error, Avm1Result};
pub use runtime::{
    ActionExecutor, ActionsData, Callable, Context, NativeClass, NativeClassDef, PropertyDescriptor,
    PropertyFlags, coerce,
};
pub use types::{ObjectId, Value, number_ops};
