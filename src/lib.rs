//! Dependency injection container with singleton, prototype and request scopes.
//!
//! Recipes are closures whose parameters are resolved from the container,
//! see [`Container::provide`]. Lifecycle hooks are configured per registration with [`Hooks`].
#![no_std]

extern crate alloc;

#[macro_use]
pub(crate) mod macros;

pub(crate) mod any;
pub(crate) mod autowire;
pub(crate) mod cache;
pub(crate) mod config;
pub(crate) mod container;
pub(crate) mod dependency_resolver;
pub(crate) mod errors;
pub(crate) mod identity;
pub(crate) mod inject;
pub(crate) mod instantiator;
pub(crate) mod lifecycle;
pub(crate) mod registry;
pub(crate) mod request;
pub(crate) mod resolver;
pub(crate) mod scope;
pub(crate) mod service;

pub use any::TypeInfo;
pub use autowire::{AutoWire, AutoWireField};
pub use config::Config;
pub use container::Container;
pub use dependency_resolver::DependencyResolver;
pub use errors::{
    AutoWireErrorKind, Cycle, HookErrorKind, InstantiateErrorKind, LifecycleErrorKind, RegisterErrorKind, ResolveErrorKind,
};
pub use identity::Identity;
pub use inject::Inject;
pub use instantiator::{instance, Instantiator};
pub use lifecycle::Hooks;
pub use request::{RequestContext, RequestScope, RequestToken};
pub use resolver::Resolver;
pub use scope::Scope;

#[cfg(feature = "macros")]
pub use wirebox_macros::AutoWire;

#[doc(hidden)]
pub mod __private {
    pub use alloc::boxed::Box;
}
