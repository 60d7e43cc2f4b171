mod autowire;
mod hook;
mod instantiate;
mod lifecycle;
mod register;
mod resolve;

pub use autowire::AutoWireErrorKind;
pub use hook::HookErrorKind;
pub use instantiate::InstantiateErrorKind;
pub use lifecycle::LifecycleErrorKind;
pub use register::RegisterErrorKind;
pub use resolve::{Cycle, ResolveErrorKind};
