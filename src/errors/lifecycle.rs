use super::{hook::HookErrorKind, resolve::ResolveErrorKind};
use crate::identity::Identity;

#[derive(thiserror::Error, Debug, Clone)]
pub enum LifecycleErrorKind {
    #[error(transparent)]
    Resolve(#[from] ResolveErrorKind),
    #[error("Start hook for {identity} failed: {source}")]
    StartFailed { identity: Identity, source: HookErrorKind },
    #[error("Destroy hook for {identity} failed: {source}")]
    DestroyFailed { identity: Identity, source: HookErrorKind },
}
