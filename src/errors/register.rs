use crate::{any::TypeInfo, identity::Identity};

#[derive(thiserror::Error, Debug, Clone)]
pub enum RegisterErrorKind {
    #[error("Invalid recipe for {identity}: it provides {provides}, expected {}", identity.type_info())]
    InvalidRecipeShape { identity: Identity, provides: TypeInfo },
}
