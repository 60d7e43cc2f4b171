use super::resolve::ResolveErrorKind;
use crate::any::TypeInfo;

#[derive(thiserror::Error, Debug, Clone)]
pub enum AutoWireErrorKind {
    #[error("{type_info} can't be auto-wired: {reason}")]
    InvalidTarget { type_info: TypeInfo, reason: &'static str },
    #[error("Failed to wire field `{field}`: {source}")]
    Field {
        field: &'static str,
        source: ResolveErrorKind,
    },
}
