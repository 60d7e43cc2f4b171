use alloc::sync::Arc;
use core::fmt::{Debug, Display};

/// Failure returned by a lifecycle hook.
#[derive(thiserror::Error, Debug, Clone)]
pub enum HookErrorKind {
    #[error("{0}")]
    Custom(Arc<anyhow::Error>),
}

impl HookErrorKind {
    #[inline]
    #[must_use]
    pub fn msg<M>(message: M) -> Self
    where
        M: Display + Debug + Send + Sync + 'static,
    {
        anyhow::Error::msg(message).into()
    }
}

impl From<anyhow::Error> for HookErrorKind {
    #[inline]
    fn from(err: anyhow::Error) -> Self {
        Self::Custom(Arc::new(err))
    }
}
