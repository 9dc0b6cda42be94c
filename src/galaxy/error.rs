use thiserror::Error;

pub type Result<T> = std::result::Result<T, GalaxyError>;

/// Errors raised while building or augmenting the galaxy point set.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GalaxyError {
    /// A structural parameter is outside its valid domain.
    /// The regenerate call is rejected and the previous collection stays live.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// An operation was requested before the state it depends on exists.
    #[error("precondition violated: {0}")]
    PreconditionViolation(&'static str),
}

impl GalaxyError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}
