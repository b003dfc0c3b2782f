use thiserror::Error;

/// Errors returned by enrollment and recognition operations.
///
/// Kinds are distinct so callers can tell "fix your input"
/// ([`EagleError::InvalidArgument`]) from "retry later"
/// ([`EagleError::ActivationThrottled`]) from fatal configuration problems.
/// Construction-time failures are fatal to the instance being built; per-call
/// argument failures leave the instance usable.
#[derive(Debug, Error)]
pub enum EagleError {
    #[error("out of memory: {0}")]
    OutOfMemory(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("stop iteration")]
    StopIteration,

    #[error("key error: {0}")]
    KeyError(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("runtime error: {0}")]
    Runtime(String),

    /// The AccessKey failed validation.
    #[error("activation error: {0}")]
    Activation(String),

    /// The AccessKey has reached its usage limit.
    #[error("activation limit reached")]
    ActivationLimitReached,

    /// Too many activation attempts; retry later.
    #[error("activation throttled")]
    ActivationThrottled,

    /// The AccessKey has been revoked or refused.
    #[error("activation refused")]
    ActivationRefused,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            EagleError::InvalidArgument("bad frame".into()).to_string(),
            "invalid argument: bad frame"
        );
        assert_eq!(
            EagleError::InvalidState("deleted".into()).to_string(),
            "invalid state: deleted"
        );
        assert_eq!(
            EagleError::ActivationLimitReached.to_string(),
            "activation limit reached"
        );
    }

    #[test]
    fn io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: EagleError = io.into();
        assert!(matches!(err, EagleError::Io(_)));
        assert!(err.to_string().starts_with("I/O error"));
    }
}
