use std::fmt;

/// Fatal runtime failures. Everything recoverable is clamped and reported
/// through [`crate::output::Output`] instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A buffer could not be reserved; names what was being allocated
    Allocation(&'static str),
    /// Window, renderer or texture creation failed
    Window(String),
    /// Audio subsystem failure
    Audio(String),
    /// A lock was poisoned by a panicking holder
    Poisoned(&'static str),
    /// The presentation thread could not be started or joined
    Thread(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allocation(what) => write!(f, "could not allocate {}", what),
            Self::Window(e) => write!(f, "window error: {}", e),
            Self::Audio(e) => write!(f, "audio error: {}", e),
            Self::Poisoned(what) => write!(f, "{} lock poisoned", what),
            Self::Thread(e) => write!(f, "thread error: {}", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<Error> for String {
    fn from(e: Error) -> Self {
        e.to_string()
    }
}
