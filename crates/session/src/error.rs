#[derive(Debug)]
pub enum SessionError {
    StorageUnavailable,
    Corrupt(String),
    Io(String),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::StorageUnavailable => write!(f, "session storage unavailable"),
            SessionError::Corrupt(msg) => write!(f, "session storage corrupt: {msg}"),
            SessionError::Io(msg) => write!(f, "session storage error: {msg}"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<std::io::Error> for SessionError {
    fn from(err: std::io::Error) -> Self {
        SessionError::Io(err.to_string())
    }
}
