use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_SERVER: &str = "http://localhost:5000";
pub const DEFAULT_SESSION_FILE: &str = "annotator-session.json";
pub const DEFAULT_TIMEOUT_SECS: u64 = remote::DEFAULT_TIMEOUT.as_secs();

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub server: String,
    pub study: String,
    pub session_path: PathBuf,
    pub timeout: Duration,
}

impl Config {
    /// Reads `ANNOTATOR_*` variables; `None` overrides keep the environment value.
    pub fn from_env(
        server: Option<String>,
        study: Option<String>,
        session_path: Option<PathBuf>,
        timeout_secs: Option<u64>,
    ) -> Self {
        Self {
            server: server.unwrap_or_else(|| env_var_string("ANNOTATOR_SERVER", DEFAULT_SERVER)),
            study: study.unwrap_or_else(|| {
                env_var_string("ANNOTATOR_STUDY", session::DEFAULT_OBJECT_PATH)
            }),
            session_path: session_path.unwrap_or_else(|| {
                PathBuf::from(env_var_string("ANNOTATOR_SESSION", DEFAULT_SESSION_FILE))
            }),
            timeout: Duration::from_secs(
                timeout_secs.unwrap_or_else(|| env_var_u64("ANNOTATOR_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)),
            ),
        }
    }
}

fn env_var_string(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_var_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
