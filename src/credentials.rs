//! Bearer credential loading and freshness tracking.
//!
//! The Granola desktop app writes `supabase.json`, whose `workos_tokens` field is
//! itself a JSON-encoded string holding the token pair. We never write to that
//! file; we only re-read it when the cached token is close to expiry.

use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error};

use crate::config::config::CredentialsConfig;
use crate::error::{GranolaError, Result};

/// Source of the current time in epoch milliseconds
pub trait Clock {
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_ms: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(now_ms: i64) -> Self {
        Self {
            now_ms: Arc::new(AtomicI64::new(now_ms)),
        }
    }

    pub fn set(&self, now_ms: i64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: i64) {
        self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_token: String,
    pub expires_at_ms: i64,
}

impl Credential {
    /// True while `now_ms` is strictly before the expiry minus the buffer
    pub fn is_fresh(&self, now_ms: i64, buffer_ms: i64) -> bool {
        now_ms < self.expires_at_ms.saturating_sub(buffer_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialStatus {
    Fresh,
    Stale,
    Absent,
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed credential JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("invalid token pair: {0}")]
    InvalidTokens(String),
}

#[derive(Debug, Deserialize)]
struct WorkosTokens {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<Value>,
    #[serde(default)]
    obtained_at: Option<Value>,
}

/// Read a numeric token field that may be a JSON number or a numeric string.
/// Absent, null, empty and zero values all read as `None`.
fn numeric_field(
    value: Option<&Value>,
    name: &'static str,
) -> std::result::Result<Option<f64>, CredentialError> {
    let number = match value {
        None | Some(Value::Null) => None,
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(Value::String(s)) => match s.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Some(v),
            _ => {
                return Err(CredentialError::InvalidTokens(format!(
                    "{name} is not a number: {s:?}"
                )))
            }
        },
        Some(other) => {
            return Err(CredentialError::InvalidTokens(format!(
                "{name} should be a number, found {}",
                json_kind(other)
            )))
        }
    };
    Ok(number.filter(|v| *v != 0.0))
}

/// Parse the contents of `supabase.json` into a credential.
///
/// `expires_in`/`obtained_at` may be numbers or numeric strings. Absent, null
/// or zero values fall back to `default_expires_in_secs` and `now_ms`.
pub fn parse_credential(
    contents: &str,
    now_ms: i64,
    default_expires_in_secs: u64,
) -> std::result::Result<Credential, CredentialError> {
    let outer: Value = serde_json::from_str(contents)?;
    let raw_tokens = match outer.get("workos_tokens") {
        None | Some(Value::Null) => return Err(CredentialError::MissingField("workos_tokens")),
        Some(Value::String(raw)) => raw,
        Some(other) => {
            return Err(CredentialError::InvalidTokens(format!(
                "workos_tokens should be a JSON string, found {}",
                json_kind(other)
            )))
        }
    };

    let tokens: WorkosTokens = serde_json::from_str(raw_tokens)?;
    let access_token = tokens
        .access_token
        .filter(|t| !t.is_empty())
        .ok_or(CredentialError::MissingField("access_token"))?;

    let expires_in_secs = numeric_field(tokens.expires_in.as_ref(), "expires_in")?
        .unwrap_or(default_expires_in_secs as f64);
    let obtained_at_ms = numeric_field(tokens.obtained_at.as_ref(), "obtained_at")?
        .unwrap_or(now_ms as f64);

    if !expires_in_secs.is_finite() || !obtained_at_ms.is_finite() {
        return Err(CredentialError::InvalidTokens(
            "non-finite expiry values".to_string(),
        ));
    }

    Ok(Credential {
        access_token,
        expires_at_ms: (obtained_at_ms + expires_in_secs * 1000.0) as i64,
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Owns the in-memory credential cache for one client
pub struct CredentialStore<C = SystemClock> {
    path: PathBuf,
    refresh_buffer_ms: i64,
    default_expires_in_secs: u64,
    clock: C,
    cached: Option<Credential>,
}

impl CredentialStore<SystemClock> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_clock(path, SystemClock)
    }

    pub fn from_config(config: &CredentialsConfig) -> Result<Self> {
        let path = config
            .resolve_path()
            .map_err(|e| GranolaError::Config(e.to_string()))?;
        Ok(Self::new(path).with_settings(config))
    }
}

impl<C: Clock> CredentialStore<C> {
    pub fn with_clock(path: impl Into<PathBuf>, clock: C) -> Self {
        let defaults = CredentialsConfig::default();
        Self {
            path: path.into(),
            refresh_buffer_ms: defaults.refresh_buffer_ms(),
            default_expires_in_secs: defaults.default_expires_in_secs,
            clock,
            cached: None,
        }
    }

    pub fn with_settings(mut self, config: &CredentialsConfig) -> Self {
        self.refresh_buffer_ms = config.refresh_buffer_ms();
        self.default_expires_in_secs = config.default_expires_in_secs;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn cached(&self) -> Option<&Credential> {
        self.cached.as_ref()
    }

    /// Re-read the credential file and replace the cache.
    ///
    /// Failures are logged and reported as `None`; they never propagate.
    pub fn load(&mut self) -> Option<String> {
        self.cached = None;

        match self.read_credential() {
            Ok(credential) => {
                debug!(
                    path = %self.path.display(),
                    expires_at_ms = credential.expires_at_ms,
                    "Loaded Granola credentials"
                );
                let token = credential.access_token.clone();
                self.cached = Some(credential);
                Some(token)
            }
            Err(e) => {
                error!(path = %self.path.display(), "Error loading Granola credentials: {}", e);
                None
            }
        }
    }

    /// Cached token if it is still fresh, otherwise whatever a reload yields
    pub fn get_valid(&mut self) -> Option<String> {
        if self.status() == CredentialStatus::Fresh {
            return self.cached.as_ref().map(|c| c.access_token.clone());
        }

        if self.cached.is_some() {
            debug!("Cached Granola token is within the refresh buffer, reloading");
        }
        self.load()
    }

    /// Freshness of the cached credential, without touching the file
    pub fn status(&self) -> CredentialStatus {
        match &self.cached {
            None => CredentialStatus::Absent,
            Some(c) if c.is_fresh(self.clock.now_ms(), self.refresh_buffer_ms) => {
                CredentialStatus::Fresh
            }
            Some(_) => CredentialStatus::Stale,
        }
    }

    fn read_credential(&self) -> std::result::Result<Credential, CredentialError> {
        let contents = fs::read_to_string(&self.path).map_err(|source| CredentialError::Io {
            path: self.path.clone(),
            source,
        })?;
        parse_credential(&contents, self.clock.now_ms(), self.default_expires_in_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::TempDir;
    use tracing_subscriber::fmt::MakeWriter;

    /// Collects formatted log output so tests can look at it
    #[derive(Clone, Default)]
    struct CapturedLogs {
        buffer: Arc<Mutex<Vec<u8>>>,
    }

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.buffer.lock().unwrap()).into_owned()
        }
    }

    impl Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.buffer.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    const T: i64 = 1_700_000_000_000;

    fn supabase_json(tokens: Value) -> String {
        json!({ "workos_tokens": tokens.to_string(), "user_info": "{}" }).to_string()
    }

    fn write_credentials(dir: &TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("supabase.json");
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_expiry_is_obtained_at_plus_expires_in() {
        let contents = supabase_json(json!({
            "access_token": "tok-1",
            "expires_in": 3600,
            "obtained_at": T,
        }));
        let credential = parse_credential(&contents, 0, 21600).unwrap();
        assert_eq!(credential.access_token, "tok-1");
        assert_eq!(credential.expires_at_ms, T + 3600 * 1000);
    }

    #[test]
    fn test_missing_expiry_fields_use_defaults() {
        let contents = supabase_json(json!({ "access_token": "tok-1" }));
        let credential = parse_credential(&contents, T, 21600).unwrap();
        assert_eq!(credential.expires_at_ms, T + 21600 * 1000);

        let zeroed = supabase_json(json!({
            "access_token": "tok-1",
            "expires_in": 0,
            "obtained_at": null,
        }));
        let credential = parse_credential(&zeroed, T, 60).unwrap();
        assert_eq!(credential.expires_at_ms, T + 60_000);
    }

    #[test]
    fn test_numeric_strings_are_accepted() {
        let contents = supabase_json(json!({
            "access_token": "tok-1",
            "expires_in": "3600",
            "obtained_at": T.to_string(),
        }));
        let credential = parse_credential(&contents, 0, 21600).unwrap();
        assert_eq!(credential.expires_at_ms, T + 3600 * 1000);

        let blank = supabase_json(json!({ "access_token": "tok-1", "expires_in": "" }));
        let credential = parse_credential(&blank, T, 21600).unwrap();
        assert_eq!(credential.expires_at_ms, T + 21600 * 1000);

        let garbage = supabase_json(json!({ "access_token": "tok-1", "expires_in": "soon" }));
        assert!(matches!(
            parse_credential(&garbage, T, 21600),
            Err(CredentialError::InvalidTokens(_))
        ));
        let not_finite = supabase_json(json!({ "access_token": "tok-1", "expires_in": "NaN" }));
        assert!(matches!(
            parse_credential(&not_finite, T, 21600),
            Err(CredentialError::InvalidTokens(_))
        ));
        let wrong_kind = supabase_json(json!({ "access_token": "tok-1", "obtained_at": [1] }));
        assert!(matches!(
            parse_credential(&wrong_kind, T, 21600),
            Err(CredentialError::InvalidTokens(_))
        ));
    }

    #[test]
    fn test_parse_rejects_bad_shapes() {
        assert!(matches!(
            parse_credential(r#"{"other": 1}"#, T, 21600),
            Err(CredentialError::MissingField("workos_tokens"))
        ));
        assert!(matches!(
            parse_credential(r#"{"workos_tokens": {"access_token": "x"}}"#, T, 21600),
            Err(CredentialError::InvalidTokens(_))
        ));
        assert!(matches!(
            parse_credential(r#"{"workos_tokens": "not json"}"#, T, 21600),
            Err(CredentialError::Json(_))
        ));
        assert!(matches!(
            parse_credential(&supabase_json(json!({ "expires_in": 10 })), T, 21600),
            Err(CredentialError::MissingField("access_token"))
        ));
        assert!(matches!(
            parse_credential("{", T, 21600),
            Err(CredentialError::Json(_))
        ));
    }

    #[test]
    fn test_load_without_nested_tokens_returns_none() {
        let dir = TempDir::new().unwrap();
        let path = write_credentials(&dir, r#"{"user_info": "{}"}"#);
        let mut store = CredentialStore::with_clock(path, ManualClock::new(T));

        assert_eq!(store.load(), None);
        assert_eq!(store.status(), CredentialStatus::Absent);
        assert_eq!(store.get_valid(), None);
    }

    #[test]
    fn test_load_failure_is_logged_as_error() {
        let dir = TempDir::new().unwrap();
        let path = write_credentials(&dir, r#"{"user_info": "{}"}"#);
        let mut store = CredentialStore::with_clock(path, ManualClock::new(T));

        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .finish();
        let token = tracing::subscriber::with_default(subscriber, || store.load());

        assert_eq!(token, None);
        let output = logs.contents();
        assert!(output.contains("ERROR"), "no error event in {output:?}");
        assert!(output.contains("Error loading Granola credentials"));
        assert!(output.contains("missing field `workos_tokens`"));
        assert!(output.contains(&store.path().display().to_string()));
    }

    #[test]
    fn test_load_missing_file_returns_none() {
        let dir = TempDir::new().unwrap();
        let mut store =
            CredentialStore::with_clock(dir.path().join("absent.json"), ManualClock::new(T));
        assert_eq!(store.load(), None);
    }

    #[test]
    fn test_get_valid_uses_cache_until_refresh_buffer() {
        let dir = TempDir::new().unwrap();
        let path = write_credentials(
            &dir,
            &supabase_json(json!({
                "access_token": "first",
                "expires_in": 3600,
                "obtained_at": T,
            })),
        );
        let clock = ManualClock::new(T);
        let mut store = CredentialStore::with_clock(&path, clock.clone());

        assert_eq!(store.get_valid().as_deref(), Some("first"));
        assert_eq!(store.status(), CredentialStatus::Fresh);

        // The desktop app rotates the token on disk; a fresh cache must not notice.
        fs::write(
            &path,
            supabase_json(json!({
                "access_token": "second",
                "expires_in": 3600,
                "obtained_at": T + 3_000_000,
            })),
        )
        .unwrap();

        let expiry = T + 3_600_000;
        clock.set(expiry - 300_000 - 1);
        assert_eq!(store.get_valid().as_deref(), Some("first"));

        clock.set(expiry - 300_000);
        assert_eq!(store.status(), CredentialStatus::Stale);
        assert_eq!(store.get_valid().as_deref(), Some("second"));
        assert_eq!(
            store.cached().map(|c| c.expires_at_ms),
            Some(T + 3_000_000 + 3_600_000)
        );
    }

    #[test]
    fn test_failed_reload_clears_cache() {
        let dir = TempDir::new().unwrap();
        let path = write_credentials(
            &dir,
            &supabase_json(json!({
                "access_token": "first",
                "expires_in": 600,
                "obtained_at": T,
            })),
        );
        let clock = ManualClock::new(T);
        let mut store = CredentialStore::with_clock(&path, clock.clone());
        assert!(store.get_valid().is_some());

        fs::remove_file(&path).unwrap();
        clock.advance(600_000);
        assert_eq!(store.get_valid(), None);
        assert!(store.cached().is_none());
    }

    #[test]
    fn test_settings_override_buffer() {
        let dir = TempDir::new().unwrap();
        let path = write_credentials(
            &dir,
            &supabase_json(json!({
                "access_token": "tok",
                "expires_in": 100,
                "obtained_at": T,
            })),
        );
        let config = CredentialsConfig {
            path: None,
            refresh_buffer_secs: 0,
            default_expires_in_secs: 21600,
        };
        let clock = ManualClock::new(T + 99_999);
        let mut store = CredentialStore::with_clock(&path, clock.clone()).with_settings(&config);

        store.load();
        assert_eq!(store.status(), CredentialStatus::Fresh);
        clock.advance(1);
        assert_eq!(store.status(), CredentialStatus::Stale);
    }
}
