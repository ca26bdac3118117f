use axum::http::header::COOKIE;
use axum::http::HeaderMap;
use conformly::assessment::domain::AssessmentProfile;
use conformly::assessment::providers::ProviderKind;
use conformly::assessment::{BankLoadReport, QuestionBank};
use conformly::config::{AssessmentConfig, AssessmentRuntimeConfig};
use metrics_exporter_prometheus::PrometheusHandle;
use rand::Rng;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

pub(crate) const SESSION_COOKIE: &str = "conformly_session";

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// BYOK provider selection for one session. The credential lives only here,
/// in memory, for the lifetime of the assessment.
#[derive(Debug, Clone)]
pub(crate) struct AiPreferences {
    pub(crate) provider: ProviderKind,
    pub(crate) credential: String,
}

/// Everything one assessment session carries between pages. The real company
/// name and NIF stay in this record for on-screen display; only the
/// anonymized `profile` is handed to the prompt builder.
#[derive(Debug, Clone)]
pub(crate) struct SessionRecord {
    pub(crate) id: String,
    pub(crate) csrf_token: String,
    pub(crate) company_name: String,
    pub(crate) nif: String,
    pub(crate) profile: AssessmentProfile,
    pub(crate) ai: Option<AiPreferences>,
}

#[derive(Debug)]
pub(crate) enum SessionError {
    Conflict,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Conflict => write!(f, "session id already exists"),
        }
    }
}

impl std::error::Error for SessionError {}

pub(crate) trait SessionStore: Send + Sync {
    fn insert(&self, record: SessionRecord) -> Result<(), SessionError>;
    fn fetch(&self, id: &str) -> Option<SessionRecord>;
    fn remove(&self, id: &str);
}

#[derive(Default)]
pub(crate) struct InMemorySessionStore {
    records: Mutex<HashMap<String, SessionRecord>>,
}

impl SessionStore for InMemorySessionStore {
    fn insert(&self, record: SessionRecord) -> Result<(), SessionError> {
        let mut guard = self.records.lock().expect("session mutex poisoned");
        if guard.contains_key(&record.id) {
            return Err(SessionError::Conflict);
        }
        guard.insert(record.id.clone(), record);
        Ok(())
    }

    fn fetch(&self, id: &str) -> Option<SessionRecord> {
        let guard = self.records.lock().expect("session mutex poisoned");
        guard.get(id).cloned()
    }

    fn remove(&self, id: &str) {
        let mut guard = self.records.lock().expect("session mutex poisoned");
        guard.remove(id);
    }
}

/// Shared flow dependencies threaded through the page handlers. Configuration
/// is explicit here; handlers never reach into ambient state.
pub(crate) struct FlowService {
    pub(crate) config: AssessmentConfig,
    pub(crate) runtime: AssessmentRuntimeConfig,
    pub(crate) store: Arc<dyn SessionStore>,
}

impl FlowService {
    pub(crate) fn new(
        config: AssessmentConfig,
        runtime: AssessmentRuntimeConfig,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            config,
            runtime,
            store,
        }
    }

    /// Rebuilds the bank from disk on every call; a missing or malformed
    /// document degrades to a zero-question assessment.
    pub(crate) fn load_bank(&self) -> (QuestionBank, BankLoadReport) {
        QuestionBank::from_path(&self.runtime.bank_path, &self.config)
    }
}

/// 32 hex chars of randomness for session ids and CSRF tokens.
pub(crate) fn random_token() -> String {
    let mut rng = rand::thread_rng();
    (0..32)
        .map(|_| {
            let digit = rng.gen_range(0..16u8);
            char::from_digit(digit as u32, 16).unwrap_or('0')
        })
        .collect()
}

pub(crate) fn session_cookie(id: &str) -> String {
    format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax")
}

pub(crate) fn session_id_from_headers(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_string())
    })
}
