use crate::infra::{
    random_token, session_cookie, session_id_from_headers, AiPreferences, AppState, FlowService,
    SessionError, SessionRecord,
};
use crate::pages::{self, AiOutcome, FieldIssue, IntakeValues};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::{Extension, Form, Json};
use chrono::Local;
use conformly::assessment::domain::{
    AnswerSet, AnswerValue, AssessmentProfile, CompanyAlias, CompanyType, Regulation,
};
use conformly::assessment::providers::{AnalysisOptions, ProviderKind};
use conformly::assessment::{
    build_prompt, normalized_answers, remediation_plan, scan_text, score_answers,
    select_questions, ActionCatalog,
};
use conformly::config::AssessmentConfig;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

#[derive(Debug)]
pub(crate) enum FlowError {
    MissingSession,
    CsrfMismatch,
    ConsentRequired,
    Session(SessionError),
}

impl fmt::Display for FlowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowError::MissingSession => {
                write!(f, "no active assessment session; start again from the home page")
            }
            FlowError::CsrfMismatch => write!(f, "anti-forgery token mismatch"),
            FlowError::ConsentRequired => write!(f, "consent is required to continue"),
            FlowError::Session(err) => write!(f, "session error: {err}"),
        }
    }
}

impl std::error::Error for FlowError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FlowError::Session(err) => Some(err),
            _ => None,
        }
    }
}

impl IntoResponse for FlowError {
    fn into_response(self) -> Response {
        let status = match self {
            FlowError::MissingSession | FlowError::CsrfMismatch => StatusCode::FORBIDDEN,
            FlowError::ConsentRequired => StatusCode::BAD_REQUEST,
            FlowError::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Html(format!("<p>{}</p>", pages::escape(&self.to_string())))).into_response()
    }
}

impl From<SessionError> for FlowError {
    fn from(value: SessionError) -> Self {
        Self::Session(value)
    }
}

pub(crate) fn flow_router(service: Arc<FlowService>) -> axum::Router {
    axum::Router::new()
        .route("/", axum::routing::get(home_page))
        .route("/consent", axum::routing::post(consent_page))
        .route("/questionnaire", axum::routing::post(questionnaire_page))
        .route("/report", axum::routing::post(report_page))
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .layer(Extension(service))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn home_page(Extension(flow): Extension<Arc<FlowService>>) -> Html<String> {
    Html(pages::home(&flow.config, &IntakeValues::default(), &[]))
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct IntakeForm {
    #[serde(default)]
    pub(crate) company_name: String,
    #[serde(default)]
    pub(crate) nif: String,
    #[serde(default)]
    pub(crate) company_type: String,
    #[serde(default)]
    pub(crate) employees: String,
    #[serde(default)]
    pub(crate) reg_gdpr: Option<String>,
    #[serde(default)]
    pub(crate) reg_nis2: Option<String>,
    #[serde(default)]
    pub(crate) reg_dora: Option<String>,
    #[serde(default)]
    pub(crate) reg_iso27001: Option<String>,
    #[serde(default)]
    pub(crate) ai_opt_in: Option<String>,
    #[serde(default)]
    pub(crate) provider: Option<String>,
    #[serde(default)]
    pub(crate) api_key: Option<String>,
}

impl IntakeForm {
    fn selected_regulations(&self, config: &AssessmentConfig) -> Vec<Regulation> {
        let flags = [
            (Regulation::Gdpr, &self.reg_gdpr),
            (Regulation::Nis2, &self.reg_nis2),
            (Regulation::Dora, &self.reg_dora),
            (Regulation::Iso27001, &self.reg_iso27001),
        ];
        flags
            .into_iter()
            .filter(|(regulation, flag)| flag.is_some() && config.allows(*regulation))
            .map(|(regulation, _)| regulation)
            .collect()
    }
}

struct ValidatedIntake {
    company_name: String,
    nif: String,
    company_type: CompanyType,
    employee_count: u32,
    regulations: Vec<Regulation>,
    ai: Option<AiPreferences>,
}

fn validate_intake(
    config: &AssessmentConfig,
    form: &IntakeForm,
) -> Result<ValidatedIntake, (IntakeValues, Vec<FieldIssue>)> {
    let mut issues = Vec::new();

    let company_name = form.company_name.trim().to_string();
    if company_name.is_empty() {
        issues.push(FieldIssue {
            field: "company_name",
            message: "Company name is required".to_string(),
        });
    }

    let nif = form.nif.trim().to_string();
    if nif.is_empty() {
        issues.push(FieldIssue {
            field: "nif",
            message: "NIF / tax id is required".to_string(),
        });
    }

    let company_type = CompanyType::parse(&form.company_type);
    if company_type.is_none() {
        issues.push(FieldIssue {
            field: "company_type",
            message: "Pick a company type from the list".to_string(),
        });
    }

    let employee_count = form.employees.trim().parse::<u32>();
    if employee_count.is_err() {
        issues.push(FieldIssue {
            field: "employees",
            message: "Employees must be a whole number".to_string(),
        });
    }

    let regulations = form.selected_regulations(config);
    if regulations.is_empty() {
        issues.push(FieldIssue {
            field: "regulations",
            message: "Select at least one regulation".to_string(),
        });
    }

    let ai_opt_in = form.ai_opt_in.is_some();
    let provider = form
        .provider
        .as_deref()
        .and_then(ProviderKind::parse);
    let api_key = form
        .api_key
        .as_deref()
        .map(str::trim)
        .filter(|key| !key.is_empty());

    let ai = if ai_opt_in {
        match (provider, api_key) {
            (Some(provider), Some(key)) => Some(AiPreferences {
                provider,
                credential: key.to_string(),
            }),
            (None, _) => {
                issues.push(FieldIssue {
                    field: "provider",
                    message: "Pick a provider for the AI analysis".to_string(),
                });
                None
            }
            (_, None) => {
                issues.push(FieldIssue {
                    field: "api_key",
                    message: "An API key is required for the AI analysis".to_string(),
                });
                None
            }
        }
    } else {
        None
    };

    if issues.is_empty() {
        Ok(ValidatedIntake {
            company_name,
            nif,
            company_type: company_type.unwrap_or(CompanyType::SmallBusiness),
            employee_count: employee_count.unwrap_or(0),
            regulations,
            ai,
        })
    } else {
        Err((
            IntakeValues {
                company_name,
                nif,
                company_type: form.company_type.clone(),
                employees: form.employees.clone(),
                regulations,
                ai_opt_in,
                provider,
            },
            issues,
        ))
    }
}

pub(crate) async fn consent_page(
    Extension(flow): Extension<Arc<FlowService>>,
    Form(form): Form<IntakeForm>,
) -> Result<Response, FlowError> {
    let intake = match validate_intake(&flow.config, &form) {
        Ok(intake) => intake,
        Err((values, issues)) => {
            return Ok(Html(pages::home(&flow.config, &values, &issues)).into_response());
        }
    };

    let record = SessionRecord {
        id: random_token(),
        csrf_token: random_token(),
        company_name: intake.company_name,
        nif: intake.nif,
        profile: AssessmentProfile {
            alias: CompanyAlias::generate(),
            company_type: intake.company_type,
            employee_count: intake.employee_count,
            regulations: intake.regulations,
        },
        ai: intake.ai,
    };
    flow.store.insert(record.clone())?;

    let page = pages::consent(&record);
    Ok((
        [(header::SET_COOKIE, session_cookie(&record.id))],
        Html(page),
    )
        .into_response())
}

fn require_session(
    flow: &FlowService,
    headers: &HeaderMap,
    csrf_token: &str,
) -> Result<SessionRecord, FlowError> {
    let id = session_id_from_headers(headers).ok_or(FlowError::MissingSession)?;
    let record = flow.store.fetch(&id).ok_or(FlowError::MissingSession)?;
    if record.csrf_token != csrf_token {
        return Err(FlowError::CsrfMismatch);
    }
    Ok(record)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ConsentSubmit {
    #[serde(default)]
    pub(crate) csrf_token: String,
    #[serde(default)]
    pub(crate) consent: Option<String>,
}

pub(crate) async fn questionnaire_page(
    Extension(flow): Extension<Arc<FlowService>>,
    headers: HeaderMap,
    Form(form): Form<ConsentSubmit>,
) -> Result<Html<String>, FlowError> {
    let record = require_session(&flow, &headers, &form.csrf_token)?;
    if form.consent.is_none() {
        return Err(FlowError::ConsentRequired);
    }

    let (bank, _) = flow.load_bank();
    let questions = select_questions(
        &bank,
        &record.profile.regulations,
        flow.runtime.question_limit,
    );
    Ok(Html(pages::questionnaire(&record, &questions)))
}

fn answers_from_form(form: &HashMap<String, String>) -> AnswerSet {
    form.iter()
        .filter_map(|(name, value)| {
            let id = name.strip_prefix("q_")?;
            let value = value.trim();
            if value.is_empty() {
                return None;
            }
            Some((id.to_string(), AnswerValue::Text(value.to_string())))
        })
        .collect()
}

/// Runs the PII gate and, only when it passes, the single provider call.
async fn analysis_outcome(
    config: &AssessmentConfig,
    ai: &AiPreferences,
    prompt: &str,
) -> AiOutcome {
    let scrub = scan_text(prompt);
    if !scrub.clean {
        warn!(categories = ?scrub.matched, "outbound prompt blocked by PII gate");
        return AiOutcome::Blocked(scrub.matched);
    }

    let options = AnalysisOptions::default();
    match ai
        .provider
        .analyze(config, &ai.credential, prompt, &options)
        .await
    {
        Ok(text) => AiOutcome::Narrative(text),
        Err(err) => {
            warn!(provider = ai.provider.label(), %err, "AI analysis failed");
            AiOutcome::Unavailable
        }
    }
}

pub(crate) async fn report_page(
    Extension(flow): Extension<Arc<FlowService>>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Result<Html<String>, FlowError> {
    let csrf_token = form.get("csrf_token").cloned().unwrap_or_default();
    let record = require_session(&flow, &headers, &csrf_token)?;

    let (bank, _) = flow.load_bank();
    let questions = select_questions(
        &bank,
        &record.profile.regulations,
        flow.runtime.question_limit,
    );
    let answers = answers_from_form(&form);

    let scores = score_answers(&questions, &answers);
    let plan = remediation_plan(&questions, &answers, &ActionCatalog::standard());

    let ai = match &record.ai {
        Some(prefs) => {
            let normalized = normalized_answers(&questions, &answers);
            let prompt = build_prompt(&record.profile, &scores, &normalized);
            analysis_outcome(&flow.config, prefs, &prompt).await
        }
        None => AiOutcome::Skipped,
    };

    let generated_on = Local::now().format("%Y-%m-%d %H:%M").to_string();
    let page = pages::report(&record, &scores, &plan, &ai, &generated_on);

    // One assessment per session: the record dies with the report.
    flow.store.remove(&record.id);
    Ok(Html(page))
}
