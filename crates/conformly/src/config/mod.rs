use crate::assessment::domain::{CompanyType, Regulation};
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub assessment: AssessmentRuntimeConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let bank_path = PathBuf::from(
            env::var("QUESTION_BANK_PATH").unwrap_or_else(|_| "config/questions.json".to_string()),
        );
        let question_limit = env::var("QUESTION_LIMIT")
            .unwrap_or_else(|_| "40".to_string())
            .parse::<usize>()
            .map_err(|_| ConfigError::InvalidQuestionLimit)?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            assessment: AssessmentRuntimeConfig {
                bank_path,
                question_limit,
            },
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Where the question bank lives and how many questions one session shows.
#[derive(Debug, Clone)]
pub struct AssessmentRuntimeConfig {
    pub bank_path: PathBuf,
    pub question_limit: usize,
}

/// Closed sets and provider endpoints for one assessment. Always passed in
/// explicitly; nothing in the assessment modules reads ambient state.
#[derive(Debug, Clone)]
pub struct AssessmentConfig {
    pub regulations: Vec<Regulation>,
    pub company_types: Vec<CompanyType>,
    pub openai_endpoint: String,
    pub anthropic_endpoint: String,
    pub anthropic_version: String,
}

impl AssessmentConfig {
    pub fn standard() -> Self {
        Self {
            regulations: Regulation::ordered().to_vec(),
            company_types: CompanyType::ordered().to_vec(),
            openai_endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            anthropic_endpoint: "https://api.anthropic.com/v1/messages".to_string(),
            anthropic_version: "2023-06-01".to_string(),
        }
    }

    pub fn allows(&self, regulation: Regulation) -> bool {
        self.regulations.contains(&regulation)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidQuestionLimit,
    InvalidHost { source: std::net::AddrParseError },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidQuestionLimit => {
                write!(f, "QUESTION_LIMIT must be a positive integer")
            }
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidQuestionLimit => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
