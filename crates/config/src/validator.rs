use crate::*;
use thiserror::Error;
use url::Url;

const LOG_FORMATS: [&str; 3] = ["pretty", "json", "compact"];

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{field} must be within {min}..={max}, got {value}")]
    RateOutOfRange {
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("{field} must be strictly between 0 and 1, got {value}")]
    InvalidBand { field: String, value: f64 },

    #[error("{field} must be a positive integer")]
    InvalidPositiveInteger { field: String },

    #[error("{field} must be a positive float")]
    InvalidPositiveFloat { field: String },

    #[error("{field}: invalid URL {url:?}: {message}")]
    InvalidUrl {
        field: String,
        url: String,
        message: String,
    },

    #[error("{field}: HTTP status {status} is not retriable")]
    InvalidRetryStatus { field: String, status: u16 },

    #[error("Invalid log format: {0}. Must be one of: pretty, json, compact")]
    InvalidLogFormat(String),

    #[error("metrics_port {0} collides with the HTTP port")]
    MetricsPortCollision(u16),

    #[error("Environment variable '{var}' referenced by {field} is not set")]
    UnresolvedEnvVar { field: String, var: String },
}

#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct DefaultApplied {
    pub field: String,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
    pub defaults_applied: Vec<DefaultApplied>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
            defaults_applied: Vec::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, field: &str, message: &str) {
        self.warnings.push(ValidationWarning {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    pub fn add_default(&mut self, field: &str, value: &str) {
        self.defaults_applied.push(DefaultApplied {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

pub fn validate_config(config: &OpflowConfig) -> ValidationReport {
    let mut report = ValidationReport::new();

    validate_server(config, &mut report);
    validate_provider("providers.quote", &config.providers.quote, &mut report);
    validate_provider("providers.chain", &config.providers.chain, &mut report);
    validate_storage(&config.storage, &mut report);
    validate_analytics(&config.analytics, &mut report);

    if config.cache.ttl_secs == 0 {
        report.add_warning("cache.ttl_secs", "0 is treated as a one second window");
    }
    if config.batch.parallelism == 0 {
        report.add_error(ValidationError::InvalidPositiveInteger {
            field: "batch.parallelism".to_string(),
        });
    }

    for (name, symbols) in &config.ticker_lists {
        if symbols.is_empty() {
            report.add_warning(&format!("ticker_lists.{}", name), "List is empty");
        }
    }

    report
}

fn validate_server(config: &OpflowConfig, report: &mut ValidationReport) {
    let server = &config.server;
    if server.http_port == 0 {
        report.add_warning("server.http_port", "Port 0 binds an ephemeral port");
    }
    if server.request_timeout_secs == 0 {
        report.add_error(ValidationError::InvalidPositiveInteger {
            field: "server.request_timeout_secs".to_string(),
        });
    }

    let observability = &config.observability;
    if !LOG_FORMATS.contains(&observability.log_format.as_str()) {
        report.add_error(ValidationError::InvalidLogFormat(observability.log_format.clone()));
    }
    match observability.metrics_port {
        Some(port) if port == server.http_port && port != 0 => {
            report.add_error(ValidationError::MetricsPortCollision(port));
        }
        Some(_) => {}
        None => report.add_default("observability.metrics_port", "disabled"),
    }
}

fn validate_provider(prefix: &str, provider: &ProviderConfig, report: &mut ValidationReport) {
    let field = |name: &str| format!("{}.{}", prefix, name);

    check_placeholders(&field("base_url"), &provider.base_url, report);
    if let Err(e) = Url::parse(&provider.base_url) {
        report.add_error(ValidationError::InvalidUrl {
            field: field("base_url"),
            url: provider.base_url.clone(),
            message: e.to_string(),
        });
    }

    match &provider.token {
        Some(token) => check_placeholders(&field("token"), token, report),
        None => report.add_warning(&field("token"), "No API token set; requests go out unauthenticated"),
    }

    if provider.timeout_secs == 0 {
        report.add_error(ValidationError::InvalidPositiveInteger {
            field: field("timeout_secs"),
        });
    }

    let retry = &provider.retry;
    if !retry.backoff_factor.is_finite() || retry.backoff_factor < 0.0 {
        report.add_error(ValidationError::InvalidPositiveFloat {
            field: field("retry.backoff_factor"),
        });
    }
    for &status in &retry.status_forcelist {
        if !(400..=599).contains(&status) {
            report.add_error(ValidationError::InvalidRetryStatus {
                field: field("retry.status_forcelist"),
                status,
            });
        }
    }
}

fn validate_storage(storage: &StorageConfig, report: &mut ValidationReport) {
    match &storage.database_url {
        Some(url) => {
            check_placeholders("storage.database_url", url, report);
            match Url::parse(url) {
                Ok(parsed) if matches!(parsed.scheme(), "postgres" | "postgresql") => {}
                Ok(parsed) => report.add_error(ValidationError::InvalidUrl {
                    field: "storage.database_url".to_string(),
                    url: url.clone(),
                    message: format!("unsupported scheme '{}'", parsed.scheme()),
                }),
                Err(e) => report.add_error(ValidationError::InvalidUrl {
                    field: "storage.database_url".to_string(),
                    url: url.clone(),
                    message: e.to_string(),
                }),
            }
        }
        None => report.add_default("storage.database_url", "in-memory store"),
    }

    if storage.max_connections == 0 {
        report.add_error(ValidationError::InvalidPositiveInteger {
            field: "storage.max_connections".to_string(),
        });
    }
    if storage.timeout_secs == 0 {
        report.add_error(ValidationError::InvalidPositiveInteger {
            field: "storage.timeout_secs".to_string(),
        });
    }
}

fn validate_analytics(analytics: &AnalyticsConfig, report: &mut ValidationReport) {
    check_range("analytics.risk_free_rate", analytics.risk_free_rate, 0.0, 1.0, report);
    for (currency, rate) in &analytics.risk_free_rates {
        check_range(&format!("analytics.risk_free_rates.{}", currency), *rate, 0.0, 1.0, report);
    }
    check_range("analytics.cdi_monthly", analytics.cdi_monthly, 0.0, 10.0, report);
    check_range("analytics.ir_rate", analytics.ir_rate, 0.0, 1.0, report);
    check_range("analytics.dealer_short_ratio", analytics.dealer_short_ratio, 0.0, 1.0, report);

    check_band("analytics.wall_band", analytics.wall_band, report);
    check_band("analytics.moneyness_band", analytics.moneyness_band, report);

    if !analytics.bucket_size.is_finite() || analytics.bucket_size <= 0.0 {
        report.add_error(ValidationError::InvalidPositiveFloat {
            field: "analytics.bucket_size".to_string(),
        });
    }
}

fn check_range(field: &str, value: f64, min: f64, max: f64, report: &mut ValidationReport) {
    if !value.is_finite() || value < min || value > max {
        report.add_error(ValidationError::RateOutOfRange {
            field: field.to_string(),
            value,
            min,
            max,
        });
    }
}

fn check_band(field: &str, value: f64, report: &mut ValidationReport) {
    if !(value > 0.0 && value < 1.0) {
        report.add_error(ValidationError::InvalidBand {
            field: field.to_string(),
            value,
        });
    }
}

fn check_placeholders(field: &str, value: &str, report: &mut ValidationReport) {
    match unresolved_env_vars(value) {
        Ok(vars) => {
            for var in vars {
                report.add_error(ValidationError::UnresolvedEnvVar {
                    field: field.to_string(),
                    var,
                });
            }
        }
        Err(e) => report.add_warning(field, &format!("Could not scan for placeholders: {}", e)),
    }
}
