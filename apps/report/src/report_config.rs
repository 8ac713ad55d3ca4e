use std::env;
use std::str::FromStr;
use std::time::Duration;

use tallyboard_application::AnalyticsWindow;
use tallyboard_core::{AccessToken, AppError, AppResult};
use url::Url;

const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000/api";

/// Page rendered by one report run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportMode {
    Analytics,
    Financial,
    Rbac,
}

impl ReportMode {
    pub fn from_args(argument: Option<&str>) -> AppResult<Self> {
        match argument.map(str::trim) {
            None | Some("") | Some("analytics") => Ok(Self::Analytics),
            Some("financial") => Ok(Self::Financial),
            Some("rbac") => Ok(Self::Rbac),
            Some(other) => Err(AppError::Validation(format!(
                "unknown report '{other}', expected one of: analytics, financial, rbac"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Analytics => "analytics",
            Self::Financial => "financial",
            Self::Rbac => "rbac",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub api_base_url: Url,
    pub access_token: AccessToken,
    pub window: AnalyticsWindow,
    pub http_timeout: Duration,
}

impl ReportConfig {
    pub fn load() -> AppResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_base_url = lookup("TALLYBOARD_API_BASE_URL")
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_owned());
        let api_base_url = Url::parse(raw_base_url.trim_end_matches('/')).map_err(|error| {
            AppError::Validation(format!(
                "invalid TALLYBOARD_API_BASE_URL value '{raw_base_url}': {error}"
            ))
        })?;

        let raw_token = lookup("TALLYBOARD_ACCESS_TOKEN").ok_or_else(|| {
            AppError::Validation("TALLYBOARD_ACCESS_TOKEN is required".to_owned())
        })?;
        let access_token = AccessToken::new(raw_token).map_err(|_| {
            AppError::Validation("TALLYBOARD_ACCESS_TOKEN must not be empty".to_owned())
        })?;

        let months_back = parse_positive(&lookup, "TALLYBOARD_MONTHS_BACK", 12_u32)?;
        let days_back = parse_positive(&lookup, "TALLYBOARD_DAYS_BACK", 30_u32)?;
        let top_products_limit = parse_positive(&lookup, "TALLYBOARD_TOP_PRODUCTS", 5_usize)?;
        let timeout_secs = parse_positive(&lookup, "TALLYBOARD_HTTP_TIMEOUT_SECS", 15_u64)?;

        Ok(Self {
            api_base_url,
            access_token,
            window: AnalyticsWindow {
                months_back,
                days_back,
                top_products_limit,
            },
            http_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn parse_positive<F, T>(lookup: &F, name: &str, default: T) -> AppResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + PartialEq + Default,
    T::Err: std::fmt::Display,
{
    let value = match lookup(name) {
        Some(raw) => raw.trim().parse::<T>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{raw}': {error}"))
        })?,
        None => default,
    };

    if value == T::default() {
        return Err(AppError::Validation(format!(
            "{name} must be greater than zero"
        )));
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use tallyboard_core::AppError;

    use super::{ReportConfig, ReportMode};

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(name, value)| ((*name).to_owned(), (*value).to_owned()))
            .collect();
        move |name| values.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_only_token_is_set() {
        let config = ReportConfig::from_lookup(lookup_from(&[("TALLYBOARD_ACCESS_TOKEN", "t0k")]));

        let Ok(config) = config else {
            panic!("config should load with defaults");
        };
        assert_eq!(config.api_base_url.as_str(), "http://127.0.0.1:8000/api");
        assert_eq!(config.access_token.as_str(), "t0k");
        assert_eq!(config.window.months_back, 12);
        assert_eq!(config.window.days_back, 30);
        assert_eq!(config.window.top_products_limit, 5);
        assert_eq!(config.http_timeout, Duration::from_secs(15));
    }

    #[test]
    fn missing_token_is_rejected() {
        let result = ReportConfig::from_lookup(lookup_from(&[]));

        assert!(matches!(
            result,
            Err(AppError::Validation(message)) if message.contains("TALLYBOARD_ACCESS_TOKEN")
        ));
    }

    #[test]
    fn zero_window_is_rejected() {
        let result = ReportConfig::from_lookup(lookup_from(&[
            ("TALLYBOARD_ACCESS_TOKEN", "t0k"),
            ("TALLYBOARD_MONTHS_BACK", "0"),
        ]));

        assert!(matches!(
            result,
            Err(AppError::Validation(message)) if message.contains("TALLYBOARD_MONTHS_BACK")
        ));
    }

    #[test]
    fn malformed_number_names_the_variable() {
        let result = ReportConfig::from_lookup(lookup_from(&[
            ("TALLYBOARD_ACCESS_TOKEN", "t0k"),
            ("TALLYBOARD_DAYS_BACK", "thirty"),
        ]));

        assert!(matches!(
            result,
            Err(AppError::Validation(message)) if message.contains("TALLYBOARD_DAYS_BACK")
        ));
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let result = ReportConfig::from_lookup(lookup_from(&[
            ("TALLYBOARD_ACCESS_TOKEN", "t0k"),
            ("TALLYBOARD_API_BASE_URL", "not a url"),
        ]));

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn report_mode_defaults_to_analytics() {
        assert_eq!(ReportMode::from_args(None).ok(), Some(ReportMode::Analytics));
        assert_eq!(
            ReportMode::from_args(Some("rbac")).ok(),
            Some(ReportMode::Rbac)
        );
        assert!(ReportMode::from_args(Some("payroll")).is_err());
    }
}
