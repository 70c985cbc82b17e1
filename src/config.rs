//! Server configuration, read from the environment (and `.env` when present).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub format: LogFormat,
    /// When set, logs are also written to a daily rolling file here.
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct NewsConfig {
    pub api_url: String,
    pub api_key: String,
    pub lang: String,
    pub country: String,
    pub timeout: Duration,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            api_url: "https://gnews.io/api/v4/search".to_string(),
            api_key: String::new(),
            lang: "en".to_string(),
            country: "us".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub data_dir: PathBuf,
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub bcrypt_cost: u32,
    pub cors_origins: Vec<String>,
    pub news: NewsConfig,
    pub log: LogConfig,
}

impl Config {
    /// Loads `.env` (if any) and then reads the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut bind_address: SocketAddr = match get("NEWSDESK_BIND_ADDRESS") {
            Some(v) => parse("NEWSDESK_BIND_ADDRESS", &v)?,
            None => SocketAddr::from(([0, 0, 0, 0], 5000)),
        };
        if get("NEWSDESK_BIND_ADDRESS").is_none() {
            if let Some(port) = get("PORT") {
                bind_address.set_port(parse("PORT", &port)?);
            }
        }

        let jwt_secret = get("NEWSDESK_JWT_SECRET")
            .or_else(|| get("JWT_SECRET"))
            .ok_or(ConfigError::Missing("NEWSDESK_JWT_SECRET"))?;

        let token_ttl = match get("NEWSDESK_TOKEN_TTL_SECS") {
            Some(v) => Duration::from_secs(parse("NEWSDESK_TOKEN_TTL_SECS", &v)?),
            None => Duration::from_secs(3600),
        };

        let bcrypt_cost = match get("NEWSDESK_BCRYPT_COST") {
            Some(v) => match parse::<u32>("NEWSDESK_BCRYPT_COST", &v)? {
                cost @ 4..=31 => cost,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "NEWSDESK_BCRYPT_COST",
                        value: v,
                    })
                }
            },
            None => 10,
        };

        let cors_origins = get("NEWSDESK_CORS_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let defaults = NewsConfig::default();
        let news = NewsConfig {
            api_url: get("NEWS_API_URL").unwrap_or(defaults.api_url),
            api_key: get("NEWS_API_KEY").unwrap_or_default(),
            lang: get("NEWS_LANG").unwrap_or(defaults.lang),
            country: get("NEWS_COUNTRY").unwrap_or(defaults.country),
            timeout: match get("NEWS_TIMEOUT_SECS") {
                Some(v) => Duration::from_secs(parse("NEWS_TIMEOUT_SECS", &v)?),
                None => defaults.timeout,
            },
        };

        let format = match get("NEWSDESK_LOG_FORMAT").as_deref() {
            None | Some("pretty") | Some("text") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "NEWSDESK_LOG_FORMAT",
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            bind_address,
            data_dir: PathBuf::from(get("NEWSDESK_DATA_DIR").unwrap_or_else(|| "newsdesk_data".into())),
            jwt_secret,
            token_ttl,
            bcrypt_cost,
            cors_origins,
            news,
            log: LogConfig {
                format,
                dir: get("NEWSDESK_LOG_DIR").map(PathBuf::from),
            },
        })
    }
}

fn parse<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_secret_is_set() {
        let config = Config::from_lookup(lookup(&[("NEWSDESK_JWT_SECRET", "s3cret")])).unwrap();
        assert_eq!(config.bind_address.port(), 5000);
        assert_eq!(config.token_ttl, Duration::from_secs(3600));
        assert_eq!(config.bcrypt_cost, 10);
        assert_eq!(config.news.lang, "en");
        assert_eq!(config.news.country, "us");
        assert_eq!(config.log.format, LogFormat::Pretty);
        assert!(config.cors_origins.is_empty());
    }

    #[test]
    fn missing_secret_is_an_error() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("NEWSDESK_JWT_SECRET")));
    }

    #[test]
    fn legacy_secret_and_port_are_honored() {
        let config = Config::from_lookup(lookup(&[("JWT_SECRET", "x"), ("PORT", "8081")])).unwrap();
        assert_eq!(config.jwt_secret, "x");
        assert_eq!(config.bind_address.port(), 8081);
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        let err = Config::from_lookup(lookup(&[
            ("NEWSDESK_JWT_SECRET", "x"),
            ("NEWS_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "NEWS_TIMEOUT_SECS", .. }));
    }

    #[test]
    fn bcrypt_cost_must_be_in_range() {
        for cost in ["3", "32", "0"] {
            let err = Config::from_lookup(lookup(&[
                ("NEWSDESK_JWT_SECRET", "x"),
                ("NEWSDESK_BCRYPT_COST", cost),
            ]))
            .unwrap_err();
            assert!(
                matches!(err, ConfigError::Invalid { key: "NEWSDESK_BCRYPT_COST", .. }),
                "{cost}"
            );
        }
        let config = Config::from_lookup(lookup(&[
            ("NEWSDESK_JWT_SECRET", "x"),
            ("NEWSDESK_BCRYPT_COST", "12"),
        ]))
        .unwrap();
        assert_eq!(config.bcrypt_cost, 12);
    }

    #[test]
    fn cors_origins_are_split() {
        let config = Config::from_lookup(lookup(&[
            ("NEWSDESK_JWT_SECRET", "x"),
            ("NEWSDESK_CORS_ORIGINS", "http://a.test, http://b.test,"),
        ]))
        .unwrap();
        assert_eq!(config.cors_origins, vec!["http://a.test", "http://b.test"]);
    }
}
