//! Server configuration.

use std::path::PathBuf;

use axum::http::HeaderValue;
use certreg_core::ActorId;
use certreg_ledger::DEFAULT_NAMESPACE;

use crate::auth::ApiToken;

/// Process-level settings for the HTTP server.
///
/// Registry and content-store settings are loaded separately by
/// [`certreg_registry::RegistryConfig`] and
/// [`certreg_store::HttpStoreConfig`].
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// Bearer secrets and the actor each one authenticates.
    pub tokens: Vec<ApiToken>,
    /// Root directory for the filesystem content store.
    pub store_dir: Option<PathBuf>,
    pub database_url: Option<DatabaseUrl>,
    pub ledger_namespace: String,
    /// Browser origins allowed to call the API.
    pub cors_origins: CorsOrigins,
}

/// Cross-origin policy for browser clients.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CorsOrigins {
    /// No CORS headers are sent.
    #[default]
    Disabled,
    /// Any origin, without credentials.
    Any,
    /// Exactly these origins, with credentials.
    List(Vec<HeaderValue>),
}

/// Database URL, redacted in `Debug` since it usually embeds a password.
#[derive(Clone)]
pub struct DatabaseUrl(String);

impl DatabaseUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for DatabaseUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DatabaseUrl([REDACTED])")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            tokens: Vec::new(),
            store_dir: None,
            database_url: None,
            ledger_namespace: DEFAULT_NAMESPACE.to_string(),
            cors_origins: CorsOrigins::Disabled,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `PORT` (default: 8080)
    /// - `CERTREG_API_TOKENS` as `actor=secret,actor=secret`
    /// - `CERTREG_STORE_DIR`
    /// - `DATABASE_URL`
    /// - `CERTREG_LEDGER_NAMESPACE` (default: `certreg`)
    /// - `CERTREG_CORS_ORIGINS` as `*` or `https://a.example,http://localhost:3000`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(raw.clone()))?,
            None => defaults.port,
        };

        let tokens = match lookup("CERTREG_API_TOKENS") {
            Some(raw) => parse_tokens(&raw)?,
            None => Vec::new(),
        };

        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let cors_origins = match non_empty("CERTREG_CORS_ORIGINS") {
            Some(raw) => parse_cors_origins(&raw)?,
            None => CorsOrigins::Disabled,
        };

        Ok(Self {
            port,
            tokens,
            store_dir: non_empty("CERTREG_STORE_DIR").map(PathBuf::from),
            database_url: non_empty("DATABASE_URL").map(DatabaseUrl),
            ledger_namespace: non_empty("CERTREG_LEDGER_NAMESPACE")
                .map(|s| s.trim().to_string())
                .unwrap_or(defaults.ledger_namespace),
            cors_origins,
        })
    }
}

fn parse_tokens(raw: &str) -> Result<Vec<ApiToken>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (actor, secret) = entry
                .split_once('=')
                .ok_or_else(|| ConfigError::InvalidToken("expected actor=secret".into()))?;
            let actor = ActorId::new(actor).map_err(|e| ConfigError::InvalidToken(e.to_string()))?;
            if secret.trim().is_empty() {
                return Err(ConfigError::InvalidToken(format!("empty secret for {actor}")));
            }
            Ok(ApiToken::new(actor, secret.trim()))
        })
        .collect()
}

fn parse_cors_origins(raw: &str) -> Result<CorsOrigins, ConfigError> {
    if raw.trim() == "*" {
        return Ok(CorsOrigins::Any);
    }
    let origins = raw
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(|origin| {
            let scheme_ok = origin.starts_with("http://") || origin.starts_with("https://");
            if !scheme_ok || origin.ends_with('/') {
                return Err(ConfigError::InvalidCorsOrigin(origin.to_string()));
            }
            HeaderValue::from_str(origin)
                .map_err(|_| ConfigError::InvalidCorsOrigin(origin.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    if origins.is_empty() {
        return Ok(CorsOrigins::Disabled);
    }
    Ok(CorsOrigins::List(origins))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid PORT: {0:?}")]
    InvalidPort(String),
    #[error("invalid CERTREG_API_TOKENS entry: {0}")]
    InvalidToken(String),
    #[error("invalid CERTREG_CORS_ORIGINS entry: {0:?}")]
    InvalidCorsOrigin(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let cfg = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.port, 8080);
        assert!(cfg.tokens.is_empty());
        assert!(cfg.store_dir.is_none());
        assert!(cfg.database_url.is_none());
        assert_eq!(cfg.ledger_namespace, "certreg");
        assert_eq!(cfg.cors_origins, CorsOrigins::Disabled);
    }

    #[test]
    fn cors_origins_are_parsed() {
        let cfg = AppConfig::from_lookup(lookup(&[(
            "CERTREG_CORS_ORIGINS",
            "http://localhost:3000, https://certs.example.org",
        )]))
        .unwrap();
        assert_eq!(
            cfg.cors_origins,
            CorsOrigins::List(vec![
                HeaderValue::from_static("http://localhost:3000"),
                HeaderValue::from_static("https://certs.example.org"),
            ])
        );

        let cfg = AppConfig::from_lookup(lookup(&[("CERTREG_CORS_ORIGINS", " * ")])).unwrap();
        assert_eq!(cfg.cors_origins, CorsOrigins::Any);

        for bad in ["localhost:3000", "https://certs.example.org/"] {
            assert!(matches!(
                AppConfig::from_lookup(lookup(&[("CERTREG_CORS_ORIGINS", bad)])),
                Err(ConfigError::InvalidCorsOrigin(_))
            ));
        }
    }

    #[test]
    fn tokens_are_parsed() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("PORT", "9090"),
            ("CERTREG_API_TOKENS", "Owner=s3cret, alice=hunter2,"),
            ("CERTREG_STORE_DIR", "/var/lib/certreg"),
        ]))
        .unwrap();
        assert_eq!(cfg.port, 9090);
        let actors: Vec<_> = cfg.tokens.iter().map(|t| t.actor().as_str()).collect();
        assert_eq!(actors, ["owner", "alice"]);
        assert_eq!(cfg.store_dir, Some(PathBuf::from("/var/lib/certreg")));
    }

    #[test]
    fn malformed_values_are_rejected() {
        assert!(matches!(
            AppConfig::from_lookup(lookup(&[("PORT", "eighty")])),
            Err(ConfigError::InvalidPort(_))
        ));
        assert!(matches!(
            AppConfig::from_lookup(lookup(&[("CERTREG_API_TOKENS", "alice")])),
            Err(ConfigError::InvalidToken(_))
        ));
        assert!(matches!(
            AppConfig::from_lookup(lookup(&[("CERTREG_API_TOKENS", "alice=")])),
            Err(ConfigError::InvalidToken(_))
        ));
    }

    #[test]
    fn secrets_are_redacted_in_debug() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("CERTREG_API_TOKENS", "alice=hunter2"),
            ("DATABASE_URL", "postgres://certreg:pw@localhost/certreg"),
        ]))
        .unwrap();
        let debug = format!("{cfg:?}");
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("pw@"));
    }
}
