//! Registry configuration.

use std::time::Duration;

use certreg_core::ActorId;

/// Default per-operation budget.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Default upper bound on document size (10 MiB).
pub const DEFAULT_MAX_DOCUMENT_BYTES: usize = 10 * 1024 * 1024;

/// Settings for a [`RegistryService`](crate::RegistryService).
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Immutable owner of the authorization set.
    pub owner: ActorId,
    /// Members granted at bootstrap.
    pub initial_issuers: Vec<ActorId>,
    /// Budget for [`RegistryService::default_deadline`].
    ///
    /// [`RegistryService::default_deadline`]: crate::RegistryService::default_deadline
    pub operation_timeout: Duration,
    pub max_document_bytes: usize,
}

impl RegistryConfig {
    pub fn new(owner: ActorId) -> Self {
        Self {
            owner,
            initial_issuers: Vec::new(),
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `CERTREG_OWNER` (required)
    /// - `CERTREG_ISSUERS` (comma-separated, default: none)
    /// - `CERTREG_OPERATION_TIMEOUT_MS` (default: 30000)
    /// - `CERTREG_MAX_DOCUMENT_BYTES` (default: 10485760)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`RegistryConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let owner = lookup("CERTREG_OWNER")
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::MissingOwner)?;
        let owner = parse_actor("CERTREG_OWNER", &owner)?;

        let initial_issuers = match lookup("CERTREG_ISSUERS") {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| parse_actor("CERTREG_ISSUERS", s))
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };

        let operation_timeout = match lookup("CERTREG_OPERATION_TIMEOUT_MS") {
            Some(raw) => Duration::from_millis(parse_number("CERTREG_OPERATION_TIMEOUT_MS", &raw)?),
            None => DEFAULT_OPERATION_TIMEOUT,
        };

        let max_document_bytes = match lookup("CERTREG_MAX_DOCUMENT_BYTES") {
            Some(raw) => {
                let n = parse_number("CERTREG_MAX_DOCUMENT_BYTES", &raw)?;
                usize::try_from(n).map_err(|_| {
                    ConfigError::InvalidNumber("CERTREG_MAX_DOCUMENT_BYTES".into(), raw)
                })?
            }
            None => DEFAULT_MAX_DOCUMENT_BYTES,
        };

        Ok(Self {
            owner,
            initial_issuers,
            operation_timeout,
            max_document_bytes,
        })
    }
}

fn parse_actor(var: &str, raw: &str) -> Result<ActorId, ConfigError> {
    ActorId::new(raw).map_err(|e| ConfigError::InvalidActor(var.to_string(), e.to_string()))
}

fn parse_number(var: &str, raw: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidNumber(var.to_string(), raw.to_string())),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("CERTREG_OWNER environment variable is required")]
    MissingOwner,
    #[error("invalid actor in {0}: {1}")]
    InvalidActor(String, String),
    #[error("invalid positive number for {0}: {1:?}")]
    InvalidNumber(String, String),
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
    fn owner_is_required() {
        assert!(matches!(
            RegistryConfig::from_lookup(lookup(&[])),
            Err(ConfigError::MissingOwner)
        ));
        assert!(matches!(
            RegistryConfig::from_lookup(lookup(&[("CERTREG_OWNER", "  ")])),
            Err(ConfigError::MissingOwner)
        ));
    }

    #[test]
    fn defaults_apply() {
        let cfg = RegistryConfig::from_lookup(lookup(&[("CERTREG_OWNER", "0xOwner")])).unwrap();
        assert_eq!(cfg.owner.as_str(), "0xowner");
        assert!(cfg.initial_issuers.is_empty());
        assert_eq!(cfg.operation_timeout, DEFAULT_OPERATION_TIMEOUT);
        assert_eq!(cfg.max_document_bytes, DEFAULT_MAX_DOCUMENT_BYTES);
    }

    #[test]
    fn issuers_and_limits_are_parsed() {
        let cfg = RegistryConfig::from_lookup(lookup(&[
            ("CERTREG_OWNER", "owner"),
            ("CERTREG_ISSUERS", "alice, bob,,Carol "),
            ("CERTREG_OPERATION_TIMEOUT_MS", "1500"),
            ("CERTREG_MAX_DOCUMENT_BYTES", "2048"),
        ]))
        .unwrap();
        let names: Vec<_> = cfg.initial_issuers.iter().map(|a| a.as_str()).collect();
        assert_eq!(names, ["alice", "bob", "carol"]);
        assert_eq!(cfg.operation_timeout, Duration::from_millis(1500));
        assert_eq!(cfg.max_document_bytes, 2048);
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(matches!(
            RegistryConfig::from_lookup(lookup(&[
                ("CERTREG_OWNER", "owner"),
                ("CERTREG_ISSUERS", "alice,bad actor"),
            ])),
            Err(ConfigError::InvalidActor(..))
        ));
        assert!(matches!(
            RegistryConfig::from_lookup(lookup(&[
                ("CERTREG_OWNER", "owner"),
                ("CERTREG_OPERATION_TIMEOUT_MS", "0"),
            ])),
            Err(ConfigError::InvalidNumber(..))
        ));
        assert!(matches!(
            RegistryConfig::from_lookup(lookup(&[
                ("CERTREG_OWNER", "owner"),
                ("CERTREG_MAX_DOCUMENT_BYTES", "ten"),
            ])),
            Err(ConfigError::InvalidNumber(..))
        ));
    }
}
