//! Connection settings read from the environment.

use crate::DbError;

pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub database_url: String,
    pub max_connections: u32,
}

impl DbConfig {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }

    /// Read `DATABASE_URL` (required) and `DB_MAX_CONNECTIONS` (optional).
    pub fn from_env() -> Result<Self, DbError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, DbError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| DbError::Config("DATABASE_URL is not set".into()))?;

        let max_connections = match lookup("DB_MAX_CONNECTIONS") {
            Some(raw) => raw.trim().parse::<u32>().map_err(|e| {
                DbError::Config(format!("DB_MAX_CONNECTIONS must be a positive integer: {e}"))
            })?,
            None => DEFAULT_MAX_CONNECTIONS,
        };
        if max_connections == 0 {
            return Err(DbError::Config("DB_MAX_CONNECTIONS must be at least 1".into()));
        }

        Ok(Self { database_url, max_connections })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn reads_url_and_defaults_pool_size() {
        let config = DbConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/app")])).unwrap();
        assert_eq!(config, DbConfig::new("postgres://localhost/app"));
        assert_eq!(config.max_connections, 5);
    }

    #[test]
    fn reads_pool_size() {
        let config = DbConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/app"),
            ("DB_MAX_CONNECTIONS", "12"),
        ]))
        .unwrap();
        assert_eq!(config.max_connections, 12);
    }

    #[test]
    fn missing_url_is_an_error() {
        let err = DbConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, DbError::Config(_)));
    }

    #[test]
    fn bad_pool_size_is_an_error() {
        for bad in ["zero", "0", "-3"] {
            let err = DbConfig::from_lookup(lookup(&[
                ("DATABASE_URL", "postgres://localhost/app"),
                ("DB_MAX_CONNECTIONS", bad),
            ]))
            .unwrap_err();
            assert!(matches!(err, DbError::Config(_)), "{bad}");
        }
    }
}
