use std::path::PathBuf;
use std::str::FromStr;

use printdesk_core::roles::RoleAllowList;

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// JWT validation settings.
    pub jwt: JwtConfig,
    /// Root of the solicitation file tree.
    pub files_base_dir: PathBuf,
    /// Staff roles from `ADMIN_REGISTRATIONS` and `MANAGER_REGISTRATIONS`.
    pub roles: RoleAllowList,
    /// Hours a concluded solicitation keeps its files (default: `72`).
    pub retention_hours: i64,
    /// Seconds between stale sweeps (default: `3600`).
    pub sweep_interval_secs: u64,
    /// Largest accepted request body, in bytes (default: 50 MiB).
    pub max_upload_bytes: usize,
}

fn parse_var<T: FromStr>(name: &str, default: &str) -> T {
    std::env::var(name)
        .unwrap_or_else(|_| default.into())
        .parse()
        .unwrap_or_else(|_| panic!("{name} must be a valid {}", std::any::type_name::<T>()))
}

/// Split a comma-separated list, dropping blanks.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                  |
    /// |-------------------------|--------------------------|
    /// | `HOST`                  | `0.0.0.0`                |
    /// | `PORT`                  | `3000`                   |
    /// | `CORS_ORIGINS`          | `http://localhost:5173`  |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`                     |
    /// | `FILES_BASE_DIR`        | `storage/solicitations`  |
    /// | `ADMIN_REGISTRATIONS`   | empty                    |
    /// | `MANAGER_REGISTRATIONS` | empty                    |
    /// | `RETENTION_HOURS`       | `72`                     |
    /// | `SWEEP_INTERVAL_SECS`   | `3600`                   |
    /// | `MAX_UPLOAD_BYTES`      | `52428800`               |
    ///
    /// # Panics
    ///
    /// Panics on unparsable numbers and when `JWT_SECRET` is missing.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: parse_var("PORT", "3000"),
            cors_origins: split_list(
                &std::env::var("CORS_ORIGINS").unwrap_or_else(|_| "http://localhost:5173".into()),
            ),
            request_timeout_secs: parse_var("REQUEST_TIMEOUT_SECS", "30"),
            jwt: JwtConfig::from_env(),
            files_base_dir: std::env::var("FILES_BASE_DIR")
                .unwrap_or_else(|_| "storage/solicitations".into())
                .into(),
            roles: RoleAllowList::from_csv(
                &std::env::var("ADMIN_REGISTRATIONS").unwrap_or_default(),
                &std::env::var("MANAGER_REGISTRATIONS").unwrap_or_default(),
            ),
            retention_hours: parse_var("RETENTION_HOURS", "72"),
            sweep_interval_secs: parse_var("SWEEP_INTERVAL_SECS", "3600"),
            max_upload_bytes: parse_var("MAX_UPLOAD_BYTES", "52428800"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_list_trims_and_drops_blanks() {
        assert_eq!(split_list(" 1, 2 ,,3 "), vec!["1", "2", "3"]);
        assert!(split_list("").is_empty());
    }
}
