// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read from the environment once at startup into explicit
//! structs that the composition root in `main.rs` hands to each component.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Root directory for identities and portfolio content | unset (in-memory) |
//! | `JWT_SECRET` | HMAC signing secret (at least 32 bytes) | Required |
//! | `JWT_ISSUER` | `iss` claim of issued tokens | `portfolio-server` |
//! | `JWT_EXPIRATION_SECS` | Access token lifetime | `86400` |
//! | `PUBLIC_PATHS` | Extra comma-separated path patterns skipped by the auth filter | empty |
//! | `OAUTH2_REDIRECT_BASE_URL` | Public base URL used to build provider callbacks | `http://localhost:8080` |
//! | `OAUTH2_SUCCESS_REDIRECT` | Frontend URL receiving `?token=` or `?error=` | `http://localhost:3000/oauth2/redirect` |
//! | `OAUTH2_<PROVIDER>_CLIENT_ID` | OAuth2 client id (`GOOGLE`, `GITHUB`, `FACEBOOK`) | provider disabled |
//! | `OAUTH2_<PROVIDER>_CLIENT_SECRET` | OAuth2 client secret | provider disabled |
//! | `ADMIN_EMAIL` / `ADMIN_PASSWORD` | Seed a local admin identity at startup | unset |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM files enabling HTTPS | unset (plain HTTP) |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::auth::oauth2::OAuth2Provider;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Environment variable name for the identity store directory.
///
/// When unset, identities live in memory and are lost on restart.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const JWT_ISSUER_ENV: &str = "JWT_ISSUER";
pub const JWT_EXPIRATION_ENV: &str = "JWT_EXPIRATION_SECS";
pub const PUBLIC_PATHS_ENV: &str = "PUBLIC_PATHS";
pub const OAUTH2_REDIRECT_BASE_URL_ENV: &str = "OAUTH2_REDIRECT_BASE_URL";
pub const OAUTH2_SUCCESS_REDIRECT_ENV: &str = "OAUTH2_SUCCESS_REDIRECT";
pub const ADMIN_EMAIL_ENV: &str = "ADMIN_EMAIL";
pub const ADMIN_PASSWORD_ENV: &str = "ADMIN_PASSWORD";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_ISSUER: &str = "portfolio-server";
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 86_400;

/// HS256 keys shorter than the digest size weaken the MAC.
pub const MIN_SECRET_LEN: usize = 32;

/// Paths the authentication filter never inspects.
pub const DEFAULT_PUBLIC_PATHS: &[&str] = &[
    "/auth/login",
    "/auth/register",
    "/oauth2/**",
    "/static/**",
    "/docs/**",
    "/api-doc/**",
    "/health/**",
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Token and filter configuration.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    /// HMAC secret used to sign and verify tokens
    pub jwt_secret: String,
    /// `iss` claim written to and required on tokens
    pub issuer: String,
    /// Access token lifetime
    pub token_ttl: Duration,
    /// Path patterns skipped by the authentication filter
    pub public_paths: Vec<String>,
}

impl AuthSettings {
    /// Settings with the given secret and all other values defaulted.
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: secret.into(),
            issuer: DEFAULT_ISSUER.to_string(),
            token_ttl: Duration::from_secs(DEFAULT_TOKEN_TTL_SECS),
            public_paths: DEFAULT_PUBLIC_PATHS.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// Client credentials registered with one OAuth2 provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// OAuth2 login configuration.
#[derive(Debug, Clone)]
pub struct OAuth2Settings {
    /// Base URL providers redirect back to (`{base}/oauth2/callback/{provider}`)
    pub redirect_base_url: Url,
    /// Frontend page that receives the issued token or the error message
    pub success_redirect: Url,
    /// Enabled providers
    pub providers: HashMap<OAuth2Provider, ProviderCredentials>,
}

impl Default for OAuth2Settings {
    fn default() -> Self {
        Self {
            redirect_base_url: Url::parse("http://localhost:8080").expect("static url"),
            success_redirect: Url::parse("http://localhost:3000/oauth2/redirect")
                .expect("static url"),
            providers: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

/// Listener and process-level configuration.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub data_dir: Option<PathBuf>,
    /// `(certificate, private key)` PEM paths
    pub tls: Option<(PathBuf, PathBuf)>,
    pub log_format: LogFormat,
    /// `(email, password)` of a local admin to create if absent
    pub admin_seed: Option<(String, String)>,
}

/// Complete runtime configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub auth: AuthSettings,
    pub oauth2: OAuth2Settings,
}

impl Settings {
    /// Load settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        // Server
        let host = var(HOST_ENV).unwrap_or_else(|| "0.0.0.0".to_string());
        let port = match var(PORT_ENV) {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                var: PORT_ENV,
                reason: format!("'{raw}' is not a port number"),
            })?,
            None => 8080,
        };
        let tls = match (var(TLS_CERT_PATH_ENV), var(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some((PathBuf::from(cert), PathBuf::from(key))),
            (None, None) => None,
            _ => {
                return Err(ConfigError::Invalid {
                    var: TLS_CERT_PATH_ENV,
                    reason: format!("{TLS_CERT_PATH_ENV} and {TLS_KEY_PATH_ENV} must be set together"),
                })
            }
        };
        let log_format = match var(LOG_FORMAT_ENV).as_deref().map(str::to_lowercase).as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };
        let admin_seed = match (var(ADMIN_EMAIL_ENV), var(ADMIN_PASSWORD_ENV)) {
            (Some(email), Some(password)) => Some((email, password)),
            _ => None,
        };

        // Auth
        let jwt_secret = var(JWT_SECRET_ENV).ok_or(ConfigError::Missing(JWT_SECRET_ENV))?;
        if jwt_secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::Invalid {
                var: JWT_SECRET_ENV,
                reason: format!("must be at least {MIN_SECRET_LEN} bytes"),
            });
        }
        let token_ttl = match var(JWT_EXPIRATION_ENV) {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::Invalid {
                        var: JWT_EXPIRATION_ENV,
                        reason: "must be a positive number of seconds".to_string(),
                    })
                }
            },
            None => Duration::from_secs(DEFAULT_TOKEN_TTL_SECS),
        };
        let mut public_paths: Vec<String> =
            DEFAULT_PUBLIC_PATHS.iter().map(|p| p.to_string()).collect();
        if let Some(extra) = var(PUBLIC_PATHS_ENV) {
            public_paths.extend(
                extra
                    .split(',')
                    .map(str::trim)
                    .filter(|p| p.starts_with('/'))
                    .map(str::to_string),
            );
        }

        // OAuth2
        let defaults = OAuth2Settings::default();
        let redirect_base_url = parse_url(OAUTH2_REDIRECT_BASE_URL_ENV, var(OAUTH2_REDIRECT_BASE_URL_ENV))?
            .unwrap_or(defaults.redirect_base_url);
        let success_redirect = parse_url(OAUTH2_SUCCESS_REDIRECT_ENV, var(OAUTH2_SUCCESS_REDIRECT_ENV))?
            .unwrap_or(defaults.success_redirect);
        let mut providers = HashMap::new();
        for provider in OAuth2Provider::ALL {
            let prefix = format!("OAUTH2_{}", provider.registration_id().to_uppercase());
            let id = var(&format!("{prefix}_CLIENT_ID"));
            let secret = var(&format!("{prefix}_CLIENT_SECRET"));
            if let (Some(client_id), Some(client_secret)) = (id, secret) {
                providers.insert(
                    provider,
                    ProviderCredentials {
                        client_id,
                        client_secret,
                    },
                );
            }
        }

        Ok(Self {
            server: ServerSettings {
                host,
                port,
                data_dir: var(DATA_DIR_ENV).map(PathBuf::from),
                tls,
                log_format,
                admin_seed,
            },
            auth: AuthSettings {
                jwt_secret,
                issuer: var(JWT_ISSUER_ENV).unwrap_or_else(|| DEFAULT_ISSUER.to_string()),
                token_ttl,
                public_paths,
            },
            oauth2: OAuth2Settings {
                redirect_base_url,
                success_redirect,
                providers,
            },
        })
    }
}

fn parse_url(var: &'static str, raw: Option<String>) -> Result<Option<Url>, ConfigError> {
    raw.map(|raw| {
        Url::parse(raw.trim()).map_err(|e| ConfigError::Invalid {
            var,
            reason: e.to_string(),
        })
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn settings(vars: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_secret_is_set() {
        let settings = settings(&[(JWT_SECRET_ENV, SECRET)]).unwrap();
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.server.port, 8080);
        assert!(settings.server.data_dir.is_none());
        assert!(settings.server.tls.is_none());
        assert_eq!(settings.server.log_format, LogFormat::Pretty);
        assert_eq!(settings.auth.issuer, DEFAULT_ISSUER);
        assert_eq!(settings.auth.token_ttl, Duration::from_secs(DEFAULT_TOKEN_TTL_SECS));
        assert_eq!(settings.auth.public_paths.len(), DEFAULT_PUBLIC_PATHS.len());
        assert!(settings.oauth2.providers.is_empty());
    }

    #[test]
    fn missing_secret_is_an_error() {
        assert_eq!(settings(&[]).unwrap_err(), ConfigError::Missing(JWT_SECRET_ENV));
    }

    #[test]
    fn short_secret_is_rejected() {
        let err = settings(&[(JWT_SECRET_ENV, "short")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: JWT_SECRET_ENV, .. }));
    }

    #[test]
    fn zero_expiration_is_rejected() {
        let err = settings(&[(JWT_SECRET_ENV, SECRET), (JWT_EXPIRATION_ENV, "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: JWT_EXPIRATION_ENV, .. }));
    }

    #[test]
    fn provider_enabled_only_with_both_credentials() {
        let settings = settings(&[
            (JWT_SECRET_ENV, SECRET),
            ("OAUTH2_GITHUB_CLIENT_ID", "gh-id"),
            ("OAUTH2_GITHUB_CLIENT_SECRET", "gh-secret"),
            ("OAUTH2_GOOGLE_CLIENT_ID", "only-id"),
        ])
        .unwrap();

        assert_eq!(settings.oauth2.providers.len(), 1);
        assert_eq!(
            settings.oauth2.providers[&OAuth2Provider::Github].client_id,
            "gh-id"
        );
    }

    #[test]
    fn extra_public_paths_are_appended() {
        let settings = settings(&[
            (JWT_SECRET_ENV, SECRET),
            (PUBLIC_PATHS_ENV, "/favicon.ico, not-a-path ,/assets/**"),
        ])
        .unwrap();
        let paths = &settings.auth.public_paths;
        assert!(paths.contains(&"/favicon.ico".to_string()));
        assert!(paths.contains(&"/assets/**".to_string()));
        assert!(!paths.iter().any(|p| p == "not-a-path"));
    }

    #[test]
    fn tls_paths_must_come_in_pairs() {
        let err = settings(&[(JWT_SECRET_ENV, SECRET), (TLS_CERT_PATH_ENV, "/tls/cert.pem")])
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: TLS_CERT_PATH_ENV, .. }));
    }
}
