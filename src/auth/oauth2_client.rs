// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! OAuth2 authorization-code client for the supported providers.
//!
//! ## Flow
//!
//! 1. [`OAuth2Client::authorize_url`] builds the provider consent URL,
//!    carrying a signed `state` value issued by the token service
//! 2. The provider redirects back with `code` and `state`
//! 3. [`OAuth2Client::exchange_code`] trades the code for a provider access token
//! 4. [`OAuth2Client::fetch_attributes`] loads the user-info attribute bag,
//!    which the reconciler maps onto a local identity

use std::collections::HashMap;
use std::time::Duration;

use reqwest::header::{ACCEPT, USER_AGENT};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use url::Url;

use super::oauth2::OAuth2Provider;
use crate::config::{OAuth2Settings, ProviderCredentials};

/// HTTP timeout for provider calls.
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// GitHub rejects API calls without a User-Agent.
const CLIENT_USER_AGENT: &str = concat!("portfolio-server/", env!("CARGO_PKG_VERSION"));

/// Endpoints and scopes of one provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEndpoints {
    pub authorize_url: String,
    pub token_url: String,
    pub user_info_url: String,
    /// Consulted for the primary address when user-info has no email (GitHub)
    pub emails_url: Option<String>,
    pub scopes: Vec<String>,
}

impl ProviderEndpoints {
    fn new(
        authorize_url: &str,
        token_url: &str,
        user_info_url: &str,
        emails_url: Option<&str>,
        scopes: &[&str],
    ) -> Self {
        Self {
            authorize_url: authorize_url.to_string(),
            token_url: token_url.to_string(),
            user_info_url: user_info_url.to_string(),
            emails_url: emails_url.map(str::to_string),
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Public endpoints of each provider.
pub fn endpoints(provider: OAuth2Provider) -> ProviderEndpoints {
    match provider {
        OAuth2Provider::Google => ProviderEndpoints::new(
            "https://accounts.google.com/o/oauth2/v2/auth",
            "https://oauth2.googleapis.com/token",
            "https://openidconnect.googleapis.com/v1/userinfo",
            None,
            &["openid", "email", "profile"],
        ),
        OAuth2Provider::Github => ProviderEndpoints::new(
            "https://github.com/login/oauth/authorize",
            "https://github.com/login/oauth/access_token",
            "https://api.github.com/user",
            Some("https://api.github.com/user/emails"),
            &["read:user", "user:email"],
        ),
        OAuth2Provider::Facebook => ProviderEndpoints::new(
            "https://www.facebook.com/v19.0/dialog/oauth",
            "https://graph.facebook.com/v19.0/oauth/access_token",
            "https://graph.facebook.com/v19.0/me?fields=id,name,email,picture",
            None,
            &["email", "public_profile"],
        ),
    }
}

#[derive(Debug, Error)]
pub enum OAuth2ClientError {
    #[error("OAuth2 provider '{0}' is not configured")]
    NotConfigured(OAuth2Provider),

    #[error("invalid URL: {0}")]
    Url(String),

    #[error("HTTP request to {provider} failed: {reason}")]
    Http {
        provider: OAuth2Provider,
        reason: String,
    },

    #[error("{provider} rejected the authorization code: {reason}")]
    TokenExchange {
        provider: OAuth2Provider,
        reason: String,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GithubEmail {
    email: String,
    #[serde(default)]
    primary: bool,
    #[serde(default)]
    verified: bool,
}

/// Authorization-code client shared by all providers.
pub struct OAuth2Client {
    http: reqwest::Client,
    settings: OAuth2Settings,
    overrides: HashMap<OAuth2Provider, ProviderEndpoints>,
}

impl OAuth2Client {
    pub fn new(settings: OAuth2Settings) -> Result<Self, OAuth2ClientError> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| OAuth2ClientError::Client(e.to_string()))?;
        Ok(Self {
            http,
            settings,
            overrides: HashMap::new(),
        })
    }

    /// Route one provider's calls to other endpoints (a local stand-in in tests).
    #[cfg(test)]
    pub(crate) fn with_endpoints(mut self, provider: OAuth2Provider, endpoints: ProviderEndpoints) -> Self {
        self.overrides.insert(provider, endpoints);
        self
    }

    fn endpoints(&self, provider: OAuth2Provider) -> ProviderEndpoints {
        self.overrides
            .get(&provider)
            .cloned()
            .unwrap_or_else(|| endpoints(provider))
    }

    pub fn settings(&self) -> &OAuth2Settings {
        &self.settings
    }

    /// Providers with client credentials configured.
    pub fn enabled_providers(&self) -> Vec<OAuth2Provider> {
        OAuth2Provider::ALL
            .into_iter()
            .filter(|p| self.settings.providers.contains_key(p))
            .collect()
    }

    fn credentials(&self, provider: OAuth2Provider) -> Result<&ProviderCredentials, OAuth2ClientError> {
        self.settings
            .providers
            .get(&provider)
            .ok_or(OAuth2ClientError::NotConfigured(provider))
    }

    /// Callback URL registered with the provider: `{base}/oauth2/callback/{id}`.
    pub fn redirect_uri(&self, provider: OAuth2Provider) -> Result<Url, OAuth2ClientError> {
        let mut url = self.settings.redirect_base_url.clone();
        url.path_segments_mut()
            .map_err(|_| OAuth2ClientError::Url("redirect base URL cannot have a path".to_string()))?
            .pop_if_empty()
            .extend(["oauth2", "callback", provider.registration_id()]);
        Ok(url)
    }

    /// Provider consent URL for the given signed state.
    pub fn authorize_url(&self, provider: OAuth2Provider, state: &str) -> Result<Url, OAuth2ClientError> {
        let credentials = self.credentials(provider)?;
        let endpoints = self.endpoints(provider);
        let redirect_uri = self.redirect_uri(provider)?;

        let mut url =
            Url::parse(&endpoints.authorize_url).map_err(|e| OAuth2ClientError::Url(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("client_id", &credentials.client_id)
            .append_pair("redirect_uri", redirect_uri.as_str())
            .append_pair("response_type", "code")
            .append_pair("scope", &endpoints.scopes.join(" "))
            .append_pair("state", state);
        Ok(url)
    }

    /// Exchange an authorization code for a provider access token.
    pub async fn exchange_code(&self, provider: OAuth2Provider, code: &str) -> Result<String, OAuth2ClientError> {
        let credentials = self.credentials(provider)?;
        let redirect_uri = self.redirect_uri(provider)?;
        let http_err = |e: reqwest::Error| OAuth2ClientError::Http {
            provider,
            reason: e.to_string(),
        };

        let response = self
            .http
            .post(self.endpoints(provider).token_url)
            .header(ACCEPT, "application/json")
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", redirect_uri.as_str()),
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(http_err)?;

        let status = response.status();
        let body: TokenResponse = response.json().await.map_err(http_err)?;

        match body.access_token {
            Some(token) if status.is_success() && !token.is_empty() => Ok(token),
            _ => Err(OAuth2ClientError::TokenExchange {
                provider,
                reason: body
                    .error_description
                    .or(body.error)
                    .unwrap_or_else(|| format!("HTTP {status}")),
            }),
        }
    }

    /// Fetch the user-info attribute bag for a provider access token.
    ///
    /// GitHub omits private emails from `/user`; the primary verified address
    /// from `/user/emails` is filled in when that happens.
    pub async fn fetch_attributes(
        &self,
        provider: OAuth2Provider,
        access_token: &str,
    ) -> Result<Map<String, Value>, OAuth2ClientError> {
        let endpoints = self.endpoints(provider);
        let mut attributes: Map<String, Value> =
            self.get_json(provider, &endpoints.user_info_url, access_token).await?;

        let has_email = attributes
            .get("email")
            .and_then(Value::as_str)
            .is_some_and(|e| !e.trim().is_empty());

        if let Some(emails_url) = endpoints.emails_url.as_deref().filter(|_| !has_email) {
            let emails: Vec<GithubEmail> = self.get_json(provider, emails_url, access_token).await?;
            if let Some(primary) = emails.into_iter().find(|e| e.primary && e.verified) {
                attributes.insert("email".to_string(), Value::String(primary.email));
            }
        }

        Ok(attributes)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        provider: OAuth2Provider,
        url: &str,
        access_token: &str,
    ) -> Result<T, OAuth2ClientError> {
        let http_err = |e: reqwest::Error| OAuth2ClientError::Http {
            provider,
            reason: e.to_string(),
        };

        let response = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .send()
            .await
            .map_err(http_err)?;

        if !response.status().is_success() {
            return Err(OAuth2ClientError::Http {
                provider,
                reason: format!("HTTP {} from {url}", response.status()),
            });
        }

        response.json().await.map_err(http_err)
    }
}
