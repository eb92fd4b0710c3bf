//! OAuth2 client-credentials token exchange.

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::BillingError;

/// Exchanges an app registration's credentials for a bearer token.
#[derive(Debug, Clone)]
pub struct TokenProvider {
    login_endpoint: String,
    tenant_id: String,
    client_id: String,
    client_secret: String,
    scope: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl TokenProvider {
    /// `audience` is the resource the token is requested for, e.g.
    /// `https://management.azure.com`; the `/.default` scope is derived from it.
    pub fn new(
        login_endpoint: impl Into<String>,
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        audience: &str,
    ) -> Self {
        Self {
            login_endpoint: login_endpoint.into(),
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            scope: format!("{}/.default", audience.trim_end_matches('/')),
        }
    }

    pub fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.login_endpoint.trim_end_matches('/'),
            self.tenant_id
        )
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Request a fresh token. A rejected exchange is reported with the
    /// identity provider's response body.
    pub async fn acquire(&self, http: &Client) -> Result<String, BillingError> {
        let url = self.token_url();
        debug!(%url, client_id = %self.client_id, "requesting access token");

        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("scope", self.scope.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        let response = http.post(&url).form(&form).send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(BillingError::Token {
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            BillingError::MalformedResponse(format!("token response: {}", e))
        })?;
        Ok(token.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_url_and_scope() {
        let provider = TokenProvider::new(
            "https://login.microsoftonline.com/",
            "tenant-123",
            "client",
            "secret",
            "https://management.azure.com/",
        );
        assert_eq!(
            provider.token_url(),
            "https://login.microsoftonline.com/tenant-123/oauth2/v2.0/token"
        );
        assert_eq!(provider.scope(), "https://management.azure.com/.default");
    }
}
