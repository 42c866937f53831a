//! OAuth token refresh.

use pcs_protocol::constants::OAUTH_TOKEN_URL;
use pcs_protocol::{OAuthErrorBody, TokenResponse};
use tracing::{debug, warn};

use crate::client::{Error, USER_AGENT};

/// Credentials for a `grant_type=refresh_token` exchange.
#[derive(Debug, Clone)]
pub struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
    /// The application's API key.
    pub client_id: &'a str,
    /// The application's secret key.
    pub client_secret: &'a str,
    /// Space-separated scopes; `None` keeps the scopes of the previous grant.
    pub scope: Option<&'a str>,
}

/// Exchanges a refresh token for a new access token.
pub async fn refresh_access_token(request: &RefreshRequest<'_>) -> Result<TokenResponse, Error> {
    refresh_access_token_at(OAUTH_TOKEN_URL, request).await
}

/// Like [`refresh_access_token`], against another token endpoint.
pub async fn refresh_access_token_at(
    url: &str,
    request: &RefreshRequest<'_>,
) -> Result<TokenResponse, Error> {
    let mut form = vec![
        ("grant_type", "refresh_token"),
        ("refresh_token", request.refresh_token),
        ("client_id", request.client_id),
        ("client_secret", request.client_secret),
    ];
    if let Some(scope) = request.scope {
        form.push(("scope", scope));
    }

    let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
    let resp = http.post(url).form(&form).send().await?;
    let status = resp.status();
    let body = resp.bytes().await?;

    if !status.is_success() {
        return Err(match serde_json::from_slice::<OAuthErrorBody>(&body) {
            Ok(err) => {
                warn!(error = %err.error, "token refresh rejected");
                Error::OAuth {
                    error: err.error,
                    description: err.error_description,
                }
            }
            Err(_) => Error::Api {
                status: status.as_u16(),
                code: None,
                message: String::from_utf8_lossy(&body).into_owned(),
            },
        });
    }

    let token: TokenResponse = serde_json::from_slice(&body)?;
    debug!(expires_in = token.expires_in, "access token refreshed");
    Ok(token)
}
