//! Infrastructure implementation of the `CoordinationService` port against
//! the GitHub REST API.

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::application::ports::CoordinationService;
use crate::domain::{RegistrationToken, RepositoryTarget, TokenKind};
use crate::infra::SystemHost;

#[derive(Deserialize)]
struct TokenResponse {
    token: String,
}

impl CoordinationService for SystemHost {
    async fn issue_token(
        &self,
        target: &RepositoryTarget,
        kind: TokenKind,
    ) -> Result<RegistrationToken> {
        let Some(api_token) = self.api_token.clone() else {
            anyhow::bail!("no API token available; pass --token or set GITHUB_TOKEN");
        };
        let endpoint = target.token_endpoint(&self.api_base_url, kind);
        let agent = self.http.clone();
        let target = target.clone();
        tokio::task::spawn_blocking(move || request_token(&agent, &endpoint, &api_token, &target))
            .await
            .context("token request task panicked")?
    }
}

fn request_token(
    agent: &ureq::Agent,
    endpoint: &str,
    api_token: &str,
    target: &RepositoryTarget,
) -> Result<RegistrationToken> {
    tracing::debug!(%endpoint, "requesting runner token");
    let response = agent
        .post(endpoint)
        .set("Authorization", &format!("Bearer {api_token}"))
        .set("Accept", "application/vnd.github+json")
        .set("X-GitHub-Api-Version", "2022-11-28")
        .call()
        .map_err(|e| match e {
            ureq::Error::Status(code, _) => anyhow::anyhow!(describe_status(code, target)),
            ureq::Error::Transport(t) => anyhow::anyhow!("transport error: {t}"),
        })?;
    let body = response.into_string().context("reading token response")?;
    let parsed: TokenResponse =
        serde_json::from_str(&body).context("parsing token response")?;
    RegistrationToken::new(&parsed.token)
        .ok_or_else(|| anyhow::anyhow!("token response contained an empty token"))
}

fn describe_status(code: u16, target: &RepositoryTarget) -> String {
    match code {
        401 => "API token was rejected (HTTP 401)".to_string(),
        403 => format!("API token lacks admin access to {target} (HTTP 403)"),
        404 => format!("{target} was not found or is not visible to the API token (HTTP 404)"),
        _ => format!("token request for {target} failed with HTTP {code}"),
    }
}
