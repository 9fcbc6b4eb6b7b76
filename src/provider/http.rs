use crate::error::{CountError, Result};
use serde::de::DeserializeOwned;

const USER_AGENT: &str = concat!("gitcount/", env!("CARGO_PKG_VERSION"));

/// How a platform expects the access token to be presented.
pub enum Auth {
    /// HTTP Basic with username + app password (Bitbucket).
    Basic { username: String, token: String },
    /// `Private-Token` header (GitLab).
    PrivateToken(String),
}

/// Thin GET-and-decode wrapper shared by the adapters. Non-2xx responses
/// become `Api` errors; undecodable bodies become `MalformedResponse` so the
/// adapters can downgrade them to an empty terminal page.
pub struct ApiClient {
    http: reqwest::Client,
    auth: Auth,
}

impl ApiClient {
    pub fn new(auth: Auth) -> Self {
        Self {
            http: reqwest::Client::new(),
            auth,
        }
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(String, String)],
    ) -> Result<T> {
        let mut request = self
            .http
            .get(url)
            .query(query)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(reqwest::header::ACCEPT, "application/json");

        request = match &self.auth {
            Auth::Basic { username, token } => request.basic_auth(username, Some(token)),
            Auth::PrivateToken(token) => request.header("Private-Token", token),
        };

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CountError::Api {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| CountError::MalformedResponse(format!("{url}: {e}")))
    }
}
