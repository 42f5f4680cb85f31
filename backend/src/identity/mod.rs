pub mod dto;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, Response, Url};
use serde::Serialize;
use tracing::info;

use crate::config::FirebaseConfig;
use crate::error::AppError;

const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const SECURE_TOKEN_URL: &str = "https://securetoken.googleapis.com/v1/token";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub uid: Option<String>,
    pub id_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub anonymous: bool,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Signs in with the custom token when one is given, anonymously otherwise.
    async fn establish_session(&self, token: Option<&str>) -> Result<Session, AppError>;
    async fn refresh(&self, session: &Session) -> Result<Session, AppError>;
}

pub struct FirebaseIdentity {
    client: Client,
    api_key: String,
}

impl FirebaseIdentity {
    pub fn new(config: &FirebaseConfig) -> Result<Self, AppError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AppError::Unavailable("Firebase API key is not set".to_string()))?;
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::Identity(format!("Failed to build http client: {}", e)))?;
        Ok(Self { client, api_key })
    }

    fn url(&self, base: &str) -> Result<Url, AppError> {
        let mut url = Url::parse(base)
            .map_err(|e| AppError::Identity(format!("Invalid identity url {}: {}", base, e)))?;
        url.query_pairs_mut().append_pair("key", &self.api_key);
        Ok(url)
    }

    async fn post<B: Serialize + Sync>(&self, url: Url, body: &B) -> Result<Response, AppError> {
        let response = self.client.post(url).json(body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<dto::GoogleErrorResponse>(&body)
                .map(|e| format!("{} {}", e.error.code, e.error.message))
                .unwrap_or(body);
            return Err(AppError::Identity(format!("Identity API error {}: {}", status, message)));
        }

        Ok(response)
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentity {
    async fn establish_session(&self, token: Option<&str>) -> Result<Session, AppError> {
        let response = match token {
            Some(token) => {
                info!("Signing in with custom token");
                let url = self.url(&format!("{}/accounts:signInWithCustomToken", IDENTITY_TOOLKIT_URL))?;
                let body = dto::CustomTokenRequest {
                    token,
                    return_secure_token: true,
                };
                self.post(url, &body).await?
            }
            None => {
                info!("Signing in anonymously");
                let url = self.url(&format!("{}/accounts:signUp", IDENTITY_TOOLKIT_URL))?;
                let body = dto::SignUpRequest {
                    return_secure_token: true,
                };
                self.post(url, &body).await?
            }
        };

        let signed_in: dto::SignInResponse = response.json().await?;
        Ok(Session {
            uid: signed_in.local_id,
            id_token: signed_in.id_token,
            refresh_token: signed_in.refresh_token,
            expires_at: expiry_from(&signed_in.expires_in),
            anonymous: token.is_none(),
        })
    }

    async fn refresh(&self, session: &Session) -> Result<Session, AppError> {
        let url = self.url(SECURE_TOKEN_URL)?;
        let body = dto::RefreshRequest {
            grant_type: "refresh_token",
            refresh_token: &session.refresh_token,
        };
        let refreshed: dto::RefreshResponse = self.post(url, &body).await?.json().await?;

        Ok(Session {
            uid: refreshed.user_id.or_else(|| session.uid.clone()),
            id_token: refreshed.id_token,
            refresh_token: refreshed.refresh_token,
            expires_at: expiry_from(&refreshed.expires_in),
            anonymous: session.anonymous,
        })
    }
}

/// Stand-in used when no Firebase credentials are configured.
pub struct DisconnectedIdentity;

#[async_trait]
impl IdentityProvider for DisconnectedIdentity {
    async fn establish_session(&self, _token: Option<&str>) -> Result<Session, AppError> {
        Err(AppError::Unavailable("Firebase keys missing".to_string()))
    }

    async fn refresh(&self, _session: &Session) -> Result<Session, AppError> {
        Err(AppError::Unavailable("Firebase keys missing".to_string()))
    }
}

fn expiry_from(expires_in: &str) -> DateTime<Utc> {
    let secs = expires_in.trim().parse::<i64>().unwrap_or(3600);
    Utc::now() + Duration::seconds(secs)
}
