use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::api::{HttpTaskApi, send_json};
use crate::error::ClientError;
use crate::model::UserProfile;

/// A token and the account it was issued for.
#[derive(Debug, Clone, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: UserProfile,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Registration and login against the public auth routes.
#[derive(Clone)]
pub struct AuthClient {
    client: Client,
    base_url: String,
}

impl AuthClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    #[tracing::instrument(skip(self, password))]
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Session, ClientError> {
        let request = self
            .client
            .post(format!("{}/auth/register", self.base_url))
            .json(&RegisterRequest {
                name,
                email,
                password,
            });
        send_json(request).await
    }

    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, ClientError> {
        let request = self
            .client
            .post(format!("{}/auth/login", self.base_url))
            .json(&LoginRequest { email, password });
        send_json(request).await
    }

    /// Builds a task client that reuses this client's connection pool.
    pub fn task_api(&self, session: &Session) -> HttpTaskApi {
        HttpTaskApi::with_client(
            self.client.clone(),
            self.base_url.clone(),
            session.token.clone(),
        )
    }
}
