use jsonwebtoken::encode;
use uuid::Uuid;

use crate::config::Config;

pub mod api;

/// Represents the currently authenticated user.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
}

impl CurrentUser {
    /// Creates a new CurrentUser instance.
    pub fn new(id: Uuid, email: String) -> Self {
        Self { id, email }
    }
}

/// Authentication state containing the JWT secret and token lifetime.
#[derive(Clone)]
pub struct AuthState {
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
}

impl AuthState {
    /// Creates a new AuthState from the application config.
    pub fn from_config(config: &Config) -> Self {
        Self {
            jwt_secret: config.jwt_secret.clone(),
            jwt_ttl_hours: config.jwt_ttl_hours,
        }
    }

    /// Issues a token for the given user using this state's secret and lifetime.
    pub async fn issue_token(&self, user_id: Uuid, email: &str) -> Result<String, AuthError> {
        encode_jwt(
            user_id,
            email.to_string(),
            &self.jwt_secret,
            chrono::Duration::hours(self.jwt_ttl_hours),
        )
        .await
        .map_err(|_| AuthError::JwtError)
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug)]
pub struct Claims {
    pub sub: String,   // ID of the authenticated user
    pub email: String, // Email of the authenticated user
    pub iat: usize,    // Issued at time of the token
    pub exp: usize,    // Expiry time of the token
}

/// Custom error type for authentication operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Represents an error during JWT operations.
    #[error("JWT operation failed")]
    JwtError,
    /// The token is valid but its subject is not a user ID.
    #[error("Token subject is not a valid user ID")]
    InvalidSubject,
}

pub async fn encode_jwt(
    user_id: Uuid,
    email: String,
    jwt_secret: &str,
    ttl: chrono::Duration,
) -> anyhow::Result<String> {
    let now = chrono::Utc::now();
    let exp = (now + ttl).timestamp().max(0) as usize;
    let iat = now.timestamp().max(0) as usize;
    let claims = Claims {
        sub: user_id.to_string(),
        email,
        iat,
        exp,
    };
    let jwt = encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(jwt_secret.as_bytes()),
    )?;
    Ok(jwt)
}

pub async fn decode_jwt(token: &str, jwt_secret: &str) -> anyhow::Result<Claims> {
    let token_data = jsonwebtoken::decode(
        token,
        &jsonwebtoken::DecodingKey::from_secret(jwt_secret.as_bytes()),
        &jsonwebtoken::Validation::default(),
    )?;
    Ok(token_data.claims)
}

/// Resolves a bearer token to the user it was issued for.
pub async fn resolve_current_user(token: &str, jwt_secret: &str) -> Result<CurrentUser, AuthError> {
    let claims = decode_jwt(token, jwt_secret)
        .await
        .map_err(|_| AuthError::JwtError)?;
    let id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidSubject)?;
    Ok(CurrentUser::new(id, claims.email))
}
