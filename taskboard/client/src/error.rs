use serde::Deserialize;

/// Errors returned by the HTTP clients.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The server answered with a non-success status.
    #[error("Server responded with {status}")]
    Api {
        status: u16,
        /// The `message` field of the error body, if the server sent one.
        message: Option<String>,
    },
    /// The request never produced a usable response.
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ClientError {
    /// Returns the human readable message the server attached to the failure.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ClientError::Api {
                message: Some(message),
                ..
            } => Some(message),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Transport(err) => err.status().map(|status| status.as_u16()),
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Turns a non-success response into a [`ClientError::Api`].
pub(crate) async fn api_error(response: reqwest::Response) -> ClientError {
    let status = response.status().as_u16();
    let message = response
        .json::<ErrorBody>()
        .await
        .ok()
        .map(|body| body.message)
        .filter(|message| !message.trim().is_empty());
    tracing::debug!(status, ?message, "Request rejected by server");
    ClientError::Api { status, message }
}
