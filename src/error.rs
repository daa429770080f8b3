use crate::media::MediaError;
use crate::remote::RemoteError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    RateLimit(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Failed: {0}")]
    Persist(String),

    #[error("Login failed: {0}")]
    Login(String),

    #[error("Sign in required")]
    AuthRequired,

    #[error("Not found")]
    NotFound,

    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),
}

impl ClientError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// A failed row mutation.
    pub fn persist(err: RemoteError) -> Self {
        tracing::warn!("Mutation failed: {}", err);
        Self::Persist(err.to_string())
    }

    /// A failed storage write.
    pub fn upload(err: RemoteError) -> Self {
        tracing::warn!("Upload failed: {}", err);
        Self::Upload(err.to_string())
    }

    /// The transient message shown to the user for this failure.
    pub fn notice(&self) -> String {
        match self {
            ClientError::Validation(msg)
            | ClientError::RateLimit(msg)
            | ClientError::Conflict(msg) => msg.clone(),
            ClientError::Upload(_) | ClientError::Persist(_) | ClientError::Login(_) => {
                self.to_string()
            }
            ClientError::AuthRequired => "Sign in to continue".to_string(),
            ClientError::NotFound => "Not found".to_string(),
            ClientError::Remote(e) => {
                tracing::error!("Remote error: {}", e);
                "Something went wrong. Please try again.".to_string()
            }
        }
    }
}

impl From<MediaError> for ClientError {
    fn from(err: MediaError) -> Self {
        tracing::warn!("{}", err);
        ClientError::Upload(err.to_string())
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
