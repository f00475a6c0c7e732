use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("invalid endpoint url: {0}")]
    Url(#[from] url::ParseError),
    #[error("server returned {status} for {endpoint}")]
    Status { status: u16, endpoint: String },
    #[error("invalid data format: {0}")]
    InvalidData(String),
    #[error("authentication required")]
    AuthRequired,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("storage quota exceeded: {needed} bytes needed, {limit} allowed")]
    QuotaExceeded { needed: usize, limit: usize },
    #[error("storage lock poisoned")]
    Poisoned,
}

#[derive(Debug, Error)]
pub enum LibbyError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("sign in required")]
    SignInRequired,
    #[error("select at least {required} interests ({selected} selected)")]
    NotEnoughInterests { selected: usize, required: usize },
    #[error("configuration error: {0}")]
    Config(String),
}

impl LibbyError {
    /// Whether the view should redirect to the sign-in screen instead of
    /// showing an inline message.
    pub fn requires_sign_in(&self) -> bool {
        matches!(
            self,
            LibbyError::SignInRequired | LibbyError::Api(ApiError::AuthRequired)
        )
    }
}

pub type LibbyResult<T> = Result<T, LibbyError>;
