pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Malformed markup: {message}")]
    MalformedMarkup { message: String },

    #[error("Invalid option JSON: {0}")]
    Json(#[from] serde_json::Error),
}
