use reqwest::StatusCode;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("send model request: {0}")]
    Request(reqwest::Error),

    #[error("model API returned {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("decode model response: {0}")]
    Decode(reqwest::Error),

    #[error("prompt blocked by the model: {0}")]
    Blocked(String),

    #[error("model returned no completion")]
    EmptyCompletion,
}
