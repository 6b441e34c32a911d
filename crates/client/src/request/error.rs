use thiserror::Error;

#[derive(Error, Debug)]
pub enum RequestError {
    #[error("request body and mime fields are mutually exclusive")]
    PayloadConflict,

    #[error("unsupported http method: {method}")]
    UnsupportedMethod { method: String },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },
}

impl RequestError {
    pub fn unsupported_method<S: ToString>(method: S) -> Self {
        Self::UnsupportedMethod { method: method.to_string() }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }
}
