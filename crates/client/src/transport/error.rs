use thiserror::Error;

/// A transport refused a configuration call.
#[derive(Error, Debug)]
pub enum OptionError {
    #[error("unsupported option: {option}")]
    Unsupported { option: &'static str },

    #[error("invalid value for {option}: {reason}")]
    InvalidValue { option: &'static str, reason: String },
}

impl OptionError {
    pub fn unsupported(option: &'static str) -> Self {
        Self::Unsupported { option }
    }

    pub fn invalid_value<S: ToString>(option: &'static str, reason: S) -> Self {
        Self::InvalidValue { option, reason: reason.to_string() }
    }
}
