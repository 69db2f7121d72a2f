use std::num::ParseIntError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid value {value:?} for {key}: {source}")]
    InvalidConfigValue {
        key: &'static str,
        value: String,
        #[source]
        source: ParseIntError,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_value_message_names_key_and_value() {
        let source = "abc".parse::<u16>().unwrap_err();
        let err = AppError::InvalidConfigValue {
            key: "PORT",
            value: "abc".to_string(),
            source,
        };
        let msg = err.to_string();
        assert!(msg.contains("PORT"));
        assert!(msg.contains("\"abc\""));
    }
}
