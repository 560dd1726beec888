use std::fmt;

#[derive(Debug)]
pub enum EditorError {
    Config(String),
    Io(String),
    InvalidQuantization(String),
    InvalidTimeSignature(String),
    InvalidTempo(String),
}

impl fmt::Display for EditorError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EditorError::Config(msg) => write!(f, "Config error: {}", msg),
            EditorError::Io(msg) => write!(f, "I/O error: {}", msg),
            EditorError::InvalidQuantization(msg) => write!(f, "Invalid quantization: {}", msg),
            EditorError::InvalidTimeSignature(msg) => {
                write!(f, "Invalid time signature: {}", msg)
            }
            EditorError::InvalidTempo(msg) => write!(f, "Invalid tempo: {}", msg),
        }
    }
}

impl std::error::Error for EditorError {}

pub type Result<T> = std::result::Result<T, EditorError>;

// Conversion helpers
impl From<std::io::Error> for EditorError {
    fn from(err: std::io::Error) -> Self {
        EditorError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for EditorError {
    fn from(err: serde_json::Error) -> Self {
        EditorError::Config(err.to_string())
    }
}

impl From<anyhow::Error> for EditorError {
    fn from(err: anyhow::Error) -> Self {
        EditorError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_kind() {
        let e = EditorError::InvalidQuantization("base 5".into());
        assert_eq!(e.to_string(), "Invalid quantization: base 5");
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let e: EditorError = io.into();
        assert!(matches!(e, EditorError::Io(_)));
    }
}
