use super::partition::ParseError;
use crate::store::StoreError;

/// Fatal pipeline failures; any of these aborts the run
#[derive(Debug)]
pub enum PipelineError {
    Io(std::io::Error),
    Parse(ParseError),
    Store(StoreError),
    Worker(String),
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::Io(err)
    }
}

impl From<ParseError> for PipelineError {
    fn from(err: ParseError) -> Self {
        PipelineError::Parse(err)
    }
}

impl From<StoreError> for PipelineError {
    fn from(err: StoreError) -> Self {
        PipelineError::Store(err)
    }
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::Io(e) => write!(f, "IO error: {}", e),
            PipelineError::Parse(e) => write!(f, "Parse error: {}", e),
            PipelineError::Store(e) => write!(f, "Store error: {}", e),
            PipelineError::Worker(msg) => write!(f, "Worker error: {}", msg),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Io(e) => Some(e),
            PipelineError::Parse(e) => Some(e),
            PipelineError::Store(e) => Some(e),
            PipelineError::Worker(_) => None,
        }
    }
}
