use std::io;

use repack_core::RepackError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("OBJ parse error on line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error(transparent)]
    Repack(#[from] RepackError),
}

impl ToolError {
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        ToolError::Parse { line, message: message.into() }
    }
}

pub type ToolResult<T> = Result<T, ToolError>;
