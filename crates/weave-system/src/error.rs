// src/error.rs
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SystemError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not a readable font: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    #[error("malformed sfnt data: {0}")]
    Malformed(String),

    #[error("no usable fonts found in {searched} locations")]
    NoFonts { searched: usize },
}

pub type SystemResult<T> = Result<T, SystemError>;
