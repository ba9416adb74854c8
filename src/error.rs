// src/error.rs
use std::path::PathBuf;

use thiserror::Error;
use weave_core::FontError;
use weave_system::SystemError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Font error: {0}")]
    Font(#[from] FontError),

    #[error("Font system error: {0}")]
    System(#[from] SystemError),

    #[error("Cairo error: {0}")]
    Cairo(#[from] cairo::Error),

    #[error("Cannot write {path}: {source}")]
    Png {
        path: PathBuf,
        #[source]
        source: cairo::IoError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Nothing to render: {0:?} has zero width")]
    EmptyText(String),
}

pub type AppResult<T> = Result<T, AppError>;
