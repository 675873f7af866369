use std::path::PathBuf;

use polars::prelude::PolarsError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("cannot read {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot write {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot download dataset from {url}: {message}")]
    Fetch { url: String, message: String },
    #[error("missing column {column:?}")]
    MissingColumn { column: String },
    #[error("unknown category {value:?} in column {column:?}")]
    UnknownCategory { column: String, value: String },
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("{0} used before fit")]
    NotFitted(&'static str),
    #[error("model fitting failed: {0}")]
    Model(String),
    #[error("onnx export failed: {0}")]
    Export(String),
    #[error(transparent)]
    Polars(#[from] PolarsError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Decode(#[from] prost::DecodeError),
}

impl From<smartcore::error::Failed> for PipelineError {
    fn from(e: smartcore::error::Failed) -> Self {
        PipelineError::Model(e.to_string())
    }
}
