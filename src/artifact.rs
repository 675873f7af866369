use std::path::Path;

use log::info;
use prost::Message;
use serde::{Deserialize, Serialize};

use crate::encoding::LabelPreprocessor;
use crate::error::{PipelineError, Result};
use crate::onnx::ModelProto;

/// Write `bytes` to `path`, creating missing parent directories.
pub async fn write_bytes<P: AsRef<Path>>(path: P, bytes: &[u8]) -> Result<()> {
    let path = path.as_ref();
    let write_error = |source| PipelineError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_error)?;
    }
    tokio::fs::write(path, bytes).await.map_err(write_error)?;
    info!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

pub async fn write_model<P: AsRef<Path>>(path: P, model: &ModelProto) -> Result<()> {
    write_bytes(path, &model.encode_to_vec()).await
}

pub async fn read_model<P: AsRef<Path>>(path: P) -> Result<ModelProto> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| PipelineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(ModelProto::decode(bytes.as_slice())?)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Sorts `(feature, importance)` pairs by descending importance; ties keep feature order.
pub fn ranked_importances(features: &[String], importances: &[f64]) -> Vec<FeatureImportance> {
    let mut ranked: Vec<FeatureImportance> = features
        .iter()
        .zip(importances)
        .map(|(feature, &importance)| FeatureImportance {
            feature: feature.clone(),
            importance,
        })
        .collect();
    ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    ranked
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Accuracy {
    pub train: f64,
    pub test: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalEncoding {
    pub column: String,
    pub classes: Vec<String>,
}

/// Companion file describing the exported boosted model to the front-end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub features: Vec<String>,
    pub feature_importance: Vec<FeatureImportance>,
    pub accuracy: Accuracy,
    pub categorical_encodings: Vec<CategoricalEncoding>,
    pub model_version: String,
}

impl ModelConfig {
    pub fn new(
        features: Vec<String>,
        importances: &[f64],
        accuracy: Accuracy,
        pre: &LabelPreprocessor,
        model_version: &str,
    ) -> Self {
        let feature_importance = ranked_importances(&features, importances);
        ModelConfig {
            features,
            feature_importance,
            accuracy,
            categorical_encodings: pre
                .encoders()
                .map(|e| CategoricalEncoding {
                    column: e.column().to_string(),
                    classes: e.classes().to_vec(),
                })
                .collect(),
            model_version: model_version.to_string(),
        }
    }

    pub async fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        write_bytes(path, json.as_bytes()).await
    }
}
