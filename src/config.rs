use std::path::PathBuf;
use std::time::Duration;

use crate::model::{ForestParams, GbdtParams, LogisticParams};
use crate::records::ColumnGroups;

pub static DATA_PATH: &str = "public/data/heart_disease_uci.csv";
pub static ENSEMBLE_MODEL_PATH: &str = "public/model/heart_gb.onnx";
pub static BOOSTED_MODEL_PATH: &str = "public/models/heart_disease_model.onnx";
pub static BOOSTED_CONFIG_PATH: &str = "public/models/model_config.json";
pub static DATASET_URL: &str = "https://raw.githubusercontent.com/uci-ml-repo/uci-ml-repo.github.io/master/datasets/heart_disease/heart_disease.csv";
pub static MODEL_VERSION: &str = "v3.0-gbdt-onnx";

/// Environment variable holding the env_logger filter.
pub static LOG_ENV: &str = "HEART_LOG";

pub const SEED: u64 = 42;

/// Connect plus read budget for the dataset download before falling back.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Soft-voting ensemble trained on all thirteen clinical columns.
#[derive(Debug, Clone)]
pub struct EnsembleConfig {
    pub data_path: PathBuf,
    pub model_path: PathBuf,
    pub groups: ColumnGroups,
    pub seed: u64,
    pub hist_gb: GbdtParams,
    pub forest: ForestParams,
    pub logistic: LogisticParams,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        EnsembleConfig {
            data_path: PathBuf::from(DATA_PATH),
            model_path: PathBuf::from(ENSEMBLE_MODEL_PATH),
            groups: ColumnGroups::ensemble(),
            seed: SEED,
            hist_gb: GbdtParams {
                n_estimators: 300,
                learning_rate: 0.05,
                max_depth: 8,
                max_leaf_nodes: Some(31),
                min_samples_leaf: 5,
                min_child_weight: 1e-3,
                l2_regularization: 0.5,
                subsample: 1.0,
                colsample_bytree: 1.0,
                max_bins: 255,
                seed: SEED,
            },
            forest: ForestParams {
                n_trees: 200,
                max_depth: 10,
                min_samples_split: 5,
                min_samples_leaf: 2,
                max_features: None,
                seed: SEED,
            },
            logistic: LogisticParams { c: 0.1 },
        }
    }
}

/// Single boosted model on the eleven fields the front-end collects.
#[derive(Debug, Clone)]
pub struct BoostedConfig {
    pub dataset_url: Option<String>,
    pub data_path: PathBuf,
    pub model_path: PathBuf,
    pub config_path: PathBuf,
    pub groups: ColumnGroups,
    pub seed: u64,
    pub test_fraction: f64,
    pub gbdt: GbdtParams,
    pub model_version: String,
}

impl Default for BoostedConfig {
    fn default() -> Self {
        BoostedConfig {
            dataset_url: Some(DATASET_URL.to_string()),
            data_path: PathBuf::from(DATA_PATH),
            model_path: PathBuf::from(BOOSTED_MODEL_PATH),
            config_path: PathBuf::from(BOOSTED_CONFIG_PATH),
            groups: ColumnGroups::boosted(),
            seed: SEED,
            test_fraction: 0.2,
            gbdt: GbdtParams {
                n_estimators: 100,
                learning_rate: 0.1,
                max_depth: 6,
                max_leaf_nodes: None,
                min_samples_leaf: 1,
                min_child_weight: 1.0,
                l2_regularization: 1.0,
                subsample: 0.8,
                colsample_bytree: 0.8,
                max_bins: 255,
                seed: SEED,
            },
            model_version: MODEL_VERSION.to_string(),
        }
    }
}
