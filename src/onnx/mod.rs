//! ONNX export of the fitted models.
//!
//! Only the messages and operators the two exported graphs use are modelled.
//! Both graphs end in an `ai.onnx.ml.TreeEnsembleClassifier` producing an
//! int64 `label` and a `[N, 2]` float `probabilities` tensor.

pub mod builder;
mod export;
pub mod proto;

pub use export::{
    check_input_width, declared_input_width, export_ensemble_pipeline, export_gbdt, metadata,
    tree_ensemble_attributes, FLOAT_INPUT, LABEL_OUTPUT, PROBA_OUTPUT,
};
pub use proto::ModelProto;
