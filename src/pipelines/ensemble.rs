use std::path::PathBuf;

use log::{info, warn};

use crate::artifact::write_model;
use crate::cleaner::{impute, NumericFill};
use crate::config::EnsembleConfig;
use crate::dataset::Dataset;
use crate::encoding::ColumnTransformer;
use crate::error::Result;
use crate::loader::load_local;
use crate::metrics::{evaluate, ClassificationReport, SplitScore};
use crate::model::{
    EnsembleMember, GradientBoostingClassifier, LogisticRegression, Pipeline,
    RandomForestClassifier, SoftVotingClassifier,
};
use crate::onnx::{check_input_width, export_ensemble_pipeline};
use crate::split::train_val_test;

/// Ensemble member that is exported on its own.
pub const HIST_GB: &str = "hist_gb";

#[derive(Debug)]
pub struct EnsembleOutcome {
    pub train: SplitScore,
    pub val: SplitScore,
    pub test: SplitScore,
    /// Test score of the exported preprocessor + `hist_gb` pipeline.
    pub exported_test: SplitScore,
    pub report: ClassificationReport,
    pub model_path: PathBuf,
}

fn build(config: &EnsembleConfig) -> Pipeline<ColumnTransformer, SoftVotingClassifier> {
    let ensemble = SoftVotingClassifier::new(vec![
        (
            HIST_GB,
            EnsembleMember::HistGb(GradientBoostingClassifier::new(config.hist_gb.clone())),
        ),
        (
            "rf",
            EnsembleMember::Forest(RandomForestClassifier::new(config.forest.clone())),
        ),
        (
            "lr",
            EnsembleMember::Logistic(LogisticRegression::new(config.logistic.clone())),
        ),
    ]);
    Pipeline::new(ColumnTransformer::new(&config.groups), ensemble)
}

/// Load, impute with medians, split 60/20/20, fit the soft-voting ensemble,
/// report the three splits and export the boosted member with its preprocessor.
pub async fn run(config: &EnsembleConfig) -> Result<EnsembleOutcome> {
    info!("Loading data from {}", config.data_path.display());
    let raw = load_local(&config.data_path, &config.groups).await?;
    let (clean, _) = impute(&raw, &config.groups, NumericFill::Median)?;
    let data = Dataset::from_frame(&clean, &config.groups)?;
    let (train, val, test) = train_val_test(&data, config.seed)?;

    let mut model = build(config);
    info!("Training soft-voting ensemble ({:?})...", model.clf.names());
    model.fit(&train)?;

    let train_score = evaluate(&model, &train, "Train")?;
    let val_score = evaluate(&model, &val, "Val")?;
    let test_score = evaluate(&model, &test, "Test")?;

    let reduced = Pipeline::new(model.pre.clone(), model.clf.hist_gb(HIST_GB)?.clone());
    let exported_test = evaluate(&reduced, &test, "Test, exported member")?;
    warn!(
        "Exporting only the {} member; its predictions differ from the evaluated ensemble",
        HIST_GB
    );
    let onnx = export_ensemble_pipeline(&reduced, &config.groups)?;
    check_input_width(&onnx, config.groups.width())?;
    write_model(&config.model_path, &onnx).await?;
    info!(
        "Saved ONNX model (HistGradientBoosting) to {}",
        config.model_path.display()
    );

    let preds = model.predict(&test)?;
    let report = ClassificationReport::new(&test.labels, &preds);
    println!("\nClassification report (Test):\n{}", report);

    Ok(EnsembleOutcome {
        train: train_score,
        val: val_score,
        test: test_score,
        exported_test,
        report,
        model_path: config.model_path.clone(),
    })
}
