use log::info;

use crate::artifact::{ranked_importances, write_model, Accuracy, ModelConfig};
use crate::cleaner::{impute, NumericFill};
use crate::config::BoostedConfig;
use crate::dataset::Dataset;
use crate::encoding::{LabelPreprocessor, Preprocessor};
use crate::error::Result;
use crate::loader::{load_local, load_remote_or_local};
use crate::metrics::{score, ClassificationReport, SplitScore};
use crate::model::{Classifier, GradientBoostingClassifier};
use crate::onnx::{check_input_width, export_gbdt};
use crate::split::train_test;

#[derive(Debug)]
pub struct BoostedOutcome {
    pub train: SplitScore,
    pub test: SplitScore,
    pub config: ModelConfig,
    pub report: ClassificationReport,
}

/// Load (URL first), impute with means, label-encode, split 80/20, boost with
/// the test split as the monitored eval set, then write the ONNX model and
/// its JSON companion.
pub async fn run(config: &BoostedConfig) -> Result<BoostedOutcome> {
    let raw = match &config.dataset_url {
        Some(url) => load_remote_or_local(url, &config.data_path, &config.groups).await?,
        None => load_local(&config.data_path, &config.groups).await?,
    };

    let (clean, _) = impute(&raw, &config.groups, NumericFill::Mean)?;
    let data = Dataset::from_frame(&clean, &config.groups)?;
    let (negative, positive) = data.class_counts();
    info!("Target distribution: {{0: {}, 1: {}}}", negative, positive);

    // vocabularies come from the whole table so every split encodes
    let mut pre = LabelPreprocessor::new();
    pre.fit(&data)?;
    let (train, test) = train_test(&data, config.test_fraction, config.seed)?;
    let x_train = pre.transform(&train)?;
    let x_test = pre.transform(&test)?;
    info!(
        "Training set size: ({}, {}), test set size: ({}, {})",
        x_train.n_rows(),
        x_train.n_cols(),
        x_test.n_rows(),
        x_test.n_cols()
    );

    let mut clf = GradientBoostingClassifier::new(config.gbdt.clone());
    clf.fit_with_eval(&x_train, &train.labels, Some((&x_test, &test.labels)))?;

    let train_score = score("Train", &train.labels, &clf.predict_proba(&x_train)?)?;
    let test_score = score("Test", &test.labels, &clf.predict_proba(&x_test)?)?;

    let features = config.groups.feature_names();
    let importances = clf.feature_importances();
    println!("\nFeature Importance:");
    for entry in ranked_importances(&features, &importances) {
        println!("{:>10}  {:.6}", entry.feature, entry.importance);
    }

    let onnx = export_gbdt(&clf, &features, &pre)?;
    check_input_width(&onnx, features.len())?;
    write_model(&config.model_path, &onnx).await?;
    info!("Model saved to: {}", config.model_path.display());

    let model_config = ModelConfig::new(
        features,
        &importances,
        Accuracy {
            train: train_score.accuracy,
            test: test_score.accuracy,
        },
        &pre,
        &config.model_version,
    );
    model_config.write(&config.config_path).await?;
    info!("Config saved to: {}", config.config_path.display());

    let report = ClassificationReport::new(&test.labels, &clf.predict(&x_test)?);
    println!("\nClassification report (Test):\n{}", report);

    Ok(BoostedOutcome {
        train: train_score,
        test: test_score,
        config: model_config,
        report,
    })
}
