use std::collections::BTreeMap;

use log::{debug, info};

use crate::encoding::{ColumnTransformer, LabelPreprocessor};
use crate::error::{PipelineError, Result};
use crate::model::{GradientBoostingClassifier, Pipeline};
use crate::onnx::builder::{
    attr_floats, attr_int, attr_ints, attr_string, attr_strings, dims_of, model, Dim,
    GraphBuilder, ML_DOMAIN,
};
use crate::onnx::proto::{data_type, AttributeProto, ModelProto};
use crate::records::{ColumnGroups, ColumnKind};

pub const FLOAT_INPUT: &str = "float_input";
pub const LABEL_OUTPUT: &str = "label";
pub const PROBA_OUTPUT: &str = "probabilities";

/// Attributes of an `ai.onnx.ml.TreeEnsembleClassifier` equivalent to `model`.
///
/// Every leaf votes for class id 0 with its raw score; with two labels and a
/// `LOGISTIC` post transform the runtime emits `[1 - p, p]`.
pub fn tree_ensemble_attributes(model: &GradientBoostingClassifier) -> Result<Vec<AttributeProto>> {
    if !model.is_fitted() {
        return Err(PipelineError::NotFitted("gradient boosting classifier"));
    }

    let mut tree_ids = Vec::new();
    let mut node_ids = Vec::new();
    let mut feature_ids = Vec::new();
    let mut modes = Vec::new();
    let mut values = Vec::new();
    let mut true_ids = Vec::new();
    let mut false_ids = Vec::new();

    let mut class_tree_ids = Vec::new();
    let mut class_node_ids = Vec::new();
    let mut class_weights = Vec::new();

    for (t, tree) in model.trees().iter().enumerate() {
        for (n, node) in tree.nodes.iter().enumerate() {
            tree_ids.push(t as i64);
            node_ids.push(n as i64);
            match node.value {
                Some(weight) => {
                    feature_ids.push(0);
                    modes.push("LEAF");
                    values.push(0.0);
                    true_ids.push(0);
                    false_ids.push(0);
                    class_tree_ids.push(t as i64);
                    class_node_ids.push(n as i64);
                    class_weights.push(weight as f32);
                }
                None => {
                    feature_ids.push(node.feature as i64);
                    modes.push("BRANCH_LEQ");
                    values.push(node.threshold as f32);
                    true_ids.push(node.left as i64);
                    false_ids.push(node.right as i64);
                }
            }
        }
    }
    debug!(
        "Tree ensemble: {} trees, {} nodes, {} leaves",
        model.trees().len(),
        node_ids.len(),
        class_weights.len()
    );

    let n_leaves = class_weights.len();
    Ok(vec![
        attr_ints("nodes_treeids", tree_ids),
        attr_ints("nodes_nodeids", node_ids),
        attr_ints("nodes_featureids", feature_ids),
        attr_strings("nodes_modes", &modes),
        attr_floats("nodes_values", values),
        attr_ints("nodes_truenodeids", true_ids),
        attr_ints("nodes_falsenodeids", false_ids),
        attr_ints("class_treeids", class_tree_ids),
        attr_ints("class_nodeids", class_node_ids),
        attr_ints("class_ids", vec![0; n_leaves]),
        attr_floats("class_weights", class_weights),
        attr_ints("classlabels_int64s", vec![0, 1]),
        attr_floats("base_values", vec![model.base_score() as f32]),
        attr_string("post_transform", "LOGISTIC"),
    ])
}

fn classifier_head(graph: &mut GraphBuilder, model: &GradientBoostingClassifier, features: &str) -> Result<()> {
    graph.node(
        "TreeEnsembleClassifier",
        ML_DOMAIN,
        &[features],
        &[LABEL_OUTPUT, PROBA_OUTPUT],
        tree_ensemble_attributes(model)?,
    );
    graph.output(LABEL_OUTPUT, data_type::INT64, &[Dim::Rows]);
    graph.output(PROBA_OUTPUT, data_type::FLOAT, &[Dim::Rows, Dim::Fixed(2)]);
    Ok(())
}

/// Export the fitted column transformer and boosted model as one graph taking
/// the raw columns of `groups`, each as a `[N, 1]` tensor.
pub fn export_ensemble_pipeline(
    pipe: &Pipeline<ColumnTransformer, GradientBoostingClassifier>,
    groups: &ColumnGroups,
) -> Result<ModelProto> {
    let pre = &pipe.pre;
    let clf = &pipe.clf;
    if !clf.is_fitted() {
        return Err(PipelineError::NotFitted("gradient boosting classifier"));
    }
    if clf.n_features() != pre.output_width() {
        return Err(PipelineError::Export(format!(
            "classifier expects {} features but the transformer emits {}",
            clf.n_features(),
            pre.output_width()
        )));
    }

    let mut graph = GraphBuilder::new("heart_risk_pipeline");
    for (name, kind) in &groups.features {
        let elem = match kind {
            ColumnKind::Categorical => data_type::STRING,
            ColumnKind::Boolean | ColumnKind::Numeric => data_type::FLOAT,
        };
        graph.input(name, elem, &[Dim::Rows, Dim::Fixed(1)]);
    }

    let mut blocks: Vec<String> = Vec::new();
    for encoder in pre.onehot() {
        let column = encoder.column();
        let encoded = format!("{}_onehot_3d", column);
        let shape = format!("{}_onehot_shape", column);
        let flat = format!("{}_onehot", column);
        graph.node(
            "OneHotEncoder",
            ML_DOMAIN,
            &[column],
            &[&encoded],
            vec![
                attr_strings("cats_strings", encoder.categories()),
                attr_int("zeros", 1),
            ],
        );
        graph.int64_initializer(&shape, &[-1, encoder.width() as i64]);
        graph.node("Reshape", "", &[&encoded, &shape], &[&flat], vec![]);
        blocks.push(flat);
    }
    blocks.extend(pre.boolean().iter().cloned());

    let numeric = pre.numeric();
    if !numeric.is_empty() {
        let mut expanded: Vec<String> = numeric.to_vec();
        for (i, j) in pre.interactions().pairs() {
            let product = format!("{}_x_{}", numeric[i], numeric[j]);
            graph.node("Mul", "", &[&numeric[i], &numeric[j]], &[&product], vec![]);
            expanded.push(product);
        }
        let inputs: Vec<&str> = expanded.iter().map(String::as_str).collect();
        graph.node("Concat", "", &inputs, &["numeric_expanded"], vec![attr_int("axis", 1)]);

        let scaler = pre.scaler();
        let offset: Vec<f32> = scaler.mean().iter().map(|&m| m as f32).collect();
        let scale: Vec<f32> = scaler.scale().iter().map(|&s| (1.0 / s) as f32).collect();
        graph.node(
            "Scaler",
            ML_DOMAIN,
            &["numeric_expanded"],
            &["numeric_scaled"],
            vec![attr_floats("offset", offset), attr_floats("scale", scale)],
        );
        blocks.push("numeric_scaled".to_string());
    }

    let inputs: Vec<&str> = blocks.iter().map(String::as_str).collect();
    graph.node("Concat", "", &inputs, &["features"], vec![attr_int("axis", 1)]);
    classifier_head(&mut graph, clf, "features")?;

    info!(
        "Exported preprocessing graph: {} raw inputs -> {} features",
        groups.width(),
        pre.output_width()
    );
    Ok(model(
        graph.finish(),
        "Column transformer and histogram gradient boosting member of the heart risk ensemble",
        Vec::new(),
    ))
}

/// Export a boosted model fed with a single `[N, n_features]` float tensor.
/// Category vocabularies ride along in the model metadata.
pub fn export_gbdt(
    clf: &GradientBoostingClassifier,
    features: &[String],
    pre: &LabelPreprocessor,
) -> Result<ModelProto> {
    if clf.n_features() != features.len() {
        return Err(PipelineError::Export(format!(
            "classifier expects {} features, {} names given",
            clf.n_features(),
            features.len()
        )));
    }

    let mut graph = GraphBuilder::new("heart_risk_gbdt");
    graph.input(
        FLOAT_INPUT,
        data_type::FLOAT,
        &[Dim::Rows, Dim::Fixed(features.len() as i64)],
    );
    classifier_head(&mut graph, clf, FLOAT_INPUT)?;

    let mut metadata = vec![("features".to_string(), serde_json::to_string(features)?)];
    for encoder in pre.encoders() {
        metadata.push((
            format!("label_encoding.{}", encoder.column()),
            serde_json::to_string(encoder.classes())?,
        ));
    }
    Ok(model(
        graph.finish(),
        "Gradient boosted heart risk classifier",
        metadata,
    ))
}

/// Total column count the graph inputs declare, summed over inputs.
pub fn declared_input_width(model: &ModelProto) -> Option<usize> {
    let graph = model.graph.as_ref()?;
    graph
        .input
        .iter()
        .map(|input| dims_of(input).last().copied().flatten().map(|n| n as usize))
        .sum()
}

pub fn check_input_width(model: &ModelProto, width: usize) -> Result<()> {
    match declared_input_width(model) {
        Some(declared) if declared == width => Ok(()),
        Some(declared) => Err(PipelineError::Export(format!(
            "graph declares {} input columns, consumer sends {}",
            declared, width
        ))),
        None => Err(PipelineError::Export(
            "graph input width is not fixed".to_string(),
        )),
    }
}

/// Metadata entries as a map, for consumers reading the vocabularies back.
pub fn metadata(model: &ModelProto) -> BTreeMap<&str, &str> {
    model
        .metadata_props
        .iter()
        .map(|entry| (entry.key.as_str(), entry.value.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Column, ColumnData, Dataset};
    use crate::encoding::Preprocessor;
    use crate::matrix::FeatureMatrix;
    use crate::model::{Classifier, GbdtParams};
    use crate::onnx::builder::elem_type_of;
    use crate::onnx::proto::NodeProto;
    use prost::Message;

    fn small_params() -> GbdtParams {
        GbdtParams {
            n_estimators: 15,
            max_depth: 3,
            learning_rate: 0.3,
            ..Default::default()
        }
    }

    fn dataset() -> Dataset {
        let n = 60;
        let sex = (0..n)
            .map(|i| if i % 3 == 0 { "Female" } else { "Male" }.to_string())
            .collect();
        let fbs = (0..n).map(|i| (i % 4 == 0) as i32 as f64).collect();
        let age = (0..n).map(|i| 30.0 + i as f64).collect();
        let chol = (0..n).map(|i| 180.0 + ((i * 37) % 90) as f64).collect();
        let labels = (0..n).map(|i| (i >= 30) as i32).collect();
        Dataset {
            columns: vec![
                Column {
                    name: "age".into(),
                    kind: ColumnKind::Numeric,
                    data: ColumnData::Numeric(age),
                },
                Column {
                    name: "sex".into(),
                    kind: ColumnKind::Categorical,
                    data: ColumnData::Categorical(sex),
                },
                Column {
                    name: "chol".into(),
                    kind: ColumnKind::Numeric,
                    data: ColumnData::Numeric(chol),
                },
                Column {
                    name: "fbs".into(),
                    kind: ColumnKind::Boolean,
                    data: ColumnData::Numeric(fbs),
                },
            ],
            labels,
        }
    }

    fn attribute<'a>(node: &'a NodeProto, name: &str) -> &'a AttributeProto {
        node.attribute
            .iter()
            .find(|a| a.name == name)
            .unwrap_or_else(|| panic!("missing attribute {}", name))
    }

    /// Positive-class probability computed straight from the exported attributes.
    fn run_tree_ensemble(node: &NodeProto, row: &[f32]) -> f32 {
        let tree_ids = &attribute(node, "nodes_treeids").ints;
        let node_ids = &attribute(node, "nodes_nodeids").ints;
        let features = &attribute(node, "nodes_featureids").ints;
        let modes = &attribute(node, "nodes_modes").strings;
        let values = &attribute(node, "nodes_values").floats;
        let true_ids = &attribute(node, "nodes_truenodeids").ints;
        let false_ids = &attribute(node, "nodes_falsenodeids").ints;
        let class_trees = &attribute(node, "class_treeids").ints;
        let class_nodes = &attribute(node, "class_nodeids").ints;
        let weights = &attribute(node, "class_weights").floats;

        let index: BTreeMap<(i64, i64), usize> = tree_ids
            .iter()
            .zip(node_ids)
            .enumerate()
            .map(|(k, (&t, &n))| ((t, n), k))
            .collect();
        let leaf: BTreeMap<(i64, i64), f32> = class_trees
            .iter()
            .zip(class_nodes)
            .zip(weights)
            .map(|((&t, &n), &w)| ((t, n), w))
            .collect();

        let mut trees: Vec<i64> = tree_ids.clone();
        trees.dedup();
        let mut raw = attribute(node, "base_values").floats[0];
        for t in trees {
            let mut n = 0;
            loop {
                let k = index[&(t, n)];
                if modes[k] == b"LEAF" {
                    raw += leaf[&(t, n)];
                    break;
                }
                n = if row[features[k] as usize] <= values[k] {
                    true_ids[k]
                } else {
                    false_ids[k]
                };
            }
        }
        1.0 / (1.0 + (-raw).exp())
    }

    fn ops(model: &ModelProto) -> Vec<&str> {
        model
            .graph
            .as_ref()
            .map(|g| g.node.iter().map(|n| n.op_type.as_str()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn exported_trees_reproduce_the_model() {
        let data = dataset();
        let mut pre = LabelPreprocessor::new();
        let x = pre.fit_transform(&data).unwrap();
        let mut clf = GradientBoostingClassifier::new(small_params());
        clf.fit(&x, &data.labels).unwrap();

        let names = pre.feature_names();
        let exported = export_gbdt(&clf, &names, &pre).unwrap();
        let bytes = exported.encode_to_vec();
        let decoded = ModelProto::decode(bytes.as_slice()).unwrap();
        assert_eq!(decoded, exported);

        let graph = decoded.graph.as_ref().unwrap();
        let head = &graph.node[0];
        assert_eq!(head.op_type, "TreeEnsembleClassifier");
        assert_eq!(head.domain, "ai.onnx.ml");
        assert_eq!(attribute(head, "post_transform").s, b"LOGISTIC");

        let expected = clf.predict_proba(&x).unwrap();
        for (i, row) in x.rows().enumerate() {
            let row32: Vec<f32> = row.iter().map(|&v| v as f32).collect();
            let p = run_tree_ensemble(head, &row32);
            assert!((p as f64 - expected[i]).abs() < 1e-4, "row {}", i);
        }
    }

    #[test]
    fn boosted_graph_declares_one_float_input() {
        let data = dataset();
        let mut pre = LabelPreprocessor::new();
        let x = pre.fit_transform(&data).unwrap();
        let mut clf = GradientBoostingClassifier::new(small_params());
        clf.fit(&x, &data.labels).unwrap();
        let exported = export_gbdt(&clf, &pre.feature_names(), &pre).unwrap();

        let graph = exported.graph.as_ref().unwrap();
        assert_eq!(graph.input.len(), 1);
        assert_eq!(graph.input[0].name, FLOAT_INPUT);
        assert_eq!(dims_of(&graph.input[0]), vec![None, Some(4)]);
        assert_eq!(dims_of(&graph.output[1]), vec![None, Some(2)]);
        assert_eq!(elem_type_of(&graph.output[0]), Some(data_type::INT64));

        assert!(check_input_width(&exported, 4).is_ok());
        assert!(check_input_width(&exported, 5).is_err());

        let meta = metadata(&exported);
        assert_eq!(meta["label_encoding.sex"], r#"["Female","Male"]"#);
        assert_eq!(meta["features"], r#"["age","sex","chol","fbs"]"#);
    }

    #[test]
    fn pipeline_graph_rebuilds_the_transformer() {
        let data = dataset();
        let groups = ColumnGroups::new(&["age", "sex", "chol", "fbs"]).unwrap();
        let mut pipe = Pipeline::new(
            ColumnTransformer::new(&groups),
            GradientBoostingClassifier::new(small_params()),
        );
        pipe.fit(&data).unwrap();
        let exported = export_ensemble_pipeline(&pipe, &groups).unwrap();

        assert_eq!(
            ops(&exported),
            vec![
                "OneHotEncoder",
                "Reshape",
                "Mul",
                "Concat",
                "Scaler",
                "Concat",
                "TreeEnsembleClassifier"
            ]
        );
        let graph = exported.graph.as_ref().unwrap();
        let inputs: Vec<(&str, Option<i32>)> = graph
            .input
            .iter()
            .map(|i| (i.name.as_str(), elem_type_of(i)))
            .collect();
        assert_eq!(
            inputs,
            vec![
                ("age", Some(data_type::FLOAT)),
                ("sex", Some(data_type::STRING)),
                ("chol", Some(data_type::FLOAT)),
                ("fbs", Some(data_type::FLOAT)),
            ]
        );
        assert!(check_input_width(&exported, groups.width()).is_ok());
        assert!(check_input_width(&exported, 3).is_err());

        let onehot = &graph.node[0];
        assert_eq!(attribute(onehot, "cats_strings").strings.len(), 2);
        assert_eq!(attribute(onehot, "zeros").i, 1);
        let scaler = &graph.node[4];
        assert_eq!(attribute(scaler, "offset").floats.len(), 3);
        let last_concat = &graph.node[5];
        assert_eq!(last_concat.input, vec!["sex_onehot", "fbs", "numeric_scaled"]);
    }

    #[test]
    fn pipeline_head_matches_the_transformed_features() {
        let data = dataset();
        let groups = ColumnGroups::new(&["age", "sex", "chol", "fbs"]).unwrap();
        let mut pipe = Pipeline::new(
            ColumnTransformer::new(&groups),
            GradientBoostingClassifier::new(small_params()),
        );
        pipe.fit(&data).unwrap();
        let exported = export_ensemble_pipeline(&pipe, &groups).unwrap();
        let head = exported
            .graph
            .as_ref()
            .and_then(|g| g.node.last())
            .unwrap();

        let x: FeatureMatrix = pipe.pre.transform(&data).unwrap();
        let expected = pipe.predict_proba(&data).unwrap();
        for (i, row) in x.rows().enumerate() {
            let row32: Vec<f32> = row.iter().map(|&v| v as f32).collect();
            assert!((run_tree_ensemble(head, &row32) as f64 - expected[i]).abs() < 1e-4);
        }
    }

    #[test]
    fn unfitted_models_are_not_exported() {
        let clf = GradientBoostingClassifier::new(GbdtParams::default());
        let pre = LabelPreprocessor::new();
        assert!(matches!(
            export_gbdt(&clf, &[], &pre),
            Err(PipelineError::NotFitted(_))
        ));
    }
}
