use std::collections::HashMap;

use crate::dataset::{ColumnData, Dataset};
use crate::encoding::Preprocessor;
use crate::error::{PipelineError, Result};
use crate::matrix::FeatureMatrix;

/// Maps each category to a small integer id in the order it is first seen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelEncoder {
    column: String,
    classes: Vec<String>,
    ids: HashMap<String, usize>,
}

impl LabelEncoder {
    pub fn new(column: &str) -> Self {
        LabelEncoder {
            column: column.to_string(),
            ..Default::default()
        }
    }

    pub fn fit(&mut self, values: &[String]) {
        self.classes.clear();
        self.ids.clear();
        for value in values {
            if !self.ids.contains_key(value) {
                self.ids.insert(value.clone(), self.classes.len());
                self.classes.push(value.clone());
            }
        }
    }

    pub fn encode(&self, value: &str) -> Result<usize> {
        self.ids
            .get(value)
            .copied()
            .ok_or_else(|| PipelineError::UnknownCategory {
                column: self.column.clone(),
                value: value.to_string(),
            })
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }
}

/// Label-encodes the text columns and passes everything else through as floats,
/// keeping the dataset's column order.
#[derive(Debug, Clone, Default)]
pub struct LabelPreprocessor {
    names: Vec<String>,
    encoders: Vec<Option<LabelEncoder>>,
}

impl LabelPreprocessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn encoders(&self) -> impl Iterator<Item = &LabelEncoder> {
        self.encoders.iter().flatten()
    }
}

impl Preprocessor for LabelPreprocessor {
    fn fit(&mut self, data: &Dataset) -> Result<()> {
        self.names = data.columns.iter().map(|c| c.name.clone()).collect();
        self.encoders = data
            .columns
            .iter()
            .map(|c| {
                c.text().map(|values| {
                    let mut encoder = LabelEncoder::new(&c.name);
                    encoder.fit(values);
                    encoder
                })
            })
            .collect();
        Ok(())
    }

    fn transform(&self, data: &Dataset) -> Result<FeatureMatrix> {
        if self.names.is_empty() {
            return Err(PipelineError::NotFitted("label preprocessor"));
        }
        let mut values = Vec::with_capacity(data.len() * self.names.len());
        for i in 0..data.len() {
            for (name, encoder) in self.names.iter().zip(&self.encoders) {
                let column = data
                    .column(name)
                    .ok_or_else(|| PipelineError::MissingColumn {
                        column: name.clone(),
                    })?;
                let value = match (&column.data, encoder) {
                    (ColumnData::Categorical(text), Some(encoder)) => encoder.encode(&text[i])? as f64,
                    (ColumnData::Numeric(numbers), None) => numbers[i],
                    _ => {
                        return Err(PipelineError::InvalidData(format!(
                            "column {} changed type since fit",
                            name
                        )))
                    }
                };
                values.push(value);
            }
        }
        FeatureMatrix::new(data.len(), self.names.len(), values)
    }

    fn feature_names(&self) -> Vec<String> {
        self.names.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Column;
    use crate::records::ColumnKind;

    fn data(sex: &[&str], age: &[f64]) -> Dataset {
        Dataset {
            columns: vec![
                Column {
                    name: "age".into(),
                    kind: ColumnKind::Numeric,
                    data: ColumnData::Numeric(age.to_vec()),
                },
                Column {
                    name: "sex".into(),
                    kind: ColumnKind::Categorical,
                    data: ColumnData::Categorical(sex.iter().map(|s| s.to_string()).collect()),
                },
            ],
            labels: vec![0; age.len()],
        }
    }

    #[test]
    fn ids_follow_first_seen_order() {
        let mut encoder = LabelEncoder::new("slope");
        encoder.fit(&["upsloping".into(), "flat".into(), "upsloping".into(), "downsloping".into()]);
        assert_eq!(encoder.classes(), &["upsloping", "flat", "downsloping"]);
        assert_eq!(encoder.encode("flat").unwrap(), 1);
        assert_eq!(encoder.encode("downsloping").unwrap(), 2);
    }

    #[test]
    fn refit_replaces_the_vocabulary() {
        let mut encoder = LabelEncoder::new("sex");
        encoder.fit(&["Male".into(), "Female".into()]);
        encoder.fit(&["Female".into()]);
        assert_eq!(encoder.classes(), &["Female"]);
        assert_eq!(encoder.encode("Female").unwrap(), 0);
        assert!(encoder.encode("Male").is_err());
    }

    #[test]
    fn unknown_label_is_an_error() {
        let mut encoder = LabelEncoder::new("slope");
        encoder.fit(&["flat".into()]);
        assert!(matches!(
            encoder.encode("steep"),
            Err(PipelineError::UnknownCategory { .. })
        ));
    }

    #[test]
    fn preprocessor_keeps_column_order() {
        let train = data(&["Female", "Male", "Female"], &[40.0, 50.0, 60.0]);
        let mut pre = LabelPreprocessor::new();
        let x = pre.fit_transform(&train).unwrap();
        assert_eq!(pre.feature_names(), vec!["age", "sex"]);
        assert_eq!(x.row(0), &[40.0, 0.0]);
        assert_eq!(x.row(1), &[50.0, 1.0]);
        assert_eq!(pre.encoders().count(), 1);
    }

    #[test]
    fn transform_before_fit_fails() {
        let pre = LabelPreprocessor::new();
        assert!(pre.transform(&data(&["Male"], &[1.0])).is_err());
    }
}
