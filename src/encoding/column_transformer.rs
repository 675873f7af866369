use crate::dataset::{Column, Dataset};
use crate::encoding::{InteractionFeatures, OneHotEncoder, Preprocessor, StandardScaler};
use crate::error::{PipelineError, Result};
use crate::matrix::FeatureMatrix;
use crate::records::{ColumnGroups, ColumnKind};

/// Dense output: one-hot blocks for text columns, boolean flags unchanged,
/// then the numeric columns expanded with interaction terms and standardized.
#[derive(Debug, Clone)]
pub struct ColumnTransformer {
    onehot: Vec<OneHotEncoder>,
    boolean: Vec<String>,
    numeric: Vec<String>,
    interactions: InteractionFeatures,
    scaler: StandardScaler,
    fitted: bool,
}

impl ColumnTransformer {
    pub fn new(groups: &ColumnGroups) -> Self {
        let numeric = groups.names(ColumnKind::Numeric);
        ColumnTransformer {
            onehot: groups
                .names(ColumnKind::Categorical)
                .iter()
                .map(|name| OneHotEncoder::new(name))
                .collect(),
            boolean: groups.names(ColumnKind::Boolean),
            interactions: InteractionFeatures::new(numeric.len()),
            numeric,
            scaler: StandardScaler::default(),
            fitted: false,
        }
    }

    pub fn onehot(&self) -> &[OneHotEncoder] {
        &self.onehot
    }

    pub fn boolean(&self) -> &[String] {
        &self.boolean
    }

    pub fn numeric(&self) -> &[String] {
        &self.numeric
    }

    pub fn interactions(&self) -> &InteractionFeatures {
        &self.interactions
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    /// Number of columns the transformer emits.
    pub fn output_width(&self) -> usize {
        self.onehot.iter().map(OneHotEncoder::width).sum::<usize>()
            + self.boolean.len()
            + self.interactions.n_outputs()
    }

    fn numeric_block(&self, data: &Dataset) -> Result<FeatureMatrix> {
        let columns = self
            .numeric
            .iter()
            .map(|name| numbers(data, name))
            .collect::<Result<Vec<_>>>()?;
        let rows = (0..data.len())
            .map(|i| {
                let inputs: Vec<f64> = columns.iter().map(|c| c[i]).collect();
                self.interactions.expand(&inputs)
            })
            .collect();
        FeatureMatrix::from_rows(rows)
    }
}

impl Preprocessor for ColumnTransformer {
    fn fit(&mut self, data: &Dataset) -> Result<()> {
        for encoder in self.onehot.iter_mut() {
            let column = lookup(data, encoder.column())?;
            let values = column.text().ok_or_else(|| {
                PipelineError::InvalidData(format!("{} is not a text column", column.name))
            })?;
            encoder.fit(values);
        }
        let expanded = self.numeric_block(data)?;
        self.scaler.fit(&expanded)?;
        self.fitted = true;
        Ok(())
    }

    fn transform(&self, data: &Dataset) -> Result<FeatureMatrix> {
        if !self.fitted {
            return Err(PipelineError::NotFitted("column transformer"));
        }
        let text = self
            .onehot
            .iter()
            .map(|encoder| {
                let column = lookup(data, encoder.column())?;
                column.text().ok_or_else(|| {
                    PipelineError::InvalidData(format!("{} is not a text column", column.name))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let flags = self
            .boolean
            .iter()
            .map(|name| numbers(data, name))
            .collect::<Result<Vec<_>>>()?;
        let expanded = self.numeric_block(data)?;

        let width = self.output_width();
        let mut values = Vec::with_capacity(data.len() * width);
        for i in 0..data.len() {
            for (encoder, column) in self.onehot.iter().zip(&text) {
                encoder.encode_into(&column[i], &mut values);
            }
            values.extend(flags.iter().map(|column| column[i]));
            let mut scaled = expanded.row(i).to_vec();
            self.scaler.transform_row(&mut scaled);
            values.extend(scaled);
        }
        FeatureMatrix::new(data.len(), width, values)
    }

    fn feature_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .onehot
            .iter()
            .flat_map(|e| e.feature_names())
            .map(|n| format!("cat__{}", n))
            .collect();
        names.extend(self.boolean.iter().map(|n| format!("bool__{}", n)));
        names.extend(
            self.interactions
                .feature_names(&self.numeric)
                .into_iter()
                .map(|n| format!("num__{}", n)),
        );
        names
    }
}

fn lookup<'a>(data: &'a Dataset, name: &str) -> Result<&'a Column> {
    data.column(name).ok_or_else(|| PipelineError::MissingColumn {
        column: name.to_string(),
    })
}

fn numbers<'a>(data: &'a Dataset, name: &str) -> Result<&'a [f64]> {
    let column = lookup(data, name)?;
    column
        .numbers()
        .ok_or_else(|| PipelineError::InvalidData(format!("{} is not a numeric column", name)))
}
