use crate::error::{PipelineError, Result};

/// Severity column of the UCI table; 0 means no disease.
pub const TARGET: &str = "num";

/// Provenance columns that never reach a model.
pub const DROPPED: [&str; 2] = ["id", "dataset"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    Categorical,
    Boolean,
    Numeric,
}

/// One patient row of the UCI heart disease table, in file order.
pub struct HeartRecord {}

impl HeartRecord {
    pub const COLUMNS: [(&'static str, ColumnKind); 13] = [
        ("age", ColumnKind::Numeric),
        ("sex", ColumnKind::Categorical),
        ("cp", ColumnKind::Categorical),
        ("trestbps", ColumnKind::Numeric),
        ("chol", ColumnKind::Numeric),
        ("fbs", ColumnKind::Boolean),
        ("restecg", ColumnKind::Categorical),
        ("thalch", ColumnKind::Numeric),
        ("exang", ColumnKind::Boolean),
        ("oldpeak", ColumnKind::Numeric),
        ("slope", ColumnKind::Categorical),
        ("ca", ColumnKind::Numeric),
        ("thal", ColumnKind::Categorical),
    ];

    pub fn kind_of(name: &str) -> Option<ColumnKind> {
        Self::COLUMNS
            .iter()
            .find(|(column, _)| *column == name)
            .map(|(_, kind)| *kind)
    }
}

/// Binary label: disease present when the severity is above zero.
pub fn label_from_severity(severity: f64) -> i32 {
    if severity > 0.0 {
        1
    } else {
        0
    }
}

/// Feature columns a pipeline consumes, in the order they are fed to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnGroups {
    pub features: Vec<(String, ColumnKind)>,
    pub target: String,
}

impl ColumnGroups {
    /// Groups for the named clinical columns; a name outside the schema is rejected.
    pub fn new(features: &[&str]) -> Result<Self> {
        let features = features
            .iter()
            .map(|name| {
                HeartRecord::kind_of(name)
                    .map(|kind| (name.to_string(), kind))
                    .ok_or_else(|| {
                        PipelineError::InvalidData(format!("unknown feature column {:?}", name))
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::with_features(features))
    }

    /// All thirteen clinical columns.
    pub fn ensemble() -> Self {
        Self::schema_columns(|_| true)
    }

    /// The eleven fields the web front-end collects (no `ca`, no `thal`).
    pub fn boosted() -> Self {
        Self::schema_columns(|name| name != "ca" && name != "thal")
    }

    fn schema_columns(keep: impl Fn(&str) -> bool) -> Self {
        let features = HeartRecord::COLUMNS
            .iter()
            .filter(|(name, _)| keep(name))
            .map(|(name, kind)| (name.to_string(), *kind))
            .collect();
        Self::with_features(features)
    }

    fn with_features(features: Vec<(String, ColumnKind)>) -> Self {
        ColumnGroups {
            features,
            target: TARGET.to_string(),
        }
    }

    pub fn names(&self, kind: ColumnKind) -> Vec<String> {
        self.features
            .iter()
            .filter(|(_, k)| *k == kind)
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.features.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn width(&self) -> usize {
        self.features.len()
    }

    pub fn required(&self) -> impl Iterator<Item = &str> {
        self.features
            .iter()
            .map(|(name, _)| name.as_str())
            .chain(std::iter::once(self.target.as_str()))
    }
}
