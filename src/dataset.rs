use polars::prelude::*;

use crate::error::{PipelineError, Result};
use crate::records::{label_from_severity, ColumnGroups, ColumnKind};

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Categorical(Vec<String>),
    Numeric(Vec<f64>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
    pub data: ColumnData,
}

impl Column {
    pub fn text(&self) -> Option<&[String]> {
        match &self.data {
            ColumnData::Categorical(values) => Some(values),
            ColumnData::Numeric(_) => None,
        }
    }

    pub fn numbers(&self) -> Option<&[f64]> {
        match &self.data {
            ColumnData::Numeric(values) => Some(values),
            ColumnData::Categorical(_) => None,
        }
    }

    fn select(&self, rows: &[usize]) -> Column {
        let data = match &self.data {
            ColumnData::Categorical(values) => {
                ColumnData::Categorical(rows.iter().map(|&i| values[i].clone()).collect())
            }
            ColumnData::Numeric(values) => {
                ColumnData::Numeric(rows.iter().map(|&i| values[i]).collect())
            }
        };
        Column {
            name: self.name.clone(),
            kind: self.kind,
            data,
        }
    }
}

/// Dense, typed copy of the cleaned frame: the features in group order plus binary labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub columns: Vec<Column>,
    pub labels: Vec<i32>,
}

impl Dataset {
    /// Extract the grouped columns; any remaining null is an error.
    pub fn from_frame(df: &DataFrame, groups: &ColumnGroups) -> Result<Self> {
        let mut columns = Vec::with_capacity(groups.width());
        for (name, kind) in &groups.features {
            let series = df.column(name)?;
            let data = match kind {
                ColumnKind::Categorical => {
                    let cast = series.cast(&DataType::Utf8)?;
                    let values = cast
                        .utf8()?
                        .into_iter()
                        .map(|v| v.map(str::to_string).ok_or_else(|| null_in(name)))
                        .collect::<Result<Vec<_>>>()?;
                    ColumnData::Categorical(values)
                }
                ColumnKind::Boolean | ColumnKind::Numeric => {
                    let cast = series.cast(&DataType::Float64)?;
                    let values = cast
                        .f64()?
                        .into_iter()
                        .map(|v| v.ok_or_else(|| null_in(name)))
                        .collect::<Result<Vec<_>>>()?;
                    ColumnData::Numeric(values)
                }
            };
            columns.push(Column {
                name: name.clone(),
                kind: *kind,
                data,
            });
        }

        let target = df.column(&groups.target)?.cast(&DataType::Float64)?;
        let labels = target
            .f64()?
            .into_iter()
            .map(|v| v.map(label_from_severity).ok_or_else(|| null_in(&groups.target)))
            .collect::<Result<Vec<_>>>()?;

        if labels.is_empty() {
            return Err(PipelineError::InvalidData("dataset has no rows".to_string()));
        }

        Ok(Dataset { columns, labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Row subset, in the order given.
    pub fn select(&self, rows: &[usize]) -> Dataset {
        Dataset {
            columns: self.columns.iter().map(|c| c.select(rows)).collect(),
            labels: rows.iter().map(|&i| self.labels[i]).collect(),
        }
    }

    /// (negatives, positives)
    pub fn class_counts(&self) -> (usize, usize) {
        let positives = self.labels.iter().filter(|&&y| y == 1).count();
        (self.len() - positives, positives)
    }
}

fn null_in(column: &str) -> PipelineError {
    PipelineError::InvalidData(format!("null value left in column {}", column))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> DataFrame {
        df!(
            "sex" => &["Male", "Female", "Male"],
            "chol" => &[200.0, 240.0, 180.0],
            "num" => &[0i64, 3, 1]
        )
        .unwrap()
    }

    #[test]
    fn labels_follow_severity() {
        let groups = ColumnGroups::new(&["sex", "chol"]).unwrap();
        let data = Dataset::from_frame(&frame(), &groups).unwrap();
        assert_eq!(data.labels, vec![0, 1, 1]);
        assert_eq!(data.class_counts(), (1, 2));
    }

    #[test]
    fn select_keeps_columns_aligned() {
        let groups = ColumnGroups::new(&["sex", "chol"]).unwrap();
        let data = Dataset::from_frame(&frame(), &groups).unwrap();
        let picked = data.select(&[2, 0]);
        assert_eq!(picked.labels, vec![1, 0]);
        assert_eq!(picked.column("chol").unwrap().numbers().unwrap(), &[180.0, 200.0]);
        assert_eq!(
            picked.column("sex").unwrap().text().unwrap(),
            &["Male".to_string(), "Male".to_string()]
        );
    }

    #[test]
    fn leftover_nulls_are_rejected() {
        let df = df!(
            "chol" => &[Some(200.0), None],
            "num" => &[0i64, 1]
        )
        .unwrap();
        let groups = ColumnGroups::new(&["chol"]).unwrap();
        let err = Dataset::from_frame(&df, &groups).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidData(_)));
    }
}
