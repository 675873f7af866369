use std::collections::BTreeMap;
use std::fmt;

use log::info;
use polars::prelude::*;

use crate::error::{PipelineError, Result};
use crate::records::{ColumnGroups, ColumnKind};

/// Placeholder for a categorical column with no observed value at all.
pub const MISSING_CATEGORY: &str = "missing";

/// How numeric gaps are filled. The two training programs differ on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericFill {
    Median,
    Mean,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FillValue {
    Text(String),
    Number(f64),
}

impl fmt::Display for FillValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FillValue::Text(text) => write!(f, "{:?}", text),
            FillValue::Number(value) => write!(f, "{:.4}", value),
        }
    }
}

/// Fill value chosen for every grouped column, in group order.
#[derive(Debug, Clone, Default)]
pub struct ImputationSummary {
    pub fills: Vec<(String, FillValue, usize)>,
}

impl ImputationSummary {
    pub fn fill_for(&self, column: &str) -> Option<&FillValue> {
        self.fills
            .iter()
            .find(|(name, _, _)| name == column)
            .map(|(_, value, _)| value)
    }
}

/// Fill every gap in the grouped columns so the exported graph needs no imputer.
pub fn impute(
    df: &DataFrame,
    groups: &ColumnGroups,
    numeric: NumericFill,
) -> Result<(DataFrame, ImputationSummary)> {
    let mut out = df.clone();
    let mut summary = ImputationSummary::default();

    for (name, kind) in &groups.features {
        let series = df.column(name)?;
        let missing = series.null_count();
        let (filled, value) = match kind {
            ColumnKind::Categorical => fill_categorical(series)?,
            ColumnKind::Boolean => fill_numeric(series, 0.0)?,
            ColumnKind::Numeric => {
                let value = match numeric {
                    NumericFill::Median => series.median(),
                    NumericFill::Mean => series.mean(),
                }
                .unwrap_or(0.0);
                fill_numeric(series, value)?
            }
        };
        if missing > 0 {
            info!("Filled {} gaps in {} with {}", missing, name, value);
        }
        out.with_column(filled)?;
        summary.fills.push((name.clone(), value, missing));
    }

    Ok((out, summary))
}

fn fill_categorical(series: &Series) -> Result<(Series, FillValue)> {
    let values = series.utf8()?;
    let mode = most_frequent(values.into_iter().flatten())
        .unwrap_or(MISSING_CATEGORY)
        .to_string();
    let filled: Utf8Chunked = values
        .into_iter()
        .map(|v| Some(v.unwrap_or(mode.as_str())))
        .collect();
    let mut out = filled.into_series();
    out.rename(series.name());
    Ok((out, FillValue::Text(mode)))
}

fn fill_numeric(series: &Series, value: f64) -> Result<(Series, FillValue)> {
    if !value.is_finite() {
        return Err(PipelineError::InvalidData(format!(
            "non-finite fill value for {}",
            series.name()
        )));
    }
    let filled: Float64Chunked = series
        .f64()?
        .into_iter()
        .map(|v| Some(v.unwrap_or(value)))
        .collect();
    let mut out = filled.into_series();
    out.rename(series.name());
    Ok((out, FillValue::Number(value)))
}

/// Most frequent value; ties go to the lexically smallest one.
pub fn most_frequent<'a, I>(values: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for value in values {
        *counts.entry(value).or_insert(0) += 1;
    }
    let mut best: Option<(&str, usize)> = None;
    for (value, count) in counts {
        if best.map_or(true, |(_, top)| count > top) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groups() -> ColumnGroups {
        ColumnGroups::new(&["sex", "fbs", "chol"]).unwrap()
    }

    fn frame() -> DataFrame {
        df!(
            "sex" => &[Some("Male"), None, Some("Female"), Some("Male")],
            "fbs" => &[Some(1.0), None, Some(0.0), None],
            "chol" => &[Some(200.0), None, Some(300.0), Some(250.0)],
            "num" => &[0.0, 1.0, 2.0, 0.0]
        )
        .unwrap()
    }

    #[test]
    fn no_gaps_remain() {
        let (clean, _) = impute(&frame(), &groups(), NumericFill::Median).unwrap();
        for name in ["sex", "fbs", "chol"] {
            assert_eq!(clean.column(name).unwrap().null_count(), 0, "{}", name);
        }
    }

    #[test]
    fn median_and_mean_differ_per_variant() {
        let df = df!(
            "sex" => &["Male", "Male", "Male", "Male"],
            "fbs" => &[0.0, 0.0, 0.0, 0.0],
            "chol" => &[Some(100.0), Some(110.0), Some(400.0), None],
            "num" => &[0.0, 1.0, 0.0, 1.0]
        )
        .unwrap();

        let (median, summary) = impute(&df, &groups(), NumericFill::Median).unwrap();
        let chol: Vec<Option<f64>> = median.column("chol").unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(chol[3], Some(110.0));
        assert_eq!(summary.fill_for("chol"), Some(&FillValue::Number(110.0)));

        let (mean, _) = impute(&df, &groups(), NumericFill::Mean).unwrap();
        let chol: Vec<Option<f64>> = mean.column("chol").unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(chol[3], Some(610.0 / 3.0));
    }

    #[test]
    fn categorical_gap_takes_the_mode_and_boolean_gap_is_false() {
        let (clean, summary) = impute(&frame(), &groups(), NumericFill::Mean).unwrap();
        let sex: Vec<Option<&str>> = clean.column("sex").unwrap().utf8().unwrap().into_iter().collect();
        assert_eq!(sex[1], Some("Male"));
        let fbs: Vec<Option<f64>> = clean.column("fbs").unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(fbs[1], Some(0.0));
        assert_eq!(fbs[3], Some(0.0));
        assert_eq!(summary.fills[1].2, 2);
    }

    #[test]
    fn mode_ties_prefer_lexical_order() {
        assert_eq!(most_frequent(vec!["flat", "upsloping", "upsloping", "flat"]), Some("flat"));
        assert_eq!(most_frequent(Vec::<&str>::new()), None);
    }
}
