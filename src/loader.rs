use std::io::{Cursor, Read};
use std::path::Path;
use std::time::Duration;

use lazy_static::lazy_static;
use log::{debug, info, warn};
use polars::prelude::*;

use crate::config::FETCH_TIMEOUT;
use crate::error::{PipelineError, Result};
use crate::records::{ColumnGroups, ColumnKind, DROPPED};

lazy_static! {
    /// Known misspellings in the UCI table: (column, wrong, canonical).
    static ref CATEGORY_FIXES: Vec<(&'static str, &'static str, &'static str)> =
        vec![("thal", "reversable defect", "reversible defect")];
}

/// Read the heart disease CSV from disk and normalize it for `groups`.
pub async fn load_local<P: AsRef<Path>>(path: P, groups: &ColumnGroups) -> Result<DataFrame> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| PipelineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    info!("Loaded {} bytes from {}", bytes.len(), path.display());
    parse_csv(bytes, groups)
}

/// Try the dataset URL first, falling back to the local copy on any failure.
pub async fn load_remote_or_local<P: AsRef<Path>>(
    url: &str,
    path: P,
    groups: &ColumnGroups,
) -> Result<DataFrame> {
    match fetch(url, FETCH_TIMEOUT).await.and_then(|bytes| parse_csv(bytes, groups)) {
        Ok(df) => {
            info!("Loaded dataset from {}", url);
            Ok(df)
        }
        Err(e) => {
            warn!(
                "Could not download dataset ({}). Using local path {}",
                e,
                path.as_ref().display()
            );
            load_local(path, groups).await
        }
    }
}

async fn fetch(url: &str, timeout: Duration) -> Result<Vec<u8>> {
    let owned = url.to_string();
    let fetch_error = |message: String| PipelineError::Fetch {
        url: url.to_string(),
        message,
    };

    tokio::task::spawn_blocking(move || -> std::result::Result<Vec<u8>, String> {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        let response = agent.get(&owned).call().map_err(|e| e.to_string())?;
        let mut bytes = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut bytes)
            .map_err(|e| e.to_string())?;
        Ok(bytes)
    })
    .await
    .map_err(|e| fetch_error(e.to_string()))?
    .map_err(fetch_error)
}

/// Parse raw CSV bytes and apply the column normalization steps.
pub fn parse_csv(bytes: Vec<u8>, groups: &ColumnGroups) -> Result<DataFrame> {
    let df = CsvReader::new(Cursor::new(bytes))
        .has_header(true)
        .infer_schema(None)
        .finish()?;
    normalize(df, groups)
}

fn normalize(mut df: DataFrame, groups: &ColumnGroups) -> Result<DataFrame> {
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.trim().to_string())
        .collect();
    df.set_column_names(names.as_slice())?;

    for column in DROPPED {
        if names.iter().any(|name| name == column) {
            df = df.drop(column)?;
        }
    }

    for column in groups.required() {
        if !df.get_column_names().contains(&column) {
            return Err(PipelineError::MissingColumn {
                column: column.to_string(),
            });
        }
    }

    for (name, kind) in &groups.features {
        let series = match kind {
            ColumnKind::Categorical => df.column(name)?.cast(&DataType::Utf8)?,
            ColumnKind::Numeric => df.column(name)?.cast(&DataType::Float64)?,
            ColumnKind::Boolean => boolean_as_float(df.column(name)?)?,
        };
        df.with_column(series)?;
    }
    let target = df.column(&groups.target)?.cast(&DataType::Float64)?;
    df.with_column(target)?;

    let fixes: Vec<_> = CATEGORY_FIXES
        .iter()
        .filter(|(column, _, _)| {
            groups
                .features
                .iter()
                .any(|(name, kind)| name.as_str() == *column && *kind == ColumnKind::Categorical)
        })
        .collect();
    if !fixes.is_empty() {
        let mut lf = df.lazy();
        for (column, wrong, canonical) in fixes {
            debug!("Rewriting {:?} to {:?} in {}", wrong, canonical, column);
            lf = lf.with_column(
                when(col(column).eq(lit(*wrong)))
                    .then(lit(*canonical))
                    .otherwise(col(column))
                    .alias(column),
            );
        }
        df = lf.collect()?;
    }

    info!("Dataset shape: {:?}", df.shape());
    Ok(df)
}

/// Booleans arrive as polars booleans or as text; both become 0.0/1.0.
fn boolean_as_float(series: &Series) -> Result<Series> {
    let values: Float64Chunked = match series.dtype() {
        DataType::Boolean => series
            .bool()?
            .into_iter()
            .map(|v| v.map(|b| if b { 1.0 } else { 0.0 }))
            .collect(),
        DataType::Utf8 => series
            .utf8()?
            .into_iter()
            .map(|v| v.and_then(parse_flag))
            .collect(),
        _ => series
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|v| v.map(|x| if x != 0.0 { 1.0 } else { 0.0 }))
            .collect(),
    };
    let mut out = values.into_series();
    out.rename(series.name());
    Ok(out)
}

fn parse_flag(text: &str) -> Option<f64> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(1.0),
        "false" | "0" => Some(0.0),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
id , age,sex,dataset,cp,trestbps,chol,fbs,restecg,thalch,exang,oldpeak,slope,ca,thal,num
1,63,Male,Cleveland,typical angina,145,233,TRUE,lv hypertrophy,150,FALSE,2.3,downsloping,0,fixed defect,0
2,67,Male,Cleveland,asymptomatic,160,,FALSE,lv hypertrophy,108,TRUE,1.5,flat,3,normal,2
3,37,Female,Hungary,non-anginal,130,250,,normal,187,FALSE,3.5,,,reversable defect,1
";

    #[test]
    fn parse_trims_drops_and_fixes_spelling() {
        let df = parse_csv(SAMPLE.as_bytes().to_vec(), &ColumnGroups::ensemble()).unwrap();
        let names = df.get_column_names();
        assert!(!names.contains(&"id"));
        assert!(!names.contains(&"dataset"));
        assert!(names.contains(&"age"));

        let thal: Vec<Option<&str>> = df.column("thal").unwrap().utf8().unwrap().into_iter().collect();
        assert_eq!(thal[2], Some("reversible defect"));
        assert_eq!(thal[0], Some("fixed defect"));
    }

    #[test]
    fn booleans_become_floats_with_gaps() {
        let df = parse_csv(SAMPLE.as_bytes().to_vec(), &ColumnGroups::ensemble()).unwrap();
        let fbs: Vec<Option<f64>> = df.column("fbs").unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(fbs, vec![Some(1.0), Some(0.0), None]);
    }

    #[test]
    fn missing_required_column_is_reported() {
        let csv = "age,sex,num\n50,Male,0\n";
        let err = parse_csv(csv.as_bytes().to_vec(), &ColumnGroups::boosted()).unwrap_err();
        assert!(matches!(err, PipelineError::MissingColumn { .. }));
    }

    #[test]
    fn parse_flag_accepts_common_spellings() {
        assert_eq!(parse_flag("TRUE"), Some(1.0));
        assert_eq!(parse_flag(" false "), Some(0.0));
        assert_eq!(parse_flag("1"), Some(1.0));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[tokio::test]
    async fn stalled_download_times_out() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/heart.csv", listener.local_addr().unwrap());
        // accept and hold the connection without ever answering
        let server = std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            std::thread::sleep(Duration::from_secs(2));
            drop(stream);
        });

        let started = std::time::Instant::now();
        let err = fetch(&url, Duration::from_millis(200)).await.unwrap_err();
        assert!(matches!(err, PipelineError::Fetch { .. }));
        assert!(started.elapsed() < Duration::from_secs(2));
        server.join().unwrap();
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let err = load_local("does/not/exist.csv", &ColumnGroups::ensemble())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Io { .. }));
    }
}
