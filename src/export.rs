use crate::model::ExtractionResult;
use chrono::{Local, NaiveDate};
use log::info;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// `insert_<date>.sql`
pub fn default_filename(date: NaiveDate) -> String {
    format!("insert_{}.sql", date.format("%Y-%m-%d"))
}

/// Writes `sql` to `dir`, named `filename` or today's default name
pub fn write_sql(dir: &Path, sql: &str, filename: Option<&str>) -> Result<PathBuf, ExportError> {
    let filename = match filename {
        Some(name) => name.to_string(),
        None => default_filename(Local::now().date_naive()),
    };
    let path = dir.join(filename);

    let write = |path: &Path| -> std::io::Result<()> {
        let mut file = File::create(path)?;
        file.write_all(sql.as_bytes())?;
        file.flush()
    };
    write(&path).map_err(|source| ExportError::Io {
        path: path.clone(),
        source,
    })?;

    info!("Wrote {} bytes of SQL to {}", sql.len(), path.display());
    Ok(path)
}

/// Writes the script of a fallback result; data results have nothing to write
pub fn write_extracted_sql(
    dir: &Path,
    result: &ExtractionResult,
    filename: Option<&str>,
) -> Result<Option<PathBuf>, ExportError> {
    match result.sql() {
        Some(sql) => write_sql(dir, sql, filename).map(Some),
        None => Ok(None),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::FallbackReason;
    use std::fs;

    fn fallback(sql: &str) -> ExtractionResult {
        ExtractionResult::Fallback {
            sql: sql.to_string(),
            reason: FallbackReason::NoData,
            message: "no observations found, generated INSERT SQL".to_string(),
        }
    }

    #[test]
    fn test_default_filename() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 9).unwrap();
        assert_eq!("insert_2024-05-09.sql", default_filename(date));
    }

    #[test]
    fn test_write_named_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_sql(dir.path(), "-- 价格\nSELECT 1;", Some("prices.sql")).unwrap();

        assert_eq!(dir.path().join("prices.sql"), path);
        assert_eq!("-- 价格\nSELECT 1;", fs::read_to_string(path).unwrap());
    }

    #[test]
    fn test_write_default_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_sql(dir.path(), "SELECT 1;", None).unwrap();

        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("insert_") && name.ends_with(".sql"), "{}", name);
    }

    #[test]
    fn test_write_extracted_fallback_only() {
        let dir = tempfile::tempdir().unwrap();

        let written = write_extracted_sql(dir.path(), &fallback("INSERT 1;"), Some("a.sql")).unwrap();
        assert_eq!(Some(dir.path().join("a.sql")), written);

        let observation = serde_json::from_str(
            r#"{"id": 1, "metric_name": "price", "obs_date": "2024-01-02", "period_type": null,
                "period_start": null, "period_end": null, "value": 14.5, "raw_value": null,
                "geo_code": null, "tags": {}, "unit": null}"#,
        )
        .unwrap();
        let data = ExtractionResult::Data {
            observations: vec![observation],
            message: "found 1 observations".to_string(),
        };
        assert_eq!(None, write_extracted_sql(dir.path(), &data, Some("b.sql")).unwrap());
        assert!(!dir.path().join("b.sql").exists());
    }

    #[test]
    fn test_missing_directory_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");

        let err = write_sql(&missing, "SELECT 1;", Some("x.sql")).unwrap_err();
        assert!(err.to_string().contains("x.sql"));
    }
}
