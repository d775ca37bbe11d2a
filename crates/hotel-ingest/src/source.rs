//! Streaming access to delimited input files
//!
//! Each call to [`CsvSource::open`] starts a fresh pass from the top of the
//! file. The hotel import relies on this: entity collection and batch loading
//! are two independent traversals.

use csv_async::{AsyncReaderBuilder, StringRecord};
use futures::stream::{BoxStream, StreamExt};
use hotel_common::{ImportError, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::File;
use tracing::debug;

/// Stream of parsed rows, in file order
pub type RecordStream = BoxStream<'static, Result<RawRecord>>;

/// One source line keyed by the header row
#[derive(Debug, Clone)]
pub struct RawRecord {
    headers: Arc<StringRecord>,
    values: StringRecord,
}

impl RawRecord {
    pub fn new(headers: Arc<StringRecord>, values: StringRecord) -> Self {
        Self { headers, values }
    }

    /// Build a record from `(column, value)` pairs.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut headers = StringRecord::new();
        let mut values = StringRecord::new();
        for (column, value) in pairs {
            headers.push_field(column);
            values.push_field(value);
        }
        Self::new(Arc::new(headers), values)
    }

    /// Value of `column`, or `None` when the header or the field is absent
    pub fn get(&self, column: &str) -> Option<&str> {
        let index = self.headers.iter().position(|h| h == column)?;
        self.values.get(index)
    }

    /// 1-based line number in the source file, when known
    pub fn line(&self) -> Option<u64> {
        self.values.position().map(|p| p.line())
    }
}

/// A delimited UTF-8 file with a header row
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
    delimiter: u8,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>, delimiter: u8) -> Self {
        Self {
            path: path.into(),
            delimiter,
        }
    }

    /// Tab separated source (hotel exports)
    pub fn tsv(path: impl Into<PathBuf>) -> Self {
        Self::new(path, b'\t')
    }

    /// Comma separated source (review exports)
    pub fn csv(path: impl Into<PathBuf>) -> Self {
        Self::new(path, b',')
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a new pass over the file.
    pub async fn open(&self) -> Result<RecordStream> {
        let file = File::open(&self.path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ImportError::SourceNotFound(self.path.display().to_string())
            } else {
                ImportError::Io(e)
            }
        })?;

        let mut reader = AsyncReaderBuilder::new()
            .delimiter(self.delimiter)
            .flexible(true)
            .create_reader(file);

        let headers = Arc::new(normalize_headers(reader.headers().await?));
        debug!(
            path = %self.path.display(),
            columns = headers.len(),
            "Opened source"
        );

        let stream = reader.into_records().map(move |row| {
            row.map(|values| RawRecord::new(Arc::clone(&headers), values))
                .map_err(ImportError::from)
        });

        Ok(stream.boxed())
    }
}

/// Trim header names and drop a leading byte order mark.
fn normalize_headers(raw: &StringRecord) -> StringRecord {
    raw.iter()
        .enumerate()
        .map(|(i, h)| {
            let h = if i == 0 { h.trim_start_matches('\u{feff}') } else { h };
            h.trim()
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use std::io::Write;

    #[test]
    fn test_raw_record_lookup() {
        let record = RawRecord::from_pairs([("HotelName", "Grand"), ("ReviewerName", "Ana")]);
        assert_eq!(record.get("HotelName"), Some("Grand"));
        assert_eq!(record.get("ReviewTitle"), None);
    }

    #[test]
    fn test_normalize_headers() {
        let raw = StringRecord::from(vec!["\u{feff}Global Property ID", " Property City Name "]);
        let headers = normalize_headers(&raw);
        assert_eq!(headers.get(0), Some("Global Property ID"));
        assert_eq!(headers.get(1), Some("Property City Name"));
    }

    #[tokio::test]
    async fn test_open_reads_every_pass_from_the_top() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "a\tb").unwrap();
        writeln!(file, "1\t2").unwrap();
        writeln!(file, "3").unwrap();

        let source = CsvSource::tsv(file.path());
        for _ in 0..2 {
            let rows: Vec<RawRecord> = source.open().await.unwrap().try_collect().await.unwrap();
            assert_eq!(rows.len(), 2);
            assert_eq!(rows[0].get("b"), Some("2"));
            // short line: missing trailing column reads as absent
            assert_eq!(rows[1].get("a"), Some("3"));
            assert_eq!(rows[1].get("b"), None);
        }
    }

    #[tokio::test]
    async fn test_open_missing_file() {
        let source = CsvSource::csv("/definitely/not/here.csv");
        let err = source.open().await.err().unwrap();
        assert!(matches!(err, ImportError::SourceNotFound(_)));
    }
}
