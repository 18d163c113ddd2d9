//! Delimited text output for measurement exports.

use crate::db::{Database, MeasurementRow};
use crate::error::{Error, Result};
use crate::provider::ProviderRegistry;
use crate::types::{ProviderId, TaskId};
use std::borrow::Cow;
use std::collections::HashMap;
use std::path::Path;
use tokio::io::{AsyncWriteExt, BufWriter};

/// Column names, in output order
pub const HEADER_FIELDS: [&str; 5] = [
    "JulianDate",
    "Magnitude",
    "MagnitudeError",
    "LightFilter",
    "SourceName",
];

/// Header line (without terminator) for `delimiter`
pub fn header_line(delimiter: &str) -> String {
    HEADER_FIELDS.join(delimiter)
}

/// Quote a field when it would otherwise break the row
pub fn escape_field<'a>(field: &'a str, delimiter: &str) -> Cow<'a, str> {
    if field.contains(delimiter) || field.contains(['"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

/// One measurement as a line (without terminator)
pub fn measurement_line(row: &MeasurementRow, source_name: &str, delimiter: &str) -> String {
    let light_filter = row.light_filter.as_deref().unwrap_or("");
    [
        row.julian_date.to_string(),
        row.magnitude.to_string(),
        row.magnitude_error.to_string(),
        escape_field(light_filter, delimiter).into_owned(),
        escape_field(source_name, delimiter).into_owned(),
    ]
    .join(delimiter)
}

/// A CSV file being filled task by task
pub(crate) struct CsvSink<'a> {
    writer: BufWriter<tokio::fs::File>,
    delimiter: &'a str,
    providers: &'a ProviderRegistry,
    display_names: HashMap<String, String>,
    rows: u64,
}

impl<'a> CsvSink<'a> {
    /// Create the file and write the header
    pub(crate) async fn create(
        path: &Path,
        delimiter: &'a str,
        providers: &'a ProviderRegistry,
    ) -> Result<Self> {
        let file = tokio::fs::File::create(path).await.map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to create '{}': {}", path.display(), e),
            ))
        })?;

        let mut writer = BufWriter::new(file);
        writer.write_all(header_line(delimiter).as_bytes()).await?;
        writer.write_all(b"\n").await?;

        Ok(Self {
            writer,
            delimiter,
            providers,
            display_names: HashMap::new(),
            rows: 0,
        })
    }

    /// Append every measurement of `task_id`, reading `page_size` rows at a time
    pub(crate) async fn append_task(
        &mut self,
        db: &Database,
        task_id: TaskId,
        page_size: u32,
    ) -> Result<u64> {
        let mut after_id = 0i64;
        let mut written = 0u64;

        loop {
            let page = db
                .measurements_after(task_id, after_id, i64::from(page_size))
                .await?;
            let Some(last) = page.last() else {
                break;
            };
            after_id = last.id;

            for row in &page {
                let source_name = self.source_name(&row.provider_id);
                let line = measurement_line(row, &source_name, self.delimiter);
                self.writer.write_all(line.as_bytes()).await?;
                self.writer.write_all(b"\n").await?;
            }
            written += page.len() as u64;

            if page.len() < page_size as usize {
                break;
            }
        }

        self.rows += written;
        Ok(written)
    }

    /// Flush to disk; returns the number of data rows written
    pub(crate) async fn finish(mut self) -> Result<u64> {
        self.writer.flush().await?;
        Ok(self.rows)
    }

    fn source_name(&mut self, provider_id: &str) -> String {
        if let Some(name) = self.display_names.get(provider_id) {
            return name.clone();
        }
        let name = self
            .providers
            .display_name(&ProviderId::from(provider_id));
        self.display_names
            .insert(provider_id.to_string(), name.clone());
        name
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn row(light_filter: Option<&str>) -> MeasurementRow {
        MeasurementRow {
            id: 1,
            task_id: TaskId::new(),
            provider_id: "asas".to_string(),
            julian_date: 2459000.5,
            magnitude: 12.25,
            magnitude_error: 0.03,
            light_filter: light_filter.map(str::to_string),
        }
    }

    #[test]
    fn header_uses_delimiter() {
        assert_eq!(
            header_line(","),
            "JulianDate,Magnitude,MagnitudeError,LightFilter,SourceName"
        );
        assert_eq!(
            header_line(";"),
            "JulianDate;Magnitude;MagnitudeError;LightFilter;SourceName"
        );
    }

    #[test]
    fn plain_fields_are_not_quoted() {
        assert_eq!(escape_field("V", ","), "V");
        assert!(matches!(escape_field("V", ","), Cow::Borrowed(_)));
    }

    #[test]
    fn fields_containing_delimiter_or_quotes_are_quoted() {
        assert_eq!(escape_field("ASAS, SN", ","), "\"ASAS, SN\"");
        assert_eq!(escape_field("say \"hi\"", ","), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_field("a;b", ";"), "\"a;b\"");
        assert_eq!(escape_field("a;b", ","), "a;b");
    }

    #[test]
    fn measurement_line_leaves_missing_filter_empty() {
        assert_eq!(
            measurement_line(&row(None), "ASAS-SN", ","),
            "2459000.5,12.25,0.03,,ASAS-SN"
        );
        assert_eq!(
            measurement_line(&row(Some("g")), "ASAS-SN", "\t"),
            "2459000.5\t12.25\t0.03\tg\tASAS-SN"
        );
    }
}
