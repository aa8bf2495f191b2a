//! CSV export of the user directory.
//!
//! Rows are written to a temporary file in the export directory and streamed
//! back from there. The file is removed once the response body is dropped,
//! whether or not the client read it to the end.

use std::io;
use std::path::Path;

use axum::body::Body;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use chrono::SecondsFormat;
use futures::StreamExt;
use serde::Serialize;
use tempfile::TempPath;
use tokio_util::io::ReaderStream;
use tracing::debug;

use super::error::UserError;
use crate::db::UserRecord;

/// Name offered to the client for the download.
pub const EXPORT_FILENAME: &str = "users_export.csv";

const HEADERS: [&str; 9] = [
    "ID",
    "First Name",
    "Last Name",
    "Email",
    "Mobile",
    "Gender",
    "Status",
    "Location",
    "Created At",
];

/// One CSV line.
#[derive(Debug, Serialize)]
pub struct ExportRow {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub mobile: String,
    pub gender: &'static str,
    pub status: &'static str,
    pub location: String,
    /// ISO-8601 UTC with milliseconds.
    pub created_at: String,
}

impl From<UserRecord> for ExportRow {
    fn from(u: UserRecord) -> Self {
        Self {
            id: u.id.to_string(),
            first_name: u.first_name,
            last_name: u.last_name,
            email: u.email,
            mobile: u.mobile,
            gender: u.gender.as_str(),
            status: u.status.as_str(),
            location: u.location,
            created_at: u.created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// Project records to export rows, preserving order.
pub fn project(records: Vec<UserRecord>) -> impl Iterator<Item = ExportRow> {
    records.into_iter().map(ExportRow::from)
}

/// Write the header and one line per row. Returns the number of rows.
pub fn write_csv<W: io::Write>(
    rows: impl IntoIterator<Item = ExportRow>,
    writer: W,
) -> Result<usize, csv::Error> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    wtr.write_record(HEADERS)?;
    let mut count = 0;
    for row in rows {
        wtr.serialize(row)?;
        count += 1;
    }
    wtr.flush()?;
    Ok(count)
}

/// A finished export waiting to be streamed.
pub struct ExportFile {
    file: tokio::fs::File,
    path: TempPath,
}

impl ExportFile {
    /// Write `records` to a fresh file under `dir`.
    pub async fn create(dir: &Path, records: Vec<UserRecord>) -> Result<Self, UserError> {
        let dir = dir.to_path_buf();
        let (file, path, rows) = tokio::task::spawn_blocking(move || -> io::Result<_> {
            std::fs::create_dir_all(&dir)?;
            let mut tmp = tempfile::Builder::new()
                .prefix("users_export-")
                .suffix(".csv")
                .tempfile_in(&dir)?;
            let rows = write_csv(project(records), tmp.as_file_mut()).map_err(io::Error::other)?;
            let file = tmp.reopen()?;
            Ok((file, tmp.into_temp_path(), rows))
        })
        .await
        .map_err(|e| UserError::Storage(format!("Export task failed: {e}")))?
        .map_err(|e| UserError::Storage(format!("Failed to write export: {e}")))?;

        debug!(path = %path.display(), rows, "Export file written");
        Ok(Self {
            file: tokio::fs::File::from_std(file),
            path,
        })
    }

    #[cfg(test)]
    fn path(&self) -> &Path {
        &self.path
    }

    /// Response body that owns the file; dropping it deletes the file.
    pub fn into_body(self) -> Body {
        let Self { file, path } = self;
        let stream = ReaderStream::new(file).map(move |chunk| {
            let _keep = &path;
            chunk
        });
        Body::from_stream(stream)
    }
}

impl IntoResponse for ExportFile {
    fn into_response(self) -> Response {
        (
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{EXPORT_FILENAME}\""),
                ),
            ],
            self.into_body(),
        )
            .into_response()
    }
}
