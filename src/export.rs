//! Download payloads for a completed form.

use std::fs;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::CaptureError;
use crate::form::FormRecord;

/// File format written on download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Text,
}

impl ExportFormat {
    #[must_use]
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Json => "form_data.json",
            Self::Text => "form_data.txt",
        }
    }
}

/// Render the payload body.
pub fn render(record: &FormRecord, format: ExportFormat) -> Result<String, CaptureError> {
    match format {
        ExportFormat::Json => {
            serde_json::to_string_pretty(record).map_err(|err| CaptureError::Export {
                reason: err.to_string(),
            })
        }
        ExportFormat::Text => Ok(format!(
            "Name: {}\nEmail: {}\nCountry Code: {}\nPhone: {}\n",
            record.name, record.email, record.country_code, record.phone
        )),
    }
}

/// Write the payload into `dir`, replacing any previous download. Returns the file path.
pub fn write_download(
    record: &FormRecord,
    dir: &Path,
    format: ExportFormat,
) -> Result<PathBuf, CaptureError> {
    let body = render(record, format)?;
    fs::create_dir_all(dir).map_err(|err| CaptureError::Export {
        reason: format!("cannot create {}: {err}", dir.display()),
    })?;
    let path = dir.join(format.file_name());
    fs::write(&path, body).map_err(|err| CaptureError::Export {
        reason: format!("cannot write {}: {err}", path.display()),
    })?;
    Ok(path)
}
