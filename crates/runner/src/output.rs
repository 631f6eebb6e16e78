//! Output writer: CSV files, sidecars, and the run manifest.
//!
//! CSV files are UTF-8 with a byte-order mark and CRLF line endings so they
//! open cleanly in spreadsheet tools. Every file written here lands in the
//! run directory the writer was created for.

use std::path::{Path, PathBuf};

use harvest_core::hashing::sha256_hex;
use harvest_core::provenance::{serialize_record, sidecar_path, FileRecord, RunManifest, MANIFEST_FILE};
use harvest_core::types::NormalizedRow;
use serde_json::Value;

/// UTF-8 byte-order mark written at the start of every CSV.
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("Could not write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV encoding failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// A CSV file as written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFile {
    pub path: PathBuf,
    pub sha256: String,
}

/// Writes the files of one run into its directory.
#[derive(Debug, Clone)]
pub struct OutputWriter {
    dir: PathBuf,
}

impl OutputWriter {
    /// Create the run directory (and parents) if needed.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self, OutputError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| OutputError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `rows` under `file_name` with `fields` as the header.
    ///
    /// Missing fields are written as empty cells. An empty `fields` list
    /// produces a file holding only an empty header line.
    pub fn write_csv(
        &self,
        file_name: &str,
        fields: &[String],
        rows: &[NormalizedRow],
    ) -> Result<WrittenFile, OutputError> {
        let bytes = encode_csv(fields, rows)?;
        let path = self.dir.join(file_name);
        write_file(&path, &bytes)?;
        Ok(WrittenFile {
            path,
            sha256: sha256_hex(&bytes),
        })
    }

    /// Write `<file>.meta.json` next to the file the record describes.
    pub fn write_sidecar(&self, record: &FileRecord) -> Result<PathBuf, OutputError> {
        let path = PathBuf::from(sidecar_path(&record.file_path));
        let json = serialize_record(record)?;
        write_file(&path, json.as_bytes())?;
        Ok(path)
    }

    /// Write `run_manifest.json` into the run directory.
    pub fn write_manifest(&self, manifest: &RunManifest) -> Result<PathBuf, OutputError> {
        let path = self.dir.join(MANIFEST_FILE);
        let json = serialize_record(manifest)?;
        write_file(&path, json.as_bytes())?;
        Ok(path)
    }
}

// ---- private helpers ----

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), OutputError> {
    std::fs::write(path, bytes).map_err(|source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn encode_csv(fields: &[String], rows: &[NormalizedRow]) -> Result<Vec<u8>, OutputError> {
    let mut buf = UTF8_BOM.to_vec();
    if fields.is_empty() {
        buf.extend_from_slice(b"\r\n");
        return Ok(buf);
    }

    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(buf);
    writer.write_record(fields)?;
    for row in rows {
        writer.write_record(fields.iter().map(|f| cell_text(row.get(f))))?;
    }
    writer
        .into_inner()
        .map_err(|e| OutputError::Csv(csv::Error::from(e.into_error())))
}

/// Text of one cell; booleans use the `True`/`False` spelling.
fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(true)) => "True".to_string(),
        Some(Value::Bool(false)) => "False".to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
