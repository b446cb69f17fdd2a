//! Building create payloads from CSV and JSON files
//!
//! CSV rows become `{"profile": {...}}` documents: every column is a profile attribute except
//! `id` and `status`, which are ignored, and `password`, which is handled according to the
//! [`PasswordMode`]. Empty cells are left out. JSON files hold either an array of complete
//! payloads or a single one.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::error::{ClientError, ClientResult};

const IGNORED_USER_COLUMNS: &[&str] = &["id", "status"];
const PASSWORD_COLUMN: &str = "password";
const HASH_ALGORITHM: &str = "BCRYPT";
const HASH_WORK_FACTOR: u32 = 10;
const HASH_SALT: &str = "rwh3vH166HCH/NT9XV5FYu";

/// Where imported users' passwords come from
#[derive(Debug, Clone, Default)]
pub enum PasswordMode {
    /// Plain-text `password` column, when present
    #[default]
    FromFile,
    /// The same password for every user
    Default(SecretString),
    /// No credentials; users activate through email
    NoPassword,
    /// Password import inline hook
    ImportHook,
    /// `password` column holds BCRYPT hashes
    Hashed,
}

/// Import file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportFormat {
    Csv,
    Json,
}

impl ImportFormat {
    /// Format implied by the file extension; anything but `.csv` is JSON
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Self::Csv,
            _ => Self::Json,
        }
    }
}

/// User create payloads from a CSV or JSON file
///
/// # Errors
///
/// I/O errors opening the file, CSV or JSON parse errors.
pub fn load_users(path: &Path, mode: &PasswordMode) -> ClientResult<Vec<Value>> {
    let file = File::open(path)?;
    let payloads = match ImportFormat::from_path(path) {
        ImportFormat::Csv => users_from_csv(file, mode)?,
        ImportFormat::Json => records_from_json(file)?,
    };
    debug!(path = %path.display(), count = payloads.len(), "loaded user payloads");
    Ok(payloads)
}

/// Group create payloads from a CSV or JSON file
///
/// # Errors
///
/// I/O errors opening the file, CSV or JSON parse errors.
pub fn load_groups(path: &Path) -> ClientResult<Vec<Value>> {
    let file = File::open(path)?;
    let payloads = match ImportFormat::from_path(path) {
        ImportFormat::Csv => groups_from_csv(file)?,
        ImportFormat::Json => records_from_json(file)?,
    };
    debug!(path = %path.display(), count = payloads.len(), "loaded group payloads");
    Ok(payloads)
}

/// User create payloads from CSV rows
///
/// # Errors
///
/// CSV parse errors.
pub fn users_from_csv<R: Read>(reader: R, mode: &PasswordMode) -> ClientResult<Vec<Value>> {
    let mut csv = csv::Reader::from_reader(reader);
    let headers = csv.headers()?.clone();
    let has_password = headers.iter().any(|h| h == PASSWORD_COLUMN);

    let mut payloads = Vec::new();
    for row in csv.records() {
        let row = row?;
        let mut profile = Map::new();
        let mut password = None;
        for (header, cell) in headers.iter().zip(row.iter()) {
            if IGNORED_USER_COLUMNS.contains(&header) || cell.is_empty() {
                continue;
            }
            if header == PASSWORD_COLUMN {
                password = Some(cell.to_string());
            } else {
                profile.insert(header.to_string(), Value::String(cell.to_string()));
            }
        }

        let credentials = match mode {
            PasswordMode::Default(secret) => Some(json!({ "password": { "value": secret.expose_secret() } })),
            PasswordMode::NoPassword => None,
            PasswordMode::ImportHook => Some(json!({ "password": { "hook": { "type": "default" } } })),
            PasswordMode::Hashed if has_password => password.map(|hash| {
                json!({ "password": { "hash": {
                    "algorithm": HASH_ALGORITHM,
                    "workFactor": HASH_WORK_FACTOR,
                    "salt": HASH_SALT,
                    "value": hash,
                } } })
            }),
            PasswordMode::FromFile | PasswordMode::Hashed => {
                password.map(|value| json!({ "password": { "value": value } }))
            }
        };

        let mut payload = json!({ "profile": profile });
        if let Some(credentials) = credentials {
            payload["credentials"] = credentials;
        }
        payloads.push(payload);
    }
    Ok(payloads)
}

/// Group create payloads from CSV rows; only `name` and `description` are read
///
/// # Errors
///
/// CSV parse errors, or [`ClientError::InvalidInput`] when there is no `name` column.
pub fn groups_from_csv<R: Read>(reader: R) -> ClientResult<Vec<Value>> {
    let mut csv = csv::Reader::from_reader(reader);
    let headers = csv.headers()?.clone();
    let column = |name: &str| headers.iter().position(|h| h == name);
    let name_at = column("name")
        .ok_or_else(|| ClientError::InvalidInput("group CSV files need a 'name' column".into()))?;
    let description_at = column("description");

    let mut payloads = Vec::new();
    for row in csv.records() {
        let row = row?;
        let name = row.get(name_at).unwrap_or_default();
        let description = description_at
            .and_then(|at| row.get(at))
            .unwrap_or_default();
        payloads.push(json!({ "profile": { "name": name, "description": description } }));
    }
    Ok(payloads)
}

/// Payloads from a JSON array or a single JSON object
///
/// # Errors
///
/// JSON parse errors, or [`ClientError::InvalidInput`] for any other top-level value.
pub fn records_from_json<R: Read>(reader: R) -> ClientResult<Vec<Value>> {
    match serde_json::from_reader(reader)? {
        Value::Array(records) => Ok(records),
        object @ Value::Object(_) => Ok(vec![object]),
        _ => Err(ClientError::InvalidInput(
            "JSON import files hold an object or an array of objects".into(),
        )),
    }
}
