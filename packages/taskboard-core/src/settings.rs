/// Wire format of the remote column-settings record and the local cache
/// entries, plus the decoding rules shared by both.
///
/// The server stores `columns_config` and `column_order` as JSON text. Some
/// server versions return them already decoded, so both shapes are accepted.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::normalize::validate_columns;
use crate::types::{ColumnBoard, ColumnMap};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteSettings {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub columns_config: Option<Value>,
    #[serde(default)]
    pub column_order: Option<Value>,
}

/// Body sent on create/update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsPayload {
    pub columns_config: String,
    pub column_order: String,
}

impl SettingsPayload {
    pub fn from_board(board: &ColumnBoard) -> Result<Self, serde_json::Error> {
        Ok(Self {
            columns_config: serde_json::to_string(&board.columns)?,
            column_order: serde_json::to_string(&board.column_order)?,
        })
    }

    pub fn to_remote(&self, id: i64) -> RemoteSettings {
        RemoteSettings {
            id: Some(id),
            columns_config: Some(Value::String(self.columns_config.clone())),
            column_order: Some(Value::String(self.column_order.clone())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// Both fields must be present for the record to be usable.
    #[error("Column settings record is incomplete")]
    Incomplete,

    /// Not parseable as JSON at all. Treated as absence.
    #[error("Malformed column settings JSON: {0}")]
    Malformed(serde_json::Error),

    /// Parseable, but not a valid column map / order. Triggers defaults.
    #[error("Invalid column settings: {0}")]
    Invalid(String),
}

impl From<serde_json::Error> for SettingsError {
    fn from(e: serde_json::Error) -> Self {
        if e.is_data() {
            SettingsError::Invalid(e.to_string())
        } else {
            SettingsError::Malformed(e)
        }
    }
}

fn decode_embedded<T: DeserializeOwned>(value: &Value) -> Result<T, SettingsError> {
    match value {
        Value::String(text) => Ok(serde_json::from_str(text)?),
        other => Ok(serde_json::from_value(other.clone())?),
    }
}

/// Decode a remote record into a board. The order is returned as stored;
/// callers normalize it.
pub fn decode_remote(settings: &RemoteSettings) -> Result<ColumnBoard, SettingsError> {
    let (Some(columns), Some(order)) = (&settings.columns_config, &settings.column_order) else {
        return Err(SettingsError::Incomplete);
    };
    let columns: ColumnMap = decode_embedded(columns)?;
    let column_order: Vec<String> = decode_embedded(order)?;
    validate_columns(&columns).map_err(SettingsError::Invalid)?;
    Ok(ColumnBoard::new(columns, column_order))
}

/// Decode the two local cache entries into a board.
pub fn decode_cached(columns: &str, order: &str) -> Result<ColumnBoard, SettingsError> {
    let columns: ColumnMap = serde_json::from_str(columns)?;
    let column_order: Vec<String> = serde_json::from_str(order)?;
    validate_columns(&columns).map_err(SettingsError::Invalid)?;
    Ok(ColumnBoard::new(columns, column_order))
}
