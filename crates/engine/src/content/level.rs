use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::world::TileKind;

/// On-disk level record. Field names and the `"x;y"` key format are shared
/// with the external level editor and must not change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelFile {
    pub tilemap: BTreeMap<String, TileRecord>,
    pub tile_size: u32,
    pub offgrid: Vec<OffgridRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TileRecord {
    #[serde(rename = "type")]
    pub kind: TileKind,
    pub variant: u32,
    pub pos: [i32; 2],
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OffgridRecord {
    #[serde(rename = "type")]
    pub kind: TileKind,
    pub variant: u32,
    pub pos: [f64; 2],
}

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("failed to read level file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write level file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse level json at {json_path}: {message}")]
    Parse { json_path: String, message: String },
    #[error("failed to encode level json: {0}")]
    Encode(String),
    #[error("tile key '{key}' is not of the form 'x;y'")]
    InvalidKey { key: String },
    #[error("tile key '{key}' does not match tile pos [{x}, {y}]")]
    KeyMismatch { key: String, x: i32, y: i32 },
    #[error("tile_size must be positive")]
    ZeroTileSize,
}

pub fn format_tile_key(x: i32, y: i32) -> String {
    format!("{x};{y}")
}

pub fn parse_tile_key(key: &str) -> Result<(i32, i32), LevelError> {
    let invalid = || LevelError::InvalidKey {
        key: key.to_string(),
    };
    let (x, y) = key.split_once(';').ok_or_else(invalid)?;
    let x = x.trim().parse::<i32>().map_err(|_| invalid())?;
    let y = y.trim().parse::<i32>().map_err(|_| invalid())?;
    Ok((x, y))
}

pub fn parse_level_json(raw: &str) -> Result<LevelFile, LevelError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize::<_, LevelFile>(&mut deserializer).map_err(|error| {
        let json_path = error.path().to_string();
        LevelError::Parse {
            json_path,
            message: error.into_inner().to_string(),
        }
    })
}

/// Compact encoding, matching what the editor writes.
pub fn encode_level_json(level: &LevelFile) -> Result<String, LevelError> {
    serde_json::to_string(level).map_err(|error| LevelError::Encode(error.to_string()))
}

pub fn read_level(path: &Path) -> Result<LevelFile, LevelError> {
    let raw = fs::read_to_string(path).map_err(|source| LevelError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_level_json(&raw)
}

pub fn write_level(path: &Path, level: &LevelFile) -> Result<(), LevelError> {
    let text = encode_level_json(level)?;
    write_text_atomic(path, &text).map_err(|source| LevelError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn write_text_atomic(path: &Path, text: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("level.json");
    let tmp_path = path.with_file_name(format!("{file_name}.tmp"));
    fs::write(&tmp_path, text)?;

    if let Err(error) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(error);
    }
    Ok(())
}
