//! JSON map files and the batch manifest.
//!
//! One pretty-printed JSON object per map, two-space indented, fields in the
//! order `height`, `width`, `obstacle_density`, `seed`, `start`, `goal`,
//! `obstacles`. Coordinates are `[row, col]` pairs.
//!
//! Writers return the SHA-256 of the exact bytes written so a batch can
//! record them in `manifest.json` and later runs can be checked for byte
//! identity.

use std::error::Error;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::connectivity::reachable;
use crate::grid::Grid;
use crate::synth::{GeneratedMap, MapSpec};
use crate::types::Cell;

pub const MANIFEST_FILE_NAME: &str = "manifest.json";

// ---------------------------------------------------------------------------
// Map record
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MapRecord {
    pub height: usize,
    pub width: usize,
    /// Requested density, not the realized obstacle fraction.
    pub obstacle_density: f64,
    /// Seed that produced this exact layout.
    pub seed: u64,
    pub start: Cell,
    pub goal: Cell,
    pub obstacles: Vec<Cell>,
}

impl MapRecord {
    pub fn new(spec: &MapSpec, generated: &GeneratedMap) -> Self {
        Self {
            height: spec.height,
            width: spec.width,
            obstacle_density: spec.density,
            seed: generated.seed_used,
            start: spec.start,
            goal: spec.goal,
            obstacles: generated.obstacles.clone(),
        }
    }

    pub fn spec(&self) -> MapSpec {
        MapSpec {
            height: self.height,
            width: self.width,
            density: self.obstacle_density,
            start: self.start,
            goal: self.goal,
        }
    }

    /// Rebuilds the grid, rejecting shapes and coordinates that cannot
    /// belong to it.
    pub fn to_grid(&self) -> Result<Grid, MapFileError> {
        if self.height == 0 || self.width == 0 {
            return Err(MapFileError::EmptyGrid { height: self.height, width: self.width });
        }
        if self.height.checked_mul(self.width).is_none() {
            return Err(MapFileError::GridTooLarge { height: self.height, width: self.width });
        }
        for cell in [self.start, self.goal] {
            if cell.row >= self.height || cell.col >= self.width {
                return Err(MapFileError::EndpointOutOfBounds { cell });
            }
        }
        Grid::from_obstacles(self.height, self.width, &self.obstacles)
            .map_err(|cell| MapFileError::ObstacleOutOfBounds { cell })
    }

    /// Whether the stored layout still joins start and goal.
    pub fn is_connected(&self) -> Result<bool, MapFileError> {
        let grid = self.to_grid()?;
        Ok(reachable(&grid, self.start, self.goal))
    }

    pub fn to_json_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
    }
}

/// `0.25 -> "0p25"`, `0.4 -> "0p4"`, `1.0 -> "1p0"`.
pub fn density_label(density: f64) -> String {
    let mut text = density.to_string();
    if !text.contains('.') {
        text.push_str(".0");
    }
    text.replace('.', "p")
}

pub fn map_file_name(density: f64, index: usize) -> String {
    format!("map_den{}_id{index}.json", density_label(density))
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    format!("{digest:064x}")
}

/// Writes one map file, creating parent directories, and returns the
/// SHA-256 of the bytes written.
pub fn write_map_file(path: &Path, record: &MapRecord) -> io::Result<String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let bytes = record.to_json_bytes().map_err(io::Error::other)?;
    fs::write(path, &bytes)?;
    Ok(sha256_hex(&bytes))
}

pub fn load_map_file(path: &Path) -> Result<MapRecord, MapFileError> {
    let content = fs::read_to_string(path).map_err(MapFileError::Io)?;
    serde_json::from_str(&content)
        .map_err(|e| MapFileError::InvalidJson { message: e.to_string() })
}

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Manifest {
    pub base_seed: u64,
    /// Seed the next map would have started from; `None` once the seed
    /// space is used up.
    pub next_seed: Option<u64>,
    pub maps: Vec<ManifestEntry>,
    #[serde(default)]
    pub aborted_tasks: Vec<AbortedTaskEntry>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ManifestEntry {
    pub file: String,
    pub density: f64,
    pub seed: u64,
    pub obstacle_count: usize,
    pub sha256: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AbortedTaskEntry {
    pub density: f64,
    pub requested: usize,
    pub generated: usize,
    pub reason: String,
}

pub fn write_manifest(dir: &Path, manifest: &Manifest) -> io::Result<()> {
    fs::create_dir_all(dir)?;
    let bytes = serde_json::to_vec_pretty(manifest).map_err(io::Error::other)?;
    fs::write(dir.join(MANIFEST_FILE_NAME), bytes)
}

pub fn load_manifest(path: &Path) -> Result<Manifest, MapFileError> {
    let content = fs::read_to_string(path).map_err(MapFileError::Io)?;
    serde_json::from_str(&content)
        .map_err(|e| MapFileError::InvalidJson { message: e.to_string() })
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum MapFileError {
    Io(io::Error),
    /// The file is not a well-formed record.
    InvalidJson { message: String },
    EmptyGrid { height: usize, width: usize },
    GridTooLarge { height: usize, width: usize },
    EndpointOutOfBounds { cell: Cell },
    ObstacleOutOfBounds { cell: Cell },
}

impl fmt::Display for MapFileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "map file I/O error: {e}"),
            Self::InvalidJson { message } => write!(f, "invalid map JSON: {message}"),
            Self::EmptyGrid { height, width } => {
                write!(f, "map has an empty {height}x{width} grid")
            }
            Self::GridTooLarge { height, width } => {
                write!(f, "map grid {height}x{width} has more cells than can be addressed")
            }
            Self::EndpointOutOfBounds { cell } => {
                write!(f, "endpoint [{}, {}] lies outside the grid", cell.row, cell.col)
            }
            Self::ObstacleOutOfBounds { cell } => {
                write!(f, "obstacle [{}, {}] lies outside the grid", cell.row, cell.col)
            }
        }
    }
}

impl Error for MapFileError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}
