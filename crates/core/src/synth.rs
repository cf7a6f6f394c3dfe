//! Seeded obstacle-map synthesis with a connectivity guarantee.
//!
//! Each attempt draws a layout from one seed, clears the two endpoints and
//! asks [`reachable`]. A failed attempt is thrown away and the next seed is
//! tried, so the result is a pure function of the spec and the first seed.

mod seed;

use std::error::Error;
use std::fmt;

use log::debug;
use xxhash_rust::xxh3::xxh3_64;

use crate::connectivity::reachable;
use crate::grid::Grid;
use crate::types::{Cell, CellState, Endpoint};

use self::seed::UnitStream;

pub const DEFAULT_MAX_RETRIES: u32 = 10_000;

/// Shape, density and endpoints shared by every attempt of one request.
#[derive(Clone, Debug, PartialEq)]
pub struct MapSpec {
    pub height: usize,
    pub width: usize,
    pub density: f64,
    pub start: Cell,
    pub goal: Cell,
}

impl MapSpec {
    pub fn validate(&self) -> Result<(), SynthesisError> {
        if self.height == 0 || self.width == 0 {
            return Err(SynthesisError::EmptyGrid { height: self.height, width: self.width });
        }
        if self.height.checked_mul(self.width).is_none() {
            return Err(SynthesisError::GridTooLarge { height: self.height, width: self.width });
        }
        if !(0.0..=1.0).contains(&self.density) {
            return Err(SynthesisError::InvalidDensity { density: self.density });
        }
        for (endpoint, cell) in [(Endpoint::Start, self.start), (Endpoint::Goal, self.goal)] {
            if cell.row >= self.height || cell.col >= self.width {
                return Err(SynthesisError::EndpointOutOfBounds {
                    endpoint,
                    cell,
                    height: self.height,
                    width: self.width,
                });
            }
        }
        Ok(())
    }
}

/// A connected layout and the seed that produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedMap {
    /// Obstacle cells in row-major order. Never contains either endpoint.
    pub obstacles: Vec<Cell>,
    pub seed_used: u64,
    /// Seeds tried, including the successful one.
    pub attempts: u32,
}

impl GeneratedMap {
    /// First seed a following request may use without replaying this one.
    pub fn next_seed(&self) -> Option<u64> {
        self.seed_used.checked_add(1)
    }

    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(16 + self.obstacles.len() * 16);
        bytes.extend(self.seed_used.to_le_bytes());
        bytes.extend((self.obstacles.len() as u64).to_le_bytes());
        for cell in &self.obstacles {
            bytes.extend((cell.row as u64).to_le_bytes());
            bytes.extend((cell.col as u64).to_le_bytes());
        }
        bytes
    }

    pub fn fingerprint(&self) -> u64 {
        xxh3_64(&self.canonical_bytes())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SynthesisError {
    /// One of the grid dimensions is zero.
    EmptyGrid { height: usize, width: usize },
    /// `height * width` does not fit in `usize`.
    GridTooLarge { height: usize, width: usize },
    /// Density is NaN or outside `[0, 1]`.
    InvalidDensity { density: f64 },
    EndpointOutOfBounds { endpoint: Endpoint, cell: Cell, height: usize, width: usize },
    ZeroRetryBudget,
    /// No seed in the budget produced a connected layout.
    RetryExhausted { density: f64, attempts: u32, seed_start: u64 },
    /// A previous map used seed `u64::MAX`, so no seed is left to start from.
    SeedSpaceExhausted,
}

impl fmt::Display for SynthesisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyGrid { height, width } => {
                write!(f, "grid dimensions must be positive, got {height}x{width}")
            }
            Self::GridTooLarge { height, width } => {
                write!(f, "a {height}x{width} grid has more cells than can be addressed")
            }
            Self::InvalidDensity { density } => {
                write!(f, "obstacle density {density} is outside [0, 1]")
            }
            Self::EndpointOutOfBounds { endpoint, cell, height, width } => {
                let name = match endpoint {
                    Endpoint::Start => "start",
                    Endpoint::Goal => "goal",
                };
                write!(
                    f,
                    "{name} cell [{}, {}] is outside the {height}x{width} grid",
                    cell.row, cell.col
                )
            }
            Self::ZeroRetryBudget => write!(f, "retry budget must allow at least one attempt"),
            Self::RetryExhausted { density, attempts, seed_start } => write!(
                f,
                "no connected map with density {density} after {attempts} attempts starting at seed {seed_start}"
            ),
            Self::SeedSpaceExhausted => {
                write!(f, "seed space exhausted: no seed follows u64::MAX")
            }
        }
    }
}

impl Error for SynthesisError {}

pub struct MapSynthesizer {
    spec: MapSpec,
    max_retries: u32,
}

impl MapSynthesizer {
    /// Rejects an invalid spec or a zero budget before any attempt.
    pub fn new(spec: MapSpec, max_retries: u32) -> Result<Self, SynthesisError> {
        spec.validate()?;
        if max_retries == 0 {
            return Err(SynthesisError::ZeroRetryBudget);
        }
        Ok(Self { spec, max_retries })
    }

    pub fn spec(&self) -> &MapSpec {
        &self.spec
    }

    /// The layout a single seed produces, endpoints already cleared.
    ///
    /// Every cell consumes one draw in row-major order, endpoints included,
    /// so moving an endpoint never shifts the rest of the layout.
    pub fn layout(&self, seed: u64) -> Grid {
        let mut grid = Grid::new(self.spec.height, self.spec.width);
        let mut stream = UnitStream::new(seed);
        for index in 0..grid.cell_count() {
            if stream.next_unit() < self.spec.density {
                grid.set(grid.cell_at(index), CellState::Obstacle);
            }
        }
        grid.set(self.spec.start, CellState::Free);
        grid.set(self.spec.goal, CellState::Free);
        grid
    }

    pub fn synthesize(&self, seed_start: u64) -> Result<GeneratedMap, SynthesisError> {
        let mut seed = seed_start;
        let mut attempts = 0_u32;
        loop {
            attempts += 1;
            let grid = self.layout(seed);
            if reachable(&grid, self.spec.start, self.spec.goal) {
                return Ok(GeneratedMap { obstacles: grid.obstacles(), seed_used: seed, attempts });
            }
            debug!("seed {seed} left start and goal disconnected (attempt {attempts})");

            if attempts == self.max_retries {
                break;
            }
            let Some(next) = seed.checked_add(1) else {
                break;
            };
            seed = next;
        }

        Err(SynthesisError::RetryExhausted { density: self.spec.density, attempts, seed_start })
    }
}

pub fn synthesize(
    spec: &MapSpec,
    seed_start: u64,
    max_retries: u32,
) -> Result<GeneratedMap, SynthesisError> {
    MapSynthesizer::new(spec.clone(), max_retries)?.synthesize(seed_start)
}
