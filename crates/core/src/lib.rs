pub mod batch;
pub mod connectivity;
pub mod grid;
pub mod map_file;
pub mod synth;
pub mod types;

pub use batch::{AbortPolicy, BatchError, BatchItem, BatchPlan, DensityTask, write_batch};
pub use connectivity::reachable;
pub use grid::Grid;
pub use map_file::{Manifest, MapFileError, MapRecord};
pub use synth::{
    DEFAULT_MAX_RETRIES, GeneratedMap, MapSpec, MapSynthesizer, SynthesisError, synthesize,
};
pub use types::*;
