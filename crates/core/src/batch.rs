//! Sequential batch generation over a list of density tasks.
//!
//! The seed counter is threaded through [`BatchMaps`]: each map starts at the
//! counter and the counter then moves one past the seed that succeeded, so
//! no seed is reused across maps even when retries happened. A task whose
//! retry budget runs out is abandoned and the counter is left where it was
//! for the next task. Once a map has used `u64::MAX` no seed is left, and
//! every map still pending is reported as an aborted task.

use std::error::Error;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::map_file::{
    AbortedTaskEntry, Manifest, ManifestEntry, MapRecord, map_file_name, write_manifest,
    write_map_file,
};
use crate::synth::{DEFAULT_MAX_RETRIES, MapSpec, MapSynthesizer, SynthesisError};
use crate::types::Cell;

#[derive(Clone, Debug, PartialEq)]
pub struct DensityTask {
    pub density: f64,
    pub count: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BatchPlan {
    pub height: usize,
    pub width: usize,
    pub start: Cell,
    pub goal: Cell,
    pub base_seed: u64,
    pub max_retries: u32,
    pub tasks: Vec<DensityTask>,
}

impl Default for BatchPlan {
    fn default() -> Self {
        Self {
            height: 50,
            width: 50,
            start: Cell::new(0, 0),
            goal: Cell::new(49, 49),
            base_seed: 2025,
            max_retries: DEFAULT_MAX_RETRIES,
            tasks: vec![
                DensityTask { density: 0.10, count: 10 },
                DensityTask { density: 0.25, count: 20 },
                DensityTask { density: 0.40, count: 20 },
            ],
        }
    }
}

impl BatchPlan {
    pub fn spec_for(&self, density: f64) -> MapSpec {
        MapSpec {
            height: self.height,
            width: self.width,
            density,
            start: self.start,
            goal: self.goal,
        }
    }

    /// Iterates the plan's maps in generation order. Every task is validated
    /// before the first map is drawn.
    pub fn maps(&self) -> Result<BatchMaps<'_>, SynthesisError> {
        let synthesizers = self
            .tasks
            .iter()
            .map(|task| MapSynthesizer::new(self.spec_for(task.density), self.max_retries))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(BatchMaps {
            plan: self,
            synthesizers,
            task_index: 0,
            index_in_task: 0,
            next_seed: Some(self.base_seed),
        })
    }
}

/// One generated map with its place in the batch.
#[derive(Clone, Debug, PartialEq)]
pub struct PlannedMap {
    pub task_index: usize,
    pub index_in_task: usize,
    pub file_name: String,
    pub record: MapRecord,
    pub attempts: u32,
    /// xxh3 of the generated layout, for log lines and run comparisons.
    pub fingerprint: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AbortedTask {
    pub task_index: usize,
    pub density: f64,
    pub requested: usize,
    /// Maps of this task produced before it stopped.
    pub generated: usize,
    pub error: SynthesisError,
}

#[derive(Clone, Debug, PartialEq)]
pub enum BatchItem {
    Map(PlannedMap),
    Aborted(AbortedTask),
}

impl BatchItem {
    pub fn task_index(&self) -> usize {
        match self {
            Self::Map(planned) => planned.task_index,
            Self::Aborted(task) => task.task_index,
        }
    }
}

pub struct BatchMaps<'a> {
    plan: &'a BatchPlan,
    synthesizers: Vec<MapSynthesizer>,
    task_index: usize,
    index_in_task: usize,
    next_seed: Option<u64>,
}

impl BatchMaps<'_> {
    /// Seed the next request will start from. `None` once the last map used
    /// `u64::MAX`.
    pub fn next_seed(&self) -> Option<u64> {
        self.next_seed
    }

    fn finish_task(&mut self) {
        self.task_index += 1;
        self.index_in_task = 0;
    }

    fn abort_task(&mut self, density: f64, requested: usize, error: SynthesisError) -> BatchItem {
        let aborted = AbortedTask {
            task_index: self.task_index,
            density,
            requested,
            generated: self.index_in_task,
            error,
        };
        self.finish_task();
        BatchItem::Aborted(aborted)
    }
}

impl Iterator for BatchMaps<'_> {
    type Item = BatchItem;

    fn next(&mut self) -> Option<BatchItem> {
        let plan = self.plan;
        loop {
            let task = plan.tasks.get(self.task_index)?;
            if self.index_in_task >= task.count {
                self.finish_task();
                continue;
            }
            // Every pending task is reported once the seed space is used up.
            let Some(seed) = self.next_seed else {
                return Some(self.abort_task(
                    task.density,
                    task.count,
                    SynthesisError::SeedSpaceExhausted,
                ));
            };
            let synthesizer = &self.synthesizers[self.task_index];

            return match synthesizer.synthesize(seed) {
                Ok(generated) => {
                    let planned = PlannedMap {
                        task_index: self.task_index,
                        index_in_task: self.index_in_task,
                        file_name: map_file_name(task.density, self.index_in_task),
                        record: MapRecord::new(synthesizer.spec(), &generated),
                        attempts: generated.attempts,
                        fingerprint: generated.fingerprint(),
                    };
                    self.next_seed = generated.next_seed();
                    self.index_in_task += 1;
                    Some(BatchItem::Map(planned))
                }
                Err(error) => Some(self.abort_task(task.density, task.count, error)),
            };
        }
    }
}

/// What a batch does when one task exhausts its retry budget.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AbortPolicy {
    /// Log it, skip the rest of that task and carry on with later tasks.
    #[default]
    SkipTask,
    /// Stop the whole batch with an error.
    FailFast,
}

#[derive(Debug)]
pub enum BatchError {
    /// The plan failed validation; nothing was written.
    Plan(SynthesisError),
    /// A task stopped early under [`AbortPolicy::FailFast`].
    TaskAborted(AbortedTask),
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plan(e) => write!(f, "invalid batch plan: {e}"),
            Self::TaskAborted(task) => write!(
                f,
                "task {} (density {}) aborted after {} of {} maps: {}",
                task.task_index, task.density, task.generated, task.requested, task.error
            ),
            Self::Io { path, source } => write!(f, "failed to write {}: {source}", path.display()),
        }
    }
}

impl Error for BatchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Plan(e) => Some(e),
            Self::TaskAborted(task) => Some(&task.error),
            Self::Io { source, .. } => Some(source),
        }
    }
}

/// Generates every map of `plan` into `output_dir`, then writes the
/// manifest. Files are written as soon as each map is accepted.
pub fn write_batch(
    plan: &BatchPlan,
    output_dir: &Path,
    policy: AbortPolicy,
) -> Result<Manifest, BatchError> {
    let mut maps = plan.maps().map_err(BatchError::Plan)?;

    if !output_dir.exists() {
        info!("creating output directory {}", output_dir.display());
        fs::create_dir_all(output_dir)
            .map_err(|source| BatchError::Io { path: output_dir.to_path_buf(), source })?;
    }

    let mut entries = Vec::new();
    let mut aborted_tasks = Vec::new();
    let mut announced_task = None;

    for item in maps.by_ref() {
        if announced_task != Some(item.task_index()) {
            let task = &plan.tasks[item.task_index()];
            info!("generating {} maps at density {}", task.count, task.density);
            announced_task = Some(item.task_index());
        }

        match item {
            BatchItem::Map(planned) => {
                let path = output_dir.join(&planned.file_name);
                let sha256 = write_map_file(&path, &planned.record)
                    .map_err(|source| BatchError::Io { path: path.clone(), source })?;
                info!(
                    "wrote {} (seed {}, {} obstacles, {} attempts, layout {:016x})",
                    planned.file_name,
                    planned.record.seed,
                    planned.record.obstacles.len(),
                    planned.attempts,
                    planned.fingerprint
                );
                entries.push(ManifestEntry {
                    file: planned.file_name,
                    density: planned.record.obstacle_density,
                    seed: planned.record.seed,
                    obstacle_count: planned.record.obstacles.len(),
                    sha256,
                });
            }
            BatchItem::Aborted(task) => {
                warn!("{}", task.error);
                if policy == AbortPolicy::FailFast {
                    return Err(BatchError::TaskAborted(task));
                }
                warn!(
                    "skipping the remaining {} maps at density {}",
                    task.requested - task.generated,
                    task.density
                );
                aborted_tasks.push(AbortedTaskEntry {
                    density: task.density,
                    requested: task.requested,
                    generated: task.generated,
                    reason: task.error.to_string(),
                });
            }
        }
    }

    let manifest = Manifest {
        base_seed: plan.base_seed,
        next_seed: maps.next_seed(),
        maps: entries,
        aborted_tasks,
    };
    write_manifest(output_dir, &manifest)
        .map_err(|source| BatchError::Io { path: output_dir.to_path_buf(), source })?;
    info!("{} maps written to {}", manifest.maps.len(), output_dir.display());

    Ok(manifest)
}
