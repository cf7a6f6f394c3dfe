//! TOML batch plan files. Every key is optional; missing keys fall back to
//! the reference batch (50x50, corner to corner, base seed 2025).

use anyhow::{Context, Result, bail};
use gridbench::{BatchPlan, Cell, DensityTask};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PlanFile {
    pub height: Option<usize>,
    pub width: Option<usize>,
    pub start: Option<[usize; 2]>,
    pub goal: Option<[usize; 2]>,
    pub base_seed: Option<u64>,
    pub max_retries: Option<u32>,
    pub tasks: Option<Vec<TaskEntry>>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct TaskEntry {
    pub density: f64,
    pub count: usize,
}

impl PlanFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read plan file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse plan file: {}", path.display()))
    }

    /// Resolves against the defaults. The goal defaults to the bottom-right
    /// corner of whatever size the file asks for.
    pub fn into_plan(self) -> Result<BatchPlan> {
        let defaults = BatchPlan::default();
        let height = self.height.unwrap_or(defaults.height);
        let width = self.width.unwrap_or(defaults.width);
        if height == 0 || width == 0 {
            bail!("plan dimensions must be positive, got {height}x{width}");
        }

        Ok(BatchPlan {
            height,
            width,
            start: self.start.map_or(defaults.start, Cell::from),
            goal: self.goal.map_or(Cell::new(height - 1, width - 1), Cell::from),
            base_seed: self.base_seed.unwrap_or(defaults.base_seed),
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            tasks: match self.tasks {
                Some(tasks) => tasks
                    .into_iter()
                    .map(|task| DensityTask { density: task.density, count: task.count })
                    .collect(),
                None => defaults.tasks,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_resolves_to_reference_batch() {
        let plan: PlanFile = toml::from_str("").expect("empty TOML is a valid plan");
        assert_eq!(plan.into_plan().expect("defaults are valid"), BatchPlan::default());
    }

    #[test]
    fn goal_follows_overridden_dimensions() {
        let plan: PlanFile = toml::from_str("height = 12\nwidth = 30\n").expect("valid TOML");
        let plan = plan.into_plan().expect("valid plan");
        assert_eq!(plan.goal, Cell::new(11, 29));
        assert_eq!(plan.start, Cell::new(0, 0));
    }

    #[test]
    fn explicit_tasks_replace_the_defaults() {
        let source = r#"
            base_seed = 7
            start = [1, 2]
            goal = [3, 4]

            [[tasks]]
            density = 0.15
            count = 3
        "#;
        let plan: PlanFile = toml::from_str(source).expect("valid TOML");
        let plan = plan.into_plan().expect("valid plan");
        assert_eq!(plan.base_seed, 7);
        assert_eq!(plan.start, Cell::new(1, 2));
        assert_eq!(plan.goal, Cell::new(3, 4));
        assert_eq!(plan.tasks, vec![DensityTask { density: 0.15, count: 3 }]);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result: Result<PlanFile, _> = toml::from_str("densty = 0.2\n");
        assert!(result.is_err(), "typos should not be silently ignored");
    }

    #[test]
    fn zero_dimension_is_rejected() {
        let plan: PlanFile = toml::from_str("height = 0\n").expect("valid TOML");
        let err = plan.into_plan().expect_err("0 rows cannot hold a map");
        assert!(err.to_string().contains("positive"), "unexpected error: {err}");
    }
}
