use anyhow::{Context, Result, bail};
use clap::Parser;
use env_logger::{Builder, Env};
use gridbench::map_file::{MANIFEST_FILE_NAME, load_manifest, load_map_file, sha256_hex};
use gridbench::{MapSynthesizer, reachable};
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// Re-checks a directory of generated maps: connectivity, seed
/// reproduction and manifest hashes.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding map_*.json files
    #[arg(short, long, default_value = "maps")]
    dir: PathBuf,
}

fn map_paths(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in
        fs::read_dir(dir).with_context(|| format!("Failed to list {}", dir.display()))?
    {
        let path = entry?.path();
        let is_map = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with("map_") && name.ends_with(".json"));
        if is_map {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Checks one map file, returning the fingerprint of its layout or a
/// description of the first problem found.
fn check_map(path: &Path) -> Result<u64, String> {
    let record = load_map_file(path).map_err(|e| e.to_string())?;
    let grid = record.to_grid().map_err(|e| e.to_string())?;
    if !grid.is_free(record.start) || !grid.is_free(record.goal) {
        return Err("start or goal is listed as an obstacle".to_string());
    }
    if !reachable(&grid, record.start, record.goal) {
        return Err("start and goal are not connected".to_string());
    }

    let synthesizer = MapSynthesizer::new(record.spec(), 1).map_err(|e| e.to_string())?;
    let layout = synthesizer.layout(record.seed);
    let mut stored = record.obstacles.clone();
    stored.sort();
    if layout.obstacles() != stored {
        return Err(format!("seed {} does not reproduce the stored obstacles", record.seed));
    }
    Ok(layout.fingerprint())
}

fn check_manifest(dir: &Path) -> Result<Vec<String>> {
    let path = dir.join(MANIFEST_FILE_NAME);
    if !path.exists() {
        warn!("no {MANIFEST_FILE_NAME} in {}, skipping hash checks", dir.display());
        return Ok(Vec::new());
    }
    let manifest = load_manifest(&path)
        .with_context(|| format!("Failed to load manifest: {}", path.display()))?;

    let mut failures = Vec::new();
    for entry in &manifest.maps {
        match fs::read(dir.join(&entry.file)) {
            Ok(bytes) if sha256_hex(&bytes) == entry.sha256 => {}
            Ok(_) => failures.push(format!("{}: SHA-256 differs from manifest", entry.file)),
            Err(e) => failures.push(format!("{}: {e}", entry.file)),
        }
    }
    Ok(failures)
}

fn verify_dir(dir: &Path) -> Result<usize> {
    let paths = map_paths(dir)?;
    let mut failures = Vec::new();
    for path in &paths {
        let name = path.display();
        match check_map(path) {
            Ok(fingerprint) => info!("ok {name} (layout {fingerprint:016x})"),
            Err(problem) => failures.push(format!("{name}: {problem}")),
        }
    }
    failures.extend(check_manifest(dir)?);

    if !failures.is_empty() {
        bail!("{} problem(s) found:\n{}", failures.len(), failures.join("\n"));
    }
    Ok(paths.len())
}

fn main() -> Result<()> {
    Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let checked = verify_dir(&args.dir)?;
    info!("{checked} maps verified in {}", args.dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridbench::batch::{AbortPolicy, BatchPlan, DensityTask, write_batch};
    use gridbench::map_file::write_map_file;
    use gridbench::{Cell, MapRecord};
    use tempfile::tempdir;

    fn small_plan() -> BatchPlan {
        BatchPlan {
            height: 12,
            width: 12,
            start: Cell::new(0, 0),
            goal: Cell::new(11, 11),
            base_seed: 31,
            max_retries: 1_000,
            tasks: vec![DensityTask { density: 0.3, count: 3 }],
        }
    }

    #[test]
    fn accepts_a_freshly_generated_batch() {
        let dir = tempdir().unwrap();
        write_batch(&small_plan(), dir.path(), AbortPolicy::SkipTask).unwrap();
        assert_eq!(verify_dir(dir.path()).unwrap(), 3);
    }

    #[test]
    fn rejects_an_edited_obstacle_list() {
        let dir = tempdir().unwrap();
        write_batch(&small_plan(), dir.path(), AbortPolicy::SkipTask).unwrap();

        let path = dir.path().join("map_den0p3_id1.json");
        let mut record: MapRecord = load_map_file(&path).unwrap();
        record.obstacles.pop();
        write_map_file(&path, &record).unwrap();

        let err = verify_dir(dir.path()).unwrap_err().to_string();
        assert!(err.contains("does not reproduce"), "unexpected error: {err}");
        assert!(err.contains("SHA-256"), "manifest hash should also flag the edit: {err}");
    }

    #[test]
    fn rejects_a_disconnected_map() {
        let dir = tempdir().unwrap();
        let record = MapRecord {
            height: 2,
            width: 2,
            obstacle_density: 0.5,
            seed: 1,
            start: Cell::new(0, 0),
            goal: Cell::new(1, 1),
            obstacles: vec![Cell::new(0, 1), Cell::new(1, 0)],
        };
        write_map_file(&dir.path().join("map_den0p5_id0.json"), &record).unwrap();

        let err = verify_dir(dir.path()).unwrap_err().to_string();
        assert!(err.contains("not connected"), "unexpected error: {err}");
    }

    #[test]
    fn reports_the_layout_fingerprint_of_a_good_map() {
        let dir = tempdir().unwrap();
        let plan = small_plan();
        let manifest = write_batch(&plan, dir.path(), AbortPolicy::SkipTask).unwrap();
        let first = &manifest.maps[0];

        let record = load_map_file(&dir.path().join(&first.file)).unwrap();
        let expected = record.to_grid().unwrap().fingerprint();
        assert_eq!(check_map(&dir.path().join(&first.file)), Ok(expected));
    }

    #[test]
    fn rejects_a_map_too_large_to_address() {
        let dir = tempdir().unwrap();
        let record = MapRecord {
            height: usize::MAX / 2,
            width: 3,
            obstacle_density: 0.0,
            seed: 1,
            start: Cell::new(0, 0),
            goal: Cell::new(0, 1),
            obstacles: Vec::new(),
        };
        write_map_file(&dir.path().join("map_den0p0_id0.json"), &record).unwrap();

        let err = verify_dir(dir.path()).unwrap_err().to_string();
        assert!(err.contains("more cells than can be addressed"), "unexpected error: {err}");
    }

    #[test]
    fn ignores_files_that_are_not_maps() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), "scratch").unwrap();
        assert_eq!(map_paths(dir.path()).unwrap(), Vec::<PathBuf>::new());
    }
}
