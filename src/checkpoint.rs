//! Snapshot naming and persistence
//!
//! Every parameter file a run produces lives under one run directory:
//!
//! ```text
//! <run_dir>/
//!     opponents/opponent_<slot>.ot
//!     checkpoints/<update:05>.ot
//!     highscore_model.ot
//!     final_model.ot
//!     progress.jsonl
//! ```
//!
//! Saves go through a temporary file and a rename so a reader never sees a
//! half-written snapshot.

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::policy::ParameterStore;

const EXTENSION: &str = "ot";

/// Identifies one persisted parameter set within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapshotId {
    /// Opponent pool slot
    Opponent(usize),
    /// Numbered checkpoint taken at an update
    Checkpoint(usize),
    /// Best rolling reward so far (single-agent runs)
    Highscore,
    /// Parameters at the end of the run
    Final,
}

impl SnapshotId {
    /// Path relative to the run directory
    pub fn relative_path(&self) -> PathBuf {
        match self {
            SnapshotId::Opponent(slot) => {
                Path::new("opponents").join(format!("opponent_{slot}.{EXTENSION}"))
            }
            SnapshotId::Checkpoint(update) => {
                Path::new("checkpoints").join(format!("{update:05}.{EXTENSION}"))
            }
            SnapshotId::Highscore => PathBuf::from(format!("highscore_model.{EXTENSION}")),
            SnapshotId::Final => PathBuf::from(format!("final_model.{EXTENSION}")),
        }
    }
}

/// Root directory of one training run
#[derive(Debug, Clone)]
pub struct SnapshotDir {
    root: PathBuf,
}

impl SnapshotDir {
    /// Use `root` as the run directory, creating it if needed
    pub fn create(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .with_context(|| format!("failed to create run directory {}", root.display()))?;
        Ok(Self { root })
    }

    /// The run directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of a snapshot
    pub fn path(&self, id: SnapshotId) -> PathBuf {
        self.root.join(id.relative_path())
    }

    /// Whether a snapshot has been written
    pub fn exists(&self, id: SnapshotId) -> bool {
        self.path(id).is_file()
    }

    /// Write `model`'s parameters under `id`, replacing any previous file
    pub fn save<M: ParameterStore + ?Sized>(&self, id: SnapshotId, model: &M) -> Result<PathBuf> {
        let path = self.path(id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let partial = path.with_extension(format!("{EXTENSION}.partial"));
        model
            .save(&partial)
            .with_context(|| format!("failed to save snapshot {id:?} to {}", partial.display()))?;
        fs::rename(&partial, &path)
            .with_context(|| format!("failed to move snapshot into {}", path.display()))?;

        Ok(path)
    }

    /// Replace `model`'s parameters with snapshot `id`
    pub fn load<M: ParameterStore + ?Sized>(&self, id: SnapshotId, model: &mut M) -> Result<()> {
        let path = self.path(id);
        model
            .load(&path)
            .with_context(|| format!("failed to load snapshot {id:?} from {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use tempfile::tempdir;

    /// Parameters kept as a JSON vector
    struct JsonParams(Vec<f32>);

    impl ParameterStore for JsonParams {
        fn save(&self, path: &Path) -> Result<()> {
            fs::write(path, serde_json::to_vec(&self.0)?)?;
            Ok(())
        }

        fn load(&mut self, path: &Path) -> Result<()> {
            if !path.exists() {
                bail!("no such snapshot");
            }
            self.0 = serde_json::from_slice(&fs::read(path)?)?;
            Ok(())
        }
    }

    #[test]
    fn test_snapshot_paths() {
        assert_eq!(
            SnapshotId::Opponent(3).relative_path(),
            Path::new("opponents/opponent_3.ot")
        );
        assert_eq!(
            SnapshotId::Checkpoint(42).relative_path(),
            Path::new("checkpoints/00042.ot")
        );
        assert_eq!(SnapshotId::Highscore.relative_path(), Path::new("highscore_model.ot"));
        assert_eq!(SnapshotId::Final.relative_path(), Path::new("final_model.ot"));
    }

    #[test]
    fn test_save_then_load_replaces_parameters() {
        let root = tempdir().unwrap();
        let dir = SnapshotDir::create(root.path().join("run")).unwrap();

        let source = JsonParams(vec![1.0, 2.0, 3.0]);
        let path = dir.save(SnapshotId::Opponent(0), &source).unwrap();
        assert!(path.is_file());
        assert!(dir.exists(SnapshotId::Opponent(0)));
        assert!(!path.with_extension("ot.partial").exists());

        let mut target = JsonParams(vec![0.0]);
        dir.load(SnapshotId::Opponent(0), &mut target).unwrap();
        assert_eq!(target.0, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_load_missing_snapshot_fails() {
        let root = tempdir().unwrap();
        let dir = SnapshotDir::create(root.path()).unwrap();

        let mut target = JsonParams(vec![7.0]);
        let err = dir.load(SnapshotId::Checkpoint(1), &mut target).unwrap_err();
        assert!(format!("{err:#}").contains("Checkpoint(1)"));
        assert_eq!(target.0, vec![7.0]);
    }
}
