use std::cmp::Ordering;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use burn::prelude::*;
use burn::record::DefaultRecorder;
use tracing::{debug, info};

use crate::ai::{InferBackend, PolicyNetwork};
use crate::checkpoint::metadata::CheckpointMetadata;
use crate::error::CheckpointError;

const WEIGHTS_FILE: &str = "policy_network";
const METADATA_FILE: &str = "metadata.json";
const LATEST_LINK: &str = "latest";

/// Configuration for the checkpoint manager.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CheckpointManagerConfig {
    pub checkpoint_dir: PathBuf,
    pub keep_last_n: usize,
    pub keep_best_n: usize,
}

impl Default for CheckpointManagerConfig {
    fn default() -> Self {
        CheckpointManagerConfig {
            checkpoint_dir: PathBuf::from("checkpoints"),
            keep_last_n: 5,
            keep_best_n: 3,
        }
    }
}

/// A loaded checkpoint: its location, metadata and inference weights.
#[derive(Debug)]
pub struct CheckpointData {
    pub path: PathBuf,
    pub metadata: CheckpointMetadata,
    pub network: PolicyNetwork<InferBackend>,
}

/// Seconds since the Unix epoch, 0 if the clock is before it.
pub fn timestamp_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Manages saving, loading, listing, and pruning checkpoints.
pub struct CheckpointManager {
    config: CheckpointManagerConfig,
}

impl CheckpointManager {
    pub fn new(config: CheckpointManagerConfig) -> Self {
        fs::create_dir_all(&config.checkpoint_dir).ok();
        CheckpointManager { config }
    }

    pub fn checkpoint_dir(&self) -> &Path {
        &self.config.checkpoint_dir
    }

    /// Write weights and metadata into `<checkpoint_dir>/<dir_name>`.
    ///
    /// The directory is assembled under a `.tmp` name and renamed into place,
    /// so readers never see a half-written checkpoint.
    pub fn save_model(
        &self,
        network: &PolicyNetwork<InferBackend>,
        metadata: &CheckpointMetadata,
        dir_name: &str,
    ) -> Result<PathBuf, CheckpointError> {
        let tmp_dir = self.config.checkpoint_dir.join(format!("{}.tmp", dir_name));
        let final_dir = self.config.checkpoint_dir.join(dir_name);

        fs::create_dir_all(&tmp_dir)?;

        let recorder = DefaultRecorder::default();
        network
            .clone()
            .save_file(tmp_dir.join(WEIGHTS_FILE), &recorder)
            .map_err(|e| CheckpointError::ModelSave(e.to_string()))?;

        let meta_json = serde_json::to_string_pretty(metadata)?;
        fs::write(tmp_dir.join(METADATA_FILE), meta_json)?;

        // Atomic rename
        if final_dir.exists() {
            fs::remove_dir_all(&final_dir)?;
        }
        fs::rename(&tmp_dir, &final_dir)?;

        self.update_latest_symlink(dir_name)?;
        self.prune_old_checkpoints()?;

        info!(path = %final_dir.display(), mode = %metadata.mode, step = metadata.step, "Saved checkpoint");
        Ok(final_dir)
    }

    pub fn read_metadata(&self, dir: &Path) -> Result<CheckpointMetadata, CheckpointError> {
        let meta_path = dir.join(METADATA_FILE);
        let meta_json =
            fs::read_to_string(&meta_path).map_err(|e| CheckpointError::MetadataRead {
                path: meta_path.clone(),
                source: e,
            })?;
        serde_json::from_str(&meta_json).map_err(|e| CheckpointError::MetadataParse {
            path: meta_path,
            source: e,
        })
    }

    /// Load a checkpoint directory, rebuilding the network from its recorded
    /// architecture.
    pub fn load_model(&self, dir: &Path) -> Result<CheckpointData, CheckpointError> {
        if !dir.is_dir() {
            return Err(CheckpointError::DirNotFound(dir.to_path_buf()));
        }
        let metadata = self.read_metadata(dir)?;
        let device = Default::default();
        let network = metadata
            .architecture
            .init::<InferBackend>(&device)
            .load_file(dir.join(WEIGHTS_FILE), &DefaultRecorder::default(), &device)
            .map_err(|e| CheckpointError::ModelLoad(e.to_string()))?;
        debug!(path = %dir.display(), "Loaded checkpoint");
        Ok(CheckpointData {
            path: dir.to_path_buf(),
            metadata,
            network,
        })
    }

    /// Load whatever the `latest` symlink points at.
    pub fn load_latest(&self) -> Result<CheckpointData, CheckpointError> {
        let latest_link = self.config.checkpoint_dir.join(LATEST_LINK);
        if !latest_link.exists() {
            return Err(CheckpointError::NoLatestSymlink(
                self.config.checkpoint_dir.clone(),
            ));
        }
        let resolved = fs::read_link(&latest_link)?;
        let target = if resolved.is_relative() {
            self.config.checkpoint_dir.join(resolved)
        } else {
            resolved
        };
        self.load_model(&target)
    }

    /// List all checkpoints, oldest first.
    pub fn list_checkpoints(
        &self,
    ) -> Result<Vec<(PathBuf, CheckpointMetadata)>, CheckpointError> {
        let mut results = Vec::new();
        for entry in fs::read_dir(&self.config.checkpoint_dir)? {
            let entry = entry?;
            let path = entry.path();
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if name_str == LATEST_LINK || name_str.ends_with(".tmp") || !path.is_dir() {
                continue;
            }
            if path.join(METADATA_FILE).exists() {
                let metadata = self.read_metadata(&path)?;
                results.push((path, metadata));
            }
        }
        results.sort_by_key(|(_, m)| (m.timestamp, m.step));
        Ok(results)
    }

    /// Prune old checkpoints, keeping the union of the last N and best N by score.
    fn prune_old_checkpoints(&self) -> Result<(), CheckpointError> {
        let checkpoints = self.list_checkpoints()?;
        if checkpoints.len() <= self.config.keep_last_n {
            return Ok(());
        }

        let total = checkpoints.len();
        let mut keep: HashSet<usize> =
            (total.saturating_sub(self.config.keep_last_n)..total).collect();

        let mut by_score: Vec<(usize, f32)> = checkpoints
            .iter()
            .enumerate()
            .map(|(i, (_, m))| (i, m.metrics.score))
            .collect();
        by_score.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        for (i, _) in by_score.iter().take(self.config.keep_best_n) {
            keep.insert(*i);
        }

        for (i, (path, _)) in checkpoints.iter().enumerate() {
            if !keep.contains(&i) {
                debug!(path = %path.display(), "Pruning checkpoint");
                fs::remove_dir_all(path)?;
            }
        }

        Ok(())
    }

    /// Update the `latest` symlink to point to the given checkpoint directory name.
    fn update_latest_symlink(&self, dir_name: &str) -> Result<(), CheckpointError> {
        let link_path = self.config.checkpoint_dir.join(LATEST_LINK);
        if link_path.exists() || link_path.symlink_metadata().is_ok() {
            fs::remove_file(&link_path)?;
        }
        std::os::unix::fs::symlink(dir_name, &link_path)?;
        Ok(())
    }
}
