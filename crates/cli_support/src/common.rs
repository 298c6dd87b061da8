use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

/// Dataset root on the "megalith" workstation.
pub const MEGALITH_ROOT: &str = "/media/datasets/";
/// Dataset root on machines with the local NVMe drive.
pub const LOCAL_ROOT: &str = "/media/m2-drive/datasets/";
/// Sequence directory relative to the dataset root.
pub const SEQUENCE_DIR: &str = "fla/2020.01.14_rss2020_data/2017_05_10_10_18_40_fla-19";

/// Where the FLA images, poses, and split manifests live.
#[derive(Debug, Clone, Args)]
pub struct DatasetLocationArgs {
    /// Use the megalith dataset root instead of the local drive.
    #[arg(long, default_value_t = false)]
    pub megalith: bool,
    /// Explicit dataset root; overrides --megalith.
    #[arg(long, env = "FLA_DATASET_ROOT")]
    pub dataset_root: Option<PathBuf>,
    /// Scene name used as the split manifest prefix.
    #[arg(long, default_value = "fla-19")]
    pub scene: String,
    /// Directory containing `<scene>_train_reverse_False.csv` and `<scene>_test.csv`.
    #[arg(long, default_value = "../experiments/FLA")]
    pub experiments_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetLocation {
    pub image_dir: PathBuf,
    pub pose_dir: PathBuf,
    pub train_manifest: PathBuf,
    pub test_manifest: PathBuf,
}

impl DatasetLocationArgs {
    pub fn root(&self) -> PathBuf {
        match &self.dataset_root {
            Some(root) => root.clone(),
            None if self.megalith => PathBuf::from(MEGALITH_ROOT),
            None => PathBuf::from(LOCAL_ROOT),
        }
    }

    pub fn resolve(&self) -> DatasetLocation {
        let sequence = self.root().join(SEQUENCE_DIR);
        DatasetLocation {
            image_dir: sequence.join("flea3"),
            pose_dir: sequence.join("pose"),
            train_manifest: self
                .experiments_dir
                .join(format!("{}_train_reverse_False.csv", self.scene)),
            test_manifest: self
                .experiments_dir
                .join(format!("{}_test.csv", self.scene)),
        }
    }
}
