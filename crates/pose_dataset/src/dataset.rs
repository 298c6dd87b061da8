//! Manifest-indexed image/pose dataset.

use crate::transform::TransformPipeline;
use crate::types::{DatasetError, DatasetResult, FrameSlot, PoseSample};
use data_contracts::{ManifestRow, RelativePose};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct PoseDataset {
    manifest: PathBuf,
    rows: Vec<ManifestRow>,
    image_dir: PathBuf,
    pose_dir: PathBuf,
    pipeline: TransformPipeline,
}

impl PoseDataset {
    /// Read a CSV manifest (with a `source,target,pose` header) and check that every
    /// referenced image and pose file exists.
    pub fn from_manifest(
        manifest: &Path,
        image_dir: &Path,
        pose_dir: &Path,
        pipeline: TransformPipeline,
    ) -> DatasetResult<Self> {
        let csv_err = |source: csv::Error| DatasetError::Csv {
            path: manifest.to_path_buf(),
            source,
        };
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(manifest)
            .map_err(csv_err)?;

        let mut rows = Vec::new();
        for (i, record) in reader.deserialize::<ManifestRow>().enumerate() {
            let row = record.map_err(csv_err)?;
            row.validate(i + 1).map_err(|source| DatasetError::Contract {
                path: manifest.to_path_buf(),
                source,
            })?;
            for file in [
                image_dir.join(&row.source),
                image_dir.join(&row.target),
                pose_dir.join(&row.pose),
            ] {
                if !file.is_file() {
                    return Err(DatasetError::MissingFile {
                        manifest: manifest.to_path_buf(),
                        file,
                    });
                }
            }
            rows.push(row);
        }
        if rows.is_empty() {
            return Err(DatasetError::EmptyManifest {
                path: manifest.to_path_buf(),
            });
        }
        tracing::debug!(
            manifest = %manifest.display(),
            samples = rows.len(),
            "indexed manifest"
        );
        Ok(Self {
            manifest: manifest.to_path_buf(),
            rows,
            image_dir: image_dir.to_path_buf(),
            pose_dir: pose_dir.to_path_buf(),
            pipeline,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn manifest(&self) -> &Path {
        &self.manifest
    }

    /// Decode, transform, and pair one frame of row `index` with its relative pose.
    pub fn get(&self, index: usize, frame: FrameSlot) -> DatasetResult<PoseSample> {
        let row = self.rows.get(index).ok_or(DatasetError::OutOfRange {
            index,
            len: self.rows.len(),
        })?;
        let image_path = match frame {
            FrameSlot::Source => self.image_dir.join(&row.source),
            FrameSlot::Target => self.image_dir.join(&row.target),
        };
        let img = image::open(&image_path).map_err(|source| DatasetError::Image {
            path: image_path.clone(),
            source,
        })?;
        let (image_chw, width, height) = self.pipeline.apply(img)?;

        let pose_path = self.pose_dir.join(&row.pose);
        let pose = load_pose(&pose_path)?;

        Ok(PoseSample {
            index,
            image_chw,
            width,
            height,
            pose,
        })
    }
}

pub fn load_pose(path: &Path) -> DatasetResult<RelativePose> {
    let text = fs::read_to_string(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    RelativePose::parse(&text).map_err(|source| DatasetError::Contract {
        path: path.to_path_buf(),
        source,
    })
}
