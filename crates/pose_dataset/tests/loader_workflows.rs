//! Integration tests for manifest indexing and batch loading.

use image::{GrayImage, Luma};
use pose_dataset::{
    DataLoader, DatasetError, FrameSlot, LoaderConfig, PoseDataset, TransformPipeline,
    TransformPipelineBuilder,
};
use std::fs;
use std::path::{Path, PathBuf};

type Backend = burn_ndarray::NdArray<f32>;

struct SyntheticSplit {
    manifest: PathBuf,
    image_dir: PathBuf,
    pose_dir: PathBuf,
}

/// Write `frames` grayscale images of `size` plus identity-rotation poses and a manifest
/// pairing frame i with frame i+1.
fn synthetic_split(
    root: &Path,
    frames: usize,
    size: impl Fn(usize) -> (u32, u32),
) -> anyhow::Result<SyntheticSplit> {
    let image_dir = root.join("flea3");
    let pose_dir = root.join("pose");
    fs::create_dir_all(&image_dir)?;
    fs::create_dir_all(&pose_dir)?;

    for i in 0..=frames {
        let (w, h) = size(i);
        let img = GrayImage::from_pixel(w, h, Luma([(i * 20 % 256) as u8]));
        img.save(image_dir.join(format!("{i:06}.png")))?;
    }

    let mut csv = String::from("source,target,pose\n");
    for i in 0..frames {
        let pose = format!("1 0 0 {i}\n0 1 0 0\n0 0 1 0\n");
        fs::write(pose_dir.join(format!("{:06}.txt", i + 1)), pose)?;
        csv.push_str(&format!("{i:06}.png,{:06}.png,{:06}.txt\n", i + 1, i + 1));
    }
    let manifest = root.join("scene_train.csv");
    fs::write(&manifest, csv)?;

    Ok(SyntheticSplit {
        manifest,
        image_dir,
        pose_dir,
    })
}

fn small_pipeline() -> TransformPipeline {
    TransformPipelineBuilder::new()
        .resize_shorter(Some(8))
        .center_crop(Some((8, 8)))
        .build()
        .unwrap()
}

fn open(
    split: &SyntheticSplit,
    pipeline: TransformPipeline,
) -> Result<PoseDataset, DatasetError> {
    PoseDataset::from_manifest(
        &split.manifest,
        &split.image_dir,
        &split.pose_dir,
        pipeline,
    )
}

#[test]
fn dataset_indexes_rows_and_loads_samples() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let split = synthetic_split(tmp.path(), 3, |_| (12, 8))?;
    let dataset = open(&split, small_pipeline())?;
    assert_eq!(dataset.len(), 3);

    let sample = dataset.get(2, FrameSlot::Source)?;
    assert_eq!((sample.width, sample.height), (8, 8));
    assert_eq!(sample.image_chw.len(), 64);
    assert_eq!(sample.pose.translation, [2.0, 0.0, 0.0]);

    // Frame 2 has luminance 40 -> (40/255 - 0.45) / 0.25.
    let expected = (40.0 / 255.0 - 0.45) / 0.25;
    assert!(sample.image_chw.iter().all(|v| (v - expected).abs() < 1e-4));

    let target = dataset.get(2, FrameSlot::Target)?;
    let expected_target = (60.0 / 255.0 - 0.45) / 0.25;
    assert!(target.image_chw.iter().all(|v| (v - expected_target).abs() < 1e-4));

    assert!(matches!(
        dataset.get(3, FrameSlot::Source),
        Err(DatasetError::OutOfRange { index: 3, len: 3 })
    ));
    Ok(())
}

#[test]
fn missing_image_is_reported_at_index_time() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let split = synthetic_split(tmp.path(), 2, |_| (8, 8))?;
    fs::remove_file(split.image_dir.join("000001.png"))?;
    let err = open(&split, small_pipeline()).unwrap_err();
    assert!(matches!(err, DatasetError::MissingFile { .. }));
    Ok(())
}

#[test]
fn header_only_manifest_is_empty() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let split = synthetic_split(tmp.path(), 1, |_| (8, 8))?;
    fs::write(&split.manifest, "source,target,pose\n")?;
    let err = open(&split, small_pipeline()).unwrap_err();
    assert!(matches!(err, DatasetError::EmptyManifest { .. }));
    Ok(())
}

#[test]
fn malformed_pose_surfaces_contract_error() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let split = synthetic_split(tmp.path(), 2, |_| (8, 8))?;
    fs::write(split.pose_dir.join("000001.txt"), "1 0 0")?;
    let dataset = open(&split, small_pipeline())?;
    assert!(matches!(
        dataset.get(0, FrameSlot::Source),
        Err(DatasetError::Contract { .. })
    ));
    Ok(())
}

#[test]
fn batch_count_keeps_uneven_final_batch() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let split = synthetic_split(tmp.path(), 5, |_| (8, 8))?;

    let cfg = LoaderConfig {
        batch_size: 2,
        shuffle: false,
        num_workers: 0,
        ..Default::default()
    };
    let loader = DataLoader::new(open(&split, small_pipeline())?, cfg.clone())?;
    assert_eq!(loader.len(), 3);
    assert!(!loader.is_empty());
    let sizes: Vec<usize> = loader.batch_indices(0).iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![2, 2, 1]);

    let dropping = DataLoader::new(
        open(&split, small_pipeline())?,
        LoaderConfig {
            drop_last: true,
            ..cfg
        },
    )?;
    assert_eq!(dropping.len(), 2);
    assert_eq!(dropping.batch_indices(0).len(), 2);
    Ok(())
}

#[test]
fn prefetch_stream_preserves_order_without_shuffle() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let split = synthetic_split(tmp.path(), 5, |_| (8, 8))?;
    let loader = DataLoader::new(
        open(&split, small_pipeline())?,
        LoaderConfig {
            batch_size: 2,
            shuffle: false,
            num_workers: 2,
            ..Default::default()
        },
    )?;

    let batches = loader.iter(0)?.collect::<Result<Vec<_>, _>>()?;
    let order: Vec<Vec<usize>> = batches.iter().map(|b| b.indices.clone()).collect();
    assert_eq!(order, vec![vec![0, 1], vec![2, 3], vec![4]]);

    let device = Default::default();
    let first = batches[0].to_burn::<Backend>(&device);
    assert_eq!(first.images.dims(), [2, 1, 8, 8]);
    assert_eq!(first.poses.dims(), [2, 12]);
    let last = batches[2].to_burn::<Backend>(&device);
    assert_eq!(last.images.dims(), [1, 1, 8, 8]);
    Ok(())
}

#[test]
fn seeded_shuffle_is_a_reproducible_permutation() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let split = synthetic_split(tmp.path(), 40, |_| (8, 8))?;
    let cfg = LoaderConfig {
        batch_size: 8,
        shuffle: true,
        seed: Some(7),
        num_workers: 0,
        ..Default::default()
    };
    let loader = DataLoader::new(open(&split, small_pipeline())?, cfg)?;

    let epoch0 = loader.batch_indices(0);
    assert_eq!(epoch0, loader.batch_indices(0));
    assert_ne!(epoch0, loader.batch_indices(1));

    let mut flat: Vec<usize> = epoch0.into_iter().flatten().collect();
    flat.sort_unstable();
    assert_eq!(flat, (0..40).collect::<Vec<_>>());
    Ok(())
}

#[test]
fn mixed_sizes_without_crop_fail_batch_assembly() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let split = synthetic_split(tmp.path(), 2, |i| if i == 0 { (8, 8) } else { (12, 8) })?;
    let pipeline = TransformPipelineBuilder::new()
        .resize_shorter(None)
        .center_crop(None)
        .build()?;
    let loader = DataLoader::new(
        open(&split, pipeline)?,
        LoaderConfig {
            batch_size: 2,
            shuffle: false,
            num_workers: 0,
            ..Default::default()
        },
    )?;
    let mut stream = loader.iter(0)?;
    let first = stream.next().expect("one batch expected");
    assert!(matches!(
        first,
        Err(DatasetError::InconsistentSize { index: 1, .. })
    ));
    assert!(stream.next().is_none());
    Ok(())
}
