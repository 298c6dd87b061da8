//! Batch loading with a worker pool and a bounded prefetch queue.

use crate::dataset::PoseDataset;
use crate::types::{DatasetError, DatasetResult, FrameSlot, PoseSample};
use burn::tensor::{backend::Backend, Tensor};
use crossbeam_channel::{bounded, Receiver};
use rand::{seq::SliceRandom, SeedableRng};
use rayon::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

#[derive(Debug, Clone, Serialize)]
pub struct LoaderConfig {
    pub batch_size: usize,
    /// Reshuffle the sample order every epoch.
    pub shuffle: bool,
    /// Base seed for shuffling; epoch `e` uses `seed + e`.
    pub seed: Option<u64>,
    /// Drop the final partial batch.
    pub drop_last: bool,
    /// Threads loading samples in parallel; 0 loads on the prefetch thread itself.
    pub num_workers: usize,
    pub frame: FrameSlot,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            batch_size: 32,
            shuffle: true,
            seed: None,
            drop_last: false,
            num_workers: 4,
            frame: FrameSlot::Source,
        }
    }
}

/// Host-side batch, ready to upload to a Burn device.
#[derive(Debug, Clone)]
pub struct HostBatch {
    /// Manifest rows in batch order.
    pub indices: Vec<usize>,
    /// `[N, 1, H, W]` row-major.
    pub images: Vec<f32>,
    /// `[N, 12]` row-major `[R|t]`.
    pub poses: Vec<f32>,
    pub width: u32,
    pub height: u32,
}

pub struct PoseBatch<B: Backend> {
    pub images: Tensor<B, 4>,
    pub poses: Tensor<B, 2>,
}

impl HostBatch {
    pub fn assemble(samples: Vec<PoseSample>) -> DatasetResult<Self> {
        let Some(first) = samples.first() else {
            return Err(DatasetError::Config("cannot assemble an empty batch".into()));
        };
        let (width, height) = (first.width, first.height);
        let mut indices = Vec::with_capacity(samples.len());
        let mut images = Vec::with_capacity(samples.len() * (width * height) as usize);
        let mut poses = Vec::with_capacity(samples.len() * 12);
        for sample in samples {
            if (sample.width, sample.height) != (width, height) {
                return Err(DatasetError::InconsistentSize {
                    index: sample.index,
                    expected_w: width,
                    expected_h: height,
                    width: sample.width,
                    height: sample.height,
                });
            }
            indices.push(sample.index);
            images.extend_from_slice(&sample.image_chw);
            poses.extend_from_slice(&sample.pose.as_flat());
        }
        Ok(Self {
            indices,
            images,
            poses,
            width,
            height,
        })
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn to_burn<B: Backend>(&self, device: &B::Device) -> PoseBatch<B> {
        let n = self.len();
        let images = Tensor::<B, 1>::from_floats(self.images.as_slice(), device).reshape([
            n,
            1,
            self.height as usize,
            self.width as usize,
        ]);
        let poses = Tensor::<B, 1>::from_floats(self.poses.as_slice(), device).reshape([n, 12]);
        PoseBatch { images, poses }
    }
}

pub struct DataLoader {
    dataset: Arc<PoseDataset>,
    cfg: LoaderConfig,
    pool: Option<Arc<rayon::ThreadPool>>,
}

impl DataLoader {
    pub fn new(dataset: PoseDataset, cfg: LoaderConfig) -> DatasetResult<Self> {
        if cfg.batch_size == 0 {
            return Err(DatasetError::Config("batch_size must be > 0".into()));
        }
        let pool = if cfg.num_workers > 0 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(cfg.num_workers)
                .thread_name(|i| format!("loader-worker-{i}"))
                .build()?;
            Some(Arc::new(pool))
        } else {
            None
        };
        Ok(Self {
            dataset: Arc::new(dataset),
            cfg,
            pool,
        })
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.cfg
    }

    pub fn num_samples(&self) -> usize {
        self.dataset.len()
    }

    /// Batches per epoch.
    pub fn len(&self) -> usize {
        let n = self.dataset.len();
        if self.cfg.drop_last {
            n / self.cfg.batch_size
        } else {
            n.div_ceil(self.cfg.batch_size)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn prefetch_depth(&self) -> usize {
        (2 * self.cfg.num_workers).max(1)
    }

    /// Sample indices grouped per batch for `epoch`, in iteration order.
    pub fn batch_indices(&self, epoch: u64) -> Vec<Vec<usize>> {
        let mut order: Vec<usize> = (0..self.dataset.len()).collect();
        if self.cfg.shuffle {
            let mut rng = match self.cfg.seed {
                Some(seed) => rand::rngs::StdRng::seed_from_u64(seed.wrapping_add(epoch)),
                None => rand::rngs::StdRng::from_rng(&mut rand::rng()),
            };
            order.shuffle(&mut rng);
        }
        order
            .chunks(self.cfg.batch_size)
            .filter(|chunk| !self.cfg.drop_last || chunk.len() == self.cfg.batch_size)
            .map(|chunk| chunk.to_vec())
            .collect()
    }

    /// Start a prefetching pass over the dataset. Batches arrive in order; the
    /// first load error ends the stream after being yielded.
    pub fn iter(&self, epoch: u64) -> DatasetResult<BatchStream> {
        let batches = self.batch_indices(epoch);
        let total = batches.len();
        let (tx, rx) = bounded(self.prefetch_depth());
        let dataset = Arc::clone(&self.dataset);
        let pool = self.pool.clone();
        let frame = self.cfg.frame;

        let handle = thread::Builder::new()
            .name("loader-prefetch".into())
            .spawn(move || {
                for (batch, indices) in batches.into_iter().enumerate() {
                    let t_load = Instant::now();
                    let loaded = load_batch(&dataset, &indices, frame, pool.as_deref());
                    tracing::trace!(
                        epoch,
                        batch,
                        samples = indices.len(),
                        load_ms = t_load.elapsed().as_secs_f64() * 1000.0,
                        "loaded batch"
                    );
                    let failed = loaded.is_err();
                    if tx.send(loaded).is_err() || failed {
                        break;
                    }
                }
            })
            .map_err(|source| DatasetError::Io {
                path: self.dataset.manifest().to_path_buf(),
                source,
            })?;

        Ok(BatchStream {
            rx: Some(rx),
            handle: Some(handle),
            remaining: total,
        })
    }
}

fn load_batch(
    dataset: &PoseDataset,
    indices: &[usize],
    frame: FrameSlot,
    pool: Option<&rayon::ThreadPool>,
) -> DatasetResult<HostBatch> {
    let load = |i: &usize| dataset.get(*i, frame);
    let samples = match pool {
        Some(pool) => pool.install(|| {
            indices
                .par_iter()
                .map(load)
                .collect::<DatasetResult<Vec<_>>>()
        })?,
        None => indices.iter().map(load).collect::<DatasetResult<Vec<_>>>()?,
    };
    HostBatch::assemble(samples)
}

/// Consumer end of a prefetching pass. `next` blocks until the producer delivers.
pub struct BatchStream {
    rx: Option<Receiver<DatasetResult<HostBatch>>>,
    handle: Option<JoinHandle<()>>,
    remaining: usize,
}

impl BatchStream {
    /// Called once the channel disconnects: joins the producer and reports a
    /// panic or an epoch that stopped short.
    fn finish(&mut self) -> Option<DatasetError> {
        let joined = self.handle.take().map(JoinHandle::join);
        if let Some(Err(payload)) = joined {
            return Some(DatasetError::Producer(panic_message(payload.as_ref())));
        }
        (self.remaining > 0).then(|| {
            DatasetError::Producer(format!(
                "stream closed with {} batches outstanding",
                self.remaining
            ))
        })
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("prefetch thread panicked: {msg}")
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("prefetch thread panicked: {msg}")
    } else {
        "prefetch thread panicked".to_string()
    }
}

impl Iterator for BatchStream {
    type Item = DatasetResult<HostBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        let received = self.rx.as_ref()?.recv();
        match received {
            Ok(batch) => {
                self.remaining = self.remaining.saturating_sub(1);
                if batch.is_err() {
                    // The producer stops after its first error.
                    self.rx = None;
                }
                Some(batch)
            }
            Err(_) => {
                self.rx = None;
                self.finish().map(Err)
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}

impl Drop for BatchStream {
    fn drop(&mut self) {
        // Disconnect first so a producer blocked on `send` wakes up and exits.
        self.rx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host_batch(index: usize) -> HostBatch {
        HostBatch {
            indices: vec![index],
            images: vec![0.0; 16],
            poses: vec![0.0; 12],
            width: 4,
            height: 4,
        }
    }

    fn stream_from(
        remaining: usize,
        produce: impl FnOnce(crossbeam_channel::Sender<DatasetResult<HostBatch>>) + Send + 'static,
    ) -> BatchStream {
        let (tx, rx) = bounded(remaining.max(1));
        let handle = thread::spawn(move || produce(tx));
        BatchStream {
            rx: Some(rx),
            handle: Some(handle),
            remaining,
        }
    }

    #[test]
    fn producer_panic_is_yielded_as_error() {
        let stream = stream_from(3, |_tx| panic!("worker blew up"));
        let items: Vec<_> = stream.collect();
        assert_eq!(items.len(), 1);
        match &items[0] {
            Err(DatasetError::Producer(msg)) => assert!(msg.contains("worker blew up"), "{msg}"),
            other => panic!("expected producer error, got {other:?}"),
        }
    }

    #[test]
    fn short_epoch_is_reported_after_delivered_batches() {
        let stream = stream_from(3, |tx| {
            let _ = tx.send(Ok(host_batch(0)));
        });
        let items: Vec<_> = stream.collect();
        assert_eq!(items.len(), 2);
        assert!(items[0].as_ref().is_ok_and(|b| !b.is_empty()));
        assert!(matches!(items[1], Err(DatasetError::Producer(_))));
    }

    #[test]
    fn complete_epoch_ends_cleanly() {
        let stream = stream_from(2, |tx| {
            for i in 0..2 {
                let _ = tx.send(Ok(host_batch(i)));
            }
        });
        let items: Vec<_> = stream.collect();
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(Result::is_ok));
    }
}
