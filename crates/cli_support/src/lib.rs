//! Shared clap argument groups for the training tools.

pub mod common;

pub use common::{DatasetLocation, DatasetLocationArgs};
