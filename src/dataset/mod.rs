//! Dataset module for grasp datasets stored on disk
//!
//! This module provides:
//! - `get_dataset`: name-based dispatch to a dataset reader kind
//! - File-backed readers for the Cornell and CBRGD layouts
//! - Seeded train/test index splitting
//!
//! Readers only index the files belonging to each sample (grasp rectangles,
//! depth image, RGB image); decoding them is left to the caller.

pub mod cbrgd;
pub mod cornell;

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use burn::data::dataset::Dataset;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::utils::error::{GraspError, Result};

pub use cbrgd::CbrgdDataset;
pub use cornell::CornellDataset;

/// Default side of the square crop fed to the network
pub const DEFAULT_OUTPUT_SIZE: usize = 224;

/// Files that make up one grasp sample
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraspSampleFiles {
    /// Grasp rectangle annotations
    pub grasp: PathBuf,
    /// Depth image
    pub depth: PathBuf,
    /// RGB image
    pub rgb: PathBuf,
}

/// Options shared by all dataset readers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetOptions {
    /// Side of the square crop fed to the network
    pub output_size: usize,
    /// Use the depth image as an input channel
    pub include_depth: bool,
    /// Use the RGB image as three input channels
    pub include_rgb: bool,
    /// Fraction of the sorted file list rotated to the end
    pub ds_rotate: f64,
}

impl Default for DatasetOptions {
    fn default() -> Self {
        Self {
            output_size: DEFAULT_OUTPUT_SIZE,
            include_depth: true,
            include_rgb: true,
            ds_rotate: 0.0,
        }
    }
}

impl DatasetOptions {
    /// Number of network input channels these options produce
    pub fn input_channels(&self) -> usize {
        usize::from(self.include_depth) + 3 * usize::from(self.include_rgb)
    }

    /// Validate the options
    pub fn validate(&self) -> Result<()> {
        if !self.include_depth && !self.include_rgb {
            return Err(GraspError::Config(
                "at least one of depth or rgb must be enabled".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.ds_rotate) {
            return Err(GraspError::Config(format!(
                "ds_rotate must be in range [0.0, 1.0], got {}",
                self.ds_rotate
            )));
        }

        Ok(())
    }
}

/// A dataset reader over grasp sample files
pub trait GraspDataset: Dataset<GraspSampleFiles> {
    /// Name the reader is registered under
    fn name(&self) -> &'static str;

    /// Root directory the samples were indexed from
    fn root(&self) -> &Path;

    /// Options the reader was opened with
    fn options(&self) -> &DatasetOptions;
}

/// The dataset readers known to [`get_dataset`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatasetKind {
    Cornell,
    Cbrgd,
}

impl DatasetKind {
    /// All registered kinds
    pub const ALL: [DatasetKind; 2] = [DatasetKind::Cornell, DatasetKind::Cbrgd];

    pub fn name(&self) -> &'static str {
        match self {
            DatasetKind::Cornell => cornell::NAME,
            DatasetKind::Cbrgd => cbrgd::NAME,
        }
    }

    /// Open the reader of this kind on a dataset root
    pub fn open<P: AsRef<Path>>(
        &self,
        root: P,
        options: DatasetOptions,
    ) -> Result<Box<dyn GraspDataset>> {
        Ok(match self {
            DatasetKind::Cornell => Box::new(CornellDataset::new(root, options)?),
            DatasetKind::Cbrgd => Box::new(CbrgdDataset::new(root, options)?),
        })
    }
}

impl std::fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Look up the dataset reader for a name
pub fn get_dataset(dataset_name: &str) -> Result<DatasetKind> {
    DatasetKind::ALL
        .into_iter()
        .find(|kind| kind.name() == dataset_name)
        .ok_or_else(|| {
            GraspError::NotImplemented(format!(
                "Dataset Type {} is Not implemented",
                dataset_name
            ))
        })
}

/// Split `0..len` into train and test indices
///
/// The first `floor(len * split)` indices (after an optional seeded shuffle)
/// go to training, the rest to testing.
pub fn split_indices(
    len: usize,
    split: f64,
    shuffle: bool,
    seed: u64,
) -> Result<(Vec<usize>, Vec<usize>)> {
    if !(0.0..=1.0).contains(&split) {
        return Err(GraspError::Config(format!(
            "split must be in range [0.0, 1.0], got {}",
            split
        )));
    }

    let mut indices: Vec<usize> = (0..len).collect();
    if shuffle {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        indices.shuffle(&mut rng);
    }

    let boundary = (len as f64 * split).floor() as usize;
    let test = indices.split_off(boundary);

    debug!("Split {} samples into {} train / {} test", len, indices.len(), test.len());
    Ok((indices, test))
}

/// Collect sorted annotation files `depth` levels below `root` whose name passes `is_grasp_file`
fn index_grasp_files<F>(
    root: &Path,
    depth: RangeInclusive<usize>,
    is_grasp_file: F,
) -> Result<Vec<PathBuf>>
where
    F: Fn(&str) -> bool,
{
    if !root.exists() {
        return Err(GraspError::PathNotFound(root.to_path_buf()));
    }

    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .min_depth(*depth.start())
        .max_depth(*depth.end())
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.file_name().to_str().map(&is_grasp_file).unwrap_or(false))
        .map(|e| e.into_path())
        .collect();
    files.sort();

    if files.is_empty() {
        return Err(GraspError::Dataset(format!(
            "No dataset files found. Check path: {:?}",
            root
        )));
    }

    Ok(files)
}

/// Rotate the list so that it starts at `floor(len * ds_rotate)`
fn rotate_files<T>(mut files: Vec<T>, ds_rotate: f64) -> Vec<T> {
    let offset = (files.len() as f64 * ds_rotate).floor() as usize;
    if offset > 0 && offset < files.len() {
        files.rotate_left(offset);
    }
    files
}

/// Replace the trailing `from` of a file name with `to`
fn swap_suffix(path: &Path, from: &str, to: &str) -> PathBuf {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let stem = name.strip_suffix(from).unwrap_or(name);
    path.with_file_name(format!("{}{}", stem, to))
}

/// Shared indexing for both readers
fn load_samples<F, M>(
    name: &str,
    root: &Path,
    options: &DatasetOptions,
    depth: RangeInclusive<usize>,
    is_grasp_file: F,
    to_sample: M,
) -> Result<Vec<GraspSampleFiles>>
where
    F: Fn(&str) -> bool,
    M: Fn(PathBuf) -> GraspSampleFiles,
{
    options.validate()?;
    info!("Loading {} dataset from: {:?}", name, root);

    let files = index_grasp_files(root, depth, is_grasp_file)?;
    let samples: Vec<GraspSampleFiles> = files.into_iter().map(to_sample).collect();
    let samples = rotate_files(samples, options.ds_rotate);

    info!("Indexed {} {} samples", samples.len(), name);
    Ok(samples)
}
