//! Cornell grasp dataset reader
//!
//! Layout: `root/<scene>/pcdNNNNcpos.txt` with `pcdNNNNd.tiff` and
//! `pcdNNNNr.png` next to each annotation file.

use std::path::{Path, PathBuf};

use burn::data::dataset::Dataset;

use super::{load_samples, swap_suffix, DatasetOptions, GraspDataset, GraspSampleFiles};
use crate::utils::error::Result;

/// Registered name of this reader
pub const NAME: &str = "cornell";

const GRASP_SUFFIX: &str = "cpos.txt";
const DEPTH_SUFFIX: &str = "d.tiff";
const RGB_SUFFIX: &str = "r.png";

/// Cornell dataset indexed from disk
#[derive(Debug, Clone)]
pub struct CornellDataset {
    root: PathBuf,
    samples: Vec<GraspSampleFiles>,
    options: DatasetOptions,
}

impl CornellDataset {
    pub fn new<P: AsRef<Path>>(root: P, options: DatasetOptions) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let samples = load_samples(
            NAME,
            &root,
            &options,
            2..=2,
            |name| name.starts_with("pcd") && name.ends_with(GRASP_SUFFIX),
            |grasp| {
                let depth = swap_suffix(&grasp, GRASP_SUFFIX, DEPTH_SUFFIX);
                let rgb = swap_suffix(&depth, DEPTH_SUFFIX, RGB_SUFFIX);
                GraspSampleFiles { grasp, depth, rgb }
            },
        )?;

        Ok(Self {
            root,
            samples,
            options,
        })
    }
}

impl Dataset<GraspSampleFiles> for CornellDataset {
    fn get(&self, index: usize) -> Option<GraspSampleFiles> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

impl GraspDataset for CornellDataset {
    fn name(&self) -> &'static str {
        NAME
    }

    fn root(&self) -> &Path {
        &self.root
    }

    fn options(&self) -> &DatasetOptions {
        &self.options
    }
}
