//! CBRGD grasp dataset reader
//!
//! Layout: `<id>_grasps.txt` annotation files up to three levels below the
//! root, each with `<id>_perfect_depth.tiff` and `<id>_RGB.png` alongside.

use std::path::{Path, PathBuf};

use burn::data::dataset::Dataset;

use super::{load_samples, swap_suffix, DatasetOptions, GraspDataset, GraspSampleFiles};
use crate::utils::error::Result;

/// Registered name of this reader
pub const NAME: &str = "cbrgd";

const GRASP_SUFFIX: &str = "_grasps.txt";
const DEPTH_SUFFIX: &str = "_perfect_depth.tiff";
const RGB_SUFFIX: &str = "_RGB.png";

/// CBRGD dataset indexed from disk
#[derive(Debug, Clone)]
pub struct CbrgdDataset {
    root: PathBuf,
    samples: Vec<GraspSampleFiles>,
    options: DatasetOptions,
}

impl CbrgdDataset {
    pub fn new<P: AsRef<Path>>(root: P, options: DatasetOptions) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let samples = load_samples(
            NAME,
            &root,
            &options,
            1..=3,
            |name| name.ends_with(GRASP_SUFFIX),
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

impl Dataset<GraspSampleFiles> for CbrgdDataset {
    fn get(&self, index: usize) -> Option<GraspSampleFiles> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

impl GraspDataset for CbrgdDataset {
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
