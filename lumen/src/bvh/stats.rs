use std::fmt;

use crate::SplitStrategy;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BvhStats {
    pub primitives: usize,
    pub nodes: usize,
    pub height: u32,
    pub split: SplitStrategy,
    pub sah_bins: usize,
}

impl fmt::Display for BvhStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "primitives = {}, nodes = {}, height = {}, ",
            self.primitives, self.nodes, self.height,
        )?;

        match self.split {
            SplitStrategy::SpatialMedian => write!(f, "sah = disabled"),
            SplitStrategy::Sah => {
                write!(f, "sah = enabled ({} bins)", self.sah_bins)
            }
        }
    }
}
