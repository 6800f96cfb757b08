//! Pass boundary detection

use crate::geodesy::{Geodesy, PassIdentity};

#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    /// First record not belonging to `identity`; equals the input length
    /// while the pass is still open
    pub index: usize,
    /// Identity of the first record
    pub identity: PassIdentity,
}

impl Split {
    pub fn is_open(&self, len: usize) -> bool {
        self.index >= len
    }
}

/// Classify `time[0]` and scan forward to the first record of another pass.
pub fn find_split<G: Geodesy + ?Sized>(time: &[f64], geodesy: &mut G) -> Option<Split> {
    let (&first, rest) = time.split_first()?;
    let identity = geodesy.classify(first);

    let index = rest
        .iter()
        .position(|&t| !geodesy.classify(t).same_pass(&identity))
        .map_or(time.len(), |i| i + 1);

    Some(Split { index, identity })
}
