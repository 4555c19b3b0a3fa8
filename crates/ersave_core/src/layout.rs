use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn new(start: u64, len: u64) -> Self {
        Self {
            start,
            end: start.saturating_add(len),
        }
    }

    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    fn overlaps(&self, other: &ByteRange) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Where one slot lives in the backing file: the full region, including the
/// stored digest header when the format has one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionLayout {
    pub index: usize,
    pub range: ByteRange,
    pub digest_len: u64,
}

impl RegionLayout {
    pub fn payload_start(&self) -> u64 {
        self.range.start + self.digest_len
    }

    pub fn payload_len(&self) -> u64 {
        self.range.len().saturating_sub(self.digest_len)
    }
}

#[derive(Debug, Clone)]
pub struct ContainerLayout {
    pub header_len: u64,
    pub regions: Vec<RegionLayout>,
}

impl ContainerLayout {
    /// Regions must sit after the header, hold at least their digest header,
    /// and must not overlap each other.
    pub fn validate(&self) -> Result<()> {
        let header = ByteRange::new(0, self.header_len);
        for region in &self.regions {
            if region.range.len() < region.digest_len {
                return Err(Error::malformed(format!(
                    "slot {} is {} bytes, smaller than its {}-byte digest header",
                    region.index,
                    region.range.len(),
                    region.digest_len
                )));
            }
            if region.range.overlaps(&header) {
                return Err(Error::malformed(format!(
                    "slot {} at {:#x} overlaps the {:#x}-byte header",
                    region.index, region.range.start, self.header_len
                )));
            }
        }

        let mut sorted: Vec<&RegionLayout> = self.regions.iter().collect();
        sorted.sort_by_key(|r| r.range.start);
        for pair in sorted.windows(2) {
            if pair[0].range.overlaps(&pair[1].range) {
                return Err(Error::malformed(format!(
                    "slot {} ({:#x}..{:#x}) overlaps slot {} ({:#x}..{:#x})",
                    pair[0].index,
                    pair[0].range.start,
                    pair[0].range.end,
                    pair[1].index,
                    pair[1].range.start,
                    pair[1].range.end
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(index: usize, start: u64, len: u64) -> RegionLayout {
        RegionLayout {
            index,
            range: ByteRange::new(start, len),
            digest_len: 16,
        }
    }

    #[test]
    fn accepts_disjoint_regions_in_any_order() {
        let layout = ContainerLayout {
            header_len: 0x300,
            regions: vec![region(0, 0x1000, 0x100), region(1, 0x300, 0x100)],
        };
        layout.validate().expect("disjoint regions are valid");
    }

    #[test]
    fn rejects_overlap_with_header() {
        let layout = ContainerLayout {
            header_len: 0x300,
            regions: vec![region(0, 0x2F0, 0x100)],
        };
        assert!(matches!(
            layout.validate(),
            Err(Error::MalformedHeader { .. })
        ));
    }

    #[test]
    fn rejects_overlapping_regions() {
        let layout = ContainerLayout {
            header_len: 0x300,
            regions: vec![region(0, 0x300, 0x100), region(1, 0x3F0, 0x100)],
        };
        assert!(matches!(
            layout.validate(),
            Err(Error::MalformedHeader { .. })
        ));
    }

    #[test]
    fn rejects_region_smaller_than_digest() {
        let layout = ContainerLayout {
            header_len: 0x300,
            regions: vec![region(0, 0x300, 8)],
        };
        assert!(layout.validate().is_err());
    }

    #[test]
    fn payload_skips_digest_header() {
        let r = region(3, 0x300, 0x60010);
        assert_eq!(r.payload_start(), 0x310);
        assert_eq!(r.payload_len(), 0x60000);
    }
}
