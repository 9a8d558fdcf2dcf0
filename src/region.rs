use rustc_hash::FxHashMap;

use crate::locstring::{assemble_parts, plain_number, ParsedLocString};

/// A contiguous interval of a reference sequence, in interbase
/// (0-based, half-open) coordinates.
///
/// `reversed` only flips the direction bp coordinates increase in on
/// screen; `start` is always <= `end`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Region {
    pub assembly_name: Option<String>,
    pub ref_name: String,
    pub start: i64,
    pub end: i64,
    pub reversed: bool,

    /// Set when the region was renamed to match a data source's naming
    pub original_ref_name: Option<String>,
}

impl Region {
    pub fn new(ref_name: impl Into<String>, start: i64, end: i64) -> Self {
        Self {
            ref_name: ref_name.into(),
            start,
            end,
            ..Default::default()
        }
    }

    pub fn with_assembly(mut self, assembly_name: impl Into<String>) -> Self {
        self.assembly_name = Some(assembly_name.into());
        self
    }

    pub fn with_reversed(mut self, reversed: bool) -> Self {
        self.reversed = reversed;
        self
    }

    pub fn len(&self) -> i64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Builds a region from a parsed location, filling in whichever
    /// bounds were left open with `0` and `ref_len`.
    pub fn from_parsed(parsed: &ParsedLocString, ref_len: i64) -> Self {
        let start = parsed.start.unwrap_or(0).max(0);
        let end = parsed.end.unwrap_or(ref_len).min(ref_len).max(start);
        Self {
            assembly_name: parsed.assembly_name.clone(),
            ref_name: parsed.ref_name.clone(),
            start,
            end,
            reversed: parsed.reversed,
            original_ref_name: None,
        }
    }

    pub fn to_parsed(&self) -> ParsedLocString {
        ParsedLocString {
            assembly_name: self.assembly_name.clone(),
            ref_name: self.ref_name.clone(),
            start: Some(self.start),
            end: Some(self.end),
            reversed: self.reversed,
        }
    }

    /// Returns a copy using the data source's name for the reference
    /// sequence, if `ref_name_map` has one; the old name is kept in
    /// `original_ref_name`.
    pub fn renamed(&self, ref_name_map: &FxHashMap<String, String>) -> Self {
        match ref_name_map.get(&self.ref_name) {
            Some(new_name) if *new_name != self.ref_name => Self {
                ref_name: new_name.clone(),
                original_ref_name: Some(self.ref_name.clone()),
                ..self.clone()
            },
            _ => self.clone(),
        }
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = assemble_parts(
            self.assembly_name.as_deref(),
            &self.ref_name,
            Some(self.start as f64),
            Some(self.end as f64),
            self.reversed,
            plain_number,
        );
        f.write_str(&text)
    }
}

/// Total number of bases across a displayed region sequence
pub fn total_bp(regions: &[Region]) -> i64 {
    regions.iter().map(Region::len).sum()
}

pub fn rename_regions_if_needed(
    regions: &[Region],
    ref_name_map: &FxHashMap<String, String>,
) -> Vec<Region> {
    regions.iter().map(|r| r.renamed(ref_name_map)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_one_based() {
        let region = Region::new("chr1", 0, 100).with_assembly("hg19");
        assert_eq!(region.to_string(), "{hg19}chr1:1..100");

        let region = Region::new("chr1", 9, 10).with_reversed(true);
        assert_eq!(region.to_string(), "chr1:10[rev]");
    }

    #[test]
    fn from_parsed_fills_open_bounds() {
        let parsed = ParsedLocString {
            ref_name: "chr2".to_string(),
            start: Some(100),
            ..Default::default()
        };
        let region = Region::from_parsed(&parsed, 5000);
        assert_eq!((region.start, region.end), (100, 5000));

        let parsed = ParsedLocString {
            ref_name: "chr2".to_string(),
            ..Default::default()
        };
        let region = Region::from_parsed(&parsed, 5000);
        assert_eq!((region.start, region.end), (0, 5000));
    }

    #[test]
    fn rename_produces_new_value() {
        let mut map = FxHashMap::default();
        map.insert("1".to_string(), "chr1".to_string());

        let regions = vec![Region::new("1", 0, 10), Region::new("chr2", 0, 10)];
        let renamed = rename_regions_if_needed(&regions, &map);

        assert_eq!(renamed[0].ref_name, "chr1");
        assert_eq!(renamed[0].original_ref_name.as_deref(), Some("1"));
        assert_eq!(renamed[1], regions[1]);
        // the source sequence is untouched
        assert_eq!(regions[0].ref_name, "1");
        assert_eq!(total_bp(&renamed), 20);
    }
}
