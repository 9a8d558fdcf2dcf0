use std::io::prelude::*;
use std::path::Path;

use anyhow::Context;
use bimap::BiMap;
use rustc_hash::FxHashMap;

use crate::locstring::ParsedLocString;
use crate::region::Region;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SeqId(pub usize);

/// The reference sequences of one assembly, with their lengths and any
/// alternative names they go by.
#[derive(Debug, Clone, Default)]
pub struct RefNames {
    assembly_name: Option<String>,

    sequence_names: BiMap<String, SeqId>,
    lengths: Vec<u64>,

    aliases: FxHashMap<String, SeqId>,
}

// splits a tab-separated line into its first two fields
fn parse_name_value(line: &str) -> Option<(&str, &str)> {
    let mut fields = line.split('\t');
    let name = fields.next()?.trim();
    let value = fields.next()?.trim();
    if name.is_empty() || value.is_empty() {
        return None;
    }
    Some((name, value))
}

fn is_skipped(line: &str) -> bool {
    let line = line.trim();
    line.is_empty() || line.starts_with('#')
}

impl RefNames {
    pub fn from_name_lengths<S: Into<String>>(
        assembly_name: Option<String>,
        names: impl IntoIterator<Item = (S, u64)>,
    ) -> Self {
        let mut sequence_names = BiMap::new();
        let mut lengths = Vec::new();

        for (name, len) in names {
            let name = name.into();
            if sequence_names.contains_left(&name) {
                log::warn!("Ignoring duplicate reference sequence `{name}`");
                continue;
            }
            let id = SeqId(lengths.len());
            sequence_names.insert(name, id);
            lengths.push(len);
        }

        Self {
            assembly_name,
            sequence_names,
            lengths,
            aliases: FxHashMap::default(),
        }
    }

    /// Reads `name<TAB>length` lines, as found in `chrom.sizes` and
    /// `.fai` files. Columns past the second are ignored.
    pub fn from_sizes_reader(
        reader: impl BufRead,
        assembly_name: Option<String>,
    ) -> anyhow::Result<Self> {
        let mut names = Vec::new();

        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if is_skipped(&line) {
                continue;
            }

            let (name, len) = parse_name_value(&line)
                .with_context(|| format!("Line {}: expected `name<TAB>length`", i + 1))?;
            let len = len
                .parse::<u64>()
                .with_context(|| format!("Line {}: invalid length `{len}`", i + 1))?;

            names.push((name.to_string(), len));
        }

        Ok(Self::from_name_lengths(assembly_name, names))
    }

    pub fn read_sizes_file(
        path: impl AsRef<Path>,
        assembly_name: Option<String>,
    ) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let reader = std::fs::File::open(path)
            .map(std::io::BufReader::new)
            .with_context(|| format!("Error opening reference list {path:?}"))?;
        Self::from_sizes_reader(reader, assembly_name)
            .with_context(|| format!("Error parsing reference list {path:?}"))
    }

    /// Reads `alias<TAB>canonical` lines. Aliases for unknown sequences
    /// are skipped. Returns the number of aliases added.
    pub fn read_aliases(&mut self, reader: impl BufRead) -> anyhow::Result<usize> {
        let mut added = 0;

        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if is_skipped(&line) {
                continue;
            }

            let (alias, canonical) = parse_name_value(&line)
                .with_context(|| format!("Line {}: expected `alias<TAB>name`", i + 1))?;

            if self.add_alias(alias, canonical) {
                added += 1;
            } else {
                log::warn!("Alias `{alias}` refers to unknown sequence `{canonical}`");
            }
        }

        Ok(added)
    }

    pub fn read_alias_file(&mut self, path: impl AsRef<Path>) -> anyhow::Result<usize> {
        let path = path.as_ref();
        let reader = std::fs::File::open(path)
            .map(std::io::BufReader::new)
            .with_context(|| format!("Error opening alias file {path:?}"))?;
        self.read_aliases(reader)
            .with_context(|| format!("Error parsing alias file {path:?}"))
    }

    /// Returns false if `canonical` isn't a known sequence (or alias)
    pub fn add_alias(&mut self, alias: &str, canonical: &str) -> bool {
        match self.seq_id(canonical) {
            Some(id) => {
                if !self.sequence_names.contains_left(alias) {
                    self.aliases.insert(alias.to_string(), id);
                }
                true
            }
            None => false,
        }
    }

    pub fn assembly_name(&self) -> Option<&str> {
        self.assembly_name.as_deref()
    }

    pub fn len(&self) -> usize {
        self.lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }

    pub fn seq_id(&self, name: &str) -> Option<SeqId> {
        self.sequence_names
            .get_by_left(name)
            .or_else(|| self.aliases.get(name))
            .copied()
    }

    pub fn seq_name(&self, id: SeqId) -> Option<&str> {
        self.sequence_names.get_by_right(&id).map(|s| s.as_str())
    }

    pub fn canonical_name(&self, name: &str) -> Option<&str> {
        self.seq_id(name).and_then(|id| self.seq_name(id))
    }

    pub fn length(&self, id: SeqId) -> Option<u64> {
        self.lengths.get(id.0).copied()
    }

    /// The location string predicate; a name qualified with a different
    /// assembly isn't valid.
    pub fn is_valid_ref_name(&self, name: &str, assembly_name: Option<&str>) -> bool {
        let assembly_matches = match (assembly_name, self.assembly_name.as_deref()) {
            (Some(asked), Some(ours)) => asked == ours,
            _ => true,
        };
        assembly_matches && self.seq_id(name).is_some()
    }

    /// Maps every alias to its canonical name, for renaming regions
    pub fn ref_name_map(&self) -> FxHashMap<String, String> {
        self.aliases
            .iter()
            .filter_map(|(alias, id)| Some((alias.clone(), self.seq_name(*id)?.to_string())))
            .collect()
    }

    /// Resolves a parsed location to a region on a known sequence,
    /// filling in open bounds from the sequence length.
    pub fn region_for(&self, loc: &ParsedLocString) -> Option<Region> {
        let id = self.seq_id(&loc.ref_name)?;
        let len = self.length(id)? as i64;
        let name = self.seq_name(id)?;

        let mut region = Region::from_parsed(loc, len);
        if region.ref_name != name {
            let original = std::mem::replace(&mut region.ref_name, name.to_string());
            region.original_ref_name = Some(original);
        }
        if region.assembly_name.is_none() {
            region.assembly_name = self.assembly_name.clone();
        }
        Some(region)
    }

    pub fn iter(&self) -> impl Iterator<Item = (SeqId, &str, u64)> + '_ {
        self.lengths.iter().enumerate().filter_map(|(i, len)| {
            let id = SeqId(i);
            Some((id, self.seq_name(id)?, *len))
        })
    }

    /// One region per sequence, covering its full length
    pub fn whole_regions(&self) -> Vec<Region> {
        self.iter()
            .map(|(_, name, len)| {
                let mut region = Region::new(name, 0, len as i64);
                region.assembly_name = self.assembly_name.clone();
                region
            })
            .collect()
    }
}
