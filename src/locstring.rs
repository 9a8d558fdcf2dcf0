//! Textual 1-based genomic locations, e.g. `{hg19}chr1:1,000..2,000[rev]`.
//!
//! Parsing produces interbase (0-based, half-open) coordinates;
//! assembling turns them back into the 1-based, inclusive syntax.

use std::cmp::Ordering;
use std::sync::OnceLock;

use regex::Regex;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ParsedLocString {
    pub assembly_name: Option<String>,
    pub ref_name: String,
    pub start: Option<i64>,
    pub end: Option<i64>,
    pub reversed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocStringError {
    #[error("no location string provided, could not parse")]
    Empty,
    #[error("no assembly name was provided in location \"{location}\"")]
    EmptyAssemblyScope { location: String },
    #[error("unknown reference sequence name in location \"{location}\"")]
    UnknownReference { location: String },
    #[error("ambiguous location string: \"{location}\"")]
    Ambiguous { location: String },
    #[error("could not parse range \"{range}\" on location \"{location}\"")]
    UnparsableRange { range: String, location: String },
}

impl LocStringError {
    /// The text the error was produced for
    pub fn location(&self) -> &str {
        match self {
            LocStringError::Empty => "",
            LocStringError::EmptyAssemblyScope { location }
            | LocStringError::UnknownReference { location }
            | LocStringError::Ambiguous { location }
            | LocStringError::UnparsableRange { location, .. } => location,
        }
    }
}

const NUMBER: &str = r"(-?(?:\d+|\d{1,3}(?:,\d{3})*))";

fn assembly_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?:\{(.+)\})?(.+)$").unwrap())
}

fn range_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(&format!(r"^{NUMBER}(\.\.|-){NUMBER}$")).unwrap())
}

fn single_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(&format!(r"^{NUMBER}(\.\.|-)?$")).unwrap())
}

fn parse_number(text: &str) -> Option<i64> {
    text.replace(',', "").parse::<i64>().ok()
}

/// Parses a location string, leaving the coordinates 1-based.
///
/// `is_valid_ref_name` is called with a candidate reference name and
/// the assembly scope (if the text had a `{name}` prefix).
pub fn parse_loc_string_one_based(
    loc_string: &str,
    is_valid_ref_name: impl Fn(&str, Option<&str>) -> bool,
) -> Result<ParsedLocString, LocStringError> {
    if loc_string.is_empty() {
        return Err(LocStringError::Empty);
    }

    let (loc_string, reversed) = match loc_string.strip_suffix("[rev]") {
        Some(rest) => (rest, true),
        None => (loc_string, false),
    };

    let loc_string = loc_string
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>();

    let caps = assembly_regex()
        .captures(&loc_string)
        .ok_or_else(|| LocStringError::UnknownReference {
            location: loc_string.clone(),
        })?;

    let assembly_name = caps.get(1).map(|m| m.as_str().to_string());
    let location = caps.get(2).map(|m| m.as_str()).unwrap_or_default();

    if assembly_name.is_none() && location.starts_with("{}") {
        return Err(LocStringError::EmptyAssemblyScope {
            location: location.to_string(),
        });
    }

    let asm = assembly_name.as_deref();

    let bare = |ref_name: &str| ParsedLocString {
        assembly_name: assembly_name.clone(),
        ref_name: ref_name.to_string(),
        start: None,
        end: None,
        reversed,
    };

    // refNames may themselves contain colons, so only the last one can
    // separate the name from the coordinates
    let Some((prefix, suffix)) = location.rsplit_once(':') else {
        if is_valid_ref_name(location, asm) {
            return Ok(bare(location));
        }
        return Err(LocStringError::UnknownReference {
            location: location.to_string(),
        });
    };

    let prefix_valid = is_valid_ref_name(prefix, asm);
    let whole_valid = is_valid_ref_name(location, asm);

    match (prefix_valid, whole_valid) {
        (true, true) => Err(LocStringError::Ambiguous {
            location: loc_string.clone(),
        }),
        (true, false) if suffix.is_empty() => Ok(bare(prefix)),
        (true, false) => {
            let unparsable = || LocStringError::UnparsableRange {
                range: suffix.to_string(),
                location: loc_string.clone(),
            };

            if let Some(caps) = range_regex().captures(suffix) {
                let start = parse_number(&caps[1]).ok_or_else(unparsable)?;
                let end = parse_number(&caps[3]).ok_or_else(unparsable)?;
                Ok(ParsedLocString {
                    start: Some(start),
                    end: Some(end),
                    ..bare(prefix)
                })
            } else if let Some(caps) = single_regex().captures(suffix) {
                let pos = parse_number(&caps[1]).ok_or_else(unparsable)?;
                let end = if caps.get(2).is_some() {
                    // open-ended, e.g. `chr1:100..`
                    None
                } else {
                    Some(pos)
                };
                Ok(ParsedLocString {
                    start: Some(pos),
                    end,
                    ..bare(prefix)
                })
            } else {
                Err(unparsable())
            }
        }
        (false, true) => Ok(bare(location)),
        (false, false) => Err(LocStringError::UnknownReference {
            location: loc_string.clone(),
        }),
    }
}

/// Parses a 1-based location string into interbase coordinates.
///
/// ```text
/// chr1:1..100       -> chr1 [0, 100)
/// chr1:1-100        -> chr1 [0, 100)
/// {hg19}chr1:1..100 -> hg19 chr1 [0, 100)
/// chr1              -> chr1
/// chr1:1            -> chr1 [0, 1)
/// chr1:1..          -> chr1 [0, ..)
/// ```
pub fn parse_loc_string(
    loc_string: &str,
    is_valid_ref_name: impl Fn(&str, Option<&str>) -> bool,
) -> Result<ParsedLocString, LocStringError> {
    let mut parsed = parse_loc_string_one_based(loc_string, is_valid_ref_name)?;
    if let Some(start) = parsed.start.as_mut() {
        *start -= 1;
    }
    Ok(parsed)
}

/// Assembles a 1-based location string, formatting numbers with digit
/// grouping (`chr1:1,001..2,000`).
pub fn assemble_loc_string(region: &ParsedLocString) -> String {
    assemble_loc_string_fast(region, crate::ruler::to_locale)
}

/// Same output as [`assemble_loc_string`] modulo number rendering, which
/// is delegated to `fmt`. Layout code uses this with plain formatting.
pub fn assemble_loc_string_fast(region: &ParsedLocString, fmt: impl Fn(f64) -> String) -> String {
    assemble_parts(
        region.assembly_name.as_deref(),
        &region.ref_name,
        region.start.map(|s| s as f64),
        region.end.map(|e| e as f64),
        region.reversed,
        fmt,
    )
}

pub(crate) fn plain_number(n: f64) -> String {
    n.to_string()
}

pub(crate) fn assemble_parts(
    assembly_name: Option<&str>,
    ref_name: &str,
    start: Option<f64>,
    end: Option<f64>,
    reversed: bool,
    fmt: impl Fn(f64) -> String,
) -> String {
    let mut out = String::new();

    if let Some(asm) = assembly_name.filter(|a| !a.is_empty()) {
        out.push('{');
        out.push_str(asm);
        out.push('}');
    }

    out.push_str(ref_name);

    match (start, end) {
        (Some(start), Some(end)) => {
            out.push(':');
            out.push_str(&fmt(start + 1.0));
            if start + 1.0 != end {
                out.push_str("..");
                out.push_str(&fmt(end));
            }
        }
        (Some(start), None) => {
            out.push(':');
            out.push_str(&fmt(start + 1.0));
            out.push_str("..");
        }
        (None, Some(end)) => {
            out.push_str(":1..");
            out.push_str(&fmt(end));
        }
        (None, None) => (),
    }

    if reversed {
        out.push_str("[rev]");
    }

    out
}

/// Orders by assembly, then reference name, then start, then end.
/// Coordinates missing on either side compare equal.
pub fn compare_locs(a: &ParsedLocString, b: &ParsedLocString) -> Ordering {
    let asm_a = a.assembly_name.as_deref().unwrap_or_default();
    let asm_b = b.assembly_name.as_deref().unwrap_or_default();

    asm_a
        .cmp(asm_b)
        .then_with(|| a.ref_name.cmp(&b.ref_name))
        .then_with(|| match (a.start, b.start) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => Ordering::Equal,
        })
        .then_with(|| match (a.end, b.end) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => Ordering::Equal,
        })
}

pub fn compare_loc_strings(
    a: &str,
    b: &str,
    is_valid_ref_name: impl Fn(&str, Option<&str>) -> bool,
) -> Result<Ordering, LocStringError> {
    let loc_a = parse_loc_string(a, &is_valid_ref_name)?;
    let loc_b = parse_loc_string(b, &is_valid_ref_name)?;
    Ok(compare_locs(&loc_a, &loc_b))
}
