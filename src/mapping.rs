//! Conversions between view pixels and base pair coordinates across the
//! displayed regions, and zooming a view to a base pair range.

use crate::blocks::{calculate_static_blocks, Block, BlockSet, DEFAULT_OVERSCAN};
use crate::feature::Feature;
use crate::region::Region;
use crate::view::{ViewState, ZoomHost};

/// The result of mapping a pixel to the displayed regions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PxToBp {
    /// 1-based coordinate
    pub coord: i64,
    /// Index of the region in the displayed region sequence
    pub index: usize,
    pub ref_name: String,
    pub assembly_name: Option<String>,
    pub start: i64,
    pub end: i64,
    pub reversed: bool,
    /// bp from the region's left edge on screen
    pub offset: f64,
    /// Set when the pixel lies outside every displayed region, in
    /// which case `coord` is extrapolated from the nearest one
    pub oob: bool,
}

impl PxToBp {
    fn in_region(region: &Region, index: usize, offset: f64, oob: bool) -> Self {
        let coord = if region.reversed {
            (region.end as f64 - offset).floor() as i64 + 1
        } else {
            (region.start as f64 + offset).floor() as i64 + 1
        };

        Self {
            coord,
            index,
            ref_name: region.ref_name.clone(),
            assembly_name: region.assembly_name.clone(),
            start: region.start,
            end: region.end,
            reversed: region.reversed,
            offset,
            oob,
        }
    }
}

impl std::fmt::Display for PxToBp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}",
            self.ref_name,
            crate::ruler::to_locale(self.coord as f64)
        )?;
        if self.oob {
            write!(f, " (out of bounds)")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BpToPx {
    pub index: usize,
    /// Position in view pixel space, not relative to the viewport
    pub offset_px: f64,
}

/// One end of a base pair range, positioned relative to a displayed region.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BpOffset {
    pub ref_name: Option<String>,
    pub index: usize,
    pub offset: f64,
    pub start: Option<f64>,
    pub end: Option<f64>,
}

impl From<&PxToBp> for BpOffset {
    fn from(r: &PxToBp) -> Self {
        Self {
            ref_name: Some(r.ref_name.clone()),
            index: r.index,
            offset: r.offset,
            start: Some(r.start as f64),
            end: Some(r.end as f64),
        }
    }
}

/// Pixel/bp conversions for one view state.
///
/// Padding between regions only takes up space where the static blocks
/// put it, so the mapper is built from the same static block set the
/// view renders with.
#[derive(Debug, Clone)]
pub struct CoordinateMapper<'a> {
    view: &'a ViewState,
    padded: Vec<bool>,
}

impl<'a> CoordinateMapper<'a> {
    pub fn new(view: &'a ViewState, static_blocks: &BlockSet) -> Self {
        let padded = static_blocks.padded_boundaries(view.displayed_regions.len());
        Self { view, padded }
    }

    /// Builds the static blocks for `view` with the given overscan
    pub fn from_view(view: &'a ViewState, overscan: f64) -> Self {
        let static_blocks = calculate_static_blocks(view, overscan, true, true);
        Self::new(view, &static_blocks)
    }

    fn padding_bp_after(&self, region_number: usize) -> f64 {
        if self.padded.get(region_number).copied().unwrap_or(false) {
            self.view.inter_region_padding_bp()
        } else {
            0.0
        }
    }

    pub fn px_to_bp(&self, px: f64) -> PxToBp {
        let regions = &self.view.displayed_regions;
        let bp = (self.view.offset_px + px) * self.view.bp_per_px;

        let Some(first) = regions.first() else {
            return PxToBp {
                oob: true,
                ..Default::default()
            };
        };

        if bp < 0.0 {
            return PxToBp::in_region(first, 0, bp, true);
        }

        let mut bp_so_far = 0.0;
        for (i, region) in regions.iter().enumerate() {
            let len = region.len() as f64;
            let padding = self.padding_bp_after(i);

            if bp_so_far <= bp && bp < bp_so_far + len {
                return PxToBp::in_region(region, i, bp - bp_so_far, false);
            }

            // inside the padding gap after this region
            if padding > 0.0 && bp_so_far + len <= bp && bp < bp_so_far + len + padding {
                return PxToBp::in_region(region, i, bp - bp_so_far, true);
            }

            bp_so_far += len + padding;
        }

        let last_index = regions.len() - 1;
        let last = &regions[last_index];
        let offset = bp - bp_so_far + last.len() as f64;
        PxToBp::in_region(last, last_index, offset, true)
    }

    /// Finds the view pixel of `coord` on `ref_name`, which is `None` if
    /// the coordinate isn't currently displayed.
    ///
    /// The first region containing the coordinate is used, unless
    /// `region_number` picks a specific one. Region ends are inclusive.
    pub fn bp_to_px(
        &self,
        ref_name: &str,
        coord: f64,
        region_number: Option<usize>,
    ) -> Option<BpToPx> {
        let mut bp_so_far = 0.0;

        for (i, region) in self.view.displayed_regions.iter().enumerate() {
            let contains = region.ref_name == ref_name
                && coord >= region.start as f64
                && coord <= region.end as f64;

            if contains && region_number.map_or(true, |n| n == i) {
                bp_so_far += if region.reversed {
                    region.end as f64 - coord
                } else {
                    coord - region.start as f64
                };

                return Some(BpToPx {
                    index: i,
                    offset_px: (bp_so_far / self.view.bp_per_px).round(),
                });
            }

            bp_so_far += region.len() as f64 + self.padding_bp_after(i);
        }

        None
    }
}

pub fn px_to_bp(view: &ViewState, px: f64) -> PxToBp {
    CoordinateMapper::from_view(view, DEFAULT_OVERSCAN).px_to_bp(px)
}

pub fn bp_to_px(
    view: &ViewState,
    ref_name: &str,
    coord: f64,
    region_number: Option<usize>,
) -> Option<BpToPx> {
    CoordinateMapper::from_view(view, DEFAULT_OVERSCAN).bp_to_px(ref_name, coord, region_number)
}

/// bp between two offsets, summing whole regions in between; padding
/// is not counted.
pub fn length_between(view: &ViewState, start: &BpOffset, end: &BpOffset) -> f64 {
    let regions = &view.displayed_regions;
    let region_len = |i: usize| regions.get(i).map_or(0.0, |r| r.len() as f64);

    if start.index == end.index {
        return end.offset - start.offset;
    }

    let mut bp = region_len(start.index) - start.offset;
    for i in (start.index + 1)..end.index {
        bp += region_len(i);
    }
    bp + end.offset
}

/// Zooms and scrolls `host` so the range between `start` and `end`
/// fills the view. Does nothing if either end is missing.
///
/// If the host can't zoom in far enough, the range is centered.
pub fn move_to<H: ZoomHost + ?Sized>(
    host: &mut H,
    start: Option<&BpOffset>,
    end: Option<&BpOffset>,
) {
    let (Some(start), Some(end)) = (start, end) else {
        return;
    };

    let (len, wide_enough, width, padding_width) = {
        let view = host.view_state();
        let len = length_between(view, start, end);

        let wide_enough = view
            .displayed_regions
            .iter()
            .take(end.index)
            .skip(start.index)
            .filter(|r| r.len() as f64 / view.bp_per_px > view.minimum_block_width)
            .count();

        (len, wide_enough, view.width, view.inter_region_padding_width)
    };

    let target_bp_per_px = len / (width - padding_width * wide_enough as f64);
    let bp_per_px = host.zoom_to(target_bp_per_px);

    // clamped; center the range instead of left-aligning it
    let extra_bp = if target_bp_per_px < bp_per_px {
        ((bp_per_px - target_bp_per_px) * width) / 2.0
    } else {
        0.0
    };

    let mut bp_to_start = -extra_bp;
    for (i, region) in host.view_state().displayed_regions.iter().enumerate() {
        if start.index == i {
            bp_to_start += start.offset;
            break;
        }
        bp_to_start += region.len() as f64;
    }

    host.scroll_to((bp_to_start / bp_per_px).round());
}

/// A bp interval laid out on screen, possibly right-to-left
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Span {
    pub start: f64,
    pub end: f64,
    pub reversed: bool,
}

impl From<&Region> for Span {
    fn from(r: &Region) -> Self {
        Span {
            start: r.start as f64,
            end: r.end as f64,
            reversed: r.reversed,
        }
    }
}

impl From<&Block> for Span {
    fn from(b: &Block) -> Self {
        Span {
            start: b.start,
            end: b.end,
            reversed: b.reversed,
        }
    }
}

fn round_to_nearest_point_one(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Pixel position of `bp` relative to the left edge of `span`
pub fn bp_to_px_in_region(bp: f64, span: impl Into<Span>, bp_per_px: f64) -> f64 {
    let span = span.into();
    let px = if span.reversed {
        span.end - bp
    } else {
        bp - span.start
    };
    round_to_nearest_point_one(px / bp_per_px)
}

/// Left and right pixel edges of `left_bp..right_bp` within `span`
pub fn bp_span_px(
    left_bp: f64,
    right_bp: f64,
    span: impl Into<Span>,
    bp_per_px: f64,
) -> (f64, f64) {
    let span = span.into();
    let start = bp_to_px_in_region(left_bp, span, bp_per_px);
    let end = bp_to_px_in_region(right_bp, span, bp_per_px);
    if span.reversed {
        (end, start)
    } else {
        (start, end)
    }
}

pub fn feature_span_px(
    feature: &impl Feature,
    span: impl Into<Span>,
    bp_per_px: f64,
) -> (f64, f64) {
    bp_span_px(
        feature.start() as f64,
        feature.end() as f64,
        span,
        bp_per_px,
    )
}
