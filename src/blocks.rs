//! Partitioning of the displayed regions into rendering blocks.
//!
//! Static blocks are fixed-size tiles aligned to the start of each
//! displayed region and generated for an overscanned window around the
//! viewport, so that they stay the same across small scrolls. Dynamic
//! blocks are the exact region fragments intersecting the viewport.
//!
//! Both sets share one horizontal layout: regions are laid out left to
//! right in pixel space, and an inter-region padding gap is inserted
//! after a region only when its right end is rendered as part of the
//! static window (and the region isn't elided). Far-away boundaries
//! take up no space, which keeps pixel offsets stable as the user
//! scrolls across many small regions.

use crate::locstring::{assemble_parts, plain_number};
use crate::region::Region;
use crate::view::ViewState;

/// Default overscan, in multiples of the viewport width on each side.
/// With `1.0` the static blocks cover roughly three viewports.
pub const DEFAULT_OVERSCAN: f64 = 1.0;

/// Static tiles are sized in steps of this many pixels
const BLOCK_SIZE_STEP_PX: f64 = 200.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Content,
    /// A whole region too narrow to draw, shown as a placeholder
    Elided,
    InterRegionPadding,
    BoundaryPadding,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub kind: BlockKind,
    pub key: String,
    pub region_number: usize,

    /// Left edge in view pixel space, i.e. before subtracting the
    /// view's `offset_px`
    pub offset_px: f64,
    pub width_px: f64,

    pub start: f64,
    pub end: f64,
    pub assembly_name: Option<String>,
    pub ref_name: String,
    pub reversed: bool,

    pub is_left_end_of_displayed_region: bool,
    pub is_right_end_of_displayed_region: bool,
}

impl Block {
    #[allow(clippy::too_many_arguments)]
    fn region_part(
        kind: BlockKind,
        region: &Region,
        region_number: usize,
        start: f64,
        end: f64,
        offset_px: f64,
        width_px: f64,
        is_left_end: bool,
        is_right_end: bool,
    ) -> Self {
        let loc = assemble_parts(
            region.assembly_name.as_deref(),
            &region.ref_name,
            Some(start),
            Some(end),
            region.reversed,
            plain_number,
        );
        let key = format!(
            "{loc}-{region_number}{}",
            if region.reversed { "-reversed" } else { "" }
        );

        Self {
            kind,
            key,
            region_number,
            offset_px,
            width_px,
            start,
            end,
            assembly_name: region.assembly_name.clone(),
            ref_name: region.ref_name.clone(),
            reversed: region.reversed,
            is_left_end_of_displayed_region: is_left_end,
            is_right_end_of_displayed_region: is_right_end,
        }
    }

    fn padding(
        kind: BlockKind,
        next_to: &Block,
        suffix: &str,
        offset_px: f64,
        width_px: f64,
    ) -> Self {
        // the bp position of the boundary the padding sits against
        let right_side = offset_px >= next_to.offset_px;
        let boundary = match (right_side, next_to.reversed) {
            (true, false) | (false, true) => next_to.end,
            (true, true) | (false, false) => next_to.start,
        };

        Self {
            kind,
            key: format!("{}-{suffix}", next_to.key),
            region_number: next_to.region_number,
            offset_px,
            width_px,
            start: boundary,
            end: boundary,
            assembly_name: next_to.assembly_name.clone(),
            ref_name: next_to.ref_name.clone(),
            reversed: next_to.reversed,
            is_left_end_of_displayed_region: false,
            is_right_end_of_displayed_region: false,
        }
    }

    pub fn is_content(&self) -> bool {
        self.kind == BlockKind::Content
    }

    pub fn len_bp(&self) -> f64 {
        self.end - self.start
    }

    /// The whole-base region covered by the block, for fetching data
    pub fn to_region(&self) -> Region {
        Region {
            assembly_name: self.assembly_name.clone(),
            ref_name: self.ref_name.clone(),
            start: self.start.floor() as i64,
            end: self.end.ceil() as i64,
            reversed: self.reversed,
            original_ref_name: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockSet {
    blocks: Vec<Block>,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    left_px: f64,
    right_px: f64,
}

impl BlockSet {
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn content_blocks(&self) -> impl Iterator<Item = &Block> + '_ {
        self.blocks.iter().filter(|b| b.is_content())
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Left edge of the first block
    pub fn offset_px(&self) -> f64 {
        self.blocks.first().map(|b| b.offset_px).unwrap_or_default()
    }

    pub fn total_width_px(&self) -> f64 {
        self.blocks.iter().map(|b| b.width_px).sum()
    }

    /// For each region, whether the layout inserted padding after it
    pub fn padded_boundaries(&self, region_count: usize) -> Vec<bool> {
        let mut padded = vec![false; region_count];
        for block in &self.blocks {
            if block.kind == BlockKind::InterRegionPadding {
                if let Some(p) = padded.get_mut(block.region_number) {
                    *p = true;
                }
            }
        }
        padded
    }

    // pushes a region block along with any padding that belongs next to
    // it; returns true if inter-region padding was inserted after it
    fn push_region_block(
        &mut self,
        block: Block,
        window: Window,
        region_count: usize,
        padding: bool,
        padding_width: f64,
    ) -> bool {
        let is_last = block.region_number + 1 == region_count;

        if padding
            && block.region_number == 0
            && block.is_left_end_of_displayed_region
            && window.left_px < block.offset_px
        {
            self.blocks.push(Block::padding(
                BlockKind::BoundaryPadding,
                &block,
                "beforeFirstRegion",
                window.left_px,
                block.offset_px - window.left_px,
            ));
        }

        let right_edge = block.offset_px + block.width_px;
        let pad_after = padding && block.is_right_end_of_displayed_region;
        let elided = block.kind == BlockKind::Elided;

        let mut trailing = None;
        if pad_after && !is_last && !elided && padding_width > 0.0 {
            trailing = Some(Block::padding(
                BlockKind::InterRegionPadding,
                &block,
                "rightpad",
                right_edge,
                padding_width,
            ));
        } else if pad_after && is_last && window.right_px > right_edge {
            trailing = Some(Block::padding(
                BlockKind::BoundaryPadding,
                &block,
                "afterLastRegion",
                right_edge,
                window.right_px - right_edge,
            ));
        }

        self.blocks.push(block);

        match trailing {
            Some(pad) => {
                let inter_region = pad.kind == BlockKind::InterRegionPadding;
                self.blocks.push(pad);
                inter_region
            }
            None => false,
        }
    }
}

/// The static and dynamic block sets of one view state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Blocks {
    pub static_blocks: BlockSet,
    pub dynamic_blocks: BlockSet,
}

pub fn build_blocks(view: &ViewState, overscan: f64) -> Blocks {
    let static_blocks = calculate_static_blocks(view, overscan, true, true);
    let padded = static_blocks.padded_boundaries(view.displayed_regions.len());
    let dynamic_blocks = dynamic_blocks_with_layout(view, &padded, true, true);

    Blocks {
        static_blocks,
        dynamic_blocks,
    }
}

fn is_layoutable(view: &ViewState) -> bool {
    view.width > 0.0 && view.bp_per_px > 0.0 && !view.displayed_regions.is_empty()
}

pub fn calculate_static_blocks(
    view: &ViewState,
    overscan: f64,
    padding: bool,
    elision: bool,
) -> BlockSet {
    let mut blocks = BlockSet::default();
    if !is_layoutable(view) {
        return blocks;
    }

    let bp_per_px = view.bp_per_px;
    let regions = &view.displayed_regions;

    let extra = overscan.max(0.0) * view.width;
    let window = Window {
        left_px: view.offset_px - extra,
        right_px: view.offset_px + view.width + extra,
    };

    let block_size_px = (view.width / BLOCK_SIZE_STEP_PX).ceil() * BLOCK_SIZE_STEP_PX;
    let block_size_bp = (block_size_px * bp_per_px).ceil();
    let block_width_px = block_size_bp / bp_per_px;

    let mut region_left_px = 0.0;

    for (region_number, region) in regions.iter().enumerate() {
        let region_len = region.len() as f64;
        let region_width_px = region_len / bp_per_px;
        let region_right_px = region_left_px + region_width_px;

        let in_window = region_len > 0.0
            && region_left_px < window.right_px
            && region_right_px > window.left_px;

        if in_window && elision && region_width_px < view.minimum_block_width {
            let block = Block::region_part(
                BlockKind::Elided,
                region,
                region_number,
                region.start as f64,
                region.end as f64,
                region_left_px,
                region_width_px,
                true,
                true,
            );
            blocks.push_region_block(
                block,
                window,
                regions.len(),
                padding,
                view.inter_region_padding_width,
            );
        } else if in_window {
            let block_count = (region_len / block_size_bp).ceil() as i64;
            let first = ((window.left_px - region_left_px) / block_width_px)
                .floor()
                .max(0.0) as i64;
            let last = (((window.right_px - region_left_px) / block_width_px).floor() as i64)
                .min(block_count - 1);

            for block_num in first..=last {
                // bp offsets from the region's left edge on screen
                let lo = block_num as f64 * block_size_bp;
                let hi = ((block_num + 1) as f64 * block_size_bp).min(region_len);

                let (start, end) = if region.reversed {
                    (region.end as f64 - hi, region.end as f64 - lo)
                } else {
                    (region.start as f64 + lo, region.start as f64 + hi)
                };

                let block = Block::region_part(
                    BlockKind::Content,
                    region,
                    region_number,
                    start,
                    end,
                    region_left_px + lo / bp_per_px,
                    (hi - lo) / bp_per_px,
                    lo == 0.0,
                    hi == region_len,
                );

                let padded = blocks.push_region_block(
                    block,
                    window,
                    regions.len(),
                    padding,
                    view.inter_region_padding_width,
                );
                if padded {
                    region_left_px += view.inter_region_padding_width;
                }
            }
        }

        region_left_px += region_width_px;
    }

    blocks
}

/// The exact blocks visible in the viewport. Padding follows the same
/// layout as the static blocks computed with `overscan`.
pub fn calculate_dynamic_blocks(
    view: &ViewState,
    overscan: f64,
    padding: bool,
    elision: bool,
) -> BlockSet {
    let padded = if padding {
        calculate_static_blocks(view, overscan, true, elision)
            .padded_boundaries(view.displayed_regions.len())
    } else {
        vec![false; view.displayed_regions.len()]
    };
    dynamic_blocks_with_layout(view, &padded, padding, elision)
}

fn dynamic_blocks_with_layout(
    view: &ViewState,
    padded: &[bool],
    padding: bool,
    elision: bool,
) -> BlockSet {
    let mut blocks = BlockSet::default();
    if !is_layoutable(view) {
        return blocks;
    }

    let bp_per_px = view.bp_per_px;
    let regions = &view.displayed_regions;
    let window = Window {
        left_px: view.offset_px,
        right_px: view.offset_px + view.width,
    };

    let mut region_left_px = 0.0;

    for (region_number, region) in regions.iter().enumerate() {
        let region_len = region.len() as f64;
        let region_width_px = region_len / bp_per_px;
        let region_right_px = region_left_px + region_width_px;

        if region_len > 0.0
            && region_left_px < window.right_px
            && region_right_px > window.left_px
        {
            let elided = elision && region_width_px < view.minimum_block_width;

            let (clip_left, clip_right) = if elided {
                (0.0, region_width_px)
            } else {
                (
                    (window.left_px - region_left_px).max(0.0),
                    (window.right_px - region_left_px).min(region_width_px),
                )
            };

            if clip_right > clip_left {
                let is_left_end = clip_left == 0.0;
                let is_right_end = clip_right == region_width_px;

                let lo = if is_left_end { 0.0 } else { clip_left * bp_per_px };
                let hi = if is_right_end {
                    region_len
                } else {
                    clip_right * bp_per_px
                };

                let (start, end) = if region.reversed {
                    (region.end as f64 - hi, region.end as f64 - lo)
                } else {
                    (region.start as f64 + lo, region.start as f64 + hi)
                };

                let kind = if elided {
                    BlockKind::Elided
                } else {
                    BlockKind::Content
                };

                let block = Block::region_part(
                    kind,
                    region,
                    region_number,
                    start,
                    end,
                    region_left_px + clip_left,
                    clip_right - clip_left,
                    is_left_end,
                    is_right_end,
                );
                blocks.push_region_block(
                    block,
                    window,
                    regions.len(),
                    padding,
                    view.inter_region_padding_width,
                );
            }
        }

        if padding && padded.get(region_number).copied().unwrap_or(false) {
            region_left_px += view.inter_region_padding_width;
        }
        region_left_px += region_width_px;
    }

    blocks
}
