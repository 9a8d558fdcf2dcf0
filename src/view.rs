use crate::blocks::{build_blocks, BlockSet, Blocks};
use crate::config::ViewConfig;
use crate::locstring::ParsedLocString;
use crate::mapping::{move_to, BpOffset, BpToPx, CoordinateMapper, PxToBp};
use crate::region::{total_bp, Region};

// how far the regions may be scrolled past either edge of the viewport
const LEFT_SCROLL_MARGIN_PX: f64 = 10.0;
const RIGHT_SCROLL_MARGIN_PX: f64 = 30.0;

/// A snapshot of everything the layout depends on.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub bp_per_px: f64,
    /// Scroll position; the viewport's left edge in view pixel space
    pub offset_px: f64,
    pub width: f64,
    pub inter_region_padding_width: f64,
    pub minimum_block_width: f64,
    pub displayed_regions: Vec<Region>,
}

impl std::default::Default for ViewState {
    fn default() -> Self {
        let cfg = ViewConfig::default();
        Self {
            bp_per_px: 1.0,
            offset_px: 0.0,
            width: cfg.width,
            inter_region_padding_width: cfg.inter_region_padding_width,
            minimum_block_width: cfg.minimum_block_width,
            displayed_regions: Vec::new(),
        }
    }
}

impl ViewState {
    pub fn total_bp(&self) -> f64 {
        total_bp(&self.displayed_regions) as f64
    }

    pub fn inter_region_padding_bp(&self) -> f64 {
        self.inter_region_padding_width * self.bp_per_px
    }
}

/// What zooming to a range needs from a view.
pub trait ZoomHost {
    fn view_state(&self) -> &ViewState;

    /// Sets the scale, limited to what the host allows; returns the
    /// scale actually applied.
    fn zoom_to(&mut self, bp_per_px: f64) -> f64;

    /// Sets the scroll offset, limited to what the host allows;
    /// returns the offset actually applied.
    fn scroll_to(&mut self, offset_px: f64) -> f64;
}

// unlike `f64::clamp`, doesn't panic when the bounds cross
fn clamp(x: f64, min: f64, max: f64) -> f64 {
    x.min(max).max(min)
}

/// A horizontally scrolling view over a sequence of regions, keeping
/// its blocks in step with every change to the view state.
#[derive(Debug, Clone)]
pub struct LinearView {
    state: ViewState,

    min_bp_per_px: f64,
    max_view_fraction: f64,
    overscan: f64,

    blocks: Blocks,
}

impl LinearView {
    pub fn new(config: &ViewConfig) -> Self {
        let state = ViewState {
            width: config.width,
            inter_region_padding_width: config.inter_region_padding_width,
            minimum_block_width: config.minimum_block_width,
            ..Default::default()
        };

        let mut view = Self {
            state,
            min_bp_per_px: config.min_bp_per_px,
            max_view_fraction: config.max_view_fraction,
            overscan: config.overscan,
            blocks: Blocks::default(),
        };
        view.update_blocks();
        view
    }

    /// A view showing all of `regions`
    pub fn with_regions(config: &ViewConfig, regions: Vec<Region>) -> Self {
        let mut view = Self::new(config);
        view.set_displayed_regions(regions);
        view.show_all_regions();
        view
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn blocks(&self) -> &Blocks {
        &self.blocks
    }

    pub fn static_blocks(&self) -> &BlockSet {
        &self.blocks.static_blocks
    }

    pub fn dynamic_blocks(&self) -> &BlockSet {
        &self.blocks.dynamic_blocks
    }

    pub fn bp_per_px(&self) -> f64 {
        self.state.bp_per_px
    }

    pub fn offset_px(&self) -> f64 {
        self.state.offset_px
    }

    pub fn width(&self) -> f64 {
        self.state.width
    }

    pub fn displayed_regions(&self) -> &[Region] {
        &self.state.displayed_regions
    }

    pub fn total_bp(&self) -> f64 {
        self.state.total_bp()
    }

    pub fn total_px(&self) -> f64 {
        self.total_bp() / self.state.bp_per_px
    }

    pub fn min_bp_per_px(&self) -> f64 {
        self.min_bp_per_px
    }

    /// Fully zoomed out, the regions fill `max_view_fraction` of the width
    pub fn max_bp_per_px(&self) -> f64 {
        let max = self.total_bp() / (self.state.width * self.max_view_fraction);
        if max.is_finite() {
            max.max(self.min_bp_per_px)
        } else {
            self.min_bp_per_px
        }
    }

    pub fn min_offset(&self) -> f64 {
        -self.state.width + RIGHT_SCROLL_MARGIN_PX
    }

    pub fn max_offset(&self) -> f64 {
        self.total_px() - LEFT_SCROLL_MARGIN_PX
    }

    pub fn mapper(&self) -> CoordinateMapper<'_> {
        CoordinateMapper::new(&self.state, &self.blocks.static_blocks)
    }

    /// Maps a pixel relative to the viewport's left edge
    pub fn px_to_bp(&self, px: f64) -> PxToBp {
        self.mapper().px_to_bp(px)
    }

    pub fn bp_to_px(
        &self,
        ref_name: &str,
        coord: f64,
        region_number: Option<usize>,
    ) -> Option<BpToPx> {
        self.mapper().bp_to_px(ref_name, coord, region_number)
    }

    fn update_blocks(&mut self) {
        self.blocks = build_blocks(&self.state, self.overscan);
    }

    pub fn set_width(&mut self, width: f64) {
        self.state.width = width.max(0.0);
        self.update_blocks();
    }

    pub fn set_inter_region_padding_width(&mut self, padding: f64) {
        self.state.inter_region_padding_width = padding.max(0.0);
        self.update_blocks();
    }

    /// Replaces the displayed regions, keeping the scale and scroll
    /// position within the new limits.
    pub fn set_displayed_regions(&mut self, regions: Vec<Region>) {
        self.state.displayed_regions = regions;
        self.state.bp_per_px = clamp(
            self.state.bp_per_px,
            self.min_bp_per_px,
            self.max_bp_per_px(),
        );
        self.state.offset_px = clamp(self.state.offset_px, self.min_offset(), self.max_offset());
        self.update_blocks();
    }

    /// Zooms all the way out and centers the regions
    pub fn show_all_regions(&mut self) {
        self.zoom_to(self.max_bp_per_px());
        let centered = (self.total_px() / 2.0 - self.state.width / 2.0).round();
        self.scroll_to(centered);
    }

    /// Scrolls by `distance` pixels, returning how far the view
    /// actually moved.
    pub fn horizontal_scroll(&mut self, distance: f64) -> f64 {
        let old = self.state.offset_px;
        let new = self.scroll_to(old + distance);
        new - old
    }

    /// Scrolls so that `coord` is in the middle of the viewport.
    /// Returns false if the coordinate isn't displayed.
    pub fn center_at(&mut self, coord: f64, ref_name: &str, region_number: Option<usize>) -> bool {
        match self.bp_to_px(ref_name, coord, region_number) {
            Some(center) => {
                self.scroll_to((center.offset_px - self.state.width / 2.0).round());
                true
            }
            None => false,
        }
    }

    pub fn move_to(&mut self, start: Option<&BpOffset>, end: Option<&BpOffset>) {
        move_to(self, start, end);
    }

    /// Zooms to a location within the displayed regions. A location
    /// without a range shows the whole region.
    pub fn nav_to(&mut self, loc: &ParsedLocString) -> anyhow::Result<()> {
        let within = |x: Option<i64>, r: &Region| x.map_or(true, |x| x >= r.start && x <= r.end);

        let index = self
            .state
            .displayed_regions
            .iter()
            .position(|r| {
                r.ref_name == loc.ref_name
                    && loc
                        .assembly_name
                        .as_ref()
                        .map_or(true, |asm| r.assembly_name.as_ref().map_or(true, |a| a == asm))
                    && within(loc.start, r)
                    && within(loc.end, r)
            })
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Could not find a displayed region containing `{}`",
                    crate::locstring::assemble_loc_string(loc)
                )
            })?;

        let region = &self.state.displayed_regions[index];
        let start = loc.start.unwrap_or(region.start);
        let end = loc.end.unwrap_or(region.end);

        if start > end {
            anyhow::bail!("Start of location `{start}` is past its end `{end}`");
        }

        let (start_offset, end_offset) = if region.reversed {
            (region.end - end, region.end - start)
        } else {
            (start - region.start, end - region.start)
        };

        let from = BpOffset {
            ref_name: Some(region.ref_name.clone()),
            index,
            offset: start_offset as f64,
            start: Some(region.start as f64),
            end: Some(region.end as f64),
        };
        let to = BpOffset {
            offset: end_offset as f64,
            ..from.clone()
        };

        log::debug!("navigating to region {index}, offsets {start_offset}..{end_offset}");
        self.move_to(Some(&from), Some(&to));

        Ok(())
    }
}

impl ZoomHost for LinearView {
    fn view_state(&self) -> &ViewState {
        &self.state
    }

    fn zoom_to(&mut self, bp_per_px: f64) -> f64 {
        if bp_per_px.is_nan() {
            return self.state.bp_per_px;
        }

        let new = clamp(bp_per_px, self.min_bp_per_px, self.max_bp_per_px());
        let old = self.state.bp_per_px;
        if new == old {
            return new;
        }

        self.state.bp_per_px = new;

        // keep the center of the view at the same coordinate
        let half = self.state.width / 2.0;
        let offset = ((self.state.offset_px + half) * old) / new - half;
        self.scroll_to(offset.round());

        new
    }

    fn scroll_to(&mut self, offset_px: f64) -> f64 {
        let offset = clamp(offset_px, self.min_offset(), self.max_offset());
        self.state.offset_px = offset;
        self.update_blocks();
        offset
    }
}

#[cfg(test)]
mod tests {
    use float_cmp::approx_eq;
    use proptest::prelude::*;

    use super::*;

    fn config(width: f64) -> ViewConfig {
        ViewConfig {
            width,
            inter_region_padding_width: 0.0,
            ..Default::default()
        }
    }

    fn two_regions() -> Vec<Region> {
        vec![Region::new("chr1", 0, 1000), Region::new("chr2", 0, 500)]
    }

    fn view_at(bp_per_px: f64, offset_px: f64) -> LinearView {
        let mut view = LinearView::new(&config(100.0));
        view.set_displayed_regions(two_regions());
        view.zoom_to(bp_per_px);
        view.scroll_to(offset_px);
        view
    }

    #[test]
    fn zoom_is_clamped() {
        let mut view = view_at(10.0, 0.0);

        assert_eq!(view.zoom_to(0.000_1), 1.0 / 50.0);
        let max = view.max_bp_per_px();
        assert!(approx_eq!(f64, max, 1500.0 / 90.0));
        assert_eq!(view.zoom_to(1e9), max);
        assert_eq!(view.bp_per_px(), max);

        // NaN leaves the scale alone
        assert_eq!(view.zoom_to(f64::NAN), max);
    }

    #[test]
    fn padding_scales_with_zoom() {
        let state = ViewState {
            bp_per_px: 4.0,
            inter_region_padding_width: 2.0,
            ..Default::default()
        };
        assert_eq!(state.inter_region_padding_bp(), 8.0);
    }

    #[test]
    fn zoom_keeps_center() {
        let mut view = view_at(10.0, 0.0);
        let before = view.px_to_bp(50.0);

        view.zoom_to(5.0);
        assert_eq!(view.offset_px(), 50.0);
        let after = view.px_to_bp(50.0);
        assert_eq!(before.coord, after.coord);
    }

    #[test]
    fn scroll_is_clamped() {
        let mut view = view_at(5.0, 50.0);

        // 300px of regions, scrolled to at most 290px
        let moved = view.horizontal_scroll(1000.0);
        assert_eq!(moved, 240.0);
        assert_eq!(view.offset_px(), 290.0);

        let moved = view.horizontal_scroll(-1000.0);
        assert_eq!(view.offset_px(), -70.0);
        assert_eq!(moved, -360.0);
    }

    #[test]
    fn blocks_follow_scroll() {
        let mut view = view_at(10.0, 0.0);
        let first = view.dynamic_blocks().content_blocks().next().unwrap().start;
        assert_eq!(first, 0.0);

        view.horizontal_scroll(20.0);
        let first = view.dynamic_blocks().content_blocks().next().unwrap().start;
        assert_eq!(first, 200.0);
    }

    #[test]
    fn nav_to_location() {
        let mut view = view_at(10.0, 0.0);
        let loc = ParsedLocString {
            ref_name: "chr2".to_string(),
            start: Some(100),
            end: Some(200),
            ..Default::default()
        };
        view.nav_to(&loc).unwrap();

        assert!(approx_eq!(f64, view.bp_per_px(), 1.0));
        let left = view.px_to_bp(0.0);
        assert_eq!(left.ref_name, "chr2");
        assert_eq!(left.coord, 101);
        let right = view.px_to_bp(99.0);
        assert_eq!(right.coord, 200);
    }

    #[test]
    fn nav_to_reversed_region() {
        let mut view = LinearView::new(&config(100.0));
        view.set_displayed_regions(vec![Region::new("chr1", 0, 1000).with_reversed(true)]);

        let loc = ParsedLocString {
            ref_name: "chr1".to_string(),
            start: Some(100),
            end: Some(200),
            ..Default::default()
        };
        view.nav_to(&loc).unwrap();

        // the left edge shows the end of the range
        assert_eq!(view.offset_px(), 800.0);
        assert_eq!(view.px_to_bp(0.0).coord, 201);
    }

    #[test]
    fn nav_to_missing_region_fails() {
        let mut view = view_at(10.0, 0.0);
        let loc = ParsedLocString {
            ref_name: "chrX".to_string(),
            ..Default::default()
        };
        assert!(view.nav_to(&loc).is_err());

        let loc = ParsedLocString {
            ref_name: "chr2".to_string(),
            start: Some(100),
            end: Some(900),
            ..Default::default()
        };
        assert!(view.nav_to(&loc).is_err());
    }

    #[test]
    fn center_at_coordinate() {
        let mut view = view_at(1.0, 0.0);
        assert!(view.center_at(200.0, "chr2", None));
        // chr2:200 is at 1200px, minus half the width
        assert_eq!(view.offset_px(), 1150.0);

        assert!(!view.center_at(10.0, "chr3", None));
        assert_eq!(view.offset_px(), 1150.0);
    }

    #[test]
    fn show_all_fits_regions() {
        let view = LinearView::with_regions(&config(100.0), two_regions());
        assert!(approx_eq!(f64, view.bp_per_px(), 1500.0 / 90.0));
        assert!(view.total_px() <= view.width());

        let content = view.dynamic_blocks().content_blocks().count();
        assert_eq!(content, 2);
    }

    #[test]
    fn set_regions_reclamps() {
        let mut view = view_at(16.0, 140.0);
        view.set_displayed_regions(vec![Region::new("chr1", 0, 100)]);
        assert!(view.bp_per_px() <= view.max_bp_per_px());
        assert!(view.offset_px() <= view.max_offset());
    }

    #[test]
    fn empty_view_is_stable() {
        let mut view = LinearView::new(&config(100.0));
        assert_eq!(view.total_bp(), 0.0);
        assert_eq!(view.max_bp_per_px(), view.min_bp_per_px());
        view.show_all_regions();
        assert!(view.dynamic_blocks().is_empty());
        assert!(view.px_to_bp(10.0).oob);
    }

    proptest! {
        #[test]
        fn zoom_stays_in_limits(zooms in proptest::collection::vec(1e-4f64..1e4, 1..20)) {
            let mut view = view_at(10.0, 0.0);
            for z in zooms {
                let applied = view.zoom_to(z);
                prop_assert!(applied >= view.min_bp_per_px());
                prop_assert!(applied <= view.max_bp_per_px());
                prop_assert!(view.offset_px() >= view.min_offset());
                prop_assert!(view.offset_px() <= view.max_offset());
            }
        }
    }
}
