use anyhow::Context;
use clap::Parser;

use locview::blocks::{Block, BlockKind, BlockSet};
use locview::cli::{Cli, Command};
use locview::config::{self, ViewConfig};
use locview::feature::{read_bedgraph, SimpleFeature};
use locview::locstring::{assemble_loc_string, parse_loc_string};
use locview::region::Region;
use locview::ruler::{get_bp_display_str, get_tick_display_str, make_ticks};
use locview::sequences::RefNames;
use locview::stats::scores_to_stats;
use locview::view::{LinearView, ZoomHost};

pub fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    let view_config = load_config(&cli)?;
    let refs = load_refs(&cli)?;

    match &cli.command {
        Command::Parse { locs } => print_parsed(&refs, locs),
        Command::Blocks { locs } => {
            let view = build_view(&cli, &view_config, parse_regions(&refs, locs)?);
            print_blocks(&view);
            Ok(())
        }
        Command::Px { px, locs } => {
            let view = build_view(&cli, &view_config, parse_regions(&refs, locs)?);
            print_px(&view, px);
            Ok(())
        }
        Command::Stats { bedgraph, locs } => {
            let view = build_view(&cli, &view_config, parse_regions(&refs, locs)?);

            let reader = std::fs::File::open(bedgraph)
                .map(std::io::BufReader::new)
                .with_context(|| format!("Error opening bedGraph {bedgraph:?}"))?;
            let mut features = read_bedgraph(reader)
                .with_context(|| format!("Error parsing bedGraph {bedgraph:?}"))?;

            // match the view's naming
            for feature in features.iter_mut() {
                if let Some(name) = refs.canonical_name(&feature.ref_name) {
                    feature.ref_name = name.to_string();
                }
            }

            print_stats(&view, &features);
            Ok(())
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<ViewConfig> {
    let mut view_config = match &cli.config {
        Some(path) => config::read_view_config(path)
            .with_context(|| format!("Error loading view config {path:?}"))?,
        None => config::load_view_config().unwrap_or_else(|err| {
            log::debug!("Using default view config: {err:?}");
            ViewConfig::default()
        }),
    };

    if let Some(width) = cli.width {
        view_config.width = width;
    }

    if cli.save_config {
        let path = config::save_view_config(&view_config)?;
        log::info!("Saved view config to {path:?}");
    }

    Ok(view_config)
}

fn load_refs(cli: &Cli) -> anyhow::Result<RefNames> {
    let mut refs = RefNames::read_sizes_file(&cli.refs, cli.assembly.clone())?;

    if let Some(aliases) = &cli.aliases {
        let count = refs.read_alias_file(aliases)?;
        log::info!("Loaded {count} reference name aliases");
    }

    log::info!("Loaded {} reference sequences", refs.len());

    Ok(refs)
}

fn parse_regions(refs: &RefNames, locs: &[String]) -> anyhow::Result<Vec<Region>> {
    locs.iter()
        .map(|loc| {
            let parsed = parse_loc_string(loc, |name, asm| refs.is_valid_ref_name(name, asm))
                .with_context(|| format!("Invalid location `{loc}`"))?;
            refs.region_for(&parsed)
                .with_context(|| format!("Unknown reference sequence in `{loc}`"))
        })
        .collect()
}

fn build_view(cli: &Cli, view_config: &ViewConfig, regions: Vec<Region>) -> LinearView {
    let mut view = LinearView::with_regions(view_config, regions);

    if let Some(bp_per_px) = cli.bp_per_px {
        let applied = view.zoom_to(bp_per_px);
        if applied != bp_per_px {
            log::warn!("Zoom level {bp_per_px} is out of range, using {applied}");
        }
    }

    if let Some(offset_px) = cli.offset_px {
        view.scroll_to(offset_px);
    }

    view
}

fn print_parsed(refs: &RefNames, locs: &[String]) -> anyhow::Result<()> {
    let mut failed = 0;

    for loc in locs {
        match parse_loc_string(loc, |name, asm| refs.is_valid_ref_name(name, asm)) {
            Ok(parsed) => {
                let region = refs.region_for(&parsed);
                let normalized = region
                    .as_ref()
                    .map(|r| assemble_loc_string(&r.to_parsed()))
                    .unwrap_or_else(|| assemble_loc_string(&parsed));

                let span = region
                    .map(|r| format!("{}\t{}\t{}", r.ref_name, r.start, r.end))
                    .unwrap_or_default();

                println!("{loc}\t{normalized}\t{span}");
            }
            Err(err) => {
                eprintln!("{loc}\terror: {err}");
                failed += 1;
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} locations could not be parsed", locs.len());
    }

    Ok(())
}

fn kind_label(kind: BlockKind) -> &'static str {
    match kind {
        BlockKind::Content => "content",
        BlockKind::Elided => "elided",
        BlockKind::InterRegionPadding => "padding",
        BlockKind::BoundaryPadding => "boundary",
    }
}

fn print_block_set(label: &str, blocks: &BlockSet) {
    println!("{label} ({} blocks, {:.1}px)", blocks.len(), blocks.total_width_px());
    for block in blocks.blocks() {
        println!(
            "  {:<8} {:>10.1} {:>10.1} {:>12}  {}",
            kind_label(block.kind),
            block.offset_px,
            block.width_px,
            get_bp_display_str(block.len_bp()),
            block.key
        );
    }
}

fn tick_labels(block: &Block, bp_per_px: f64) -> Vec<String> {
    make_ticks(block.start, block.end, bp_per_px, true, false)
        .into_iter()
        .filter(|tick| tick.base >= block.start && tick.base < block.end)
        .map(|tick| get_tick_display_str(tick.base + 1.0, bp_per_px))
        .collect()
}

fn print_blocks(view: &LinearView) {
    println!(
        "{} across {} regions, {:.3} bp/px, offset {}px, width {}px",
        get_bp_display_str(view.total_bp()),
        view.displayed_regions().len(),
        view.bp_per_px(),
        view.offset_px(),
        view.width()
    );

    print_block_set("static", view.static_blocks());
    print_block_set("dynamic", view.dynamic_blocks());

    println!("ticks");
    for block in view.dynamic_blocks().content_blocks() {
        let labels = tick_labels(block, view.bp_per_px());
        println!("  {}: {}", block.ref_name, labels.join(" "));
    }
}

fn print_px(view: &LinearView, pxs: &[f64]) {
    let mapper = view.mapper();

    for &px in pxs {
        let result = mapper.px_to_bp(px);
        let back = if result.oob {
            None
        } else {
            mapper.bp_to_px(&result.ref_name, result.coord as f64, Some(result.index))
        };

        match back {
            Some(back) => println!(
                "{px}\t{result}\tregion {}\t{}px",
                result.index,
                back.offset_px - view.offset_px()
            ),
            None => println!("{px}\t{result}\tregion {}", result.index),
        }
    }
}

fn fmt_stat(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.3}")).unwrap_or_else(|| "-".to_string())
}

fn print_stats(view: &LinearView, features: &[SimpleFeature]) {
    println!("block\tcount\tmean\tstd_dev\tmin\tmax\tdensity");

    for block in view.dynamic_blocks().content_blocks() {
        let region = block.to_region();
        let overlapping = features.iter().filter(|f| {
            f.ref_name == region.ref_name && f.end > region.start && f.start < region.end
        });

        let stats = scores_to_stats(&region, overlapping);

        println!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            region,
            fmt_stat(stats.feature_count),
            fmt_stat(stats.score_mean),
            fmt_stat(stats.score_std_dev),
            fmt_stat(stats.score_min),
            fmt_stat(stats.score_max),
            fmt_stat(stats.feature_density),
        );
    }
}
