pub mod locstring;
pub mod region;
pub mod ruler;
pub mod sequences;

pub mod blocks;
pub mod mapping;
pub mod view;

pub mod feature;
pub mod stats;

pub mod reaction;

pub mod cli;
pub mod config;

pub use blocks::{Block, BlockKind, BlockSet, Blocks};
pub use config::ViewConfig;
pub use feature::{Feature, FeatureValue, SimpleFeature};
pub use locstring::{LocStringError, ParsedLocString};
pub use mapping::{BpOffset, BpToPx, CoordinateMapper, PxToBp};
pub use reaction::{AbortableReaction, Alive, CancelToken, ReactionState};
pub use region::Region;
pub use sequences::{RefNames, SeqId};
pub use stats::{FeatureStats, UnrectifiedFeatureStats};
pub use view::{LinearView, ViewState, ZoomHost};
