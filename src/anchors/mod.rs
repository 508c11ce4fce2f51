//! Anchor registry and the metadata feed that populates it

pub mod registry;
pub mod feed;

pub use registry::{seed_anchors, AnchorRegistry, RegistryStatus};
pub use feed::{parse_anchor_feed, read_anchor_feed, AnchorFeedRecord, FeedError};
