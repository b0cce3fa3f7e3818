mod status;

pub use status::{format_ago, format_time_left, tier_hint, tier_marker, StatusView};
