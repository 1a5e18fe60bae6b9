pub mod baselines;
pub mod build_keys;
pub mod constants;
pub mod contribution;
pub mod player_view;
pub mod processor;
pub mod scoring;
pub mod structures;
pub mod timeline_stats;
