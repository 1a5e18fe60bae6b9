pub mod champion_class;
pub mod duration_bucket;
pub mod grade;
pub mod job;
pub mod priority;
pub mod role;
pub mod stat_totals;
pub mod team_side;
pub mod tier;
