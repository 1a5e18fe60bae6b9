use serde::{Deserialize, Serialize};

/// Dispatch priority for upstream calls going through the gateway.
///
/// Interactive calls are made on behalf of a waiting user and may consume
/// the whole request budget; background calls (tier scans, backfills) only
/// run while headroom above the interactive reserve remains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Interactive,
    Background
}

#[cfg(test)]
mod tests {
    use super::Priority;

    #[test]
    fn test_interactive_sorts_first() {
        let mut priorities = vec![Priority::Background, Priority::Interactive, Priority::Background];
        priorities.sort();
        assert_eq!(priorities[0], Priority::Interactive);
    }
}
