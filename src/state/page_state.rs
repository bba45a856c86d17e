/// Page state definitions for tracking crawl progress
///
/// This module defines every state a URL can be in during one crawl run.
use std::fmt;

/// Represents the current state of a URL in the crawl process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageState {
    // ===== Active States =====
    /// URL is known but nobody has claimed it
    Unvisited,

    /// URL has been claimed by a worker and will be fetched
    Scheduled,

    /// The one network fetch for this URL is in flight
    Fetching,

    // ===== Resolved States =====
    /// Fetch finished and the target is reachable
    Succeeded,

    /// Fetch finished with an error
    Failed,

    // ===== Origin Page States =====
    /// The page's links are being checked
    Expanded,

    /// The page's CrawlResult has been emitted
    Reported,
}

impl PageState {
    /// Returns true if moving to `next` is a legal transition
    ///
    /// ```text
    /// Unvisited -> Scheduled -> Fetching -> Succeeded -> Expanded -> Reported
    ///                                    \-> Failed ----------------/
    /// ```
    ///
    /// A seed that is reachable but not HTML goes straight from `Succeeded` to
    /// `Reported`; a seed that fails is reported from `Failed`.
    pub fn can_transition_to(&self, next: PageState) -> bool {
        matches!(
            (self, next),
            (Self::Unvisited, Self::Scheduled)
                | (Self::Scheduled, Self::Fetching)
                | (Self::Fetching, Self::Succeeded)
                | (Self::Fetching, Self::Failed)
                | (Self::Succeeded, Self::Expanded)
                | (Self::Succeeded, Self::Reported)
                | (Self::Failed, Self::Reported)
                | (Self::Expanded, Self::Reported)
        )
    }

    /// Converts the page state to its display representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unvisited => "unvisited",
            Self::Scheduled => "scheduled",
            Self::Fetching => "fetching",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Expanded => "expanded",
            Self::Reported => "reported",
        }
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        let path = [
            PageState::Unvisited,
            PageState::Scheduled,
            PageState::Fetching,
            PageState::Succeeded,
            PageState::Expanded,
            PageState::Reported,
        ];
        for pair in path.windows(2) {
            assert!(
                pair[0].can_transition_to(pair[1]),
                "{} -> {} should be legal",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_failed_seed_can_be_reported() {
        assert!(PageState::Fetching.can_transition_to(PageState::Failed));
        assert!(PageState::Failed.can_transition_to(PageState::Reported));
    }

    #[test]
    fn test_illegal_transitions() {
        assert!(!PageState::Unvisited.can_transition_to(PageState::Fetching));
        assert!(!PageState::Scheduled.can_transition_to(PageState::Succeeded));
        assert!(!PageState::Failed.can_transition_to(PageState::Expanded));
        assert!(!PageState::Reported.can_transition_to(PageState::Expanded));
        assert!(!PageState::Succeeded.can_transition_to(PageState::Fetching));
    }

    #[test]
    fn test_display() {
        assert_eq!(PageState::Expanded.to_string(), "expanded");
        assert_eq!(format!("{}", PageState::Unvisited), "unvisited");
    }
}
