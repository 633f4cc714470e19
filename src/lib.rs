//! Roomie Match - roommate matching and room ranking service
//!
//! This library provides the matching pipeline: profile normalization,
//! candidate retrieval, weighted pair scoring with red flags, room ranking
//! with commute estimates, and the auto-hunt watcher cycle.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{haversine_distance, score_pair, Matcher, PipelineOptions, PipelineResult, RetrievalMode};
pub use models::{Listing, MatchScoreConfig, Profile, RawProfile, RetrievalConfig, ScoredMatch, ScoringWeights};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let matcher = Matcher::default();
        assert_eq!(matcher.match_config().weights, ScoringWeights::default());
        assert!(haversine_distance(31.5204, 74.3587, 31.5204, 74.3587) < 1e-9);
    }
}
