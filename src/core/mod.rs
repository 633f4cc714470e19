// Core algorithm exports
pub mod commute;
pub mod conflicts;
pub mod distance;
pub mod matcher;
pub mod normalize;
pub mod retrieval;
pub mod rooms;
pub mod scoring;
pub mod tips;

pub use commute::{enrich_with_commute, eta_minutes};
pub use conflicts::{commute_cost_pkr, red_flags, CommuteTier};
pub use distance::{geo_distance, geo_distance_km, haversine_distance, Distance, UNAVAILABLE_DISTANCE_KM};
pub use matcher::{Matcher, PipelineOptions, PipelineResult, Trace, TraceStep};
pub use normalize::{normalize_city, normalize_profile};
pub use retrieval::{CandidateRetrieval, CandidateSearch, NoSearchIndex, RetrievalMeta, RetrievalMode};
pub use rooms::{rank_rooms, rank_rooms_with, RoomFilters};
pub use scoring::{score_pair, PairScore};
pub use tips::wingman_tips;
