// Model exports
pub mod domain;
pub mod requests;
pub mod responses;
pub mod tuning;

pub use domain::{
    AnchorLocation, Conflict, ConflictKind, Coordinates, GeoPoint, GuestsFreq, Level, Listing,
    NotificationStatus, Profile, RankedRoom, RawProfile, Role, ScoredMatch, Severity,
    SleepSchedule, Smoking, SubScores,
};
pub use requests::{PairScoreRequest, RoomSuggestRequest, TopMatchesRequest, WatcherRunRequest};
pub use responses::{
    ErrorResponse, HealthResponse, PairScoreResponse, RoomSuggestResponse, TopMatchesResponse,
};
pub use tuning::{
    default_anchor_buckets, AnchorBonusStep, AnchorBucket, MatchScoreConfig, RetrievalConfig,
    ScoringWeights, WatcherConfig,
};
