mod matcher;
mod similarity;
mod vector;

pub use matcher::{SimilarityMatcher, UserMatch, DEFAULT_TOP_K};
pub use similarity::{cosine_similarity, match_reason, SimilarityError};
pub use vector::{MoodVector, VectorError};
