//! Nearest-neighbor ranking of users by mood vector similarity.

use super::similarity::{cosine_similarity, match_reason, SimilarityError};
use super::vector::{MoodVector, VectorError};
use crate::music_store::{ProfileStore, ProfileVector, UserId};
use crate::server::metrics;
use anyhow::Result;
use rayon::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Number of matches returned when the caller does not ask for a specific count.
pub const DEFAULT_TOP_K: usize = 3;

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct UserMatch {
    pub user_id: UserId,
    pub score: f64,
    pub display_name: String,
    pub match_reason: String,
}

/// Why a candidate was left out of a ranking.
#[derive(Debug, Error)]
enum CandidateError {
    #[error("no mood vector")]
    Missing,

    #[error(transparent)]
    Vector(#[from] VectorError),

    #[error(transparent)]
    Similarity(#[from] SimilarityError),
}

impl CandidateError {
    fn label(&self) -> &'static str {
        match self {
            CandidateError::Missing => "missing",
            CandidateError::Vector(_) => "malformed",
            CandidateError::Similarity(SimilarityError::DimensionMismatch(..)) => {
                "dimension_mismatch"
            }
            CandidateError::Similarity(SimilarityError::ZeroVector) => "zero_vector",
            CandidateError::Similarity(SimilarityError::NotFinite) => "not_finite",
        }
    }
}

fn score_candidate(
    target: &MoodVector,
    candidate: &ProfileVector,
) -> Result<UserMatch, CandidateError> {
    let raw = candidate
        .raw_vector
        .as_deref()
        .ok_or(CandidateError::Missing)?;
    let vector = MoodVector::parse(raw)?;
    let score = cosine_similarity(target.components(), vector.components())?;
    Ok(UserMatch {
        user_id: candidate.user_id,
        score,
        display_name: candidate.display_name.clone(),
        match_reason: match_reason(score),
    })
}

/// Ranks every other user's mood vector against a target user's.
///
/// Stateless: each call reads fresh data from the store. Data anomalies in
/// either the target or a candidate never surface as errors; only a failing
/// store does.
pub struct SimilarityMatcher {
    store: Arc<dyn ProfileStore>,
}

impl SimilarityMatcher {
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        SimilarityMatcher { store }
    }

    /// Returns at most `top_k` matches, best first. Equal scores keep the
    /// order in which the store returned the candidates.
    pub fn rank(&self, target_user_id: UserId, top_k: usize) -> Result<Vec<UserMatch>> {
        if top_k == 0 {
            return Ok(vec![]);
        }

        let raw_target = match self
            .store
            .get_profile(target_user_id)?
            .and_then(|profile| profile.mood_vector)
        {
            Some(raw) => raw,
            None => {
                debug!("User {} has no mood vector, no matches", target_user_id);
                return Ok(vec![]);
            }
        };
        let target = match MoodVector::parse(&raw_target) {
            Ok(vector) => vector,
            Err(err) => {
                debug!("User {} has an unusable mood vector: {}", target_user_id, err);
                return Ok(vec![]);
            }
        };

        let candidates = self.store.get_candidate_vectors(target_user_id)?;
        let mut matches: Vec<UserMatch> = candidates
            .par_iter()
            .filter(|candidate| candidate.user_id != target_user_id)
            .filter_map(|candidate| match score_candidate(&target, candidate) {
                Ok(user_match) => Some(user_match),
                Err(err) => {
                    debug!("Skipping candidate {}: {}", candidate.user_id, err);
                    metrics::record_skipped_candidate(err.label());
                    None
                }
            })
            .collect();

        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches.truncate(top_k);
        metrics::record_ranking(candidates.len());

        Ok(matches)
    }
}
