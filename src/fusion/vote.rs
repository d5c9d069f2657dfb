use std::collections::BTreeSet;

use crate::core::confidence::{agreement_score, mean_confidence};
use crate::core::model::{CandidateReport, TextCluster, VotingOutcome};

#[derive(Debug, Clone, Copy)]
pub struct ConfidenceWeightedVoter {
    agreement_bonus: f32,
}

#[derive(Debug, Clone)]
pub struct Ballot {
    pub outcome: VotingOutcome,
    pub candidates: Vec<CandidateReport>,
    pub winner: Option<usize>,
}

impl ConfidenceWeightedVoter {
    pub fn new(agreement_bonus: f32) -> Self {
        Self { agreement_bonus }
    }

    pub fn score(&self, cluster: &TextCluster<'_>) -> f32 {
        let sum: f32 = cluster.members.iter().map(|d| d.confidence).sum();
        agreement_score(sum, distinct_engines(cluster).len(), self.agreement_bonus)
    }

    /// Highest score wins; on a tie the earlier candidate is kept.
    pub fn vote(&self, clusters: &[TextCluster<'_>]) -> Ballot {
        let candidates: Vec<CandidateReport> = clusters
            .iter()
            .map(|cluster| CandidateReport {
                text: cluster.representative.to_string(),
                score: self.score(cluster),
                members: cluster.members.len(),
                engines: distinct_engines(cluster).into_iter().map(String::from).collect(),
            })
            .collect();

        let mut winner: Option<usize> = None;
        for (idx, candidate) in candidates.iter().enumerate() {
            match winner {
                Some(best) if candidate.score <= candidates[best].score => {}
                _ => winner = Some(idx),
            }
        }

        let outcome = match winner {
            Some(idx) => VotingOutcome {
                text: clusters[idx].representative.to_string(),
                confidence: mean_confidence(clusters[idx].members.iter().map(|d| d.confidence)),
            },
            None => VotingOutcome::empty(),
        };

        Ballot {
            outcome,
            candidates,
            winner,
        }
    }
}

fn distinct_engines<'a>(cluster: &TextCluster<'a>) -> BTreeSet<&'a str> {
    cluster.members.iter().map(|d| d.engine.as_str()).collect()
}
