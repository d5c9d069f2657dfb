pub mod cluster;
pub mod compare;
pub mod finalize;
pub mod spatial;
pub mod vote;

use crate::core::config::EnsembleConfig;
use crate::core::model::{ClusterReport, Detection, Reconciliation};

use self::cluster::TextClusterer;
use self::spatial::SpatialGrouper;
use self::vote::ConfidenceWeightedVoter;

pub trait Reconciler {
    fn reconcile(&self, detections: &[Detection]) -> Reconciliation;
}

/// Spatial grouping, then text clustering and voting per region.
#[derive(Debug, Clone, Copy)]
pub struct VotingReconciler {
    grouper: SpatialGrouper,
    clusterer: TextClusterer,
    voter: ConfidenceWeightedVoter,
}

impl VotingReconciler {
    pub fn new(config: &EnsembleConfig) -> Self {
        Self {
            grouper: SpatialGrouper::new(config.spatial_proximity, config.bbox_policy),
            clusterer: TextClusterer::new(config.min_confidence, config.similarity_threshold),
            voter: ConfidenceWeightedVoter::new(config.agreement_bonus),
        }
    }
}

impl Default for VotingReconciler {
    fn default() -> Self {
        Self::new(&EnsembleConfig::default())
    }
}

impl Reconciler for VotingReconciler {
    fn reconcile(&self, detections: &[Detection]) -> Reconciliation {
        let reports = self
            .grouper
            .group(detections)
            .into_iter()
            .enumerate()
            .map(|(index, region)| {
                let text_clusters = self.clusterer.cluster(&region.detections);
                let ballot = self.voter.vote(&text_clusters);
                tracing::trace!(
                    index,
                    members = region.detections.len(),
                    candidates = ballot.candidates.len(),
                    winner = %ballot.outcome.text,
                    "region voted"
                );
                ClusterReport {
                    index,
                    bbox: region.bbox(),
                    fallback: region.fallback,
                    candidates: ballot.candidates,
                    outcome: ballot.outcome,
                    detections: region.detections,
                }
            })
            .collect();

        finalize::assemble(reports)
    }
}
