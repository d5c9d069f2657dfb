use crate::core::model::{Detection, TextCluster};
use crate::fusion::compare::text_ratio;

/// Groups near-duplicate readings within one spatial cluster.
///
/// Matching is first-match-wins against each cluster's representative (the
/// first text that opened it), in the order detections are given. No global
/// best match is searched, so the same detections in a different order can
/// produce different representatives.
#[derive(Debug, Clone, Copy)]
pub struct TextClusterer {
    min_confidence: f32,
    similarity_threshold: f32,
}

impl TextClusterer {
    pub fn new(min_confidence: f32, similarity_threshold: u32) -> Self {
        Self {
            min_confidence,
            similarity_threshold: similarity_threshold as f32,
        }
    }

    pub fn cluster<'a>(&self, detections: &'a [Detection]) -> Vec<TextCluster<'a>> {
        let mut clusters: Vec<TextCluster<'a>> = Vec::new();

        for detection in detections {
            if detection.confidence < self.min_confidence {
                continue;
            }

            let target = clusters.iter_mut().find(|cluster| {
                text_ratio(&detection.text, cluster.representative) > self.similarity_threshold
            });

            match target {
                Some(cluster) => cluster.members.push(detection),
                None => clusters.push(TextCluster {
                    representative: &detection.text,
                    members: vec![detection],
                }),
            }
        }

        clusters
    }
}
