use std::cmp::Ordering;

use tracing::debug;

use crate::core::config::BboxPolicy;
use crate::core::geometry::BBox;
use crate::core::model::{Detection, SpatialCluster};

/// Horizontal reach relative to the vertical proximity threshold.
const HORIZONTAL_FACTOR: f32 = 3.0;

#[derive(Debug, Clone, Copy)]
pub struct SpatialGrouper {
    proximity: f32,
    policy: BboxPolicy,
}

impl SpatialGrouper {
    pub fn new(proximity: f32, policy: BboxPolicy) -> Self {
        Self { proximity, policy }
    }

    /// Partitions detections into reading-order clusters. Each detection is
    /// compared with the last one added to the open cluster, never with a
    /// centroid.
    pub fn group(&self, detections: &[Detection]) -> Vec<SpatialCluster> {
        let mut placed: Vec<(BBox, &Detection)> = Vec::with_capacity(detections.len());
        let mut unplaced: Vec<&Detection> = Vec::new();
        for detection in detections {
            match detection.bbox {
                Some(bbox) => placed.push((bbox, detection)),
                None => unplaced.push(detection),
            }
        }

        placed.sort_by(|(a_box, a), (b_box, b)| reading_order(a_box, a, b_box, b));

        let mut clusters = Vec::new();
        let mut current: Vec<Detection> = Vec::new();
        let mut last: Option<BBox> = None;

        for (bbox, detection) in placed {
            if let Some(prev) = last {
                if !self.is_nearby(&prev, &bbox) {
                    clusters.push(SpatialCluster {
                        detections: std::mem::take(&mut current),
                        fallback: false,
                    });
                }
            }
            current.push(detection.clone());
            last = Some(bbox);
        }
        if !current.is_empty() {
            clusters.push(SpatialCluster {
                detections: current,
                fallback: false,
            });
        }

        if !unplaced.is_empty() {
            match self.policy {
                BboxPolicy::Fallback => clusters.push(SpatialCluster {
                    detections: unplaced.into_iter().cloned().collect(),
                    fallback: true,
                }),
                BboxPolicy::Drop => {
                    debug!(count = unplaced.len(), "dropping detections without bbox");
                }
            }
        }

        clusters
    }

    fn is_nearby(&self, last: &BBox, next: &BBox) -> bool {
        let y_dist = (next.y0 - last.y0).abs();
        if y_dist > self.proximity {
            return false;
        }
        let x_dist = (next.x0 - last.x0).abs();
        x_dist < self.proximity * HORIZONTAL_FACTOR
    }
}

/// Top-to-bottom, then left-to-right. The remaining keys only break exact ties
/// so that input order never leaks into the result.
fn reading_order(a_box: &BBox, a: &Detection, b_box: &BBox, b: &Detection) -> Ordering {
    a_box
        .y0
        .total_cmp(&b_box.y0)
        .then(a_box.x0.total_cmp(&b_box.x0))
        .then(a_box.x1.total_cmp(&b_box.x1))
        .then(a_box.y1.total_cmp(&b_box.y1))
        .then_with(|| a.engine.cmp(&b.engine))
        .then_with(|| a.text.cmp(&b.text))
        .then(a.confidence.total_cmp(&b.confidence))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn det(text: &str, engine: &str, x0: f32, y0: f32) -> Detection {
        Detection::new(text, 0.9, engine).with_bbox(BBox::new(x0, y0, x0 + 40.0, y0 + 10.0))
    }

    fn texts(clusters: &[SpatialCluster]) -> Vec<Vec<&str>> {
        clusters
            .iter()
            .map(|c| c.detections.iter().map(|d| d.text.as_str()).collect())
            .collect()
    }

    #[test]
    fn empty_input_yields_no_clusters() {
        let grouper = SpatialGrouper::new(50.0, BboxPolicy::Fallback);
        assert!(grouper.group(&[]).is_empty());
    }

    #[test]
    fn single_detection_is_singleton() {
        let grouper = SpatialGrouper::new(50.0, BboxPolicy::Fallback);
        let clusters = grouper.group(&[det("only", "A", 10.0, 10.0)]);
        assert_eq!(texts(&clusters), vec![vec!["only"]]);
    }

    #[test]
    fn splits_on_vertical_and_horizontal_gaps() {
        // "first-b" sorts after "far-right" (y0 5 > 0), so it is compared
        // with the far-right word and starts its own cluster.
        let grouper = SpatialGrouper::new(50.0, BboxPolicy::Fallback);
        let input = vec![
            det("far-right", "A", 400.0, 0.0),
            det("line2", "A", 0.0, 100.0),
            det("first", "A", 0.0, 0.0),
            det("first-b", "B", 20.0, 5.0),
        ];
        let clusters = grouper.group(&input);
        assert_eq!(
            texts(&clusters),
            vec![
                vec!["first"],
                vec!["far-right"],
                vec!["first-b"],
                vec!["line2"]
            ]
        );
    }

    #[test]
    fn compares_against_last_member_not_first() {
        let grouper = SpatialGrouper::new(50.0, BboxPolicy::Fallback);
        // each step is 40 units down, so the chain stays together even though
        // the last member is 120 units below the first.
        let input = vec![
            det("a", "A", 0.0, 0.0),
            det("b", "A", 0.0, 40.0),
            det("c", "A", 0.0, 80.0),
            det("d", "A", 0.0, 120.0),
        ];
        assert_eq!(grouper.group(&input).len(), 1);
    }

    #[test]
    fn horizontal_limit_is_exclusive() {
        let grouper = SpatialGrouper::new(50.0, BboxPolicy::Fallback);
        let input = vec![det("a", "A", 0.0, 0.0), det("b", "A", 150.0, 0.0)];
        assert_eq!(grouper.group(&input).len(), 2);

        let input = vec![det("a", "A", 0.0, 0.0), det("b", "A", 149.0, 0.0)];
        assert_eq!(grouper.group(&input).len(), 1);
    }

    #[test]
    fn vertical_limit_is_inclusive() {
        let grouper = SpatialGrouper::new(50.0, BboxPolicy::Fallback);
        let input = vec![det("a", "A", 0.0, 0.0), det("b", "A", 0.0, 50.0)];
        assert_eq!(grouper.group(&input).len(), 1);
    }

    #[test]
    fn bboxless_detections_follow_policy() {
        let input = vec![
            Detection::new("loose-1", 0.9, "A"),
            det("boxed", "A", 0.0, 0.0),
            Detection::new("loose-2", 0.8, "B"),
        ];

        let fallback = SpatialGrouper::new(50.0, BboxPolicy::Fallback).group(&input);
        assert_eq!(texts(&fallback), vec![vec!["boxed"], vec!["loose-1", "loose-2"]]);
        assert!(!fallback[0].fallback);
        assert!(fallback[1].fallback);

        let dropped = SpatialGrouper::new(50.0, BboxPolicy::Drop).group(&input);
        assert_eq!(texts(&dropped), vec![vec!["boxed"]]);
    }

    #[test]
    fn partitions_every_boxed_detection() {
        let grouper = SpatialGrouper::new(30.0, BboxPolicy::Drop);
        let input: Vec<Detection> = (0..40)
            .map(|i| {
                let x = ((i * 37) % 500) as f32;
                let y = ((i * 53) % 700) as f32;
                det(&format!("w{i}"), if i % 2 == 0 { "A" } else { "B" }, x, y)
            })
            .collect();

        let clusters = grouper.group(&input);
        let mut seen: Vec<String> = clusters
            .iter()
            .flat_map(|c| c.detections.iter().map(|d| d.text.clone()))
            .collect();
        seen.sort();
        let mut expected: Vec<String> = input.iter().map(|d| d.text.clone()).collect();
        expected.sort();
        assert_eq!(seen, expected);
    }

    #[test]
    fn input_order_does_not_change_clusters() {
        let grouper = SpatialGrouper::new(50.0, BboxPolicy::Fallback);
        let input = vec![
            det("Acme", "A", 0.0, 0.0),
            det("Acme", "B", 0.0, 0.0),
            det("Corp", "C", 60.0, 2.0),
            det("Total", "A", 0.0, 200.0),
            det("Tota1", "B", 1.0, 201.0),
        ];
        let expected = grouper.group(&input);

        let mut reversed = input.clone();
        reversed.reverse();
        assert_eq!(grouper.group(&reversed), expected);

        let mut rotated = input.clone();
        rotated.rotate_left(2);
        assert_eq!(grouper.group(&rotated), expected);
    }
}
