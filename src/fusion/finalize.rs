use crate::core::confidence::overall_confidence;
use crate::core::model::{ClusterReport, Reconciliation};

/// Joins the winners of every region, in region order, into the final
/// transcription.
pub fn assemble(clusters: Vec<ClusterReport>) -> Reconciliation {
    let winners: Vec<&str> = clusters
        .iter()
        .map(|c| c.outcome.text.as_str())
        .filter(|text| !text.is_empty())
        .collect();
    let text = winners.join(" ");
    let word_count = winners.len();
    let average_confidence = overall_confidence(clusters.iter().map(|c| c.outcome.confidence));

    Reconciliation {
        text,
        average_confidence,
        word_count,
        clusters,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::VotingOutcome;
    use pretty_assertions::assert_eq;

    fn report(index: usize, text: &str, confidence: f32) -> ClusterReport {
        ClusterReport {
            index,
            detections: Vec::new(),
            bbox: None,
            fallback: false,
            candidates: Vec::new(),
            outcome: VotingOutcome {
                text: text.to_string(),
                confidence,
            },
        }
    }

    #[test]
    fn skips_regions_without_winner() {
        let result = assemble(vec![
            report(0, "Acme", 0.9),
            report(1, "", 0.0),
            report(2, "Corp", 0.7),
        ]);
        assert_eq!(result.text, "Acme Corp");
        assert_eq!(result.word_count, 2);
        assert!((result.average_confidence - 0.8).abs() < 1e-6);
        assert_eq!(result.clusters.len(), 3);
    }

    #[test]
    fn empty_input_is_a_valid_result() {
        let result = assemble(Vec::new());
        assert_eq!(result.text, "");
        assert_eq!(result.word_count, 0);
        assert_eq!(result.average_confidence, 0.0);
    }
}
