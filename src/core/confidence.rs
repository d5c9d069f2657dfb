/// Weighted score of a text candidate: the confidence sum, boosted for every
/// engine beyond the first that agrees on it.
///
/// The bonus counts corroborating engines (`distinct - 1`), not all of them,
/// so a reading seen by a single engine scores exactly its confidence sum.
pub fn agreement_score(confidence_sum: f32, distinct_engines: usize, bonus: f32) -> f32 {
    let corroborating = distinct_engines.saturating_sub(1) as f32;
    confidence_sum * (1.0 + bonus * corroborating)
}

pub fn mean_confidence<I>(values: I) -> f32
where
    I: IntoIterator<Item = f32>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0.0_f32, 0_usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f32
    }
}

/// Mean over regions that produced a winner; regions without one are skipped,
/// not counted as zero.
pub fn overall_confidence<I>(values: I) -> f32
where
    I: IntoIterator<Item = f32>,
{
    mean_confidence(values.into_iter().filter(|v| *v != 0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_engine_gets_no_bonus() {
        assert_eq!(agreement_score(1.6, 1, 0.1), 1.6);
        assert_eq!(agreement_score(0.0, 0, 0.1), 0.0);
    }

    #[test]
    fn two_engines_get_one_bonus_step() {
        let score = agreement_score(1.75, 2, 0.1);
        assert!((score - 1.925).abs() < 1e-5);
    }

    #[test]
    fn overall_skips_empty_regions() {
        assert!((overall_confidence([0.9, 0.0, 0.7]) - 0.8).abs() < 1e-6);
        assert_eq!(overall_confidence([0.0, 0.0]), 0.0);
        assert_eq!(mean_confidence(std::iter::empty()), 0.0);
    }
}
