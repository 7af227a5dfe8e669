/// Mean of the recorded (non-absent) scores, rounded to two decimals.
///
/// Returns `0.0` when nothing has been recorded.
pub fn compute_average(scores: &[Option<u32>]) -> f64 {
    let (sum, count) = scores
        .iter()
        .flatten()
        .fold((0u64, 0u64), |(s, c), &v| (s + u64::from(v), c + 1));

    if count == 0 {
        return 0.0;
    }
    round2(sum as f64 / count as f64)
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_absent_games() {
        assert_eq!(compute_average(&[Some(200), None, Some(180)]), 190.0);
    }

    #[test]
    fn empty_and_all_absent_are_zero() {
        assert_eq!(compute_average(&[]), 0.0);
        assert_eq!(compute_average(&[None, None]), 0.0);
    }

    #[test]
    fn rounds_to_two_decimals() {
        assert_eq!(compute_average(&[Some(210), Some(195)]), 202.5);
        assert_eq!(compute_average(&[Some(100), Some(100), Some(101)]), 100.33);
        assert_eq!(compute_average(&[Some(100), Some(101), Some(101)]), 100.67);
    }
}
