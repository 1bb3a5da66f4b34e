//! Time-weighted scoring for correct answers.

/// Points awarded for an instant correct answer.
pub const BASE_POINTS: i32 = 1000;
/// Floor for any awarded score.
pub const MIN_POINTS: i32 = 0;

/// Points for a correct answer given the seconds taken and the question's
/// time limit. Faster answers score closer to [`BASE_POINTS`]; answers at or
/// beyond the limit score [`MIN_POINTS`].
///
/// A non-positive time limit is a misconfigured question and must not
/// punish players, so it yields the full score.
pub fn calculate_points(elapsed_seconds: f64, time_limit_seconds: u32) -> i32 {
    if time_limit_seconds == 0 {
        return BASE_POINTS;
    }
    let ratio = (1.0 - elapsed_seconds / f64::from(time_limit_seconds)).max(0.0);
    let points = (f64::from(BASE_POINTS) * ratio).round() as i32;
    points.clamp(MIN_POINTS, BASE_POINTS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scores_scale_with_answer_speed() {
        let cases = [
            ("instant answer", 0.0, 20, 990..=1000),
            ("half time", 10.0, 20, 490..=510),
            ("at limit", 20.0, 20, 0..=0),
            ("over limit", 25.0, 20, 0..=0),
            ("zero time limit", 5.0, 0, 1000..=1000),
        ];

        for (name, elapsed, limit, want) in cases {
            let got = calculate_points(elapsed, limit);
            assert!(want.contains(&got), "{name}: got {got}, want {want:?}");
        }
    }

    #[test]
    fn faster_answers_always_score_at_least_as_much() {
        let mut previous = calculate_points(0.0, 30);
        for tenths in 1..=350 {
            let elapsed = f64::from(tenths) / 10.0;
            let points = calculate_points(elapsed, 30);
            assert!(
                points <= previous,
                "points increased at {elapsed}s: {points} > {previous}"
            );
            previous = points;
        }
        assert_eq!(previous, 0);
    }

    #[test]
    fn scores_stay_clamped() {
        // A clock skew can make elapsed negative; the award still caps out.
        assert_eq!(calculate_points(-3.0, 20), BASE_POINTS);
        assert_eq!(calculate_points(1e9, 20), MIN_POINTS);
    }
}
