//! Weighted activity selection.
//!
//! Given the current time-of-day bucket and a candidate list, pick one
//! activity by cumulative-weight draw. The random source is injected so
//! selection is reproducible in tests.

use rand::Rng;

use crate::activity::{Activity, TimeOfDay};

/// Map an hour of day (0-23) to its bucket.
pub fn bucket_for(hour: u32) -> TimeOfDay {
    match hour {
        6..=9 => TimeOfDay::EarlyMorning,
        10..=11 => TimeOfDay::LateMorning,
        12..=14 => TimeOfDay::Midday,
        15..=17 => TimeOfDay::Afternoon,
        18..=20 => TimeOfDay::Evening,
        21..=23 => TimeOfDay::LateEvening,
        _ => TimeOfDay::Any,
    }
}

/// Pick one activity for `bucket` from `candidates`.
///
/// Eligible candidates are active and match the bucket (or are tagged
/// `Any`). Draws a uniform integer in `[0, total_weight)` and walks the
/// candidates in their given order, subtracting each weight until the draw
/// goes negative; that candidate wins. Returns `None` when nothing is
/// eligible.
pub fn select<'a, R: Rng + ?Sized>(
    bucket: TimeOfDay,
    candidates: &'a [Activity],
    rng: &mut R,
) -> Option<&'a Activity> {
    let eligible: Vec<&Activity> = candidates
        .iter()
        .filter(|a| a.active && (a.time_of_day == bucket || a.time_of_day == TimeOfDay::Any))
        .collect();

    if eligible.is_empty() {
        return None;
    }

    let total: i64 = eligible.iter().map(|a| a.weight.max(1)).sum();
    let mut draw = rng.gen_range(0..total);

    for activity in &eligible {
        draw -= activity.weight.max(1);
        if draw < 0 {
            return Some(activity);
        }
    }

    // Unreachable for well-formed weights; fall back to list order.
    eligible.first().copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;
    use rand::SeedableRng;
    use rand_pcg::Mcg128Xsl64;
    use std::collections::HashMap;

    fn activity(title: &str, weight: i64, tod: TimeOfDay, active: bool) -> Activity {
        let mut a = Activity::new(title)
            .with_weight(weight)
            .with_time_of_day(tod);
        a.active = active;
        a
    }

    #[test]
    fn bucket_ranges() {
        assert_eq!(bucket_for(6), TimeOfDay::EarlyMorning);
        assert_eq!(bucket_for(9), TimeOfDay::EarlyMorning);
        assert_eq!(bucket_for(10), TimeOfDay::LateMorning);
        assert_eq!(bucket_for(12), TimeOfDay::Midday);
        assert_eq!(bucket_for(14), TimeOfDay::Midday);
        assert_eq!(bucket_for(15), TimeOfDay::Afternoon);
        assert_eq!(bucket_for(18), TimeOfDay::Evening);
        assert_eq!(bucket_for(21), TimeOfDay::LateEvening);
        assert_eq!(bucket_for(23), TimeOfDay::LateEvening);
        assert_eq!(bucket_for(0), TimeOfDay::Any);
        assert_eq!(bucket_for(5), TimeOfDay::Any);
    }

    #[test]
    fn empty_candidates_yield_none() {
        let mut rng = StepRng::new(0, 0);
        assert!(select(TimeOfDay::Midday, &[], &mut rng).is_none());
    }

    #[test]
    fn filters_inactive_and_wrong_bucket() {
        let candidates = vec![
            activity("inactive", 100, TimeOfDay::Midday, false),
            activity("evening", 100, TimeOfDay::Evening, true),
            activity("midday", 1, TimeOfDay::Midday, true),
        ];
        let mut rng = StepRng::new(0, 0);
        let picked = select(TimeOfDay::Midday, &candidates, &mut rng).unwrap();
        assert_eq!(picked.title, "midday");
    }

    #[test]
    fn any_bucket_is_always_eligible() {
        let candidates = vec![activity("anytime", 1, TimeOfDay::Any, true)];
        let mut rng = StepRng::new(0, 0);
        assert!(select(TimeOfDay::LateEvening, &candidates, &mut rng).is_some());
    }

    #[test]
    fn zero_draw_returns_first_eligible_in_order() {
        let candidates = vec![
            activity("first", 2, TimeOfDay::Any, true),
            activity("second", 5, TimeOfDay::Any, true),
        ];
        // StepRng(0, 0) makes gen_range return the lower bound.
        let mut rng = StepRng::new(0, 0);
        let picked = select(TimeOfDay::Midday, &candidates, &mut rng).unwrap();
        assert_eq!(picked.title, "first");
    }

    #[test]
    fn frequencies_converge_to_weights() {
        let candidates = vec![
            activity("light", 1, TimeOfDay::Any, true),
            activity("heavy", 3, TimeOfDay::Any, true),
        ];
        let mut rng = Mcg128Xsl64::seed_from_u64(42);
        let mut counts: HashMap<String, u32> = HashMap::new();

        const DRAWS: u32 = 10_000;
        for _ in 0..DRAWS {
            let picked = select(TimeOfDay::Midday, &candidates, &mut rng).unwrap();
            *counts.entry(picked.title.clone()).or_default() += 1;
        }

        let heavy = f64::from(counts["heavy"]) / f64::from(DRAWS);
        // Expected 0.75; allow a generous band for the fixed seed.
        assert!((0.70..=0.80).contains(&heavy), "heavy ratio {heavy}");
        assert_eq!(counts["heavy"] + counts["light"], DRAWS);
    }
}
