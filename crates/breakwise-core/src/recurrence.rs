//! Recurrence and lead-time math.
//!
//! Pure functions mapping a due date and recurrence rule to the next
//! occurrence, and a due date plus lead minutes to the reminder fire time.

use chrono::{DateTime, Datelike, Duration, Months, Utc};

use crate::task::{Recurrence, RecurrenceKind};

/// Compute the next occurrence of `current` under `rule`.
///
/// `None` rules return `current` unchanged (one-shot tasks have no next
/// occurrence). `Monthly` is calendar-aware: the day of month is kept and
/// clamped to the last day of a shorter month (Jan 31 -> Feb 28/29).
/// `CustomDays` searches forward up to 7 days for the first timestamp
/// strictly after `current` whose ISO weekday is in the rule's set,
/// preserving the time of day.
pub fn next_occurrence(current: DateTime<Utc>, rule: &Recurrence) -> DateTime<Utc> {
    match rule.kind {
        RecurrenceKind::None => current,
        RecurrenceKind::Daily => current + Duration::days(1),
        RecurrenceKind::Weekly => current + Duration::days(7),
        RecurrenceKind::Biweekly => current + Duration::days(14),
        RecurrenceKind::Monthly => current
            .checked_add_months(Months::new(1))
            .unwrap_or(current),
        RecurrenceKind::CustomDays => {
            for offset in 1..=7 {
                let candidate = current + Duration::days(offset);
                let weekday = candidate.weekday().number_from_monday() as u8;
                if rule.days_of_week.contains(&weekday) {
                    return candidate;
                }
            }
            current
        }
    }
}

/// The instant a reminder should fire for a due date: `due` minus the lead
/// time. Negative leads are treated as zero.
pub fn fire_time(due: DateTime<Utc>, lead_minutes: i64) -> DateTime<Utc> {
    due - Duration::minutes(lead_minutes.max(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn none_is_unchanged() {
        let due = at(2026, 3, 2, 18, 0);
        assert_eq!(next_occurrence(due, &Recurrence::none()), due);
    }

    #[test]
    fn fixed_interval_kinds() {
        let due = at(2026, 3, 2, 18, 0);
        assert_eq!(
            next_occurrence(due, &Recurrence::of(RecurrenceKind::Daily)),
            at(2026, 3, 3, 18, 0)
        );
        assert_eq!(
            next_occurrence(due, &Recurrence::of(RecurrenceKind::Weekly)),
            at(2026, 3, 9, 18, 0)
        );
        assert_eq!(
            next_occurrence(due, &Recurrence::of(RecurrenceKind::Biweekly)),
            at(2026, 3, 16, 18, 0)
        );
    }

    #[test]
    fn monthly_is_calendar_aware() {
        let due = at(2026, 4, 15, 9, 30);
        assert_eq!(
            next_occurrence(due, &Recurrence::of(RecurrenceKind::Monthly)),
            at(2026, 5, 15, 9, 30)
        );
    }

    #[test]
    fn monthly_clamps_to_short_month() {
        // Jan 31 has no Feb 31; clamp to the last day of February.
        let due = at(2026, 1, 31, 8, 0);
        assert_eq!(
            next_occurrence(due, &Recurrence::of(RecurrenceKind::Monthly)),
            at(2026, 2, 28, 8, 0)
        );
        // Leap year.
        let due = at(2024, 1, 31, 8, 0);
        assert_eq!(
            next_occurrence(due, &Recurrence::of(RecurrenceKind::Monthly)),
            at(2024, 2, 29, 8, 0)
        );
    }

    #[test]
    fn custom_days_finds_next_matching_weekday() {
        // 2026-03-02 is a Monday.
        let due = at(2026, 3, 2, 18, 0);
        let rule = Recurrence::custom_days([1, 3, 5]); // Mon, Wed, Fri
        assert_eq!(next_occurrence(due, &rule), at(2026, 3, 4, 18, 0));
    }

    #[test]
    fn custom_days_is_strictly_after_current() {
        // Same weekday in the set: next occurrence is a week later, not today.
        let due = at(2026, 3, 2, 18, 0); // Monday
        let rule = Recurrence::custom_days([1]);
        assert_eq!(next_occurrence(due, &rule), at(2026, 3, 9, 18, 0));
    }

    #[test]
    fn custom_days_preserves_time_of_day() {
        let due = at(2026, 3, 2, 7, 45);
        let rule = Recurrence::custom_days([7]); // Sunday
        let next = next_occurrence(due, &rule);
        assert_eq!(next, at(2026, 3, 8, 7, 45));
    }

    #[test]
    fn fire_time_subtracts_lead() {
        let due = at(2026, 3, 2, 18, 0);
        assert_eq!(fire_time(due, 15), at(2026, 3, 2, 17, 45));
        assert_eq!(fire_time(due, 0), due);
        assert_eq!(fire_time(due, -5), due);
    }

    #[test]
    fn fire_time_commutes_with_weekly_advance() {
        let due = at(2026, 3, 2, 18, 0);
        let weekly = Recurrence::of(RecurrenceKind::Weekly);
        assert_eq!(
            fire_time(next_occurrence(due, &weekly), 15),
            fire_time(due, 15) + Duration::days(7)
        );
    }

    proptest! {
        #[test]
        fn next_occurrence_is_deterministic(
            secs in 0i64..4_102_444_800, // up to year 2100
            kind_idx in 0usize..6,
        ) {
            let kinds = [
                Recurrence::none(),
                Recurrence::of(RecurrenceKind::Daily),
                Recurrence::of(RecurrenceKind::Weekly),
                Recurrence::of(RecurrenceKind::Biweekly),
                Recurrence::of(RecurrenceKind::Monthly),
                Recurrence::custom_days([2, 6]),
            ];
            let current = Utc.timestamp_opt(secs, 0).unwrap();
            let rule = &kinds[kind_idx];
            prop_assert_eq!(
                next_occurrence(current, rule),
                next_occurrence(current, rule)
            );
        }

        #[test]
        fn recurring_kinds_move_forward(
            secs in 0i64..4_102_444_800,
            kind_idx in 0usize..4,
        ) {
            let kinds = [
                Recurrence::of(RecurrenceKind::Daily),
                Recurrence::of(RecurrenceKind::Weekly),
                Recurrence::of(RecurrenceKind::Biweekly),
                Recurrence::custom_days([1, 4]),
            ];
            let current = Utc.timestamp_opt(secs, 0).unwrap();
            prop_assert!(next_occurrence(current, &kinds[kind_idx]) > current);
        }
    }
}
