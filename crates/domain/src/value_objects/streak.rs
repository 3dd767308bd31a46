//! Habit streak arithmetic.
//!
//! Pure date math over the set of confirmed completion dates for one
//! (user, task) pair. Frozen days are confirmed records too, so they count
//! toward a streak exactly like genuine completions.

use std::collections::BTreeSet;

use chrono::{Days, NaiveDate};

/// Streaks only look this many calendar days back, today included.
pub const STREAK_LOOKBACK_DAYS: u32 = 30;

/// First date that still counts toward a streak evaluated on `today`.
pub fn lookback_start(today: NaiveDate) -> NaiveDate {
    today
        .checked_sub_days(Days::new(u64::from(STREAK_LOOKBACK_DAYS - 1)))
        .unwrap_or(NaiveDate::MIN)
}

/// Length of the unbroken run of confirmed dates ending at the most recent
/// confirmed date inside the lookback window.
///
/// Dates after `today` are ignored. One day without a confirmed record ends
/// the run, so the result is the length of the run after the last gap.
pub fn consecutive_days(confirmed: &[NaiveDate], today: NaiveDate) -> u32 {
    let start = lookback_start(today);
    let window: BTreeSet<NaiveDate> = confirmed
        .iter()
        .copied()
        .filter(|date| *date >= start && *date <= today)
        .collect();

    let Some(mut cursor) = window.last().copied() else {
        return 0;
    };

    let mut run = 0;
    while window.contains(&cursor) {
        run += 1;
        match cursor.pred_opt() {
            Some(previous) => cursor = previous,
            None => break,
        }
    }
    run
}

/// Calendar dates that still need a completion or a freeze.
///
/// With a previous confirmed completion: every date after it through
/// `today`. Without one: the `required_days - 1` days before today, since
/// today itself can still be completed normally.
pub fn missed_days(
    last_confirmed: Option<NaiveDate>,
    today: NaiveDate,
    required_days: u32,
) -> Vec<NaiveDate> {
    match last_confirmed {
        Some(last) => last
            .iter_days()
            .skip(1)
            .take_while(|date| *date <= today)
            .collect(),
        None => (1..required_days)
            .rev()
            .filter_map(|offset| today.checked_sub_days(Days::new(u64::from(offset))))
            .collect(),
    }
}
