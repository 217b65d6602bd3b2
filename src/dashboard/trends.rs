//! Groups expenses into daily and monthly totals for the trend charts.

use std::collections::BTreeMap;

use time::{Date, Duration, Month, UtcOffset};

use crate::expense::{Expense, round_to_cents};

/// How many days the daily trend covers, including today.
pub(super) const TREND_DAYS: i64 = 30;

/// How many months the monthly trend covers, including the current month.
pub(super) const TREND_MONTHS: u8 = 6;

/// The first day shown on the daily trend.
pub(super) fn first_trend_day(today: Date) -> Date {
    today - Duration::days(TREND_DAYS - 1)
}

fn first_of_month(date: Date) -> Date {
    date - Duration::days(i64::from(date.day()) - 1)
}

/// The first day of the oldest month shown on the monthly trend.
pub(super) fn first_trend_month(today: Date) -> Date {
    let mut start = first_of_month(today);

    for _ in 1..TREND_MONTHS {
        start = first_of_month(start - Duration::days(1));
    }

    start
}

/// The total spent on each of the last [TREND_DAYS] days, oldest first.
///
/// Days without expenses are included with a total of zero.
pub(super) fn daily_totals(
    expenses: &[Expense],
    today: Date,
    local_offset: UtcOffset,
) -> Vec<(Date, f64)> {
    let first_day = first_trend_day(today);
    let mut totals: BTreeMap<Date, f64> = (0..TREND_DAYS)
        .map(|offset| (first_day + Duration::days(offset), 0.0))
        .collect();

    for expense in expenses {
        let date = expense.created_at.to_offset(local_offset).date();

        if let Some(total) = totals.get_mut(&date) {
            *total += expense.amount;
        }
    }

    totals
        .into_iter()
        .map(|(date, total)| (date, round_to_cents(total)))
        .collect()
}

/// The total spent in each of the last [TREND_MONTHS] months, oldest first.
///
/// Months are keyed by their first day.
pub(super) fn monthly_totals(
    expenses: &[Expense],
    today: Date,
    local_offset: UtcOffset,
) -> Vec<(Date, f64)> {
    let mut totals = BTreeMap::new();
    let mut month = first_of_month(today);
    let first_month = first_trend_month(today);

    while month >= first_month {
        totals.insert(month, 0.0);
        month = first_of_month(month - Duration::days(1));
    }

    for expense in expenses {
        let month = first_of_month(expense.created_at.to_offset(local_offset).date());

        if let Some(total) = totals.get_mut(&month) {
            *total += expense.amount;
        }
    }

    totals
        .into_iter()
        .map(|(month, total)| (month, round_to_cents(total)))
        .collect()
}

fn month_abbreviation(month: Month) -> &'static str {
    match month {
        Month::January => "Jan",
        Month::February => "Feb",
        Month::March => "Mar",
        Month::April => "Apr",
        Month::May => "May",
        Month::June => "Jun",
        Month::July => "Jul",
        Month::August => "Aug",
        Month::September => "Sep",
        Month::October => "Oct",
        Month::November => "Nov",
        Month::December => "Dec",
    }
}

/// A label like "Jun 18".
pub(super) fn day_label(date: Date) -> String {
    format!("{} {}", month_abbreviation(date.month()), date.day())
}

/// A label like "Jun 2025".
pub(super) fn month_label(date: Date) -> String {
    format!("{} {}", month_abbreviation(date.month()), date.year())
}
