//! Lookback period expressions such as `"3 months"` or `"90 days"`.

/// Day count used when a period expression is empty or unparseable.
pub const DEFAULT_PERIOD_DAYS: u32 = 90;

/// Resolve a period expression of the form `<integer>[ ]<unit>` into days.
///
/// Units are matched case-insensitively: `week(s)` is 7 days, `month(s)` 30,
/// `year(s)` 365. Any other unit, or none at all, counts single days.
/// Input that does not match the pattern falls back to [`DEFAULT_PERIOD_DAYS`].
pub fn parse_period_days(expr: &str) -> u32 {
    let expr = expr.trim();
    let digits_end = expr
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(expr.len());
    let (digits, rest) = expr.split_at(digits_end);

    let Ok(count) = digits.parse::<u32>() else {
        return DEFAULT_PERIOD_DAYS;
    };

    let unit = rest.trim_start();
    if !unit.chars().all(|c| c.is_ascii_alphabetic()) {
        return DEFAULT_PERIOD_DAYS;
    }

    count
        .checked_mul(unit_to_days(unit))
        .unwrap_or(DEFAULT_PERIOD_DAYS)
}

fn unit_to_days(unit: &str) -> u32 {
    match unit.to_ascii_lowercase().as_str() {
        "week" | "weeks" => 7,
        "month" | "months" => 30,
        "year" | "years" => 365,
        _ => 1,
    }
}
