use chrono::{DateTime, Datelike, Months, Utc};
use time::OffsetDateTime;

use crate::models::usage::UsagePeriod;
use crate::utils::time::{offset_to_utc, utc_to_offset};

use super::UsageError;

/// Resolves the monthly metering window containing `now` for a subscription
/// anchored at `anchor`.
///
/// Boundaries share the anchor's time of day and day of month. A month shorter
/// than the anchor day uses its last day (anchor on the 31st gives Apr 30,
/// then May 31). Every boundary is derived from the anchor itself so clamping
/// never accumulates.
pub fn current_window(
    anchor: Option<OffsetDateTime>,
    now: OffsetDateTime,
) -> Result<UsagePeriod, UsageError> {
    let anchor = anchor.ok_or_else(|| {
        UsageError::Configuration("subscription has no renewal anchor".to_string())
    })?;
    let anchor = offset_to_utc(anchor).ok_or_else(|| {
        UsageError::Configuration(format!("renewal anchor {anchor} is out of range"))
    })?;
    let now_utc = offset_to_utc(now)
        .ok_or_else(|| UsageError::Configuration(format!("timestamp {now} is out of range")))?;

    let mut months = i64::from(now_utc.year() - anchor.year()) * 12
        + i64::from(now_utc.month0())
        - i64::from(anchor.month0());

    let mut start = boundary(anchor, months)?;
    while start > now_utc {
        months -= 1;
        start = boundary(anchor, months)?;
    }
    let mut end = boundary(anchor, months + 1)?;
    while end <= now_utc {
        months += 1;
        start = end;
        end = boundary(anchor, months + 1)?;
    }

    Ok(UsagePeriod {
        start: to_offset(start)?,
        end: to_offset(end)?,
    })
}

fn boundary(anchor: DateTime<Utc>, months: i64) -> Result<DateTime<Utc>, UsageError> {
    let shifted = match u32::try_from(months.unsigned_abs()) {
        Ok(step) if months >= 0 => anchor.checked_add_months(Months::new(step)),
        Ok(step) => anchor.checked_sub_months(Months::new(step)),
        Err(_) => None,
    };
    shifted.ok_or_else(|| {
        UsageError::Configuration(format!(
            "billing period {months} months from anchor {anchor} is out of range"
        ))
    })
}

fn to_offset(dt: DateTime<Utc>) -> Result<OffsetDateTime, UsageError> {
    utc_to_offset(dt)
        .ok_or_else(|| UsageError::Configuration(format!("period boundary {dt} is out of range")))
}
