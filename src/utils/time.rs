use chrono::{DateTime, Utc};
use time::OffsetDateTime;

pub fn offset_to_utc(dt: OffsetDateTime) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(dt.unix_timestamp(), dt.nanosecond())
}

pub fn utc_to_offset(dt: DateTime<Utc>) -> Option<OffsetDateTime> {
    let seconds = dt.timestamp();
    let nanos = dt.timestamp_subsec_nanos();
    let base = OffsetDateTime::from_unix_timestamp(seconds).ok()?;
    base.replace_nanosecond(nanos).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn converts_between_time_and_chrono() {
        let original = datetime!(2025-03-31 23:59:59.123456789 UTC);
        let utc = offset_to_utc(original).unwrap();
        assert_eq!(utc.timestamp(), original.unix_timestamp());
        assert_eq!(utc_to_offset(utc), Some(original));
    }

    #[test]
    fn normalizes_non_utc_offsets() {
        let local = datetime!(2025-03-01 09:00 +02:00);
        let utc = offset_to_utc(local).unwrap();
        assert_eq!(utc.to_rfc3339(), "2025-03-01T07:00:00+00:00");
    }
}
