//! Timestamp parsing and formatting for the three wire formats.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

use crate::binding::TimestampFormat;
use crate::coerce::CoercionError;

const HTTP_DATE: &str = "%a, %d %b %Y %H:%M:%S GMT";

pub fn parse(raw: &str, format: TimestampFormat) -> Result<DateTime<Utc>, CoercionError> {
    let invalid = || CoercionError::InvalidTimestamp {
        format,
        value: raw.to_string(),
    };

    match format {
        TimestampFormat::DateTime => DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| invalid()),
        TimestampFormat::HttpDate => NaiveDateTime::parse_from_str(raw, HTTP_DATE)
            .map(|naive| naive.and_utc())
            .map_err(|_| invalid()),
        TimestampFormat::EpochSeconds => parse_epoch_seconds(raw).ok_or_else(invalid),
    }
}

pub fn format(value: &DateTime<Utc>, format: TimestampFormat) -> String {
    match format {
        TimestampFormat::DateTime => value.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        TimestampFormat::HttpDate => value.format(HTTP_DATE).to_string(),
        TimestampFormat::EpochSeconds => {
            let secs = value.timestamp();
            let nanos = value.timestamp_subsec_nanos();
            if nanos == 0 {
                secs.to_string()
            } else {
                (secs as f64 + f64::from(nanos) / 1e9).to_string()
            }
        }
    }
}

/// `1576540098`, `1576540098.25`, `-1.5`. Fractional digits beyond
/// nanoseconds are truncated.
fn parse_epoch_seconds(raw: &str) -> Option<DateTime<Utc>> {
    let (whole, fraction) = match raw.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (raw, ""),
    };
    let negative = whole.starts_with('-');
    let digits = whole.strip_prefix('-').unwrap_or(whole);
    if digits.is_empty()
        || !digits.bytes().all(|b| b.is_ascii_digit())
        || !fraction.bytes().all(|b| b.is_ascii_digit())
        || (raw.contains('.') && fraction.is_empty())
    {
        return None;
    }

    let mut secs: i64 = whole.parse().ok()?;
    let mut nanos: u32 = 0;
    if !fraction.is_empty() {
        let padded = format!("{:0<9}", &fraction[..fraction.len().min(9)]);
        nanos = padded.parse().ok()?;
    }
    if negative && nanos > 0 {
        secs -= 1;
        nanos = 1_000_000_000 - nanos;
    }
    DateTime::from_timestamp(secs, nanos)
}

/// Convert a document number (epoch seconds) to a timestamp.
pub fn from_epoch_f64(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    let secs = seconds.floor();
    let nanos = ((seconds - secs) * 1e9).round() as u32;
    if nanos >= 1_000_000_000 {
        return DateTime::from_timestamp(secs as i64 + 1, 0);
    }
    DateTime::from_timestamp(secs as i64, nanos)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPOCH: i64 = 1_576_540_098;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn test_parse_each_format() {
        assert_eq!(parse("2019-12-16T23:48:18Z", TimestampFormat::DateTime).unwrap(), at(EPOCH));
        assert_eq!(
            parse("2019-12-17T00:48:18+01:00", TimestampFormat::DateTime).unwrap(),
            at(EPOCH)
        );
        assert_eq!(
            parse("Mon, 16 Dec 2019 23:48:18 GMT", TimestampFormat::HttpDate).unwrap(),
            at(EPOCH)
        );
        assert_eq!(parse("1576540098", TimestampFormat::EpochSeconds).unwrap(), at(EPOCH));
    }

    #[test]
    fn test_parse_fractional_epoch_seconds() {
        let ts = parse("1576540098.25", TimestampFormat::EpochSeconds).unwrap();
        assert_eq!(ts.timestamp(), EPOCH);
        assert_eq!(ts.timestamp_subsec_nanos(), 250_000_000);

        let negative = parse("-1.5", TimestampFormat::EpochSeconds).unwrap();
        assert_eq!(negative.timestamp(), -2);
        assert_eq!(negative.timestamp_subsec_nanos(), 500_000_000);
    }

    #[test]
    fn test_reject_wrong_format() {
        assert!(parse("Mon, 16 Dec 2019 23:48:18 GMT", TimestampFormat::DateTime).is_err());
        assert!(parse("2019-12-16T23:48:18Z", TimestampFormat::EpochSeconds).is_err());
        assert!(parse("1576540098.", TimestampFormat::EpochSeconds).is_err());
        assert!(parse("", TimestampFormat::EpochSeconds).is_err());
    }

    #[test]
    fn test_format_each_format() {
        assert_eq!(format(&at(EPOCH), TimestampFormat::DateTime), "2019-12-16T23:48:18Z");
        assert_eq!(format(&at(EPOCH), TimestampFormat::HttpDate), "Mon, 16 Dec 2019 23:48:18 GMT");
        assert_eq!(format(&at(EPOCH), TimestampFormat::EpochSeconds), "1576540098");

        let fractional = DateTime::from_timestamp(EPOCH, 500_000_000).unwrap();
        assert_eq!(format(&fractional, TimestampFormat::EpochSeconds), "1576540098.5");
    }

    #[test]
    fn test_from_epoch_f64() {
        assert_eq!(from_epoch_f64(1576540098.0), Some(at(EPOCH)));
        assert_eq!(from_epoch_f64(f64::NAN), None);
    }
}
