//! Parsing of permission arguments

use bolt_proto::{Interval, Permission, Schedule, Weekdays};
use chrono::{DateTime, NaiveDate, Utc, Weekday};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PermissionKind {
    Admin,
    Anytime,
    Scheduled,
}

/// Build the permission for a shared key
pub fn permission(
    kind: PermissionKind,
    expires: Option<&str>,
    hours: Option<&str>,
    days: Option<&str>,
) -> Result<Permission, String> {
    let scheduled = expires.is_some() || hours.is_some() || days.is_some();
    match kind {
        PermissionKind::Admin | PermissionKind::Anytime if scheduled => {
            Err("--expires, --hours and --days need --permission scheduled".into())
        }
        PermissionKind::Admin => Ok(Permission::Admin),
        PermissionKind::Anytime => Ok(Permission::Anytime),
        PermissionKind::Scheduled => {
            let expiry = parse_expiry(expires.ok_or("scheduled keys need --expires")?)?;
            let interval = hours.map(parse_interval).transpose()?.unwrap_or(Interval::ANYTIME);
            let weekdays = days.map(parse_weekdays).transpose()?.unwrap_or(Weekdays::ALL);
            Ok(Permission::Scheduled(Schedule::new(expiry, interval, weekdays)))
        }
    }
}

/// RFC 3339 timestamp, or a date meaning midnight UTC
pub fn parse_expiry(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(time) = DateTime::parse_from_rfc3339(s) {
        return Ok(time.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|time| time.and_utc())
        .ok_or_else(|| format!("invalid expiry {s:?}, expected YYYY-MM-DD or RFC 3339"))
}

/// `HH:MM-HH:MM`, end exclusive; `24:00` ends at midnight
pub fn parse_interval(s: &str) -> Result<Interval, String> {
    let invalid = || format!("invalid hours {s:?}, expected HH:MM-HH:MM");
    let (start, end) = s.split_once('-').ok_or_else(invalid)?;
    let start = parse_minute(start).ok_or_else(invalid)?;
    let end = parse_minute(end).ok_or_else(invalid)?;
    Interval::new(start, end).ok_or_else(invalid)
}

fn parse_minute(s: &str) -> Option<u16> {
    let (hour, minute) = s.trim().split_once(':')?;
    let hour: u16 = hour.parse().ok()?;
    let minute: u16 = minute.parse().ok()?;
    if minute >= 60 {
        return None;
    }
    Some(hour * 60 + minute)
}

/// Comma separated weekday names, e.g. `mon,tue,fri`
pub fn parse_weekdays(s: &str) -> Result<Weekdays, String> {
    s.split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .try_fold(Weekdays::NONE, |days, name| {
            let day: Weekday = name.parse().map_err(|_| format!("invalid weekday {name:?}"))?;
            Ok(days.with(day))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn hours() {
        let interval = parse_interval("08:30-18:00").unwrap();
        assert_eq!(interval.start(), 8 * 60 + 30);
        assert_eq!(interval.end(), 18 * 60);
        assert_eq!(parse_interval("00:00-24:00").unwrap(), Interval::ANYTIME);

        assert!(parse_interval("18:00-08:00").is_err());
        assert!(parse_interval("08:60-09:00").is_err());
        assert!(parse_interval("08:00").is_err());
        assert!(parse_interval("00:00-24:01").is_err());
    }

    #[test]
    fn weekdays() {
        let days = parse_weekdays("mon, Fri,sunday").unwrap();
        assert!(days.contains(Weekday::Mon));
        assert!(days.contains(Weekday::Fri));
        assert!(days.contains(Weekday::Sun));
        assert!(!days.contains(Weekday::Tue));
        assert!(parse_weekdays("mon,someday").is_err());
    }

    #[test]
    fn expiry() {
        assert_eq!(
            parse_expiry("2030-01-02").unwrap(),
            Utc.with_ymd_and_hms(2030, 1, 2, 0, 0, 0).unwrap()
        );
        assert_eq!(
            parse_expiry("2030-01-02T10:00:00+02:00").unwrap(),
            Utc.with_ymd_and_hms(2030, 1, 2, 8, 0, 0).unwrap()
        );
        assert!(parse_expiry("tomorrow").is_err());
    }

    #[test]
    fn permissions() {
        assert_eq!(
            permission(PermissionKind::Anytime, None, None, None).unwrap(),
            Permission::Anytime
        );
        assert!(permission(PermissionKind::Admin, Some("2030-01-01"), None, None).is_err());
        assert!(permission(PermissionKind::Scheduled, None, Some("08:00-09:00"), None).is_err());

        let Permission::Scheduled(schedule) =
            permission(PermissionKind::Scheduled, Some("2030-01-01"), None, Some("sat,sun"))
                .unwrap()
        else {
            panic!("expected a schedule");
        };
        assert_eq!(schedule.interval, Interval::ANYTIME);
        assert_eq!(schedule.weekdays.bits(), 0b100_0001);
    }
}
