//! Key permissions and time-windowed schedules

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::codec::{CodecError, Reader};

/// A key's permission level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Permission {
    /// Belongs to the owner of the lock, unlimited rights
    Owner,
    /// Can create and remove keys, anytime access
    Admin,
    /// Anytime access
    Anytime,
    /// Access during certain hours, expires
    Scheduled(Schedule),
}

impl Permission {
    /// type + expiry (i64) + interval start/end (u16 each) + weekdays
    pub const LENGTH: usize = 1 + 8 + 2 + 2 + 1;

    pub fn type_byte(&self) -> u8 {
        match self {
            Permission::Owner => 0x00,
            Permission::Admin => 0x01,
            Permission::Anytime => 0x02,
            Permission::Scheduled(_) => 0x03,
        }
    }

    /// Owner and admin keys may create and remove keys
    pub fn is_administrator(&self) -> bool {
        matches!(self, Permission::Owner | Permission::Admin)
    }

    /// Whether a key with this permission may unlock at `now`
    pub fn can_unlock<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> bool {
        match self {
            Permission::Owner | Permission::Admin | Permission::Anytime => true,
            Permission::Scheduled(schedule) => schedule.valid(now),
        }
    }

    pub fn to_bytes(&self) -> [u8; Self::LENGTH] {
        let mut bytes = [0u8; Self::LENGTH];
        bytes[0] = self.type_byte();
        if let Permission::Scheduled(schedule) = self {
            bytes[1..9].copy_from_slice(&schedule.expiry.timestamp().to_be_bytes());
            bytes[9..11].copy_from_slice(&schedule.interval.start.to_be_bytes());
            bytes[11..13].copy_from_slice(&schedule.interval.end.to_be_bytes());
            bytes[13] = schedule.weekdays.bits();
        }
        bytes
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, CodecError> {
        let mut reader = Reader::new("permission", data);
        let permission = Self::read(&mut reader)?;
        reader.finish()?;
        Ok(permission)
    }

    pub fn read(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        let type_byte = reader.u8()?;
        let expiry = reader.i64()?;
        let start = reader.u16()?;
        let end = reader.u16()?;
        let weekdays = reader.u8()?;

        match type_byte {
            0x00..=0x02 => {
                // unscheduled permissions carry an all-zero schedule
                if expiry != 0 || start != 0 || end != 0 || weekdays != 0 {
                    return Err(CodecError::InvalidSchedule("unexpected schedule data"));
                }
                Ok(match type_byte {
                    0x00 => Permission::Owner,
                    0x01 => Permission::Admin,
                    _ => Permission::Anytime,
                })
            }
            0x03 => {
                let expiry = DateTime::from_timestamp(expiry, 0)
                    .ok_or(CodecError::InvalidSchedule("expiry out of range"))?;
                let interval = Interval::new(start, end)
                    .ok_or(CodecError::InvalidSchedule("invalid minute interval"))?;
                let weekdays = Weekdays::from_bits(weekdays)
                    .ok_or(CodecError::InvalidSchedule("invalid weekdays"))?;
                Ok(Permission::Scheduled(Schedule {
                    expiry,
                    interval,
                    weekdays,
                }))
            }
            other => Err(CodecError::InvalidPermission(other)),
        }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Permission::Owner => f.write_str("owner"),
            Permission::Admin => f.write_str("admin"),
            Permission::Anytime => f.write_str("anytime"),
            Permission::Scheduled(s) => write!(
                f,
                "scheduled (until {}, {}, {})",
                s.expiry.format("%Y-%m-%d %H:%M"),
                s.interval,
                s.weekdays
            ),
        }
    }
}

/// When a scheduled permission is valid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    /// The permission is invalid from this instant on
    #[serde(with = "chrono::serde::ts_seconds")]
    pub expiry: DateTime<Utc>,
    /// Minutes of the day the lock may be opened
    pub interval: Interval,
    /// Days of the week the lock may be opened
    pub weekdays: Weekdays,
}

impl Schedule {
    /// The expiry is truncated to whole seconds, the resolution of the wire format
    pub fn new(expiry: DateTime<Utc>, interval: Interval, weekdays: Weekdays) -> Self {
        Self {
            expiry: expiry.with_nanosecond(0).unwrap_or(expiry),
            interval,
            weekdays,
        }
    }

    /// Check `now` against expiry, weekday and minute-of-day
    ///
    /// Weekday and minute are taken in the time zone `now` carries, so the
    /// lock passes its local time.
    pub fn valid<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> bool {
        if now.timestamp() >= self.expiry.timestamp() {
            return false;
        }
        if !self.weekdays.contains(now.weekday()) {
            return false;
        }
        let minute = (now.hour() * 60 + now.minute()) as u16;
        self.interval.contains(minute)
    }
}

/// Half-open minute-of-day range `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawInterval")]
pub struct Interval {
    start: u16,
    end: u16,
}

#[derive(Deserialize)]
struct RawInterval {
    start: u16,
    end: u16,
}

impl TryFrom<RawInterval> for Interval {
    type Error = CodecError;

    fn try_from(raw: RawInterval) -> Result<Self, Self::Error> {
        Interval::new(raw.start, raw.end)
            .ok_or(CodecError::InvalidSchedule("invalid minute interval"))
    }
}

impl Interval {
    pub const MAX: u16 = 24 * 60;

    /// The whole day
    pub const ANYTIME: Interval = Interval {
        start: 0,
        end: Self::MAX,
    };

    pub fn new(start: u16, end: u16) -> Option<Self> {
        if start > end || end > Self::MAX {
            return None;
        }
        Some(Self { start, end })
    }

    pub fn start(&self) -> u16 {
        self.start
    }

    pub fn end(&self) -> u16 {
        self.end
    }

    pub fn contains(&self, minute: u16) -> bool {
        self.start <= minute && minute < self.end
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:02}:{:02}-{:02}:{:02}",
            self.start / 60,
            self.start % 60,
            self.end / 60,
            self.end % 60
        )
    }
}

/// Set of weekdays, bit 0 = Sunday through bit 6 = Saturday
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Weekdays(u8);

impl Weekdays {
    pub const NONE: Weekdays = Weekdays(0);
    pub const ALL: Weekdays = Weekdays(0x7f);

    pub fn from_bits(bits: u8) -> Option<Self> {
        if bits & 0x80 != 0 {
            return None;
        }
        Some(Self(bits))
    }

    pub fn bits(&self) -> u8 {
        self.0
    }

    pub fn with(self, day: Weekday) -> Self {
        Self(self.0 | Self::bit(day))
    }

    pub fn contains(&self, day: Weekday) -> bool {
        self.0 & Self::bit(day) != 0
    }

    fn bit(day: Weekday) -> u8 {
        1 << day.num_days_from_sunday()
    }
}

impl TryFrom<u8> for Weekdays {
    type Error = CodecError;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        Weekdays::from_bits(bits).ok_or(CodecError::InvalidSchedule("invalid weekdays"))
    }
}

impl From<Weekdays> for u8 {
    fn from(days: Weekdays) -> Self {
        days.0
    }
}

impl std::fmt::Display for Weekdays {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        const NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
        let days: Vec<&str> = NAMES
            .iter()
            .enumerate()
            .filter(|(i, _)| self.0 & (1 << i) != 0)
            .map(|(_, name)| *name)
            .collect();
        f.write_str(&days.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    fn weekday_schedule() -> Schedule {
        // 2030-01-01 00:00 UTC
        let expiry = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let weekdays = Weekdays::NONE
            .with(Weekday::Mon)
            .with(Weekday::Tue)
            .with(Weekday::Wed)
            .with(Weekday::Thu)
            .with(Weekday::Fri);
        Schedule::new(expiry, Interval::new(9 * 60, 17 * 60).unwrap(), weekdays)
    }

    #[test]
    fn invalid_interval_is_rejected_from_json() {
        let interval: Interval = serde_json::from_str(r#"{"start":540,"end":1020}"#).unwrap();
        assert_eq!(interval, Interval::new(540, 1020).unwrap());
        assert!(serde_json::from_str::<Interval>(r#"{"start":10,"end":5}"#).is_err());
        assert!(serde_json::from_str::<Interval>(r#"{"start":0,"end":1441}"#).is_err());

        let json = serde_json::to_string(&Permission::Scheduled(weekday_schedule()))
            .unwrap()
            .replace("\"end\":1020", "\"end\":2000");
        assert!(serde_json::from_str::<Permission>(&json).is_err());
    }

    #[test]
    fn sub_second_expiry_survives_encoding() {
        let expiry = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()
            + chrono::Duration::milliseconds(750);
        let schedule = Schedule::new(expiry, Interval::ANYTIME, Weekdays::ALL);
        assert_eq!(schedule.expiry.timestamp_subsec_nanos(), 0);

        let permission = Permission::Scheduled(schedule);
        assert_eq!(Permission::from_bytes(&permission.to_bytes()).unwrap(), permission);
        let json = serde_json::to_string(&permission).unwrap();
        assert_eq!(serde_json::from_str::<Permission>(&json).unwrap(), permission);
    }

    #[test]
    fn unscheduled_permissions_encode_as_type_and_zeros() {
        for (permission, byte) in [
            (Permission::Owner, 0u8),
            (Permission::Admin, 1),
            (Permission::Anytime, 2),
        ] {
            let bytes = permission.to_bytes();
            assert_eq!(bytes[0], byte);
            assert!(bytes[1..].iter().all(|b| *b == 0));
            assert_eq!(Permission::from_bytes(&bytes).unwrap(), permission);
        }
    }

    #[test]
    fn scheduled_encoding_is_big_endian() {
        let schedule = weekday_schedule();
        let bytes = Permission::Scheduled(schedule.clone()).to_bytes();

        assert_eq!(bytes[0], 0x03);
        assert_eq!(&bytes[1..9], &1_893_456_000i64.to_be_bytes());
        assert_eq!(&bytes[9..11], &[0x02, 0x1c]); // 540
        assert_eq!(&bytes[11..13], &[0x03, 0xfc]); // 1020
        assert_eq!(bytes[13], 0b0011_1110);

        assert_eq!(
            Permission::from_bytes(&bytes).unwrap(),
            Permission::Scheduled(schedule)
        );
    }

    #[test]
    fn decoding_rejects_bad_input() {
        let mut bytes = [0u8; Permission::LENGTH];
        bytes[0] = 0x09;
        assert_eq!(
            Permission::from_bytes(&bytes),
            Err(CodecError::InvalidPermission(0x09))
        );

        // interval end before start
        let mut bytes = Permission::Scheduled(weekday_schedule()).to_bytes();
        bytes[9..11].copy_from_slice(&1100u16.to_be_bytes());
        assert!(Permission::from_bytes(&bytes).is_err());

        // interval past the end of the day
        let mut bytes = Permission::Scheduled(weekday_schedule()).to_bytes();
        bytes[11..13].copy_from_slice(&1441u16.to_be_bytes());
        assert!(Permission::from_bytes(&bytes).is_err());

        // eighth weekday bit
        let mut bytes = Permission::Scheduled(weekday_schedule()).to_bytes();
        bytes[13] = 0x80;
        assert!(Permission::from_bytes(&bytes).is_err());

        // owner with trailing schedule data
        let mut bytes = Permission::Owner.to_bytes();
        bytes[5] = 1;
        assert!(Permission::from_bytes(&bytes).is_err());

        assert!(Permission::from_bytes(&[0u8; 13]).is_err());
    }

    #[test]
    fn schedule_expires() {
        let schedule = weekday_schedule();
        // Tuesday 2029-12-18 10:00
        let before = Utc.with_ymd_and_hms(2029, 12, 18, 10, 0, 0).unwrap();
        assert!(schedule.valid(&before));

        assert!(!schedule.valid(&schedule.expiry));
        let after = Utc.with_ymd_and_hms(2030, 1, 1, 10, 0, 0).unwrap();
        assert!(!schedule.valid(&after));
    }

    #[test]
    fn schedule_interval_boundaries_are_exact() {
        let schedule = weekday_schedule();
        let at = |h, m| Utc.with_ymd_and_hms(2029, 12, 18, h, m, 0).unwrap();

        assert!(!schedule.valid(&at(8, 59)));
        assert!(schedule.valid(&at(9, 0)));
        assert!(schedule.valid(&at(16, 59)));
        assert!(!schedule.valid(&at(17, 0)));
    }

    #[test]
    fn schedule_checks_weekday() {
        let schedule = weekday_schedule();
        // Sunday 2029-12-16
        let sunday = Utc.with_ymd_and_hms(2029, 12, 16, 10, 0, 0).unwrap();
        assert!(!schedule.valid(&sunday));
    }

    #[test]
    fn schedule_uses_the_time_zone_of_now() {
        let schedule = weekday_schedule();
        // 07:30 UTC is 09:30 at UTC+2
        let utc = Utc.with_ymd_and_hms(2029, 12, 18, 7, 30, 0).unwrap();
        assert!(!schedule.valid(&utc));
        let local = utc.with_timezone(&FixedOffset::east_opt(2 * 3600).unwrap());
        assert!(schedule.valid(&local));
    }

    #[test]
    fn only_owner_and_admin_administer() {
        assert!(Permission::Owner.is_administrator());
        assert!(Permission::Admin.is_administrator());
        assert!(!Permission::Anytime.is_administrator());
        assert!(!Permission::Scheduled(weekday_schedule()).is_administrator());
    }

    #[test]
    fn permission_json_is_tagged() {
        let json = serde_json::to_value(Permission::Scheduled(weekday_schedule())).unwrap();
        assert_eq!(json["type"], "scheduled");
        assert_eq!(json["expiry"], 1_893_456_000i64);
        let back: Permission = serde_json::from_value(json).unwrap();
        assert_eq!(back, Permission::Scheduled(weekday_schedule()));
    }
}
