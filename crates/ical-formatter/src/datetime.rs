//! Typed view of iCalendar DATE / DATE-TIME values (RFC 5545 §3.3.4, §3.3.5).
//!
//! Values keep the form they had on the wire: date-only, floating local time,
//! UTC, or local time qualified by a `TZID` parameter. Arithmetic is done on
//! the wall clock of the value's own zone, which is what a weekly or daily
//! series means for a human calendar.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;

use crate::error::{FormatError, Result};
use crate::model::Property;

const DATE_FORMAT: &str = "%Y%m%d";
const DATE_TIME_FORMAT: &str = "%Y%m%dT%H%M%S";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DateTimeValue {
    /// `VALUE=DATE`, e.g. `20260105`.
    Date(NaiveDate),
    /// Local time with no zone, e.g. `20260105T090000`.
    Floating(NaiveDateTime),
    /// UTC time, e.g. `20260105T090000Z`.
    Utc(NaiveDateTime),
    /// Local time qualified by a `TZID` parameter.
    Zoned { local: NaiveDateTime, tzid: String },
}

impl DateTimeValue {
    /// Parse wire text, optionally qualified by a `TZID`.
    ///
    /// A `TZID` on a UTC (`Z`-suffixed) value is ignored, as RFC 5545 requires.
    pub fn parse(property: &str, text: &str, tzid: Option<&str>) -> Result<Self> {
        let invalid = || FormatError::InvalidDateTime {
            property: property.to_string(),
            value: text.to_string(),
        };
        let text = text.trim();

        if !text.contains('T') {
            return NaiveDate::parse_from_str(text, DATE_FORMAT)
                .map(Self::Date)
                .map_err(|_| invalid());
        }

        if let Some(utc) = text.strip_suffix('Z') {
            return NaiveDateTime::parse_from_str(utc, DATE_TIME_FORMAT)
                .map(Self::Utc)
                .map_err(|_| invalid());
        }

        let local = NaiveDateTime::parse_from_str(text, DATE_TIME_FORMAT).map_err(|_| invalid())?;
        Ok(match tzid {
            Some(tzid) => Self::Zoned {
                local,
                tzid: tzid.to_string(),
            },
            None => Self::Floating(local),
        })
    }

    /// Read the value of a `DTSTART`/`DTEND`/`DTSTAMP` style property.
    pub fn from_property(property: &Property) -> Result<Self> {
        Self::parse(&property.name, &property.value, property.param("TZID"))
    }

    /// Qualify the value with `tzid`.
    ///
    /// Floating times keep their wall clock. UTC times keep their instant and
    /// are rewritten as the zone's local time. Dates are returned unchanged.
    ///
    /// # Errors
    /// Returns `FormatError::InvalidTimezone` if `tzid` is not a known zone.
    pub fn in_zone(self, tzid: &str) -> Result<Self> {
        let tz = parse_zone(tzid)?;
        Ok(match self {
            Self::Floating(local) => Self::Zoned {
                local,
                tzid: tzid.to_string(),
            },
            Self::Utc(utc) => Self::Zoned {
                local: utc.and_utc().with_timezone(&tz).naive_local(),
                tzid: tzid.to_string(),
            },
            Self::Zoned { local, .. } => Self::Zoned {
                local,
                tzid: tzid.to_string(),
            },
            date @ Self::Date(_) => date,
        })
    }

    /// Shift by whole days on the value's own wall clock.
    pub fn plus_days(&self, days: i64) -> Self {
        let step = Duration::days(days);
        match self {
            Self::Date(date) => Self::Date(*date + step),
            Self::Floating(local) => Self::Floating(*local + step),
            Self::Utc(utc) => Self::Utc(*utc + step),
            Self::Zoned { local, tzid } => Self::Zoned {
                local: *local + step,
                tzid: tzid.clone(),
            },
        }
    }

    /// Weekday as seen on the value's own wall clock.
    pub fn weekday(&self) -> Weekday {
        self.naive().weekday()
    }

    fn naive(&self) -> NaiveDateTime {
        match self {
            Self::Date(date) => date.and_time(NaiveTime::MIN),
            Self::Floating(local) | Self::Utc(local) => *local,
            Self::Zoned { local, .. } => *local,
        }
    }

    /// Resolve to an absolute instant.
    ///
    /// Floating and date-only values are read as UTC. Zoned values go through
    /// the IANA database: ambiguous local times take the earlier instant, local
    /// times inside a DST gap move forward by the gap.
    ///
    /// # Errors
    /// Returns `FormatError::InvalidTimezone` if the `TZID` is not a known zone.
    pub fn instant(&self) -> Result<DateTime<Utc>> {
        match self {
            Self::Date(_) | Self::Floating(_) | Self::Utc(_) => Ok(self.naive().and_utc()),
            Self::Zoned { local, tzid } => {
                let tz = parse_zone(tzid)?;
                let resolved = tz
                    .from_local_datetime(local)
                    .earliest()
                    .or_else(|| tz.from_local_datetime(&(*local + Duration::hours(1))).earliest())
                    .ok_or_else(|| FormatError::InvalidTimezone(tzid.clone()))?;
                Ok(resolved.with_timezone(&Utc))
            }
        }
    }

    /// Milliseconds since the Unix epoch.
    pub fn epoch_millis(&self) -> Result<i64> {
        self.instant().map(|dt| dt.timestamp_millis())
    }

    /// Ordering key that never fails: unknown zones fall back to reading the
    /// wall clock as UTC.
    pub fn sort_key(&self) -> i64 {
        self.epoch_millis()
            .unwrap_or_else(|_| self.naive().and_utc().timestamp_millis())
    }

    /// Wire text without parameters.
    pub fn wire_value(&self) -> String {
        match self {
            Self::Date(date) => date.format(DATE_FORMAT).to_string(),
            Self::Floating(local) | Self::Zoned { local, .. } => {
                local.format(DATE_TIME_FORMAT).to_string()
            }
            Self::Utc(utc) => format!("{}Z", utc.format(DATE_TIME_FORMAT)),
        }
    }

    /// Build a property carrying this value, with `TZID` / `VALUE=DATE`
    /// parameters as needed.
    pub fn to_property(&self, name: &str) -> Property {
        let property = Property::new(name, self.wire_value());
        match self {
            Self::Date(_) => property.with_param("VALUE", "DATE"),
            Self::Zoned { tzid, .. } => property.with_param("TZID", tzid.clone()),
            Self::Floating(_) | Self::Utc(_) => property,
        }
    }
}

fn parse_zone(tzid: &str) -> Result<Tz> {
    tzid.trim_start_matches('/')
        .parse()
        .map_err(|_| FormatError::InvalidTimezone(tzid.to_string()))
}
