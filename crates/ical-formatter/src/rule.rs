//! The DAILY/WEEKLY recurrence rule subset produced by the collapser.

use std::fmt;
use std::str::FromStr;

use chrono::Weekday;
use serde::Deserialize;

use crate::error::{FormatError, Result};

/// Series period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
}

impl Frequency {
    /// Length of one period in days.
    pub fn period_days(self) -> i64 {
        match self {
            Frequency::Daily => 1,
            Frequency::Weekly => 7,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Frequency::Daily => "DAILY",
            Frequency::Weekly => "WEEKLY",
        }
    }
}

/// `FREQ=...;COUNT=...[;BYDAY=..]`, owned by the event it is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    pub count: u32,
    /// Anchor weekday, only for weekly series.
    pub weekday: Option<Weekday>,
}

fn weekday_code(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
        Weekday::Sun => "SU",
    }
}

fn parse_weekday(code: &str) -> Option<Weekday> {
    Some(match code {
        "MO" => Weekday::Mon,
        "TU" => Weekday::Tue,
        "WE" => Weekday::Wed,
        "TH" => Weekday::Thu,
        "FR" => Weekday::Fri,
        "SA" => Weekday::Sat,
        "SU" => Weekday::Sun,
        _ => return None,
    })
}

impl fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FREQ={};COUNT={}", self.frequency.as_str(), self.count)?;
        if let Some(day) = self.weekday {
            write!(f, ";BYDAY={}", weekday_code(day))?;
        }
        Ok(())
    }
}

impl FromStr for RecurrenceRule {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |why: &str| FormatError::InvalidRule(format!("{s}: {why}"));

        let mut frequency = None;
        let mut count = None;
        let mut weekday = None;

        for part in s.split(';').filter(|p| !p.is_empty()) {
            let (key, value) = part.split_once('=').ok_or_else(|| invalid("expected KEY=VALUE"))?;
            match key.to_ascii_uppercase().as_str() {
                "FREQ" => {
                    frequency = Some(match value.to_ascii_uppercase().as_str() {
                        "DAILY" => Frequency::Daily,
                        "WEEKLY" => Frequency::Weekly,
                        _ => return Err(invalid("only DAILY and WEEKLY are supported")),
                    });
                }
                "COUNT" => {
                    count = Some(value.parse::<u32>().map_err(|_| invalid("bad COUNT"))?);
                }
                "BYDAY" => {
                    weekday = Some(
                        parse_weekday(&value.to_ascii_uppercase())
                            .ok_or_else(|| invalid("BYDAY must be a single weekday"))?,
                    );
                }
                _ => return Err(invalid("unsupported rule part")),
            }
        }

        Ok(Self {
            frequency: frequency.ok_or_else(|| invalid("missing FREQ"))?,
            count: count.ok_or_else(|| invalid("missing COUNT"))?,
            weekday,
        })
    }
}
