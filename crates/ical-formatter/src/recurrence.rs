//! Recurrence collapsing -- folds runs of identical single events into one
//! recurring series.
//!
//! A single forward pass over the events sorted by start time. Each open
//! series remembers the values of the required-match properties at its
//! anchor and the exact start it expects next; an event extends the first
//! open series it matches and is then absorbed into it. There is no tolerance
//! window: one missed week ends the series and the next occurrence starts a
//! new one.

use crate::config::RecurrenceConfig;
use crate::datetime::DateTimeValue;
use crate::model::Event;
use crate::rule::{Frequency, RecurrenceRule};

/// Per-run state for a series being built. Never stored on the document.
struct SeriesInProgress {
    anchor: Event,
    snapshot: Vec<Option<String>>,
    next_start: DateTimeValue,
    rule: RecurrenceRule,
}

impl SeriesInProgress {
    fn open(anchor: Event, start: &DateTimeValue, snapshot: Vec<Option<String>>, frequency: Frequency) -> Self {
        let weekday = match frequency {
            Frequency::Weekly => Some(start.weekday()),
            Frequency::Daily => None,
        };
        Self {
            anchor,
            snapshot,
            next_start: start.plus_days(frequency.period_days()),
            rule: RecurrenceRule {
                frequency,
                count: 1,
                weekday,
            },
        }
    }

    fn accepts(&self, start: &DateTimeValue, values: &[Option<String>]) -> bool {
        self.next_start == *start && self.snapshot == values
    }

    fn extend(&mut self) {
        self.rule.count += 1;
        self.next_start = self
            .next_start
            .plus_days(self.rule.frequency.period_days());
    }

    fn finish(mut self) -> Event {
        if self.rule.count > 1 {
            self.anchor.set_recurrence_rule(&self.rule);
        }
        self.anchor
    }
}

fn snapshot(event: &Event, keys: &[String]) -> Vec<Option<String>> {
    keys.iter()
        .map(|key| event.value(key).map(str::to_string))
        .collect()
}

/// Collapse `events` into series.
///
/// - Events that already carry an `RRULE` pass through untouched, first.
/// - Single events without a usable `DTSTART` are dropped.
/// - The rest are sorted by start (stable) and grouped; a group of more than
///   one event becomes its earliest event with an `RRULE` attached, a group of
///   one is emitted unchanged.
///
/// Required-match keys compare values byte-for-byte; a key missing on both
/// events counts as equal.
pub fn collapse_recurring(events: Vec<Event>, config: &RecurrenceConfig) -> Vec<Event> {
    let input_len = events.len();
    let (mut output, singles): (Vec<Event>, Vec<Event>) =
        events.into_iter().partition(Event::has_recurrence);

    let mut timed: Vec<(DateTimeValue, Event)> = singles
        .into_iter()
        .filter_map(|event| match event.start() {
            Ok(Some(start)) => Some((start, event)),
            Ok(None) => {
                tracing::debug!(uid = ?event.uid(), "dropping event without DTSTART");
                None
            }
            Err(e) => {
                tracing::warn!(uid = ?event.uid(), error = %e, "dropping event with unreadable DTSTART");
                None
            }
        })
        .collect();
    timed.sort_by_key(|(start, _)| start.sort_key());

    let mut open: Vec<SeriesInProgress> = Vec::new();
    for (start, event) in timed {
        let values = snapshot(&event, &config.required_matching_keys);
        match open.iter_mut().find(|series| series.accepts(&start, &values)) {
            Some(series) => series.extend(),
            None => open.push(SeriesInProgress::open(event, &start, values, config.frequency)),
        }
    }

    let series_count = open.iter().filter(|s| s.rule.count > 1).count();
    output.extend(open.into_iter().map(SeriesInProgress::finish));

    tracing::debug!(
        input = input_len,
        output = output.len(),
        series = series_count,
        "collapsed recurring events"
    );
    output
}
