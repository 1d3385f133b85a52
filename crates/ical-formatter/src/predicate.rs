//! Predicate evaluation over events and event collections.

use regex::Regex;

use crate::config::{ComparisonMethod, EventPredicate, Quantifier};
use crate::error::{FormatError, Result};
use crate::model::Event;

/// An [`EventPredicate`] with its comparison prepared for repeated use.
#[derive(Debug)]
pub struct CompiledPredicate<'a> {
    predicate: &'a EventPredicate,
    matcher: Matcher,
}

#[derive(Debug)]
enum Matcher {
    Literal {
        op: LiteralOp,
        operand: String,
        ignore_case: bool,
    },
    Regex(Regex),
}

#[derive(Debug, Clone, Copy)]
enum LiteralOp {
    Equals,
    Contains,
    StartsWith,
    EndsWith,
}

impl<'a> CompiledPredicate<'a> {
    /// # Errors
    /// Returns `FormatError::InvalidPattern` if a `regex` comparison value does
    /// not compile.
    pub fn new(predicate: &'a EventPredicate) -> Result<Self> {
        let literal = |op, value: &str, ignore_case: bool| Matcher::Literal {
            op,
            operand: if ignore_case {
                value.to_lowercase()
            } else {
                value.to_string()
            },
            ignore_case,
        };

        let matcher = match &predicate.method {
            ComparisonMethod::Equals { value, ignore_case } => {
                literal(LiteralOp::Equals, value, *ignore_case)
            }
            ComparisonMethod::Contains { value, ignore_case } => {
                literal(LiteralOp::Contains, value, *ignore_case)
            }
            ComparisonMethod::StartsWith { value, ignore_case } => {
                literal(LiteralOp::StartsWith, value, *ignore_case)
            }
            ComparisonMethod::EndsWith { value, ignore_case } => {
                literal(LiteralOp::EndsWith, value, *ignore_case)
            }
            ComparisonMethod::Regex { value } => Matcher::Regex(
                Regex::new(value).map_err(|e| FormatError::invalid_pattern(value, e))?,
            ),
        };

        Ok(Self { predicate, matcher })
    }

    /// Does this single event satisfy the comparison? An event without the
    /// property never does.
    pub fn matches(&self, event: &Event) -> bool {
        let Some(value) = event.value(&self.predicate.property_key) else {
            return false;
        };

        match &self.matcher {
            Matcher::Regex(re) => re.is_match(value),
            Matcher::Literal {
                op,
                operand,
                ignore_case,
            } => {
                let folded;
                let value = if *ignore_case {
                    folded = value.to_lowercase();
                    folded.as_str()
                } else {
                    value
                };
                match op {
                    LiteralOp::Equals => value == operand,
                    LiteralOp::Contains => value.contains(operand.as_str()),
                    LiteralOp::StartsWith => value.starts_with(operand.as_str()),
                    LiteralOp::EndsWith => value.ends_with(operand.as_str()),
                }
            }
        }
    }

    /// Quantified evaluation over `events` in their stored order.
    ///
    /// Scanning stops as soon as the threshold is met, or as soon as the
    /// events left are too few to ever meet it.
    pub fn holds(&self, events: &[Event]) -> bool {
        let threshold = threshold(self.predicate.quantifier, events.len());
        let mut matched = 0;

        for (index, event) in events.iter().enumerate() {
            if matched >= threshold {
                break;
            }
            let remaining = events.len() - index;
            if remaining < threshold - matched {
                break;
            }
            if self.matches(event) {
                matched += 1;
            }
        }

        matched >= threshold
    }
}

/// Matches needed for the predicate to hold over `total` events.
pub fn threshold(quantifier: Quantifier, total: usize) -> usize {
    match quantifier {
        Quantifier::Any => 1,
        Quantifier::All => total,
        Quantifier::Count(n) => n,
    }
}

/// Evaluate one predicate over a collection.
pub fn evaluate(predicate: &EventPredicate, events: &[Event]) -> Result<bool> {
    Ok(CompiledPredicate::new(predicate)?.holds(events))
}

/// True when every predicate holds (each scanned independently).
pub fn evaluate_all(predicates: &[EventPredicate], events: &[Event]) -> Result<bool> {
    for predicate in predicates {
        if !evaluate(predicate, events)? {
            return Ok(false);
        }
    }
    Ok(true)
}
