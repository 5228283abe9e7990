//! Stop time labels.
//!
//! Stop times are free-form strings entered by editors: either an elapsed
//! time since the origin ("12 мин") or a marker for the origin itself
//! ("Начало"). The raw string is what gets stored; this is a read-only view
//! used for summaries.

use chrono::TimeDelta;

/// Parsed view of a stop's time label
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TimeLabel {
    /// The stop is the start of the route
    Start,
    /// Elapsed time since the origin
    Elapsed(TimeDelta),
    /// No time was entered
    Unset,
    /// Anything we don't understand; kept verbatim
    Other(String),
}

const START_MARKERS: &[&str] = &["начало", "start"];
const MINUTE_SUFFIXES: &[&str] = &["мин", "min", "m"];

impl TimeLabel {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::Unset;
        }

        let lowered = trimmed.to_lowercase();
        if START_MARKERS.contains(&lowered.as_str()) {
            return Self::Start;
        }

        let unit = lowered.trim_end_matches('.');
        let digits = MINUTE_SUFFIXES
            .iter()
            .find_map(|suffix| unit.strip_suffix(suffix))
            .unwrap_or(unit)
            .trim();

        match digits.parse::<i64>() {
            Ok(minutes) if minutes >= 0 => TimeDelta::try_minutes(minutes)
                .map_or_else(|| Self::Other(trimmed.to_owned()), Self::Elapsed),
            _ => Self::Other(trimmed.to_owned()),
        }
    }

    /// Elapsed minutes since the origin, with the origin itself at zero
    pub fn minutes(&self) -> Option<i64> {
        match self {
            Self::Start => Some(0),
            Self::Elapsed(delta) => Some(delta.num_minutes()),
            Self::Unset | Self::Other(_) => None,
        }
    }
}

/// Check that known elapsed times never go backwards along a stop sequence.
///
/// Returns the index of the first stop whose time is earlier than a previous
/// one. Stops without a parseable time are skipped.
pub fn first_out_of_order<'a>(labels: impl IntoIterator<Item = &'a TimeLabel>) -> Option<usize> {
    let mut latest = None;
    for (index, label) in labels.into_iter().enumerate() {
        let Some(minutes) = label.minutes() else {
            continue;
        };
        if latest.is_some_and(|previous| minutes < previous) {
            return Some(index);
        }
        latest = Some(minutes);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_labels() {
        assert_eq!(TimeLabel::parse("Начало"), TimeLabel::Start);
        assert_eq!(TimeLabel::parse(" start "), TimeLabel::Start);
        assert_eq!(TimeLabel::parse("12 мин"), TimeLabel::Elapsed(TimeDelta::minutes(12)));
        assert_eq!(TimeLabel::parse("3min"), TimeLabel::Elapsed(TimeDelta::minutes(3)));
        assert_eq!(TimeLabel::parse("45"), TimeLabel::Elapsed(TimeDelta::minutes(45)));
        assert_eq!(TimeLabel::parse("5 мин."), TimeLabel::Elapsed(TimeDelta::minutes(5)));
        assert_eq!(TimeLabel::parse(""), TimeLabel::Unset);
        assert_eq!(TimeLabel::parse("around noon"), TimeLabel::Other("around noon".into()));
        assert_eq!(TimeLabel::parse("-5 мин"), TimeLabel::Other("-5 мин".into()));
        assert_eq!(
            TimeLabel::parse("999999999999999999 мин"),
            TimeLabel::Other("999999999999999999 мин".into())
        );
    }

    #[test]
    fn test_minutes() {
        assert_eq!(TimeLabel::Start.minutes(), Some(0));
        assert_eq!(TimeLabel::parse("20 мин").minutes(), Some(20));
        assert_eq!(TimeLabel::Unset.minutes(), None);
    }

    #[test]
    fn test_first_out_of_order() {
        let ordered: Vec<_> = ["Начало", "3 мин", "", "7 мин"]
            .into_iter()
            .map(TimeLabel::parse)
            .collect();
        assert_eq!(first_out_of_order(&ordered), None);

        let shuffled: Vec<_> = ["Начало", "12 мин", "?", "7 мин"]
            .into_iter()
            .map(TimeLabel::parse)
            .collect();
        assert_eq!(first_out_of_order(&shuffled), Some(3));
    }
}
