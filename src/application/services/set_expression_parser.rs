//! Set expression parser (C1)
//!
//! Ported from `SetBuilder` in `setbuilder.py`: parses comma-separated
//! cron-like tokens into a concrete integer set over a declared domain.
//! Supports names, numeric values, first/last wildcards (`^`, `$`),
//! all-wildcards (`*`, `?`), ranges (`a-b`, wrap-dependent), and step
//! increments (`a/n`, `a-b/n`). The parser dispatch order mirrors the
//! source's `_standard_parsers` list exactly: name, value, name-range,
//! value-range, all-wildcard, name-incr, value-incr, name-range-incr,
//! value-range-incr. The parser is total over its domain and side-effect
//! free.

use std::collections::BTreeSet;

use crate::domain::error::SchedulerError;

const WILDCARD_ALL: &[char] = &['*', '?'];
const WILDCARD_FIRST: char = '^';
const WILDCARD_LAST: char = '$';
const INCREMENT_CHARACTER: char = '/';
const RANGE_CHARACTER: char = '-';

/// Builds integer sets either from a list of names (weekdays, months) or
/// from a raw `min..=max` numeric domain (monthdays).
pub struct SetBuilder {
    names: Vec<String>,
    min_value: i32,
    max_value: i32,
    offset: i32,
    wrap: bool,
    significant_name_characters: usize,
}

impl SetBuilder {
    /// Builds from an ordered list of names; `offset` is the integer value
    /// of the first name (e.g. 0 for Monday-based weekdays, 1 for months).
    pub fn from_names(names: &[&str], offset: i32, wrap: bool, significant_name_characters: usize) -> Self {
        let names = names.iter().map(|n| n.to_lowercase()).collect::<Vec<_>>();
        let max_value = offset + names.len() as i32 - 1;
        Self {
            names,
            min_value: offset,
            max_value,
            offset,
            wrap,
            significant_name_characters,
        }
    }

    pub fn from_range(min_value: i32, max_value: i32, wrap: bool) -> Self {
        Self {
            names: Vec::new(),
            min_value,
            max_value,
            offset: min_value,
            wrap,
            significant_name_characters: 0,
        }
    }

    fn truncate(&self, name: &str) -> String {
        let name = name.to_lowercase();
        if self.significant_name_characters == 0 || self.names.is_empty() {
            name
        } else {
            name.chars().take(self.significant_name_characters).collect()
        }
    }

    fn value_by_name(&self, token: &str) -> Option<i32> {
        let truncated = self.truncate(token);
        self.names.iter().enumerate().find_map(|(i, n)| {
            let candidate: String = n.chars().take(truncated.chars().count()).collect();
            if candidate == truncated {
                Some(i as i32 + self.offset)
            } else {
                None
            }
        })
    }

    fn value_by_number(&self, token: &str) -> Option<i32> {
        token.parse::<i32>().ok().filter(|v| *v >= self.min_value && *v <= self.max_value)
    }

    fn resolve_endpoint(&self, token: &str) -> Option<i32> {
        match token {
            t if t.len() == 1 && t.chars().next() == Some(WILDCARD_FIRST) => Some(self.min_value),
            t if t.len() == 1 && t.chars().next() == Some(WILDCARD_LAST) => Some(self.max_value),
            _ => self.value_by_name(token).or_else(|| self.value_by_number(token)),
        }
    }

    fn range(&self, start: i32, end: i32) -> Result<Vec<i32>, SchedulerError> {
        if start <= end {
            Ok((start..=end).collect())
        } else if self.wrap {
            let mut v: Vec<i32> = (start..=self.max_value).collect();
            v.extend(self.min_value..=end);
            Ok(v)
        } else {
            Err(SchedulerError::InvalidDefinition(format!(
                "range {}-{} is descending and wrapping is not enabled",
                start, end
            )))
        }
    }

    fn parse_token(&self, token: &str) -> Result<BTreeSet<i32>, SchedulerError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(SchedulerError::InvalidDefinition("empty token in set expression".to_string()));
        }

        // all-items wildcard
        if token.len() == 1 && WILDCARD_ALL.contains(&token.chars().next().unwrap()) {
            return Ok((self.min_value..=self.max_value).collect());
        }

        // step increment: "<base>/<n>" where base is a single value or a range
        if let Some(slash_pos) = token.find(INCREMENT_CHARACTER) {
            let (base, step_str) = (&token[..slash_pos], &token[slash_pos + 1..]);
            let step: i32 = step_str
                .parse()
                .map_err(|_| SchedulerError::InvalidDefinition(format!("invalid step '{}'", step_str)))?;
            if step <= 0 {
                return Err(SchedulerError::InvalidDefinition(format!(
                    "step increment must be positive, got {}",
                    step
                )));
            }
            let (range_start, range_end) = if let Some(dash_pos) = base.find(RANGE_CHARACTER) {
                let (a, b) = (&base[..dash_pos], &base[dash_pos + 1..]);
                let start = self
                    .resolve_endpoint(a)
                    .ok_or_else(|| SchedulerError::InvalidDefinition(format!("unknown token '{}'", a)))?;
                let end = self
                    .resolve_endpoint(b)
                    .ok_or_else(|| SchedulerError::InvalidDefinition(format!("unknown token '{}'", b)))?;
                (start, end)
            } else {
                let start = self
                    .resolve_endpoint(base)
                    .ok_or_else(|| SchedulerError::InvalidDefinition(format!("unknown token '{}'", base)))?;
                (start, self.max_value)
            };
            let full_range = self.range(range_start, range_end)?;
            return Ok(full_range
                .into_iter()
                .enumerate()
                .filter(|(i, _)| *i as i32 % step == 0)
                .map(|(_, v)| v)
                .collect());
        }

        // range: "a-b"
        if let Some(dash_pos) = token.find(RANGE_CHARACTER) {
            // a leading '-' would make dash_pos == 0, which isn't a valid range token
            if dash_pos > 0 {
                let (a, b) = (&token[..dash_pos], &token[dash_pos + 1..]);
                let start = self.resolve_endpoint(a);
                let end = self.resolve_endpoint(b);
                if let (Some(start), Some(end)) = (start, end) {
                    return Ok(self.range(start, end)?.into_iter().collect());
                }
            }
        }

        // single name or value (including ^ / $)
        if let Some(v) = self.resolve_endpoint(token) {
            return Ok(BTreeSet::from([v]));
        }

        Err(SchedulerError::InvalidDefinition(format!("unknown token '{}' in set expression", token)))
    }

    /// Builds the full set from a comma-separated expression. Any
    /// unparseable token rejects the whole expression.
    pub fn build(&self, expression: &str) -> Result<BTreeSet<i32>, SchedulerError> {
        let mut result = BTreeSet::new();
        for token in expression.split(',') {
            result.extend(self.parse_token(token)?);
        }
        Ok(result)
    }
}

pub fn weekday_builder() -> SetBuilder {
    SetBuilder::from_names(
        &["mon", "tue", "wed", "thu", "fri", "sat", "sun"],
        0,
        true,
        3,
    )
}

pub fn month_builder() -> SetBuilder {
    SetBuilder::from_names(
        &[
            "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
        ],
        1,
        true,
        3,
    )
}

pub fn monthday_builder() -> SetBuilder {
    SetBuilder::from_range(1, 31, false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_weekday_names_and_ranges() {
        let b = weekday_builder();
        assert_eq!(b.build("mon-fri").unwrap(), BTreeSet::from([0, 1, 2, 3, 4]));
        assert_eq!(b.build("sat,sun").unwrap(), BTreeSet::from([5, 6]));
    }

    #[test]
    fn parses_all_wildcard() {
        let b = month_builder();
        assert_eq!(b.build("*").unwrap(), (1..=12).collect::<BTreeSet<_>>());
    }

    #[test]
    fn parses_first_and_last_wildcards() {
        let b = weekday_builder();
        assert_eq!(b.build("^").unwrap(), BTreeSet::from([0]));
        assert_eq!(b.build("$").unwrap(), BTreeSet::from([6]));
    }

    #[test]
    fn wrapping_range_crosses_boundary() {
        let b = weekday_builder();
        assert_eq!(b.build("fri-mon").unwrap(), BTreeSet::from([4, 5, 6, 0]));
    }

    #[test]
    fn non_wrapping_domain_rejects_descending_range() {
        let b = monthday_builder();
        assert!(b.build("20-5").is_err());
    }

    #[test]
    fn rejects_unknown_token() {
        let b = weekday_builder();
        assert!(b.build("xyz").is_err());
    }

    #[test]
    fn rejects_non_positive_step() {
        let b = monthday_builder();
        assert!(b.build("1-10/0").is_err());
    }

    #[test]
    fn step_increment_over_range() {
        let b = monthday_builder();
        assert_eq!(b.build("1-10/2").unwrap(), BTreeSet::from([1, 3, 5, 7, 9]));
    }

    proptest::proptest! {
        #[test]
        fn ascending_range_over_monthdays_matches_inclusive_range(a in 1i32..=31, b in 1i32..=31) {
            let b_end = a.max(b);
            let a_start = a.min(b);
            let builder = monthday_builder();
            let parsed = builder.build(&format!("{a_start}-{b_end}")).unwrap();
            let expected: BTreeSet<i32> = (a_start..=b_end).collect();
            proptest::prop_assert_eq!(parsed, expected);
        }

        #[test]
        fn single_monthday_value_parses_to_singleton(v in 1i32..=31) {
            let builder = monthday_builder();
            let parsed = builder.build(&v.to_string()).unwrap();
            proptest::prop_assert_eq!(parsed, BTreeSet::from([v]));
        }

        #[test]
        fn wrapping_weekday_range_always_has_cardinality_matching_span(a in 0i32..7, b in 0i32..7) {
            let builder = weekday_builder();
            let names = ["mon", "tue", "wed", "thu", "fri", "sat", "sun"];
            let expr = format!("{}-{}", names[a as usize], names[b as usize]);
            let parsed = builder.build(&expr).unwrap();
            let expected_len = if a <= b { (b - a + 1) as usize } else { (7 - a + b + 1) as usize };
            proptest::prop_assert_eq!(parsed.len(), expected_len);
        }
    }
}
