use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::media::MediaType;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    #[error("invalid date range {0:?}: expected YYYY, YYYY-MM or YYYY-MM-DD, optionally two separated by a comma")]
    InvalidDateRange(String),
    #[error("unknown media type {0:?}: expected video or picture")]
    UnknownMediaType(String),
}

/// Lowercase, dot-prefixed extensions, normalized once at construction.
///
/// An empty list includes everything and excludes nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionList(Vec<String>);

impl ExtensionList {
    pub fn new<I, S>(exts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list: Vec<String> = Vec::new();
        for ext in exts.into_iter().filter_map(|e| normalize_extension(e.as_ref())) {
            if !list.contains(&ext) {
                list.push(ext);
            }
        }
        Self(list)
    }

    pub fn include(&self, ext: &str) -> bool {
        self.0.is_empty() || self.contains(ext)
    }

    pub fn exclude(&self, ext: &str) -> bool {
        !self.0.is_empty() && self.contains(ext)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    fn contains(&self, ext: &str) -> bool {
        normalize_extension(ext).is_some_and(|ext| self.0.contains(&ext))
    }
}

/// `JPG`, `.jpg` and ` .Jpg ` all become `.jpg`.
fn normalize_extension(ext: &str) -> Option<String> {
    let ext = ext.trim().to_lowercase();
    if ext.is_empty() || ext == "." {
        return None;
    }
    Some(if ext.starts_with('.') { ext } else { format!(".{ext}") })
}

impl FromStr for ExtensionList {
    type Err = std::convert::Infallible;

    /// Comma separated, e.g. `.jpg, HEIC`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s.split(',')))
    }
}

impl fmt::Display for ExtensionList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(", "))
    }
}

/// Closed interval of calendar days, compared against UTC capture dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    from: NaiveDate,
    to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        if from <= to {
            Self { from, to }
        } else {
            Self { from: to, to: from }
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.from
    }

    pub fn end(&self) -> NaiveDate {
        self.to
    }

    pub fn contains(&self, when: DateTime<Utc>) -> bool {
        let day = when.date_naive();
        self.from <= day && day <= self.to
    }
}

impl FromStr for DateRange {
    type Err = FilterError;

    /// Accepts `2023`, `2023-06`, `2023-06-14` or `start,end` made of those.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || FilterError::InvalidDateRange(s.to_string());
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        let (first, last) = match parts.as_slice() {
            [one] => (*one, *one),
            [start, end] => (*start, *end),
            _ => return Err(invalid()),
        };
        let (from, _) = parse_bound(first).ok_or_else(invalid)?;
        let (_, to) = parse_bound(last).ok_or_else(invalid)?;
        if from > to {
            return Err(invalid());
        }
        Ok(Self { from, to })
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.from, self.to)
    }
}

/// First and last day covered by a `YYYY`, `YYYY-MM` or `YYYY-MM-DD` bound.
fn parse_bound(s: &str) -> Option<(NaiveDate, NaiveDate)> {
    let fields = s
        .split('-')
        .map(|p| p.parse::<u32>().ok())
        .collect::<Option<Vec<_>>>()?;
    match fields.as_slice() {
        [y] => {
            let y = i32::try_from(*y).ok()?;
            Some((
                NaiveDate::from_ymd_opt(y, 1, 1)?,
                NaiveDate::from_ymd_opt(y, 12, 31)?,
            ))
        }
        [y, m] => {
            let start = NaiveDate::from_ymd_opt(i32::try_from(*y).ok()?, *m, 1)?;
            let next = if start.month() == 12 {
                NaiveDate::from_ymd_opt(start.year() + 1, 1, 1)?
            } else {
                NaiveDate::from_ymd_opt(start.year(), start.month() + 1, 1)?
            };
            Some((start, next.pred_opt()?))
        }
        [y, m, d] => {
            let day = NaiveDate::from_ymd_opt(i32::try_from(*y).ok()?, *m, *d)?;
            Some((day, day))
        }
        _ => None,
    }
}

/// Extension and capture-date predicates applied by the driver.
#[derive(Debug, Clone, Default)]
pub struct InclusionFilter {
    pub include: ExtensionList,
    pub exclude: ExtensionList,
    pub date_range: Option<DateRange>,
}

impl InclusionFilter {
    /// A media type shortcut replaces the explicit include list.
    pub fn new(
        include: ExtensionList,
        exclude: ExtensionList,
        media_type: Option<MediaType>,
        date_range: Option<DateRange>,
    ) -> Self {
        let include = match media_type {
            Some(t) => t.extensions(),
            None => include,
        };
        Self {
            include,
            exclude,
            date_range,
        }
    }

    pub fn accepts_extension(&self, ext: &str) -> bool {
        self.include.include(ext) && !self.exclude.exclude(ext)
    }

    /// Without a configured range every asset passes, dated or not.
    /// With one, an undated asset cannot be placed and is rejected.
    pub fn accepts_date(&self, when: Option<DateTime<Utc>>) -> bool {
        match (&self.date_range, when) {
            (None, _) => true,
            (Some(range), Some(when)) => range.contains(when),
            (Some(_), None) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn normalizes_at_construction() {
        let list = ExtensionList::new([" JPG", ".Heic", "", "jpg"]);
        assert_eq!(list.iter().collect::<Vec<_>>(), vec![".jpg", ".heic"]);
    }

    #[test]
    fn parses_comma_separated_flag_value() {
        let list: ExtensionList = ".gif, .PM".parse().unwrap();
        assert_eq!(list.to_string(), ".gif, .pm");
    }

    #[test]
    fn month_range_covers_whole_month() {
        let range: DateRange = "2024-02".parse().unwrap();
        assert_eq!(range.start(), day(2024, 2, 1));
        assert_eq!(range.end(), day(2024, 2, 29));
    }

    #[test]
    fn december_month_rolls_over_year() {
        let range: DateRange = "2023-12".parse().unwrap();
        assert_eq!(range.end(), day(2023, 12, 31));
    }

    #[test]
    fn reversed_range_is_rejected() {
        assert!("2024-01-02,2023-01-01".parse::<DateRange>().is_err());
        assert!("2024-13".parse::<DateRange>().is_err());
        assert!("yesterday".parse::<DateRange>().is_err());
    }

    #[test]
    fn include_type_overrides_include_list() {
        let filter = InclusionFilter::new(
            ExtensionList::new([".jpg"]),
            ExtensionList::default(),
            Some(MediaType::Video),
            None,
        );
        assert!(filter.accepts_extension(".MP4"));
        assert!(!filter.accepts_extension(".jpg"));
    }

    #[test]
    fn exclusion_wins_over_inclusion() {
        let filter = InclusionFilter::new(
            ExtensionList::default(),
            ExtensionList::new([".gif"]),
            None,
            None,
        );
        assert!(filter.accepts_extension(".jpg"));
        assert!(!filter.accepts_extension(".GIF"));
    }
}
