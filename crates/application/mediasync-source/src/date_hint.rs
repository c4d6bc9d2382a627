use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use mediasync_core::path_utils::AssetPath;

const MIN_YEAR: i32 = 1980;
const MAX_YEAR: i32 = 2100;

/// Capture date embedded in a camera-style file name such as
/// `IMG_20190805_123456.jpg` or `2019-08-05 12.34.56.jpg`.
///
/// Only two shapes count as a date: one run of at least eight digits that
/// starts with `YYYYMMDD`, or three runs shaped `YYYY`, `MM`, `DD`. The time
/// is read from the rest of the long run, or from the runs that follow.
pub(crate) fn date_from_name(name: &str) -> Option<DateTime<Utc>> {
    let stem = AssetPath::stem(name);
    let groups: Vec<&str> = stem
        .split(|c: char| !c.is_ascii_digit())
        .filter(|g| !g.is_empty())
        .collect();

    for (i, g) in groups.iter().enumerate() {
        let found = if g.len() >= 8 {
            parse_date(&g[0..4], &g[4..6], &g[6..8]).map(|date| {
                let time = match g.len() {
                    8 => time_after(&groups[i + 1..]),
                    n if n >= 14 => parse_time(&g[8..10], &g[10..12], &g[12..14]),
                    _ => None,
                };
                (date, time)
            })
        } else if let [y, m, d, rest @ ..] = &groups[i..] {
            let shaped = y.len() == 4 && m.len() == 2 && d.len() == 2;
            shaped
                .then(|| parse_date(y, m, d))
                .flatten()
                .map(|date| (date, time_after(rest)))
        } else {
            None
        };
        if let Some((date, time)) = found {
            return Some(date.and_time(time.unwrap_or(NaiveTime::MIN)).and_utc());
        }
    }
    None
}

fn parse_date(y: &str, m: &str, d: &str) -> Option<NaiveDate> {
    let year: i32 = y.parse().ok()?;
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return None;
    }
    NaiveDate::from_ymd_opt(year, m.parse().ok()?, d.parse().ok()?)
}

fn parse_time(h: &str, m: &str, s: &str) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(h.parse().ok()?, m.parse().ok()?, s.parse().ok()?)
}

/// `123456` (extra digits ignored) or `12`, `34`, `56` right after the date.
fn time_after(rest: &[&str]) -> Option<NaiveTime> {
    match rest {
        [t, ..] if t.len() >= 6 => parse_time(&t[0..2], &t[2..4], &t[4..6]),
        [h, m, s, ..] if h.len() == 2 && m.len() == 2 && s.len() == 2 => parse_time(h, m, s),
        _ => None,
    }
}
