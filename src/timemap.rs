use crate::interval::Interval;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

pub const WEEKDAY_NAMES: [&str; 7] = [
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

/// Config form of a weekly time map: lowercase weekday name to a list of
/// `[start_hour, end_hour]` windows with fractional hours (`12.5` = 12:30).
pub type TimeMapConfig = BTreeMap<String, Vec<[f64; 2]>>;

/// Config form of a named time-map registry.
pub type TimeMapSetConfig = BTreeMap<String, TimeMapConfig>;

#[derive(Debug, Clone)]
pub enum TimeMapError {
    UnknownWeekday {
        map: String,
        day: String,
    },
    BadWindow {
        map: String,
        day: String,
        start: f64,
        end: f64,
    },
    OverlappingWindows {
        map: String,
        day: String,
    },
}

impl fmt::Display for TimeMapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeMapError::UnknownWeekday { map, day } => {
                write!(f, "time map '{map}' has unknown weekday '{day}'")
            }
            TimeMapError::BadWindow {
                map,
                day,
                start,
                end,
            } => write!(
                f,
                "time map '{map}' has invalid window [{start}, {end}] on {day} (need 0 <= start < end <= 24)"
            ),
            TimeMapError::OverlappingWindows { map, day } => {
                write!(f, "time map '{map}' has overlapping windows on {day}")
            }
        }
    }
}

impl std::error::Error for TimeMapError {}

/// Minutes from midnight, end-exclusive. `end <= 1440`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MinuteSpan {
    start: u32,
    end: u32,
}

/// A named recurring weekly availability pattern. Immutable once built:
/// windows per weekday are sorted and non-overlapping.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeMap {
    windows: [Vec<MinuteSpan>; 7],
}

fn weekday_index(day: Weekday) -> usize {
    day.num_days_from_monday() as usize
}

fn weekday_from_name(name: &str) -> Option<usize> {
    WEEKDAY_NAMES.iter().position(|d| *d == name)
}

fn hours_to_minutes(hour: f64) -> Option<u32> {
    if !hour.is_finite() || hour < 0.0 || hour > 24.0 {
        return None;
    }
    let minutes = (hour * 60.0).round() as i64;
    if (0..=1440).contains(&minutes) {
        Some(minutes as u32)
    } else {
        None
    }
}

impl TimeMap {
    pub fn from_config(name: &str, config: &TimeMapConfig) -> Result<Self, TimeMapError> {
        let mut windows: [Vec<MinuteSpan>; 7] = std::array::from_fn(|_| Vec::new());
        for (day, spans) in config {
            let idx = weekday_from_name(day).ok_or_else(|| TimeMapError::UnknownWeekday {
                map: name.to_string(),
                day: day.clone(),
            })?;
            for [start_hour, end_hour] in spans {
                let bad = || TimeMapError::BadWindow {
                    map: name.to_string(),
                    day: day.clone(),
                    start: *start_hour,
                    end: *end_hour,
                };
                let start = hours_to_minutes(*start_hour).ok_or_else(bad)?;
                let end = hours_to_minutes(*end_hour).ok_or_else(bad)?;
                if start >= end {
                    return Err(bad());
                }
                windows[idx].push(MinuteSpan { start, end });
            }
        }
        for (idx, spans) in windows.iter_mut().enumerate() {
            spans.sort_by_key(|s| s.start);
            if spans.windows(2).any(|pair| pair[1].start < pair[0].end) {
                return Err(TimeMapError::OverlappingWindows {
                    map: name.to_string(),
                    day: WEEKDAY_NAMES[idx].to_string(),
                });
            }
        }
        Ok(Self { windows })
    }

    pub fn to_config(&self) -> TimeMapConfig {
        let mut config = TimeMapConfig::new();
        for (idx, spans) in self.windows.iter().enumerate() {
            if spans.is_empty() {
                continue;
            }
            let hours = spans
                .iter()
                .map(|s| [s.start as f64 / 60.0, s.end as f64 / 60.0])
                .collect();
            config.insert(WEEKDAY_NAMES[idx].to_string(), hours);
        }
        config
    }

    pub fn is_empty(&self) -> bool {
        self.windows.iter().all(Vec::is_empty)
    }

    /// Minutes of availability on the given weekday, ignoring blocks.
    pub fn minutes_on_weekday(&self, day: Weekday) -> i64 {
        self.windows[weekday_index(day)]
            .iter()
            .map(|s| (s.end - s.start) as i64)
            .sum()
    }

    /// The weekday's windows as absolute intervals on a concrete date,
    /// in chronological order.
    pub fn intervals_on(&self, date: NaiveDate) -> Vec<Interval> {
        let midnight = date.and_hms_opt(0, 0, 0).expect("midnight is always valid");
        self.windows[weekday_index(date.weekday())]
            .iter()
            .map(|s| Interval {
                start: midnight + Duration::minutes(s.start as i64),
                end: midnight + Duration::minutes(s.end as i64),
            })
            .collect()
    }
}

/// Registry of time maps, looked up by name from task records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeMapSet {
    maps: HashMap<String, TimeMap>,
}

impl TimeMapSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &TimeMapSetConfig) -> Result<Self, TimeMapError> {
        let mut set = Self::new();
        for (name, map_config) in config {
            set.insert(name.clone(), TimeMap::from_config(name, map_config)?);
        }
        Ok(set)
    }

    pub fn to_config(&self) -> TimeMapSetConfig {
        self.maps
            .iter()
            .map(|(name, map)| (name.clone(), map.to_config()))
            .collect()
    }

    pub fn insert(&mut self, name: impl Into<String>, map: TimeMap) {
        self.maps.insert(name.into(), map);
    }

    pub fn remove(&mut self, name: &str) -> Option<TimeMap> {
        self.maps.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&TimeMap> {
        self.maps.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.maps.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.maps.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }
}
