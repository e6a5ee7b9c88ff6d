//! WakaTime summary payload and aggregated totals

use chrono::NaiveDate;
use serde::de::{Deserializer, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use super::{Result, WakastatsError};

/// One `{name, total_seconds, percent}` row of a day's breakdown
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DimensionEntry {
    pub name: String,
    #[serde(default, deserialize_with = "de_seconds")]
    pub total_seconds: u64,
    #[serde(default)]
    pub percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct GrandTotal {
    #[serde(default)]
    pub text: String,
    #[serde(default, deserialize_with = "de_seconds")]
    pub total_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DayRange {
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

/// One calendar day as returned by the summaries endpoint.
/// Dimension arrays and the grand total may be missing upstream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailySummary {
    #[serde(default)]
    pub languages: Option<Vec<DimensionEntry>>,
    #[serde(default)]
    pub editors: Option<Vec<DimensionEntry>>,
    #[serde(default)]
    pub operating_systems: Option<Vec<DimensionEntry>>,
    #[serde(default)]
    pub categories: Option<Vec<DimensionEntry>>,
    #[serde(default)]
    pub grand_total: Option<GrandTotal>,
    #[serde(default)]
    pub range: Option<DayRange>,
}

impl DailySummary {
    /// Calendar date, `None` when upstream omitted the range
    pub fn date(&self) -> Option<NaiveDate> {
        self.range.as_ref().map(|r| r.date)
    }

    /// Grand total seconds, 0 when upstream omitted it
    pub fn grand_total_seconds(&self) -> u64 {
        self.grand_total.as_ref().map_or(0, |g| g.total_seconds)
    }

    /// Entries of one dimension; a missing array reads as empty
    pub fn entries(&self, dimension: Dimension) -> &[DimensionEntry] {
        let entries = match dimension {
            Dimension::Languages => &self.languages,
            Dimension::Editors => &self.editors,
            Dimension::OperatingSystems => &self.operating_systems,
            Dimension::Categories => &self.categories,
        };
        entries.as_deref().unwrap_or(&[])
    }
}

/// `{ data: [...] }` envelope of the summaries endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct WeekSummary {
    #[serde(default, deserialize_with = "de_null_as_empty")]
    pub data: Vec<DailySummary>,
}

impl WeekSummary {
    /// Parse an upstream body. A literal `null` is an empty week.
    pub fn from_json(body: impl Into<String>) -> Result<Self> {
        let mut bytes = body.into().into_bytes();
        let week: Option<WeekSummary> = simd_json::serde::from_slice(&mut bytes)
            .map_err(|e| WakastatsError::Parse(e.to_string()))?;
        Ok(week.unwrap_or_default())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// The four breakdowns WakaTime reports per day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Languages,
    Editors,
    OperatingSystems,
    Categories,
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [
        Dimension::Languages,
        Dimension::Editors,
        Dimension::OperatingSystems,
        Dimension::Categories,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Dimension::Languages => "Programming Languages",
            Dimension::Editors => "Code Editors",
            Dimension::OperatingSystems => "Operating Systems",
            Dimension::Categories => "Categories",
        }
    }
}

/// Accumulated seconds per name.
///
/// Iteration follows the order in which names were first seen; equality
/// only compares the totals.
#[derive(Debug, Clone, Default)]
pub struct DimensionTotals {
    order: Vec<String>,
    totals: HashMap<String, u64>,
}

impl DimensionTotals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: &str, seconds: u64) {
        match self.totals.get_mut(name) {
            Some(total) => *total = total.saturating_add(seconds),
            None => {
                self.order.push(name.to_string());
                self.totals.insert(name.to_string(), seconds);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<u64> {
        self.totals.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// `(name, seconds)` in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.order
            .iter()
            .map(|name| (name.as_str(), self.totals.get(name).copied().unwrap_or(0)))
    }

    pub fn sum(&self) -> u64 {
        self.totals
            .values()
            .fold(0u64, |acc, v| acc.saturating_add(*v))
    }
}

impl PartialEq for DimensionTotals {
    fn eq(&self, other: &Self) -> bool {
        self.totals == other.totals
    }
}

impl Serialize for DimensionTotals {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.order.len()))?;
        for (name, seconds) in self.iter() {
            map.serialize_entry(name, &seconds)?;
        }
        map.end()
    }
}

/// One point of the per-day trend. `date` is null for a day without a range.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct DailyPoint {
    pub date: Option<NaiveDate>,
    pub seconds: u64,
}

/// Week-level totals produced by the aggregator
#[derive(Debug, Clone, Serialize, PartialEq, Default)]
pub struct AggregatedTotals {
    pub languages: DimensionTotals,
    pub editors: DimensionTotals,
    pub operating_systems: DimensionTotals,
    pub categories: DimensionTotals,
    pub total_seconds: u64,
    pub daily_series: Vec<DailyPoint>,
}

impl AggregatedTotals {
    pub fn dimension(&self, dimension: Dimension) -> &DimensionTotals {
        match dimension {
            Dimension::Languages => &self.languages,
            Dimension::Editors => &self.editors,
            Dimension::OperatingSystems => &self.operating_systems,
            Dimension::Categories => &self.categories,
        }
    }

    pub(crate) fn dimension_mut(&mut self, dimension: Dimension) -> &mut DimensionTotals {
        match dimension {
            Dimension::Languages => &mut self.languages,
            Dimension::Editors => &mut self.editors,
            Dimension::OperatingSystems => &mut self.operating_systems,
            Dimension::Categories => &mut self.categories,
        }
    }

    /// Number of days that went into these totals
    pub fn day_count(&self) -> usize {
        self.daily_series.len()
    }
}

/// Seconds arrive as integers or floats; floats are floored, negatives clamp to 0
fn de_seconds<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    struct SecondsVisitor;

    impl<'de> Visitor<'de> for SecondsVisitor {
        type Value = u64;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a number of seconds")
        }

        fn visit_u64<E: serde::de::Error>(self, v: u64) -> std::result::Result<u64, E> {
            Ok(v)
        }

        fn visit_i64<E: serde::de::Error>(self, v: i64) -> std::result::Result<u64, E> {
            Ok(v.max(0) as u64)
        }

        fn visit_f64<E: serde::de::Error>(self, v: f64) -> std::result::Result<u64, E> {
            if v.is_finite() && v > 0.0 {
                Ok(v.floor() as u64)
            } else {
                Ok(0)
            }
        }

        fn visit_unit<E: serde::de::Error>(self) -> std::result::Result<u64, E> {
            Ok(0)
        }

        fn visit_none<E: serde::de::Error>(self) -> std::result::Result<u64, E> {
            Ok(0)
        }
    }

    deserializer.deserialize_any(SecondsVisitor)
}

fn de_null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
