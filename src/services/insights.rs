//! Derived insights over aggregated totals
//!
//! Secondary metrics shown on the stats page: daily average, top entries,
//! productivity level, ranked breakdowns, peak day and achievement badges.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

use super::format::{format_duration, format_percentage};
use crate::types::{
    AggregatedTotals, DailyPoint, Dimension, DimensionTotals, Result, WakastatsError,
};

/// Entries shown per dimension card
pub const BREAKDOWN_LIMIT: usize = 8;

/// Shown in place of a top entry when a dimension has no data
pub const NOT_AVAILABLE: &str = "N/A";

const HOUR: f64 = 3600.0;

/// Average seconds per day over the days actually present (0 for no days)
pub fn daily_average(totals: &AggregatedTotals) -> f64 {
    let days = totals.day_count();
    if days == 0 {
        return 0.0;
    }
    totals.total_seconds as f64 / days as f64
}

/// Name with the most seconds. Ties go to the name seen first in the input.
pub fn top_entry(totals: &DimensionTotals) -> Option<(&str, u64)> {
    let mut top: Option<(&str, u64)> = None;
    for (name, seconds) in totals.iter() {
        match top {
            Some((_, best)) if seconds <= best => {}
            _ => top = Some((name, seconds)),
        }
    }
    top
}

/// Day with the most seconds, first one wins on ties
pub fn peak_day(totals: &AggregatedTotals) -> Option<DailyPoint> {
    let mut peak: Option<DailyPoint> = None;
    for point in &totals.daily_series {
        match &peak {
            Some(best) if point.seconds <= best.seconds => {}
            _ => peak = Some(*point),
        }
    }
    peak
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProductivityLevel {
    High,
    Medium,
    Low,
}

impl ProductivityLevel {
    /// `> 4h` is High, `> 2h` is Medium, anything else Low
    pub fn from_daily_average(avg_seconds: f64) -> Self {
        if avg_seconds > 14400.0 {
            ProductivityLevel::High
        } else if avg_seconds > 7200.0 {
            ProductivityLevel::Medium
        } else {
            ProductivityLevel::Low
        }
    }
}

impl fmt::Display for ProductivityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProductivityLevel::High => "High",
            ProductivityLevel::Medium => "Medium",
            ProductivityLevel::Low => "Low",
        };
        f.write_str(s)
    }
}

/// One row of a dimension card
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry {
    pub name: String,
    pub total_seconds: u64,
    pub duration: String,
    /// Share of the week's grand total
    pub percentage: String,
}

/// Entries sorted by seconds descending (stable on first-seen order), at most `limit`
pub fn ranked_entries(
    totals: &DimensionTotals,
    grand_total: u64,
    limit: usize,
) -> Vec<RankedEntry> {
    let mut items: Vec<(&str, u64)> = totals.iter().collect();
    items.sort_by(|a, b| b.1.cmp(&a.1));

    items
        .into_iter()
        .take(limit)
        .map(|(name, seconds)| RankedEntry {
            name: name.to_string(),
            total_seconds: seconds,
            duration: format_duration(seconds),
            percentage: format_percentage(seconds, grand_total),
        })
        .collect()
}

// ========== Achievements ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementMetric {
    TotalSeconds,
    DailyAverageSeconds,
}

/// A badge unlocked when its metric is strictly above the threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementRule {
    pub id: String,
    pub label: String,
    pub description: String,
    pub metric: AchievementMetric,
    pub threshold_seconds: f64,
}

impl AchievementRule {
    fn new(
        id: &str,
        label: &str,
        description: &str,
        metric: AchievementMetric,
        threshold_seconds: f64,
    ) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            description: description.to_string(),
            metric,
            threshold_seconds,
        }
    }

    pub fn is_unlocked(&self, total_seconds: u64, daily_average: f64) -> bool {
        let value = match self.metric {
            AchievementMetric::TotalSeconds => total_seconds as f64,
            AchievementMetric::DailyAverageSeconds => daily_average,
        };
        value > self.threshold_seconds
    }
}

/// Badge table. Thresholds are configuration, see [`AchievementRules::load`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AchievementRules(pub Vec<AchievementRule>);

impl Default for AchievementRules {
    fn default() -> Self {
        use AchievementMetric::{DailyAverageSeconds, TotalSeconds};
        Self(vec![
            AchievementRule::new(
                "streak",
                "7 Day Streak",
                "Coded for 7 days straight!",
                TotalSeconds,
                0.0,
            ),
            AchievementRule::new(
                "speed_coder",
                "Speed Coder",
                "Average 4+ hours per day",
                DailyAverageSeconds,
                4.0 * HOUR,
            ),
            AchievementRule::new(
                "night_owl",
                "Night Owl",
                "20+ hours of coding",
                TotalSeconds,
                20.0 * HOUR,
            ),
            AchievementRule::new(
                "dedicated",
                "Dedicated",
                "30+ hours this week!",
                TotalSeconds,
                30.0 * HOUR,
            ),
            AchievementRule::new(
                "productive",
                "Productive",
                "Consistently productive",
                DailyAverageSeconds,
                3.0 * HOUR,
            ),
            AchievementRule::new(
                "master",
                "Master",
                "40+ hours - You're a pro!",
                TotalSeconds,
                40.0 * HOUR,
            ),
        ])
    }
}

impl AchievementRules {
    /// Load a JSON array of rules
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            WakastatsError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content)
            .map_err(|e| WakastatsError::Config(format!("invalid achievements file: {}", e)))
    }

    pub fn evaluate(&self, totals: &AggregatedTotals) -> Vec<AchievementStatus> {
        let avg = daily_average(totals);
        self.0
            .iter()
            .map(|rule| AchievementStatus {
                id: rule.id.clone(),
                label: rule.label.clone(),
                description: rule.description.clone(),
                unlocked: rule.is_unlocked(totals.total_seconds, avg),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AchievementStatus {
    pub id: String,
    pub label: String,
    pub description: String,
    pub unlocked: bool,
}

// ========== Report ==========

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Breakdown {
    pub dimension: Dimension,
    pub label: &'static str,
    /// Distinct names seen, before truncation
    pub item_count: usize,
    pub entries: Vec<RankedEntry>,
}

/// Everything the stats page shows, computed from one aggregation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsReport {
    pub total_seconds: u64,
    pub total_text: String,
    pub day_count: usize,
    pub daily_average_seconds: f64,
    pub daily_average_text: String,
    pub productivity: ProductivityLevel,
    pub top_language: String,
    pub top_editor: String,
    pub top_operating_system: String,
    pub top_category: String,
    pub peak_day: Option<DailyPoint>,
    pub trend: Vec<DailyPoint>,
    pub breakdowns: Vec<Breakdown>,
    pub achievements: Vec<AchievementStatus>,
}

impl StatsReport {
    pub fn build(totals: &AggregatedTotals, rules: &AchievementRules) -> Self {
        let avg = daily_average(totals);
        let top = |dimension: Dimension| {
            top_entry(totals.dimension(dimension))
                .map_or_else(|| NOT_AVAILABLE.to_string(), |(name, _)| name.to_string())
        };

        let breakdowns = Dimension::ALL
            .iter()
            .map(|&dimension| {
                let dim_totals = totals.dimension(dimension);
                Breakdown {
                    dimension,
                    label: dimension.label(),
                    item_count: dim_totals.len(),
                    entries: ranked_entries(dim_totals, totals.total_seconds, BREAKDOWN_LIMIT),
                }
            })
            .collect();

        Self {
            total_seconds: totals.total_seconds,
            total_text: format_duration(totals.total_seconds),
            day_count: totals.day_count(),
            daily_average_seconds: avg,
            daily_average_text: format_duration(avg.floor() as u64),
            productivity: ProductivityLevel::from_daily_average(avg),
            top_language: top(Dimension::Languages),
            top_editor: top(Dimension::Editors),
            top_operating_system: top(Dimension::OperatingSystems),
            top_category: top(Dimension::Categories),
            peak_day: peak_day(totals),
            trend: totals.daily_series.clone(),
            breakdowns,
            achievements: rules.evaluate(totals),
        }
    }
}
