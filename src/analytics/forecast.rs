//! Velocity trend and capacity forecasting.
//!
//! The forecast is a deterministic projection from completed work:
//!
//! 1. Build a trend of completed hours per sprint, skipping sprints with no
//!    completed work.
//! 2. Drop the current (last) sprint; it is still in progress.
//! 3. Average the remaining history and take a trailing moving average.
//! 4. Estimate capacity as 110% of the best historical sprint unless given.
//! 5. Nudge the moving average by historical utilization and cap every
//!    projection at 95% of capacity.

use crate::models::Category;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Default moving-average window, in sprints.
pub const DEFAULT_WINDOW: usize = 4;

/// Capacity assumed when there is no history to estimate from.
pub const DEFAULT_CAPACITY_HOURS: f64 = 80.0;

/// Headroom applied to the best historical sprint when estimating capacity.
pub const CAPACITY_HEADROOM: f64 = 1.1;

/// Forecasts never exceed this share of capacity.
pub const FORECAST_CAP_RATIO: f64 = 0.95;

/// Growth applied to sprints further ahead.
pub const GROWTH_FACTOR: f64 = 1.05;

/// Category mix used when history carries no category hours.
pub const DEFAULT_CATEGORY_MIX: [(Category, f64); 4] = [
    (Category::Billable, 0.6),
    (Category::Product, 0.2),
    (Category::Internal, 0.15),
    (Category::Other, 0.05),
];

pub const NEXT_SPRINT_PLACEHOLDER: &str = "Future Sprint 1";
pub const NEXT_NEXT_SPRINT_PLACEHOLDER: &str = "Future Sprint 2";

/// Completed and per-category hours of one sprint with any issues.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendPoint {
    pub sprint_name: String,
    pub completed_hours: f64,
    /// Total estimated hours per category, in [`Category::ALL`] order
    pub category_hours: [f64; 4],
}

/// Velocity across sprints, in chronological order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VelocityTrend {
    /// Sprints with completed work
    pub sprint_names: Vec<String>,
    /// Completed hours, parallel to `sprint_names`
    pub velocities: Vec<f64>,
    /// Hours per category for every sprint that has issues
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<BTreeMap<Category, Vec<f64>>>,
}

impl VelocityTrend {
    pub fn from_points(points: &[TrendPoint]) -> Self {
        let completed: Vec<&TrendPoint> =
            points.iter().filter(|p| p.completed_hours > 0.0).collect();

        let categories = (!points.is_empty()).then(|| {
            Category::ALL
                .iter()
                .enumerate()
                .map(|(idx, category)| {
                    let series: Vec<f64> = points.iter().map(|p| p.category_hours[idx]).collect();
                    (*category, series)
                })
                .collect()
        });

        Self {
            sprint_names: completed.iter().map(|p| p.sprint_name.clone()).collect(),
            velocities: completed.iter().map(|p| p.completed_hours).collect(),
            categories,
        }
    }
}

/// Forecast inputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastParams {
    /// Moving-average window (values below 1 are treated as 1)
    pub window: usize,
    /// Team capacity in hours; estimated from history when `None`
    pub team_capacity: Option<f64>,
    /// Sprint treated as "this sprint" (negative counts from the end)
    pub sprint_index: isize,
}

impl Default for ForecastParams {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            team_capacity: None,
            sprint_index: -1,
        }
    }
}

/// Historical series behind a forecast.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Historical {
    pub avg_velocity: f64,
    /// Completed-sprint velocities (current sprint excluded)
    pub velocities: Vec<f64>,
    pub sprint_count: usize,
    /// Trailing moving average, `None` for the first `window - 1` positions
    pub moving_avgs: Vec<Option<f64>>,
    pub latest_moving_avg: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_quality_warning: Option<String>,
}

/// Projection for one sprint ahead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SprintForecast {
    pub sprint_name: String,
    pub forecast_hours: f64,
    /// Hours already scheduled into the sprint
    pub allocated_hours: f64,
    /// Forecast minus allocated, floored at zero
    pub unallocated_hours: f64,
    pub category_breakdown: BTreeMap<Category, f64>,
    /// Number of completed sprints the forecast is based on
    pub based_on_sprints: usize,
    pub team_capacity: f64,
    /// Average velocity as a percentage of capacity
    pub historical_utilization: f64,
    /// Unallocated hours as a percentage of capacity
    pub remaining_percentage: f64,
}

/// Forecast for the current sprint and the two after it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityForecast {
    pub current_sprint: SprintForecast,
    pub next_sprint: SprintForecast,
    pub next_next_sprint: SprintForecast,
    pub historical: Historical,
}

/// Everything derived from history, before sprint allocation is known.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastBasis {
    pub historical: Historical,
    pub team_capacity: f64,
    /// Average velocity over capacity, as a fraction
    pub utilization: f64,
    pub category_mix: BTreeMap<Category, f64>,
    pub adjustment_factor: f64,
    /// Hours for this sprint, next sprint, and the one after
    pub projections: [f64; 3],
}

impl ForecastBasis {
    /// Compute the basis from trend points.
    ///
    /// `current_sprint` names the in-progress sprint whose point, if any, is
    /// left out of every historical figure.
    pub fn from_points(
        points: &[TrendPoint],
        current_sprint: Option<&str>,
        window: usize,
        team_capacity: Option<f64>,
    ) -> Self {
        let window = window.max(1);
        let history: Vec<&TrendPoint> = points
            .iter()
            .filter(|p| Some(p.sprint_name.as_str()) != current_sprint)
            .collect();
        let velocities: Vec<f64> = history
            .iter()
            .map(|p| p.completed_hours)
            .filter(|&v| v > 0.0)
            .collect();

        let historical = historical_series(&velocities, window);

        let team_capacity = team_capacity
            .filter(|c| *c > 0.0)
            .unwrap_or_else(|| estimate_capacity(&velocities));
        let utilization = if team_capacity > 0.0 {
            historical.avg_velocity / team_capacity
        } else {
            0.0
        };

        let category_mix = category_mix(&history);
        let adjustment_factor = adjustment_factor(utilization);

        let cap = team_capacity * FORECAST_CAP_RATIO;
        let this_sprint = (historical.latest_moving_avg * adjustment_factor).min(cap);
        let growth = if utilization > 0.8 { GROWTH_FACTOR } else { 1.0 };
        let next_sprint = (this_sprint * growth).min(cap);
        let next_next_sprint = (next_sprint * GROWTH_FACTOR).min(cap);

        debug!(
            history = velocities.len(),
            team_capacity, utilization, adjustment_factor, this_sprint, "forecast basis"
        );

        Self {
            historical,
            team_capacity,
            utilization,
            category_mix,
            adjustment_factor,
            projections: [this_sprint, next_sprint, next_next_sprint],
        }
    }

    /// Build the forecast for the sprint `ahead` positions after this one (0..=2).
    pub fn sprint_forecast(&self, ahead: usize, name: &str, allocated: f64) -> SprintForecast {
        let forecast = self.projections[ahead];
        let this_sprint = self.projections[0];
        let ratio = if this_sprint > 0.0 {
            forecast / this_sprint
        } else {
            1.0
        };
        let unallocated = (forecast - allocated).max(0.0);

        SprintForecast {
            sprint_name: name.to_string(),
            forecast_hours: forecast,
            allocated_hours: allocated,
            unallocated_hours: unallocated,
            category_breakdown: self
                .category_mix
                .iter()
                .map(|(category, share)| (*category, this_sprint * share * ratio))
                .collect(),
            based_on_sprints: self.historical.sprint_count,
            team_capacity: self.team_capacity,
            historical_utilization: self.utilization * 100.0,
            remaining_percentage: super::percentage(unallocated, self.team_capacity),
        }
    }
}

/// Average, moving averages, and warnings over a velocity series.
pub fn historical_series(velocities: &[f64], window: usize) -> Historical {
    let window = window.max(1);
    let count = velocities.len();
    if count == 0 {
        return Historical {
            data_quality_warning: Some(
                "No historical sprint data available for forecasting.".to_string(),
            ),
            ..Historical::default()
        };
    }

    let avg_velocity = mean(velocities);
    let (moving_avgs, latest_moving_avg, warning) = if count >= window {
        let series = moving_average(velocities, window);
        let latest = mean(&velocities[count - window..]);
        (series, latest, None)
    } else {
        let warning = format!(
            "Only {} completed sprints available, but {} needed for ideal moving average calculation.",
            count, window
        );
        (Vec::new(), avg_velocity, Some(warning))
    };

    Historical {
        avg_velocity,
        velocities: velocities.to_vec(),
        sprint_count: count,
        moving_avgs,
        latest_moving_avg,
        data_quality_warning: warning,
    }
}

/// Trailing moving average aligned to the input.
///
/// The first `window - 1` positions are `None`; position `i` after that
/// holds the mean of `values[i + 1 - window..=i]`.
pub fn moving_average(values: &[f64], window: usize) -> Vec<Option<f64>> {
    let window = window.max(1);
    (0..values.len())
        .map(|i| {
            if i + 1 < window {
                None
            } else {
                Some(mean(&values[i + 1 - window..=i]))
            }
        })
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Capacity estimate: best historical sprint plus headroom, or the default.
pub fn estimate_capacity(velocities: &[f64]) -> f64 {
    velocities
        .iter()
        .copied()
        .reduce(f64::max)
        .map(|best| best * CAPACITY_HEADROOM)
        .unwrap_or(DEFAULT_CAPACITY_HOURS)
}

/// Multiplier applied to the moving average given historical utilization.
pub fn adjustment_factor(utilization: f64) -> f64 {
    if utilization > 0.9 {
        0.95
    } else if utilization < 0.7 {
        1.1
    } else {
        1.0
    }
}

/// Share of historical hours per category; the default mix when there are none.
pub fn category_mix(history: &[&TrendPoint]) -> BTreeMap<Category, f64> {
    let mut sums = [0.0f64; 4];
    for point in history {
        for (sum, hours) in sums.iter_mut().zip(point.category_hours) {
            *sum += hours;
        }
    }
    let total: f64 = sums.iter().sum();
    if total <= 0.0 {
        return DEFAULT_CATEGORY_MIX.into_iter().collect();
    }
    Category::ALL
        .into_iter()
        .zip(sums)
        .map(|(category, sum)| (category, sum / total))
        .collect()
}
