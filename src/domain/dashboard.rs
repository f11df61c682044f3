use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const THOUSAND: f64 = 1_000.0;
const MILLION: f64 = 1_000_000.0;
const CURRENCY_SUFFIX: &str = "zł";

#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    pub total_stations: u64,
    pub active_stations: u64,
    pub total_users: u64,
    pub active_sessions: u64,
    pub daily_revenue: f64,
    /// Aggregate output in watts.
    pub power_output: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub station_availability: i64,
    pub average_power_per_station: i64,
    pub revenue_per_session: i64,
    pub utilization_rate: i64,
}

pub fn calculate_dashboard_stats(metrics: &DashboardMetrics) -> DashboardStats {
    DashboardStats {
        station_availability: rounded_ratio(
            metrics.active_stations as f64,
            metrics.total_stations as f64,
            100.0,
        ),
        average_power_per_station: rounded_ratio(
            metrics.power_output,
            metrics.active_stations as f64,
            1.0,
        ),
        revenue_per_session: rounded_ratio(
            metrics.daily_revenue,
            metrics.active_sessions as f64,
            1.0,
        ),
        utilization_rate: rounded_ratio(
            metrics.active_sessions as f64,
            metrics.active_stations as f64,
            100.0,
        ),
    }
}

fn rounded_ratio(numerator: f64, denominator: f64, scale: f64) -> i64 {
    if denominator == 0.0 {
        return 0;
    }

    (numerator / denominator * scale).round() as i64
}

pub fn format_revenue(amount: f64) -> String {
    if amount >= MILLION {
        format!("{:.1}M {CURRENCY_SUFFIX}", amount / MILLION)
    } else if amount >= THOUSAND {
        format!("{:.1}K {CURRENCY_SUFFIX}", amount / THOUSAND)
    } else {
        format!("{amount} {CURRENCY_SUFFIX}")
    }
}

pub fn format_power_output(watts: f64) -> String {
    if watts >= MILLION {
        format!("{:.1} MW", watts / MILLION)
    } else if watts >= THOUSAND {
        format!("{:.1} kW", watts / THOUSAND)
    } else {
        format!("{watts} W")
    }
}

/// Largest whole unit of elapsed time. Timestamps in the future read as `0s ago`.
pub fn format_time_ago(date: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - date).num_seconds().max(0);

    match seconds {
        0..60 => format!("{seconds}s ago"),
        60..3_600 => format!("{}m ago", seconds / 60),
        3_600..86_400 => format!("{}h ago", seconds / 3_600),
        _ => format!("{}d ago", seconds / 86_400),
    }
}
