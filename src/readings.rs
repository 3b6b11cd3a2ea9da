use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::period::Window;

/// A meter is considered online while its newest reading is this fresh.
pub const ONLINE_THRESHOLD_SECS: i64 = 120;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub pt: f64,
    #[serde(default)]
    pub ept_c: f64,
    #[serde(default, alias = "va")]
    pub uarms: f64,
    #[serde(default, alias = "vb")]
    pub ubrms: f64,
    #[serde(default, alias = "vc")]
    pub ucrms: f64,
    #[serde(default)]
    pub pft: f64,
    #[serde(default, alias = "ia")]
    pub iarms: f64,
    #[serde(default, alias = "ib")]
    pub ibrms: f64,
    #[serde(default, alias = "ic")]
    pub icrms: f64,
    #[serde(default)]
    pub qt: f64,
}

impl Reading {
    pub fn average_voltage(&self) -> f64 {
        (self.uarms + self.ubrms + self.ucrms) / 3.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PowerPoint {
    pub time: String,
    pub pt: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoltagePoint {
    pub time: String,
    pub vavg: f64,
    pub pft: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentPoint {
    pub time: String,
    pub ia: f64,
    pub ib: f64,
    pub ic: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReactivePoint {
    pub time: String,
    pub qt: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartSeries {
    pub power: Vec<PowerPoint>,
    pub voltage_pf: Vec<VoltagePoint>,
    pub currents: Vec<CurrentPoint>,
    pub reactive: Vec<ReactivePoint>,
}

/// Sorts by timestamp and, unless a custom period already bounded the
/// query, keeps only readings inside the rolling window.
pub fn select_readings(
    mut readings: Vec<Reading>,
    window: Option<Window>,
    now: DateTime<Utc>,
) -> Vec<Reading> {
    readings.sort_by_key(|reading| reading.timestamp);
    if let Some(window) = window {
        let cutoff = window.cutoff(now);
        readings.retain(|reading| reading.timestamp >= cutoff);
    }
    readings
}

pub fn build_series<Tz: TimeZone>(readings: &[Reading], tz: &Tz) -> ChartSeries
where
    Tz::Offset: std::fmt::Display,
{
    let mut series = ChartSeries::default();
    for reading in readings {
        let time = reading.timestamp.with_timezone(tz).format("%H:%M").to_string();
        series.power.push(PowerPoint {
            time: time.clone(),
            pt: reading.pt,
        });
        series.voltage_pf.push(VoltagePoint {
            time: time.clone(),
            vavg: reading.average_voltage(),
            pft: reading.pft,
        });
        series.currents.push(CurrentPoint {
            time: time.clone(),
            ia: reading.iarms,
            ib: reading.ibrms,
            ic: reading.icrms,
        });
        series.reactive.push(ReactivePoint { time, qt: reading.qt });
    }
    series
}

/// Energy used across sorted readings, from the cumulative `ept_c` counter.
/// Counter resets never produce negative consumption.
pub fn consumption_kwh(readings: &[Reading]) -> f64 {
    match (readings.first(), readings.last()) {
        (Some(first), Some(last)) if readings.len() >= 2 => (last.ept_c - first.ept_c).max(0.0),
        _ => 0.0,
    }
}

pub fn is_online(latest: Option<&Reading>, now: DateTime<Utc>) -> bool {
    latest.is_some_and(|reading| now - reading.timestamp <= Duration::seconds(ONLINE_THRESHOLD_SECS))
}
