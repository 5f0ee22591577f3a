use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// One snapshot from the Awair Local API (`GET /air-data/latest`).
///
/// Every field is optional on the wire. Missing or `null` fields read as
/// zero; unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Reading {
    #[serde(deserialize_with = "null_as_default")]
    pub timestamp: Option<DateTime<Utc>>,

    /// Awair Score (0-100).
    #[serde(deserialize_with = "null_as_default")]
    pub score: i64,
    /// Dew point (ºC).
    #[serde(deserialize_with = "null_as_default")]
    pub dew_point: f64,
    /// Dry bulb temperature (ºC).
    #[serde(deserialize_with = "null_as_default")]
    pub temp: f64,
    /// Relative humidity (%).
    #[serde(deserialize_with = "null_as_default")]
    pub humid: f64,
    /// Absolute humidity (g/m³).
    #[serde(deserialize_with = "null_as_default")]
    pub abs_humid: f64,
    /// Carbon dioxide (ppm).
    #[serde(deserialize_with = "null_as_default")]
    pub co2: i64,
    /// Estimated CO₂ from the TVOC sensor (ppm).
    #[serde(deserialize_with = "null_as_default")]
    pub co2_est: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub co2_est_baseline: i64,
    /// Total VOC (ppb).
    #[serde(deserialize_with = "null_as_default")]
    pub voc: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub voc_baseline: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub voc_h2_raw: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub voc_ethanol_raw: i64,
    /// PM2.5 (µg/m³).
    #[serde(deserialize_with = "null_as_default")]
    pub pm25: i64,
    /// Estimated PM10 from the PM2.5 sensor (µg/m³).
    #[serde(deserialize_with = "null_as_default")]
    pub pm10_est: i64,
}

impl Reading {
    /// Decode a device response body.
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
