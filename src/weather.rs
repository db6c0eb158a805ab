//! Current-weather lookups for risk scoring.
//!
//! Zone risk needs the weather at the zone centroid. [`OpenWeatherClient`]
//! asks the OpenWeather current-conditions endpoint; [`WeatherCache`]
//! wraps any provider so nearby zones share one lookup per run.
//! Lookups are best effort: any failure degrades to `None` and the
//! zone is scored as unknown.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::errors::FiresiftError;
use crate::risk::WeatherObservation;

/// Per-lookup request timeout in seconds.
const WEATHER_TIMEOUT_SECS: u64 = 5;

/// OpenWeather base URL.
const OPENWEATHER_BASE_URL: &str = "https://api.openweathermap.org";

/// Source of current weather for a coordinate.
pub trait WeatherProvider {
    /// Current conditions at a point, or `None` when the lookup fails.
    fn observe(&mut self, lat: f64, lon: f64) -> Option<WeatherObservation>;
}

/// Client for the OpenWeather current-conditions API.
pub struct OpenWeatherClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OpenWeatherClient {
    /// Create a new OpenWeather client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(api_key: impl Into<String>) -> Result<Self, FiresiftError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(WEATHER_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: OPENWEATHER_BASE_URL.to_string(),
            api_key: api_key.into(),
        })
    }

    fn fetch(&self, lat: f64, lon: f64) -> Result<WeatherObservation, FiresiftError> {
        let url = format!("{}/data/2.5/weather", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("units", "metric".to_string()),
                ("lang", "fr".to_string()),
                ("appid", self.api_key.clone()),
            ])
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(FiresiftError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        observation_from(response.json()?)
    }
}

impl WeatherProvider for OpenWeatherClient {
    fn observe(&mut self, lat: f64, lon: f64) -> Option<WeatherObservation> {
        match self.fetch(lat, lon) {
            Ok(obs) => {
                debug!(lat, lon, temp_c = obs.temp_c, "weather observed");
                Some(obs)
            }
            Err(e) => {
                warn!(lat, lon, error = %e, "weather lookup failed");
                None
            }
        }
    }
}

/// Cache over a provider, keyed by coordinates rounded to two decimals.
///
/// Failed lookups are memoized too, so a bad key costs one call per
/// grid cell rather than one per zone.
pub struct WeatherCache<P> {
    provider: P,
    entries: HashMap<(i64, i64), Option<WeatherObservation>>,
}

impl<P: WeatherProvider> WeatherCache<P> {
    #[must_use]
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            entries: HashMap::new(),
        }
    }
}

impl<P: WeatherProvider> WeatherProvider for WeatherCache<P> {
    fn observe(&mut self, lat: f64, lon: f64) -> Option<WeatherObservation> {
        let key = (round_centi(lat), round_centi(lon));
        if let Some(cached) = self.entries.get(&key) {
            return cached.clone();
        }

        let fresh = self.provider.observe(lat, lon);
        self.entries.insert(key, fresh.clone());
        fresh
    }
}

#[allow(clippy::cast_possible_truncation)] // coordinates are validated in range
fn round_centi(deg: f64) -> i64 {
    (deg * 100.0).round() as i64
}

#[derive(Debug, Deserialize)]
struct WeatherResponse {
    main: MainBlock,
    wind: WindBlock,
    weather: Vec<ConditionBlock>,
}

#[derive(Debug, Deserialize)]
struct MainBlock {
    temp: f64,
    humidity: f64,
    pressure: f64,
}

#[derive(Debug, Deserialize)]
struct WindBlock {
    speed: f64,
    #[serde(default)]
    deg: f64,
}

#[derive(Debug, Deserialize)]
struct ConditionBlock {
    description: String,
    icon: String,
}

fn observation_from(body: WeatherResponse) -> Result<WeatherObservation, FiresiftError> {
    let condition = body.weather.first().ok_or_else(|| {
        FiresiftError::InvalidResponse("weather response has no condition block".into())
    })?;

    Ok(WeatherObservation {
        temp_c: body.main.temp,
        humidity_pct: body.main.humidity,
        wind_speed_ms: body.wind.speed,
        wind_deg: body.wind.deg,
        pressure_hpa: body.main.pressure,
        description: capitalize(&condition.description),
        icon: condition.icon.clone(),
    })
}

/// Uppercase the first character, as the provider sends descriptions
/// entirely lowercased.
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
