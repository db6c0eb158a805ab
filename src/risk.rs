//! Fire risk scoring.
//!
//! Combines current weather with fire intensity into an additive score.
//! Hot, dry, windy conditions dominate; brightness and confidence add a
//! smaller fire-specific contribution.

use serde::Serialize;

/// Score reported when no weather observation is available.
pub const UNKNOWN_RISK_SCORE: u32 = 50;

/// Current weather at a fire location.
#[derive(Debug, Clone, Serialize)]
pub struct WeatherObservation {
    /// Air temperature in Celsius.
    pub temp_c: f64,
    /// Relative humidity in percent.
    pub humidity_pct: f64,
    /// Wind speed in m/s.
    pub wind_speed_ms: f64,
    /// Wind direction in degrees.
    pub wind_deg: f64,
    /// Pressure in hPa.
    pub pressure_hpa: f64,
    /// Localized condition text.
    pub description: String,
    /// Provider icon code.
    pub icon: String,
}

/// Risk severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskLevel {
    #[serde(rename = "low")]
    Low,
    #[serde(rename = "moderate")]
    Moderate,
    #[serde(rename = "high")]
    High,
    #[serde(rename = "very high")]
    VeryHigh,
    #[serde(rename = "critical")]
    Critical,
    /// No weather observation was available.
    #[serde(rename = "unknown")]
    Unknown,
}

impl RiskLevel {
    /// Map a 0-100 score to its level; ties go to the higher band.
    #[must_use]
    pub fn from_score(score: u32) -> Self {
        match score {
            s if s >= 80 => Self::Critical,
            s if s >= 60 => Self::VeryHigh,
            s if s >= 40 => Self::High,
            s if s >= 20 => Self::Moderate,
            _ => Self::Low,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Moderate => "moderate",
            Self::High => "high",
            Self::VeryHigh => "very high",
            Self::Critical => "critical",
            Self::Unknown => "unknown",
        }
    }

    /// Dashboard color tag for the level.
    #[must_use]
    pub fn color(self) -> &'static str {
        match self {
            Self::Low => "#66BB6A",
            Self::Moderate => "#FFCA28",
            Self::High => "#FFA726",
            Self::VeryHigh => "#F57C00",
            Self::Critical => "#D32F2F",
            Self::Unknown => "#9E9E9E",
        }
    }
}

/// A scored risk assessment.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RiskAssessment {
    pub score: u32,
    pub level: RiskLevel,
    pub color: &'static str,
}

/// Score fire risk from weather plus fire intensity.
///
/// Factors are additive and the total is clamped to 100. NaN brightness
/// or confidence simply contributes nothing. Missing weather yields the
/// `Unknown` level with a neutral placeholder score.
#[must_use]
pub fn assess(
    weather: Option<&WeatherObservation>,
    brightness: f64,
    confidence: f64,
) -> RiskAssessment {
    let Some(weather) = weather else {
        return RiskAssessment {
            score: UNKNOWN_RISK_SCORE,
            level: RiskLevel::Unknown,
            color: RiskLevel::Unknown.color(),
        };
    };

    let mut score = 0u32;

    // Temperature factor
    if weather.temp_c > 40.0 {
        score += 35;
    } else if weather.temp_c > 35.0 {
        score += 25;
    } else if weather.temp_c > 30.0 {
        score += 15;
    }

    // Humidity factor (inverse)
    if weather.humidity_pct < 20.0 {
        score += 30;
    } else if weather.humidity_pct < 30.0 {
        score += 20;
    } else if weather.humidity_pct < 40.0 {
        score += 10;
    }

    // Wind factor
    if weather.wind_speed_ms > 15.0 {
        score += 25;
    } else if weather.wind_speed_ms > 10.0 {
        score += 15;
    } else if weather.wind_speed_ms > 5.0 {
        score += 8;
    }

    // Fire intensity factor
    if brightness > 400.0 {
        score += 10;
    } else if brightness > 380.0 {
        score += 7;
    }

    if confidence > 90.0 {
        score += 5;
    } else if confidence > 80.0 {
        score += 3;
    }

    let score = score.min(100);
    let level = RiskLevel::from_score(score);
    RiskAssessment {
        score,
        level,
        color: level.color(),
    }
}
