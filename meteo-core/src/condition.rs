use serde::{Deserialize, Serialize};

/// Weather condition categories for WMO weather interpretation codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Clear,
    MainlyClear,
    PartlyCloudy,
    Overcast,
    Fog,
    Drizzle,
    FreezingDrizzle,
    Rain,
    FreezingRain,
    Snow,
    RainShowers,
    SnowShowers,
    Thunderstorm,
    Unknown,
}

impl Condition {
    /// See: https://open-meteo.com/en/docs#weathervariables
    pub fn from_wmo_code(code: i32) -> Self {
        match code {
            0 => Self::Clear,
            1 => Self::MainlyClear,
            2 => Self::PartlyCloudy,
            3 => Self::Overcast,
            45 | 48 => Self::Fog,
            51 | 53 | 55 => Self::Drizzle,
            56 | 57 => Self::FreezingDrizzle,
            61 | 63 | 65 => Self::Rain,
            66 | 67 => Self::FreezingRain,
            71 | 73 | 75 | 77 => Self::Snow,
            80..=82 => Self::RainShowers,
            85 | 86 => Self::SnowShowers,
            95 | 96 | 99 => Self::Thunderstorm,
            _ => Self::Unknown,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Clear => "Clear sky",
            Self::MainlyClear => "Mainly clear",
            Self::PartlyCloudy => "Partly cloudy",
            Self::Overcast => "Overcast",
            Self::Fog => "Fog",
            Self::Drizzle => "Drizzle",
            Self::FreezingDrizzle => "Freezing drizzle",
            Self::Rain => "Rain",
            Self::FreezingRain => "Freezing rain",
            Self::Snow => "Snow",
            Self::RainShowers => "Rain showers",
            Self::SnowShowers => "Snow showers",
            Self::Thunderstorm => "Thunderstorm",
            Self::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wmo_code_sky_cover() {
        assert_eq!(Condition::from_wmo_code(0), Condition::Clear);
        assert_eq!(Condition::from_wmo_code(1), Condition::MainlyClear);
        assert_eq!(Condition::from_wmo_code(2), Condition::PartlyCloudy);
        assert_eq!(Condition::from_wmo_code(3), Condition::Overcast);
    }

    #[test]
    fn test_wmo_code_precipitation() {
        assert_eq!(Condition::from_wmo_code(57), Condition::FreezingDrizzle);
        assert_eq!(Condition::from_wmo_code(65), Condition::Rain);
        assert_eq!(Condition::from_wmo_code(81), Condition::RainShowers);
        assert_eq!(Condition::from_wmo_code(86), Condition::SnowShowers);
        assert_eq!(Condition::from_wmo_code(99), Condition::Thunderstorm);
    }

    #[test]
    fn test_wmo_code_unknown() {
        assert_eq!(Condition::from_wmo_code(4), Condition::Unknown);
        assert_eq!(Condition::from_wmo_code(-1).to_string(), "Unknown");
    }
}
