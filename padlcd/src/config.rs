use dotenv::var;
use padlcd_gpio::keypad::{Case, DEFAULT_REPEAT_TIMEOUT_TICKS};
use padlcd_gpio::lcd::hd44780::driver::{Font, Lines, SettleStrategy};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::PathBuf;
use thiserror::Error;

const DEFAULT_CONFIG_FILE: &str = "config.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("config format: {0}")]
    Json(#[from] serde_json::Error),
    #[error("display can have 1 or 2 lines, not {0}")]
    InvalidLines(u8),
    #[error("display can show 1 to 40 columns, not {0}")]
    InvalidColumns(u8),
}

/// How key presses are turned into characters.
#[derive(Serialize, Deserialize, Copy, Clone, Debug, Default, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    /// Each key types its digit.
    Numeric,
    /// Repeated taps cycle through the letters printed on the key.
    #[default]
    Alphanumeric,
}

#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
#[serde(default)]
pub struct Config {
    pub input_mode: InputMode,
    /// Whether multi-tap letters come out lowercase.
    pub lowercase: bool,
    /// Number of display lines, 1 or 2.
    pub lines: u8,
    /// Visible columns per line. Typing past the last one moves on to the next line.
    pub columns: u8,
    /// Use the 5x10 font. Only honoured on one-line displays.
    pub large_font: bool,
    /// Poll the busy flag instead of waiting fixed delays.
    pub busy_flag: bool,
    /// Shown until the first key press. A `\n` starts the second line.
    pub greeting: String,
    /// Ticks after which a repeated tap starts a new character. `null` never times out.
    pub repeat_timeout_ticks: Option<u32>,
}

impl Config {
    fn path() -> PathBuf {
        var("CONFIG_FILE")
            .unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string())
            .into()
    }

    /// Loads the config file, or returns `None` if there isn't one.
    pub fn try_load() -> Result<Option<Self>, ConfigError> {
        let file = match std::fs::File::open(Self::path()) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let reader = std::io::BufReader::new(file);
        let config: Config = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(Some(config))
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let file = std::fs::File::create(Self::path())?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.display_lines()?;
        if !(1..=40).contains(&self.columns) {
            return Err(ConfigError::InvalidColumns(self.columns));
        }
        Ok(())
    }

    pub fn display_lines(&self) -> Result<Lines, ConfigError> {
        match self.lines {
            1 => Ok(Lines::One),
            2 => Ok(Lines::Two),
            n => Err(ConfigError::InvalidLines(n)),
        }
    }

    pub fn font(&self) -> Font {
        if self.large_font {
            Font::Large
        } else {
            Font::Small
        }
    }

    pub fn case(&self) -> Case {
        if self.lowercase {
            Case::Lower
        } else {
            Case::Upper
        }
    }

    pub fn settle(&self) -> SettleStrategy {
        if self.busy_flag {
            SettleStrategy::busy_flag()
        } else {
            SettleStrategy::fixed_delay()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            input_mode: InputMode::default(),
            lowercase: false,
            lines: 2,
            columns: 16,
            large_font: false,
            busy_flag: false,
            greeting: "Hello!".to_string(),
            repeat_timeout_ticks: Some(DEFAULT_REPEAT_TIMEOUT_TICKS),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: Config =
            serde_json::from_str(r#"{ "input_mode": "numeric", "lines": 1 }"#).unwrap();

        assert_eq!(config.input_mode, InputMode::Numeric);
        assert_eq!(config.display_lines().unwrap(), Lines::One);
        assert_eq!(config.columns, 16);
        assert_eq!(config.repeat_timeout_ticks, Some(DEFAULT_REPEAT_TIMEOUT_TICKS));
    }

    #[test]
    fn repeat_timeout_can_be_disabled() {
        let config: Config = serde_json::from_str(r#"{ "repeat_timeout_ticks": null }"#).unwrap();
        assert_eq!(config.repeat_timeout_ticks, None);
    }

    #[test]
    fn out_of_range_geometry_is_rejected() {
        let config = Config {
            lines: 3,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidLines(3))));

        let config = Config {
            columns: 0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidColumns(0))));
    }

    #[test]
    fn flags_map_onto_driver_settings() {
        let config = Config {
            lowercase: true,
            large_font: true,
            busy_flag: true,
            ..Config::default()
        };
        assert_eq!(config.case(), Case::Lower);
        assert_eq!(config.font(), Font::Large);
        assert_eq!(config.settle(), SettleStrategy::busy_flag());
    }
}
