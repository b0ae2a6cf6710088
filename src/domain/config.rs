//! Typed experiment configuration.
//!
//! Column layouts differ between experiment runs, so the file-column to channel
//! mapping is declared explicitly and validated once. All fields are required;
//! unknown or duplicated keys are rejected by the deserializer.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::types::{Channel, SampleWindow};
use crate::error::{AnalysisError, AnalysisResult};

/// File column index for each channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelMap {
    pub time: usize,
    pub signal_transmitted: usize,
    pub signal_reference: usize,
    pub control_transmitted: usize,
    pub control_reference: usize,
}

impl Default for ChannelMap {
    fn default() -> Self {
        Self {
            time: 0,
            signal_transmitted: 1,
            signal_reference: 2,
            control_transmitted: 3,
            control_reference: 4,
        }
    }
}

impl ChannelMap {
    pub fn index(&self, channel: Channel) -> usize {
        match channel {
            Channel::Time => self.time,
            Channel::SignalTransmitted => self.signal_transmitted,
            Channel::SignalReference => self.signal_reference,
            Channel::ControlTransmitted => self.control_transmitted,
            Channel::ControlReference => self.control_reference,
        }
    }

    /// Reject two channels sharing one column.
    pub fn validate(&self) -> AnalysisResult<()> {
        let mut seen = HashSet::new();
        for channel in Channel::ALL {
            let idx = self.index(channel);
            if !seen.insert(idx) {
                return Err(AnalysisError::Config(format!(
                    "column {idx} is mapped to more than one channel (again by {})",
                    channel.display_name()
                )));
            }
        }
        Ok(())
    }
}

/// Named trim offsets, in samples.
///
/// The pulse of interest lives between the trigger and the end of the ramp;
/// `reference_offset` and `signal_offset` skip the dead time after the trigger
/// on the reference and transmitted channels respectively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrimOffsets {
    pub trigger: usize,
    pub ramp: usize,
    pub reference_offset: usize,
    pub signal_offset: usize,
}

impl TrimOffsets {
    pub fn validate(&self) -> AnalysisResult<()> {
        if self.ramp <= self.trigger {
            return Err(AnalysisError::Config(format!(
                "ramp ({}) must come after trigger ({})",
                self.ramp, self.trigger
            )));
        }
        for offset in [self.reference_offset, self.signal_offset] {
            if self.start_after(offset)? >= self.ramp {
                return Err(AnalysisError::Config(
                    "dead-time offsets leave no samples before the ramp".into(),
                ));
            }
        }
        Ok(())
    }

    /// `trigger + offset`, or a config error when the sum overflows.
    fn start_after(&self, offset: usize) -> AnalysisResult<usize> {
        self.trigger.checked_add(offset).ok_or_else(|| {
            AnalysisError::Config(format!(
                "trigger ({}) plus offset ({offset}) overflows",
                self.trigger
            ))
        })
    }

    /// `[trigger, ramp)`
    pub fn raw_window(&self) -> AnalysisResult<SampleWindow> {
        SampleWindow::new(self.trigger, self.ramp)
    }

    /// `[trigger + reference_offset, ramp)`
    pub fn reference_window(&self) -> AnalysisResult<SampleWindow> {
        SampleWindow::new(self.start_after(self.reference_offset)?, self.ramp)
    }

    /// `[trigger + signal_offset, ramp)`
    pub fn signal_window(&self) -> AnalysisResult<SampleWindow> {
        SampleWindow::new(self.start_after(self.signal_offset)?, self.ramp)
    }
}

/// Which transmitted/reference pair a pulse-area ratio integrates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AreaChannels {
    Signal,
    Control,
}

impl AreaChannels {
    pub fn transmitted(self) -> Channel {
        match self {
            AreaChannels::Signal => Channel::SignalTransmitted,
            AreaChannels::Control => Channel::ControlTransmitted,
        }
    }

    pub fn reference(self) -> Channel {
        match self {
            AreaChannels::Signal => Channel::SignalReference,
            AreaChannels::Control => Channel::ControlReference,
        }
    }
}

/// Traces for one polarisation/state combination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StateSpec {
    /// Output key, e.g. `cph_sph`.
    pub key: String,
    /// Trace with both pulses present.
    pub signal: PathBuf,
    /// Trace measuring leakage with only the other pulse present.
    pub leakage: PathBuf,
    /// Trace used to normalise the corrected area into a ratio.
    pub reference: PathBuf,
}

/// Full configuration of a pulse-area analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExperimentConfig {
    pub channels: ChannelMap,
    pub area_channels: AreaChannels,
    /// Optional trim; when absent the full trace is integrated.
    #[serde(default)]
    pub trim: Option<TrimOffsets>,
    pub states: Vec<StateSpec>,
}

impl ExperimentConfig {
    pub fn from_json_str(text: &str) -> AnalysisResult<Self> {
        let config: ExperimentConfig = serde_json::from_str(text)
            .map_err(|e| AnalysisError::Config(format!("invalid experiment config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AnalysisResult<()> {
        self.channels.validate()?;
        if let Some(trim) = &self.trim {
            trim.validate()?;
        }
        if self.states.is_empty() {
            return Err(AnalysisError::Config("no states configured".into()));
        }
        let mut keys = HashSet::new();
        for state in &self.states {
            if state.key.trim().is_empty() {
                return Err(AnalysisError::Config("state key must not be empty".into()));
            }
            if !keys.insert(state.key.as_str()) {
                return Err(AnalysisError::Config(format!(
                    "duplicate state key '{}'",
                    state.key
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "channels": {
            "time": 0,
            "signal_transmitted": 4,
            "signal_reference": 3,
            "control_transmitted": 2,
            "control_reference": 1
        },
        "area_channels": "control",
        "trim": { "trigger": 100, "ramp": 400, "reference_offset": 10, "signal_offset": 20 },
        "states": [
            { "key": "cph_sph", "signal": "a.csv", "leakage": "b.csv", "reference": "c.csv" }
        ]
    }"#;

    #[test]
    fn parses_valid_config() {
        let config = ExperimentConfig::from_json_str(VALID).unwrap();
        assert_eq!(config.channels.index(Channel::SignalTransmitted), 4);
        assert_eq!(config.area_channels.reference(), Channel::ControlReference);
        let trim = config.trim.unwrap();
        assert_eq!(trim.signal_window().unwrap(), SampleWindow { start: 120, end: 400 });
        assert_eq!(trim.reference_window().unwrap(), SampleWindow { start: 110, end: 400 });
    }

    #[test]
    fn rejects_missing_channel() {
        let text = VALID.replace("\"control_reference\": 1", "\"extra\": 1");
        assert!(matches!(
            ExperimentConfig::from_json_str(&text),
            Err(AnalysisError::Config(_))
        ));
    }

    #[test]
    fn rejects_duplicate_key() {
        let text = VALID.replace("\"time\": 0,", "\"time\": 0, \"time\": 5,");
        assert!(matches!(
            ExperimentConfig::from_json_str(&text),
            Err(AnalysisError::Config(_))
        ));
    }

    #[test]
    fn rejects_shared_column() {
        let text = VALID.replace("\"control_reference\": 1", "\"control_reference\": 2");
        assert!(matches!(
            ExperimentConfig::from_json_str(&text),
            Err(AnalysisError::Config(_))
        ));
    }

    #[test]
    fn rejects_duplicate_state_keys() {
        let mut config = ExperimentConfig::from_json_str(VALID).unwrap();
        config.states.push(config.states[0].clone());
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_trim_ramp_before_trigger() {
        let trim = TrimOffsets {
            trigger: 10,
            ramp: 5,
            reference_offset: 0,
            signal_offset: 0,
        };
        assert!(trim.validate().is_err());
    }

    #[test]
    fn huge_offsets_are_a_config_error() {
        let trim = TrimOffsets {
            trigger: usize::MAX - 1,
            ramp: usize::MAX,
            reference_offset: 5,
            signal_offset: 0,
        };
        assert!(matches!(trim.validate(), Err(AnalysisError::Config(_))));
        assert!(matches!(trim.reference_window(), Err(AnalysisError::Config(_))));
        assert_eq!(
            trim.signal_window().unwrap(),
            SampleWindow { start: usize::MAX - 1, end: usize::MAX }
        );
    }
}
