//! Recording and GNSS configuration entities.
//!
//! Both are validated value types with symmetric encode/decode into their
//! wire payload layout. No authoritative copy lives in this crate: a config
//! is read from the device, mutated by the caller and written back.

use super::wire;
use crate::error::{Error, Result};
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Wire size of a recording configuration payload
pub const RECORDING_CONFIG_LEN: usize = 12;
/// Wire size of a GNSS configuration payload
pub const GNSS_CONFIG_LEN: usize = 3;

/// Highest accepted horizontal accuracy requirement, meters.
/// The receiver cannot honor a looser mask, so larger values are a caller
/// mistake rather than a firmware option.
pub const MAX_HORIZONTAL_ACCURACY_M: u8 = 100;

/// Telemetry sampling rate. Wire codes follow firmware order, with 20 Hz
/// appended after the original four rates.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive, Default)]
pub enum DataRate {
    #[default]
    Hz25 = 0,
    Hz10 = 1,
    Hz5 = 2,
    Hz1 = 3,
    Hz20 = 4,
}

impl DataRate {
    /// Sampling rate in hertz
    pub fn hertz(self) -> u8 {
        match self {
            DataRate::Hz25 => 25,
            DataRate::Hz20 => 20,
            DataRate::Hz10 => 10,
            DataRate::Hz5 => 5,
            DataRate::Hz1 => 1,
        }
    }
}

/// Recording behavior flags, byte 2 of the configuration payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecordingFlags {
    /// Hold off recording until the receiver has a fix
    pub wait_for_fix: bool,
    /// Suppress samples while stationary
    pub stationary_filter: bool,
    /// Suppress samples while without a fix
    pub no_fix_filter: bool,
    /// Power down after the shutdown interval elapses
    pub auto_shutdown: bool,
    /// Delay auto-shutdown until data has been recorded
    pub wait_for_data_before_shutdown: bool,
}

impl RecordingFlags {
    const WAIT_FOR_FIX: u8 = 1 << 0;
    const STATIONARY_FILTER: u8 = 1 << 1;
    const NO_FIX_FILTER: u8 = 1 << 2;
    const AUTO_SHUTDOWN: u8 = 1 << 3;
    const WAIT_FOR_DATA: u8 = 1 << 4;

    pub fn bits(self) -> u8 {
        let mut bits = 0;
        if self.wait_for_fix {
            bits |= Self::WAIT_FOR_FIX;
        }
        if self.stationary_filter {
            bits |= Self::STATIONARY_FILTER;
        }
        if self.no_fix_filter {
            bits |= Self::NO_FIX_FILTER;
        }
        if self.auto_shutdown {
            bits |= Self::AUTO_SHUTDOWN;
        }
        if self.wait_for_data_before_shutdown {
            bits |= Self::WAIT_FOR_DATA;
        }
        bits
    }

    /// Undefined high bits are ignored so newer firmware stays decodable.
    pub fn from_bits(bits: u8) -> Self {
        Self {
            wait_for_fix: bits & Self::WAIT_FOR_FIX != 0,
            stationary_filter: bits & Self::STATIONARY_FILTER != 0,
            no_fix_filter: bits & Self::NO_FIX_FILTER != 0,
            auto_shutdown: bits & Self::AUTO_SHUTDOWN != 0,
            wait_for_data_before_shutdown: bits & Self::WAIT_FOR_DATA != 0,
        }
    }
}

/// Standalone recording configuration, 12-byte wire layout.
///
/// ```text
/// [enabled][rate][flags][reserved][stationary mm/s u16][stationary s u16]
/// [no-fix s u16][shutdown s u16]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecordingConfig {
    pub enabled: bool,
    pub data_rate: DataRate,
    pub flags: RecordingFlags,
    /// Speed below which the device counts as stationary, mm/s
    pub stationary_speed_threshold: u16,
    /// Seconds below the speed threshold before filtering kicks in
    pub stationary_detection_interval: u16,
    /// Seconds without a fix before filtering kicks in
    pub no_fix_detection_interval: u16,
    /// Seconds of inactivity before automatic shutdown
    pub auto_shutdown_interval: u16,
}

impl RecordingConfig {
    /// Reject configurations that enable a filter but leave its interval at
    /// zero; the firmware would spin on an instant trigger.
    pub fn validate(&self) -> Result<()> {
        if self.flags.stationary_filter && self.stationary_detection_interval == 0 {
            return Err(Error::configuration(
                "stationary filter enabled with zero detection interval",
                Some("stationary_detection_interval"),
            ));
        }
        if self.flags.no_fix_filter && self.no_fix_detection_interval == 0 {
            return Err(Error::configuration(
                "no-fix filter enabled with zero detection interval",
                Some("no_fix_detection_interval"),
            ));
        }
        if self.flags.auto_shutdown && self.auto_shutdown_interval == 0 {
            return Err(Error::configuration(
                "auto shutdown enabled with zero interval",
                Some("auto_shutdown_interval"),
            ));
        }
        Ok(())
    }

    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        wire::ensure_exact_len("recording config", RECORDING_CONFIG_LEN, payload)?;
        let data_rate = DataRate::try_from(payload[1])
            .map_err(|_| Error::protocol(format!("unknown data rate code {:02X}", payload[1])))?;
        // Byte 3 is reserved; its value is not interpreted.
        Ok(Self {
            enabled: payload[0] != 0,
            data_rate,
            flags: RecordingFlags::from_bits(payload[2]),
            stationary_speed_threshold: wire::u16_at(payload, 4),
            stationary_detection_interval: wire::u16_at(payload, 6),
            no_fix_detection_interval: wire::u16_at(payload, 8),
            auto_shutdown_interval: wire::u16_at(payload, 10),
        })
    }

    pub fn to_payload(&self) -> [u8; RECORDING_CONFIG_LEN] {
        let mut p = [0u8; RECORDING_CONFIG_LEN];
        p[0] = u8::from(self.enabled);
        p[1] = self.data_rate.into();
        p[2] = self.flags.bits();
        p[3] = 0; // reserved
        p[4..6].copy_from_slice(&self.stationary_speed_threshold.to_le_bytes());
        p[6..8].copy_from_slice(&self.stationary_detection_interval.to_le_bytes());
        p[8..10].copy_from_slice(&self.no_fix_detection_interval.to_le_bytes());
        p[10..12].copy_from_slice(&self.auto_shutdown_interval.to_le_bytes());
        p
    }
}

/// GNSS dynamic platform model, as defined by the receiver firmware.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive, Default)]
pub enum PlatformModel {
    #[default]
    Automotive = 4,
    Sea = 5,
    AirborneLowDynamics = 6,
    AirborneHighDynamics = 8,
}

/// GNSS receiver configuration, 3-byte wire layout:
/// `[platform model][enable 3D speed][min horizontal accuracy m]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GnssConfig {
    pub platform_model: PlatformModel,
    /// Report 3D speed instead of ground speed
    pub enable_3d_speed: bool,
    /// Minimum horizontal accuracy for a usable fix, meters
    pub min_horizontal_accuracy: u8,
}

impl GnssConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_horizontal_accuracy > MAX_HORIZONTAL_ACCURACY_M {
            return Err(Error::configuration(
                format!(
                    "minimum horizontal accuracy {} m exceeds the {} m limit",
                    self.min_horizontal_accuracy, MAX_HORIZONTAL_ACCURACY_M
                ),
                Some("min_horizontal_accuracy"),
            ));
        }
        Ok(())
    }

    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        wire::ensure_exact_len("gnss config", GNSS_CONFIG_LEN, payload)?;
        let platform_model = PlatformModel::try_from(payload[0])
            .map_err(|_| Error::protocol(format!("unknown platform model {:02X}", payload[0])))?;
        Ok(Self {
            platform_model,
            enable_3d_speed: payload[1] != 0,
            min_horizontal_accuracy: payload[2],
        })
    }

    pub fn to_payload(&self) -> [u8; GNSS_CONFIG_LEN] {
        [
            self.platform_model.into(),
            u8::from(self.enable_3d_speed),
            self.min_horizontal_accuracy,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_config_golden_vector() {
        let config = RecordingConfig {
            enabled: true,
            data_rate: DataRate::Hz10,
            flags: RecordingFlags {
                wait_for_fix: true,
                ..Default::default()
            },
            stationary_speed_threshold: 500,
            stationary_detection_interval: 30,
            no_fix_detection_interval: 120,
            auto_shutdown_interval: 600,
        };

        let payload = config.to_payload();
        assert_eq!(
            payload,
            [0x01, 0x01, 0x01, 0x00, 0xF4, 0x01, 0x1E, 0x00, 0x78, 0x00, 0x58, 0x02]
        );
        assert_eq!(RecordingConfig::from_payload(&payload).unwrap(), config);
    }

    #[test]
    fn recording_config_round_trips() {
        let config = RecordingConfig {
            enabled: false,
            data_rate: DataRate::Hz1,
            flags: RecordingFlags {
                stationary_filter: true,
                auto_shutdown: true,
                wait_for_data_before_shutdown: true,
                ..Default::default()
            },
            stationary_speed_threshold: 65_535,
            stationary_detection_interval: 1,
            no_fix_detection_interval: 0,
            auto_shutdown_interval: 7_200,
        };
        let decoded = RecordingConfig::from_payload(&config.to_payload()).unwrap();
        assert_eq!(decoded, config);
    }

    #[test]
    fn recording_config_rejects_bad_payloads() {
        assert!(RecordingConfig::from_payload(&[0; 11]).is_err());
        assert!(RecordingConfig::from_payload(&[0; 13]).is_err());

        let mut payload = RecordingConfig::default().to_payload();
        payload[1] = 0x09; // no such data rate
        assert!(RecordingConfig::from_payload(&payload).is_err());
    }

    #[test]
    fn recording_config_validation() {
        let mut config = RecordingConfig {
            flags: RecordingFlags {
                stationary_filter: true,
                ..Default::default()
            },
            stationary_detection_interval: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(err.category(), "configuration");

        config.stationary_detection_interval = 30;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn data_rate_wire_codes() {
        assert_eq!(u8::from(DataRate::Hz25), 0);
        assert_eq!(u8::from(DataRate::Hz10), 1);
        assert_eq!(u8::from(DataRate::Hz5), 2);
        assert_eq!(u8::from(DataRate::Hz1), 3);
        assert_eq!(u8::from(DataRate::Hz20), 4);
        assert_eq!(DataRate::Hz20.hertz(), 20);
    }

    #[test]
    fn gnss_config_round_trips() {
        let config = GnssConfig {
            platform_model: PlatformModel::AirborneHighDynamics,
            enable_3d_speed: true,
            min_horizontal_accuracy: 15,
        };
        let payload = config.to_payload();
        assert_eq!(payload, [0x08, 0x01, 0x0F]);
        assert_eq!(GnssConfig::from_payload(&payload).unwrap(), config);
    }

    #[test]
    fn gnss_config_rejects_bad_payloads() {
        assert!(GnssConfig::from_payload(&[4, 0]).is_err());
        assert!(GnssConfig::from_payload(&[7, 0, 10]).is_err()); // model 7 undefined
    }

    #[test]
    fn gnss_config_validation() {
        let config = GnssConfig {
            min_horizontal_accuracy: MAX_HORIZONTAL_ACCURACY_M + 1,
            ..Default::default()
        };
        assert!(!config.validate().unwrap_err().is_recoverable());
        let ok = GnssConfig {
            min_horizontal_accuracy: MAX_HORIZONTAL_ACCURACY_M,
            ..Default::default()
        };
        assert!(ok.validate().is_ok());
    }
}
