//! 80-byte telemetry record shared by live data and history downloads.
//!
//! All fields are raw wire values: positions are 1e-7 degrees, altitudes and
//! accuracies millimeters, speed mm/s, heading 1e-5 degrees, PDOP ×100,
//! g-force milli-g and rotation rate centi-deg/s. Converting to display
//! units belongs next to the presentation layer, not here.

use super::wire;
use crate::error::Result;

/// Fixed wire size of a telemetry record
pub const TELEMETRY_RECORD_LEN: usize = 80;

/// One GNSS/IMU sample as the device reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TelemetryRecord {
    /// GPS time of week, milliseconds
    pub itow: u32,
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    /// Date/time validity bitmask
    pub validity: u8,
    /// Time accuracy estimate, nanoseconds
    pub time_accuracy: u32,
    pub nanoseconds: i32,
    /// 0 = no fix, 2 = 2D, 3 = 3D
    pub fix_status: u8,
    pub fix_status_flags: u8,
    pub date_time_flags: u8,
    /// Satellites used in the solution
    pub num_sv: u8,
    /// Longitude, 1e-7 degrees
    pub longitude: i32,
    /// Latitude, 1e-7 degrees
    pub latitude: i32,
    /// Height above the WGS84 ellipsoid, millimeters
    pub wgs_altitude: i32,
    /// Height above mean sea level, millimeters
    pub msl_altitude: i32,
    /// Horizontal accuracy, millimeters
    pub horizontal_accuracy: u32,
    /// Vertical accuracy, millimeters
    pub vertical_accuracy: u32,
    /// Ground speed, mm/s
    pub speed: i32,
    /// Heading of motion, 1e-5 degrees
    pub heading: i32,
    /// Speed accuracy, mm/s
    pub speed_accuracy: u32,
    /// Heading accuracy, 1e-5 degrees
    pub heading_accuracy: u32,
    /// Position dilution of precision, ×100
    pub pdop: u16,
    pub lat_lon_flags: u8,
    /// Dual-meaning battery byte, see [`TelemetryRecord::battery`]
    pub battery: u8,
    /// Milli-g
    pub g_force_x: i16,
    pub g_force_y: i16,
    pub g_force_z: i16,
    /// Centi-degrees per second
    pub rotation_rate_x: i16,
    pub rotation_rate_y: i16,
    pub rotation_rate_z: i16,
}

/// Interpretation of the dual-meaning battery byte.
///
/// Battery-powered variants report a percentage with the high bit flagging
/// charging; externally powered variants sit in the zero sentinel region and
/// report input voltage in decivolts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatteryReading {
    /// Charging, battery level in percent
    Charging { percent: u8 },
    /// Discharging, battery level in percent
    Percent { percent: u8 },
    /// Input voltage in tenths of a volt
    Voltage { decivolts: u8 },
}

impl TelemetryRecord {
    /// Decode the battery byte: bit 7 set means charging with the level in
    /// the low seven bits; otherwise a non-zero value is a plain percentage
    /// and zero falls through to the voltage interpretation.
    pub fn battery(&self) -> BatteryReading {
        if self.battery & 0x80 != 0 {
            BatteryReading::Charging {
                percent: self.battery & 0x7F,
            }
        } else if self.battery > 0 {
            BatteryReading::Percent {
                percent: self.battery,
            }
        } else {
            BatteryReading::Voltage {
                decivolts: self.battery,
            }
        }
    }

    /// Decode a record from its 80-byte payload.
    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        wire::ensure_exact_len("telemetry record", TELEMETRY_RECORD_LEN, payload)?;
        Ok(Self {
            itow: wire::u32_at(payload, 0),
            year: wire::u16_at(payload, 4),
            month: payload[6],
            day: payload[7],
            hour: payload[8],
            minute: payload[9],
            second: payload[10],
            validity: payload[11],
            time_accuracy: wire::u32_at(payload, 12),
            nanoseconds: wire::i32_at(payload, 16),
            fix_status: payload[20],
            fix_status_flags: payload[21],
            date_time_flags: payload[22],
            num_sv: payload[23],
            longitude: wire::i32_at(payload, 24),
            latitude: wire::i32_at(payload, 28),
            wgs_altitude: wire::i32_at(payload, 32),
            msl_altitude: wire::i32_at(payload, 36),
            horizontal_accuracy: wire::u32_at(payload, 40),
            vertical_accuracy: wire::u32_at(payload, 44),
            speed: wire::i32_at(payload, 48),
            heading: wire::i32_at(payload, 52),
            speed_accuracy: wire::u32_at(payload, 56),
            heading_accuracy: wire::u32_at(payload, 60),
            pdop: wire::u16_at(payload, 64),
            lat_lon_flags: payload[66],
            battery: payload[67],
            g_force_x: wire::i16_at(payload, 68),
            g_force_y: wire::i16_at(payload, 70),
            g_force_z: wire::i16_at(payload, 72),
            rotation_rate_x: wire::i16_at(payload, 74),
            rotation_rate_y: wire::i16_at(payload, 76),
            rotation_rate_z: wire::i16_at(payload, 78),
        })
    }

    /// Encode the record back into its wire layout. Device simulators and
    /// tests need the outbound direction; the real device is the usual
    /// producer.
    pub fn to_payload(&self) -> [u8; TELEMETRY_RECORD_LEN] {
        let mut p = [0u8; TELEMETRY_RECORD_LEN];
        p[0..4].copy_from_slice(&self.itow.to_le_bytes());
        p[4..6].copy_from_slice(&self.year.to_le_bytes());
        p[6] = self.month;
        p[7] = self.day;
        p[8] = self.hour;
        p[9] = self.minute;
        p[10] = self.second;
        p[11] = self.validity;
        p[12..16].copy_from_slice(&self.time_accuracy.to_le_bytes());
        p[16..20].copy_from_slice(&self.nanoseconds.to_le_bytes());
        p[20] = self.fix_status;
        p[21] = self.fix_status_flags;
        p[22] = self.date_time_flags;
        p[23] = self.num_sv;
        p[24..28].copy_from_slice(&self.longitude.to_le_bytes());
        p[28..32].copy_from_slice(&self.latitude.to_le_bytes());
        p[32..36].copy_from_slice(&self.wgs_altitude.to_le_bytes());
        p[36..40].copy_from_slice(&self.msl_altitude.to_le_bytes());
        p[40..44].copy_from_slice(&self.horizontal_accuracy.to_le_bytes());
        p[44..48].copy_from_slice(&self.vertical_accuracy.to_le_bytes());
        p[48..52].copy_from_slice(&self.speed.to_le_bytes());
        p[52..56].copy_from_slice(&self.heading.to_le_bytes());
        p[56..60].copy_from_slice(&self.speed_accuracy.to_le_bytes());
        p[60..64].copy_from_slice(&self.heading_accuracy.to_le_bytes());
        p[64..66].copy_from_slice(&self.pdop.to_le_bytes());
        p[66] = self.lat_lon_flags;
        p[67] = self.battery;
        p[68..70].copy_from_slice(&self.g_force_x.to_le_bytes());
        p[70..72].copy_from_slice(&self.g_force_y.to_le_bytes());
        p[72..74].copy_from_slice(&self.g_force_z.to_le_bytes());
        p[74..76].copy_from_slice(&self.rotation_rate_x.to_le_bytes());
        p[76..78].copy_from_slice(&self.rotation_rate_y.to_le_bytes());
        p[78..80].copy_from_slice(&self.rotation_rate_z.to_le_bytes());
        p
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TelemetryRecord {
        TelemetryRecord {
            itow: 326_825_000,
            year: 2024,
            month: 6,
            day: 15,
            hour: 14,
            minute: 47,
            second: 5,
            validity: 0x07,
            time_accuracy: 25,
            nanoseconds: -142_000,
            fix_status: 3,
            fix_status_flags: 0x01,
            date_time_flags: 0xE0,
            num_sv: 17,
            longitude: 233_145_688,  // 23.3145688 deg
            latitude: 427_103_721,   // 42.7103721 deg
            wgs_altitude: 625_120,   // 625.120 m
            msl_altitude: 590_095,
            horizontal_accuracy: 1_100,
            vertical_accuracy: 1_800,
            speed: 13_890, // 50 km/h
            heading: 2_654_321,
            speed_accuracy: 200,
            heading_accuracy: 150_000,
            pdop: 123,
            lat_lon_flags: 0x00,
            battery: 0x59, // 89 %, discharging
            g_force_x: -12,
            g_force_y: 998,
            g_force_z: 15,
            rotation_rate_x: 250,
            rotation_rate_y: -30,
            rotation_rate_z: 4,
        }
    }

    #[test]
    fn round_trip() {
        let record = sample();
        let payload = record.to_payload();
        assert_eq!(payload.len(), TELEMETRY_RECORD_LEN);
        assert_eq!(TelemetryRecord::from_payload(&payload).unwrap(), record);
    }

    #[test]
    fn field_offsets_match_the_wire_layout() {
        let payload = sample().to_payload();
        // Spot-check a few offsets against hand-computed little-endian bytes.
        assert_eq!(&payload[4..6], &2024u16.to_le_bytes());
        assert_eq!(payload[23], 17);
        assert_eq!(&payload[24..28], &233_145_688i32.to_le_bytes());
        assert_eq!(&payload[64..66], &123u16.to_le_bytes());
        assert_eq!(payload[67], 0x59);
        assert_eq!(&payload[78..80], &4i16.to_le_bytes());
    }

    #[test]
    fn undersized_payload_is_rejected() {
        let payload = sample().to_payload();
        let err = TelemetryRecord::from_payload(&payload[..79]).unwrap_err();
        assert_eq!(err.category(), "protocol");
        assert!(TelemetryRecord::from_payload(&[]).is_err());
    }

    #[test]
    fn battery_byte_interpretations() {
        let mut record = sample();

        record.battery = 0x80 | 45;
        assert_eq!(record.battery(), BatteryReading::Charging { percent: 45 });

        record.battery = 89;
        assert_eq!(record.battery(), BatteryReading::Percent { percent: 89 });

        record.battery = 0;
        assert_eq!(record.battery(), BatteryReading::Voltage { decivolts: 0 });
    }
}
