//! GATT UUIDs, command opcodes, and the byte-frame encoder for EDGE glasses.
//!
//! The glasses expose a single writable characteristic.  Every command is a
//! short frame written with response:
//!
//! | Frame | Meaning |
//! |---|---|
//! | `[value]` | static lens opacity, stops any running program |
//! | `[0xA1, start_hz, end_hz]` | strobe range swept over the session |
//! | `[0xA2, percent]` | maximum brightness |
//! | `[0xA3, inh, hold_in, exh, hold_out]` | breathing phases in 0.1 s units |
//! | `[0xA4, minutes]` | session length; (re)starts the program |
//! | `[0xA5, duty]` | static duty-cycle override, stops the program |
//! | `[0xA6]` | resume / restart the timed session |
//! | `[0xA7]` | enter deep sleep |
//!
//! All encoders clamp out-of-range input to the nearest valid value instead
//! of rejecting it, so continuously varying feedback signals can be passed
//! straight through.

use std::time::Duration;

use uuid::Uuid;

// ── Service ──────────────────────────────────────────────────────────────────

/// Substring every EDGE glasses advertisement carries in its local name.
pub const DEVICE_NAME: &str = "Smart_Glasses";

/// Primary GATT service exposed by the glasses firmware (16-bit `0x00FF`).
pub const SERVICE_UUID: Uuid = Uuid::from_u128(0x000000ff_0000_1000_8000_00805f9b34fb);

// ── Characteristics ───────────────────────────────────────────────────────────

/// Control characteristic (16-bit `0xFF01`).
///
/// The only writable characteristic on the device; every frame produced by
/// this module is written here with response.
pub const CONTROL_CHARACTERISTIC: Uuid =
    Uuid::from_u128(0x0000ff01_0000_1000_8000_00805f9b34fb);

// ── Timeouts ──────────────────────────────────────────────────────────────────

/// Scan window used by [`crate::glasses_client::Glasses::connect`] when no
/// address is bound.
pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(5);

/// Default deadline for the transport-level connect.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// RSSI reported for advertisements that carry no signal strength.
pub const UNKNOWN_RSSI: i16 = -100;

// ── Opcodes ───────────────────────────────────────────────────────────────────

pub const OP_SET_STROBE: u8 = 0xA1;
pub const OP_SET_BRIGHTNESS: u8 = 0xA2;
pub const OP_SET_BREATHING: u8 = 0xA3;
pub const OP_SET_DURATION: u8 = 0xA4;
pub const OP_HOLD: u8 = 0xA5;
pub const OP_RESUME: u8 = 0xA6;
pub const OP_SLEEP: u8 = 0xA7;

// ── Parameter ranges ──────────────────────────────────────────────────────────

pub const STROBE_MIN_HZ: u8 = 1;
pub const STROBE_MAX_HZ: u8 = 50;
pub const PERCENT_MAX: u8 = 100;
pub const DURATION_MIN_MINUTES: u8 = 1;
pub const DURATION_MAX_MINUTES: u8 = 60;

/// Saturate `value` into `min..=max` and narrow it to a byte.
fn clamp_u8(value: i32, min: u8, max: u8) -> u8 {
    // The clamp guarantees the value fits, so the narrowing cannot truncate.
    value.clamp(i32::from(min), i32::from(max)) as u8
}

/// Convert a phase length in seconds into tenths of a second, saturated to a
/// byte (0.0–25.5 s).  NaN encodes as 0.
pub fn deciseconds(seconds: f64) -> u8 {
    let ds = (seconds * 10.0).round();
    if ds.is_nan() {
        return 0;
    }
    ds.clamp(0.0, 255.0) as u8
}

// ── Encoders ──────────────────────────────────────────────────────────────────

/// Encode a static opacity frame (`0` = clear, `255` = fully dark).
///
/// ```
/// # use edge_glasses::protocol::encode_opacity;
/// assert_eq!(encode_opacity(128), vec![128]);
/// assert_eq!(encode_opacity(300), vec![255]);
/// assert_eq!(encode_opacity(-5), vec![0]);
/// ```
pub fn encode_opacity(value: i32) -> Vec<u8> {
    vec![clamp_u8(value, 0, u8::MAX)]
}

/// Encode a strobe range.  The device sweeps linearly from `start_hz` to
/// `end_hz` over the session; each bound is clamped to 1–50 Hz.
///
/// ```
/// # use edge_glasses::protocol::encode_strobe;
/// assert_eq!(encode_strobe(100, 0), vec![0xA1, 50, 1]);
/// ```
pub fn encode_strobe(start_hz: i32, end_hz: i32) -> Vec<u8> {
    vec![
        OP_SET_STROBE,
        clamp_u8(start_hz, STROBE_MIN_HZ, STROBE_MAX_HZ),
        clamp_u8(end_hz, STROBE_MIN_HZ, STROBE_MAX_HZ),
    ]
}

/// Encode the maximum brightness in percent (0–100).
pub fn encode_brightness(percent: i32) -> Vec<u8> {
    vec![OP_SET_BRIGHTNESS, clamp_u8(percent, 0, PERCENT_MAX)]
}

/// Encode the four breathing phases, given in seconds.
///
/// The hold phases are end values: the device grows them from zero to the
/// given length over the course of the session.
///
/// ```
/// # use edge_glasses::protocol::encode_breathing;
/// assert_eq!(encode_breathing(4.0, 0.25, 30.0, -1.0), vec![0xA3, 40, 3, 255, 0]);
/// ```
pub fn encode_breathing(inhale: f64, hold_in: f64, exhale: f64, hold_out: f64) -> Vec<u8> {
    vec![
        OP_SET_BREATHING,
        deciseconds(inhale),
        deciseconds(hold_in),
        deciseconds(exhale),
        deciseconds(hold_out),
    ]
}

/// Encode the session length in minutes (1–60).  Writing this frame
/// (re)starts the timed program on the device.
pub fn encode_duration(minutes: i32) -> Vec<u8> {
    vec![
        OP_SET_DURATION,
        clamp_u8(minutes, DURATION_MIN_MINUTES, DURATION_MAX_MINUTES),
    ]
}

/// Encode a static duty-cycle hold in percent (0–100).  Stops the program.
pub fn encode_hold(duty: i32) -> Vec<u8> {
    vec![OP_HOLD, clamp_u8(duty, 0, PERCENT_MAX)]
}

/// Encode the resume / restart-session command.
pub fn encode_resume() -> Vec<u8> {
    vec![OP_RESUME]
}

/// Encode the deep-sleep command.
pub fn encode_sleep() -> Vec<u8> {
    vec![OP_SLEEP]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opacity_is_a_single_clamped_byte() {
        for v in [i32::MIN, -5, 0, 1, 128, 254, 255, 256, 300, i32::MAX] {
            let frame = encode_opacity(v);
            assert_eq!(frame.len(), 1);
            assert_eq!(i32::from(frame[0]), v.clamp(0, 255));
        }
    }

    #[test]
    fn strobe_bounds_saturate_independently() {
        assert_eq!(encode_strobe(100, 0), vec![0xA1, 50, 1]);
        assert_eq!(encode_strobe(12, 8), vec![0xA1, 12, 8]);
        assert_eq!(encode_strobe(-3, 51), vec![0xA1, 1, 50]);
        assert_eq!(encode_strobe(1, 50), vec![0xA1, 1, 50]);
    }

    #[test]
    fn percent_frames_saturate_at_100() {
        assert_eq!(encode_brightness(150), vec![0xA2, 100]);
        assert_eq!(encode_brightness(-1), vec![0xA2, 0]);
        assert_eq!(encode_hold(42), vec![0xA5, 42]);
        assert_eq!(encode_hold(101), vec![0xA5, 100]);
    }

    #[test]
    fn duration_never_drops_below_one_minute() {
        assert_eq!(encode_duration(0), vec![0xA4, 1]);
        assert_eq!(encode_duration(15), vec![0xA4, 15]);
        assert_eq!(encode_duration(90), vec![0xA4, 60]);
    }

    #[test]
    fn breathing_rounds_to_nearest_decisecond() {
        assert_eq!(deciseconds(4.0), 40);
        assert_eq!(deciseconds(0.26), 3);
        assert_eq!(deciseconds(0.24), 2);
        assert_eq!(deciseconds(25.5), 255);
        assert_eq!(deciseconds(25.6), 255);
        assert_eq!(deciseconds(-0.5), 0);
        assert_eq!(deciseconds(f64::NAN), 0);
        assert_eq!(deciseconds(f64::INFINITY), 255);
        assert_eq!(
            encode_breathing(5.0, 5.0, 5.0, 5.0),
            vec![0xA3, 50, 50, 50, 50]
        );
    }

    #[test]
    fn single_byte_commands() {
        assert_eq!(encode_resume(), vec![0xA6]);
        assert_eq!(encode_sleep(), vec![0xA7]);
    }

    #[test]
    fn encoders_are_pure() {
        assert_eq!(encode_opacity(77), encode_opacity(77));
        assert_eq!(encode_strobe(9, 3), encode_strobe(9, 3));
        assert_eq!(
            encode_breathing(3.3, 1.1, 2.2, 0.7),
            encode_breathing(3.3, 1.1, 2.2, 0.7)
        );
        assert_eq!(encode_duration(20), encode_duration(20));
    }
}
