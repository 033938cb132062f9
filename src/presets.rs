//! Session parameter bundles and the four named presets.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::protocol::{encode_breathing, encode_brightness, encode_duration, encode_strobe};

/// The four breathing phases, in seconds.
///
/// `hold_in` and `hold_out` are end values; the device grows them from zero
/// over the session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreathingPattern {
    pub inhale: f64,
    pub hold_in: f64,
    pub exhale: f64,
    pub hold_out: f64,
}

impl BreathingPattern {
    /// Same length for every phase ("box breathing").
    pub const fn uniform(seconds: f64) -> Self {
        Self {
            inhale: seconds,
            hold_in: seconds,
            exhale: seconds,
            hold_out: seconds,
        }
    }
}

/// Everything [`crate::glasses_client::Glasses::start_session`] writes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionParams {
    /// Session length in minutes (1–60).
    pub duration_minutes: i32,
    pub strobe_start_hz: i32,
    pub strobe_end_hz: i32,
    pub breathing: BreathingPattern,
    /// Maximum brightness in percent (0–100).
    pub brightness: i32,
}

impl Default for SessionParams {
    fn default() -> Self {
        Preset::Meditate.params()
    }
}

impl SessionParams {
    /// Frames in write order: brightness, breathing, strobe, duration.
    ///
    /// The duration frame restarts the device program, so it must go last
    /// for the other three to be in effect when the session begins.
    pub fn frames(&self) -> [Vec<u8>; 4] {
        let b = &self.breathing;
        [
            encode_brightness(self.brightness),
            encode_breathing(b.inhale, b.hold_in, b.exhale, b.hold_out),
            encode_strobe(self.strobe_start_hz, self.strobe_end_hz),
            encode_duration(self.duration_minutes),
        ]
    }

    pub fn with_duration(mut self, minutes: i32) -> Self {
        self.duration_minutes = minutes;
        self
    }
}

/// A named, fixed parameter bundle.  Presets differ only in data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Preset {
    /// 10 → 4 Hz, 5 s phases.  Winding down, stress relief.
    Relax,
    /// 15 → 10 Hz, 3/2 s phases.  Studying, alertness.
    Focus,
    /// 12 → 8 Hz, 4 s phases.  General practice.
    Meditate,
    /// 6 → 2 Hz, 6 s phases, 15 min.  The device sleeps when it ends.
    Sleep,
}

impl Preset {
    pub const ALL: [Preset; 4] = [Preset::Relax, Preset::Focus, Preset::Meditate, Preset::Sleep];

    pub fn name(self) -> &'static str {
        match self {
            Preset::Relax => "relax",
            Preset::Focus => "focus",
            Preset::Meditate => "meditate",
            Preset::Sleep => "sleep",
        }
    }

    pub fn default_duration(self) -> i32 {
        self.params().duration_minutes
    }

    pub fn params(self) -> SessionParams {
        let (duration_minutes, strobe_start_hz, strobe_end_hz, breathing) = match self {
            Preset::Relax => (10, 10, 4, BreathingPattern::uniform(5.0)),
            Preset::Focus => (
                10,
                15,
                10,
                BreathingPattern {
                    inhale: 3.0,
                    hold_in: 2.0,
                    exhale: 3.0,
                    hold_out: 2.0,
                },
            ),
            Preset::Meditate => (10, 12, 8, BreathingPattern::uniform(4.0)),
            Preset::Sleep => (15, 6, 2, BreathingPattern::uniform(6.0)),
        };
        SessionParams {
            duration_minutes,
            strobe_start_hz,
            strobe_end_hz,
            breathing,
            brightness: 100,
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown session type '{0}' (options: relax, focus, meditate, sleep)")]
pub struct UnknownPreset(pub String);

impl FromStr for Preset {
    type Err = UnknownPreset;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Preset::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownPreset(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relax_frames_in_write_order() {
        let frames = Preset::Relax.params().with_duration(15).frames();
        assert_eq!(
            frames,
            [
                vec![0xA2, 100],
                vec![0xA3, 50, 50, 50, 50],
                vec![0xA1, 10, 4],
                vec![0xA4, 15],
            ]
        );
    }

    #[test]
    fn presets_differ_only_in_strobe_breathing_duration() {
        for p in Preset::ALL {
            assert_eq!(p.params().brightness, 100);
        }
        assert_eq!(Preset::Focus.params().frames()[1], vec![0xA3, 30, 20, 30, 20]);
        assert_eq!(Preset::Meditate.params().frames()[2], vec![0xA1, 12, 8]);
        assert_eq!(Preset::Sleep.params().frames()[2], vec![0xA1, 6, 2]);
    }

    #[test]
    fn default_durations() {
        assert_eq!(Preset::Relax.default_duration(), 10);
        assert_eq!(Preset::Focus.default_duration(), 10);
        assert_eq!(Preset::Meditate.default_duration(), 10);
        assert_eq!(Preset::Sleep.default_duration(), 15);
    }

    #[test]
    fn default_params_are_meditate() {
        assert_eq!(SessionParams::default(), Preset::Meditate.params());
    }

    #[test]
    fn parse_preset_names() {
        assert_eq!("relax".parse::<Preset>(), Ok(Preset::Relax));
        assert_eq!("FOCUS".parse::<Preset>(), Ok(Preset::Focus));
        assert_eq!("sleep".parse::<Preset>(), Ok(Preset::Sleep));
        assert_eq!(
            "nap".parse::<Preset>(),
            Err(UnknownPreset("nap".to_owned()))
        );
        for p in Preset::ALL {
            assert_eq!(p.to_string().parse::<Preset>(), Ok(p));
        }
    }
}
