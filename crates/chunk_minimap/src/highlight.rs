//! Animated highlight color for chunks near the camera.

use std::f32::consts::TAU;
use std::time::Duration;

/// Highlight animation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum HighlightMode {
  /// Hue cycle, one second per revolution.
  #[default]
  Disco,
  /// Grey pulse, two seconds per cycle.
  White,
  Off,
}

impl HighlightMode {
  /// Next mode in the toggle cycle.
  pub fn next(self) -> Self {
    match self {
      HighlightMode::Disco => HighlightMode::White,
      HighlightMode::White => HighlightMode::Off,
      HighlightMode::Off => HighlightMode::Disco,
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      HighlightMode::Disco => "disco",
      HighlightMode::White => "white",
      HighlightMode::Off => "off",
    }
  }

  /// RGBA highlight color at `elapsed`, or `None` when off.
  pub fn color_at(self, elapsed: Duration) -> Option<[f32; 4]> {
    let ms = elapsed.as_millis();
    match self {
      HighlightMode::Off => None,
      HighlightMode::White => {
        let mut ramp = (ms % 1000) as f32 / 1000.0;
        if ms % 2000 > 1000 {
          ramp = 1.0 - ramp;
        }
        let alpha = 0.1 + ramp * 0.8;
        Some([alpha; 4])
      }
      HighlightMode::Disco => {
        let phase = (ms % 1000) as f32 / 1000.0 * TAU;
        let channel = |offset: f32| (phase + offset).sin() * 0.5 + 0.5;
        Some([channel(0.0), channel(TAU / 3.0), channel(2.0 * TAU / 3.0), 1.0])
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn close(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-4
  }

  #[test]
  fn cycle_order() {
    let mode = HighlightMode::default();
    assert_eq!(mode, HighlightMode::Disco);
    assert_eq!(mode.next(), HighlightMode::White);
    assert_eq!(mode.next().next(), HighlightMode::Off);
    assert_eq!(mode.next().next().next(), HighlightMode::Disco);
  }

  #[test]
  fn white_pulses_between_bounds() {
    let at = |ms| HighlightMode::White.color_at(Duration::from_millis(ms)).unwrap()[3];
    assert!(close(at(0), 0.1));
    assert!(close(at(500), 0.5));
    assert!(close(at(999), 0.1 + 0.999 * 0.8));
    assert!(close(at(1500), 0.5));
    assert!(close(at(1999), 0.1 + 0.001 * 0.8));

    let color = HighlightMode::White.color_at(Duration::from_millis(250)).unwrap();
    assert!(color.iter().all(|&c| close(c, color[0])));
  }

  #[test]
  fn disco_channels_are_phase_shifted() {
    let color = HighlightMode::Disco.color_at(Duration::ZERO).unwrap();
    assert!(close(color[0], 0.5));
    assert!(close(color[1], (TAU / 3.0).sin() * 0.5 + 0.5));
    assert_eq!(color[3], 1.0);

    let later = HighlightMode::Disco.color_at(Duration::from_millis(1250)).unwrap();
    assert!(close(later[0], 1.0));
  }

  #[test]
  fn off_has_no_color() {
    assert_eq!(HighlightMode::Off.color_at(Duration::from_secs(3)), None);
  }
}
