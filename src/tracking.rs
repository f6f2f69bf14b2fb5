//! Bang-bang face tracking corrections.
//!
//! Each axis has a dead band around the frame center (or, for distance, an area
//! band). Outside the band a fixed-magnitude move fires; inside nothing does.
//! There is no proportional term: the correction size never depends on how far
//! off the face is.

use crate::{
    config::TrackingConfig,
    flight::{Direction, FlightCommand},
};
use opencv::core::{Rect, Size};
use serde::{Deserialize, Serialize};

/// Which detection to follow when several faces are visible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetPolicy {
    /// First box in detector order
    #[default]
    First,
    /// Box with the largest area; earliest wins ties
    Largest,
}

impl TargetPolicy {
    /// Pick the box to follow
    #[must_use]
    pub fn select(self, faces: &[Rect]) -> Option<Rect> {
        match self {
            Self::First => faces.first().copied(),
            Self::Largest => faces.iter().copied().fold(None, |best: Option<Rect>, face| match best {
                Some(b) if b.area() >= face.area() => Some(b),
                _ => Some(face),
            }),
        }
    }
}

/// Geometry of a tracked face relative to the frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceOffset {
    /// Frame center x minus face center x (positive: face is left of center)
    pub diff_x: i32,
    /// Frame center y minus face center y (positive: face is above center)
    pub diff_y: i32,
    /// Face area as a rounded percentage of the frame area
    pub area_percent: f64,
}

impl FaceOffset {
    /// Measure `face` inside a frame of `frame` size
    #[must_use]
    pub fn measure(face: Rect, frame: Size) -> Self {
        let face_center_x = face.x + face.width / 2;
        let face_center_y = face.y + face.height / 2;
        let frame_area = f64::from(frame.width) * f64::from(frame.height);
        let face_area = f64::from(face.width) * f64::from(face.height);

        let area_percent = if frame_area > 0.0 {
            (face_area / frame_area * 100.0).round()
        } else {
            0.0
        };

        Self {
            diff_x: frame.width / 2 - face_center_x,
            diff_y: frame.height / 2 - face_center_y,
            area_percent,
        }
    }
}

/// Commands that bring `face` back toward the center of the frame.
///
/// Every threshold is checked independently, so several moves can fire for one
/// frame; they are returned in the order right, left, down, up, backward, forward.
/// An empty result means the face is inside every band.
#[must_use]
pub fn corrections(face: Rect, frame: Size, config: &TrackingConfig) -> Vec<FlightCommand> {
    let offset = FaceOffset::measure(face, frame);
    let mut commands = Vec::new();

    if offset.diff_x < -config.horizontal_tolerance {
        commands.push(FlightCommand::Move(Direction::Right, config.lateral_step));
    }
    if offset.diff_x > config.horizontal_tolerance {
        commands.push(FlightCommand::Move(Direction::Left, config.lateral_step));
    }
    if offset.diff_y < -config.vertical_tolerance {
        commands.push(FlightCommand::Move(Direction::Down, config.vertical_step));
    }
    if offset.diff_y > config.vertical_tolerance {
        commands.push(FlightCommand::Move(Direction::Up, config.vertical_step));
    }
    if offset.area_percent > config.max_area_percent {
        commands.push(FlightCommand::Move(Direction::Backward, config.depth_step));
    }
    if offset.area_percent < config.min_area_percent {
        commands.push(FlightCommand::Move(Direction::Forward, config.depth_step));
    }

    commands
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const FRAME: Size = Size { width: 320, height: 240 };

    fn centered(side: i32) -> Rect {
        Rect::new(160 - side / 2, 120 - side / 2, side, side)
    }

    #[test]
    fn test_centered_face_in_band_needs_nothing() {
        // 60x60 = 3600 px, 4.7% of 76800 -> rounds to 5
        let commands = corrections(centered(60), FRAME, &TrackingConfig::default());
        assert!(commands.is_empty());
    }

    #[test]
    fn test_measure() {
        let offset = FaceOffset::measure(Rect::new(175, 90, 20, 60), FRAME);
        assert_eq!(offset.diff_x, -25);
        assert_eq!(offset.diff_y, 0);
        assert_eq!(offset.area_percent, 2.0);
    }

    #[test]
    fn test_face_right_of_center_moves_right() {
        // center x = 185 -> diff_x = -25
        let commands = corrections(Rect::new(155, 90, 60, 60), FRAME, &TrackingConfig::default());
        assert_eq!(commands, vec![FlightCommand::Move(Direction::Right, 15)]);
    }

    #[test]
    fn test_face_left_of_center_moves_left() {
        let commands = corrections(Rect::new(100, 90, 60, 60), FRAME, &TrackingConfig::default());
        assert_eq!(commands, vec![FlightCommand::Move(Direction::Left, 15)]);
    }

    #[test]
    fn test_vertical_corrections() {
        let config = TrackingConfig::default();
        // center y = 160 -> diff_y = -40
        let low = corrections(Rect::new(130, 130, 60, 60), FRAME, &config);
        assert_eq!(low, vec![FlightCommand::Move(Direction::Down, 25)]);
        // center y = 70 -> diff_y = 50
        let high = corrections(Rect::new(130, 40, 60, 60), FRAME, &config);
        assert_eq!(high, vec![FlightCommand::Move(Direction::Up, 25)]);
    }

    #[test]
    fn test_distance_corrections() {
        let config = TrackingConfig::default();
        // 100x100 = 13% of the frame
        let close = corrections(centered(100), FRAME, &config);
        assert_eq!(close, vec![FlightCommand::Move(Direction::Backward, 10)]);
        // 10x10 rounds to 0%
        let far = corrections(centered(10), FRAME, &config);
        assert_eq!(far, vec![FlightCommand::Move(Direction::Forward, 10)]);
    }

    #[test]
    fn test_multiple_thresholds_fire_in_order() {
        // bottom-right corner, tiny: right, down, forward
        let commands = corrections(Rect::new(290, 220, 10, 10), FRAME, &TrackingConfig::default());
        assert_eq!(
            commands,
            vec![
                FlightCommand::Move(Direction::Right, 15),
                FlightCommand::Move(Direction::Down, 25),
                FlightCommand::Move(Direction::Forward, 10),
            ]
        );
    }

    #[test]
    fn test_tolerance_boundary_is_exclusive() {
        // diff_x = -20 exactly: inside the band
        let commands = corrections(Rect::new(150, 90, 60, 60), FRAME, &TrackingConfig::default());
        assert!(commands.is_empty());
    }

    #[test]
    fn test_first_policy_keeps_detector_order() {
        let faces = [Rect::new(0, 0, 10, 10), Rect::new(50, 50, 40, 40)];
        assert_eq!(TargetPolicy::First.select(&faces), Some(faces[0]));
        assert_eq!(TargetPolicy::First.select(&[]), None);
    }

    #[test]
    fn test_largest_policy_ties_go_to_earliest() {
        let faces = [
            Rect::new(0, 0, 10, 10),
            Rect::new(50, 50, 40, 40),
            Rect::new(100, 100, 40, 40),
        ];
        assert_eq!(TargetPolicy::Largest.select(&faces), Some(faces[1]));
        assert_eq!(TargetPolicy::Largest.select(&[]), None);
    }

    proptest! {
        #[test]
        fn prop_never_both_directions_on_one_axis(
            x in 0..320i32, y in 0..240i32, w in 1..320i32, h in 1..240i32
        ) {
            let commands = corrections(Rect::new(x, y, w, h), FRAME, &TrackingConfig::default());
            let has = |d: Direction| commands.iter().any(|c| matches!(c, FlightCommand::Move(dir, _) if *dir == d));
            prop_assert!(!(has(Direction::Left) && has(Direction::Right)));
            prop_assert!(!(has(Direction::Up) && has(Direction::Down)));
            prop_assert!(!(has(Direction::Forward) && has(Direction::Backward)));
            prop_assert!(commands.len() <= 3);
        }
    }
}
