// gesture.rs — 滚轮 / 双指捏合 缩放 (只改 FOV)

use glam::Vec2;
use std::collections::HashMap;
use winit::event::{MouseScrollDelta, TouchPhase};

use crate::camera::{clamp_fov, CameraPose};

/// Degrees of fov per pixel of wheel travel.
pub const WHEEL_ZOOM_SPEED: f32 = 0.05;

/// Platform-neutral zoom gestures. Distances are in pixels; positive wheel
/// delta means "scroll down", which zooms out.
pub trait GestureSource {
    fn on_zoom_delta(&mut self, delta_y: f32);
    /// Second contact landed; the zoom baseline is taken here.
    fn on_pinch_begin(&mut self, start_distance: f32);
    fn on_pinch(&mut self, start_distance: f32, current_distance: f32);
    /// Fewer than two contacts remain.
    fn on_pinch_end(&mut self);
}

pub fn wheel_fov(fov: f32, delta_y: f32) -> f32 {
    clamp_fov(fov + delta_y * WHEEL_ZOOM_SPEED)
}

/// Fingers apart (`current > start`) lowers the fov, i.e. zooms in.
/// `None` when the start distance is unusable.
pub fn pinch_fov(start_fov: f32, start_distance: f32, current_distance: f32) -> Option<f32> {
    if start_distance.is_nan() || start_distance <= 0.0 {
        return None;
    }
    let ratio = start_distance / current_distance;
    Some(clamp_fov(start_fov * ratio))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureState {
    pub start_dist: f32,
    pub start_fov: f32,
}

/// Owns the pinch bookkeeping; writes go straight to the pose.
#[derive(Debug, Default)]
pub struct ZoomController {
    gesture: Option<GestureState>,
}

impl ZoomController {
    #[cfg(test)]
    pub fn gesture(&self) -> Option<&GestureState> {
        self.gesture.as_ref()
    }

    pub fn wheel(&mut self, pose: &mut CameraPose, delta_y: f32) {
        pose.set_fov(wheel_fov(pose.fov(), delta_y));
    }

    pub fn begin(&mut self, pose: &CameraPose, start_distance: f32) {
        self.gesture = Some(GestureState {
            start_dist: start_distance,
            start_fov: pose.fov(),
        });
    }

    /// Without a preceding `begin`, the first call captures the starting fov.
    pub fn pinch(&mut self, pose: &mut CameraPose, start_distance: f32, current_distance: f32) {
        let state = *self.gesture.get_or_insert(GestureState {
            start_dist: start_distance,
            start_fov: pose.fov(),
        });
        if let Some(fov) = pinch_fov(state.start_fov, state.start_dist, current_distance) {
            pose.set_fov(fov);
        }
    }

    pub fn end(&mut self) {
        self.gesture = None;
    }
}

/// What a touch event turned into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TouchOutcome {
    None,
    /// One finger moved by this many pixels.
    Drag(Vec2),
    Pinch,
}

/// Tracks live contacts from winit touch events and turns them into drags
/// and pinch calls on a [`GestureSource`].
#[derive(Debug, Default)]
pub struct TouchTracker {
    contacts: HashMap<u64, Vec2>,
    pinch_start: Option<f32>,
}

impl TouchTracker {
    fn pair_distance(&self) -> Option<f32> {
        if self.contacts.len() != 2 {
            return None;
        }
        let mut it = self.contacts.values();
        let a = it.next()?;
        let b = it.next()?;
        Some(a.distance(*b))
    }

    pub fn handle(
        &mut self,
        id: u64,
        phase: TouchPhase,
        position: Vec2,
        sink: &mut impl GestureSource,
    ) -> TouchOutcome {
        match phase {
            TouchPhase::Started => {
                self.contacts.insert(id, position);
                if self.contacts.len() == 2 {
                    self.pinch_start = self.pair_distance();
                    if let Some(start) = self.pinch_start {
                        sink.on_pinch_begin(start);
                    }
                } else {
                    self.end_pinch(sink);
                }
                TouchOutcome::None
            }
            TouchPhase::Moved => {
                // moves of a contact whose start we never saw are dropped
                let Some(prev) = self
                    .contacts
                    .get_mut(&id)
                    .map(|p| std::mem::replace(p, position))
                else {
                    return TouchOutcome::None;
                };
                match (self.contacts.len(), self.pinch_start, self.pair_distance()) {
                    (1, _, _) => TouchOutcome::Drag(position - prev),
                    (2, Some(start), Some(current)) => {
                        sink.on_pinch(start, current);
                        TouchOutcome::Pinch
                    }
                    _ => TouchOutcome::None,
                }
            }
            TouchPhase::Ended | TouchPhase::Cancelled => {
                self.contacts.remove(&id);
                if self.contacts.len() < 2 {
                    self.end_pinch(sink);
                }
                TouchOutcome::None
            }
        }
    }

    /// Like [`handle`](Self::handle), for events the UI may already have
    /// consumed. Consumed starts and moves never reach the sink, but lifts
    /// always release their contact so a finger raised over a panel does not
    /// stay down forever.
    pub fn route(
        &mut self,
        id: u64,
        phase: TouchPhase,
        position: Vec2,
        ui_consumed: bool,
        sink: &mut impl GestureSource,
    ) -> TouchOutcome {
        if !ui_consumed {
            return self.handle(id, phase, position, sink);
        }
        match phase {
            TouchPhase::Started => {}
            TouchPhase::Moved => {
                if let Some(p) = self.contacts.get_mut(&id) {
                    *p = position;
                }
            }
            TouchPhase::Ended | TouchPhase::Cancelled => {
                self.handle(id, phase, position, sink);
            }
        }
        TouchOutcome::None
    }

    fn end_pinch(&mut self, sink: &mut impl GestureSource) {
        if self.pinch_start.take().is_some() {
            sink.on_pinch_end();
        }
    }
}

/// winit reports wheel-up as positive; browsers and our zoom math use
/// positive for scroll-down.
pub fn wheel_delta_pixels(delta: &MouseScrollDelta, line_pixels: f32) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => -y * line_pixels,
        MouseScrollDelta::PixelDelta(pos) => -(pos.y as f32),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{MAX_FOV, MIN_FOV};

    #[derive(Default)]
    struct Recorder {
        pose: CameraPose,
        zoom: ZoomController,
        pinches: Vec<(f32, f32)>,
        ends: usize,
    }

    impl GestureSource for Recorder {
        fn on_zoom_delta(&mut self, delta_y: f32) {
            self.zoom.wheel(&mut self.pose, delta_y);
        }
        fn on_pinch_begin(&mut self, start: f32) {
            self.zoom.begin(&self.pose, start);
        }
        fn on_pinch(&mut self, start: f32, current: f32) {
            self.pinches.push((start, current));
            self.zoom.pinch(&mut self.pose, start, current);
        }
        fn on_pinch_end(&mut self) {
            self.ends += 1;
            self.zoom.end();
        }
    }

    #[test]
    fn wheel_scales_by_constant() {
        assert!((wheel_fov(75.0, 100.0) - 80.0).abs() < 1e-5);
        assert!((wheel_fov(75.0, -100.0) - 70.0).abs() < 1e-5);
        assert_eq!(wheel_fov(75.0, 1e9), MAX_FOV);
        assert_eq!(wheel_fov(75.0, -1e9), MIN_FOV);
    }

    #[test]
    fn pinch_in_is_clamped() {
        assert_eq!(pinch_fov(75.0, 100.0, 50.0), Some(120.0));
    }

    #[test]
    fn spreading_fingers_zooms_in() {
        let fov = pinch_fov(75.0, 100.0, 150.0).unwrap();
        assert!((fov - 50.0).abs() < 1e-4);
    }

    #[test]
    fn pinch_requires_positive_start() {
        assert_eq!(pinch_fov(75.0, 0.0, 50.0), None);
        assert_eq!(pinch_fov(75.0, f32::NAN, 50.0), None);
        // collapsing to a point is just "maximally zoomed out"
        assert_eq!(pinch_fov(75.0, 100.0, 0.0), Some(MAX_FOV));
    }

    #[test]
    fn fov_stays_in_range_for_any_sequence() {
        let mut rec = Recorder::default();
        let deltas = [5000.0, -3.0, -12000.0, 0.5, 1e30, -1e30, 250.0];
        for (i, d) in deltas.iter().enumerate() {
            rec.on_zoom_delta(*d);
            rec.on_pinch(100.0, 1.0 + i as f32 * 400.0);
            assert!((MIN_FOV..=MAX_FOV).contains(&rec.pose.fov()));
            if i % 2 == 0 {
                rec.on_pinch_end();
            }
        }
    }

    #[test]
    fn pinch_uses_fov_captured_at_start() {
        let mut pose = CameraPose::default();
        let mut zoom = ZoomController::default();
        zoom.pinch(&mut pose, 100.0, 125.0);
        assert!((pose.fov() - 60.0).abs() < 1e-4);
        // still relative to 75, not to 60
        zoom.pinch(&mut pose, 100.0, 150.0);
        assert!((pose.fov() - 50.0).abs() < 1e-4);
        zoom.end();
        assert!(zoom.gesture().is_none());
    }

    #[test]
    fn two_finger_touch_drives_pinch() {
        let mut rec = Recorder::default();
        let mut touches = TouchTracker::default();

        touches.handle(1, TouchPhase::Started, Vec2::new(0.0, 0.0), &mut rec);
        touches.handle(2, TouchPhase::Started, Vec2::new(100.0, 0.0), &mut rec);
        let out = touches.handle(2, TouchPhase::Moved, Vec2::new(50.0, 0.0), &mut rec);

        assert_eq!(out, TouchOutcome::Pinch);
        assert_eq!(rec.pinches, vec![(100.0, 50.0)]);
        assert_eq!(rec.pose.fov(), 120.0);

        touches.handle(2, TouchPhase::Ended, Vec2::new(50.0, 0.0), &mut rec);
        assert_eq!(rec.ends, 1);
        assert!(rec.zoom.gesture().is_none());
    }

    #[test]
    fn single_finger_reports_drag() {
        let mut rec = Recorder::default();
        let mut touches = TouchTracker::default();
        touches.handle(7, TouchPhase::Started, Vec2::new(10.0, 10.0), &mut rec);
        let out = touches.handle(7, TouchPhase::Moved, Vec2::new(14.0, 7.0), &mut rec);
        assert_eq!(out, TouchOutcome::Drag(Vec2::new(4.0, -3.0)));
        assert!(rec.pinches.is_empty());
    }

    #[test]
    fn third_finger_cancels_pinch() {
        let mut rec = Recorder::default();
        let mut touches = TouchTracker::default();
        touches.handle(1, TouchPhase::Started, Vec2::ZERO, &mut rec);
        touches.handle(2, TouchPhase::Started, Vec2::new(80.0, 0.0), &mut rec);
        touches.handle(3, TouchPhase::Started, Vec2::new(0.0, 80.0), &mut rec);
        assert_eq!(rec.ends, 1);
        let out = touches.handle(1, TouchPhase::Moved, Vec2::new(5.0, 5.0), &mut rec);
        assert_eq!(out, TouchOutcome::None);
    }

    #[test]
    fn wheel_direction_matches_browser_convention() {
        let up = MouseScrollDelta::LineDelta(0.0, 1.0);
        assert_eq!(wheel_delta_pixels(&up, 100.0), -100.0);
        let px = MouseScrollDelta::PixelDelta(winit::dpi::PhysicalPosition::new(0.0, -40.0));
        assert_eq!(wheel_delta_pixels(&px, 100.0), 40.0);
    }

    #[test]
    fn lift_over_ui_still_releases_contact() {
        let mut rec = Recorder::default();
        let mut touches = TouchTracker::default();

        touches.route(1, TouchPhase::Started, Vec2::new(10.0, 10.0), false, &mut rec);
        // finger lifted over a panel: the UI swallows the event
        let out = touches.route(1, TouchPhase::Ended, Vec2::new(10.0, 10.0), true, &mut rec);
        assert_eq!(out, TouchOutcome::None);

        touches.route(2, TouchPhase::Started, Vec2::new(100.0, 100.0), false, &mut rec);
        let out = touches.route(2, TouchPhase::Moved, Vec2::new(130.0, 100.0), false, &mut rec);
        assert_eq!(out, TouchOutcome::Drag(Vec2::new(30.0, 0.0)));
        assert!(rec.pinches.is_empty());
        assert_eq!(rec.pose.fov(), 75.0);
    }

    #[test]
    fn consumed_start_and_move_are_ignored() {
        let mut rec = Recorder::default();
        let mut touches = TouchTracker::default();

        let out = touches.route(4, TouchPhase::Started, Vec2::ZERO, true, &mut rec);
        assert_eq!(out, TouchOutcome::None);
        let out = touches.route(4, TouchPhase::Moved, Vec2::new(20.0, 0.0), false, &mut rec);
        assert_eq!(out, TouchOutcome::None);

        touches.route(5, TouchPhase::Started, Vec2::ZERO, false, &mut rec);
        touches.route(5, TouchPhase::Moved, Vec2::new(0.0, 8.0), true, &mut rec);
        // the hidden move still updated the contact position
        let out = touches.route(5, TouchPhase::Moved, Vec2::new(0.0, 10.0), false, &mut rec);
        assert_eq!(out, TouchOutcome::Drag(Vec2::new(0.0, 2.0)));
    }

    #[test]
    fn pinch_baseline_is_taken_when_second_finger_lands() {
        let mut rec = Recorder::default();
        let mut touches = TouchTracker::default();

        touches.handle(1, TouchPhase::Started, Vec2::new(0.0, 0.0), &mut rec);
        touches.handle(2, TouchPhase::Started, Vec2::new(100.0, 0.0), &mut rec);
        assert_eq!(
            rec.zoom.gesture(),
            Some(&GestureState {
                start_dist: 100.0,
                start_fov: 75.0,
            })
        );

        // a wheel turn before the first move does not shift the baseline
        rec.on_zoom_delta(200.0);
        assert!((rec.pose.fov() - 85.0).abs() < 1e-4);

        touches.handle(2, TouchPhase::Moved, Vec2::new(125.0, 0.0), &mut rec);
        assert!((rec.pose.fov() - 60.0).abs() < 1e-4);
    }
}
