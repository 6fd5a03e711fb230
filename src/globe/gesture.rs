//! Pointer, touch and animation state machine for the globe camera.
//!
//! The controller never touches the projection itself. Each input returns a
//! [`GestureEvent`] describing what should change, and the view applies it.
//! A drag and a fly-to are mutually exclusive: every drag start or new fly-to
//! bumps the generation counter, and an animation whose generation is stale
//! produces no further frames.

use std::time::{Duration, Instant};

use tracing::debug;

use super::markers::MarkerId;
use super::projection::{Projection, Rotation};
use super::versor::Versor;
use crate::geo::{lonlat_to_vec3, wrap_lon, LonLat};
use glam::DVec3;

/// Touches shorter than this that never became a pinch count as a tap.
pub const TAP_MAX: Duration = Duration::from_millis(300);

/// Pointer travel (in dots) below which a press and release is a click.
pub const CLICK_SLOP: f64 = 1.0;

/// Reference frame captured when a globe drag starts.
#[derive(Clone, Copy, Debug)]
pub struct DragSession {
    start_vector: DVec3,
    start_rotation: Rotation,
    start_versor: Versor,
}

impl DragSession {
    /// `None` when the press is off the globe.
    pub fn begin(projection: &Projection, x: f64, y: f64) -> Option<Self> {
        let (lon, lat) = projection.invert(x, y)?;
        let start_rotation = projection.rotation();
        Some(Self {
            start_vector: lonlat_to_vec3(lon, lat),
            start_rotation,
            start_versor: Versor::from_rotation(start_rotation),
        })
    }

    /// Rotation that keeps the grabbed point under the pointer. The pointer
    /// is inverted with the rotation captured at drag start, not the live
    /// one. Roll is always dropped.
    pub fn rotation_at(&self, projection: &Projection, x: f64, y: f64) -> Option<Rotation> {
        let snapshot = projection.with_rotation(self.start_rotation);
        let (lon, lat) = snapshot.invert(x, y)?;
        let current = lonlat_to_vec3(lon, lat);
        let q = self.start_versor * Versor::delta(self.start_vector, current);
        Some(q.to_rotation().level())
    }

    pub fn start_rotation(&self) -> Rotation {
        self.start_rotation
    }
}

#[derive(Clone, Debug, Default)]
enum Gesture {
    #[default]
    Idle,
    Rotating {
        session: DragSession,
        origin: (f64, f64),
        last: (f64, f64),
        moved: bool,
    },
    MovingMarker {
        id: MarkerId,
        moved: bool,
    },
    Pinching {
        last_distance: f64,
    },
}

/// What to do when a fly-to reaches its target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arrival {
    /// Replace every marker with one at the target
    ReplaceMarkers,
    /// Append a marker at the target
    AppendMarker,
    Nothing,
}

#[derive(Clone, Debug)]
pub struct FlyTo {
    generation: u64,
    from: Rotation,
    to: Rotation,
    started: Instant,
    duration: Duration,
    target: LonLat,
    arrival: Arrival,
}

impl FlyTo {
    /// Rotation at `now`. The interpolation is linear in the rotation angles,
    /// with the parameter eased by cubic-in-out.
    pub fn sample(&self, now: Instant) -> (Rotation, bool) {
        let elapsed = now.saturating_duration_since(self.started);
        if self.duration.is_zero() || elapsed >= self.duration {
            return (self.to, true);
        }
        let t = elapsed.as_secs_f64() / self.duration.as_secs_f64();
        (self.from.lerp(self.to, ease_cubic_in_out(t)), false)
    }

    pub fn target(&self) -> LonLat {
        self.target
    }
}

pub fn ease_cubic_in_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum GestureEvent {
    None,
    /// Apply this rotation (roll already zero)
    Rotate(Rotation),
    /// Multiply the scale factor by this ratio
    Zoom(f64),
    /// Press and release without motion, at screen dots
    Click { x: f64, y: f64 },
    MoveMarker { id: MarkerId, lon: f64, lat: f64 },
    /// A marker drag ended; `moved` is false for a plain press on a marker
    MarkerReleased { id: MarkerId, moved: bool },
}

#[derive(Clone, Debug, PartialEq)]
pub enum AnimationStep {
    Idle,
    Frame(Rotation),
    Finished {
        rotation: Rotation,
        target: LonLat,
        arrival: Arrival,
    },
}

#[derive(Debug, Default)]
pub struct GestureController {
    gesture: Gesture,
    animation: Option<FlyTo>,
    generation: u64,
    touch_started: Option<Instant>,
    multi_touch: bool,
}

impl GestureController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        !matches!(self.gesture, Gesture::Idle)
    }

    pub fn is_animating(&self) -> bool {
        self.animation
            .as_ref()
            .is_some_and(|a| a.generation == self.generation)
    }

    /// Active drag session, if the user is rotating the globe.
    pub fn drag_session(&self) -> Option<&DragSession> {
        match &self.gesture {
            Gesture::Rotating { session, .. } => Some(session),
            _ => None,
        }
    }

    fn supersede(&mut self) {
        self.generation += 1;
        if self.animation.take().is_some() {
            debug!(generation = self.generation, "fly-to superseded");
        }
    }

    /// Stop any running fly-to without starting anything else.
    pub fn cancel_animation(&mut self) {
        self.supersede();
    }

    /// Press on the globe body. Returns false (and stays idle) off the disk.
    pub fn press_globe(&mut self, projection: &Projection, x: f64, y: f64) -> bool {
        let Some(session) = DragSession::begin(projection, x, y) else {
            return false;
        };
        self.supersede();
        self.gesture = Gesture::Rotating {
            session,
            origin: (x, y),
            last: (x, y),
            moved: false,
        };
        debug!(x, y, "drag start");
        true
    }

    /// Press on a marker glyph.
    pub fn press_marker(&mut self, id: MarkerId) {
        self.supersede();
        debug!(%id, "marker drag start");
        self.gesture = Gesture::MovingMarker { id, moved: false };
    }

    pub fn pointer_move(&mut self, projection: &Projection, x: f64, y: f64) -> GestureEvent {
        match &mut self.gesture {
            Gesture::Rotating {
                session,
                origin,
                last,
                moved,
            } => {
                *last = (x, y);
                if !*moved && (x - origin.0).hypot(y - origin.1) < CLICK_SLOP {
                    return GestureEvent::None;
                }
                *moved = true;
                session
                    .rotation_at(projection, x, y)
                    .map_or(GestureEvent::None, GestureEvent::Rotate)
            }
            Gesture::MovingMarker { id, moved } => match projection.invert(x, y) {
                Some((lon, lat)) => {
                    *moved = true;
                    GestureEvent::MoveMarker {
                        id: id.clone(),
                        lon,
                        lat,
                    }
                }
                None => GestureEvent::None,
            },
            Gesture::Idle | Gesture::Pinching { .. } => GestureEvent::None,
        }
    }

    pub fn pointer_up(&mut self, x: f64, y: f64) -> GestureEvent {
        match std::mem::take(&mut self.gesture) {
            Gesture::Rotating { moved: false, .. } => GestureEvent::Click { x, y },
            Gesture::MovingMarker { id, moved } => GestureEvent::MarkerReleased { id, moved },
            _ => GestureEvent::None,
        }
    }

    /// Pointer left the surface: end whatever was in progress without a click.
    pub fn pointer_leave(&mut self) -> GestureEvent {
        match std::mem::take(&mut self.gesture) {
            Gesture::MovingMarker { id, moved } => GestureEvent::MarkerReleased { id, moved },
            _ => GestureEvent::None,
        }
    }

    /// Single finger landing on a marker glyph.
    pub fn touch_marker(&mut self, id: MarkerId, now: Instant) {
        self.touch_started = Some(now);
        self.multi_touch = false;
        self.press_marker(id);
    }

    pub fn touch_start(&mut self, projection: &Projection, touches: &[(f64, f64)], now: Instant) {
        match touches {
            [(x, y)] => {
                self.touch_started = Some(now);
                self.multi_touch = false;
                self.press_globe(projection, *x, *y);
            }
            [a, b, ..] => {
                self.supersede();
                self.multi_touch = true;
                self.gesture = Gesture::Pinching {
                    last_distance: distance(*a, *b),
                };
            }
            [] => {}
        }
    }

    pub fn touch_move(&mut self, projection: &Projection, touches: &[(f64, f64)]) -> GestureEvent {
        match touches {
            [(x, y)] => self.pointer_move(projection, *x, *y),
            [a, b, ..] => {
                let d = distance(*a, *b);
                match &mut self.gesture {
                    Gesture::Pinching { last_distance } => {
                        let ratio = if *last_distance > f64::EPSILON { d / *last_distance } else { 1.0 };
                        *last_distance = d;
                        GestureEvent::Zoom(ratio)
                    }
                    _ => {
                        self.multi_touch = true;
                        self.gesture = Gesture::Pinching { last_distance: d };
                        GestureEvent::None
                    }
                }
            }
            [] => GestureEvent::None,
        }
    }

    /// `remaining` is the number of touches still down.
    pub fn touch_end(&mut self, remaining: usize, now: Instant) -> GestureEvent {
        if remaining > 0 {
            // Lifting one finger of a pinch ends the pinch without a drag.
            if matches!(self.gesture, Gesture::Pinching { .. }) {
                self.gesture = Gesture::Idle;
            }
            return GestureEvent::None;
        }

        let last = match &self.gesture {
            Gesture::Rotating { last, .. } => Some(*last),
            _ => None,
        };
        let tapped = !self.multi_touch
            && self
                .touch_started
                .is_some_and(|t| now.saturating_duration_since(t) < TAP_MAX);
        self.touch_started = None;
        self.multi_touch = false;

        match (std::mem::take(&mut self.gesture), last) {
            (Gesture::MovingMarker { id, moved }, _) => GestureEvent::MarkerReleased { id, moved },
            (_, Some((x, y))) if tapped => GestureEvent::Click { x, y },
            _ => GestureEvent::None,
        }
    }

    /// Start animating from `from` toward the rotation that centers `target`.
    /// Yaw takes the shorter way round. Returns the animation's generation.
    pub fn start_fly_to(
        &mut self,
        from: Rotation,
        target: LonLat,
        duration: Duration,
        arrival: Arrival,
        now: Instant,
    ) -> u64 {
        self.supersede();
        let from = from.level();
        let mut to = Rotation::centering(target.0, target.1);
        to.yaw = from.yaw + wrap_lon(to.yaw - from.yaw);
        debug!(?from, ?to, generation = self.generation, "fly-to start");
        self.animation = Some(FlyTo {
            generation: self.generation,
            from,
            to,
            started: now,
            duration,
            target,
            arrival,
        });
        self.generation
    }

    /// Advance the animation. Stale or finished animations yield `Idle`.
    pub fn tick(&mut self, now: Instant) -> AnimationStep {
        let Some(animation) = &self.animation else {
            return AnimationStep::Idle;
        };
        if animation.generation != self.generation {
            self.animation = None;
            return AnimationStep::Idle;
        }

        let (rotation, done) = animation.sample(now);
        if !done {
            return AnimationStep::Frame(rotation);
        }
        let target = animation.target;
        let arrival = animation.arrival;
        self.animation = None;
        debug!(?target, "fly-to arrived");
        AnimationStep::Finished {
            rotation,
            target,
            arrival,
        }
    }
}

fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    (a.0 - b.0).hypot(a.1 - b.1)
}
