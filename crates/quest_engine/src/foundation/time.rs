//! Time management utilities

use std::time::Instant;

/// Length of the rolling window used for the FPS counter, in seconds
pub const FPS_WINDOW_SECONDS: f32 = 1.0;

/// Snapshot of the frame clock handed to systems
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameTime {
    /// Seconds since the previous frame
    pub delta: f32,
    /// Seconds since the clock started
    pub elapsed: f32,
    /// Frames per second measured over the last full window
    pub fps: f32,
    /// Number of frames advanced so far
    pub frame: u64,
}

/// Frame clock driven by the world once per update
///
/// Tracks elapsed and delta time plus an FPS counter that is refreshed once
/// every [`FPS_WINDOW_SECONDS`].
#[derive(Debug, Clone)]
pub struct FrameClock {
    last_frame: Option<Instant>,
    time: FrameTime,
    window_elapsed: f32,
    window_frames: u32,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    /// Create a clock that has not ticked yet
    pub const fn new() -> Self {
        Self {
            last_frame: None,
            time: FrameTime {
                delta: 0.0,
                elapsed: 0.0,
                fps: 0.0,
                frame: 0,
            },
            window_elapsed: 0.0,
            window_frames: 0,
        }
    }

    /// Advance using the wall clock; the first tick has a zero delta
    pub fn tick(&mut self) -> FrameTime {
        let now = Instant::now();
        let delta = self
            .last_frame
            .map_or(0.0, |last| now.duration_since(last).as_secs_f32());
        self.last_frame = Some(now);
        self.advance(delta)
    }

    /// Advance by an explicit delta in seconds
    pub fn advance(&mut self, delta: f32) -> FrameTime {
        let delta = delta.max(0.0);
        self.time.delta = delta;
        self.time.elapsed += delta;
        self.time.frame += 1;

        self.window_elapsed += delta;
        self.window_frames += 1;
        if self.window_elapsed >= FPS_WINDOW_SECONDS {
            self.time.fps = self.window_frames as f32 / self.window_elapsed;
            self.window_elapsed = 0.0;
            self.window_frames = 0;
        }

        self.time
    }

    /// Current snapshot without advancing
    pub const fn now(&self) -> FrameTime {
        self.time
    }

    /// Reset to the initial state
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_advance_accumulates_elapsed() {
        let mut clock = FrameClock::new();
        clock.advance(0.25);
        let time = clock.advance(0.5);
        assert_relative_eq!(time.delta, 0.5);
        assert_relative_eq!(time.elapsed, 0.75);
        assert_eq!(time.frame, 2);
    }

    #[test]
    fn test_fps_updates_once_per_window() {
        let mut clock = FrameClock::new();
        for _ in 0..59 {
            clock.advance(1.0 / 60.0);
        }
        assert_relative_eq!(clock.now().fps, 0.0);

        // 60th frame closes the one-second window (allow for float drift)
        let time = clock.advance(1.0 / 60.0 + 1e-4);
        assert_relative_eq!(time.fps, 60.0, epsilon = 0.1);
    }

    #[test]
    fn test_negative_delta_is_clamped() {
        let mut clock = FrameClock::new();
        let time = clock.advance(-1.0);
        assert_relative_eq!(time.delta, 0.0);
        assert_relative_eq!(time.elapsed, 0.0);
    }
}
