use std::time::{Duration, Instant};

/// Frame timing snapshot.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Time elapsed since the previous tick, in seconds (clamped).
    pub dt: f32,

    /// Monotonic timestamp taken at the tick.
    pub now: Instant,

    /// Monotonic frame counter, starting at 0.
    pub frame_index: u64,

    /// Smoothed frames per second.
    pub fps: f32,
}

/// Frame clock producing `FrameTime` snapshots.
///
/// Wall-clock delta is only used for diagnostics: the simulation advances by
/// its fixed step size. Delta time is still clamped so a debugger pause does
/// not collapse the FPS average to zero.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    frame_index: u64,
    dt_min: Duration,
    dt_max: Duration,
    fps: f32,
}

/// Weight of the newest sample in the FPS moving average.
const FPS_SMOOTHING: f32 = 0.1;

impl FrameClock {
    /// Creates a new clock with default clamps (0.1 ms .. 250 ms).
    pub fn new() -> Self {
        Self::with_clamps(Duration::from_micros(100), Duration::from_millis(250))
    }

    /// Creates a clock with custom delta-time clamps.
    pub fn with_clamps(dt_min: Duration, dt_max: Duration) -> Self {
        debug_assert!(dt_min <= dt_max);
        Self {
            last: Instant::now(),
            frame_index: 0,
            dt_min,
            dt_max,
            fps: 0.0,
        }
    }

    /// Advances the clock and returns a new `FrameTime`.
    pub fn tick(&mut self) -> FrameTime {
        self.tick_at(Instant::now())
    }

    fn tick_at(&mut self, now: Instant) -> FrameTime {
        let dt = now
            .saturating_duration_since(self.last)
            .clamp(self.dt_min, self.dt_max);
        self.last = now;

        let sample = 1.0 / dt.as_secs_f32();
        self.fps = if self.frame_index == 0 {
            sample
        } else {
            self.fps + (sample - self.fps) * FPS_SMOOTHING
        };

        let ft = FrameTime {
            dt: dt.as_secs_f32(),
            now,
            frame_index: self.frame_index,
            fps: self.fps,
        };

        self.frame_index = self.frame_index.wrapping_add(1);

        ft
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
