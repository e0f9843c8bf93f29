use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct LoopHealth {
    pub(crate) fps: f32,
    pub(crate) tps: f32,
    pub(crate) frame_time_ms: f32,
    // Frames whose tick cap threw away simulation backlog.
    pub(crate) clamped_frames: u32,
}

#[derive(Debug)]
pub(crate) struct LoopHealthWindow {
    opened_at: Instant,
    length: Duration,
    frames: u32,
    ticks: u32,
    clamped_frames: u32,
    frame_time_total: Duration,
}

impl LoopHealthWindow {
    pub(crate) fn new(length: Duration) -> Self {
        Self::opened_at(Instant::now(), length)
    }

    fn opened_at(opened_at: Instant, length: Duration) -> Self {
        Self {
            opened_at,
            length,
            frames: 0,
            ticks: 0,
            clamped_frames: 0,
            frame_time_total: Duration::ZERO,
        }
    }

    pub(crate) fn record_frame(&mut self, frame_dt: Duration) {
        self.frames = self.frames.saturating_add(1);
        self.frame_time_total = self.frame_time_total.saturating_add(frame_dt);
    }

    pub(crate) fn record_tick(&mut self) {
        self.ticks = self.ticks.saturating_add(1);
    }

    pub(crate) fn record_clamp(&mut self) {
        self.clamped_frames = self.clamped_frames.saturating_add(1);
    }

    pub(crate) fn close_if_elapsed(&mut self, now: Instant) -> Option<LoopHealth> {
        let elapsed = now.saturating_duration_since(self.opened_at);
        if elapsed < self.length {
            return None;
        }

        let seconds = elapsed.as_secs_f32().max(f32::EPSILON);
        let frame_time_ms = match self.frames {
            0 => 0.0,
            frames => self.frame_time_total.as_secs_f32() * 1000.0 / frames as f32,
        };
        let health = LoopHealth {
            fps: self.frames as f32 / seconds,
            tps: self.ticks as f32 / seconds,
            frame_time_ms,
            clamped_frames: self.clamped_frames,
        };

        *self = Self::opened_at(now, self.length);
        Some(health)
    }
}
