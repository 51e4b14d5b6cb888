use std::collections::VecDeque;
use std::time::{Duration, Instant};

// bounded window of samples, oldest dropped first
#[derive(Debug, Clone)]
pub struct TimeSeries {
    data: VecDeque<f32>,
    max_length: usize,
}

impl TimeSeries {
    pub fn new(max_length: usize) -> Self {
        Self {
            data: VecDeque::with_capacity(max_length),
            max_length,
        }
    }

    pub fn push(&mut self, value: f32) {
        self.data.push_back(value);

        if self.data.len() > self.max_length {
            self.data.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get_mean(&self) -> Option<f32> {
        if self.data.is_empty() {
            return None;
        }
        Some(self.data.iter().sum::<f32>() / self.data.len() as f32)
    }
}

/// Frame rate over the last few ticks.
#[derive(Debug, Clone)]
pub struct FrameClock {
    frame_times: TimeSeries,
    last_frame: Option<Instant>,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(10)
    }
}

impl FrameClock {
    pub fn new(window: usize) -> Self {
        Self {
            frame_times: TimeSeries::new(window),
            last_frame: None,
        }
    }

    pub fn tick(&mut self) {
        let now = Instant::now();
        if let Some(last) = self.last_frame {
            self.record(now - last);
        }
        self.last_frame = Some(now);
    }

    pub fn record(&mut self, frame_time: Duration) {
        self.frame_times.push(frame_time.as_secs_f32());
    }

    // forget the previous frame so a pause does not count as one long frame
    pub fn reset_anchor(&mut self) {
        self.last_frame = None;
    }

    pub fn fps(&self) -> Option<f32> {
        self.frame_times
            .get_mean()
            .filter(|t| *t > 0.0)
            .map(|t| 1.0 / t)
    }
}
