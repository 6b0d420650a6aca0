use std::{future::Future, io, ops::AddAssign, time::Duration};

use log::{debug, trace};
use pingdraw_common::{encode_pixel, CANVAS_HEIGHT, CANVAS_WIDTH, SCAN};
use tokio::time::{self, Instant};

use crate::{image::Image, pulse::PulseSender, transport::Transport};

/// The part of the image that lands on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub width: u32,
    pub height: u32,
    pub offset_x: i32,
    pub offset_y: i32,
}

impl Region {
    /// Cuts the image off at the right and bottom canvas edges. Width and
    /// height never go below zero or above the image size.
    pub fn clamp(image_width: u32, image_height: u32, offset_x: i32, offset_y: i32) -> Self {
        Self {
            width: clamp_extent(image_width, offset_x, CANVAS_WIDTH),
            height: clamp_extent(image_height, offset_y, CANVAS_HEIGHT),
            offset_x,
            offset_y,
        }
    }
}

fn clamp_extent(size: u32, offset: i32, bound: u16) -> u32 {
    let end = (offset as i64 + size as i64).min(bound as i64);
    (end - offset as i64).clamp(0, size as i64) as u32
}

/// Absolute canvas coordinate of image coordinate `pos`, if it is on the canvas.
fn canvas_coord(offset: i32, pos: u32, bound: u16) -> Option<u16> {
    u16::try_from(offset as i64 + pos as i64)
        .ok()
        .filter(|c| *c < bound)
}

/// Time one interlace pass may take, `None` if pacing is disabled.
pub fn pacing_budget(fps: i32) -> Option<Duration> {
    let passes_per_second = u32::try_from(fps).ok()?.checked_mul(SCAN)?;
    if passes_per_second == 0 {
        return None;
    }
    Some(Duration::from_secs(1) / passes_per_second)
}

/// How long to sleep after a pass that took `elapsed`. Overruns are not
/// made up for.
pub fn remaining(budget: Option<Duration>, elapsed: Duration) -> Option<Duration> {
    budget?.checked_sub(elapsed).filter(|d| !d.is_zero())
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PassStats {
    /// Pulses handed to the transport
    pub sent: u64,
    /// Pulses the transport failed to send
    pub dropped: u64,
    /// Black or off-canvas pixels
    pub skipped: u64,
}

impl AddAssign for PassStats {
    fn add_assign(&mut self, rhs: Self) {
        self.sent += rhs.sent;
        self.dropped += rhs.dropped;
        self.skipped += rhs.skipped;
    }
}

/// Repeatedly sends the visible pixels of an image, one interlace pass at a
/// time, paced to the configured frame rate.
pub struct RenderScheduler<T> {
    image: Image,
    region: Region,
    budget: Option<Duration>,
    transport: T,
    sender: PulseSender,
    pass_index: u32,
    totals: PassStats,
}

impl<T: Transport> RenderScheduler<T> {
    pub fn new(image: Image, region: Region, fps: i32, transport: T) -> Self {
        Self {
            image,
            region,
            budget: pacing_budget(fps),
            transport,
            sender: PulseSender::new(),
            pass_index: 0,
            totals: PassStats::default(),
        }
    }

    pub fn region(&self) -> Region {
        self.region
    }

    #[cfg(test)]
    pub fn pass_index(&self) -> u32 {
        self.pass_index
    }

    /// Sums of all passes so far.
    pub fn totals(&self) -> PassStats {
        self.totals
    }

    #[cfg(test)]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Sends every row of the current interlace pass and moves on to the next pass.
    pub fn pass(&mut self) -> PassStats {
        let mut stats = PassStats::default();
        let mut last_error: Option<io::Error> = None;

        for y in (self.pass_index..self.region.height).step_by(SCAN as usize) {
            let Some(canvas_y) = canvas_coord(self.region.offset_y, y, CANVAS_HEIGHT) else {
                stats.skipped += self.region.width as u64;
                continue;
            };

            for x in 0..self.region.width {
                let [r, g, b] = self.image.rgb(x, y);
                // Black is the background
                if r == 0 && g == 0 && b == 0 {
                    stats.skipped += 1;
                    continue;
                }
                let Some(canvas_x) = canvas_coord(self.region.offset_x, x, CANVAS_WIDTH) else {
                    stats.skipped += 1;
                    continue;
                };

                let dst = encode_pixel(canvas_x, canvas_y, r, g, b);
                match self.sender.send(&self.transport, dst) {
                    Ok(_) => stats.sent += 1,
                    Err(e) => {
                        stats.dropped += 1;
                        last_error = Some(e);
                    }
                }
            }
        }

        if let Some(e) = last_error {
            debug!(
                "Dropped {} of {} pulses in pass {}, last error: {e}",
                stats.dropped,
                stats.sent + stats.dropped,
                self.pass_index
            );
        }

        self.pass_index = (self.pass_index + 1) % SCAN;
        self.totals += stats;
        stats
    }

    /// One pass followed by the pacing sleep.
    pub async fn step(&mut self) -> PassStats {
        let start = Instant::now();
        let pass_index = self.pass_index;
        let stats = self.pass();
        let elapsed = start.elapsed();

        match self.budget {
            Some(budget) => trace!(
                "Pass {pass_index} sent {} pulses in {:?} ({}% of budget)",
                stats.sent,
                elapsed,
                (elapsed.as_micros() as f32 / budget.as_micros() as f32 * 100.0).ceil()
            ),
            None => trace!(
                "Pass {pass_index} sent {} pulses in {:?}",
                stats.sent,
                elapsed
            ),
        }

        if let Some(delay) = remaining(self.budget, elapsed) {
            time::sleep(delay).await;
        }
        stats
    }

    #[cfg(test)]
    pub async fn run_passes(&mut self, passes: usize) {
        for _ in 0..passes {
            self.step().await;
        }
    }

    /// Renders until `shutdown` completes. Shutdown is checked before every
    /// pass and interrupts the pacing sleep.
    pub async fn run<F: Future<Output = ()>>(&mut self, shutdown: F) {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                () = &mut shutdown => break,
                _ = self.step() => {}
            }
        }
    }
}
