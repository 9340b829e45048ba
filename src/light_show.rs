// SPDX-License-Identifier: GPL-3.0-only
//! Decorative LED animations
//!
//! Show 1 lights every bay in a random colour each frame. Higher numbers
//! pick a pattern and a colour: shows 2..=5 are blue, 6..=9 red and 10..=13
//! both colours, cycling through the four patterns in that order.

use std::time::Duration;

use anyhow::{Context, Result};
use rand::Rng;

use crate::leds::{LedColor, LedControl, MAX_BAYS};
use crate::shutdown::ShutdownSignal;

pub const FRAME_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    /// Random colour per bay
    Holiday,
    DescendingChaser,
    AscendingChaser,
    /// One light sweeping back and forth
    KnightRider,
    /// All bays on, brightness rising and falling
    Pulsing,
}

impl Pattern {
    /// Number of frames before the pattern repeats
    fn period(self) -> usize {
        match self {
            Pattern::Holiday => 1,
            Pattern::DescendingChaser | Pattern::AscendingChaser => MAX_BAYS,
            Pattern::KnightRider => 6,
            Pattern::Pulsing => 16,
        }
    }
}

/// One bay LED change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BayUpdate {
    pub colors: LedColor,
    pub index: usize,
    pub on: bool,
}

/// Everything that changes between two frames
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    pub bays: Vec<BayUpdate>,
    pub brightness: Option<u8>,
}

impl Frame {
    fn set(&mut self, colors: LedColor, index: usize, on: bool) {
        self.bays.push(BayUpdate { colors, index, on });
    }

    pub fn apply(&self, leds: &mut dyn LedControl) -> Result<()> {
        for update in &self.bays {
            leds.set_bay(update.colors, update.index, update.on)?;
        }
        if let Some(level) = self.brightness {
            leds.set_brightness(level)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct LightShow {
    pattern: Pattern,
    colors: LedColor,
    step: usize,
}

impl LightShow {
    /// `None` for show 0, which means "no show"
    pub fn new(number: u32) -> Option<Self> {
        let (pattern, colors) = match number {
            0 => return None,
            1 => (Pattern::Holiday, LedColor::empty()),
            n => {
                let pattern = match (n - 2) % 4 {
                    0 => Pattern::DescendingChaser,
                    1 => Pattern::AscendingChaser,
                    2 => Pattern::KnightRider,
                    _ => Pattern::Pulsing,
                };
                let colors = match (n - 2) / 4 {
                    1 => LedColor::RED,
                    2 => LedColor::BLUE | LedColor::RED,
                    _ => LedColor::BLUE,
                };
                (pattern, colors)
            }
        };

        Some(Self { pattern, colors, step: 0 })
    }

    #[cfg(test)]
    pub fn pattern(&self) -> Pattern {
        self.pattern
    }

    #[cfg(test)]
    pub fn colors(&self) -> LedColor {
        self.colors
    }

    /// Compute the next frame and advance
    pub fn next_frame<R: Rng>(&mut self, rng: &mut R) -> Frame {
        let step = self.step;
        let mut frame = Frame::default();

        match self.pattern {
            Pattern::Holiday => {
                for index in 0..MAX_BAYS {
                    let lit = match rng.gen_range(0..4) {
                        1 => LedColor::BLUE,
                        2 => LedColor::RED,
                        3 => LedColor::BLUE | LedColor::RED,
                        _ => LedColor::empty(),
                    };
                    frame.set(lit, index, true);
                    frame.set(lit.complement(), index, false);
                }
            }
            Pattern::DescendingChaser => {
                for index in 0..MAX_BAYS {
                    frame.set(self.colors, index, index == MAX_BAYS - 1 - step);
                }
            }
            Pattern::AscendingChaser => {
                for index in 0..MAX_BAYS {
                    frame.set(self.colors, index, index == step);
                }
            }
            Pattern::KnightRider => {
                let lit = if step < 3 { step } else { 6 - step };
                for index in 0..MAX_BAYS {
                    frame.set(self.colors, index, index == lit);
                }
            }
            Pattern::Pulsing => {
                for index in 0..MAX_BAYS {
                    frame.set(self.colors, index, true);
                }
                let level = 1 + if step < 9 { step } else { 16 - step };
                frame.brightness = Some(level as u8);
            }
        }

        self.step = (step + 1) % self.pattern.period();
        frame
    }

    /// Animate until shutdown
    pub fn run(&mut self, leds: &mut dyn LedControl, shutdown: &ShutdownSignal) -> Result<()> {
        info!("Running light show {:?} ({:?})", self.pattern, self.colors);
        let mut rng = rand::thread_rng();

        loop {
            self.next_frame(&mut rng)
                .apply(leds)
                .context("Failed to update LEDs")?;

            if shutdown.wait_timeout(FRAME_INTERVAL).context("Failed to wait for next frame")? {
                info!("Exiting on signal");
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::leds::recording::{Call, RecordingLeds};

    fn lit_bays(frame: &Frame) -> Vec<usize> {
        frame.bays.iter().filter(|u| u.on).map(|u| u.index).collect()
    }

    fn frames(number: u32, count: usize) -> Vec<Frame> {
        let mut show = LightShow::new(number).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        (0..count).map(|_| show.next_frame(&mut rng)).collect()
    }

    #[test]
    fn test_show_numbering() {
        assert!(LightShow::new(0).is_none());

        let show = LightShow::new(1).unwrap();
        assert_eq!(show.pattern(), Pattern::Holiday);

        let show = LightShow::new(2).unwrap();
        assert_eq!((show.pattern(), show.colors()), (Pattern::DescendingChaser, LedColor::BLUE));

        let show = LightShow::new(7).unwrap();
        assert_eq!((show.pattern(), show.colors()), (Pattern::AscendingChaser, LedColor::RED));

        let show = LightShow::new(13).unwrap();
        assert_eq!((show.pattern(), show.colors()), (Pattern::Pulsing, LedColor::BLUE | LedColor::RED));

        // past the last colour group everything is blue again
        let show = LightShow::new(16).unwrap();
        assert_eq!((show.pattern(), show.colors()), (Pattern::KnightRider, LedColor::BLUE));
    }

    #[test]
    fn test_descending_chaser() {
        let lit: Vec<_> = frames(2, 5).iter().map(lit_bays).collect();
        assert_eq!(lit, vec![vec![3], vec![2], vec![1], vec![0], vec![3]]);
    }

    #[test]
    fn test_ascending_chaser() {
        let lit: Vec<_> = frames(3, 5).iter().map(lit_bays).collect();
        assert_eq!(lit, vec![vec![0], vec![1], vec![2], vec![3], vec![0]]);
    }

    #[test]
    fn test_knight_rider_sweeps_back() {
        let lit: Vec<_> = frames(4, 7).iter().map(lit_bays).collect();
        assert_eq!(
            lit,
            vec![vec![0], vec![1], vec![2], vec![3], vec![2], vec![1], vec![0]]
        );
    }

    #[test]
    fn test_pulsing_brightness_curve() {
        let levels: Vec<_> = frames(5, 17).iter().map(|f| f.brightness.unwrap()).collect();
        assert_eq!(levels, vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 8, 7, 6, 5, 4, 3, 2, 1]);
        assert!(frames(5, 1)[0].bays.iter().all(|u| u.on));
    }

    #[test]
    fn test_holiday_covers_both_colours_per_bay() {
        for frame in frames(1, 10) {
            assert_eq!(frame.bays.len(), 2 * MAX_BAYS);
            for pair in frame.bays.chunks(2) {
                assert_eq!(pair[0].index, pair[1].index);
                assert!(pair[0].on && !pair[1].on);
                assert_eq!(pair[0].colors | pair[1].colors, LedColor::all());
                assert!(!pair[0].colors.intersects(pair[1].colors));
            }
        }
    }

    #[test]
    fn test_frame_apply_order() {
        let mut leds = RecordingLeds::default();
        frames(5, 1)[0].apply(&mut leds).unwrap();
        assert_eq!(leds.calls.len(), MAX_BAYS + 1);
        assert_eq!(leds.calls.last(), Some(&Call::Brightness(1)));
    }

    #[test]
    fn test_run_stops_on_shutdown() {
        let shutdown = ShutdownSignal::new().unwrap();
        shutdown.trigger_handle().unwrap().trigger();
        let mut leds = RecordingLeds::default();
        LightShow::new(3).unwrap().run(&mut leds, &shutdown).unwrap();
        // exactly one frame is drawn before the wait notices shutdown
        assert_eq!(leds.bay_calls(), vec![(0, true), (1, false), (2, false), (3, false)]);
    }
}
