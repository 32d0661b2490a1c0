//! Acquisition side of the capacitive scale.
//!
//! - `adc`: packed 14-bit frame decoding and averaging.
//! - `SimulatedSensor`: a capacitive load cell that renders frames for a placed
//!   weight, used by the CLI and by tests in place of the real front end.
pub mod adc;
pub mod error;

use capscale_traits::{RawReading, RawReadingSource};
use std::cell::Cell;
use std::rc::Rc;

use crate::error::HwError;

/// Conversions per acquisition frame.
pub const FRAME_LEN: usize = 1024;

/// Physical behavior of the simulated sensor.
///
/// Capacitance follows `C(w) = a*exp(b*w) + c0`; counts move linearly with
/// capacitance away from the empty-pan reading.
#[derive(Debug, Clone, Copy)]
pub struct SensorModel {
    pub a: f64,
    pub b: f64,
    pub c0: f64,
    /// Channel-0 counts with nothing on the pan.
    pub zero_counts: i32,
    pub counts_per_pf: f64,
    /// Peak amplitude of uniform per-conversion noise, in counts.
    pub noise_counts: f64,
    pub seed: u32,
}

impl Default for SensorModel {
    fn default() -> Self {
        Self {
            a: 2.95,
            b: 0.00162,
            c0: 14.59,
            zero_counts: 1000,
            counts_per_pf: 50.0,
            noise_counts: 0.0,
            seed: 1,
        }
    }
}

impl SensorModel {
    pub fn capacity_pf(&self, weight_g: f64) -> f64 {
        self.a * (self.b * weight_g).exp() + self.c0
    }

    /// Noise-free channel-0 counts for a weight.
    pub fn counts(&self, weight_g: f64) -> f64 {
        let dc = self.capacity_pf(weight_g) - self.capacity_pf(0.0);
        f64::from(self.zero_counts) + self.counts_per_pf * dc
    }
}

/// Shared handle used to put weights on a sensor that has been boxed away.
#[derive(Debug, Clone)]
pub struct SensorHandle {
    weight: Rc<Cell<f64>>,
    connected: Rc<Cell<bool>>,
}

impl SensorHandle {
    pub fn place(&self, weight_g: f64) {
        self.weight.set(weight_g);
    }

    pub fn weight(&self) -> f64 {
        self.weight.get()
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.set(connected);
    }
}

/// Simulated capacitive sensor
pub struct SimulatedSensor {
    model: SensorModel,
    weight: Rc<Cell<f64>>,
    connected: Rc<Cell<bool>>,
    rng: u32,
    frame: Vec<u32>,
}

impl SimulatedSensor {
    pub fn new(model: SensorModel) -> Self {
        SimulatedSensor {
            rng: model.seed.max(1),
            model,
            weight: Rc::new(Cell::new(0.0)),
            connected: Rc::new(Cell::new(true)),
            frame: Vec::with_capacity(FRAME_LEN),
        }
    }

    pub fn handle(&self) -> SensorHandle {
        SensorHandle {
            weight: Rc::clone(&self.weight),
            connected: Rc::clone(&self.connected),
        }
    }

    pub fn model(&self) -> &SensorModel {
        &self.model
    }

    pub fn place(&mut self, weight_g: f64) {
        self.weight.set(weight_g);
    }

    // xorshift32, mapped to [-1, 1)
    fn next_noise(&mut self) -> f64 {
        let mut x = self.rng;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.rng = x;
        (f64::from(x) / (f64::from(u32::MAX) + 1.0)) * 2.0 - 1.0
    }

    /// Fill the acquisition buffer for the current weight.
    fn acquire(&mut self) -> error::Result<&[u32]> {
        if !self.connected.get() {
            return Err(HwError::Disconnected);
        }
        let base = self.model.counts(self.weight.get());
        self.frame.clear();
        for _ in 0..FRAME_LEN {
            let noise = if self.model.noise_counts > 0.0 {
                self.next_noise() * self.model.noise_counts
            } else {
                0.0
            };
            let counts = (base + noise).round();
            let clamped = counts.clamp(f64::from(-adc::HALF_SPAN), f64::from(adc::HALF_SPAN - 1));
            self.frame.push(adc::pack_word(clamped as i32, 0)?);
        }
        Ok(&self.frame)
    }
}

impl RawReadingSource for SimulatedSensor {
    fn averaged_reading(
        &mut self,
        count: u32,
    ) -> Result<RawReading, Box<dyn std::error::Error + Send + Sync>> {
        let frame = self.acquire()?;
        let (primary, secondary) = adc::average_frame(frame, count)?;
        tracing::trace!(primary, secondary, count, "simulated acquisition");
        Ok(RawReading { primary, secondary })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_pan_reads_zero_counts() {
        let mut sensor = SimulatedSensor::new(SensorModel::default());
        let r = sensor.averaged_reading(16).unwrap();
        assert_eq!(r.primary, 1000);
        assert_eq!(r.secondary, 0);
    }

    #[test]
    fn heavier_weight_reads_more_counts() {
        let mut sensor = SimulatedSensor::new(SensorModel::default());
        let handle = sensor.handle();
        handle.place(100.0);
        let light = sensor.averaged_reading(16).unwrap().primary;
        handle.place(500.0);
        let heavy = sensor.averaged_reading(16).unwrap().primary;
        assert!(heavy > light);
        assert!(light > 1000);
    }

    #[test]
    fn disconnected_sensor_errors() {
        let mut sensor = SimulatedSensor::new(SensorModel::default());
        sensor.handle().set_connected(false);
        assert!(sensor.averaged_reading(1).is_err());
    }
}
