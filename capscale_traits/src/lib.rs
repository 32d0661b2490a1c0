pub mod clock;

pub use clock::{Clock, ManualClock, SystemClock};

/// One averaged acquisition: the primary (sensor) channel and the secondary channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawReading {
    pub primary: i32,
    pub secondary: i32,
}

/// Source of averaged raw ADC readings.
///
/// `count` is the number of consecutive conversions to average; implementations
/// clamp it to whatever their acquisition buffer can hold.
pub trait RawReadingSource {
    fn averaged_reading(
        &mut self,
        count: u32,
    ) -> Result<RawReading, Box<dyn std::error::Error + Send + Sync>>;
}

impl<T: RawReadingSource + ?Sized> RawReadingSource for Box<T> {
    fn averaged_reading(
        &mut self,
        count: u32,
    ) -> Result<RawReading, Box<dyn std::error::Error + Send + Sync>> {
        (**self).averaged_reading(count)
    }
}
