//! [`BatteryRecorder`] – append-only (time, battery %) series.
//!
//! One sample is recorded per step the vehicle is present, before the
//! controller runs, so the series reflects exactly what the controller saw.

use voltpilot_types::BatterySample;

/// In-memory battery time series, ordered by insertion.
#[derive(Debug, Clone, Default)]
pub struct BatteryRecorder {
    samples: Vec<BatterySample>,
}

impl BatteryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one sample.
    pub fn record(&mut self, time: f64, percent: f64) {
        self.samples.push(BatterySample { time, percent });
    }

    pub fn samples(&self) -> &[BatterySample] {
        &self.samples
    }

    pub fn last(&self) -> Option<&BatterySample> {
        self.samples.last()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Consume the recorder and hand the series to the consumer.
    pub fn into_samples(self) -> Vec<BatterySample> {
        self.samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_keep_insertion_order() {
        let mut recorder = BatteryRecorder::new();
        recorder.record(1.0, 60.0);
        recorder.record(2.0, 59.5);
        recorder.record(3.0, 59.0);

        let times: Vec<f64> = recorder.samples().iter().map(|s| s.time).collect();
        assert_eq!(times, vec![1.0, 2.0, 3.0]);
        assert_eq!(recorder.last().map(|s| s.percent), Some(59.0));
    }

    #[test]
    fn empty_recorder_yields_empty_series() {
        let recorder = BatteryRecorder::new();
        assert!(recorder.is_empty());
        assert!(recorder.into_samples().is_empty());
    }

    #[test]
    fn into_samples_returns_every_point() {
        let mut recorder = BatteryRecorder::new();
        for t in 0..5 {
            recorder.record(f64::from(t), 100.0 - f64::from(t));
        }
        assert_eq!(recorder.len(), 5);
        let samples = recorder.into_samples();
        assert_eq!(samples[4], BatterySample { time: 4.0, percent: 96.0 });
    }
}
