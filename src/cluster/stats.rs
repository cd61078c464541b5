use super::device::Device;
use serde::{Deserialize, Serialize};

/// Mean and population standard deviation of device utilization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterStats {
    pub device_count: usize,
    pub mean_utilization: f64,
    pub stddev_utilization: f64,
}

impl ClusterStats {
    pub fn compute(devices: &[Device]) -> Self {
        Self::from_utilizations(devices.iter().map(Device::utilization))
    }

    /// Two-pass mean/variance over any utilization source.
    pub(crate) fn from_utilizations<I>(utilizations: I) -> Self
    where
        I: Iterator<Item = f64> + Clone,
    {
        let (count, sum) = utilizations.clone().fold((0usize, 0.0_f64), |(n, s), u| (n + 1, s + u));
        if count == 0 {
            return Self { device_count: 0, mean_utilization: 0.0, stddev_utilization: 0.0 };
        }

        let mean = sum / count as f64;
        let variance = utilizations.map(|u| (u - mean).powi(2)).sum::<f64>() / count as f64;

        Self { device_count: count, mean_utilization: mean, stddev_utilization: variance.sqrt() }
    }

    /// Signed distance of a device from the mean.
    pub fn deviation(&self, device: &Device) -> f64 {
        device.utilization() - self.mean_utilization
    }
}
