use serde::Serialize;

use crate::calibration::Calibration;

/// The two ceilings of the roofline model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Roofline {
    pub bandwidth_gbs: f64,
    pub peak_gflops: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RoofKind {
    Memory,
    Compute,
}

/// A straight roof segment, straight on log-log axes as well.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoofSegment {
    pub kind: RoofKind,
    pub label: String,
    pub start: (f64, f64),
    pub end: (f64, f64),
}

impl From<&Calibration> for Roofline {
    fn from(calibration: &Calibration) -> Self {
        Self {
            bandwidth_gbs: calibration.b_mem_gbs,
            peak_gflops: calibration.f_peak_gflops,
        }
    }
}

impl Roofline {
    /// Throughput allowed by memory bandwidth alone at `oi`
    pub fn memory_bound(&self, oi: f64) -> f64 {
        self.bandwidth_gbs * oi
    }

    /// Operational intensity where both roofs meet
    pub fn ridge_point(&self) -> f64 {
        self.peak_gflops / self.bandwidth_gbs
    }

    pub fn memory_roof(&self, oi_min: f64, oi_max: f64) -> RoofSegment {
        RoofSegment {
            kind: RoofKind::Memory,
            label: format!("Memory roof ({:.1} GB/s)", self.bandwidth_gbs),
            start: (oi_min, self.memory_bound(oi_min)),
            end: (oi_max, self.memory_bound(oi_max)),
        }
    }

    pub fn compute_roof(&self, oi_min: f64, oi_max: f64) -> RoofSegment {
        RoofSegment {
            kind: RoofKind::Compute,
            label: format!("Compute roof ({:.0} GF/s)", self.peak_gflops),
            start: (oi_min, self.peak_gflops),
            end: (oi_max, self.peak_gflops),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roofline() -> Roofline {
        Roofline::from(&Calibration {
            b_mem_gbs: 18.7,
            f_peak_gflops: 104.9,
        })
    }

    #[test]
    fn memory_roof_spans_domain() {
        let roof = roofline().memory_roof(1e-3, 1e3);
        assert_eq!(roof.label, "Memory roof (18.7 GB/s)");
        assert_eq!(roof.start, (1e-3, 18.7 * 1e-3));
        assert_eq!(roof.end, (1e3, 18.7 * 1e3));
    }

    #[test]
    fn compute_roof_is_flat() {
        let roof = roofline().compute_roof(1e-3, 1e3);
        assert_eq!(roof.label, "Compute roof (105 GF/s)");
        assert_eq!(roof.start.1, 104.9);
        assert_eq!(roof.end.1, 104.9);
    }

    #[test]
    fn samples_on_the_roofs() {
        let roofline = roofline();
        assert!((roofline.memory_bound(0.5) - 9.35).abs() < 1e-12);
        assert_eq!(roofline.ridge_point(), 104.9 / 18.7);
    }
}
