use serde::Serialize;

pub const DEFAULT_RESULTS_PATH: &str = "results/results.csv";
pub const DEFAULT_CALIBRATION_PATH: &str = "results/calibration.json";
pub const DEFAULT_CHART_PATH: &str = "results/roofline.png";

/// Environment variable holding the measured peak memory bandwidth (GB/s)
pub const B_MEM_VAR: &str = "B_MEM";
/// Environment variable holding the measured peak compute throughput (GFLOP/s)
pub const F_PEAK_VAR: &str = "F_PEAK";

/// Fixed geometry of the roofline chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSettings {
    /// Left edge of the plotted operational intensity domain (FLOPs/byte)
    pub oi_min: f64,
    /// Right edge of the plotted operational intensity domain (FLOPs/byte)
    pub oi_max: f64,
    pub dpi: u32,
    /// Figure size in inches, scaled by `dpi` to get the pixel size
    pub figure_size: (f64, f64),
    /// Scatter marker radius in points
    pub marker_radius: f64,
    /// Base text size in points
    pub font_size: f64,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            oi_min: 1e-3,
            oi_max: 1e3,
            dpi: 180,
            figure_size: (6.4, 4.8),
            marker_radius: 2.75,
            font_size: 10.0,
        }
    }
}

impl ChartSettings {
    pub fn pixel_size(&self) -> (u32, u32) {
        let dpi = self.dpi as f64;
        (
            (self.figure_size.0 * dpi).round() as u32,
            (self.figure_size.1 * dpi).round() as u32,
        )
    }

    /// DPI as stored in a PNG `pHYs` chunk
    pub fn pixels_per_meter(&self) -> u32 {
        (self.dpi as f64 / 0.0254).round() as u32
    }

    /// Scales a length given in points (1/72 inch) to pixels at the configured DPI
    pub fn points(&self, pt: f64) -> u32 {
        (pt * self.dpi as f64 / 72.0).round() as u32
    }
}
