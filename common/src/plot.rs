use std::path::Path;

use itertools::{Itertools, MinMaxResult};
use plotters::{prelude::*, series::DashedLineSeries};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    calibration::Calibration,
    config::ChartSettings,
    error::RooflineError,
    results::{ResultSample, VariantSeries, group_by_variant, load_results},
    roofline::{RoofKind, RoofSegment, Roofline},
    util::{is_log_plottable, write_atomic},
};

const X_DESC: &str = "Operational Intensity (FLOPs/byte)";
const Y_DESC: &str = "GFLOP/s";
/// Share of the log-scaled y span added above and below the data
const Y_MARGIN: f64 = 0.05;

/// matplotlib's default color cycle, roofs first, then one color per variant
const PALETTE: [RGBColor; 10] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(127, 127, 127),
    RGBColor(188, 189, 34),
    RGBColor(23, 190, 207),
];

/// Everything needed to draw a roofline chart. Building it is deterministic,
/// so two charts from identical inputs compare equal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RooflineChart {
    pub settings: ChartSettings,
    pub pixel_size: (u32, u32),
    pub x_range: (f64, f64),
    pub y_range: (f64, f64),
    pub ridge_point: f64,
    pub roofs: Vec<RoofSegment>,
    pub series: Vec<VariantSeries>,
}

impl RooflineChart {
    pub fn build(
        calibration: &Calibration,
        samples: &[ResultSample],
        settings: ChartSettings,
    ) -> Result<Self, RooflineError> {
        if samples.is_empty() {
            return Err(RooflineError::render("no result samples to plot"));
        }
        if !(is_log_plottable(settings.oi_min) && settings.oi_min < settings.oi_max) {
            return Err(RooflineError::render(format!(
                "invalid operational intensity domain [{}, {}]",
                settings.oi_min, settings.oi_max
            )));
        }

        let roofline = Roofline::from(calibration);
        let x_range = (settings.oi_min, settings.oi_max);
        let roofs = vec![
            roofline.memory_roof(x_range.0, x_range.1),
            roofline.compute_roof(x_range.0, x_range.1),
        ];
        let series = group_by_variant(samples);

        let skipped = samples
            .iter()
            .filter(|s| !(is_log_plottable(s.oi) && is_log_plottable(s.gflops)))
            .count();
        if skipped > 0 {
            warn!("{skipped} sample(s) with non-positive oi or gflops cannot be drawn on log axes");
        }

        let ys = roofs
            .iter()
            .flat_map(|roof| [roof.start.1, roof.end.1])
            .chain(
                series
                    .iter()
                    .flat_map(|s| s.points.iter().copied())
                    .filter(|p| in_window(*p, x_range))
                    .map(|p| p.1),
            );
        let y_range = match ys.filter(|y| is_log_plottable(*y)).minmax() {
            MinMaxResult::NoElements => {
                return Err(RooflineError::render("no drawable y values"));
            }
            MinMaxResult::OneElement(y) => pad_log_range(y, y),
            MinMaxResult::MinMax(lo, hi) => pad_log_range(lo, hi),
        };

        debug!("Chart x range {x_range:?}, y range {y_range:?}");
        Ok(Self {
            pixel_size: settings.pixel_size(),
            settings,
            x_range,
            y_range,
            ridge_point: roofline.ridge_point(),
            roofs,
            series,
        })
    }

    fn is_visible(&self, point: (f64, f64)) -> bool {
        in_window(point, self.x_range)
    }

    /// Renders into memory and encodes as PNG with the chart's DPI recorded
    /// in the `pHYs` chunk, nothing touches the disk
    pub fn render_png(&self) -> Result<Vec<u8>, RooflineError> {
        let (width, height) = self.pixel_size;
        let mut buffer = vec![0u8; width as usize * height as usize * 3];
        self.draw(&mut buffer)?;

        let ppm = self.settings.pixels_per_meter();
        let mut encoded = Vec::new();
        let mut encoder = png::Encoder::new(&mut encoded, width, height);
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_pixel_dims(Some(png::PixelDimensions {
            xppu: ppm,
            yppu: ppm,
            unit: png::Unit::Meter,
        }));
        let mut writer = encoder.write_header().map_err(RooflineError::encode)?;
        writer
            .write_image_data(&buffer)
            .map_err(RooflineError::encode)?;
        writer.finish().map_err(RooflineError::encode)?;
        Ok(encoded)
    }

    fn draw(&self, buffer: &mut [u8]) -> Result<(), RooflineError> {
        let settings = &self.settings;
        let font = ("sans-serif", settings.points(settings.font_size) as f64);
        let marker = settings.points(settings.marker_radius);
        let line_width = settings.points(1.5);

        let root = BitMapBackend::with_buffer(buffer, self.pixel_size).into_drawing_area();
        root.fill(&WHITE).map_err(RooflineError::render)?;

        let mut chart = ChartBuilder::on(&root)
            .margin(settings.points(8.0))
            .x_label_area_size(settings.points(32.0))
            .y_label_area_size(settings.points(48.0))
            .build_cartesian_2d(
                (self.x_range.0..self.x_range.1).log_scale(),
                (self.y_range.0..self.y_range.1).log_scale(),
            )
            .map_err(RooflineError::render)?;

        chart
            .configure_mesh()
            .x_desc(X_DESC)
            .y_desc(Y_DESC)
            .bold_line_style(BLACK.mix(0.3))
            .light_line_style(BLACK.mix(0.1))
            .label_style(font.into_font())
            .axis_desc_style(font.into_font())
            .draw()
            .map_err(RooflineError::render)?;

        for roof in &self.roofs {
            let color = match roof.kind {
                RoofKind::Memory => PALETTE[0],
                RoofKind::Compute => PALETTE[1],
            };
            let style = color.stroke_width(line_width);
            chart
                .draw_series(DashedLineSeries::new(
                    vec![roof.start, roof.end],
                    settings.points(4.0),
                    settings.points(2.0),
                    style,
                ))
                .map_err(RooflineError::render)?
                .label(roof.label.clone())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));
        }

        for (idx, series) in self.series.iter().enumerate() {
            let color = PALETTE[(idx + self.roofs.len()) % PALETTE.len()];
            let points = series
                .points
                .iter()
                .copied()
                .filter(|p| self.is_visible(*p))
                .collect::<Vec<_>>();
            if points.len() < series.points.len() {
                debug!(
                    "{}: {} point(s) outside the visible window",
                    series.variant,
                    series.points.len() - points.len()
                );
            }
            chart
                .draw_series(
                    points
                        .into_iter()
                        .map(|p| Circle::new(p, marker, color.filled())),
                )
                .map_err(RooflineError::render)?
                .label(series.variant.clone())
                .legend(move |(x, y)| Circle::new((x + 10, y), marker, color.filled()));
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .label_font(font.into_font())
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(RooflineError::render)?;

        root.present().map_err(RooflineError::render)?;
        Ok(())
    }

    pub async fn write_metadata(&self, path: &Path) -> Result<(), RooflineError> {
        let mut json = serde_json::to_string_pretty(self).map_err(RooflineError::encode)?;
        json.push('\n');
        write_atomic(path, json.as_bytes()).await?;
        debug!("Wrote chart metadata to {path:?}");
        Ok(())
    }
}

/// Inside the fixed x window and drawable on log axes
fn in_window(point: (f64, f64), x_range: (f64, f64)) -> bool {
    let (x, y) = point;
    is_log_plottable(x) && is_log_plottable(y) && x >= x_range.0 && x <= x_range.1
}

fn pad_log_range(lo: f64, hi: f64) -> (f64, f64) {
    let (lo_exp, hi_exp) = (lo.log10(), hi.log10());
    // a single value still gets a decade around it
    let span = (hi_exp - lo_exp).max(1.0);
    (
        10f64.powf(lo_exp - span * Y_MARGIN),
        10f64.powf(hi_exp + span * Y_MARGIN),
    )
}

/// Loads both inputs, then renders the chart and replaces `output_path`.
/// Any load or render failure returns before the output is touched.
///
/// Arguments:
/// * `results_path` - Benchmark table with `variant`, `oi` and `gflops` columns
/// * `calibration_path` - Calibration JSON written by `write-calibration`
/// * `output_path` - Where the PNG goes, ie. results/roofline.png
pub async fn render_roofline(
    results_path: &Path,
    calibration_path: &Path,
    output_path: &Path,
    settings: ChartSettings,
) -> Result<RooflineChart, RooflineError> {
    let samples = load_results(results_path).await?;
    let calibration = Calibration::load(calibration_path).await?;

    let chart = RooflineChart::build(&calibration, &samples, settings)?;
    info!(
        "Ridge point at {:.3} FLOPs/byte, {} variant(s)",
        chart.ridge_point,
        chart.series.len()
    );

    let png = chart.render_png()?;
    write_atomic(output_path, &png).await?;
    Ok(chart)
}
