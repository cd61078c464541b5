//! SVG histogram of OSD utilization.
//!
//! Output is a pure function of its inputs so the rendered document can be
//! snapshot-compared byte for byte. plotters is built without a font backend,
//! so text layout never depends on the fonts installed on the host.

use crate::cluster::{ClusterStats, Device};
use crate::config::{DEFAULT_BUCKET_WIDTH, DEFAULT_NEW_DEVICE_THRESHOLD, MIN_BUCKET_WIDTH};
use anyhow::Result;
use plotters::prelude::*;
use plotters::coord::types::RangedCoordf64;
use std::collections::BTreeMap;

const SIZE: (u32, u32) = (900, 420);

const PALETTE: [RGBColor; 8] = [
    RGBColor(0x1f, 0x77, 0xb4),
    RGBColor(0xff, 0x7f, 0x0e),
    RGBColor(0x2c, 0xa0, 0x2c),
    RGBColor(0xd6, 0x27, 0x28),
    RGBColor(0x94, 0x67, 0xbd),
    RGBColor(0x8c, 0x56, 0x4b),
    RGBColor(0xe3, 0x77, 0xc2),
    RGBColor(0x17, 0xbe, 0xcf),
];

const HATCH: RGBColor = RGBColor(0x44, 0x44, 0x44);

/// Series key used for freshly added devices.
const NEW_SERIES: &str = "new";

#[derive(Debug, Clone, PartialEq)]
pub struct HistogramOptions {
    pub title: String,
    /// Bucket width in utilization percent.
    pub bucket_width: f64,
    pub new_device_threshold: f64,
}

impl Default for HistogramOptions {
    fn default() -> Self {
        Self {
            title: "OSD utilization".to_string(),
            bucket_width: DEFAULT_BUCKET_WIDTH,
            new_device_threshold: DEFAULT_NEW_DEVICE_THRESHOLD,
        }
    }
}

/// Per-series device counts for each bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Buckets {
    pub count: usize,
    /// Series name -> count per bucket. New devices live under [`NEW_SERIES`].
    pub series: BTreeMap<String, Vec<u32>>,
}

impl Buckets {
    pub(crate) fn stacked_max(&self) -> u32 {
        (0..self.count)
            .map(|i| self.series.values().map(|counts| counts[i]).sum::<u32>())
            .max()
            .unwrap_or(0)
    }
}

pub(crate) fn bucket_count(bucket_width: f64) -> usize {
    ((100.0 / bucket_width.max(MIN_BUCKET_WIDTH)).ceil() as usize).max(1)
}

/// Index of the bucket a utilization fraction falls into. 100% lands in the last one.
pub(crate) fn bucket_index(utilization: f64, bucket_width: f64) -> usize {
    let width = bucket_width.max(MIN_BUCKET_WIDTH);
    let last = bucket_count(width) - 1;
    let idx = (utilization.clamp(0.0, 1.0) * 100.0 / width).floor() as usize;
    idx.min(last)
}

pub(crate) fn bucketize(devices: &[Device], options: &HistogramOptions) -> Buckets {
    let count = bucket_count(options.bucket_width);
    let mut series: BTreeMap<String, Vec<u32>> = BTreeMap::new();

    for device in devices {
        let key = if device.is_new(options.new_device_threshold) {
            NEW_SERIES.to_string()
        } else {
            device.device_class.clone()
        };
        let counts = series.entry(key).or_insert_with(|| vec![0; count]);
        counts[bucket_index(device.utilization(), options.bucket_width)] += 1;
    }

    Buckets { count, series }
}

/// One stacked bar segment in data coordinates: `(left, right, base, top)`.
pub(crate) type Segment = (f64, f64, f64, f64);

/// Stack every series on top of the previous ones, bucket by bucket.
pub(crate) fn stack_segments(buckets: &Buckets, bucket_width: f64) -> Vec<(&str, Vec<Segment>)> {
    let width = bucket_width.max(MIN_BUCKET_WIDTH);
    let mut stacked = vec![0u32; buckets.count];

    buckets
        .series
        .iter()
        .map(|(name, counts)| {
            let segments = counts
                .iter()
                .enumerate()
                .filter(|(_, count)| **count > 0)
                .map(|(i, &count)| {
                    let base = f64::from(stacked[i]);
                    stacked[i] += count;
                    let left = i as f64 * width;
                    (left, (left + width).min(100.0), base, base + f64::from(count))
                })
                .collect();
            (name.as_str(), segments)
        })
        .collect()
}

/// Render the utilization histogram as a standalone SVG document.
pub fn render_svg(
    devices: &[Device],
    stats: &ClusterStats,
    options: &HistogramOptions,
) -> Result<String> {
    let buckets = bucketize(devices, options);
    let y_max = f64::from(buckets.stacked_max().max(1)) * 1.1;
    let mean_pct = stats.mean_utilization * 100.0;
    let std_pct = stats.stddev_utilization * 100.0;

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, SIZE).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(&options.title, ("sans-serif", 18))
            .margin(12)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(0.0..100.0, 0.0..y_max)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(11)
            .x_label_formatter(&|v| format!("{v:.0}"))
            .y_label_formatter(&|v| format!("{v:.0}"))
            .x_desc("Utilization %")
            .y_desc("# of OSDs")
            .draw()?;

        // Mean +/- one stddev band sits behind the bars.
        let band = ((mean_pct - std_pct).max(0.0), (mean_pct + std_pct).min(100.0));
        chart.draw_series(std::iter::once(Rectangle::new(
            [(band.0, 0.0), (band.1, y_max)],
            BLACK.mix(0.08).filled(),
        )))?;

        let mut color_idx = 0usize;
        for (name, segments) in stack_segments(&buckets, options.bucket_width) {
            if name == NEW_SERIES {
                draw_hatched(&mut chart, &segments)?;
                continue;
            }

            let color = PALETTE[color_idx % PALETTE.len()];
            color_idx += 1;
            chart
                .draw_series(segments.iter().map(|&(left, right, base, top)| {
                    Rectangle::new([(left, base), (right, top)], color.filled())
                }))?
                .label(name)
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
        }

        chart
            .draw_series(LineSeries::new([(mean_pct, 0.0), (mean_pct, y_max)], BLACK.stroke_width(2)))?
            .label(format!("mean {mean_pct:.2}% (sd {std_pct:.2})"))
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 10, y)], BLACK.stroke_width(2)));

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;

        root.present()?;
    }

    Ok(svg)
}

/// Freshly added devices: outlined bars with one diagonal stroke per device.
fn draw_hatched<DB: DrawingBackend>(
    chart: &mut ChartContext<'_, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>,
    segments: &[Segment],
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    chart
        .draw_series(segments.iter().map(|&(left, right, base, top)| {
            Rectangle::new([(left, base), (right, top)], HATCH.stroke_width(1))
        }))?
        .label(NEW_SERIES)
        .legend(|(x, y)| PathElement::new(vec![(x, y + 5), (x + 10, y - 5)], HATCH));

    chart.draw_series(segments.iter().flat_map(|&(left, right, base, top)| {
        let mut strokes = Vec::new();
        let mut level = base;
        while level < top {
            let next = (level + 1.0).min(top);
            strokes.push(PathElement::new(vec![(left, level), (right, next)], HATCH));
            level = next;
        }
        strokes
    }))?;

    Ok(())
}
