use anyhow::Result;
use log::info;
use plotters::prelude::*;
use std::path::{Path, PathBuf};

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

fn color(index: usize) -> RGBColor {
    PALETTE[index % PALETTE.len()]
}

/// A named series of `(x, y)` points.
pub type Series2d = (String, Vec<(f64, f64)>);

/// Renders the stage charts as PNG files into one directory.
pub struct ChartRenderer {
    output_dir: PathBuf,
}

impl ChartRenderer {
    pub fn new(output_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(output_dir)?;
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
        })
    }

    /// One line with markers per series, x usually being the year.
    pub fn line_chart(
        &self,
        file_name: &str,
        title: &str,
        x_desc: &str,
        y_desc: &str,
        series: &[Series2d],
    ) -> Result<PathBuf> {
        let output_path = self.output_dir.join(file_name);
        let points: Vec<(f64, f64)> = series.iter().flat_map(|(_, p)| p.iter().copied()).collect();
        if points.is_empty() {
            return Ok(output_path);
        }
        let (x_range, y_range) = padded_ranges(&points);

        let root = BitMapBackend::new(&output_path, (1500, 1000)).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(title, ("sans-serif", 30).into_font())
            .margin(15)
            .x_label_area_size(50)
            .y_label_area_size(70)
            .build_cartesian_2d(x_range, y_range)?;

        chart
            .configure_mesh()
            .x_desc(x_desc)
            .y_desc(y_desc)
            .x_label_formatter(&|x| format!("{:.0}", x))
            .draw()?;

        for (i, (name, data)) in series.iter().enumerate() {
            let c = color(i);
            chart
                .draw_series(LineSeries::new(data.iter().copied(), c.stroke_width(2)))?
                .label(name.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 15, y)], &c));
            chart.draw_series(data.iter().map(|p| Circle::new(*p, 4, c.filled())))?;
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;

        root.present()?;
        info!("Chart saved to {}", output_path.display());
        Ok(output_path.clone())
    }

    /// Points coloured by group.
    pub fn scatter(
        &self,
        file_name: &str,
        title: &str,
        x_desc: &str,
        y_desc: &str,
        groups: &[Series2d],
    ) -> Result<PathBuf> {
        let output_path = self.output_dir.join(file_name);
        let points: Vec<(f64, f64)> = groups.iter().flat_map(|(_, p)| p.iter().copied()).collect();
        if points.is_empty() {
            return Ok(output_path);
        }
        let (x_range, y_range) = padded_ranges(&points);

        let root = BitMapBackend::new(&output_path, (1600, 1000)).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(title, ("sans-serif", 30).into_font())
            .margin(15)
            .x_label_area_size(50)
            .y_label_area_size(70)
            .build_cartesian_2d(x_range, y_range)?;

        chart.configure_mesh().x_desc(x_desc).y_desc(y_desc).draw()?;

        for (i, (name, data)) in groups.iter().enumerate() {
            let c = color(i);
            chart
                .draw_series(data.iter().map(|p| Circle::new(*p, 5, c.filled())))?
                .label(name.as_str())
                .legend(move |(x, y)| Circle::new((x + 5, y), 5, c.filled()));
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;

        root.present()?;
        info!("Chart saved to {}", output_path.display());
        Ok(output_path.clone())
    }

    /// Side by side bars: one cluster per label, one bar per series.
    pub fn grouped_bar(
        &self,
        file_name: &str,
        title: &str,
        y_desc: &str,
        labels: &[String],
        series: &[(String, Vec<Option<f64>>)],
    ) -> Result<PathBuf> {
        let output_path = self.output_dir.join(file_name);
        let max_val = series
            .iter()
            .flat_map(|(_, values)| values.iter().flatten())
            .fold(0.0f64, |acc, v| acc.max(*v));
        if labels.is_empty() || max_val <= 0.0 {
            return Ok(output_path);
        }

        let root = BitMapBackend::new(&output_path, (1600, 1000)).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(title, ("sans-serif", 28).into_font())
            .margin(15)
            .x_label_area_size(220)
            .y_label_area_size(70)
            .build_cartesian_2d(0f64..labels.len() as f64, 0f64..max_val * 1.1)?;

        chart
            .configure_mesh()
            .y_desc(y_desc)
            .x_labels(labels.len())
            .x_label_style(
                ("sans-serif", 11)
                    .into_font()
                    .transform(FontTransform::Rotate90),
            )
            .x_label_formatter(&|x| {
                labels
                    .get(x.floor() as usize)
                    .map(|l| l.trim().to_string())
                    .unwrap_or_default()
            })
            .draw()?;

        let width = 0.8 / series.len().max(1) as f64;
        for (s, (name, values)) in series.iter().enumerate() {
            let c = color(s);
            chart
                .draw_series(values.iter().enumerate().filter_map(|(i, v)| {
                    v.map(|v| {
                        let x0 = i as f64 + 0.1 + s as f64 * width;
                        Rectangle::new([(x0, 0.0), (x0 + width, v)], c.filled())
                    })
                }))?
                .label(name.as_str())
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], c.filled()));
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;

        root.present()?;
        info!("Chart saved to {}", output_path.display());
        Ok(output_path.clone())
    }

    /// Annotated grid of `values[row][col]`, blue for low and red for high.
    pub fn heatmap(
        &self,
        file_name: &str,
        title: &str,
        row_labels: &[String],
        col_labels: &[String],
        values: &[Vec<Option<f64>>],
    ) -> Result<PathBuf> {
        let output_path = self.output_dir.join(file_name);
        let present: Vec<f64> = values.iter().flat_map(|r| r.iter().flatten().copied()).collect();
        if present.is_empty() {
            return Ok(output_path);
        }
        let min = present.iter().copied().fold(f64::INFINITY, f64::min);
        let max = present.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let root = BitMapBackend::new(&output_path, (1500, 1000)).into_drawing_area();
        root.fill(&WHITE)?;

        let rows = row_labels.len() as f64;
        let mut chart = ChartBuilder::on(&root)
            .caption(title, ("sans-serif", 28).into_font())
            .margin(15)
            .x_label_area_size(50)
            .y_label_area_size(260)
            .build_cartesian_2d(0f64..col_labels.len() as f64, 0f64..rows)?;

        chart
            .configure_mesh()
            .disable_mesh()
            .x_labels(col_labels.len())
            .y_labels(row_labels.len())
            .x_label_formatter(&|x| {
                col_labels
                    .get(x.floor() as usize)
                    .cloned()
                    .unwrap_or_default()
            })
            .y_label_formatter(&|y| {
                // Row 0 is drawn at the top.
                let idx = rows - y.floor() - 1.0;
                if idx < 0.0 {
                    return String::new();
                }
                row_labels.get(idx as usize).cloned().unwrap_or_default()
            })
            .draw()?;

        let cells: Vec<(usize, usize, f64)> = values
            .iter()
            .enumerate()
            .flat_map(|(r, row)| {
                row.iter()
                    .enumerate()
                    .filter_map(move |(c, v)| v.map(|v| (r, c, v)))
            })
            .collect();

        chart.draw_series(cells.iter().map(|(r, c, v)| {
            let top = rows - *r as f64;
            Rectangle::new(
                [(*c as f64, top - 1.0), (*c as f64 + 1.0, top)],
                coolwarm(*v, min, max).filled(),
            )
        }))?;
        chart.draw_series(cells.iter().map(|(r, c, v)| {
            let top = rows - *r as f64;
            Text::new(
                format!("{:.2}", v),
                (*c as f64 + 0.3, top - 0.6),
                ("sans-serif", 12).into_font(),
            )
        }))?;

        root.present()?;
        info!("Chart saved to {}", output_path.display());
        Ok(output_path.clone())
    }
}

fn padded_ranges(points: &[(f64, f64)]) -> (std::ops::Range<f64>, std::ops::Range<f64>) {
    let (mut x0, mut x1, mut y0, mut y1) = (
        f64::INFINITY,
        f64::NEG_INFINITY,
        f64::INFINITY,
        f64::NEG_INFINITY,
    );
    for (x, y) in points {
        x0 = x0.min(*x);
        x1 = x1.max(*x);
        y0 = y0.min(*y);
        y1 = y1.max(*y);
    }
    let pad_x = ((x1 - x0) * 0.05).max(0.5);
    let pad_y = ((y1 - y0) * 0.1).max(1e-3 * y1.abs().max(1.0));
    ((x0 - pad_x)..(x1 + pad_x), (y0 - pad_y)..(y1 + pad_y))
}

/// Diverging blue-white-red colour for `value` within `[min, max]`.
fn coolwarm(value: f64, min: f64, max: f64) -> RGBColor {
    let t = if max > min { (value - min) / (max - min) } else { 0.5 };
    let lerp = |a: u8, b: u8, t: f64| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
    if t < 0.5 {
        let s = t / 0.5;
        RGBColor(lerp(59, 221, s), lerp(76, 221, s), lerp(192, 221, s))
    } else {
        let s = (t - 0.5) / 0.5;
        RGBColor(lerp(221, 180, s), lerp(221, 4, s), lerp(221, 38, s))
    }
}
