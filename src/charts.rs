#![cfg(feature = "client")]
use crate::error::{Result, VisualizerError};
use crate::summary::Summary;
use plotters::prelude::*;
use std::path::{Path, PathBuf};

/// Configuration options for chart generation
#[derive(Clone, Debug)]
pub struct ChartOptions {
    /// Title displayed at the top of the chart
    pub title: String,

    /// Label for the X-axis
    pub x_label: String,

    /// Label for the Y-axis
    pub y_label: String,

    /// Width of the chart in pixels
    pub width: u32,

    /// Height of the chart in pixels
    pub height: u32,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            title: "Chart".to_string(),
            x_label: String::new(),
            y_label: String::new(),
            width: 800,
            height: 600,
        }
    }
}

/// Bars for the averages chart
///
/// Columns whose mean is undefined are left out rather than drawn as zero.
pub fn average_bars(summary: &Summary) -> Vec<(String, f64)> {
    summary
        .averages
        .iter()
        .filter_map(|(column, mean)| mean.map(|m| (column.clone(), m)))
        .collect()
}

/// Bars for the equipment type distribution chart, largest first
pub fn distribution_bars(summary: &Summary) -> Vec<(String, f64)> {
    let mut bars: Vec<(String, f64)> = summary
        .type_distribution
        .iter()
        .map(|(kind, count)| {
            let label = if kind.is_empty() { "(blank)" } else { kind.as_str() };
            (label.to_string(), *count as f64)
        })
        .collect();
    bars.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    bars
}

/// Render the averages of a summary as a PNG bar chart
pub fn averages_chart(summary: &Summary) -> Result<Vec<u8>> {
    let options = ChartOptions {
        title: "Average Parameters".to_string(),
        x_label: "Parameter".to_string(),
        y_label: "Mean".to_string(),
        ..ChartOptions::default()
    };
    render_bar_chart(&average_bars(summary), &options)
}

/// Render the type distribution of a summary as a PNG bar chart
pub fn distribution_chart(summary: &Summary) -> Result<Vec<u8>> {
    let options = ChartOptions {
        title: "Equipment Type Distribution".to_string(),
        x_label: "Type".to_string(),
        y_label: "Count".to_string(),
        ..ChartOptions::default()
    };
    render_bar_chart(&distribution_bars(summary), &options)
}

/// Write both charts of a summary into `dir`
///
/// # Returns
/// * `Result<Vec<PathBuf>>` - Paths of the written PNG files
pub fn write_charts(summary: &Summary, dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    for (name, png) in [
        ("averages.png", averages_chart(summary)?),
        ("type_distribution.png", distribution_chart(summary)?),
    ] {
        let path = dir.join(name);
        std::fs::write(&path, png)?;
        written.push(path);
    }

    Ok(written)
}

/// Creates a bar chart from labelled values
///
/// # Implementation Notes
/// * Draws into a temporary PNG file before reading it back
/// * The y-axis leaves headroom above the tallest bar
fn render_bar_chart(bars: &[(String, f64)], options: &ChartOptions) -> Result<Vec<u8>> {
    if bars.is_empty() {
        return Err(VisualizerError::Report(format!(
            "nothing to plot for {}",
            options.title
        )));
    }
    draw_bars(bars, options).map_err(|e| VisualizerError::Report(e.to_string()))
}

fn draw_bars(
    bars: &[(String, f64)],
    options: &ChartOptions,
) -> std::result::Result<Vec<u8>, Box<dyn std::error::Error>> {
    let file = tempfile::Builder::new().suffix(".png").tempfile()?;
    {
        let root =
            BitMapBackend::new(file.path(), (options.width, options.height)).into_drawing_area();
        root.fill(&WHITE)?;

        let max_y = bars.iter().map(|(_, v)| *v).fold(0.0_f64, f64::max);
        let y_top = if max_y > 0.0 { max_y * 1.15 } else { 1.0 };

        let mut chart = ChartBuilder::on(&root)
            .caption(&options.title, ("sans-serif", 30).into_font())
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d((0..bars.len() as i32).into_segmented(), 0.0..y_top)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_desc(&options.x_label)
            .y_desc(&options.y_label)
            .x_labels(bars.len())
            .x_label_formatter(&|x| match x {
                SegmentValue::CenterOf(i) => bars
                    .get(*i as usize)
                    .map(|(label, _)| label.clone())
                    .unwrap_or_default(),
                _ => String::new(),
            })
            .draw()?;

        chart.draw_series(
            Histogram::vertical(&chart)
                .style(BLUE.filled())
                .margin(10)
                .data(bars.iter().enumerate().map(|(i, (_, v))| (i as i32, *v))),
        )?;

        root.present()?;
    }

    Ok(std::fs::read(file.path())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn summary() -> Summary {
        Summary {
            total_count: 4,
            averages: BTreeMap::from([
                ("Flowrate".to_string(), Some(15.0)),
                ("Pressure".to_string(), None),
                ("Temperature".to_string(), Some(75.0)),
            ]),
            type_distribution: BTreeMap::from([
                ("Pump".to_string(), 1),
                ("Valve".to_string(), 2),
                (String::new(), 1),
            ]),
        }
    }

    #[test]
    fn undefined_means_are_not_plotted() {
        let bars = average_bars(&summary());
        assert_eq!(
            bars,
            vec![("Flowrate".to_string(), 15.0), ("Temperature".to_string(), 75.0)]
        );
    }

    #[test]
    fn distribution_is_sorted_by_count() {
        let bars = distribution_bars(&summary());
        assert_eq!(bars[0], ("Valve".to_string(), 2.0));
        assert_eq!(bars[1], ("(blank)".to_string(), 1.0));
        assert_eq!(bars[2], ("Pump".to_string(), 1.0));
    }

    #[test]
    fn charts_are_written_as_png_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let written = write_charts(&summary(), dir.path()).unwrap();

        assert_eq!(
            written,
            vec![
                dir.path().join("averages.png"),
                dir.path().join("type_distribution.png"),
            ]
        );
        for path in &written {
            let bytes = std::fs::read(path).unwrap();
            assert!(bytes.starts_with(&[0x89, b'P', b'N', b'G']));
        }
    }

    #[test]
    fn empty_chart_is_an_error() {
        let mut empty = summary();
        empty.averages.values_mut().for_each(|v| *v = None);
        assert!(matches!(
            averages_chart(&empty),
            Err(VisualizerError::Report(_))
        ));
    }
}
