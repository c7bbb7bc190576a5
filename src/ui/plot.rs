use std::collections::BTreeMap;
use std::f64::consts::TAU;

use eframe::egui::{Color32, RichText, Stroke, Ui};
use egui_plot::{
    Bar, BarChart, BoxElem, BoxPlot, BoxSpread, GridMark, Legend, Plot, PlotPoint, Points,
    Polygon, Text,
};

use crate::color::{risk_color, status_color, ColorMap};
use crate::data::features::ChurnStatus;
use crate::data::stats::{AgeHistogram, BoxSummary, DashboardReport};

const CHART_HEIGHT: f32 = 260.0;

// ---------------------------------------------------------------------------
// KPI cards
// ---------------------------------------------------------------------------

/// The four headline numbers in a row.
pub fn kpi_row(ui: &mut Ui, report: &DashboardReport) {
    let kpis = &report.kpis;
    let avg = kpis
        .mean_balance
        .map(thousands)
        .unwrap_or_else(|| "–".to_string());

    ui.columns(4, |cols| {
        kpi(&mut cols[0], "Total Customers", kpis.total.to_string());
        kpi(&mut cols[1], "Churned Customers", kpis.churned.to_string());
        kpi(&mut cols[2], "Churn Rate (%)", format!("{:.2}%", kpis.churn_rate));
        kpi(&mut cols[3], "Avg Account Balance", avg);
    });
}

fn kpi(ui: &mut Ui, label: &str, value: String) {
    ui.group(|ui: &mut Ui| {
        ui.label(label);
        ui.label(RichText::new(value).size(24.0).strong());
    });
}

/// `1234567.891` → `"1,234,567.89"`.
pub fn thousands(v: f64) -> String {
    let text = format!("{:.2}", v.abs());
    let (int, frac) = text.split_once('.').unwrap_or((text.as_str(), "00"));
    let mut grouped = String::with_capacity(int.len() + int.len() / 3);
    for (i, ch) in int.chars().enumerate() {
        if i > 0 && (int.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if v < 0.0 { "-" } else { "" };
    format!("{sign}{grouped}.{frac}")
}

// ---------------------------------------------------------------------------
// Charts
// ---------------------------------------------------------------------------

/// Bar chart over named categories placed at x = 0, 1, 2, …
fn category_bars(
    ui: &mut Ui,
    id: &str,
    y_label: &str,
    entries: Vec<(String, f64, Color32)>,
) {
    let labels: Vec<String> = entries.iter().map(|(l, _, _)| l.clone()).collect();
    let bars: Vec<Bar> = entries
        .into_iter()
        .enumerate()
        .map(|(i, (label, value, color))| {
            Bar::new(i as f64, value).name(label).fill(color).width(0.6)
        })
        .collect();

    Plot::new(id)
        .height(CHART_HEIGHT)
        .y_axis_label(y_label)
        .x_axis_formatter(move |mark: GridMark, _range| category_label(&labels, mark.value))
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars));
        });
}

fn category_label(labels: &[String], value: f64) -> String {
    let idx = value.round();
    if (value - idx).abs() > 1e-6 || idx < 0.0 {
        return String::new();
    }
    labels.get(idx as usize).cloned().unwrap_or_default()
}

pub fn churn_by_geography(ui: &mut Ui, report: &DashboardReport, colors: &ColorMap) {
    ui.strong("Churn Rate by Geography (%)");
    let entries = report
        .churn_by_geography
        .iter()
        .map(|(geo, rate)| (geo.clone(), *rate, colors.color_for(geo)))
        .collect();
    category_bars(ui, "geo_churn", "Churn Rate (%)", entries);
}

/// Pie of the gender churn rates as shares of their sum.
pub fn churn_by_gender(ui: &mut Ui, report: &DashboardReport) {
    ui.strong("Churn by Gender (%)");
    let shares = report.gender_shares();
    let colors = ColorMap::new(shares.keys().cloned());

    Plot::new("gender_churn")
        .height(CHART_HEIGHT)
        .data_aspect(1.0)
        .legend(Legend::default())
        .show_axes([false, false])
        .show_grid(false)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            let mut start: f64 = 0.0;
            for (gender, share) in &shares {
                let sweep = share / 100.0 * TAU;
                if sweep <= 0.0 {
                    continue;
                }
                let color = colors.color_for(gender);
                for wedge in wedges(start, sweep) {
                    plot_ui.polygon(
                        Polygon::new(wedge)
                            .name(gender)
                            .fill_color(color)
                            .stroke(Stroke::new(1.0, Color32::WHITE)),
                    );
                }
                let mid = start + sweep / 2.0;
                plot_ui.text(Text::new(
                    PlotPoint::new(0.6 * mid.cos(), 0.6 * mid.sin()),
                    RichText::new(format!("{share:.1}%")).color(Color32::WHITE).strong(),
                ));
                start += sweep;
            }
        });
}

/// Split a pie slice into convex pieces of at most a quarter turn.
fn wedges(start: f64, sweep: f64) -> Vec<Vec<[f64; 2]>> {
    let pieces = (sweep / (TAU / 4.0)).ceil().max(1.0) as usize;
    let step = sweep / pieces as f64;
    (0..pieces)
        .map(|p| {
            let a0 = start + p as f64 * step;
            let mut points = vec![[0.0, 0.0]];
            points.extend((0..=16).map(|k| {
                let a = a0 + step * k as f64 / 16.0;
                [a.cos(), a.sin()]
            }));
            points
        })
        .collect()
}

/// Age distribution, stacked by churn status.
pub fn age_histogram(ui: &mut Ui, hist: &AgeHistogram) {
    ui.strong("Age vs Churn Distribution");
    let (Some(width), Some(&lo)) = (hist.bin_width(), hist.edges.first()) else {
        ui.label("No customers match the current filters.");
        return;
    };

    let mut charts: Vec<BarChart> = Vec::new();
    for (status, counts) in &hist.counts {
        let bars = counts
            .iter()
            .enumerate()
            .map(|(i, &n)| Bar::new(lo + (i as f64 + 0.5) * width, n as f64).width(width))
            .collect();
        let below: Vec<&BarChart> = charts.iter().collect();
        let chart = BarChart::new(bars)
            .name(status.label())
            .color(status_color(*status))
            .stack_on(&below);
        charts.push(chart);
    }

    Plot::new("age_hist")
        .height(CHART_HEIGHT)
        .legend(Legend::default())
        .x_axis_label("Age")
        .y_axis_label("count")
        .show(ui, |plot_ui| {
            for chart in charts {
                plot_ui.bar_chart(chart);
            }
        });
}

/// Balance spread per churn status, with outliers as points.
pub fn balance_box_plot(ui: &mut Ui, summaries: &BTreeMap<ChurnStatus, BoxSummary>) {
    ui.strong("Balance vs Churn");
    let labels: Vec<String> = summaries.keys().map(|s| s.label().to_string()).collect();

    Plot::new("balance_box")
        .height(CHART_HEIGHT)
        .y_axis_label("Balance")
        .x_axis_formatter(move |mark: GridMark, _range| category_label(&labels, mark.value))
        .show(ui, |plot_ui| {
            for (i, (status, s)) in summaries.iter().enumerate() {
                let color = status_color(*status);
                let x = i as f64;
                let spread = BoxSpread::new(s.lower_whisker, s.q1, s.median, s.q3, s.upper_whisker);
                plot_ui.box_plot(
                    BoxPlot::new(vec![BoxElem::new(x, spread)
                        .name(status.label())
                        .fill(color.gamma_multiply(0.4))
                        .stroke(Stroke::new(1.5, color))
                        .box_width(0.5)])
                    .name(status.label()),
                );
                if !s.outliers.is_empty() {
                    let points: Vec<[f64; 2]> = s.outliers.iter().map(|&v| [x, v]).collect();
                    plot_ui.points(Points::new(points).color(color).radius(2.0));
                }
            }
        });
}

pub fn churn_by_activity(ui: &mut Ui, report: &DashboardReport) {
    ui.strong("Churn: Active vs Inactive Members");
    let palette = ColorMap::new(report.churn_by_activity.keys().map(|a| a.to_string()));
    let entries = report
        .churn_by_activity
        .iter()
        .map(|(activity, rate)| {
            let label = activity.to_string();
            let color = palette.color_for(&label);
            (label, *rate, color)
        })
        .collect();
    category_bars(ui, "active_churn", "Churn Rate (%)", entries);
}

pub fn risk_segmentation(ui: &mut Ui, report: &DashboardReport) {
    ui.strong("Customer Churn Risk Segmentation");
    let entries = report
        .risk_counts
        .iter()
        .map(|(risk, n)| (risk.label().to_string(), *n as f64, risk_color(*risk)))
        .collect();
    category_bars(ui, "risk_counts", "Customers", entries);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thousands_separators() {
        assert_eq!(thousands(0.0), "0.00");
        assert_eq!(thousands(999.5), "999.50");
        assert_eq!(thousands(76485.889), "76,485.89");
        assert_eq!(thousands(1234567.0), "1,234,567.00");
        assert_eq!(thousands(-1000.0), "-1,000.00");
    }

    #[test]
    fn category_labels_only_on_integer_marks() {
        let labels = vec!["France".to_string(), "Spain".to_string()];
        assert_eq!(category_label(&labels, 1.0), "Spain");
        assert_eq!(category_label(&labels, 0.5), "");
        assert_eq!(category_label(&labels, 2.0), "");
        assert_eq!(category_label(&labels, -1.0), "");
    }

    #[test]
    fn wedges_cover_the_sweep() {
        let pieces = wedges(0.0, TAU * 0.7);
        assert_eq!(pieces.len(), 3);
        let last = pieces.last().unwrap().last().unwrap();
        assert!((last[0] - (TAU * 0.7).cos()).abs() < 1e-9);
        assert!((last[1] - (TAU * 0.7).sin()).abs() < 1e-9);
    }
}
