use eframe::egui::{ScrollArea, Ui};
use egui_extras::{Column as TableColumn, TableBuilder};

use crate::data::features::ChurnRisk;
use crate::data::model::DERIVED_HEADERS;
use crate::state::AppState;
use crate::ui::{panels, plot};

// ---------------------------------------------------------------------------
// Central panel: KPIs, charts, insights, export
// ---------------------------------------------------------------------------

/// Render the dashboard in the central panel.
pub fn central_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("📊 Bank Customer Churn Analysis Dashboard");
    ui.label("Interactive dashboard for customer churn analysis");
    ui.separator();

    if draw_report(ui, state) {
        panels::download_filtered(state);
    }
}

/// Draw everything derived from the current report.  Returns whether the
/// download button was clicked.
fn draw_report(ui: &mut Ui, state: &AppState) -> bool {
    let Some(report) = &state.report else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("No data loaded  (File → Open…)");
        });
        return false;
    };

    let mut download = false;
    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            plot::kpi_row(ui, report);
            ui.separator();

            ui.columns(2, |cols| {
                plot::churn_by_geography(&mut cols[0], report, &state.geography_colors);
                plot::churn_by_gender(&mut cols[1], report);
            });
            plot::age_histogram(ui, &report.age_histogram);
            plot::balance_box_plot(ui, &report.balance_by_status);
            ui.columns(2, |cols| {
                plot::churn_by_activity(&mut cols[0], report);
                plot::risk_segmentation(&mut cols[1], report);
            });

            ui.separator();
            ui.heading("🧠 Key Business Insights");
            if let Some(insights) = &state.insights {
                for line in &insights.lines {
                    ui.label(format!("• {line}"));
                }
            }

            ui.separator();
            ui.heading("⬇ Download Filtered Data");
            download = ui.button("⬇ Download CSV").clicked();

            ui.separator();
            ui.collapsing("Preview", |ui: &mut Ui| preview_table(ui, state));
        });
    download
}

/// The first visible records, with derived columns and risk tier.
fn preview_table(ui: &mut Ui, state: &AppState) {
    let Some(subset) = state.subset() else {
        return;
    };
    let table = subset.table();
    let rows = subset.len().min(state.config.preview_rows);
    let headers: Vec<&str> = table
        .schema
        .iter()
        .map(|c| c.header())
        .chain(DERIVED_HEADERS)
        .chain(["ChurnRisk"])
        .collect();

    if rows < subset.len() {
        ui.label(format!("Showing {rows} of {} rows", subset.len()));
    }

    TableBuilder::new(ui)
        .striped(true)
        .resizable(true)
        .max_scroll_height(300.0)
        .columns(TableColumn::auto(), headers.len())
        .header(20.0, |mut header| {
            for h in &headers {
                header.col(|ui| {
                    ui.strong(*h);
                });
            }
        })
        .body(|body| {
            body.rows(18.0, rows, |mut row| {
                let record = &table.records[subset.indices()[row.index()]];
                let cells = table
                    .schema
                    .iter()
                    .map(|&c| record.cell_text(c))
                    .chain(record.derived_text())
                    .chain([ChurnRisk::classify(record).to_string()]);
                for text in cells {
                    row.col(|ui| {
                        ui.label(text);
                    });
                }
            });
        });
}
