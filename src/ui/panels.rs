use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{Context, Result};
use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::data::export::{EXPORT_FILE_NAME, EXPORT_MIME};
use crate::data::filter::Predicate;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("🔍 Filter Customers");
    ui.separator();

    if state.table.is_none() {
        ui.label("No dataset loaded.");
        return;
    }

    // Work on a copy; the state is only touched when something changed.
    let options = state.options.clone();
    let mut filters = state.filters.clone();
    let mut bulk: Vec<(Predicate, bool)> = Vec::new();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            multiselect(
                ui,
                Predicate::Geography,
                &options.geographies,
                &mut filters.geography,
                &mut bulk,
                String::clone,
            );
            multiselect(
                ui,
                Predicate::Gender,
                &options.genders,
                &mut filters.gender,
                &mut bulk,
                String::clone,
            );
            age_range(ui, options.age_bounds, &mut filters.age_range);
            multiselect(
                ui,
                Predicate::ActiveMember,
                &options.active,
                &mut filters.active,
                &mut bulk,
                |b| String::from(if *b { "1 (Active)" } else { "0 (Inactive)" }),
            );
            multiselect(
                ui,
                Predicate::Products,
                &options.products,
                &mut filters.products,
                &mut bulk,
                u32::to_string,
            );
        });

    state.update_filters(|f| *f = filters);
    for (predicate, all) in bulk {
        if all {
            state.select_all(predicate);
        } else {
            state.select_none(predicate);
        }
    }
}

/// Checkbox list with All/None buttons; the buttons are queued in `bulk`.
fn multiselect<T: Ord + Clone>(
    ui: &mut Ui,
    predicate: Predicate,
    all_values: &BTreeSet<T>,
    selected: &mut BTreeSet<T>,
    bulk: &mut Vec<(Predicate, bool)>,
    label: impl Fn(&T) -> String,
) {
    let header_text = format!("{}  ({}/{})", predicate.label(), selected.len(), all_values.len());

    egui::CollapsingHeader::new(RichText::new(header_text).strong())
        .id_salt(predicate.label())
        .default_open(true)
        .show(ui, |ui: &mut Ui| {
            ui.horizontal(|ui: &mut Ui| {
                if ui.small_button("All").clicked() {
                    bulk.push((predicate, true));
                }
                if ui.small_button("None").clicked() {
                    bulk.push((predicate, false));
                }
            });

            for val in all_values {
                let mut checked = selected.contains(val);
                if ui.checkbox(&mut checked, label(val)).changed() {
                    if checked {
                        selected.insert(val.clone());
                    } else {
                        selected.remove(val);
                    }
                }
            }
        });
}

fn age_range(ui: &mut Ui, bounds: Option<(u32, u32)>, range: &mut (u32, u32)) {
    let Some((min, max)) = bounds else {
        return;
    };
    egui::CollapsingHeader::new(RichText::new(Predicate::AgeRange.label()).strong())
        .default_open(true)
        .show(ui, |ui: &mut Ui| {
            // Sliders clamp into the observed bounds, so a cleared range
            // would snap back to the youngest age.
            if range.0 > range.1 {
                ui.label("No ages selected.");
                if ui.small_button("All").clicked() {
                    *range = (min, max);
                }
                return;
            }
            ui.add(egui::Slider::new(&mut range.0, min..=max).text("from"));
            ui.add(egui::Slider::new(&mut range.1, min..=max).text("to"));
            if range.0 > range.1 {
                range.1 = range.0;
            }
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            if ui.button("Reload").clicked() {
                state.reload();
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(table) = &state.table {
            ui.label(format!(
                "{} customers loaded, {} visible",
                table.len(),
                state.visible_indices.len()
            ));
        }

        ui.separator();

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        } else if let Some(msg) = &state.notice {
            ui.label(msg);
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open churn data")
        .add_filter("Supported files", &["csv", "json", "parquet", "pq"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        state.notice = None;
        state.open(path);
    }
}

/// Save the visible records through a file dialog and report the outcome.
pub fn download_filtered(state: &mut AppState) {
    match save_export(state) {
        Ok(Some(path)) => {
            log::info!("Exported {} rows to {}", state.visible_indices.len(), path.display());
            state.notice = Some(format!("Saved {}", path.display()));
        }
        Ok(None) => {}
        Err(e) => {
            log::error!("Export failed: {e:#}");
            state.status_message = Some(format!("Error: {e:#}"));
        }
    }
}

/// Ask for a target path and write the export there.  `Ok(None)` when there
/// is nothing to export or the dialog was cancelled.
fn save_export(state: &AppState) -> Result<Option<PathBuf>> {
    let Some(bytes) = state.export_csv() else {
        return Ok(None);
    };
    let bytes = bytes.context("encoding filtered data")?;

    let Some(path) = rfd::FileDialog::new()
        .set_title("Download filtered data")
        .set_file_name(EXPORT_FILE_NAME)
        .add_filter(format!("CSV ({EXPORT_MIME})"), &["csv"])
        .save_file()
    else {
        return Ok(None);
    };

    std::fs::write(&path, bytes).with_context(|| format!("writing {}", path.display()))?;
    Ok(Some(path))
}
