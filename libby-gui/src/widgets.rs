use egui::{Color32, Rounding, Stroke};
use libby_core::Book;

pub const OK_COLOR: Color32 = Color32::from_rgb(67, 160, 71);
pub const ERROR_COLOR: Color32 = Color32::from_rgb(229, 57, 53);
pub const ACCENT_COLOR: Color32 = Color32::from_rgb(0, 122, 204);

/// What the user clicked in a book row.
#[derive(Debug, Clone)]
pub enum RowAction {
    Open(Book),
    ToggleWishlist(Book),
}

pub fn book_row(ui: &mut egui::Ui, book: &Book, saved: bool) -> Option<RowAction> {
    let mut action = None;
    ui.group(|g| {
        g.vertical(|ui| {
            ui.horizontal(|ui| {
                ui.label(egui::RichText::new(&book.title).strong().size(16.0));
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let heart = if saved { "♥ Saved" } else { "♡ Save" };
                    if ui.small_button(heart).clicked() {
                        action = Some(RowAction::ToggleWishlist(book.clone()));
                    }
                    if ui.small_button("Details").clicked() {
                        action = Some(RowAction::Open(book.clone()));
                    }
                });
            });
            let mut meta = vec![book.display_author().to_string()];
            if let Some(genre) = &book.genre {
                meta.push(genre.clone());
            }
            if let Some(rating) = book.rating {
                meta.push(format!("★ {rating:.1}"));
            }
            ui.label(egui::RichText::new(meta.join(" · ")).weak().size(13.0));
        });
    });
    action
}

pub fn feedback_label(ui: &mut egui::Ui, feedback: &Option<(bool, String)>) {
    if let Some((ok, msg)) = feedback {
        let color = if *ok { OK_COLOR } else { ERROR_COLOR };
        ui.label(egui::RichText::new(msg.clone()).color(color).size(13.0));
    }
}

pub fn setup_dark_theme(ctx: &egui::Context) {
    let mut style = (*ctx.style()).clone();

    let bg_color = Color32::from_rgb(30, 30, 30);
    let panel_color = Color32::from_rgb(37, 37, 38);
    let border_color = Color32::from_rgb(62, 62, 66);
    let text_color = Color32::from_rgb(204, 204, 204);

    style.visuals.dark_mode = true;
    style.visuals.panel_fill = panel_color;
    style.visuals.window_fill = bg_color;
    style.visuals.override_text_color = Some(text_color);

    style.visuals.widgets.inactive.bg_fill = Color32::from_rgb(50, 50, 50);
    style.visuals.widgets.inactive.bg_stroke = Stroke::new(1.0, border_color);
    style.visuals.widgets.hovered.bg_stroke = Stroke::new(1.0, ACCENT_COLOR);
    style.visuals.widgets.active.bg_fill = ACCENT_COLOR;
    style.visuals.selection.bg_fill = Color32::from_rgba_unmultiplied(0, 122, 204, 60);
    style.visuals.selection.stroke = Stroke::new(1.0, ACCENT_COLOR);

    style.visuals.widgets.inactive.rounding = Rounding::same(3.0);
    style.visuals.widgets.hovered.rounding = Rounding::same(3.0);
    style.visuals.widgets.active.rounding = Rounding::same(3.0);

    style.spacing.item_spacing = egui::vec2(10.0, 8.0);
    style.spacing.button_padding = egui::vec2(10.0, 6.0);

    ctx.set_style(style);
}
