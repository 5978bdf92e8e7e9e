use crate::overlay::{self, OverlayError};
use crate::settings::{Settings, SETTINGS_FILE};
use crate::store::{
    add_warning, remove_warning, save_protected_apps, warning_texts, ProtectedApp,
    MAX_WARNING_TEXT_LEN,
};
use eframe::egui;

/// An app the user can place under protection. The launch field is what the
/// OS launcher resolves once the user allows through the overlay.
#[derive(Debug, Clone)]
pub struct CatalogApp {
    pub id: &'static str,
    pub name: &'static str,
    pub emoji: &'static str,
    pub launch: &'static str,
}

pub fn sample_catalog() -> Vec<CatalogApp> {
    vec![
        CatalogApp {
            id: "zomato",
            name: "Zomato",
            emoji: "🍕",
            launch: "https://www.zomato.com",
        },
        CatalogApp {
            id: "swiggy",
            name: "Swiggy",
            emoji: "🍽️",
            launch: "https://www.swiggy.com",
        },
        CatalogApp {
            id: "instagram",
            name: "Instagram",
            emoji: "📸",
            launch: "https://www.instagram.com",
        },
        CatalogApp {
            id: "youtube",
            name: "YouTube",
            emoji: "▶️",
            launch: "https://www.youtube.com",
        },
        CatalogApp {
            id: "tiktok",
            name: "TikTok",
            emoji: "❤️",
            launch: "https://www.tiktok.com",
        },
        CatalogApp {
            id: "netflix",
            name: "Netflix",
            emoji: "🎬",
            launch: "https://www.netflix.com",
        },
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HostView {
    Home,
    Settings,
}

pub struct HostApp {
    settings: Settings,
    settings_path: String,
    catalog: Vec<CatalogApp>,
    protected: Vec<ProtectedApp>,
    view: HostView,
    editing: Option<String>,
    new_warning: String,
    error: Option<String>,
    notice: Option<String>,
}

impl HostApp {
    pub fn new(settings: Settings, protected: Vec<ProtectedApp>) -> Self {
        Self {
            settings,
            settings_path: SETTINGS_FILE.to_string(),
            catalog: sample_catalog(),
            protected,
            view: HostView::Home,
            editing: None,
            new_warning: String::new(),
            error: None,
            notice: None,
        }
    }

    fn is_protected(&self, id: &str) -> bool {
        self.protected.iter().any(|a| a.id == id)
    }

    fn toggle_protection(&mut self, entry: &CatalogApp) {
        if let Some(pos) = self.protected.iter().position(|a| a.id == entry.id) {
            self.protected.remove(pos);
            if self.editing.as_deref() == Some(entry.id) {
                self.editing = None;
            }
        } else {
            self.protected.push(ProtectedApp {
                id: entry.id.to_string(),
                name: entry.name.to_string(),
                launch: entry.launch.to_string(),
                warnings: Vec::new(),
            });
        }
        self.persist();
    }

    fn persist(&mut self) {
        if let Err(err) = save_protected_apps(&self.settings.store_path, &self.protected) {
            tracing::error!(%err, "failed to save protected apps");
            self.error = Some(format!("Failed to save: {err}"));
        }
    }

    /// Run the warning sequence for a protected app. An app without warnings
    /// gets an inline notice instead (matching the editor prompt flow).
    fn run_with_warnings(&mut self, id: &str) {
        let Some(app) = self.protected.iter().find(|a| a.id == id) else {
            return;
        };
        let warnings = warning_texts(app);
        if warnings.is_empty() {
            self.notice = Some(format!(
                "No warnings configured for {}. Add warnings to display them.",
                app.name
            ));
            return;
        }
        let launch = app.launch.clone();
        match overlay::runtime().present(&launch, &warnings) {
            Ok(_) => {
                self.error = None;
                self.notice = None;
            }
            Err(OverlayError::NotPermitted) => {
                self.error = Some(
                    "Overlay permission required: allow the app to draw over other windows, \
                     then try again."
                        .to_string(),
                );
            }
            Err(err) => {
                self.error = Some(format!("Overlay failed: {err}"));
            }
        }
    }

    fn editor_ui(&mut self, ui: &mut egui::Ui, id: &str) {
        let Some(pos) = self.protected.iter().position(|a| a.id == id) else {
            return;
        };

        ui.separator();
        ui.heading(format!("Warnings for {}", self.protected[pos].name));

        let mut removed: Option<String> = None;
        for (idx, warning) in self.protected[pos].warnings.iter().enumerate() {
            ui.horizontal(|ui| {
                ui.label(format!("{}.", idx + 1));
                ui.label(&warning.text);
                if ui.small_button("🗑").clicked() {
                    removed = Some(warning.id.clone());
                }
            });
        }
        if let Some(warning_id) = removed {
            remove_warning(&mut self.protected[pos], &warning_id);
            self.persist();
        }

        ui.horizontal(|ui| {
            ui.text_edit_singleline(&mut self.new_warning);
            if ui.button("Add").clicked() {
                let text = self.new_warning.clone();
                match add_warning(&mut self.protected[pos], &text) {
                    Ok(()) => {
                        self.new_warning.clear();
                        self.notice = None;
                        self.persist();
                    }
                    Err(err) => self.notice = Some(err.to_string()),
                }
            }
        });
        ui.label(format!("Max {MAX_WARNING_TEXT_LEN} characters per warning."));
    }

    fn home_ui(&mut self, ui: &mut egui::Ui) {
        let catalog = self.catalog.clone();
        for entry in &catalog {
            let protected = self.is_protected(entry.id);
            ui.horizontal(|ui| {
                ui.label(format!("{} {}", entry.emoji, entry.name));
                if protected {
                    ui.colored_label(egui::Color32::from_rgb(0x34, 0xc7, 0x59), "Protected");
                }
                if ui
                    .button(if protected { "🛡 Unprotect" } else { "⭕ Protect" })
                    .clicked()
                {
                    self.toggle_protection(entry);
                }
                if protected {
                    if ui.button("✏ Edit").clicked() {
                        self.editing = Some(entry.id.to_string());
                        self.new_warning.clear();
                    }
                    if ui.button("▶ Run").clicked() {
                        self.run_with_warnings(entry.id);
                    }
                }
            });
        }

        if let Some(id) = self.editing.clone() {
            self.editor_ui(ui, &id);
        }
    }

    fn settings_ui(&mut self, ui: &mut egui::Ui) {
        let mut changed = false;
        changed |= ui
            .checkbox(&mut self.settings.debug_logging, "Debug logging")
            .changed();
        ui.label(format!("Store path: {}", self.settings.store_path));
        if let Some(log_file) = &self.settings.log_file {
            ui.label(format!("Log file: {log_file}"));
        }
        if changed {
            if let Err(err) = self.settings.save(&self.settings_path) {
                tracing::error!(%err, "failed to save settings");
                self.error = Some(format!("Failed to save settings: {err}"));
            }
        }
    }
}

impl eframe::App for HostApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Execute any allow/close decisions the overlay made since last frame.
        overlay::runtime().pump_events();

        egui::TopBottomPanel::top("nav").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.selectable_value(&mut self.view, HostView::Home, "Home");
                ui.selectable_value(&mut self.view, HostView::Settings, "Settings");
                if overlay::runtime().is_active() {
                    ui.colored_label(egui::Color32::YELLOW, "overlay active");
                }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("🛡 Warning Gate");
            if let Some(err) = &self.error {
                ui.colored_label(egui::Color32::RED, err);
            }
            if let Some(notice) = &self.notice {
                ui.colored_label(egui::Color32::LIGHT_BLUE, notice);
            }

            egui::ScrollArea::vertical().show(ui, |ui| match self.view {
                HostView::Home => self.home_ui(ui),
                HostView::Settings => self.settings_ui(ui),
            });
        });

        // Keep draining overlay intents even while the user is idle.
        ctx.request_repaint_after(std::time::Duration::from_millis(100));
    }
}
