#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod app;
mod ui;

use planner_timeline::config::{settings_path, PlannerSettings};
use planner_timeline::io::milestones::MilestoneStore;
use planner_timeline::logging::init_logging;
use planner_timeline::model::MilestoneBook;
use planner_timeline::store::MemoryTaskStore;
use planner_timeline::PlannerState;
use tracing::{error, info, warn};

fn main() -> eframe::Result<()> {
    let settings = PlannerSettings::load_or_default(&settings_path());
    init_logging(&settings.log_level);

    let store_path = settings.resolved_store_path();
    let store = match MemoryTaskStore::open(&store_path) {
        Ok(store) => store,
        Err(e) => {
            error!(%e, "could not open task store, starting with an empty in-memory list");
            MemoryTaskStore::new(Vec::new())
        }
    };
    store.set_read_only(settings.read_only);

    let milestone_store = MilestoneStore::default_location();
    let milestones = milestone_store.load().unwrap_or_else(|e| {
        warn!(%e, "could not load milestones");
        MilestoneBook::default()
    });

    let today = chrono::Local::now().date_naive();
    let (settings, planner) = match PlannerState::new(&settings, milestones.clone(), today) {
        Ok(planner) => (settings, planner),
        Err(e) => {
            warn!(%e, "invalid timeline settings, using defaults");
            let fallback = PlannerSettings {
                read_only: settings.read_only,
                ..PlannerSettings::default()
            };
            match PlannerState::new(&fallback, milestones, today) {
                Ok(planner) => (fallback, planner),
                Err(e) => {
                    error!(%e, "default timeline settings are invalid");
                    std::process::exit(1);
                }
            }
        }
    };
    info!(store = %store_path.display(), read_only = settings.read_only, "starting planner");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_min_inner_size([800.0, 400.0])
            .with_title("Planner Timeline"),
        ..Default::default()
    };

    eframe::run_native(
        "Planner Timeline",
        options,
        Box::new(move |cc| {
            Ok(Box::new(app::PlannerApp::new(
                cc,
                planner,
                store,
                milestone_store,
            )))
        }),
    )
}
