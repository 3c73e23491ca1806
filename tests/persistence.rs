use chrono::NaiveDate;
use futures::executor::block_on;
use pretty_assertions::assert_eq;

use planner_timeline::config::PlannerSettings;
use planner_timeline::io::milestones::MilestoneStore;
use planner_timeline::model::{MilestoneBook, NewTask, TaskPatch, ViewMode};
use planner_timeline::store::{MemoryTaskStore, TaskMutationPort};
use planner_timeline::PlannerState;

fn d(m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, m, day).unwrap()
}

#[test]
fn dragged_milestone_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let milestones = MilestoneStore::new(dir.path().join("milestones.json"));
    let settings = PlannerSettings {
        mode: ViewMode::Monthly,
        monthly_day_width: 20.0,
        ..Default::default()
    };

    let mut planner = PlannerState::new(&settings, milestones.load().unwrap(), d(1, 20)).unwrap();
    let id = planner.add_milestone("Design freeze", d(1, 5)).unwrap();
    planner.begin_milestone_drag(id, 85.0).unwrap();
    planner.drag_to(125.0);
    assert!(planner.end_drag().is_none());
    assert!(planner.take_milestones_dirty());
    milestones.save(planner.milestones()).unwrap();

    let reloaded = milestones.load().unwrap();
    let restarted = PlannerState::new(&settings, reloaded, d(1, 20)).unwrap();
    let milestone = restarted.milestones().get(id).unwrap();
    assert_eq!(milestone.name, "Design freeze");
    assert_eq!(milestone.date, "2025-01-07");
    assert_eq!(restarted.committed_layout().marker(id).unwrap().index, 6);
}

#[test]
fn missing_milestone_file_is_an_empty_book() {
    let dir = tempfile::tempdir().unwrap();
    let store = MilestoneStore::new(dir.path().join("nope.json"));
    assert_eq!(store.load().unwrap(), MilestoneBook::default());
}

#[test]
fn store_snapshot_is_reloaded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tasks.json");

    let store = MemoryTaskStore::open(&path).unwrap();
    let id = block_on(store.create(NewTask {
        title: "Kickoff".into(),
        start: d(2, 3),
        end: d(2, 4),
    }))
    .unwrap();
    block_on(store.update(id, TaskPatch::progress(40))).unwrap();
    drop(store);

    let reopened = MemoryTaskStore::open(&path).unwrap();
    let tasks = reopened.tasks();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id, id);
    assert_eq!(tasks[0].progress, 40);
    assert_eq!(tasks[0].date_span(), Some((d(2, 3), d(2, 4))));
}
