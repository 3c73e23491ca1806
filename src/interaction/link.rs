//! Two-click dependency drawing.
//!
//! A link is drawn from a bar's end handle (where the prerequisite finishes)
//! to another bar's start handle (where the dependent begins). Anything else
//! while linking cancels.

use tracing::debug;

use crate::model::{Point, Task, TaskId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleSide {
    Start,
    End,
}

/// A click on one of a bar's dependency handles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandleHit {
    pub task_id: TaskId,
    pub side: HandleSide,
    /// Centre of the clicked handle, for the rubber band.
    pub anchor: Point,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DependencyEdge {
    pub prerequisite: TaskId,
    pub dependent: TaskId,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum LinkingState {
    #[default]
    Idle,
    Linking {
        from_task_id: TaskId,
        from_side: HandleSide,
        anchor: Point,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LinkEvent {
    Click(HandleHit),
    Escape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEffect {
    /// Nothing happened.
    Ignored,
    Started,
    Cancelled,
    /// Write this edge through the mutation port.
    Commit(DependencyEdge),
}

/// The bare state machine. Knows nothing about the task graph.
pub fn transition(state: LinkingState, event: LinkEvent) -> (LinkingState, LinkEffect) {
    match (state, event) {
        (LinkingState::Idle, LinkEvent::Escape) => (LinkingState::Idle, LinkEffect::Ignored),
        (LinkingState::Idle, LinkEvent::Click(hit)) => match hit.side {
            HandleSide::Start => (LinkingState::Idle, LinkEffect::Ignored),
            HandleSide::End => (
                LinkingState::Linking {
                    from_task_id: hit.task_id,
                    from_side: hit.side,
                    anchor: hit.anchor,
                },
                LinkEffect::Started,
            ),
        },
        (LinkingState::Linking { .. }, LinkEvent::Escape) => {
            (LinkingState::Idle, LinkEffect::Cancelled)
        }
        (LinkingState::Linking { from_task_id, .. }, LinkEvent::Click(hit)) => {
            if hit.side == HandleSide::End || hit.task_id == from_task_id {
                (LinkingState::Idle, LinkEffect::Cancelled)
            } else {
                (
                    LinkingState::Idle,
                    LinkEffect::Commit(DependencyEdge {
                        prerequisite: from_task_id,
                        dependent: hit.task_id,
                    }),
                )
            }
        }
    }
}

/// Link mode plus the rubber band that follows the pointer.
#[derive(Debug, Clone, Default)]
pub struct DependencyLinkController {
    state: LinkingState,
    pointer: Option<Point>,
}

impl DependencyLinkController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LinkingState {
        self.state
    }

    pub fn is_linking(&self) -> bool {
        matches!(self.state, LinkingState::Linking { .. })
    }

    /// Handle a click on a dependency handle.
    ///
    /// Edges the graph already has are dropped here, so a `Commit` always
    /// names a new, non-self edge.
    pub fn click(&mut self, hit: HandleHit, tasks: &[Task]) -> LinkEffect {
        let (next, effect) = transition(self.state, LinkEvent::Click(hit));
        self.set_state(next);
        match effect {
            LinkEffect::Commit(edge) => {
                let duplicate = tasks
                    .iter()
                    .find(|t| t.id == edge.dependent)
                    .map_or(true, |t| t.depends_on(edge.prerequisite));
                if duplicate {
                    debug!(?edge, "link already present or target gone; discarding");
                    LinkEffect::Cancelled
                } else {
                    effect
                }
            }
            other => other,
        }
    }

    /// Escape key. Returns whether a link was in progress.
    pub fn escape(&mut self) -> bool {
        let (next, effect) = transition(self.state, LinkEvent::Escape);
        self.set_state(next);
        effect == LinkEffect::Cancelled
    }

    pub fn pointer_moved(&mut self, pointer: Point) {
        if self.is_linking() {
            self.pointer = Some(pointer);
        }
    }

    /// Line from the origin handle to the pointer while linking.
    pub fn rubber_band(&self) -> Option<(Point, Point)> {
        match self.state {
            LinkingState::Linking { anchor, .. } => Some((anchor, self.pointer.unwrap_or(anchor))),
            LinkingState::Idle => None,
        }
    }

    fn set_state(&mut self, next: LinkingState) {
        if next == LinkingState::Idle {
            self.pointer = None;
        }
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, day).unwrap()
    }

    fn hit(task: &Task, side: HandleSide) -> HandleHit {
        HandleHit {
            task_id: task.id,
            side,
            anchor: Point::new(10.0, 20.0),
        }
    }

    #[test]
    fn start_handle_cannot_originate() {
        let a = Task::new("A", d(5), d(7));
        let mut ctl = DependencyLinkController::new();
        assert_eq!(ctl.click(hit(&a, HandleSide::Start), &[a.clone()]), LinkEffect::Ignored);
        assert!(!ctl.is_linking());
    }

    #[test]
    fn end_to_start_commits() {
        let a = Task::new("A", d(5), d(7));
        let b = Task::new("B", d(8), d(9));
        let tasks = [a.clone(), b.clone()];
        let mut ctl = DependencyLinkController::new();
        assert_eq!(ctl.click(hit(&a, HandleSide::End), &tasks), LinkEffect::Started);
        ctl.pointer_moved(Point::new(50.0, 60.0));
        assert_eq!(
            ctl.rubber_band(),
            Some((Point::new(10.0, 20.0), Point::new(50.0, 60.0)))
        );
        assert_eq!(
            ctl.click(hit(&b, HandleSide::Start), &tasks),
            LinkEffect::Commit(DependencyEdge {
                prerequisite: a.id,
                dependent: b.id
            })
        );
        assert_eq!(ctl.state(), LinkingState::Idle);
        assert_eq!(ctl.rubber_band(), None);
    }

    #[test]
    fn self_link_is_cancelled() {
        let a = Task::new("A", d(5), d(7));
        let mut ctl = DependencyLinkController::new();
        ctl.click(hit(&a, HandleSide::End), &[a.clone()]);
        assert_eq!(
            ctl.click(hit(&a, HandleSide::Start), &[a.clone()]),
            LinkEffect::Cancelled
        );
    }

    #[test]
    fn duplicate_link_is_discarded() {
        let a = Task::new("A", d(5), d(7));
        let mut b = Task::new("B", d(8), d(9));
        b.dependencies.push(a.id);
        let tasks = [a.clone(), b.clone()];
        let mut ctl = DependencyLinkController::new();
        ctl.click(hit(&a, HandleSide::End), &tasks);
        assert_eq!(ctl.click(hit(&b, HandleSide::Start), &tasks), LinkEffect::Cancelled);
        assert!(!ctl.is_linking());
    }

    #[test]
    fn escape_cancels_only_when_linking() {
        let a = Task::new("A", d(5), d(7));
        let mut ctl = DependencyLinkController::new();
        assert!(!ctl.escape());
        ctl.click(hit(&a, HandleSide::End), &[a.clone()]);
        assert!(ctl.escape());
        assert_eq!(ctl.state(), LinkingState::Idle);
    }

    #[test]
    fn transition_is_pure() {
        let id = TaskId::new_v4();
        let start = LinkingState::Linking {
            from_task_id: id,
            from_side: HandleSide::End,
            anchor: Point::new(0.0, 0.0),
        };
        let (next, effect) = transition(start, LinkEvent::Escape);
        assert_eq!((next, effect), (LinkingState::Idle, LinkEffect::Cancelled));
        // The input state is a value; nothing was mutated.
        assert!(matches!(start, LinkingState::Linking { .. }));
    }
}
