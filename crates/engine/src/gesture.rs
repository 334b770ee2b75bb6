//! Swipe gesture classification.
//!
//! [`GestureInterpreter`] turns one continuous drag into a single [`Gesture`].
//! It only looks at displacement: whether a commit is honored (quota, queue,
//! network) is decided later by the dispatcher.

/// Distance thresholds, in the same units as the pointer coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GestureThresholds {
    /// Below this on both axes a drag is a tap.
    pub tap: f64,
    /// Horizontal travel needed to commit.
    pub commit: f64,
}

impl Default for GestureThresholds {
    fn default() -> Self {
        Self {
            tap: 10.0,
            commit: 120.0,
        }
    }
}

/// Classified outcome of a drag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gesture {
    Tap,
    CommitLeft,
    CommitRight,
    /// Not far enough to commit; the card snaps back.
    Cancel,
}

/// Direction of a committed swipe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SwipeIntent {
    Left,
    Right,
}

impl Gesture {
    /// The swipe intent carried by a commit, `None` for taps and cancels.
    pub fn intent(self) -> Option<SwipeIntent> {
        match self {
            Self::CommitLeft => Some(SwipeIntent::Left),
            Self::CommitRight => Some(SwipeIntent::Right),
            Self::Tap | Self::Cancel => None,
        }
    }
}

/// Classify a total displacement.
pub fn classify(dx: f64, dy: f64, thresholds: &GestureThresholds) -> Gesture {
    if dx.abs() < thresholds.tap && dy.abs() < thresholds.tap {
        Gesture::Tap
    } else if dx > thresholds.commit {
        Gesture::CommitRight
    } else if dx < -thresholds.commit {
        Gesture::CommitLeft
    } else {
        Gesture::Cancel
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Phase {
    Idle,
    Dragging { origin: (f64, f64), last: (f64, f64) },
}

/// Drag state machine: `Idle -> Dragging -> (emit) -> Idle`.
#[derive(Clone, Debug)]
pub struct GestureInterpreter {
    thresholds: GestureThresholds,
    phase: Phase,
}

impl GestureInterpreter {
    pub fn new(thresholds: GestureThresholds) -> Self {
        Self {
            thresholds,
            phase: Phase::Idle,
        }
    }

    /// Begin a drag at `(x, y)`. A second start restarts from the new origin.
    pub fn drag_start(&mut self, x: f64, y: f64) {
        self.phase = Phase::Dragging {
            origin: (x, y),
            last: (x, y),
        };
    }

    /// Track pointer movement. Ignored while idle.
    pub fn drag_move(&mut self, x: f64, y: f64) {
        if let Phase::Dragging { last, .. } = &mut self.phase {
            *last = (x, y);
        }
    }

    /// Finish the drag at `(x, y)` and classify it.
    ///
    /// Returns `None` if no drag was in progress.
    pub fn drag_end(&mut self, x: f64, y: f64) -> Option<Gesture> {
        let Phase::Dragging { origin, .. } = self.phase else {
            return None;
        };
        self.phase = Phase::Idle;
        Some(classify(x - origin.0, y - origin.1, &self.thresholds))
    }

    /// The pointer was lost mid-drag (e.g. the system stole the touch).
    pub fn interrupt(&mut self) -> Option<Gesture> {
        match self.phase {
            Phase::Idle => None,
            Phase::Dragging { .. } => {
                self.phase = Phase::Idle;
                Some(Gesture::Cancel)
            }
        }
    }

    /// Current displacement from the drag origin, for driving the card
    /// position. `None` while idle.
    pub fn offset(&self) -> Option<(f64, f64)> {
        match self.phase {
            Phase::Idle => None,
            Phase::Dragging { origin, last } => Some((last.0 - origin.0, last.1 - origin.1)),
        }
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.phase, Phase::Dragging { .. })
    }

    pub fn thresholds(&self) -> &GestureThresholds {
        &self.thresholds
    }
}

impl Default for GestureInterpreter {
    fn default() -> Self {
        Self::new(GestureThresholds::default())
    }
}
