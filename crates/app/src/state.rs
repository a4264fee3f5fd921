//! Session state machine for LayerExport

/// Export session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Idle state - document loaded
    Idle,
    /// Walking the layer tree
    Collecting,
    /// Layers collected, ready to export
    Collected,
    /// Exporting in progress
    Exporting,
    /// Every target layer was attempted
    Finished,
    /// Stopped early on request
    Cancelled,
}

impl SessionState {
    /// Get display text for current state
    pub fn display_text(&self) -> &'static str {
        match self {
            SessionState::Idle => "Ready",
            SessionState::Collecting => "Collecting layers...",
            SessionState::Collected => "Layers collected",
            SessionState::Exporting => "Exporting...",
            SessionState::Finished => "Finished",
            SessionState::Cancelled => "Export cancelled!",
        }
    }

    pub fn can_collect(&self) -> bool {
        matches!(self, SessionState::Idle)
    }

    pub fn can_export(&self) -> bool {
        matches!(self, SessionState::Collected)
    }

    /// Finished or cancelled
    pub fn is_done(&self) -> bool {
        matches!(self, SessionState::Finished | SessionState::Cancelled)
    }
}

/// Layer counts known to the session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionCounts {
    pub layers: usize,
    pub visible: usize,
    /// Layers attempted so far
    pub exported: usize,
    /// Layers to export
    pub total: usize,
}

/// State machine transitions
#[derive(Debug)]
pub struct StateMachine {
    state: SessionState,
    counts: SessionCounts,
}

impl StateMachine {
    /// Create a new state machine
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            counts: SessionCounts::default(),
        }
    }

    /// Get current state
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn counts(&self) -> SessionCounts {
        self.counts
    }

    pub fn start_collecting(&mut self) -> bool {
        if self.state.can_collect() {
            self.state = SessionState::Collecting;
            true
        } else {
            false
        }
    }

    /// Collection done with `layers` leaves, `visible` of them visible
    pub fn collected(&mut self, layers: usize, visible: usize) -> bool {
        if matches!(self.state, SessionState::Collecting) {
            self.counts.layers = layers;
            self.counts.visible = visible;
            self.state = SessionState::Collected;
            true
        } else {
            false
        }
    }

    pub fn start_exporting(&mut self, total: usize) -> bool {
        if self.state.can_export() {
            self.counts.total = total;
            self.counts.exported = 0;
            self.state = SessionState::Exporting;
            true
        } else {
            false
        }
    }

    /// Record progress; ignored outside an export
    pub fn progress(&mut self, exported: usize) {
        if matches!(self.state, SessionState::Exporting) {
            self.counts.exported = exported.min(self.counts.total);
        }
    }

    /// End the export; it only counts as cancelled when layers were skipped
    pub fn finish_exporting(&mut self, cancel_requested: bool) -> bool {
        if matches!(self.state, SessionState::Exporting) {
            self.state = if cancel_requested && self.counts.exported < self.counts.total {
                SessionState::Cancelled
            } else {
                SessionState::Finished
            };
            true
        } else {
            false
        }
    }

    /// Reset to idle
    pub fn reset(&mut self) {
        self.state = SessionState::Idle;
        self.counts = SessionCounts::default();
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}
