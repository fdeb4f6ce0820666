// View Selector - which of the five screens is active
//
// Transitions happen only on explicit selection. The ERP screen's reset
// action is two-step: request, then confirm or cancel.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Dashboard,
    Planning,
    Risk,
    Investments,
    Erp,
}

impl View {
    pub const ALL: [View; 5] = [
        View::Dashboard,
        View::Planning,
        View::Risk,
        View::Investments,
        View::Erp,
    ];

    pub fn next(&self) -> Self {
        match self {
            View::Dashboard => View::Planning,
            View::Planning => View::Risk,
            View::Risk => View::Investments,
            View::Investments => View::Erp,
            View::Erp => View::Dashboard,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            View::Dashboard => View::Erp,
            View::Planning => View::Dashboard,
            View::Risk => View::Planning,
            View::Investments => View::Risk,
            View::Erp => View::Investments,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            View::Dashboard => "Dashboard",
            View::Planning => "Planning",
            View::Risk => "Risk Analysis",
            View::Investments => "Investments",
            View::Erp => "ERP",
        }
    }

    /// Number-key shortcut, 1-based
    pub fn from_shortcut(key: char) -> Option<Self> {
        key.to_digit(10)
            .and_then(|d| d.checked_sub(1))
            .and_then(|i| Self::ALL.get(i as usize).copied())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ViewSelector {
    current: View,
    reset_pending: bool,
}

impl ViewSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> View {
        self.current
    }

    /// Switching away from ERP drops any unconfirmed reset request
    pub fn select(&mut self, view: View) {
        if view != self.current {
            self.reset_pending = false;
        }
        self.current = view;
    }

    pub fn next(&mut self) {
        self.select(self.current.next());
    }

    pub fn previous(&mut self) {
        self.select(self.current.previous());
    }

    pub fn reset_pending(&self) -> bool {
        self.reset_pending
    }

    /// Only honoured on the ERP view
    pub fn request_reset(&mut self) -> bool {
        if self.current == View::Erp {
            self.reset_pending = true;
        }
        self.reset_pending
    }

    /// Returns true when a pending reset was confirmed; the caller then runs it
    pub fn confirm_reset(&mut self) -> bool {
        let confirmed = self.reset_pending && self.current == View::Erp;
        self.reset_pending = false;
        confirmed
    }

    pub fn cancel_reset(&mut self) {
        self.reset_pending = false;
    }
}
