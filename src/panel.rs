/// Visibility of the playback control panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanelState {
    Inactive,
    #[default]
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelTransition {
    /// inactive → active
    Show,
    /// active → inactive
    Hide,
}

impl PanelState {
    pub fn is_active(self) -> bool {
        self == PanelState::Active
    }

    pub fn toggled(self) -> Self {
        match self {
            PanelState::Inactive => PanelState::Active,
            PanelState::Active => PanelState::Inactive,
        }
    }

    /// Move to `target`, reporting the transition the renderer should animate.
    pub fn transition_to(&mut self, target: PanelState) -> Option<PanelTransition> {
        let transition = match (*self, target) {
            (PanelState::Inactive, PanelState::Active) => Some(PanelTransition::Show),
            (PanelState::Active, PanelState::Inactive) => Some(PanelTransition::Hide),
            _ => None,
        };
        *self = target;
        transition
    }

    pub fn toggle(&mut self) -> PanelTransition {
        *self = self.toggled();
        match self {
            PanelState::Active => PanelTransition::Show,
            PanelState::Inactive => PanelTransition::Hide,
        }
    }
}
