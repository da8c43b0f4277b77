//! Wizard state graph — nodes and their legal edges.

use serde::{Deserialize, Serialize};

/// A node in the dialogue graph.
///
/// `CollectField(i)` indexes into the session category's field plan (see
/// `fields::field_plan`), so one variant covers the common tier and every
/// category-specific tier without per-category states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardState {
    MainMenu,
    SelectTemplate,
    CollectField(usize),
    Confirm,
    Done,
}

impl WizardState {
    /// Check whether a transition from `self` to `target` is legal.
    ///
    /// The only back-edges are the numeric-retry self-edge on a field node,
    /// the template menu's back control, and the explicit restart edge from
    /// `Confirm`. Cancel may force `Done` from any non-terminal node.
    pub fn can_transition_to(&self, target: WizardState) -> bool {
        use WizardState::*;
        match (*self, target) {
            (MainMenu, SelectTemplate) => true,
            (SelectTemplate, MainMenu) => true,
            (SelectTemplate, CollectField(0)) => true,
            (CollectField(i), CollectField(j)) => j == i || j == i + 1,
            (CollectField(_), Confirm) => true,
            (Confirm, MainMenu) => true,
            (state, Done) => !state.is_terminal(),
            _ => false,
        }
    }

    /// Whether this node is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }
}

impl Default for WizardState {
    fn default() -> Self {
        Self::MainMenu
    }
}

impl std::fmt::Display for WizardState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MainMenu => write!(f, "main_menu"),
            Self::SelectTemplate => write!(f, "select_template"),
            Self::CollectField(i) => write!(f, "collect_field[{i}]"),
            Self::Confirm => write!(f, "confirm"),
            Self::Done => write!(f, "done"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_transitions() {
        use WizardState::*;
        let transitions = [
            (MainMenu, SelectTemplate),
            (SelectTemplate, CollectField(0)),
            (CollectField(0), CollectField(1)),
            (CollectField(3), CollectField(3)), // numeric retry
            (CollectField(8), Confirm),
            (Confirm, MainMenu), // restart
            (Confirm, Done),
        ];
        for (from, to) in transitions {
            assert!(from.can_transition_to(to), "{from} should transition to {to}");
        }
    }

    #[test]
    fn invalid_transitions() {
        use WizardState::*;
        // Skip a field node
        assert!(!CollectField(0).can_transition_to(CollectField(2)));
        // Go backward through fields
        assert!(!CollectField(4).can_transition_to(CollectField(3)));
        // Jump straight into the form
        assert!(!MainMenu.can_transition_to(CollectField(0)));
        assert!(!MainMenu.can_transition_to(Confirm));
        // Leave the terminal state
        assert!(!Done.can_transition_to(MainMenu));
        assert!(!Done.can_transition_to(Done));
    }

    #[test]
    fn cancel_reaches_done_from_any_non_terminal() {
        use WizardState::*;
        for state in [MainMenu, SelectTemplate, CollectField(5), Confirm] {
            assert!(state.can_transition_to(Done), "{state} should cancel to done");
        }
    }

    #[test]
    fn terminal_state() {
        assert!(WizardState::Done.is_terminal());
        assert!(!WizardState::MainMenu.is_terminal());
        assert!(!WizardState::Confirm.is_terminal());
    }
}
