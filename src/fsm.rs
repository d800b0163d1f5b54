//! Per-user navigation state.
//!
//! Each variant is one step of a dialog and carries exactly the scratch data
//! that step needs. Dropping back to a menu variant discards that data.

use crate::model::ExerciseField;
use serde::{Deserialize, Serialize};
use teloxide::dispatching::dialogue::{Dialogue, InMemStorage};

pub type TrainerDialogue = Dialogue<State, InMemStorage<State>>;

/// A catalog row picked earlier in the dialog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Picked {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum State {
    #[default]
    Main,
    AwaitingToken,
    Exercises,
    MuscleGroups,

    AddGroup,
    DeleteGroupSelect,
    DeleteGroupConfirm { group: Picked },
    RenameGroupSelect,
    RenameGroupName { group: Picked },

    AddExerciseGroup,
    AddExerciseName { group: Picked },
    AddExerciseVideo { group: Picked, name: String },
    AddExerciseDescription { group: Picked, name: String, video: String },
    DeleteExerciseSelect,
    DeleteExerciseConfirm { exercise: Picked },
    EditExerciseSelect,
    EditExerciseField { exercise: Picked },
    EditExerciseValue { exercise: Picked, field: ExerciseField },
}

/// Menu reached from a state when the user presses "Back" or a flow ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Menu {
    Main,
    Exercises,
    MuscleGroups,
}

impl From<Menu> for State {
    fn from(menu: Menu) -> Self {
        match menu {
            Menu::Main => State::Main,
            Menu::Exercises => State::Exercises,
            Menu::MuscleGroups => State::MuscleGroups,
        }
    }
}

impl State {
    /// The single step up. The main menu is its own parent.
    pub fn parent(&self) -> Menu {
        match self {
            State::Main | State::AwaitingToken | State::Exercises => Menu::Main,
            State::MuscleGroups
            | State::AddExerciseGroup
            | State::AddExerciseName { .. }
            | State::AddExerciseVideo { .. }
            | State::AddExerciseDescription { .. }
            | State::DeleteExerciseSelect
            | State::DeleteExerciseConfirm { .. }
            | State::EditExerciseSelect
            | State::EditExerciseField { .. }
            | State::EditExerciseValue { .. } => Menu::Exercises,
            State::AddGroup
            | State::DeleteGroupSelect
            | State::DeleteGroupConfirm { .. }
            | State::RenameGroupSelect
            | State::RenameGroupName { .. } => Menu::MuscleGroups,
        }
    }

    pub fn is_menu(&self) -> bool {
        matches!(self, State::Main | State::Exercises | State::MuscleGroups)
    }

    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            State::Main => "main",
            State::AwaitingToken => "awaiting_token",
            State::Exercises => "exercises",
            State::MuscleGroups => "muscle_groups",
            State::AddGroup => "group_add",
            State::DeleteGroupSelect => "group_delete_select",
            State::DeleteGroupConfirm { .. } => "group_delete_confirm",
            State::RenameGroupSelect => "group_edit_select",
            State::RenameGroupName { .. } => "group_edit_rename",
            State::AddExerciseGroup => "exercise_add_group",
            State::AddExerciseName { .. } => "exercise_add_name",
            State::AddExerciseVideo { .. } => "exercise_add_video",
            State::AddExerciseDescription { .. } => "exercise_add_description",
            State::DeleteExerciseSelect => "exercise_delete_select",
            State::DeleteExerciseConfirm { .. } => "exercise_delete_confirm",
            State::EditExerciseSelect => "exercise_edit_select",
            State::EditExerciseField { .. } => "exercise_edit_field",
            State::EditExerciseValue { .. } => "exercise_edit_value",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn picked() -> Picked {
        Picked { id: 1, name: "Ноги".into() }
    }

    #[test]
    fn group_flows_return_to_group_menu() {
        for state in [
            State::AddGroup,
            State::DeleteGroupSelect,
            State::DeleteGroupConfirm { group: picked() },
            State::RenameGroupSelect,
            State::RenameGroupName { group: picked() },
        ] {
            assert_eq!(state.parent(), Menu::MuscleGroups, "{}", state.name());
        }
    }

    #[test]
    fn exercise_flows_return_to_exercise_menu() {
        let nested = State::EditExerciseValue { exercise: picked(), field: ExerciseField::Video };
        assert_eq!(nested.parent(), Menu::Exercises);
        assert_eq!(State::AddExerciseGroup.parent(), Menu::Exercises);
        assert_eq!(State::MuscleGroups.parent(), Menu::Exercises);
    }

    #[test]
    fn menus_climb_to_main() {
        assert_eq!(State::Exercises.parent(), Menu::Main);
        assert_eq!(State::AwaitingToken.parent(), Menu::Main);
        assert_eq!(State::Main.parent(), Menu::Main);
        assert!(State::from(Menu::MuscleGroups).is_menu());
        assert!(!State::AddGroup.is_menu());
    }
}
