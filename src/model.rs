use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq, Eq)]
pub struct User {
    pub telegram_id: i64,
    pub username: Option<String>,
    pub bot_token: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq, Eq)]
pub struct MuscleGroup {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq, Eq)]
pub struct Exercise {
    pub id: i64,
    pub user_id: i64,
    pub muscle_group: Option<i64>,
    pub name: String,
    pub video: String,
    pub description: String,
}

/// Values collected by the add-exercise dialog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewExercise {
    pub muscle_group: Option<i64>,
    pub name: String,
    pub video: String,
    pub description: String,
}

/// Partial update for an exercise. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExerciseUpdate {
    pub muscle_group: Option<i64>,
    pub name: Option<String>,
    pub video: Option<String>,
    pub description: Option<String>,
}

impl ExerciseUpdate {
    pub fn is_empty(&self) -> bool {
        self.muscle_group.is_none()
            && self.name.is_none()
            && self.video.is_none()
            && self.description.is_none()
    }

    /// Builds an update touching only `field`.
    pub fn single(field: ExerciseField, value: FieldValue) -> Self {
        let mut update = Self::default();
        match (field, value) {
            (ExerciseField::MuscleGroup, FieldValue::Group(id)) => update.muscle_group = Some(id),
            (ExerciseField::Name, FieldValue::Text(v)) => update.name = Some(v),
            (ExerciseField::Video, FieldValue::Text(v)) => update.video = Some(v),
            (ExerciseField::Description, FieldValue::Text(v)) => update.description = Some(v),
            _ => {}
        }
        update
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Group(i64),
    Text(String),
}

/// Editable exercise columns, as offered in the edit dialog.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ExerciseField {
    MuscleGroup,
    Name,
    Video,
    Description,
}

impl ExerciseField {
    pub const ALL: [ExerciseField; 4] = [
        ExerciseField::MuscleGroup,
        ExerciseField::Name,
        ExerciseField::Video,
        ExerciseField::Description,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ExerciseField::MuscleGroup => "Группа мышц",
            ExerciseField::Name => "Название",
            ExerciseField::Video => "Видео",
            ExerciseField::Description => "Описание",
        }
    }

    pub fn from_label(text: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.label() == text)
    }

    /// Fields where the skip button stores an empty value.
    pub fn is_skippable(&self) -> bool {
        matches!(self, ExerciseField::Video | ExerciseField::Description)
    }
}
