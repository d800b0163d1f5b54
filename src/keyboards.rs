//! Button labels, reply keyboards and catalog formatting.

use crate::db::CatalogEntry;
use crate::model::{ExerciseField, MuscleGroup};
use teloxide::types::{
    InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup, ReplyMarkup,
};

pub const BTN_EXERCISES: &str = "💪 Упражнения";
pub const BTN_SETUP_BOT: &str = "⚖️ Настроить бота";
pub const BTN_MY_BOT: &str = "🔗 Мой бот";
pub const BTN_BACK: &str = "⬅️ Назад";

pub const BTN_MUSCLE_GROUPS: &str = "📂 Группы мышц";
pub const BTN_LIST_EXERCISES: &str = "📋 Список упражнений";
pub const BTN_ADD_EXERCISE: &str = "➕ Добавить упражнение";
pub const BTN_DELETE_EXERCISE: &str = "🗑 Удалить упражнение";
pub const BTN_EDIT_EXERCISE: &str = "✏️ Изменить упражнение";

pub const BTN_ADD_GROUP: &str = "➕ Добавить группу";
pub const BTN_DELETE_GROUP: &str = "🗑 Удалить группу";
pub const BTN_RENAME_GROUP: &str = "✏️ Переименовать группу";

pub const BTN_YES: &str = "✅ Да";
pub const BTN_NO: &str = "❌ Нет";
pub const BTN_SKIP: &str = "Пропустить";

/// Transport-neutral reply markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Markup {
    None,
    Keyboard(Vec<Vec<String>>),
    Link { label: String, url: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub markup: Markup,
}

impl Reply {
    pub fn new(text: impl Into<String>, markup: Markup) -> Self {
        Self { text: text.into(), markup }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, Markup::None)
    }

    /// Labels of all reply-keyboard buttons, row by row.
    pub fn buttons(&self) -> Vec<&str> {
        match &self.markup {
            Markup::Keyboard(rows) => rows.iter().flatten().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }
}

fn rows(labels: &[&[&str]]) -> Markup {
    Markup::Keyboard(
        labels
            .iter()
            .map(|row| row.iter().map(|l| l.to_string()).collect())
            .collect(),
    )
}

pub fn main_menu() -> Markup {
    rows(&[&[BTN_EXERCISES], &[BTN_SETUP_BOT, BTN_MY_BOT]])
}

pub fn exercises_menu() -> Markup {
    rows(&[
        &[BTN_MUSCLE_GROUPS, BTN_LIST_EXERCISES],
        &[BTN_ADD_EXERCISE],
        &[BTN_EDIT_EXERCISE, BTN_DELETE_EXERCISE],
        &[BTN_BACK],
    ])
}

pub fn muscle_groups_menu() -> Markup {
    rows(&[&[BTN_ADD_GROUP], &[BTN_RENAME_GROUP, BTN_DELETE_GROUP], &[BTN_BACK]])
}

pub fn back_only() -> Markup {
    rows(&[&[BTN_BACK]])
}

pub fn skip_or_back() -> Markup {
    rows(&[&[BTN_SKIP], &[BTN_BACK]])
}

pub fn confirm() -> Markup {
    rows(&[&[BTN_YES, BTN_NO], &[BTN_BACK]])
}

pub fn exercise_fields() -> Markup {
    let mut keyboard: Vec<Vec<String>> = ExerciseField::ALL
        .chunks(2)
        .map(|pair| pair.iter().map(|f| f.label().to_string()).collect())
        .collect();
    keyboard.push(vec![BTN_BACK.to_string()]);
    Markup::Keyboard(keyboard)
}

/// One button per item, followed by "Back".
pub fn pick_list<'a>(names: impl IntoIterator<Item = &'a str>) -> Markup {
    let mut keyboard: Vec<Vec<String>> = names.into_iter().map(|n| vec![n.to_string()]).collect();
    keyboard.push(vec![BTN_BACK.to_string()]);
    Markup::Keyboard(keyboard)
}

pub fn format_groups(groups: &[MuscleGroup]) -> String {
    if groups.is_empty() {
        return "Групп мышц пока нет.".to_string();
    }
    let mut out = String::from("Твои группы мышц:\n");
    for group in groups {
        out.push_str(&format!("• {}\n", group.name));
    }
    out.trim_end().to_string()
}

/// Renders exercises under their group headings; ungrouped ones come last.
pub fn format_catalog(entries: &[CatalogEntry]) -> String {
    if entries.is_empty() {
        return "Упражнений пока нет.".to_string();
    }
    let mut out = String::new();
    let mut current: Option<Option<&str>> = None;
    for entry in entries {
        let heading = entry.muscle_group_name.as_deref();
        if current != Some(heading) {
            if current.is_some() {
                out.push('\n');
            }
            out.push_str(&format!("📂 {}\n", heading.unwrap_or("Без группы")));
            current = Some(heading);
        }
        out.push_str(&format!("• {}\n", entry.name));
        if !entry.video.is_empty() {
            out.push_str(&format!("   🎬 {}\n", entry.video));
        }
        if !entry.description.is_empty() {
            out.push_str(&format!("   📝 {}\n", entry.description));
        }
    }
    out.trim_end().to_string()
}

/// Converts to Telegram markup. `None` means "send without markup".
pub fn to_telegram(markup: &Markup) -> Option<ReplyMarkup> {
    match markup {
        Markup::None => None,
        Markup::Keyboard(rows) => {
            let keyboard = rows
                .iter()
                .map(|row| row.iter().map(|l| KeyboardButton::new(l.clone())).collect::<Vec<_>>())
                .collect::<Vec<_>>();
            Some(KeyboardMarkup::new(keyboard).resize_keyboard(true).into())
        }
        Markup::Link { label, url } => {
            let url = reqwest::Url::parse(url).ok()?;
            let button = InlineKeyboardButton::url(label.clone(), url);
            Some(InlineKeyboardMarkup::new(vec![vec![button]]).into())
        }
    }
}
