//! Transport-independent message dispatch.
//!
//! `route` takes the user's current state and the message text, performs the
//! catalog operation the pair selects and returns the next state together with
//! the replies to send. Nothing here talks to Telegram directly.

use crate::client_bot::{self, BotIdentity};
use crate::db::{self, Pool};
use crate::fsm::{Picked, State};
use crate::keyboards::{self as kb, Markup, Reply};
use crate::model::{ExerciseField, ExerciseUpdate, FieldValue, NewExercise};
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info, instrument};

const GREETING: &str = "👋 Привет! Это панель управления твоим фитнес-ботом.";
const NEED_START: &str = "Сначала отправь /start.";
const UNKNOWN_OPTION: &str = "🤔 Не понимаю. Выбери вариант на клавиатуре.";
const EMPTY_NAME: &str = "❌ Название не может быть пустым. Попробуй снова.";
const BAD_TOKEN: &str = "❌ Похоже, это не валидный токен. Попробуй снова.";
const TOKEN_INSTRUCTION: &str = "🔐 Вставь сюда токен от нового бота, которого ты создал в @BotFather.\n\n\
Как получить токен:\n\
1. Открой Telegram и найди @BotFather.\n\
2. Нажми /start и выбери New Bot или команду /newbot.\n\
3. Придумай имя и username для бота.\n\
4. После создания @BotFather пришлёт тебе токен — скопируй его сюда.\n\n\
Токен выглядит примерно так: 123456789:AA...xyz";

/// Collaborators shared by every update.
#[derive(Clone)]
pub struct Services {
    pub pool: Pool,
    pub identity: Arc<dyn BotIdentity>,
}

impl Services {
    pub fn new(pool: Pool, identity: Arc<dyn BotIdentity>) -> Self {
        Self { pool, identity }
    }
}

/// One inbound text message.
#[derive(Debug, Clone, Copy)]
pub struct Incoming<'a> {
    pub telegram_id: i64,
    pub username: Option<&'a str>,
    pub text: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub state: State,
    pub replies: Vec<Reply>,
}

impl Outcome {
    /// Text of the last reply, which always carries the keyboard of `state`.
    pub fn last_text(&self) -> &str {
        self.replies.last().map(|r| r.text.as_str()).unwrap_or_default()
    }
}

#[instrument(skip_all, fields(user = input.telegram_id, state = state.name()))]
pub async fn route(app: &Services, state: State, input: Incoming<'_>) -> Result<Outcome> {
    let text = input.text.trim();
    let uid = input.telegram_id;

    if text == "/start" {
        db::upsert_user(&app.pool, uid, input.username).await?;
        info!(user = uid, "session started");
        return enter(app, uid, State::Main, Some(GREETING.to_string())).await;
    }

    if text == kb::BTN_BACK && state != State::Main {
        let parent = State::from(state.parent());
        debug!(from = state.name(), to = parent.name(), "back");
        return enter(app, uid, parent, None).await;
    }

    match state {
        State::Main => main_menu(app, uid, text).await,
        State::AwaitingToken => receive_token(app, uid, text).await,
        State::Exercises => exercises_menu(app, uid, text).await,
        State::MuscleGroups => groups_menu(app, uid, text).await,

        State::AddGroup => {
            let Some(name) = non_empty(text) else {
                return stay(app, uid, State::AddGroup, EMPTY_NAME).await;
            };
            let notice = if db::add_muscle_group(&app.pool, uid, name).await? {
                format!("✅ Группа «{}» добавлена.", name)
            } else {
                format!("⚠️ Группа «{}» уже существует.", name)
            };
            enter(app, uid, State::MuscleGroups, Some(notice)).await
        }
        State::DeleteGroupSelect => match pick_group(app, uid, text).await? {
            Some(group) => enter(app, uid, State::DeleteGroupConfirm { group }, None).await,
            None => stay(app, uid, State::DeleteGroupSelect, UNKNOWN_OPTION).await,
        },
        State::DeleteGroupConfirm { group } => match text {
            kb::BTN_YES => {
                let notice = if db::delete_muscle_group(&app.pool, uid, group.id).await? {
                    format!("🗑 Группа «{}» удалена.", group.name)
                } else {
                    format!("⚠️ Группа «{}» не найдена.", group.name)
                };
                enter(app, uid, State::MuscleGroups, Some(notice)).await
            }
            kb::BTN_NO => enter(app, uid, State::MuscleGroups, Some("Удаление отменено.".into())).await,
            _ => stay(app, uid, State::DeleteGroupConfirm { group }, UNKNOWN_OPTION).await,
        },
        State::RenameGroupSelect => match pick_group(app, uid, text).await? {
            Some(group) => enter(app, uid, State::RenameGroupName { group }, None).await,
            None => stay(app, uid, State::RenameGroupSelect, UNKNOWN_OPTION).await,
        },
        State::RenameGroupName { group } => {
            let Some(name) = non_empty(text) else {
                return stay(app, uid, State::RenameGroupName { group }, EMPTY_NAME).await;
            };
            let notice = if db::rename_muscle_group(&app.pool, uid, group.id, name).await? {
                format!("✅ Группа «{}» переименована в «{}».", group.name, name)
            } else {
                format!("⚠️ Группа «{}» уже существует.", name)
            };
            enter(app, uid, State::MuscleGroups, Some(notice)).await
        }

        State::AddExerciseGroup => match pick_group(app, uid, text).await? {
            Some(group) => enter(app, uid, State::AddExerciseName { group }, None).await,
            None => stay(app, uid, State::AddExerciseGroup, UNKNOWN_OPTION).await,
        },
        State::AddExerciseName { group } => match non_empty(text) {
            Some(name) => {
                let next = State::AddExerciseVideo { group, name: name.to_string() };
                enter(app, uid, next, None).await
            }
            None => stay(app, uid, State::AddExerciseName { group }, EMPTY_NAME).await,
        },
        State::AddExerciseVideo { group, name } => {
            let video = skippable(text);
            enter(app, uid, State::AddExerciseDescription { group, name, video }, None).await
        }
        State::AddExerciseDescription { group, name, video } => {
            let exercise = NewExercise {
                muscle_group: Some(group.id),
                name,
                video,
                description: skippable(text),
            };
            let notice = if db::add_exercise(&app.pool, uid, &exercise).await? {
                format!("✅ Упражнение «{}» добавлено в группу «{}».", exercise.name, group.name)
            } else {
                format!("⚠️ Упражнение «{}» уже существует.", exercise.name)
            };
            enter(app, uid, State::Exercises, Some(notice)).await
        }
        State::DeleteExerciseSelect => match pick_exercise(app, uid, text).await? {
            Some(exercise) => enter(app, uid, State::DeleteExerciseConfirm { exercise }, None).await,
            None => stay(app, uid, State::DeleteExerciseSelect, UNKNOWN_OPTION).await,
        },
        State::DeleteExerciseConfirm { exercise } => match text {
            kb::BTN_YES => {
                let notice = if db::delete_exercise(&app.pool, uid, exercise.id).await? {
                    format!("🗑 Упражнение «{}» удалено.", exercise.name)
                } else {
                    format!("⚠️ Упражнение «{}» не найдено.", exercise.name)
                };
                enter(app, uid, State::Exercises, Some(notice)).await
            }
            kb::BTN_NO => enter(app, uid, State::Exercises, Some("Удаление отменено.".into())).await,
            _ => stay(app, uid, State::DeleteExerciseConfirm { exercise }, UNKNOWN_OPTION).await,
        },
        State::EditExerciseSelect => match pick_exercise(app, uid, text).await? {
            Some(exercise) => enter(app, uid, State::EditExerciseField { exercise }, None).await,
            None => stay(app, uid, State::EditExerciseSelect, UNKNOWN_OPTION).await,
        },
        State::EditExerciseField { exercise } => {
            let Some(field) = ExerciseField::from_label(text) else {
                return stay(app, uid, State::EditExerciseField { exercise }, UNKNOWN_OPTION).await;
            };
            if field == ExerciseField::MuscleGroup
                && db::get_muscle_groups(&app.pool, uid).await?.is_empty()
            {
                let state = State::EditExerciseField { exercise };
                return stay(app, uid, state, "Групп мышц пока нет. Сначала добавь группу.").await;
            }
            enter(app, uid, State::EditExerciseValue { exercise, field }, None).await
        }
        State::EditExerciseValue { exercise, field } => {
            edit_value(app, uid, exercise, field, text).await
        }
    }
}

async fn main_menu(app: &Services, uid: i64, text: &str) -> Result<Outcome> {
    let target = match text {
        kb::BTN_EXERCISES => State::Exercises,
        kb::BTN_SETUP_BOT => State::AwaitingToken,
        kb::BTN_MY_BOT => return show_client_bot(app, uid).await,
        _ => return stay(app, uid, State::Main, UNKNOWN_OPTION).await,
    };
    if db::get_user(&app.pool, uid).await?.is_none() {
        return Ok(Outcome { state: State::Main, replies: vec![Reply::plain(NEED_START)] });
    }
    enter(app, uid, target, None).await
}

async fn receive_token(app: &Services, uid: i64, token: &str) -> Result<Outcome> {
    if !client_bot::looks_like_token(token) {
        debug!(user = uid, "rejected malformed bot token");
        return stay(app, uid, State::AwaitingToken, BAD_TOKEN).await;
    }
    db::set_user_token(&app.pool, uid, token).await?;
    info!(user = uid, "client bot token stored");

    let mut outcome = enter(app, uid, State::Main, None).await?;
    outcome.replies.insert(0, link_reply(app, token, "✅ Отлично! Твой клиентский бот подключён.").await);
    Ok(outcome)
}

async fn show_client_bot(app: &Services, uid: i64) -> Result<Outcome> {
    let token = match db::get_user(&app.pool, uid).await? {
        None => return Ok(Outcome { state: State::Main, replies: vec![Reply::plain(NEED_START)] }),
        Some(user) => user.bot_token,
    };
    let Some(token) = token else {
        let notice = format!("Клиентский бот ещё не подключён. Нажми «{}».", kb::BTN_SETUP_BOT);
        return stay(app, uid, State::Main, &notice).await;
    };
    let mut outcome = enter(app, uid, State::Main, None).await?;
    outcome.replies.insert(0, link_reply(app, &token, "🔗 Твой клиентский бот:").await);
    Ok(outcome)
}

/// Identity check failures are shown to the user as-is.
async fn link_reply(app: &Services, token: &str, headline: &str) -> Reply {
    match app.identity.username(token).await {
        Ok(username) => Reply::new(
            format!("{} @{}", headline, username),
            Markup::Link { label: "Открыть бота".into(), url: client_bot::deep_link(&username) },
        ),
        Err(err) => Reply::plain(format!("❌ Не удалось проверить бота: {}", err)),
    }
}

async fn exercises_menu(app: &Services, uid: i64, text: &str) -> Result<Outcome> {
    match text {
        kb::BTN_MUSCLE_GROUPS => enter(app, uid, State::MuscleGroups, None).await,
        kb::BTN_LIST_EXERCISES => {
            let catalog = kb::format_catalog(&db::get_exercises(&app.pool, uid).await?);
            stay(app, uid, State::Exercises, &catalog).await
        }
        kb::BTN_ADD_EXERCISE => {
            if db::get_muscle_groups(&app.pool, uid).await?.is_empty() {
                return stay(app, uid, State::Exercises, "Сначала добавь хотя бы одну группу мышц.").await;
            }
            enter(app, uid, State::AddExerciseGroup, None).await
        }
        kb::BTN_DELETE_EXERCISE | kb::BTN_EDIT_EXERCISE => {
            if db::get_exercises(&app.pool, uid).await?.is_empty() {
                return stay(app, uid, State::Exercises, "Упражнений пока нет.").await;
            }
            let next = if text == kb::BTN_DELETE_EXERCISE {
                State::DeleteExerciseSelect
            } else {
                State::EditExerciseSelect
            };
            enter(app, uid, next, None).await
        }
        _ => stay(app, uid, State::Exercises, UNKNOWN_OPTION).await,
    }
}

async fn groups_menu(app: &Services, uid: i64, text: &str) -> Result<Outcome> {
    let next = match text {
        kb::BTN_ADD_GROUP => return enter(app, uid, State::AddGroup, None).await,
        kb::BTN_DELETE_GROUP => State::DeleteGroupSelect,
        kb::BTN_RENAME_GROUP => State::RenameGroupSelect,
        _ => return stay(app, uid, State::MuscleGroups, UNKNOWN_OPTION).await,
    };
    if db::get_muscle_groups(&app.pool, uid).await?.is_empty() {
        return stay(app, uid, State::MuscleGroups, "Групп мышц пока нет.").await;
    }
    enter(app, uid, next, None).await
}

async fn edit_value(
    app: &Services,
    uid: i64,
    exercise: Picked,
    field: ExerciseField,
    text: &str,
) -> Result<Outcome> {
    let value = match field {
        ExerciseField::MuscleGroup => match pick_group(app, uid, text).await? {
            Some(group) => FieldValue::Group(group.id),
            None => {
                let state = State::EditExerciseValue { exercise, field };
                return stay(app, uid, state, UNKNOWN_OPTION).await;
            }
        },
        ExerciseField::Name => match non_empty(text) {
            Some(name) => FieldValue::Text(name.to_string()),
            None => {
                let state = State::EditExerciseValue { exercise, field };
                return stay(app, uid, state, EMPTY_NAME).await;
            }
        },
        ExerciseField::Video | ExerciseField::Description => FieldValue::Text(skippable(text)),
    };

    let new_name = match &value {
        FieldValue::Text(v) if field == ExerciseField::Name => Some(v.clone()),
        _ => None,
    };
    let update = ExerciseUpdate::single(field, value);
    let notice = if db::update_exercise(&app.pool, uid, exercise.id, &update).await? {
        info!(user = uid, exercise = exercise.id, ?field, "exercise updated");
        format!("✅ Упражнение «{}» обновлено.", new_name.as_deref().unwrap_or(&exercise.name))
    } else if let Some(name) = new_name {
        format!("⚠️ Упражнение «{}» уже существует.", name)
    } else {
        format!("⚠️ Упражнение «{}» не найдено.", exercise.name)
    };
    enter(app, uid, State::Exercises, Some(notice)).await
}

async fn pick_group(app: &Services, uid: i64, name: &str) -> Result<Option<Picked>> {
    let group = db::get_muscle_group_by_name(&app.pool, uid, name).await?;
    Ok(group.map(|g| Picked { id: g.id, name: g.name }))
}

async fn pick_exercise(app: &Services, uid: i64, name: &str) -> Result<Option<Picked>> {
    let exercise = db::get_exercise_by_name(&app.pool, uid, name).await?;
    Ok(exercise.map(|e| Picked { id: e.id, name: e.name }))
}

fn non_empty(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// The skip button stands for an empty value.
fn skippable(text: &str) -> String {
    if text == kb::BTN_SKIP {
        String::new()
    } else {
        text.to_string()
    }
}

/// Moves to `state` and shows its prompt, prefixed by `notice`.
async fn enter(app: &Services, uid: i64, state: State, notice: Option<String>) -> Result<Outcome> {
    let prompt = prompt(app, uid, &state).await?;
    let text = match notice {
        Some(notice) => format!("{}\n\n{}", notice, prompt.text),
        None => prompt.text,
    };
    info!(user = uid, state = state.name(), "transition");
    Ok(Outcome { state, replies: vec![Reply::new(text, prompt.markup)] })
}

/// Keeps `state` and re-prompts with `message`.
async fn stay(app: &Services, uid: i64, state: State, message: &str) -> Result<Outcome> {
    debug!(user = uid, state = state.name(), "re-prompt");
    let prompt = prompt(app, uid, &state).await?;
    let text = format!("{}\n\n{}", message, prompt.text);
    Ok(Outcome { state, replies: vec![Reply::new(text, prompt.markup)] })
}

async fn prompt(app: &Services, uid: i64, state: &State) -> Result<Reply> {
    let reply = match state {
        State::Main => Reply::new("🏠 Главное меню", kb::main_menu()),
        State::AwaitingToken => Reply::new(TOKEN_INSTRUCTION, kb::back_only()),
        State::Exercises => Reply::new("💪 Упражнения. Выбери действие.", kb::exercises_menu()),
        State::MuscleGroups => {
            let groups = db::get_muscle_groups(&app.pool, uid).await?;
            Reply::new(kb::format_groups(&groups), kb::muscle_groups_menu())
        }
        State::AddGroup => Reply::new("Введи название новой группы мышц:", kb::back_only()),
        State::DeleteGroupSelect => Reply::new("Выбери группу для удаления:", group_names(app, uid).await?),
        State::DeleteGroupConfirm { group } => Reply::new(
            format!("Удалить группу «{}»? Упражнения останутся без группы.", group.name),
            kb::confirm(),
        ),
        State::RenameGroupSelect => {
            Reply::new("Выбери группу для переименования:", group_names(app, uid).await?)
        }
        State::RenameGroupName { group } => {
            Reply::new(format!("Введи новое название для «{}»:", group.name), kb::back_only())
        }
        State::AddExerciseGroup => {
            Reply::new("Выбери группу мышц для нового упражнения:", group_names(app, uid).await?)
        }
        State::AddExerciseName { .. } => Reply::new("Введи название упражнения:", kb::back_only()),
        State::AddExerciseVideo { .. } => Reply::new(
            format!("Отправь ссылку на видео или нажми «{}».", kb::BTN_SKIP),
            kb::skip_or_back(),
        ),
        State::AddExerciseDescription { .. } => Reply::new(
            format!("Добавь описание или нажми «{}».", kb::BTN_SKIP),
            kb::skip_or_back(),
        ),
        State::DeleteExerciseSelect => {
            Reply::new("Выбери упражнение для удаления:", exercise_names(app, uid).await?)
        }
        State::DeleteExerciseConfirm { exercise } => {
            Reply::new(format!("Удалить упражнение «{}»?", exercise.name), kb::confirm())
        }
        State::EditExerciseSelect => {
            Reply::new("Выбери упражнение для изменения:", exercise_names(app, uid).await?)
        }
        State::EditExerciseField { exercise } => {
            Reply::new(format!("Что изменить в «{}»?", exercise.name), kb::exercise_fields())
        }
        State::EditExerciseValue { exercise, field } => {
            let text = format!("Новое значение поля «{}» для «{}»:", field.label(), exercise.name);
            let markup = match field {
                ExerciseField::MuscleGroup => group_names(app, uid).await?,
                ExerciseField::Name => kb::back_only(),
                ExerciseField::Video | ExerciseField::Description => kb::skip_or_back(),
            };
            Reply::new(text, markup)
        }
    };
    Ok(reply)
}

async fn group_names(app: &Services, uid: i64) -> Result<Markup> {
    let groups = db::get_muscle_groups(&app.pool, uid).await?;
    Ok(kb::pick_list(groups.iter().map(|g| g.name.as_str())))
}

async fn exercise_names(app: &Services, uid: i64) -> Result<Markup> {
    let exercises = db::get_exercises(&app.pool, uid).await?;
    Ok(kb::pick_list(exercises.iter().map(|e| e.name.as_str())))
}
