use trainer_bot::db::{self, Pool};
use trainer_bot::model::{ExerciseUpdate, NewExercise};

async fn setup_pool() -> Pool {
    let pool = db::init_pool("sqlite::memory:").await.unwrap();
    db::run_migrations(&pool).await.unwrap();
    for (id, name) in [(1, "alice"), (2, "bob")] {
        db::upsert_user(&pool, id, Some(name)).await.unwrap();
    }
    pool
}

fn exercise(name: &str, group: Option<i64>) -> NewExercise {
    NewExercise { muscle_group: group, name: name.to_string(), ..Default::default() }
}

#[tokio::test]
async fn group_round_trip_and_duplicate() {
    let pool = setup_pool().await;

    assert!(db::add_muscle_group(&pool, 1, "Руки").await.unwrap());
    let groups = db::get_muscle_groups(&pool, 1).await.unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].name, "Руки");
    assert_eq!(groups[0].user_id, 1);

    assert!(!db::add_muscle_group(&pool, 1, "Руки").await.unwrap());
    assert_eq!(db::get_muscle_groups(&pool, 1).await.unwrap().len(), 1);
}

#[tokio::test]
async fn names_are_unique_per_owner_only() {
    let pool = setup_pool().await;

    assert!(db::add_muscle_group(&pool, 1, "Ноги").await.unwrap());
    assert!(db::add_muscle_group(&pool, 2, "Ноги").await.unwrap());
    assert!(db::add_exercise(&pool, 1, &exercise("Присед", None)).await.unwrap());
    assert!(db::add_exercise(&pool, 2, &exercise("Присед", None)).await.unwrap());
    assert!(!db::add_exercise(&pool, 2, &exercise("Присед", None)).await.unwrap());

    assert_eq!(db::get_muscle_groups(&pool, 2).await.unwrap().len(), 1);
    assert_eq!(db::get_exercises(&pool, 1).await.unwrap().len(), 1);
    assert!(db::get_muscle_group_by_name(&pool, 3, "Ноги").await.unwrap().is_none());
}

#[tokio::test]
async fn deleting_group_nulls_exercise_reference() {
    let pool = setup_pool().await;
    db::add_muscle_group(&pool, 1, "Спина").await.unwrap();
    let group = db::get_muscle_group_by_name(&pool, 1, "Спина").await.unwrap().unwrap();
    db::add_exercise(&pool, 1, &exercise("Тяга", Some(group.id))).await.unwrap();

    assert!(db::delete_muscle_group(&pool, 1, group.id).await.unwrap());
    assert!(!db::delete_muscle_group(&pool, 1, group.id).await.unwrap());

    let stored = db::get_exercise_by_name(&pool, 1, "Тяга").await.unwrap().unwrap();
    assert_eq!(stored.muscle_group, None);
    let catalog = db::get_exercises(&pool, 1).await.unwrap();
    assert_eq!(catalog[0].muscle_group_name, None);
}

#[tokio::test]
async fn other_users_rows_are_untouchable() {
    let pool = setup_pool().await;
    db::add_muscle_group(&pool, 1, "Грудь").await.unwrap();
    let group = db::get_muscle_group_by_name(&pool, 1, "Грудь").await.unwrap().unwrap();

    assert!(db::add_exercise(&pool, 2, &exercise("Жим", Some(group.id))).await.is_err());
    assert!(!db::rename_muscle_group(&pool, 2, group.id, "Чужая").await.unwrap());
    assert!(!db::delete_muscle_group(&pool, 2, group.id).await.unwrap());

    db::add_exercise(&pool, 2, &exercise("Жим", None)).await.unwrap();
    let own = db::get_exercise_by_name(&pool, 2, "Жим").await.unwrap().unwrap();
    let update = ExerciseUpdate { muscle_group: Some(group.id), ..Default::default() };
    assert!(db::update_exercise(&pool, 2, own.id, &update).await.is_err());
    assert!(!db::delete_exercise(&pool, 1, own.id).await.unwrap());
}

#[tokio::test]
async fn exercise_groups_always_share_owner() {
    let pool = setup_pool().await;
    for user in [1, 2] {
        db::add_muscle_group(&pool, user, "Плечи").await.unwrap();
        let group = db::get_muscle_group_by_name(&pool, user, "Плечи").await.unwrap().unwrap();
        db::add_exercise(&pool, user, &exercise("Махи", Some(group.id))).await.unwrap();
        db::add_exercise(&pool, user, &exercise("Планка", None)).await.unwrap();
    }

    for user in [1, 2] {
        let groups = db::get_muscle_groups(&pool, user).await.unwrap();
        for entry in db::get_exercises(&pool, user).await.unwrap() {
            if let Some(group_id) = entry.muscle_group {
                assert!(groups.iter().any(|g| g.id == group_id && g.user_id == user));
            }
        }
    }
}

#[tokio::test]
async fn rename_exercise_conflict_returns_false() {
    let pool = setup_pool().await;
    db::add_exercise(&pool, 1, &exercise("Выпады", None)).await.unwrap();
    db::add_exercise(&pool, 1, &exercise("Прыжки", None)).await.unwrap();
    let target = db::get_exercise_by_name(&pool, 1, "Прыжки").await.unwrap().unwrap();

    let update = ExerciseUpdate { name: Some("Выпады".into()), ..Default::default() };
    assert!(!db::update_exercise(&pool, 1, target.id, &update).await.unwrap());
    let update = ExerciseUpdate { name: Some("Берпи".into()), video: Some("v".into()), ..Default::default() };
    assert!(db::update_exercise(&pool, 1, target.id, &update).await.unwrap());

    let renamed = db::get_exercise_by_name(&pool, 1, "Берпи").await.unwrap().unwrap();
    assert_eq!(renamed.id, target.id);
    assert_eq!(renamed.video, "v");
}
