mod common;

use std::sync::Arc;

use common::{seed_menu, seed_nutrition, MemoryStore, ADMIN_ID};
use fitness_bot::bot::dialogue_manager::{FlowEngine, Reply};
use fitness_bot::bot::screens::Screen;
use fitness_bot::dialogue::{
    ConversationStore, DayForm, Flow, FlowKind, MealForm, TrainingForm, WEEKDAY_NAMES,
};
use fitness_bot::localization::t_lang;
use fitness_bot::models::{NewMenuDay, NewTraining};
use fitness_bot::store::FitnessStore;

const SECOND_ADMIN: i64 = 1002;

fn engine(store: &Arc<MemoryStore>) -> FlowEngine {
    FlowEngine::new(store.clone(), ConversationStore::new())
}

async fn send(engine: &FlowEngine, inputs: &[&str]) -> Vec<Reply> {
    let mut last = Vec::new();
    for input in inputs {
        last = engine.handle_input(ADMIN_ID, input).await;
    }
    last
}

fn texts(replies: &[Reply]) -> Vec<String> {
    replies
        .iter()
        .filter_map(|r| r.text().map(str::to_string))
        .collect()
}

async fn current_flow(engine: &FlowEngine, actor: i64) -> Option<Flow> {
    engine.conversations().get(actor).await.map(|s| s.flow)
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// A flow, the inputs that walk it up to (but not through) its terminal
/// call, and the store it needs
struct FlowCase {
    flow: Flow,
    inputs: Vec<String>,
}

async fn flow_cases(store: &Arc<MemoryStore>) -> Vec<FlowCase> {
    let training = store
        .create_training(NewTraining {
            title: "Squats".to_string(),
            duration: 30,
            ..Default::default()
        })
        .await
        .unwrap();
    let nutrition = seed_nutrition(store, "Oats", 350).await;
    let menu = seed_menu(store, "Week 1").await;
    store
        .add_day(NewMenuDay {
            menu_id: menu.id,
            day_number: 1,
            day_name: WEEKDAY_NAMES[0].to_string(),
        })
        .await
        .unwrap();

    let nutrition_steps = strings(&["Oats", "-", "350", "12.5", "60", "7"]);

    vec![
        FlowCase {
            flow: Flow::add_training(None),
            inputs: strings(&["Squats", "30", "-"]),
        },
        FlowCase {
            flow: Flow::edit_training(training.id),
            inputs: strings(&["-", "25", "-"]),
        },
        FlowCase {
            flow: Flow::add_nutrition(),
            inputs: nutrition_steps.clone(),
        },
        FlowCase {
            flow: Flow::edit_nutrition(nutrition.id),
            inputs: nutrition_steps,
        },
        FlowCase {
            flow: Flow::add_category(),
            inputs: strings(&["Legs", "-"]),
        },
        FlowCase {
            flow: Flow::edit_category(1),
            inputs: strings(&["-", "-"]),
        },
        FlowCase {
            flow: Flow::add_weekly_menu(),
            inputs: strings(&["Week 2"]),
        },
        FlowCase {
            flow: Flow::add_day_to_menu(menu.id),
            inputs: strings(&["3"]),
        },
        FlowCase {
            flow: Flow::add_meal_to_day(menu.id),
            inputs: vec![
                "1".to_string(),
                "08:00".to_string(),
                nutrition.id.to_string(),
                "-".to_string(),
            ],
        },
    ]
}

#[tokio::test]
async fn test_cancel_keyword_at_any_step_deletes_state_without_store_calls() {
    for keyword in ["/cancel", "Cancel", "ОТМЕНА"] {
        let store = MemoryStore::new();
        let cases = flow_cases(&store).await;

        for case in cases {
            for depth in 0..=case.inputs.len() {
                let engine = engine(&store);
                engine.start(ADMIN_ID, case.flow.clone(), None).await;
                for input in &case.inputs[..depth] {
                    engine.handle_input(ADMIN_ID, input).await;
                }
                assert!(
                    engine.has_active_flow(ADMIN_ID).await,
                    "{} should still be active after {depth} inputs",
                    case.flow.kind()
                );

                store.clear_calls();
                let replies = engine.handle_input(ADMIN_ID, keyword).await;

                assert!(
                    store.calls().is_empty(),
                    "cancel in {} after {depth} inputs called {:?}",
                    case.flow.kind(),
                    store.calls()
                );
                assert!(!engine.has_active_flow(ADMIN_ID).await);
                assert_eq!(
                    replies.first().and_then(Reply::text),
                    Some(t_lang("flow-cancelled", None).as_str())
                );
                assert!(replies.contains(&Reply::Screen(Screen::AdminPanel)));
            }
        }
    }
}

#[tokio::test]
async fn test_non_numeric_input_keeps_step_and_fields() {
    let store = MemoryStore::new();
    let menu = seed_menu(&store, "Week 1").await;
    seed_nutrition(&store, "Oats", 350).await;

    let numeric_steps: Vec<(Flow, Vec<&str>)> = vec![
        (Flow::add_training(None), vec!["Squats"]),
        (Flow::edit_training(1), vec!["-"]),
        (Flow::add_nutrition(), vec!["Oats", "-"]),
        (Flow::add_nutrition(), vec!["Oats", "-", "350"]),
        (Flow::add_nutrition(), vec!["Oats", "-", "350", "12"]),
        (Flow::add_nutrition(), vec!["Oats", "-", "350", "12", "60"]),
        (Flow::add_nutrition(), vec!["Oats", "-", "350", "12", "60", "7"]),
        (Flow::edit_nutrition(1), vec!["-", "-", "350"]),
        (Flow::add_day_to_menu(menu.id), vec![]),
        (Flow::add_meal_to_day(menu.id), vec!["2", "13:00"]),
    ];

    for (flow, inputs) in numeric_steps {
        let engine = engine(&store);
        engine.start(ADMIN_ID, flow, None).await;
        send(&engine, &inputs).await;

        let before = engine.conversations().get(ADMIN_ID).await.unwrap();
        store.clear_calls();

        let replies = engine.handle_input(ADMIN_ID, "abc").await;

        let after = engine.conversations().get(ADMIN_ID).await.unwrap();
        assert_eq!(before, after, "state changed in {}", before.flow.kind());
        assert!(store.calls().is_empty());
        assert_eq!(
            replies.last().and_then(Reply::text),
            Some(t_lang(before.flow.prompt_key(), None).as_str()),
            "prompt not repeated in {}",
            before.flow.kind()
        );
    }
}

#[tokio::test]
async fn test_nutrition_calories_prompt_repeats_on_bad_input() {
    let store = MemoryStore::new();
    let engine = engine(&store);
    engine.start(ADMIN_ID, Flow::add_nutrition(), None).await;
    send(&engine, &["Oats", "Rolled oats"]).await;
    assert_eq!(current_flow(&engine, ADMIN_ID).await.unwrap().step(), 3);

    let replies = engine.handle_input(ADMIN_ID, "abc").await;

    let flow = current_flow(&engine, ADMIN_ID).await.unwrap();
    assert_eq!(flow.step(), 3);
    let texts = texts(&replies);
    assert!(texts.last().unwrap().contains("Введите калорийность"));
    assert_eq!(texts.first().unwrap(), &t_lang("input-not-a-number", None));
}

#[tokio::test]
async fn test_day_number_out_of_range_is_rejected() {
    let store = MemoryStore::new();
    let menu = seed_menu(&store, "Week 1").await;
    let engine = engine(&store);
    engine
        .start(ADMIN_ID, Flow::add_day_to_menu(menu.id), None)
        .await;
    store.clear_calls();

    for input in ["0", "8", "-1", "100"] {
        let replies = engine.handle_input(ADMIN_ID, input).await;
        assert_eq!(
            texts(&replies).first().unwrap(),
            &t_lang("input-day-out-of-range", None)
        );
    }

    assert_eq!(store.count_calls("add_day"), 0);
    assert_eq!(
        current_flow(&engine, ADMIN_ID).await,
        Some(Flow::add_day_to_menu(menu.id))
    );
}

#[tokio::test]
async fn test_day_number_maps_to_weekday_and_creates_one_day() {
    for day_number in 1..=7 {
        let store = MemoryStore::new();
        let menu = seed_menu(&store, "Week 1").await;
        let engine = engine(&store);
        engine
            .start(ADMIN_ID, Flow::add_day_to_menu(menu.id), None)
            .await;
        store.clear_calls();

        let replies = engine
            .handle_input(ADMIN_ID, &day_number.to_string())
            .await;

        assert_eq!(store.count_calls("add_day"), 1);
        let days = store.days();
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].day_number, day_number);
        assert_eq!(days[0].day_name, WEEKDAY_NAMES[(day_number - 1) as usize]);

        // The meal question comes after the day exists
        match replies.last() {
            Some(Reply::Choices { text, choices }) => {
                assert_eq!(text, &t_lang("day-ask-meal", None));
                assert_eq!(choices.len(), 2);
            }
            other => panic!("expected the meal question, got {other:?}"),
        }
        assert_eq!(
            current_flow(&engine, ADMIN_ID).await,
            Some(Flow::AddDayToMenu {
                menu_id: menu.id,
                form: DayForm::AddMealPrompt {
                    day_number,
                    day_name: WEEKDAY_NAMES[(day_number - 1) as usize].to_string(),
                },
            })
        );
    }
    assert_eq!(WEEKDAY_NAMES[0], "Понедельник");
    assert_eq!(WEEKDAY_NAMES[6], "Воскресенье");
}

#[tokio::test]
async fn test_add_day_yes_chains_into_add_meal() {
    let store = MemoryStore::new();
    let menu = seed_menu(&store, "Week 1").await;
    let engine = engine(&store);
    engine
        .start(ADMIN_ID, Flow::add_day_to_menu(menu.id), None)
        .await;
    send(&engine, &["2"]).await;

    let replies = engine.handle_input(ADMIN_ID, "ДА").await;

    let flow = current_flow(&engine, ADMIN_ID).await.unwrap();
    assert_eq!(flow.kind(), FlowKind::AddMealToDay);
    assert_eq!(flow.step(), 1);
    assert_eq!(flow.target_id(), Some(menu.id));
    assert_eq!(
        replies.last().and_then(Reply::text),
        Some(t_lang("meal-type-prompt", None).as_str())
    );
}

#[tokio::test]
async fn test_add_day_no_shows_menu_details() {
    let store = MemoryStore::new();
    let menu = seed_menu(&store, "Week 1").await;
    let engine = engine(&store);
    engine
        .start(ADMIN_ID, Flow::add_day_to_menu(menu.id), None)
        .await;
    send(&engine, &["2"]).await;

    let replies = engine.handle_input(ADMIN_ID, "нет").await;

    assert!(!engine.has_active_flow(ADMIN_ID).await);
    assert_eq!(replies, vec![Reply::Screen(Screen::MenuDetails(menu.id))]);
}

#[tokio::test]
async fn test_meal_targets_last_created_day() {
    let store = MemoryStore::new();
    let menu = seed_menu(&store, "Week 1").await;
    let nutrition = seed_nutrition(&store, "Oats", 350).await;

    // Friday first, then Tuesday: the last created day is Tuesday
    for day_number in [5, 2] {
        store
            .add_day(NewMenuDay {
                menu_id: menu.id,
                day_number,
                day_name: WEEKDAY_NAMES[(day_number - 1) as usize].to_string(),
            })
            .await
            .unwrap();
    }
    let tuesday = store
        .days()
        .into_iter()
        .find(|d| d.day_number == 2)
        .unwrap();

    let engine = engine(&store);
    engine
        .start(ADMIN_ID, Flow::add_meal_to_day(menu.id), None)
        .await;
    let replies = send(&engine, &["1", "08:00", &nutrition.id.to_string(), "-"]).await;

    let meals = store.meals();
    assert_eq!(meals.len(), 1);
    assert_eq!(meals[0].day_id, tuesday.id);
    assert_eq!(meals[0].meal_type, "Завтрак");
    assert_eq!(meals[0].meal_time, "08:00");
    assert_eq!(meals[0].notes, "");
    assert_eq!(texts(&replies).first().unwrap(), &t_lang("meal-added", None));
    assert_eq!(
        current_flow(&engine, ADMIN_ID).await,
        Some(Flow::AddMealToDay {
            menu_id: menu.id,
            form: MealForm::AnotherMeal,
        })
    );
}

#[tokio::test]
async fn test_meal_loop_and_exit() {
    let store = MemoryStore::new();
    let menu = seed_menu(&store, "Week 1").await;
    let nutrition = seed_nutrition(&store, "Oats", 350).await;
    let engine = engine(&store);
    engine
        .start(ADMIN_ID, Flow::add_day_to_menu(menu.id), None)
        .await;
    let nutrition_id = nutrition.id.to_string();

    send(&engine, &["1", "да", "1", "08:00", &nutrition_id, "-"]).await;
    send(&engine, &["yes", "Полдник", "16:00", &nutrition_id, "after workout"]).await;
    let replies = engine.handle_input(ADMIN_ID, "нет").await;

    assert!(!engine.has_active_flow(ADMIN_ID).await);
    assert_eq!(replies, vec![Reply::Screen(Screen::MenuDetails(menu.id))]);

    let meals = store.meals();
    assert_eq!(meals.len(), 2);
    assert_eq!(meals[1].meal_type, "Полдник");
    assert_eq!(meals[1].notes, "after workout");
    assert_eq!(store.menu(menu.id).unwrap().total_calories, 700);
}

#[tokio::test]
async fn test_food_list_request_keeps_nutrition_step() {
    let store = MemoryStore::new();
    let menu = seed_menu(&store, "Week 1").await;
    let engine = engine(&store);
    engine
        .start(ADMIN_ID, Flow::add_meal_to_day(menu.id), None)
        .await;
    send(&engine, &["3", "19:00"]).await;
    let before = current_flow(&engine, ADMIN_ID).await.unwrap();

    let replies = engine.handle_input(ADMIN_ID, "/foodlist").await;

    assert_eq!(current_flow(&engine, ADMIN_ID).await.unwrap(), before);
    assert_eq!(before.step(), 3);
    assert_eq!(replies.first(), Some(&Reply::Screen(Screen::FoodList)));
    assert_eq!(
        replies.last().and_then(Reply::text),
        Some(t_lang("meal-nutrition-prompt", None).as_str())
    );
}

#[tokio::test]
async fn test_missing_nutrition_reports_error_and_asks_again() {
    let store = MemoryStore::new();
    let menu = seed_menu(&store, "Week 1").await;
    store
        .add_day(NewMenuDay {
            menu_id: menu.id,
            day_number: 1,
            day_name: WEEKDAY_NAMES[0].to_string(),
        })
        .await
        .unwrap();
    let engine = engine(&store);
    engine
        .start(ADMIN_ID, Flow::add_meal_to_day(menu.id), None)
        .await;

    let replies = send(&engine, &["1", "08:00", "999", "-"]).await;

    assert!(store.meals().is_empty());
    let first = texts(&replies).into_iter().next().unwrap();
    assert!(first.contains("999"), "unexpected reply {first}");
    assert_eq!(
        current_flow(&engine, ADMIN_ID).await.map(|f| f.step()),
        Some(5)
    );
}

#[tokio::test]
async fn test_meal_without_days_ends_flow() {
    let store = MemoryStore::new();
    let menu = seed_menu(&store, "Week 1").await;
    let nutrition = seed_nutrition(&store, "Oats", 350).await;
    let engine = engine(&store);
    engine
        .start(ADMIN_ID, Flow::add_meal_to_day(menu.id), None)
        .await;

    let replies = send(&engine, &["1", "08:00", &nutrition.id.to_string(), "-"]).await;

    assert!(!engine.has_active_flow(ADMIN_ID).await);
    assert_eq!(texts(&replies), vec![t_lang("error-menu-no-days", None)]);
}

#[tokio::test]
async fn test_add_category_scenario() {
    let store = MemoryStore::new();
    let engine = engine(&store);
    engine.start(ADMIN_ID, Flow::add_category(), None).await;

    let replies = send(&engine, &["Legs", "", "training"]).await;

    assert_eq!(store.count_calls("create_category"), 1);
    let categories = store.list_categories().await.unwrap();
    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0].name, "Legs");
    assert_eq!(categories[0].description, "");
    assert_eq!(categories[0].kind, "training");
    assert!(!engine.has_active_flow(ADMIN_ID).await);
    assert!(replies.contains(&Reply::Screen(Screen::CategoriesAdmin)));
}

#[tokio::test]
async fn test_add_training_carries_category() {
    let store = MemoryStore::new();
    let engine = engine(&store);
    engine.start(ADMIN_ID, Flow::add_training(Some(4)), None).await;

    send(&engine, &["Squats", "45", "https://youtu.be/x", "Three sets"]).await;

    let trainings = store.trainings();
    assert_eq!(trainings.len(), 1);
    assert_eq!(trainings[0].title, "Squats");
    assert_eq!(trainings[0].duration, 45);
    assert_eq!(trainings[0].category_id, Some(4));
    assert_eq!(trainings[0].youtube_link, "https://youtu.be/x");
    assert_eq!(trainings[0].description, "Three sets");
    assert!(!engine.has_active_flow(ADMIN_ID).await);
}

#[tokio::test]
async fn test_non_positive_duration_is_rejected_at_the_step() {
    let store = MemoryStore::new();
    let engine = engine(&store);
    engine.start(ADMIN_ID, Flow::add_training(None), None).await;
    send(&engine, &["Squats"]).await;

    let replies = engine.handle_input(ADMIN_ID, "0").await;

    assert_eq!(texts(&replies)[0], t_lang("input-not-positive", None));
    assert_eq!(current_flow(&engine, ADMIN_ID).await.unwrap().step(), 2);
}

#[tokio::test]
async fn test_blank_training_title_restarts_flow() {
    let store = MemoryStore::new();
    let engine = engine(&store);
    engine.start(ADMIN_ID, Flow::add_training(Some(2)), None).await;

    let replies = send(&engine, &["   ", "30", "-", "-"]).await;

    assert_eq!(store.count_calls("create_training"), 0);
    assert_eq!(
        current_flow(&engine, ADMIN_ID).await,
        Some(Flow::add_training(Some(2)))
    );
    let texts = texts(&replies);
    assert_eq!(texts[0], t_lang("validation-empty-training-title", None));
    assert_eq!(texts[1], t_lang("flow-restart", None));
    assert_eq!(texts[2], t_lang("training-title-prompt", None));
}

#[tokio::test]
async fn test_blank_menu_name_restarts_flow() {
    let store = MemoryStore::new();
    let engine = engine(&store);
    engine.start(ADMIN_ID, Flow::add_weekly_menu(), None).await;

    send(&engine, &["", "-"]).await;

    assert_eq!(store.count_calls("create_weekly_menu"), 0);
    assert_eq!(
        current_flow(&engine, ADMIN_ID).await,
        Some(Flow::add_weekly_menu())
    );
}

#[tokio::test]
async fn test_store_failure_fails_closed() {
    let store = MemoryStore::new();
    store.fail_on("create_category");
    let engine = engine(&store);
    engine.start(ADMIN_ID, Flow::add_category(), None).await;

    let replies = send(&engine, &["Legs", "-", "training"]).await;

    assert!(!engine.has_active_flow(ADMIN_ID).await);
    let error_text = t_lang("error-database", None);
    assert!(texts(&replies)[0].contains(&error_text));
}

#[tokio::test]
async fn test_edit_training_keeps_title_on_skip_marker() {
    let store = MemoryStore::new();
    let training = store
        .create_training(NewTraining {
            title: "Squats".to_string(),
            duration: 30,
            youtube_link: "https://youtu.be/a".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    let engine = engine(&store);
    engine
        .start(ADMIN_ID, Flow::edit_training(training.id), None)
        .await;

    let replies = send(&engine, &["-", "50", "-", "Deeper"]).await;

    let updated = store.get_training(training.id).await.unwrap().unwrap();
    assert_eq!(updated.title, "Squats");
    assert_eq!(updated.duration, 50);
    assert_eq!(updated.youtube_link, "https://youtu.be/a");
    assert_eq!(updated.description, "Deeper");
    assert_eq!(texts(&replies)[0], t_lang("training-updated", None));
}

#[tokio::test]
async fn test_edit_missing_training_fails_closed() {
    let store = MemoryStore::new();
    let engine = engine(&store);
    engine.start(ADMIN_ID, Flow::edit_training(77), None).await;

    let replies = send(&engine, &["New", "20", "-", "-"]).await;

    assert!(!engine.has_active_flow(ADMIN_ID).await);
    assert_eq!(store.count_calls("update_training"), 0);
    assert!(texts(&replies)[0].contains("77"));
}

#[tokio::test]
async fn test_flow_uses_language_captured_at_start() {
    let store = MemoryStore::new();
    let engine = engine(&store);

    let first = engine
        .start(ADMIN_ID, Flow::add_weekly_menu(), Some("en-US"))
        .await;
    assert_eq!(
        first[0].text(),
        Some(t_lang("menu-name-prompt", Some("en")).as_str())
    );

    let replies = engine.handle_input(ADMIN_ID, "Week 1").await;
    assert_eq!(
        replies.last().and_then(Reply::text),
        Some(t_lang("menu-description-prompt", Some("en")).as_str())
    );
}

#[tokio::test]
async fn test_start_prompt_offers_cancel_choice() {
    let store = MemoryStore::new();
    let engine = engine(&store);

    let replies = engine.start(ADMIN_ID, Flow::add_category(), None).await;

    match &replies[0] {
        Reply::Choices { choices, .. } => {
            assert_eq!(choices.last().unwrap().token, "flow:/cancel");
        }
        other => panic!("expected choices, got {other:?}"),
    }
}

#[tokio::test]
async fn test_external_cancel_and_missing_flow() {
    let store = MemoryStore::new();
    let engine = engine(&store);

    assert!(engine.handle_input(ADMIN_ID, "hello").await.is_empty());
    assert!(engine.cancel(ADMIN_ID).await.is_empty());

    engine.start(ADMIN_ID, Flow::add_nutrition(), None).await;
    let replies = engine.cancel(ADMIN_ID).await;
    assert!(!engine.has_active_flow(ADMIN_ID).await);
    assert_eq!(texts(&replies), vec![t_lang("flow-cancelled", None)]);
}

#[tokio::test]
async fn test_actors_do_not_share_state() {
    let store = MemoryStore::new();
    let engine = engine(&store);

    engine.start(ADMIN_ID, Flow::add_training(None), None).await;
    engine.start(SECOND_ADMIN, Flow::add_training(None), None).await;
    engine.handle_input(SECOND_ADMIN, "Push-ups").await;
    engine.handle_input(SECOND_ADMIN, "15").await;
    let second_before = current_flow(&engine, SECOND_ADMIN).await;

    let first_engine = engine.clone();
    let second_engine = engine.clone();
    let (_, _) = tokio::join!(
        async move {
            for input in ["Squats", "30", "-"] {
                first_engine.handle_input(ADMIN_ID, input).await;
            }
        },
        async move {
            second_engine.conversations().get(SECOND_ADMIN).await
        }
    );

    assert_eq!(current_flow(&engine, SECOND_ADMIN).await, second_before);
    assert_eq!(
        current_flow(&engine, ADMIN_ID).await,
        Some(Flow::AddTraining {
            category_id: None,
            form: TrainingForm::Description {
                title: "Squats".to_string(),
                duration: 30,
                youtube_link: String::new(),
            },
        })
    );

    engine.handle_input(ADMIN_ID, "отмена").await;
    assert!(engine.has_active_flow(SECOND_ADMIN).await);
}

#[tokio::test]
async fn test_concurrent_actors_finish_independently() {
    let store = MemoryStore::new();
    let engine = engine(&store);
    let actors: Vec<i64> = (1..=8).collect();

    for actor in &actors {
        engine.start(*actor, Flow::add_category(), None).await;
    }

    let mut handles = Vec::new();
    for actor in actors.clone() {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            let name = format!("Category {actor}");
            for input in [name.as_str(), "-", "general"] {
                engine.handle_input(actor, input).await;
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let mut names: Vec<String> = store
        .list_categories()
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    names.sort();
    let mut expected: Vec<String> = actors.iter().map(|a| format!("Category {a}")).collect();
    expected.sort();
    assert_eq!(names, expected);
    for actor in actors {
        assert!(!engine.has_active_flow(actor).await);
    }
}
