use crate::todo::{ItemQuery, TodoSnapshot};
use crate::ui::mvi::Reducer;
use crate::ui::todo::intent::TodoIntent;
use crate::ui::todo::state::TodoListState;

pub struct TodoReducer;

impl Reducer for TodoReducer {
    type State = TodoListState;
    type Intent = TodoIntent;

    fn reduce(state: Self::State, intent: Self::Intent) -> Self::State {
        match intent {
            TodoIntent::Add { action, at } => {
                let TodoListState {
                    mut items,
                    next_id,
                    next_priority,
                    completed_items_last,
                } = state;
                items.push(TodoSnapshot {
                    id: next_id,
                    action,
                    priority: next_priority,
                    completed: false,
                    date_created: at,
                    date_completed: None,
                });
                TodoListState {
                    items,
                    next_id: next_id + 1,
                    next_priority: next_priority + 1,
                    completed_items_last,
                }
            }
            TodoIntent::Delete { ids } => TodoListState {
                items: state
                    .items
                    .into_iter()
                    .filter(|item| !ids.contains(&item.id))
                    .collect(),
                ..state
            },
            TodoIntent::DeleteAllCompleted => TodoListState {
                items: state.items.into_iter().filter(|item| !item.completed).collect(),
                ..state
            },
            TodoIntent::SetAction { id, action } => {
                let mut state = state;
                if let Some(item) = state.items.iter_mut().find(|item| item.id == id) {
                    item.action = action;
                }
                state
            }
            TodoIntent::Toggle { id, at } => {
                let mut state = state;
                if let Some(item) = state.items.iter_mut().find(|item| item.id == id) {
                    item.completed = !item.completed;
                    if item.completed {
                        item.date_completed = Some(at);
                    }
                }
                state
            }
            TodoIntent::Move { id, distance } => {
                let mut order = state.get_items(&ItemQuery::new());
                let Some(index) = order.iter().position(|item| item.id == id) else {
                    return state;
                };
                let moved = order.remove(index);
                let target = (index as i64).saturating_add(distance).clamp(0, order.len() as i64) as usize;
                order.insert(target, moved);

                let mut state = state;
                for (priority, ordered) in (0u32..).zip(&order) {
                    if let Some(item) = state.items.iter_mut().find(|item| item.id == ordered.id) {
                        item.priority = priority;
                    }
                }
                state
            }
            TodoIntent::SetCompletedItemsLast(completed_items_last) => TodoListState {
                completed_items_last,
                ..state
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn add(state: TodoListState, action: &str) -> TodoListState {
        let at = Utc.with_ymd_and_hms(2024, 2, 1, 8, 0, 0).unwrap();
        TodoReducer::reduce(
            state,
            TodoIntent::Add {
                action: action.to_string(),
                at,
            },
        )
    }

    fn actions(state: &TodoListState) -> Vec<String> {
        state.visible_items().into_iter().map(|item| item.action).collect()
    }

    #[test]
    fn add_assigns_increasing_ids_and_priorities() {
        let state = add(add(TodoListState::default(), "a"), "b");
        assert_eq!(state.items[0].id, 0);
        assert_eq!(state.items[1].id, 1);
        assert_eq!(state.items[1].priority, 1);
        assert_eq!(state.next_id, 2);
    }

    #[test]
    fn toggle_and_completed_last() {
        let state = add(add(add(TodoListState::default(), "a"), "b"), "c");
        let at = state.items[0].date_created + Duration::minutes(30);

        let state = TodoReducer::reduce(state, TodoIntent::Toggle { id: 0, at });
        assert!(state.items[0].completed);
        assert_eq!(state.items[0].completion_time(), Some(Duration::minutes(30)));
        assert_eq!(actions(&state), vec!["a", "b", "c"]);

        let state = TodoReducer::reduce(state, TodoIntent::SetCompletedItemsLast(true));
        assert_eq!(actions(&state), vec!["b", "c", "a"]);
        assert_eq!(state.completed_count(), 1);
    }

    #[test]
    fn move_clamps_and_renumbers() {
        let state = add(add(add(TodoListState::default(), "a"), "b"), "c");
        let state = TodoReducer::reduce(state, TodoIntent::Move { id: 2, distance: -5 });
        assert_eq!(actions(&state), vec!["c", "a", "b"]);

        let unchanged = TodoReducer::reduce(state.clone(), TodoIntent::Move { id: 42, distance: 1 });
        assert_eq!(unchanged, state);
    }

    #[test]
    fn move_saturates_extreme_distances() {
        let state = add(add(add(TodoListState::default(), "a"), "b"), "c");
        let state = TodoReducer::reduce(state, TodoIntent::Move { id: 1, distance: i64::MAX });
        assert_eq!(actions(&state), vec!["a", "c", "b"]);

        let state = TodoReducer::reduce(state, TodoIntent::Move { id: 2, distance: i64::MIN });
        assert_eq!(actions(&state), vec!["c", "a", "b"]);
    }

    #[test]
    fn deletes() {
        let state = add(add(add(TodoListState::default(), "a"), "b"), "c");
        let at = state.items[0].date_created;
        let state = TodoReducer::reduce(state, TodoIntent::Toggle { id: 1, at });
        let state = TodoReducer::reduce(state, TodoIntent::DeleteAllCompleted);
        assert_eq!(actions(&state), vec!["a", "c"]);

        let state = TodoReducer::reduce(state, TodoIntent::Delete { ids: vec![0, 7] });
        assert_eq!(actions(&state), vec!["c"]);

        let state = TodoReducer::reduce(
            state,
            TodoIntent::SetAction {
                id: 2,
                action: "renamed".to_string(),
            },
        );
        assert_eq!(actions(&state), vec!["renamed"]);
    }
}
