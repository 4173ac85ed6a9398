//! Binder and notifier behaviour seen from outside the crate.

mod common;

use std::sync::Arc;

use common::{recording_subscriber, Log};
use todo_lab::binder::{Binder, Binding, BoundValues, Inputs};
use todo_lab::observable::{
    FailureKind, Mapped, Observable, ObservableArray, ObservableValue, RecordingSink, Subscriber,
};

/// Render function logging the value bound under `name` on every render.
fn recorder<V: Clone + Send + Sync + 'static>(
    name: &'static str,
) -> (Log<Option<V>>, impl Fn(&BoundValues<V>) + Send + Sync + 'static) {
    let log: Log<Option<V>> = Arc::default();
    let sink = Arc::clone(&log);
    (log, move |values: &BoundValues<V>| {
        sink.lock().push(values.get(name).cloned())
    })
}

#[test]
fn every_write_notifies_even_when_equal() {
    let value = ObservableValue::new(5);
    let (subscriber, log) = recording_subscriber();
    value.subscribe(&subscriber, None);

    value.write(5);
    value.write(5);

    assert_eq!(log.lock().len(), 2);
}

#[test]
fn bound_value_rerenders_once_per_write() {
    let count = ObservableValue::new(0);
    let (renders, render) = recorder::<i32>("count");
    let binder = Binder::mount(
        Inputs::new().bind("count", Binding::new(count.clone())),
        render,
    );
    assert_eq!(*renders.lock(), vec![Some(0)]);

    count.write(1);

    assert_eq!(*renders.lock(), vec![Some(0), Some(1)]);
    assert_eq!(binder.render_count(), 2);
}

#[test]
fn filter_rejects_small_values() {
    let obs = ObservableValue::new(0);
    let (renders, render) = recorder::<i32>("x");
    let binder = Binder::mount(
        Inputs::new().bind("x", Binding::new(obs.clone()).filter(|value, _| *value > 10)),
        render,
    );

    obs.write(5);
    assert_eq!(binder.render_count(), 1);

    obs.write(11);
    assert_eq!(binder.render_count(), 2);
    assert_eq!(renders.lock().last().cloned().flatten(), Some(11));
}

#[test]
fn action_scoped_binding_ignores_other_changes() {
    let array = ObservableArray::new(vec![3, 1, 2]);
    let (renders, render) = recorder::<Vec<i32>>("items");
    let binder = Binder::mount(
        Inputs::new().bind("items", Binding::new(array.clone()).action("push")),
        render,
    );

    array.sort_by(|a, b| a.cmp(b));
    assert_eq!(binder.render_count(), 1);

    array.push([4]);
    assert_eq!(binder.render_count(), 2);
    assert_eq!(renders.lock().last().cloned().flatten(), Some(vec![1, 2, 3, 4]));
}

#[test]
fn unknown_action_leaves_binding_inert() {
    let value = ObservableValue::new(1);
    let binder = Binder::mount(
        Inputs::new().bind("v", Binding::new(value.clone()).action("bogus")),
        |_: &BoundValues<i32>| {},
    );

    value.write(2);

    assert_eq!(binder.render_count(), 1);
    assert_eq!(value.subscriber_count(), 0);
}

#[test]
fn update_moves_subscription_to_new_source() {
    let first = ObservableValue::new(1);
    let second = ObservableValue::new(20);
    let (renders, render) = recorder::<i32>("v");
    let binder = Binder::mount(Inputs::new().bind("v", Binding::new(first.clone())), render);

    binder.update(Inputs::new().bind("v", Binding::new(second.clone())));
    assert_eq!(first.subscriber_count(), 0);
    assert_eq!(second.subscriber_count(), 1);
    assert_eq!(renders.lock().last().cloned().flatten(), Some(20));

    first.write(2);
    assert_eq!(binder.render_count(), 2);
    second.write(21);
    assert_eq!(binder.render_count(), 3);
}

#[test]
fn mapped_sources_share_one_binder() {
    let name = ObservableValue::new("milk".to_string());
    let done = ObservableValue::new(false);
    let (renders, render) = recorder::<String>("done");
    let binder = Binder::mount(
        Inputs::new()
            .bind("name", Binding::new(name.clone()))
            .bind(
                "done",
                Binding::new(Mapped::new(done.clone(), |flag: &bool| flag.to_string())),
            ),
        render,
    );

    done.write(true);

    assert_eq!(renders.lock().last().cloned().flatten(), Some("true".to_string()));
    assert_eq!(binder.values().get("name"), Some(&"milk".to_string()));
    assert_eq!(binder.subscription_count(), 2);
}

#[test]
fn unmount_releases_everything() {
    let value = ObservableValue::new(0);
    let binder = Binder::mount(
        Inputs::new()
            .plain("label", 7)
            .bind("v", Binding::new(value.clone())),
        |_: &BoundValues<i32>| {},
    );
    assert_eq!(value.subscriber_count(), 1);

    binder.unmount();
    value.write(1);

    assert_eq!(value.subscriber_count(), 0);
    assert_eq!(binder.render_count(), 1);
    assert!(!binder.is_mounted());
}

#[test]
fn failing_subscribers_do_not_stop_dispatch() {
    let sink = Arc::new(RecordingSink::new());
    let notifier: Observable<i32, String> = Observable::with_sink(sink.clone());
    let failing = Subscriber::fallible(|_: &i32, _: &String| Err(anyhow::anyhow!("boom")));
    let panicking = Subscriber::new(|_: &i32, _: &String| panic!("render exploded"));
    let (healthy, log) = recording_subscriber::<i32, String>();
    notifier.subscribe(&failing, None);
    notifier.subscribe(&panicking, None);
    notifier.subscribe(&healthy, None);

    notifier.notify(1, "tick".to_string());

    assert_eq!(log.lock().len(), 1);
    let failures = sink.failures();
    assert_eq!(failures.len(), 2);
    assert_eq!(failures[0].kind, FailureKind::Error);
    assert!(failures[0].message.contains("boom"));
    assert_eq!(failures[1].kind, FailureKind::Panic);
    assert_eq!(failures[1].action, "tick");
}

#[test]
fn subscribers_added_during_dispatch_wait_for_the_next_one() {
    let notifier: Observable<i32, String> = Observable::new();
    let (late, late_log) = recording_subscriber::<i32, String>();
    let adder = {
        let notifier = notifier.clone();
        let late = late.clone();
        Subscriber::new(move |_: &i32, _: &String| {
            notifier.subscribe(&late, None);
        })
    };
    notifier.subscribe(&adder, None);

    notifier.notify(1, "a".to_string());
    assert!(late_log.lock().is_empty());

    notifier.notify(2, "b".to_string());
    assert_eq!(*late_log.lock(), vec![(2, "b".to_string())]);
}

#[test]
fn persisted_events_replay_on_subscribe() {
    let notifier: Observable<i32, String> = Observable::new();
    notifier.notify_persistent(1, "x".to_string());
    notifier.notify(2, "x".to_string());
    notifier.notify_persistent(3, "y".to_string());

    let (all, all_log) = recording_subscriber::<i32, String>();
    notifier.subscribe(&all, None);
    let (only_y, y_log) = recording_subscriber::<i32, String>();
    notifier.subscribe(&only_y, Some("y".to_string()));

    assert_eq!(
        *all_log.lock(),
        vec![(1, "x".to_string()), (3, "y".to_string())]
    );
    assert_eq!(*y_log.lock(), vec![(3, "y".to_string())]);
    assert_eq!(notifier.persisted_len(), 2);
}

#[test]
fn duplicate_registration_is_a_no_op() {
    let notifier: Observable<i32, String> = Observable::new();
    let (subscriber, log) = recording_subscriber::<i32, String>();
    notifier.subscribe(&subscriber, None);
    notifier.subscribe(&subscriber, None);
    let scoped = notifier.subscribe(&subscriber, Some("a".to_string()));
    assert_eq!(notifier.subscriber_count(), 2);

    notifier.notify(1, "a".to_string());
    assert_eq!(log.lock().len(), 2);

    scoped.unsubscribe();
    scoped.unsubscribe();
    assert!(!notifier.unsubscribe(&subscriber, Some("a".to_string())));
    assert_eq!(notifier.subscriber_count(), 1);
}
