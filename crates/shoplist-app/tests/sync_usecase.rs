mod support;

use std::time::Duration as StdDuration;

use shoplist_app::directives::Directive;
use shoplist_app::sync::BackgroundRegroupLoader;
use shoplist_app::{Collaborators, ListChange, ListSource, ShoppingListEngine};
use shoplist_core::auto_delete::{AutoDeleteSetting, OnboardingState};
use shoplist_core::grouped::{ListDiff, RowChange};

use support::{Fixture, HeldLoader, MemorySettings, catalog, keys, store};

#[test]
fn first_sync_builds_the_grouped_rows_as_a_reload() {
    let fixture = Fixture::new(vec![
        catalog(3, store(2, "Beta"), "bread"),
        catalog(1, store(1, "Alpha"), "milk"),
    ]);
    let mut engine = fixture.engine(ListSource::Main);

    let change = engine.refresh_from_storage().expect("refresh");
    assert_eq!(change, ListChange::Rebuilt(ListDiff::Reload { len: 5 }));
    assert_eq!(keys(engine.rows()), vec!["H1", "#1", "H2", "#3", "F"]);
    assert_eq!(
        fixture.host.take(),
        vec![Directive::RefreshRange { start: 0, len: 5 }]
    );
}

#[test]
fn rebuild_stays_granular_while_animations_are_pending() {
    let fixture = Fixture::new(vec![
        catalog(1, store(1, "Alpha"), "milk"),
        catalog(2, store(1, "Alpha"), "eggs"),
        catalog(3, store(2, "Beta"), "bread"),
    ]);
    let mut engine = fixture.loaded();
    engine.on_swipe_delete(2).expect("delete");
    fixture.host.take();
    assert!(engine.session().has_pending_animations());

    let mut items = fixture.storage.items();
    items.retain(|item| item.title != "bread");
    let change = engine.on_sync_received(items.clone()).expect("sync");
    assert_eq!(
        change,
        ListChange::Rebuilt(ListDiff::Changes(vec![
            RowChange::Removed { index: 2 },
            RowChange::Removed { index: 2 },
        ]))
    );
    assert_eq!(
        fixture.host.take(),
        vec![Directive::RowRemoved(2), Directive::RowRemoved(2)]
    );

    engine.on_animations_finished();
    items.push(catalog(4, store(2, "Beta"), "butter"));
    let change = engine.on_sync_received(items).expect("sync");
    assert_eq!(change, ListChange::Rebuilt(ListDiff::Reload { len: 5 }));
}

#[test]
fn sync_during_a_drag_is_queued_and_applied_when_it_ends() {
    let fixture = Fixture::new(vec![catalog(1, store(1, "Alpha"), "milk")]);
    let mut engine = fixture.loaded();

    engine.on_drag_state_changed(true).expect("drag start");
    let mut items = fixture.storage.items();
    items.push(catalog(2, store(1, "Alpha"), "eggs"));
    assert_eq!(
        engine.on_sync_received(items).expect("sync"),
        ListChange::Queued
    );
    assert!(engine.session().has_queued_sync());
    assert_eq!(keys(engine.rows()), vec!["H1", "#1", "F"]);

    let change = engine.on_drag_state_changed(false).expect("drag end");
    assert!(matches!(change, ListChange::Rebuilt(_)));
    assert!(!engine.session().has_queued_sync());
    assert_eq!(keys(engine.rows()), vec!["H1", "#1", "#2", "F"]);
}

#[test]
fn only_the_newest_regroup_is_applied() {
    let fixture = Fixture::new(Vec::new());
    let loader = HeldLoader::default();
    let mut engine = ShoppingListEngine::new(
        Collaborators {
            loader: &loader,
            ..fixture.collaborators()
        },
        fixture.config.clone(),
        ListSource::Main,
    );

    let first = engine
        .on_sync_received(vec![catalog(1, store(1, "Alpha"), "milk")])
        .expect("first sync");
    let second = engine
        .on_sync_received(vec![catalog(2, store(2, "Beta"), "bread")])
        .expect("second sync");
    assert_eq!(first, ListChange::Pending { token: 1 });
    assert_eq!(second, ListChange::Pending { token: 2 });
    assert_eq!(loader.tokens(), vec![1, 2]);

    loader.release(1);
    assert_eq!(engine.poll_regroup().expect("poll"), None);
    assert_eq!(keys(engine.rows()), vec!["F"]);

    loader.release(2);
    assert!(engine.poll_regroup().expect("poll").is_some());
    assert_eq!(keys(engine.rows()), vec!["H2", "#2", "F"]);
    assert!(!engine.has_regroup_in_flight());
}

#[test]
fn background_regroup_result_is_applied_by_the_owner() {
    let fixture = Fixture::new(vec![catalog(1, store(1, "Alpha"), "milk")]);
    let loader = BackgroundRegroupLoader::new();
    let mut engine = ShoppingListEngine::new(
        Collaborators {
            loader: &loader,
            ..fixture.collaborators()
        },
        fixture.config.clone(),
        ListSource::Main,
    );

    let change = engine.refresh_from_storage().expect("refresh");
    if matches!(change, ListChange::Pending { .. }) {
        let applied = engine
            .await_regroup(StdDuration::from_secs(5))
            .expect("await regroup");
        assert!(applied.is_some());
    }
    assert_eq!(keys(engine.rows()), vec!["H1", "#1", "F"]);
}

#[test]
fn passive_sync_reports_the_auto_delete_count_once() {
    let fixture = Fixture::new(vec![catalog(1, store(1, "Alpha"), "milk")]).with_settings(
        MemorySettings::with(AutoDeleteSetting::Immediately, OnboardingState::DoNotShow, 3),
    );
    let mut engine = fixture.engine(ListSource::Main);

    engine.refresh_from_storage().expect("first sync");
    assert!(
        fixture
            .host
            .take()
            .contains(&Directive::ShowPassiveNotice { count: 3 })
    );
    assert_eq!(fixture.settings.snapshot().auto_delete_count, 0);

    engine.refresh_from_storage().expect("second sync");
    assert!(
        !fixture
            .host
            .take()
            .iter()
            .any(|directive| matches!(directive, Directive::ShowPassiveNotice { .. }))
    );
}

#[test]
fn hidden_main_list_holds_the_passive_notice_but_embedded_lists_show_it() {
    let settings = || MemorySettings::with(AutoDeleteSetting::SevenDays, OnboardingState::Init, 2);

    let main = Fixture::new(Vec::new()).with_settings(settings());
    let mut engine = main.engine(ListSource::Main);
    engine.on_list_hidden().expect("hide");
    engine.refresh_from_storage().expect("sync");
    assert!(main.host.take().is_empty());
    assert_eq!(main.settings.snapshot().auto_delete_count, 2);

    let embedded = Fixture::new(Vec::new()).with_settings(settings());
    let mut engine = embedded.engine(ListSource::Embedded);
    engine.on_list_hidden().expect("hide");
    engine.refresh_from_storage().expect("sync");
    assert!(
        embedded
            .host
            .take()
            .contains(&Directive::ShowPassiveNotice { count: 2 })
    );
}
