use gajamap_core::db::open_db_in_memory;
use gajamap_core::{
    CoreEvent, DayFilter, Item, ItemDraft, ItemPatch, ItemValidationError, RepoError, RepoResult,
    SqliteStateRepository, StateRepository, StoreError, StoredState, Trip, TripId, TripStore,
};
use rusqlite::Connection;
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;

fn load(conn: &Connection) -> TripStore<SqliteStateRepository<'_>> {
    TripStore::load_or_migrate(SqliteStateRepository::try_new(conn).unwrap()).unwrap()
}

/// Fresh store whose current trip has no items.
fn empty_store(conn: &Connection) -> TripStore<SqliteStateRepository<'_>> {
    let mut store = load(conn);
    store.items().clear().unwrap();
    store
}

fn record_events(store: &mut TripStore<SqliteStateRepository<'_>>) -> Rc<RefCell<Vec<CoreEvent>>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    store.subscribe(move |event: &CoreEvent| sink.borrow_mut().push(event.clone()));
    events
}

fn draft(name: &str, day: &str) -> ItemDraft {
    ItemDraft::new(name, format!("Open map https://naver.me/{name}"), day, "")
}

#[test]
fn add_appends_to_current_trip_and_persists() {
    let conn = open_db_in_memory().unwrap();
    let mut store = empty_store(&conn);

    let item = store
        .items()
        .add(ItemDraft::new(
            " Gwangjang Market ",
            "[Naver Map] Gwangjang https://naver.me/gj",
            "2",
            " bindaetteok ",
        ))
        .unwrap()
        .expect("current trip exists");
    assert_eq!(item.name, "Gwangjang Market");
    assert_eq!(item.url, "https://naver.me/gj");
    assert_eq!(item.day, "2");
    assert_eq!(item.memo, "bindaetteok");
    assert!(!item.visited);

    drop(store);
    let reloaded = load(&conn);
    assert_eq!(reloaded.current().unwrap().items, vec![item]);
}

#[test]
fn adds_and_removes_leave_exactly_the_survivors_with_unique_ids() {
    let conn = open_db_in_memory().unwrap();
    let mut store = empty_store(&conn);

    let mut added = Vec::new();
    for name in ["a", "b", "c", "d", "e"] {
        added.push(store.items().add(draft(name, "1")).unwrap().unwrap().id);
    }
    assert!(store.items().remove(added[1]).unwrap());
    assert!(store.items().remove(added[3]).unwrap());
    assert!(!store.items().remove(added[3]).unwrap());
    assert!(!store.items().remove(-1).unwrap());

    let remaining = store
        .items()
        .list()
        .iter()
        .map(|item| item.id)
        .collect::<Vec<_>>();
    assert_eq!(remaining, vec![added[0], added[2], added[4]]);

    let unique = added.iter().collect::<HashSet<_>>();
    assert_eq!(unique.len(), added.len());
}

#[test]
fn add_rejects_invalid_input_without_changing_state() {
    let conn = open_db_in_memory().unwrap();
    let mut store = empty_store(&conn);
    let events = record_events(&mut store);

    let err = store
        .items()
        .add(ItemDraft::new("Cafe", "naver.me/cafe", "1", ""))
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::InvalidItem(ItemValidationError::UrlNotFound)
    ));

    let err = store
        .items()
        .add(ItemDraft::new("", "https://naver.me/x", "1", ""))
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::InvalidItem(ItemValidationError::MissingName)
    ));

    assert!(store.items().list().is_empty());
    assert!(events.borrow().is_empty());
}

#[test]
fn add_without_current_trip_is_a_silent_no_op() {
    let conn = open_db_in_memory().unwrap();
    let mut store = empty_store(&conn);
    let trip_id = store.current_trip_id().unwrap();

    store.set_current(-42);
    assert!(store.items().add(draft("ghost", "1")).unwrap().is_none());
    assert!(store.trip(trip_id).unwrap().items.is_empty());
}

#[test]
fn update_applies_partial_edits_and_keeps_blank_fields() {
    let conn = open_db_in_memory().unwrap();
    let mut store = empty_store(&conn);
    let item = store
        .items()
        .add(ItemDraft::new("Namsan", "https://naver.me/namsan", "1", "cable car"))
        .unwrap()
        .unwrap();

    let patch = ItemPatch {
        name: Some("  ".to_string()),
        url: Some("moved: https://naver.me/namsan2".to_string()),
        day: Some("3".to_string()),
        memo: Some(String::new()),
    };
    let updated = store.items().update(item.id, &patch).unwrap().unwrap();
    assert_eq!(updated.name, "Namsan");
    assert_eq!(updated.url, "https://naver.me/namsan2");
    assert_eq!(updated.day, "3");
    assert_eq!(updated.memo, "");

    drop(store);
    let reloaded = load(&conn);
    assert_eq!(reloaded.current().unwrap().items, vec![updated]);
}

#[test]
fn update_with_bad_url_changes_nothing_and_unknown_id_is_no_op() {
    let conn = open_db_in_memory().unwrap();
    let mut store = empty_store(&conn);
    let item = store.items().add(draft("palace", "1")).unwrap().unwrap();

    let patch = ItemPatch {
        name: Some("Renamed".to_string()),
        url: Some("no link".to_string()),
        ..ItemPatch::default()
    };
    assert!(store.items().update(item.id, &patch).is_err());
    assert_eq!(store.items().list(), &[item.clone()]);

    let rename = ItemPatch {
        name: Some("Renamed".to_string()),
        ..ItemPatch::default()
    };
    assert!(store.items().update(item.id + 1000, &rename).unwrap().is_none());
}

#[test]
fn toggle_signals_only_on_unvisited_to_visited() {
    let conn = open_db_in_memory().unwrap();
    let mut store = empty_store(&conn);
    let item = store.items().add(draft("tower", "1")).unwrap().unwrap();
    let events = record_events(&mut store);

    let first = store.items().toggle_visited(item.id).unwrap().unwrap();
    assert!(first.visited);
    assert!(first.became_visited);

    let second = store.items().toggle_visited(item.id).unwrap().unwrap();
    assert!(!second.visited);
    assert!(!second.became_visited);

    assert!(store.items().toggle_visited(-1).unwrap().is_none());

    assert_eq!(
        *events.borrow(),
        vec![
            CoreEvent::StateChanged,
            CoreEvent::ItemBecameVisited(item.id),
            CoreEvent::StateChanged,
        ]
    );
}

#[test]
fn query_current_orders_unvisited_then_visited_newest_first() {
    let conn = open_db_in_memory().unwrap();
    let mut store = empty_store(&conn);
    let a = store.items().add(draft("A", "1")).unwrap().unwrap();
    let b = store.items().add(draft("B", "1")).unwrap().unwrap();
    let c = store.items().add(draft("C", "1")).unwrap().unwrap();
    store.items().add(draft("D", "2")).unwrap().unwrap();
    store.items().toggle_visited(b.id).unwrap();

    let view = store
        .query_current(&DayFilter::parse("1"), "")
        .into_iter()
        .map(|item| item.id)
        .collect::<Vec<_>>();
    assert_eq!(view, vec![c.id, a.id, b.id]);
}

#[test]
fn clear_empties_the_current_trip_only() {
    let conn = open_db_in_memory().unwrap();
    let mut store = empty_store(&conn);
    store.items().add(draft("x", "1")).unwrap();
    store.items().add(draft("y", "1")).unwrap();

    assert_eq!(store.items().clear().unwrap(), 2);
    assert_eq!(store.items().clear().unwrap(), 0);
    assert!(store.current().unwrap().items.is_empty());
}

#[test]
fn trip_settings_validate_and_persist() {
    let conn = open_db_in_memory().unwrap();
    let mut store = empty_store(&conn);

    assert!(matches!(
        store.rename_current("   "),
        Err(StoreError::InvalidTrip(_))
    ));
    assert!(matches!(
        store.set_current_days(0),
        Err(StoreError::InvalidTrip(_))
    ));
    assert!(store.rename_current(" Seoul Fan Trip ").unwrap());
    assert!(store.set_current_days(4).unwrap());

    drop(store);
    let reloaded = load(&conn);
    let trip = reloaded.current().unwrap();
    assert_eq!(trip.title, "Seoul Fan Trip");
    assert_eq!(trip.days, 4);
}

/// In-memory repository whose saves can be switched to fail.
struct FlakyRepo {
    state: RefCell<Option<StoredState>>,
    fail_saves: Rc<Cell<bool>>,
}

impl StateRepository for FlakyRepo {
    fn load_state(&self) -> RepoResult<Option<StoredState>> {
        Ok(self.state.borrow().clone())
    }

    fn load_legacy_items(&self) -> RepoResult<Option<Vec<Item>>> {
        Ok(None)
    }

    fn save_state(&self, trips: &[Trip], current_trip_id: Option<TripId>) -> RepoResult<()> {
        if self.fail_saves.get() {
            return Err(RepoError::InvalidData("disk full".to_string()));
        }
        *self.state.borrow_mut() = Some(StoredState {
            trips: trips.to_vec(),
            current_trip_id,
        });
        Ok(())
    }
}

#[test]
fn failed_save_leaves_memory_as_it_was_and_notifies_nobody() {
    let fail_saves = Rc::new(Cell::new(false));
    let repo = FlakyRepo {
        state: RefCell::new(None),
        fail_saves: Rc::clone(&fail_saves),
    };
    let mut store = TripStore::load_or_migrate(repo).unwrap();
    let sample_id = store.current().unwrap().items[0].id;
    let before = store.trips().to_vec();
    let current = store.current_trip_id();
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    store.subscribe(move |event: &CoreEvent| sink.borrow_mut().push(event.clone()));

    fail_saves.set(true);
    assert!(matches!(
        store.items().add(draft("lost", "1")),
        Err(StoreError::Repo(_))
    ));
    assert!(store.items().toggle_visited(sample_id).is_err());
    assert!(store.items().clear().is_err());
    assert!(store.archive().archive_current_and_start_new().is_err());
    assert!(store.rename_current("Renamed").is_err());

    assert_eq!(store.trips(), before.as_slice());
    assert_eq!(store.current_trip_id(), current);
    assert!(events.borrow().is_empty());

    fail_saves.set(false);
    let kept = store.items().add(draft("kept", "1")).unwrap().unwrap();
    assert_eq!(store.items().list().len(), 2);
    assert_eq!(store.items().list()[1].id, kept.id);
    assert_eq!(*events.borrow(), vec![CoreEvent::StateChanged]);
}
