use gajamap_core::db::open_db_in_memory;
use gajamap_core::{
    LoadSource, SqliteStateRepository, StateRepository, TripStore, DEFAULT_TRIP_DAYS,
    NEW_TRIP_TITLE,
};
use rusqlite::{params, Connection};

fn put_slot(conn: &Connection, key: &str, value: &str) {
    conn.execute(
        "INSERT INTO kv_slots (key, value) VALUES (?1, ?2);",
        params![key, value],
    )
    .unwrap();
}

fn read_slot(conn: &Connection, key: &str) -> Option<String> {
    conn.query_row(
        "SELECT value FROM kv_slots WHERE key = ?1;",
        [key],
        |row| row.get(0),
    )
    .ok()
}

fn load(conn: &Connection) -> TripStore<SqliteStateRepository<'_>> {
    TripStore::load_or_migrate(SqliteStateRepository::try_new(conn).unwrap()).unwrap()
}

const LEGACY_ITEMS: &str = r#"[
    {"id": 1600000000000, "name": "Hongdae", "url": "https://naver.me/hongdae", "day": "1", "memo": "", "visited": true},
    {"id": 1600000000001, "name": "Myeongdong", "url": "https://naver.me/myeongdong", "day": 2, "memo": "street food"}
]"#;

#[test]
fn fresh_install_creates_sample_trip_and_persists_it() {
    let conn = open_db_in_memory().unwrap();
    let store = load(&conn);

    assert_eq!(store.load_report().source, LoadSource::CreatedDefault);
    assert_eq!(store.trips().len(), 1);
    let trip = store.current().expect("fresh install selects a trip");
    assert_eq!(trip.title, "My First Trip ✨");
    assert_eq!(trip.days, DEFAULT_TRIP_DAYS);
    assert_eq!(trip.items.len(), 1);
    assert_ne!(trip.items[0].id, trip.id);
    assert!(!trip.items[0].visited);

    assert!(read_slot(&conn, "gajaTrips").is_some());
    assert_eq!(
        read_slot(&conn, "gajaCurrentTripId"),
        Some(trip.id.to_string())
    );
}

#[test]
fn legacy_items_are_wrapped_into_one_current_trip() {
    let conn = open_db_in_memory().unwrap();
    put_slot(&conn, "pilgrimagePlaces", LEGACY_ITEMS);

    let store = load(&conn);
    assert_eq!(
        store.load_report().source,
        LoadSource::MigratedLegacy { item_count: 2 }
    );

    let trip = store.current().unwrap();
    assert_eq!(trip.title, "My First Trip 🇰🇷");
    assert_eq!(trip.days, 7);
    assert!(!trip.archived);
    let names = trip
        .items
        .iter()
        .map(|item| item.name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["Hongdae", "Myeongdong"]);
    assert_eq!(trip.items[1].day, "2");
    assert!(trip.items[0].visited);
    assert!(trip.id > 1600000000001);
}

#[test]
fn migration_runs_once_even_if_legacy_slot_remains() {
    let conn = open_db_in_memory().unwrap();
    put_slot(&conn, "pilgrimagePlaces", LEGACY_ITEMS);

    let first_trip_id = {
        let mut store = load(&conn);
        let trip_id = store.current_trip_id().unwrap();
        store.rename_current("Seoul 2024").unwrap();
        trip_id
    };

    let store = load(&conn);
    assert_eq!(store.load_report().source, LoadSource::Restored);
    assert_eq!(store.trips().len(), 1);
    assert_eq!(store.current_trip_id(), Some(first_trip_id));
    assert_eq!(store.current().unwrap().title, "Seoul 2024");
    assert!(read_slot(&conn, "pilgrimagePlaces").is_some());
}

#[test]
fn dangling_current_id_is_repaired_to_first_trip_and_persisted() {
    let conn = open_db_in_memory().unwrap();
    put_slot(
        &conn,
        "gajaTrips",
        r#"[
            {"id": 20, "title": "Jeju", "days": 3, "items": [], "archived": false, "createdAt": "2024-04-01T09:00:00.000Z"},
            {"id": 10, "title": "Busan", "days": 2, "items": [], "archived": true, "createdAt": "2024-03-01T09:00:00.000Z"}
        ]"#,
    );
    put_slot(&conn, "gajaCurrentTripId", "999");

    let store = load(&conn);
    let report = store.load_report();
    assert_eq!(report.source, LoadSource::Restored);
    assert!(report.current_repaired);
    assert_eq!(store.current_trip_id(), Some(20));
    assert_eq!(read_slot(&conn, "gajaCurrentTripId").as_deref(), Some("20"));
}

#[test]
fn missing_current_slot_selects_first_trip() {
    let conn = open_db_in_memory().unwrap();
    put_slot(
        &conn,
        "gajaTrips",
        r#"[{"id": 30, "title": "Daegu", "days": 1, "items": []}]"#,
    );

    let store = load(&conn);
    assert!(store.load_report().current_repaired);
    assert_eq!(store.current_trip_id(), Some(30));
}

#[test]
fn empty_trip_list_gets_a_new_trip_and_persists_it() {
    let conn = open_db_in_memory().unwrap();
    put_slot(&conn, "gajaTrips", "[]");
    put_slot(&conn, "gajaCurrentTripId", "5");

    let store = load(&conn);
    assert!(store.load_report().current_repaired);
    assert_eq!(store.trips().len(), 1);
    let trip = store.current().unwrap();
    assert_eq!(trip.title, NEW_TRIP_TITLE);
    assert!(trip.items.is_empty());

    let persisted = SqliteStateRepository::try_new(&conn)
        .unwrap()
        .load_state()
        .unwrap()
        .unwrap();
    assert_eq!(persisted.trips.len(), 1);
    assert_eq!(persisted.current_trip_id, Some(trip.id));
}

#[test]
fn valid_state_is_restored_without_rewrite() {
    let conn = open_db_in_memory().unwrap();
    put_slot(
        &conn,
        "gajaTrips",
        r#"[{"id": 40, "title": "Incheon", "days": 2, "items": []}]"#,
    );
    put_slot(&conn, "gajaCurrentTripId", "40");
    conn.execute("UPDATE kv_slots SET updated_at = 1;", []).unwrap();

    let store = load(&conn);
    assert!(!store.load_report().current_repaired);

    let untouched: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM kv_slots WHERE updated_at = 1;",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(untouched, 2);
}

#[test]
fn corrupt_trip_slot_fails_load_instead_of_resetting() {
    let conn = open_db_in_memory().unwrap();
    put_slot(&conn, "gajaTrips", "{broken");

    let repo = SqliteStateRepository::try_new(&conn).unwrap();
    assert!(TripStore::load_or_migrate(repo).is_err());
    assert_eq!(read_slot(&conn, "gajaTrips").as_deref(), Some("{broken"));
}

#[test]
fn duplicate_legacy_ids_are_reissued_and_survive_a_backup_round_trip() {
    let conn = open_db_in_memory().unwrap();
    put_slot(
        &conn,
        "pilgrimagePlaces",
        r#"[
            {"id": 5, "name": "A", "url": "https://naver.me/a", "day": "1"},
            {"id": 5, "name": "B", "url": "https://naver.me/b", "day": "1"}
        ]"#,
    );

    let mut store = load(&conn);
    assert_eq!(store.load_report().reissued_ids, 1);
    let items = store.current().unwrap().items.clone();
    assert_eq!(items[0].id, 5);
    assert_eq!(items[0].name, "A");
    assert_ne!(items[1].id, 5);
    assert_eq!(items[1].name, "B");

    let outcome = store.items().toggle_visited(5).unwrap().unwrap();
    assert!(outcome.visited);
    let flags = store
        .current()
        .unwrap()
        .items
        .iter()
        .map(|item| item.visited)
        .collect::<Vec<_>>();
    assert_eq!(flags, vec![true, false]);

    let document = store.export_all().unwrap();
    let report = store.import_all(&document).unwrap();
    assert_eq!(report.item_count, 2);

    drop(store);
    let reloaded = load(&conn);
    assert_eq!(reloaded.load_report().reissued_ids, 0);
}

#[test]
fn duplicate_ids_in_trip_slot_are_reissued_and_persisted() {
    let conn = open_db_in_memory().unwrap();
    put_slot(
        &conn,
        "gajaTrips",
        r#"[
            {"id": 50, "title": "Jeju", "days": 3, "items": [
                {"id": 51, "name": "Beach", "url": "https://naver.me/beach", "day": "1"}
            ]},
            {"id": 50, "title": "Busan", "days": 2, "items": [
                {"id": 51, "name": "Market", "url": "https://naver.me/market", "day": "2"}
            ]}
        ]"#,
    );
    put_slot(&conn, "gajaCurrentTripId", "50");

    let store = load(&conn);
    let report = store.load_report();
    assert_eq!(report.reissued_ids, 2);
    assert!(!report.current_repaired);
    assert_eq!(store.current().unwrap().title, "Jeju");

    let busan = &store.trips()[1];
    assert!(busan.id > 51);
    assert!(busan.items[0].id > 51);
    assert_ne!(busan.id, busan.items[0].id);

    let persisted = SqliteStateRepository::try_new(&conn)
        .unwrap()
        .load_state()
        .unwrap()
        .unwrap();
    assert_eq!(persisted.trips, store.trips());
}
