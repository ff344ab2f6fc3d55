//! End-to-end tests of the store through its public API.

use pawtrack::model::{
    ClockTime, Departure, DoseSchedule, ExitType, Incident, IsoDate, MedicationConfig,
    MedicationEntry, NamedLocation, Outcome, Profile, Settings, Timestamp, TriggerType,
    WeeklyTarget,
};
use pawtrack::schema::{INCIDENTS, PROFILES};
use pawtrack::{
    settings, Coordinate, Database, SortOrder, StoreConfig, SyncPolicy, Value, Window,
};
use serde_json::json;
use std::time::Duration;

fn ts(text: &str) -> Timestamp {
    Timestamp::parse(text).unwrap()
}

fn date(text: &str) -> IsoDate {
    IsoDate::parse(text).unwrap()
}

async fn store_with_dog() -> (Database, Profile) {
    let db = Database::in_memory().await.unwrap();
    let dog = db.create_profile("Rex").await.unwrap();
    (db, dog)
}

// ==================== Range queries ====================

#[tokio::test]
async fn test_range_returns_owner_records_newest_first() {
    let (db, dog) = store_with_dog().await;
    let other = db.create_profile("Bella").await.unwrap();

    let t1 = Incident::new(&dog.id, ts("2024-03-01T08:00:00Z"), TriggerType::Dog, 1);
    let t2 = Incident::new(&dog.id, ts("2024-03-02T08:00:00Z"), TriggerType::Dog, 2);
    let t3 = Incident::new(&dog.id, ts("2024-03-03T08:00:00Z"), TriggerType::Dog, 3);
    let foreign = Incident::new(&other.id, ts("2024-03-02T09:00:00Z"), TriggerType::Dog, 4);
    for incident in [&t3, &t1, &foreign, &t2] {
        db.add(incident.clone()).await.unwrap();
    }

    let found = db
        .incidents_in_range(&dog.id, &t1.timestamp, &t2.timestamp)
        .await
        .unwrap();
    assert_eq!(found, vec![t2.clone(), t1.clone()]);

    let ascending: Vec<Incident> = db
        .range_by_owner_and_time(&dog.id, &t1.timestamp, &t3.timestamp, SortOrder::Ascending)
        .await
        .unwrap();
    assert_eq!(ascending, vec![t1.clone(), t2, t3.clone()]);

    let inverted = db
        .incidents_in_range(&dog.id, &t3.timestamp, &t1.timestamp)
        .await
        .unwrap();
    assert!(inverted.is_empty());
}

#[tokio::test]
async fn test_range_bounds_compare_as_instants() {
    let (db, dog) = store_with_dog().await;
    let incident = Incident::new(&dog.id, ts("2024-03-01T10:00:00.000Z"), TriggerType::Car, 2);
    db.add(incident.clone()).await.unwrap();

    // Same instant written with an offset and without milliseconds.
    let start = ts("2024-03-01T12:00:00+02:00");
    let found = db.incidents_in_range(&dog.id, &start, &start).await.unwrap();
    assert_eq!(found, vec![incident]);
}

#[tokio::test]
async fn test_pagination_is_stable() {
    let (db, dog) = store_with_dog().await;
    for minute in 0..50 {
        let at = ts(&format!("2024-03-01T10:{minute:02}:00Z"));
        db.add(Incident::new(&dog.id, at, TriggerType::Person, 2))
            .await
            .unwrap();
    }

    let first = Window::first(20);
    let page = db.timeline_page::<Incident>(&dog.id, first).await.unwrap();
    let again = db.timeline_page::<Incident>(&dog.id, first).await.unwrap();
    assert_eq!(page, again);
    assert_eq!(page[0].timestamp.as_str(), "2024-03-01T10:49:00.000Z");

    let grown = db
        .timeline_page::<Incident>(&dog.id, first.extend(20))
        .await
        .unwrap();
    assert_eq!(grown.len(), 40);
    assert_eq!(&grown[..20], &page[..]);

    let next = db
        .timeline_page::<Incident>(&dog.id, first.next_page())
        .await
        .unwrap();
    assert_eq!(&grown[20..], &next[..]);

    let tail = db
        .timeline_page::<Incident>(&dog.id, Window::new(40, 20))
        .await
        .unwrap();
    assert_eq!(tail.len(), 10);
}

#[tokio::test]
async fn test_departures_and_targets() {
    let (db, dog) = store_with_dog().await;
    let short = Departure::new(
        &dog.id,
        ts("2024-12-23T08:00:00Z"),
        10,
        ExitType::FrontDoor,
        Outcome::Calm,
    );
    let long = Departure::new(
        &dog.id,
        ts("2024-12-24T08:00:00Z"),
        45,
        ExitType::GarageDoor,
        Outcome::Rough,
    );
    db.add(short.clone()).await.unwrap();
    db.add(long.clone()).await.unwrap();

    let week = db
        .departures_in_range(&dog.id, &ts("2024-12-23T00:00:00Z"), &ts("2024-12-29T23:59:59Z"))
        .await
        .unwrap();
    assert_eq!(week, vec![long.clone(), short]);

    let rough: Vec<Departure> = db
        .where_equals("outcome", &[Value::from("rough")])
        .await
        .unwrap();
    assert_eq!(rough, vec![long]);

    let target = db.set_weekly_target(&dog.id, &date("2024-12-23"), 60).await.unwrap();
    let targets: Vec<WeeklyTarget> = db
        .range_by_owner_and_time(
            &dog.id,
            &date("2024-12-01"),
            &date("2024-12-31"),
            SortOrder::Ascending,
        )
        .await
        .unwrap();
    assert_eq!(targets, vec![target]);
}

#[tokio::test]
async fn test_medication_entries() {
    let (db, dog) = store_with_dog().await;
    let morning = DoseSchedule::new("Morning", ClockTime::parse("08:00").unwrap(), 50.0);
    let config = MedicationConfig::new(&dog.id, "Trazodone", vec![morning.clone()]);
    let other = MedicationConfig::new(
        &dog.id,
        "Gabapentin",
        vec![DoseSchedule::new("Evening", ClockTime::parse("20:00").unwrap(), 100.0)],
    );
    db.add(config.clone()).await.unwrap();
    db.add(other.clone()).await.unwrap();

    for day in ["2024-03-03", "2024-03-01", "2024-03-02"] {
        let given = ClockTime::parse("08:05").unwrap();
        let entry = MedicationEntry::for_schedule(&config, &morning, date(day), given);
        db.add(entry).await.unwrap();
    }
    let evening = MedicationEntry::for_schedule(
        &other,
        &other.doses[0],
        date("2024-03-02"),
        ClockTime::parse("20:00").unwrap(),
    );
    db.add(evening.clone()).await.unwrap();

    let in_range = db
        .medication_entries_in_range(&dog.id, &date("2024-03-01"), &date("2024-03-02"))
        .await
        .unwrap();
    let days: Vec<&str> = in_range.iter().map(|e| e.date.as_str()).collect();
    assert_eq!(days, vec!["2024-03-01", "2024-03-02", "2024-03-02"]);

    let trazodone = db.medication_entries_for(&dog.id, &config.id).await.unwrap();
    assert_eq!(trazodone.len(), 3);
    assert!(trazodone.iter().all(|e| e.medication_id == config.id));
    assert_eq!(
        db.medication_entries_for(&dog.id, &other.id).await.unwrap(),
        vec![evening]
    );
}

// ==================== Durability ====================

#[tokio::test]
async fn test_reopen_restores_state() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pawtrack.log");
    let config = StoreConfig::append_log(&path).with_sync(SyncPolicy::OsBuffered);

    let (dog, incident, home) = {
        let db = Database::open(config.clone()).await.unwrap();
        let dog = db.create_profile("Rex").await.unwrap();
        let at = ts("2024-03-01T08:00:00Z");
        let incident = Incident::new(&dog.id, at, TriggerType::Skateboard, 3);
        db.add(incident.clone()).await.unwrap();
        let home = NamedLocation::new(&dog.id, "Home", Coordinate::new(52.52, 13.405));
        db.add(home.clone()).await.unwrap();
        let incident: Incident = db.update(&incident.id, json!({ "intensity": 5 })).await.unwrap();
        settings::add_recent_tag(&db, &dog.id, "walk").await.unwrap();
        db.delete::<NamedLocation>(&home.id).await.unwrap();
        (dog, incident, home)
    };

    let db = Database::open(config).await.unwrap();
    assert_eq!(db.active_profile().await.unwrap(), Some(dog.clone()));
    assert_eq!(db.get::<Incident>(&incident.id).await.unwrap(), incident);
    assert!(db.find::<NamedLocation>(&home.id).await.unwrap().is_none());
    assert_eq!(
        db.get::<Settings>(&dog.id).await.unwrap().recent_tags,
        vec!["walk"]
    );

    // Indexes are rebuilt on replay.
    let found = db
        .incidents_in_range(&dog.id, &incident.timestamp, &incident.timestamp)
        .await
        .unwrap();
    assert_eq!(found, vec![incident]);
}

#[tokio::test]
async fn test_rejected_writes_are_not_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pawtrack.log");
    let config = StoreConfig::append_log(&path);

    let dog = {
        let db = Database::open(config.clone()).await.unwrap();
        let dog = db.create_profile("Rex").await.unwrap();
        let bad = Incident::new(&dog.id, ts("2024-03-01T08:00:00Z"), TriggerType::Other, 0);
        assert!(db.add(bad).await.unwrap_err().is_validation());
        let dup = Profile::with_id(dog.id.as_str(), "Again");
        assert!(db.add(dup).await.unwrap_err().is_conflict());
        dog
    };

    let db = Database::open(config).await.unwrap();
    assert_eq!(db.count(PROFILES).await.unwrap(), 1);
    assert_eq!(db.count(INCIDENTS).await.unwrap(), 0);
    assert_eq!(db.get::<Profile>(&dog.id).await.unwrap().name, "Rex");
}

// ==================== Orphans ====================

#[tokio::test]
async fn test_profile_delete_leaves_records() {
    let (db, dog) = store_with_dog().await;
    let incident = Incident::new(&dog.id, ts("2024-03-01T08:00:00Z"), TriggerType::Dog, 2);
    db.add(incident.clone()).await.unwrap();

    db.delete::<Profile>(&dog.id).await.unwrap();
    assert_eq!(db.get::<Incident>(&incident.id).await.unwrap(), incident);

    // New records still need an existing owner.
    let late = Incident::new(&dog.id, ts("2024-03-02T08:00:00Z"), TriggerType::Dog, 2);
    assert!(db.add(late).await.unwrap_err().is_validation());
}

// ==================== Live queries ====================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_burst_of_writes_is_coalesced() {
    let (db, dog) = store_with_dog().await;
    let start = ts("2024-03-01T00:00:00Z");
    let end = ts("2024-03-31T00:00:00Z");
    let mut live =
        db.live_timeline_range::<Incident>(dog.id.as_str(), start, end, SortOrder::Descending);
    assert_eq!(live.ready().await.into_value(), Some(Vec::new()));

    for day in 1..=5 {
        let at = ts(&format!("2024-03-0{day}T08:00:00Z"));
        db.add(Incident::new(&dog.id, at, TriggerType::Bike, 2))
            .await
            .unwrap();
    }

    // Every write is eventually reflected.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let state = tokio::time::timeout_at(deadline, live.changed())
            .await
            .unwrap()
            .unwrap();
        if state.value().map(Vec::len) == Some(5) {
            break;
        }
    }
    let newest = live.state().into_value().unwrap();
    assert_eq!(newest[0].timestamp.as_str(), "2024-03-05T08:00:00.000Z");
}

#[tokio::test]
async fn test_dropped_live_query_is_unregistered() {
    let (db, dog) = store_with_dog().await;
    {
        let mut live = db.live_named_locations(dog.id.as_str());
        live.ready().await;
        assert_eq!(db.registry().query_count(), 1);
    }
    assert_eq!(db.registry().query_count(), 0);

    db.add(NamedLocation::new(&dog.id, "Park", Coordinate::new(1.0, 1.0)))
        .await
        .unwrap();
    assert_eq!(db.registry().flush(), 0);
}
