//! Integration tests for `SqliteStore` against an in-memory database.

use appcat_core::{
  device::DeviceFamily,
  query::{Attribute, IndexName, IndexQuery, Operand, Predicate},
  record::{AppRecord, RawAttributes},
  store::{AppStore, AppStoreExt},
};
use serde_json::{Value, json};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn raw(value: Value) -> RawAttributes {
  match value {
    Value::Object(map) => map,
    _ => panic!("expected an object"),
  }
}

fn priced(country: &str, currency: &str, price: f64) -> AppRecord {
  AppRecord::new(100000000, country, Some(raw(json!({ "currency": currency, "price": price }))))
    .unwrap()
}

fn with_devices(app_id: i64, country: &str, devices: &[&str]) -> AppRecord {
  AppRecord::new(app_id, country, Some(raw(json!({ "supportedDevices": devices })))).unwrap()
}

/// The five records priced the way the storefront fixtures are.
async fn seed_prices(s: &SqliteStore) {
  for (country, price) in [("us", 1.50), ("ca", 5.00), ("in", 3.50), ("mx", 1.25), ("sa", 0.0)] {
    s.upsert(&priced(country, "USD", price), true).await.unwrap();
  }
}

fn countries(records: Vec<AppRecord>) -> Vec<String> {
  let mut out: Vec<_> = records.iter().map(|r| r.country().to_owned()).collect();
  out.sort();
  out
}

// ─── Point operations ────────────────────────────────────────────────────────

#[tokio::test]
async fn upsert_then_get_round_trips() {
  let s = store().await;
  let record = AppRecord::new(
    726232588,
    "us",
    Some(raw(json!({
      "trackName": "Example",
      "currency": "USD",
      "price": 0.99,
      "releaseDate": "2013-07-23T07:00:00Z",
      "genres": ["Games", "Puzzle"],
      "supportedDevices": ["iPhone6", "iPad2Wifi"],
    }))),
  )
  .unwrap();

  s.upsert(&record, true).await.unwrap();
  let fetched = s.get(726232588, "us").await.unwrap().unwrap();

  assert_eq!(fetched, record);
  assert!(fetched.supports(DeviceFamily::Pad));
  assert!(!fetched.supports(DeviceFamily::Pod));
}

#[tokio::test]
async fn get_missing_returns_none() {
  let s = store().await;
  assert!(s.get(1, "us").await.unwrap().is_none());
}

#[tokio::test]
async fn country_is_part_of_the_key() {
  let s = store().await;
  s.upsert(&priced("us", "USD", 1.0), true).await.unwrap();
  assert!(s.get(100000000, "mx").await.unwrap().is_none());
}

#[tokio::test]
async fn delete_then_get_is_absent() {
  let s = store().await;
  let record = AppRecord::new(100, "in", None).unwrap();
  s.upsert(&record, true).await.unwrap();

  s.delete(100, "in").await.unwrap();
  assert!(s.get(100, "in").await.unwrap().is_none());
  assert!(s.is_empty().await.unwrap());
}

#[tokio::test]
async fn deleting_absent_key_is_ok() {
  let s = store().await;
  s.delete(42, "fr").await.unwrap();
}

#[tokio::test]
async fn non_overwrite_upsert_conflicts() {
  let s = store().await;
  s.upsert(&priced("us", "USD", 1.0), false).await.unwrap();

  let err = s.upsert(&priced("us", "USD", 2.0), false).await.unwrap_err();
  assert!(err.is_conflict());

  // The original image is untouched.
  let kept = s.get(100000000, "us").await.unwrap().unwrap();
  assert_eq!(kept.price(), Some(1.0));
}

#[tokio::test]
async fn overwrite_replaces_whole_image() {
  let s = store().await;
  let first = AppRecord::new(
    7,
    "jp",
    Some(raw(json!({ "artistName": "Someone", "supportedDevices": ["iPad2Wifi"] }))),
  )
  .unwrap();
  s.upsert(&first, true).await.unwrap();

  let second = with_devices(7, "jp", &["iPhone6"]);
  s.upsert(&second, true).await.unwrap();

  let fetched = s.get(7, "jp").await.unwrap().unwrap();
  assert_eq!(fetched, second);
  assert_eq!(fetched.attributes().artist_name, None);
  assert!(!fetched.supports(DeviceFamily::Pad));

  // The stale pad entry is gone from the index too.
  let pads: Vec<_> = s.find().by_device("iPad2Wifi").execute().await.unwrap().collect();
  assert!(pads.is_empty());
  assert_eq!(s.len().await.unwrap(), 1);
}

// ─── Price queries ───────────────────────────────────────────────────────────

#[tokio::test]
async fn by_price_range_is_inclusive() {
  let s = store().await;
  seed_prices(&s).await;

  let found = s
    .find()
    .by_price("USD", 1.50, Some(3.50))
    .execute()
    .await
    .unwrap()
    .collect::<Result<Vec<_>, _>>()
    .unwrap();

  let mut prices: Vec<f64> = found.iter().filter_map(AppRecord::price).collect();
  prices.sort_by(f64::total_cmp);
  assert_eq!(prices, [1.50, 3.50]);
}

#[tokio::test]
async fn by_price_exact_finds_free_apps() {
  let s = store().await;
  seed_prices(&s).await;

  let free = s
    .find()
    .by_price("USD", 0.0, None)
    .execute()
    .await
    .unwrap()
    .collect::<Result<Vec<_>, _>>()
    .unwrap();
  assert_eq!(countries(free), ["sa"]);
}

#[tokio::test]
async fn by_price_respects_currency() {
  let s = store().await;
  seed_prices(&s).await;
  s.upsert(&priced("de", "EUR", 2.0), true).await.unwrap();

  let euros = s
    .find()
    .by_price("EUR", 0.0, Some(10.0))
    .execute()
    .await
    .unwrap()
    .collect::<Result<Vec<_>, _>>()
    .unwrap();
  assert_eq!(countries(euros), ["de"]);
}

#[tokio::test]
async fn by_price_agrees_with_in_memory_filter() {
  let s = store().await;
  let prices = [0.0, 0.99, 1.25, 1.5, 1.99, 2.99, 3.5, 4.99, 5.0, 9.99];
  let mut all = Vec::new();
  for (i, price) in prices.into_iter().enumerate() {
    let currency = if i % 3 == 0 { "EUR" } else { "USD" };
    let record = AppRecord::new(
      i as i64,
      "us",
      Some(raw(json!({ "currency": currency, "price": price }))),
    )
    .unwrap();
    s.upsert(&record, true).await.unwrap();
    all.push(record);
  }

  for (low, high) in [(0.0, Some(1.5)), (1.5, Some(1.5)), (2.0, Some(100.0)), (4.99, None)] {
    let query = s.find().by_price("USD", low, high).build().unwrap();
    let mut got: Vec<i64> = s
      .query(&query)
      .await
      .unwrap()
      .map(|r| r.unwrap().app_id())
      .collect();
    got.sort();

    let mut want: Vec<i64> = all.iter().filter(|r| query.matches(r)).map(AppRecord::app_id).collect();
    want.sort();
    assert_eq!(got, want, "range {low}..{high:?}");
  }
}

// ─── Device queries ──────────────────────────────────────────────────────────

#[tokio::test]
async fn by_device_finds_pod_record() {
  let s = store().await;
  s.upsert(&with_devices(1, "us", &["iPodTouchFourthGen", "iPhone6"]), true)
    .await
    .unwrap();
  s.upsert(&with_devices(2, "us", &["iPhone6"]), true).await.unwrap();

  let found = s
    .find()
    .by_device("iPodTouchFourthGen")
    .execute()
    .await
    .unwrap()
    .collect::<Result<Vec<_>, _>>()
    .unwrap();

  assert_eq!(found.len(), 1);
  let record = &found[0];
  assert_eq!(record.app_id(), 1);
  assert!(record.supports(DeviceFamily::Pod));
  assert!(record.supports(DeviceFamily::Phone));
  assert_eq!(
    record.devices().devices(DeviceFamily::Pod).unwrap().iter().collect::<Vec<_>>(),
    ["iPodTouchFourthGen"]
  );
}

#[tokio::test]
async fn by_device_matches_exact_name_only() {
  let s = store().await;
  s.upsert(&with_devices(1, "us", &["iPad2Wifi"]), true).await.unwrap();
  s.upsert(&with_devices(2, "us", &["iPad23G", "iPadAir"]), true).await.unwrap();

  let found: Vec<_> = s
    .find()
    .by_device("iPad2Wifi")
    .execute()
    .await
    .unwrap()
    .map(|r| r.unwrap().app_id())
    .collect();
  assert_eq!(found, [1]);
}

#[tokio::test]
async fn by_device_agrees_with_direct_index_query() {
  let s = store().await;
  s.upsert(&with_devices(1, "us", &["iPad2Wifi", "iPhone6"]), true).await.unwrap();
  s.upsert(&with_devices(2, "us", &["iPad2Wifi"]), true).await.unwrap();
  s.upsert(&with_devices(3, "us", &["iPadAir"]), true).await.unwrap();

  let mut via_builder: Vec<i64> = s
    .find()
    .by_device("iPad2Wifi")
    .execute()
    .await
    .unwrap()
    .map(|r| r.unwrap().app_id())
    .collect();
  via_builder.sort();

  let direct = IndexQuery {
    index:      IndexName::Pad,
    predicates: vec![
      Predicate::Eq(Attribute::Supports(DeviceFamily::Pad), Operand::Flag(true)),
      Predicate::Contains(Attribute::Devices(DeviceFamily::Pad), "iPad2Wifi".into()),
    ],
  };
  let mut via_index: Vec<i64> = s
    .query(&direct)
    .await
    .unwrap()
    .map(|r| r.unwrap().app_id())
    .collect();
  via_index.sort();

  assert_eq!(via_builder, [1, 2]);
  assert_eq!(via_builder, via_index);
}

#[tokio::test]
async fn unrecognised_devices_are_found_under_phone() {
  let s = store().await;
  s.upsert(&with_devices(9, "us", &["Watch4"]), true).await.unwrap();

  let found: Vec<_> = s
    .find()
    .by_device("Watch4")
    .execute()
    .await
    .unwrap()
    .map(|r| r.unwrap().app_id())
    .collect();
  assert_eq!(found, [9]);
}

#[tokio::test]
async fn composed_device_predicates_intersect() {
  let s = store().await;
  s.upsert(&with_devices(1, "us", &["iPad2Wifi", "iPadAir"]), true).await.unwrap();
  s.upsert(&with_devices(2, "us", &["iPad2Wifi"]), true).await.unwrap();

  let found: Vec<_> = s
    .find()
    .by_device("iPad2Wifi")
    .by_device("iPadAir")
    .execute()
    .await
    .unwrap()
    .map(|r| r.unwrap().app_id())
    .collect();
  assert_eq!(found, [1]);
}

// ─── Query validation ────────────────────────────────────────────────────────

#[tokio::test]
async fn query_without_partition_is_refused() {
  let s = store().await;
  let query = IndexQuery {
    index:      IndexName::Price,
    predicates: vec![Predicate::Between(Attribute::Price, 0.0, 1.0)],
  };
  let err = s.query(&query).await.unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(appcat_core::Error::MissingPartitionKey(IndexName::Price))
  ));
}

#[tokio::test]
async fn unsupported_family_flag_is_refused_not_answered() {
  let s = store().await;
  let phone_only = with_devices(1, "us", &["iPhone6"]);
  s.upsert(&phone_only, true).await.unwrap();

  let query = IndexQuery {
    index:      IndexName::Pad,
    predicates: vec![Predicate::Eq(Attribute::Supports(DeviceFamily::Pad), Operand::Flag(false))],
  };
  assert!(!query.matches(&phone_only));
  let err = s.query(&query).await.unwrap_err();
  assert!(matches!(err, crate::Error::Core(appcat_core::Error::InvalidOperand { .. })));
}

#[tokio::test]
async fn build_errors_surface_before_the_store() {
  let s = store().await;
  let err = s
    .find()
    .by_price("USD", 1.0, None)
    .by_device("iPhone6")
    .execute()
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(appcat_core::Error::IncompatibleIndex { .. })
  ));
}

#[tokio::test]
async fn records_are_single_pass() {
  let s = store().await;
  seed_prices(&s).await;

  let mut records = s.find().by_price("USD", 0.0, Some(10.0)).execute().await.unwrap();
  assert_eq!(records.by_ref().count(), 5);
  assert!(records.next().is_none());
}
