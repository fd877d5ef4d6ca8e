//! Index-backed queries.
//!
//! The store answers queries only through a declared secondary index, never
//! by scanning. A query is therefore pinned to exactly one [`IndexName`] and
//! carries a list of predicates that are combined with AND. The
//! [`QueryBuilder`] picks the index from the predicates it is given and
//! refuses combinations that would need two indexes.
//!
//! | Index | Partition | Sort | Filterable |
//! |-------|-----------|------|------------|
//! | `price-index`  | `currency`       | `price` | |
//! | `iphone-index` | `supports_phone` |         | `phone_devices` |
//! | `ipad-index`   | `supports_pad`   |         | `pad_devices` |
//! | `ipod-index`   | `supports_pod`   |         | `pod_devices` |

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  device::{DeviceFamily, classify},
  record::AppRecord,
  store::AppStore,
};

// ─── Indexes ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexName {
  #[serde(rename = "price-index")]
  Price,
  #[serde(rename = "iphone-index")]
  Phone,
  #[serde(rename = "ipad-index")]
  Pad,
  #[serde(rename = "ipod-index")]
  Pod,
}

impl IndexName {
  pub const ALL: [IndexName; 4] = [Self::Price, Self::Phone, Self::Pad, Self::Pod];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Price => "price-index",
      Self::Phone => "iphone-index",
      Self::Pad => "ipad-index",
      Self::Pod => "ipod-index",
    }
  }

  pub fn for_family(family: DeviceFamily) -> Self {
    match family {
      DeviceFamily::Phone => Self::Phone,
      DeviceFamily::Pad => Self::Pad,
      DeviceFamily::Pod => Self::Pod,
    }
  }

  pub fn family(self) -> Option<DeviceFamily> {
    match self {
      Self::Price => None,
      Self::Phone => Some(DeviceFamily::Phone),
      Self::Pad => Some(DeviceFamily::Pad),
      Self::Pod => Some(DeviceFamily::Pod),
    }
  }

  /// The attribute every query on this index must pin with equality.
  pub fn partition(self) -> Attribute {
    match self.family() {
      None => Attribute::Currency,
      Some(family) => Attribute::Supports(family),
    }
  }

  pub fn sort(self) -> Option<Attribute> {
    match self {
      Self::Price => Some(Attribute::Price),
      _ => None,
    }
  }
}

impl fmt::Display for IndexName {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── Attributes & predicates ─────────────────────────────────────────────────

/// An attribute some declared index can serve. Attributes outside this set
/// have no index and can't be queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
  Currency,
  Price,
  Supports(DeviceFamily),
  Devices(DeviceFamily),
}

impl Attribute {
  /// Resolve an attribute by its stored name; [`Error::UnindexedAttribute`]
  /// for anything no index covers.
  pub fn from_name(name: &str) -> Result<Self> {
    Ok(match name {
      "currency" => Self::Currency,
      "price" => Self::Price,
      "supports_phone" => Self::Supports(DeviceFamily::Phone),
      "supports_pad" => Self::Supports(DeviceFamily::Pad),
      "supports_pod" => Self::Supports(DeviceFamily::Pod),
      "phone_devices" => Self::Devices(DeviceFamily::Phone),
      "pad_devices" => Self::Devices(DeviceFamily::Pad),
      "pod_devices" => Self::Devices(DeviceFamily::Pod),
      other => return Err(Error::UnindexedAttribute(other.to_owned())),
    })
  }

  pub fn name(self) -> &'static str {
    match self {
      Self::Currency => "currency",
      Self::Price => "price",
      Self::Supports(DeviceFamily::Phone) => "supports_phone",
      Self::Supports(DeviceFamily::Pad) => "supports_pad",
      Self::Supports(DeviceFamily::Pod) => "supports_pod",
      Self::Devices(DeviceFamily::Phone) => "phone_devices",
      Self::Devices(DeviceFamily::Pad) => "pad_devices",
      Self::Devices(DeviceFamily::Pod) => "pod_devices",
    }
  }

  /// The index that serves this attribute.
  pub fn index(self) -> IndexName {
    match self {
      Self::Currency | Self::Price => IndexName::Price,
      Self::Supports(family) | Self::Devices(family) => IndexName::for_family(family),
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
  Text(String),
  Number(f64),
  Flag(bool),
}

impl From<&str> for Operand {
  fn from(s: &str) -> Self { Self::Text(s.to_owned()) }
}

impl From<String> for Operand {
  fn from(s: String) -> Self { Self::Text(s) }
}

impl From<f64> for Operand {
  fn from(n: f64) -> Self { Self::Number(n) }
}

impl From<bool> for Operand {
  fn from(b: bool) -> Self { Self::Flag(b) }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
  /// `attribute == operand`
  Eq(Attribute, Operand),
  /// `low <= attribute <= high`
  Between(Attribute, f64, f64),
  /// The set-valued attribute contains the given member.
  Contains(Attribute, String),
}

impl Predicate {
  pub fn attribute(&self) -> Attribute {
    match self {
      Self::Eq(a, _) | Self::Between(a, ..) | Self::Contains(a, _) => *a,
    }
  }
}

// ─── IndexQuery ──────────────────────────────────────────────────────────────

/// A query pinned to one index. Predicates are combined with AND.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexQuery {
  pub index:      IndexName,
  pub predicates: Vec<Predicate>,
}

impl IndexQuery {
  /// Check that the query can be answered by its index alone: the partition
  /// attribute is pinned by equality, range and equality conditions touch
  /// only key attributes, and membership tests touch only the index's own
  /// device subset.
  ///
  /// Equality operands must fit the attribute. Family flags are sparse (an
  /// unsupported family has no flag at all) so they only compare to `true`.
  pub fn validate(&self) -> Result<()> {
    let partition = self.index.partition();
    let mut has_partition = false;

    for predicate in &self.predicates {
      let attribute = predicate.attribute();
      if attribute.index() != self.index {
        return Err(Error::IncompatibleIndex {
          pinned: self.index,
          wanted: attribute.index(),
        });
      }
      if let Predicate::Eq(a, operand) = predicate {
        check_operand(*a, operand)?;
      }
      match predicate {
        Predicate::Eq(a, _) if *a == partition => has_partition = true,
        Predicate::Eq(a, _) | Predicate::Between(a, ..)
          if Some(*a) == self.index.sort() => {}
        Predicate::Contains(Attribute::Devices(_), _) => {}
        _ => {
          return Err(Error::UnindexedAttribute(attribute.name().to_owned()));
        }
      }
    }

    if has_partition {
      Ok(())
    } else {
      Err(Error::MissingPartitionKey(self.index))
    }
  }

  /// Evaluate the predicates against a record in memory. Stores that can't
  /// push a predicate down use this; it is also the oracle in tests.
  pub fn matches(&self, record: &AppRecord) -> bool {
    self.predicates.iter().all(|p| predicate_matches(p, record))
  }
}

fn predicate_matches(predicate: &Predicate, record: &AppRecord) -> bool {
  match predicate {
    Predicate::Eq(Attribute::Currency, Operand::Text(c)) => {
      record.currency() == Some(c.as_str())
    }
    Predicate::Eq(Attribute::Price, Operand::Number(p)) => record.price() == Some(*p),
    Predicate::Eq(Attribute::Supports(family), Operand::Flag(true)) => {
      record.supports(*family)
    }
    Predicate::Between(Attribute::Price, low, high) => {
      record.price().is_some_and(|p| *low <= p && p <= *high)
    }
    Predicate::Contains(Attribute::Devices(family), name) => record
      .devices()
      .devices(*family)
      .is_some_and(|subset| subset.contains(name)),
    _ => false,
  }
}

fn check_operand(attribute: Attribute, operand: &Operand) -> Result<()> {
  let expected = match (attribute, operand) {
    (Attribute::Currency, Operand::Text(_)) => return Ok(()),
    (Attribute::Price, Operand::Number(n)) if n.is_finite() => return Ok(()),
    (Attribute::Supports(_), Operand::Flag(true)) => return Ok(()),
    (Attribute::Currency, _) => "text",
    (Attribute::Price, _) => "a finite number",
    (Attribute::Supports(_), _) => "true",
    (Attribute::Devices(_), _) => "a membership test",
  };
  Err(Error::InvalidOperand { attribute: attribute.name().to_owned(), expected })
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// The single-pass result of a query. Rows are decoded as they are pulled;
/// once consumed the sequence can't be restarted. How many rows a backend
/// fetches up front is its own choice.
pub struct Records {
  inner: Box<dyn Iterator<Item = Result<AppRecord>> + Send>,
}

impl Records {
  pub fn new<I>(iter: I) -> Self
  where
    I: IntoIterator<Item = Result<AppRecord>>,
    I::IntoIter: Send + 'static,
  {
    Self { inner: Box::new(iter.into_iter()) }
  }

  pub fn empty() -> Self { Self::new(std::iter::empty()) }
}

impl Iterator for Records {
  type Item = Result<AppRecord>;

  fn next(&mut self) -> Option<Self::Item> { self.inner.next() }
}

impl fmt::Debug for Records {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Records").finish_non_exhaustive()
  }
}

// ─── Builder ─────────────────────────────────────────────────────────────────

/// Fluent construction of an [`IndexQuery`] against a store.
///
/// Errors are latched: the first invalid step is reported by
/// [`build`](Self::build) or [`execute`](Self::execute), and later steps are
/// ignored. Nothing reaches the store unless the whole query is valid.
///
/// ```ignore
/// let cheap = store.find().by_price("USD", 1.50, Some(3.50)).execute().await?;
/// ```
pub struct QueryBuilder<'a, S: ?Sized> {
  store:      &'a S,
  index:      Option<IndexName>,
  predicates: Vec<Predicate>,
  error:      Option<Error>,
}

impl<'a, S: AppStore + ?Sized> QueryBuilder<'a, S> {
  pub fn new(store: &'a S) -> Self {
    Self { store, index: None, predicates: Vec::new(), error: None }
  }

  /// Records priced in `currency` at exactly `low`, or within `[low, high]`
  /// when `high` is given. Uses `price-index`.
  pub fn by_price(mut self, currency: impl Into<String>, low: f64, high: Option<f64>) -> Self {
    if let Err(e) = check_bound(low).and_then(|_| high.map_or(Ok(()), check_bound)) {
      return self.fail(e);
    }
    if let Some(high) = high
      && high < low
    {
      return self.fail(Error::InvalidRange(format!("low {low} is above high {high}")));
    }

    self = self
      .pin(IndexName::Price)
      .push(Predicate::Eq(Attribute::Currency, Operand::Text(currency.into())));
    match high {
      None => self.push(Predicate::Eq(Attribute::Price, Operand::Number(low))),
      Some(high) => self.push(Predicate::Between(Attribute::Price, low, high)),
    }
  }

  /// Records whose device subset for the name's family contains exactly
  /// `device_name`. Uses the family's index.
  pub fn by_device(self, device_name: impl Into<String>) -> Self {
    let device_name = device_name.into();
    if device_name.trim().is_empty() {
      return self.fail(Error::InvalidDeviceName(device_name));
    }
    let family = classify(&device_name);

    self
      .pin(IndexName::for_family(family))
      .push(Predicate::Eq(Attribute::Supports(family), Operand::Flag(true)))
      .push(Predicate::Contains(Attribute::Devices(family), device_name))
  }

  /// Equality on an attribute named as stored (`"currency"`,
  /// `"supports_pad"`, ...). Unindexed names fail the query.
  pub fn filter_eq(self, attribute: &str, value: impl Into<Operand>) -> Self {
    match Attribute::from_name(attribute) {
      Ok(attribute) => self
        .pin(attribute.index())
        .push(Predicate::Eq(attribute, value.into())),
      Err(e) => self.fail(e),
    }
  }

  pub fn build(self) -> Result<IndexQuery> {
    if let Some(e) = self.error {
      return Err(e);
    }
    let index = self.index.ok_or(Error::NoIndex)?;
    let query = IndexQuery { index, predicates: self.predicates };
    query.validate()?;
    Ok(query)
  }

  pub async fn execute(self) -> Result<Records, S::Error> {
    let store = self.store;
    let query = self.build()?;
    store.query(&query).await
  }

  fn pin(mut self, wanted: IndexName) -> Self {
    if self.error.is_some() {
      return self;
    }
    match self.index {
      None => self.index = Some(wanted),
      Some(pinned) if pinned == wanted => {}
      Some(pinned) => return self.fail(Error::IncompatibleIndex { pinned, wanted }),
    }
    self
  }

  fn push(mut self, predicate: Predicate) -> Self {
    if self.error.is_none() && !self.predicates.contains(&predicate) {
      self.predicates.push(predicate);
    }
    self
  }

  fn fail(mut self, e: Error) -> Self {
    self.error.get_or_insert(e);
    self
  }
}

fn check_bound(bound: f64) -> Result<()> {
  if bound.is_finite() && bound >= 0.0 {
    Ok(())
  } else {
    Err(Error::InvalidRange(format!("price bound {bound} must be non-negative")))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::tests::NullStore;

  fn find() -> QueryBuilder<'static, NullStore> { QueryBuilder::new(&NullStore) }

  #[test]
  fn by_price_range_uses_price_index() {
    let q = find().by_price("USD", 1.50, Some(3.50)).build().unwrap();
    assert_eq!(q.index, IndexName::Price);
    assert_eq!(q.predicates, vec![
      Predicate::Eq(Attribute::Currency, Operand::Text("USD".into())),
      Predicate::Between(Attribute::Price, 1.50, 3.50),
    ]);
  }

  #[test]
  fn by_price_without_high_is_exact() {
    let q = find().by_price("USD", 0.0, None).build().unwrap();
    assert!(q.predicates.contains(&Predicate::Eq(Attribute::Price, Operand::Number(0.0))));
  }

  #[test]
  fn negative_bounds_are_invalid() {
    assert!(matches!(find().by_price("USD", -1.0, None).build(), Err(Error::InvalidRange(_))));
    assert!(matches!(
      find().by_price("USD", 1.0, Some(-2.0)).build(),
      Err(Error::InvalidRange(_))
    ));
  }

  #[test]
  fn inverted_range_is_invalid() {
    assert!(matches!(
      find().by_price("USD", 3.0, Some(1.0)).build(),
      Err(Error::InvalidRange(_))
    ));
  }

  #[test]
  fn by_device_picks_family_index() {
    let q = find().by_device("iPodTouchFourthGen").build().unwrap();
    assert_eq!(q.index, IndexName::Pod);
    assert_eq!(q.predicates, vec![
      Predicate::Eq(Attribute::Supports(DeviceFamily::Pod), Operand::Flag(true)),
      Predicate::Contains(Attribute::Devices(DeviceFamily::Pod), "iPodTouchFourthGen".into()),
    ]);

    assert_eq!(find().by_device("iPad2Wifi").build().unwrap().index, IndexName::Pad);
    assert_eq!(find().by_device("iPhone6").build().unwrap().index, IndexName::Phone);
  }

  #[test]
  fn blank_device_name_is_invalid() {
    assert!(matches!(find().by_device("").build(), Err(Error::InvalidDeviceName(_))));
  }

  #[test]
  fn same_index_predicates_accumulate() {
    let q = find().by_device("iPad2Wifi").by_device("iPadAir").build().unwrap();
    assert_eq!(q.index, IndexName::Pad);
    // The partition equality is shared, the two membership tests are ANDed.
    assert_eq!(q.predicates.len(), 3);
  }

  #[test]
  fn mixing_indexes_is_incompatible() {
    let err = find().by_price("USD", 1.0, None).by_device("iPhone6").build().unwrap_err();
    assert!(matches!(
      err,
      Error::IncompatibleIndex { pinned: IndexName::Price, wanted: IndexName::Phone }
    ));

    let err = find().by_device("iPhone6").by_device("iPad2Wifi").build().unwrap_err();
    assert!(matches!(err, Error::IncompatibleIndex { .. }));
  }

  #[test]
  fn first_error_wins() {
    let err = find().by_device("").by_price("USD", -1.0, None).build().unwrap_err();
    assert!(matches!(err, Error::InvalidDeviceName(_)));
  }

  #[test]
  fn unindexed_attributes_are_rejected() {
    let err = find().filter_eq("artistName", "Someone").build().unwrap_err();
    assert!(matches!(err, Error::UnindexedAttribute(a) if a == "artistName"));
  }

  #[test]
  fn filter_eq_on_sort_key_alone_lacks_partition() {
    let err = find().filter_eq("price", 1.0).build().unwrap_err();
    assert!(matches!(err, Error::MissingPartitionKey(IndexName::Price)));
  }

  #[test]
  fn family_flags_only_compare_to_true() {
    let err = find().filter_eq("supports_pad", false).build().unwrap_err();
    assert!(matches!(
      err,
      Error::InvalidOperand { ref attribute, expected: "true" } if attribute == "supports_pad"
    ));
    assert!(find().filter_eq("supports_pad", true).build().is_ok());
  }

  #[test]
  fn operands_must_fit_the_attribute() {
    let err = find().filter_eq("currency", 1.0).filter_eq("price", 2.0).build().unwrap_err();
    assert!(matches!(err, Error::InvalidOperand { ref attribute, .. } if attribute == "currency"));

    let err = find().filter_eq("currency", "USD").filter_eq("price", "cheap").build().unwrap_err();
    assert!(matches!(err, Error::InvalidOperand { ref attribute, .. } if attribute == "price"));

    let err = find().filter_eq("currency", "USD").filter_eq("price", f64::NAN).build().unwrap_err();
    assert!(matches!(err, Error::InvalidOperand { .. }));
  }

  #[test]
  fn unsupported_family_never_matches_flag() {
    let record = AppRecord::new(1, "us", None).unwrap();
    let q = IndexQuery {
      index:      IndexName::Pad,
      predicates: vec![Predicate::Eq(Attribute::Supports(DeviceFamily::Pad), Operand::Flag(false))],
    };
    assert!(!q.matches(&record));
  }

  #[test]
  fn blank_names_are_rejected_with_whitespace_too() {
    assert!(matches!(find().by_device("   ").build(), Err(Error::InvalidDeviceName(_))));
  }

  #[test]
  fn empty_builder_selects_no_index() {
    assert!(matches!(find().build(), Err(Error::NoIndex)));
  }

  #[test]
  fn hand_built_queries_are_validated() {
    let q = IndexQuery {
      index:      IndexName::Phone,
      predicates: vec![Predicate::Eq(Attribute::Currency, Operand::Text("USD".into()))],
    };
    assert!(matches!(q.validate(), Err(Error::IncompatibleIndex { .. })));

    let q = IndexQuery {
      index:      IndexName::Pad,
      predicates: vec![Predicate::Contains(Attribute::Devices(DeviceFamily::Pad), "iPad2Wifi".into())],
    };
    assert!(matches!(q.validate(), Err(Error::MissingPartitionKey(IndexName::Pad))));
  }

  #[test]
  fn index_names_match_declared_names() {
    let names: Vec<_> = IndexName::ALL.iter().map(|i| i.as_str()).collect();
    assert_eq!(names, ["price-index", "iphone-index", "ipad-index", "ipod-index"]);
  }
}
