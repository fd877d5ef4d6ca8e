//! Device families and the derived per-family index attributes.
//!
//! The storefront reports compatibility as a flat set of device names
//! (`"iPhone6"`, `"iPadAir2Cellular"`, `"iPodTouchSixthGen"`, ...). Queries by
//! device go through one sparse secondary index per family, so each record
//! carries a denormalised `supports_<family>` flag and `<family>_devices`
//! subset derived from that set. [`classify`] is the only place the
//! name-to-family rule lives; record construction and query building both
//! call it.

use std::{collections::BTreeSet, fmt};

use serde::{Deserialize, Serialize};

// ─── Family ──────────────────────────────────────────────────────────────────

/// A device classification bucket.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum DeviceFamily {
  Phone,
  Pad,
  Pod,
}

impl DeviceFamily {
  pub const ALL: [DeviceFamily; 3] = [Self::Phone, Self::Pad, Self::Pod];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Phone => "phone",
      Self::Pad => "pad",
      Self::Pod => "pod",
    }
  }
}

impl fmt::Display for DeviceFamily {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Classify a device name. First match wins, case-sensitive:
///
/// 1. `iPad…` is a pad.
/// 2. `iPod…` is a pod.
/// 3. Anything else is a phone.
///
/// The phone bucket is the catch-all on purpose. iPhone model names in the
/// storefront vocabulary share no clean prefix, so any name that is neither
/// an iPad nor an iPod, including names we have never seen (and the blank
/// name), lands there.
pub fn classify(name: &str) -> DeviceFamily {
  if name.starts_with("iPad") {
    DeviceFamily::Pad
  } else if name.starts_with("iPod") {
    DeviceFamily::Pod
  } else {
    DeviceFamily::Phone
  }
}

// ─── Derived index attributes ────────────────────────────────────────────────

/// Per-family device subsets derived from a record's `supportedDevices`.
///
/// A family is supported iff its subset is non-empty; the two can't drift
/// apart because the flag is computed from the subset. Empty subsets are
/// serialised as absent attributes rather than `false` / `[]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "DeviceColumns", into = "DeviceColumns")]
pub struct DeviceIndex {
  phone: BTreeSet<String>,
  pad:   BTreeSet<String>,
  pod:   BTreeSet<String>,
}

impl DeviceIndex {
  /// Derive the per-family subsets from a raw device set. Pure: the result
  /// depends on nothing but the names given.
  pub fn derive<'a, I>(raw_devices: I) -> Self
  where
    I: IntoIterator<Item = &'a str>,
  {
    let mut index = Self::default();
    for name in raw_devices {
      index.subset_mut(classify(name)).insert(name.to_owned());
    }
    index
  }

  pub fn supports(&self, family: DeviceFamily) -> bool {
    !self.subset(family).is_empty()
  }

  /// The family's device subset, or `None` when the family is unsupported.
  pub fn devices(&self, family: DeviceFamily) -> Option<&BTreeSet<String>> {
    let subset = self.subset(family);
    (!subset.is_empty()).then_some(subset)
  }

  pub fn is_empty(&self) -> bool {
    DeviceFamily::ALL.iter().all(|f| !self.supports(*f))
  }

  fn subset(&self, family: DeviceFamily) -> &BTreeSet<String> {
    match family {
      DeviceFamily::Phone => &self.phone,
      DeviceFamily::Pad => &self.pad,
      DeviceFamily::Pod => &self.pod,
    }
  }

  fn subset_mut(&mut self, family: DeviceFamily) -> &mut BTreeSet<String> {
    match family {
      DeviceFamily::Phone => &mut self.phone,
      DeviceFamily::Pad => &mut self.pad,
      DeviceFamily::Pod => &mut self.pod,
    }
  }
}

/// The persisted shape: one optional flag and one optional set per family.
#[derive(Default, Serialize, Deserialize)]
struct DeviceColumns {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  supports_phone: Option<bool>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  phone_devices:  Option<BTreeSet<String>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  supports_pad:   Option<bool>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pad_devices:    Option<BTreeSet<String>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  supports_pod:   Option<bool>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pod_devices:    Option<BTreeSet<String>>,
}

impl From<DeviceIndex> for DeviceColumns {
  fn from(index: DeviceIndex) -> Self {
    fn column(set: BTreeSet<String>) -> (Option<bool>, Option<BTreeSet<String>>) {
      if set.is_empty() { (None, None) } else { (Some(true), Some(set)) }
    }
    let (supports_phone, phone_devices) = column(index.phone);
    let (supports_pad, pad_devices) = column(index.pad);
    let (supports_pod, pod_devices) = column(index.pod);
    Self {
      supports_phone,
      phone_devices,
      supports_pad,
      pad_devices,
      supports_pod,
      pod_devices,
    }
  }
}

impl From<DeviceColumns> for DeviceIndex {
  // The subsets are authoritative; a stray flag without a subset carries no
  // devices and is dropped.
  fn from(columns: DeviceColumns) -> Self {
    Self {
      phone: columns.phone_devices.unwrap_or_default(),
      pad:   columns.pad_devices.unwrap_or_default(),
      pod:   columns.pod_devices.unwrap_or_default(),
    }
  }
}
