//! The catalog record: one application in one storefront country.
//!
//! A record is built once from the raw storefront payload and never mutated
//! afterwards. Its key is fixed at construction, and the derived device index
//! is computed from `supportedDevices` in the same step, so a record in hand
//! is always internally consistent.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
  Error, Result,
  device::{DeviceFamily, DeviceIndex},
  schema::{
    Boolean, Coerce, FieldKind, Float, Integer, Text, TextList, TextSet, Timestamp,
    coerce_field, truncate,
  },
};

/// A raw storefront result: attribute name to loosely-typed JSON value.
pub type RawAttributes = serde_json::Map<String, Value>;

// ─── Key ─────────────────────────────────────────────────────────────────────

/// Inputs accepted as an application identifier.
///
/// Anything numeric-looking that is integral and fits in an `i64` is
/// accepted; everything else is [`Error::InvalidKey`].
pub trait IntoAppId {
  fn into_app_id(self) -> Result<i64>;
}

impl IntoAppId for i64 {
  fn into_app_id(self) -> Result<i64> { Ok(self) }
}

impl IntoAppId for i32 {
  fn into_app_id(self) -> Result<i64> { Ok(self.into()) }
}

impl IntoAppId for u32 {
  fn into_app_id(self) -> Result<i64> { Ok(self.into()) }
}

impl IntoAppId for u64 {
  fn into_app_id(self) -> Result<i64> {
    i64::try_from(self).map_err(|_| Error::InvalidKey(self.to_string()))
  }
}

impl IntoAppId for f64 {
  fn into_app_id(self) -> Result<i64> {
    match truncate(self) {
      Some(id) if id as f64 == self => Ok(id),
      _ => Err(Error::InvalidKey(self.to_string())),
    }
  }
}

impl IntoAppId for &str {
  fn into_app_id(self) -> Result<i64> {
    let trimmed = self.trim();
    if let Ok(id) = trimmed.parse::<i64>() {
      return Ok(id);
    }
    match trimmed.parse::<f64>() {
      Ok(f) if f.fract() == 0.0 => f.into_app_id(),
      _ => Err(Error::InvalidKey(self.to_owned())),
    }
  }
}

impl IntoAppId for String {
  fn into_app_id(self) -> Result<i64> { self.as_str().into_app_id() }
}

impl IntoAppId for &Value {
  fn into_app_id(self) -> Result<i64> {
    match self {
      Value::Number(n) => match n.as_i64() {
        Some(id) => Ok(id),
        None => n
          .as_f64()
          .ok_or_else(|| Error::InvalidKey(n.to_string()))?
          .into_app_id(),
      },
      Value::String(s) => s.as_str().into_app_id(),
      other => Err(Error::InvalidKey(other.to_string())),
    }
  }
}

// ─── Attributes ──────────────────────────────────────────────────────────────

/// Declares the closed attribute table once: wire name, Rust field, and the
/// coercion marker that fixes its type.
macro_rules! attributes {
  ($( $wire:literal => $field:ident : $kind:ty, )*) => {
    /// Every externally supplied attribute of a record. All are optional;
    /// the storefront omits what it doesn't know.
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    pub struct AppAttributes {
      $(
        #[serde(rename = $wire, default, skip_serializing_if = "Option::is_none")]
        pub $field: Option<<$kind as Coerce>::Value>,
      )*
    }

    impl AppAttributes {
      /// The field table: wire name and declared kind, in declaration order.
      pub const FIELDS: &'static [(&'static str, FieldKind)] = &[
        $( ($wire, <$kind as Coerce>::KIND), )*
      ];

      /// Coerce `value` into the attribute named `name`.
      fn set(&mut self, name: &str, value: Value) -> Result<()> {
        match name {
          $( $wire => self.$field = coerce_field::<$kind>(name, value)?, )*
          other => return Err(Error::UnknownField(other.to_owned())),
        }
        Ok(())
      }
    }
  };
}

attributes! {
  "advisories"                         => advisories: TextList,
  "appletvScreenshotUrls"              => appletv_screenshot_urls: TextList,
  "artistId"                           => artist_id: Integer,
  "artistName"                         => artist_name: Text,
  "artistViewUrl"                      => artist_view_url: Text,
  "artworkUrl100"                      => artwork_url_100: Text,
  "artworkUrl512"                      => artwork_url_512: Text,
  "artworkUrl60"                       => artwork_url_60: Text,
  "averageUserRating"                  => average_user_rating: Float,
  "averageUserRatingForCurrentVersion" => average_user_rating_for_current_version: Float,
  "bundleId"                           => bundle_id: Text,
  "contentAdvisoryRating"              => content_advisory_rating: Text,
  "currency"                           => currency: Text,
  "currentVersionReleaseDate"          => current_version_release_date: Timestamp,
  "description"                        => description: Text,
  "features"                           => features: TextList,
  "fileSizeBytes"                      => file_size_bytes: Integer,
  "formattedPrice"                     => formatted_price: Text,
  "genreIds"                           => genre_ids: TextList,
  "genres"                             => genres: TextList,
  "ipadScreenshotUrls"                 => ipad_screenshot_urls: TextList,
  "isGameCenterEnabled"                => is_game_center_enabled: Boolean,
  "isVppDeviceBasedLicensingEnabled"   => is_vpp_device_based_licensing_enabled: Boolean,
  "kind"                               => kind: Text,
  "languageCodesISO2A"                 => language_codes_iso2a: TextList,
  "minimumOsVersion"                   => minimum_os_version: Text,
  "price"                              => price: Float,
  "primaryGenreId"                     => primary_genre_id: Integer,
  "primaryGenreName"                   => primary_genre_name: Text,
  "releaseDate"                        => release_date: Timestamp,
  "releaseNotes"                       => release_notes: Text,
  "screenshotUrls"                     => screenshot_urls: TextList,
  "sellerName"                         => seller_name: Text,
  "sellerUrl"                          => seller_url: Text,
  "supportedDevices"                   => supported_devices: TextSet,
  "trackCensoredName"                  => track_censored_name: Text,
  "trackContentRating"                 => track_content_rating: Text,
  "trackId"                            => track_id: Integer,
  "trackName"                          => track_name: Text,
  "trackViewUrl"                       => track_view_url: Text,
  "userRatingCount"                    => user_rating_count: Integer,
  "userRatingCountForCurrentVersion"   => user_rating_count_for_current_version: Integer,
  "version"                            => version: Text,
  "wrapperType"                        => wrapper_type: Text,
}

impl AppAttributes {
  /// Build attributes from a raw payload. Stops at the first bad entry; no
  /// partially-filled value escapes.
  pub fn from_raw(raw: RawAttributes) -> Result<Self> {
    let mut attributes = Self::default();
    for (name, value) in raw {
      attributes.set(&name, value)?;
    }
    Ok(attributes)
  }

  pub fn kind_of(name: &str) -> Option<FieldKind> {
    Self::FIELDS
      .iter()
      .find(|(wire, _)| *wire == name)
      .map(|(_, kind)| *kind)
  }
}

// ─── Record ──────────────────────────────────────────────────────────────────

/// One application's metadata in one storefront country, keyed by
/// `(app_id, country)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppRecord {
  app_id:     i64,
  country:    String,
  #[serde(flatten)]
  attributes: AppAttributes,
  #[serde(flatten)]
  devices:    DeviceIndex,
}

impl AppRecord {
  /// Construct a record, coercing every raw attribute to its declared type.
  ///
  /// Fails with [`Error::InvalidKey`] for a non-numeric id or an empty
  /// country, [`Error::UnknownField`] for an attribute outside the field
  /// table, and [`Error::MalformedTimestamp`] / [`Error::InvalidFieldValue`]
  /// for values that can't be coerced.
  pub fn new(
    app_id: impl IntoAppId,
    country: impl Into<String>,
    raw: Option<RawAttributes>,
  ) -> Result<Self> {
    let app_id = app_id.into_app_id()?;
    let country = country.into();
    if country.is_empty() {
      return Err(Error::InvalidKey("country must not be empty".into()));
    }

    let attributes = match raw {
      Some(raw) => AppAttributes::from_raw(raw)?,
      None => AppAttributes::default(),
    };

    let devices = match &attributes.supported_devices {
      Some(raw_devices) if !raw_devices.is_empty() => {
        DeviceIndex::derive(raw_devices.iter().map(String::as_str))
      }
      _ => DeviceIndex::default(),
    };

    Ok(Self { app_id, country, attributes, devices })
  }

  pub fn app_id(&self) -> i64 { self.app_id }

  pub fn country(&self) -> &str { &self.country }

  pub fn attributes(&self) -> &AppAttributes { &self.attributes }

  pub fn devices(&self) -> &DeviceIndex { &self.devices }

  pub fn currency(&self) -> Option<&str> { self.attributes.currency.as_deref() }

  pub fn price(&self) -> Option<f64> { self.attributes.price }

  pub fn supports(&self, family: DeviceFamily) -> bool {
    self.devices.supports(family)
  }

  /// The full record image as stored.
  pub fn to_json(&self) -> Result<String> { Ok(serde_json::to_string(self)?) }

  pub fn from_json(image: &str) -> Result<Self> {
    Ok(serde_json::from_str(image)?)
  }
}
