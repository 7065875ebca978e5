//! Place records returned by the search service.

use geo::Coord;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Display name of a place.
///
/// The search service normally sends `{original_name, translated_name}`; a
/// bare string is accepted as well.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlaceName {
    /// Name as listed plus an optional translation.
    Localised {
        /// Name as listed by the place.
        original_name: String,
        /// Translation supplied by the search service.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        translated_name: Option<String>,
    },
    /// Plain name.
    Plain(String),
}

impl PlaceName {
    /// Human-readable label, appending a differing translation in brackets.
    ///
    /// # Examples
    /// ```
    /// use regionscout_core::PlaceName;
    ///
    /// let name = PlaceName::Localised {
    ///     original_name: "Café Nord".into(),
    ///     translated_name: Some("North Cafe".into()),
    /// };
    /// assert_eq!(name.label(), "Café Nord (North Cafe)");
    /// ```
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Localised {
                original_name,
                translated_name: Some(translated),
            } if !translated.is_empty() && translated != original_name => {
                format!("{original_name} ({translated})")
            }
            Self::Localised { original_name, .. } => original_name.clone(),
            Self::Plain(name) => name.clone(),
        }
    }
}

impl From<&str> for PlaceName {
    fn from(value: &str) -> Self {
        Self::Localised {
            original_name: value.to_owned(),
            translated_name: None,
        }
    }
}

/// A coordinate component as sent by the search service.
///
/// Places without a location carry placeholder text instead of a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Degrees {
    /// Numeric degrees.
    Number(f64),
    /// Placeholder text.
    Text(String),
    /// Explicit `null`.
    Missing,
}

impl Degrees {
    /// The value in degrees when it is a finite number.
    #[must_use]
    pub fn finite(&self) -> Option<f64> {
        match self {
            Self::Number(value) if value.is_finite() => Some(*value),
            _ => None,
        }
    }
}

impl From<f64> for Degrees {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

/// One place from a search response.
///
/// Fields the core does not interpret (address, phone number, reviews, ...)
/// are kept in [`PlaceResult::extra`] and serialised back unchanged, so the
/// conversion services receive the full record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceResult {
    /// Place name.
    pub name: PlaceName,
    /// Latitude in degrees.
    pub latitude: Degrees,
    /// Longitude in degrees.
    pub longitude: Degrees,
    /// Whether the recommender picked this place.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended: Option<bool>,
    /// Summary of the place's reviews.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviews_summary: Option<String>,
    /// Summary of the place's photos.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photos_summary: Option<String>,
    /// Link to the full photo gallery.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_to_all_photos: Option<String>,
    /// Remaining fields, passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PlaceResult {
    /// Minimal record with a name and numeric coordinates.
    #[must_use]
    pub fn new(name: impl Into<PlaceName>, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            latitude: Degrees::Number(latitude),
            longitude: Degrees::Number(longitude),
            recommended: None,
            reviews_summary: None,
            photos_summary: None,
            url_to_all_photos: None,
            extra: Map::new(),
        }
    }

    /// Position as `x = lng`, `y = lat` when both components are finite.
    #[must_use]
    pub fn position(&self) -> Option<Coord<f64>> {
        Some(Coord {
            x: self.longitude.finite()?,
            y: self.latitude.finite()?,
        })
    }

    /// Whether the record should use the recommended marker treatment.
    #[must_use]
    pub fn is_recommended(&self) -> bool {
        self.recommended == Some(true)
    }
}
