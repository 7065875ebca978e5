//! Point markers for the current result set.
//!
//! [`MarkerRenderer`] owns exactly one generation of markers. Rendering a new
//! set prepares every marker first, then tears the old generation down,
//! installs the new one and reframes the view.

use geo::{Coord, Rect};
use log::{debug, warn};

use crate::PlaceResult;
use crate::archive::{ArchiveError, ParsedDocument, parse_kmz};
use crate::map::{MarkerId, MarkerSurface};

/// Visual treatment of a marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarkerIcon {
    /// Regular place.
    #[default]
    Standard,
    /// Place picked by the recommender.
    Recommended,
}

/// What the surface needs to place a marker.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSpec {
    /// Marker position (`x = lng`, `y = lat`).
    pub position: Coord<f64>,
    /// Hover title.
    pub title: String,
    /// Icon variant.
    pub icon: MarkerIcon,
}

/// Content of the shared detail popup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailContent {
    /// Place name.
    pub name: String,
    /// Latitude with five decimal places.
    pub latitude: String,
    /// Longitude with five decimal places.
    pub longitude: String,
    /// Review summary, when the reviews tier ran.
    pub reviews_summary: Option<String>,
    /// Photo summary, when the photos tier ran.
    pub photos_summary: Option<String>,
    /// Link to the photo gallery.
    pub gallery_url: Option<String>,
    /// Placemark description from an archive.
    pub description: Option<String>,
}

impl DetailContent {
    fn at(name: String, position: Coord<f64>) -> Self {
        Self {
            name,
            latitude: format!("{:.5}", position.y),
            longitude: format!("{:.5}", position.x),
            reviews_summary: None,
            photos_summary: None,
            gallery_url: None,
            description: None,
        }
    }

    fn for_place(place: &PlaceResult, position: Coord<f64>) -> Self {
        Self {
            reviews_summary: place.reviews_summary.clone(),
            photos_summary: place.photos_summary.clone(),
            gallery_url: place.url_to_all_photos.clone(),
            ..Self::at(place.name.label(), position)
        }
    }

    /// `"lat, lng"` as shown in the popup.
    #[must_use]
    pub fn coordinates(&self) -> String {
        format!("{}, {}", self.latitude, self.longitude)
    }
}

/// A marker owned by the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerView {
    id: MarkerId,
    spec: MarkerSpec,
    detail: DetailContent,
}

impl MarkerView {
    /// Surface identifier.
    #[must_use]
    pub fn id(&self) -> MarkerId {
        self.id
    }

    /// Placement details.
    #[must_use]
    pub fn spec(&self) -> &MarkerSpec {
        &self.spec
    }

    /// Popup content shown on click.
    #[must_use]
    pub fn detail(&self) -> &DetailContent {
        &self.detail
    }
}

/// Summary of one render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderReport {
    /// Markers placed.
    pub rendered: usize,
    /// Records skipped for unusable coordinates.
    pub skipped: usize,
}

/// Owns the displayed marker generation.
#[derive(Debug, Default)]
pub struct MarkerRenderer {
    markers: Vec<MarkerView>,
}

impl MarkerRenderer {
    /// Create a renderer with nothing displayed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Markers of the current generation.
    #[must_use]
    pub fn markers(&self) -> &[MarkerView] {
        &self.markers
    }

    /// Replace the displayed markers with one per place.
    ///
    /// Places without finite coordinates are skipped and logged.
    pub fn render_places<S>(&mut self, surface: &mut S, places: &[PlaceResult]) -> RenderReport
    where
        S: MarkerSurface + ?Sized,
    {
        let mut skipped = 0;
        let prepared: Vec<_> = places
            .iter()
            .filter_map(|place| {
                let Some(position) = place.position() else {
                    warn!(
                        "skipping {:?}: coordinates {:?}, {:?} are not finite",
                        place.name.label(),
                        place.latitude,
                        place.longitude
                    );
                    skipped += 1;
                    return None;
                };
                let icon = if place.is_recommended() {
                    MarkerIcon::Recommended
                } else {
                    MarkerIcon::Standard
                };
                let spec = MarkerSpec {
                    position,
                    title: place.name.label(),
                    icon,
                };
                Some((spec, DetailContent::for_place(place, position)))
            })
            .collect();
        let rendered = self.install(surface, prepared);
        RenderReport { rendered, skipped }
    }

    /// Replace the displayed markers with the point placemarks of a parsed
    /// document.
    ///
    /// Outlines such as the embedded search area are not markers.
    pub fn render_document<S>(&mut self, surface: &mut S, document: &ParsedDocument) -> RenderReport
    where
        S: MarkerSurface + ?Sized,
    {
        let prepared: Vec<_> = document
            .points()
            .map(|(placemark, position)| {
                let spec = MarkerSpec {
                    position,
                    title: placemark.name.clone(),
                    icon: MarkerIcon::Standard,
                };
                let detail = DetailContent {
                    description: placemark.description.clone(),
                    ..DetailContent::at(placemark.name.clone(), position)
                };
                (spec, detail)
            })
            .collect();
        let rendered = self.install(surface, prepared);
        RenderReport {
            rendered,
            skipped: document.rejected.len(),
        }
    }

    /// Parse a KMZ archive and render its point placemarks.
    ///
    /// # Errors
    ///
    /// Returns the [`ArchiveError`] when the archive cannot be parsed; the
    /// current generation stays on the map.
    pub fn render_archive<S>(&mut self, surface: &mut S, bytes: &[u8]) -> Result<RenderReport, ArchiveError>
    where
        S: MarkerSurface + ?Sized,
    {
        let document = parse_kmz(bytes)?;
        Ok(self.render_document(surface, &document))
    }

    /// Open the detail popup for a clicked marker.
    ///
    /// Returns `false` when the marker does not belong to this generation.
    pub fn on_marker_click<S>(&self, surface: &mut S, marker: MarkerId) -> bool
    where
        S: MarkerSurface + ?Sized,
    {
        match self.markers.iter().find(|view| view.id == marker) {
            Some(view) => {
                surface.open_detail(view.id, &view.detail);
                true
            }
            None => false,
        }
    }

    /// Remove every marker.
    pub fn clear<S>(&mut self, surface: &mut S)
    where
        S: MarkerSurface + ?Sized,
    {
        self.teardown(surface);
    }

    fn teardown<S>(&mut self, surface: &mut S)
    where
        S: MarkerSurface + ?Sized,
    {
        if self.markers.is_empty() {
            return;
        }
        surface.close_detail();
        for view in self.markers.drain(..) {
            surface.remove_marker(view.id);
        }
    }

    fn install<S>(&mut self, surface: &mut S, prepared: Vec<(MarkerSpec, DetailContent)>) -> usize
    where
        S: MarkerSurface + ?Sized,
    {
        self.teardown(surface);
        let bounds = prepared
            .iter()
            .map(|(spec, _)| Rect::new(spec.position, spec.position))
            .reduce(merge_bounds);
        self.markers = prepared
            .into_iter()
            .map(|(spec, detail)| MarkerView {
                id: surface.add_marker(&spec),
                spec,
                detail,
            })
            .collect();
        if let Some(bounds) = bounds {
            surface.fit_bounds(&bounds);
        }
        debug!("marker generation replaced: {} markers", self.markers.len());
        self.markers.len()
    }
}

fn merge_bounds(left: Rect<f64>, right: Rect<f64>) -> Rect<f64> {
    Rect::new(
        Coord {
            x: left.min().x.min(right.min().x),
            y: left.min().y.min(right.min().y),
        },
        Coord {
            x: left.max().x.max(right.max().x),
            y: left.max().y.max(right.max().y),
        },
    )
}
