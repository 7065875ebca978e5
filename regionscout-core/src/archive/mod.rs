//! Reading placemarks from KMZ archives.
//!
//! A KMZ file is a ZIP archive holding a single KML document. Placemarks are
//! extracted by tag: each `Placemark` contributes its first `name`, its
//! `description` and every tuple found in its `coordinates` elements.
//! Placemarks with unusable coordinates are reported individually instead of
//! failing the whole document.

use std::io::{Cursor, Read};

use geo::Coord;
use log::{debug, warn};
use quick_xml::Reader;
use quick_xml::events::Event;
use zip::ZipArchive;

mod error;

pub use error::{ArchiveError, CoordinateError};

/// A placemark with parsed coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Placemark {
    /// Placemark name; empty when the document omits it.
    pub name: String,
    /// Free-text description, if present.
    pub description: Option<String>,
    /// Coordinate tuples in document order (`x = lng`, `y = lat`).
    pub coordinates: Vec<Coord<f64>>,
}

impl Placemark {
    /// The position of a point placemark.
    ///
    /// Returns `None` for lines and polygons, which carry more than one tuple.
    #[must_use]
    pub fn point(&self) -> Option<Coord<f64>> {
        match self.coordinates.as_slice() {
            [point] => Some(*point),
            _ => None,
        }
    }
}

/// A placemark skipped because of its coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedPlacemark {
    /// Placemark name; empty when the document omits it.
    pub name: String,
    /// Why the coordinates were rejected.
    pub reason: CoordinateError,
}

/// Outcome of parsing a KML document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedDocument {
    /// Placemarks with valid coordinates, in document order.
    pub placemarks: Vec<Placemark>,
    /// Placemarks rejected for malformed or missing coordinates.
    pub rejected: Vec<RejectedPlacemark>,
}

impl ParsedDocument {
    /// Iterate over placemarks that describe a single point.
    pub fn points(&self) -> impl Iterator<Item = (&Placemark, Coord<f64>)> + '_ {
        self.placemarks
            .iter()
            .filter_map(|placemark| placemark.point().map(|point| (placemark, point)))
    }
}

/// Open a KMZ archive and parse its KML document.
///
/// # Errors
///
/// Fails when the bytes are not a ZIP archive, when the archive holds no or
/// several `.kml` entries, or when the document cannot be read or parsed.
pub fn parse_kmz(bytes: &[u8]) -> Result<ParsedDocument, ArchiveError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|source| ArchiveError::InvalidArchive { source })?;
    let documents: Vec<String> = archive
        .file_names()
        .filter(|name| is_kml_entry(name))
        .map(str::to_owned)
        .collect();
    let name = match documents.as_slice() {
        [single] => single.clone(),
        [] => return Err(ArchiveError::MissingDocument),
        many => return Err(ArchiveError::AmbiguousDocument { count: many.len() }),
    };

    let mut markup = String::new();
    archive
        .by_name(&name)
        .map_err(|source| ArchiveError::InvalidArchive { source })?
        .read_to_string(&mut markup)
        .map_err(|source| ArchiveError::ReadDocument {
            name: name.clone(),
            source,
        })?;
    debug!("read {name} ({} bytes) from archive", markup.len());
    parse_kml(&markup)
}

fn is_kml_entry(name: &str) -> bool {
    !name.ends_with('/')
        && name
            .rsplit_once('.')
            .is_some_and(|(_, extension)| extension.eq_ignore_ascii_case("kml"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Name,
    Description,
    Coordinates,
}

#[derive(Debug, Default)]
struct PlacemarkBuilder {
    name: Option<String>,
    description: Option<String>,
    coordinates: String,
}

impl PlacemarkBuilder {
    fn push_text(&mut self, field: Field, text: &str) {
        match field {
            Field::Name => self.name.get_or_insert_with(String::new).push_str(text),
            Field::Description => self
                .description
                .get_or_insert_with(String::new)
                .push_str(text),
            Field::Coordinates => {
                self.coordinates.push(' ');
                self.coordinates.push_str(text);
            }
        }
    }

    fn finish(self, document: &mut ParsedDocument) {
        let name = self.name.unwrap_or_default();
        match parse_coordinates(&self.coordinates) {
            Ok(coordinates) => document.placemarks.push(Placemark {
                name,
                description: self.description,
                coordinates,
            }),
            Err(reason) => {
                warn!("skipping placemark {name:?}: {reason}");
                document.rejected.push(RejectedPlacemark { name, reason });
            }
        }
    }
}

/// Parse placemarks out of KML markup.
///
/// # Errors
///
/// Returns [`ArchiveError::InvalidMarkup`] when the markup is not
/// well-formed. Coordinate problems never fail the document; they are listed
/// in [`ParsedDocument::rejected`].
///
/// # Examples
/// ```
/// use regionscout_core::archive::parse_kml;
///
/// let kml = r#"<kml><Document><Placemark><name>Cafe A</name>
///     <Point><coordinates>-79.99,40.44,0</coordinates></Point>
/// </Placemark></Document></kml>"#;
/// let parsed = parse_kml(kml).unwrap();
/// let (placemark, point) = parsed.points().next().unwrap();
/// assert_eq!(placemark.name, "Cafe A");
/// assert_eq!((point.x, point.y), (-79.99, 40.44));
/// ```
pub fn parse_kml(markup: &str) -> Result<ParsedDocument, ArchiveError> {
    let mut reader = Reader::from_str(markup);
    reader.config_mut().trim_text(true);

    let mut document = ParsedDocument::default();
    let mut current: Option<PlacemarkBuilder> = None;
    let mut field: Option<Field> = None;

    loop {
        let event = reader.read_event().map_err(|err| ArchiveError::InvalidMarkup {
            position: reader.buffer_position(),
            message: err.to_string(),
        })?;
        match event {
            Event::Start(start) => match start.local_name().as_ref() {
                b"Placemark" => {
                    current = Some(PlacemarkBuilder::default());
                    field = None;
                }
                b"name" if current.as_ref().is_some_and(|pm| pm.name.is_none()) => {
                    field = Some(Field::Name);
                }
                b"description" if current.is_some() => field = Some(Field::Description),
                b"coordinates" if current.is_some() => field = Some(Field::Coordinates),
                _ => {}
            },
            Event::End(end) => match end.local_name().as_ref() {
                b"Placemark" => {
                    if let Some(builder) = current.take() {
                        builder.finish(&mut document);
                    }
                    field = None;
                }
                b"name" | b"description" | b"coordinates" => field = None,
                _ => {}
            },
            Event::Text(text) => {
                if let (Some(builder), Some(active)) = (current.as_mut(), field) {
                    let unescaped = text.unescape().map_err(|err| ArchiveError::InvalidMarkup {
                        position: reader.buffer_position(),
                        message: err.to_string(),
                    })?;
                    builder.push_text(active, &unescaped);
                }
            }
            Event::CData(data) => {
                if let (Some(builder), Some(active)) = (current.as_mut(), field) {
                    let raw = data.into_inner();
                    builder.push_text(active, &String::from_utf8_lossy(&raw));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    debug!(
        "parsed {} placemarks ({} rejected)",
        document.placemarks.len(),
        document.rejected.len()
    );
    Ok(document)
}

/// Parse whitespace-separated `lng,lat[,alt]` tuples.
fn parse_coordinates(text: &str) -> Result<Vec<Coord<f64>>, CoordinateError> {
    let coordinates = text
        .split_whitespace()
        .map(parse_tuple)
        .collect::<Result<Vec<_>, _>>()?;
    if coordinates.is_empty() {
        return Err(CoordinateError::Missing);
    }
    Ok(coordinates)
}

fn parse_tuple(tuple: &str) -> Result<Coord<f64>, CoordinateError> {
    let mut parts = tuple.split(',');
    let (Some(lng), Some(lat)) = (parts.next(), parts.next()) else {
        return Err(CoordinateError::IncompleteTuple {
            tuple: tuple.to_owned(),
        });
    };
    Ok(Coord {
        x: parse_component(lng)?,
        y: parse_component(lat)?,
    })
}

fn parse_component(value: &str) -> Result<f64, CoordinateError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|number| number.is_finite())
        .ok_or_else(|| CoordinateError::InvalidNumber {
            value: value.to_owned(),
        })
}
