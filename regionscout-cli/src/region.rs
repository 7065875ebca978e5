//! Parsing of region and list options.

use std::collections::BTreeSet;
use std::str::FromStr;

use geo::{Coord, Rect};
use regionscout_core::query::UnknownVariant;

use crate::CliError;

/// Parse `lat_sw,lng_sw,lat_ne,lng_ne` into a rectangle in `(lng, lat)`
/// coordinates.
///
/// Corners may be given in either order; the selection normalises them.
pub(crate) fn parse_region(field: &'static str, value: &str) -> Result<Rect<f64>, CliError> {
    let invalid = |message: String| CliError::InvalidRegion {
        field,
        value: value.to_owned(),
        message,
    };
    let numbers = value
        .split(',')
        .map(|part| {
            let part = part.trim();
            part.parse::<f64>()
                .ok()
                .filter(|number| number.is_finite())
                .ok_or_else(|| invalid(format!("`{part}` is not a finite number")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let [lat_sw, lng_sw, lat_ne, lng_ne] = numbers.as_slice() else {
        return Err(invalid(format!(
            "expected 4 coordinates, found {}",
            numbers.len()
        )));
    };
    if !(-90.0..=90.0).contains(lat_sw) || !(-90.0..=90.0).contains(lat_ne) {
        return Err(invalid("latitudes must lie within [-90, 90]".to_owned()));
    }
    if !(-180.0..=180.0).contains(lng_sw) || !(-180.0..=180.0).contains(lng_ne) {
        return Err(invalid("longitudes must lie within [-180, 180]".to_owned()));
    }
    Ok(Rect::new(
        Coord {
            x: *lng_sw,
            y: *lat_sw,
        },
        Coord {
            x: *lng_ne,
            y: *lat_ne,
        },
    ))
}

/// Parse a comma-separated list of names, ignoring empty entries.
pub(crate) fn parse_choices<T>(field: &'static str, value: Option<&str>) -> Result<BTreeSet<T>, CliError>
where
    T: FromStr<Err = UnknownVariant> + Ord,
{
    value
        .unwrap_or_default()
        .split(',')
        .filter(|entry| !entry.trim().is_empty())
        .map(|entry| {
            entry
                .parse()
                .map_err(|source| CliError::InvalidChoice { field, source })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use regionscout_core::query::{ExportFormat, Tier};
    use rstest::rstest;

    #[rstest]
    fn parses_corners_into_lng_lat_rectangle() {
        let rect = parse_region("bbox", "40.4, -80.0, 40.5, -79.9").expect("valid region");
        assert_eq!(rect.min(), Coord { x: -80.0, y: 40.4 });
        assert_eq!(rect.max(), Coord { x: -79.9, y: 40.5 });
    }

    #[rstest]
    #[case::too_few("40.4,-80.0,40.5")]
    #[case::too_many("1,2,3,4,5")]
    #[case::not_a_number("40.4,west,40.5,-79.9")]
    #[case::infinite("inf,-80.0,40.5,-79.9")]
    #[case::latitude_out_of_range("95,-80.0,40.5,-79.9")]
    #[case::longitude_out_of_range("40.4,-200,40.5,-79.9")]
    fn rejects_malformed_regions(#[case] value: &str) {
        let err = parse_region("bbox", value).expect_err("region should be rejected");
        match err {
            CliError::InvalidRegion {
                field,
                value: rejected,
                ..
            } => {
                assert_eq!(field, "bbox");
                assert_eq!(rejected, value);
            }
            other => panic!("expected InvalidRegion, found {other:?}"),
        }
    }

    #[rstest]
    fn parses_format_lists() {
        let formats: BTreeSet<ExportFormat> =
            parse_choices("formats", Some("json, KMZ,,excel")).expect("valid formats");
        assert_eq!(
            formats,
            BTreeSet::from([ExportFormat::Json, ExportFormat::Kmz, ExportFormat::Excel])
        );
    }

    #[rstest]
    fn missing_lists_are_empty() {
        let tiers: BTreeSet<Tier> = parse_choices("tiers", None).expect("no tiers");
        assert!(tiers.is_empty());
    }

    #[rstest]
    fn unknown_entries_are_reported() {
        let err = parse_choices::<Tier>("tiers", Some("reviews,videos"))
            .expect_err("videos is not a tier");
        match err {
            CliError::InvalidChoice { field, source } => {
                assert_eq!(field, "tiers");
                assert_eq!(source.value, "videos");
            }
            other => panic!("expected InvalidChoice, found {other:?}"),
        }
    }
}
