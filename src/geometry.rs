//! Geometry vocabulary for spatial columns.
//!
//! Catalogs describe geometry columns in different ways: PostGIS and
//! GeoPackage use OGC type names (`POINT`, `MULTIPOLYGON`), SpatiaLite 4+
//! uses integer codes (`1` = point, `1003` = polygon Z, ...), and older
//! SpatiaLite layouts store the name plus a textual dimension (`XYZ`).
//! This module normalizes all of them into [`GeometrySubtype`] and
//! [`GeometryInfo`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// OGC simple-feature geometry subtypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometrySubtype {
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
    GeometryCollection,
}

impl GeometrySubtype {
    /// Every subtype, in OGC code order.
    pub const ALL: [GeometrySubtype; 7] = [
        GeometrySubtype::Point,
        GeometrySubtype::LineString,
        GeometrySubtype::Polygon,
        GeometrySubtype::MultiPoint,
        GeometrySubtype::MultiLineString,
        GeometrySubtype::MultiPolygon,
        GeometrySubtype::GeometryCollection,
    ];

    /// Parse an OGC type name.
    ///
    /// Accepts `ST_` prefixes and Z/M/ZM suffixes (`ST_MultiPolygonZ`,
    /// `POINTM`). Returns `None` for the generic `GEOMETRY` name and for
    /// anything unrecognized.
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.trim().to_lowercase();
        let lower = lower.strip_prefix("st_").unwrap_or(&lower);
        Self::from_plain(strip_dimension_suffix(lower))
    }

    /// Decode a SpatiaLite 4+ `geometry_type` code.
    ///
    /// Codes are `base + 1000 * dimension_model` where the base is the OGC
    /// code (0 = generic geometry) and the dimension model is 0 (XY),
    /// 1 (XYZ), 2 (XYM) or 3 (XYZM).
    pub fn from_code(code: i64) -> Option<(Option<Self>, u8)> {
        if !(0..4000).contains(&code) {
            return None;
        }
        let dims = match code / 1000 {
            0 => 2,
            1 | 2 => 3,
            _ => 4,
        };
        let subtype = match code % 1000 {
            0 => None,
            1 => Some(Self::Point),
            2 => Some(Self::LineString),
            3 => Some(Self::Polygon),
            4 => Some(Self::MultiPoint),
            5 => Some(Self::MultiLineString),
            6 => Some(Self::MultiPolygon),
            7 => Some(Self::GeometryCollection),
            _ => return None,
        };
        Some((subtype, dims))
    }

    fn from_plain(name: &str) -> Option<Self> {
        match name {
            "point" => Some(Self::Point),
            "linestring" | "line" => Some(Self::LineString),
            "polygon" => Some(Self::Polygon),
            "multipoint" => Some(Self::MultiPoint),
            "multilinestring" => Some(Self::MultiLineString),
            "multipolygon" => Some(Self::MultiPolygon),
            "geometrycollection" | "geomcollection" => Some(Self::GeometryCollection),
            _ => None,
        }
    }

    /// The canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Point => "point",
            Self::LineString => "linestring",
            Self::Polygon => "polygon",
            Self::MultiPoint => "multipoint",
            Self::MultiLineString => "multilinestring",
            Self::MultiPolygon => "multipolygon",
            Self::GeometryCollection => "geometrycollection",
        }
    }
}

impl fmt::Display for GeometrySubtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn strip_dimension_suffix(name: &str) -> &str {
    for suffix in ["zm", "z", "m"] {
        if let Some(base) = name.strip_suffix(suffix) {
            if GeometrySubtype::from_plain(base).is_some() {
                return base;
            }
        }
    }
    name
}

/// Parse a textual coordinate dimension (`XY`, `XYZ`, `XYM`, `XYZM`, `2`, `3`, `4`).
pub fn parse_coord_dimension(text: &str) -> Option<u8> {
    match text.trim().to_uppercase().as_str() {
        "XY" | "2" => Some(2),
        "XYZ" | "XYM" | "3" => Some(3),
        "XYZM" | "4" => Some(4),
        _ => None,
    }
}

/// Spatial metadata for a geometry column.
///
/// Every field is optional: catalogs expose spatial metadata unevenly, and a
/// column declared with a geometry native type but missing from the spatial
/// metadata tables still carries an (empty) `GeometryInfo`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GeometryInfo {
    /// Declared subtype, if the catalog reports one.
    pub subtype: Option<GeometrySubtype>,
    /// Spatial reference identifier.
    pub srid: Option<i32>,
    /// Number of coordinate dimensions (2, 3 or 4).
    pub coord_dimension: Option<u8>,
}

impl GeometryInfo {
    pub fn new(subtype: Option<GeometrySubtype>, srid: Option<i32>) -> Self {
        Self {
            subtype,
            srid,
            coord_dimension: None,
        }
    }

    pub fn with_dimension(mut self, dims: u8) -> Self {
        self.coord_dimension = Some(dims);
        self
    }

    /// Derive spatial metadata from a declared column type.
    ///
    /// Recognizes the generic names (`geometry`, `geography`, `geom`) with
    /// optional PostGIS-style modifiers (`geometry(Point,4326)`) and bare
    /// subtype names as used by SQLite/GeoPackage (`POINT`, `MULTIPOLYGONZ`).
    /// Returns `None` for non-spatial types.
    pub fn from_declared(declared: &str) -> Option<Self> {
        let (head, args) = match declared.split_once('(') {
            Some((head, rest)) => (head, rest.trim_end().trim_end_matches(')')),
            None => (declared, ""),
        };
        let head = head.trim().to_lowercase();

        if matches!(head.as_str(), "geometry" | "geography" | "geom") {
            let mut info = Self::default();
            let mut args = args.split(',').map(str::trim).filter(|a| !a.is_empty());
            if let Some(first) = args.next() {
                match first.parse::<i32>() {
                    Ok(srid) => info.srid = Some(srid),
                    Err(_) => {
                        info.subtype = GeometrySubtype::from_name(first);
                        info.srid = args.next().and_then(|a| a.parse().ok());
                    }
                }
            }
            return Some(info);
        }

        GeometrySubtype::from_name(&head).map(|subtype| Self::new(Some(subtype), None))
    }
}
