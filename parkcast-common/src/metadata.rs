//! Static per-lot metadata table
//!
//! Loaded once per process and injected into the feature assembler. Lookups
//! go through [`normalize_name`] since live sources spell lot names differently.

use crate::types::{normalize_name, LotMetadata, UNKNOWN};
use crate::{Error, Result};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

const NAME_COLUMNS: &[&str] = &["name", "parking lots", "parking lot"];
const CAPACITY_COLUMNS: &[&str] = &["capacity"];
const DISTRICT_COLUMNS: &[&str] = &["district"];
const TYPE_COLUMNS: &[&str] = &["type", "kind"];
const DISTANCE_COLUMNS: &[&str] = &[
    "distance_to_nearest_parking",
    "distance_to_nearest",
    "distance",
];
const LAT_COLUMNS: &[&str] = &["lat", "gps lat", "latitude"];
const LON_COLUMNS: &[&str] = &["lon", "gps lon", "longitude"];

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Metadata rows keyed by normalized lot name
#[derive(Debug, Clone, Default)]
pub struct MetadataTable {
    rows: Vec<LotMetadata>,
    index: HashMap<String, usize>,
}

impl MetadataTable {
    /// Build a table from rows; duplicate names keep the first row
    pub fn from_rows(rows: Vec<LotMetadata>) -> Self {
        let mut table = Self::default();
        for row in rows {
            let key = normalize_name(&row.name);
            if table.index.contains_key(&key) {
                warn!(lot = %row.name, "Duplicate lot in metadata table, keeping first row");
                continue;
            }
            table.index.insert(key, table.rows.len());
            table.rows.push(row);
        }
        table
    }

    /// Load the coordinate/metadata CSV from disk
    pub fn load_csv(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let table = Self::parse_csv(&content)?;
        info!(path = %path.display(), lots = table.len(), "Loaded metadata table");
        Ok(table)
    }

    /// Parse CSV text; `;` or `,` delimited, headers matched case-insensitively
    pub fn parse_csv(content: &str) -> Result<Self> {
        let header_line = content.lines().next().unwrap_or_default();
        let delimiter = if header_line.contains(';') { b';' } else { b',' };

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_lowercase())
            .collect();
        let column = |aliases: &[&str]| headers.iter().position(|h| aliases.contains(&h.as_str()));

        let name_col = column(NAME_COLUMNS)
            .ok_or_else(|| Error::InvalidInput("metadata table has no name column".to_string()))?;
        let capacity_col = column(CAPACITY_COLUMNS);
        let district_col = column(DISTRICT_COLUMNS);
        let type_col = column(TYPE_COLUMNS);
        let distance_col = column(DISTANCE_COLUMNS);
        let lat_col = column(LAT_COLUMNS);
        let lon_col = column(LON_COLUMNS);

        let mut rows = Vec::new();
        let mut missing_distance = Vec::new();

        for record in reader.records() {
            let record = record?;
            let field = |col: Option<usize>| {
                col.and_then(|c| record.get(c))
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
            };

            let Some(name) = field(Some(name_col)) else {
                debug!("Skipping metadata row without name");
                continue;
            };

            let capacity = match field(capacity_col) {
                Some(raw) => parse_capacity(raw).unwrap_or_else(|| {
                    warn!(lot = name, value = raw, "Unparsable capacity, using 0");
                    0
                }),
                None => 0,
            };
            let distance = field(distance_col).and_then(|raw| {
                let parsed = parse_decimal(raw);
                if parsed.is_none() {
                    warn!(lot = name, value = raw, "Unparsable distance");
                }
                parsed
            });
            if distance.is_none() {
                missing_distance.push(rows.len());
            }

            rows.push(LotMetadata {
                name: name.to_string(),
                capacity,
                district: field(district_col).unwrap_or(UNKNOWN).to_string(),
                kind: field(type_col).unwrap_or(UNKNOWN).to_string(),
                distance_to_nearest: distance.unwrap_or(0.0),
                lat: field(lat_col).and_then(parse_decimal),
                lon: field(lon_col).and_then(parse_decimal),
            });
        }

        for i in missing_distance {
            if let Some(d) = nearest_distance(&rows, i) {
                rows[i].distance_to_nearest = d;
            }
        }

        Ok(Self::from_rows(rows))
    }

    pub fn lookup(&self, name: &str) -> Option<&LotMetadata> {
        self.index.get(&normalize_name(name)).map(|&i| &self.rows[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &LotMetadata> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn parse_capacity(raw: &str) -> Option<u32> {
    raw.parse::<u32>()
        .ok()
        .or_else(|| parse_decimal(raw).filter(|v| *v >= 0.0 && v.fract() == 0.0).map(|v| v as u32))
}

/// Accepts both `51.05` and the German `51,05`
fn parse_decimal(raw: &str) -> Option<f64> {
    raw.replace(',', ".").parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Haversine distance in metres between two lat/lon points
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (p1, p2) = (lat1.to_radians(), lat2.to_radians());
    let dp = (lat2 - lat1).to_radians();
    let dl = (lon2 - lon1).to_radians();
    let a = (dp / 2.0).sin().powi(2) + p1.cos() * p2.cos() * (dl / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().asin()
}

fn nearest_distance(rows: &[LotMetadata], i: usize) -> Option<f64> {
    let (lat, lon) = (rows[i].lat?, rows[i].lon?);
    rows.iter()
        .enumerate()
        .filter(|(j, _)| *j != i)
        .filter_map(|(_, r)| Some(haversine_m(lat, lon, r.lat?, r.lon?)))
        .min_by(|a, b| a.total_cmp(b))
}
