//! The station playlist: a CSV file mapping dial position ranges to stream
//! URLs, validated into an ordered table.
//!
//! Rows carry `lower,upper,url[,description[,homepage]]` with no header. The
//! table always ends with a synthetic noise entry that owns every position no
//! real station claims, so resolving a position can never come up empty.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;
use thiserror::Error;

/// Marker bounds carried by the noise entry. Never a valid real range; the
/// entry is selected by default, not by position.
pub const NOISE_BOUNDS: (i32, i32) = (-1, -1);

/// Fatal playlist errors. Loading is all-or-nothing: any bad row aborts the
/// whole table.
#[derive(Debug, Error)]
pub enum PlaylistError {
    #[error("playlist line {line}: boundary values must be integers (got {token:?})")]
    MalformedBoundary { line: usize, token: String },

    #[error("playlist line {line}: expected at least 3 columns, found {found}")]
    MissingColumn { line: usize, found: usize },

    #[error("playlist line {line}: lower bound {lower} is above upper bound {upper}")]
    InvertedBoundary { line: usize, lower: i32, upper: i32 },

    #[error("playlist lines {first} and {second}: position ranges overlap")]
    OverlappingRange { first: usize, second: usize },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct Station {
    pub lower: i32,
    pub upper: i32,
    pub url: String,
    pub description: Option<String>,
    pub homepage: Option<String>,
}

/// Ordered station list, ascending by lower bound, noise entry last.
#[derive(Debug)]
pub struct StationTable {
    stations: Vec<Station>,
}

impl StationTable {
    pub fn load_from_path(path: &Path, noise_url: &str) -> Result<StationTable, PlaylistError> {
        let file = File::open(path)?;
        Self::load(file, noise_url)
    }

    pub fn load<R: Read>(reader: R, noise_url: &str) -> Result<StationTable, PlaylistError> {
        let mut rows = ReaderBuilder::new()
            .has_headers(false)
            .quote(b'"')
            .flexible(true)
            .from_reader(reader);

        let mut stations = Vec::new();
        for (index, row) in rows.records().enumerate() {
            let row = row?;
            let line = index + 1;
            if row.len() < 3 {
                return Err(PlaylistError::MissingColumn {
                    line,
                    found: row.len(),
                });
            }
            stations.push(Station {
                lower: parse_bound(&row[0], line)?,
                upper: parse_bound(&row[1], line)?,
                url: row[2].trim().to_string(),
                description: optional_column(&row, 3),
                homepage: optional_column(&row, 4),
            });
        }
        check_bounds(&stations)?;

        stations.push(Station {
            lower: NOISE_BOUNDS.0,
            upper: NOISE_BOUNDS.1,
            url: noise_url.to_string(),
            description: None,
            homepage: None,
        });
        Ok(StationTable { stations })
    }

    /// Real stations only, without the trailing noise entry.
    pub fn real(&self) -> &[Station] {
        &self.stations[..self.stations.len() - 1]
    }

    /// Index of the noise entry, always the last one.
    pub fn fallback_index(&self) -> usize {
        self.stations.len() - 1
    }

    pub fn get(&self, index: usize) -> &Station {
        &self.stations[index]
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }
}

fn parse_bound(token: &str, line: usize) -> Result<i32, PlaylistError> {
    token
        .trim()
        .parse()
        .map_err(|_| PlaylistError::MalformedBoundary {
            line,
            token: token.to_string(),
        })
}

fn optional_column(row: &csv::StringRecord, index: usize) -> Option<String> {
    row.get(index)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Ranges must be well-formed per row and strictly separated between adjacent
/// rows. Touching ranges count as overlapping.
fn check_bounds(stations: &[Station]) -> Result<(), PlaylistError> {
    for (index, station) in stations.iter().enumerate() {
        if station.lower > station.upper {
            return Err(PlaylistError::InvertedBoundary {
                line: index + 1,
                lower: station.lower,
                upper: station.upper,
            });
        }
    }
    for (index, pair) in stations.windows(2).enumerate() {
        if pair[0].upper >= pair[1].lower {
            return Err(PlaylistError::OverlappingRange {
                first: index + 1,
                second: index + 2,
            });
        }
    }
    Ok(())
}
