//! Resource Feed (C13, reference implementation of the §6 consumed
//! interface): yields resource rows in non-decreasing `announce_time`.
//!
//! Map-matching raw lat/lon to `LocationOnRoad` is out of scope for this
//! kernel (§1 non-goals); the reference CSV reader accepts an already
//! map-matched row shape so it can feed the kernel directly in tests and
//! the bundled CLI.

use std::io::Read;

use crate::error::DataError;
use crate::map::LocationOnRoad;

/// One resource row as read from the feed, before it becomes an ECS entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceRow {
    pub announce_time: u64,
    pub pickup_loc: LocationOnRoad,
    pub dropoff_loc: LocationOnRoad,
    pub fare: f64,
}

/// Consumed interface (§6): an iterator of resource rows in non-decreasing
/// `announce_time`. Implementations are expected to validate monotonicity
/// and positive fares themselves; the reference CSV reader does both.
pub trait ResourceFeed {
    fn rows(&self) -> &[ResourceRow];
}

/// CSV columns: `announce_time,pickup_road,pickup_offset,dropoff_road,dropoff_offset,fare`.
#[derive(Debug)]
pub struct CsvResourceFeed {
    rows: Vec<ResourceRow>,
}

impl CsvResourceFeed {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DataError> {
        let mut csv_reader = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);
        let mut rows = Vec::new();
        let mut previous_announce: Option<u64> = None;

        for (idx, record) in csv_reader.records().enumerate() {
            let record = record.map_err(|e| DataError::UnparseableRow {
                row: idx,
                reason: e.to_string(),
            })?;
            let row = parse_row(idx, &record)?;

            if let Some(previous) = previous_announce {
                if row.announce_time < previous {
                    return Err(DataError::NonMonotoneAnnounceTime {
                        row: idx,
                        this: row.announce_time,
                        previous,
                    });
                }
            }
            previous_announce = Some(row.announce_time);

            if row.fare <= 0.0 {
                return Err(DataError::NonPositiveFare { row: idx, fare: row.fare });
            }

            rows.push(row);
        }

        Ok(Self { rows })
    }
}

fn parse_row(idx: usize, record: &csv::StringRecord) -> Result<ResourceRow, DataError> {
    let field = |i: usize, name: &str| -> Result<&str, DataError> {
        record.get(i).ok_or_else(|| DataError::UnparseableRow {
            row: idx,
            reason: format!("missing column `{name}`"),
        })
    };
    let parse_u64 = |s: &str, name: &str| -> Result<u64, DataError> {
        s.parse().map_err(|_| DataError::UnparseableRow {
            row: idx,
            reason: format!("column `{name}` is not a valid integer: `{s}`"),
        })
    };
    let parse_f64 = |s: &str, name: &str| -> Result<f64, DataError> {
        s.parse().map_err(|_| DataError::UnparseableRow {
            row: idx,
            reason: format!("column `{name}` is not a valid number: `{s}`"),
        })
    };
    let parse_road = |s: &str, name: &str| -> Result<u32, DataError> {
        s.parse().map_err(|_| DataError::UnparseableRow {
            row: idx,
            reason: format!("column `{name}` is not a valid road id: `{s}`"),
        })
    };

    let announce_time = parse_u64(field(0, "announce_time")?, "announce_time")?;
    let pickup_road = parse_road(field(1, "pickup_road")?, "pickup_road")?;
    let pickup_offset = parse_u64(field(2, "pickup_offset")?, "pickup_offset")?;
    let dropoff_road = parse_road(field(3, "dropoff_road")?, "dropoff_road")?;
    let dropoff_offset = parse_u64(field(4, "dropoff_offset")?, "dropoff_offset")?;
    let fare = parse_f64(field(5, "fare")?, "fare")?;

    Ok(ResourceRow {
        announce_time,
        pickup_loc: LocationOnRoad { road: pickup_road, travel_time_from_start: pickup_offset },
        dropoff_loc: LocationOnRoad { road: dropoff_road, travel_time_from_start: dropoff_offset },
        fare,
    })
}

impl ResourceFeed for CsvResourceFeed {
    fn rows(&self) -> &[ResourceRow] {
        &self.rows
    }
}
