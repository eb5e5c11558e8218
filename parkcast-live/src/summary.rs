//! City-wide totals over the lots with a live reading

use crate::pipeline::EntityRow;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmptiestLot {
    pub entity: String,
    pub free_spots: u32,
    pub occupancy: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    /// Lots with a live reading and positive capacity
    pub lots_observed: usize,
    pub total_capacity: u32,
    pub total_free: u32,
    /// `1 - total_free/total_capacity`; `None` without capacity
    pub total_occupancy: Option<f64>,
    /// Lot with the lowest live occupancy
    pub emptiest: Option<EmptiestLot>,
    /// Mean predicted occupancy over scored lots
    pub mean_predicted: Option<f64>,
}

pub fn summarize(rows: &[EntityRow]) -> Summary {
    let mut summary = Summary::default();

    for row in rows {
        let (Some(free), Some(ratio)) = (row.free_spots, row.live_occupancy) else {
            continue;
        };
        if row.capacity == 0 {
            continue;
        }
        summary.lots_observed += 1;
        summary.total_capacity += row.capacity;
        // recounting feeds can report more free spots than capacity
        summary.total_free += free.min(row.capacity);

        let emptier = summary
            .emptiest
            .as_ref()
            .map_or(true, |e| ratio < e.occupancy);
        if emptier {
            summary.emptiest = Some(EmptiestLot {
                entity: row.entity.clone(),
                free_spots: free,
                occupancy: ratio,
            });
        }
    }

    if summary.total_capacity > 0 {
        summary.total_occupancy =
            Some(1.0 - f64::from(summary.total_free) / f64::from(summary.total_capacity));
    }

    let predicted: Vec<f64> = rows.iter().filter_map(|r| r.predicted_occupancy).collect();
    if !predicted.is_empty() {
        summary.mean_predicted = Some(predicted.iter().sum::<f64>() / predicted.len() as f64);
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::EntityStatus;

    fn row(entity: &str, capacity: u32, free: Option<u32>, predicted: Option<f64>) -> EntityRow {
        EntityRow {
            entity: entity.into(),
            district: "Unknown".into(),
            kind: "Unknown".into(),
            capacity,
            lat: None,
            lon: None,
            free_spots: free,
            live_occupancy: free.and_then(|f| parkcast_common::occupancy_ratio(capacity, f)),
            predicted_occupancy: predicted,
            clamped: false,
            status: EntityStatus::Scored,
        }
    }

    #[test]
    fn test_totals_and_emptiest() {
        let s = summarize(&[
            row("Altmarkt", 400, Some(100), Some(0.8)),
            row("Zwinger", 200, Some(150), Some(0.4)),
            row("No Reading", 300, None, None),
            row("Closed", 0, Some(0), None),
        ]);
        assert_eq!(s.lots_observed, 2);
        assert_eq!(s.total_capacity, 600);
        assert_eq!(s.total_free, 250);
        let occ = s.total_occupancy.unwrap();
        assert!((occ - (1.0 - 250.0 / 600.0)).abs() < 1e-12);
        let emptiest = s.emptiest.unwrap();
        assert_eq!(emptiest.entity, "Zwinger");
        assert_eq!(emptiest.occupancy, 0.25);
        assert!((s.mean_predicted.unwrap() - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_no_capacity_gives_none() {
        let s = summarize(&[row("No Reading", 300, None, None)]);
        assert_eq!(s, Summary::default());
        assert_eq!(s.total_occupancy, None);
    }

    #[test]
    fn test_free_above_capacity_is_capped() {
        let s = summarize(&[row("Recount", 100, Some(130), None)]);
        assert_eq!(s.total_free, 100);
        assert_eq!(s.total_occupancy, Some(0.0));
    }
}
