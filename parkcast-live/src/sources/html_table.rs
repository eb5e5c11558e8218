//! Scraped HTML occupancy table
//!
//! The city page renders one table inside `div.contentsection`. Cell texts
//! form name / capacity / free triplets; layout rows, group headings and
//! closed lots ("geschlossen") break the rhythm, so the scan re-synchronizes
//! by advancing one cell whenever the two cells after a name are not both
//! plain counts.

use super::html::{first_block, section_with_attr, tag_blocks, text_of};
use super::{parse_count, HttpFetcher, SourceAdapter};
use crate::error::{AdapterFailure, FailureCause};
use async_trait::async_trait;
use parkcast_common::{LiveObservation, OccupancyRecords};
use tracing::debug;

const SECTION_CLASS: &str = "contentsection";

pub struct HtmlTableSource {
    url: String,
    http: HttpFetcher,
}

impl HtmlTableSource {
    pub fn new(url: impl Into<String>, http: HttpFetcher) -> Self {
        Self {
            url: url.into(),
            http,
        }
    }
}

#[async_trait]
impl SourceAdapter for HtmlTableSource {
    type Output = OccupancyRecords;

    fn source_id(&self) -> &str {
        "html-table"
    }

    async fn fetch(&self) -> Result<OccupancyRecords, AdapterFailure> {
        let body = self.http.get_text(self.source_id(), &self.url).await?;
        parse_occupancy_table(&body).map_err(|cause| AdapterFailure::new(self.source_id(), cause))
    }
}

/// Parse the occupancy table out of the page
pub fn parse_occupancy_table(html: &str) -> Result<OccupancyRecords, FailureCause> {
    let section = section_with_attr(html, "class", SECTION_CLASS)
        .ok_or_else(|| FailureCause::MissingNode("div.contentsection".to_string()))?;
    let table = first_block(section, "table")
        .ok_or_else(|| FailureCause::MissingNode("div.contentsection table".to_string()))?;

    let cells: Vec<String> = tag_blocks(table, "tr")
        .into_iter()
        .flat_map(|row| tag_blocks(row, "td"))
        .map(text_of)
        .filter(|text| !text.is_empty())
        .collect();

    let observations = scan_triplets(&cells);
    if observations.is_empty() {
        return Err(FailureCause::Empty);
    }
    Ok(OccupancyRecords::new(observations))
}

/// Walk cell texts as name / capacity / free triplets
pub fn scan_triplets(cells: &[String]) -> Vec<LiveObservation> {
    let mut out = Vec::new();
    let mut i = 0;
    while i + 2 < cells.len() {
        match (parse_count(&cells[i + 1]), parse_count(&cells[i + 2])) {
            (Some(capacity), Some(free)) if parse_count(&cells[i]).is_none() => {
                out.push(LiveObservation::new(cells[i].clone(), capacity, free));
                i += 3;
            }
            _ => {
                debug!(cell = %cells[i], "Skipping cell outside name/capacity/free triplet");
                i += 1;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    const PAGE: &str = r#"
        <html><body>
        <div class="header"><table><tr><td>Menu</td><td>1</td><td>2</td></tr></table></div>
        <div class="contentsection">
          <table>
            <tr><th>Name</th><th>Kapazität</th><th>Frei</th></tr>
            <tr><td><div class="content">Innere Altstadt</div></td></tr>
            <tr><td><div class="content">Altmarkt</div></td><td><div class="content">400</div></td><td><div class="content">100</div></td></tr>
            <tr><td><div class="content">Frauenkirche/Neumarkt</div></td><td>geschlossen</td><td></td></tr>
            <tr><td>Haus am Zwinger</td><td>200</td><td>50</td></tr>
          </table>
        </div>
        </body></html>"#;

    #[test]
    fn test_parse_page() {
        let records = parse_occupancy_table(PAGE).unwrap();
        assert_eq!(records.len(), 2);
        let altmarkt = records.find("altmarkt").unwrap();
        assert_eq!((altmarkt.capacity, altmarkt.free), (400, 100));
        assert_eq!(records.find("Haus am Zwinger").unwrap().free, 50);
        assert!(records.find("Frauenkirche/Neumarkt").is_none());
        assert!(records.find("Menu").is_none());
    }

    #[test]
    fn test_decoy_class_prefix_is_skipped() {
        let html = concat!(
            "<style>div.contentsection table { width: 100% }</style>",
            "<div class=\"contentsection-nav\"><table><tr><td>Impressum</td><td>1</td><td>2</td></tr></table></div>",
            "<div class=\"grid contentsection\"><table><tr><td>Altmarkt</td><td>400</td><td>100</td></tr></table></div>",
        );
        let records = parse_occupancy_table(html).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records.find("Impressum").is_none());
        assert_eq!(records.find("Altmarkt").unwrap().free, 100);
    }

    #[test]
    fn test_only_decoy_section_is_missing_node() {
        let html = "<div class=\"contentsection-nav\"><table><tr><td>Impressum</td><td>1</td><td>2</td></tr></table></div>";
        assert!(matches!(parse_occupancy_table(html), Err(FailureCause::MissingNode(_))));
    }

    #[test]
    fn test_missing_section() {
        let err = parse_occupancy_table("<html><table></table></html>").unwrap_err();
        assert!(matches!(err, FailureCause::MissingNode(_)));
    }

    #[test]
    fn test_missing_table() {
        let err = parse_occupancy_table("<div class=\"contentsection\"><p>Wartung</p></div>").unwrap_err();
        assert!(matches!(err, FailureCause::MissingNode(_)));
    }

    #[test]
    fn test_no_numeric_rows_is_empty() {
        let html = "<div class=\"contentsection\"><table><tr><td>A</td><td>x</td><td>y</td></tr></table></div>";
        assert_eq!(parse_occupancy_table(html).unwrap_err(), FailureCause::Empty);
    }

    #[test]
    fn test_scan_resynchronizes() {
        let obs = scan_triplets(&cells(&[
            "Zentrum", "Altmarkt", "400", "100", "Prager Straße", "geschlossen", "Centrum", "300", "20",
        ]));
        assert_eq!(obs.len(), 2);
        assert_eq!(obs[0], LiveObservation::new("Altmarkt", 400, 100));
        assert_eq!(obs[1], LiveObservation::new("Centrum", 300, 20));
    }

    #[test]
    fn test_scan_rejects_negative_and_decimal() {
        let obs = scan_triplets(&cells(&["A", "-1", "5", "B", "10", "2.5"]));
        assert!(obs.is_empty());
    }
}
