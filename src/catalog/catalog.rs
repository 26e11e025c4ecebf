use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use crate::catalog::types::{GroupError, LoadReport};
use crate::elements::{ElementRecord, FormatError};

/// Element records keyed by their name line, in insertion order.
///
/// Not synchronised; share it behind a lock.
#[derive(Debug, Default)]
pub struct ElementCatalog {
    records: Vec<Arc<ElementRecord>>,
    index: HashMap<String, usize>,
}

impl ElementCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.index.clear();
    }

    /// Load a catalog file from disk (Celestrak-style name/line1/line2 groups).
    pub fn load_file(&mut self, path: &Path, append: bool) -> io::Result<LoadReport> {
        log::info!("Loading elements from {}", path.display());
        let content = fs::read_to_string(path)?;
        Ok(self.load_from_text(&content, append))
    }

    /// Parse `text` in groups of three lines and insert each valid record.
    ///
    /// Malformed groups are skipped and reported; they never abort the load.
    /// Without `append` the catalog is cleared first.
    pub fn load_from_text(&mut self, text: &str, append: bool) -> LoadReport {
        if !append {
            self.clear();
        }

        let mut lines: Vec<&str> = text.lines().collect();
        while lines.last().is_some_and(|l| l.trim().is_empty()) {
            lines.pop();
        }

        let mut report = LoadReport::default();
        for (i, group) in lines.chunks(3).enumerate() {
            let parsed = match group {
                [name, line1, line2] => ElementRecord::from_lines(name, line1, line2),
                _ => Err(FormatError::LineCount(group.len())),
            };
            match parsed {
                Ok(record) => {
                    report.added += 1;
                    if self.insert(record) {
                        report.replaced += 1;
                    }
                }
                Err(error) => {
                    log::warn!("Skipping element group {} (line {}): {}", i + 1, i * 3 + 1, error);
                    report.errors.push(GroupError {
                        group: i + 1,
                        line: i * 3 + 1,
                        error,
                    });
                }
            }
        }

        if append {
            log::info!("Added {} additional element sets", report.added);
        }
        log::info!(
            "Catalog contains {} element sets ({} groups skipped)",
            self.len(),
            report.errors.len()
        );
        report
    }

    /// Insert or overwrite by name. Returns true if a record was replaced;
    /// a replaced record keeps its original position.
    pub fn insert(&mut self, record: ElementRecord) -> bool {
        let record = Arc::new(record);
        match self.index.get(record.name()) {
            Some(&slot) => {
                self.records[slot] = record;
                true
            }
            None => {
                self.index.insert(record.name().to_string(), self.records.len());
                self.records.push(record);
                false
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<ElementRecord>> {
        self.index.get(name).map(|&slot| self.records[slot].clone())
    }

    pub fn records(&self) -> &[Arc<ElementRecord>] {
        &self.records
    }

    /// Case-insensitive substring search over names. An empty term matches
    /// everything.
    pub fn search(&self, term: &str) -> Vec<Arc<ElementRecord>> {
        let found: Vec<_> = self
            .matching(term)
            .map(|slot| self.records[slot].clone())
            .collect();
        log::debug!("Search for {:?} matched {} element sets", term, found.len());
        found
    }

    /// Union of [`search`](Self::search) over several terms, each record at
    /// most once, in catalog order.
    pub fn search_any<S: AsRef<str>>(&self, terms: &[S]) -> Vec<Arc<ElementRecord>> {
        let slots: BTreeSet<usize> = terms
            .iter()
            .flat_map(|term| self.matching(term.as_ref()))
            .collect();
        log::debug!(
            "Search for {} terms matched {} element sets",
            terms.len(),
            slots.len()
        );
        slots
            .into_iter()
            .map(|slot| self.records[slot].clone())
            .collect()
    }

    fn matching<'a>(&'a self, term: &str) -> impl Iterator<Item = usize> + 'a {
        let needle = term.trim().to_lowercase();
        self.records
            .iter()
            .enumerate()
            .filter(move |(_, record)| {
                needle.is_empty() || record.display_name().to_lowercase().contains(&needle)
            })
            .map(|(slot, _)| slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ISS: &str = "ISS (ZARYA)
1 25544U 98067A   21127.19945859  .00000523  00000-0  17665-4 0  9992
2 25544  51.6441 185.4559 0002803 329.9462 127.3881 15.48981972282240";

    // Same elements under different names; checksums do not cover line 0.
    fn named(name: &str) -> String {
        let mut lines = ISS.lines();
        lines.next();
        format!("{name}\n{}\n{}\n", lines.next().unwrap(), lines.next().unwrap())
    }

    fn sample_text() -> String {
        [
            named("ISS (ZARYA)"),
            named("STARLINK-1007"),
            named("STARLINK-1008"),
            named("COSMOS 2251 DEB"),
        ]
        .concat()
    }

    #[test]
    fn test_load_counts_and_order() {
        let mut catalog = ElementCatalog::new();
        let report = catalog.load_from_text(&sample_text(), false);
        assert_eq!(report.added, 4);
        assert!(report.errors.is_empty());
        let names: Vec<_> = catalog.search("").iter().map(|r| r.name().to_string()).collect();
        assert_eq!(
            names,
            ["ISS (ZARYA)", "STARLINK-1007", "STARLINK-1008", "COSMOS 2251 DEB"]
        );
    }

    #[test]
    fn test_bad_group_is_skipped() {
        let broken = named("BROKEN").replace("9992", "9993");
        let text = format!("{}{}{}", named("FIRST"), broken, named("LAST"));
        let mut catalog = ElementCatalog::new();
        let report = catalog.load_from_text(&text, false);
        assert_eq!(report.added, 2);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].group, 2);
        assert_eq!(report.errors[0].line, 4);
        assert!(matches!(
            report.errors[0].error,
            FormatError::Checksum { line: 1, .. }
        ));
        assert!(catalog.get("LAST").is_some());
    }

    #[test]
    fn test_trailing_partial_group_reported() {
        let text = format!("{}ORPHAN\n", named("FIRST"));
        let mut catalog = ElementCatalog::new();
        let report = catalog.load_from_text(&text, false);
        assert_eq!(report.added, 1);
        assert_eq!(report.errors[0].error, FormatError::LineCount(1));
    }

    #[test]
    fn test_append_overwrites_by_name() {
        let mut catalog = ElementCatalog::new();
        catalog.load_from_text(&sample_text(), false);
        let report = catalog.load_from_text(&(named("STARLINK-1007") + &named("NEW SAT")), true);
        assert_eq!(report.added, 2);
        assert_eq!(report.replaced, 1);
        assert_eq!(catalog.len(), 5);
        assert_eq!(catalog.records()[1].name(), "STARLINK-1007");
    }

    #[test]
    fn test_reload_without_append_clears() {
        let mut catalog = ElementCatalog::new();
        catalog.load_from_text(&sample_text(), false);
        catalog.load_from_text(&named("ONLY"), false);
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_padded_names_are_distinct_keys() {
        let mut catalog = ElementCatalog::new();
        catalog.load_from_text(&(named("ISS") + &named("ISS   ")), false);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.search("iss").len(), 2);
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let mut catalog = ElementCatalog::new();
        catalog.load_from_text(&sample_text(), false);
        assert_eq!(catalog.search("starlink").len(), 2);
        assert_eq!(catalog.search("zarya")[0].name(), "ISS (ZARYA)");
        assert!(catalog.search("hubble").is_empty());
    }

    #[test]
    fn test_search_any_deduplicates() {
        let mut catalog = ElementCatalog::new();
        catalog.load_from_text(&sample_text(), false);
        let found = catalog.search_any(&["starlink", "1007", " cosmos "]);
        let names: Vec<_> = found.iter().map(|r| r.name()).collect();
        assert_eq!(names, ["STARLINK-1007", "STARLINK-1008", "COSMOS 2251 DEB"]);
        assert!(Arc::ptr_eq(&found[0], &catalog.search("1007")[0]));
    }
}
