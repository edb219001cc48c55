//! Decoder for the package registry CSV (`Packages.csv`).
//!
//! A package may span several rows: continuation rows leave the directory
//! and package-name columns empty and only append prefixes or file numbers
//! to the package opened by the preceding row.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use tracing::debug;

use vistagraph_core::error::Result;
use vistagraph_core::model::PackageEntity;

const COL_DIRECTORY: &str = "Directory Name";
const COL_NAME: &str = "Package Name";
const COL_PREFIXES: &str = "Prefixes";
const COL_VDL_ID: &str = "VDL ID";
const COL_FILE_NUMBERS: &str = "File Numbers";
const COL_FILES_LOW: &str = "File Numbers Low";
const COL_FILES_HIGH: &str = "File Numbers High";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub packages: usize,
    pub total_prefixes: usize,
    pub unique_prefixes: usize,
    pub packages_with_ranges: usize,
}

#[derive(Debug, Default)]
pub struct PackageRegistry {
    packages: Vec<PackageEntity>,
    prefix_to_package: HashMap<String, String>,
    file_to_package: HashMap<String, String>,
    range_to_package: Vec<((f64, f64), String)>,
}

impl PackageRegistry {
    pub fn parse_file(path: &Path) -> Result<Self> {
        let reader = csv::Reader::from_path(path)?;
        Self::parse_csv(reader)
    }

    pub fn parse_str(text: &str) -> Result<Self> {
        Self::parse_csv(csv::Reader::from_reader(text.as_bytes()))
    }

    fn parse_csv<R: Read>(mut reader: csv::Reader<R>) -> Result<Self> {
        let headers = reader.headers()?.clone();
        let column = |name: &str| headers.iter().position(|h| h.trim() == name);

        let col_directory = column(COL_DIRECTORY);
        let col_name = column(COL_NAME);
        let col_prefixes = column(COL_PREFIXES);
        let col_vdl_id = column(COL_VDL_ID);
        let col_file_numbers = column(COL_FILE_NUMBERS);
        let col_files_low = column(COL_FILES_LOW);
        let col_files_high = column(COL_FILES_HIGH);

        let field = |record: &csv::StringRecord, col: Option<usize>| -> String {
            col.and_then(|i| record.get(i))
                .unwrap_or_default()
                .trim()
                .to_string()
        };

        let mut registry = Self::default();

        for record in reader.records() {
            let record = record?;
            let directory = field(&record, col_directory);
            let name = field(&record, col_name);
            let prefixes = clean_prefixes(&field(&record, col_prefixes));
            let file_number = field(&record, col_file_numbers);

            if directory.is_empty() && name.is_empty() {
                // Continuation row: fold payload into the preceding package.
                // A row with no payload at all is inert.
                let Some(current) = registry.packages.last_mut() else {
                    continue;
                };
                for prefix in prefixes {
                    if !current.prefixes.contains(&prefix) {
                        registry
                            .prefix_to_package
                            .insert(prefix.clone(), current.name.clone());
                        current.prefixes.push(prefix);
                    }
                }
                if !file_number.is_empty() {
                    registry
                        .file_to_package
                        .insert(file_number.clone(), current.name.clone());
                    current.file_numbers.push(file_number);
                }
                continue;
            }

            if directory.is_empty() {
                continue;
            }
            let name = if name.is_empty() { directory.clone() } else { name };

            let mut package = PackageEntity {
                name: name.clone(),
                directory,
                prefixes: Vec::new(),
                vdl_id: Some(field(&record, col_vdl_id)).filter(|v| !v.is_empty()),
                file_numbers: Vec::new(),
                files_low: Some(field(&record, col_files_low)).filter(|v| !v.is_empty()),
                files_high: Some(field(&record, col_files_high)).filter(|v| !v.is_empty()),
            };
            for prefix in prefixes {
                if !package.prefixes.contains(&prefix) {
                    registry
                        .prefix_to_package
                        .insert(prefix.clone(), name.clone());
                    package.prefixes.push(prefix);
                }
            }
            if !file_number.is_empty() {
                registry
                    .file_to_package
                    .insert(file_number.clone(), name.clone());
                package.file_numbers.push(file_number);
            }
            if let Some(range) = package.numeric_range() {
                registry.range_to_package.push((range, name.clone()));
            }
            registry.packages.push(package);
        }

        debug!(
            packages = registry.packages.len(),
            prefixes = registry.prefix_to_package.len(),
            "parsed package registry"
        );
        Ok(registry)
    }

    pub fn packages(&self) -> &[PackageEntity] {
        &self.packages
    }

    pub fn find_by_prefix(&self, prefix: &str) -> Option<&str> {
        self.prefix_to_package
            .get(&prefix.to_ascii_uppercase())
            .map(String::as_str)
    }

    /// Direct per-file mapping wins over numeric-range membership.
    pub fn find_by_file_number(&self, file_number: &str) -> Option<&str> {
        if let Some(name) = self.file_to_package.get(file_number) {
            return Some(name);
        }
        let number: f64 = file_number.parse().ok()?;
        self.range_to_package
            .iter()
            .find(|((low, high), _)| *low <= number && number <= *high)
            .map(|(_, name)| name.as_str())
    }

    pub fn all_prefixes(&self) -> Vec<&str> {
        let mut prefixes: Vec<&str> = self.prefix_to_package.keys().map(String::as_str).collect();
        prefixes.sort_unstable();
        prefixes
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            packages: self.packages.len(),
            total_prefixes: self.packages.iter().map(|p| p.prefixes.len()).sum(),
            unique_prefixes: self.prefix_to_package.len(),
            packages_with_ranges: self
                .packages
                .iter()
                .filter(|p| p.numeric_range().is_some())
                .count(),
        }
    }
}

/// Split a prefix cell on commas and whitespace, uppercase, strip quote
/// characters, and drop the `N/A` sentinel.
fn clean_prefixes(raw: &str) -> Vec<String> {
    raw.split(',')
        .flat_map(|part| part.split_whitespace())
        .map(|prefix| {
            prefix
                .trim()
                .to_ascii_uppercase()
                .replace(['"', '\''], "")
        })
        .filter(|prefix| !prefix.is_empty() && prefix != "N/A")
        .collect()
}
