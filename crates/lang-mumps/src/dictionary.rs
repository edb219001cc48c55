//! Semantic extraction over parsed `^DD` / `^DIC` records: files, fields,
//! subfiles, cross-references and variable-pointer targets.
//!
//! The value strings carry positional `^`-delimited mini-languages. Records
//! that fail positional decoding are skipped and counted, never raised; the
//! pipeline is built to tolerate partial information.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use vistagraph_core::model::{
    CrossReferenceEntity, DataType, FieldEntity, FileEntity, SubfileEntity,
    VariablePointerTarget, XrefKind,
};

use crate::zwr::ParsedGlobal;

static POINTER_TARGET: Lazy<Regex> = Lazy::new(|| Regex::new(r"P(\d+(?:\.\d+)*)").unwrap());
static SUBFILE_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+(?:\.\d+)+)").unwrap());

/// Decoded second `^`-piece of a field definition.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldTypeInfo {
    pub data_type: DataType,
    pub required: bool,
    pub is_pointer: bool,
    pub is_computed: bool,
    pub is_multiple: bool,
    pub target_file: Option<String>,
}

impl FieldTypeInfo {
    fn plain(data_type: DataType) -> Self {
        Self {
            data_type,
            required: false,
            is_pointer: false,
            is_computed: false,
            is_multiple: false,
            target_file: None,
        }
    }
}

/// Tagged decode result; ambiguous codes surface as `Unparseable` instead of
/// silently defaulting, so they stay observable in tests and statistics.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeCode {
    Resolved(FieldTypeInfo),
    Unparseable(String),
}

/// Decode a field type code such as `RF`, `P200'`, `*P9.8`, `S`, `2.01A`.
///
/// Precedence is fixed and longest-match: pointer markers win over a generic
/// leading letter; a leading `R` marks the field required and tolerates a
/// following type letter (`RN` is required-numeric). `RF` and bare `R`
/// resolve to the required-with-unspecified-type tag; the exact precedence
/// here is a policy inferred from sample exports, not an authoritative
/// contract.
pub fn decode_type_code(code: &str) -> TypeCode {
    let code = code.trim();
    if code.is_empty() {
        return TypeCode::Resolved(FieldTypeInfo::plain(DataType::FreeText));
    }
    let upper = code.to_ascii_uppercase();
    let head: String = upper.chars().take(3).collect();

    // Pointer markers take priority over everything else.
    if upper.starts_with("*P") || head.contains('P') {
        let target = POINTER_TARGET
            .captures(&upper)
            .map(|c| c[1].to_string());
        return TypeCode::Resolved(FieldTypeInfo {
            data_type: DataType::Pointer,
            required: upper.starts_with('R'),
            is_pointer: true,
            is_computed: false,
            is_multiple: false,
            target_file: target,
        });
    }

    if let Some(rest) = upper.strip_prefix('R') {
        let data_type = match rest.chars().next() {
            Some('N') => DataType::Numeric,
            Some('D') => DataType::Date,
            Some('S') => DataType::SetOfCodes,
            Some('W') => DataType::WordProcessing,
            Some('V') => DataType::VariablePointer,
            Some('C') => DataType::Computed,
            Some('M') => DataType::Multiple,
            Some('K') => DataType::MumpsCode,
            // `RF` and bare `R` carry no usable type letter.
            _ => DataType::Unspecified,
        };
        return TypeCode::Resolved(FieldTypeInfo {
            data_type,
            required: true,
            is_pointer: false,
            is_computed: data_type == DataType::Computed,
            is_multiple: data_type == DataType::Multiple,
            target_file: None,
        });
    }

    if upper.starts_with('C') {
        let mut info = FieldTypeInfo::plain(DataType::Computed);
        info.is_computed = true;
        return TypeCode::Resolved(info);
    }

    // Multiples either carry an explicit `M` or lead with the subfile number
    // itself (e.g. `2.01A`).
    if upper.starts_with('M') {
        let mut info = FieldTypeInfo::plain(DataType::Multiple);
        info.is_multiple = true;
        info.target_file = SUBFILE_NUMBER
            .captures(&upper[1..])
            .map(|c| c[1].to_string());
        return TypeCode::Resolved(info);
    }
    if let Some(caps) = SUBFILE_NUMBER.captures(&upper) {
        let mut info = FieldTypeInfo::plain(DataType::Multiple);
        info.is_multiple = true;
        info.target_file = Some(caps[1].to_string());
        return TypeCode::Resolved(info);
    }

    match upper.chars().next().and_then(DataType::from_letter) {
        Some(data_type) => TypeCode::Resolved(FieldTypeInfo::plain(data_type)),
        None => TypeCode::Unparseable(code.to_string()),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DictionaryStats {
    pub files: usize,
    pub fields: usize,
    pub skipped_records: usize,
    pub unparseable_type_codes: usize,
    pub incomplete_xrefs: usize,
}

#[derive(Debug, Default)]
struct XrefCandidate {
    name: String,
    kind: XrefKind,
    set_logic: Option<String>,
    kill_logic: Option<String>,
}

/// Two-pass extractor over a dictionary record stream.
#[derive(Debug, Default)]
pub struct DictionaryExtractor {
    file_names: HashMap<String, String>,
    stats: DictionaryStats,
}

impl DictionaryExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> DictionaryStats {
        self.stats
    }

    /// Extract file and field definitions.
    ///
    /// The first pass collects the `(file,0,"NM",name)` display-name table;
    /// those names are preferred over the header's embedded name, which is
    /// sometimes a generic placeholder such as `FIELD`.
    pub fn extract(
        &mut self,
        records: &[ParsedGlobal],
    ) -> (IndexMap<String, FileEntity>, Vec<FieldEntity>) {
        for record in records {
            if !record.is_dd_entry() {
                continue;
            }
            if record.subscripts.len() >= 4
                && record.subscripts[1] == "0"
                && record.subscripts[2] == "NM"
            {
                self.file_names
                    .insert(record.subscripts[0].clone(), record.subscripts[3].clone());
            }
        }

        let mut files = IndexMap::new();
        let mut fields = Vec::new();

        for record in records {
            if !record.is_dd_entry() {
                continue;
            }
            if record.is_file_header() {
                if let Some(file) = self.decode_file_header(record) {
                    files.insert(file.number.clone(), file);
                }
            } else if record.is_field_definition() {
                if let Some(field) = self.decode_field_definition(record) {
                    fields.push(field);
                }
            }
        }

        self.stats.files = files.len();
        self.stats.fields = fields.len();
        debug!(
            files = files.len(),
            fields = fields.len(),
            skipped = self.stats.skipped_records,
            "dictionary extraction complete"
        );
        (files, fields)
    }

    fn decode_file_header(&mut self, record: &ParsedGlobal) -> Option<FileEntity> {
        let number = record.subscripts[0].clone();
        let parts: Vec<&str> = record.value.split('^').collect();
        if parts.is_empty() {
            self.stats.skipped_records += 1;
            return None;
        }

        let name = if let Some(name) = self.file_names.get(&number) {
            name.clone()
        } else if !parts[0].is_empty() && parts[0] != "FIELD" && parts[0] != "SUB-FIELD" {
            parts[0].to_string()
        } else {
            format!("FILE_{number}")
        };

        let is_subfile =
            record.value.to_ascii_uppercase().contains("SUB-FILE") || number.contains('.');
        let parent_file = FileEntity::derived_parent(&number).map(str::to_string);

        Some(FileEntity {
            number,
            name,
            // Storage roots come from the `^DIC` registry in a later pass.
            global_root: None,
            parent_file,
            is_subfile,
            description: None,
            version: None,
        })
    }

    fn decode_field_definition(&mut self, record: &ParsedGlobal) -> Option<FieldEntity> {
        if record.subscripts.len() < 3 {
            self.stats.skipped_records += 1;
            return None;
        }
        let file_number = record.subscripts[0].clone();
        let field_number = record.subscripts[1].clone();

        // Subscript 0 is the header and `B*` subscripts are index entries,
        // not fields.
        if field_number == "0" || field_number.starts_with('B') {
            return None;
        }

        let parts: Vec<&str> = record.value.split('^').collect();
        if parts.is_empty() {
            self.stats.skipped_records += 1;
            return None;
        }

        let name = if parts[0].is_empty() {
            format!("FIELD_{field_number}")
        } else {
            parts[0].to_string()
        };

        let type_code = parts.get(1).copied().unwrap_or("");
        let info = match decode_type_code(type_code) {
            TypeCode::Resolved(info) => info,
            TypeCode::Unparseable(code) => {
                self.stats.unparseable_type_codes += 1;
                warn!(file = %file_number, field = %field_number, code = %code,
                      "unparseable field type code");
                FieldTypeInfo::plain(DataType::FreeText)
            }
        };

        // The third piece can carry an additional required marker.
        let required = info.required
            || parts
                .get(2)
                .is_some_and(|p| p.to_ascii_uppercase().contains('R'));

        let source_code = if info.is_computed {
            parts.get(4).filter(|p| !p.is_empty()).map(|p| p.to_string())
        } else {
            None
        };

        Some(FieldEntity {
            number: field_number,
            name,
            file_number,
            data_type: info.data_type,
            required,
            is_pointer: info.is_pointer,
            is_computed: info.is_computed,
            is_multiple: info.is_multiple,
            target_file: info.target_file,
            source_code,
        })
    }

    /// Assemble cross-reference entities in two phases.
    ///
    /// `(f,fl,1,0)="^.1"` opens a field-level candidate; an ordinal record
    /// `(f,fl,1,n,0)` completes it; SET/KILL logic records attach to a
    /// completed candidate by ordinal key. Candidates that never complete are
    /// discarded and counted, not emitted.
    pub fn extract_cross_references(
        &mut self,
        records: &[ParsedGlobal],
    ) -> Vec<CrossReferenceEntity> {
        let mut headers: HashSet<(String, String)> = HashSet::new();
        let mut candidates: IndexMap<(String, String, String), XrefCandidate> = IndexMap::new();

        for record in records {
            if !record.is_dd_entry() {
                continue;
            }
            if record.subscripts.len() < 3 || record.subscripts[2] != "1" {
                continue;
            }
            let file_number = record.subscripts[0].clone();
            let field_number = record.subscripts[1].clone();

            if record.is_xref_header() {
                headers.insert((file_number, field_number));
                continue;
            }

            if record.subscripts.len() != 5 {
                continue;
            }
            let ordinal = record.subscripts[3].clone();
            match record.subscripts[4].as_str() {
                "0" => {
                    if !headers.contains(&(file_number.clone(), field_number.clone())) {
                        continue;
                    }
                    let parts: Vec<&str> = record.value.split('^').collect();
                    if parts.len() < 2 {
                        self.stats.skipped_records += 1;
                        continue;
                    }
                    let name = if parts[1].is_empty() {
                        format!("XREF_{ordinal}")
                    } else {
                        parts[1].to_string()
                    };
                    let kind = parts.get(2).map(|p| XrefKind::from_code(p)).unwrap_or(XrefKind::Plain);
                    candidates.insert(
                        (file_number, field_number, ordinal),
                        XrefCandidate {
                            name,
                            kind,
                            ..Default::default()
                        },
                    );
                }
                "1" => {
                    if let Some(candidate) =
                        candidates.get_mut(&(file_number, field_number, ordinal))
                    {
                        candidate.set_logic = Some(record.value.clone());
                    }
                }
                "2" => {
                    if let Some(candidate) =
                        candidates.get_mut(&(file_number, field_number, ordinal))
                    {
                        candidate.kill_logic = Some(record.value.clone());
                    }
                }
                _ => {}
            }
        }

        // Headers that never received an ordinal definition stay unemitted.
        let completed: HashSet<(String, String)> = candidates
            .keys()
            .map(|(f, fl, _)| (f.clone(), fl.clone()))
            .collect();
        self.stats.incomplete_xrefs += headers.difference(&completed).count();

        candidates
            .into_iter()
            .map(|((file_number, field_number, ordinal), candidate)| CrossReferenceEntity {
                id: format!("{file_number}_{field_number}_{ordinal}"),
                name: candidate.name,
                file_number,
                field_number,
                kind: candidate.kind,
                ordinal,
                set_logic: candidate.set_logic,
                kill_logic: candidate.kill_logic,
            })
            .collect()
    }

    /// Subfile detection is purely structural: any fractional file number is
    /// a subfile of its integer-prefix file. The owning Multiple field is
    /// recovered from the field table when its embedded target matches.
    pub fn extract_subfiles(
        &self,
        files: &IndexMap<String, FileEntity>,
        fields: &[FieldEntity],
    ) -> Vec<SubfileEntity> {
        files
            .values()
            .filter(|file| file.number.contains('.'))
            .map(|file| {
                let segments: Vec<&str> = file.number.split('.').collect();
                let parent_file_number = segments[0].to_string();
                let parent_field_number = fields
                    .iter()
                    .find(|field| {
                        field.is_multiple
                            && field.file_number == parent_file_number
                            && field.target_file.as_deref() == Some(file.number.as_str())
                    })
                    .map(|field| field.number.clone());

                SubfileEntity {
                    file: file.clone(),
                    parent_file_number,
                    parent_field_number,
                    nesting_level: segments.len(),
                }
            })
            .collect()
    }

    /// Extract variable-pointer targets from `(f,fl,"V",n,0)` entries. A
    /// field may own many targets.
    pub fn extract_variable_pointers(
        &mut self,
        records: &[ParsedGlobal],
    ) -> Vec<VariablePointerTarget> {
        let mut targets = Vec::new();
        for record in records {
            if !record.is_v_pointer_target() {
                continue;
            }
            let parts: Vec<&str> = record.value.split('^').collect();
            let Some(target_file) = parts.first().filter(|p| !p.is_empty()) else {
                self.stats.skipped_records += 1;
                continue;
            };
            targets.push(VariablePointerTarget {
                file_number: record.subscripts[0].clone(),
                field_number: record.subscripts[1].clone(),
                ordinal: record.subscripts[3].clone(),
                target_file: target_file.to_string(),
                target_root: parts.get(1).copied().unwrap_or("").to_string(),
                description: parts.get(2).filter(|p| !p.is_empty()).map(|p| p.to_string()),
            });
        }
        targets
    }

    /// Back-fill physical storage roots from the `^DIC(f,0,"GL")` registry.
    /// Applies only to files already known from the primary pass; unknown
    /// file numbers never create entities retroactively.
    pub fn backfill_global_roots(
        &self,
        records: &[ParsedGlobal],
        files: &mut IndexMap<String, FileEntity>,
    ) {
        for record in records {
            if record.global_name != "DIC"
                || record.subscripts.len() != 3
                || record.subscripts[1] != "0"
                || record.subscripts[2] != "GL"
            {
                continue;
            }
            if let Some(file) = files.get_mut(&record.subscripts[0]) {
                let root = if record.value.starts_with('^') {
                    record.value.clone()
                } else {
                    format!("^{}", record.value)
                };
                file.global_root = Some(root);
            }
        }
    }
}
