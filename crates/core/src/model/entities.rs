//! Entity records extracted from the VistA data dictionary, package registry
//! and routine sources. All of these are plain immutable values; identity
//! assignment and persistence belong to the consumer.

use serde::{Deserialize, Serialize};

/// FileMan field data types, decoded from the type-code mini-language in the
/// second `^`-piece of a field definition.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum DataType {
    FreeText,
    Numeric,
    Date,
    Pointer,
    SetOfCodes,
    Computed,
    WordProcessing,
    VariablePointer,
    Multiple,
    MumpsCode,
    /// Required field whose type code carries no usable type letter.
    Unspecified,
}

impl DataType {
    pub fn from_letter(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'F' => Some(Self::FreeText),
            'N' => Some(Self::Numeric),
            'D' => Some(Self::Date),
            'P' => Some(Self::Pointer),
            'S' => Some(Self::SetOfCodes),
            'C' => Some(Self::Computed),
            'W' => Some(Self::WordProcessing),
            'V' => Some(Self::VariablePointer),
            'M' => Some(Self::Multiple),
            'K' => Some(Self::MumpsCode),
            _ => None,
        }
    }
}

/// A FileMan file (record type). Fractional numbers denote subfiles.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FileEntity {
    pub number: String,
    pub name: String,
    pub global_root: Option<String>,
    pub parent_file: Option<String>,
    pub is_subfile: bool,
    pub description: Option<String>,
    pub version: Option<String>,
}

impl FileEntity {
    /// Integer prefix before the first dot, for fractional file numbers.
    pub fn derived_parent(number: &str) -> Option<&str> {
        number.split_once('.').map(|(parent, _)| parent)
    }
}

/// A field (attribute) owned by a file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FieldEntity {
    pub number: String,
    pub name: String,
    pub file_number: String,
    pub data_type: DataType,
    pub required: bool,
    pub is_pointer: bool,
    pub is_computed: bool,
    pub is_multiple: bool,
    /// Target file number for pointer fields; for multiples, the embedded
    /// subfile number when the type code carries one.
    pub target_file: Option<String>,
    /// MUMPS source for computed fields.
    pub source_code: Option<String>,
}

/// Refinement of [`FileEntity`] for nested (repeating) record types.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SubfileEntity {
    #[serde(flatten)]
    pub file: FileEntity,
    pub parent_file_number: String,
    /// The Multiple field in the parent that owns this subfile, when it can
    /// be recovered from the field table.
    pub parent_field_number: Option<String>,
    pub nesting_level: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum XrefKind {
    #[default]
    Plain,
    Trigger,
    NewStyle,
    Mumps,
}

impl XrefKind {
    /// Third `^`-piece of an ordinal definition record.
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_uppercase().as_str() {
            "MUMPS" => Self::Mumps,
            "TRIGGER" => Self::Trigger,
            "NEW" | "NEW-STYLE" => Self::NewStyle,
            _ => Self::Plain,
        }
    }
}

/// An index definition attached to a field. Assembled in two phases; only
/// complete definitions (header plus ordinal record) are ever emitted.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CrossReferenceEntity {
    pub id: String,
    pub name: String,
    pub file_number: String,
    pub field_number: String,
    pub kind: XrefKind,
    pub ordinal: String,
    pub set_logic: Option<String>,
    pub kill_logic: Option<String>,
}

/// One candidate referent of a variable-pointer field.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct VariablePointerTarget {
    pub file_number: String,
    pub field_number: String,
    pub ordinal: String,
    pub target_file: String,
    pub target_root: String,
    pub description: Option<String>,
}

/// Organizational grouping from the package registry CSV.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PackageEntity {
    pub name: String,
    pub directory: String,
    pub prefixes: Vec<String>,
    pub vdl_id: Option<String>,
    pub file_numbers: Vec<String>,
    pub files_low: Option<String>,
    pub files_high: Option<String>,
}

impl PackageEntity {
    pub fn numeric_range(&self) -> Option<(f64, f64)> {
        let low = self.files_low.as_deref()?.parse().ok()?;
        let high = self.files_high.as_deref()?.parse().ok()?;
        Some((low, high))
    }
}

/// A routine source file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RoutineEntity {
    pub name: String,
    pub package_name: Option<String>,
    pub prefix: Option<String>,
    pub path: String,
    pub line_count: usize,
    pub version: Option<String>,
    pub patches: Vec<String>,
    pub description: Option<String>,
}

/// A column-anchored entry point within a routine.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LabelEntity {
    pub name: String,
    pub routine_name: String,
    pub line_number: usize,
    pub is_entry_point: bool,
    pub is_function: bool,
    pub parameters: Vec<String>,
    pub comment: Option<String>,
}

/// A storage root referenced from code. Created in the code-graph phase,
/// after the dictionary entities already exist.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GlobalEntity {
    pub name: String,
    pub file_number: Option<String>,
}
