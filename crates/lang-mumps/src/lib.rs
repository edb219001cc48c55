//! Decoding and static analysis for VistA/MUMPS artifacts: the ZWR global
//! dump grammar, the FileMan data dictionary, the package registry CSV, and
//! routine source files.

pub mod code;
pub mod dictionary;
pub mod registry;
pub mod routine;
pub mod zwr;

pub use code::CodeExtractor;
pub use dictionary::DictionaryExtractor;
pub use registry::PackageRegistry;
pub use routine::{Heuristics, RoutineParser};
pub use zwr::{ParsedGlobal, ZwrParser};
