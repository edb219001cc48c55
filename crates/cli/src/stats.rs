//! Input summary without emission.

use walkdir::WalkDir;

use vistagraph_mumps::dictionary::DictionaryExtractor;
use vistagraph_mumps::registry::PackageRegistry;
use vistagraph_mumps::zwr::ZwrParser;

use crate::ExtractArgs;

pub fn run(args: &ExtractArgs) -> anyhow::Result<()> {
    let mut parser = ZwrParser::new();
    let records = parser.parse_file(&args.dd)?;
    println!("dictionary: {} records ({:?})", records.len(), parser.stats());

    let mut extractor = DictionaryExtractor::new();
    let (files, fields) = extractor.extract(&records);
    let xrefs = extractor.extract_cross_references(&records);
    let subfiles = extractor.extract_subfiles(&files, &fields);
    println!(
        "  {} files ({} subfiles), {} fields, {} cross-references",
        files.len(),
        subfiles.len(),
        fields.len(),
        xrefs.len()
    );
    let stats = extractor.stats();
    println!(
        "  skipped {} records, {} unparseable type codes, {} incomplete cross-references",
        stats.skipped_records, stats.unparseable_type_codes, stats.incomplete_xrefs
    );

    let registry = PackageRegistry::parse_file(&args.packages)?;
    let reg = registry.stats();
    println!(
        "packages: {} ({} unique prefixes, {} with numeric ranges)",
        reg.packages, reg.unique_prefixes, reg.packages_with_ranges
    );

    let routines = WalkDir::new(&args.routines)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("m"))
        })
        .count();
    println!("routines: {routines} source files");

    Ok(())
}
