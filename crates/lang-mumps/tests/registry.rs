use vistagraph_mumps::registry::PackageRegistry;

const CSV: &str = "\
Package Name,Directory Name,Prefixes,VDL ID,File Numbers,File Numbers Low,File Numbers High
VA FileMan,VA FileMan,DI DIA DD DM,5,1,1,1.99999
,,X1 X2,,,,
Registration,Registration,DG,55,2,2,2.999
Kernel,Kernel,N/A,10,,,
";

#[test]
fn continuation_rows_fold_into_the_preceding_package() {
    let registry = PackageRegistry::parse_str(CSV).unwrap();
    assert_eq!(registry.packages().len(), 3);

    let fileman = &registry.packages()[0];
    assert_eq!(fileman.name, "VA FileMan");
    assert_eq!(fileman.prefixes, vec!["DI", "DIA", "DD", "DM", "X1", "X2"]);
    assert_eq!(registry.find_by_prefix("X2"), Some("VA FileMan"));
}

#[test]
fn prefix_lookup_is_case_insensitive() {
    let registry = PackageRegistry::parse_str(CSV).unwrap();
    assert_eq!(registry.find_by_prefix("dg"), Some("Registration"));
    assert_eq!(registry.find_by_prefix("ZZ"), None);
}

#[test]
fn not_applicable_prefix_cells_are_dropped() {
    let registry = PackageRegistry::parse_str(CSV).unwrap();
    let kernel = registry
        .packages()
        .iter()
        .find(|p| p.name == "Kernel")
        .unwrap();
    assert!(kernel.prefixes.is_empty());
    assert!(!registry.all_prefixes().contains(&"N/A"));
}

#[test]
fn direct_file_mapping_beats_numeric_range() {
    let registry = PackageRegistry::parse_str(CSV).unwrap();
    // File 1 maps directly; 1.5 only falls inside FileMan's range.
    assert_eq!(registry.find_by_file_number("1"), Some("VA FileMan"));
    assert_eq!(registry.find_by_file_number("1.5"), Some("VA FileMan"));
    assert_eq!(registry.find_by_file_number("2.1"), Some("Registration"));
    assert_eq!(registry.find_by_file_number("9999"), None);
    assert_eq!(registry.find_by_file_number("junk"), None);
}

#[test]
fn leading_continuation_row_is_inert() {
    let csv = "\
Package Name,Directory Name,Prefixes
,,ORPHAN
Order Entry,Order Entry,OR
";
    let registry = PackageRegistry::parse_str(csv).unwrap();
    assert_eq!(registry.packages().len(), 1);
    assert_eq!(registry.find_by_prefix("ORPHAN"), None);
}

#[test]
fn stats_summarize_the_registry() {
    let registry = PackageRegistry::parse_str(CSV).unwrap();
    let stats = registry.stats();
    assert_eq!(stats.packages, 3);
    assert_eq!(stats.total_prefixes, 7);
    assert_eq!(stats.unique_prefixes, 7);
    assert_eq!(stats.packages_with_ranges, 2);
}
