use vistagraph_core::model::{DataType, XrefKind};
use vistagraph_mumps::dictionary::DictionaryExtractor;
use vistagraph_mumps::zwr::ZwrParser;

const DD_EXPORT: &str = r#"^DD(2,0)="FIELD^NL^.01^40"
^DD(2,0,"NM","PATIENT")=""
^DD(2,.01,0)="NAME^RF^^0;1^K:$L(X)>30 X"
^DD(2,.02,0)="SEX^RS^M:MALE;F:FEMALE;^0;2^Q"
^DD(2,.03,0)="DATE OF BIRTH^D^^0;3^S %DT=""EX"" D ^%DT S X=Y K:Y<1 X"
^DD(2,.1,0)="PROVIDER^*P200'^VA(200,^0;4^Q"
^DD(2,2,0)="ALIAS^2.01A^^1;0"
^DD(2,4,0)="AGE^CJ3^^ ; ^S Y=$$AGE(DFN)"
^DD(2,.01,1,0)="^.1"
^DD(2,.01,1,1,0)="2^B"
^DD(2,.01,1,1,1)="S ^DPT(""B"",$E(X,1,30),DA)="""""
^DD(2,.01,1,1,2)="K ^DPT(""B"",$E(X,1,30),DA)"
^DD(2,.02,1,0)="^.1"
^DD(2.01,0)="SUB-FIELD^NL^.01^2"
^DD(2.01,.01,0)="ALIAS^F^^0;1^K:$L(X)>30 X"
^DD(120.5,0)="VITALS SUB-FIELD^NL^.01^3"
"#;

fn extract() -> (
    DictionaryExtractor,
    indexmap::IndexMap<String, vistagraph_core::model::FileEntity>,
    Vec<vistagraph_core::model::FieldEntity>,
) {
    let mut parser = ZwrParser::new();
    let records = parser.parse_text(DD_EXPORT);
    let mut extractor = DictionaryExtractor::new();
    let (files, fields) = extractor.extract(&records);
    (extractor, files, fields)
}

#[test]
fn required_free_text_field_resolves_per_precedence() {
    let (_, _, fields) = extract();
    let name = fields
        .iter()
        .find(|f| f.file_number == "2" && f.number == ".01")
        .unwrap();
    assert_eq!(name.name, "NAME");
    assert!(name.required);
    assert_eq!(name.data_type, DataType::Unspecified);
    assert!(!name.is_pointer);
}

#[test]
fn display_name_index_beats_placeholder_header_name() {
    let (_, files, _) = extract();
    assert_eq!(files["2"].name, "PATIENT");
    // No NM entry and a placeholder header leaves the synthetic name.
    assert_eq!(files["2.01"].name, "FILE_2.01");
}

#[test]
fn pointer_marker_carries_target_and_required_flag() {
    let (_, _, fields) = extract();
    let provider = fields
        .iter()
        .find(|f| f.file_number == "2" && f.number == ".1")
        .unwrap();
    assert!(provider.is_pointer);
    assert_eq!(provider.data_type, DataType::Pointer);
    assert_eq!(provider.target_file.as_deref(), Some("200"));
}

#[test]
fn computed_field_keeps_its_source_code() {
    let (_, _, fields) = extract();
    let age = fields
        .iter()
        .find(|f| f.file_number == "2" && f.number == "4")
        .unwrap();
    assert!(age.is_computed);
    assert_eq!(age.data_type, DataType::Computed);
    assert_eq!(age.source_code.as_deref(), Some("S Y=$$AGE(DFN)"));
}

#[test]
fn bare_subfile_number_marks_a_multiple() {
    let (_, _, fields) = extract();
    let alias = fields
        .iter()
        .find(|f| f.file_number == "2" && f.number == "2")
        .unwrap();
    assert!(alias.is_multiple);
    assert_eq!(alias.data_type, DataType::Multiple);
    assert_eq!(alias.target_file.as_deref(), Some("2.01"));
}

#[test]
fn completed_cross_reference_carries_logic_and_incomplete_header_is_counted() {
    let mut parser = ZwrParser::new();
    let records = parser.parse_text(DD_EXPORT);
    let mut extractor = DictionaryExtractor::new();
    let xrefs = extractor.extract_cross_references(&records);

    // Field .02 opened a header but never defined an ordinal.
    assert_eq!(xrefs.len(), 1);
    assert_eq!(extractor.stats().incomplete_xrefs, 1);

    let xref = &xrefs[0];
    assert_eq!(xref.id, "2_.01_1");
    assert_eq!(xref.name, "B");
    assert_eq!(xref.kind, XrefKind::Plain);
    assert!(xref.set_logic.as_deref().unwrap().starts_with("S ^DPT"));
    assert!(xref.kill_logic.as_deref().unwrap().starts_with("K ^DPT"));
}

#[test]
fn ordinal_without_header_is_never_promoted() {
    let mut parser = ZwrParser::new();
    let records = parser.parse_text(r#"^DD(9,.01,1,1,0)="9^B""#);
    let mut extractor = DictionaryExtractor::new();
    assert!(extractor.extract_cross_references(&records).is_empty());
}

#[test]
fn subfiles_recover_parent_file_and_owning_field() {
    let (extractor, files, fields) = extract();
    let subfiles = extractor.extract_subfiles(&files, &fields);

    let alias = subfiles
        .iter()
        .find(|s| s.file.number == "2.01")
        .unwrap();
    assert_eq!(alias.parent_file_number, "2");
    assert_eq!(alias.parent_field_number.as_deref(), Some("2"));
    assert_eq!(alias.nesting_level, 2);
    assert!(alias.file.is_subfile);

    let vitals = subfiles
        .iter()
        .find(|s| s.file.number == "120.5")
        .unwrap();
    assert_eq!(vitals.parent_file_number, "120");
    assert!(vitals.parent_field_number.is_none());
}

#[test]
fn variable_pointer_targets_are_per_ordinal() {
    let mut parser = ZwrParser::new();
    let records = parser.parse_text(
        r#"^DD(8925,1302,"V",1,0)="200^VA(200,^ordering provider"
^DD(8925,1302,"V",2,0)="2^DPT("
"#,
    );
    let mut extractor = DictionaryExtractor::new();
    let targets = extractor.extract_variable_pointers(&records);
    assert_eq!(targets.len(), 2);
    assert_eq!(targets[0].field_number, "1302");
    assert_eq!(targets[0].target_file, "200");
    assert_eq!(targets[0].target_root, "VA(200,");
    assert_eq!(targets[0].description.as_deref(), Some("ordering provider"));
    assert!(targets[1].description.is_none());
}

#[test]
fn global_roots_backfill_only_known_files() {
    let (extractor, mut files, _) = extract();
    let mut parser = ZwrParser::new();
    let dic = parser.parse_text(
        r#"^DIC(2,0,"GL")="^DPT("
^DIC(999,0,"GL")="^NOPE("
"#,
    );
    extractor.backfill_global_roots(&dic, &mut files);
    assert_eq!(files["2"].global_root.as_deref(), Some("^DPT("));
    assert!(!files.contains_key("999"));
}

#[test]
fn extraction_is_idempotent() {
    let (_, files_a, fields_a) = extract();
    let (_, files_b, fields_b) = extract();
    assert_eq!(files_a, files_b);
    assert_eq!(fields_a, fields_b);
}
