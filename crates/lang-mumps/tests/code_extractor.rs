use vistagraph_core::model::snapshot::{
    GlobalIdentity, IdentitySnapshot, LabelIdentity, RoutineIdentity,
};
use vistagraph_core::model::{AccessMode, CallKind};
use vistagraph_core::resolver::IdentityCache;
use vistagraph_mumps::code::CodeExtractor;

fn label(routine: &str, name: &str, line: usize) -> LabelIdentity {
    LabelIdentity {
        routine_name: routine.to_string(),
        name: name.to_string(),
        line_number: line,
        id: format!("label:{routine}:{name}"),
    }
}

fn cache_for_dg10() -> IdentityCache {
    let snapshot = IdentitySnapshot {
        routines: vec![RoutineIdentity {
            name: "DG10".to_string(),
            id: "routine:DG10".to_string(),
        }],
        labels: vec![
            label("DG10", "A", 1),
            label("DG10", "B", 5),
            label("DG10", "START", 5),
            label("DG10", "NEXT", 9),
        ],
        globals: vec![GlobalIdentity {
            name: "DPT".to_string(),
            id: "global:DPT".to_string(),
        }],
        ..Default::default()
    };
    IdentityCache::from_snapshot(&snapshot)
}

#[test]
fn unqualified_do_targets_the_current_routine() {
    let cache = cache_for_dg10();
    let extractor = CodeExtractor::new(&cache);
    let text = "A ;entry\n D B\n Q\n";

    let buckets = extractor.extract_calls("DG10", text);
    assert_eq!(buckets.resolved.len(), 1);
    assert!(buckets.unresolved.is_empty());
    assert!(buckets.orphaned.is_empty());

    let edge = &buckets.resolved[0];
    assert_eq!(edge.kind, CallKind::Do);
    assert_eq!(edge.source_label, "A");
    assert_eq!(edge.target_routine, "DG10");
    assert_eq!(edge.target_label, "B");
    assert_eq!(edge.target_id.as_deref(), Some("label:DG10:B"));
    assert_eq!(edge.line_number, 2);
}

#[test]
fn unknown_target_lands_in_the_unresolved_bucket() {
    let cache = cache_for_dg10();
    let extractor = CodeExtractor::new(&cache);
    let buckets = extractor.extract_calls("DG10", "A ;\n D EN^XUS\n");

    assert!(buckets.resolved.is_empty());
    assert_eq!(buckets.unresolved.len(), 1);
    assert_eq!(buckets.unresolved[0].target_routine, "XUS");
    assert!(buckets.unresolved[0].target_id.is_none());
}

#[test]
fn unknown_source_label_lands_in_the_orphaned_bucket() {
    let cache = cache_for_dg10();
    let extractor = CodeExtractor::new(&cache);
    // MYSTERY is not in the cache, so its edge has no source identity.
    let buckets = extractor.extract_calls("DG10", "MYSTERY ;\n D B\n");

    assert!(buckets.resolved.is_empty());
    assert_eq!(buckets.orphaned.len(), 1);
    assert!(buckets.orphaned[0].source_id.is_none());
}

#[test]
fn lines_before_the_first_label_emit_nothing() {
    let cache = cache_for_dg10();
    let extractor = CodeExtractor::new(&cache);
    let buckets = extractor.extract_calls("DG10", " D B\n D B\nA ;\n");
    assert!(buckets.resolved.is_empty());
    assert!(buckets.unresolved.is_empty());
    assert!(buckets.orphaned.is_empty());
}

#[test]
fn invocation_recovers_the_assignment_target() {
    let cache = cache_for_dg10();
    let extractor = CodeExtractor::new(&cache);
    let buckets = extractor.extract_invocations("DG10", "A ;\n S RESULT=$$B^DG10(X)\n");

    assert_eq!(buckets.resolved.len(), 1);
    let edge = &buckets.resolved[0];
    assert_eq!(edge.target_label, "B");
    assert_eq!(edge.assigns_to.as_deref(), Some("RESULT"));
}

#[test]
fn bare_invocation_has_no_assignment_target() {
    let cache = cache_for_dg10();
    let extractor = CodeExtractor::new(&cache);
    let buckets = extractor.extract_invocations("DG10", "A ;\n I $$B(X) Q\n");
    assert_eq!(buckets.resolved.len(), 1);
    assert!(buckets.resolved[0].assigns_to.is_none());
}

#[test]
fn global_accesses_classify_by_lexical_context() {
    let cache = cache_for_dg10();
    let extractor = CodeExtractor::new(&cache);
    let text = "A ;\n S ^DPT(DFN,0)=X\n K ^DPT(DFN)\n I $D(^DPT(DFN)) Q\n S Y=^DPT(DFN,0)\n";
    let buckets = extractor.extract_accesses("DG10", text);

    assert_eq!(buckets.resolved.len(), 4);
    let modes: Vec<AccessMode> = buckets.resolved.iter().map(|e| e.mode).collect();
    assert_eq!(
        modes,
        vec![
            AccessMode::Write,
            AccessMode::Kill,
            AccessMode::Exists,
            AccessMode::Read
        ]
    );
    assert_eq!(buckets.resolved[0].pattern, "^DPT(DFN,0)");
}

#[test]
fn unknown_global_is_unresolved_not_dropped() {
    let cache = cache_for_dg10();
    let extractor = CodeExtractor::new(&cache);
    let buckets = extractor.extract_accesses("DG10", "A ;\n S ^XTMP(1)=2\n");
    assert_eq!(buckets.unresolved.len(), 1);
    assert_eq!(buckets.unresolved[0].global_name, "XTMP");
}

#[test]
fn adjacent_labels_without_exit_fall_through() {
    let cache = cache_for_dg10();
    let extractor = CodeExtractor::new(&cache);
    let text = "\
A ;line 1
 D B
 Q
 ;
START ;line 5
 S X=1
 S Y=2
 ;
NEXT ;line 9
 Q
";
    let buckets = extractor.extract_fall_through("DG10", text);

    assert_eq!(buckets.resolved.len(), 1);
    let edge = &buckets.resolved[0];
    assert_eq!(edge.from_label, "START");
    assert_eq!(edge.to_label, "NEXT");
    assert!((edge.confidence - 0.9).abs() < f32::EPSILON);
}

#[test]
fn an_exit_between_labels_suppresses_fall_through() {
    let cache = cache_for_dg10();
    let extractor = CodeExtractor::new(&cache);
    let text = "START ;\n S X=1\n Q\nNEXT ;\n Q\n";
    let buckets = extractor.extract_fall_through("DG10", text);
    assert!(buckets.is_empty());
}
