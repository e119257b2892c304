use std::sync::Arc;

use serde_json::json;
use townmatch::report::{format_town, review_order, Casing, StatusFilter, Summary};
use townmatch::{
    resolve_batch, BaseStatus, DirectoryIndex, Matcher, OverrideError, OverrideKind, ResolutionState, Status,
};

fn directory() -> Arc<DirectoryIndex> {
    Arc::new(DirectoryIndex::from_json_str(include_str!("fixtures/towns.json")).unwrap())
}

fn state(directory: &Arc<DirectoryIndex>) -> ResolutionState {
    let matcher = Matcher::with_defaults(Arc::clone(directory));
    let rows = vec![
        vec![json!("Town")],
        vec![json!("Montpelier")],
        vec![json!("Barre")],
        vec![json!("Zzyzx")],
        vec![json!("Burlingten")],
        vec![json!("btv")],
    ];
    ResolutionState::new(resolve_batch(rows, "Town", &matcher).unwrap())
}

#[test]
fn manual_blank_then_clear_restores_exact_row() {
    let directory = directory();
    let initial = state(&directory);

    let blanked = initial.apply_override(&directory, 0, "", OverrideKind::Manual).unwrap();
    let shown = blanked.displayed(0).unwrap();
    assert_eq!(shown.status, Status::Manual);
    assert_eq!(shown.official, "");
    assert_eq!(shown.geoid, "");
    assert_eq!(blanked.records()[0].base.official(), "Montpelier");

    let restored = blanked.clear_override(0).unwrap();
    assert_eq!(restored, initial);
    let shown = restored.displayed(0).unwrap();
    assert_eq!(shown.status, Status::Exact);
    assert_eq!(shown.official, "Montpelier");
    assert_eq!(shown.geoid, "5002346225");
}

#[test]
fn apply_then_clear_is_identity_on_every_row() {
    let directory = directory();
    let initial = state(&directory);
    for index in 0..initial.len() {
        let applied = initial
            .apply_override(&directory, index, "Middlebury", OverrideKind::Manual)
            .unwrap();
        assert_eq!(applied.displayed(index).unwrap().geoid, "5000144275");
        assert_eq!(applied.clear_override(index).unwrap(), initial, "row {index}");
    }
}

#[test]
fn resolving_ambiguous_row_and_rejecting_others() {
    let directory = directory();
    let initial = state(&directory);

    let resolved = initial
        .apply_override(&directory, 1, "Barre City", OverrideKind::Resolved)
        .unwrap();
    let shown = resolved.displayed(1).unwrap();
    assert_eq!(shown.status, Status::Resolved);
    assert_eq!(shown.official, "Barre City");
    assert_eq!(shown.geoid, "5002303175");
    assert!(shown.options.is_empty());

    let err = initial
        .apply_override(&directory, 3, "Burlington", OverrideKind::Resolved)
        .unwrap_err();
    assert_eq!(
        err,
        OverrideError::NotAmbiguous {
            index: 3,
            status: BaseStatus::Fuzzy
        }
    );
    assert!(format!("{err}").contains("fuzzy"));
}

#[test]
fn manual_override_on_not_found_row() {
    let directory = directory();
    let fixed = state(&directory)
        .apply_override(&directory, 2, "Peru", OverrideKind::Manual)
        .unwrap();
    let shown = fixed.displayed(2).unwrap();
    assert_eq!(shown.status, Status::Manual);
    assert_eq!(shown.geoid, "5000354925");
    assert_eq!(shown.raw_value, "Zzyzx");
}

#[test]
fn summary_and_review_follow_overrides() {
    let directory = directory();
    let initial = state(&directory);
    let summary = Summary::of(&initial);
    assert_eq!(summary.total, 5);
    assert_eq!(summary.needs_review(), 3);

    let worked = initial
        .apply_override(&directory, 1, "Barre Town", OverrideKind::Resolved)
        .unwrap()
        .apply_override(&directory, 2, "Peru", OverrideKind::Manual)
        .unwrap();
    let summary = Summary::of(&worked);
    assert_eq!(summary.count(Status::Resolved), 1);
    assert_eq!(summary.count(Status::Manual), 1);
    assert_eq!(summary.needs_review(), 1);

    let order: Vec<usize> = review_order(&worked).iter().map(|r| r.index).collect();
    assert_eq!(order, vec![3, 2, 1, 4, 0]);

    let ambiguous: Vec<usize> = StatusFilter::Only(Status::Ambiguous)
        .apply(&worked)
        .iter()
        .map(|r| r.index)
        .collect();
    assert_eq!(ambiguous, vec![1]);
}

#[test]
fn export_casing_of_displayed_names() {
    let directory = directory();
    let s = state(&directory);
    let names: Vec<String> = s
        .iter_displayed()
        .map(|r| format_town(r.official, Casing::Upper))
        .collect();
    assert_eq!(names, vec!["MONTPELIER", "", "", "BURLINGTON", "BURLINGTON"]);
}
