use super::*;
use crate::core::store::LinkEdge;
use tempfile::tempdir;

fn engine() -> Engine<'static> {
    Engine::open_in_memory().unwrap()
}

fn row(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn observation(sku: &str, variable: &str, day: u32, value: f64) -> ObservationRow {
    ObservationRow {
        sku: sku.to_string(),
        variable: variable.to_string(),
        date: NaiveDate::from_ymd_opt(2015, 1, day).unwrap(),
        value,
    }
}

fn edge(old: &str, new: &str) -> LinkEdge {
    LinkEdge {
        old: old.to_string(),
        new: new.to_string(),
    }
}

// =========================================================================
// Missing queue
// =========================================================================

#[test]
fn test_staging_twice_returns_same_id() {
    let engine = engine();

    let first = engine.stage_missing("SKU2").unwrap();
    let second = engine.stage_missing("SKU2").unwrap();
    assert_eq!(first, second);

    let entries = engine.missing().list().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].basis, "SKU2");
}

#[test]
fn test_stage_known_sku_is_not_queued() {
    let engine = engine();
    engine
        .add_product(&ProductRecord::new("Widget").with(Attribute::Sku, "SKU1"))
        .unwrap();

    assert_eq!(
        engine.stage_missing("SKU1").unwrap(),
        StageOutcome::Known("Widget".to_string())
    );
    assert!(engine.missing().list().unwrap().is_empty());
}

#[test]
fn test_assign_missing_scenario() {
    let engine = engine();
    let summary = engine
        .bulk_import(&[row(&[("product", "Widget"), ("sku", "SKU1")])], false)
        .unwrap();
    assert_eq!(summary.inserted, 1);

    let widget = engine.catalog().get("Widget").unwrap().unwrap();
    assert_eq!(
        widget.to_row(),
        ["Widget", "SKU1", "", "", "", ""].map(String::from)
    );

    engine.stage_missing("SKU2").unwrap();
    engine.stage_missing("SKU3").unwrap();
    let outcome = engine.assign_missing("SKU2", "Widget").unwrap();

    assert_eq!(outcome.previous_sku.as_deref(), Some("SKU1"));
    assert!(!outcome.placeholder_found());
    let widget = engine.catalog().get("Widget").unwrap().unwrap();
    assert_eq!(widget.sku.as_deref(), Some("SKU2"));

    let remaining: Vec<String> = engine
        .missing()
        .list()
        .unwrap()
        .into_iter()
        .map(|e| e.basis)
        .collect();
    assert_eq!(remaining, vec!["SKU3"]);
}

#[test]
fn test_assign_moves_placeholder_data() {
    let engine = engine();
    engine.alias_add("units", "Units Sold").unwrap();

    let import = engine
        .import_observations(
            "sales.csv",
            &[
                observation("SKU9", "Units Sold", 1, 3.0),
                observation("SKU9", "units sold", 2, 4.0),
            ],
            Utc::now(),
        )
        .unwrap();
    assert_eq!(import.recorded, 2);
    assert_eq!(import.staged.len(), 1);

    let placeholder = import.staged[0].placeholder();
    let filed = engine.observations().for_product(&placeholder).unwrap();
    assert_eq!(filed.len(), 2);
    assert!(filed.iter().all(|o| o.variable == "units"));

    engine.add_product(&ProductRecord::new("Widget")).unwrap();
    let outcome = engine.assign_missing("SKU9", "Widget").unwrap();

    assert_eq!(outcome.placeholder, placeholder);
    assert_eq!(outcome.placeholder_rows, 2);
    assert_eq!(engine.observations().count_for("Widget").unwrap(), 2);
    assert_eq!(engine.observations().count_for(&placeholder).unwrap(), 0);
    assert!(engine.missing().list().unwrap().is_empty());
}

#[test]
fn test_assign_unknown_basis_changes_nothing() {
    let engine = engine();
    engine
        .add_product(&ProductRecord::new("Widget").with(Attribute::Sku, "SKU1"))
        .unwrap();

    let err = engine.assign_missing("SKU404", "Widget").unwrap_err();
    assert!(matches!(err, CatalogError::NotFound { .. }));
    let widget = engine.catalog().get("Widget").unwrap().unwrap();
    assert_eq!(widget.sku.as_deref(), Some("SKU1"));
}

#[test]
fn test_assign_to_unknown_product_keeps_queue() {
    let engine = engine();
    engine.stage_missing("SKU2").unwrap();

    let err = engine.assign_missing("SKU2", "Ghost").unwrap_err();
    assert!(matches!(err, CatalogError::NotFound { kind: "product", .. }));
    assert_eq!(engine.missing().list().unwrap().len(), 1);
}

#[test]
fn test_resolve_placeholder_moves_links() {
    let engine = engine();
    let id = match engine.stage_missing("SKU5").unwrap() {
        StageOutcome::Staged(entry) => entry.id,
        other => panic!("expected a staged entry, got {:?}", other),
    };
    engine.add_product(&ProductRecord::new("Widget")).unwrap();
    engine.link("Legacy", &placeholder_name(id)).unwrap();

    assert_eq!(engine.resolve_placeholder(id, "Widget").unwrap(), 1);
    assert_eq!(engine.links().all().unwrap(), vec![edge("Legacy", "Widget")]);
}

// =========================================================================
// Rename & merge
// =========================================================================

#[test]
fn test_rename_cascades_into_links() {
    let engine = engine();
    engine.add_product(&ProductRecord::new("NewCo")).unwrap();
    engine.link("OldCo", "NewCo").unwrap();
    engine.link("NewCo", "Parent").unwrap();
    engine.link("Other", "Parent").unwrap();

    let outcome = engine.rename("NewCo", "BrandCo").unwrap();
    assert_eq!(outcome.links, 2);

    let edges = engine.links().all().unwrap();
    assert_eq!(
        edges,
        vec![
            edge("BrandCo", "Parent"),
            edge("OldCo", "BrandCo"),
            edge("Other", "Parent"),
        ]
    );
    assert!(edges.iter().all(|e| e.old != "NewCo" && e.new != "NewCo"));
    assert!(engine.catalog().get("NewCo").unwrap().is_none());
    assert!(engine.catalog().exists("BrandCo").unwrap());
}

#[test]
fn test_rename_keeps_observations_reachable() {
    let engine = engine();
    engine
        .add_product(&ProductRecord::new("Widget").with(Attribute::Sku, "SKU1"))
        .unwrap();
    engine
        .import_observations("a.csv", &[observation("SKU1", "units", 1, 7.0)], Utc::now())
        .unwrap();

    let outcome = engine.rename("Widget", "Gadget").unwrap();
    assert_eq!(outcome.observations, 1);
    assert_eq!(engine.observations().count_for("Gadget").unwrap(), 1);
    assert_eq!(engine.observations().count_for("Widget").unwrap(), 0);
}

#[test]
fn test_rename_collision_leaves_state() {
    let engine = engine();
    engine.add_product(&ProductRecord::new("A")).unwrap();
    engine.add_product(&ProductRecord::new("B")).unwrap();
    engine.link("Old", "A").unwrap();

    let err = engine.rename("A", "B").unwrap_err();
    assert!(matches!(err, CatalogError::NameCollision { .. }));
    assert!(engine.catalog().exists("A").unwrap());
    assert_eq!(engine.links().all().unwrap(), vec![edge("Old", "A")]);
}

#[test]
fn test_rename_refuses_to_close_a_link_loop() {
    let engine = engine();
    engine.add_product(&ProductRecord::new("X")).unwrap();
    engine.add_product(&ProductRecord::new("P")).unwrap();
    engine.link("X", "P").unwrap();
    engine.link("P", "Y").unwrap();

    let err = engine.rename("X", "Y").unwrap_err();
    assert!(matches!(err, CatalogError::LinkCycle { .. }));

    assert!(engine.catalog().exists("X").unwrap());
    assert!(!engine.catalog().exists("Y").unwrap());
    assert_eq!(
        engine.links().all().unwrap(),
        vec![edge("P", "Y"), edge("X", "P")]
    );
    engine.link("Q", "Y").unwrap();
}

#[test]
fn test_rename_keeps_existing_outgoing_edge() {
    let engine = engine();
    engine.add_product(&ProductRecord::new("X")).unwrap();
    engine.link("Y", "Z").unwrap();
    engine.link("X", "W").unwrap();

    let err = engine.rename("X", "Y").unwrap_err();
    match err {
        CatalogError::LinkConflict { name, existing } => {
            assert_eq!(name, "Y");
            assert_eq!(existing, "Z");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    assert!(engine.catalog().exists("X").unwrap());
    assert_eq!(
        engine.links().all().unwrap(),
        vec![edge("X", "W"), edge("Y", "Z")]
    );
}

#[test]
fn test_rename_unknown_product() {
    let engine = engine();
    assert!(matches!(
        engine.rename("Ghost", "Spirit").unwrap_err(),
        CatalogError::NotFound { .. }
    ));
}

#[test]
fn test_set_product_rename_runs_cascade() {
    let engine = engine();
    engine.add_product(&ProductRecord::new("Widget")).unwrap();
    engine.link("Legacy", "Widget").unwrap();

    let patch = Patch::new()
        .set(Attribute::Product, "Gadget")
        .set(Attribute::Class, "Tools");
    engine.set_product("Widget", &patch).unwrap();

    let gadget = engine.catalog().get("Gadget").unwrap().unwrap();
    assert_eq!(gadget.class.as_deref(), Some("Tools"));
    assert_eq!(engine.links().incoming_to("Gadget").unwrap(), vec!["Legacy"]);
    assert!(engine.catalog().get("Widget").unwrap().is_none());
}

#[test]
fn test_set_product_sku_settles_queue() {
    let engine = engine();
    engine.add_product(&ProductRecord::new("Widget")).unwrap();
    engine.stage_missing("SKU7").unwrap();

    engine
        .set_product("Widget", &Patch::new().set(Attribute::Sku, "SKU7"))
        .unwrap();
    assert!(engine.missing().list().unwrap().is_empty());
}

#[test]
fn test_merge_folds_product() {
    let engine = engine();
    engine
        .add_product(&ProductRecord::new("OldCo").with(Attribute::Sku, "SKU1"))
        .unwrap();
    engine.add_product(&ProductRecord::new("NewCo")).unwrap();
    engine
        .import_observations("a.csv", &[observation("SKU1", "units", 1, 2.0)], Utc::now())
        .unwrap();

    let outcome = engine.merge("OldCo", "NewCo").unwrap();
    assert_eq!(outcome.observations, 1);
    assert!(outcome.sku_moved);

    assert!(engine.catalog().get("OldCo").unwrap().is_none());
    let new = engine.catalog().get("NewCo").unwrap().unwrap();
    assert_eq!(new.sku.as_deref(), Some("SKU1"));
    assert_eq!(engine.links().incoming_to("NewCo").unwrap(), vec!["OldCo"]);
    assert_eq!(engine.resolve_current("OldCo").unwrap(), "NewCo");
}

#[test]
fn test_failed_merge_rolls_back() {
    let engine = engine();
    engine
        .add_product(&ProductRecord::new("A").with(Attribute::Sku, "S1"))
        .unwrap();
    engine.add_product(&ProductRecord::new("B")).unwrap();
    engine
        .import_observations("a.csv", &[observation("S1", "units", 1, 1.0)], Utc::now())
        .unwrap();
    engine.link("B", "A").unwrap();

    // A -> B would close the loop B -> A -> B
    let err = engine.merge("A", "B").unwrap_err();
    assert!(matches!(err, CatalogError::LinkCycle { .. }));

    let a = engine.catalog().get("A").unwrap().unwrap();
    assert_eq!(a.sku.as_deref(), Some("S1"));
    assert_eq!(engine.catalog().get("B").unwrap().unwrap().sku, None);
    assert_eq!(engine.observations().count_for("A").unwrap(), 1);
    assert_eq!(engine.links().all().unwrap(), vec![edge("B", "A")]);
}

// =========================================================================
// Bulk import
// =========================================================================

#[test]
fn test_bulk_import_is_idempotent_without_overwrite() {
    let engine = engine();
    let rows = vec![
        row(&[("product", "Widget"), ("sku", "SKU1"), ("account", "Retail")]),
        row(&[("product", "Gadget"), ("class", "Tools")]),
    ];

    engine.bulk_import(&rows, false).unwrap();
    let before = engine.catalog().get_all().unwrap();

    let summary = engine.bulk_import(&rows, false).unwrap();
    assert_eq!(summary.inserted, 0);
    assert_eq!(summary.unchanged, 2);
    assert_eq!(engine.catalog().get_all().unwrap(), before);
}

#[test]
fn test_bulk_import_overwrite_writes_carried_columns() {
    let engine = engine();
    engine
        .bulk_import(
            &[row(&[("product", "Widget"), ("sku", "SKU1"), ("account", "Retail")])],
            false,
        )
        .unwrap();

    let kept = engine
        .bulk_import(&[row(&[("product", "Widget"), ("account", "Wholesale")])], false)
        .unwrap();
    assert_eq!(kept.unchanged, 1);
    let widget = engine.catalog().get("Widget").unwrap().unwrap();
    assert_eq!(widget.account.as_deref(), Some("Retail"));

    let summary = engine
        .bulk_import(
            &[row(&[("product", "Widget"), ("class", "Tools"), ("account", "")])],
            true,
        )
        .unwrap();
    assert_eq!(summary.updated, 1);

    let widget = engine.catalog().get("Widget").unwrap().unwrap();
    assert_eq!(widget.sku.as_deref(), Some("SKU1"));
    assert_eq!(widget.class.as_deref(), Some("Tools"));
    // A blank cell clears the attribute when overwriting
    assert_eq!(widget.account, None);
}

#[test]
fn test_bulk_import_blank_cell_only_clears_with_overwrite() {
    let engine = engine();
    engine
        .bulk_import(&[row(&[("product", "Widget"), ("account", "Retail")])], false)
        .unwrap();

    engine
        .bulk_import(&[row(&[("product", "Widget"), ("account", "")])], false)
        .unwrap();
    assert_eq!(
        engine.catalog().get("Widget").unwrap().unwrap().account.as_deref(),
        Some("Retail")
    );

    engine
        .bulk_import(&[row(&[("product", "Widget"), ("account", "")])], true)
        .unwrap();
    assert_eq!(engine.catalog().get("Widget").unwrap().unwrap().account, None);
}

#[test]
fn test_bulk_import_stages_unknown_skus() {
    let engine = engine();
    let rows = vec![
        row(&[("product", "Widget"), ("sku", "SKU1")]),
        row(&[("product", ""), ("sku", "SKU1")]),
        row(&[("sku", "SKU8")]),
        row(&[("sku", "SKU8")]),
    ];

    let summary = engine.bulk_import(&rows, false).unwrap();
    assert_eq!(summary.inserted, 1);
    assert_eq!(summary.known_skus, 0);
    assert_eq!(summary.staged.len(), 2);

    // SKU1 was staged before Widget was written, then settled
    assert_eq!(summary.settled, vec!["SKU1"]);
    let queued: Vec<String> = engine
        .missing()
        .list()
        .unwrap()
        .into_iter()
        .map(|e| e.basis)
        .collect();
    assert_eq!(queued, vec!["SKU8"]);
    assert_eq!(engine.catalog().all_names().unwrap(), vec!["Widget"]);

    let again = engine.bulk_import(&[row(&[("sku", "SKU1")])], false).unwrap();
    assert_eq!(again.known_skus, 1);
    assert!(again.staged.is_empty());
}

#[test]
fn test_bulk_import_rolls_back_on_bad_row() {
    let engine = engine();
    let rows = vec![
        row(&[("product", "Widget")]),
        row(&[("sku", "SKU8")]),
        row(&[("account", "Retail")]),
    ];

    let err = engine.bulk_import(&rows, false).unwrap_err();
    assert!(matches!(err, CatalogError::InvalidRecord(_)));
    assert!(engine.catalog().get_all().unwrap().is_empty());
    assert!(engine.missing().list().unwrap().is_empty());
}

#[test]
fn test_normalize_fields_uses_aliases() {
    let engine = engine();
    engine.alias_add("units", "Units Sold").unwrap();

    let fields = engine
        .normalize_fields(&row(&[("Units Sold", "5"), (" Product ", "Widget")]))
        .unwrap();
    assert_eq!(fields, row(&[("units", "5"), ("product", "Widget")]));
}

// =========================================================================
// Hierarchy
// =========================================================================

#[test]
fn test_hierarchy_rename_cascades() {
    let engine = engine();
    engine.hierarchy_add(Attribute::Account, "Retail").unwrap();
    engine.hierarchy_add(Attribute::Account, "Wholesale").unwrap();
    for (name, attr, title) in [
        ("A", Attribute::Account, "Retail"),
        ("B", Attribute::Account, "Retail"),
        ("C", Attribute::Account, "Wholesale"),
        ("D", Attribute::Class, "Retail"),
    ] {
        engine
            .add_product(&ProductRecord::new(name).with(attr, title))
            .unwrap();
    }

    let changed = engine
        .hierarchy_rename(Attribute::Account, "Retail", "Consumer")
        .unwrap();
    assert_eq!(changed, 2);

    let catalog = engine.catalog();
    let account = |name: &str| catalog.get(name).unwrap().unwrap().account;
    assert_eq!(account("A").as_deref(), Some("Consumer"));
    assert_eq!(account("B").as_deref(), Some("Consumer"));
    assert_eq!(account("C").as_deref(), Some("Wholesale"));
    assert_eq!(
        catalog.get("D").unwrap().unwrap().class.as_deref(),
        Some("Retail")
    );
    assert!(engine
        .hierarchy()
        .contains(Attribute::Account, "Consumer")
        .unwrap());
    assert!(!engine
        .hierarchy()
        .contains(Attribute::Account, "Retail")
        .unwrap());
}

#[test]
fn test_hierarchy_rename_onto_existing_title_folds() {
    let engine = engine();
    engine.hierarchy_add(Attribute::Account, "Retail").unwrap();
    engine.hierarchy_add(Attribute::Account, "Wholesale").unwrap();
    engine
        .add_product(&ProductRecord::new("A").with(Attribute::Account, "Retail"))
        .unwrap();
    engine
        .add_product(&ProductRecord::new("C").with(Attribute::Account, "Wholesale"))
        .unwrap();

    let changed = engine
        .hierarchy_rename(Attribute::Account, "Retail", "Wholesale")
        .unwrap();
    assert_eq!(changed, 1);
    assert_eq!(
        engine.hierarchy().titles_for(Attribute::Account).unwrap(),
        vec!["Wholesale"]
    );
    let catalog = engine.catalog();
    assert_eq!(
        catalog.get("A").unwrap().unwrap().account.as_deref(),
        Some("Wholesale")
    );
    assert_eq!(
        catalog.get("C").unwrap().unwrap().account.as_deref(),
        Some("Wholesale")
    );
}

#[test]
fn test_hierarchy_rename_requires_title() {
    let engine = engine();
    engine
        .add_product(&ProductRecord::new("A").with(Attribute::Account, "Retail"))
        .unwrap();

    let err = engine
        .hierarchy_rename(Attribute::Account, "Retail", "Consumer")
        .unwrap_err();
    assert!(matches!(err, CatalogError::NotFound { kind: "title", .. }));
    assert_eq!(
        engine.catalog().get("A").unwrap().unwrap().account.as_deref(),
        Some("Retail")
    );

    assert!(matches!(
        engine.hierarchy_add(Attribute::Sku, "X").unwrap_err(),
        CatalogError::NotATier(_)
    ));
}

#[test]
fn test_hierarchy_remove_clears_attribute() {
    let engine = engine();
    engine.hierarchy_add(Attribute::Category, "Seasonal").unwrap();
    engine
        .add_product(&ProductRecord::new("A").with(Attribute::Category, "Seasonal"))
        .unwrap();

    assert_eq!(
        engine
            .hierarchy_remove(Attribute::Category, "Seasonal")
            .unwrap(),
        1
    );
    assert_eq!(engine.catalog().get("A").unwrap().unwrap().category, None);
    assert!(engine
        .hierarchy()
        .titles_for(Attribute::Category)
        .unwrap()
        .is_empty());
}

// =========================================================================
// Links
// =========================================================================

#[test]
fn test_link_replaces_edge() {
    let engine = engine();
    engine.link("OldCo", "NewCo").unwrap();
    assert_eq!(engine.links().incoming_to("NewCo").unwrap(), vec!["OldCo"]);

    engine.link("OldCo", "OtherCo").unwrap();
    assert!(!engine
        .links()
        .incoming_to("NewCo")
        .unwrap()
        .contains(&"OldCo".to_string()));
    assert_eq!(engine.links().incoming_to("OtherCo").unwrap(), vec!["OldCo"]);
}

#[test]
fn test_link_rejects_loops() {
    let engine = engine();
    assert!(matches!(
        engine.link("A", "A").unwrap_err(),
        CatalogError::LinkCycle { .. }
    ));

    engine.link("A", "B").unwrap();
    engine.link("B", "C").unwrap();
    assert!(matches!(
        engine.link("C", "A").unwrap_err(),
        CatalogError::LinkCycle { .. }
    ));
    assert_eq!(
        engine.links().all().unwrap(),
        vec![edge("A", "B"), edge("B", "C")]
    );
    assert_eq!(engine.prior_identities("C").unwrap(), vec!["B", "A"]);
}

#[test]
fn test_relink_and_unlink_report_missing_edges() {
    let engine = engine();
    engine.link("A", "Z").unwrap();

    assert!(matches!(
        engine.relink("Q", "Y", &RelinkPivot::ByOld).unwrap_err(),
        CatalogError::NotFound { kind: "link", .. }
    ));
    assert_eq!(engine.relink("A", "Y", &RelinkPivot::ByOld).unwrap(), 1);
    assert_eq!(engine.links().all().unwrap(), vec![edge("A", "Y")]);

    assert!(matches!(
        engine.unlink("A", "Z").unwrap_err(),
        CatalogError::NotFound { .. }
    ));
    engine.unlink("A", "Y").unwrap();
    assert!(engine.links().all().unwrap().is_empty());
}

// =========================================================================
// Connections & transactions
// =========================================================================

#[test]
fn test_attached_engine_leaves_commit_to_caller() {
    let mut conn = Connection::open_in_memory().unwrap();

    {
        let tx = conn.transaction().unwrap();
        let engine = Engine::attach(&tx).unwrap();
        assert!(!engine.owns_connection());
        engine.add_product(&ProductRecord::new("Widget")).unwrap();
        drop(engine);
        // dropped without commit
    }
    let engine = Engine::attach(&conn).unwrap();
    assert!(engine.catalog().get("Widget").unwrap().is_none());
    drop(engine);

    let tx = conn.transaction().unwrap();
    let engine = Engine::attach(&tx).unwrap();
    engine.add_product(&ProductRecord::new("Widget")).unwrap();
    drop(engine);
    tx.commit().unwrap();

    let engine = Engine::attach(&conn).unwrap();
    assert!(engine.catalog().exists("Widget").unwrap());
}

#[test]
fn test_failed_operation_inside_caller_transaction() {
    let mut conn = Connection::open_in_memory().unwrap();
    let tx = conn.transaction().unwrap();
    let engine = Engine::attach(&tx).unwrap();

    engine.add_product(&ProductRecord::new("A")).unwrap();
    engine.add_product(&ProductRecord::new("B")).unwrap();
    assert!(engine.rename("A", "B").is_err());

    // the earlier work in the same transaction survives
    assert_eq!(engine.catalog().all_names().unwrap(), vec!["A", "B"]);
    drop(engine);
    tx.commit().unwrap();
}

#[test]
fn test_owned_engine_persists() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("catalog.db");

    {
        let engine = Engine::open(&path).unwrap();
        assert!(engine.owns_connection());
        engine
            .add_product(&ProductRecord::new("Widget").with(Attribute::Sku, "SKU1"))
            .unwrap();
    }

    let engine = Engine::open(&path).unwrap();
    let widget = engine.catalog().get("Widget").unwrap().unwrap();
    assert_eq!(widget.sku.as_deref(), Some("SKU1"));
}
