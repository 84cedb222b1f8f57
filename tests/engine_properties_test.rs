//! Engine-level properties: determinism, order independence, idempotent
//! edges and the structural relations between metrics.

use oometrics::analyzers::AnalysisReport;
use oometrics::model::ModelDocument;
use oometrics::{AnalysisEngine, Anomaly, EdgeKind, EngineConfig, EntityDecl, Metric, SemanticModel};
use std::collections::BTreeMap;

/// Small program: two namespaces, an inheritance chain and some calls
const CLASSES: [(&str, Option<&str>); 5] = [
    ("shapes::Shape", None),
    ("shapes::Circle", Some("shapes::Shape")),
    ("shapes::Square", Some("shapes::Shape")),
    ("render::Canvas", None),
    ("render::Layer", Some("render::Canvas")),
];

fn build(reversed: bool) -> SemanticModel {
    let mut model = SemanticModel::new("props");
    let shapes = model.add_entity(EntityDecl::namespace("shapes"));
    let render = model.add_entity(EntityDecl::namespace("render"));

    let mut order: Vec<usize> = (0..CLASSES.len()).collect();
    if reversed {
        order.reverse();
    }
    for &i in &order {
        let (name, _) = CLASSES[i];
        let ns = if name.starts_with("shapes") { shapes } else { render };
        let class = model.add_entity(EntityDecl::class(name).in_scope(ns));
        let draw = format!("{}::draw", name);
        let area = format!("{}::area", name);
        let width = format!("{}::width", name);
        model.add_entity(EntityDecl::method(&draw).in_scope(class));
        model.add_entity(EntityDecl::method(&area).in_scope(class));
        model.add_entity(EntityDecl::attribute(&width).in_scope(class));
    }

    let mut edges: Vec<(String, String, EdgeKind)> = Vec::new();
    for (name, base) in CLASSES {
        if let Some(base) = base {
            edges.push((name.to_string(), base.to_string(), EdgeKind::Inherits));
        }
        edges.push((format!("{}::area", name), format!("{}::width", name), EdgeKind::AccessesAttribute));
    }
    edges.push(("render::Canvas::draw".into(), "shapes::Shape::draw".into(), EdgeKind::Calls));
    edges.push(("render::Layer::draw".into(), "shapes::Circle::area".into(), EdgeKind::Calls));
    edges.push(("render::Layer::width".into(), "shapes::Square".into(), EdgeKind::HasType));
    if reversed {
        edges.reverse();
    }
    for (source, target, kind) in edges {
        model.add_edge_by_name(&source, &target, kind).expect("edge");
    }
    model
}

fn run(model: &SemanticModel) -> AnalysisReport {
    AnalysisEngine::new(EngineConfig::default())
        .expect("engine")
        .run(model)
        .expect("run")
}

/// Results keyed by qualified name, so models built in different orders compare
fn by_name(report: &AnalysisReport) -> BTreeMap<String, BTreeMap<Metric, f64>> {
    report
        .results
        .entities
        .iter()
        .map(|(id, metrics)| (report.entity_names[id].clone(), metrics.clone()))
        .collect()
}

#[test]
fn test_runs_are_deterministic() {
    let model = build(false);
    let first = run(&model);
    let second = run(&model);
    assert_eq!(first.results, second.results);
    assert_eq!(first.anomalies, second.anomalies);
}

#[test]
fn test_declaration_order_does_not_change_results() {
    let forward = by_name(&run(&build(false)));
    let backward = by_name(&run(&build(true)));
    assert_eq!(forward, backward);
}

#[test]
fn test_repeated_edges_do_not_change_results() {
    let once = build(false);
    let mut twice = build(false);
    twice
        .add_edge_by_name("render::Canvas::draw", "shapes::Shape::draw", EdgeKind::Calls)
        .expect("edge");
    twice
        .add_edge_by_name("shapes::Circle", "shapes::Shape", EdgeKind::Inherits)
        .expect("edge");
    assert_eq!(once.edge_count(), twice.edge_count());

    assert_eq!(run(&once).results, run(&twice).results);
}

#[test]
fn test_structural_relations_hold() {
    let model = build(false);
    let report = run(&model);

    for class in model.classes() {
        let get = |m: Metric| report.results.get(class.id, m).expect("class metric");
        assert!(get(Metric::Noa) >= get(Metric::Nop));
        assert!(get(Metric::Nod) >= get(Metric::Noc));
        assert!(get(Metric::Lcom5) <= get(Metric::Nm));
        assert!(get(Metric::Cbo) >= get(Metric::Nop));
    }

    let canvas = model.lookup("render::Canvas").expect("Canvas");
    let shape = model.lookup("shapes::Shape").expect("Shape");
    assert_eq!(report.results.get(canvas, Metric::Cbo), Some(1.0));
    assert_eq!(report.results.get(shape, Metric::Cboi), Some(3.0));
    assert_eq!(report.results.get(shape, Metric::Nod), Some(2.0));
}

#[test]
fn test_rollup_covers_namespaces_and_program() {
    let model = build(false);
    let report = run(&model);
    let shapes = model.lookup("shapes").expect("shapes");
    let program = model.program();

    assert_eq!(report.results.get(shapes, Metric::Tncl), Some(3.0));
    assert_eq!(report.results.get(shapes, Metric::Tnm), Some(6.0));
    assert_eq!(report.results.get(program, Metric::Tncl), Some(5.0));
    assert_eq!(report.results.get(program, Metric::Tnm), Some(10.0));

    let cbo_sum: f64 = model
        .classes()
        .filter_map(|c| report.results.get(c.id, Metric::Cbo))
        .sum();
    assert_eq!(report.results.get(program, Metric::Tcbo), Some(cbo_sum));
    // Rollups never land on classes
    assert_eq!(report.results.get(shapes, Metric::Cbo), None);
}

#[test]
fn test_document_with_dangling_and_orphan_entries() {
    let json = r#"{
        "program": "doc",
        "entities": [
            { "kind": "Method", "qualified_name": "A::run", "scope": "A" },
            { "kind": "Class", "qualified_name": "A" },
            { "kind": "Class", "qualified_name": "B", "scope": "missing" }
        ],
        "edges": [
            { "source": "A::run", "target": "B", "kind": "Uses", "multiplicity": 3 },
            { "source": "A::run", "target": "C", "kind": "Calls" }
        ]
    }"#;
    let doc = ModelDocument::from_json(json).expect("parse");
    let model = SemanticModel::from_document(&doc);
    let report = run(&model);

    let a = model.lookup("A").expect("A");
    assert_eq!(report.results.get(a, Metric::Cbo), Some(1.0));
    assert_eq!(report.results.get(a, Metric::Nm), Some(1.0));
    assert_eq!(report.anomalies.len(), 2);
    assert!(report
        .anomalies
        .iter()
        .any(|a| matches!(a, Anomaly::OrphanScope { .. })));
    assert!(report
        .anomalies
        .iter()
        .any(|a| matches!(a, Anomaly::DanglingReference { .. })));
}

#[test]
fn test_inheritance_cycle_is_reported_not_fatal() {
    let mut model = SemanticModel::new("cycle");
    let a = model.add_entity(EntityDecl::class("A"));
    let b = model.add_entity(EntityDecl::class("B"));
    model.add_edge(a, b, EdgeKind::Inherits).expect("edge");
    model.add_edge(b, a, EdgeKind::Inherits).expect("edge");

    let mut config = EngineConfig::default();
    config.inheritance.max_depth = 4;
    let report = AnalysisEngine::new(config)
        .expect("engine")
        .run(&model)
        .expect("run");

    assert_eq!(report.summary.analyzers_failed, 0);
    assert_eq!(report.results.get(a, Metric::Noa), Some(1.0));
    assert!(report
        .anomalies
        .iter()
        .any(|a| matches!(a, Anomaly::DegenerateRecursion { depth: 4, .. })));
}

#[test]
fn test_orphaned_class_keeps_its_metrics() {
    let json = r#"{
        "program": "lost",
        "entities": [
            { "kind": "Method", "qualified_name": "X::run", "scope": "X" },
            { "kind": "Attribute", "qualified_name": "X::v", "scope": "X" },
            { "kind": "Class", "qualified_name": "X", "scope": "Nowhere" }
        ],
        "edges": [
            { "source": "X::run", "target": "X::v", "kind": "AccessesAttribute" }
        ]
    }"#;
    let model = SemanticModel::from_document(&ModelDocument::from_json(json).expect("parse"));
    let report = run(&model);

    let x = model.lookup("X").expect("X");
    assert_eq!(report.results.get(x, Metric::Nm), Some(1.0));
    assert_eq!(report.results.get(x, Metric::Na), Some(1.0));
    assert_eq!(report.results.get(x, Metric::Lcom5), Some(1.0));
    assert_eq!(report.anomalies.len(), 1);
}

#[test]
fn test_class_named_like_the_program_keeps_the_rollup() {
    let json = r#"{
        "program": "Game",
        "entities": [
            { "kind": "Method", "qualified_name": "Game::start", "scope": "Game" },
            { "kind": "Class", "qualified_name": "Game", "size": { "logical_lines": 4 } },
            { "kind": "Class", "qualified_name": "Player", "size": { "logical_lines": 2 } }
        ]
    }"#;
    let model = SemanticModel::from_document(&ModelDocument::from_json(json).expect("parse"));
    let report = run(&model);
    let program = model.program();

    assert_eq!(model.kind(program), Some(oometrics::EntityKind::Program));
    let game = model.lookup("Game").expect("Game");
    assert_ne!(game, program);
    assert_eq!(report.results.get(game, Metric::Nm), Some(1.0));
    assert_eq!(report.results.get(program, Metric::Tncl), Some(2.0));
    assert_eq!(report.results.get(program, Metric::Tlloc), Some(6.0));
    assert!(report
        .anomalies
        .iter()
        .any(|a| matches!(a, Anomaly::ShadowsProgram { .. })));
}
