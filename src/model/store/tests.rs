use super::*;
use crate::model::{CommentSpan, DeclSpan, SizeInfo};

#[test]
fn test_basic_operations() {
    let mut model = SemanticModel::new("prog");

    let class = model.add_entity(EntityDecl::class("A").with_span(DeclSpan::new("a.cpp", 1, 10)));
    let method = model.add_entity(EntityDecl::method("A::foo").in_scope(class));
    model.add_entity(EntityDecl::attribute("A::x").in_scope(class));

    assert_eq!(model.entity_count(), 4);
    assert_eq!(model.lookup("A::foo"), Some(method));
    assert_eq!(model.name(method), "foo");
    assert_eq!(model.qualified_name(method), "A::foo");
    assert_eq!(model.methods(class).count(), 1);
    assert_eq!(model.attributes(class).count(), 1);
    assert_eq!(model.enclosing_class(method), Some(class));
    assert_eq!(model.scope_depth(method), 2);
    assert_eq!(model.scope_depth(model.program()), 0);
}

#[test]
fn test_forward_declaration_resolves_to_one_id() {
    let mut model = SemanticModel::new("prog");
    let car = model.add_entity(EntityDecl::class("Car"));

    let forward = model.add_entity(EntityDecl::class("PoliceCar"));
    let defined = model.add_entity(
        EntityDecl::class("PoliceCar")
            .with_span(DeclSpan::new("noc.cpp", 24, 24))
            .with_size(SizeInfo::new(1)),
    );
    assert_eq!(forward, defined);
    model.add_edge(defined, car, EdgeKind::Inherits).expect("edge");

    assert_eq!(model.child_classes(car).count(), 1);
    let entity = model.entity(defined).expect("entity");
    assert_eq!(entity.span.line_start, 24);
    assert_eq!(entity.size.logical_lines, 1);
}

#[test]
fn test_redeclaration_keeps_existing_data_when_empty() {
    let mut model = SemanticModel::new("prog");
    let a = model.add_entity(
        EntityDecl::class("A").with_size(SizeInfo::new(2).with_comment(CommentSpan::inline(1, 1))),
    );
    model.add_entity(EntityDecl::class("A"));
    assert_eq!(model.entity(a).expect("entity").size.logical_lines, 2);
}

#[test]
fn test_edges_accumulate_multiplicity() {
    let mut model = SemanticModel::new("prog");
    let a = model.add_entity(EntityDecl::global_function("a"));
    let b = model.add_entity(EntityDecl::global_function("b"));

    model.add_edge(a, b, EdgeKind::Calls).expect("edge");
    let view = model.add_edge(a, b, EdgeKind::Calls).expect("edge");
    model.add_edge(a, b, EdgeKind::Uses).expect("edge");

    assert_eq!(view.multiplicity, 2);
    assert_eq!(model.edge_count(), 2);
    assert_eq!(model.multiplicity(a, b, EdgeKind::Calls), 2);
    assert_eq!(model.edges_from(a, Some(EdgeKind::Calls)).count(), 1);
    assert_eq!(model.edges_from(a, None).count(), 2);
    assert_eq!(model.edges_to(b, None).count(), 2);
    assert_eq!(model.stats().relations, 3);
}

#[test]
fn test_dangling_reference_is_recorded_and_dropped() {
    let mut model = SemanticModel::new("prog");
    let a = model.add_entity(EntityDecl::class("A"));

    let err = model
        .add_edge_by_name("A", "Missing", EdgeKind::HasType)
        .unwrap_err();
    assert!(matches!(err, ModelError::DanglingReference { .. }));
    assert!(model
        .add_edge(a, EntityId(999), EdgeKind::Uses)
        .is_err());

    assert_eq!(model.edge_count(), 0);
    assert_eq!(model.anomalies().len(), 2);
    assert!(matches!(
        model.anomalies()[0],
        Anomaly::DanglingReference { ref target, .. } if target == "Missing"
    ));

    // The rest of the entity's edges still go in
    let b = model.add_entity(EntityDecl::class("B"));
    assert!(model.add_edge(a, b, EdgeKind::HasType).is_ok());
    assert_eq!(model.edges_from(a, None).count(), 1);
}

#[test]
fn test_unknown_scope_reparents_to_program() {
    let mut model = SemanticModel::new("prog");
    let orphan = model.add_entity(EntityDecl::class("Lost").in_scope(EntityId(42)));

    assert_eq!(model.scope_of(orphan), Some(model.program()));
    assert!(matches!(model.anomalies()[0], Anomaly::OrphanScope { .. }));
}

#[test]
fn test_queries_on_unknown_ids_are_empty() {
    let model = SemanticModel::new("prog");
    assert_eq!(model.edges_from(EntityId(7), None).count(), 0);
    assert!(model.entity(EntityId(7)).is_none());
    assert!(model.children(EntityId(7)).is_empty());
}

#[test]
fn test_entities_of_kind() {
    let mut model = SemanticModel::new("prog");
    let ns = model.add_entity(EntityDecl::namespace("ns"));
    model.add_entity(EntityDecl::class("ns::A").in_scope(ns));
    model.add_entity(EntityDecl::new(EntityKind::TemplateClass, "ns::T").in_scope(ns));
    model.add_entity(EntityDecl::global_variable("ns::g").in_scope(ns));

    assert_eq!(model.entities_of(EntityKind::Class).count(), 1);
    assert_eq!(model.classes().count(), 2);
    assert_eq!(model.enclosing_scope(model.lookup("ns::g").expect("g")), Some(ns));
    let stats = model.stats();
    assert_eq!(stats.classes, 2);
    assert_eq!(stats.globals, 1);
}

#[test]
fn test_multiplicity_saturates() {
    let mut model = SemanticModel::new("prog");
    let f = model.add_entity(EntityDecl::global_function("f"));
    let g = model.add_entity(EntityDecl::global_function("g"));

    model.add_relation(f, g, EdgeKind::Calls, u32::MAX).expect("edge");
    let view = model.add_relation(f, g, EdgeKind::Calls, 2).expect("edge");
    assert_eq!(view.multiplicity, u32::MAX);
    assert_eq!(model.multiplicity(f, g, EdgeKind::Calls), u32::MAX);
    assert_eq!(model.edge_count(), 1);
}

#[test]
fn test_entity_named_like_the_program_stays_separate() {
    let mut model = SemanticModel::new("Game");
    let game = model.add_entity(EntityDecl::class("Game"));
    let again = model.add_entity(EntityDecl::class("Game").with_size(SizeInfo::new(3)));
    let player = model.add_entity(EntityDecl::class("Player"));

    assert_ne!(game, model.program());
    assert_eq!(game, again);
    assert_eq!(model.lookup("Game"), Some(game));
    assert_eq!(model.kind(model.program()), Some(EntityKind::Program));
    assert_eq!(model.scope_of(player), Some(model.program()));
    assert_eq!(model.classes().count(), 2);
    assert_eq!(
        model.anomalies(),
        &[Anomaly::ShadowsProgram {
            entity: "Game".to_string(),
            entity_kind: EntityKind::Class,
        }]
    );
}
