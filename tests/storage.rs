use std::sync::Arc;

use strata::{
    Component, ComponentSpec, EcsError, ElementType, Schema, SpecError, World, WorldSpec,
};

fn position() -> Arc<Component> {
    Arc::new(
        Component::new(ComponentSpec {
            name: "position".into(),
            schema: Some(Schema::new().with("x", ElementType::F32).with("y", ElementType::F32)),
            ..Default::default()
        })
        .unwrap(),
    )
}

fn mixed() -> Arc<Component> {
    Arc::new(
        Component::new(ComponentSpec {
            name: "mixed".into(),
            schema: Some(
                Schema::new()
                    .with("a", ElementType::U8)
                    .with("b", ElementType::F64)
                    .with("c", ElementType::I16),
            ),
            ..Default::default()
        })
        .unwrap(),
    )
}

fn tag(name: &str) -> Arc<Component> {
    Arc::new(
        Component::new(ComponentSpec { name: name.into(), ..Default::default() }).unwrap(),
    )
}

fn make_world(components: Vec<Arc<Component>>) -> World {
    let mut world = World::new(WorldSpec {
        capacity: 8,
        components,
        ..Default::default()
    })
    .unwrap();
    world.init().unwrap();
    world
}

#[test]
fn layout_pads_fields_to_natural_alignment() {
    let component = mixed();
    let layout = component.layout().unwrap();

    assert_eq!(layout.fields[0].name, "a");
    assert_eq!(layout.fields[0].offset, 0);
    assert_eq!(layout.fields[1].name, "b");
    assert_eq!(layout.fields[1].offset, 8);
    assert_eq!(layout.fields[2].name, "c");
    assert_eq!(layout.fields[2].offset, 16);
    assert_eq!(layout.footprint, 18);
}

#[test]
fn tags_carry_no_layout() {
    let component = tag("marker");
    assert!(component.is_tag());
    assert!(component.layout().is_none());
    assert!(component.schema().is_none());
}

#[test]
fn reserved_and_invalid_names_are_rejected() {
    for name in ["id", "partition", "on_init", "on_destroy", ""] {
        let result = Component::new(ComponentSpec { name: name.into(), ..Default::default() });
        assert!(result.is_err(), "name {name:?} should be rejected");
    }

    let result = Component::new(ComponentSpec {
        name: "ok".into(),
        schema: Some(Schema::new().with("id", ElementType::U8)),
        ..Default::default()
    });
    assert_eq!(
        result.err(),
        Some(EcsError::Spec(SpecError::ReservedName("id".into())))
    );

    let result = Component::new(ComponentSpec {
        name: "ok".into(),
        schema: Some(Schema::new().with("x", ElementType::U8).with("x", ElementType::U8)),
        ..Default::default()
    });
    assert_eq!(
        result.err(),
        Some(EcsError::Spec(SpecError::DuplicateField("x".into())))
    );
}

#[test]
fn add_with_data_seeds_storage() {
    let pos = position();
    let mut world = make_world(vec![pos.clone()]);

    let entity = world.create_entity().unwrap();
    world
        .add_component_to_entity(&pos, entity, Some(&[("x", 1.5), ("y", -2.0)]))
        .unwrap();

    let data = world.get_entity_data(&pos, entity).unwrap();
    assert_eq!(data, vec![("x".to_string(), 1.5), ("y".to_string(), -2.0)]);
}

#[test]
fn proxy_round_trip_and_change_bits() {
    let pos = position();
    let mut world = make_world(vec![pos.clone()]);

    let entity = world.create_entity().unwrap();
    world
        .add_component_to_entity(&pos, entity, Some(&[("x", 0.0), ("y", 0.0)]))
        .unwrap();

    // Adding marks the entity changed regardless of values.
    assert_eq!(world.get_changed(&pos).unwrap(), vec![entity]);

    world.refresh(false).unwrap();
    assert_eq!(world.get_changed(&pos).unwrap(), Vec::<u32>::new());

    let mut proxy = world.proxy(&pos).unwrap();
    proxy.set_entity(entity).unwrap();

    // Writing the stored value records no change.
    assert!(!proxy.set("x", 0.0).unwrap());
    assert_eq!(proxy.get("x").unwrap(), 0.0);
    drop(proxy);
    assert_eq!(world.get_changed(&pos).unwrap(), Vec::<u32>::new());

    let mut proxy = world.proxy(&pos).unwrap();
    proxy.set_entity(entity).unwrap();
    assert!(proxy.set("x", 1.0).unwrap());
    assert_eq!(proxy.get("x").unwrap(), 1.0);
    drop(proxy);
    assert_eq!(world.get_changed(&pos).unwrap(), vec![entity]);
}

#[test]
fn proxy_narrows_with_saturation() {
    let component = mixed();
    let mut world = make_world(vec![component.clone()]);
    let entity = world.create_entity().unwrap();
    world.add_component_to_entity(&component, entity, None).unwrap();
    world.refresh(false).unwrap();

    let mut proxy = world.proxy(&component).unwrap();
    proxy.set_entity(entity).unwrap();

    // 300 saturates to 255 in a u8 field.
    assert!(proxy.set("a", 300.0).unwrap());
    assert_eq!(proxy.get("a").unwrap(), 255.0);

    // Writing a value that saturates to the stored one records no change.
    assert!(!proxy.set("a", 255.0).unwrap());
    assert!(!proxy.set("a", 400.0).unwrap());
}

#[test]
fn proxy_rejects_out_of_range_cursor_and_unknown_fields() {
    let pos = position();
    let mut world = make_world(vec![pos.clone()]);

    let mut proxy = world.proxy(&pos).unwrap();
    assert!(matches!(
        proxy.set_entity(8).unwrap_err(),
        EcsError::EntityNotFound(_)
    ));
    proxy.set_entity(0).unwrap();
    assert!(matches!(
        proxy.get("missing").unwrap_err(),
        EcsError::ComponentNotFound(_)
    ));
}

#[test]
fn tag_components_have_no_storage() {
    let marker = tag("marker");
    let mut world = make_world(vec![marker.clone()]);
    let entity = world.create_entity().unwrap();

    assert_eq!(world.proxy(&marker).err(), Some(EcsError::NoComponentsFound));
    assert_eq!(
        world.get_entity_data(&marker, entity).err(),
        Some(EcsError::NoComponentsFound)
    );
    assert_eq!(
        world
            .add_component_to_entity(&marker, entity, Some(&[("x", 1.0)]))
            .err(),
        Some(EcsError::NoComponentsFound)
    );
}

#[test]
fn direct_views_bypass_change_tracking() {
    let pos = position();
    let mut world = make_world(vec![pos.clone()]);
    let entity = world.create_entity().unwrap();
    world.add_component_to_entity(&pos, entity, None).unwrap();
    world.refresh(false).unwrap();

    {
        let xs: &mut [f32] = world.view_mut(&pos, "x").unwrap();
        xs[entity as usize] = 9.0;
    }

    // The write landed but no change bit was recorded.
    let xs: &[f32] = world.view(&pos, "x").unwrap();
    assert_eq!(xs[entity as usize], 9.0);
    assert_eq!(world.get_changed(&pos).unwrap(), Vec::<u32>::new());

    // A mismatched element type does not produce a view.
    assert!(world.view::<f64>(&pos, "x").is_err());
}

#[test]
fn set_entity_data_tracks_real_changes_only() {
    let pos = position();
    let mut world = make_world(vec![pos.clone()]);
    let entity = world.create_entity().unwrap();
    world
        .add_component_to_entity(&pos, entity, Some(&[("x", 1.0), ("y", 2.0)]))
        .unwrap();
    world.refresh(false).unwrap();

    assert!(!world.set_entity_data(&pos, entity, &[("x", 1.0), ("y", 2.0)]).unwrap());
    assert_eq!(world.get_changed(&pos).unwrap(), Vec::<u32>::new());

    assert!(world.set_entity_data(&pos, entity, &[("x", 1.0), ("y", 3.0)]).unwrap());
    assert_eq!(world.get_changed(&pos).unwrap(), vec![entity]);
}

#[test]
fn removal_leaves_storage_for_reclamation() {
    let pos = position();
    let mut world = make_world(vec![pos.clone()]);
    let entity = world.create_entity().unwrap();
    world
        .add_component_to_entity(&pos, entity, Some(&[("x", 5.0)]))
        .unwrap();
    world.remove_component_from_entity(&pos, entity).unwrap();

    assert!(!world.entity_has_component(&pos, entity).unwrap());
    // Storage is not zeroed on removal; the slot is reclaimed on next add.
    let xs: &[f32] = world.view(&pos, "x").unwrap();
    assert_eq!(xs[entity as usize], 5.0);
}
