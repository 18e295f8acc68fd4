#![allow(dead_code)]

use std::sync::Arc;

use strata::{
    Component, ComponentSpec, ElementType, Query, QuerySpec, Schema, World, WorldSpec,
};

pub const CAPACITY: u32 = 10_000;

pub fn position() -> Arc<Component> {
    Arc::new(
        Component::new(ComponentSpec {
            name: "position".into(),
            schema: Some(Schema::new().with("x", ElementType::F64).with("y", ElementType::F64)),
            ..Default::default()
        })
        .unwrap(),
    )
}

pub fn velocity() -> Arc<Component> {
    Arc::new(
        Component::new(ComponentSpec {
            name: "velocity".into(),
            schema: Some(Schema::new().with("dx", ElementType::F64).with("dy", ElementType::F64)),
            ..Default::default()
        })
        .unwrap(),
    )
}

pub fn frozen() -> Arc<Component> {
    Arc::new(
        Component::new(ComponentSpec { name: "frozen".into(), ..Default::default() }).unwrap(),
    )
}

pub struct Fixture {
    pub world: World,
    pub position: Arc<Component>,
    pub velocity: Arc<Component>,
    pub frozen: Arc<Component>,
}

pub fn make_world() -> Fixture {
    let position = position();
    let velocity = velocity();
    let frozen = frozen();

    let mut world = World::new(WorldSpec {
        capacity: CAPACITY,
        components: vec![position.clone(), velocity.clone(), frozen.clone()],
        ..Default::default()
    })
    .unwrap();
    world.init().unwrap();

    Fixture { world, position, velocity, frozen }
}

/// Spawns `count` entities: all with position, half with velocity, a tenth
/// frozen.
pub fn populate(fixture: &mut Fixture, count: u32) {
    for i in 0..count {
        let entity = fixture.world.create_entity().unwrap();
        fixture
            .world
            .add_component_to_entity(
                &fixture.position,
                entity,
                Some(&[("x", f64::from(i)), ("y", 0.0)]),
            )
            .unwrap();
        if i % 2 == 0 {
            fixture
                .world
                .add_component_to_entity(
                    &fixture.velocity,
                    entity,
                    Some(&[("dx", 1.0), ("dy", 0.5)]),
                )
                .unwrap();
        }
        if i % 10 == 0 {
            fixture.world.add_component_to_entity(&fixture.frozen, entity, None).unwrap();
        }
    }
    fixture.world.refresh(false).unwrap();
}

pub fn moving_query(fixture: &Fixture) -> Query {
    Query::new(QuerySpec {
        all: vec![fixture.position.clone(), fixture.velocity.clone()],
        none: vec![fixture.frozen.clone()],
        ..Default::default()
    })
    .unwrap()
}
