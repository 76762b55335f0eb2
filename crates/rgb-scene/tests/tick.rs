//! Tick-level behavior: systems, commands and plugins working through a scene.

use std::sync::Arc;

use parking_lot::Mutex;
use rgb_scene::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct Position {
    x: f32,
    y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct Velocity {
    x: f32,
    y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Health(i32);

#[derive(Debug, Clone, Copy, PartialEq)]
struct Dead;

struct Handles {
    pos: ComponentType<Position>,
    vel: ComponentType<Velocity>,
    health: ComponentType<Health>,
    dead: ComponentType<Dead>,
}

fn setup() -> (Scene, Handles) {
    let mut scene = Scene::new();
    let handles = Handles {
        pos: scene.register(),
        vel: scene.register(),
        health: scene.register(),
        dead: scene.register(),
    };
    (scene, handles)
}

#[test]
fn test_movement_system_integrates_positions() {
    let (mut scene, h) = setup();
    let (pos, vel) = (h.pos, h.vel);

    let mover = scene
        .spawn_with(|r| {
            r.add_component(pos, Position::default())?;
            r.add_component(vel, Velocity { x: 1.0, y: 0.5 })
        })
        .unwrap();
    let still = scene
        .spawn_with(|r| r.add_component(pos, Position { x: 9.0, y: 9.0 }))
        .unwrap();

    scene.add_system(system_fn(
        "movement",
        QueryMask::new(&[pos.id(), vel.id()]),
        move |ctx| {
            for entity in &ctx.entities() {
                let Some(&v) = ctx.get(entity, vel) else { continue };
                if let Some(p) = ctx.get_mut(entity, pos) {
                    p.x += v.x;
                    p.y += v.y;
                }
            }
        },
    ));

    for _ in 0..4 {
        scene.tick().unwrap();
    }

    assert_eq!(scene.get(mover, pos), Some(&Position { x: 4.0, y: 2.0 }));
    assert_eq!(scene.get(still, pos), Some(&Position { x: 9.0, y: 9.0 }));
}

#[test]
fn test_commands_apply_after_system_and_before_next() {
    let (mut scene, h) = setup();
    let (health, dead) = (h.health, h.dead);

    let victims: Vec<Entity> = (0..3)
        .map(|hp| scene.spawn_with(|r| r.add_component(health, Health(hp))).unwrap())
        .collect();

    // Marks entities at zero health as dead
    scene.add_system(system_fn(
        "reaper",
        QueryMask::new(&[health.id()]).without(&[dead.id()]),
        move |ctx| {
            for entity in &ctx.entities() {
                if ctx.get(entity, health).is_some_and(|hp| hp.0 <= 0) {
                    ctx.commands().insert(entity, dead, Dead);
                }
            }
        },
    ));

    // Sees the reaper's changes in the same tick
    let seen_dead = Arc::new(Mutex::new(Vec::new()));
    let sink = seen_dead.clone();
    scene.add_system(system_fn(
        "undertaker",
        QueryMask::new(&[dead.id()]),
        move |ctx| {
            for entity in &ctx.entities() {
                sink.lock().push(entity);
                ctx.commands().despawn(entity);
            }
        },
    ));

    scene.tick().unwrap();

    assert_eq!(*seen_dead.lock(), vec![victims[0]]);
    assert!(!scene.is_alive(victims[0]));
    assert!(scene.is_alive(victims[1]));
    assert_eq!(scene.query_all(&[health.id()]).count(), 2);
}

#[test]
fn test_failed_command_does_not_stop_the_rest() {
    let (mut scene, h) = setup();
    let (pos, vel) = (h.pos, h.vel);
    let target = scene
        .spawn_with(|r| r.add_component(pos, Position::default()))
        .unwrap();

    scene.add_system(system_fn("faulty", QueryMask::new(&[pos.id()]), move |ctx| {
        for entity in &ctx.entities() {
            ctx.commands().remove(entity, vel);
            ctx.commands().insert(entity, vel, Velocity { x: 2.0, y: 0.0 });
            ctx.commands()
                .spawn(move |r| r.add_component(vel, Velocity::default()));
        }
    }));

    let err = scene.tick().unwrap_err();

    assert!(matches!(
        err,
        SceneError::Index(IndexError::MissingComponent { .. })
    ));
    assert_eq!(scene.get(target, vel), Some(&Velocity { x: 2.0, y: 0.0 }));
    assert_eq!(scene.query_all(&[vel.id()]).count(), 2);
}

#[test]
fn test_commands_notify_reactive_once_per_system() {
    let (mut scene, h) = setup();
    let pos = h.pos;

    let query = scene.create_reactive_query(&[pos.id()]);
    let notifications = Arc::new(Mutex::new(Vec::new()));
    let sink = notifications.clone();
    scene
        .subscribe(query, move |change| sink.lock().push(change.added.len()))
        .unwrap();

    scene.add_system(system_fn("spawner", QueryMask::default(), move |ctx| {
        for i in 0..5 {
            ctx.commands()
                .spawn(move |r| r.add_component(pos, Position { x: i as f32, y: 0.0 }));
        }
    }));

    scene.tick().unwrap();
    scene.tick().unwrap();

    assert_eq!(*notifications.lock(), vec![5, 5]);
    assert_eq!(scene.reactive_entities(query).unwrap().count(), 10);
}

#[test]
fn test_plugin_registers_and_schedules() {
    struct CounterPlugin {
        ticks: Arc<Mutex<u32>>,
    }

    impl Plugin for CounterPlugin {
        fn build(&self, scene: &mut Scene) {
            scene.register::<Health>();
            let ticks = self.ticks.clone();
            scene.add_system(system_fn("counter", QueryMask::default(), move |_| {
                *ticks.lock() += 1;
            }));
        }
    }

    let ticks = Arc::new(Mutex::new(0));
    let mut scene = Scene::new();
    scene.add_plugin(CounterPlugin {
        ticks: ticks.clone(),
    });

    assert!(scene.component::<Health>().is_some());
    scene.tick().unwrap();
    scene.tick().unwrap();
    assert_eq!(*ticks.lock(), 2);
}
