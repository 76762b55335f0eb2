//! Moving particles that come to rest, watched by a reactive query.
//!
//! ```text
//! RUST_LOG=movement=info,rgb_index=debug cargo run -p rgb-scene --example movement
//! ```

use rgb_scene::prelude::*;
use tracing::info;

#[derive(Debug, Clone, Copy, Default)]
struct Position {
    x: f32,
    y: f32,
}

#[derive(Debug, Clone, Copy)]
struct Velocity {
    x: f32,
    y: f32,
}

/// Integrates velocities and drops velocities that have decayed to nothing.
struct MovementPlugin;

impl Plugin for MovementPlugin {
    fn build(&self, scene: &mut Scene) {
        let pos = scene.register::<Position>();
        let vel = scene.register::<Velocity>();

        scene.add_system(system_fn(
            "integrate",
            QueryMask::new(&[pos.id(), vel.id()]),
            move |ctx| {
                for entity in &ctx.entities() {
                    let Some(v) = ctx.get_mut(entity, vel) else { continue };
                    v.x *= 0.5;
                    v.y *= 0.5;
                    let (dx, dy) = (v.x, v.y);

                    if dx.abs() < 0.1 && dy.abs() < 0.1 {
                        ctx.commands().remove(entity, vel);
                    }
                    if let Some(p) = ctx.get_mut(entity, pos) {
                        p.x += dx;
                        p.y += dy;
                    }
                }
            },
        ));

        scene.add_system(
            system_fn("report", QueryMask::new(&[pos.id()]), |ctx| {
                info!(tick = ctx.tick(), entities = ctx.entities().count(), "positions");
            })
            .every(4),
        );
    }
}

fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("movement=info".parse()?),
        )
        .init();

    let mut scene = Scene::new();
    scene.add_plugin(MovementPlugin);

    let pos = scene
        .component::<Position>()
        .ok_or_else(|| eyre::eyre!("Position not registered"))?;
    let vel = scene
        .component::<Velocity>()
        .ok_or_else(|| eyre::eyre!("Velocity not registered"))?;

    for i in 0..8 {
        let speed = i as f32;
        scene.spawn_with(|r| {
            r.add_component(pos, Position::default())?;
            r.add_component(vel, Velocity { x: speed, y: -speed })
        })?;
    }

    let moving = scene.create_reactive_query(&[pos.id(), vel.id()]);
    scene.subscribe(moving, |change| {
        for entity in change.removed {
            info!(%entity, "came to rest");
        }
        info!(still_moving = change.entities.count(), "moving set changed");
    })?;

    for _ in 0..12 {
        scene.tick()?;
    }

    let stats = scene.stats();
    info!(
        entities = stats.entity_count,
        buckets = stats.index.bucket_count,
        hit_rate = stats.queries.cache_hit_rate(),
        "done"
    );

    Ok(())
}
