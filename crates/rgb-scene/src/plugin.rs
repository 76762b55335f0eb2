//! Plugins - modular scene setup.

use crate::Scene;

/// Registers components, systems, and initial entities on a [`Scene`].
///
/// This is the primary way to split scene setup across crates.
///
/// ```ignore
/// struct PhysicsPlugin;
///
/// impl Plugin for PhysicsPlugin {
///     fn build(&self, scene: &mut Scene) {
///         let pos = scene.register::<Position>();
///         let vel = scene.register::<Velocity>();
///         scene.add_system(Integrate { pos, vel });
///     }
/// }
///
/// let mut scene = Scene::new();
/// scene.add_plugin(PhysicsPlugin);
/// ```
pub trait Plugin {
    /// Configure the scene.
    fn build(&self, scene: &mut Scene);

    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}
