use approx::assert_relative_eq;
use deferred_ngin::{
    config::Config,
    data_structures::scene_graph::{Entity, Transform},
    flow::World,
    math::{Matrix, Vector3f},
};

fn assert_vec_eq(actual: Vector3f, expected: Vector3f) {
    assert_relative_eq!(actual.x, expected.x, epsilon = 1e-4);
    assert_relative_eq!(actual.y, expected.y, epsilon = 1e-4);
    assert_relative_eq!(actual.z, expected.z, epsilon = 1e-4);
}

fn world_with_rig() -> World {
    let mut world = World::new(&Config::default());
    let rig = world.scene.spawn(Entity::new("rig").with_transform(Transform {
        position: Vector3f::new(10.0, 0.0, 0.0),
        ..Default::default()
    }));
    world.camera.transform = Transform {
        position: Vector3f::new(0.0, 0.0, 5.0),
        ..Default::default()
    };
    world.camera_parent = Some(rig);
    world
}

#[test]
fn camera_follows_its_parent_entity() {
    let mut world = world_with_rig();
    world.sync_camera();

    let eye = world.camera.world_position();
    assert_vec_eq(eye, Vector3f::new(10.0, 0.0, 5.0));
    let in_view = world.camera.view_matrix().transform_point(eye);
    assert_vec_eq(in_view, Vector3f::new(0.0, 0.0, 0.0));
    // The local transform stays relative to the parent.
    assert_vec_eq(world.camera.transform.position, Vector3f::new(0.0, 0.0, 5.0));
}

#[test]
fn camera_tracks_a_moving_parent() {
    let mut world = world_with_rig();
    let rig = world.camera_parent.unwrap();
    world.sync_camera();

    world.scene.get_mut(rig).unwrap().transform.position = Vector3f::new(0.0, 3.0, 0.0);
    world.sync_camera();
    assert_vec_eq(world.camera.world_position(), Vector3f::new(0.0, 3.0, 5.0));
}

#[test]
fn despawned_parent_detaches_the_camera_in_place() {
    let mut world = world_with_rig();
    let rig = world.camera_parent.unwrap();
    world.sync_camera();

    world.scene.despawn(rig);
    world.sync_camera();
    assert_eq!(world.camera_parent, None);
    assert_eq!(world.camera.parent_world(), Matrix::identity());
    assert_vec_eq(world.camera.world_position(), Vector3f::new(10.0, 0.0, 5.0));
}

#[test]
fn unparented_camera_uses_its_own_transform() {
    let mut world = World::new(&Config::default());
    world.camera.transform.position = Vector3f::new(1.0, 2.0, 3.0);
    world.sync_camera();
    assert_eq!(world.camera.parent_world(), Matrix::identity());
    assert_vec_eq(world.camera.world_position(), Vector3f::new(1.0, 2.0, 3.0));
}
