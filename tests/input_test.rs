use approx::assert_relative_eq;
use deferred_ngin::{
    DeviceEvent, KeyCode, WindowEvent,
    camera::{Camera, CameraController},
    data_structures::scene_graph::Transform,
    input::Input,
    math::{Vector2f, Vector3f},
};
use winit::event::MouseButton;

#[test]
fn key_down_fires_only_on_the_first_frame() {
    let mut input = Input::new();
    input.keys.press(KeyCode::Tab);
    assert!(input.keys.key_down(KeyCode::Tab));
    assert!(input.keys.is_pressed(KeyCode::Tab));

    input.update_frame();
    assert!(!input.keys.key_down(KeyCode::Tab));
    assert!(input.keys.is_pressed(KeyCode::Tab));

    input.keys.release(KeyCode::Tab);
    assert!(input.keys.key_up(KeyCode::Tab));
    input.update_frame();
    assert!(!input.keys.key_up(KeyCode::Tab));
}

#[test]
fn navigation_is_normalized() {
    let mut input = Input::new();
    assert_eq!(input.navigation(), Vector2f::new(0.0, 0.0));

    input.keys.press(KeyCode::KeyW);
    input.keys.press(KeyCode::KeyD);
    let nav = input.navigation();
    assert_relative_eq!(nav.x, std::f32::consts::FRAC_1_SQRT_2, epsilon = 1e-6);
    assert_relative_eq!(nav.y, std::f32::consts::FRAC_1_SQRT_2, epsilon = 1e-6);

    // Opposite keys cancel out.
    input.keys.press(KeyCode::KeyA);
    input.keys.press(KeyCode::KeyS);
    assert_eq!(input.navigation(), Vector2f::new(0.0, 0.0));
}

#[test]
fn mouse_delta_accumulates_until_the_frame_ends() {
    let mut input = Input::new();
    input.handle_device_event(&DeviceEvent::MouseMotion { delta: (3.0, -1.0) });
    input.handle_device_event(&DeviceEvent::MouseMotion { delta: (1.0, 2.0) });
    assert_eq!(input.mouse.delta(), Vector2f::new(4.0, 1.0));
    input.update_frame();
    assert_eq!(input.mouse.delta(), Vector2f::new(0.0, 0.0));
}

#[test]
fn losing_focus_releases_everything() {
    let mut input = Input::new();
    input.keys.press(KeyCode::KeyW);
    input.mouse.press(MouseButton::Right);
    input.handle_window_event(&WindowEvent::Focused(false));
    assert!(!input.keys.is_pressed(KeyCode::KeyW));
    assert!(!input.mouse.is_pressed(MouseButton::Right));
}

#[test]
fn controller_moves_along_the_view_direction() {
    let mut camera = Camera::new(Transform::from_position(Vector3f::new(0.0, 0.0, 5.0)));
    let controller = CameraController::new(4.0, 0.01);
    let mut input = Input::new();
    input.keys.press(KeyCode::KeyW);
    controller.update(&mut camera, &input, 0.5);
    assert_relative_eq!(camera.transform.position.z, 3.0, epsilon = 1e-5);

    input.keys.release(KeyCode::KeyW);
    input.keys.press(KeyCode::KeyD);
    controller.update(&mut camera, &input, 0.25);
    assert_relative_eq!(camera.transform.position.x, 1.0, epsilon = 1e-5);
}

#[test]
fn controller_only_looks_around_with_the_right_button() {
    let mut camera = Camera::default();
    let controller = CameraController::new(1.0, 0.5);
    let mut input = Input::new();
    input.handle_device_event(&DeviceEvent::MouseMotion { delta: (1.0, 0.0) });
    controller.update(&mut camera, &input, 0.016);
    assert_eq!(camera.transform.rotation, Vector3f::new(0.0, 0.0, 0.0));

    input.mouse.press(MouseButton::Right);
    controller.update(&mut camera, &input, 0.016);
    assert_relative_eq!(camera.transform.rotation.y, -0.5, epsilon = 1e-6);

    // Pitch is clamped below a quarter turn.
    input.handle_device_event(&DeviceEvent::MouseMotion { delta: (0.0, -100.0) });
    controller.update(&mut camera, &input, 0.016);
    assert!(camera.transform.rotation.x < std::f32::consts::FRAC_PI_2);
}
