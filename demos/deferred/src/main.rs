//! Spinning cubes rendered through the G-buffer.
//!
//! Tab cycles through the channels, WASD moves, the right mouse button looks
//! around and ESC quits. An optional `deferred.toml` in the working directory
//! overrides the defaults.

use cgmath::Vector3;
use deferred_ngin::{
    context::InitContext,
    data_structures::{
        component::Component,
        model::{Material, Mesh},
        scene_graph::{Entity, Transform},
        texture::{Texture, TextureKind},
    },
    flow::{World, run_with_config_file},
    resources::{
        mesh::{load_mesh_obj, parse_obj},
        texture::material_layout,
    },
};
use image::{DynamicImage, Rgba, RgbaImage};

const CUBE_OBJ: &str = include_str!("../../../assets/cube.obj");

fn checkerboard(size: u32, cells: u32, a: [u8; 4], b: [u8; 4]) -> DynamicImage {
    let cell = (size / cells).max(1);
    DynamicImage::ImageRgba8(RgbaImage::from_fn(size, size, |x, y| {
        if (x / cell + y / cell) % 2 == 0 {
            Rgba(a)
        } else {
            Rgba(b)
        }
    }))
}

fn checker_material(
    ctx: &InitContext,
    name: &str,
    a: [u8; 4],
    b: [u8; 4],
) -> anyhow::Result<Material> {
    let diffuse = Texture::from_image(
        &ctx.device,
        &ctx.queue,
        &checkerboard(64, 8, a, b),
        Some(name),
        TextureKind::Diffuse,
    )?;
    Ok(Material::new(
        &ctx.device,
        name,
        diffuse,
        Texture::create_default_normal_map(&ctx.device, &ctx.queue),
        Texture::create_default_height_map(&ctx.device, &ctx.queue),
        &material_layout(&ctx.device),
    ))
}

fn spin(speed: Vector3<f32>) -> Component {
    Component::behaviour(move |transform: &mut Transform, dt: f32| {
        transform.rotation += speed * dt;
    })
}

async fn build_world(ctx: InitContext) -> anyhow::Result<World> {
    let mut world = World::new(&ctx.config);

    let cube = match load_mesh_obj("cube.obj", &ctx.device, &mut world.assets).await {
        Ok(id) => id,
        Err(e) => {
            log::warn!("{e:#}, using the built-in cube");
            let (vertices, indices) = parse_obj(CUBE_OBJ).await?;
            world
                .assets
                .add_mesh(Mesh::new(&ctx.device, "cube", &vertices, &indices))
        }
    };

    let orange = checker_material(&ctx, "orange", [230, 120, 30, 255], [120, 60, 20, 255])?;
    let grey = checker_material(&ctx, "grey", [200, 200, 200, 255], [90, 90, 90, 255])?;

    let sun = world.scene.spawn(
        Entity::new("sun")
            .with_component(Component::mesh(cube))
            .with_component(Component::material(orange.clone()))
            .with_component(spin(Vector3::new(0.0, 0.6, 0.0))),
    );
    for (i, x) in [-2.0f32, 2.0].into_iter().enumerate() {
        let planet = world.scene.spawn(
            Entity::new(&format!("planet {i}"))
                .with_transform(Transform {
                    position: Vector3::new(x, 0.0, 0.0),
                    scale: Vector3::new(0.5, 0.5, 0.5),
                    ..Default::default()
                })
                .with_component(Component::mesh(cube))
                .with_component(Component::material(grey.clone()))
                .with_component(spin(Vector3::new(1.0, 0.0, 0.5))),
        );
        world.scene.add_child(sun, planet)?;

        let moon = world.scene.spawn(
            Entity::new(&format!("moon {i}"))
                .with_transform(Transform {
                    position: Vector3::new(0.0, 1.5, 0.0),
                    scale: Vector3::new(0.4, 0.4, 0.4),
                    ..Default::default()
                })
                .with_component(Component::mesh(cube))
                .with_component(Component::material(orange.clone())),
        );
        world.scene.add_child(planet, moon)?;
    }

    Ok(world)
}

fn main() -> anyhow::Result<()> {
    run_with_config_file("deferred.toml", Box::new(|ctx| Box::pin(build_world(ctx))))
}
