// Copyright (C) 2024 GLStudios
// SPDX-License-Identifier: LGPL-2.1-only

use dbvt::{
    BoundingBox,
    DynamicTree,
    Frustum,
    NodeKey,
    NodeViewKind,
    Ray,
    TestCounter,
};
use glam::{
    Mat4,
    Vec3,
};
use rand::{
    rngs::StdRng,
    Rng,
    SeedableRng,
};
use tracing::info;

pub const SEED: u64 = 0x5eed;
pub const OBJECTS: usize = 2000;
pub const FRAMES: usize = 60;
pub const WORLD_HALF_EXTENT: f32 = 100.0;
pub const MAX_OBJECT_SIZE: f32 = 2.0;
pub const MAX_SPEED: f32 = 0.25;

/// Log level comes from `DBVT_LOG` (`error` .. `trace`), `info` otherwise.
fn log_level() -> tracing::Level {
    std::env::var("DBVT_LOG")
        .ok()
        .and_then(|level| level.parse().ok())
        .unwrap_or(tracing::Level::INFO)
}

fn random_box(rng: &mut StdRng) -> BoundingBox {
    let center = Vec3::new(
        rng.gen_range(-WORLD_HALF_EXTENT..WORLD_HALF_EXTENT),
        rng.gen_range(-WORLD_HALF_EXTENT..WORLD_HALF_EXTENT),
        rng.gen_range(-WORLD_HALF_EXTENT..WORLD_HALF_EXTENT),
    );
    let half = Vec3::new(
        rng.gen_range(0.0..MAX_OBJECT_SIZE),
        rng.gen_range(0.0..MAX_OBJECT_SIZE),
        rng.gen_range(0.0..MAX_OBJECT_SIZE),
    ) * 0.5;
    BoundingBox::new(center - half, center + half)
}

/// Prints the tree one node per line, indented by depth.
fn dump<T: std::fmt::Debug>(tree: &DynamicTree<T>) {
    let mut depths: Vec<(NodeKey, usize)> = Vec::new();
    for view in tree.nodes() {
        let depth = view
            .parent
            .and_then(|parent| depths.iter().find(|(key, _)| *key == parent))
            .map_or(0, |(_, depth)| depth + 1);
        depths.push((view.key, depth));

        let indent = "  ".repeat(depth);
        match view.kind {
            NodeViewKind::Leaf { data, .. } => {
                println!("{indent}leaf {data:?} {} .. {}", view.bounds.min(), view.bounds.max());
            },
            NodeViewKind::Internal { height, .. } => {
                println!("{indent}node h={height} {} .. {}", view.bounds.min(), view.bounds.max());
            },
        }
    }
}

fn seed_scenario() -> Result<(), Box<dyn std::error::Error>> {
    let mut tree = DynamicTree::new();
    let boxes = [
        (Vec3::new(-4.0, 0.0, -5.0), Vec3::new(-3.0, 0.1, 5.0)),
        (Vec3::new(1.0, 0.0, -1.0), Vec3::new(2.0, 1.0, 1.0)),
        (Vec3::new(-2.0, 0.0, -1.0), Vec3::new(-1.0, 0.1, 1.0)),
        (Vec3::new(-2.0, 0.2, -1.0), Vec3::new(-1.0, 0.3, 1.0)),
    ];
    let mut keys = Vec::with_capacity(boxes.len());
    for (index, (min, max)) in boxes.into_iter().enumerate() {
        keys.push(tree.insert(BoundingBox::new(min, max), index)?);
    }

    println!("Seed scene:");
    dump(&tree);

    tree.update(keys[1], BoundingBox::new(Vec3::new(-2.0, 0.4, -1.0), Vec3::new(-1.0, 0.5, 1.0)))?;
    println!("After moving leaf 1:");
    dump(&tree);

    let mut tests = TestCounter::new();
    let pairs = tree.self_query(&mut tests);
    println!("{} overlapping pairs in {} box tests", pairs.len(), tests.count());

    Ok(())
}

#[allow(clippy::cast_precision_loss)]
fn stress_scene() -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = StdRng::seed_from_u64(SEED);
    let mut tree = DynamicTree::new();

    let begin_time = std::time::Instant::now();
    let mut objects = Vec::with_capacity(OBJECTS);
    for index in 0..OBJECTS {
        let bounds = random_box(&mut rng);
        let key = tree.insert(bounds, index)?;
        let velocity = Vec3::new(
            rng.gen_range(-MAX_SPEED..MAX_SPEED),
            rng.gen_range(-MAX_SPEED..MAX_SPEED),
            rng.gen_range(-MAX_SPEED..MAX_SPEED),
        );
        objects.push((key, bounds, velocity));
    }
    info!(
        objects = OBJECTS,
        height = tree.height(),
        area_ratio = tree.area_ratio(),
        elapsed_ms = begin_time.elapsed().as_millis(),
        "built tree"
    );

    let begin_time = std::time::Instant::now();
    let mut reinserted = 0usize;
    for _ in 0..FRAMES {
        for (key, bounds, velocity) in &mut objects {
            *bounds = bounds.translated(*velocity);
            if tree.update_with_displacement(*key, *bounds, *velocity)? {
                reinserted += 1;
            }
        }
    }
    tree.validate()?;
    info!(
        frames = FRAMES,
        reinserted,
        height = tree.height(),
        max_balance = tree.max_balance(),
        area_ratio = tree.area_ratio(),
        elapsed_ms = begin_time.elapsed().as_millis(),
        "moved objects"
    );

    let mut ray_tests = TestCounter::new();
    let ray = Ray::new(Vec3::splat(-WORLD_HALF_EXTENT), Vec3::ONE);
    let ray_hits = tree.cast_ray(&ray, &mut ray_tests);

    let projection = Mat4::perspective_rh(60f32.to_radians(), 16.0 / 9.0, 0.1, WORLD_HALF_EXTENT);
    let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, WORLD_HALF_EXTENT), Vec3::ZERO, Vec3::Y);
    let frustum = Frustum::from_view_projection(&(projection * view));
    let mut plane_tests = TestCounter::new();
    let visible = tree.cast_frustum(&frustum, &mut plane_tests);

    let mut box_tests = TestCounter::new();
    let pairs = tree.self_query(&mut box_tests);

    let brute_force = OBJECTS * (OBJECTS - 1) / 2;
    info!(ray_hits = ray_hits.len(), tests = ray_tests.count(), "ray cast");
    info!(visible = visible.len(), tests = plane_tests.count(), "frustum cast");
    info!(
        pairs = pairs.len(),
        tests = box_tests.count(),
        brute_force,
        saved = 1.0 - box_tests.count() as f64 / brute_force as f64,
        "self query"
    );

    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let fmt_subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_max_level(log_level())
        .finish();
    tracing::subscriber::set_global_default(fmt_subscriber)?;

    seed_scenario()?;
    stress_scene()?;

    Ok(())
}
