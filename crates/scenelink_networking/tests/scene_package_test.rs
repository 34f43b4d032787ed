//! # Scene Package Integration Tests
//!
//! Randomized scene graphs through pack, unpack and replay.

use std::f32::consts::TAU;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use scenelink_protocol::scene::{
    CameraData, GeoData, LightData, LightType, MaterialPackage, MeshPackage, NodeContext, NodeHandle,
    NodeKind, NodePayload, SkinnedGeoData,
};
use scenelink_protocol::{
    LoadSettings, ReferenceError, SceneConstructor, SceneDataHandler, SceneGraph, SceneNode,
    SyncError,
};
use scenelink_shared::{Color, Quat, Vec3};

/// Authoring-side shadow of a generated graph.
struct Model {
    nodes: Vec<SceneNode>,
    children: Vec<Vec<usize>>,
    roots: Vec<usize>,
    material: Vec<Option<usize>>,
}

impl Model {
    fn pre_order(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<usize> = self.roots.iter().rev().copied().collect();
        while let Some(i) = stack.pop() {
            order.push(i);
            stack.extend(self.children[i].iter().rev());
        }
        order
    }
}

fn random_payload(rng: &mut StdRng) -> NodePayload {
    match rng.gen_range(0..5) {
        0 => NodePayload::Group,
        1 => NodePayload::Geo(GeoData {
            roughness: rng.gen_range(0.0..1.0),
            color: Color::rgb(rng.gen(), rng.gen(), rng.gen()),
            ..GeoData::default()
        }),
        2 => NodePayload::Light(LightData {
            light_type: LightType::from_u8(rng.gen_range(0..4)).unwrap_or(LightType::Point),
            color: [rng.gen(), rng.gen(), rng.gen()],
            intensity: rng.gen_range(0.0..10.0),
            angle: rng.gen_range(1.0..90.0),
            range: rng.gen_range(1.0..100.0),
        }),
        3 => NodePayload::Camera(CameraData {
            fov: rng.gen_range(20.0..90.0),
            near: rng.gen_range(0.01..1.0),
            ..CameraData::default()
        }),
        _ => NodePayload::SkinnedGeo(SkinnedGeoData {
            bind_poses: (0..16).map(|_| rng.gen()).collect(),
            bound_center: Vec3::new(rng.gen(), rng.gen(), rng.gen()),
            bound_extents: Vec3::ONE,
            ..SkinnedGeoData::default()
        }),
    }
}

fn random_scene(seed: u64, size: usize) -> (SceneGraph, Model) {
    let mut rng = StdRng::seed_from_u64(seed);
    let materials: Vec<Arc<MaterialPackage>> = (0..3)
        .map(|i| Arc::new(MaterialPackage::resource(format!("mat{i}"), "")))
        .collect();
    let mesh = Arc::new(MeshPackage {
        vertices: vec![0.0; 9],
        indices: vec![0, 1, 2],
        ..MeshPackage::default()
    });

    let mut graph = SceneGraph::new();
    let mut handles: Vec<NodeHandle> = Vec::with_capacity(size);
    let mut model = Model {
        nodes: Vec::with_capacity(size),
        children: Vec::with_capacity(size),
        roots: Vec::new(),
        material: Vec::with_capacity(size),
    };

    for i in 0..size {
        let mut node = SceneNode::new(format!("n{i}"), random_payload(&mut rng))
            .with_position(Vec3::new(rng.gen(), rng.gen(), rng.gen()))
            .with_rotation(Quat::from_rotation_y(rng.gen_range(0.0..TAU)));
        if rng.gen_bool(0.3) {
            node = node.editable();
        }
        let is_mesh = node.payload.geo().is_some();

        let handle = if i == 0 || rng.gen_bool(0.1) {
            model.roots.push(i);
            graph.add_root(node.clone())
        } else {
            let parent = rng.gen_range(0..i);
            model.children[parent].push(i);
            graph.add_child(handles[parent], node.clone()).expect("parent exists")
        };

        let material = (is_mesh && rng.gen_bool(0.7)).then(|| rng.gen_range(0..materials.len()));
        if let Some(m) = material {
            graph.set_material(handle, Arc::clone(&materials[m])).expect("node exists");
            graph.set_mesh(handle, Arc::clone(&mesh)).expect("node exists");
        }

        handles.push(handle);
        model.nodes.push(node);
        model.children.push(Vec::new());
        model.material.push(material);
    }
    (graph, model)
}

#[test]
fn test_random_trees_round_trip() {
    let handler = SceneDataHandler::default();
    for seed in 0..20u64 {
        let size = 1 + (seed as usize * 37) % 300;
        let (graph, model) = random_scene(seed, size);

        let bytes = handler.pack(&graph).expect("pack");
        let scene = handler.unpack(&bytes).expect("unpack");

        let order = model.pre_order();
        assert_eq!(scene.nodes.len(), size, "seed {seed}");
        assert_eq!(scene.tree.roots().len(), model.roots.len(), "seed {seed}");
        assert!(scene.materials.len() <= 3, "materials are shared, seed {seed}");
        assert!(scene.meshes.len() <= 1, "mesh is shared, seed {seed}");

        let mut flat_of = vec![0usize; size];
        for (flat, &original) in order.iter().enumerate() {
            flat_of[original] = flat;
        }

        for (flat, &original) in order.iter().enumerate() {
            let expected = &model.nodes[original];
            let decoded = &scene.nodes[flat];

            assert_eq!(decoded.name, expected.name, "seed {seed} node {flat}");
            assert_eq!(decoded.kind(), expected.kind());
            assert_eq!(decoded.position, expected.position);
            assert_eq!(decoded.rotation, expected.rotation);
            assert_eq!(decoded.editable, expected.editable);
            assert_eq!(decoded.child_count as usize, model.children[original].len());

            let children: Vec<usize> = model.children[original].iter().map(|&c| flat_of[c]).collect();
            assert_eq!(scene.tree.children(flat), children.as_slice());

            match (&decoded.payload, &expected.payload) {
                (NodePayload::Geo(d), NodePayload::Geo(e)) => {
                    assert_eq!(d.roughness, e.roughness);
                    assert_eq!(d.color, e.color);
                }
                (NodePayload::SkinnedGeo(d), NodePayload::SkinnedGeo(e)) => {
                    assert_eq!(d.bind_poses, e.bind_poses);
                    assert_eq!(d.bound_center, e.bound_center);
                }
                (d, e) => assert_eq!(d, e),
            }

            let material = scene.material_for(decoded).map(|m| m.name.clone());
            let expected_material = model.material[original].map(|m| format!("mat{m}").into_bytes());
            assert_eq!(material, expected_material, "seed {seed} node {flat}");
        }
    }
}

#[test]
fn test_every_truncation_is_an_error() {
    let handler = SceneDataHandler::default();
    let (graph, _) = random_scene(99, 40);
    let bytes = handler.pack(&graph).expect("pack");
    for len in 0..bytes.len() {
        assert!(handler.unpack(&bytes[..len]).is_err(), "prefix of {len} bytes accepted");
    }
}

/// Records what replay hands over, per node.
#[derive(Default)]
struct Recorder {
    seen: Vec<(String, Option<String>, Option<usize>)>,
}

impl SceneConstructor for Recorder {
    type Handle = usize;
    type Error = ReferenceError;

    fn create_node(&mut self, ctx: NodeContext<'_, usize>) -> Result<usize, ReferenceError> {
        let material = ctx
            .assets
            .material
            .map(|m| String::from_utf8_lossy(&m.name).into_owned());
        self.seen.push((ctx.node.name_lossy().into_owned(), material, ctx.parent.copied()));
        Ok(ctx.index)
    }
}

#[test]
fn test_replay_reports_missing_material() {
    let mut graph = SceneGraph::new();
    let plain = graph.add_root(SceneNode::new("plain", NodePayload::Geo(GeoData::default())));
    let painted = graph
        .add_child(plain, SceneNode::new("painted", NodePayload::Geo(GeoData::default())))
        .expect("parent exists");
    graph
        .set_material(painted, Arc::new(MaterialPackage::shader("Unlit", "void main() {}")))
        .expect("node exists");

    let handler = SceneDataHandler::default();
    let scene = handler.unpack(&handler.pack(&graph).expect("pack")).expect("unpack");

    let mut recorder = Recorder::default();
    let handles = handler.replay(&scene, &mut recorder).expect("replay");
    assert_eq!(handles, vec![0, 1]);
    assert_eq!(
        recorder.seen,
        vec![
            ("plain".to_owned(), None, None),
            ("painted".to_owned(), Some("Unlit".to_owned()), Some(0)),
        ]
    );
}

#[test]
fn test_cube_and_sun_example() {
    let mut graph = SceneGraph::new();
    let cube = graph.add_root(SceneNode::new("Cube", NodePayload::Geo(GeoData::default())));
    graph
        .set_material(cube, Arc::new(MaterialPackage::resource("Standard", "")))
        .expect("node exists");
    graph
        .set_mesh(cube, Arc::new(MeshPackage { vertices: vec![0.0; 9], ..MeshPackage::default() }))
        .expect("node exists");
    graph.add_root(SceneNode::new(
        "Sun",
        NodePayload::Light(LightData {
            light_type: LightType::Directional,
            intensity: 1.5,
            ..LightData::default()
        }),
    ));

    let handler = SceneDataHandler::new(LoadSettings::default());
    let scene = handler.unpack(&handler.pack(&graph).expect("pack")).expect("unpack");

    assert_eq!(scene.header.node_count, 2);
    assert_eq!(scene.header.object_count, 1);
    assert_eq!(scene.nodes[0].kind(), NodeKind::Geo);
    assert_eq!(scene.nodes[0].payload.geo().map(|g| g.material_id), Some(0));
    match &scene.nodes[1].payload {
        NodePayload::Light(light) => {
            assert_eq!(light.light_type, LightType::Directional);
            assert_eq!(light.intensity, 1.5);
        }
        other => panic!("expected a light, got {other:?}"),
    }
}

#[test]
fn test_inflated_section_counts_fail_cleanly() {
    let handler = SceneDataHandler::new(LoadSettings::default());
    let (graph, _) = random_scene(7, 12);
    let package = handler.pack(&graph).expect("pack");

    // node, mesh, texture, material and character counts.
    for offset in [8, 12, 16, 20, 24] {
        let mut inflated = package.clone();
        inflated[offset..offset + 4].copy_from_slice(&u32::MAX.to_le_bytes());
        let err = handler.unpack(&inflated).expect_err("inflated count must fail");
        assert!(matches!(err, SyncError::Decode(_)), "offset {offset}: {err:?}");
    }
}

#[test]
fn test_inflated_count_on_short_body() {
    let handler = SceneDataHandler::new(LoadSettings::default());
    let empty = handler.pack(&SceneGraph::new()).expect("pack");

    let mut short = empty.clone();
    short[8..12].copy_from_slice(&u32::MAX.to_le_bytes());
    short.extend_from_slice(&[0u8; 40]);
    let err = handler.unpack(&short).expect_err("short body must fail");
    assert!(matches!(err, SyncError::Decode(_)), "{err:?}");
}
