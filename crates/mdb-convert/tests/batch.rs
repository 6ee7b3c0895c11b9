//! Batch conversions against real files in temporary folders.

use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use glam::{Vec2, Vec3};
use mdb_codec::model::MdbVertex;
use mdb_codec::{
    CodecError, CollisionBox, Material, MdbMesh, MdbModel, decode_mdb, encode_mdb,
};
use mdb_convert::{
    ConvertOptions, Error, Observer, mdbs_to_obj, mdbs_to_objs, objs_to_grouped_mdbs,
    objs_to_mdbs,
};

#[derive(Default)]
struct Recorder {
    progress: Vec<usize>,
    lines: Vec<String>,
}

impl Observer for Recorder {
    fn progress(&mut self, completed: usize) {
        self.progress.push(completed);
    }

    fn log(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }
}

fn vertex(x: f32, y: f32, z: f32) -> MdbVertex {
    MdbVertex {
        position: Vec3::new(x, y, z),
        tex_coord: Vec2::new(x / 4.0, 1.0 - y / 4.0),
        normal: Vec2::new(0.4, 0.1),
    }
}

fn boxes() -> CollisionBox {
    let child = |x: f32| CollisionBox {
        level: 1,
        center: Vec3::new(x, 0.0, 0.0),
        half_lengths: Vec3::new(1.0, 0.25, 0.5),
        ..CollisionBox::default()
    };
    CollisionBox {
        center: Vec3::new(1.0, 1.0, 1.0),
        half_lengths: Vec3::new(3.0, 1.0, 2.0),
        left: Some(Box::new(child(0.0))),
        right: Some(Box::new(child(2.0))),
        ..CollisionBox::default()
    }
}

fn sample_mesh(hull_texture: &str) -> MdbMesh {
    let mut hull = MdbModel {
        name: String::new(),
        vertices: vec![
            vertex(0.0, 0.0, 0.0),
            vertex(2.0, 0.0, 0.0),
            vertex(0.0, 3.0, 0.0),
            vertex(0.0, 0.0, 4.0),
        ],
        runs: Vec::new(),
    };
    hull.push_triangle([0, 1, 2], 0);
    hull.push_triangle([0, 2, 3], 1);

    let mut lod = MdbModel {
        name: String::new(),
        vertices: vec![vertex(0.0, 0.0, 0.0), vertex(1.0, 0.0, 0.0), vertex(0.0, 1.0, 0.0)],
        runs: Vec::new(),
    };
    lod.push_triangle([0, 1, 2], 1);

    MdbMesh {
        models: vec![hull, lod],
        materials: vec![
            Material::from_texture(hull_texture),
            Material::from_texture("glass.tga"),
        ],
        collision: Some(boxes()),
    }
}

fn write_mdb(path: &Path, mesh: &MdbMesh) {
    encode_mdb(File::create(path).unwrap(), mesh).unwrap();
}

fn read_mdb(path: &Path) -> MdbMesh {
    decode_mdb(BufReader::new(File::open(path).unwrap()), "test").unwrap()
}

fn boxes_option() -> ConvertOptions {
    ConvertOptions {
        collision_boxes: true,
        ..ConvertOptions::default()
    }
}

#[test]
fn test_mdb_to_obj_and_back() {
    let dir = tempfile::tempdir().unwrap();
    let original = sample_mesh("hull.tga");
    let input = dir.path().join("ship.mdb");
    write_mdb(&input, &original);

    let objs = dir.path().join("objs");
    fs::create_dir(&objs).unwrap();
    let report = mdbs_to_objs(&[&input], &objs, &boxes_option(), &mut Recorder::default()).unwrap();
    assert_eq!(report.completed, [input.clone()]);

    let obj = fs::read_to_string(objs.join("ship.obj")).unwrap();
    assert!(obj.starts_with("mtllib ship.mtl\n"));
    assert!(obj.contains("g ship_0\no ship_0\nusemtl hull\n"));
    assert!(obj.contains("o _BOX0\ng _BOX0\n"));
    let description = fs::read_to_string(objs.join("ship.txt")).unwrap();
    assert_eq!(description, "MESH\tship\nCBOX\t_BOX0\t_BOX1\t_BOX2\nCBOX\t_BOX1\nCBOX\t_BOX2\n");
    let mtl = fs::read_to_string(objs.join("ship.mtl")).unwrap();
    assert!(mtl.contains("map_Kd hull.dds\n"));

    // Rebuild the boxes from the description rather than splitting geometry.
    let mdbs = dir.path().join("mdbs");
    fs::create_dir(&mdbs).unwrap();
    let mut recorder = Recorder::default();
    let report = objs_to_mdbs(
        &[objs.join("ship.obj")],
        &mdbs,
        &ConvertOptions::default(),
        &mut recorder,
    )
    .unwrap();
    assert!(report.failed.is_empty(), "{:?}", report.failed);
    assert_eq!(recorder.progress, [1]);

    let rebuilt = read_mdb(&mdbs.join("ship.mdb"));
    assert_eq!(rebuilt.models.len(), 2);
    for (before, after) in original.models.iter().zip(&rebuilt.models) {
        assert_eq!(before.runs, after.runs);
        assert_eq!(before.vertices.len(), after.vertices.len());
        for (b, a) in before.vertices.iter().zip(&after.vertices) {
            assert_eq!(b.position, a.position);
            assert_eq!(b.tex_coord, a.tex_coord);
            assert!((b.normal - a.normal).length() < 1e-3, "{b:?} vs {a:?}");
        }
    }
    assert_eq!(
        rebuilt.materials,
        [Material::new("hull", "hull.tga"), Material::new("glass", "glass.tga")]
    );

    let root = rebuilt.collision.unwrap();
    let expected = boxes();
    assert_eq!(root.count(), 3);
    assert!((root.center - expected.center).length() < 1e-4);
    assert!((root.half_lengths - expected.half_lengths).length() < 1e-4);
    let right = root.right.as_deref().unwrap();
    assert_eq!(right.level, 1);
    assert!((right.center - Vec3::new(2.0, 0.0, 0.0)).length() < 1e-4);
}

#[test]
fn test_truncated_input_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let inputs: Vec<PathBuf> = ["one", "two", "three"]
        .iter()
        .map(|name| dir.path().join(format!("{name}.mdb")))
        .collect();
    for input in &inputs {
        write_mdb(input, &sample_mesh("hull.tga"));
    }
    // Cut the second file in the middle of its second vertex.
    let bytes = fs::read(&inputs[1]).unwrap();
    fs::write(&inputs[1], &bytes[..28 + 36 + 10]).unwrap();

    let out = dir.path().join("out");
    fs::create_dir(&out).unwrap();
    let mut recorder = Recorder::default();
    let report = mdbs_to_objs(&inputs, &out, &ConvertOptions::default(), &mut recorder).unwrap();

    assert_eq!(recorder.progress, [1, 2, 3]);
    assert_eq!(report.completed, [inputs[0].clone(), inputs[2].clone()]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].input, inputs[1]);
    assert!(matches!(
        &report.failed[0].error,
        Error::Codec(CodecError::Read { context, .. }) if context == "vertex 1 of model 0"
    ));
    assert!(
        recorder
            .lines
            .iter()
            .any(|line| line.starts_with("Skipped") && line.contains("two.mdb"))
    );
    assert!(out.join("one.obj").exists());
    assert!(!out.join("two.obj").exists());
    assert!(out.join("three.obj").exists());
}

#[test]
fn test_single_obj_concatenates_inputs() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("a.mdb");
    let second = dir.path().join("b.mdb");
    write_mdb(&first, &sample_mesh("Hull Plate.tga"));
    write_mdb(&second, &sample_mesh("hull+plate.tga"));

    let obj_path = dir.path().join("fleet.obj");
    let report = mdbs_to_obj(
        &[&first, &second],
        &obj_path,
        &boxes_option(),
        &mut Recorder::default(),
    )
    .unwrap();
    assert_eq!(report.completed.len(), 2);

    let obj = fs::read_to_string(&obj_path).unwrap();
    // Seven points per input; positions of the second input also skip the
    // 24 corners of the first input's box wireframes.
    assert!(obj.contains("g b_0\no b_0\nusemtl Hull_Plate\nf 34/10/10 33/9/9 32/8/8\n"));

    let mtl = fs::read_to_string(dir.path().join("fleet.mtl")).unwrap();
    let names: Vec<&str> = mtl.lines().filter(|l| l.starts_with("newmtl")).collect();
    assert_eq!(names, ["newmtl Hull_Plate", "newmtl glass"]);
    assert!(obj.contains("usemtl Hull_Plate"));
    assert!(!obj.contains("usemtl hull_plate"));

    let description = fs::read_to_string(dir.path().join("fleet.txt")).unwrap();
    assert!(description.contains("MESH\tb\nCBOX\t_BOX3\t_BOX4\t_BOX5\n"));
}

const GROUPED_OBJ: &str = "\
v 0 0 0
v 1 0 0
v 0 1 0
v 1 1 0
g Hull_2
f 1 2 3
f 2 4 3
g Hull_10
f 1 2 3
f 2 4 3
f 1 2 4
g Turret
f 1 2 3
g Hull_1
f 1 2 3
";

#[test]
fn test_groups_split_by_real_name() {
    let dir = tempfile::tempdir().unwrap();
    let obj = dir.path().join("fleet.obj");
    fs::write(&obj, GROUPED_OBJ).unwrap();

    let mut recorder = Recorder::default();
    let report = objs_to_grouped_mdbs(&[&obj], dir.path(), &boxes_option(), &mut recorder).unwrap();
    assert!(report.failed.is_empty(), "{:?}", report.failed);
    // No MTL next to the OBJ.
    assert!(recorder.lines.iter().any(|l| l.starts_with("Warning")));

    let hull = read_mdb(&dir.path().join("Hull.mdb"));
    let counts: Vec<usize> = hull.models.iter().map(MdbModel::triangle_count).collect();
    assert_eq!(counts, [1, 2, 3]);
    assert_eq!(hull.materials.len(), 1);
    assert!(!hull.materials[0].has_texture());

    let turret = read_mdb(&dir.path().join("Turret.mdb"));
    assert_eq!(turret.models.len(), 1);
}

#[test]
fn test_stems_merge_when_not_adjacent() {
    let dir = tempfile::tempdir().unwrap();
    let obj = dir.path().join("fleet.obj");
    let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nv 1 1 0\n\
                g Hull_2\nf 1 2 3\nf 2 4 3\n\
                g Hull_1a\nf 1 2 3\n\
                g Hull_1\nf 1 2 4\n";
    fs::write(&obj, text).unwrap();

    let report =
        objs_to_grouped_mdbs(&[&obj], dir.path(), &boxes_option(), &mut Recorder::default())
            .unwrap();
    assert!(report.failed.is_empty(), "{:?}", report.failed);

    // Natural order puts Hull_1a between Hull_1 and Hull_2.
    let hull = read_mdb(&dir.path().join("Hull.mdb"));
    let counts: Vec<usize> = hull.models.iter().map(MdbModel::triangle_count).collect();
    assert_eq!(counts, [1, 2]);
    assert_eq!(read_mdb(&dir.path().join("Hull_1a.mdb")).models.len(), 1);
}

#[test]
fn test_description_outside_utf8_still_converts() {
    let dir = tempfile::tempdir().unwrap();
    let obj = dir.path().join("Hull.obj");
    fs::write(&obj, "v 0 0 0\nv 1 0 0\nv 0 1 0\ng Hull_0\nf 1 2 3\n").unwrap();
    let mut description = b"MESH\tHull\nCBOX\tCaf".to_vec();
    description.extend([0xE9, b'\n']);
    fs::write(dir.path().join("Hull.txt"), description).unwrap();

    let mut recorder = Recorder::default();
    let report =
        objs_to_mdbs(&[&obj], dir.path(), &ConvertOptions::default(), &mut recorder).unwrap();
    assert!(report.failed.is_empty(), "{:?}", report.failed);
    // The box exists in the description but has no wireframe group.
    assert!(recorder.lines.iter().any(|l| l.contains("Caf\u{FFFD}")));

    let mesh = read_mdb(&dir.path().join("Hull.mdb"));
    assert_eq!(mesh.models.len(), 1);
    assert_eq!(mesh.collision.unwrap().count(), 1);
}

#[test]
fn test_point_capacity_fails_the_input() {
    let dir = tempfile::tempdir().unwrap();
    let mut text = String::from("v 0 0 0\nv 1 0 0\nv 0 1 0\ng Big\n");
    // Every corner is a distinct tuple, one more triangle than fits.
    for t in 0..21846 {
        let k = 3 * t + 1;
        writeln!(text, "f 1/{k} 2/{} 3/{}", k + 1, k + 2).unwrap();
    }
    let obj = dir.path().join("big.obj");
    fs::write(&obj, text).unwrap();

    let out = dir.path().join("out");
    fs::create_dir(&out).unwrap();
    let report = objs_to_mdbs(&[&obj], &out, &boxes_option(), &mut Recorder::default()).unwrap();
    assert_eq!(report.failed.len(), 1);
    assert!(matches!(
        report.failed[0].error,
        Error::Codec(CodecError::CapacityExceeded { what: "point", limit: 65535 })
    ));
    assert_eq!(fs::read_dir(&out).unwrap().count(), 0);
}

#[test]
fn test_generated_boxes_stay_within_depth() {
    let dir = tempfile::tempdir().unwrap();
    let mut text = String::new();
    let size = 12;
    for i in 0..size {
        for j in 0..size {
            let (x, z) = (i as f32, j as f32 * 0.5);
            writeln!(text, "v {x} {} {z}", (x * 0.7).sin() + (z * 1.3).cos()).unwrap();
        }
    }
    text.push_str("g Hull_0\n");
    for i in 0..size - 1 {
        for j in 0..size - 1 {
            let a = i * size + j + 1;
            let (b, c, d) = (a + 1, a + size, a + size + 1);
            writeln!(text, "f {a} {b} {c}\nf {b} {d} {c}").unwrap();
        }
    }
    let obj = dir.path().join("Hull.obj");
    fs::write(&obj, text).unwrap();

    let report = objs_to_mdbs(&[&obj], dir.path(), &boxes_option(), &mut Recorder::default()).unwrap();
    assert!(report.failed.is_empty(), "{:?}", report.failed);

    let root = read_mdb(&dir.path().join("Hull.mdb")).collision.unwrap();
    assert_eq!(root.depth(), 6);
    root.walk(&mut |b| {
        assert!(b.level <= 5);
        for axis in [b.cross, b.up, b.forward] {
            assert!((axis.length() - 1.0).abs() < 1e-4);
        }
        assert!(b.cross.dot(b.up).abs() < 1e-4);
        assert!(b.cross.dot(b.forward).abs() < 1e-4);
        assert!(b.up.dot(b.forward).abs() < 1e-4);
    });
}
