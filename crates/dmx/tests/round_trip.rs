//! Round-trip tests across both encodings.

mod common;

use common::{assert_same_graph, count_occurrences, read_dictionary};
use dmx::{
    decode, decode_with_options, derived_id, encode, format_id, load, save, Angle, Color,
    DataModel, DecodeError, ElementHandle, Encoding, ErrorCode, Matrix, Quaternion, ReadOptions,
    Time, Value, ValueKind, Vector2, Vector3, Vector4,
};

const TARGETS: [(Encoding, i32); 3] = [
    (Encoding::Binary, 5),
    (Encoding::KeyValues2, 1),
    (Encoding::KeyValues2, 2),
];

struct Scene {
    dm: DataModel,
    root: ElementHandle,
    mesh: ElementHandle,
    material: ElementHandle,
}

/// A small model touching every kind the given target supports, with
/// shared, inline, null and cyclic references.
fn scene(encoding: Encoding, version: i32) -> Scene {
    let legacy_text = encoding == Encoding::KeyValues2 && version == 1;

    let mut dm = DataModel::new("model", 18).unwrap();
    let root = dm
        .add_element_with_id("scene", "DmElement", derived_id(b"scene"))
        .unwrap();
    let mesh = dm
        .add_element_with_id("mesh", "DmeMesh", derived_id(b"mesh"))
        .unwrap();
    let material = dm
        .add_element_with_id("material", "DmeMaterial", derived_id(b"material"))
        .unwrap();
    let pelvis = dm
        .add_element_with_id("pelvis", "DmeJoint", derived_id(b"pelvis"))
        .unwrap();
    let spine = dm
        .add_element_with_id("spine", "DmeJoint", derived_id(b"spine"))
        .unwrap();

    dm.add_attribute(root, "mesh", mesh).unwrap();
    dm.add_attribute(root, "materials", vec![material]).unwrap();
    dm.add_attribute(
        root,
        "joints",
        Value::ElementArray(vec![Some(pelvis), None, Some(spine)]),
    )
    .unwrap();
    dm.add_attribute(root, "nothing", Value::Element(None)).unwrap();
    dm.add_attribute(mesh, "material", material).unwrap();
    dm.add_attribute(mesh, "scene", root).unwrap();
    dm.add_attribute(spine, "parent", pelvis).unwrap();

    dm.add_attribute(mesh, "count", -42).unwrap();
    dm.add_attribute(mesh, "scale", 1.5f32).unwrap();
    dm.add_attribute(mesh, "visible", true).unwrap();
    dm.add_attribute(mesh, "label", "body \"lod0\"\nline two").unwrap();
    dm.add_attribute(mesh, "blob", Value::Binary(vec![0, 1, 0xfe, 0xff]))
        .unwrap();
    dm.add_attribute(mesh, "tint", Color([255.0, 128.0, 0.0, 255.0]))
        .unwrap();
    dm.add_attribute(mesh, "uv", Vector2([0.25, -0.75])).unwrap();
    dm.add_attribute(mesh, "origin", Vector3([1.0, 2.0, -3.5])).unwrap();
    dm.add_attribute(mesh, "plane", Vector4([0.0, 0.0, 1.0, 64.0]))
        .unwrap();
    dm.add_attribute(mesh, "angles", Angle([0.0, 90.0, -45.5])).unwrap();
    dm.add_attribute(mesh, "orientation", Quaternion([0.0, 0.0, 0.5, 0.875]))
        .unwrap();

    dm.add_attribute(mesh, "indices", vec![0, 1, 2, -7]).unwrap();
    dm.add_attribute(mesh, "weights", vec![0.125f32, 0.875]).unwrap();
    dm.add_attribute(mesh, "flags", vec![true, false, true]).unwrap();
    dm.add_attribute(
        mesh,
        "names",
        vec!["a".to_string(), "b c".to_string(), String::new()],
    )
    .unwrap();
    dm.add_attribute(
        mesh,
        "blobs",
        Value::BinaryArray(vec![vec![], vec![0xab, 0xcd]]),
    )
    .unwrap();
    dm.add_attribute(
        mesh,
        "positions",
        vec![Vector3([0.0, 0.0, 0.0]), Vector3([1.0, 0.5, -2.25])],
    )
    .unwrap();
    dm.add_attribute(mesh, "rotations", Vec::<Quaternion>::new())
        .unwrap();

    if legacy_text {
        dm.add_attribute(material, "guid", Value::ObjectId(derived_id(b"guid")))
            .unwrap();
        dm.add_attribute(
            material,
            "guids",
            Value::ObjectIdArray(vec![derived_id(b"a"), derived_id(b"b")]),
        )
        .unwrap();
    } else {
        dm.add_attribute(material, "start", Time::from_seconds(1.25))
            .unwrap();
        dm.add_attribute(
            material,
            "keys",
            vec![Time::from_ticks(0), Time::from_ticks(333), Time::from_ticks(-10_000)],
        )
        .unwrap();
        dm.add_attribute(material, "transform", Matrix::IDENTITY)
            .unwrap();
        dm.add_attribute(material, "bones", Value::MatrixArray(vec![Matrix::IDENTITY]))
            .unwrap();
    }

    Scene {
        dm,
        root,
        mesh,
        material,
    }
}

#[test]
fn test_round_trip_every_target() {
    for (encoding, version) in TARGETS {
        let scene = scene(encoding, version);
        let bytes = encode(&scene.dm, encoding, version).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_same_graph(&scene.dm, &decoded);
        assert!(decoded.unresolved().is_empty());
    }
}

#[test]
fn test_reencode_is_identical() {
    for (encoding, version) in TARGETS {
        let first = encode(&scene(encoding, version).dm, encoding, version).unwrap();
        let second = encode(&decode(&first).unwrap(), encoding, version).unwrap();
        assert_eq!(first, second, "{encoding} {version}");
    }
}

#[test]
fn test_kind_outside_table_rejected() {
    let legacy = scene(Encoding::KeyValues2, 1).dm;
    let err = encode(&legacy, Encoding::Binary, 5).unwrap_err();
    assert!(matches!(
        err,
        dmx::EncodeError::UnsupportedKind {
            kind: ValueKind::ObjectId,
            ..
        }
    ));

    let current = scene(Encoding::Binary, 5).dm;
    assert!(encode(&current, Encoding::KeyValues2, 1).is_err());
}

#[test]
fn test_two_cycle_both_encodings() {
    let mut dm = DataModel::new("model", 1).unwrap();
    let e1 = dm.add_element("e1", "DmElement").unwrap();
    let e2 = dm.add_element("e2", "DmElement").unwrap();
    dm.add_attribute(e1, "child", e2).unwrap();
    dm.add_attribute(e2, "back", e1).unwrap();

    for (encoding, version) in TARGETS {
        let decoded = decode(&encode(&dm, encoding, version).unwrap()).unwrap();
        let root = decoded.root().unwrap();
        let child = decoded[root].get("child").and_then(Value::as_element).unwrap();
        assert_eq!(decoded[child].name(), "e2");
        assert_eq!(
            decoded[child].get("back").and_then(Value::as_element),
            Some(root)
        );
        assert_eq!(decoded.len(), 2);
    }
}

#[test]
fn test_example_text_lines() {
    let mut dm = DataModel::new("model", 1).unwrap();
    let e1 = dm.add_element("e1", "DmElement").unwrap();
    dm.add_attribute(e1, "x", 5).unwrap();
    dm.add_attribute(e1, "s", "hi").unwrap();

    let bytes = encode(&dm, Encoding::KeyValues2, 1).unwrap();
    let text = String::from_utf8(bytes.clone()).unwrap();
    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    assert!(lines.contains(&r#""x" "int" "5""#));
    assert!(lines.contains(&r#""s" "string" "hi""#));

    let decoded = decode(&bytes).unwrap();
    let root = &decoded[decoded.root().unwrap()];
    assert_eq!(root.name(), "e1");
    assert_eq!(root.len(), 2);
    assert_eq!(root.get("x"), Some(&Value::Int(5)));
    assert_eq!(root.get("s"), Some(&Value::from("hi")));
}

#[test]
fn test_unreachable_elements_excluded() {
    for (encoding, version) in TARGETS {
        let mut scene = scene(encoding, version);
        let orphan_id = derived_id(b"orphan");
        let orphan = scene
            .dm
            .add_element_with_id("orphan-name", "DmeOrphan", orphan_id)
            .unwrap();
        scene
            .dm
            .add_attribute(orphan, "orphan-attr", "orphan-value")
            .unwrap();
        // A reference from an unreachable element does not make anything reachable.
        scene.dm.add_attribute(orphan, "into", scene.mesh).unwrap();

        let bytes = encode(&scene.dm, encoding, version).unwrap();
        assert_eq!(count_occurrences(&bytes, b"orphan"), 0);
        assert_eq!(count_occurrences(&bytes, &orphan_id), 0);
        assert_eq!(count_occurrences(&bytes, format_id(&orphan_id).as_bytes()), 0);

        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.len(), scene.dm.len() - 1);
        assert!(decoded.element_by_id(&orphan_id).is_none());
    }
}

#[test]
fn test_shared_element_defined_once_in_text() {
    let scene = scene(Encoding::KeyValues2, 2);
    let bytes = encode(&scene.dm, Encoding::KeyValues2, 2).unwrap();
    let id = format_id(scene.dm[scene.material].id());

    let definition = format!(r#""id" "elementid" "{id}""#);
    let reference = format!(r#""element" "{id}""#);
    assert_eq!(count_occurrences(&bytes, definition.as_bytes()), 1);
    assert_eq!(count_occurrences(&bytes, reference.as_bytes()), 2);

    // The root references itself through the mesh, so it is referenced once by id.
    let root_id = format_id(scene.dm[scene.root].id());
    let text = String::from_utf8(bytes).unwrap();
    assert!(text.starts_with("<!-- dmx encoding keyvalues2 2 format model 18 -->\n\"DmElement\"\n{"));
    assert_eq!(text.matches(&format!(r#""element" "{root_id}""#)).count(), 1);
}

#[test]
fn test_shared_element_single_table_entry_in_binary() {
    let scene = scene(Encoding::Binary, 5);
    let bytes = encode(&scene.dm, Encoding::Binary, 5).unwrap();
    assert_eq!(count_occurrences(&bytes, scene.dm[scene.material].id()), 1);

    let decoded = decode(&bytes).unwrap();
    let root = decoded.root().unwrap();
    let mesh = decoded[root].get("mesh").and_then(Value::as_element).unwrap();
    let via_mesh = decoded[mesh].get("material").and_then(Value::as_element);
    let via_root = decoded[root]
        .get("materials")
        .and_then(Value::as_element_array)
        .map(|items| items[0]);
    assert_eq!(via_mesh, via_root.flatten());
    assert!(via_mesh.is_some());
}

#[test]
fn test_binary_dictionary_has_each_string_once() {
    let scene = scene(Encoding::Binary, 5);
    let bytes = encode(&scene.dm, Encoding::Binary, 5).unwrap();
    let dictionary = read_dictionary(&bytes);

    let mut sorted = dictionary.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(sorted.len(), dictionary.len(), "duplicate dictionary entries");

    for expected in [
        "scene",
        "DmElement",
        "DmeJoint",
        "material",
        "label",
        "body \"lod0\"\nline two",
    ] {
        assert!(dictionary.iter().any(|s| s == expected), "{expected:?}");
    }
    // String arrays are written literally.
    assert!(!dictionary.iter().any(|s| s == "b c"));
}

#[test]
fn test_save_and_load_file() {
    let dir = tempfile::tempdir().unwrap();
    for (encoding, version) in TARGETS {
        let scene = scene(encoding, version);
        let path = dir.path().join(format!("scene_{encoding}_{version}.dmx"));
        save(&scene.dm, &path, encoding, version).unwrap();
        let loaded = load(&path, &ReadOptions::default()).unwrap();
        assert_same_graph(&scene.dm, &loaded);

        let via_model = DataModel::load(&path).unwrap();
        assert_eq!(via_model.len(), loaded.len());
    }
}

#[test]
fn test_failed_save_leaves_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("never.dmx");
    let scene = scene(Encoding::Binary, 5);
    assert!(save(&scene.dm, &path, Encoding::Binary, 2).is_err());
    assert!(!path.exists());
}

#[test]
fn test_load_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load(dir.path().join("absent.dmx"), &ReadOptions::default()).unwrap_err();
    assert!(matches!(err, dmx::DmxError::Io(_)));
}

#[test]
fn test_element_path_on_written_text() {
    let scene = scene(Encoding::KeyValues2, 2);
    let bytes = encode(&scene.dm, Encoding::KeyValues2, 2).unwrap();

    let decoded = decode_with_options(&bytes, &ReadOptions::with_element_path("MESH")).unwrap();
    let root = decoded.root().unwrap();
    assert!(decoded[root].get("mesh").and_then(Value::as_element).is_some());
    // Inline joints are below the root but outside the path.
    assert!(decoded.find_element("pelvis").is_some());
    assert!(decoded.find_element("spine").is_none());
    assert!(decoded.unresolved().is_empty());
}

#[test]
fn test_garbage_input_errors() {
    assert_eq!(
        decode(b"").unwrap_err().code(),
        ErrorCode::MalformedHeader
    );
    assert_eq!(
        decode(b"<!-- dmx encoding xml 1 format model 1 -->\n")
            .unwrap_err()
            .code(),
        ErrorCode::UnsupportedFormat
    );
    let mut truncated = encode(&scene(Encoding::Binary, 5).dm, Encoding::Binary, 5).unwrap();
    truncated.truncate(truncated.len() - 3);
    assert!(matches!(
        decode(&truncated),
        Err(DecodeError::UnexpectedEof { .. })
    ));
}
