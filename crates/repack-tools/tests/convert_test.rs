use std::fmt::Write as _;
use std::fs;
use std::io::Write;

use repack_core::data_types::IndexWidth;
use repack_core::normals::NormalFormat;
use repack_core::options::RepackOptions;
use repack_tools::{convert_mesh, write_artifacts, ObjReader};
use tempfile::{tempdir, NamedTempFile};

/// A `side` x `side` grid of quads with one shared normal.
fn grid_obj(side: usize) -> String {
    let mut src = String::from("# grid\n");
    for y in 0..side {
        for x in 0..side {
            writeln!(src, "v {} {} 0", x as f32 * 0.01, y as f32 * 0.01).unwrap();
        }
    }
    src.push_str("vn 0 0 1\n");
    for y in 0..side - 1 {
        for x in 0..side - 1 {
            let i = y * side + x + 1;
            writeln!(src, "f {a}//1 {b}//1 {c}//1 {d}//1", a = i, b = i + 1, c = i + side + 1, d = i + side).unwrap();
        }
    }
    src
}

#[test]
fn test_obj_to_artifacts() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(grid_obj(10).as_bytes()).unwrap();
    file.flush().unwrap();

    let mesh = ObjReader::open(file.path()).unwrap().read_mesh().unwrap();
    assert_eq!(mesh.vertex_count(), 100);
    assert_eq!(mesh.triangle_count(), 2 * 81);

    let mut options = RepackOptions::new();
    options.set_normal_format(NormalFormat::Snorm8).set_capacity_factor(96.0);
    let report = convert_mesh(&mesh, &options, 40).unwrap();
    assert!(report.outcomes.len() > 1);
    assert_eq!(report.encoded_count(), report.outcomes.len());

    let dir = tempdir().unwrap();
    for outcome in &report.outcomes {
        let repacked = outcome.result.as_ref().unwrap();
        assert_eq!(repacked.name(), Some(outcome.name.as_str()));
        assert_eq!(repacked.indices().width(), IndexWidth::U16);

        let paths = write_artifacts(dir.path(), repacked).unwrap();
        let len = |p: &std::path::Path| fs::metadata(p).unwrap().len() as usize;
        assert_eq!(len(&paths.deltas), repacked.output_vertex_count() * 4);
        assert_eq!(len(&paths.indices), repacked.indices().len() * 2);
        assert_eq!(len(&paths.normals), repacked.output_vertex_count() * 3);
        assert_eq!(len(&paths.anchors), repacked.anchors().byte_len());
    }

    let written = fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(written, report.outcomes.len() * 4);
    assert!(dir.path().join("part_0000.anchors.bin").exists());
}

#[test]
fn test_missing_input_is_an_error() {
    assert!(ObjReader::open("/nonexistent/input.obj").is_err());
}
