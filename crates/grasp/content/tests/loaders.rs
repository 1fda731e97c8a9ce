use std::io::Write;

use grasp_content::{ConfigLoader, TableLoader};
use grasp_core::{CapabilityKey, CategoryKey, ScanShape};

#[test]
fn loads_config_and_table_from_disk() {
    let mut config_file = tempfile::NamedTempFile::new().expect("temp file");
    write!(
        config_file,
        r#"
        persistent = ["ability.inspect"]
        error_wait_delay = 0.25

        [presets."grasp.interact"]
        shape = {{ kind = "Box", half_extent = {{ x = 400.0, y = 200.0, z = 100.0 }} }}
        relative_offset = true
        offset = {{ x = 50.0, y = 0.0, z = 0.0 }}
        "#
    )
    .expect("write config");

    let config = ConfigLoader::load(config_file.path()).expect("config loads");
    assert_eq!(config.persistent, vec![CapabilityKey::new("ability.inspect")]);
    assert_eq!(config.error_wait_delay, 0.25);
    let preset = &config.presets[&CategoryKey::interact()];
    assert_eq!(preset.shape.effective_radius(), 300.0);
    assert!(matches!(preset.shape, ScanShape::Box { .. }));

    let mut table_file = tempfile::NamedTempFile::new().expect("temp file");
    write!(
        table_file,
        r#"(
            profiles: {{
                "lever": (capability: Some("ability.pull"), distance_2d: true),
            }},
            targets: [
                (id: 10, profile: "lever", location: (x: 120.0, y: 0.0, z: 0.0)),
                (id: 11, profile: "lever", location: (x: -80.0, y: 40.0, z: 0.0), forward: (x: -1.0, y: 0.0, z: 0.0)),
            ],
        )"#
    )
    .expect("write table");

    let table = TableLoader::load(table_file.path()).expect("table loads");
    assert_eq!(table.spawn().expect("spawn").len(), 2);
}

#[test]
fn missing_file_reports_the_path() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("absent.toml");
    let err = ConfigLoader::load(&path).unwrap_err();
    assert!(err.to_string().contains("absent.toml"));
}

#[test]
fn unknown_profile_reference_is_rejected() {
    let mut table_file = tempfile::NamedTempFile::new().expect("temp file");
    write!(
        table_file,
        r#"(targets: [(id: 1, profile: "ghost", location: (x: 0.0, y: 0.0, z: 0.0))])"#
    )
    .expect("write table");

    let err = TableLoader::load(table_file.path()).unwrap_err();
    assert!(format!("{err:#}").contains("ghost"));
}
