//! Fixed filesystem layout of an assembled workspace.

use super::test_utils::UnusedClient;
use chainfn::workspace::{
    ensure_directories, lock_path, INPUT_DB_FILE, LOCK_FILE, OUTPUT_DB_FILE, PERSISTENT_DB_FILE,
};
use chainfn::{
    debug_with_client, DebugOptions, FunctionConfig, FunctionContext, QueryClient, Workspace,
};
use tempfile::TempDir;

/// Test that a debug run creates every fixed path the layout promises
#[test]
fn test_debug_run_materialises_the_fixed_layout() {
    let dir = TempDir::new().unwrap();
    let inputs = dir.path().join("inputs");
    let data = dir.path().join("data");
    let outputs = dir.path().join("outputs");

    let ws = debug_with_client(
        |_ctx: &FunctionContext, _ws: &Workspace, _client: &dyn QueryClient| Ok(()),
        DebugOptions::new()
            .inputs_dir(&inputs)
            .data_dir(&data)
            .outputs_dir(&outputs)
            .block_number(1)
            .block_hash("0x1"),
        &UnusedClient,
    )
    .unwrap();

    assert_eq!(ws.persistent_path(), data.join(PERSISTENT_DB_FILE));
    assert_eq!(ws.input_path(), inputs.join(INPUT_DB_FILE));
    assert_eq!(ws.output_path(), outputs.join(OUTPUT_DB_FILE));

    assert!(data.join(PERSISTENT_DB_FILE).exists());
    assert!(data.join(LOCK_FILE).exists());
    assert!(outputs.join(OUTPUT_DB_FILE).exists());
}

#[test]
fn test_lock_path_lives_in_the_data_directory() {
    let config = FunctionConfig {
        data_dir: "/var/lib/fn/data".into(),
        ..FunctionConfig::default()
    };
    assert_eq!(
        lock_path(&config),
        std::path::Path::new("/var/lib/fn/data").join(LOCK_FILE)
    );
}

#[test]
fn test_directory_tree_creation_is_idempotent_across_runs() {
    let dir = TempDir::new().unwrap();
    let config = FunctionConfig {
        inputs_dir: dir.path().join("inputs"),
        data_dir: dir.path().join("data"),
        outputs_dir: dir.path().join("outputs"),
        ..FunctionConfig::default()
    };

    ensure_directories(&config).unwrap();
    std::fs::write(config.inputs_dir.join("seed.txt"), "seed").unwrap();
    ensure_directories(&config).unwrap();
    assert_eq!(
        std::fs::read_to_string(config.inputs_dir.join("seed.txt")).unwrap(),
        "seed"
    );
}
