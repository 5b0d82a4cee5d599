//! Host collaborators wired into a real engine over temp directories

use galaxy_engine::{
    BridgeRequest, Capabilities, ChannelTransport, Dialect, EngineConfig, InMemoryScene, InvocationDescriptor,
    KeyValueStore, MacroEngine, PathSource, RemoteBridge, SceneAccessor, TaskId,
};
use galaxy_host::{spawn_bridge_host, DirStore, FsPaths, SceneFile, SubprocessRunner, TerminalPrompt};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

fn python_available() -> bool {
    std::process::Command::new("python3")
        .arg("--version")
        .output()
        .is_ok_and(|output| output.status.success())
}

/// `/docs` → `out` through an arrow labelled `label`
fn scene_json(label: &str) -> serde_json::Value {
    json!({
        "type": "excalidraw",
        "elements": [
            { "id": "docs", "type": "text", "text": "/docs", "width": 200.0,
              "boundElements": [{ "id": "e", "type": "arrow" }] },
            { "id": "out", "type": "text", "text": "", "width": 200.0,
              "boundElements": [{ "id": "e", "type": "arrow" }] },
            { "id": "e", "type": "arrow",
              "startBinding": { "elementId": "docs" }, "endBinding": { "elementId": "out" },
              "boundElements": [{ "id": "e-label", "type": "text" }] },
            { "id": "e-label", "type": "text", "text": label }
        ]
    })
}

#[tokio::test]
async fn list_dir_sorts_and_flags_directories() {
    let root = TempDir::new().unwrap();
    std::fs::create_dir_all(root.path().join("docs/sub")).unwrap();
    std::fs::write(root.path().join("docs/b.md"), "b").unwrap();
    std::fs::write(root.path().join("docs/a.md"), "a").unwrap();

    let paths = FsPaths::new(root.path());
    let entries = paths.list_dir("/docs").await.unwrap();
    let names: Vec<(&str, bool)> = entries.iter().map(|e| (e.name.as_str(), e.is_dir)).collect();
    assert_eq!(names, vec![("a.md", false), ("b.md", false), ("sub", true)]);

    let err = paths.read_file("/docs/missing.txt").await.unwrap_err();
    assert_eq!(err.kind, galaxy_engine::CollabErrorKind::Failed);
}

#[tokio::test]
async fn paths_cannot_leave_the_root() {
    let outer = TempDir::new().unwrap();
    std::fs::write(outer.path().join("secret.txt"), "hidden").unwrap();
    std::fs::create_dir_all(outer.path().join("canvas/docs")).unwrap();
    std::fs::write(outer.path().join("canvas/docs/a.md"), "a").unwrap();

    let paths = FsPaths::new(outer.path().join("canvas"));
    assert_eq!(paths.read_file("/docs/./a.md").await.unwrap(), "a");

    let err = paths.read_file("/../secret.txt").await.unwrap_err();
    assert_eq!(err.kind, galaxy_engine::CollabErrorKind::Failed);
    assert!(err.to_string().contains("escapes"));
    assert!(paths.list_dir("/docs/../..").await.is_err());
}

#[tokio::test]
async fn dir_store_reads_back_and_misses() {
    let dir = TempDir::new().unwrap();
    let store = DirStore::new(dir.path().join("kv"));
    assert_eq!(store.get("scene").await.unwrap(), None);
    store.put("scene", b"[1,2]".to_vec()).await.unwrap();
    assert_eq!(store.get("scene").await.unwrap(), Some(b"[1,2]".to_vec()));
}

#[tokio::test]
async fn cat_over_scene_file_writes_result_back() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("docs")).unwrap();
    std::fs::write(dir.path().join("docs/readme.txt"), "hello from disk").unwrap();
    let scene_path = dir.path().join("scene.json");
    std::fs::write(&scene_path, scene_json("/readme.txt").to_string()).unwrap();

    let mut file = SceneFile::load(&scene_path).await.unwrap();
    let canvas = Arc::new(InMemoryScene::new(std::mem::take(&mut file.elements)));
    canvas.select(["docs"]);
    let engine = MacroEngine::new(EngineConfig::default(), canvas.clone())
        .with_capabilities(Capabilities::new().with_paths(Arc::new(FsPaths::new(dir.path()))));

    let report = engine.invoke_selected("cat").await;
    assert!(report.is_success(), "{:?}", report.failed);

    file.elements = canvas.elements();
    file.save(&scene_path).await.unwrap();
    let written: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&scene_path).unwrap()).unwrap();
    assert_eq!(written["type"], json!("excalidraw"));
    assert_eq!(written["elements"][1]["text"], json!("hello from disk"));
}

#[tokio::test]
async fn save_goes_to_store_directory() {
    let dir = TempDir::new().unwrap();
    let store = DirStore::new(dir.path());
    let canvas = Arc::new(InMemoryScene::new(
        SceneFile::parse(&scene_json("").to_string(), dir.path()).unwrap().elements,
    ));
    let engine = MacroEngine::new(EngineConfig::default(), canvas.clone()).with_capabilities(
        Capabilities::new()
            .with_prompt(Arc::new(TerminalPrompt::new(["notes".to_string()], false)))
            .with_kv(Arc::new(store.clone())),
    );

    let report = engine
        .invoke("save", &[InvocationDescriptor::new("save", "docs", "out")])
        .await;
    assert!(report.is_success(), "{:?}", report.failed);
    let saved: serde_json::Value = serde_json::from_slice(&std::fs::read(store.file_for("notes")).unwrap()).unwrap();
    assert_eq!(saved[0]["id"], json!("docs"));
}

#[tokio::test]
async fn python_subprocess_round_trip() {
    if !python_available() {
        return;
    }
    let runner = SubprocessRunner::new();
    let reply = runner
        .run(&BridgeRequest {
            task_id: TaskId::new(),
            dialect: Dialect::Python,
            code: "def f(x):\n    return x.upper()\n\nprint(f(\"abc\"))".to_string(),
            input: serde_json::Value::Null,
        })
        .await;
    assert!(reply.success, "{:?}", reply.error);
    assert_eq!(reply.data, Some(json!("ABC")));

    let reply = runner
        .run(&BridgeRequest {
            task_id: TaskId::new(),
            dialect: Dialect::Python,
            code: "import sys\nsys.stderr.write('boom')".to_string(),
            input: serde_json::Value::Null,
        })
        .await;
    assert!(!reply.success);
    assert_eq!(reply.error.as_deref(), Some("boom"));
}

#[tokio::test]
async fn python_definition_through_bridge_host() {
    if !python_available() {
        return;
    }
    let elements = vec![
        galaxy_scene::Element::text("def", "def shout(text):\n    return text.upper() + '!'"),
        galaxy_scene::Element::text("a", "hey"),
        galaxy_scene::Element::text("b", ""),
    ];
    let canvas = Arc::new(InMemoryScene::new(elements));
    let (transport, requests) = ChannelTransport::new();
    let bridge = Arc::new(RemoteBridge::new(Arc::new(transport)));
    let host = spawn_bridge_host(&bridge, requests, SubprocessRunner::new());
    let engine = MacroEngine::new(EngineConfig::default(), canvas.clone()).with_bridge(bridge);

    let defined = engine
        .invoke("python", &[InvocationDescriptor::new("python", "def", "def")])
        .await;
    assert!(defined.is_success(), "{:?}", defined.failed);
    let report = engine
        .invoke("shout", &[InvocationDescriptor::new("shout", "a", "b")])
        .await;
    assert!(report.is_success(), "{:?}", report.failed);
    assert_eq!(canvas.element("b").unwrap().text_str(), "HEY!");
    host.abort();
}
