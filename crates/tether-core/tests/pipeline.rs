//! End-to-end runs against a mock repository and a temporary working directory.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use mockito::Server;
use tempfile::TempDir;
use tether_core::relocate::{
    ArchiveRelocator, ENGINE_ENTRY_POINT, EngineLoader, RewriteEngine,
};
use tether_core::{
    Artifact, ErrorKind, Namespace, NamespaceLoader, Pipeline, Reporter, Status,
};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

#[derive(Default)]
struct Recorder {
    statuses: Mutex<Vec<Status>>,
    loaded: Mutex<Vec<String>>,
    relocating: Mutex<Vec<String>>,
    failed: Mutex<Vec<String>>,
}

impl Recorder {
    fn statuses(&self) -> Vec<Status> {
        self.statuses.lock().unwrap().clone()
    }

    fn loaded_names(&self) -> Vec<String> {
        self.loaded.lock().unwrap().clone()
    }
}

impl Reporter for Recorder {
    fn status(&self, status: Status) {
        self.statuses.lock().unwrap().push(status);
    }
    fn downloading(&self, _: &Artifact, _: u64, _: Option<u64>) {}
    fn relocating(&self, artifact: &Artifact) {
        self.relocating.lock().unwrap().push(artifact.to_string());
    }
    fn loaded(&self, artifact: &Artifact, _: &Path) {
        self.loaded
            .lock()
            .unwrap()
            .push(artifact.cache_file_name().to_string());
    }
    fn failed(&self, artifact: &Artifact, _: &str) {
        self.failed.lock().unwrap().push(artifact.to_string());
    }
}

struct CountingLoader(Arc<AtomicUsize>);

impl EngineLoader for CountingLoader {
    fn load(&self, namespace: &NamespaceLoader) -> anyhow::Result<Arc<dyn RewriteEngine>> {
        self.0.fetch_add(1, Ordering::SeqCst);
        anyhow::ensure!(
            namespace.locate(ENGINE_ENTRY_POINT).is_some(),
            "engine missing"
        );
        Ok(Arc::new(ArchiveRelocator))
    }
}

/// Host that refuses every archive.
struct RejectingHost;

impl Namespace for RejectingHost {
    fn register(&self, path: &Path) -> tether_core::Result<()> {
        Err(tether_core::Error::load(format!(
            "refused {}",
            path.display()
        )))
    }
    fn locate(&self, _: &str) -> Option<PathBuf> {
        None
    }
}

fn jar_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

fn write_jar(path: &Path, entries: &[(&str, &[u8])]) {
    File::create(path)
        .unwrap()
        .write_all(&jar_bytes(entries))
        .unwrap();
}

fn read_entries(path: &Path) -> BTreeMap<String, Vec<u8>> {
    let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut out = BTreeMap::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).unwrap();
        let mut data = Vec::new();
        entry.read_to_end(&mut data).unwrap();
        out.insert(entry.name().to_string(), data);
    }
    out
}

/// Class file `name extends java/lang/Object` with an empty body.
fn class_bytes(name: &str) -> Vec<u8> {
    let mut out = vec![0xCA, 0xFE, 0xBA, 0xBE, 0, 0, 0, 52, 0, 5];
    for (i, s) in [name, "java/lang/Object"].into_iter().enumerate() {
        out.push(1);
        out.extend_from_slice(&(s.len() as u16).to_be_bytes());
        out.extend_from_slice(s.as_bytes());
        // Class entry pointing at the UTF-8 entry just written.
        out.extend_from_slice(&[7, 0, (2 * i + 1) as u8]);
    }
    out.extend_from_slice(&[0x00, 0x21, 0, 2, 0, 4, 0, 0, 0, 0, 0, 0, 0, 0]);
    out
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// A local stand-in for the rewrite engine's bootstrap artifact.
fn engine_artifact(dir: &Path) -> Artifact {
    let engine = Artifact::url("engine", "1.5", "http://127.0.0.1:1/engine.jar").with_priority(-1);
    write_jar(
        &dir.join(engine.cache_file_name()),
        &[(
            "me/lucko/jarrelocator/JarRelocator.class",
            &class_bytes("me/lucko/jarrelocator/JarRelocator"),
        )],
    );
    engine
}

fn offline_pipeline(dir: &Path, reporter: Arc<Recorder>) -> Pipeline {
    Pipeline::builder(dir)
        .clear_repositories()
        .repository("http://127.0.0.1:1/")
        .reporter(reporter)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_second_run_makes_no_requests() {
    let mut server = Server::new_async().await;
    let coordinate = server
        .mock("GET", "/com/example/lib/1.0/lib-1.0.jar")
        .with_status(200)
        .with_body(jar_bytes(&[("com/example/Lib.class", &class_bytes("com/example/Lib"))]))
        .expect(2)
        .create_async()
        .await;
    let direct = server
        .mock("GET", "/tool.jar")
        .with_status(200)
        .with_body(jar_bytes(&[("tool/Main.class", &class_bytes("tool/Main"))]))
        .expect(1)
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let artifacts = vec![
        Artifact::maven("com.example", "lib", "1.0"),
        Artifact::url("tool", "2.0", format!("{}/tool.jar", server.url())),
    ];
    let build = || {
        Pipeline::builder(dir.path())
            .clear_repositories()
            .repository(&server.url())
            .build()
            .unwrap()
    };

    let first = build();
    let first_result = first.run(artifacts.clone()).await.unwrap();
    let second = build();
    let second_result = second.run(artifacts).await.unwrap();

    coordinate.assert_async().await;
    direct.assert_async().await;

    let names = |v: &[Artifact]| -> Vec<String> {
        v.iter().map(|a| a.cache_file_name().to_string()).collect()
    };
    assert_eq!(names(&first_result), names(&second_result));
    assert_eq!(names(&second_result), ["lib-1.0.jar", "tool-2.0.jar"]);
    assert!(second.host().locate("tool.Main").is_some());
}

#[tokio::test]
async fn test_registration_follows_priority_with_stable_ties() {
    let dir = TempDir::new().unwrap();
    let specs = [("late-a", 5), ("first", -1), ("late-b", 5), ("middle", 3)];
    let mut artifacts = Vec::new();
    for (name, priority) in specs {
        let artifact = Artifact::url(name, "1", "http://127.0.0.1:1/unused.jar")
            .with_priority(priority);
        write_jar(&dir.path().join(artifact.cache_file_name()), &[("x.txt", b"x")]);
        artifacts.push(artifact);
    }

    let recorder = Arc::new(Recorder::default());
    let pipeline = offline_pipeline(dir.path(), Arc::clone(&recorder));
    let result = pipeline.run(artifacts).await.unwrap();

    let expected = ["first-1.jar", "middle-1.jar", "late-a-1.jar", "late-b-1.jar"];
    assert_eq!(recorder.loaded_names(), expected);
    assert_eq!(
        result
            .iter()
            .map(|a| a.cache_file_name())
            .collect::<Vec<_>>(),
        expected
    );
    // Everything was cached: no download or relocation stage.
    assert_eq!(
        recorder.statuses(),
        [Status::Starting, Status::Loading, Status::Finished]
    );
}

#[tokio::test]
async fn test_existing_shadow_is_reused_without_engine() {
    let dir = TempDir::new().unwrap();
    let loads = Arc::new(AtomicUsize::new(0));
    let recorder = Arc::new(Recorder::default());

    let artifact = Artifact::url("lib", "1.0", "http://127.0.0.1:1/lib.jar")
        .with_relocation("com.example", "shaded.example")
        .unwrap();
    // Only the shadow exists; the raw file was deleted after relocation.
    write_jar(
        &dir.path().join(artifact.shadow_file_name()),
        &[("shaded/example/Lib.class", &class_bytes("shaded/example/Lib"))],
    );

    let pipeline = Pipeline::builder(dir.path())
        .clear_repositories()
        .reporter(recorder.clone())
        .engine_loader(Arc::new(CountingLoader(Arc::clone(&loads))))
        .build()
        .unwrap();
    let result = pipeline.run(vec![artifact]).await.unwrap();

    assert_eq!(loads.load(Ordering::SeqCst), 0);
    assert!(result[0].is_relocated());
    assert_eq!(result[0].cache_file_name(), "lib-1.0-relocated.jar");
    assert_eq!(recorder.loaded_names(), ["lib-1.0-relocated.jar"]);
    assert!(recorder.relocating.lock().unwrap().is_empty());
    assert_eq!(
        recorder.statuses(),
        [Status::Starting, Status::Loading, Status::Finished]
    );
    assert!(!pipeline.relocator().is_bootstrapped());
}

#[tokio::test]
async fn test_download_and_relocate_end_to_end() {
    let mut server = Server::new_async().await;
    let _lib = server
        .mock("GET", "/lib.jar")
        .with_status(200)
        .with_body(jar_bytes(&[
            ("com/example/Lib.class", &class_bytes("com/example/Lib")),
            ("META-INF/services/com.example.Spi", b"com.example.Lib\n"),
            ("META-INF/LIB.SF", b"signature"),
        ]))
        .expect(1)
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let recorder = Arc::new(Recorder::default());
    let loads = Arc::new(AtomicUsize::new(0));
    let pipeline = Pipeline::builder(dir.path())
        .clear_repositories()
        .reporter(recorder.clone())
        .engine_loader(Arc::new(CountingLoader(Arc::clone(&loads))))
        .bootstrap(vec![engine_artifact(dir.path())])
        .build()
        .unwrap();

    let artifact = Artifact::url("lib", "1.0", format!("{}/lib.jar", server.url()))
        .with_relocation("com.example", "shaded.example")
        .unwrap();
    let result = pipeline.run(vec![artifact]).await.unwrap();

    assert_eq!(
        recorder.statuses(),
        [
            Status::Starting,
            Status::Downloading,
            Status::Relocating,
            Status::Loading,
            Status::Finished
        ]
    );
    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert_eq!(result[0].cache_file_name(), "lib-1.0-relocated.jar");

    // Raw file removed, shadow rewritten.
    assert!(!dir.path().join("lib-1.0.jar").exists());
    let entries = read_entries(&dir.path().join("lib-1.0-relocated.jar"));
    assert!(contains(
        &entries["shaded/example/Lib.class"],
        b"shaded/example/Lib"
    ));
    assert_eq!(
        entries["META-INF/services/shaded.example.Spi"],
        b"shaded.example.Lib\n"
    );
    assert!(!entries.contains_key("META-INF/LIB.SF"));

    // The host sees the relocated classes but never the engine.
    let host = pipeline.host();
    assert!(host.locate("shaded.example.Lib").is_some());
    assert_eq!(host.locate("com.example.Lib"), None);
    assert_eq!(host.locate(ENGINE_ENTRY_POINT), None);
    assert!(
        pipeline
            .relocator()
            .namespace()
            .locate(ENGINE_ENTRY_POINT)
            .is_some()
    );
}

#[tokio::test]
async fn test_keep_raw_when_delete_disabled() {
    let dir = TempDir::new().unwrap();
    let artifact = Artifact::url("lib", "1.0", "http://127.0.0.1:1/lib.jar")
        .with_relocation("com.example", "x.y")
        .unwrap();
    write_jar(
        &dir.path().join("lib-1.0.jar"),
        &[("com/example/Lib.class", &class_bytes("com/example/Lib"))],
    );

    let pipeline = Pipeline::builder(dir.path())
        .clear_repositories()
        .delete_on_relocate(false)
        .bootstrap(vec![engine_artifact(dir.path())])
        .build()
        .unwrap();
    pipeline.run(vec![artifact]).await.unwrap();

    assert!(dir.path().join("lib-1.0.jar").exists());
    assert!(dir.path().join("lib-1.0-relocated.jar").exists());
}

#[tokio::test]
async fn test_raw_without_shadow_is_relocated_offline() {
    let dir = TempDir::new().unwrap();
    let recorder = Arc::new(Recorder::default());
    let artifact = Artifact::url("lib", "1.0", "http://127.0.0.1:1/lib.jar")
        .with_relocation("com.example", "x.y")
        .unwrap();
    write_jar(
        &dir.path().join("lib-1.0.jar"),
        &[("com/example/Lib.class", &class_bytes("com/example/Lib"))],
    );

    let pipeline = Pipeline::builder(dir.path())
        .clear_repositories()
        .reporter(recorder.clone())
        .bootstrap(vec![engine_artifact(dir.path())])
        .build()
        .unwrap();
    let result = pipeline.run(vec![artifact]).await.unwrap();

    assert!(result[0].is_relocated());
    assert_eq!(recorder.relocating.lock().unwrap().len(), 1);
    assert!(pipeline.host().locate("x.y.Lib").is_some());
}

#[tokio::test]
async fn test_failure_stops_the_run() {
    let mut server = Server::new_async().await;
    let _broken = server
        .mock("GET", mockito::Matcher::Any)
        .with_status(500)
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let good = Artifact::url("good", "1", "http://127.0.0.1:1/good.jar").with_priority(1);
    write_jar(&dir.path().join("good-1.jar"), &[("good/Good.class", b"")]);

    let recorder = Arc::new(Recorder::default());
    let pipeline = Pipeline::builder(dir.path())
        .clear_repositories()
        .repository(&server.url())
        .reporter(recorder.clone())
        .build()
        .unwrap();

    let err = pipeline
        .run(vec![good, Artifact::maven("com.example", "missing", "1.0")])
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Resolve);
    assert_eq!(
        recorder.statuses(),
        [Status::Starting, Status::Downloading, Status::Failed]
    );
    assert_eq!(*recorder.failed.lock().unwrap(), ["com.example:missing:1.0"]);
    // Registration never started, not even for the cached artifact.
    assert!(recorder.loaded_names().is_empty());
    assert_eq!(pipeline.host().locate("good.Good"), None);
}

#[tokio::test]
async fn test_registration_failure_is_load_failure() {
    let dir = TempDir::new().unwrap();
    let artifact = Artifact::url("lib", "1", "http://127.0.0.1:1/lib.jar");
    write_jar(&dir.path().join("lib-1.jar"), &[("x.txt", b"x")]);

    let recorder = Arc::new(Recorder::default());
    let pipeline = Pipeline::builder(dir.path())
        .clear_repositories()
        .reporter(recorder.clone())
        .host(Arc::new(RejectingHost))
        .build()
        .unwrap();

    let err = pipeline.run(vec![artifact]).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Load);
    assert_eq!(
        recorder.statuses(),
        [Status::Starting, Status::Loading, Status::Failed]
    );
}

#[tokio::test]
async fn test_name_escaping_working_directory_is_refused() {
    let mut server = Server::new_async().await;
    let download = server
        .mock("GET", "/escaped.jar")
        .with_status(200)
        .with_body(jar_bytes(&[("e/E.class", b"")]))
        .expect(0)
        .create_async()
        .await;

    let root = TempDir::new().unwrap();
    let libs = root.path().join("libs");
    let recorder = Arc::new(Recorder::default());
    let pipeline = offline_pipeline(&libs, recorder.clone());

    let escaping = Artifact::url("../escaped", "1", format!("{}/escaped.jar", server.url()));
    let err = pipeline.run(vec![escaping]).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Download);
    assert_eq!(recorder.statuses(), [Status::Starting, Status::Failed]);
    assert!(!root.path().join("escaped-1.jar").exists());
    download.assert_async().await;
}

#[tokio::test]
async fn test_floating_version_end_to_end() {
    let mut server = Server::new_async().await;
    let _metadata = server
        .mock("GET", "/dev/example/foo/1.0-SNAPSHOT/maven-metadata.xml")
        .with_status(200)
        .with_body(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<metadata>
  <groupId>dev.example</groupId>
  <artifactId>foo</artifactId>
  <versioning>
    <snapshot>
      <timestamp>20240101.010101</timestamp>
      <buildNumber>7</buildNumber>
    </snapshot>
  </versioning>
</metadata>"#,
        )
        .create_async()
        .await;
    let jar = server
        .mock(
            "GET",
            "/dev/example/foo/1.0-SNAPSHOT/foo-1.0-20240101.010101-7.jar",
        )
        .with_status(200)
        .with_body(jar_bytes(&[("dev/example/Foo.class", &class_bytes("dev/example/Foo"))]))
        .expect(1)
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let pipeline = Pipeline::builder(dir.path())
        .clear_repositories()
        .repository(&server.url())
        .build()
        .unwrap();
    let result = pipeline
        .run(vec![Artifact::maven("dev.example", "foo", "1.0-SNAPSHOT")])
        .await
        .unwrap();

    jar.assert_async().await;
    assert_eq!(result[0].cache_file_name(), "foo-1.0-SNAPSHOT.jar");
    assert!(dir.path().join("foo-1.0-SNAPSHOT.jar").exists());
    assert!(pipeline.host().locate("dev.example.Foo").is_some());
}

#[tokio::test]
async fn test_spawned_run_completes_in_background() {
    let dir = TempDir::new().unwrap();
    let artifact = Artifact::url("bg", "1", "http://127.0.0.1:1/bg.jar");
    write_jar(&dir.path().join("bg-1.jar"), &[("bg/Task.class", b"")]);

    let recorder = Arc::new(Recorder::default());
    let pipeline = Arc::new(offline_pipeline(dir.path(), recorder.clone()));
    let handle = pipeline.spawn(vec![artifact]);

    let result = handle.await.unwrap().unwrap();
    assert_eq!(result.len(), 1);
    assert_eq!(recorder.statuses().last(), Some(&Status::Finished));
    assert!(pipeline.host().locate("bg.Task").is_some());
}

#[tokio::test]
async fn test_spawned_run_downloads_and_relocates() {
    let mut server = Server::new_async().await;
    let _lib = server
        .mock("GET", "/job.jar")
        .with_status(200)
        .with_body(jar_bytes(&[(
            "com/example/Job.class",
            &class_bytes("com/example/Job"),
        )]))
        .expect(1)
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let recorder = Arc::new(Recorder::default());
    let pipeline = Arc::new(
        Pipeline::builder(dir.path())
            .clear_repositories()
            .reporter(recorder.clone())
            .engine_loader(Arc::new(CountingLoader(Arc::new(AtomicUsize::new(0)))))
            .bootstrap(vec![engine_artifact(dir.path())])
            .build()
            .unwrap(),
    );

    let artifact = Artifact::url("job", "1", format!("{}/job.jar", server.url()))
        .with_relocation("com.example", "shaded.example")
        .unwrap();
    let result = pipeline.spawn(vec![artifact]).await.unwrap().unwrap();

    assert_eq!(result[0].cache_file_name(), "job-1-relocated.jar");
    assert_eq!(recorder.loaded_names(), ["job-1-relocated.jar"]);
    assert!(pipeline.host().locate("shaded.example.Job").is_some());
}

#[tokio::test]
async fn test_child_namespace_prefers_its_own_archives() {
    let dir = TempDir::new().unwrap();
    let parent_jar = dir.path().join("parent.jar");
    write_jar(&parent_jar, &[("api/Shared.class", b""), ("api/Parent.class", b"")]);
    write_jar(&dir.path().join("child-1.jar"), &[("api/Shared.class", b"")]);

    let parent = Arc::new(NamespaceLoader::new());
    parent.register(&parent_jar).unwrap();
    let child = Arc::new(NamespaceLoader::with_parent(parent.clone()));

    let pipeline = Pipeline::builder(dir.path())
        .clear_repositories()
        .host(child.clone())
        .build()
        .unwrap();
    pipeline
        .run(vec![Artifact::url("child", "1", "http://127.0.0.1:1/child.jar")])
        .await
        .unwrap();

    assert!(child.locate("api.Shared").unwrap().ends_with("child-1.jar"));
    assert!(child.locate("api.Parent").unwrap().ends_with("parent.jar"));
    assert_eq!(child.paths().len(), 1);
}
