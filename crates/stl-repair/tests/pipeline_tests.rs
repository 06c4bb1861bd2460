//! Pipeline tests against the mock and built-in hosts.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use clap::Parser;
use mesh_host::stl::{read_stl, write_binary_stl};
use mesh_host::{
    HostCall, MeshHandle, MockHost, NativeHost, RepairOp, RepairSettings, TriMesh,
};
use stl_repair::{
    logging, repair_batch, repair_file, Cli, PipelineOptions, RepairJob, StlRepairError,
};

fn touch(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, b"solid placeholder\nendsolid placeholder\n").unwrap();
    path
}

/// Two triangles sharing an edge; one copy of (1,0,0) is off by 5e-5.
fn write_pair(dir: &Path, name: &str) -> PathBuf {
    let soup = TriMesh {
        positions: vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [1.000_05, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
        ],
        triangles: vec![[0, 1, 2], [3, 4, 5]],
    };
    let path = dir.join(name);
    fs::write(&path, write_binary_stl(&soup, "pair").unwrap()).unwrap();
    path
}

fn job(input: &Path) -> RepairJob {
    RepairJob {
        input: input.to_path_buf(),
        output: input.with_file_name("out_fixed.stl"),
    }
}

#[test]
fn operations_run_in_fixed_order() {
    let dir = tempfile::tempdir().unwrap();
    let input = touch(dir.path(), "part.stl");
    let job = job(&input);
    let mut host = MockHost::new().with_advanced_repair();

    let report = repair_file(&mut host, &job, &PipelineOptions::default()).unwrap();

    assert!(report.advanced_used);
    assert_eq!(report.host, "mock");
    assert_eq!(
        host.calls(),
        &[
            HostCall::Import(input.clone()),
            HostCall::Repair(RepairOp::MergeVertices),
            HostCall::Repair(RepairOp::FillHoles),
            HostCall::Repair(RepairOp::RecomputeNormals),
            HostCall::Repair(RepairOp::AdvancedRepair),
            HostCall::Export(job.output.clone()),
            HostCall::Stats,
            HostCall::Release,
        ]
    );
}

#[test]
fn force_basic_never_runs_advanced_repair() {
    let dir = tempfile::tempdir().unwrap();
    let input = touch(dir.path(), "part.stl");
    let mut host = MockHost::new().with_advanced_repair();
    let options = PipelineOptions {
        force_basic: true,
        ..PipelineOptions::default()
    };

    let report = repair_file(&mut host, &job(&input), &options).unwrap();

    assert!(!report.advanced_used);
    assert!(!host.called(RepairOp::AdvancedRepair));
    assert!(host.called(RepairOp::RecomputeNormals));
    assert!(host.exported());
}

#[test]
fn missing_addon_falls_back_to_basic_operations() {
    let dir = tempfile::tempdir().unwrap();
    let input = touch(dir.path(), "part.stl");
    let mut host = MockHost::new();

    let report = repair_file(&mut host, &job(&input), &PipelineOptions::default()).unwrap();

    assert!(!report.advanced_used);
    assert!(!host.called(RepairOp::AdvancedRepair));
    assert!(host.exported());
}

#[test]
fn center_runs_after_repairs_when_requested() {
    let dir = tempfile::tempdir().unwrap();
    let input = touch(dir.path(), "part.stl");
    let mut host = MockHost::new();
    let options = PipelineOptions {
        settings: RepairSettings {
            center: true,
            ..RepairSettings::default()
        },
        ..PipelineOptions::default()
    };

    repair_file(&mut host, &job(&input), &options).unwrap();

    let calls = host.calls();
    let center = calls
        .iter()
        .position(|c| *c == HostCall::Repair(RepairOp::Center))
        .unwrap();
    let export = calls
        .iter()
        .position(|c| matches!(c, HostCall::Export(_)))
        .unwrap();
    assert!(center < export);
}

#[test]
fn missing_input_is_load_error_without_export() {
    let dir = tempfile::tempdir().unwrap();
    let mut host = MockHost::new();
    let job = job(&dir.path().join("absent.stl"));

    let err = repair_file(&mut host, &job, &PipelineOptions::default()).unwrap_err();

    assert!(matches!(err, StlRepairError::Load { .. }));
    assert_eq!(err.exit_code(), 1);
    assert!(!host.exported());
    assert!(!job.output.exists());
}

#[test]
fn existing_output_is_refused_without_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let input = touch(dir.path(), "part.stl");
    let job = job(&input);
    fs::write(&job.output, b"keep me").unwrap();
    let mut host = MockHost::new();

    let err = repair_file(&mut host, &job, &PipelineOptions::default()).unwrap_err();

    assert_eq!(err.kind(), "ExportError");
    assert!(host.calls().is_empty());
    assert_eq!(fs::read(&job.output).unwrap(), b"keep me");

    let options = PipelineOptions {
        overwrite: true,
        ..PipelineOptions::default()
    };
    repair_file(&mut host, &job, &options).unwrap();
    assert!(host.exported());
}

#[test]
fn host_fault_is_repair_error() {
    let dir = tempfile::tempdir().unwrap();
    let input = touch(dir.path(), "part.stl");
    let mut host = MockHost::new().failing(RepairOp::FillHoles);

    let err = repair_file(&mut host, &job(&input), &PipelineOptions::default()).unwrap_err();

    match &err {
        StlRepairError::Repair { path, reason } => {
            assert_eq!(path, &input);
            assert!(reason.contains("fill_holes"), "{reason}");
        }
        other => panic!("unexpected: {other:?}"),
    }
    assert_eq!(err.exit_code(), 3);
    assert!(!host.called(RepairOp::RecomputeNormals));
    assert!(!host.exported());
}

#[test]
fn failed_export_is_export_error() {
    let dir = tempfile::tempdir().unwrap();
    let input = touch(dir.path(), "part.stl");
    let mut host = MockHost::new().failing_export();

    let err = repair_file(&mut host, &job(&input), &PipelineOptions::default()).unwrap_err();

    assert!(matches!(err, StlRepairError::Export { .. }));
    assert_eq!(err.exit_code(), 4);
}

#[test]
fn batch_stops_at_first_failure() {
    let dir = tempfile::tempdir().unwrap();
    let first = touch(dir.path(), "a.stl");
    let third = touch(dir.path(), "c.stl");
    let jobs = vec![
        RepairJob {
            output: dir.path().join("a_fixed.stl"),
            input: first,
        },
        RepairJob {
            input: dir.path().join("b.stl"),
            output: dir.path().join("b_fixed.stl"),
        },
        RepairJob {
            output: dir.path().join("c_fixed.stl"),
            input: third.clone(),
        },
    ];
    let mut host = MockHost::new();

    let err = repair_batch(&mut host, &jobs, &PipelineOptions::default()).unwrap_err();

    assert!(matches!(err, StlRepairError::Load { .. }));
    assert!(!host.calls().contains(&HostCall::Import(third)));
}

#[test]
fn mesh_is_released_when_a_step_fails() {
    let dir = tempfile::tempdir().unwrap();
    let input = touch(dir.path(), "part.stl");
    let mut host = MockHost::new().failing(RepairOp::RecomputeNormals);

    repair_file(&mut host, &job(&input), &PipelineOptions::default()).unwrap_err();

    assert_eq!(host.open_meshes(), 0);
    assert_eq!(host.calls().last(), Some(&HostCall::Release));
}

#[test]
fn batch_holds_no_meshes_afterwards() {
    let dir = tempfile::tempdir().unwrap();
    let jobs: Vec<RepairJob> = ["a", "b", "c"]
        .iter()
        .map(|name| RepairJob {
            input: write_pair(dir.path(), &format!("{name}.stl")),
            output: dir.path().join(format!("{name}_fixed.stl")),
        })
        .collect();
    let mut host = NativeHost::new();

    let reports = repair_batch(&mut host, &jobs, &PipelineOptions::default()).unwrap();

    assert_eq!(reports.len(), 3);
    for h in 1..=3 {
        assert!(host.mesh(MeshHandle(h)).is_none(), "mesh#{h} still held");
    }
}

// ── logging ─────────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn logged_lines(verbosity: u8) -> usize {
    let dir = tempfile::tempdir().unwrap();
    let input = touch(dir.path(), "part.stl");
    let sink = Captured::default();
    let writer = sink.clone();
    let subscriber = logging::subscriber(
        logging::level_for(verbosity),
        move || writer.clone(),
        false,
        None,
    );

    tracing::subscriber::with_default(subscriber, || {
        let mut host = MockHost::new();
        repair_file(&mut host, &job(&input), &PipelineOptions::default()).unwrap();
    });

    let bytes = sink.0.lock().unwrap().clone();
    String::from_utf8(bytes).unwrap().lines().count()
}

#[test]
fn verbosity_zero_is_silent() {
    assert_eq!(logged_lines(0), 0);
}

#[test]
fn higher_verbosity_logs_more() {
    let quiet = logged_lines(1);
    let normal = logged_lines(2);
    let loud = logged_lines(3);
    assert!(normal > 0);
    assert!(normal >= quiet);
    assert!(loud >= normal);
}

#[test]
fn log_file_gets_plain_timestamped_lines() {
    let dir = tempfile::tempdir().unwrap();
    let input = touch(dir.path(), "part.stl");
    let job = job(&input);
    let log_path = dir.path().join("out_fixed.log");
    let file = fs::File::create(&log_path).unwrap();
    let subscriber = logging::subscriber(logging::level_for(2), io::sink, true, Some(file));

    tracing::subscriber::with_default(subscriber, || {
        let mut host = MockHost::new();
        repair_file(&mut host, &job, &PipelineOptions::default()).unwrap();
    });

    let contents = fs::read_to_string(&log_path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert!(!lines.is_empty());
    assert!(!contents.contains('\u{1b}'), "ANSI escapes in log file");
    for line in &lines {
        // RFC 3339 timestamp, e.g. 2026-01-31T12:00:00.000000Z
        let stamp = line.split_whitespace().next().unwrap();
        assert!(stamp.as_bytes()[0].is_ascii_digit(), "{line}");
        assert!(stamp.contains('T'), "{line}");
    }
    assert!(contents.contains("Repaired file saved"));
}

// ── end to end ──────────────────────────────────────────────────────────────

#[test]
fn native_run_deduplicates_near_coincident_vertices() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_pair(dir.path(), "pair.stl");
    assert_eq!(read_stl(&input).unwrap().vertex_count(), 5);

    let args: Vec<OsString> = vec![
        "stl-repair".into(),
        input.clone().into_os_string(),
        "--host".into(),
        "native".into(),
    ];
    let cli = Cli::try_parse_from(args).unwrap();
    let jobs = cli.jobs().unwrap();
    let reports = stl_repair::run(&cli, &jobs).unwrap();

    let output = dir.path().join("pair_fixed.stl");
    assert_eq!(reports[0].output, output);
    let repaired = read_stl(&output).unwrap();
    assert_eq!(repaired.vertex_count(), 4);
    assert_eq!(repaired.triangle_count(), 2);
    let stats = reports[0].stats.unwrap();
    assert_eq!(stats.vertices, 4);
    assert_eq!(stats.boundary_edges, 4);
}
