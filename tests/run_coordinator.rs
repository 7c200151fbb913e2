//! Run coordinator integration tests.
//!
//! These tests drive synthetic dumps through recording consumers and check
//! limits, lead skips, hook ordering, failure bookkeeping and fault handling.

mod common;

use std::io::Write;

use bulkdump::{
    ConsumerResult, Dialect, EntrySelector, Error, Hook, Outcome, RecordConsumer, RecordContext,
    RunConfig, RunCoordinator, RunStatistics, consumer_fn,
};

/// Consumer that records every hook call and fails on request.
#[derive(Default)]
struct Recorder {
    events: Vec<String>,
    records: Vec<String>,
    dialect: Option<Dialect>,
    fail_at: Vec<u64>,
    fault_at: Option<u64>,
    setup_fault: bool,
    finish_fault: bool,
}

impl RecordConsumer for Recorder {
    fn on_dialect(&mut self, dialect: Option<Dialect>) {
        self.dialect = dialect;
        self.events.push("dialect".into());
    }

    fn setup(&mut self, out: &mut dyn Write) -> ConsumerResult<()> {
        self.events.push("setup".into());
        if self.setup_fault {
            return Err("setup refused".into());
        }
        writeln!(out, "begin")?;
        Ok(())
    }

    fn process(
        &mut self,
        ctx: &RecordContext<'_>,
        record: &str,
        out: &mut dyn Write,
    ) -> ConsumerResult<Outcome> {
        self.events.push(format!("process {}", ctx.source()));
        if self.fault_at == Some(ctx.position()) {
            return Err(format!("cannot decode {}", ctx).into());
        }
        self.records.push(record.to_string());
        writeln!(out, "{}", ctx.source())?;
        Ok(Outcome::from(!self.fail_at.contains(&ctx.position())))
    }

    fn finish(&mut self, out: &mut dyn Write) -> ConsumerResult<()> {
        self.events.push("finish".into());
        if self.finish_fault {
            return Err("finish refused".into());
        }
        writeln!(out, "end")?;
        Ok(())
    }
}

fn flat_input(dir: &std::path::Path, name: &str, count: usize) -> std::path::PathBuf {
    common::write_file(dir, name, &common::flat_dump(count))
}

fn run(config: RunConfig, consumer: &mut Recorder) -> (bulkdump::Result<RunStatistics>, String) {
    let mut out = Vec::new();
    let result = RunCoordinator::new(config).run_to(consumer, &mut out);
    (result, String::from_utf8(out).unwrap())
}

// =============================================================================
// Limits
// =============================================================================

#[test]
fn test_record_limit() {
    let dir = common::temp_dir();
    let input = flat_input(dir.path(), "aps.txt", 10);

    let mut consumer = Recorder::default();
    let (result, _) = run(RunConfig::new(&input).max_records(5), &mut consumer);
    let stats = result.unwrap();

    assert_eq!(stats.records(), 5);
    assert_eq!(stats.successes(), 5);
    assert!(stats.is_balanced());
    assert_eq!(consumer.records.len(), 5);
}

#[test]
fn test_success_limit() {
    let dir = common::temp_dir();
    let input = flat_input(dir.path(), "aps.txt", 10);

    let mut consumer = Recorder::default();
    let (result, _) = run(RunConfig::new(&input).max_successes(2), &mut consumer);
    let stats = result.unwrap();

    assert_eq!(stats.records(), 2);
    assert_eq!(stats.successes(), 2);
}

#[test]
fn test_failure_limit() {
    let dir = common::temp_dir();
    let input = flat_input(dir.path(), "aps.txt", 10);

    let mut consumer = Recorder {
        fail_at: vec![2, 4, 6],
        ..Default::default()
    };
    let (result, _) = run(RunConfig::new(&input).max_failures(2), &mut consumer);
    let stats = result.unwrap();

    assert_eq!(stats.records(), 4);
    assert_eq!(stats.successes(), 2);
    assert_eq!(stats.failures(), 2);
    assert_eq!(stats.failed_sources(), ["aps.txt:2", "aps.txt:4"]);
}

#[test]
fn test_no_limits_reads_everything() {
    let dir = common::temp_dir();
    let input = flat_input(dir.path(), "aps.txt", 7);

    let mut consumer = Recorder {
        fail_at: vec![7],
        ..Default::default()
    };
    let (result, output) = run(RunConfig::new(&input), &mut consumer);
    let stats = result.unwrap();

    assert_eq!(stats.records(), 7);
    assert_eq!(stats.failures(), 1);
    assert!(stats.is_balanced());
    assert!(output.starts_with("begin\naps.txt:1\n"));
    assert!(output.ends_with("aps.txt:7\nend\n"));
}

// =============================================================================
// Lead skip and hooks
// =============================================================================

#[test]
fn test_lead_skip() {
    let dir = common::temp_dir();
    let input = flat_input(dir.path(), "aps.txt", 10);

    let mut consumer = Recorder::default();
    let (result, _) = run(
        RunConfig::new(&input).skip(3).max_records(2),
        &mut consumer,
    );
    let stats = result.unwrap();

    assert_eq!(stats.records(), 2);
    assert_eq!(
        consumer.events,
        [
            "dialect",
            "setup",
            "process aps.txt:4",
            "process aps.txt:5",
            "finish"
        ]
    );
    assert!(consumer.records[0].contains("WKU  00000004"));
    assert_eq!(consumer.dialect, Some(Dialect::Greenbook));
}

#[test]
fn test_skip_past_end() {
    let dir = common::temp_dir();
    let input = flat_input(dir.path(), "aps.txt", 3);

    let mut consumer = Recorder::default();
    let (result, output) = run(RunConfig::new(&input).skip(10), &mut consumer);
    let stats = result.unwrap();

    assert_eq!(stats.records(), 0);
    assert_eq!(consumer.events, ["dialect", "setup", "finish"]);
    assert_eq!(output, "begin\nend\n");
}

// =============================================================================
// Faults
// =============================================================================

#[test]
fn test_setup_fault_is_fatal() {
    let dir = common::temp_dir();
    let input = flat_input(dir.path(), "aps.txt", 3);

    let mut consumer = Recorder {
        setup_fault: true,
        ..Default::default()
    };
    let (result, _) = run(RunConfig::new(&input), &mut consumer);
    let err = result.unwrap_err();

    assert!(err.is_consumer_fault());
    assert_eq!(err.hook(), Some(Hook::Setup));
    assert_eq!(consumer.events, ["dialect", "setup"]);
}

#[test]
fn test_process_fault_still_finishes() {
    let dir = common::temp_dir();
    let input = flat_input(dir.path(), "aps.txt", 5);

    let mut consumer = Recorder {
        fault_at: Some(2),
        ..Default::default()
    };
    let (result, output) = run(RunConfig::new(&input), &mut consumer);
    let err = result.unwrap_err();

    assert_eq!(err.hook(), Some(Hook::Process));
    assert!(err.to_string().contains("cannot decode aps.txt:2"), "{}", err);
    assert_eq!(consumer.events.last().map(String::as_str), Some("finish"));
    assert_eq!(consumer.records.len(), 1);
    assert!(output.ends_with("end\n"));
}

#[test]
fn test_finish_fault_is_fatal() {
    let dir = common::temp_dir();
    let input = flat_input(dir.path(), "aps.txt", 2);

    let mut consumer = Recorder {
        finish_fault: true,
        ..Default::default()
    };
    let (result, _) = run(RunConfig::new(&input), &mut consumer);
    let err = result.unwrap_err();

    assert!(matches!(
        err,
        Error::Consumer {
            hook: Hook::Finish,
            ..
        }
    ));
    assert_eq!(consumer.records.len(), 2);
}

#[test]
fn test_missing_input() {
    let dir = common::temp_dir();
    let mut consumer = Recorder::default();
    let (result, _) = run(RunConfig::new(dir.path().join("absent.zip")), &mut consumer);

    assert!(result.unwrap_err().is_io());
    assert!(consumer.events.is_empty());
}

#[test]
fn test_invalid_config() {
    let dir = common::temp_dir();
    let input = flat_input(dir.path(), "aps.txt", 2);
    let mut consumer = Recorder::default();
    let (result, _) = run(RunConfig::new(&input).body_tag("a b"), &mut consumer);

    assert!(matches!(result, Err(Error::InvalidConfig(_))));
}

// =============================================================================
// Dialects and inputs
// =============================================================================

#[test]
fn test_tagged_archive_input() {
    let dir = common::temp_dir();
    let dump = common::tagged_dump("us-patent-grant", 4);
    let archive = common::write_zip(dir.path(), "ipg050104.zip", &[("ipg050104.xml", dump.as_str())]);

    let mut consumer = Recorder::default();
    let (result, _) = run(RunConfig::new(&archive), &mut consumer);
    let stats = result.unwrap();

    assert_eq!(stats.task_name(), "ipg050104.zip");
    assert_eq!(stats.records(), 4);
    assert_eq!(consumer.dialect, Some(Dialect::RedbookGrant));
    assert!(consumer.records.iter().all(|r| r.starts_with("<us-patent-grant")));
}

#[test]
fn test_entity_header_injection() {
    let dir = common::temp_dir();
    let input = common::write_file(
        dir.path(),
        "pg010102.sgm",
        "<!DOCTYPE PATDOC [\n]>\n<PATDOC>\n<B110>&mdash;</B110>\n</PATDOC>\n",
    );

    let mut consumer = Recorder::default();
    let (result, _) = run(
        RunConfig::new(&input).inject_entity_header(true),
        &mut consumer,
    );
    result.unwrap();
    assert_eq!(consumer.dialect, Some(Dialect::Sgml));
    assert!(consumer.records[0].starts_with(bulkdump::ENTITY_HEADER));
    assert!(consumer.records[0].ends_with("<PATDOC>\n<B110>&mdash;</B110>\n</PATDOC>\n"));

    // Tagged XML dialects never get the header
    let grant = common::write_file(
        dir.path(),
        "ipg.xml",
        &common::tagged_dump("us-patent-grant", 1),
    );
    let mut consumer = Recorder::default();
    let (result, _) = run(
        RunConfig::new(&grant).inject_entity_header(true),
        &mut consumer,
    );
    result.unwrap();
    assert!(consumer.records[0].starts_with("<us-patent-grant"));
}

#[test]
fn test_forced_flat_with_marker() {
    let dir = common::temp_dir();
    let input = common::write_file(dir.path(), "records.dat", "#REC\na\n#REC\nb\n");

    let mut consumer = Recorder::default();
    let (result, _) = run(
        RunConfig::new(&input).force_flat(true).marker("#REC"),
        &mut consumer,
    );

    assert_eq!(result.unwrap().records(), 2);
    assert_eq!(consumer.records, ["#REC\na\n", "#REC\nb\n"]);
    assert_eq!(consumer.dialect, Some(Dialect::Greenbook));
}

#[test]
fn test_directory_input_reads_every_dump() {
    let dir = common::temp_dir();
    common::write_file(dir.path(), "week1/ipg050104.xml", &common::tagged_dump("us-patent-grant", 2));
    common::write_file(dir.path(), "week2/ipg050111.xml", &common::tagged_dump("us-patent-grant", 1));
    common::write_file(dir.path(), "week2/notes.md", "not a dump\n");

    let mut consumer = Recorder::default();
    let (result, _) = run(RunConfig::new(dir.path()), &mut consumer);

    assert_eq!(result.unwrap().records(), 3);
    let root = dir.path().file_name().unwrap().to_string_lossy();
    assert_eq!(
        consumer.events[2..],
        [
            format!("process {}:1", root),
            format!("process {}:2", root),
            format!("process {}:3", root),
            "finish".to_string(),
        ]
    );
}

#[test]
fn test_selector_limits_entries() {
    let dir = common::temp_dir();
    let dump = common::tagged_dump("us-patent-grant", 2);
    let archive = common::write_zip(
        dir.path(),
        "bulk.zip",
        &[
            ("grants/ipg050104.xml", dump.as_str()),
            ("apps/ipa050106.xml", dump.as_str()),
        ],
    );

    let mut consumer = Recorder::default();
    let config = RunConfig::new(&archive).selector(EntrySelector::new().parent_path("grants"));
    let (result, _) = run(config, &mut consumer);
    assert_eq!(result.unwrap().records(), 2);
}

// =============================================================================
// Composition and sinks
// =============================================================================

#[test]
fn test_run_all_composes_children() {
    let dir = common::temp_dir();
    let a = flat_input(dir.path(), "A.txt", 2);
    let b = flat_input(dir.path(), "B.txt", 3);

    let mut consumer = consumer_fn(|ctx, _, _| {
        Ok(Outcome::from(!ctx.source().starts_with("B.txt") || ctx.position() == 1))
    });
    let coordinator = RunCoordinator::new(RunConfig::new("unused").with_task_name("week"));
    let mut out = Vec::new();
    let stats = coordinator.run_all_to([&a, &b], &mut consumer, &mut out).unwrap();

    assert_eq!(stats.task_name(), "week");
    assert_eq!(
        (stats.records(), stats.successes(), stats.failures()),
        (5, 3, 2)
    );
    let child = stats.child("A.txt").expect("child A");
    assert_eq!(
        (child.records(), child.successes(), child.failures()),
        (2, 2, 0)
    );
    assert_eq!(
        stats.child("B.txt").unwrap().failed_sources(),
        ["B.txt:2", "B.txt:3"]
    );
}

#[test]
fn test_output_file_sink() {
    let dir = common::temp_dir();
    let input = flat_input(dir.path(), "aps.txt", 3);
    let output = dir.path().join("ids.txt");

    let mut consumer = Recorder::default();
    let stats = RunCoordinator::new(RunConfig::new(&input).output(&output))
        .run(&mut consumer)
        .unwrap();

    assert_eq!(stats.records(), 3);
    assert_eq!(
        std::fs::read_to_string(&output).unwrap(),
        "begin\naps.txt:1\naps.txt:2\naps.txt:3\nend\n"
    );
}

// =============================================================================
// Archive entries
// =============================================================================

const SGML_DUMP: &str = "<!DOCTYPE PATDOC [\n]>\n\
<PATDOC>\n<B110>1</B110>\n</PATDOC>\n\
<PATDOC>\n<B110>2</B110>\n</PATDOC>\n";

#[test]
fn test_archive_reads_the_detected_entry() {
    let dir = common::temp_dir();
    let archive = common::write_zip(
        dir.path(),
        "pg010102.zip",
        &[
            ("README.txt", "weekly grant files\n"),
            ("pg010102.sgml", SGML_DUMP),
        ],
    );

    let mut consumer = Recorder::default();
    let (result, _) = run(RunConfig::new(&archive), &mut consumer);
    let stats = result.unwrap();

    assert_eq!(consumer.dialect, Some(Dialect::Sgml));
    assert_eq!(stats.records(), 2);
    assert!(consumer.records[1].contains("<B110>2</B110>"));
}

#[test]
fn test_archive_skips_unrecognized_entries() {
    let dir = common::temp_dir();
    let grants = common::tagged_dump("us-patent-grant", 3);
    let archive = common::write_zip(
        dir.path(),
        "ipg050104.zip",
        &[("README.txt", "notes\n"), ("ipg050104.xml", grants.as_str())],
    );

    let mut consumer = Recorder::default();
    let (result, _) = run(RunConfig::new(&archive), &mut consumer);

    assert_eq!(consumer.dialect, Some(Dialect::RedbookGrant));
    assert_eq!(result.unwrap().records(), 3);
}

#[test]
fn test_directory_uses_detected_extension() {
    let dir = common::temp_dir();
    common::write_file(dir.path(), "pg010102.sgml", SGML_DUMP);
    common::write_file(dir.path(), "pg010109.sgml", SGML_DUMP);

    let mut consumer = Recorder::default();
    let (result, _) = run(RunConfig::new(dir.path()), &mut consumer);

    assert_eq!(consumer.dialect, Some(Dialect::Sgml));
    assert_eq!(result.unwrap().records(), 4);
}

#[cfg(feature = "deflate")]
#[test]
fn test_read_fault_mid_dump_still_finishes() {
    let dir = common::temp_dir();
    let dump = common::flat_dump(20_000);
    let archive = common::write_zip(
        dir.path(),
        "pftaps.zip",
        &[("pftaps19760106_wk01.txt", dump.as_str())],
    );
    common::damage_entry(&archive, 0, 64);
    let output = dir.path().join("ids.txt");

    let mut consumer = Recorder::default();
    let err = RunCoordinator::new(RunConfig::new(&archive).force_flat(true).output(&output))
        .run(&mut consumer)
        .unwrap_err();

    assert!(err.is_io(), "{:?}", err);
    assert_eq!(consumer.events.last().map(String::as_str), Some("finish"));
    assert!(consumer.records.len() < 20_000);

    let written = std::fs::read_to_string(&output).unwrap();
    assert!(written.starts_with("begin\n"));
    assert!(written.ends_with("end\n"));
    assert_eq!(written.lines().count(), consumer.records.len() + 2);
}
