//! Integration tests for summary cases and restart chains.

mod common;

use common::{region_header, start_date, write_case};
use ecl_reader::core::constants::{DUMMY_WGNAME, MINISTEP, PARAMS, SEQHDR};
use ecl_reader::{EclError, EclWriter, GridDims, ReaderOptions, SummaryCase, SummaryHeader, SummaryVectorKey, SummaryWriter};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// CASE1 -> CASE2 (from step 3) -> CASE3 (from step 5), one ministep per
/// report step, one day per step.
fn cascading_restarts(dir: &Path) -> PathBuf {
    let rows = |first_step: i32, base: f32| -> Vec<(i32, Vec<f32>)> {
        (0..4)
            .map(|i| {
                let step = first_step + i;
                let v = base * (i + 1) as f32;
                (step, vec![step as f32, v, v + 1.0])
            })
            .collect()
    };

    write_case(dir, "CASE1", region_header(&[1, 2]), &rows(1, 100.0));
    write_case(
        dir,
        "CASE2",
        region_header(&[1, 2]).with_restart("CASE1", 3),
        &rows(4, 1000.0),
    );

    let case3_rows: Vec<(i32, Vec<f32>)> = rows(6, 10000.0)
        .into_iter()
        .map(|(step, mut values)| {
            values.push(-(step as f32));
            (step, values)
        })
        .collect();
    write_case(
        dir,
        "CASE3",
        region_header(&[1, 2, 3]).with_restart("CASE2", 5),
        &case3_rows,
    )
}

#[test]
fn test_cascading_restarts() {
    let dir = TempDir::new().unwrap();
    let root = cascading_restarts(dir.path());

    let case = SummaryCase::open(common::smspec(&root)).unwrap();
    assert_eq!(case.restart_chain().len(), 3);
    assert_eq!(case.series().segments().len(), 3);

    assert_eq!(
        case.get("RPR:1").unwrap(),
        vec![100.0, 200.0, 300.0, 1000.0, 2000.0, 10000.0, 20000.0, 30000.0, 40000.0]
    );
    assert_eq!(case.get("TIME").unwrap(), (1..=9).map(f64::from).collect::<Vec<_>>());
    assert_eq!(case.report_steps(), (1..=9).collect::<Vec<_>>());

    // region 3 only exists in CASE3
    let rpr3 = case.get("RPR:3").unwrap();
    assert_eq!(&rpr3[..5], &[-99.0; 5]);
    assert_eq!(&rpr3[5..], &[-6.0, -7.0, -8.0, -9.0]);
    let index = case.resolve(&SummaryVectorKey::region("RPR", 3).unwrap()).unwrap();
    assert_eq!(case.params().default_value(index).unwrap(), -99.0);

    let dates = case.dates().unwrap();
    assert_eq!(dates.len(), 9);
    assert_eq!(dates[8], start_date() + chrono::Duration::days(9));
}

#[test]
fn test_restart_disabled() {
    let dir = TempDir::new().unwrap();
    let root = cascading_restarts(dir.path());

    let options = ReaderOptions::default().without_restart();
    let case = SummaryCase::open_with(&root, &options).unwrap();
    assert_eq!(case.restart_chain().len(), 1);
    assert_eq!(case.get("RPR:1").unwrap(), vec![10000.0, 20000.0, 30000.0, 40000.0]);
    assert_eq!(case.report_steps(), vec![6, 7, 8, 9]);
}

#[test]
fn test_missing_base_case_reads_alone() {
    let dir = TempDir::new().unwrap();
    let root = write_case(
        dir.path(),
        "ORPHAN",
        region_header(&[1]).with_restart("GONE", 2),
        &[(3, vec![3.0, 30.0]), (4, vec![4.0, 40.0])],
    );

    let case = SummaryCase::open(&root).unwrap();
    assert_eq!(case.get("RPR:1").unwrap(), vec![30.0, 40.0]);
    assert_eq!(case.report_steps(), vec![3, 4]);
}

#[test]
fn test_ministeps_and_report_steps() {
    let dir = TempDir::new().unwrap();
    let rows = vec![
        (1, vec![0.5, 1.0]),
        (1, vec![1.0, 2.0]),
        (2, vec![1.5, 3.0]),
        (2, vec![2.0, 4.0]),
        (2, vec![3.0, 5.0]),
    ];
    let root = write_case(dir.path(), "MINI", region_header(&[4]), &rows);

    let case = SummaryCase::open(&root).unwrap();
    assert_eq!(case.series().len(), 5);
    assert_eq!(case.get_at_report_steps("RPR:4").unwrap(), vec![2.0, 5.0]);
    assert_eq!(case.series().report_step_range(2), Some((2, 4)));
    assert!(case.has_report_step(2));
    assert!(!case.has_report_step(3));

    let index = case.params().resolve_name("RPR:4").unwrap();
    assert_eq!(case.series().value_at(index, 1).unwrap(), 2.0);
    assert!(matches!(
        case.series().value_at(index, 3),
        Err(EclError::UnknownReportStep(3))
    ));
    assert!(matches!(case.get("RPR:5"), Err(EclError::UnknownVector(_))));
}

#[test]
fn test_non_unified_data() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("SPLIT");
    let mut writer = SummaryWriter::new(&root, region_header(&[1]));
    for (step, day) in [(1, 1.0), (2, 2.0), (2, 2.5), (3, 3.0)] {
        writer.add_ministep(step, &[day, day * 10.0]).unwrap();
    }
    let files = writer.write_multiple().unwrap();
    assert_eq!(files.len(), 3);
    assert!(files[2].to_string_lossy().ends_with("SPLIT.S0003"));

    let case = SummaryCase::open(&root).unwrap();
    assert_eq!(case.report_steps(), vec![1, 2, 3]);
    assert_eq!(case.get("RPR:1").unwrap(), vec![10.0, 20.0, 25.0, 30.0]);
}

#[test]
fn test_trailing_ministep_without_params() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("LIVE");
    let mut writer = SummaryWriter::new(&root, region_header(&[1]));
    writer.add_ministep(1, &[1.0, 1.0]).unwrap();
    writer.write_header().unwrap();

    let mut w = EclWriter::create(common::unsmry(&root)).unwrap();
    w.write_int(SEQHDR, &[0]).unwrap();
    w.write_int(MINISTEP, &[0]).unwrap();
    w.write_float(PARAMS, &[1.0, 11.0]).unwrap();
    w.write_int(MINISTEP, &[1]).unwrap();
    w.write_float(PARAMS, &[2.0, 12.0]).unwrap();
    w.write_int(MINISTEP, &[2]).unwrap();
    w.finish().unwrap();

    let case = SummaryCase::open(&root).unwrap();
    assert_eq!(case.get("RPR:1").unwrap(), vec![11.0, 12.0]);
}

#[test]
fn test_truncated_data_file() {
    let dir = TempDir::new().unwrap();
    let root = write_case(
        dir.path(),
        "CUT",
        region_header(&[1]),
        &[(1, vec![1.0, 1.0]), (2, vec![2.0, 2.0])],
    );
    let unsmry = common::unsmry(&root);
    common::truncate(&unsmry, common::file_len(&unsmry) - 6);

    assert!(matches!(
        SummaryCase::open(&root),
        Err(EclError::TruncatedRecord { .. })
    ));
}

#[test]
fn test_params_width_mismatch() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("WIDE");
    SummaryWriter::new(&root, region_header(&[1])).write_header().unwrap();

    let mut w = EclWriter::create(common::unsmry(&root)).unwrap();
    w.write_int(SEQHDR, &[0]).unwrap();
    w.write_int(MINISTEP, &[0]).unwrap();
    w.write_float(PARAMS, &[1.0, 2.0, 3.0]).unwrap();
    w.finish().unwrap();

    assert!(matches!(
        SummaryCase::open(&root),
        Err(EclError::ParameterCount { expected: 2, actual: 3 })
    ));
}

#[test]
fn test_block_and_well_keys_from_smspec() {
    let dir = TempDir::new().unwrap();
    let dims = GridDims::new(20, 20, 10);
    let mut header = SummaryHeader::new(dims, start_date());
    header.add_node("TIME", DUMMY_WGNAME, 0, "DAYS");
    header.add_node("BPR", DUMMY_WGNAME, dims.global_from_ijk(10, 12, 3), "BARSA");
    header.add_node("WOPR", "OP_1", 0, "SM3/DAY");
    header.add_node("WOPT", "OP_1", 0, "SM3");
    header.add_node("WOPR", DUMMY_WGNAME, 0, "SM3/DAY");
    header.add_vector(&SummaryVectorKey::region_pair("RGFT", 2, 3).unwrap(), "SM3");

    let rows = vec![
        (1, vec![10.0, 250.0, 100.0, 1000.0, 0.0, 5.0]),
        (2, vec![20.0, 240.0, 300.0, 4000.0, 0.0, 6.0]),
    ];
    let root = write_case(dir.path(), "KEYS", header, &rows);

    let case = SummaryCase::open(&root).unwrap();
    assert_eq!(case.header().dims, dims);
    assert_eq!(case.header().nodes.len(), 6);
    assert_eq!(
        case.keys(),
        vec!["TIME", "BPR:10,12,3", "WOPR:OP_1", "WOPT:OP_1", "RGFT:2-3"]
    );
    assert_eq!(case.get("BPR:10,12,3").unwrap(), vec![250.0, 240.0]);
    assert_eq!(case.keys_matching("WOP?:*").unwrap(), vec!["WOPR:OP_1", "WOPT:OP_1"]);
    assert!(case.has_vector("RGFT:2-3"));

    let day = 86_400.0;
    assert_eq!(case.value_at_time("WOPR:OP_1", 15.0 * day).unwrap(), 300.0);
    assert_eq!(case.value_at_time("WOPT:OP_1", 15.0 * day).unwrap(), 2500.0);
}

#[test]
fn test_text_outputs() {
    let dir = TempDir::new().unwrap();
    let root = write_case(
        dir.path(),
        "TEXT",
        region_header(&[1]),
        &[(1, vec![1.0, 10.0]), (2, vec![31.0, 20.5])],
    );
    let case = SummaryCase::open(&root).unwrap();

    let mut csv = Vec::new();
    case.export_csv(&mut csv, &["RPR:1"]).unwrap();
    let csv = String::from_utf8(csv).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "DAYS,DATE,RPR:1");
    assert_eq!(lines[1], "1.000000,2000-01-02,10.000000");
    assert_eq!(lines[2], "31.000000,2000-02-01,20.500000");

    let mut table = Vec::new();
    case.summarize(&mut table).unwrap();
    let table = String::from_utf8(table).unwrap();
    assert!(table.starts_with("REPORT"));
    assert!(table.contains("01/02/2000"));

    let mut out = Vec::new();
    assert!(matches!(
        case.export_csv(&mut out, &["RPR:9"]),
        Err(EclError::UnknownVector(_))
    ));
}

#[test]
fn test_formatted_and_missing_cases() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(
        SummaryCase::open(dir.path().join("CASE.FSMSPEC")),
        Err(EclError::UnsupportedFormat(_))
    ));
    assert!(matches!(
        SummaryCase::open(dir.path().join("NOWHERE.SMSPEC")),
        Err(EclError::FileNotFound(_))
    ));

    let root = dir.path().join("NODATA");
    SummaryWriter::new(&root, region_header(&[1])).write_header().unwrap();
    assert!(matches!(
        SummaryCase::open(&root),
        Err(EclError::FileNotFound(_))
    ));
}

#[test]
fn test_circular_restart_chain() {
    let dir = TempDir::new().unwrap();
    write_case(
        dir.path(),
        "LOOPA",
        region_header(&[1]).with_restart("LOOPB", 1),
        &[(2, vec![2.0, 20.0])],
    );
    let root = write_case(
        dir.path(),
        "LOOPB",
        region_header(&[1]).with_restart("LOOPA", 1),
        &[(2, vec![2.0, 20.0])],
    );

    assert!(matches!(
        SummaryCase::open(&root),
        Err(EclError::CircularRestart(_))
    ));
}

#[test]
fn test_corrupt_time_gives_date_error() {
    let dir = TempDir::new().unwrap();
    let root = write_case(
        dir.path(),
        "FAR",
        region_header(&[1]),
        &[(1, vec![1.0, 10.0]), (2, vec![1.0e30, 20.0])],
    );
    let case = SummaryCase::open(&root).unwrap();
    assert_eq!(case.get("RPR:1").unwrap(), vec![10.0, 20.0]);

    assert!(matches!(case.dates(), Err(EclError::InvalidTime(_))));
    let mut out = Vec::new();
    assert!(matches!(
        case.export_csv(&mut out, &["RPR:1"]),
        Err(EclError::InvalidTime(_))
    ));
}
