use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use kira_prs::error::{PipelineError, Result};
use kira_prs::genotype::{self, ConversionSummary, ConvertRequest, UnmatchedPolicy};

struct Paths {
    raw: PathBuf,
    bim: PathBuf,
    out: PathBuf,
    summary: PathBuf,
}

fn paths(dir: &Path) -> Paths {
    Paths {
        raw: dir.join("individual_1.raw"),
        bim: dir.join("sample_id.bim"),
        out: dir.join("individual_genotypes2.input"),
        summary: dir.join("conversion_summary.txt"),
    }
}

fn convert(p: &Paths, with_bim: bool, policy: UnmatchedPolicy) -> Result<ConversionSummary> {
    genotype::convert(&ConvertRequest {
        raw: &p.raw,
        metadata: with_bim.then_some(p.bim.as_path()),
        output: &p.out,
        summary: &p.summary,
        policy,
    })
}

#[test]
fn missing_calls_become_na_and_columns_keep_raw_names() {
    let tmp = TempDir::new().unwrap();
    let p = paths(tmp.path());
    fs::write(
        &p.raw,
        "FID IID PAT MAT SEX PHENOTYPE rs1_A rs2_G\n0 S1 0 0 1 -9 0 NA\n",
    )
    .unwrap();
    fs::write(&p.bim, "1\trs1\t0\t100\tA\tG\n1\trs2\t0\t200\tG\tT\n").unwrap();

    let summary = convert(&p, true, UnmatchedPolicy::PassThrough).unwrap();
    let out = fs::read_to_string(&p.out).unwrap();
    assert_eq!(out, "IID\trs1_A\trs2_G\nS1\t0\tNA\n");
    assert_eq!(summary.samples(), 1);
    assert_eq!(summary.output_variants, 2);
    assert_eq!(summary.join.as_ref().unwrap().matched, 2);
    assert!(summary.warnings.is_empty());
}

#[test]
fn output_has_one_row_per_sample_in_input_order() {
    let tmp = TempDir::new().unwrap();
    let p = paths(tmp.path());
    fs::write(
        &p.raw,
        "FID IID PAT MAT SEX PHENOTYPE v1_A v2_C v3_T\n\
         F3 S3 0 0 2 -9 2 1 0\n\
         F1 S1 0 0 1 -9 NA 0 1\n\
         F2 S2 0 0 1 -9 1 1 1\n",
    )
    .unwrap();

    let summary = convert(&p, false, UnmatchedPolicy::PassThrough).unwrap();
    let out = fs::read_to_string(&p.out).unwrap();
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 4);
    for line in &lines {
        assert_eq!(line.split('\t').count(), 4);
    }
    let ids: Vec<&str> = lines[1..]
        .iter()
        .map(|l| l.split('\t').next().unwrap())
        .collect();
    assert_eq!(ids, vec!["S3", "S1", "S2"]);
    assert_eq!(summary.sample_ids, vec!["S3", "S1", "S2"]);
}

#[test]
fn conversion_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    let p = paths(tmp.path());
    fs::write(
        &p.raw,
        "FID IID PAT MAT SEX PHENOTYPE rs1_A rs2_G\n0 S1 0 0 1 -9 2 1\n0 S2 0 0 2 -9 NA 0\n",
    )
    .unwrap();
    fs::write(&p.bim, "1\trs1\t0\t100\tA\tG\n").unwrap();

    convert(&p, true, UnmatchedPolicy::PassThrough).unwrap();
    let first = fs::read(&p.out).unwrap();
    let first_summary = fs::read(&p.summary).unwrap();
    convert(&p, true, UnmatchedPolicy::PassThrough).unwrap();
    assert_eq!(fs::read(&p.out).unwrap(), first);
    assert_eq!(fs::read(&p.summary).unwrap(), first_summary);
}

#[test]
fn missing_metadata_still_converts_with_warning() {
    let tmp = TempDir::new().unwrap();
    let p = paths(tmp.path());
    fs::write(&p.raw, "FID IID PAT MAT SEX PHENOTYPE rs1_A\n0 S1 0 0 1 -9 1\n").unwrap();

    let summary = convert(&p, true, UnmatchedPolicy::PassThrough).unwrap();
    assert!(!summary.metadata_loaded);
    assert!(summary.join.is_none());
    assert!(summary.warnings.iter().any(|w| w.contains("not found")));
    assert_eq!(fs::read_to_string(&p.out).unwrap(), "IID\trs1_A\nS1\t1\n");

    let text = fs::read_to_string(&p.summary).unwrap();
    assert!(text.contains("(not found)"));
}

#[test]
fn unmatched_columns_pass_through_by_default() {
    let tmp = TempDir::new().unwrap();
    let p = paths(tmp.path());
    fs::write(
        &p.raw,
        "FID IID PAT MAT SEX PHENOTYPE rs1_A rs9_C\n0 S1 0 0 1 -9 1 2\n",
    )
    .unwrap();
    fs::write(&p.bim, "1\trs1\t0\t100\tA\tG\n").unwrap();

    let summary = convert(&p, true, UnmatchedPolicy::PassThrough).unwrap();
    let join = summary.join.as_ref().unwrap();
    assert_eq!(join.matched, 1);
    assert_eq!(join.unmatched, vec!["rs9_C"]);
    assert_eq!(fs::read_to_string(&p.out).unwrap(), "IID\trs1_A\trs9_C\nS1\t1\t2\n");
    assert_eq!(summary.warnings.len(), 1);
}

#[test]
fn drop_policy_removes_unmatched_columns() {
    let tmp = TempDir::new().unwrap();
    let p = paths(tmp.path());
    fs::write(
        &p.raw,
        "FID IID PAT MAT SEX PHENOTYPE rs9_C rs1_A\n0 S1 0 0 1 -9 2 1\n",
    )
    .unwrap();
    fs::write(&p.bim, "1\trs1\t0\t100\tA\tG\n").unwrap();

    let summary = convert(&p, true, UnmatchedPolicy::Drop).unwrap();
    assert_eq!(summary.input_variants, 2);
    assert_eq!(summary.output_variants, 1);
    assert_eq!(fs::read_to_string(&p.out).unwrap(), "IID\trs1_A\nS1\t1\n");
    let text = fs::read_to_string(&p.summary).unwrap();
    assert!(text.contains("Unmatched variants: 1 (drop)"));
}

#[test]
fn invalid_values_and_ragged_rows_are_repaired_and_counted() {
    let tmp = TempDir::new().unwrap();
    let p = paths(tmp.path());
    fs::write(
        &p.raw,
        "FID IID PAT MAT SEX PHENOTYPE a_A b_C\n\
         0 S1 0 0 1 -9 3 x\n\
         0 S2 0 0 1 -9 1\n\
         0 S3 0 0 1 -9 0 1 2\n",
    )
    .unwrap();

    let summary = convert(&p, false, UnmatchedPolicy::PassThrough).unwrap();
    assert_eq!(summary.issues.invalid_values, 2);
    assert_eq!(summary.issues.short_rows, 1);
    assert_eq!(summary.issues.long_rows, 1);
    assert_eq!(
        fs::read_to_string(&p.out).unwrap(),
        "IID\ta_A\tb_C\nS1\tNA\tNA\nS2\t1\tNA\nS3\t0\t1\n"
    );
}

#[test]
fn missing_raw_table_is_input_not_found() {
    let tmp = TempDir::new().unwrap();
    let p = paths(tmp.path());
    let err = convert(&p, true, UnmatchedPolicy::PassThrough).unwrap_err();
    assert!(matches!(err, PipelineError::InputNotFound { .. }));
    assert!(!p.out.exists());
}

#[test]
fn header_without_identity_columns_is_malformed() {
    let tmp = TempDir::new().unwrap();
    let p = paths(tmp.path());
    fs::write(&p.raw, "IID rs1_A\nS1 0\n").unwrap();
    let err = convert(&p, false, UnmatchedPolicy::PassThrough).unwrap_err();
    assert!(matches!(err, PipelineError::Malformed { .. }));
}

#[test]
fn malformed_metadata_lines_are_skipped() {
    let tmp = TempDir::new().unwrap();
    let p = paths(tmp.path());
    fs::write(&p.raw, "FID IID PAT MAT SEX PHENOTYPE rs1_A\n0 S1 0 0 1 -9 1\n").unwrap();
    fs::write(&p.bim, "1\trs1\t0\t100\tA\tG\nbroken line\n1\trs2\t0\tnotanumber\tC\tT\n").unwrap();

    let summary = convert(&p, true, UnmatchedPolicy::PassThrough).unwrap();
    assert_eq!(summary.metadata_skipped_lines, 2);
    assert_eq!(summary.join.as_ref().unwrap().matched, 1);
}

#[test]
fn summary_reports_counts_and_sample_ids() {
    let tmp = TempDir::new().unwrap();
    let p = paths(tmp.path());
    fs::write(
        &p.raw,
        "FID IID PAT MAT SEX PHENOTYPE rs1_A rs2_G\n0 S1 0 0 1 -9 0 1\n0 S2 0 0 2 -9 1 2\n",
    )
    .unwrap();
    fs::write(&p.bim, "1\trs1\t0\t100\tA\tG\n1\trs2\t0\t200\tG\tT\n").unwrap();

    convert(&p, true, UnmatchedPolicy::PassThrough).unwrap();
    let text = fs::read_to_string(&p.summary).unwrap();
    assert!(text.starts_with("Conversion Summary\n"));
    assert!(text.contains("Total samples: 2"));
    assert!(text.contains("Total variants: 2"));
    assert!(text.contains("Matched variants: 2"));
    assert!(text.contains("Sample IDs: S1, S2"));
}

#[test]
fn non_utf8_metadata_line_is_skipped_not_fatal() {
    let tmp = TempDir::new().unwrap();
    let p = paths(tmp.path());
    fs::write(
        &p.raw,
        "FID IID PAT MAT SEX PHENOTYPE rs1_A rs2_G\n0 S1 0 0 1 -9 0 NA\n",
    )
    .unwrap();
    let mut bim = b"1\trs1\t0\t100\tA\tG\n".to_vec();
    bim.extend_from_slice(b"1\trs\xff2\t0\t200\tG\tT\n");
    fs::write(&p.bim, bim).unwrap();

    let summary = convert(&p, true, UnmatchedPolicy::PassThrough).unwrap();
    assert!(summary.metadata_loaded);
    assert_eq!(summary.metadata_skipped_lines, 1);
    let join = summary.join.as_ref().unwrap();
    assert_eq!(join.matched, 1);
    assert_eq!(join.unmatched, vec!["rs2_G"]);
    assert_eq!(fs::read_to_string(&p.out).unwrap(), "IID\trs1_A\trs2_G\nS1\t0\tNA\n");
}

#[test]
fn unreadable_metadata_degrades_to_raw_column_names() {
    let tmp = TempDir::new().unwrap();
    let p = paths(tmp.path());
    fs::write(&p.raw, "FID IID PAT MAT SEX PHENOTYPE rs1_A\n0 S1 0 0 1 -9 2\n").unwrap();
    fs::create_dir_all(&p.bim).unwrap();

    let summary = convert(&p, true, UnmatchedPolicy::Drop).unwrap();
    assert!(!summary.metadata_loaded);
    assert!(summary.join.is_none());
    assert!(summary.warnings.iter().any(|w| w.contains("unreadable")));
    assert_eq!(fs::read_to_string(&p.out).unwrap(), "IID\trs1_A\nS1\t2\n");
    let text = fs::read_to_string(&p.summary).unwrap();
    assert!(text.contains("(unreadable)"));
}

#[test]
fn summary_lists_every_unmatched_column() {
    let tmp = TempDir::new().unwrap();
    let p = paths(tmp.path());
    let columns: Vec<String> = (1..=12).map(|i| format!("rs{}_A", i)).collect();
    let values = vec!["1"; 12].join(" ");
    fs::write(
        &p.raw,
        format!(
            "FID IID PAT MAT SEX PHENOTYPE {}\n0 S1 0 0 1 -9 {}\n",
            columns.join(" "),
            values
        ),
    )
    .unwrap();
    fs::write(&p.bim, "1\trs99\t0\t100\tA\tG\n").unwrap();

    convert(&p, true, UnmatchedPolicy::PassThrough).unwrap();
    let text = fs::read_to_string(&p.summary).unwrap();
    assert!(text.contains(&format!("Unmatched columns: {}\n", columns.join(", "))));
    assert!(!text.contains("more"));
}
