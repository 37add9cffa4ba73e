use deidflow::SourceFile;
use deidflow::engine::tools::{expand_args, normalize_bucket_uri, tail};
use deidflow::pipeline::{output_name, remote_uri, stage_name};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

fn source(prefix: &str, name: &str) -> SourceFile {
    SourceFile {
        directory_prefix: prefix.to_string(),
        base_name: name.to_string(),
        full_path: PathBuf::from(format!("/data/{prefix}/{name}")),
    }
}

// --- stage_name / output_name ---

#[test]
fn test_stage_name_pattern() {
    assert_eq!(stage_name(&source("A", "slide1.svs")), "A_slide1.svs");
}

#[test]
fn test_output_name_pattern() {
    assert_eq!(output_name(&source("A", "slide1.svs")), "A_DI_slide1.svs");
}

#[test]
fn test_names_keep_base_name_unmodified() {
    let s = source("case 7", "Slide.One.SVS");
    assert_eq!(stage_name(&s), "case 7_Slide.One.SVS");
    assert_eq!(output_name(&s), "case 7_DI_Slide.One.SVS");
}

#[test]
fn test_same_base_name_distinct_dirs_do_not_collide() {
    let a = source("A", "slide1.svs");
    let b = source("B", "slide1.svs");
    assert_ne!(stage_name(&a), stage_name(&b));
    assert_ne!(output_name(&a), output_name(&b));
}

#[test]
fn test_stage_and_output_names_differ() {
    let s = source("A", "slide1.svs");
    assert_ne!(stage_name(&s), output_name(&s));
}

#[test]
fn test_names_are_deterministic() {
    let s = source("A", "slide1.svs");
    assert_eq!(stage_name(&s), stage_name(&s.clone()));
    assert_eq!(output_name(&s), output_name(&s.clone()));
}

#[test]
fn test_remote_uri_appends_output_name() {
    assert_eq!(
        remote_uri("s3://bucket/deid", &source("B", "slide1.svs")),
        "s3://bucket/deid/B_DI_slide1.svs"
    );
}

// --- normalize_bucket_uri ---

#[test]
fn test_normalize_bucket_adds_scheme() {
    assert_eq!(normalize_bucket_uri("my-bucket/out"), "s3://my-bucket/out");
}

#[test]
fn test_normalize_bucket_trims_trailing_slashes() {
    assert_eq!(normalize_bucket_uri("s3://my-bucket/out//"), "s3://my-bucket/out");
}

#[test]
fn test_normalize_bucket_keeps_other_schemes() {
    assert_eq!(normalize_bucket_uri("gs://b/"), "gs://b");
}

// --- expand_args ---

#[test]
fn test_expand_args_substitutes_within_arguments() {
    let template = vec![
        "--input".to_string(),
        "{input}".to_string(),
        "--out={output}".to_string(),
    ];
    let args = expand_args(
        &template,
        &[
            ("input", Path::new("/scratch/A b.svs")),
            ("output", Path::new("/out/x.svs")),
        ],
    );
    assert_eq!(
        args,
        vec![
            OsString::from("--input"),
            OsString::from("/scratch/A b.svs"),
            OsString::from("--out=/out/x.svs"),
        ]
    );
}

#[test]
fn test_expand_args_leaves_unknown_placeholders() {
    let template = vec!["{other}".to_string()];
    let args = expand_args(&template, &[("input", Path::new("/x"))]);
    assert_eq!(args, vec![OsString::from("{other}")]);
}

// --- tail ---

#[test]
fn test_tail_short_text_unchanged() {
    assert_eq!(tail("  boom \n", 100), "boom");
}

#[test]
fn test_tail_keeps_end() {
    assert_eq!(tail("abcdef", 3), "def");
}

#[test]
fn test_tail_respects_char_boundaries() {
    // 'é' is two bytes; cutting inside it must move forward.
    assert_eq!(tail("aéb", 2), "b");
}
