mod common;

use common::Fixture;
use deidflow::DiscoveryError;
use deidflow::pipeline::{discover, find_collisions};

fn names(fx: &Fixture, ext: &str) -> Vec<(String, String)> {
    discover(&fx.input, ext)
        .unwrap()
        .collect_all()
        .unwrap()
        .into_iter()
        .map(|s| (s.directory_prefix, s.base_name))
        .collect()
}

#[test]
fn test_discover_missing_dir() {
    let fx = Fixture::new();
    let missing = fx.dir.path().join("nope");
    assert!(matches!(
        discover(&missing, "svs"),
        Err(DiscoveryError::Missing(_))
    ));
}

#[test]
fn test_discover_file_is_not_a_dir() {
    let fx = Fixture::new();
    let file = fx.add("A/slide1.svs");
    assert!(matches!(
        discover(&file, "svs"),
        Err(DiscoveryError::NotADirectory(_))
    ));
}

#[test]
fn test_discover_sorted_by_path_across_subdirs() {
    let fx = Fixture::new();
    fx.add("B/slide1.svs");
    fx.add("A/slide2.svs");
    fx.add("A/slide1.svs");
    assert_eq!(
        names(&fx, "svs"),
        vec![
            ("A".to_string(), "slide1.svs".to_string()),
            ("A".to_string(), "slide2.svs".to_string()),
            ("B".to_string(), "slide1.svs".to_string()),
        ]
    );
}

#[test]
fn test_discover_extension_filter_case_insensitive() {
    let fx = Fixture::new();
    fx.add("A/upper.SVS");
    fx.add("A/lower.svs");
    fx.add("A/notes.txt");
    fx.add("A/svs");
    let found = names(&fx, "svs");
    assert_eq!(found.len(), 2);
    assert!(found.iter().all(|(_, n)| n.to_lowercase().ends_with(".svs")));
}

#[test]
fn test_discover_skips_os_junk() {
    let fx = Fixture::new();
    fx.add("A/._slide1.svs");
    fx.add("A/slide1.svs");
    assert_eq!(names(&fx, "svs").len(), 1);
}

#[test]
fn test_discover_single_level_per_subdirectory() {
    let fx = Fixture::new();
    fx.add("A/slide1.svs");
    fx.add("A/nested/deep.svs");
    let found = names(&fx, "svs");
    assert_eq!(found, vec![("A".to_string(), "slide1.svs".to_string())]);
}

#[test]
fn test_discover_root_level_file_uses_root_leaf_name() {
    let fx = Fixture::new();
    fx.add("top.svs");
    assert_eq!(
        names(&fx, "svs"),
        vec![("input".to_string(), "top.svs".to_string())]
    );
}

#[test]
fn test_discover_keeps_colliding_files() {
    let fx = Fixture::new();
    // Root is named "input"; a subdirectory of the same name maps to the same local names.
    fx.add("top.svs");
    fx.add("input/top.svs");
    let files = discover(&fx.input, "svs").unwrap().collect_all().unwrap();
    assert_eq!(files.len(), 2);
    let collisions = find_collisions(&files);
    assert_eq!(collisions.len(), 1);
    assert_eq!(collisions.get(&files[1].full_path), Some(&files[0].full_path));
}

#[test]
fn test_find_collisions_underscore_in_dir_and_file_names() {
    let fx = Fixture::new();
    fx.add("A/B_x.svs");
    fx.add("A_B/x.svs");
    fx.add("C/ok.svs");
    let files = discover(&fx.input, "svs").unwrap().collect_all().unwrap();
    let collisions = find_collisions(&files);
    assert_eq!(collisions.len(), 1);
    let (later, first) = collisions.into_iter().next().unwrap();
    assert!(later.ends_with("A_B/x.svs"));
    assert!(first.ends_with("A/B_x.svs"));
}

#[test]
fn test_find_collisions_none_for_distinct_names() {
    let fx = Fixture::new();
    fx.add("A/slide1.svs");
    fx.add("B/slide1.svs");
    let files = discover(&fx.input, "svs").unwrap().collect_all().unwrap();
    assert!(find_collisions(&files).is_empty());
}

#[test]
fn test_discover_iter_is_restartable() {
    let fx = Fixture::new();
    fx.add("A/slide1.svs");
    fx.add("B/slide1.svs");
    let discoverer = discover(&fx.input, "svs").unwrap();
    let first: Vec<_> = discoverer.iter().map(|r| r.unwrap()).collect();
    let second: Vec<_> = discoverer.iter().map(|r| r.unwrap()).collect();
    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
}

#[test]
fn test_discover_full_path_points_at_source() {
    let fx = Fixture::new();
    fx.add("A/slide1.svs");
    let files = discover(&fx.input, "svs").unwrap().collect_all().unwrap();
    assert!(files[0].full_path.is_file());
    assert!(files[0].full_path.ends_with("A/slide1.svs"));
}
