use deidflow::pipeline::partition;
use deidflow::{ConfigError, SourceFile};
use std::path::PathBuf;

fn files(n: usize) -> Vec<SourceFile> {
    (0..n)
        .map(|i| SourceFile {
            directory_prefix: format!("d{}", i % 3),
            base_name: format!("f{i}.svs"),
            full_path: PathBuf::from(format!("/in/d{}/f{i}.svs", i % 3)),
        })
        .collect()
}

#[test]
fn test_partition_counts_sizes_and_order() {
    for n in 0..20 {
        for b in 1..8 {
            let input = files(n);
            let batches = partition(input.clone(), b).unwrap();
            assert_eq!(batches.len(), n.div_ceil(b), "n={n} b={b}");
            for (i, batch) in batches.iter().enumerate() {
                assert_eq!(batch.index, i);
                assert!(!batch.members.is_empty());
                assert!(batch.members.len() <= b);
                if i + 1 < batches.len() {
                    assert_eq!(batch.members.len(), b, "only the last batch may be short");
                }
            }
            let flattened: Vec<SourceFile> =
                batches.into_iter().flat_map(|batch| batch.members).collect();
            assert_eq!(flattened, input, "n={n} b={b}");
        }
    }
}

#[test]
fn test_partition_three_files_batch_two() {
    let input = files(3);
    let batches = partition(input.clone(), 2).unwrap();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].members, input[..2].to_vec());
    assert_eq!(batches[1].members, input[2..].to_vec());
}

#[test]
fn test_partition_empty_input() {
    assert!(partition(Vec::new(), 4).unwrap().is_empty());
}

#[test]
fn test_partition_rejects_zero_batch_size() {
    assert!(matches!(
        partition(files(2), 0),
        Err(ConfigError::InvalidBatchSize(0))
    ));
}
