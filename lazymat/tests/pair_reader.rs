use lazymat::{Data, PairReader, ReadOptions, Reader, ReaderExt, Resolved, Selector};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

fn genotypes(rows: usize, cols: usize, seed: u64) -> Arc<Data<f64>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let val = Array2::from_shape_fn((rows, cols), |_| rng.gen_range(0..3) as f64).into_dyn();
    let col: Vec<String> = (0..cols).map(|j| format!("snp{j}")).collect();
    Arc::new(Data::builder().val(val).col(col).name("geno").build().unwrap())
}

#[test]
fn chunked_enumeration_matches_full_iteration() {
    let reader = PairReader::within(genotypes(4, 9, 1)).unwrap();
    let pairs = reader.pairs();
    let all: Vec<String> = pairs.iter().map(|(a, b)| format!("{a},{b}")).collect();
    assert_eq!(all.len(), 36);
    assert_eq!(reader.col().unwrap().labels(), &all[..]);

    let mut chunked = Vec::new();
    for range in pairs.chunk_ranges(5) {
        chunked.extend(pairs.range(range.start, range.end).map(|(a, b)| format!("{a},{b}")));
    }
    assert_eq!(chunked, all);
}

#[test]
fn pair_values_follow_the_input_columns() {
    let data = genotypes(6, 5, 2);
    let reader = PairReader::within(data.clone())
        .unwrap()
        .with_standardize(false);
    let read: Data<f64> = reader.read(&ReadOptions::default()).unwrap();

    for (k, (a, b)) in reader.pairs().iter().enumerate() {
        let a = data.col_to_index(&[a.as_str()]).unwrap()[0];
        let b = data.col_to_index(&[b.as_str()]).unwrap()[0];
        for i in 0..6 {
            let expected = data.val()[&[i, a][..]] * data.val()[&[i, b][..]];
            assert_eq!(read.val()[&[i, k][..]], expected);
        }
    }
}

#[test]
fn row_subset_of_pairs_matches_pairs_of_row_subset() {
    let data = genotypes(8, 4, 3);
    let rows = Selector::slice(Some(1), None, 2);

    let pairs = Arc::new(PairReader::within(data.clone()).unwrap().with_standardize(false));
    let from_pairs: Data<f64> = pairs
        .subset(rows.clone(), ..)
        .unwrap()
        .read(&ReadOptions::default())
        .unwrap();

    let narrowed = data.subset(rows, ..).unwrap();
    let from_rows: Data<f64> = PairReader::within(Arc::new(narrowed))
        .unwrap()
        .with_standardize(false)
        .read(&ReadOptions::default())
        .unwrap();

    assert_eq!(from_pairs.val(), from_rows.val());
    assert_eq!(from_pairs.col().unwrap(), from_rows.col().unwrap());
}

#[test]
fn column_count_needs_no_labels() {
    let reader = PairReader::within(genotypes(2, 2_000, 4))
        .unwrap()
        .with_label_limit(10);
    assert_eq!(reader.col_count().unwrap(), 2_000 * 1_999 / 2);
    assert_eq!(reader.shape().unwrap(), (2, 1_999_000));
    assert!(reader.col().is_err());

    let last = reader
        .read_val::<f64>(
            &Resolved::Full(2),
            &Resolved::List(vec![1_998_999]),
            &ReadOptions::default(),
        )
        .unwrap();
    assert_eq!(last.shape(), &[2, 1]);
}

#[cfg(feature = "mmap")]
#[test]
fn pairs_over_a_memory_mapped_file() {
    use lazymat::{MemMap, WriteConfig, Writer};

    let dir = tempfile::tempdir().unwrap();
    let data = genotypes(7, 6, 5);
    let map = MemMap::<f64>::write(dir.path().join("geno.lzm"), &*data, &WriteConfig::default())
        .unwrap();

    let expected: Data<f64> = PairReader::within(data)
        .unwrap()
        .read(&ReadOptions::default())
        .unwrap();
    let actual: Data<f64> = PairReader::within(Arc::new(map))
        .unwrap()
        .read(&ReadOptions::default())
        .unwrap();
    assert!(actual.allclose(&expected, true));
}
