#![cfg(feature = "mmap")]

use lazymat::{
    Data, FileCache, Iid, LocalCache, MapStatus, MemMap, Order, ReadOptions, Reader, ReaderExt,
    Resolved, Selector, StorageOrder, WriteConfig, Writer,
};
use ndarray::{Array2, Array3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

fn random_data(rows: usize, cols: usize, seed: u64) -> Data<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let val = Array2::from_shape_fn((rows, cols), |_| {
        if rng.gen_bool(0.1) {
            f64::NAN
        } else {
            rng.gen_range(-5.0..5.0)
        }
    });
    let row: Vec<Iid> = (0..rows)
        .map(|i| Iid::new(format!("fam{}", i % 3), format!("person{i}")))
        .collect();
    let col: Vec<String> = (0..cols).map(|j| format!("snp_{j}")).collect();
    let row_property = Array2::from_shape_fn((rows, 2), |(i, k)| (i * 2 + k) as f64);
    let col_property = Array2::from_shape_fn((cols, 3), |(j, k)| (j as f64) * 0.5 + k as f64);
    Data::builder()
        .row(row)
        .col(col)
        .row_property(row_property)
        .col_property(col_property)
        .val(val.into_dyn())
        .name("random")
        .build()
        .unwrap()
}

#[test]
fn data_survives_memmap_in_both_orders() {
    let dir = tempfile::tempdir().unwrap();
    let data = random_data(13, 9, 7);

    for order in [StorageOrder::C, StorageOrder::F] {
        let path = dir.path().join(format!("random_{order:?}.lzm"));
        let written =
            MemMap::<f64>::write(&path, &data, &WriteConfig::default().with_order(order)).unwrap();
        assert_eq!(written.status(), MapStatus::ReadOnly);
        assert_eq!(written.header().unwrap().nrows, 13);

        let reopened = MemMap::<f64>::open_path(&path).unwrap();
        let back: Data<f64> = reopened.read(&ReadOptions::default()).unwrap();
        assert!(back.allclose(&data, true));
        assert_eq!(back.row().unwrap(), data.row().unwrap());
        assert_eq!(back.col_property().unwrap(), data.col_property().unwrap());
    }
}

#[test]
fn data_survives_a_local_cache() {
    let dir = tempfile::tempdir().unwrap();
    let cache = LocalCache::new(dir.path());
    let data = random_data(6, 5, 11);

    let written =
        MemMap::<f64>::write_cached(&cache, "runs/geno.lzm", &data, &WriteConfig::default())
            .unwrap();
    assert_eq!(written.status(), MapStatus::ReadOnly);
    assert!(written.path().starts_with(dir.path()));
    let names = cache.walk(None).unwrap().collect::<lazymat::Result<Vec<_>>>().unwrap();
    assert_eq!(names, ["runs/geno.lzm"]);

    let reopened = MemMap::<f64>::open_cached(&cache, "runs/geno.lzm").unwrap();
    let back: Data<f64> = reopened.read(&ReadOptions::default()).unwrap();
    assert!(back.allclose(&data, true));
    assert_eq!(back.col().unwrap(), data.col().unwrap());

    assert!(MemMap::<f64>::open_cached(&cache, "runs/missing.lzm").is_err());
    assert!(MemMap::<f64>::write_cached(&cache, "../escape.lzm", &data, &WriteConfig::default())
        .is_err());
    assert!(!cache.file_exists("runs/geno.lzm.temp").unwrap());
}

#[test]
fn narrowing_write_and_widening_read() {
    let dir = tempfile::tempdir().unwrap();
    let data = random_data(5, 4, 11);
    let path = dir.path().join("narrow.lzm");
    let map = MemMap::<f32>::write(&path, &data, &WriteConfig::default()).unwrap();

    let back: Data<f64> = map.read(&ReadOptions::default()).unwrap();
    assert!(back.allclose_with(&data, 1e-6, 1e-6, true));
}

#[test]
fn subset_of_file_written_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let data = random_data(10, 8, 3);
    let first = Arc::new(
        MemMap::<f64>::write(dir.path().join("first.lzm"), &data, &WriteConfig::default())
            .unwrap(),
    );

    let view = first
        .subset(Selector::slice(Some(-1), None, -2), vec![7usize, 0, 3])
        .unwrap();
    let config = WriteConfig::default()
        .with_order(StorageOrder::C)
        .with_block_size(2)
        .with_num_threads(2);
    let second = MemMap::<f64>::write(dir.path().join("second.lzm"), &view, &config).unwrap();

    let expected: Data<f64> = data
        .read_val::<f64>(
            &Selector::slice(Some(-1), None, -2).resolve(10).unwrap(),
            &Resolved::List(vec![7, 0, 3]),
            &ReadOptions::default(),
        )
        .map(|val| {
            Data::from_parts(
                view.row().unwrap().clone(),
                view.col().unwrap().clone(),
                view.row_property().unwrap().clone(),
                view.col_property().unwrap().clone(),
                val,
                "expected",
            )
            .unwrap()
        })
        .unwrap();
    let back: Data<f64> = second.read(&ReadOptions::default()).unwrap();
    assert!(back.allclose(&expected, true));
    assert_eq!(back.row().unwrap().labels()[0], Iid::new("fam0", "person9"));
    assert_eq!(back.col().unwrap().labels(), &["snp_7", "snp_0", "snp_3"]);
    assert_eq!(back.row_property().unwrap()[(0, 1)], 19.0);
}

#[test]
fn three_d_values_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let val = Array3::from_shape_fn((4, 3, 3), |(i, j, k)| (i * 100 + j * 10 + k) as f32);
    let data = Data::<f32>::try_from(val.into_dyn()).unwrap();

    for order in [StorageOrder::C, StorageOrder::F] {
        let path = dir.path().join(format!("three_{order:?}.lzm"));
        let map = MemMap::<f32>::write(&path, &data, &WriteConfig::default().with_order(order))
            .unwrap();
        assert_eq!(map.depth().unwrap(), Some(3));
        assert_eq!(map.header().unwrap().ndim, 3);
        let back: Data<f32> = map
            .read(&ReadOptions::default().with_order(Order::Any))
            .unwrap();
        assert_eq!(back, data);
    }
}

#[test]
fn allow_view_on_data_shares_the_buffer() {
    let data = random_data(3, 3, 5);
    let shared: Data<f64> = data
        .read(&ReadOptions::default().with_order(Order::Any).with_allow_view(true))
        .unwrap();
    assert_eq!(shared.val().as_ptr(), data.val().as_ptr());

    let copied: Data<f64> = data
        .read(&ReadOptions::default().with_order(Order::Any))
        .unwrap();
    assert_ne!(copied.val().as_ptr(), data.val().as_ptr());
}

#[test]
fn empty_dataset_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let data = Data::<f64>::try_from(Array2::<f64>::zeros((0, 4)).into_dyn()).unwrap();
    let map = MemMap::<f64>::write(dir.path().join("empty.lzm"), &data, &WriteConfig::default())
        .unwrap();
    assert_eq!(map.shape().unwrap(), (0, 4));
    let back: Data<f64> = map.read(&ReadOptions::default()).unwrap();
    assert_eq!(back.val().shape(), &[0, 4]);
}
