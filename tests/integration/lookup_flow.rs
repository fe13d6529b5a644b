//! Load from disk, then query the engine directly.

use sales_forecast::data::{loader, Dataset, DatasetCache};
use sales_forecast::engine::lookup::{self, TOP_SHOPS};
use sales_forecast::types::ForecastError;

use crate::fixtures::{ranked_predictions, CsvFixture, EXAMPLE_ITEMS, EXAMPLE_PREDICTIONS};

#[test]
fn test_worked_example_from_disk() {
    let fx = CsvFixture::with_items(EXAMPLE_PREDICTIONS, EXAMPLE_ITEMS);
    let mut cache = DatasetCache::new();
    let ds = Dataset::load(&mut cache, &fx.data_config()).unwrap();

    let s = lookup::summarize(&ds.predictions, 1).unwrap();
    assert_eq!(s.total_sales, 8.0);
    assert_eq!(s.shop_count, 2);
    assert_eq!(s.average_per_shop, 4.0);
    let top: Vec<(i64, f64)> = s.top_shops.iter().map(|t| (t.shop_id, t.item_cnt_month)).collect();
    assert_eq!(top, vec![(10, 5.0), (11, 3.0)]);
    assert_eq!(ds.category_of(1), Some(40));

    assert!(matches!(
        lookup::summarize(&ds.predictions, 99),
        Err(ForecastError::ItemNotFound(99))
    ));
}

#[test]
fn test_every_item_sums_its_rows() {
    let mut csv = String::from("item_id,shop_id,item_cnt_month\n");
    for item in 0..15 {
        for shop in 0..(item % 9 + 1) {
            csv.push_str(&format!("{item},{shop},{}\n", (item * 13 + shop * 7) % 11));
        }
    }
    let fx = CsvFixture::new(&csv);
    let table = loader::load_predictions(&fx.predictions).unwrap();

    for item in table.distinct_items() {
        let rows: Vec<_> = table.rows_for(item).collect();
        let expected: f64 = rows.iter().map(|r| r.item_cnt_month).sum();
        let s = lookup::summarize(&table, item).unwrap();
        assert_eq!(s.shop_count, rows.len());
        assert_eq!(s.total_sales, expected);
        assert_eq!(s.top_shops.len(), rows.len().min(TOP_SHOPS));
        assert!(s
            .top_shops
            .windows(2)
            .all(|w| w[0].item_cnt_month >= w[1].item_cnt_month));
        let back = s.average_per_shop * s.shop_count as f64;
        assert!((back - s.total_sales).abs() <= 1e-6 * s.total_sales.abs().max(1.0));
    }
}

#[test]
fn test_diverse_sample_from_disk() {
    let fx = CsvFixture::new(&ranked_predictions());
    let table = loader::load_predictions(&fx.predictions).unwrap();
    let sample = lookup::diverse_sample(&table);
    assert_eq!(sample, vec![20, 19, 18, 10, 9, 8, 7, 1, 2, 3]);
}

#[test]
fn test_changed_file_picked_up_by_cache() {
    let fx = CsvFixture::new(EXAMPLE_PREDICTIONS);
    let cfg = fx.data_config();
    let mut cache = DatasetCache::new();

    let before = Dataset::load(&mut cache, &cfg).unwrap();
    assert!(before.items.is_none());

    fx.rewrite_predictions("item_id,shop_id,item_cnt_month\n1,10,7.5\n");
    let after = Dataset::load(&mut cache, &cfg).unwrap();
    assert!(after.differs_from(&before));
    assert_eq!(lookup::summarize(&after.predictions, 1).unwrap().total_sales, 7.5);
    assert!(lookup::summarize(&after.predictions, 2).is_err());
}

#[test]
fn test_malformed_predictions_fatal() {
    let fx = CsvFixture::new("item_id,shop_id,item_cnt_month\n1,x,2.0\n");
    let mut cache = DatasetCache::new();
    let err = Dataset::load(&mut cache, &fx.data_config()).unwrap_err();
    match err {
        ForecastError::Csv { path, message } => {
            assert_eq!(path, fx.data_config().predictions_path);
            assert!(message.starts_with("line 2:"), "{message}");
        }
        other => panic!("unexpected error: {other}"),
    }
}
