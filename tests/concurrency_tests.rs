use std::sync::Arc;
use std::thread;

use ecql::{compile_filter, Expr, Feature, Filter, Value};

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn test_trees_are_send_and_sync() {
    assert_send_sync::<Filter>();
    assert_send_sync::<Expr>();
}

#[test]
fn test_shared_filter_evaluates_concurrently() {
    let filter = Arc::new(compile_filter("depth > 100 AND name LIKE 'St%'").unwrap());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let filter = Arc::clone(&filter);
            thread::spawn(move || {
                let record = Feature::new("station", format!("station.{}", i))
                    .with("depth", Value::Int(100 + i))
                    .with("name", Value::Str("Stockholm".into()));
                let expected = 100 + i > 100;
                for _ in 0..100 {
                    assert_eq!(filter.evaluate(&record).unwrap(), expected);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("worker should not panic");
    }
}

#[test]
fn test_independent_compilers_run_in_parallel() {
    let handles: Vec<_> = (0..8)
        .map(|i| {
            thread::spawn(move || {
                let source = format!("depth > {} AND name LIKE 'St%'", i * 10);
                let filter = compile_filter(&source).unwrap();
                let record = Feature::new("station", "s")
                    .with("depth", Value::Int(35))
                    .with("name", Value::Str("Stockholm".into()));
                assert_eq!(filter.evaluate(&record).unwrap(), 35 > i * 10);
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("worker should not panic");
    }
}

#[test]
fn test_like_pattern_compiles_once_under_contention() {
    // All threads race the first LIKE evaluation; every one must see the
    // same memoized pattern result.
    let filter = Arc::new(compile_filter("name ILIKE 'st%'").unwrap());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let filter = Arc::clone(&filter);
            thread::spawn(move || {
                let hit = Feature::new("station", "a")
                    .with("name", Value::Str("STOCKHOLM".into()));
                let miss = Feature::new("station", "b")
                    .with("name", Value::Str("Oslo".into()));
                assert!(filter.evaluate(&hit).unwrap());
                assert!(!filter.evaluate(&miss).unwrap());
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("worker should not panic");
    }
}

#[test]
fn test_prepare_races_are_benign() {
    let filter = Arc::new(compile_filter("depth > 100").unwrap());
    let record = Feature::new("station", "s").with("depth", Value::Int(300));
    let descriptor = Arc::new(record.descriptor());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let filter = Arc::clone(&filter);
            let descriptor = Arc::clone(&descriptor);
            thread::spawn(move || {
                let record = Feature::new("station", "s").with("depth", Value::Int(300));
                filter.prepare(&descriptor);
                assert!(filter.evaluate(&record).unwrap());
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("worker should not panic");
    }
}
