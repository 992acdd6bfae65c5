use streamsketch::hll::{HllSketch, HllType, HllUnion};

#[test]
fn test_basic_update() {
    let mut sketch = HllSketch::new(12, HllType::Hll8);

    assert_eq!(sketch.estimate(), 0.0);

    for i in 0..100 {
        sketch.update(i);
    }

    let estimate = sketch.estimate();
    assert!(estimate > 0.0, "estimate should be positive after updates");
    assert!(
        (estimate - 100.0).abs() < 20.0,
        "estimate should be reasonably close to 100, got {}",
        estimate
    );
}

#[test]
fn test_list_to_set_promotion() {
    // lg_k=12 exceeds the List->Set threshold, so the ninth distinct
    // coupon promotes to Set rather than straight to a register array.
    let mut sketch = HllSketch::new(12, HllType::Hll8);

    for i in 0..600 {
        sketch.update(i);
    }

    let estimate = sketch.estimate();
    assert!(
        (estimate - 600.0).abs() < 100.0,
        "estimate should be close to 600 after promotion, got {}",
        estimate
    );
}

#[test]
fn test_set_to_hll_promotion() {
    // lg_k=10 (k=1024); set promotes to HLL mode past 75% = 768.
    let mut sketch = HllSketch::new(10, HllType::Hll8);

    for i in 0..1000 {
        sketch.update(i);
    }

    let estimate = sketch.estimate();
    assert!(
        (estimate - 1000.0).abs() < 150.0,
        "estimate should be close to 1000 after full promotion, got {}",
        estimate
    );
}

#[test]
fn test_bounds_straddle_estimate_across_std_devs() {
    let mut sketch = HllSketch::new(11, HllType::Hll4);
    for i in 0..2000 {
        sketch.update(i);
    }
    let estimate = sketch.estimate();
    for n_std_dev in 1..=3u8 {
        assert!(sketch.lower_bound(n_std_dev) <= estimate);
        assert!(estimate <= sketch.upper_bound(n_std_dev));
    }
}

#[test]
fn test_serialize_round_trip_across_modes_and_types() {
    for hll_type in [HllType::Hll4, HllType::Hll6, HllType::Hll8] {
        let mut sketch = HllSketch::new(10, hll_type);
        for i in 0..3_000u32 {
            sketch.update(i);
        }
        for compact in [true, false] {
            let bytes = sketch.serialize(compact);
            let restored = HllSketch::deserialize(&bytes).unwrap();
            assert_eq!(restored.target_type(), hll_type);
            let before = sketch.estimate();
            let after = restored.estimate();
            assert!((before - after).abs() / before < 0.05);
        }
    }
}

#[test]
fn test_union_of_differing_configurations_uses_smaller_lg_k() {
    let mut a = HllSketch::new(10, HllType::Hll8);
    let mut b = HllSketch::new(14, HllType::Hll8);
    for i in 0..5_000u32 {
        a.update(i);
    }
    for i in 2_500..7_500u32 {
        b.update(i);
    }

    let mut union = HllUnion::new(12);
    union.update(&a);
    union.update(&b);

    let result = union.get_result(HllType::Hll4);
    assert_eq!(result.lg_config_k(), 10);
    let estimate = result.estimate();
    assert!(
        (estimate - 7_500.0).abs() / 7_500.0 < 0.15,
        "union estimate should be within 15% of the true union cardinality, got {}",
        estimate
    );
}

#[test]
fn test_union_with_empty_sketch_is_a_no_op() {
    let mut sketch = HllSketch::new(12, HllType::Hll8);
    for i in 0..200u32 {
        sketch.update(i);
    }
    let empty = HllSketch::new(12, HllType::Hll8);

    let mut union = HllUnion::new(12);
    union.update(&sketch);
    union.update(&empty);

    let result = union.get_result(HllType::Hll8);
    assert!((result.estimate() - sketch.estimate()).abs() / sketch.estimate() < 0.05);
}

#[test]
fn test_reset_returns_to_empty_list_mode() {
    let mut sketch = HllSketch::new(12, HllType::Hll6);
    for i in 0..50u32 {
        sketch.update(i);
    }
    assert!(!sketch.is_empty());
    sketch.reset();
    assert!(sketch.is_empty());
    assert_eq!(sketch.estimate(), 0.0);
}
