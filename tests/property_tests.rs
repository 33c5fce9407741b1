use std::collections::BTreeSet;

use proptest::prelude::*;
use rbits::{Bitmap, Format, TrackedBitmap};

/// Values clustered into a few chunks so containers of every encoding show up.
fn clustered_values() -> impl Strategy<Value = Vec<u32>> {
    let value = (0u32..4, 0u32..70_000).prop_map(|(chunk, low)| (chunk << 17) + low);
    prop::collection::vec(value, 0..3000)
}

/// A bitmap built from scattered values plus a few ranges.
fn bitmap_and_model() -> impl Strategy<Value = (Bitmap, BTreeSet<u32>)> {
    (
        clustered_values(),
        prop::collection::vec((0u64..600_000, 1u64..20_000), 0..4),
    )
        .prop_map(|(values, ranges)| {
            let mut bitmap = Bitmap::from_values(&values);
            let mut model: BTreeSet<u32> = values.into_iter().collect();
            for (start, len) in ranges {
                bitmap.insert_range(start..start + len).unwrap();
                model.extend(start as u32..(start + len) as u32);
            }
            (bitmap, model)
        })
}

fn model_of(bitmap: &Bitmap) -> BTreeSet<u32> {
    bitmap.iter().collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn cardinality_matches_distinct_values(values in clustered_values()) {
        let bitmap = Bitmap::from_values(&values);
        let model: BTreeSet<u32> = values.iter().copied().collect();
        prop_assert_eq!(bitmap.len(), model.len() as u64);
        prop_assert!(bitmap.iter().eq(model.iter().copied()));
        prop_assert_eq!(bitmap.min(), model.first().copied());
        prop_assert_eq!(bitmap.max(), model.last().copied());
    }

    #[test]
    fn mutation_sequences_track_the_model(
        ops in prop::collection::vec((any::<bool>(), prop_oneof![
            Just(0u32),
            Just(u32::MAX),
            0u32..200_000,
        ]), 0..2000),
    ) {
        let mut bitmap = Bitmap::new();
        let mut model = BTreeSet::new();
        for (add, value) in ops {
            if add {
                prop_assert_eq!(bitmap.insert(value), model.insert(value));
            } else {
                prop_assert_eq!(bitmap.remove(value), model.remove(&value));
            }
            prop_assert_eq!(bitmap.contains(value), model.contains(&value));
        }
        prop_assert_eq!(bitmap.len(), model.len() as u64);
        prop_assert_eq!(model_of(&bitmap), model);
    }

    #[test]
    fn round_trips_in_both_formats((bitmap, _) in bitmap_and_model(), optimize in any::<bool>()) {
        let mut bitmap = bitmap;
        if optimize {
            bitmap.run_optimize();
        }
        for format in [Format::Portable, Format::Native] {
            let bytes = bitmap.serialize(format);
            prop_assert_eq!(bytes.len(), bitmap.serialized_size(format));
            let decoded = Bitmap::deserialize(&bytes, format).unwrap();
            prop_assert_eq!(&decoded, &bitmap);
        }
    }

    #[test]
    fn binary_ops_match_set_algebra(
        (a, ma) in bitmap_and_model(),
        (b, mb) in bitmap_and_model(),
    ) {
        prop_assert_eq!(model_of(&a.and(&b)), &ma & &mb);
        prop_assert_eq!(model_of(&a.or(&b)), &ma | &mb);
        prop_assert_eq!(model_of(&a.xor(&b)), &ma ^ &mb);
        prop_assert_eq!(model_of(&a.and_not(&b)), &ma - &mb);

        prop_assert_eq!(a.and_len(&b), (&ma & &mb).len() as u64);
        prop_assert_eq!(a.or_len(&b), (&ma | &mb).len() as u64);
        prop_assert_eq!(a.xor_len(&b), (&ma ^ &mb).len() as u64);
        prop_assert_eq!(a.and_not_len(&b), (&ma - &mb).len() as u64);
        prop_assert_eq!(a.intersects(&b), !ma.is_disjoint(&mb));
        prop_assert_eq!(a.is_subset(&b), ma.is_subset(&mb));

        let mut inplace = a.clone();
        inplace.xor_inplace(&b);
        prop_assert_eq!(model_of(&inplace), &ma ^ &mb);
        inplace.and_not_inplace(&a);
        prop_assert_eq!(model_of(&inplace), &mb - &ma);
    }

    #[test]
    fn algebra_laws(
        (a, _) in bitmap_and_model(),
        (b, _) in bitmap_and_model(),
        (c, _) in bitmap_and_model(),
    ) {
        prop_assert_eq!(a.and(&b), b.and(&a));
        prop_assert_eq!(a.or(&b), b.or(&a));
        prop_assert_eq!(a.and(&b).and(&c), a.and(&b.and(&c)));
        prop_assert_eq!(a.or(&b).or(&c), a.or(&b.or(&c)));
        prop_assert_eq!(a.xor(&b), a.or(&b).and_not(&a.and(&b)));

        let end = u64::from(a.max().unwrap_or(0).max(b.max().unwrap_or(0))) + 1;
        prop_assert_eq!(a.and_not(&b), a.and(&b.flip(0..end).unwrap()));

        let many = Bitmap::or_many([&a, &b, &c]);
        prop_assert_eq!(&many, &a.or(&b).or(&c));
        prop_assert_eq!(&Bitmap::or_many_heap([&a, &b, &c]), &many);
        prop_assert_eq!(Bitmap::xor_many([&a, &b, &c]), a.xor(&b).xor(&c));
    }

    #[test]
    fn lazy_results_repair_to_exact_results(
        (a, _) in bitmap_and_model(),
        (b, _) in bitmap_and_model(),
        convert in any::<bool>(),
    ) {
        prop_assert_eq!(a.lazy_or(&b, convert).repair(), a.or(&b));
        prop_assert_eq!(a.lazy_xor(&b, convert).repair(), a.xor(&b));
    }

    #[test]
    fn encoding_is_invisible_to_queries((bitmap, model) in bitmap_and_model()) {
        let mut optimized = bitmap.clone();
        optimized.run_optimize();
        let mut plain = optimized.clone();
        plain.remove_run_compression();

        for candidate in [&bitmap, &optimized, &plain] {
            prop_assert_eq!(candidate.len(), model.len() as u64);
            prop_assert_eq!(candidate, &bitmap);
            for &v in model.iter().step_by(97) {
                prop_assert!(candidate.contains(v));
                prop_assert_eq!(candidate.select(candidate.rank(v) - 1), Some(v));
            }
            prop_assert!(!candidate.contains(700_000));
        }
        prop_assert!(plain.statistics().run_containers == 0);
    }

    #[test]
    fn tracked_population_follows_mutations(
        edits in prop::collection::vec((0u64..5000, 0u64..50, any::<bool>()), 1..40),
    ) {
        let mut tracked = TrackedBitmap::new();
        let mut model = BTreeSet::new();
        for (start, len, value) in edits {
            tracked.set_range(start, start + len, value).unwrap();
            for i in start..=start + len {
                if value {
                    model.insert(i as u32);
                } else {
                    model.remove(&(i as u32));
                }
            }
            prop_assert_eq!(tracked.population_count(), model.len() as u64);
            prop_assert_eq!(tracked.has_value(), !model.is_empty());
        }
        prop_assert!(tracked.values().iter().copied().eq(model.iter().copied()));
    }
}
