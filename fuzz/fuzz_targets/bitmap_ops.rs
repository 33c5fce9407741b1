#![no_main]
use std::collections::BTreeSet;

use libfuzzer_sys::fuzz_target;
use rbits::{Bitmap, Format};

fuzz_target!(|data: (Vec<(u8, u32, u16)>, Vec<u32>)| {
    let (ops, other_values) = data;
    let mut bitmap = Bitmap::new();
    let mut model = BTreeSet::new();

    for (op, value, span) in ops {
        let start = u64::from(value);
        let end = (start + u64::from(span)).min(rbits::UNIVERSE_SIZE);
        match op % 5 {
            0 => {
                assert_eq!(bitmap.insert(value), model.insert(value));
            }
            1 => {
                assert_eq!(bitmap.remove(value), model.remove(&value));
            }
            2 => {
                bitmap.insert_range(start..end).unwrap();
                model.extend((start..end).map(|v| v as u32));
            }
            3 => {
                bitmap.remove_range(start..end).unwrap();
                for v in start..end {
                    model.remove(&(v as u32));
                }
            }
            _ => {
                bitmap.run_optimize();
            }
        }
    }
    assert_eq!(bitmap.len(), model.len() as u64);
    assert!(bitmap.iter().eq(model.iter().copied()));

    let other = Bitmap::from_values(&other_values);
    let other_model: BTreeSet<u32> = other_values.into_iter().collect();
    assert_eq!(bitmap.and_len(&other), (&model & &other_model).len() as u64);
    assert!(bitmap.xor(&other).iter().eq((&model ^ &other_model).into_iter()));

    for format in [Format::Portable, Format::Native] {
        let bytes = bitmap.serialize(format);
        assert_eq!(Bitmap::deserialize(&bytes, format).unwrap(), bitmap);
    }
});
