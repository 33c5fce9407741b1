#![no_main]
use libfuzzer_sys::fuzz_target;
use rbits::{Bitmap, Format};

fuzz_target!(|data: &[u8]| {
    for format in [Format::Portable, Format::Native] {
        if let Ok(bitmap) = Bitmap::deserialize(data, format) {
            // Anything accepted must re-encode to an equal bitmap.
            let bytes = bitmap.serialize(format);
            let again = Bitmap::deserialize(&bytes, format).unwrap();
            assert_eq!(again, bitmap);
            assert_eq!(again.len(), bitmap.iter().count() as u64);
        }
    }
});
