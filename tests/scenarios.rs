use rbits::{Bitmap, Error, Format, UNIVERSE_SIZE};

fn first_set() -> Bitmap {
    Bitmap::from_values(&[1, 2, 3, 4, 5, 100, 1000])
}

#[test]
fn build_and_query() {
    let b = first_set();
    assert_eq!(b.len(), 7);
    assert!(b.contains(100));
    assert!(!b.contains(6));
    assert_eq!(b.to_vec(), vec![1, 2, 3, 4, 5, 100, 1000]);
}

#[test]
fn union_with_overlap() {
    let b = first_set().or(&Bitmap::from_values(&[3, 4, 5, 7, 100, 1020]));
    assert_eq!(b.len(), 9);
    assert_eq!(b.to_vec(), vec![1, 2, 3, 4, 5, 7, 100, 1000, 1020]);

    let mut inplace = first_set();
    inplace |= &Bitmap::from_values(&[3, 4, 5, 7, 100, 1020]);
    assert_eq!(inplace, b);
}

#[test]
fn flip_prefix() {
    let flipped = first_set().flip(0..1001).unwrap();
    assert_eq!(flipped.len(), 994);
    assert!(flipped.contains(0));
    assert!(flipped.contains(999));
    assert!(!flipped.contains(1000));
}

#[test]
fn separated_clusters_use_two_arrays() {
    let mut b = Bitmap::from_values(&[1, 2, 3, 4, 6, 7]);
    b.insert_many(&[999_991, 999_992, 999_993, 999_994, 999_996, 999_997]);
    let stats = b.statistics();
    assert_eq!(stats.containers, 2);
    assert_eq!(stats.array_containers, 2);
    assert_eq!(stats.bitset_containers + stats.run_containers, 0);
}

#[test]
fn portable_round_trip_of_mixed_bitmap() {
    let mut b = first_set();
    b.insert_range(1 << 20..(1 << 20) + 50_000).unwrap();
    b.extend((3_000_000..3_100_000).step_by(7));
    b.run_optimize();

    let bytes = b.serialize(Format::Portable);
    let back = Bitmap::deserialize(&bytes, Format::Portable).unwrap();
    assert_eq!(back, b);
    assert_eq!(back.statistics(), b.statistics());

    let native = b.serialize(Format::Native);
    assert_eq!(Bitmap::deserialize(&native, Format::Native).unwrap(), b);
}

#[test]
fn full_and_empty_universe() {
    let full = Bitmap::from_range(0..UNIVERSE_SIZE, 1).unwrap();
    assert_eq!(full.len(), UNIVERSE_SIZE);
    assert!(full.contains(0) && full.contains(u32::MAX));
    let empty = full.flip(0..UNIVERSE_SIZE).unwrap();
    assert!(empty.is_empty());

    let bytes = empty.serialize(Format::Portable);
    assert!(Bitmap::deserialize(&bytes, Format::Portable).unwrap().is_empty());
}

#[test]
fn domain_errors_leave_the_bitmap_untouched() {
    let mut b = first_set();
    assert!(matches!(
        b.insert_range(10..UNIVERSE_SIZE + 1),
        Err(Error::ValueOutOfRange(_))
    ));
    assert!(matches!(b.remove_range(9..3), Err(Error::InvalidRange { .. })));
    assert!(b.flip_inplace(0..UNIVERSE_SIZE + 5).is_err());
    assert_eq!(b, first_set());
}

#[test]
fn corrupted_buffer_is_rejected() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    let mut bytes = first_set().serialize(Format::Portable);
    let last = bytes.len() - 1;
    bytes[last - 1] = 0;
    bytes[last] = 0;
    let err = Bitmap::deserialize(&bytes, Format::Portable).unwrap_err();
    assert!(matches!(err, Error::InvalidEncoding(_)));
}
