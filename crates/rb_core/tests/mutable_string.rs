use rb_core::encoding::{BINARY, ISO_8859_1, ISO_8859_15, US_ASCII, UTF_8};
use rb_core::{MutableString, Representation, StringError};

#[test]
fn factories_pick_representation() {
    assert_eq!(MutableString::create_text("abc", &UTF_8).representation(), Representation::Text);
    assert_eq!(MutableString::create_binary(b"abc".to_vec(), &UTF_8).representation(), Representation::Bytes);
    assert_eq!(MutableString::create_binary(b"abc".to_vec(), &ISO_8859_1).representation(), Representation::ByteChars);
    assert_eq!(MutableString::create_empty_mutable(&UTF_8).representation(), Representation::Chars);
    assert_eq!(MutableString::create_empty_mutable(&ISO_8859_15).representation(), Representation::ByteChars);
    assert_eq!(MutableString::create_empty_binary(&BINARY).representation(), Representation::Bytes);
}

#[test]
fn text_round_trips_including_multibyte() {
    for text in ["", "plain", "日本語", "emoji 😀 pair", "mixed é and ß"] {
        let s = MutableString::create_text(text, &UTF_8);
        assert_eq!(s.to_text().unwrap(), text);
        assert_eq!(s.to_bytes().unwrap(), text.as_bytes());
    }
}

#[test]
fn first_mutation_copies_shared_text() {
    let mut s = MutableString::create_text("abc", &UTF_8);
    s.append_char('d').unwrap();
    assert_eq!(s.representation(), Representation::Chars);
    assert_eq!(s.to_text().unwrap(), "abcd");
}

#[test]
fn appending_text_to_bytes_stays_binary() {
    let mut s = MutableString::create_binary(b"ab".to_vec(), &UTF_8);
    s.append_str("é").unwrap();
    assert_eq!(s.representation(), Representation::Bytes);
    assert_eq!(s.to_bytes().unwrap(), "abé".as_bytes());
    assert_eq!(s.char_count(), 3);
    assert_eq!(s.byte_count().unwrap(), 4);
}

#[test]
fn char_and_byte_access_on_multibyte_content() {
    let s = MutableString::create_text("aé😀", &UTF_8);
    assert_eq!(s.char_count(), 4);
    assert_eq!(s.char_at(1).unwrap(), 0x00E9);
    assert_eq!(s.char_at(2).unwrap(), 0xD83D);
    assert_eq!(s.byte_at(1).unwrap(), 0xC3);
    assert_eq!(s.byte_at(2).unwrap(), 0xA9);
    assert!(matches!(s.char_at(4), Err(StringError::IndexOutOfRange { index: 4, len: 4 })));
    assert!(matches!(s.byte_at(7), Err(StringError::IndexOutOfRange { index: 7, len: 7 })));
}

#[test]
fn byte_content_decodes_chars_without_switching() {
    let s = MutableString::create_binary("héllo".as_bytes().to_vec(), &UTF_8);
    assert_eq!(s.char_at(1).unwrap(), 0x00E9);
    assert_eq!(s.char_at(2).unwrap(), 'l' as u16);
    assert_eq!(s.representation(), Representation::Bytes);
}

#[test]
fn slices_are_independent_and_keep_representation() {
    let source = MutableString::create_binary(b"hello world".to_vec(), &UTF_8);
    let mut slice = source.get_slice(6, 5).unwrap();
    assert_eq!(slice.representation(), Representation::Bytes);
    slice.append_str("!").unwrap();
    assert_eq!(slice.to_text().unwrap(), "world!");
    assert_eq!(source.to_text().unwrap(), "hello world");
    assert!(matches!(source.get_slice(6, 6), Err(StringError::IndexOutOfRange { .. })));
    assert!(matches!(source.get_slice(12, 0), Err(StringError::IndexOutOfRange { .. })));
}

#[test]
fn slice_through_surrogate_pair_falls_back_to_chars() {
    let s = MutableString::create_text("a😀b", &UTF_8);
    let slice = s.get_slice(0, 2).unwrap();
    assert_eq!(slice.representation(), Representation::Chars);
    assert_eq!(slice.len(), 2);
    assert_eq!(s.get_string_slice(1, 2).unwrap(), "😀");
}

#[test]
fn freeze_is_idempotent_and_blocks_every_mutator() {
    let mut s = MutableString::from("abc");
    s.freeze();
    s.freeze();
    let version = s.version();
    let hash = s.hash_code();
    let other = MutableString::from("x");
    assert!(s.append_str("d").unwrap_err().is_frozen());
    assert!(s.append_char('d').unwrap_err().is_frozen());
    assert!(s.append_bytes(b"d").unwrap_err().is_frozen());
    assert!(s.append_string(&other).unwrap_err().is_frozen());
    assert!(s.insert_str(0, "d").unwrap_err().is_frozen());
    assert!(s.insert_bytes(0, b"d").unwrap_err().is_frozen());
    assert!(s.remove(0, 1).unwrap_err().is_frozen());
    assert!(s.replace(0, 1, &other).unwrap_err().is_frozen());
    assert!(s.set_char(0, 'z' as u16).unwrap_err().is_frozen());
    assert!(s.set_byte(0, b'z').unwrap_err().is_frozen());
    assert!(s.reverse().unwrap_err().is_frozen());
    assert!(s.clear().unwrap_err().is_frozen());
    assert!(s.force_encoding(&BINARY).unwrap_err().is_frozen());
    assert!(s.transcode(&ISO_8859_1).unwrap_err().is_frozen());
    assert!(s.set_tainted(true).unwrap_err().is_frozen());
    assert_eq!(s.version(), version);
    assert_eq!(s.hash_code(), hash);
    assert_eq!(s.to_text().unwrap(), "abc");
}

#[test]
fn canonical_empty_string_is_frozen_and_shared() {
    let a = MutableString::frozen_empty();
    let b = MutableString::frozen_empty();
    assert!(std::ptr::eq(a, b));
    assert!(a.is_frozen());
    assert!(a.is_empty());
    let mut copy = a.clone();
    assert!(!copy.is_frozen());
    copy.append_str("ok").unwrap();
}

#[test]
fn clone_copies_content_and_taint_but_resets_version() {
    let mut s = MutableString::from("abc");
    s.append_str("def").unwrap();
    s.set_tainted(true).unwrap();
    let mut copy = s.clone();
    assert_eq!(copy.version(), 0);
    assert!(copy.is_tainted());
    copy.append_str("!").unwrap();
    assert_eq!(s.to_text().unwrap(), "abcdef");
    assert_eq!(copy.to_text().unwrap(), "abcdef!");
}

#[test]
fn taint_propagates_through_append_and_concat() {
    let mut dirty = MutableString::from("in");
    dirty.set_tainted(true).unwrap();
    let mut clean = MutableString::from("out");
    let joined = clean.concat(&dirty).unwrap();
    assert!(joined.is_tainted());
    assert!(!clean.is_tainted());
    clean.append_string(&dirty).unwrap();
    assert!(clean.is_tainted());
}

#[test]
fn encoding_mixing_rules() {
    // raw side with ASCII on the other side: non-raw wins
    let mut raw = MutableString::create_binary(b"\xff".to_vec(), &BINARY);
    raw.append_string(&MutableString::create_text("ab", &UTF_8)).unwrap();
    assert_eq!(raw.encoding(), &UTF_8);

    // ASCII raw content adopts the other side's encoding
    let mut ascii_raw = MutableString::create_binary(b"abc".to_vec(), &BINARY);
    ascii_raw.append_string(&MutableString::create_text("日本", &UTF_8)).unwrap();
    assert_eq!(ascii_raw.encoding(), &UTF_8);
    assert_eq!(ascii_raw.to_text().unwrap(), "abc日本");

    // both ASCII: keep current
    let mut latin = MutableString::create_text("abc", &ISO_8859_1);
    latin.append_string(&MutableString::create_text("def", &UTF_8)).unwrap();
    assert_eq!(latin.encoding(), &ISO_8859_1);

    // multibyte on both sides: incompatible, string untouched
    let mut utf = MutableString::create_text("é", &UTF_8);
    let version = utf.version();
    let err = utf
        .append_string(&MutableString::create_binary(vec![0xE9], &ISO_8859_1))
        .unwrap_err();
    assert!(matches!(
        err,
        StringError::EncodingCompatibility { left: "UTF-8", right: "ISO-8859-1" }
    ));
    assert_eq!(utf.version(), version);
    assert_eq!(utf.to_text().unwrap(), "é");
}

#[test]
fn equality_across_representations() {
    let text = MutableString::create_text("héllo", &UTF_8);
    let bytes = MutableString::create_binary("héllo".as_bytes().to_vec(), &UTF_8);
    let mut chars = MutableString::create_empty_mutable(&UTF_8);
    chars.append_str("héllo").unwrap();
    assert_eq!(text, bytes);
    assert_eq!(text, chars);
    assert_eq!(text.hash_code(), bytes.hash_code());
    assert_eq!(text.hash_code(), chars.hash_code());
}

#[test]
fn ascii_strings_compare_equal_across_encodings() {
    let a = MutableString::create_text("abc", &UTF_8);
    let b = MutableString::create_binary(b"abc".to_vec(), &US_ASCII);
    assert_eq!(a, b);
    assert_eq!(a.hash_code(), b.hash_code());
}

#[test]
fn non_ascii_strings_in_different_encodings_differ() {
    let utf = MutableString::create_binary(vec![0xC3, 0xA9], &UTF_8);
    let raw = MutableString::create_binary(vec![0xC3, 0xA9], &BINARY);
    assert_ne!(utf, raw);
    assert_ne!(utf.hash_code(), raw.hash_code());
    assert_eq!(utf.compare_to(&raw), BINARY.ordinal().cmp(&UTF_8.ordinal()).reverse());
}

#[test]
fn legacy_single_byte_hash_ignores_encoding() {
    let latin1 = MutableString::create_binary(vec![b'a', 0xE9], &ISO_8859_1);
    let latin9 = MutableString::create_binary(vec![b'a', 0xE9], &ISO_8859_15);
    assert_eq!(latin1.hash_code(), latin9.hash_code());
}

#[test]
fn ordering_is_ordinal() {
    let a = MutableString::from("apple");
    let b = MutableString::from("banana");
    let bytes = MutableString::create_binary(b"apple".to_vec(), &UTF_8);
    assert!(a < b);
    assert_eq!(a.cmp(&bytes), std::cmp::Ordering::Equal);
}

#[test]
fn search_in_chars_and_bytes() {
    let s = MutableString::create_text("aébé", &UTF_8);
    assert_eq!(s.index_of_char('é', 0), Some(1));
    assert_eq!(s.index_of_char('é', 2), Some(3));
    assert_eq!(s.last_index_of_char('é', 10), Some(3));
    assert_eq!(s.index_of_str("bé", 0), Some(2));
    assert_eq!(s.index_of_byte(b'b', 0), Some(3));
    assert_eq!(s.index_of_bytes("é".as_bytes(), 2), Some(4));
    assert_eq!(s.last_index_of_byte(b'a', 5), Some(0));
    assert_eq!(s.index_of_char('z', 0), None);
    let needle = MutableString::from("bé");
    assert_eq!(s.index_of_string(&needle, 0), Some(2));
}

#[test]
fn insert_and_remove_use_native_units() {
    let mut s = MutableString::from("hello");
    s.insert_str(5, " world").unwrap();
    s.insert_char(0, '>').unwrap();
    assert_eq!(s.to_text().unwrap(), ">hello world");
    s.remove(0, 1).unwrap();
    s.remove_from(5).unwrap();
    assert_eq!(s.to_text().unwrap(), "hello");
    assert!(matches!(s.insert_str(6, "x"), Err(StringError::IndexOutOfRange { index: 6, len: 5 })));

    let mut bytes = MutableString::create_binary(b"ac".to_vec(), &BINARY);
    bytes.insert_byte(1, b'b').unwrap();
    assert_eq!(bytes.to_bytes().unwrap(), b"abc");
}

#[test]
fn insert_char_into_multibyte_bytes_switches_to_chars() {
    let mut s = MutableString::create_binary("éa".as_bytes().to_vec(), &UTF_8);
    s.insert_char(1, 'x').unwrap();
    assert_eq!(s.representation(), Representation::Chars);
    assert_eq!(s.to_text().unwrap(), "éxa");
}

#[test]
fn set_char_and_set_byte() {
    let mut s = MutableString::from("cat");
    s.set_char(0, 'b' as u16).unwrap();
    assert_eq!(s.to_text().unwrap(), "bat");
    s.set_byte(2, b'r').unwrap();
    assert_eq!(s.to_text().unwrap(), "bar");
    assert_eq!(s.representation(), Representation::Bytes);
    assert!(matches!(s.set_char(3, 'x' as u16), Err(StringError::IndexOutOfRange { .. })));
}

#[test]
fn force_encoding_keeps_bytes() {
    let mut s = MutableString::create_text("é", &UTF_8);
    s.force_encoding(&BINARY).unwrap();
    assert_eq!(s.encoding(), &BINARY);
    assert_eq!(s.to_bytes().unwrap(), vec![0xC3, 0xA9]);
    assert_eq!(s.char_count(), 2);
    s.force_encoding(&ISO_8859_1).unwrap();
    assert_eq!(s.representation(), Representation::ByteChars);
    assert_eq!(s.to_text().unwrap(), "Ã©");
}

#[test]
fn transcode_round_trips_latin1() {
    let mut s = MutableString::create_text("café", &UTF_8);
    s.transcode(&ISO_8859_1).unwrap();
    s.switch_to_binary().unwrap();
    assert_eq!(s.to_bytes().unwrap(), b"caf\xE9");
    s.transcode(&UTF_8).unwrap();
    assert_eq!(s.to_bytes().unwrap(), "café".as_bytes());
}

#[test]
fn invalid_bytes_fail_to_decode_as_text() {
    let mut s = MutableString::create_binary(b"ab\xff".to_vec(), &UTF_8);
    assert!(matches!(s.to_text(), Err(StringError::InvalidByteSequence { offset: 2, .. })));
    assert!(matches!(s.switch_to_text(), Err(StringError::InvalidByteSequence { .. })));
    assert_eq!(s.representation(), Representation::Bytes);
    assert_eq!(s.to_text_lossy(), "ab\u{FFFD}");
}

#[test]
fn representation_switch_keeps_hash_and_version() {
    let mut s = MutableString::create_text("héllo", &UTF_8);
    let hash = s.hash_code();
    let version = s.version();
    s.switch_to_binary().unwrap();
    assert_eq!(s.representation(), Representation::Bytes);
    assert_eq!(s.hash_code(), hash);
    s.switch_to_text().unwrap();
    assert_eq!(s.representation(), Representation::Chars);
    assert_eq!(s.hash_code(), hash);
    assert_eq!(s.version(), version);
}

#[test]
fn reverse_by_characters() {
    let mut s = MutableString::create_binary("añb".as_bytes().to_vec(), &UTF_8);
    s.reverse().unwrap();
    assert_eq!(s.to_text().unwrap(), "bña");
    let mut raw = MutableString::create_binary(vec![1, 2, 3], &BINARY);
    raw.reverse().unwrap();
    assert_eq!(raw.to_bytes().unwrap(), vec![3, 2, 1]);
}

#[test]
fn append_format_and_fmt_write() {
    use std::fmt::Write;
    let mut s = MutableString::from("n=");
    s.append_format(format_args!("{}", 42)).unwrap();
    write!(s, ";m={}", 7).unwrap();
    assert_eq!(s.to_text().unwrap(), "n=42;m=7");
}

#[test]
fn starts_and_ends_with() {
    let s = MutableString::create_binary("préfixe".as_bytes().to_vec(), &UTF_8);
    assert!(s.starts_with("pré"));
    assert!(s.ends_with("xe"));
    assert!(!s.starts_with("x"));
}

#[test]
fn failed_replace_leaves_string_untouched() {
    let mut s = MutableString::create_text("abc", &UTF_8);
    let version = s.version();
    let hash = s.hash_code();
    let invalid = MutableString::create_binary(vec![0xFF], &UTF_8);
    let err = s.replace(0, 1, &invalid).unwrap_err();
    assert!(matches!(err, StringError::InvalidByteSequence { .. }));
    assert_eq!(s.to_text().unwrap(), "abc");
    assert_eq!(s.encoding(), &UTF_8);
    assert_eq!(s.version(), version);
    assert_eq!(s.hash_code(), hash);
}

#[test]
fn failed_insert_string_keeps_encoding() {
    let mut s = MutableString::create_binary(b"abc".to_vec(), &BINARY);
    let version = s.version();
    let err = s.insert_string(10, &MutableString::create_text("é", &UTF_8)).unwrap_err();
    assert!(matches!(err, StringError::IndexOutOfRange { index: 10, len: 3 }));
    assert_eq!(s.encoding(), &BINARY);
    assert_eq!(s.version(), version);

    // Adopts US-ASCII first, then fails to encode the inserted text.
    let err = s.insert_string(1, &MutableString::create_text("é", &US_ASCII)).unwrap_err();
    assert!(matches!(err, StringError::Unencodable { code_point: 0xE9, .. }));
    assert_eq!(s.encoding(), &BINARY);
    assert_eq!(s.to_bytes().unwrap(), b"abc".to_vec());
    assert_eq!(s.version(), version);
}

#[test]
fn failed_append_string_restores_encoding() {
    let mut s = MutableString::create_binary(b"ab".to_vec(), &BINARY);
    let version = s.version();
    let err = s.append_string(&MutableString::create_text("é", &US_ASCII)).unwrap_err();
    assert!(matches!(err, StringError::Unencodable { .. }));
    assert_eq!(s.encoding(), &BINARY);
    assert_eq!(s.to_bytes().unwrap(), b"ab".to_vec());
    assert_eq!(s.version(), version);
}

#[test]
fn unencodable_append_leaves_bytes_untouched() {
    let mut s = MutableString::create_binary(b"abc".to_vec(), &US_ASCII);
    let version = s.version();
    let err = s.append_str("é").unwrap_err();
    assert!(matches!(err, StringError::Unencodable { code_point: 0xE9, .. }));
    assert_eq!(s.to_bytes().unwrap(), b"abc".to_vec());
    assert_eq!(s.encoding(), &US_ASCII);
    assert_eq!(s.version(), version);
}

#[test]
fn astral_ordering_follows_code_points() {
    let bmp = MutableString::create_text("\u{FFFF}", &UTF_8);
    let astral = MutableString::create_text("😀", &UTF_8);
    let mut astral_bytes = astral.clone();
    astral_bytes.switch_to_binary().unwrap();
    assert_eq!(bmp.cmp(&astral), std::cmp::Ordering::Less);
    assert_eq!(bmp.cmp(&astral_bytes), std::cmp::Ordering::Less);
    let mut astral_chars = astral_bytes.clone();
    astral_chars.switch_to_text().unwrap();
    assert_eq!(bmp.cmp(&astral_chars), std::cmp::Ordering::Less);
}

#[test]
fn raw_bytes_plus_ascii_adopt_the_non_raw_encoding() {
    let mut s = MutableString::create_binary(vec![0xFF], &BINARY);
    s.append_string(&MutableString::create_text("a", &UTF_8)).unwrap();
    assert_eq!(s.encoding(), &UTF_8);
    assert_eq!(s.to_bytes().unwrap(), b"\xFFa".to_vec());
    assert!(matches!(s.to_text(), Err(StringError::InvalidByteSequence { .. })));
}

#[test]
fn version_is_a_wide_counter() {
    let mut s = MutableString::from("a");
    let before: u64 = s.version();
    s.append_str("b").unwrap();
    assert_eq!(s.version(), before + 1);
}
