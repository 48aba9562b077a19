/// First position at or after `start` where `needle` occurs in `haystack`.
pub(crate) fn find<T: PartialEq>(haystack: &[T], needle: &[T], start: usize) -> Option<usize> {
    if start > haystack.len() {
        return None;
    }
    if needle.is_empty() {
        return Some(start);
    }
    haystack[start..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + start)
}

/// Last position at or before `start` where `needle` occurs in `haystack`.
pub(crate) fn rfind<T: PartialEq>(haystack: &[T], needle: &[T], start: usize) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    let last = start.min(haystack.len() - needle.len());
    (0..=last)
        .rev()
        .find(|&pos| &haystack[pos..pos + needle.len()] == needle)
}
