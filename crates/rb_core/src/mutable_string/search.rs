//! Searching. Character searches return character indexes, byte searches
//! return byte indexes; `index_of_string` searches in this string's native
//! units.

use super::MutableString;
use crate::content::{find, rfind};

impl MutableString {
    pub fn index_of_char(&self, c: char, start: usize) -> Option<usize> {
        let mut buf = [0u16; 2];
        find(&self.content.units(self.encoding)[..], &*c.encode_utf16(&mut buf), start)
    }

    pub fn last_index_of_char(&self, c: char, start: usize) -> Option<usize> {
        let mut buf = [0u16; 2];
        rfind(&self.content.units(self.encoding)[..], &*c.encode_utf16(&mut buf), start)
    }

    pub fn index_of_str(&self, needle: &str, start: usize) -> Option<usize> {
        let needle: Vec<u16> = needle.encode_utf16().collect();
        find(&self.content.units(self.encoding)[..], &needle[..], start)
    }

    pub fn last_index_of_str(&self, needle: &str, start: usize) -> Option<usize> {
        let needle: Vec<u16> = needle.encode_utf16().collect();
        rfind(&self.content.units(self.encoding)[..], &needle[..], start)
    }

    pub fn index_of_byte(&self, byte: u8, start: usize) -> Option<usize> {
        find(&self.content.bytes_lossy(self.encoding)[..], &[byte], start)
    }

    pub fn last_index_of_byte(&self, byte: u8, start: usize) -> Option<usize> {
        rfind(&self.content.bytes_lossy(self.encoding)[..], &[byte], start)
    }

    pub fn index_of_bytes(&self, needle: &[u8], start: usize) -> Option<usize> {
        find(&self.content.bytes_lossy(self.encoding)[..], needle, start)
    }

    pub fn last_index_of_bytes(&self, needle: &[u8], start: usize) -> Option<usize> {
        rfind(&self.content.bytes_lossy(self.encoding)[..], needle, start)
    }

    pub fn index_of_string(&self, needle: &MutableString, start: usize) -> Option<usize> {
        if self.is_binary() {
            let needle = needle.content.bytes_lossy(needle.encoding);
            self.index_of_bytes(&needle[..], start)
        } else {
            let needle = needle.content.units(needle.encoding);
            find(&self.content.units(self.encoding)[..], &needle[..], start)
        }
    }

    pub fn last_index_of_string(&self, needle: &MutableString, start: usize) -> Option<usize> {
        if self.is_binary() {
            let needle = needle.content.bytes_lossy(needle.encoding);
            self.last_index_of_bytes(&needle[..], start)
        } else {
            let needle = needle.content.units(needle.encoding);
            rfind(&self.content.units(self.encoding)[..], &needle[..], start)
        }
    }
}
