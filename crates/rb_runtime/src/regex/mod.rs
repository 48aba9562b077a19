//! Regex pattern translation.
//!
//! Rewrites source-dialect patterns into the syntax of the `regex` crate.
//! Constructs the target engine has no equivalent for are rejected instead
//! of being approximated.

mod cache;

use std::fmt::Write;
use std::sync::OnceLock;

use ::regex::Regex;
use bitflags::bitflags;
use thiserror::Error;

pub use cache::RegexCache;

#[derive(Debug, Error)]
pub enum RegexError {
    #[error("unsupported regex construct: {construct} at offset {offset}")]
    Unsupported { construct: &'static str, offset: usize },
    #[error("unmatched parenthesis at offset {offset}")]
    UnbalancedParenthesis { offset: usize },
    #[error("premature end of char-class")]
    UnterminatedClass,
    #[error("too short escape sequence")]
    TrailingEscape,
    #[error(transparent)]
    Compile(#[from] ::regex::Error),
}

bitflags! {
    /// Option bits given with a regex literal.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct RegexOptions: u8 {
        const IGNORECASE = 1;
        const EXTENDED = 2;
        /// Dot matches newline.
        const MULTILINE = 4;
    }
}

impl RegexOptions {
    pub const NONE: RegexOptions = RegexOptions::empty();
}

#[derive(Debug)]
pub struct TranslatedRegex {
    pattern: String,
    has_g_anchor: bool,
    compiled: OnceLock<Regex>,
}

impl TranslatedRegex {
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// True when the source used `\G`; callers anchor the search at the end
    /// of the previous match themselves.
    pub fn has_g_anchor(&self) -> bool {
        self.has_g_anchor
    }

    pub fn compile(&self) -> Result<Regex, RegexError> {
        Ok(Regex::new(&self.pattern)?)
    }

    /// Compiled regex, built on first use.
    pub fn regex(&self) -> Result<&Regex, RegexError> {
        if let Some(re) = self.compiled.get() {
            return Ok(re);
        }
        let re = self.compile()?;
        Ok(self.compiled.get_or_init(|| re))
    }
}

const HEX_CLASS: &str = "0-9a-fA-F";

pub fn translate(pattern: &str, options: RegexOptions) -> Result<TranslatedRegex, RegexError> {
    let mut t = Translator {
        chars: pattern.chars().collect(),
        pos: 0,
        out: String::with_capacity(pattern.len() + 8),
        groups: Vec::new(),
        class_depth: 0,
        has_g_anchor: false,
    };
    t.out.push_str("(?m");
    if options.contains(RegexOptions::IGNORECASE) {
        t.out.push('i');
    }
    if options.contains(RegexOptions::EXTENDED) {
        t.out.push('x');
    }
    if options.contains(RegexOptions::MULTILINE) {
        t.out.push('s');
    }
    t.out.push(')');
    t.run()?;
    Ok(TranslatedRegex {
        pattern: t.out,
        has_g_anchor: t.has_g_anchor,
        compiled: OnceLock::new(),
    })
}

struct Translator {
    chars: Vec<char>,
    pos: usize,
    out: String,
    /// offsets of open groups
    groups: Vec<usize>,
    class_depth: usize,
    has_g_anchor: bool,
}

impl Translator {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.chars.get(self.pos + n).copied()
    }

    fn unsupported(&self, construct: &'static str, offset: usize) -> RegexError {
        RegexError::Unsupported { construct, offset }
    }

    fn run(&mut self) -> Result<(), RegexError> {
        while let Some(c) = self.peek() {
            let offset = self.pos;
            self.pos += 1;
            match c {
                '\\' => self.escape(offset)?,
                '[' => {
                    self.class_depth += 1;
                    self.out.push('[');
                    if self.peek() == Some('^') {
                        self.pos += 1;
                        self.out.push('^');
                    }
                    if self.peek() == Some(']') {
                        self.pos += 1;
                        self.out.push_str("\\]");
                    }
                }
                ']' if self.class_depth > 0 => {
                    self.class_depth -= 1;
                    self.out.push(']');
                }
                _ if self.class_depth > 0 => self.out.push(c),
                '(' => self.open_group(offset)?,
                ')' => {
                    if self.groups.pop().is_none() {
                        return Err(RegexError::UnbalancedParenthesis { offset });
                    }
                    self.out.push(')');
                }
                '*' | '+' | '?' => {
                    if self.peek() == Some('+') {
                        return Err(self.unsupported("possessive quantifier", offset));
                    }
                    self.out.push(c);
                }
                _ => self.out.push(c),
            }
        }
        if self.class_depth > 0 {
            return Err(RegexError::UnterminatedClass);
        }
        if let Some(&offset) = self.groups.last() {
            return Err(RegexError::UnbalancedParenthesis { offset });
        }
        Ok(())
    }

    fn open_group(&mut self, offset: usize) -> Result<(), RegexError> {
        if self.peek() != Some('?') {
            self.groups.push(offset);
            self.out.push('(');
            return Ok(());
        }
        self.pos += 1;
        match self.peek() {
            Some('#') => {
                while let Some(c) = self.peek() {
                    self.pos += 1;
                    if c == ')' {
                        return Ok(());
                    }
                    if c == '\\' {
                        self.pos += 1;
                    }
                }
                Err(RegexError::UnbalancedParenthesis { offset })
            }
            Some(':') => {
                self.pos += 1;
                self.groups.push(offset);
                self.out.push_str("(?:");
                Ok(())
            }
            Some('=') | Some('!') => Err(self.unsupported("lookahead", offset)),
            Some('>') => Err(self.unsupported("atomic group", offset)),
            Some('~') => Err(self.unsupported("absent operator", offset)),
            Some('<') if matches!(self.peek_at(1), Some('=') | Some('!')) => {
                Err(self.unsupported("lookbehind", offset))
            }
            Some('<') | Some('\'') => self.named_group(offset),
            _ => self.inline_options(offset),
        }
    }

    fn named_group(&mut self, offset: usize) -> Result<(), RegexError> {
        let close = if self.peek() == Some('<') { '>' } else { '\'' };
        self.pos += 1;
        let mut name = String::new();
        loop {
            match self.peek() {
                Some(c) if c == close => {
                    self.pos += 1;
                    break;
                }
                Some(c) if c.is_alphanumeric() || c == '_' => {
                    name.push(c);
                    self.pos += 1;
                }
                _ => return Err(self.unsupported("group name", offset)),
            }
        }
        if name.is_empty() {
            return Err(self.unsupported("group name", offset));
        }
        self.groups.push(offset);
        let _ = write!(self.out, "(?P<{name}>");
        Ok(())
    }

    /// `(?imx-imx)` and `(?imx-imx:...)`. The source `m` (dot matches
    /// newline) is `s` in the target syntax.
    fn inline_options(&mut self, offset: usize) -> Result<(), RegexError> {
        let mut flags = String::new();
        loop {
            match self.peek() {
                Some('i') => flags.push('i'),
                Some('x') => flags.push('x'),
                Some('m') => flags.push('s'),
                Some('-') => flags.push('-'),
                Some(')') => {
                    self.pos += 1;
                    if !flags.is_empty() && !flags.ends_with('-') {
                        let _ = write!(self.out, "(?{flags})");
                    }
                    return Ok(());
                }
                Some(':') => {
                    self.pos += 1;
                    self.groups.push(offset);
                    let flags = flags.trim_end_matches('-');
                    let _ = write!(self.out, "(?{flags}:");
                    return Ok(());
                }
                _ => return Err(self.unsupported("group construct", offset)),
            }
            self.pos += 1;
        }
    }

    /// A digit escape followed by two more octal digits is an octal code,
    /// not a group reference.
    fn octal_follows(&self, first: char) -> bool {
        first.is_digit(8)
            && self.peek().is_some_and(|d| d.is_digit(8))
            && self.peek_at(1).is_some_and(|d| d.is_digit(8))
    }

    fn escape(&mut self, offset: usize) -> Result<(), RegexError> {
        let Some(c) = self.peek() else {
            return Err(RegexError::TrailingEscape);
        };
        self.pos += 1;
        let in_class = self.class_depth > 0;
        match c {
            'h' if in_class => self.out.push_str(HEX_CLASS),
            'h' => {
                let _ = write!(self.out, "[{HEX_CLASS}]");
            }
            'H' => {
                let _ = write!(self.out, "[^{HEX_CLASS}]");
            }
            'e' => self.out.push_str("\\x1B"),
            'a' => self.out.push_str("\\x07"),
            'Z' if !in_class => self.out.push_str("(?:\\n?\\z)"),
            'G' if !in_class => self.has_g_anchor = true,
            'k' => return Err(self.unsupported("backreference", offset)),
            'g' => return Err(self.unsupported("subexpression call", offset)),
            'K' => return Err(self.unsupported("keep", offset)),
            'R' | 'X' => return Err(self.unsupported("extended sequence", offset)),
            'c' | 'C' | 'M' => return Err(self.unsupported("control escape", offset)),
            '1'..='9' if !in_class && !self.octal_follows(c) => {
                return Err(self.unsupported("backreference", offset));
            }
            'b' if in_class => self.out.push_str("\\x08"),
            '0'..='7' => {
                let mut value = c.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match self.peek().and_then(|d| d.to_digit(8)) {
                        Some(d) => {
                            value = value * 8 + d;
                            self.pos += 1;
                        }
                        None => break,
                    }
                }
                let _ = write!(self.out, "\\x{{{value:X}}}");
            }
            'x' => {
                let mut digits = String::new();
                while digits.len() < 2 {
                    match self.peek() {
                        Some(d) if d.is_ascii_hexdigit() => {
                            digits.push(d);
                            self.pos += 1;
                        }
                        _ => break,
                    }
                }
                if digits.is_empty() {
                    return Err(RegexError::TrailingEscape);
                }
                let _ = write!(self.out, "\\x{{{digits}}}");
            }
            'A' | 'z' | 'b' | 'B' | 'd' | 'D' | 'w' | 'W' | 's' | 'S' | 'n' | 't' | 'r' | 'f' | 'v' | 'u' | 'p'
            | 'P' => {
                self.out.push('\\');
                self.out.push(c);
            }
            '<' | '>' => self.out.push(c),
            c if c.is_ascii_punctuation() => {
                self.out.push('\\');
                self.out.push(c);
            }
            c => self.out.push(c),
        }
        Ok(())
    }
}
