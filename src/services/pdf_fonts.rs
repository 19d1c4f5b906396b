//! Turns the bytes of a shown string into Unicode using the font that was
//! selected with `Tf`.
//!
//! Composite (Type0) fonts carry glyph ids, so they are only readable through
//! a ToUnicode CMap or a Unicode-based predefined encoding. Anything else from
//! a Type0 font decodes to nothing, which keeps glyph ids out of the text.

use std::collections::HashMap;

use lopdf::{Dictionary, Document, Object, ObjectId};
use once_cell::sync::Lazy;
use regex::Regex;

static BFCHAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<([0-9A-Fa-f]+)>\s*<([0-9A-Fa-f]*)>").expect("valid bfchar regex"));

static BFRANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<([0-9A-Fa-f]+)>\s*<([0-9A-Fa-f]+)>\s*(?:<([0-9A-Fa-f]*)>|\[([^\]]*)\])")
        .expect("valid bfrange regex")
});

static HEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"<([0-9A-Fa-f]*)>").expect("valid hex regex"));

/// Simple-font encodings lopdf ships tables for.
const NAMED_ENCODINGS: [&str; 4] = [
    "StandardEncoding",
    "WinAnsiEncoding",
    "MacRomanEncoding",
    "MacExpertEncoding",
];

// Larger bfrange spans are malformed; real CMaps stay within one byte row.
const MAX_RANGE_SPAN: u32 = 0xFFFF;

/// Code to Unicode mapping parsed from a ToUnicode CMap stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToUnicodeMap {
    code_width: usize,
    entries: HashMap<u32, String>,
}

impl ToUnicodeMap {
    /// Parses `bfchar` and `bfrange` sections. The code width comes from the
    /// first codespace range, or `default_width` bytes when there is none.
    pub fn parse(data: &[u8], default_width: usize) -> Self {
        let content = String::from_utf8_lossy(data);
        let mut entries = HashMap::new();

        for section in sections(&content, "beginbfchar", "endbfchar") {
            for caps in BFCHAR.captures_iter(section) {
                if let (Some(code), Some(text)) = (parse_code(&caps[1]), utf16_hex(&caps[2])) {
                    entries.insert(code, text);
                }
            }
        }

        for section in sections(&content, "beginbfrange", "endbfrange") {
            for caps in BFRANGE.captures_iter(section) {
                let (Some(lo), Some(hi)) = (parse_code(&caps[1]), parse_code(&caps[2])) else {
                    continue;
                };
                if hi < lo || hi - lo > MAX_RANGE_SPAN {
                    log::debug!("Skipping bfrange <{:X}> <{:X}>", lo, hi);
                    continue;
                }

                if let Some(array) = caps.get(4) {
                    for (code, item) in (lo..=hi).zip(HEX.captures_iter(array.as_str())) {
                        if let Some(text) = utf16_hex(&item[1]) {
                            entries.insert(code, text);
                        }
                    }
                } else if let Some(start) = caps.get(3).and_then(|m| hex_units(m.as_str())) {
                    for offset in 0..=(hi - lo) {
                        let mut units = start.clone();
                        if let Some(last) = units.last_mut() {
                            *last = last.wrapping_add(offset as u16);
                        }
                        entries.insert(lo + offset, String::from_utf16_lossy(&units));
                    }
                }
            }
        }

        let code_width = sections(&content, "begincodespacerange", "endcodespacerange")
            .first()
            .and_then(|section| HEX.captures(section))
            .map(|caps| caps[1].len().div_ceil(2))
            .filter(|width| (1..=4).contains(width))
            .unwrap_or(default_width);

        Self {
            code_width,
            entries,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Codes without an entry are dropped.
    pub fn decode(&self, bytes: &[u8]) -> String {
        bytes
            .chunks(self.code_width.max(1))
            .filter_map(|chunk| {
                let code = chunk.iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b));
                self.entries.get(&code).map(String::as_str)
            })
            .collect()
    }
}

/// How strings shown with one font resource are decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FontDecoder {
    ToUnicode(ToUnicodeMap),
    /// Type0 font with a UCS-2 or UTF-16 predefined CMap.
    Utf16,
    /// Simple font with one of lopdf's built-in encodings.
    Named(String),
    /// Simple font without a usable encoding, or no font selected.
    Guess,
    /// Glyph ids with no way back to Unicode.
    Undecodable,
}

impl FontDecoder {
    pub fn from_font(doc: &Document, font: &Dictionary) -> Self {
        let composite = font.get(b"Subtype").and_then(Object::as_name).ok() == Some(b"Type0".as_slice());

        if let Some(map) = to_unicode_map(doc, font, if composite { 2 } else { 1 }) {
            return FontDecoder::ToUnicode(map);
        }

        let encoding = encoding_name(doc, font);
        if composite {
            return match encoding {
                Some(name) if name.contains("UCS2") || name.contains("UTF16") => FontDecoder::Utf16,
                _ => FontDecoder::Undecodable,
            };
        }

        match encoding {
            Some(name) if NAMED_ENCODINGS.contains(&name.as_str()) => FontDecoder::Named(name),
            _ => FontDecoder::Guess,
        }
    }

    pub fn decode(&self, bytes: &[u8]) -> String {
        let decoded = match self {
            FontDecoder::ToUnicode(map) => map.decode(bytes),
            FontDecoder::Utf16 => decode_utf16_be(bytes),
            FontDecoder::Named(encoding) => Document::decode_text(Some(encoding), bytes),
            FontDecoder::Guess => decode_pdf_string(bytes),
            FontDecoder::Undecodable => String::new(),
        };
        decoded.chars().filter(|c| !c.is_control()).collect()
    }
}

/// Decoders for every font resource reachable from the page, keyed by
/// resource name.
pub fn page_decoders(doc: &Document, page_id: ObjectId) -> HashMap<Vec<u8>, FontDecoder> {
    doc.get_page_fonts(page_id)
        .into_iter()
        .map(|(name, font)| {
            let decoder = FontDecoder::from_font(doc, font);
            if decoder == FontDecoder::Undecodable {
                log::debug!(
                    "Font /{} has no ToUnicode map; its text is skipped",
                    String::from_utf8_lossy(&name)
                );
            }
            (name, decoder)
        })
        .collect()
}

/// Decodes a string shown without a known encoding: UTF-16BE when it carries
/// a BOM, UTF-8 when valid, Latin-1 otherwise. Strings containing NUL bytes
/// are two-byte glyph ids and decode to nothing.
pub fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        return decode_utf16_be(utf16);
    }
    if bytes.contains(&0) {
        return String::new();
    }
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

fn decode_utf16_be(bytes: &[u8]) -> String {
    let units = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
    char::decode_utf16(units)
        .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

fn to_unicode_map(doc: &Document, font: &Dictionary, default_width: usize) -> Option<ToUnicodeMap> {
    let stream = font
        .get_deref(b"ToUnicode", doc)
        .and_then(Object::as_stream)
        .ok()?;
    let data = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());
    let map = ToUnicodeMap::parse(&data, default_width);
    (!map.is_empty()).then_some(map)
}

fn encoding_name(doc: &Document, font: &Dictionary) -> Option<String> {
    let name = match font.get_deref(b"Encoding", doc).ok()? {
        Object::Name(name) => name.as_slice(),
        Object::Dictionary(dict) => dict.get(b"BaseEncoding").and_then(Object::as_name).ok()?,
        _ => return None,
    };
    String::from_utf8(name.to_vec()).ok()
}

fn sections<'a>(content: &'a str, begin: &str, end: &str) -> Vec<&'a str> {
    let mut out = Vec::new();
    let mut rest = content;
    while let Some(start) = rest.find(begin) {
        let after = &rest[start + begin.len()..];
        let Some(stop) = after.find(end) else {
            break;
        };
        out.push(&after[..stop]);
        rest = &after[stop + end.len()..];
    }
    out
}

fn parse_code(hex: &str) -> Option<u32> {
    if hex.len() > 8 {
        return None;
    }
    u32::from_str_radix(hex, 16).ok()
}

fn hex_units(hex: &str) -> Option<Vec<u16>> {
    if hex.is_empty() {
        return None;
    }
    if hex.len() <= 4 {
        return u16::from_str_radix(hex, 16).ok().map(|unit| vec![unit]);
    }
    if hex.len() % 4 != 0 {
        return None;
    }
    (0..hex.len())
        .step_by(4)
        .map(|i| u16::from_str_radix(&hex[i..i + 4], 16).ok())
        .collect()
}

fn utf16_hex(hex: &str) -> Option<String> {
    hex_units(hex).map(|units| String::from_utf16_lossy(&units))
}
