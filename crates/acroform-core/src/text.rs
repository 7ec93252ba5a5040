//! PDF text string decoding and encoding
//!
//! Field names, values and tooltips are PDF text strings: UTF-16BE with a
//! byte order mark, UTF-8 with a byte order mark (PDF 2.0), or single-byte
//! PDFDocEncoding. PDFDocEncoding is treated as Latin-1, which matches it for
//! every printable character a form field name realistically contains.

use lopdf::{Object, StringFormat};

const UTF16BE_BOM: [u8; 2] = [0xFE, 0xFF];
const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Decode the raw bytes of a PDF string object
pub fn decode_text(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&UTF16BE_BOM) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }

    if let Some(rest) = bytes.strip_prefix(&UTF8_BOM) {
        return String::from_utf8_lossy(rest).into_owned();
    }

    bytes.iter().map(|&b| b as char).collect()
}

/// Encode a Rust string as a PDF string object
///
/// ASCII stays a literal string; anything else becomes a UTF-16BE hex
/// string so non-Latin values survive every viewer.
pub fn encode_text(text: &str) -> Object {
    if text.is_ascii() {
        return Object::String(text.as_bytes().to_vec(), StringFormat::Literal);
    }

    let mut bytes = UTF16BE_BOM.to_vec();
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

/// Read a string or name object as text
///
/// Field values are strings for text and choice fields but names for
/// buttons, so both shapes are accepted.
pub fn object_text(obj: &Object) -> Option<String> {
    match obj {
        Object::String(bytes, _) => Some(decode_text(bytes)),
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_plain_bytes() {
        assert_eq!(decode_text(b"kunde_name"), "kunde_name");
    }

    #[test]
    fn test_decode_latin1_umlaut() {
        assert_eq!(decode_text(&[b'M', 0xFC, b'n']), "Mün");
    }

    #[test]
    fn test_decode_utf16_with_bom() {
        let bytes = [0xFE, 0xFF, 0x00, b'O', 0x00, 0xDF];
        assert_eq!(decode_text(&bytes), "Oß");
    }

    #[test]
    fn test_decode_utf8_with_bom() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice("Straße".as_bytes());
        assert_eq!(decode_text(&bytes), "Straße");
    }

    #[test]
    fn test_encode_ascii_is_literal() {
        match encode_text("Bob") {
            Object::String(bytes, StringFormat::Literal) => assert_eq!(bytes, b"Bob"),
            other => panic!("Expected literal string, got {:?}", other),
        }
    }

    #[test]
    fn test_encode_non_ascii_survives_decode() {
        let obj = encode_text("Jürgen");
        assert!(matches!(obj, Object::String(_, StringFormat::Hexadecimal)));
        assert_eq!(object_text(&obj).as_deref(), Some("Jürgen"));
    }

    #[test]
    fn test_object_text_reads_names() {
        let obj = Object::Name(b"Yes".to_vec());
        assert_eq!(object_text(&obj).as_deref(), Some("Yes"));
        assert_eq!(object_text(&Object::Integer(3)), None);
    }
}
