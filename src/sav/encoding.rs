//! Character encoding of `.sav` dictionaries and string data.
//!
//! Newer files name their encoding in extension record 20 (e.g. `UTF-8`);
//! older ones only carry a Windows codepage in the machine integer record
//! (subtype 3). Files with neither are assumed to be Windows-1252.

use encoding_rs::Encoding;

/// Map a Windows/IBM codepage number to an `encoding_rs` encoding.
#[inline]
pub fn codepage_to_encoding(codepage: i32) -> Option<&'static Encoding> {
    match codepage {
        // Unicode
        65001 => Some(encoding_rs::UTF_8),

        // Single-byte Western codepages (ASCII, Latin-1 and cp1252 decode alike for SPSS text)
        2 | 3 | 20127 | 28591 | 1252 => Some(encoding_rs::WINDOWS_1252),
        874 => Some(encoding_rs::WINDOWS_874),
        1250 => Some(encoding_rs::WINDOWS_1250),
        1251 => Some(encoding_rs::WINDOWS_1251),
        1253 => Some(encoding_rs::WINDOWS_1253),
        1254 => Some(encoding_rs::WINDOWS_1254),
        1255 => Some(encoding_rs::WINDOWS_1255),
        1256 => Some(encoding_rs::WINDOWS_1256),
        1257 => Some(encoding_rs::WINDOWS_1257),
        1258 => Some(encoding_rs::WINDOWS_1258),
        866 => Some(encoding_rs::IBM866),

        // ISO 8859 series
        28592 => Some(encoding_rs::ISO_8859_2),
        28593 => Some(encoding_rs::ISO_8859_3),
        28594 => Some(encoding_rs::ISO_8859_4),
        28595 => Some(encoding_rs::ISO_8859_5),
        28596 => Some(encoding_rs::ISO_8859_6),
        28597 => Some(encoding_rs::ISO_8859_7),
        28598 => Some(encoding_rs::ISO_8859_8),
        28603 => Some(encoding_rs::ISO_8859_13),
        28605 => Some(encoding_rs::ISO_8859_15),

        // East Asian
        932 => Some(encoding_rs::SHIFT_JIS),
        936 => Some(encoding_rs::GBK),
        949 => Some(encoding_rs::EUC_KR),
        950 => Some(encoding_rs::BIG5),
        20932 => Some(encoding_rs::EUC_JP),
        54936 => Some(encoding_rs::GB18030),

        // KOI8
        20866 => Some(encoding_rs::KOI8_R),
        21866 => Some(encoding_rs::KOI8_U),

        _ => None,
    }
}

/// Pick the encoding for a file from its extension records
pub fn resolve_encoding(name: Option<&str>, codepage: Option<i32>) -> &'static Encoding {
    name.and_then(|n| Encoding::for_label(n.trim().as_bytes()))
        .or_else(|| codepage.and_then(codepage_to_encoding))
        .unwrap_or(encoding_rs::WINDOWS_1252)
}

/// Decode bytes, dropping the trailing space/NUL padding SPSS uses
pub fn decode_trimmed(encoding: &'static Encoding, bytes: &[u8]) -> String {
    let end = bytes
        .iter()
        .rposition(|&b| b != b' ' && b != 0)
        .map_or(0, |i| i + 1);
    let (text, _) = encoding.decode_without_bom_handling(&bytes[..end]);
    text.into_owned()
}
