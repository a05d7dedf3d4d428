use encoding_rs::UTF_8;
use std::borrow::Cow;

/// Decode UTF-8 bytes, dropping a leading byte-order mark.
///
/// The upstream CSV export and some snapshot dumps start with a BOM, which would otherwise
/// end up glued to the first column name. Invalid sequences are replaced, not rejected.
pub fn decode_utf8(bytes: &[u8]) -> Cow<'_, str> {
    let (text, had_errors) = UTF_8.decode_with_bom_removal(bytes);
    if had_errors {
        tracing::warn!("Input contained invalid UTF-8 sequences; replaced with U+FFFD");
    }
    text
}
