use std::io::Read;

use crate::error::ExtractorError;

/// Decode a response body to text.
///
/// gzip and deflate are already undone by the HTTP client; Brotli arrives raw
/// and is decompressed here. Invalid UTF-8 is replaced rather than rejected.
pub fn decode_body(content_encoding: Option<&str>, body: &[u8]) -> Result<String, ExtractorError> {
    let is_brotli = content_encoding
        .map(|enc| enc.split(',').any(|e| e.trim().eq_ignore_ascii_case("br")))
        .unwrap_or(false);

    if is_brotli {
        let mut decoded = Vec::with_capacity(body.len() * 4);
        brotli::Decompressor::new(body, 4096)
            .read_to_end(&mut decoded)
            .map_err(|e| ExtractorError::DecodeError(format!("brotli: {e}")))?;
        return Ok(String::from_utf8_lossy(&decoded).into_owned());
    }

    Ok(String::from_utf8_lossy(body).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn brotli_compress(input: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut writer = brotli::CompressorWriter::new(&mut out, 4096, 5, 22);
            writer.write_all(input).unwrap();
        }
        out
    }

    #[test]
    fn test_plain_body() {
        assert_eq!(decode_body(None, b"<html></html>").unwrap(), "<html></html>");
        assert_eq!(decode_body(Some("gzip"), "点赞".as_bytes()).unwrap(), "点赞");
    }

    #[test]
    fn test_brotli_body() {
        let html = r#"<script>window._ROUTER_DATA = {"a":1};</script>"#;
        let compressed = brotli_compress(html.as_bytes());
        assert_eq!(decode_body(Some("br"), &compressed).unwrap(), html);
        assert_eq!(decode_body(Some("BR"), &compressed).unwrap(), html);
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let text = decode_body(None, &[b'a', 0xff, b'b']).unwrap();
        assert!(text.starts_with('a'));
        assert!(text.ends_with('b'));
    }
}
