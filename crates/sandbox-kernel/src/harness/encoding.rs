//! The transport-safe encoding used to carry source text into an executable unit.
//!
//! Encoded text only contains the standard base64 alphabet, so it can be placed inside a string
//! literal, a `<script>` element, or an HTML attribute without being able to terminate any of them.

use base64::engine::general_purpose;
use base64::Engine;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Encodes `text` for transport into an executable unit.
pub fn encode_transport(text: &str) -> String {
    general_purpose::STANDARD.encode(text.as_bytes())
}

/// Reverses [`encode_transport`].
pub fn decode_transport(payload: &str) -> Result<String, TransportError> {
    let bytes = general_purpose::STANDARD.decode(payload)?;
    Ok(String::from_utf8(bytes)?)
}

/// Returns true if every character of `payload` belongs to the transport alphabet.
pub(crate) fn is_transport_safe(payload: &str) -> bool {
    payload
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'='))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_hostile_text() {
        let samples = [
            "",
            "1+1",
            "console.log('hi')",
            "</script><script>alert(1)</script>",
            "const s = `template ${1 + 1}`; const q = \"double\" + 'single';",
            "nul:\u{0}:end",
            "<!-- comment --> ]]> \\u2028 \u{2028}\u{2029}",
            "héllo wörld, こんにちは, 🎉🚀",
            "line one\r\nline two\n\ttabbed",
        ];
        for sample in samples {
            let encoded = encode_transport(sample);
            assert!(is_transport_safe(&encoded), "{encoded} should be transport safe");
            assert!(!encoded.contains("</"));
            assert_eq!(decode_transport(&encoded).unwrap(), sample);
        }
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(
            decode_transport("not base64!"),
            Err(TransportError::Base64(_))
        ));
        // 0xff is never valid in UTF-8
        let encoded = general_purpose::STANDARD.encode([0xff, 0xfe]);
        assert!(matches!(
            decode_transport(&encoded),
            Err(TransportError::Utf8(_))
        ));
    }
}
