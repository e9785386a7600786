//! Encoder output formats and the negotiation preference order.

/// One (container, codec) pair a provider may support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderFormat {
    pub container: &'static str,
    pub codec: &'static str,
    pub mime_type: &'static str,
}

/// Ordered preference list probed at `StreamEncoder::open`. The first
/// supported entry wins. APNG comes last: it is always encodable in-process,
/// so negotiation only fails when a provider rejects everything.
pub const FORMAT_PREFERENCE: &[EncoderFormat] = &[
    EncoderFormat {
        container: "mp4",
        codec: "h264",
        mime_type: "video/mp4",
    },
    EncoderFormat {
        container: "webm",
        codec: "vp9",
        mime_type: "video/webm",
    },
    EncoderFormat {
        container: "apng",
        codec: "apng",
        mime_type: "image/apng",
    },
];
