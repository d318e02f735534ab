//! Channel-type enum remap from one-hub codes to one-api codes.
//!
//! Both applications store the upstream provider of a channel as an integer,
//! but the numbering diverged after 23. Providers one-api has no equivalent
//! for map to [`UNKNOWN_CHANNEL_TYPE`].

use tracing::{info, warn};

use crate::core::traits::ValueTransform;
use crate::core::value::SqlValue;

/// one-api's "unknown" channel type.
pub const UNKNOWN_CHANNEL_TYPE: i64 = 0;

/// `(one-hub code, one-api code, provider)`.
const CHANNEL_TYPE_MAP: &[(i64, i64, &str)] = &[
    (1, 1, "OpenAI"),
    (3, 3, "Azure"),
    (8, 8, "Custom"),
    (11, 11, "PaLM"),
    (14, 14, "Anthropic"),
    (15, 15, "Baidu"),
    (16, 16, "Zhipu"),
    (17, 17, "Ali"),
    (18, 18, "Xunfei"),
    (19, 19, "360"),
    (20, 20, "OpenRouter"),
    (23, 23, "Tencent"),
    (25, 24, "Gemini"),
    (26, 26, "Baichuan"),
    (27, 27, "MiniMax"),
    (28, 36, "DeepSeek"),
    (29, 25, "Moonshot"),
    (30, 28, "Mistral"),
    (31, 29, "Groq"),
    (33, 31, "LingYiWanWu"),
    (35, 37, "Cloudflare"),
    (36, 35, "Cohere"),
    (38, 34, "Coze"),
    (39, 30, "Ollama"),
    (42, 42, "VertexAI"),
    (45, 44, "SiliconFlow"),
    (52, 46, "Replicate"),
    (56, 45, "xAI"),
];

/// Look up the one-api code for a one-hub code.
pub fn remap_channel_type(source: i64) -> Option<(i64, &'static str)> {
    CHANNEL_TYPE_MAP
        .iter()
        .find(|(from, _, _)| *from == source)
        .map(|(_, to, name)| (*to, *name))
}

/// Rewrites `channels.type`.
///
/// Integers are looked up directly and raw bytes are parsed as ASCII
/// decimal. Any other value kind, or an unmapped code, becomes
/// [`UNKNOWN_CHANNEL_TYPE`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ChannelTypeTransform;

impl ChannelTypeTransform {
    pub fn new() -> Self {
        Self
    }

    fn source_code(value: &SqlValue) -> Option<i64> {
        match value {
            SqlValue::I64(v) => Some(*v),
            SqlValue::Bytes(bytes) => {
                let text = String::from_utf8_lossy(bytes);
                match text.parse::<i64>() {
                    Ok(v) => Some(v),
                    Err(_) => {
                        warn!(
                            "Channel type '{}' is not an integer, using unknown ({})",
                            text, UNKNOWN_CHANNEL_TYPE
                        );
                        None
                    }
                }
            }
            other => {
                warn!(
                    "Channel type has unsupported {} value '{}', using unknown ({})",
                    other.kind(),
                    other,
                    UNKNOWN_CHANNEL_TYPE
                );
                None
            }
        }
    }
}

impl ValueTransform for ChannelTypeTransform {
    fn name(&self) -> &str {
        "channel-type"
    }

    fn apply(&self, value: SqlValue) -> SqlValue {
        let Some(source) = Self::source_code(&value) else {
            return SqlValue::I64(UNKNOWN_CHANNEL_TYPE);
        };

        match remap_channel_type(source) {
            Some((target, provider)) => {
                info!("Channel type {} -> {} ({})", source, target, provider);
                SqlValue::I64(target)
            }
            None => {
                warn!(
                    "Channel type {} has no one-api equivalent, using unknown ({})",
                    source, UNKNOWN_CHANNEL_TYPE
                );
                SqlValue::I64(UNKNOWN_CHANNEL_TYPE)
            }
        }
    }
}
