use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

/// Spark model tiers, identified on the wire by their `domain` value.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, IntoStaticStr,
)]
pub enum Model {
    #[serde(rename = "lite")]
    #[strum(to_string = "lite")]
    Lite,

    #[serde(rename = "generalv3")]
    #[strum(to_string = "generalv3")]
    Pro,

    #[serde(rename = "pro-128k")]
    #[strum(to_string = "pro-128k")]
    Pro128k,

    #[serde(rename = "generalv3.5")]
    #[strum(to_string = "generalv3.5")]
    Max,

    #[serde(rename = "max-32k")]
    #[strum(to_string = "max-32k")]
    Max32k,

    #[serde(rename = "4.0Ultra")]
    #[strum(to_string = "4.0Ultra")]
    Ultra,
}

impl Model {
    /// WebSocket endpoint serving this model.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Model::Lite => "wss://spark-api.xf-yun.com/v1.1/chat",
            Model::Pro => "wss://spark-api.xf-yun.com/v3.1/chat",
            Model::Pro128k => "wss://spark-api.xf-yun.com/chat/pro-128k",
            Model::Max => "wss://spark-api.xf-yun.com/v3.5/chat",
            Model::Max32k => "wss://spark-api.xf-yun.com/chat/max-32k",
            Model::Ultra => "wss://spark-api.xf-yun.com/v4.0/chat",
        }
    }

    /// Whether the vendor accepts `payload.functions` for this model.
    pub fn supports_functions(&self) -> bool {
        !matches!(self, Model::Lite)
    }
}

impl From<Model> for String {
    fn from(model: Model) -> Self {
        model.to_string()
    }
}
