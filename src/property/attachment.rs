use base64::{Engine, engine::general_purpose::STANDARD};

use crate::{
    parser::{ContentLine, ContentLineParams},
    types::ValueError,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentData {
    Uri(String),
    /// Inline content, carried as BASE64 on the wire.
    Binary(Vec<u8>),
}

/// `ATTACH`, also used for the sound of an audio alarm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub data: AttachmentData,
    /// Media type from `FMTTYPE`.
    pub format_type: Option<String>,
    /// Other parameters, e.g. `X-FILENAME`.
    pub params: ContentLineParams,
}

const KNOWN_PARAMS: &[&str] = &["ENCODING", "VALUE", "FMTTYPE"];

impl Attachment {
    pub fn uri(uri: impl Into<String>) -> Self {
        Self {
            data: AttachmentData::Uri(uri.into()),
            format_type: None,
            params: ContentLineParams::default(),
        }
    }

    pub fn from_content_line(prop: &ContentLine) -> Result<Self, ValueError> {
        let is_binary = prop
            .params
            .get_param("ENCODING")
            .is_some_and(|encoding| encoding.eq_ignore_ascii_case("BASE64"))
            || prop
                .params
                .get_value_type()
                .is_some_and(|value_type| value_type.eq_ignore_ascii_case("BINARY"));

        let data = if is_binary {
            let decoded = STANDARD
                .decode(prop.value.trim())
                .map_err(|_| ValueError::malformed("BINARY", &prop.value))?;
            AttachmentData::Binary(decoded)
        } else if prop.value.is_empty() {
            return Err(ValueError::malformed("URI", &prop.value));
        } else {
            AttachmentData::Uri(prop.value.clone())
        };
        Ok(Self {
            data,
            format_type: prop.params.get_param("FMTTYPE").map(str::to_owned),
            params: prop.params.without(KNOWN_PARAMS),
        })
    }

    pub fn to_content_line(&self, name: &str) -> ContentLine {
        let mut params = ContentLineParams::default();
        if let Some(format_type) = &self.format_type {
            params = params.with("FMTTYPE", format_type);
        }
        let value = match &self.data {
            AttachmentData::Uri(uri) => uri.clone(),
            AttachmentData::Binary(bytes) => {
                params = params.with("ENCODING", "BASE64").with("VALUE", "BINARY");
                STANDARD.encode(bytes)
            }
        };
        params.merge(&self.params);
        ContentLine::new(name, value).with_params(params)
    }
}
