use std::str::FromStr;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::error::{BoxError, Error};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DecodeError {
    #[error("can't decode from an absent body")]
    NilSource,
    #[error("no decode target was provided")]
    MissingTarget,
    #[error("failed to read response body: {0}")]
    Read(#[source] BoxError),
    #[error("response body too large ({actual_bytes} bytes > {limit_bytes} bytes)")]
    TooLarge {
        limit_bytes: usize,
        actual_bytes: usize,
    },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Format(BoxError),
}

/// Decodes a response body into a caller-supplied target.
///
/// `source` is `None` when the response carried no body at all, which is
/// distinct from an empty body. Implementations assign `target` only after the
/// whole payload decoded, so a failed decode leaves it untouched, and they
/// return format errors as-is.
pub trait BodyDecoder: Send + Sync {
    fn decode<T>(&self, source: Option<&[u8]>, target: Option<&mut T>) -> Result<(), DecodeError>
    where
        T: DeserializeOwned;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct JsonDecoder;

impl JsonDecoder {
    pub const fn new() -> Self {
        Self
    }
}

impl BodyDecoder for JsonDecoder {
    fn decode<T>(&self, source: Option<&[u8]>, target: Option<&mut T>) -> Result<(), DecodeError>
    where
        T: DeserializeOwned,
    {
        let Some(source) = source else {
            return Err(DecodeError::NilSource);
        };
        let Some(target) = target else {
            return Err(DecodeError::MissingTarget);
        };
        *target = serde_json::from_slice(source)?;
        Ok(())
    }
}

/// Names a body format in configuration.
///
/// Deserialization goes through [`FromStr`], so configs naming an unknown
/// decoder fail with [`Error::UnknownDecoder`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum DecoderKind {
    #[default]
    Json,
}

impl DecoderKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
        }
    }
}

impl FromStr for DecoderKind {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        if name.trim().eq_ignore_ascii_case("json") {
            return Ok(Self::Json);
        }
        Err(Error::UnknownDecoder {
            name: name.to_owned(),
        })
    }
}

impl TryFrom<String> for DecoderKind {
    type Error = Error;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        name.parse()
    }
}
