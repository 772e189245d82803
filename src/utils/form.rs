// src/utils/form.rs

use std::collections::HashMap;

use axum::{
    Json,
    body::Bytes,
    extract::{FromRequest, Multipart, Request},
    http::header,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use validator::Validate;

use crate::error::AppError;

/// A file part of a multipart body.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Untyped request body accepted by the create/update endpoints.
///
/// `multipart/form-data` bodies keep text parts as JSON strings (coerced later
/// by the `coerce` deserializers) and file parts in `files`. Any other content
/// type is read as a JSON object.
#[derive(Debug, Default)]
pub struct FormPayload {
    pub fields: Map<String, Value>,
    pub files: HashMap<String, UploadedFile>,
}

impl FormPayload {
    /// Coerces the text fields into `T` and runs its validation rules.
    /// Both shape and rule failures are reported as 422.
    pub fn parse<T>(&self) -> Result<T, AppError>
    where
        T: DeserializeOwned + Validate,
    {
        let value: T = serde_json::from_value(Value::Object(self.fields.clone()))
            .map_err(|e| AppError::Validation(e.to_string()))?;
        value.validate()?;
        Ok(value)
    }

    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        self.files.remove(name)
    }
}

impl<S> FromRequest<S> for FormPayload
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.to_ascii_lowercase().starts_with("multipart/form-data"));

        if !is_multipart {
            let Json(fields) = Json::<Map<String, Value>>::from_request(req, state).await?;
            return Ok(FormPayload {
                fields,
                files: HashMap::new(),
            });
        }

        let mut multipart = Multipart::from_request(req, state).await?;
        let mut payload = FormPayload::default();

        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let content_type = field.content_type().map(str::to_string);
                    let bytes = field.bytes().await?;
                    // An unselected file input still sends an empty part.
                    if file_name.is_empty() && bytes.is_empty() {
                        continue;
                    }
                    payload.files.insert(
                        name,
                        UploadedFile {
                            file_name,
                            content_type,
                            bytes,
                        },
                    );
                }
                None => {
                    let text = field.text().await?;
                    payload.fields.insert(name, Value::String(text));
                }
            }
        }

        Ok(payload)
    }
}

/// Serde helpers that accept both typed JSON values and the strings a
/// multipart form sends for them.
pub mod coerce {
    use serde::{Deserialize, Deserializer, de::DeserializeOwned, de::Error};
    use serde_json::Value;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrText {
        Number(i64),
        Text(String),
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrText {
        Bool(bool),
        Text(String),
    }

    fn to_int<E: Error>(value: NumberOrText) -> Result<Option<i32>, E> {
        let number = match value {
            NumberOrText::Number(n) => n,
            NumberOrText::Text(text) if text.trim().is_empty() => return Ok(None),
            NumberOrText::Text(text) => text
                .trim()
                .parse::<i64>()
                .map_err(|_| E::custom(format!("expected an integer, got '{}'", text)))?,
        };
        i32::try_from(number)
            .map(Some)
            .map_err(|_| E::custom(format!("integer {} is out of range", number)))
    }

    /// Required integer: a JSON number or a numeric string.
    pub fn int<'de, D>(deserializer: D) -> Result<i32, D::Error>
    where
        D: Deserializer<'de>,
    {
        to_int(NumberOrText::deserialize(deserializer)?)?
            .ok_or_else(|| D::Error::custom("expected an integer, got an empty string"))
    }

    /// Optional integer; an empty string counts as absent.
    pub fn opt_int<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<NumberOrText>::deserialize(deserializer)? {
            Some(value) => to_int(value),
            None => Ok(None),
        }
    }

    /// Boolean, or the string `"true"` (any other string is false).
    pub fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match BoolOrText::deserialize(deserializer)? {
            BoolOrText::Bool(b) => b,
            BoolOrText::Text(text) => text == "true",
        })
    }

    pub fn opt_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<BoolOrText>::deserialize(deserializer)? {
            Some(BoolOrText::Bool(b)) => Some(b),
            Some(BoolOrText::Text(text)) if text.is_empty() => None,
            Some(BoolOrText::Text(text)) => Some(text == "true"),
            None => None,
        })
    }

    fn from_json_or_text<T, E>(value: Value) -> Result<T, E>
    where
        T: DeserializeOwned,
        E: Error,
    {
        let value = match value {
            Value::String(text) => serde_json::from_str::<Value>(&text)
                .map_err(|_| E::custom("Invalid JSON format for questions"))?,
            other => other,
        };
        serde_json::from_value(value).map_err(E::custom)
    }

    /// A JSON array, or a string holding a JSON-encoded array.
    pub fn json_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        from_json_or_text(Value::deserialize(deserializer)?)
    }

    pub fn opt_json_list<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        match Option::<Value>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Value::String(text)) if text.trim().is_empty() => Ok(None),
            Some(value) => from_json_or_text(value).map(Some),
        }
    }
}
