use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use galleria_core::{model, GalleryError};

macro_rules! impl_api_id {
    ($ident:ident) => {
        impl From<&model::$ident> for $ident {
            fn from(value: &model::$ident) -> Self {
                $ident(value.0.to_string())
            }
        }

        impl From<model::$ident> for $ident {
            fn from(value: model::$ident) -> Self {
                (&value).into()
            }
        }

        impl TryFrom<&$ident> for model::$ident {
            type Error = GalleryError;
            fn try_from(value: &$ident) -> Result<Self, Self::Error> {
                match value.0.trim().parse::<i64>() {
                    Ok(id) if id > 0 => Ok(model::$ident(id)),
                    _ => Err(GalleryError::validation(format!(
                        concat!("Invalid ", stringify!($ident), " {}"),
                        value.0
                    ))),
                }
            }
        }

        impl TryFrom<$ident> for model::$ident {
            type Error = GalleryError;
            fn try_from(value: $ident) -> Result<Self, Self::Error> {
                (&value).try_into()
            }
        }
    };
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash, ToSchema)]
pub struct PhotoId(pub String);
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash, ToSchema)]
pub struct CollectionId(pub String);

impl_api_id!(PhotoId);
impl_api_id!(CollectionId);

/// An id as sent by clients, either a JSON number or a string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum IdValue {
    Number(i64),
    Text(String),
}

impl IdValue {
    fn as_text(&self) -> String {
        match self {
            IdValue::Number(n) => n.to_string(),
            IdValue::Text(s) => s.trim().to_owned(),
        }
    }
}

impl TryFrom<&IdValue> for model::PhotoId {
    type Error = GalleryError;
    fn try_from(value: &IdValue) -> Result<Self, Self::Error> {
        PhotoId(value.as_text()).try_into()
    }
}

/// `null`, absent, `""` and `"0"` all mean "no collection".
pub fn optional_collection_id(
    value: Option<&IdValue>,
) -> Result<Option<model::CollectionId>, GalleryError> {
    let Some(value) = value else {
        return Ok(None);
    };
    let text = value.as_text();
    if text.is_empty() || text == "0" {
        return Ok(None);
    }
    CollectionId(text).try_into().map(Some)
}

#[cfg(test)]
mod test {
    use claims::{assert_matches, assert_ok_eq};

    use super::*;

    #[test]
    fn unassigned_spellings() {
        assert_ok_eq!(optional_collection_id(None), None);
        assert_ok_eq!(optional_collection_id(Some(&IdValue::Text(String::new()))), None);
        assert_ok_eq!(optional_collection_id(Some(&IdValue::Text("0".to_owned()))), None);
        assert_ok_eq!(optional_collection_id(Some(&IdValue::Number(0))), None);
        assert_ok_eq!(
            optional_collection_id(Some(&IdValue::Text(" 7 ".to_owned()))),
            Some(model::CollectionId(7))
        );
        assert_ok_eq!(
            optional_collection_id(Some(&IdValue::Number(12))),
            Some(model::CollectionId(12))
        );
        assert_matches!(
            optional_collection_id(Some(&IdValue::Text("abc".to_owned()))),
            Err(GalleryError::Validation(_))
        );
    }

    #[test]
    fn malformed_photo_id_is_a_validation_error() {
        let parsed: Result<model::PhotoId, _> = PhotoId("x1".to_owned()).try_into();
        assert_matches!(parsed, Err(GalleryError::Validation(_)));
        let parsed: Result<model::PhotoId, _> = (&IdValue::Number(3)).try_into();
        assert_ok_eq!(parsed, model::PhotoId(3));
    }
}
