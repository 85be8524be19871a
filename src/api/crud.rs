//! Request validation adapter shared by the CRUD handlers.
//!
//! A [`CrudController`] is built with the (securable, permission) pairs an
//! endpoint group requires. Each operation kind checks the caller's grants
//! first, then turns raw request input into a typed [`Schema`] value.

use std::collections::HashMap;

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::{Map, Value};

use super::auth::{Credential, Permission, SecurityRule};
use super::error::ApiError;

/// A request shape: deserializable, plus optional field-shape checks that
/// serde cannot express.
pub trait Schema: DeserializeOwned {
    fn validate(&self) -> Result<(), ApiError> {
        Ok(())
    }
}

/// Accepts anything and keeps nothing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NoParams {}

impl Schema for NoParams {}

/// The outcome of a successful validation.
#[derive(Debug, Clone)]
pub struct Validated<P> {
    pub credential: Credential,
    pub params: P,
}

pub struct CrudController {
    rules: Vec<SecurityRule>,
}

impl CrudController {
    pub fn new(rules: Vec<SecurityRule>) -> Self {
        Self { rules }
    }

    /// Require `permission` on every securable in `securables`.
    pub fn for_securables(securables: &[&str], permission: Permission) -> Self {
        Self::new(
            securables
                .iter()
                .map(|s| SecurityRule::new(*s, permission))
                .collect(),
        )
    }

    /// Validate a JSON request body.
    pub fn create<P: Schema>(
        &self,
        credential: &Credential,
        body: &[u8],
    ) -> Result<Validated<P>, ApiError> {
        self.authorize(credential)?;
        let params = parse(parse_body(body)?)?;
        Ok(self.validated(credential, params))
    }

    /// Validate path parameters.
    pub fn read<P: Schema>(
        &self,
        credential: &Credential,
        path: &HashMap<String, String>,
    ) -> Result<Validated<P>, ApiError> {
        self.authorize(credential)?;
        let params = parse(string_map(path))?;
        Ok(self.validated(credential, params))
    }

    /// Validate path parameters and a JSON body as one merged value.
    ///
    /// Path parameters win over body fields of the same name.
    pub fn update<P: Schema>(
        &self,
        credential: &Credential,
        path: &HashMap<String, String>,
        body: &[u8],
    ) -> Result<Validated<P>, ApiError> {
        self.authorize(credential)?;
        let mut merged = match parse_body(body)? {
            Value::Object(fields) => fields,
            _ => return Err(ApiError::schema("Request body must be a JSON object")),
        };
        for (key, value) in path {
            merged.insert(key.clone(), Value::String(value.clone()));
        }
        let params = parse(Value::Object(merged))?;
        Ok(self.validated(credential, params))
    }

    /// Validate path parameters.
    pub fn delete<P: Schema>(
        &self,
        credential: &Credential,
        path: &HashMap<String, String>,
    ) -> Result<Validated<P>, ApiError> {
        self.read(credential, path)
    }

    /// Validate query parameters.
    pub fn list<P: Schema>(
        &self,
        credential: &Credential,
        query: &HashMap<String, String>,
    ) -> Result<Validated<P>, ApiError> {
        self.authorize(credential)?;
        let params = parse(string_map(query))?;
        Ok(self.validated(credential, params))
    }

    fn authorize(&self, credential: &Credential) -> Result<(), ApiError> {
        match credential.first_missing(&self.rules) {
            Some(rule) => {
                tracing::debug!(
                    account_id = credential.account_id,
                    user_id = credential.user_id,
                    "Missing permission {}",
                    rule.to_grant()
                );
                Err(ApiError::Forbidden(rule.clone()))
            }
            None => Ok(()),
        }
    }

    fn validated<P>(&self, credential: &Credential, params: P) -> Validated<P> {
        Validated {
            credential: credential.clone(),
            params,
        }
    }
}

fn parse_body(body: &[u8]) -> Result<Value, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_slice(body).map_err(|e| ApiError::schema(format!("Invalid JSON body: {}", e)))
}

fn parse<P: Schema>(value: Value) -> Result<P, ApiError> {
    let params: P = serde_json::from_value(value).map_err(|e| ApiError::schema(e.to_string()))?;
    params.validate()?;
    Ok(params)
}

fn string_map(values: &HashMap<String, String>) -> Value {
    Value::Object(
        values
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect(),
    )
}

/// Deserialize an integer given either as a JSON number or a decimal string.
///
/// Path and query parameters always arrive as strings.
pub fn deserialize_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(i64),
        String(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::String(s) => s
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("expected an integer, got {:?}", s))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::auth::Grants;
    use std::collections::HashSet;

    #[derive(Debug, Deserialize)]
    struct ItemParams {
        #[serde(deserialize_with = "deserialize_i64")]
        id: i64,
        #[serde(default)]
        label: Option<String>,
    }

    impl Schema for ItemParams {
        fn validate(&self) -> Result<(), ApiError> {
            if self.id < 1 {
                return Err(ApiError::schema("id must be positive"));
            }
            Ok(())
        }
    }

    fn path(id: &str) -> HashMap<String, String> {
        HashMap::from([("id".to_string(), id.to_string())])
    }

    fn reader_only() -> Credential {
        Credential {
            account_id: 9,
            user_id: 2,
            grants: Grants::Only(HashSet::from([SecurityRule::new(
                "ITEM",
                Permission::Read,
            )])),
        }
    }

    #[test]
    fn test_read_coerces_path_id() {
        let controller = CrudController::for_securables(&["ITEM"], Permission::Read);
        let validated: Validated<ItemParams> =
            controller.read(&reader_only(), &path("42")).unwrap();
        assert_eq!(validated.params.id, 42);
        assert_eq!(validated.credential.account_id, 9);
    }

    #[test]
    fn test_schema_and_validate_hook_failures() {
        let controller = CrudController::for_securables(&["ITEM"], Permission::Read);
        let err = controller
            .read::<ItemParams>(&reader_only(), &path("abc"))
            .unwrap_err();
        assert!(matches!(err, ApiError::SchemaValidation { .. }));

        let err = controller
            .read::<ItemParams>(&reader_only(), &path("0"))
            .unwrap_err();
        assert!(matches!(err, ApiError::SchemaValidation { .. }));
    }

    #[test]
    fn test_authorization_runs_before_parsing() {
        let controller = CrudController::for_securables(&["ITEM"], Permission::Create);
        let err = controller
            .create::<ItemParams>(&reader_only(), b"not json")
            .unwrap_err();
        match err {
            ApiError::Forbidden(rule) => assert_eq!(rule.to_grant(), "ITEM:CREATE"),
            other => panic!("expected Forbidden, got {other:?}"),
        }
    }

    #[test]
    fn test_create_rejects_malformed_json() {
        let controller = CrudController::new(vec![]);
        let err = controller
            .create::<ItemParams>(&Credential::placeholder(), b"{\"id\": ")
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_update_merges_path_over_body() {
        let controller = CrudController::new(vec![]);
        let validated: Validated<ItemParams> = controller
            .update(
                &Credential::placeholder(),
                &path("7"),
                br#"{"id": 99, "label": "renamed"}"#,
            )
            .unwrap();
        assert_eq!(validated.params.id, 7);
        assert_eq!(validated.params.label.as_deref(), Some("renamed"));

        let err = controller
            .update::<ItemParams>(&Credential::placeholder(), &path("7"), b"[1, 2]")
            .unwrap_err();
        assert!(matches!(err, ApiError::SchemaValidation { .. }));
    }

    #[test]
    fn test_list_accepts_empty_schema() {
        let controller = CrudController::for_securables(&["ITEM"], Permission::Read);
        let query = HashMap::from([("page".to_string(), "2".to_string())]);
        assert!(controller
            .list::<NoParams>(&reader_only(), &query)
            .is_ok());
    }
}
