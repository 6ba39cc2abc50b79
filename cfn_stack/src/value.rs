use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Source of values that are only known after looking something up in the
/// target account (SSM parameters, hosted zone ids, ...).
pub trait ResolveContext {
    fn resolve(&self, key: &str) -> Option<&str>;
}

/// A context that never resolves anything.
pub struct NoContext;

impl ResolveContext for NoContext {
    fn resolve(&self, _key: &str) -> Option<&str> {
        None
    }
}

/// a string-typed property value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrVal {
    Val(String),
    /// `{ "Ref": logical_id }`
    Ref(String),
    /// `{ "Fn::GetAtt": [logical_id, attribute] }`
    GetAtt(String, String),
    /// replaced by the context value stored under this key when rendering.
    Context(String),
}

impl StrVal {
    pub fn to_value(&self, ctx: &dyn ResolveContext) -> Result<Value> {
        match self {
            StrVal::Val(s) => Ok(Value::String(s.clone())),
            StrVal::Ref(id) => Ok(get_ref(id)),
            StrVal::GetAtt(id, attr) => Ok(get_att(id, attr)),
            StrVal::Context(key) => match ctx.resolve(key) {
                Some(v) => Ok(Value::String(v.to_string())),
                None => Err(Error::MissingContext { key: key.clone() }),
            },
        }
    }

    pub fn is_empty_literal(&self) -> bool {
        matches!(self, StrVal::Val(s) if s.is_empty())
    }
}

impl From<&str> for StrVal {
    fn from(value: &str) -> Self {
        StrVal::Val(value.to_string())
    }
}

impl From<String> for StrVal {
    fn from(value: String) -> Self {
        StrVal::Val(value)
    }
}

pub fn get_ref(logical_id: &str) -> Value {
    let mut map = Map::new();
    map.insert("Ref".to_string(), Value::String(logical_id.to_string()));
    Value::Object(map)
}

pub fn get_att(logical_id: &str, attribute: &str) -> Value {
    let mut map = Map::new();
    map.insert(
        "Fn::GetAtt".to_string(),
        Value::Array(vec![
            Value::String(logical_id.to_string()),
            Value::String(attribute.to_string()),
        ]),
    );
    Value::Object(map)
}

/// `{ "Fn::Sub": template }`
pub fn sub(template: &str) -> Value {
    let mut map = Map::new();
    map.insert("Fn::Sub".to_string(), Value::String(template.to_string()));
    Value::Object(map)
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolicyStatement {
    pub effect: String,
    pub action: String,
    pub resource: Value,
    /// left out of the statement when `None`.
    pub principal: Option<Value>,
}

pub fn create_policy_doc(statements: &[PolicyStatement]) -> Value {
    let mut map = Map::new();
    map.insert("Version".to_string(), Value::String("2012-10-17".to_string()));
    let mut statements_out = vec![];
    for statement in statements {
        let mut statement_obj = Map::new();
        statement_obj.insert("Effect".to_string(), Value::String(statement.effect.clone()));
        statement_obj.insert("Action".to_string(), Value::String(statement.action.clone()));
        statement_obj.insert("Resource".to_string(), statement.resource.clone());
        if let Some(principal) = &statement.principal {
            statement_obj.insert("Principal".to_string(), principal.clone());
        }
        statements_out.push(Value::Object(statement_obj));
    }
    map.insert("Statement".to_string(), Value::Array(statements_out));
    Value::Object(map)
}
