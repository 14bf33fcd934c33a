//! Typed animation parameters driving state machines and blend trees

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A parameter value tagged by kind
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Parameter {
    Float(f32),
    Int(i32),
    Bool(bool),
    /// Set until a transition consumes it
    Trigger(bool),
}

impl Parameter {
    fn same_kind(&self, other: &Parameter) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    /// Numeric view used by comparison conditions
    pub fn as_f32(&self) -> f32 {
        match *self {
            Parameter::Float(v) => v,
            Parameter::Int(v) => v as f32,
            Parameter::Bool(v) | Parameter::Trigger(v) => {
                if v {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    pub fn as_bool(&self) -> bool {
        match *self {
            Parameter::Float(v) => v != 0.0,
            Parameter::Int(v) => v != 0,
            Parameter::Bool(v) | Parameter::Trigger(v) => v,
        }
    }
}

/// Name to typed-value table.
///
/// Setting a name for the first time declares its kind; later sets with a
/// different kind are rejected without touching the stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    values: BTreeMap<String, Parameter>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    fn set(&mut self, name: &str, value: Parameter) -> bool {
        match self.values.get_mut(name) {
            Some(existing) if existing.same_kind(&value) => {
                *existing = value;
                true
            }
            Some(_) => {
                log::warn!("Parameter '{}' has a different type; ignoring set", name);
                false
            }
            None => {
                self.values.insert(name.to_string(), value);
                true
            }
        }
    }

    pub fn set_float(&mut self, name: &str, value: f32) -> bool {
        self.set(name, Parameter::Float(value))
    }

    pub fn set_int(&mut self, name: &str, value: i32) -> bool {
        self.set(name, Parameter::Int(value))
    }

    pub fn set_bool(&mut self, name: &str, value: bool) -> bool {
        self.set(name, Parameter::Bool(value))
    }

    /// Raise a trigger
    pub fn set_trigger(&mut self, name: &str) -> bool {
        self.set(name, Parameter::Trigger(true))
    }

    /// Declare a trigger without raising it
    pub fn add_trigger(&mut self, name: &str) -> bool {
        self.set(name, Parameter::Trigger(false))
    }

    pub fn reset_trigger(&mut self, name: &str) -> bool {
        match self.values.get_mut(name) {
            Some(Parameter::Trigger(v)) => {
                *v = false;
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, name: &str) -> Option<Parameter> {
        self.values.get(name).copied()
    }

    /// Float value; ints convert, anything else reads as 0
    pub fn get_float(&self, name: &str) -> f32 {
        match self.values.get(name) {
            Some(Parameter::Float(v)) => *v,
            Some(Parameter::Int(v)) => *v as f32,
            _ => 0.0,
        }
    }

    pub fn get_int(&self, name: &str) -> i32 {
        match self.values.get(name) {
            Some(Parameter::Int(v)) => *v,
            _ => 0,
        }
    }

    /// Bool value; a trigger reads as whether it is currently set
    pub fn get_bool(&self, name: &str) -> bool {
        match self.values.get(name) {
            Some(Parameter::Bool(v)) | Some(Parameter::Trigger(v)) => *v,
            _ => false,
        }
    }

    pub fn is_trigger(&self, name: &str) -> bool {
        matches!(self.values.get(name), Some(Parameter::Trigger(_)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Parameter)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_set_and_get() {
        let mut params = Parameters::new();
        assert!(params.set_float("speed", 2.5));
        assert!(params.set_int("ammo", 3));
        assert!(params.set_bool("grounded", true));
        assert_eq!(params.get_float("speed"), 2.5);
        assert_eq!(params.get_float("ammo"), 3.0);
        assert_eq!(params.get_int("ammo"), 3);
        assert!(params.get_bool("grounded"));
        assert_eq!(params.get_float("missing"), 0.0);
    }

    #[test]
    fn wrong_type_is_rejected() {
        let mut params = Parameters::new();
        params.set_float("speed", 1.0);
        assert!(!params.set_bool("speed", true));
        assert_eq!(params.get("speed"), Some(Parameter::Float(1.0)));
    }

    #[test]
    fn triggers() {
        let mut params = Parameters::new();
        params.add_trigger("jump");
        assert!(!params.get_bool("jump"));
        params.set_trigger("jump");
        assert!(params.get_bool("jump"));
        assert!(params.reset_trigger("jump"));
        assert!(!params.get_bool("jump"));
        assert!(params.is_trigger("jump"));
        assert!(!params.reset_trigger("missing"));
    }

    #[test]
    fn serde_round_trip() {
        let mut params = Parameters::new();
        params.set_float("blend", 0.25);
        params.add_trigger("fire");
        let json = serde_json::to_string(&params).unwrap();
        let back: Parameters = serde_json::from_str(&json).unwrap();
        assert_eq!(back, params);
    }
}
