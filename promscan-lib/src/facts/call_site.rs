use serde::{Deserialize, Serialize};

/// How the receiver of a call is expressed in source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiverShape {
    /// The receiver is a plain reference to a value or a path (`metrics.counter(..)`, `api::new_metrics(..)`).
    #[default]
    Direct,

    /// The receiver is itself a member access (`self.metrics.timer(..)`).
    Member,
}

/// One entry of a composite literal.
///
/// Struct literals carry keyed entries, list literals carry unkeyed ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub value: ArgExpr,
}

/// An argument expression, reduced to the literal shapes the scanner cares about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArgExpr {
    /// A string literal with its decoded value.
    String { value: String },

    /// A struct or list literal.
    Composite { entries: Vec<CompositeEntry> },

    /// Anything else.
    Other,
}

impl ArgExpr {
    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        Self::String { value: value.into() }
    }

    /// A list literal made of string elements.
    #[must_use]
    pub fn string_list<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Composite {
            entries: values
                .into_iter()
                .map(|v| CompositeEntry {
                    key: None,
                    value: Self::string(v),
                })
                .collect(),
        }
    }

    /// A struct literal made of keyed entries.
    #[must_use]
    pub fn keyed<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Self)>,
        K: Into<String>,
    {
        Self::Composite {
            entries: fields
                .into_iter()
                .map(|(k, value)| CompositeEntry { key: Some(k.into()), value })
                .collect(),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String { value } => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_composite(&self) -> Option<&[CompositeEntry]> {
        match self {
            Self::Composite { entries } => Some(entries),
            _ => None,
        }
    }

    /// Short description of the literal shape, used in diagnostics.
    #[must_use]
    pub const fn shape(&self) -> &'static str {
        match self {
            Self::String { .. } => "string literal",
            Self::Composite { .. } => "composite literal",
            Self::Other => "non-literal expression",
        }
    }
}

/// A single call expression together with the static type facts the scanner needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSite {
    /// Static type of the receiver expression, when the receiver is a value.
    #[serde(default)]
    pub receiver_type: Option<String>,

    #[serde(default)]
    pub receiver_shape: ReceiverShape,

    /// Selected method or function name, in the instrumentation API's spelling.
    pub method: String,

    #[serde(default)]
    pub args: Vec<ArgExpr>,

    /// Static type of the call expression itself.
    #[serde(default)]
    pub result_type: Option<String>,

    /// Where the call appears, for diagnostics.
    #[serde(default)]
    pub location: String,
}

impl CallSite {
    #[must_use]
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            receiver_type: None,
            receiver_shape: ReceiverShape::Direct,
            method: method.into(),
            args: Vec::new(),
            result_type: None,
            location: String::new(),
        }
    }

    #[must_use]
    pub fn receiver(mut self, type_name: impl Into<String>, shape: ReceiverShape) -> Self {
        self.receiver_type = Some(type_name.into());
        self.receiver_shape = shape;
        self
    }

    #[must_use]
    pub fn returning(mut self, type_name: impl Into<String>) -> Self {
        self.result_type = Some(type_name.into());
        self
    }

    #[must_use]
    pub fn arg(mut self, arg: ArgExpr) -> Self {
        self.args.push(arg);
        self
    }

    #[must_use]
    pub fn at(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }
}

/// A named group of call sites, scanned as one unit in the order given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceUnit {
    pub name: String,

    #[serde(default)]
    pub call_sites: Vec<CallSite>,
}

impl SourceUnit {
    #[must_use]
    pub fn new(name: impl Into<String>, call_sites: Vec<CallSite>) -> Self {
        Self {
            name: name.into(),
            call_sites,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_list_preserves_order() {
        let list = ArgExpr::string_list(["region", "env"]);
        let values: Vec<_> = list.as_composite().unwrap().iter().filter_map(|e| e.value.as_str()).collect();
        assert_eq!(values, ["region", "env"]);
    }

    #[test]
    fn test_arg_shape() {
        assert_eq!(ArgExpr::string("x").shape(), "string literal");
        assert_eq!(ArgExpr::Other.shape(), "non-literal expression");
        assert_eq!(ArgExpr::keyed::<_, String>([]).shape(), "composite literal");
    }

    #[test]
    fn test_call_site_deserializes_with_defaults() {
        let site: CallSite = serde_json::from_str(r#"{"method": "Counter", "args": [{"kind": "string", "value": "hits"}]}"#).unwrap();
        assert_eq!(site.receiver_shape, ReceiverShape::Direct);
        assert_eq!(site.receiver_type, None);
        assert_eq!(site.args, vec![ArgExpr::string("hits")]);
    }
}
