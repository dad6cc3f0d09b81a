//! Method descriptors: the unit under test as seen by the harness.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies one method handed to the exploration engine.
///
/// Descriptors are immutable once built; the harness only reads the type and
/// method names (for gold paths) and the type-name sequence (for hashing).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodDescriptor {
    /// Fully qualified declaring type, dot separated (`VSharp.Test.Tests.Lists`).
    #[serde(rename = "type")]
    pub type_name: String,
    pub method: String,
    #[serde(default)]
    pub parameters: Vec<String>,
    #[serde(rename = "return", default = "void_type")]
    pub return_type: String,
}

fn void_type() -> String {
    "System.Void".to_string()
}

impl MethodDescriptor {
    pub fn new(
        type_name: impl Into<String>,
        method: impl Into<String>,
        parameters: impl IntoIterator<Item = impl Into<String>>,
        return_type: impl Into<String>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            method: method.into(),
            parameters: parameters.into_iter().map(Into::into).collect(),
            return_type: return_type.into(),
        }
    }

    /// Human-readable signature written to the `METHOD:` line of gold files.
    ///
    /// Format: `<return> <type>.<method>(<param>, <param>)`.
    #[must_use]
    pub fn signature_text(&self) -> String {
        format!(
            "{} {}.{}({})",
            self.return_type,
            self.type_name,
            self.method,
            self.parameters.join(", ")
        )
    }

    /// `Type.method`, used to identify the originating test in statistics.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        if self.type_name.is_empty() {
            self.method.clone()
        } else {
            format!("{}.{}", self.type_name, self.method)
        }
    }

    /// Namespace components of the declaring type, or `None` when the type
    /// name cannot be split into non-empty segments.
    #[must_use]
    pub fn type_segments(&self) -> Option<Vec<&str>> {
        let name = self.type_name.trim();
        if name.is_empty() {
            return None;
        }
        let segments: Vec<&str> = name.split('.').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return None;
        }
        Some(segments)
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.signature_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_text_lists_params_in_order() {
        let d = MethodDescriptor::new(
            "Demo.Foo",
            "Bar",
            ["System.Int32", "System.Double"],
            "System.Int32",
        );
        assert_eq!(
            d.signature_text(),
            "System.Int32 Demo.Foo.Bar(System.Int32, System.Double)"
        );
    }

    #[test]
    fn signature_text_without_params() {
        let d = MethodDescriptor::new("Demo.Foo", "Nop", Vec::<String>::new(), "System.Void");
        assert_eq!(d.signature_text(), "System.Void Demo.Foo.Nop()");
    }

    #[test]
    fn type_segments_split_on_dots() {
        let d = MethodDescriptor::new("A.B.C", "m", Vec::<String>::new(), "R");
        assert_eq!(d.type_segments(), Some(vec!["A", "B", "C"]));
    }

    #[test]
    fn type_segments_reject_empty_and_dangling() {
        for name in ["", "   ", "A..B", ".A", "A."] {
            let d = MethodDescriptor::new(name, "m", Vec::<String>::new(), "R");
            assert!(d.type_segments().is_none(), "{name:?}");
        }
    }

    #[test]
    fn qualified_name_handles_anonymous_type() {
        let d = MethodDescriptor::new("", "lambda", Vec::<String>::new(), "R");
        assert_eq!(d.qualified_name(), "lambda");
    }
}
