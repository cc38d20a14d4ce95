use serde::{Deserialize, Serialize};

/// Names that identify the metrics instrumentation API being scanned for.
///
/// Method names use the API's canonical `UpperCamelCase` spelling. Adapters for
/// languages with other conventions translate before producing call sites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InstrumentationApi {
    /// Type path of the instrumentation object, matched as a suffix of a receiver's type.
    pub type_path: String,

    /// Function that builds the instrumentation object and sets the metric namespace.
    pub constructor: String,

    /// Method that never emits a metric.
    pub noop_helper: String,
}

const SMART_POINTERS: [&str; 5] = ["Box<", "Rc<", "Arc<", "LazyLock<", "Lazy<"];

impl Default for InstrumentationApi {
    fn default() -> Self {
        Self {
            type_path: "PrometheusMetrics".to_string(),
            constructor: "NewMetrics".to_string(),
            noop_helper: "TestHelper".to_string(),
        }
    }
}

impl InstrumentationApi {
    /// Whether `type_name` denotes the instrumentation type.
    ///
    /// Pointer and reference indicators are ignored, so `*api.PrometheusMetrics`,
    /// `&mut PrometheusMetrics` and `Arc<PrometheusMetrics>` all match. The comparison is a
    /// suffix match anchored at a path segment boundary (`::`, `.` or `/`).
    #[must_use]
    pub fn matches_type(&self, type_name: &str) -> bool {
        if self.type_path.is_empty() {
            return false;
        }

        let name = strip_indirection(type_name);
        let Some(head) = name.strip_suffix(self.type_path.as_str()) else {
            return false;
        };

        head.is_empty() || head.ends_with("::") || head.ends_with('.') || head.ends_with('/')
    }

    #[must_use]
    pub fn is_constructor(&self, method: &str) -> bool {
        method == self.constructor
    }

    #[must_use]
    pub fn is_noop_helper(&self, method: &str) -> bool {
        method == self.noop_helper
    }
}

/// Strip references, raw pointers and the standard smart pointers from a type name.
pub(crate) fn strip_indirection(type_name: &str) -> &str {
    let mut name = type_name.trim();
    loop {
        let before = name;

        for prefix in ["&mut ", "*mut ", "*const ", "&", "*"] {
            if let Some(rest) = name.strip_prefix(prefix) {
                name = rest.trim_start();
            }
        }

        // strip a lifetime left behind by `&'a T`
        if let Some(rest) = name.strip_prefix('\'') {
            name = rest.split_once(' ').map_or("", |(_, ty)| ty).trim_start();
            if let Some(rest) = name.strip_prefix("mut ") {
                name = rest.trim_start();
            }
        }

        for pointer in SMART_POINTERS {
            let generics = name.find('<').unwrap_or(name.len());
            let start = name[..generics].rfind("::").map_or(0, |i| i + 2);
            let (path, last) = name.split_at(start);
            if (path.is_empty() || path.ends_with("::"))
                && let Some(inner) = last.strip_prefix(pointer).and_then(|rest| rest.strip_suffix('>'))
                && (path.is_empty() || is_std_pointer_path(path))
            {
                name = inner.trim();
            }
        }

        if name == before {
            return name;
        }
    }
}

fn is_std_pointer_path(path: &str) -> bool {
    matches!(
        path,
        "std::sync::"
            | "alloc::sync::"
            | "std::rc::"
            | "alloc::rc::"
            | "std::boxed::"
            | "alloc::boxed::"
            | "once_cell::sync::"
            | "once_cell::unsync::"
    )
}
