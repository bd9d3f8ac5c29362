//! Prompt strategies
//!
//! A strategy renders a tool name and its parameters into the instruction
//! handed to the agent. The set is closed; calibration compares the variants
//! only by how the agent reacts, never by any intrinsic score.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Ordered parameter map for one tool call
pub type Parameters = Map<String, Value>;

/// One way of phrasing a tool-call instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Strategy {
    /// Terse "execute now" command with bare values
    Imperative,
    /// Descriptive request in plain prose
    Natural,
    /// Numbered steps: pick the tool, set each parameter, run
    StepByStep,
    /// Literal call syntax with JSON arguments
    FunctionCall,
    /// Each argument annotated with its JSON type
    ExplicitTypes,
}

impl Strategy {
    /// Every strategy, in registration order
    pub const ALL: [Strategy; 5] = [
        Strategy::Imperative,
        Strategy::Natural,
        Strategy::StepByStep,
        Strategy::FunctionCall,
        Strategy::ExplicitTypes,
    ];

    /// Recommended when no strategy succeeded for a tool
    pub const FALLBACK: Strategy = Strategy::Imperative;

    /// Stable name used in reports and the persisted mapping
    pub fn name(self) -> &'static str {
        match self {
            Strategy::Imperative => "imperative",
            Strategy::Natural => "natural",
            Strategy::StepByStep => "stepByStep",
            Strategy::FunctionCall => "functionCall",
            Strategy::ExplicitTypes => "explicitTypes",
        }
    }

    /// One-line description for listings
    pub fn summary(self) -> &'static str {
        match self {
            Strategy::Imperative => "terse command with bare values",
            Strategy::Natural => "plain-prose request",
            Strategy::StepByStep => "numbered steps: select, set each parameter, run",
            Strategy::FunctionCall => "literal call syntax with JSON arguments",
            Strategy::ExplicitTypes => "arguments listed with their JSON types",
        }
    }

    /// Position in registration order
    pub fn registration_index(self) -> usize {
        Self::ALL.iter().position(|s| *s == self).unwrap_or(Self::ALL.len())
    }

    /// Render the instruction for `tool` with `params`
    ///
    /// Total over any parameter map.
    pub fn render(self, tool: &str, params: &Parameters) -> String {
        match self {
            Strategy::Imperative => render_imperative(tool, params),
            Strategy::Natural => render_natural(tool, params),
            Strategy::StepByStep => render_step_by_step(tool, params),
            Strategy::FunctionCall => render_function_call(tool, params),
            Strategy::ExplicitTypes => render_explicit_types(tool, params),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|strategy| strategy.name() == s).ok_or_else(|| {
            let known: Vec<&str> = Self::ALL.iter().map(|s| s.name()).collect();
            format!("unknown strategy '{}' (known: {})", s, known.join(", "))
        })
    }
}

fn render_imperative(tool: &str, params: &Parameters) -> String {
    if params.is_empty() {
        return format!("Execute the `{}` tool now. Do not explain, just call it.", tool);
    }

    let args: Vec<String> = params.iter().map(|(k, v)| format!("{}={}", k, bare(v))).collect();
    format!(
        "Execute the `{}` tool now with {}. Do not explain, just call it.",
        tool,
        args.join(", ")
    )
}

fn render_natural(tool: &str, params: &Parameters) -> String {
    if params.is_empty() {
        return format!(
            "I need you to use the {} tool. It does not take any parameters. Please run it and tell me what it returns.",
            tool
        );
    }

    let settings: Vec<String> = params.iter().map(|(k, v)| format!("\"{}\" to {}", k, bare(v))).collect();
    format!(
        "I need you to use the {} tool. Please set {}, then run it and tell me what it returns.",
        tool,
        join_prose(&settings)
    )
}

fn render_step_by_step(tool: &str, params: &Parameters) -> String {
    let mut steps = vec![format!("Select the `{}` tool.", tool)];
    steps.extend(params.iter().map(|(k, v)| format!("Set `{}` to {}.", k, bare(v))));
    steps.push("Run the tool and report its result.".to_string());

    let numbered: Vec<String> = steps
        .iter()
        .enumerate()
        .map(|(i, step)| format!("{}. {}", i + 1, step))
        .collect();
    format!("Follow these steps:\n{}", numbered.join("\n"))
}

fn render_function_call(tool: &str, params: &Parameters) -> String {
    let args: Vec<String> = params.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
    format!("Execute this tool call exactly as written:\n{}({})", tool, args.join(", "))
}

fn render_explicit_types(tool: &str, params: &Parameters) -> String {
    if params.is_empty() {
        return format!("Call the tool `{}`. It takes no arguments.", tool);
    }

    let lines: Vec<String> = params
        .iter()
        .map(|(k, v)| format!("- {} ({}): {}", k, type_name(v), v))
        .collect();
    format!("Call the tool `{}` with these typed arguments:\n{}", tool, lines.join("\n"))
}

/// Value without JSON quoting for plain strings
fn bare(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// JSON type name, with element type for homogeneous arrays
fn type_name(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(_) => "boolean".to_string(),
        Value::Number(n) if n.is_f64() => "number".to_string(),
        Value::Number(_) => "integer".to_string(),
        Value::String(_) => "string".to_string(),
        Value::Object(_) => "object".to_string(),
        Value::Array(items) => {
            let mut names = items.iter().map(type_name);
            match names.next() {
                Some(first) if names.all(|n| n == first) => format!("array of {}", first),
                _ => "array".to_string(),
            }
        }
    }
}

/// "a", "a and b", "a, b and c"
fn join_prose(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{Just, any};
    use proptest::strategy::Strategy as _;
    use proptest::{prop_assert, prop_assert_eq, prop_oneof, proptest};
    use serde_json::json;

    fn params(value: Value) -> Parameters {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {}", other),
        }
    }

    #[test]
    fn test_registration_order_and_names() {
        let names: Vec<&str> = Strategy::ALL.iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec!["imperative", "natural", "stepByStep", "functionCall", "explicitTypes"]
        );
        assert_eq!(Strategy::FALLBACK, Strategy::Imperative);
        assert!(Strategy::ALL.contains(&Strategy::FALLBACK));

        for (i, strategy) in Strategy::ALL.iter().enumerate() {
            assert_eq!(strategy.registration_index(), i);
        }
    }

    #[test]
    fn test_serde_names_match_display() {
        for strategy in Strategy::ALL {
            let encoded = serde_json::to_value(strategy).unwrap();
            assert_eq!(encoded, json!(strategy.name()));
            assert_eq!(strategy.to_string(), strategy.name());

            let decoded: Strategy = serde_json::from_value(encoded).unwrap();
            assert_eq!(decoded, strategy);
        }
    }

    #[test]
    fn test_from_str() {
        assert_eq!("stepByStep".parse::<Strategy>(), Ok(Strategy::StepByStep));

        let err = "shouting".parse::<Strategy>().unwrap_err();
        assert!(err.contains("shouting"));
        assert!(err.contains("explicitTypes"));
    }

    #[test]
    fn test_imperative_without_params() {
        let text = Strategy::Imperative.render("list_allowed_directories", &Parameters::new());
        assert_eq!(
            text,
            "Execute the `list_allowed_directories` tool now. Do not explain, just call it."
        );
    }

    #[test]
    fn test_imperative_uses_bare_values() {
        let text = Strategy::Imperative.render("read_file", &params(json!({ "path": "/tmp/a.txt", "head": 5 })));
        assert!(text.contains("path=/tmp/a.txt, head=5"));
    }

    #[test]
    fn test_natural_joins_settings() {
        let text = Strategy::Natural.render(
            "search",
            &params(json!({ "query": "rust", "limit": 3, "safe": false })),
        );
        assert!(text.contains("set \"query\" to rust, \"limit\" to 3 and \"safe\" to false"));
    }

    #[test]
    fn test_step_by_step_numbers_every_parameter() {
        let text = Strategy::StepByStep.render("list_allowed_directories", &params(json!({ "path": "/tmp" })));
        assert_eq!(
            text,
            "Follow these steps:\n\
             1. Select the `list_allowed_directories` tool.\n\
             2. Set `path` to /tmp.\n\
             3. Run the tool and report its result."
        );
    }

    #[test]
    fn test_function_call_uses_json_literals() {
        let text = Strategy::FunctionCall.render(
            "write_file",
            &params(json!({ "path": "/tmp/x", "tags": ["a", "b"], "opts": { "force": true } })),
        );
        assert!(text.ends_with("write_file(path=\"/tmp/x\", tags=[\"a\",\"b\"], opts={\"force\":true})"));
    }

    #[test]
    fn test_explicit_types_annotates_each_argument() {
        let text = Strategy::ExplicitTypes.render(
            "get_file_info",
            &params(json!({ "path": "/tmp", "depth": 2, "ratio": 0.5, "names": ["x"], "mixed": [1, "a"], "none": null })),
        );
        assert!(text.contains("- path (string): \"/tmp\""));
        assert!(text.contains("- depth (integer): 2"));
        assert!(text.contains("- ratio (number): 0.5"));
        assert!(text.contains("- names (array of string): [\"x\"]"));
        assert!(text.contains("- mixed (array): [1,\"a\"]"));
        assert!(text.contains("- none (null): null"));
    }

    #[test]
    fn test_parameter_order_is_preserved() {
        let mut p = Parameters::new();
        p.insert("zeta".to_string(), json!(1));
        p.insert("alpha".to_string(), json!(2));

        let text = Strategy::FunctionCall.render("t", &p);
        assert!(text.ends_with("t(zeta=1, alpha=2)"));
    }

    fn arb_scalar() -> impl proptest::strategy::Strategy<Value = Value> {
        prop_oneof![
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| json!(n)),
            "[a-z /._-]{0,12}".prop_map(Value::String),
            Just(Value::Null),
        ]
    }

    fn arb_value() -> impl proptest::strategy::Strategy<Value = Value> {
        prop_oneof![
            arb_scalar(),
            proptest::collection::vec(arb_scalar(), 0..4).prop_map(Value::Array),
            proptest::collection::btree_map("[a-z]{1,6}", arb_scalar(), 0..3)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    }

    proptest! {
        #[test]
        fn prop_every_strategy_mentions_tool_and_keys(
            tool in "[a-z_]{1,20}",
            entries in proptest::collection::btree_map("[a-z_]{1,8}", arb_value(), 0..5),
        ) {
            let p: Parameters = entries.into_iter().collect();
            for strategy in Strategy::ALL {
                let text = strategy.render(&tool, &p);
                prop_assert!(text.contains(&tool));
                for key in p.keys() {
                    prop_assert!(text.contains(key.as_str()));
                }
                prop_assert_eq!(text.clone(), strategy.render(&tool, &p));
            }
        }
    }
}
