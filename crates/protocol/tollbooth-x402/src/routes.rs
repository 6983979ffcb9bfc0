//! Route policy matching.
//!
//! Maps an inbound `(METHOD, path)` pair to the price of the route. Lookup tries
//! the exact `"METHOD path"` key first, then pattern entries in configuration
//! order:
//!
//! - `*` in a path matches any run of characters, slashes included
//! - `[name]` matches a single non-empty segment without `/`
//! - method `*` matches any verb
//!
//! Patterns are compiled once when the table is built.

use std::collections::HashMap;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{X402Error, X402Result};
use crate::types::PaymentScheme;

/// Price and scheme bound to a method and path pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutePolicy {
    /// HTTP method, or `*` for any.
    #[serde(default = "any_method")]
    pub method: String,

    /// Path or path pattern.
    pub path: String,

    /// Price in base-currency units, decimal string.
    pub price: String,

    /// Scheme required for this route.
    #[serde(default)]
    pub scheme: PaymentScheme,

    /// Description shown in the 402 requirements.
    #[serde(default)]
    pub description: String,
}

fn any_method() -> String {
    "*".to_string()
}

impl RoutePolicy {
    /// Create a route policy.
    pub fn new(
        method: &str,
        path: &str,
        price: &str,
        scheme: PaymentScheme,
        description: &str,
    ) -> Self {
        Self {
            method: method.to_ascii_uppercase(),
            path: path.to_string(),
            price: price.to_string(),
            scheme,
            description: description.to_string(),
        }
    }

    /// The `"METHOD path"` lookup key.
    pub fn key(&self) -> String {
        format!("{} {}", self.method.to_ascii_uppercase(), self.path)
    }

    fn is_pattern(&self) -> bool {
        self.method == "*" || self.path.contains('*') || self.path.contains('[')
    }
}

#[derive(Debug)]
struct CompiledPattern {
    /// `None` matches any method.
    method: Option<String>,
    regex: Regex,
    index: usize,
}

/// Compiled, read-only route table.
#[derive(Debug, Default)]
pub struct RouteTable {
    policies: Vec<RoutePolicy>,
    exact: HashMap<String, usize>,
    patterns: Vec<CompiledPattern>,
}

impl RouteTable {
    /// Compile a list of policies.
    ///
    /// # Errors
    /// `InvalidRoute` if a pattern has an unclosed `[` or an empty `[]`.
    pub fn new(policies: Vec<RoutePolicy>) -> X402Result<Self> {
        let mut exact = HashMap::new();
        let mut patterns = Vec::new();

        for (index, policy) in policies.iter().enumerate() {
            if policy.is_pattern() {
                let method = (policy.method != "*").then(|| policy.method.to_ascii_uppercase());
                patterns.push(CompiledPattern {
                    method,
                    regex: compile_path_pattern(&policy.path)?,
                    index,
                });
            } else {
                // First definition of a key wins.
                exact.entry(policy.key()).or_insert(index);
            }
        }

        Ok(Self {
            policies,
            exact,
            patterns,
        })
    }

    /// Find the policy for a request, or `None` if the route is unmetered.
    pub fn matches(&self, method: &str, path: &str) -> Option<&RoutePolicy> {
        let method = method.to_ascii_uppercase();
        let key = format!("{} {}", method, path);

        if let Some(&index) = self.exact.get(&key) {
            return self.policies.get(index);
        }

        self.patterns
            .iter()
            .find(|p| {
                p.method.as_deref().map_or(true, |m| m == method) && p.regex.is_match(path)
            })
            .and_then(|p| self.policies.get(p.index))
    }

    /// All configured policies, in configuration order.
    pub fn policies(&self) -> &[RoutePolicy] {
        &self.policies
    }

    /// Number of configured policies.
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    /// Whether no policies are configured.
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

/// Compile a path pattern to an anchored regex.
fn compile_path_pattern(pattern: &str) -> X402Result<Regex> {
    let invalid = |reason: &str| X402Error::InvalidRoute {
        pattern: pattern.to_string(),
        reason: reason.to_string(),
    };

    let mut re = String::with_capacity(pattern.len() + 8);
    re.push('^');

    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => re.push_str(".*"),
            '[' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some(']') => break,
                        Some(ch) => name.push(ch),
                        None => return Err(invalid("unclosed '['")),
                    }
                }
                if name.is_empty() {
                    return Err(invalid("empty parameter name"));
                }
                re.push_str("[^/]+");
            }
            other => re.push_str(&regex::escape(other.encode_utf8(&mut [0u8; 4]))),
        }
    }

    re.push('$');
    Regex::new(&re).map_err(|e| invalid(&e.to_string()))
}
