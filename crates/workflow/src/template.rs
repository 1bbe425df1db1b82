//! Template rendering with `{placeholder}` substitution.

use std::collections::HashMap;

use database::Customer;

/// Render `content`, replacing each `{key}` with its value from `vars`.
///
/// Placeholders with no matching variable are left intact, so a typo'd
/// template is visible in the output instead of silently losing text.
/// A `{` with no closing `}` is treated as literal text.
pub fn render(content: &str, vars: &HashMap<&str, String>) -> String {
    let mut out = String::with_capacity(content.len());
    let mut rest = content;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        match after.find('}') {
            Some(close) => {
                let key = &after[..close];
                match vars.get(key) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(key);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                return out;
            }
        }
    }

    out.push_str(rest);
    out
}

/// The variables a customer row provides to a template.
pub fn customer_vars(customer: &Customer) -> HashMap<&'static str, String> {
    let mut vars = HashMap::new();
    vars.insert("name", customer.name.clone());
    vars.insert("phone", customer.phone_number.clone());
    if let Some(segment) = &customer.segment {
        vars.insert("segment", segment.clone());
    }
    vars
}
