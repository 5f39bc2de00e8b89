// ── Message templates ──
//
// `{person}` / `{location}` placeholders, substituted in a single pass so
// values that happen to contain braces are never re-expanded.

pub const DEFAULT_ARRIVED_TITLE: &str = "{person} arrived";
pub const DEFAULT_ARRIVED_BODY: &str = "{person} arrived at {location}";
pub const DEFAULT_LEFT_TITLE: &str = "{person} left";
pub const DEFAULT_LEFT_BODY: &str = "{person} left {location}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Templates {
    pub arrived_title: String,
    pub arrived_body: String,
    pub left_title: String,
    pub left_body: String,
}

impl Default for Templates {
    fn default() -> Self {
        Self {
            arrived_title: DEFAULT_ARRIVED_TITLE.into(),
            arrived_body: DEFAULT_ARRIVED_BODY.into(),
            left_title: DEFAULT_LEFT_TITLE.into(),
            left_body: DEFAULT_LEFT_BODY.into(),
        }
    }
}

/// Replace `{key}` occurrences with their values. Unknown placeholders
/// and unmatched braces are copied through verbatim.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            return out;
        };

        let key = &after[..close];
        if let Some((_, value)) = vars.iter().find(|(name, _)| *name == key) {
            out.push_str(value);
            rest = &after[close + 1..];
        } else {
            // Not a placeholder; rescan from the next character so an
            // inner `{` can still open one.
            out.push('{');
            rest = after;
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: &[(&str, &str)] = &[("person", "Alice"), ("location", "Home")];

    #[test]
    fn substitutes_known_placeholders() {
        assert_eq!(render(DEFAULT_ARRIVED_BODY, VARS), "Alice arrived at Home");
        assert_eq!(render("{person}{person}", VARS), "AliceAlice");
    }

    #[test]
    fn unknown_placeholders_pass_through() {
        assert_eq!(render("{person} at {zone}", VARS), "Alice at {zone}");
    }

    #[test]
    fn unmatched_brace_is_literal() {
        assert_eq!(render("hi {person", VARS), "hi {person");
        assert_eq!(render("} {location}", VARS), "} Home");
    }

    #[test]
    fn stray_brace_before_placeholder_is_literal() {
        assert_eq!(render("{ {person}", VARS), "{ Alice");
        assert_eq!(render("{{location}}", VARS), "{Home}");
        assert_eq!(render("{zone {person}}", VARS), "{zone Alice}");
    }

    #[test]
    fn values_are_not_re_expanded() {
        let vars = [("person", "{location}"), ("location", "Home")];
        assert_eq!(render("{person} @ {location}", &vars), "{location} @ Home");
    }
}
