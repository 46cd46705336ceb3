//! Dispatcher shorthand normalization.
//!
//! CHP dispatch logs are written in radio shorthand: `"I80 EB JEO MADISON AVE
//! OFR"`, `"1183-Trfc Collision-Unkn Inj"`. This module rewrites that text into
//! something a reader can scan.
//!
//! The rewrite is a fixed table of [`Rule`]s applied in order. Rules see the
//! output of every rule before them, so the position of a rule in [`RULES`] is
//! part of its behavior (`"Trfc Collision"` only collapses to `"Collision"`
//! because the `Trfc` abbreviation is expanded first, for instance).

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

/// How many matches a rule rewrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Only the leftmost match
    First,
    /// Every non-overlapping match
    All,
}

/// What a rule does with its match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rewrite {
    /// Regex replacement template (`${1}` expands the first capture)
    Template(&'static str),
    /// `"<route> <dir> at <route> <dir> ..."` becomes `"<route> <dir> at ..."`.
    ///
    /// The pattern captures the leading `<route> <dir>` token; the rule only
    /// fires when the same token (ignoring ASCII case) follows the `at`.
    CollapseRepeat,
}

/// One entry of the normalization table.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    /// Stable name, used in tests and debug output
    pub name: &'static str,
    /// Regex pattern (`regex` crate syntax)
    pub pattern: &'static str,
    /// Replacement behavior
    pub rewrite: Rewrite,
    /// First match only, or all matches
    pub scope: Scope,
}

const fn rule(name: &'static str, pattern: &'static str, replacement: &'static str, scope: Scope) -> Rule {
    Rule {
        name,
        pattern,
        rewrite: Rewrite::Template(replacement),
        scope,
    }
}

/// One leading and one trailing `"`.
const DEQUOTE_PATTERN: &str = r#"^"|"$"#;

/// The normalization table, in application order.
pub const RULES: &[Rule] = &[
    // Quotes
    rule("dequote", DEQUOTE_PATTERN, "", Scope::All),
    // Intersections
    rule("slash-at", r" / ", " at ", Scope::First),
    Rule {
        name: "repeated-at",
        pattern: r"(?i)^(\w+\d+ \w) at ",
        rewrite: Rewrite::CollapseRepeat,
        scope: Scope::First,
    },
    // "Just <direction> of"
    rule("jno", r"(?i)\bJNO\b", "just north of", Scope::First),
    rule("jso", r"(?i)\bJSO\b", "just south of", Scope::First),
    rule("jeo", r"(?i)\bJEO\b", "just east of", Scope::First),
    rule("jwo", r"(?i)\bJWO\b", "just west of", Scope::First),
    // Travel direction
    rule("north-bound", r"(?i)\bNB*\b", "north bound", Scope::First),
    rule("south-bound", r"(?i)\bSB*\b", "south bound", Scope::First),
    rule("east-bound", r"(?i)\bEB*\b", "east bound", Scope::First),
    rule("west-bound", r"(?i)\bWB*\b", "west bound", Scope::First),
    // Ramps
    rule("offramp", r"(?i)\bOFR\b", "offramp", Scope::All),
    rule("onramp", r"(?i)\bONR\b", "onramp", Scope::All),
    rule("connector", r"(?i)\bCON\b", "connector", Scope::First),
    // Prepositions
    rule("at", r"(?i)\bAT\b", "at", Scope::First),
    rule("on", r"(?i)\bON\b", "on", Scope::First),
    rule("to", r"(?i)\bTO\b", "to", Scope::First),
    // Local highway name
    rule("sr51", r"(?i)\bSR51\b", "CAP CITY FWY", Scope::First),
    // Incident report glossary
    rule("trfc", r"(?i)\bTrfc\b", "Traffic", Scope::First),
    rule("inj", r"(?i)\bInj\b", "Injury", Scope::First),
    rule("enrt", r"(?i)\bEnrt\b", "Enroute", Scope::First),
    rule("veh", r"(?i)\bVeh\b", "Vehicle", Scope::All),
    rule("vehs", r"(?i)\bVehs\b", "Vehicles", Scope::All),
    rule("unk", r"(?i)\bUnk(n*)\b", "Unknown", Scope::First),
    rule("1141", r"\b1141\b", "Ambulance", Scope::First),
    rule("rp", r"(?i)\bRP\b", "reporting party", Scope::First),
    rule("tc", r"(?i)\bTC\b", "collision", Scope::First),
    rule("rhs", r"(?i)\bRHS\b", "right hand side", Scope::First),
    rule("lhs", r"(?i)\bLHS\b", "left hand side", Scope::First),
    rule("mdl", r"(?i)\bMDL\b", "middle", Scope::All),
    rule("rdwy", r"(?i)\bRDWY\b", "roadway", Scope::All),
    rule("invld", r"(?i)\bINVLD\b", "involved", Scope::First),
    rule("ct", r"(?i)\bCT\b", "CalTrans", Scope::All),
    // Structural rewrites
    rule("fire-report", r"^FIRE-Report of$", "Report of Fire", Scope::First),
    rule("collision-dash", r"Collision-(\w+)", "Collision - ${1}", Scope::First),
    rule("traffic-collision", r"Traffic Collision", "Collision", Scope::First),
    // Cosmetic cleanup
    rule("double-slash", r"\s*//", ". ", Scope::First),
    rule("phone", r"(\d{3})-\d{3}-\d{4}", "${1}-***-****", Scope::First),
    rule("tags", r"^(\[\d+\] )+", "", Scope::First),
    rule("leading-zero", r"^0 ", "", Scope::First),
];

/// A [`Rule`] paired with its compiled pattern.
struct CompiledRule {
    rule: &'static Rule,
    regex: Regex,
}

impl CompiledRule {
    fn apply<'t>(&self, text: &'t str) -> Cow<'t, str> {
        match (self.rule.rewrite, self.rule.scope) {
            (Rewrite::Template(rep), Scope::First) => self.regex.replace(text, rep),
            (Rewrite::Template(rep), Scope::All) => self.regex.replace_all(text, rep),
            (Rewrite::CollapseRepeat, _) => collapse_repeat(&self.regex, text),
        }
    }
}

/// Feed text is matched the way a browser would: `\b`, `\w`, `\d` and
/// case-insensitive matching are ASCII-only.
fn compile(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).unicode(false).build()
}

#[allow(clippy::expect_used)]
static COMPILED: LazyLock<Vec<CompiledRule>> = LazyLock::new(|| {
    RULES
        .iter()
        .map(|rule| CompiledRule {
            rule,
            regex: compile(rule.pattern).expect("valid regex"),
        })
        .collect()
});

#[allow(clippy::expect_used)]
static DEQUOTE_RE: LazyLock<Regex> =
    LazyLock::new(|| compile(DEQUOTE_PATTERN).expect("valid regex"));

/// Strip one leading and one trailing `"` from a feed value.
#[must_use]
pub fn dequote(raw: &str) -> Cow<'_, str> {
    DEQUOTE_RE.replace_all(raw, "")
}

/// Run the full normalization table over a raw feed string.
#[must_use]
pub fn normalize(raw: &str) -> String {
    let mut text = raw.to_string();
    for compiled in COMPILED.iter() {
        let rewritten = match compiled.apply(&text) {
            Cow::Borrowed(_) => None,
            Cow::Owned(rewritten) => Some(rewritten),
        };
        if let Some(rewritten) = rewritten {
            text = rewritten;
        }
    }
    text
}

/// Apply the table's rule named `name` on its own. Returns `None` for an
/// unknown name.
#[must_use]
pub fn apply_rule(name: &str, text: &str) -> Option<String> {
    COMPILED
        .iter()
        .find(|c| c.rule.name == name)
        .map(|c| c.apply(text).into_owned())
}

fn collapse_repeat<'t>(regex: &Regex, text: &'t str) -> Cow<'t, str> {
    let Some(caps) = regex.captures(text) else {
        return Cow::Borrowed(text);
    };
    let (Some(whole), Some(token)) = (caps.get(0), caps.get(1)) else {
        return Cow::Borrowed(text);
    };

    let token = token.as_str();
    let rest = &text[whole.end()..];
    match rest.get(..token.len()) {
        Some(head) if head.eq_ignore_ascii_case(token) => {
            Cow::Owned(format!("{token} at{}", &rest[token.len()..]))
        }
        _ => Cow::Borrowed(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule_output(name: &str, input: &str) -> String {
        apply_rule(name, input).unwrap_or_else(|| panic!("no rule named {name}"))
    }

    #[test]
    fn test_every_rule_compiles_and_names_are_unique() {
        assert_eq!(COMPILED.len(), RULES.len());

        let mut names: Vec<&str> = RULES.iter().map(|r| r.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), RULES.len());
    }

    #[test]
    fn test_rule_pairs() {
        let cases = [
            ("dequote", "\"Sacramento\"", "Sacramento"),
            ("slash-at", "I80 / Madison Ave", "I80 at Madison Ave"),
            ("slash-at", "A / B / C", "A at B / C"),
            ("repeated-at", "Us50 E at US50 E Howe Ave", "Us50 E at Howe Ave"),
            ("repeated-at", "I80 E at Madison Ave", "I80 E at Madison Ave"),
            ("jno", "I5 JNO Richards Blvd", "I5 just north of Richards Blvd"),
            ("jso", "I5 jso Pocket Rd", "I5 just south of Pocket Rd"),
            ("jeo", "I80 JEO Watt", "I80 just east of Watt"),
            ("jwo", "Us50 JWO Zinfandel", "Us50 just west of Zinfandel"),
            ("north-bound", "I5 NB", "I5 north bound"),
            ("north-bound", "I5 N at N St", "I5 north bound at N St"),
            ("south-bound", "I5 SB", "I5 south bound"),
            ("east-bound", "I80 eb", "I80 east bound"),
            ("west-bound", "Us50 W", "Us50 west bound"),
            ("offramp", "OFR and ofr", "offramp and offramp"),
            ("onramp", "Watt Ave ONR", "Watt Ave onramp"),
            ("connector", "CON to CON", "connector to CON"),
            ("at", "Main AT Elm AT Oak", "Main at Elm AT Oak"),
            ("on", "Debris ON Rdwy", "Debris on Rdwy"),
            ("to", "Watt TO Madison", "Watt to Madison"),
            ("sr51", "SR51 at Marconi", "CAP CITY FWY at Marconi"),
            ("trfc", "Trfc Hazard", "Traffic Hazard"),
            ("inj", "Collision-Inj", "Collision-Injury"),
            ("enrt", "1141 Enrt", "1141 Enroute"),
            ("veh", "1 Veh vs veh", "1 Vehicle vs Vehicle"),
            ("veh", "2 Vehs", "2 Vehs"),
            ("vehs", "2 Vehs", "2 Vehicles"),
            ("unk", "Unk Inj", "Unknown Inj"),
            ("unk", "Unkn Inj", "Unknown Inj"),
            ("1141", "1141 Enroute", "Ambulance Enroute"),
            ("rp", "RP ADVSD", "reporting party ADVSD"),
            ("tc", "TC ON RHS", "collision ON RHS"),
            ("rhs", "VEH ON RHS", "VEH ON right hand side"),
            ("lhs", "VEH ON LHS", "VEH ON left hand side"),
            ("mdl", "MDL LN AND MDL DIVIDER", "middle LN AND middle DIVIDER"),
            ("rdwy", "IN RDWY", "IN roadway"),
            ("invld", "2 VEHS INVLD", "2 VEHS involved"),
            ("ct", "CT ENRT, ct 10-97", "CalTrans ENRT, CalTrans 10-97"),
            ("fire-report", "FIRE-Report of", "Report of Fire"),
            ("fire-report", "FIRE-Report of Smoke", "FIRE-Report of Smoke"),
            ("collision-dash", "Collision-No Injury", "Collision - No Injury"),
            ("traffic-collision", "Traffic Collision - Injury", "Collision - Injury"),
            ("double-slash", "BLK SUV // 2 LANES", "BLK SUV.  2 LANES"),
            ("phone", "CALL 916-555-1212", "CALL 916-***-****"),
            ("tags", "[2] [14] RP ADVSD", "RP ADVSD"),
            ("tags", "RP ADVSD [2]", "RP ADVSD [2]"),
            ("leading-zero", "0 SB Florin", "SB Florin"),
        ];

        for (name, input, expected) in cases {
            assert_eq!(rule_output(name, input), expected, "rule {name} on {input:?}");
        }
    }

    #[test]
    fn test_unknown_rule_name() {
        assert!(apply_rule("no-such-rule", "text").is_none());
    }

    #[test]
    fn test_no_match_is_noop() {
        assert_eq!(normalize("Sacramento"), "Sacramento");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_log_type_example() {
        let text = normalize("1183-Trfc Collision-Inj");
        assert_eq!(text, "1183-Collision - Injury");
        assert!(text.ends_with("Collision - Injury"));
    }

    #[test]
    fn test_location_example() {
        let text = normalize("HWY 50 NB JNO SR51");
        assert!(text.contains("north bound"));
        assert!(text.contains("just north of"));
        assert!(text.contains("CAP CITY FWY"));
        assert_eq!(text, "HWY 50 north bound just north of CAP CITY FWY");
    }

    #[test]
    fn test_phone_redaction_keeps_first_group() {
        assert_eq!(normalize("(916) 555-123-4567"), "(916) 555-***-****");
        assert!(normalize("RP 916-123-4567").ends_with("916-***-****"));
    }

    #[test]
    fn test_quoted_intersection() {
        assert_eq!(
            normalize("\"Us50 E / Us50 E Howe Ave OFR\""),
            "Us50 east bound at Howe Ave offramp"
        );
    }

    #[test]
    fn test_order_matters() {
        // "Trfc" is expanded before the "Traffic Collision" collapse runs.
        assert_eq!(normalize("Trfc Collision-Inj"), "Collision - Injury");
        // Bracketed tags are stripped after the glossary ran over them.
        assert_eq!(normalize("[3] RP ADVSD"), "reporting party ADVSD");
    }

    #[test]
    fn test_matching_is_ascii_only() {
        // U+017F folds to "s" under Unicode case-insensitivity.
        assert_eq!(rule_output("south-bound", "I5 \u{17f}"), "I5 \u{17f}");
        assert_eq!(rule_output("south-bound", "I5 S"), "I5 south bound");
        // Non-ASCII letters are not word characters, so they end a word.
        assert_eq!(rule_output("rp", "éRP ADVSD"), "éreporting party ADVSD");
    }

    #[test]
    fn test_dequote_uses_the_table_pattern() {
        for raw in ["\"Sacramento\"", "\"", "no quotes", "\"\"x\"\""] {
            assert_eq!(dequote(raw), rule_output("dequote", raw));
        }
    }

    #[test]
    fn test_dequote() {
        assert_eq!(dequote("\"Mar 15 2011  2:35PM\""), "Mar 15 2011  2:35PM");
        assert_eq!(dequote("plain"), "plain");
        assert_eq!(dequote("\"\""), "");
    }
}
