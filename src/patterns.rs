use regex::Regex;

/// The static heuristic set: browser APIs that turn string data into code or
/// navigation, plus the access patterns that usually feed them.
pub const SINK_PATTERNS: &[(&str, &str)] = &[
    ("innerHTML assignment", r"(?i)innerHTML\s*="),
    ("outerHTML assignment", r"(?i)outerHTML\s*="),
    ("document.write call", r"(?i)document\.write\("),
    ("eval call", r"(?i)eval\("),
    ("setTimeout call", r"(?i)setTimeout\("),
    ("setInterval call", r"(?i)setInterval\("),
    ("location.href access", r"(?i)location\.href"),
    ("location.hash access", r"(?i)location\.hash"),
    ("location.search access", r"(?i)location\.search"),
    ("document.cookie access", r"(?i)document\.cookie"),
    ("localStorage access", r"(?i)localStorage"),
    ("sessionStorage access", r"(?i)sessionStorage"),
    ("javascript: URI in src attribute", r#"(?i)src\s*=\s*['"]javascript:"#),
    ("string concatenation into location", r"(?i)\+.*location"),
    (
        "dynamically bound event listener",
        r#"(?i)\.addEventListener\(['"].*['"],\s*function"#,
    ),
];

/// One heuristic: a label for reports and its compiled pattern.
pub struct Signature {
    label: &'static str,
    pattern: Regex,
}

/// A signature that matched somewhere in a script. Carries the whole script
/// body, not just the matched fragment, so reports show the full context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub label: &'static str,
    pub script: String,
}

pub struct SinkMatcher {
    signatures: Vec<Signature>,
}

impl SinkMatcher {
    pub fn new() -> Self {
        Self::with_patterns(SINK_PATTERNS)
    }

    pub fn with_patterns(patterns: &[(&'static str, &str)]) -> Self {
        let signatures = patterns
            .iter()
            .map(|(label, pattern)| Signature {
                label,
                pattern: Regex::new(pattern).expect("sink pattern must compile"),
            })
            .collect();
        SinkMatcher { signatures }
    }

    /// Tests a script body against every signature. No early exit: one script
    /// can yield several findings.
    pub fn scan(&self, script: &str) -> Vec<Finding> {
        self.signatures
            .iter()
            .filter(|sig| sig.pattern.is_match(script))
            .map(|sig| Finding {
                label: sig.label,
                script: script.to_string(),
            })
            .collect()
    }
}

impl Default for SinkMatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_signature_matches_its_fragment() {
        let matcher = SinkMatcher::new();
        let samples = [
            ("innerHTML assignment", "el.innerHTML = data"),
            ("outerHTML assignment", "node.outerHTML=html"),
            ("document.write call", "document.write(body)"),
            ("eval call", "eval(code)"),
            ("setTimeout call", "setTimeout(cb, 100)"),
            ("setInterval call", "setInterval(cb, 100)"),
            ("location.href access", "var u = location.href;"),
            ("location.hash access", "var h = location.hash;"),
            ("location.search access", "var q = location.search;"),
            ("document.cookie access", "document.cookie"),
            ("localStorage access", "localStorage.getItem('k')"),
            ("sessionStorage access", "sessionStorage.setItem('k', v)"),
            (
                "javascript: URI in src attribute",
                "frame.src = 'javascript:void(0)'",
            ),
            (
                "string concatenation into location",
                "var u = base + location;",
            ),
            (
                "dynamically bound event listener",
                "el.addEventListener('click', function(e) {})",
            ),
        ];

        for (label, snippet) in samples {
            let findings = matcher.scan(snippet);
            assert!(
                findings.iter().any(|f| f.label == label),
                "expected {:?} to match {:?}, got {:?}",
                label,
                snippet,
                findings.iter().map(|f| f.label).collect::<Vec<_>>()
            );
        }
    }

    #[test]
    fn clean_script_yields_no_findings() {
        let matcher = SinkMatcher::new();
        assert!(matcher.scan("console.log('hello world');").is_empty());
        assert!(matcher.scan("").is_empty());
    }

    #[test]
    fn cookie_access_yields_exactly_one_finding() {
        let matcher = SinkMatcher::new();
        let findings = matcher.scan("document.cookie");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].label, "document.cookie access");
        assert_eq!(findings[0].script, "document.cookie");
    }

    #[test]
    fn matching_is_case_insensitive() {
        let matcher = SinkMatcher::new();
        let findings = matcher.scan("EL.INNERHTML = X");
        assert!(findings.iter().any(|f| f.label == "innerHTML assignment"));
    }

    #[test]
    fn one_script_can_match_several_signatures() {
        let matcher = SinkMatcher::new();
        let script = "eval(document.cookie)";
        let labels: Vec<_> = matcher.scan(script).iter().map(|f| f.label).collect();
        assert_eq!(labels, vec!["eval call", "document.cookie access"]);
    }

    #[test]
    fn findings_carry_the_full_script_text() {
        let matcher = SinkMatcher::new();
        let script = "var x = 1;\nel.innerHTML = x;\nvar y = 2;";
        let findings = matcher.scan(script);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].script, script);
    }

    #[test]
    fn alternate_pattern_sets_are_supported() {
        let matcher = SinkMatcher::with_patterns(&[("fetch call", r"(?i)fetch\(")]);
        assert_eq!(matcher.scan("fetch('/api')").len(), 1);
        assert!(matcher.scan("eval(x)").is_empty());
    }
}
