/// One vocabulary-bridging rule: if any trigger substring appears in the
/// lowercased query, the boost phrase is appended.
#[derive(Debug, Clone, Copy)]
pub struct EnhancementRule {
    pub triggers: &'static [&'static str],
    pub boost: &'static str,
}

/// Ordered rule table bridging casual tax vocabulary to statutory phrasing.
/// More specific triggers sit above broader ones; first match wins.
const DEFAULT_RULES: &[EnhancementRule] = &[
    EnhancementRule {
        triggers: &["senior citizen", "senior citizens"],
        boost: "individual resident who is of the age of sixty years or more",
    },
    EnhancementRule {
        triggers: &["surcharge"],
        boost: "surcharge on income-tax rate",
    },
    EnhancementRule {
        triggers: &["cess"],
        boost: "health and education cess on income-tax",
    },
    EnhancementRule {
        triggers: &["tax bracket", "tax brackets", "slab"],
        boost: "income tax slab rates of tax",
    },
    EnhancementRule {
        triggers: &["rebate", "87a"],
        boost: "rebate of income-tax under section 87A",
    },
    EnhancementRule {
        triggers: &["tds", "withholding"],
        boost: "tax deducted at source rate",
    },
    EnhancementRule {
        triggers: &["deduction", "80c", "80d"],
        boost: "deduction in computing total income under chapter VI-A",
    },
    EnhancementRule {
        triggers: &["tax free", "tax-free", "exempt", "exemption"],
        boost: "income not included in total income exemption",
    },
    EnhancementRule {
        triggers: &["salary", "take home", "take-home"],
        boost: "income chargeable under the head salaries",
    },
];

/// Deterministic, rule-based query rewriting. Pure: no model calls, no I/O.
#[derive(Debug, Clone)]
pub struct QueryEnhancer {
    rules: &'static [EnhancementRule],
}

impl QueryEnhancer {
    pub fn new() -> Self {
        Self {
            rules: DEFAULT_RULES,
        }
    }

    pub fn with_rules(rules: &'static [EnhancementRule]) -> Self {
        Self { rules }
    }

    /// Appends the first matching rule's boost, or returns the query
    /// byte-identical when nothing matches. Exactly one rule fires.
    pub fn enhance(&self, query: &str) -> String {
        let lowered = query.to_lowercase();
        for rule in self.rules {
            if rule
                .triggers
                .iter()
                .any(|trigger| lowered.contains(trigger))
            {
                return format!("{query} {}", rule.boost);
            }
        }
        query.to_string()
    }
}

impl Default for QueryEnhancer {
    fn default() -> Self {
        Self::new()
    }
}
