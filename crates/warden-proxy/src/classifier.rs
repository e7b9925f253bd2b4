//! Statement classification.
//!
//! A [`RuleSet`] is an ordered table of lexical patterns for mutating
//! operations. Statement text is trimmed and upper-cased before matching, and
//! the first matching rule marks the statement dangerous. Matching runs over
//! the raw normalized text, so a dangerous keyword anywhere in a
//! multi-statement string or inside a comment still triggers interception.

use regex::Regex;

/// Outcome of classifying one statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Forwarded to the backend unchanged.
    Safe,
    /// Withheld until an administrator approves it.
    Dangerous,
}

impl Classification {
    /// Check if the statement must be held for approval.
    pub fn is_dangerous(self) -> bool {
        matches!(self, Classification::Dangerous)
    }
}

/// A named pattern in the rule table.
#[derive(Debug, Clone)]
pub struct ClassificationRule {
    /// Short name used in logs.
    pub name: String,
    /// Pattern tested against the normalized statement.
    pub pattern: Regex,
}

/// Built-in rules, in evaluation order.
const BUILTIN_RULES: &[(&str, &str)] = &[
    ("delete", r"DELETE\s+FROM"),
    ("drop_table", r"DROP\s+TABLE"),
    ("drop_database", r"DROP\s+DATABASE"),
    ("truncate", r"TRUNCATE"),
    ("update", r"(?s)UPDATE.*SET"),
    ("insert", r"INSERT\s+INTO"),
    ("alter_table", r"ALTER\s+TABLE"),
    ("create_table", r"CREATE\s+TABLE"),
    ("create_database", r"CREATE\s+DATABASE"),
    ("create_index", r"CREATE\s+INDEX"),
    ("drop_index", r"DROP\s+INDEX"),
];

/// Ordered, swappable classification rule table.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<ClassificationRule>,
}

impl RuleSet {
    /// The built-in rule table.
    pub fn builtin() -> Self {
        let rules = BUILTIN_RULES
            .iter()
            .map(|(name, pattern)| ClassificationRule {
                name: (*name).to_string(),
                pattern: Regex::new(pattern).expect("built-in classification rule is valid"),
            })
            .collect();
        Self { rules }
    }

    /// Build a rule table from raw patterns, named `custom_<n>`.
    pub fn from_patterns<I, S>(patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rules = patterns
            .into_iter()
            .enumerate()
            .map(|(i, pattern)| {
                Ok(ClassificationRule {
                    name: format!("custom_{}", i + 1),
                    pattern: Regex::new(pattern.as_ref())?,
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(Self { rules })
    }

    /// Append extra patterns after the current rules.
    ///
    /// Patterns are matched against upper-cased text, so they should be
    /// written in upper case.
    pub fn with_extra_patterns<I, S>(mut self, patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extra = Self::from_patterns(patterns)?;
        self.rules.extend(extra.rules);
        Ok(self)
    }

    /// The first rule matching the statement, if any.
    pub fn matching_rule(&self, query: &str) -> Option<&ClassificationRule> {
        let normalized = query.trim().to_uppercase();
        self.rules
            .iter()
            .find(|rule| rule.pattern.is_match(&normalized))
    }

    /// Classify a statement.
    pub fn classify(&self, query: &str) -> Classification {
        match self.matching_rule(query) {
            Some(_) => Classification::Dangerous,
            None => Classification::Safe,
        }
    }

    /// The rules in evaluation order.
    pub fn rules(&self) -> &[ClassificationRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::builtin()
    }
}
