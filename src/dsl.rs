use std::fmt;

pub const NAME_FIELD: &str = "name";
pub const CHAIN_ID_FIELD: &str = "chainId";
pub const TYPE_FIELD: &str = "type";
pub const SELECTOR_FIELD: &str = "selector";
pub const ADDRESS_FIELD: &str = "address";
pub const TIMESTAMP_FIELD: &str = "timestamp";

/// A single RediSearch clause. Values are emitted as given; callers validate
/// input before it reaches the composer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    /// `@field:*term*`
    Wildcard { field: String, term: String },
    /// `@field:%term%`, one edit of slack.
    Fuzzy { field: String, term: String },
    /// `@field:"value"`
    Phrase { field: String, value: String },
    /// `@field:{a|b|c}`
    Tags { field: String, values: Vec<String> },
    Or(Vec<Clause>),
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Clause::Wildcard { field, term } => write!(f, "@{}:*{}*", field, term),
            Clause::Fuzzy { field, term } => write!(f, "@{}:%{}%", field, term),
            Clause::Phrase { field, value } => write!(f, "@{}:\"{}\"", field, value),
            Clause::Tags { field, values } => write!(f, "@{}:{{{}}}", field, values.join("|")),
            Clause::Or(clauses) => {
                write!(f, "(")?;
                for (i, clause) in clauses.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{}", clause)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Top-level clauses; renders as `*` when there are none.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    clauses: Vec<Clause>,
}

impl Query {
    pub fn match_all() -> Self {
        Self::default()
    }

    pub fn push(&mut self, clause: Clause) {
        self.clauses.push(clause);
    }

    /// Matches any of the given chain ids. A no-op for an empty list.
    pub fn with_chain_ids(mut self, chain_ids: &[u64]) -> Self {
        if !chain_ids.is_empty() {
            self.push(Clause::Tags {
                field: CHAIN_ID_FIELD.to_string(),
                values: chain_ids.iter().map(|id| id.to_string()).collect(),
            });
        }
        self
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.clauses.is_empty() {
            return write!(f, "*");
        }
        for (i, clause) in self.clauses.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", clause)?;
        }
        Ok(())
    }
}

/// Words of a free-text term, split on `-`.
pub fn name_words(text: &str) -> Vec<&str> {
    text.split('-')
        .map(str::trim)
        .filter(|word| !word.is_empty())
        .collect()
}

fn name_match_clause(text: &str) -> Option<Clause> {
    let words = name_words(text);
    if words.is_empty() {
        return None;
    }

    let clauses = words
        .into_iter()
        .flat_map(|word| {
            [
                Clause::Wildcard {
                    field: NAME_FIELD.to_string(),
                    term: word.to_string(),
                },
                Clause::Fuzzy {
                    field: NAME_FIELD.to_string(),
                    term: word.to_string(),
                },
            ]
        })
        .collect();

    Some(Clause::Or(clauses))
}

/// Package/tag search: fuzzy name match plus an optional chain filter.
pub fn compose_package_query(text: Option<&str>, chain_ids: &[u64]) -> Query {
    let mut query = Query::match_all();
    if let Some(clause) = text.and_then(name_match_clause) {
        query.push(clause);
    }
    query.with_chain_ids(chain_ids)
}

/// Exact package name. The text index tokenizes on `-`, so hits still need an
/// equality check by the caller.
pub fn compose_name_query(name: &str, chain_ids: &[u64]) -> Query {
    let mut query = Query::match_all();
    query.push(Clause::Phrase {
        field: NAME_FIELD.to_string(),
        value: name.to_string(),
    });
    query.with_chain_ids(chain_ids)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbiTerm<'a> {
    Selector(&'a str),
    Address(&'a str),
    Name(&'a str),
}

/// Selectors are 4-byte (functions, errors) or 32-byte (event topics) hex.
pub fn classify_abi_term(term: &str) -> AbiTerm<'_> {
    let term = term.trim();
    match hex_len(term) {
        Some(8) | Some(64) => AbiTerm::Selector(term),
        Some(40) => AbiTerm::Address(term),
        _ => AbiTerm::Name(term),
    }
}

/// Number of hex digits after a `0x` prefix, if `value` is `0x`-prefixed hex.
pub fn hex_len(value: &str) -> Option<usize> {
    let digits = value.strip_prefix("0x")?;
    (!digits.is_empty() && digits.chars().all(|ch| ch.is_ascii_hexdigit()))
        .then_some(digits.len())
}

/// ABI index search restricted to the given record kinds.
pub fn compose_abi_query(term: Option<&str>, kinds: &[&str], chain_ids: &[u64]) -> Query {
    let mut query = Query::match_all();
    match term.map(classify_abi_term) {
        Some(AbiTerm::Selector(selector)) => query.push(Clause::Tags {
            field: SELECTOR_FIELD.to_string(),
            values: vec![selector.to_string()],
        }),
        Some(AbiTerm::Address(address)) => query.push(Clause::Tags {
            field: ADDRESS_FIELD.to_string(),
            values: vec![address.to_string()],
        }),
        Some(AbiTerm::Name(name)) => {
            if let Some(clause) = name_match_clause(name) {
                query.push(clause);
            }
        }
        None => {}
    }
    if !kinds.is_empty() {
        query.push(Clause::Tags {
            field: TYPE_FIELD.to_string(),
            values: kinds.iter().map(|kind| kind.to_string()).collect(),
        });
    }
    query.with_chain_ids(chain_ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_input_matches_everything() {
        assert_eq!(compose_package_query(None, &[]).to_string(), "*");
        assert_eq!(compose_package_query(Some(""), &[]).to_string(), "*");
        assert_eq!(compose_package_query(Some("--"), &[]).to_string(), "*");
    }

    #[test]
    fn splits_words_on_dash() {
        let query = compose_package_query(Some("token-vault"), &[]).to_string();
        assert_eq!(
            query,
            "(@name:*token* | @name:%token% | @name:*vault* | @name:%vault%)"
        );
    }

    #[test]
    fn chain_filter_only() {
        let query = compose_package_query(None, &[1, 10]).to_string();
        assert_eq!(query, "@chainId:{1|10}");
    }

    #[test]
    fn joins_top_level_clauses_with_comma() {
        let query = compose_package_query(Some("vault"), &[13370]).to_string();
        assert_eq!(query, "(@name:*vault* | @name:%vault%), @chainId:{13370}");
    }

    #[test]
    fn exact_name_is_a_phrase() {
        let query = compose_name_query("token-vault", &[]).to_string();
        assert_eq!(query, "@name:\"token-vault\"");
    }

    #[test]
    fn classifies_abi_terms_by_shape() {
        assert_eq!(classify_abi_term("0xa9059cbb"), AbiTerm::Selector("0xa9059cbb"));
        let topic = format!("0x{}", "ab".repeat(32));
        assert_eq!(classify_abi_term(&topic), AbiTerm::Selector(topic.as_str()));
        let address = format!("0x{}", "12".repeat(20));
        assert_eq!(classify_abi_term(&address), AbiTerm::Address(address.as_str()));
        assert_eq!(classify_abi_term("transfer"), AbiTerm::Name("transfer"));
        assert_eq!(classify_abi_term("0xnothex1"), AbiTerm::Name("0xnothex1"));
    }

    #[test]
    fn abi_selector_query_filters_kinds_and_chains() {
        let query = compose_abi_query(Some("0xa9059cbb"), &["function", "error"], &[1]);
        assert_eq!(
            query.to_string(),
            "@selector:{0xa9059cbb}, @type:{function|error}, @chainId:{1}"
        );
    }

    #[test]
    fn abi_name_query_uses_name_clauses() {
        let query = compose_abi_query(Some("transfer"), &["contract"], &[]);
        assert_eq!(
            query.to_string(),
            "(@name:*transfer* | @name:%transfer%), @type:{contract}"
        );
    }
}
