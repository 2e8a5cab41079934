//! Recipient lookup with cancel-on-supersede.
//!
//! Every query gets a [`SearchTicket`]. Starting a new query invalidates the
//! previous ticket, so a slow answer to an old query can never overwrite the
//! results of a newer one.

use dispas_core::Address;

use crate::collaborators::{Profile, ProfileResolver};
use crate::error::ResolveError;

/// Proof that a lookup was started for a given generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTicket {
    generation: u64,
    query: String,
}

impl SearchTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn query(&self) -> &str {
        &self.query
    }
}

#[derive(Debug, Default)]
pub struct ProfileSearch {
    generation: u64,
    query: String,
    results: Vec<Profile>,
    searching: bool,
}

impl ProfileSearch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a lookup for `query`, superseding any outstanding one.
    ///
    /// An empty query clears the results and returns `None`: there is nothing
    /// to look up.
    pub fn begin(&mut self, query: &str) -> Option<SearchTicket> {
        self.generation += 1;
        self.query = query.trim().to_string();
        self.results.clear();

        if self.query.is_empty() {
            self.searching = false;
            return None;
        }

        self.searching = true;
        Some(SearchTicket {
            generation: self.generation,
            query: self.query.clone(),
        })
    }

    /// Apply the answer for `ticket`. Returns `false` if the ticket was superseded.
    pub fn complete(
        &mut self,
        ticket: &SearchTicket,
        outcome: Result<Vec<Profile>, ResolveError>,
    ) -> bool {
        if ticket.generation != self.generation {
            tracing::debug!(
                ticket = ticket.generation,
                current = self.generation,
                "discarding stale profile results"
            );
            return false;
        }

        self.searching = false;
        self.results = match outcome {
            Ok(profiles) => profiles,
            Err(err) => {
                tracing::warn!(query = %ticket.query, error = %err, "profile search failed");
                Vec::new()
            }
        };
        true
    }

    /// Synchronous begin + resolve + complete.
    pub fn run<R: ProfileResolver>(&mut self, resolver: &R, query: &str) -> &[Profile] {
        if let Some(ticket) = self.begin(query) {
            let outcome = resolver.search(ticket.query());
            self.complete(&ticket, outcome);
        }
        &self.results
    }

    pub fn results(&self) -> &[Profile] {
        &self.results
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn is_searching(&self) -> bool {
        self.searching
    }

    /// The address the current query resolves to: the only result, or the query
    /// itself when it is a literal address.
    pub fn pick(&self) -> Option<Address> {
        match self.results.as_slice() {
            [only] => Some(only.address),
            _ => self.query.parse().ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        let mut bytes = [0u8; 20];
        bytes[19] = n;
        Address::from_bytes(bytes)
    }

    fn profile(n: u8, name: &str) -> Profile {
        Profile {
            address: addr(n),
            display_name: Some(name.to_string()),
        }
    }

    struct Directory(Vec<Profile>);

    impl ProfileResolver for Directory {
        fn search(&self, query: &str) -> Result<Vec<Profile>, ResolveError> {
            if query == "boom" {
                return Err(ResolveError::Failed("index offline".into()));
            }
            Ok(self
                .0
                .iter()
                .filter(|p| p.display_name.as_deref().is_some_and(|n| n.starts_with(query)))
                .cloned()
                .collect())
        }
    }

    #[test]
    fn newer_query_supersedes_older_one() {
        let mut search = ProfileSearch::new();
        let first = search.begin("al").unwrap();
        let second = search.begin("alice").unwrap();

        assert!(!search.complete(&first, Ok(vec![profile(1, "al"), profile(2, "alice")])));
        assert!(search.results().is_empty());
        assert!(search.is_searching());

        assert!(search.complete(&second, Ok(vec![profile(2, "alice")])));
        assert_eq!(search.results().len(), 1);
        assert!(!search.is_searching());
        assert_eq!(search.pick(), Some(addr(2)));
    }

    #[test]
    fn empty_query_clears_without_lookup() {
        let mut search = ProfileSearch::new();
        let dir = Directory(vec![profile(1, "bob")]);
        assert_eq!(search.run(&dir, "bo").len(), 1);

        assert!(search.begin("   ").is_none());
        assert!(search.results().is_empty());
        assert!(!search.is_searching());
    }

    #[test]
    fn literal_address_is_picked_without_results() {
        let mut search = ProfileSearch::new();
        let dir = Directory(Vec::new());
        let literal = addr(9).to_string();
        assert!(search.run(&dir, &literal).is_empty());
        assert_eq!(search.pick(), Some(addr(9)));
    }

    #[test]
    fn ambiguous_or_failed_lookups_pick_nothing() {
        let mut search = ProfileSearch::new();
        let dir = Directory(vec![profile(1, "carol"), profile(2, "carl")]);
        assert_eq!(search.run(&dir, "car").len(), 2);
        assert_eq!(search.pick(), None);

        assert!(search.run(&dir, "boom").is_empty());
        assert!(!search.is_searching());
        assert_eq!(search.pick(), None);
    }
}
