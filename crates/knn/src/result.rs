//! Output types for a matching run.

use std::collections::HashMap;
use std::hash::Hash;

/// One matched comparison-pool row.
#[derive(Debug, Clone, PartialEq)]
pub struct Match<Id> {
    /// Comparison-pool identifier.
    pub id: Id,
    /// Row index in the comparison pool.
    pub row: usize,
    /// Distance to the treatment row.
    pub distance: f64,
}

/// The matches of one treatment row, nearest first.
#[derive(Debug, Clone, PartialEq)]
pub struct TreatmentMatches<Id> {
    /// Treatment identifier.
    pub id: Id,
    /// Row index in the treatment matrix.
    pub row: usize,
    /// Up to K matches with non-decreasing distance.
    pub matches: Vec<Match<Id>>,
}

impl<Id> TreatmentMatches<Id> {
    /// Distances of the matches, nearest first.
    pub fn distances(&self) -> impl Iterator<Item = f64> + '_ {
        self.matches.iter().map(|m| m.distance)
    }

    /// Comparison identifiers of the matches, nearest first.
    pub fn ids(&self) -> impl Iterator<Item = &Id> + '_ {
        self.matches.iter().map(|m| &m.id)
    }
}

/// Result of a matching run: one entry per treatment row, in row order.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult<Id> {
    rows: Vec<TreatmentMatches<Id>>,
}

impl<Id> MatchResult<Id> {
    /// Creates a new `MatchResult`.
    pub(crate) fn new(rows: Vec<TreatmentMatches<Id>>) -> Self {
        Self { rows }
    }

    /// Number of treatment rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if there are no treatment rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterates treatment rows in input order.
    pub fn iter(&self) -> std::slice::Iter<'_, TreatmentMatches<Id>> {
        self.rows.iter()
    }

    /// Total number of matches across all treatment rows.
    pub fn n_matches(&self) -> usize {
        self.rows.iter().map(|r| r.matches.len()).sum()
    }

    /// Every matched distance, treatment row by treatment row.
    pub fn distances(&self) -> impl Iterator<Item = f64> + '_ {
        self.rows.iter().flat_map(|r| r.distances())
    }

    /// Matches of the first treatment row with identifier `id`.
    pub fn get(&self, id: &Id) -> Option<&[Match<Id>]>
    where
        Id: PartialEq,
    {
        self.rows
            .iter()
            .find(|r| &r.id == id)
            .map(|r| r.matches.as_slice())
    }

    /// Converts into a map keyed by treatment identifier.
    ///
    /// If treatment identifiers repeat, the later row wins.
    pub fn into_map(self) -> HashMap<Id, Vec<Match<Id>>>
    where
        Id: Hash + Eq,
    {
        self.rows.into_iter().map(|r| (r.id, r.matches)).collect()
    }
}

impl<Id> IntoIterator for MatchResult<Id> {
    type Item = TreatmentMatches<Id>;
    type IntoIter = std::vec::IntoIter<TreatmentMatches<Id>>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a, Id> IntoIterator for &'a MatchResult<Id> {
    type Item = &'a TreatmentMatches<Id>;
    type IntoIter = std::slice::Iter<'a, TreatmentMatches<Id>>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
