//! Reconciles overlapping tape declarations into a disjoint layout.
//!
//! Entries are applied in declaration order. Each new entry cuts the part it covers out
//! of every entry accumulated so far: an older entry is dropped when fully covered,
//! trimmed when covered on one side, or split in two when the new entry falls strictly
//! inside it. Trimmed pieces advance their rotation shift so that the symbols they keep
//! do not move.
//!
//! Alongside the disjoint layout, the infinite entries are also tracked as cut by newer
//! infinite entries only. Finite entries lie on top of these, which is what the tape
//! needs for its boundary patterns.

use tracing::trace;

use crate::types::{Extent, TapeEntry};

/// The resolved, disjoint set of tape declarations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layout {
    /// Entries sorted by position. At most one is left-infinite (and it comes first), at
    /// most one is right-infinite (and it comes last).
    entries: Vec<TapeEntry>,
    /// Infinite entries cut by newer infinite entries only. At most one per side.
    backdrop: Vec<TapeEntry>,
}

impl Layout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies `entry` on top of the current layout.
    pub fn insert(&mut self, entry: TapeEntry) {
        let cut = entry.extent;
        let mut entries = Vec::with_capacity(self.entries.len() + 2);

        for old in self.entries.drain(..) {
            let (left, right) = subtract(&old, &cut);
            if left.is_some() && right.is_some() {
                trace!(old = ?old.extent, new = ?cut, "tape entry split");
            }
            entries.extend(left);
            entries.extend(right);
        }

        if !matches!(cut, Extent::Finite { .. }) {
            let mut backdrop: Vec<TapeEntry> = self
                .backdrop
                .drain(..)
                .flat_map(|old| {
                    let (left, right) = subtract(&old, &cut);
                    left.into_iter().chain(right)
                })
                .filter(|piece| !matches!(piece.extent, Extent::Finite { .. }))
                .collect();
            backdrop.push(entry.clone());
            self.backdrop = backdrop;
        }

        entries.push(entry);
        entries.sort_by_key(|entry| sort_key(&entry.extent));
        self.entries = entries;
    }

    pub fn entries(&self) -> &[TapeEntry] {
        &self.entries
    }

    /// The left-infinite entry, if any.
    pub fn left(&self) -> Option<&TapeEntry> {
        self.entries
            .first()
            .filter(|entry| matches!(entry.extent, Extent::LeftInfinite { .. }))
    }

    /// The right-infinite entry, if any.
    pub fn right(&self) -> Option<&TapeEntry> {
        self.entries
            .last()
            .filter(|entry| matches!(entry.extent, Extent::RightInfinite { .. }))
    }

    /// The left- and right-infinite patterns underneath the finite entries.
    ///
    /// Unlike [`Layout::left`] and [`Layout::right`], these are not cut by finite entries.
    pub fn boundaries(&self) -> (Option<&TapeEntry>, Option<&TapeEntry>) {
        let side = |left: bool| {
            self.backdrop.iter().find(|entry| {
                matches!(entry.extent, Extent::LeftInfinite { .. }) == left
            })
        };
        (side(true), side(false))
    }

    /// The entries with both bounds finite.
    pub fn finite(&self) -> impl Iterator<Item = &TapeEntry> {
        self.entries
            .iter()
            .filter(|entry| matches!(entry.extent, Extent::Finite { .. }))
    }

    /// The declared symbol at `pos`; `None` means blank.
    pub fn symbol_at(&self, pos: i64) -> Option<&str> {
        self.entries.iter().find_map(|entry| entry.symbol_at(pos))
    }
}

/// Resolves `entries`, given in declaration order, into a disjoint layout.
pub fn resolve<I>(entries: I) -> Layout
where
    I: IntoIterator<Item = TapeEntry>,
{
    let mut layout = Layout::new();
    for entry in entries {
        layout.insert(entry);
    }
    layout
}

/// The parts of `old` left of and right of `cut`.
fn subtract(old: &TapeEntry, cut: &Extent) -> (Option<TapeEntry>, Option<TapeEntry>) {
    let (start, end) = (old.extent.start(), old.extent.end());

    let left = cut
        .start()
        .and_then(|cut_start| cut_start.checked_sub(1))
        .and_then(|limit| {
            let end = end.map_or(limit, |end| end.min(limit));
            Extent::from_bounds(start, Some(end))
        });
    let right = cut
        .end()
        .and_then(|cut_end| cut_end.checked_add(1))
        .and_then(|limit| {
            let start = start.map_or(limit, |start| start.max(limit));
            Extent::from_bounds(Some(start), end)
        });

    (
        left.map(|extent| old.rebased(extent)),
        right.map(|extent| old.rebased(extent)),
    )
}

fn sort_key(extent: &Extent) -> (i64, i64) {
    match *extent {
        Extent::LeftInfinite { end } => (i64::MIN, end),
        Extent::Finite { start, end } => (start, end),
        Extent::RightInfinite { start } => (start, i64::MAX),
    }
}
