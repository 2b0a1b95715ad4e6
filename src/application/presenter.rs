//! Random quote selection and "last shown" tracking.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::Quote;

use super::persistence::Persistence;
use super::quote_store::QuoteStore;

/// Draws allowed when trying to avoid repeating the previous quote.
pub const MAX_PICK_ATTEMPTS: usize = 6;

/// What the display surface should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuoteView {
    /// A quote and its position in the store.
    Quote { index: usize, quote: Quote },
    /// The selected category has no quotes.
    EmptyCategory(String),
    /// The store is empty.
    EmptyStore,
    /// A specific index was requested but does not exist.
    NotFound,
}

impl QuoteView {
    #[must_use]
    pub const fn quote(&self) -> Option<&Quote> {
        match self {
            Self::Quote { quote, .. } => Some(quote),
            _ => None,
        }
    }
}

/// Picks quotes to show.
pub struct Presenter<R: Rng = StdRng> {
    rng: R,
}

impl Presenter {
    /// Presenter seeded from the OS.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }
}

impl<R: Rng> Presenter<R> {
    pub const fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Choose one of `candidates` uniformly at random.
    ///
    /// With more than one candidate, redraws up to [`MAX_PICK_ATTEMPTS`]
    /// times to avoid `last`, then accepts a repeat.
    pub fn pick(&mut self, candidates: &[usize], last: Option<usize>) -> Option<usize> {
        match candidates {
            [] => None,
            [only] => Some(*only),
            _ => {
                let mut choice = candidates[self.rng.gen_range(0..candidates.len())];
                let mut attempts = 1;
                while Some(choice) == last && attempts < MAX_PICK_ATTEMPTS {
                    choice = candidates[self.rng.gen_range(0..candidates.len())];
                    attempts += 1;
                }
                Some(choice)
            }
        }
    }

    /// Pick from `candidates` and record the result as last shown.
    ///
    /// `candidates` must be indices into `store`.
    pub fn show(
        &mut self,
        store: &QuoteStore,
        persistence: &Persistence,
        candidates: &[usize],
    ) -> QuoteView {
        if store.is_empty() {
            persistence.clear_last_shown();
            return QuoteView::EmptyStore;
        }

        let last = persistence.load_last_shown();
        match self.pick(candidates, last) {
            Some(index) => show_index(store, persistence, index),
            None => QuoteView::EmptyStore,
        }
    }
}

/// Show the quote at `index` and record it as last shown.
pub fn show_index(store: &QuoteStore, persistence: &Persistence, index: usize) -> QuoteView {
    let Some(quote) = store.get(index) else {
        return QuoteView::NotFound;
    };

    persistence.save_last_shown(index);
    tracing::debug!(index, category = %quote.category, "Showing quote");

    QuoteView::Quote {
        index,
        quote: quote.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::KvStore;

    fn seeded_presenter(seed: u64) -> Presenter<StdRng> {
        Presenter::with_rng(StdRng::seed_from_u64(seed))
    }

    fn persistence() -> Persistence {
        Persistence::new(KvStore::in_memory().unwrap(), KvStore::in_memory().unwrap())
    }

    #[test]
    fn test_pick_empty_and_single() {
        let mut presenter = seeded_presenter(1);
        assert_eq!(presenter.pick(&[], None), None);
        assert_eq!(presenter.pick(&[4], Some(4)), Some(4));
    }

    #[test]
    fn test_pick_avoids_last_when_possible() {
        let mut presenter = seeded_presenter(7);
        // A repeat needs six straight draws of the previous index.
        let repeats = (0..200)
            .filter(|_| presenter.pick(&[0, 1], Some(0)) == Some(0))
            .count();
        assert!(repeats < 20, "too many repeats: {repeats}");
    }

    #[test]
    fn test_pick_stays_within_candidates() {
        let mut presenter = seeded_presenter(3);
        for _ in 0..100 {
            let choice = presenter.pick(&[2, 5, 9], Some(5)).unwrap();
            assert!([2, 5, 9].contains(&choice));
        }
    }

    #[test]
    fn test_show_records_last_shown() {
        let store = QuoteStore::seeded();
        let p = persistence();
        let mut presenter = seeded_presenter(11);

        let view = presenter.show(&store, &p, &[1]);
        assert_eq!(
            view,
            QuoteView::Quote {
                index: 1,
                quote: store.get(1).unwrap().clone()
            }
        );
        assert_eq!(p.load_last_shown(), Some(1));
    }

    #[test]
    fn test_show_empty_store_clears_last_shown() {
        let p = persistence();
        p.save_last_shown(0);
        let mut presenter = seeded_presenter(5);

        let view = presenter.show(&QuoteStore::default(), &p, &[]);
        assert_eq!(view, QuoteView::EmptyStore);
        assert_eq!(p.load_last_shown(), None);
    }

    #[test]
    fn test_show_index_out_of_range() {
        let p = persistence();
        assert_eq!(show_index(&QuoteStore::seeded(), &p, 99), QuoteView::NotFound);
        assert_eq!(p.load_last_shown(), None);
    }
}
