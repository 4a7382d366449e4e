use std::collections::HashMap;

use stockroom_catalog::{Movement, NewMovement};
use stockroom_core::ProductId;

/// Append-only stock ledger.
///
/// Entries are never modified or removed. `sequence` numbers start at 1 and
/// increase by one per append across all products.
#[derive(Debug, Default, Clone)]
pub struct Ledger {
    entries: Vec<Movement>,
    by_product: HashMap<ProductId, Vec<usize>>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append a movement, assigning the next ledger sequence.
    pub fn append(&mut self, movement: NewMovement) -> Movement {
        let sequence = self.entries.len() as u64 + 1;
        let stored = movement.into_stored(sequence);
        self.by_product
            .entry(stored.product_id)
            .or_default()
            .push(self.entries.len());
        self.entries.push(stored.clone());
        stored
    }

    /// Movements of one product, newest first.
    pub fn for_product(&self, product_id: ProductId) -> Vec<Movement> {
        let mut out: Vec<Movement> = self
            .by_product
            .get(&product_id)
            .map(|idxs| idxs.iter().map(|&i| self.entries[i].clone()).collect())
            .unwrap_or_default();
        newest_first(&mut out);
        out
    }

    /// Every movement, newest first.
    pub fn all(&self) -> Vec<Movement> {
        let mut out = self.entries.clone();
        newest_first(&mut out);
        out
    }
}

pub(crate) fn newest_first(movements: &mut [Movement]) {
    movements.sort_by(|a, b| b.history_key().cmp(&a.history_key()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};
    use stockroom_catalog::MovementType;
    use stockroom_core::MovementId;

    fn movement(product_id: ProductId, quantity: i64, created_at: DateTime<Utc>) -> NewMovement {
        NewMovement {
            id: MovementId::new(),
            product_id,
            movement_type: MovementType::StockIn,
            quantity,
            notes: String::new(),
            created_at,
        }
    }

    #[test]
    fn append_assigns_increasing_sequences() {
        let mut ledger = Ledger::new();
        let now = Utc::now();
        let a = ledger.append(movement(ProductId::new(), 1, now));
        let b = ledger.append(movement(ProductId::new(), 2, now));
        assert_eq!(a.sequence, 1);
        assert_eq!(b.sequence, 2);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn for_product_filters_and_orders_newest_first() {
        let mut ledger = Ledger::new();
        let p1 = ProductId::new();
        let p2 = ProductId::new();
        let now = Utc::now();

        ledger.append(movement(p1, 1, now));
        ledger.append(movement(p2, 2, now));
        ledger.append(movement(p1, 3, now + Duration::seconds(5)));
        // Same timestamp as the first entry: sequence breaks the tie.
        ledger.append(movement(p1, 4, now));

        let history: Vec<i64> = ledger.for_product(p1).iter().map(|m| m.quantity).collect();
        assert_eq!(history, vec![3, 4, 1]);
        assert!(ledger.for_product(ProductId::new()).is_empty());
    }

    #[test]
    fn all_is_newest_first_even_when_appended_out_of_time_order() {
        let mut ledger = Ledger::new();
        let p = ProductId::new();
        let now = Utc::now();

        ledger.append(movement(p, 1, now + Duration::seconds(10)));
        ledger.append(movement(p, 2, now));

        let all: Vec<i64> = ledger.all().iter().map(|m| m.quantity).collect();
        assert_eq!(all, vec![1, 2]);
    }
}
