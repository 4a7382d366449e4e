use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult, MovementId, ProductId};

use crate::product::Product;

pub const MAX_NOTES_CHARS: usize = 500;

/// Notes attached to the movement seeded at product creation.
pub const INITIAL_STOCK_NOTE: &str = "Initial stock";

/// Kind of stock movement (closed set).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementType {
    /// Receive `quantity` units (delta, > 0).
    StockIn,
    /// Remove `quantity` units (delta, > 0).
    StockOut,
    /// Set stock to exactly `quantity` units (absolute target, >= 0), not a delta.
    Adjustment,
}

impl MovementType {
    pub const ALL: [MovementType; 3] = [
        MovementType::StockIn,
        MovementType::StockOut,
        MovementType::Adjustment,
    ];

    /// External integer code of the movement type.
    pub fn code(self) -> i64 {
        match self {
            MovementType::StockIn => 1,
            MovementType::StockOut => 2,
            MovementType::Adjustment => 3,
        }
    }

    pub fn from_code(code: i64) -> DomainResult<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.code() == code)
            .ok_or_else(|| {
                DomainError::invalid_movement_type(format!(
                    "unknown movement type code {code} (expected 1=StockIn, 2=StockOut, 3=Adjustment)"
                ))
            })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MovementType::StockIn => "StockIn",
            MovementType::StockOut => "StockOut",
            MovementType::Adjustment => "Adjustment",
        }
    }

    /// Stock level after applying `quantity` to `current`, or `None` on overflow.
    pub fn resulting_stock(self, current: i64, quantity: i64) -> Option<i64> {
        match self {
            MovementType::StockIn => current.checked_add(quantity),
            MovementType::StockOut => current.checked_sub(quantity),
            MovementType::Adjustment => Some(quantity),
        }
    }

    fn is_delta(self) -> bool {
        !matches!(self, MovementType::Adjustment)
    }
}

impl core::fmt::Display for MovementType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementType {
    type Err = DomainError;

    /// Accepts the tag name (case-insensitive) or its integer code.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(code) = trimmed.parse::<i64>() {
            return Self::from_code(code);
        }
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| {
                DomainError::invalid_movement_type(format!(
                    "unknown movement type '{trimmed}' (expected StockIn, StockOut or Adjustment)"
                ))
            })
    }
}

/// A requested stock change, already parsed into a known movement type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovementRequest {
    pub movement_type: MovementType,
    pub quantity: i64,
    #[serde(default)]
    pub notes: String,
}

/// Movement ready to be appended to the ledger (no ledger position yet).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMovement {
    pub id: MovementId,
    pub product_id: ProductId,
    pub movement_type: MovementType,
    pub quantity: i64,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

impl NewMovement {
    pub fn into_stored(self, sequence: u64) -> Movement {
        Movement {
            id: self.id,
            product_id: self.product_id,
            movement_type: self.movement_type,
            quantity: self.quantity,
            notes: self.notes,
            created_at: self.created_at,
            sequence,
        }
    }
}

/// A ledger entry. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    pub id: MovementId,
    pub product_id: ProductId,
    pub movement_type: MovementType,
    /// Delta for `StockIn`/`StockOut`, absolute level for `Adjustment`.
    pub quantity: i64,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    /// Ledger position assigned by the store; breaks `created_at` ties.
    pub sequence: u64,
}

impl Movement {
    /// Total history order: oldest first.
    pub fn history_key(&self) -> (DateTime<Utc>, u64) {
        (self.created_at, self.sequence)
    }
}

/// Outcome of a successful plan: both halves must be committed together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMovement {
    pub product: Product,
    pub movement: NewMovement,
}

/// Decide the effect of a stock movement on a product (pure, no IO).
///
/// Checks, in order: the product is active, the quantity fits the movement
/// type, the notes fit, and the resulting stock is not negative. The returned
/// movement records the request as given, not the computed delta.
pub fn plan_movement(
    product: &Product,
    request: &StockMovementRequest,
    now: DateTime<Utc>,
) -> DomainResult<PlannedMovement> {
    product.ensure_active()?;

    let movement_type = request.movement_type;
    let quantity = request.quantity;

    if movement_type.is_delta() && quantity <= 0 {
        return Err(DomainError::invalid_quantity(format!(
            "{movement_type} quantity must be greater than zero (got {quantity})"
        )));
    }

    if request.notes.chars().count() > MAX_NOTES_CHARS {
        return Err(DomainError::validation(format!(
            "notes cannot exceed {MAX_NOTES_CHARS} characters"
        )));
    }

    let current = product.stock_quantity();
    let new_quantity = movement_type
        .resulting_stock(current, quantity)
        .ok_or_else(|| DomainError::validation("quantity is out of range"))?;

    if new_quantity < 0 {
        return Err(DomainError::negative_stock(format!(
            "{movement_type} of {quantity} would leave {new_quantity} units (current stock {current})"
        )));
    }

    Ok(PlannedMovement {
        product: product.with_stock(new_quantity, now),
        movement: NewMovement {
            id: MovementId::new(),
            product_id: product.id_typed(),
            movement_type,
            quantity,
            notes: request.notes.clone(),
            created_at: now,
        },
    })
}

/// Replay a movement history from zero stock, in `(created_at, sequence)` order.
///
/// Returns `None` if a step would overflow or go negative, which a consistent
/// ledger never does.
pub fn replay_stock<'a>(movements: impl IntoIterator<Item = &'a Movement>) -> Option<i64> {
    let mut ordered: Vec<&Movement> = movements.into_iter().collect();
    ordered.sort_by_key(|m| m.history_key());

    ordered.into_iter().try_fold(0i64, |stock, m| {
        m.movement_type
            .resulting_stock(stock, m.quantity)
            .filter(|s| *s >= 0)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::NewProduct;
    use rust_decimal::Decimal;
    use stockroom_core::AggregateRoot;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn product_with_stock(initial_stock: i64) -> Product {
        let candidate = NewProduct {
            name: "Cordless Drill".to_string(),
            description: String::new(),
            sku: "DRILL-001".to_string(),
            price: Decimal::new(12999, 2),
            initial_stock,
            reorder_level: 5,
        };
        Product::create(ProductId::new(), candidate, test_time()).unwrap().0
    }

    fn request(movement_type: MovementType, quantity: i64) -> StockMovementRequest {
        StockMovementRequest {
            movement_type,
            quantity,
            notes: String::new(),
        }
    }

    #[test]
    fn stock_in_adds_and_records_request() {
        let product = product_with_stock(15);
        let now = test_time();
        let req = StockMovementRequest {
            movement_type: MovementType::StockIn,
            quantity: 4,
            notes: "delivery".to_string(),
        };
        let planned = plan_movement(&product, &req, now).unwrap();

        assert_eq!(planned.product.stock_quantity(), 19);
        assert_eq!(planned.product.updated_at(), now);
        assert_eq!(planned.product.version(), product.version() + 1);
        assert_eq!(planned.movement.product_id, product.id_typed());
        assert_eq!(planned.movement.movement_type, MovementType::StockIn);
        assert_eq!(planned.movement.quantity, 4);
        assert_eq!(planned.movement.notes, "delivery");
        assert_eq!(planned.movement.created_at, now);
    }

    #[test]
    fn stock_out_subtracts() {
        let product = product_with_stock(15);
        let planned = plan_movement(&product, &request(MovementType::StockOut, 12), test_time()).unwrap();
        assert_eq!(planned.product.stock_quantity(), 3);
        assert!(planned.product.is_low_stock());
    }

    #[test]
    fn stock_out_below_zero_is_rejected() {
        let product = product_with_stock(3);
        let err = plan_movement(&product, &request(MovementType::StockOut, 10), test_time()).unwrap_err();
        assert!(matches!(err, DomainError::NegativeStockResult(_)));
    }

    #[test]
    fn stock_out_of_everything_is_allowed() {
        let product = product_with_stock(3);
        let planned = plan_movement(&product, &request(MovementType::StockOut, 3), test_time()).unwrap();
        assert_eq!(planned.product.stock_quantity(), 0);
    }

    #[test]
    fn adjustment_sets_absolute_level_and_records_target() {
        let product = product_with_stock(3);
        let planned = plan_movement(&product, &request(MovementType::Adjustment, 40), test_time()).unwrap();
        assert_eq!(planned.product.stock_quantity(), 40);
        assert_eq!(planned.movement.quantity, 40);

        let zeroed = plan_movement(&product, &request(MovementType::Adjustment, 0), test_time()).unwrap();
        assert_eq!(zeroed.product.stock_quantity(), 0);
        assert_eq!(zeroed.movement.movement_type, MovementType::Adjustment);
    }

    #[test]
    fn negative_adjustment_is_a_negative_stock_result() {
        let product = product_with_stock(3);
        let err = plan_movement(&product, &request(MovementType::Adjustment, -1), test_time()).unwrap_err();
        assert!(matches!(err, DomainError::NegativeStockResult(_)));
    }

    #[test]
    fn delta_movements_require_positive_quantity() {
        let product = product_with_stock(3);
        for movement_type in [MovementType::StockIn, MovementType::StockOut] {
            for quantity in [0, -5] {
                let err = plan_movement(&product, &request(movement_type, quantity), test_time()).unwrap_err();
                assert!(
                    matches!(err, DomainError::InvalidQuantity(_)),
                    "{movement_type} {quantity}: {err:?}"
                );
            }
        }
    }

    #[test]
    fn inactive_products_are_not_found() {
        let product = product_with_stock(3).deactivated(test_time()).unwrap();
        let err = plan_movement(&product, &request(MovementType::StockIn, 1), test_time()).unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }

    #[test]
    fn not_found_is_checked_before_quantity() {
        let product = product_with_stock(3).deactivated(test_time()).unwrap();
        let err = plan_movement(&product, &request(MovementType::StockOut, 0), test_time()).unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }

    #[test]
    fn overlong_notes_are_rejected() {
        let product = product_with_stock(3);
        let req = StockMovementRequest {
            movement_type: MovementType::StockIn,
            quantity: 1,
            notes: "n".repeat(MAX_NOTES_CHARS + 1),
        };
        let err = plan_movement(&product, &req, test_time()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn overflow_is_a_validation_error() {
        let product = product_with_stock(3);
        let err = plan_movement(&product, &request(MovementType::StockIn, i64::MAX), test_time()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn plan_does_not_mutate_the_product() {
        let product = product_with_stock(10);
        let before = product.clone();
        let first = plan_movement(&product, &request(MovementType::StockOut, 4), test_time()).unwrap();
        let second = plan_movement(&product, &request(MovementType::StockOut, 4), test_time()).unwrap();
        assert_eq!(product, before);
        assert_eq!(first.product.stock_quantity(), second.product.stock_quantity());
    }

    #[test]
    fn parses_names_and_codes() {
        assert_eq!("StockIn".parse::<MovementType>().unwrap(), MovementType::StockIn);
        assert_eq!("stockout".parse::<MovementType>().unwrap(), MovementType::StockOut);
        assert_eq!(" ADJUSTMENT ".parse::<MovementType>().unwrap(), MovementType::Adjustment);
        assert_eq!("2".parse::<MovementType>().unwrap(), MovementType::StockOut);
        for t in MovementType::ALL {
            assert_eq!(MovementType::from_code(t.code()).unwrap(), t);
        }
    }

    #[test]
    fn rejects_unknown_tags() {
        for raw in ["0", "4", "-1", "Transfer", ""] {
            let err = raw.parse::<MovementType>().unwrap_err();
            assert!(matches!(err, DomainError::InvalidMovementType(_)), "{raw}: {err:?}");
        }
    }

    #[test]
    fn replay_reproduces_stock_regardless_of_input_order() {
        let product = product_with_stock(15);
        let now = test_time();
        let later = now + chrono::Duration::seconds(1);
        let entries = vec![
            Movement {
                id: MovementId::new(),
                product_id: product.id_typed(),
                movement_type: MovementType::Adjustment,
                quantity: 0,
                notes: String::new(),
                created_at: later,
                sequence: 3,
            },
            Movement {
                id: MovementId::new(),
                product_id: product.id_typed(),
                movement_type: MovementType::StockIn,
                quantity: 15,
                notes: INITIAL_STOCK_NOTE.to_string(),
                created_at: now,
                sequence: 1,
            },
            Movement {
                id: MovementId::new(),
                product_id: product.id_typed(),
                movement_type: MovementType::StockOut,
                quantity: 12,
                notes: "sale".to_string(),
                created_at: now,
                sequence: 2,
            },
        ];
        assert_eq!(replay_stock(&entries), Some(0));
        assert_eq!(replay_stock(&entries[1..]), Some(3));
        assert_eq!(replay_stock(&entries[2..]), None);
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn movement_type() -> impl Strategy<Value = MovementType> {
            prop_oneof![
                Just(MovementType::StockIn),
                Just(MovementType::StockOut),
                Just(MovementType::Adjustment),
            ]
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 500,
                ..ProptestConfig::default()
            })]

            /// Property: no sequence of planned movements ever yields negative stock,
            /// and replaying the accepted ones reproduces the final quantity.
            #[test]
            fn accepted_movements_replay_to_current_stock(
                initial in 0i64..1_000,
                steps in proptest::collection::vec((movement_type(), -50i64..500), 0..40)
            ) {
                let mut product = product_with_stock(initial);
                let mut ledger: Vec<Movement> = Vec::new();
                let mut sequence = 0u64;
                let start = Utc::now();

                if initial > 0 {
                    sequence += 1;
                    ledger.push(NewMovement {
                        id: MovementId::new(),
                        product_id: product.id_typed(),
                        movement_type: MovementType::StockIn,
                        quantity: initial,
                        notes: INITIAL_STOCK_NOTE.to_string(),
                        created_at: start,
                    }.into_stored(sequence));
                }

                for (movement_type, quantity) in steps {
                    let req = StockMovementRequest { movement_type, quantity, notes: String::new() };
                    match plan_movement(&product, &req, start) {
                        Ok(planned) => {
                            prop_assert!(planned.product.stock_quantity() >= 0);
                            sequence += 1;
                            ledger.push(planned.movement.into_stored(sequence));
                            product = planned.product;
                        }
                        Err(e) => {
                            prop_assert!(matches!(
                                e,
                                DomainError::InvalidQuantity(_) | DomainError::NegativeStockResult(_)
                            ));
                        }
                    }
                }

                prop_assert_eq!(replay_stock(&ledger), Some(product.stock_quantity()));
            }

            /// Property: StockIn(q) followed by StockOut(q) restores the original quantity.
            #[test]
            fn stock_in_then_out_round_trips(initial in 0i64..1_000, q in 1i64..1_000) {
                let product = product_with_stock(initial);
                let now = Utc::now();
                let up = plan_movement(&product, &request(MovementType::StockIn, q), now).unwrap();
                let down = plan_movement(&up.product, &request(MovementType::StockOut, q), now).unwrap();
                prop_assert_eq!(down.product.stock_quantity(), initial);
            }

            /// Property: Adjustment(q) is absolute and idempotent.
            #[test]
            fn adjustment_is_idempotent(initial in 0i64..1_000, q in 0i64..1_000) {
                let product = product_with_stock(initial);
                let now = Utc::now();
                let once = plan_movement(&product, &request(MovementType::Adjustment, q), now).unwrap();
                let twice = plan_movement(&once.product, &request(MovementType::Adjustment, q), now).unwrap();
                prop_assert_eq!(once.product.stock_quantity(), q);
                prop_assert_eq!(twice.product.stock_quantity(), q);
            }
        }
    }
}
