//! Shop menu for TinyMUSH storefronts.
//!
//! A visitor browses a shop through three steps:
//! - **Storefront**: numbered list of the storeroom's wares with prices
//! - **Inspect**: one ware is bound and the visitor is asked for a quantity
//! - **Purchase**: the quantity is charged against the `Budget` ledger entry,
//!   then the menu returns to the storefront
//!
//! The menu is an explicit state value ([`ShopMenuState`]) stored inside the
//! player's [`ShopSession`], so a session survives restarts. [`advance`] is a
//! pure transition over the current state, the visitor's input, a freshly
//! built catalog and the visitor's ledger; the command layer loads those from
//! the store and writes the results back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tmush::types::{Ledger, ObjectRecord, BUDGET_KEY};

/// Where a visitor currently is in the shop menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShopMenuState {
    /// Listing wares, waiting for a selection
    Storefront,
    /// A ware has been chosen, waiting for a quantity
    Inspect {
        ware_id: String,
        ware_name: String,
        price: i64,
        /// Budget when the ware was chosen (display only; purchases re-read the ledger)
        budget: i64,
    },
}

/// Persisted menu session for one visitor in one shop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopSession {
    pub id: Uuid,
    pub shop_room: String,
    pub state: ShopMenuState,
    pub started_at: DateTime<Utc>,
}

impl ShopSession {
    pub fn new(shop_room: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            shop_room: shop_room.to_string(),
            state: ShopMenuState::Storefront,
            started_at: Utc::now(),
        }
    }
}

/// A catalog entry: one object from the storeroom and its asking price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ware {
    pub id: String,
    pub name: String,
    pub price: i64,
}

/// Build the sellable catalog from a storeroom's objects, preserving storeroom order.
///
/// Exits are stored separately from objects, so the passage back to the shop can
/// never show up here.
pub fn build_catalog(storeroom_objects: &[ObjectRecord], default_price: i64) -> Vec<Ware> {
    storeroom_objects
        .iter()
        .map(|obj| Ware {
            id: obj.id.clone(),
            name: obj.name.clone(),
            price: obj.price_or(default_price),
        })
        .collect()
}

/// What the menu needs to know about the shop on each step.
#[derive(Debug, Clone, Copy)]
pub struct ShopView<'a> {
    pub shop_name: &'a str,
    pub catalog: &'a [Ware],
}

/// A completed purchase, reported back for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Purchase {
    pub ware_name: String,
    pub quantity: i64,
    pub total: i64,
}

/// Result of feeding one line of input to the menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuStep {
    /// Next state; `None` once the visitor has left the menu.
    pub state: Option<ShopMenuState>,
    pub output: String,
    pub purchase: Option<Purchase>,
}

impl MenuStep {
    fn stay(state: ShopMenuState, output: String) -> Self {
        Self {
            state: Some(state),
            output,
            purchase: None,
        }
    }

    fn closed(output: String) -> Self {
        Self {
            state: None,
            output,
            purchase: None,
        }
    }
}

/// Storefront text: greeting plus one numbered line per ware.
pub fn render_storefront(view: &ShopView<'_>) -> String {
    let mut text = format!("*** Welcome to {}! ***\n", view.shop_name);
    if view.catalog.is_empty() {
        text.push_str("   There is nothing for sale; quit to exit.");
        return text;
    }

    text.push_str(&format!(
        "   Things for sale (choose 1-{} to inspect); quit to exit:",
        view.catalog.len()
    ));
    for (idx, ware) in view.catalog.iter().enumerate() {
        text.push_str(&format!("\n {}. {} ({})", idx + 1, ware.name, ware.price));
    }
    text
}

/// Quantity prompt for a chosen ware.
pub fn render_inspect(ware_name: &str, price: i64, budget: i64) -> String {
    format!(
        "{} costs {} each. Your budget is {}.\nEnter amount or <return> to go back",
        ware_name, price, budget
    )
}

/// Render whatever the visitor should currently be looking at.
pub fn render_state(state: &ShopMenuState, view: &ShopView<'_>) -> String {
    match state {
        ShopMenuState::Storefront => render_storefront(view),
        ShopMenuState::Inspect {
            ware_name,
            price,
            budget,
            ..
        } => render_inspect(ware_name, *price, *budget),
    }
}

/// Resolve a 1-based storefront selection against the catalog.
pub fn select_ware<'a>(catalog: &'a [Ware], input: &str) -> Option<&'a Ware> {
    let index: usize = input.trim().parse().ok()?;
    index.checked_sub(1).and_then(|i| catalog.get(i))
}

/// Parse a purchase quantity. Only whole numbers of at least one are accepted.
pub fn parse_quantity(input: &str) -> Option<i64> {
    input.trim().parse::<i64>().ok().filter(|n| *n >= 1)
}

/// Advance the menu by one line of input.
///
/// `quit`/`q` leaves the menu and `look`/`l` redraws the current step from
/// any state. `ledger` is only modified by a successful purchase.
pub fn advance(
    state: &ShopMenuState,
    input: &str,
    view: &ShopView<'_>,
    ledger: &mut Ledger,
) -> MenuStep {
    let trimmed = input.trim();

    if trimmed.eq_ignore_ascii_case("quit") || trimmed.eq_ignore_ascii_case("q") {
        return MenuStep::closed(format!("You leave {}.", view.shop_name));
    }
    if trimmed.eq_ignore_ascii_case("look") || trimmed.eq_ignore_ascii_case("l") {
        return MenuStep::stay(state.clone(), render_state(state, view));
    }

    match state {
        ShopMenuState::Storefront => choose_ware(trimmed, view, ledger),
        ShopMenuState::Inspect {
            ware_id, ware_name, ..
        } => resolve_purchase(ware_id, ware_name, state, trimmed, view, ledger),
    }
}

fn choose_ware(input: &str, view: &ShopView<'_>, ledger: &Ledger) -> MenuStep {
    if input.is_empty() {
        return MenuStep::stay(ShopMenuState::Storefront, render_storefront(view));
    }

    let Some(ware) = select_ware(view.catalog, input) else {
        let hint = if view.catalog.is_empty() {
            "There is nothing to choose.".to_string()
        } else {
            format!("Choose 1-{} to inspect, or quit to exit.", view.catalog.len())
        };
        return MenuStep::stay(
            ShopMenuState::Storefront,
            format!("{}\n\n{}", hint, render_storefront(view)),
        );
    };

    let budget = ledger.get(BUDGET_KEY).copied().unwrap_or(0);
    let next = ShopMenuState::Inspect {
        ware_id: ware.id.clone(),
        ware_name: ware.name.clone(),
        price: ware.price,
        budget,
    };
    MenuStep::stay(next, render_inspect(&ware.name, ware.price, budget))
}

fn resolve_purchase(
    ware_id: &str,
    ware_name: &str,
    state: &ShopMenuState,
    input: &str,
    view: &ShopView<'_>,
    ledger: &mut Ledger,
) -> MenuStep {
    if input.is_empty() {
        return MenuStep::stay(ShopMenuState::Storefront, render_storefront(view));
    }

    let Some(quantity) = parse_quantity(input) else {
        return MenuStep::stay(
            state.clone(),
            "Please enter a whole number of at least 1, or <return> to go back.".to_string(),
        );
    };

    // Catalog is rebuilt every step; the ware may have left the storeroom meanwhile.
    let Some(ware) = view.catalog.iter().find(|w| w.id == ware_id) else {
        return MenuStep::stay(
            ShopMenuState::Storefront,
            format!(
                "{} is no longer for sale.\n\n{}",
                ware_name,
                render_storefront(view)
            ),
        );
    };

    let budget = ledger.get(BUDGET_KEY).copied().unwrap_or(0);
    let owned = ledger.get(&ware.name).copied().unwrap_or(0);

    // A total past i64::MAX is more than any budget can hold.
    let Some(total) = ware.price.checked_mul(quantity) else {
        return MenuStep::stay(
            ShopMenuState::Storefront,
            format!(
                "You cannot afford {} of {}!\n\n{}",
                quantity,
                ware.name,
                render_storefront(view)
            ),
        );
    };

    let new_owned = match owned.checked_add(quantity) {
        Some(n) if budget >= total => n,
        _ => {
            return MenuStep::stay(
                ShopMenuState::Storefront,
                format!(
                    "You cannot afford {} for {}!\n\n{}",
                    total,
                    ware.name,
                    render_storefront(view)
                ),
            );
        }
    };

    ledger.insert(BUDGET_KEY.to_string(), budget - total);
    ledger.insert(ware.name.clone(), new_owned);

    MenuStep {
        state: Some(ShopMenuState::Storefront),
        output: format!(
            "You pay {} and purchase {}!\n\n{}",
            total,
            ware.name,
            render_storefront(view)
        ),
        purchase: Some(Purchase {
            ware_name: ware.name.clone(),
            quantity,
            total,
        }),
    }
}
