//! Wire codec for the matching server's line protocol
//!
//! Commands are `:`-delimited and newline-terminated. The field order of
//! `ORDER` is fixed by the server; changing it breaks compatibility.
//! Server replies are free-form text and are only inspected for the
//! registration marker.

use types::ids::{Symbol, TraderId};
use types::numeric::{Price, Quantity};
use types::order::{OrderIntent, OrderKind, Side};

/// Substring the server includes when a registration succeeds.
pub const REGISTER_ACK_MARKER: &str = "REGISTERED";

/// `REGISTER:<traderId>\n`
pub fn encode_register(trader_id: &TraderId) -> String {
    format!("REGISTER:{}\n", trader_id)
}

/// `ORDER:<traderId>:<symbol>:<side>:<kind>:<price>:<quantity>\n`
///
/// Price is rendered with exactly two fractional digits.
pub fn encode_order(
    trader_id: &TraderId,
    symbol: &Symbol,
    side: Side,
    kind: OrderKind,
    price: Price,
    quantity: Quantity,
) -> String {
    format!(
        "ORDER:{}:{}:{}:{}:{}:{}\n",
        trader_id, symbol, side, kind, price, quantity
    )
}

/// Encode a generated intent for the given trader.
pub fn encode_intent(trader_id: &TraderId, intent: &OrderIntent) -> String {
    encode_order(
        trader_id,
        &intent.symbol,
        intent.side,
        intent.kind,
        intent.price,
        intent.quantity,
    )
}

/// Best-effort check of raw reply bytes for the registration marker.
pub fn is_registration_ack(raw: &[u8]) -> bool {
    String::from_utf8_lossy(raw).contains(REGISTER_ACK_MARKER)
}
