pub mod pricing;
pub mod promo_code;
pub mod settings;
pub mod summary;
pub mod ticket_type;

use serde::{Deserialize, Deserializer};

pub use pricing::{
    DynamicPricingRule, EarlyBirdPrice, LastMinutePrice, PriceSource, PricingTier, ResolvedPrice,
};
pub use promo_code::{
    normalize_code, CartLine, DiscountType, NewPromoCode, PromoCode, PromoCodePatch,
    PromoValidation,
};
pub use settings::{
    CustomQuestion, FeePayer, QuestionKind, RefundPolicy, ServiceFee, ServiceFeeType,
    TicketingSettings,
};
pub use summary::{
    Confirmation, OrderQuote, QuoteItem, QuoteLine, QuoteRequest, SummaryTotals,
    TicketTypeWithAvailability, TicketingConfigSummary,
};
pub use ticket_type::{Availability, NewTicketType, TicketType, TicketTypePatch, Visibility};

/// Patch field deserializer: a missing field stays `None`, an explicit
/// `null` becomes `Some(None)` and clears the stored value.
pub(crate) fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
