//! Orders
//!
//! An order line keeps the price and the price after discount that applied when
//! it was created, so later catalog changes or discount expiry do not alter
//! what the customer was charged.

use std::fmt;

use jiff::Timestamp;
use rusty_money::{Money, MoneyError, iso::Currency};
use smallvec::SmallVec;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::{
    pricing::InvalidInputError,
    products::{Product, ProductKey},
};

/// Errors related to order construction, totals or status changes.
#[derive(Debug, Error, PartialEq)]
pub enum OrderError {
    /// Line quantity must be at least one.
    #[error("quantity must be at least 1")]
    InvalidQuantity,

    /// The product is not currently sold (slug).
    #[error("product {0} is unavailable")]
    Unavailable(String),

    /// An item's currency differs from the order currency (item currency, order currency).
    #[error("item has currency {0}, but order has currency {1}")]
    CurrencyMismatch(&'static str, &'static str),

    /// The shipping status cannot move from one state to the other.
    #[error("cannot move order from {from} to {to}")]
    InvalidTransition {
        /// Current status
        from: ShippingStatus,
        /// Requested status
        to: ShippingStatus,
    },

    /// Payment was already recorded.
    #[error("order is already paid")]
    AlreadyPaid,

    /// Orders only become paid by recording a payment.
    #[error("order must be paid through mark_paid")]
    PaymentRequired,

    /// A line or order total does not fit in minor units.
    #[error("order amount overflowed")]
    AmountOverflow,

    /// The product's pricing fields are out of range.
    #[error(transparent)]
    Pricing(#[from] InvalidInputError),

    /// Wrapped money arithmetic or currency mismatch error.
    #[error(transparent)]
    Money(#[from] MoneyError),
}

/// Where an order is in its fulfilment lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ShippingStatus {
    /// Created, payment not yet received.
    #[default]
    WaitingPayment,

    /// Payment received.
    Paid,

    /// Handed to the carrier.
    Posted,

    /// Received by the customer.
    Delivered,

    /// Sent back by the customer.
    Returned,

    /// Cancelled before delivery.
    Canceled,

    /// Paid by cheque, cheque not yet cleared.
    WaitingForChecking,
}

impl ShippingStatus {
    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Self::WaitingPayment => "Waiting Payment",
            Self::Paid => "Paid",
            Self::Posted => "Posted",
            Self::Delivered => "Delivered",
            Self::Returned => "Returned",
            Self::Canceled => "Canceled",
            Self::WaitingForChecking => "Waiting For Checking",
        }
    }

    /// Whether the order may move from `self` to `next`.
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (
                Self::WaitingPayment,
                Self::Paid | Self::WaitingForChecking | Self::Canceled
            ) | (Self::WaitingForChecking, Self::Paid | Self::Canceled)
                | (Self::Paid, Self::Posted | Self::Canceled)
                | (Self::Posted, Self::Delivered | Self::Returned)
                | (Self::Delivered, Self::Returned)
        )
    }

    /// Whether no further status changes are possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Returned | Self::Canceled)
    }
}

impl fmt::Display for ShippingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How the customer pays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum PaymentType {
    /// Online payment gateway.
    #[default]
    Internet,

    /// Cash on delivery.
    Home,

    /// Cheque, cleared before shipping.
    Check,
}

impl PaymentType {
    /// Status a new order starts in.
    pub fn initial_status(self) -> ShippingStatus {
        match self {
            Self::Check => ShippingStatus::WaitingForChecking,
            Self::Internet | Self::Home => ShippingStatus::WaitingPayment,
        }
    }
}

/// A single order line.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem<'a> {
    product: ProductKey,
    price: Money<'a, Currency>,
    price_after_discount: Money<'a, Currency>,
    quantity: u32,
}

impl<'a> OrderItem<'a> {
    /// Creates a line for `product`, priced at `now`.
    ///
    /// # Errors
    ///
    /// - [`OrderError::InvalidQuantity`]: `quantity` is zero.
    /// - [`OrderError::Unavailable`]: the product is marked unavailable.
    /// - [`OrderError::Pricing`]: the product's pricing fields are out of range.
    pub fn from_product(
        key: ProductKey,
        product: &Product<'a>,
        quantity: u32,
        now: Timestamp,
    ) -> Result<Self, OrderError> {
        if quantity == 0 {
            return Err(OrderError::InvalidQuantity);
        }

        if !product.available {
            return Err(OrderError::Unavailable(product.slug.clone()));
        }

        Ok(Self {
            product: key,
            price: product.price,
            price_after_discount: product.price_after_discount(now)?,
            quantity,
        })
    }

    /// Returns the product of the line
    pub fn product(&self) -> ProductKey {
        self.product
    }

    /// Unit price before discount
    pub fn price(&self) -> Money<'a, Currency> {
        self.price
    }

    /// Unit price after discount
    pub fn price_after_discount(&self) -> Money<'a, Currency> {
        self.price_after_discount
    }

    /// Number of units
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Amount charged for the line.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::AmountOverflow`] if the line total does not fit.
    pub fn cost(&self) -> Result<Money<'a, Currency>, OrderError> {
        times(self.price_after_discount, self.quantity)
    }

    /// Amount the line would cost without any discount.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::AmountOverflow`] if the line total does not fit.
    pub fn full_cost(&self) -> Result<Money<'a, Currency>, OrderError> {
        times(self.price, self.quantity)
    }
}

fn times<'a>(unit: Money<'a, Currency>, quantity: u32) -> Result<Money<'a, Currency>, OrderError> {
    let minor = unit
        .to_minor_units()
        .checked_mul(i64::from(quantity))
        .ok_or(OrderError::AmountOverflow)?;

    Ok(Money::from_minor(minor, unit.currency()))
}

/// Customer order
#[derive(Debug, Clone)]
pub struct Order<'a> {
    code: Uuid,
    created: Timestamp,
    paid_time: Option<Timestamp>,
    is_paid: bool,
    ref_id: Option<u64>,
    shipping_status: ShippingStatus,
    payment_type: PaymentType,
    description: String,
    items: SmallVec<[OrderItem<'a>; 4]>,
    currency: &'a Currency,
}

impl<'a> Order<'a> {
    /// Creates an empty order with a fresh code.
    pub fn new(currency: &'a Currency, payment_type: PaymentType, created: Timestamp) -> Self {
        Self {
            code: Uuid::new_v4(),
            created,
            paid_time: None,
            is_paid: false,
            ref_id: None,
            shipping_status: payment_type.initial_status(),
            payment_type,
            description: String::new(),
            items: SmallVec::new(),
            currency,
        }
    }

    /// Adds a line to the order.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::CurrencyMismatch`] if the line is priced in another currency.
    pub fn add_item(&mut self, item: OrderItem<'a>) -> Result<(), OrderError> {
        let item_currency = item.price().currency();

        if item_currency != self.currency {
            return Err(OrderError::CurrencyMismatch(
                item_currency.iso_alpha_code,
                self.currency.iso_alpha_code,
            ));
        }

        self.items.push(item);

        Ok(())
    }

    /// Sets free-text notes (colour choice and similar).
    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    /// Order lines.
    pub fn items(&self) -> &[OrderItem<'a>] {
        &self.items
    }

    /// Unique order code.
    pub fn code(&self) -> Uuid {
        self.code
    }

    /// When the order was created.
    pub fn created(&self) -> Timestamp {
        self.created
    }

    /// When payment was recorded.
    pub fn paid_time(&self) -> Option<Timestamp> {
        self.paid_time
    }

    /// Whether payment was recorded.
    pub fn is_paid(&self) -> bool {
        self.is_paid
    }

    /// Payment gateway tracking number.
    pub fn ref_id(&self) -> Option<u64> {
        self.ref_id
    }

    /// Current shipping status.
    pub fn shipping_status(&self) -> ShippingStatus {
        self.shipping_status
    }

    /// Payment method.
    pub fn payment_type(&self) -> PaymentType {
        self.payment_type
    }

    /// Free-text notes.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Order currency.
    pub fn currency(&self) -> &'a Currency {
        self.currency
    }

    /// Sum of all lines before discount.
    ///
    /// # Errors
    ///
    /// Returns an error if any line or the sum overflows.
    pub fn total_price(&self) -> Result<Money<'a, Currency>, OrderError> {
        self.sum(OrderItem::full_cost)
    }

    /// Sum of all lines after discount; the amount to charge.
    ///
    /// # Errors
    ///
    /// Returns an error if any line or the sum overflows.
    pub fn total_price_after_discount(&self) -> Result<Money<'a, Currency>, OrderError> {
        self.sum(OrderItem::cost)
    }

    /// Amount saved through discounts.
    ///
    /// # Errors
    ///
    /// Returns an error if either total cannot be computed.
    pub fn savings(&self) -> Result<Money<'a, Currency>, OrderError> {
        Ok(self.total_price()?.sub(self.total_price_after_discount()?)?)
    }

    fn sum(
        &self,
        line: impl Fn(&OrderItem<'a>) -> Result<Money<'a, Currency>, OrderError>,
    ) -> Result<Money<'a, Currency>, OrderError> {
        let minor = self.items.iter().try_fold(0_i64, |acc, item| {
            acc.checked_add(line(item)?.to_minor_units())
                .ok_or(OrderError::AmountOverflow)
        })?;

        Ok(Money::from_minor(minor, self.currency))
    }

    /// Moves the order to `next`. Use [`Order::mark_paid`] to move it to
    /// [`ShippingStatus::Paid`].
    ///
    /// # Errors
    ///
    /// - [`OrderError::PaymentRequired`]: `next` is [`ShippingStatus::Paid`].
    /// - [`OrderError::InvalidTransition`]: the lifecycle does not allow the move.
    pub fn transition(&mut self, next: ShippingStatus) -> Result<(), OrderError> {
        if next == ShippingStatus::Paid {
            return Err(OrderError::PaymentRequired);
        }

        self.change_status(next)
    }

    fn change_status(&mut self, next: ShippingStatus) -> Result<(), OrderError> {
        if !self.shipping_status.can_transition_to(next) {
            return Err(OrderError::InvalidTransition {
                from: self.shipping_status,
                to: next,
            });
        }

        info!(order = %self.code, from = %self.shipping_status, to = %next, "order status changed");

        self.shipping_status = next;

        Ok(())
    }

    /// Records a payment and moves the order to [`ShippingStatus::Paid`].
    ///
    /// # Errors
    ///
    /// - [`OrderError::AlreadyPaid`]: payment was already recorded.
    /// - [`OrderError::InvalidTransition`]: the order cannot become paid from its current status.
    pub fn mark_paid(&mut self, ref_id: Option<u64>, now: Timestamp) -> Result<(), OrderError> {
        if self.is_paid {
            return Err(OrderError::AlreadyPaid);
        }

        self.change_status(ShippingStatus::Paid)?;

        self.is_paid = true;
        self.paid_time = Some(now);
        self.ref_id = ref_id;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use jiff::SignedDuration;
    use rusty_money::iso::{EUR, USD};
    use slotmap::SlotMap;
    use testresult::TestResult;

    use super::*;

    struct Setup {
        products: SlotMap<ProductKey, Product<'static>>,
        kettle: ProductKey,
        toaster: ProductKey,
        now: Timestamp,
    }

    fn setup() -> TestResult<Setup> {
        let now: Timestamp = "2025-06-01T00:00:00Z".parse()?;
        let tomorrow = now.checked_add(SignedDuration::from_hours(24))?;
        let mut products = SlotMap::with_key();

        let kettle = products.insert(
            Product::new("Kettle", "kettle", Money::from_minor(100, USD))
                .with_discount(10, tomorrow),
        );
        let toaster = products.insert(Product::new(
            "Toaster",
            "toaster",
            Money::from_minor(250, USD),
        ));

        Ok(Setup {
            products,
            kettle,
            toaster,
            now,
        })
    }

    fn item(setup: &Setup, key: ProductKey, quantity: u32) -> TestResult<OrderItem<'static>> {
        let product = setup.products.get(key).ok_or("missing product")?;

        Ok(OrderItem::from_product(key, product, quantity, setup.now)?)
    }

    #[test]
    fn item_snapshots_prices() -> TestResult {
        let setup = setup()?;
        let line = item(&setup, setup.kettle, 3)?;

        assert_eq!(line.product(), setup.kettle);
        assert_eq!(line.price(), Money::from_minor(100, USD));
        assert_eq!(line.price_after_discount(), Money::from_minor(90, USD));
        assert_eq!(line.cost()?, Money::from_minor(270, USD));
        assert_eq!(line.full_cost()?, Money::from_minor(300, USD));

        Ok(())
    }

    #[test]
    fn item_rejects_zero_quantity() -> TestResult {
        let setup = setup()?;
        let product = setup.products.get(setup.kettle).ok_or("missing product")?;

        assert_eq!(
            OrderItem::from_product(setup.kettle, product, 0, setup.now),
            Err(OrderError::InvalidQuantity)
        );

        Ok(())
    }

    #[test]
    fn item_rejects_unavailable_product() {
        let mut product = Product::new("Lamp", "lamp", Money::from_minor(4_000, USD));
        product.available = false;

        assert_eq!(
            OrderItem::from_product(ProductKey::default(), &product, 1, Timestamp::UNIX_EPOCH),
            Err(OrderError::Unavailable("lamp".to_string()))
        );
    }

    #[test]
    fn item_cost_overflow_is_reported() {
        let product = Product::new("Gold", "gold", Money::from_minor(i64::MAX, USD));
        let line =
            OrderItem::from_product(ProductKey::default(), &product, 2, Timestamp::UNIX_EPOCH);

        assert_eq!(line.map(|line| line.cost()), Ok(Err(OrderError::AmountOverflow)));
    }

    #[test]
    fn order_totals() -> TestResult {
        let setup = setup()?;
        let mut order = Order::new(USD, PaymentType::Internet, setup.now);
        order.add_item(item(&setup, setup.kettle, 2)?)?;
        order.add_item(item(&setup, setup.toaster, 1)?)?;

        assert_eq!(order.items().len(), 2);
        assert_eq!(order.total_price()?, Money::from_minor(450, USD));
        assert_eq!(order.total_price_after_discount()?, Money::from_minor(430, USD));
        assert_eq!(order.savings()?, Money::from_minor(20, USD));

        Ok(())
    }

    #[test]
    fn empty_order_totals_zero() -> TestResult {
        let order = Order::new(EUR, PaymentType::Home, Timestamp::UNIX_EPOCH);

        assert_eq!(order.total_price()?, Money::from_minor(0, EUR));
        assert_eq!(order.total_price_after_discount()?, Money::from_minor(0, EUR));
        assert_eq!(order.savings()?, Money::from_minor(0, EUR));

        Ok(())
    }

    #[test]
    fn add_item_rejects_currency_mismatch() -> TestResult {
        let setup = setup()?;
        let mut order = Order::new(EUR, PaymentType::Internet, setup.now);

        assert_eq!(
            order.add_item(item(&setup, setup.kettle, 1)?),
            Err(OrderError::CurrencyMismatch("USD", "EUR"))
        );
        assert!(order.items().is_empty());

        Ok(())
    }

    #[test]
    fn line_keeps_price_after_discount_expires() -> TestResult {
        let mut setup = setup()?;
        let line = item(&setup, setup.kettle, 1)?;

        setup.now = setup.now.checked_add(SignedDuration::from_hours(48))?;
        let later = item(&setup, setup.kettle, 1)?;

        assert_eq!(line.price_after_discount(), Money::from_minor(90, USD));
        assert_eq!(later.price_after_discount(), Money::from_minor(100, USD));

        Ok(())
    }

    #[test]
    fn initial_status_depends_on_payment_type() {
        let now = Timestamp::UNIX_EPOCH;

        assert_eq!(
            Order::new(USD, PaymentType::Internet, now).shipping_status(),
            ShippingStatus::WaitingPayment
        );
        assert_eq!(
            Order::new(USD, PaymentType::Home, now).shipping_status(),
            ShippingStatus::WaitingPayment
        );
        assert_eq!(
            Order::new(USD, PaymentType::Check, now).shipping_status(),
            ShippingStatus::WaitingForChecking
        );
    }

    #[test]
    fn mark_paid_records_payment() -> TestResult {
        let setup = setup()?;
        let mut order = Order::new(USD, PaymentType::Internet, setup.now);

        order.mark_paid(Some(123_456), setup.now)?;

        assert!(order.is_paid());
        assert_eq!(order.paid_time(), Some(setup.now));
        assert_eq!(order.ref_id(), Some(123_456));
        assert_eq!(order.shipping_status(), ShippingStatus::Paid);
        assert_eq!(order.mark_paid(None, setup.now), Err(OrderError::AlreadyPaid));

        Ok(())
    }

    #[test]
    fn mark_paid_rejects_canceled_order() -> TestResult {
        let mut order = Order::new(USD, PaymentType::Check, Timestamp::UNIX_EPOCH);
        order.transition(ShippingStatus::Canceled)?;

        assert_eq!(
            order.mark_paid(None, Timestamp::UNIX_EPOCH),
            Err(OrderError::InvalidTransition {
                from: ShippingStatus::Canceled,
                to: ShippingStatus::Paid,
            })
        );
        assert!(!order.is_paid());

        Ok(())
    }

    #[test]
    fn full_lifecycle() -> TestResult {
        let mut order = Order::new(USD, PaymentType::Internet, Timestamp::UNIX_EPOCH);

        order.mark_paid(None, Timestamp::UNIX_EPOCH)?;
        order.transition(ShippingStatus::Posted)?;
        order.transition(ShippingStatus::Delivered)?;
        order.transition(ShippingStatus::Returned)?;

        assert!(order.shipping_status().is_terminal());
        assert!(order.transition(ShippingStatus::Posted).is_err());

        Ok(())
    }

    #[test]
    fn cannot_skip_payment() {
        let mut order = Order::new(USD, PaymentType::Internet, Timestamp::UNIX_EPOCH);

        assert_eq!(
            order.transition(ShippingStatus::Posted),
            Err(OrderError::InvalidTransition {
                from: ShippingStatus::WaitingPayment,
                to: ShippingStatus::Posted,
            })
        );
    }

    #[test]
    fn paid_status_requires_payment() -> TestResult {
        let mut order = Order::new(USD, PaymentType::Internet, Timestamp::UNIX_EPOCH);

        assert_eq!(order.transition(ShippingStatus::Paid), Err(OrderError::PaymentRequired));
        assert_eq!(order.shipping_status(), ShippingStatus::WaitingPayment);
        assert!(!order.is_paid());

        order.mark_paid(Some(1), Timestamp::UNIX_EPOCH)?;

        assert_eq!(order.shipping_status(), ShippingStatus::Paid);
        assert_eq!(order.paid_time(), Some(Timestamp::UNIX_EPOCH));
        assert_eq!(order.ref_id(), Some(1));

        Ok(())
    }

    #[test]
    fn status_labels() {
        assert_eq!(ShippingStatus::WaitingForChecking.to_string(), "Waiting For Checking");
        assert_eq!(ShippingStatus::default(), ShippingStatus::WaitingPayment);
        assert_eq!(PaymentType::default(), PaymentType::Internet);
    }

    #[test]
    fn order_codes_are_unique() {
        let a = Order::new(USD, PaymentType::Internet, Timestamp::UNIX_EPOCH);
        let b = Order::new(USD, PaymentType::Internet, Timestamp::UNIX_EPOCH);

        assert_ne!(a.code(), b.code());
    }
}
