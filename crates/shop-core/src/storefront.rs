//! # Storefront
//!
//! The cart → order → payment flow, written against the [`Store`] and
//! [`PaymentGateway`] seams.
//!
//! ```text
//! add_to_cart / remove_from_cart        (ShopperId)
//!        │
//!        ▼
//! place_order ──► Order{paid: false} + OrderItems   (Customer, frozen prices)
//!        │
//!        ▼
//! begin_payment ──► remote intent, processor order id stored on the Order
//!        │
//!        ▼
//! confirm_payment / handle_webhook
//!        ├── verify signature            (guard, no writes before this)
//!        ├── fetch + check the payment   (order, currency, amount, status)
//!        └── Store::finalize_payment     (payment + paid + cart clear, atomic)
//! ```

use crate::cart::{CartItem, CartView, RemoveOutcome};
use crate::catalog::{Category, Product, ProductFilter};
use crate::error::{ShopError, ShopResult};
use crate::gateway::{
    BoxedPaymentGateway, GatewayPayment, GatewayPaymentStatus, IntentRequest,
    PaymentConfirmation, WebhookEventType,
};
use crate::money::Currency;
use crate::order::{
    ContactDetails, FinalizeOutcome, Order, OrderDetail, OrderDraft, Payment, PaymentIntent,
    PaymentStatus,
};
use crate::shopper::{Customer, ShopperId};
use crate::store::BoxedStore;
use chrono::Utc;
use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Result of opening the checkout page
#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutOutcome {
    /// Nothing to check out; send the shopper back to the catalog
    EmptyCart,
    Ready(CartView),
}

/// Result of submitting the checkout form
#[derive(Debug, Clone, PartialEq)]
pub enum PlaceOrderOutcome {
    /// Nothing to check out; send the shopper back to the catalog
    EmptyCart,
    /// A new unpaid order was written
    Placed(OrderDetail),
    /// The latest unpaid order already matched this cart and contact
    Reused(OrderDetail),
}

/// Result of starting payment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// The customer has no unpaid order
    NoPendingOrder,
    Intent(PaymentIntent),
}

/// Result of a verified webhook
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookOutcome {
    Finalized(FinalizeOutcome),
    /// Event acknowledged without changes
    Ignored,
}

/// Storefront service
pub struct Storefront {
    store: BoxedStore,
    gateway: BoxedPaymentGateway,
    currency: Currency,
}

impl Storefront {
    pub fn new(store: BoxedStore, gateway: BoxedPaymentGateway, currency: Currency) -> Self {
        Self {
            store,
            gateway,
            currency,
        }
    }

    pub fn store(&self) -> &BoxedStore {
        &self.store
    }

    pub fn gateway(&self) -> &BoxedPaymentGateway {
        &self.gateway
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    pub async fn list_products(&self, filter: &ProductFilter) -> ShopResult<Vec<Product>> {
        self.store.list_products(filter).await
    }

    /// Available product by slug
    pub async fn product_detail(&self, slug: &str) -> ShopResult<Product> {
        self.store
            .product_by_slug(slug)
            .await?
            .filter(|p| p.available)
            .ok_or_else(|| ShopError::ProductNotFound {
                product: slug.to_string(),
            })
    }

    pub async fn categories(&self) -> ShopResult<Vec<Category>> {
        self.store.list_categories().await
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// Add one unit of an available product to the shopper's cart, creating the
    /// cart on first use.
    #[instrument(skip(self))]
    pub async fn add_to_cart(&self, shopper: &ShopperId, product_id: Uuid) -> ShopResult<CartItem> {
        let product = self
            .store
            .product_by_id(product_id)
            .await?
            .filter(|p| p.available)
            .ok_or_else(|| ShopError::ProductNotFound {
                product: product_id.to_string(),
            })?;

        let cart = self.store.upsert_cart(shopper).await?;
        let item = self.store.add_cart_item(cart.id, product.id).await?;

        debug!(
            "Cart {}: {} x{}",
            cart.id, product.slug, item.quantity
        );
        Ok(item)
    }

    /// Remove one unit of an item from the shopper's own cart.
    #[instrument(skip(self))]
    pub async fn remove_from_cart(
        &self,
        shopper: &ShopperId,
        item_id: Uuid,
    ) -> ShopResult<RemoveOutcome> {
        let not_found = || ShopError::CartItemNotFound { item_id };

        let cart = self.store.find_cart(shopper).await?.ok_or_else(not_found)?;
        self.store
            .remove_cart_item(cart.id, item_id)
            .await?
            .ok_or_else(not_found)
    }

    /// Cart contents priced at current catalog prices. Never creates a cart.
    pub async fn view_cart(&self, shopper: &ShopperId) -> ShopResult<CartView> {
        match self.store.find_cart(shopper).await? {
            Some(cart) => {
                let lines = self.store.cart_lines(cart.id).await?;
                Ok(CartView::from_lines(cart.id, lines, self.currency))
            }
            None => Ok(CartView::empty(self.currency)),
        }
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    pub async fn checkout_summary(&self, customer: &Customer) -> ShopResult<CheckoutOutcome> {
        let view = self.view_cart(&customer.shopper_id()).await?;
        if view.is_empty() {
            return Ok(CheckoutOutcome::EmptyCart);
        }
        Ok(CheckoutOutcome::Ready(view))
    }

    /// Snapshot the customer's cart into an unpaid order.
    ///
    /// The cart stays intact until payment succeeds. If the latest unpaid
    /// order is identical to what would be created, it is returned instead.
    #[instrument(skip(self, contact), fields(user = %customer.id))]
    pub async fn place_order(
        &self,
        customer: &Customer,
        contact: &ContactDetails,
        ip: Option<String>,
    ) -> ShopResult<PlaceOrderOutcome> {
        let view = self.view_cart(&customer.shopper_id()).await?;
        if view.is_empty() {
            return Ok(PlaceOrderOutcome::EmptyCart);
        }
        contact.validate()?;

        let draft = OrderDraft::from_cart(customer, contact, &view.lines, self.currency, ip)?;

        if let Some(latest) = self.store.latest_unpaid_order(&customer.id).await? {
            let items = self.store.order_items(latest.id).await?;
            if draft.duplicates(&latest, &items) {
                info!("Reusing unpaid order {} for {}", latest.id, customer.id);
                return Ok(PlaceOrderOutcome::Reused(OrderDetail {
                    order: latest,
                    items,
                    payment: None,
                }));
            }
        }

        let order = self.store.insert_order(&draft).await?;
        info!(
            "Placed order {}: {} lines, total={}",
            order.id,
            draft.items.len(),
            self.currency.format(order.total)
        );

        Ok(PlaceOrderOutcome::Placed(OrderDetail {
            order,
            items: draft.items,
            payment: None,
        }))
    }

    // =========================================================================
    // Payment
    // =========================================================================

    /// Open (or reuse) a remote payment order for the customer's most recent
    /// unpaid order.
    #[instrument(skip(self), fields(user = %customer.id))]
    pub async fn begin_payment(&self, customer: &Customer) -> ShopResult<PaymentOutcome> {
        let Some(order) = self.store.latest_unpaid_order(&customer.id).await? else {
            return Ok(PaymentOutcome::NoPendingOrder);
        };

        let amount = order.total_minor_units()?;

        let intent_id = match &order.gateway_order_id {
            Some(existing) => {
                debug!("Order {} already has intent {}", order.id, existing);
                existing.clone()
            }
            None => {
                let request = IntentRequest {
                    amount,
                    currency: order.currency,
                    receipt: order.id.to_string(),
                    capture: true,
                    notes: HashMap::from([("user_id".to_string(), customer.id.to_string())]),
                };
                let intent = self.gateway.create_intent(&request).await?;
                self.store
                    .set_gateway_order_id(order.id, &intent.id)
                    .await?;
                info!(
                    "Created {} intent {} for order {} ({} minor units)",
                    self.gateway.provider_name(),
                    intent.id,
                    order.id,
                    amount
                );
                intent.id
            }
        };

        Ok(PaymentOutcome::Intent(PaymentIntent {
            order_id: order.id,
            intent_id,
            amount,
            currency: order.currency,
            key_id: self.gateway.public_key().to_string(),
            provider: self.gateway.provider_name().to_string(),
        }))
    }

    /// Finalize an order from the client's success callback.
    ///
    /// Nothing is written unless the signature verifies and the processor
    /// confirms the payment for this order's amount.
    #[instrument(skip(self, confirmation), fields(payment = %confirmation.gateway_payment_id))]
    pub async fn confirm_payment(
        &self,
        order_id: Uuid,
        confirmation: &PaymentConfirmation,
    ) -> ShopResult<FinalizeOutcome> {
        let order = self.store.order(order_id).await?.ok_or_else(|| {
            warn!("Payment callback for unknown order {}", order_id);
            ShopError::OrderNotFound {
                order_id: order_id.to_string(),
            }
        })?;

        if order.gateway_order_id.as_deref() != Some(confirmation.gateway_order_id.as_str()) {
            warn!(
                "Callback processor order {} does not belong to order {}",
                confirmation.gateway_order_id, order.id
            );
            return Err(ShopError::SignatureVerificationFailed(
                "processor order does not match the order".to_string(),
            ));
        }

        self.gateway
            .verify_payment_signature(confirmation)
            .inspect_err(|e| warn!("Rejected payment callback for {}: {}", order.id, e))?;

        let payment = self
            .gateway
            .fetch_payment(&confirmation.gateway_payment_id)
            .await?;

        self.settle(&order, &payment).await
    }

    /// Handle a signed processor webhook.
    #[instrument(skip(self, payload, signature))]
    pub async fn handle_webhook(
        &self,
        payload: &[u8],
        signature: &str,
        event_id: Option<&str>,
    ) -> ShopResult<WebhookOutcome> {
        let event = self.gateway.verify_webhook(payload, signature, event_id)?;

        match &event.event_type {
            WebhookEventType::PaymentCaptured
            | WebhookEventType::PaymentAuthorized
            | WebhookEventType::OrderPaid => {
                let payment = event.payment.ok_or_else(|| {
                    ShopError::WebhookParseError("payment entity missing".to_string())
                })?;
                let Some(gateway_order_id) = payment.order_id.as_deref() else {
                    debug!("Payment {} has no processor order, ignoring", payment.id);
                    return Ok(WebhookOutcome::Ignored);
                };
                let Some(order) = self
                    .store
                    .order_by_gateway_order_id(gateway_order_id)
                    .await?
                else {
                    warn!(
                        "Webhook for unknown processor order {} (payment {})",
                        gateway_order_id, payment.id
                    );
                    return Ok(WebhookOutcome::Ignored);
                };

                let outcome = self.settle(&order, &payment).await?;
                Ok(WebhookOutcome::Finalized(outcome))
            }
            WebhookEventType::PaymentFailed => {
                warn!(
                    "Payment failed: {:?}",
                    event.payment.as_ref().map(|p| p.id.as_str())
                );
                Ok(WebhookOutcome::Ignored)
            }
            WebhookEventType::Unknown(name) => {
                debug!("Unhandled webhook event: {}", name);
                Ok(WebhookOutcome::Ignored)
            }
        }
    }

    /// Check the processor's payment against the order and record it.
    async fn settle(&self, order: &Order, payment: &GatewayPayment) -> ShopResult<FinalizeOutcome> {
        let mismatch = |message: String| {
            warn!("Payment {} rejected for order {}: {}", payment.id, order.id, message);
            ShopError::PaymentMismatch { message }
        };

        if payment.order_id.is_none() || payment.order_id != order.gateway_order_id {
            return Err(mismatch(format!(
                "payment belongs to processor order {:?}",
                payment.order_id
            )));
        }
        if payment.currency != order.currency {
            return Err(mismatch(format!(
                "currency {} does not match {}",
                payment.currency, order.currency
            )));
        }
        let expected = order.total_minor_units()?;
        if payment.amount != expected {
            return Err(mismatch(format!(
                "amount {} does not match order total {}",
                payment.amount, expected
            )));
        }
        if !payment.status.is_successful() {
            return Err(mismatch(format!("payment status is {:?}", payment.status)));
        }
        let status = match payment.status {
            GatewayPaymentStatus::Captured => PaymentStatus::Paid,
            _ => PaymentStatus::Authorized,
        };

        let method = match &payment.method {
            Some(instrument) => format!("{} ({})", self.gateway.method_label(), instrument),
            None => self.gateway.method_label().to_string(),
        };

        let record = Payment {
            id: Uuid::new_v4(),
            user_id: order.user_id.clone(),
            order_id: order.id,
            gateway_payment_id: payment.id.clone(),
            method,
            amount_paid: order.currency.from_minor_units(payment.amount),
            currency: payment.currency,
            status,
            created_at: Utc::now(),
        };

        let outcome = self.store.finalize_payment(record).await?;
        match &outcome {
            FinalizeOutcome::Recorded(p) => info!(
                "Order {} paid: payment={}, amount={}",
                order.id,
                p.gateway_payment_id,
                order.currency.format(p.amount_paid)
            ),
            FinalizeOutcome::AlreadyRecorded(p) => info!(
                "Order {} already settled by {}, nothing to do",
                order.id, p.gateway_payment_id
            ),
        }
        Ok(outcome)
    }

    // =========================================================================
    // Order history
    // =========================================================================

    pub async fn orders(&self, customer: &Customer) -> ShopResult<Vec<Order>> {
        self.store.orders_for_user(&customer.id).await
    }

    /// One of the customer's orders with items and payment
    pub async fn order_detail(&self, customer: &Customer, order_id: Uuid) -> ShopResult<OrderDetail> {
        let order = self
            .store
            .order(order_id)
            .await?
            .filter(|o| o.belongs_to(&customer.id))
            .ok_or_else(|| ShopError::OrderNotFound {
                order_id: order_id.to_string(),
            })?;

        let items = self.store.order_items(order.id).await?;
        let payment = match order.payment_id {
            Some(id) => self.store.payment(id).await?,
            None => None,
        };

        Ok(OrderDetail {
            order,
            items,
            payment,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{GatewayIntent, PaymentGateway, WebhookEvent};
    use crate::store::{MemoryStore, Store};
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Accepts signatures of the form `ok:{order}|{payment}` and reports
    /// payments from a table the test fills in.
    #[derive(Default)]
    struct FakeGateway {
        intents_created: AtomicUsize,
        fail_intents: bool,
        payments: Mutex<HashMap<String, GatewayPayment>>,
    }

    impl FakeGateway {
        fn sign(order_id: &str, payment_id: &str) -> String {
            format!("ok:{}|{}", order_id, payment_id)
        }

        fn settle(&self, payment: GatewayPayment) {
            self.payments
                .lock()
                .unwrap()
                .insert(payment.id.clone(), payment);
        }
    }

    #[async_trait]
    impl PaymentGateway for FakeGateway {
        async fn create_intent(&self, request: &IntentRequest) -> ShopResult<GatewayIntent> {
            if self.fail_intents {
                return Err(ShopError::NetworkError("connection refused".into()));
            }
            let n = self.intents_created.fetch_add(1, Ordering::SeqCst);
            Ok(GatewayIntent {
                id: format!("order_fake{}", n),
                amount: request.amount,
                currency: request.currency,
                status: "created".into(),
            })
        }

        fn verify_payment_signature(&self, c: &PaymentConfirmation) -> ShopResult<()> {
            if c.signature == Self::sign(&c.gateway_order_id, &c.gateway_payment_id) {
                Ok(())
            } else {
                Err(ShopError::SignatureVerificationFailed("bad signature".into()))
            }
        }

        async fn fetch_payment(&self, id: &str) -> ShopResult<GatewayPayment> {
            self.payments
                .lock()
                .unwrap()
                .get(id)
                .cloned()
                .ok_or_else(|| ShopError::ProviderError {
                    provider: "fake".into(),
                    message: "no such payment".into(),
                })
        }

        fn verify_webhook(
            &self,
            payload: &[u8],
            signature: &str,
            _event_id: Option<&str>,
        ) -> ShopResult<WebhookEvent> {
            if signature != "good" {
                return Err(ShopError::SignatureVerificationFailed("bad webhook".into()));
            }
            serde_json::from_slice(payload).map_err(|e| ShopError::WebhookParseError(e.to_string()))
        }

        fn public_key(&self) -> &str {
            "key_fake"
        }

        fn provider_name(&self) -> &'static str {
            "fake"
        }

        fn method_label(&self) -> &'static str {
            "Fake"
        }
    }

    struct Fixture {
        shop: Storefront,
        store: Arc<MemoryStore>,
        gateway: Arc<FakeGateway>,
        a: Product,
        b: Product,
    }

    async fn fixture_with(gateway: FakeGateway) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let gateway = Arc::new(gateway);
        let a = store
            .upsert_product(Product::new("Product A", Decimal::new(10, 0)))
            .await
            .unwrap();
        let b = store
            .upsert_product(Product::new("Product B", Decimal::new(5, 0)))
            .await
            .unwrap();
        let shop = Storefront::new(store.clone(), gateway.clone(), Currency::INR);
        Fixture {
            shop,
            store,
            gateway,
            a,
            b,
        }
    }

    async fn fixture() -> Fixture {
        fixture_with(FakeGateway::default()).await
    }

    fn customer() -> Customer {
        Customer::new("user-1", "asha@example.com")
    }

    fn contact() -> ContactDetails {
        ContactDetails {
            first_name: "Asha".into(),
            last_name: "Rao".into(),
            address: "12 MG Road".into(),
            city: "Bengaluru".into(),
            postcode: "560001".into(),
            phone: "9845000000".into(),
        }
    }

    async fn placed(f: &Fixture) -> OrderDetail {
        let me = customer().shopper_id();
        f.shop.add_to_cart(&me, f.a.id).await.unwrap();
        f.shop.add_to_cart(&me, f.a.id).await.unwrap();
        f.shop.add_to_cart(&me, f.b.id).await.unwrap();
        match f.shop.place_order(&customer(), &contact(), None).await.unwrap() {
            PlaceOrderOutcome::Placed(detail) => detail,
            other => panic!("expected a new order, got {:?}", other),
        }
    }

    async fn intent(f: &Fixture) -> PaymentIntent {
        match f.shop.begin_payment(&customer()).await.unwrap() {
            PaymentOutcome::Intent(intent) => intent,
            other => panic!("expected an intent, got {:?}", other),
        }
    }

    fn captured(intent: &PaymentIntent, payment_id: &str) -> GatewayPayment {
        GatewayPayment {
            id: payment_id.into(),
            order_id: Some(intent.intent_id.clone()),
            amount: intent.amount,
            currency: Currency::INR,
            status: GatewayPaymentStatus::Captured,
            method: Some("upi".into()),
        }
    }

    fn confirmation(intent: &PaymentIntent, payment_id: &str) -> PaymentConfirmation {
        PaymentConfirmation {
            gateway_payment_id: payment_id.into(),
            gateway_order_id: intent.intent_id.clone(),
            signature: FakeGateway::sign(&intent.intent_id, payment_id),
        }
    }

    #[tokio::test]
    async fn test_repeated_adds_increment_one_line() {
        let f = fixture().await;
        let me = ShopperId::anonymous("visitor");

        for _ in 0..4 {
            f.shop.add_to_cart(&me, f.a.id).await.unwrap();
        }
        f.shop.add_to_cart(&me, f.b.id).await.unwrap();

        let view = f.shop.view_cart(&me).await.unwrap();
        assert_eq!(view.lines.len(), 2);
        let a_line = view.lines.iter().find(|l| l.product.id == f.a.id).unwrap();
        assert_eq!(a_line.item.quantity, 4);
        assert_eq!(view.total, Decimal::new(45, 0));
    }

    #[tokio::test]
    async fn test_add_unknown_or_unavailable_product() {
        let f = fixture().await;
        let me = ShopperId::anonymous("visitor");

        let missing = f.shop.add_to_cart(&me, Uuid::new_v4()).await;
        assert!(matches!(missing, Err(ShopError::ProductNotFound { .. })));

        let retired = f
            .store
            .upsert_product(Product::new("Retired", Decimal::new(3, 0)).unavailable())
            .await
            .unwrap();
        let result = f.shop.add_to_cart(&me, retired.id).await;
        assert!(matches!(result, Err(ShopError::ProductNotFound { .. })));

        // no cart was created for failed adds
        assert!(f.store.find_cart(&me).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_remove_decrements_then_deletes() {
        let f = fixture().await;
        let me = ShopperId::anonymous("visitor");
        f.shop.add_to_cart(&me, f.a.id).await.unwrap();
        let item = f.shop.add_to_cart(&me, f.a.id).await.unwrap();
        assert_eq!(item.quantity, 2);

        match f.shop.remove_from_cart(&me, item.id).await.unwrap() {
            RemoveOutcome::Decremented(left) => assert_eq!(left.quantity, 1),
            RemoveOutcome::Removed => panic!("should only decrement"),
        }
        assert_eq!(
            f.shop.remove_from_cart(&me, item.id).await.unwrap(),
            RemoveOutcome::Removed
        );
        assert!(f.shop.view_cart(&me).await.unwrap().is_empty());

        let again = f.shop.remove_from_cart(&me, item.id).await;
        assert!(matches!(again, Err(ShopError::CartItemNotFound { .. })));
    }

    #[tokio::test]
    async fn test_cannot_remove_someone_elses_item() {
        let f = fixture().await;
        let owner = ShopperId::anonymous("owner");
        let stranger = ShopperId::anonymous("stranger");
        let item = f.shop.add_to_cart(&owner, f.a.id).await.unwrap();
        f.shop.add_to_cart(&stranger, f.b.id).await.unwrap();

        let result = f.shop.remove_from_cart(&stranger, item.id).await;
        assert!(matches!(result, Err(ShopError::CartItemNotFound { .. })));
        assert_eq!(f.shop.view_cart(&owner).await.unwrap().item_count, 1);
    }

    #[tokio::test]
    async fn test_view_cart_does_not_create_cart() {
        let f = fixture().await;
        let me = ShopperId::anonymous("just-looking");
        let view = f.shop.view_cart(&me).await.unwrap();
        assert!(view.is_empty());
        assert_eq!(view.total, Decimal::ZERO);
        assert!(f.store.find_cart(&me).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_checkout_empty_cart() {
        let f = fixture().await;
        assert_eq!(
            f.shop.checkout_summary(&customer()).await.unwrap(),
            CheckoutOutcome::EmptyCart
        );
        assert_eq!(
            f.shop.place_order(&customer(), &contact(), None).await.unwrap(),
            PlaceOrderOutcome::EmptyCart
        );
        assert!(f.shop.orders(&customer()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_checkout_freezes_prices() {
        let f = fixture().await;
        let detail = placed(&f).await;

        assert_eq!(detail.order.total, Decimal::new(25, 0));
        assert!(!detail.order.paid);
        assert_eq!(detail.items.len(), 2);
        let a_item = detail.items.iter().find(|i| i.product_id == f.a.id).unwrap();
        assert_eq!((a_item.price, a_item.quantity), (Decimal::new(10, 0), 2));

        // reprice A after checkout
        let mut repriced = f.a.clone();
        repriced.price = Decimal::new(12, 0);
        f.store.upsert_product(repriced).await.unwrap();

        let stored = f.store.order(detail.order.id).await.unwrap().unwrap();
        assert_eq!(stored.total, Decimal::new(25, 0));
        let view = f.shop.view_cart(&customer().shopper_id()).await.unwrap();
        assert_eq!(view.total, Decimal::new(29, 0));

        // the cart stays until payment
        assert_eq!(view.item_count, 3);
    }

    #[tokio::test]
    async fn test_checkout_validates_contact() {
        let f = fixture().await;
        f.shop
            .add_to_cart(&customer().shopper_id(), f.a.id)
            .await
            .unwrap();
        let mut blank = contact();
        blank.postcode = " ".into();

        let result = f.shop.place_order(&customer(), &blank, None).await;
        assert!(matches!(result, Err(ShopError::InvalidRequest(_))));
        assert!(f.shop.orders(&customer()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_resubmitting_checkout_reuses_order() {
        let f = fixture().await;
        let first = placed(&f).await;

        match f.shop.place_order(&customer(), &contact(), None).await.unwrap() {
            PlaceOrderOutcome::Reused(detail) => assert_eq!(detail.order.id, first.order.id),
            other => panic!("expected reuse, got {:?}", other),
        }

        // changing the cart makes a new order
        f.shop
            .add_to_cart(&customer().shopper_id(), f.b.id)
            .await
            .unwrap();
        match f.shop.place_order(&customer(), &contact(), None).await.unwrap() {
            PlaceOrderOutcome::Placed(detail) => {
                assert_ne!(detail.order.id, first.order.id);
                assert_eq!(detail.order.total, Decimal::new(30, 0));
            }
            other => panic!("expected a new order, got {:?}", other),
        }
        assert_eq!(f.shop.orders(&customer()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_begin_payment_uses_latest_unpaid_order() {
        let f = fixture().await;
        assert_eq!(
            f.shop.begin_payment(&customer()).await.unwrap(),
            PaymentOutcome::NoPendingOrder
        );

        placed(&f).await;
        f.shop
            .add_to_cart(&customer().shopper_id(), f.b.id)
            .await
            .unwrap();
        let latest = match f.shop.place_order(&customer(), &contact(), None).await.unwrap() {
            PlaceOrderOutcome::Placed(detail) => detail.order,
            other => panic!("expected a new order, got {:?}", other),
        };

        let intent = intent(&f).await;
        assert_eq!(intent.order_id, latest.id);
        assert_eq!(intent.amount, 3000);
        assert_eq!(intent.currency, Currency::INR);
        assert_eq!(intent.key_id, "key_fake");

        // asking again reuses the processor order
        let again = self::intent(&f).await;
        assert_eq!(again.intent_id, intent.intent_id);
        assert_eq!(f.gateway.intents_created.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_begin_payment_surfaces_gateway_errors() {
        let f = fixture_with(FakeGateway {
            fail_intents: true,
            ..FakeGateway::default()
        })
        .await;
        let order = placed(&f).await.order;

        let result = f.shop.begin_payment(&customer()).await;
        assert!(matches!(result, Err(ShopError::NetworkError(_))));
        let stored = f.store.order(order.id).await.unwrap().unwrap();
        assert!(stored.gateway_order_id.is_none());
    }

    #[tokio::test]
    async fn test_full_purchase_scenario() {
        let f = fixture().await;
        let order = placed(&f).await.order;
        assert_eq!(order.total, Decimal::new(25, 0));

        let intent = intent(&f).await;
        f.gateway.settle(captured(&intent, "pay_1"));

        let outcome = f
            .shop
            .confirm_payment(order.id, &confirmation(&intent, "pay_1"))
            .await
            .unwrap();
        assert!(!outcome.is_replay());
        assert_eq!(outcome.payment().amount_paid, Decimal::new(25, 0));
        assert_eq!(outcome.payment().status, PaymentStatus::Paid);
        assert_eq!(outcome.payment().method, "Fake (upi)");

        let detail = f.shop.order_detail(&customer(), order.id).await.unwrap();
        assert!(detail.order.paid);
        assert_eq!(detail.payment.unwrap().gateway_payment_id, "pay_1");
        assert!(f
            .shop
            .view_cart(&customer().shopper_id())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_callback_records_one_payment() {
        let f = fixture().await;
        let order = placed(&f).await.order;
        let intent = intent(&f).await;
        f.gateway.settle(captured(&intent, "pay_1"));

        let first = f
            .shop
            .confirm_payment(order.id, &confirmation(&intent, "pay_1"))
            .await
            .unwrap();
        let second = f
            .shop
            .confirm_payment(order.id, &confirmation(&intent, "pay_1"))
            .await
            .unwrap();

        assert!(second.is_replay());
        assert_eq!(first.payment().id, second.payment().id);
        assert_eq!(f.store.payments_for_order(order.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_callback_for_unknown_order_changes_nothing() {
        let f = fixture().await;
        let order = placed(&f).await.order;
        let intent = intent(&f).await;
        f.gateway.settle(captured(&intent, "pay_1"));

        let result = f
            .shop
            .confirm_payment(Uuid::new_v4(), &confirmation(&intent, "pay_1"))
            .await;
        assert!(matches!(result, Err(ShopError::OrderNotFound { .. })));

        let stored = f.store.order(order.id).await.unwrap().unwrap();
        assert!(!stored.paid);
        assert!(f.store.payments_for_order(order.id).await.unwrap().is_empty());
        assert_eq!(
            f.shop
                .view_cart(&customer().shopper_id())
                .await
                .unwrap()
                .item_count,
            3
        );
    }

    #[tokio::test]
    async fn test_bad_signature_changes_nothing() {
        let f = fixture().await;
        let order = placed(&f).await.order;
        let intent = intent(&f).await;
        f.gateway.settle(captured(&intent, "pay_1"));

        let mut forged = confirmation(&intent, "pay_1");
        forged.signature = "forged".into();
        let result = f.shop.confirm_payment(order.id, &forged).await;
        assert!(matches!(
            result,
            Err(ShopError::SignatureVerificationFailed(_))
        ));

        let mut wrong_order = confirmation(&intent, "pay_1");
        wrong_order.gateway_order_id = "order_other".into();
        wrong_order.signature = FakeGateway::sign("order_other", "pay_1");
        let result = f.shop.confirm_payment(order.id, &wrong_order).await;
        assert!(matches!(
            result,
            Err(ShopError::SignatureVerificationFailed(_))
        ));

        assert!(!f.store.order(order.id).await.unwrap().unwrap().paid);
        assert!(f.store.payments_for_order(order.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_underpaid_payment_is_rejected() {
        let f = fixture().await;
        let order = placed(&f).await.order;
        let intent = intent(&f).await;
        let mut short = captured(&intent, "pay_1");
        short.amount = 100;
        f.gateway.settle(short);

        let result = f
            .shop
            .confirm_payment(order.id, &confirmation(&intent, "pay_1"))
            .await;
        assert!(matches!(result, Err(ShopError::PaymentMismatch { .. })));
        assert!(!f.store.order(order.id).await.unwrap().unwrap().paid);
    }

    #[tokio::test]
    async fn test_payment_status_decides_settlement() {
        let f = fixture().await;
        let order = placed(&f).await.order;
        let intent = intent(&f).await;

        let mut failed = captured(&intent, "pay_failed");
        failed.status = GatewayPaymentStatus::Failed;
        f.gateway.settle(failed);
        let result = f
            .shop
            .confirm_payment(order.id, &confirmation(&intent, "pay_failed"))
            .await;
        assert!(matches!(result, Err(ShopError::PaymentMismatch { .. })));
        assert!(!f.store.order(order.id).await.unwrap().unwrap().paid);

        let mut authorized = captured(&intent, "pay_auth");
        authorized.status = GatewayPaymentStatus::Authorized;
        f.gateway.settle(authorized);
        let outcome = f
            .shop
            .confirm_payment(order.id, &confirmation(&intent, "pay_auth"))
            .await
            .unwrap();
        assert_eq!(outcome.payment().status, PaymentStatus::Authorized);
        assert!(f.store.order(order.id).await.unwrap().unwrap().paid);
    }

    #[tokio::test]
    async fn test_webhook_finalizes_and_ignores() {
        let f = fixture().await;
        let order = placed(&f).await.order;
        let intent = intent(&f).await;

        let event = WebhookEvent {
            event_id: Some("evt_1".into()),
            event_type: WebhookEventType::PaymentCaptured,
            provider: "fake".into(),
            payment: Some(captured(&intent, "pay_9")),
        };
        let payload = serde_json::to_vec(&event).unwrap();

        let bad = f.shop.handle_webhook(&payload, "bad", None).await;
        assert!(matches!(bad, Err(ShopError::SignatureVerificationFailed(_))));

        match f.shop.handle_webhook(&payload, "good", Some("evt_1")).await.unwrap() {
            WebhookOutcome::Finalized(outcome) => assert!(!outcome.is_replay()),
            WebhookOutcome::Ignored => panic!("capture should finalize"),
        }
        assert!(f.store.order(order.id).await.unwrap().unwrap().paid);

        // redelivery is a no-op
        match f.shop.handle_webhook(&payload, "good", Some("evt_1")).await.unwrap() {
            WebhookOutcome::Finalized(outcome) => assert!(outcome.is_replay()),
            WebhookOutcome::Ignored => panic!("redelivery should replay"),
        }

        let unknown = WebhookEvent {
            event_id: None,
            event_type: WebhookEventType::Unknown("refund.created".into()),
            provider: "fake".into(),
            payment: None,
        };
        let payload = serde_json::to_vec(&unknown).unwrap();
        assert_eq!(
            f.shop.handle_webhook(&payload, "good", Some("evt_1")).await.unwrap(),
            WebhookOutcome::Ignored
        );
    }

    #[tokio::test]
    async fn test_order_detail_is_owner_only() {
        let f = fixture().await;
        let order = placed(&f).await.order;
        let stranger = Customer::new("user-2", "other@example.com");

        let result = f.shop.order_detail(&stranger, order.id).await;
        assert!(matches!(result, Err(ShopError::OrderNotFound { .. })));
        assert!(f.shop.orders(&stranger).await.unwrap().is_empty());
    }
}
